//! The pass and analysis contracts. Passes come in exactly two shapes:
//! analyses, which read the module and return a cached result object,
//! and transforms, which mutate it and report the regions they touched.
//! Both share the `name`/`require`/`invalidates` trio used for
//! dependency resolution.

use crate::core::module::Module;
use crate::core::pass_manager::AnalysisCache;
use crate::core::region::RegionId;
use color_eyre::Report;
use downcast_rs::{impl_downcast, Downcast};

/// Stable pass identifiers. These names are the only wire format
/// between passes; dependency declarations refer to them.
pub mod ids {
    pub const CONSTANT_FOLDING: &str = "constant-folding";
    pub const DEAD_CODE_ELIMINATION: &str = "dead-code-elimination";
    pub const IR_LOWERING: &str = "ir-lowering";
    pub const CSE: &str = "cse";
    pub const DSE: &str = "dse";
    pub const MEM2REG: &str = "mem2reg";
    pub const SROA: &str = "sroa";
    pub const HOIST_EXPR: &str = "hoist-expr";
    pub const TYPE_BASED_ALIAS_ANALYSIS: &str = "type-based-alias-analysis";
}

/// The `name`/`require`/`invalidates` trio every pass exposes.
pub trait Pass {
    /// Globally unique identifier used for dependency resolution.
    fn name(&self) -> &'static str;

    /// Passes that must run before this one.
    fn require(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Analyses this pass may stale.
    fn invalidates(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// A cached analysis result, owned by the pass manager under the
/// producing pass's name and retrieved by dynamic type.
pub trait Analysis: Downcast {
    /// Incrementally absorb a transform's modified regions. Returning
    /// false discards the cache entry (full recomputation on next
    /// need).
    fn update(&mut self, modified_regions: &[RegionId]) -> bool;
}
impl_downcast!(Analysis);

/// Read-only pass producing a cached result object.
pub trait AnalysisPass: Pass {
    fn run(&mut self, module: &Module) -> Result<Box<dyn Analysis>, Report>;
}

/// Mutating pass. Cached analyses are read through the cache handle;
/// the returned list must name every region whose node list changed.
pub trait TransformPass: Pass {
    fn run(&mut self, module: &mut Module, analyses: &AnalysisCache)
        -> Result<Vec<RegionId>, Report>;
}

/// The two shapes a registered pass can take.
pub enum PassKind {
    Analysis(Box<dyn AnalysisPass>),
    Transform(Box<dyn TransformPass>),
}

impl PassKind {
    pub fn analysis<P: AnalysisPass + 'static>(pass: P) -> PassKind {
        PassKind::Analysis(Box::new(pass))
    }

    pub fn transform<P: TransformPass + 'static>(pass: P) -> PassKind {
        PassKind::Transform(Box::new(pass))
    }

    pub fn name(&self) -> &'static str {
        match self {
            PassKind::Analysis(p) => p.name(),
            PassKind::Transform(p) => p.name(),
        }
    }

    pub fn require(&self) -> Vec<&'static str> {
        match self {
            PassKind::Analysis(p) => p.require(),
            PassKind::Transform(p) => p.require(),
        }
    }

    pub fn invalidates(&self) -> Vec<&'static str> {
        match self {
            PassKind::Analysis(p) => p.invalidates(),
            PassKind::Transform(p) => p.invalidates(),
        }
    }

    pub fn is_analysis(&self) -> bool {
        matches!(self, PassKind::Analysis(_))
    }
}

/// How a built pipeline executes its batches. Sequential is the
/// reference model; the parallel policy is the declared extension
/// point and currently runs batches on one thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionPolicy {
    #[default]
    Sequential,
    Parallel,
}
