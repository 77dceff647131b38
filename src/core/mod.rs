//! Core functionality: the IR data model ([`Module`], [`Region`],
//! [`Node`], typed values, string interning), the pass and analysis
//! contracts, the sequential pass manager, and the dependency-resolving
//! task graph.

mod builder;
mod diagnostics;
mod display;
mod inference;
mod ir;
mod module;
mod pass;
mod pass_manager;
mod region;
mod strtab;
mod taskgraph;
mod value;

// Public API.
pub use self::{
    builder::NodeBuilder,
    diagnostics::{diagnostics_color_disable, diagnostics_setup},
    inference::{infer_binary_t, infer_primitive_types},
    ir::{extract_literal_value, AtomicOrdering, Node, NodeId, NodeTraits, Opcode},
    module::Module,
    pass::{ids, Analysis, AnalysisPass, ExecutionPolicy, Pass, PassKind, TransformPass},
    pass_manager::{AnalysisCache, PassManager},
    region::{Region, RegionId},
    strtab::{StringId, StringTable},
    taskgraph::TaskGraph,
    value::{
        struct_field_offset, ArrayValue, DataType, FunctionValue, PointerValue, StructValue,
        Value, VectorValue,
    },
};
