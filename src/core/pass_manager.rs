//! The sequential pass executor. Passes run in registration order;
//! analysis results are cached under the producing pass's name, and
//! each completed transform invalidates the analyses it declared,
//! either incrementally (`Analysis::update`) or by dropping the cache
//! entry when the result refuses the update.

use crate::core::module::Module;
use crate::core::pass::{Analysis, ExecutionPolicy, PassKind};
use crate::core::region::RegionId;
use color_eyre::{eyre::bail, eyre::eyre, Report};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Name-keyed store of analysis results. Transforms receive a shared
/// handle to this while they run.
#[derive(Default)]
pub struct AnalysisCache {
    results: HashMap<&'static str, Box<dyn Analysis>>,
}

impl AnalysisCache {
    /// First cached result whose dynamic type is `T`.
    pub fn get<T: Analysis>(&self) -> Result<&T, Report> {
        self.results
            .values()
            .find_map(|a| a.downcast_ref::<T>())
            .ok_or_else(|| eyre!("analysis result not available"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.results.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    fn insert(&mut self, name: &'static str, result: Box<dyn Analysis>) {
        self.results.insert(name, result);
    }
}

pub struct PassManager {
    passes: Vec<PassKind>,
    batch_sizes: Vec<usize>,
    cache: AnalysisCache,
    policy: ExecutionPolicy,
}

impl PassManager {
    pub fn new() -> PassManager {
        PassManager::with_policy(ExecutionPolicy::Sequential)
    }

    pub fn with_policy(policy: ExecutionPolicy) -> PassManager {
        PassManager {
            passes: Vec::new(),
            batch_sizes: Vec::new(),
            cache: AnalysisCache::default(),
            policy,
        }
    }

    /// A manager whose registration order is a flattened batch
    /// schedule, as produced by the task graph.
    pub fn from_batches(batches: Vec<Vec<PassKind>>, policy: ExecutionPolicy) -> PassManager {
        let mut pm = PassManager::with_policy(policy);
        for batch in batches {
            pm.batch_sizes.push(batch.len());
            pm.passes.extend(batch);
        }
        pm
    }

    /// Register a pass at the end of the execution sequence.
    pub fn add(&mut self, pass: PassKind) -> &mut PassManager {
        self.passes.push(pass);
        self
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    pub fn policy(&self) -> ExecutionPolicy {
        self.policy
    }

    /// Batch sizes of the flattened schedule; empty for managers built
    /// by direct registration.
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    pub fn has_analysis(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    /// First cached analysis result whose dynamic type is `T`.
    pub fn get<T: Analysis>(&self) -> Result<&T, Report> {
        self.cache.get::<T>()
    }

    pub fn analyses(&self) -> &AnalysisCache {
        &self.cache
    }

    pub fn clear_analyses(&mut self) {
        self.cache.clear();
    }

    /// Run all registered passes on the module. Stops at the first
    /// failing pass, leaving the module as that pass left it.
    pub fn run(&mut self, module: &mut Module) -> Result<(), Report> {
        if self.policy == ExecutionPolicy::Parallel {
            debug!("parallel policy requested; executing batches sequentially");
        }
        for i in 0..self.passes.len() {
            self.validate_dependencies(i)?;
            let mut completed_transform = None;
            match &mut self.passes[i] {
                PassKind::Analysis(pass) => {
                    if self.cache.contains(pass.name()) {
                        trace!(pass = pass.name(), "analysis already cached, skipping");
                        continue;
                    }
                    debug!(pass = pass.name(), "running analysis");
                    let result = pass.run(module)?;
                    self.cache.insert(pass.name(), result);
                }
                PassKind::Transform(pass) => {
                    debug!(pass = pass.name(), "running transform");
                    let modified = pass.run(module, &self.cache)?;
                    completed_transform = Some((modified, pass.invalidates()));
                }
            }
            if let Some((modified, invalidates)) = completed_transform {
                self.invalidate_analyses(&modified, &invalidates);
            }
        }
        Ok(())
    }

    /// A `require` name must be either already cached or produced by a
    /// pass scheduled before the current one.
    fn validate_dependencies(&self, index: usize) -> Result<(), Report> {
        let pass = &self.passes[index];
        for dep in pass.require() {
            let cached = self.cache.contains(dep);
            let scheduled = self.passes[..index].iter().any(|p| p.name() == dep);
            if !cached && !scheduled {
                bail!(
                    "pass '{}' requires '{}', which is neither cached nor scheduled earlier",
                    pass.name(),
                    dep
                );
            }
        }
        Ok(())
    }

    fn invalidate_analyses(&mut self, modified: &[RegionId], names: &[&'static str]) {
        for &name in names {
            let Some(result) = self.cache.results.get_mut(name) else {
                continue;
            };
            if result.update(modified) {
                trace!(analysis = name, "analysis updated incrementally");
            } else {
                debug!(analysis = name, "analysis dropped");
                self.cache.results.remove(name);
            }
        }
    }
}

impl Default for PassManager {
    fn default() -> PassManager {
        PassManager::new()
    }
}
