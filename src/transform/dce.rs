//! Dead-code elimination.
//!
//! Two-phase mark-and-sweep over the whole module: root nodes (global
//! scope, structural, control flow, side effects, calls, volatile) seed
//! a liveness worklist that propagates backward through the use-def
//! chains; everything unmarked is unlinked from its producers' users
//! lists and detached from its region.

use crate::core::{
    AnalysisCache, Module, NodeId, NodeTraits, Opcode, Pass, RegionId, TransformPass,
};
use color_eyre::Report;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

pub struct DeadCodeElimination {
    alive: HashSet<NodeId>,
    dead: Vec<NodeId>,
}

impl DeadCodeElimination {
    pub fn new() -> DeadCodeElimination {
        DeadCodeElimination {
            alive: HashSet::new(),
            dead: Vec::new(),
        }
    }

    fn find_live_nodes(&mut self, module: &Module) {
        let mut worklist = VecDeque::new();
        for region in module.region_ids() {
            for &node in module.region(region).nodes() {
                if is_root_node(module, node) && self.alive.insert(node) {
                    worklist.push_back(node);
                }
            }
        }

        // Propagate liveness backwards through use-def chains.
        while let Some(node) = worklist.pop_front() {
            for &input in &module.node(node).inputs {
                if self.alive.insert(input) {
                    worklist.push_back(input);
                }
            }
        }
    }

    fn find_dead_nodes(&mut self, module: &Module) {
        for region in module.region_ids() {
            for &node in module.region(region).nodes() {
                if !self.alive.contains(&node) {
                    self.dead.push(node);
                }
            }
        }
    }

    fn remove_dead_nodes(&mut self, module: &mut Module) -> Vec<RegionId> {
        let mut modified = Vec::new();
        for &node in &self.dead {
            module.unlink_inputs(node);
            if let Some(region) = module.node(node).parent {
                module.remove(region, node);
                if !modified.contains(&region) {
                    modified.push(region);
                }
            }
        }
        modified
    }
}

impl Default for DeadCodeElimination {
    fn default() -> DeadCodeElimination {
        DeadCodeElimination::new()
    }
}

impl Pass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        crate::core::ids::DEAD_CODE_ELIMINATION
    }
}

impl TransformPass for DeadCodeElimination {
    fn run(
        &mut self,
        module: &mut Module,
        _analyses: &AnalysisCache,
    ) -> Result<Vec<RegionId>, Report> {
        self.alive.clear();
        self.dead.clear();

        self.find_live_nodes(module);
        self.find_dead_nodes(module);
        let removed = self.dead.len();
        let modified = self.remove_dead_nodes(module);
        debug!(removed, regions = modified.len(), "dead code elimination finished");
        Ok(modified)
    }
}

/// Whether a node must be preserved unconditionally.
fn is_root_node(module: &Module, node: NodeId) -> bool {
    let n = module.node(node);

    // Everything in the global scope survives; the root and rodata
    // regions have no parent region.
    if let Some(region) = n.parent {
        if module.region(region).parent().is_none() {
            return true;
        }
    }

    match n.op {
        // Structural nodes.
        Opcode::Entry | Opcode::Function => true,
        Opcode::Ret | Opcode::Exit | Opcode::Param => true,
        // Control flow.
        Opcode::Branch | Opcode::Jump | Opcode::Invoke => true,
        // Side effects.
        Opcode::Store | Opcode::PtrStore | Opcode::AtomicStore | Opcode::AtomicCas => true,
        // Calls are conservatively assumed to have side effects; a call
        // graph would let ADCE refine this.
        Opcode::Call => true,
        _ => n.traits.contains(NodeTraits::VOLATILE),
    }
}
