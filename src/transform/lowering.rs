//! IR lowering: the last transform before instruction selection.
//!
//! Rewrites the high-level opcodes into the primitive set the selector
//! consumes: `Access(container, selector)` becomes a `PtrAdd` of the
//! container's base address and a literal byte offset computed from the
//! container's layout, and call sites are normalized so every
//! same-region argument is evaluated before its call node. A map of
//! already-lowered nodes keeps shared subexpressions convergent.

use crate::core::{
    struct_field_offset, AnalysisCache, DataType, Module, NodeBuilder, NodeId, Opcode, Pass,
    PointerValue, RegionId, TransformPass, Value,
};
use color_eyre::Report;
use std::collections::HashMap;
use tracing::debug;

pub struct IrLowering {
    lowered_nodes: HashMap<NodeId, NodeId>,
    modified: Vec<RegionId>,
}

impl IrLowering {
    pub fn new() -> IrLowering {
        IrLowering {
            lowered_nodes: HashMap::new(),
            modified: Vec::new(),
        }
    }

    fn process_region(&mut self, module: &mut Module, region: RegionId) -> usize {
        let mut lowered = 0usize;
        let nodes = module.region(region).nodes().to_vec();
        for node in nodes {
            match module.node(node).op {
                Opcode::Access => {
                    if self.lower_access_node(module, region, node) {
                        lowered += 1;
                    }
                }
                Opcode::Call => {
                    if self.normalize_call(module, region, node) {
                        lowered += 1;
                    }
                }
                _ => {}
            }
        }
        lowered
    }

    /// `Access(container, selector)` -> `PtrAdd(base, Lit(offset))`.
    ///
    /// The offset falls out of the container's layout: field offset
    /// under natural alignment for structs, element stride for arrays.
    /// Containers whose layout is not computable from the type payload
    /// are left for the front-end to flatten first.
    fn lower_access_node(&mut self, module: &mut Module, region: RegionId, node: NodeId) -> bool {
        if self.lowered_nodes.contains_key(&node) {
            return false;
        }
        let inputs = module.node(node).inputs.clone();
        if inputs.len() != 2 {
            return false;
        }
        let (container, selector) = (inputs[0], inputs[1]);
        if module.node(selector).op != Opcode::Lit {
            return false;
        }
        let index = module.extract_literal_value(selector);
        if index < 0 {
            return false;
        }
        let index = index as usize;

        let (offset, element) = match &module.node(container).value {
            Value::Struct(sv) => {
                let Some(offset) = struct_field_offset(&sv.fields, index) else {
                    return false;
                };
                (offset, sv.fields[index])
            }
            Value::Array(av) => {
                let Some(size) = av.elem.size_bytes() else {
                    return false;
                };
                (size * index as u64, av.elem)
            }
            _ => return false,
        };

        let base = if module.node(container).ty == DataType::Pointer {
            container
        } else {
            let container_ty = module.node(container).ty;
            let addr = NodeBuilder::new(Opcode::AddrOf)
                .ty(DataType::Pointer)
                .value(Value::Pointer(PointerValue {
                    pointee: container_ty,
                }))
                .operand(container)
                .build_detached(module);
            module.insert_before(region, node, addr);
            addr
        };

        let offset_lit =
            NodeBuilder::lit(Value::Int64(offset as i64)).build_detached(module);
        module.insert_before(region, node, offset_lit);

        let ptr_add = NodeBuilder::new(Opcode::PtrAdd)
            .ty(DataType::Pointer)
            .value(Value::Pointer(PointerValue { pointee: element }))
            .operands([base, offset_lit])
            .build_detached(module);
        module.replace(region, node, ptr_add, true);

        self.lowered_nodes.insert(node, ptr_add);
        self.mark_modified(region);
        true
    }

    /// Normalize a call into the canonical calling sequence: every
    /// argument evaluated in operand order, immediately before the
    /// call node.
    fn normalize_call(&mut self, module: &mut Module, region: RegionId, node: NodeId) -> bool {
        let inputs = module.node(node).inputs.clone();
        let mut moved = false;
        for arg in inputs {
            if module.node(arg).parent != Some(region) {
                continue;
            }
            let nodes = module.region(region).nodes();
            let arg_pos = nodes.iter().position(|&n| n == arg);
            let call_pos = nodes.iter().position(|&n| n == node);
            if let (Some(arg_pos), Some(call_pos)) = (arg_pos, call_pos) {
                if arg_pos > call_pos {
                    module.remove(region, arg);
                    module.insert_before(region, node, arg);
                    moved = true;
                }
            }
        }
        if moved {
            self.mark_modified(region);
        }
        moved
    }

    fn mark_modified(&mut self, region: RegionId) {
        if !self.modified.contains(&region) {
            self.modified.push(region);
        }
    }
}

impl Default for IrLowering {
    fn default() -> IrLowering {
        IrLowering::new()
    }
}

impl Pass for IrLowering {
    fn name(&self) -> &'static str {
        crate::core::ids::IR_LOWERING
    }
}

impl TransformPass for IrLowering {
    fn run(
        &mut self,
        module: &mut Module,
        _analyses: &AnalysisCache,
    ) -> Result<Vec<RegionId>, Report> {
        self.lowered_nodes.clear();
        self.modified.clear();

        // Every function region and its children, transitively.
        let mut stack: Vec<RegionId> = module.region(module.root()).children().to_vec();
        let mut lowered = 0usize;
        while let Some(region) = stack.pop() {
            lowered += self.process_region(module, region);
            stack.extend(module.region(region).children());
        }
        debug!(lowered, "ir lowering finished");
        Ok(std::mem::take(&mut self.modified))
    }
}
