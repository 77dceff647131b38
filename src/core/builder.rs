/*!

   Fluent construction of IR nodes. The builder is the one path through
   which front-ends and passes create nodes: building wires the new
   node into every operand's users list, so the bidirectional edge
   invariant holds from the moment a node exists.

*/

use crate::core::ir::{AtomicOrdering, Node, NodeId, NodeTraits, Opcode};
use crate::core::module::Module;
use crate::core::region::RegionId;
use crate::core::value::{DataType, Value};

#[derive(Debug)]
pub struct NodeBuilder {
    op: Opcode,
    ty: DataType,
    value: Value,
    traits: NodeTraits,
    name: Option<String>,
    inputs: Vec<NodeId>,
    ordering: AtomicOrdering,
}

impl NodeBuilder {
    pub fn new(op: Opcode) -> NodeBuilder {
        NodeBuilder {
            op,
            ty: DataType::Void,
            value: Value::Void,
            traits: NodeTraits::empty(),
            name: None,
            inputs: Vec::new(),
            ordering: AtomicOrdering::RELAXED,
        }
    }

    /// A literal node; the result type is the payload's tag.
    pub fn lit(value: Value) -> NodeBuilder {
        let ty = value.ty();
        NodeBuilder::new(Opcode::Lit).ty(ty).value(value)
    }

    pub fn ty(mut self, ty: DataType) -> NodeBuilder {
        self.ty = ty;
        self
    }

    pub fn value(mut self, value: Value) -> NodeBuilder {
        self.value = value;
        self
    }

    pub fn named(mut self, name: &str) -> NodeBuilder {
        self.name = Some(name.to_owned());
        self
    }

    pub fn traits(mut self, traits: NodeTraits) -> NodeBuilder {
        self.traits = traits;
        self
    }

    pub fn ordering(mut self, ordering: AtomicOrdering) -> NodeBuilder {
        self.ordering = ordering;
        self
    }

    pub fn operand(mut self, input: NodeId) -> NodeBuilder {
        self.inputs.push(input);
        self
    }

    pub fn operands(mut self, inputs: impl IntoIterator<Item = NodeId>) -> NodeBuilder {
        self.inputs.extend(inputs);
        self
    }

    /// Allocate the node and wire its operand edges without attaching
    /// it to a region. Transform passes use this to make replacement
    /// nodes that `Module::replace` then splices in.
    pub fn build_detached(self, module: &mut Module) -> NodeId {
        let name = match self.name {
            Some(name) => module.intern(&name),
            None => crate::core::strtab::StringId::EMPTY,
        };
        let mut node = Node::new(self.op, self.ty);
        node.value = self.value;
        node.traits = self.traits;
        node.name = name;
        node.ordering = self.ordering;
        node.inputs = self.inputs.clone();
        let id = module.alloc_node(node);
        for input in self.inputs {
            let users = &mut module.node_mut(input).users;
            if !users.contains(&id) {
                users.push(id);
            }
        }
        id
    }

    /// Build and append to `region`.
    pub fn build(self, module: &mut Module, region: RegionId) -> NodeId {
        let id = self.build_detached(module);
        module.append(region, id);
        id
    }
}
