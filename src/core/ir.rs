//! The atomic IR element: opcodes, node traits, atomic orderings, and
//! the [`Node`] struct itself. Nodes live in the module arena and refer
//! to each other by [`NodeId`]; the inputs/users lists are maintained
//! bidirectionally by the mutators on [`Module`](crate::core::Module).

use crate::core::region::RegionId;
use crate::core::strtab::StringId;
use crate::core::value::{DataType, Value};
use bitflags::bitflags;
use std::fmt;

/// Stable identity of a node for the lifetime of its module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(id: usize) -> NodeId {
        NodeId(id as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// The closed set of operations a node can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Entry point of a region. Jump targets are entry nodes.
    Entry,
    /// Exit point of a region or function.
    Exit,
    /// Function parameter.
    Param,
    /// Literal value; the payload lives in `Node::value`.
    Lit,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
    Band,
    Bor,
    Bxor,
    Bnot,
    Bshl,
    Bshr,
    Ret,
    /// Function definition; registered in the module roster.
    Function,
    Call,
    /// Call with exception handling or unwind edges.
    Invoke,
    Jump,
    Branch,
    /// Merge of values flowing in from predecessor regions.
    From,
    /// Stack allocation.
    Alloc,
    Load,
    Store,
    /// Address of a named location.
    AddrOf,
    PtrLoad,
    PtrStore,
    PtrAdd,
    /// Value-converting cast between numeric types.
    Cast,
    /// Bitwise reinterpretation; never value-folded.
    ReinterpretCast,
    AtomicLoad,
    AtomicStore,
    AtomicCas,
    /// Composite address computation; lowered to `PtrAdd`.
    Access,
    VectorBuild,
    VectorExtract,
    VectorSplat,
}

impl Opcode {
    /// Whether this opcode terminates a region.
    pub const fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Ret | Opcode::Jump | Opcode::Branch | Opcode::Invoke
        )
    }
}

bitflags! {
    /// Linkage, optimization, and language-level attributes of a node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeTraits: u16 {
        /// Internal linkage.
        const STATIC = 1 << 0;
        /// Evaluable at compile time.
        const CONSTEXPR = 1 << 1;
        /// External linkage.
        const EXTERN = 1 << 2;
        /// Program entry point.
        const DRIVER = 1 << 3;
        /// Symbol resolved across modules.
        const EXPORT = 1 << 4;
        /// Must not be optimized.
        const VOLATILE = 1 << 5;
        /// Placed in the read-only data section.
        const READONLY = 1 << 6;
    }
}

impl Default for NodeTraits {
    fn default() -> NodeTraits {
        NodeTraits::empty()
    }
}

bitflags! {
    /// Memory ordering of an atomic operation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AtomicOrdering: u8 {
        const ACQUIRE = 1 << 0;
        const RELEASE = 1 << 1;
        /// Prefer load-linked/store-conditional sequences on targets
        /// that have them.
        const EXCLUSIVE = 1 << 4;
        const ACQ_REL = Self::ACQUIRE.bits() | Self::RELEASE.bits();
        const SEQ_CST = Self::ACQUIRE.bits() | Self::RELEASE.bits() | (1 << 3);
    }
}

impl AtomicOrdering {
    /// No ordering constraints.
    pub const RELAXED: AtomicOrdering = AtomicOrdering::empty();
}

impl Default for AtomicOrdering {
    fn default() -> AtomicOrdering {
        AtomicOrdering::RELAXED
    }
}

/// A single IR operation.
///
/// Invariant: for every `p` in `inputs`, this node is in `p.users`, and
/// for every `u` in `users`, this node is in `u.inputs`. `users` is
/// set-like (each consumer appears once). All mutators on `Module`
/// preserve this.
#[derive(Clone, Debug)]
pub struct Node {
    pub op: Opcode,
    pub ty: DataType,
    pub value: Value,
    pub traits: NodeTraits,
    pub name: StringId,
    pub inputs: Vec<NodeId>,
    pub users: Vec<NodeId>,
    pub parent: Option<RegionId>,
    pub ordering: AtomicOrdering,
}

impl Node {
    pub fn new(op: Opcode, ty: DataType) -> Node {
        Node {
            op,
            ty,
            value: Value::Void,
            traits: NodeTraits::empty(),
            name: StringId::EMPTY,
            inputs: Vec::new(),
            users: Vec::new(),
            parent: None,
            ordering: AtomicOrdering::RELAXED,
        }
    }
}

/// Signed representation of an integer literal, widened to 64 bits.
/// Anything that is not an integer literal yields 0 ("not applicable").
pub fn extract_literal_value(node: &Node) -> i64 {
    if node.op != Opcode::Lit {
        return 0;
    }
    match node.value {
        Value::Int8(v) => i64::from(v),
        Value::Int16(v) => i64::from(v),
        Value::Int32(v) => i64::from(v),
        Value::Int64(v) => v,
        Value::Uint8(v) => i64::from(v),
        Value::Uint16(v) => i64::from(v),
        Value::Uint32(v) => i64::from(v),
        Value::Uint64(v) => v as i64,
        _ => 0,
    }
}
