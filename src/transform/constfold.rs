//! Worklist-driven constant folding.
//!
//! Candidates are collected from every region, then processed FIFO:
//! when every input of an eligible node is a literal, the node is
//! evaluated under the type-promotion rules and replaced by a literal
//! node; the users of the replacement are re-enqueued so folding
//! cascades through the graph. Division and modulus by zero are never
//! folded, shift amounts are masked to the left operand's bit width,
//! and a branch on a literal condition degrades to a jump.

use crate::core::{
    infer_binary_t, AnalysisCache, DataType, Module, Node, NodeBuilder, NodeId, Opcode, Pass,
    RegionId, TransformPass, Value,
};
use color_eyre::Report;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

pub struct ConstantFolding {
    worklist: VecDeque<NodeId>,
    in_worklist: HashSet<NodeId>,
    not_foldable: HashSet<NodeId>,
    modified: Vec<RegionId>,
}

impl ConstantFolding {
    pub fn new() -> ConstantFolding {
        ConstantFolding {
            worklist: VecDeque::new(),
            in_worklist: HashSet::new(),
            not_foldable: HashSet::new(),
            modified: Vec::new(),
        }
    }

    fn enqueue(&mut self, node: NodeId) {
        if self.in_worklist.insert(node) {
            self.worklist.push_back(node);
        }
    }

    fn collect_nodes(&mut self, module: &Module) {
        for region in module.region_ids() {
            for &node in module.region(region).nodes() {
                if is_fold_candidate(module.node(node).op) {
                    self.enqueue(node);
                }
            }
        }
    }

    fn process_node(&mut self, module: &mut Module, node: NodeId) -> bool {
        let Some(region) = module.node(node).parent else {
            // Already replaced by an earlier fold.
            return false;
        };
        let op = module.node(node).op;
        if !is_fold_candidate(op) || self.not_foldable.contains(&node) {
            return false;
        }
        if !inputs_ready(module, node) {
            return false;
        }

        let Some(folded) = self.create_folded(module, node) else {
            self.not_foldable.insert(node);
            return false;
        };

        module.replace(region, node, folded, true);
        if !self.modified.contains(&region) {
            self.modified.push(region);
        }
        // Folding may cascade: every consumer of the replacement is a
        // candidate again.
        for user in module.node(folded).users.clone() {
            self.enqueue(user);
        }
        true
    }

    fn create_folded(&mut self, module: &mut Module, node: NodeId) -> Option<NodeId> {
        let op = module.node(node).op;
        let replacement = match op {
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                fold_arith(module, node)?
            }
            Opcode::Eq | Opcode::Neq | Opcode::Lt | Opcode::Lte | Opcode::Gt | Opcode::Gte => {
                fold_cmp(module, node)?
            }
            Opcode::Band | Opcode::Bor | Opcode::Bxor => fold_bitwise(module, node)?,
            Opcode::Bshl | Opcode::Bshr => fold_shift(module, node)?,
            Opcode::Bnot => fold_unary(module, node)?,
            Opcode::Cast => fold_cast(module, node)?,
            Opcode::From => fold_from(module, node)?,
            Opcode::Branch => {
                let target = fold_branch(module, node)?;
                return Some(
                    NodeBuilder::new(Opcode::Jump)
                        .ty(DataType::Void)
                        .operand(target)
                        .build_detached(module),
                );
            }
            _ => return None,
        };
        Some(NodeBuilder::lit(replacement).build_detached(module))
    }
}

impl Default for ConstantFolding {
    fn default() -> ConstantFolding {
        ConstantFolding::new()
    }
}

impl Pass for ConstantFolding {
    fn name(&self) -> &'static str {
        crate::core::ids::CONSTANT_FOLDING
    }
}

impl TransformPass for ConstantFolding {
    fn run(
        &mut self,
        module: &mut Module,
        _analyses: &AnalysisCache,
    ) -> Result<Vec<RegionId>, Report> {
        self.worklist.clear();
        self.in_worklist.clear();
        self.not_foldable.clear();
        self.modified.clear();

        self.collect_nodes(module);
        let mut folded = 0usize;
        while let Some(node) = self.worklist.pop_front() {
            self.in_worklist.remove(&node);
            if self.process_node(module, node) {
                folded += 1;
            }
        }
        debug!(folded, "constant folding finished");
        Ok(std::mem::take(&mut self.modified))
    }
}

fn is_fold_candidate(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Eq
            | Opcode::Neq
            | Opcode::Lt
            | Opcode::Lte
            | Opcode::Gt
            | Opcode::Gte
            | Opcode::Band
            | Opcode::Bor
            | Opcode::Bxor
            | Opcode::Bshl
            | Opcode::Bshr
            | Opcode::Bnot
            | Opcode::Cast
            | Opcode::From
            | Opcode::Branch
    )
}

/// A branch needs only a literal condition; everything else needs every
/// input to be a literal.
fn inputs_ready(module: &Module, node: NodeId) -> bool {
    let n = module.node(node);
    match n.op {
        Opcode::Branch => n
            .inputs
            .first()
            .is_some_and(|&cond| module.node(cond).op == Opcode::Lit),
        _ => {
            !n.inputs.is_empty()
                && n.inputs
                    .iter()
                    .all(|&input| module.node(input).op == Opcode::Lit)
        }
    }
}

fn binary_inputs(module: &Module, node: NodeId) -> Option<(NodeId, NodeId)> {
    let inputs = &module.node(node).inputs;
    if inputs.len() != 2 {
        return None;
    }
    Some((inputs[0], inputs[1]))
}

/// Promote both operands in place and coerce their literal payloads to
/// the promoted type. Returns the promoted type.
fn promote_operands(module: &mut Module, lhs: NodeId, rhs: NodeId) -> Option<DataType> {
    if lhs == rhs {
        return Some(module.node(lhs).ty);
    }
    let (a, b) = module.node_pair_mut(lhs, rhs);
    if !infer_binary_t(a, b) {
        return None;
    }
    coerce_literal(a)?;
    coerce_literal(b)?;
    Some(module.node(lhs).ty)
}

/// Keep a literal's payload tag in sync with its (possibly promoted)
/// result type.
fn coerce_literal(node: &mut Node) -> Option<()> {
    if node.op != Opcode::Lit || node.value.ty() == node.ty {
        return Some(());
    }
    node.value = convert_literal(&node.value, node.ty)?;
    Some(())
}

fn fold_arith(module: &mut Module, node: NodeId) -> Option<Value> {
    let op = module.node(node).op;
    let (lhs, rhs) = binary_inputs(module, node)?;
    let ty = promote_operands(module, lhs, rhs)?;

    if ty.is_signed_integer() {
        let a = lit_i64(module.node(lhs))?;
        let b = lit_i64(module.node(rhs))?;
        if matches!(op, Opcode::Div | Opcode::Mod) && b == 0 {
            return None;
        }
        let r = match op {
            Opcode::Add => a.wrapping_add(b),
            Opcode::Sub => a.wrapping_sub(b),
            Opcode::Mul => a.wrapping_mul(b),
            Opcode::Div => a.wrapping_div(b),
            Opcode::Mod => a.wrapping_rem(b),
            _ => return None,
        };
        value_from_i64(ty, r)
    } else if ty.is_unsigned_integer() {
        let a = lit_u64(module.node(lhs))?;
        let b = lit_u64(module.node(rhs))?;
        if matches!(op, Opcode::Div | Opcode::Mod) && b == 0 {
            return None;
        }
        let r = match op {
            Opcode::Add => a.wrapping_add(b),
            Opcode::Sub => a.wrapping_sub(b),
            Opcode::Mul => a.wrapping_mul(b),
            Opcode::Div => a / b,
            Opcode::Mod => a % b,
            _ => return None,
        };
        value_from_bits(ty, r)
    } else if ty.is_float() {
        let a = lit_f64(module.node(lhs))?;
        let b = lit_f64(module.node(rhs))?;
        if matches!(op, Opcode::Div | Opcode::Mod) && b == 0.0 {
            return None;
        }
        let r = match op {
            Opcode::Add => a + b,
            Opcode::Sub => a - b,
            Opcode::Mul => a * b,
            Opcode::Div => a / b,
            Opcode::Mod => a % b,
            _ => return None,
        };
        Some(match ty {
            DataType::Float32 => Value::Float32(r as f32),
            _ => Value::Float64(r),
        })
    } else {
        None
    }
}

fn fold_cmp(module: &mut Module, node: NodeId) -> Option<Value> {
    let op = module.node(node).op;
    let (lhs, rhs) = binary_inputs(module, node)?;
    let ty = promote_operands(module, lhs, rhs)?;

    let result = if ty.is_signed_integer() {
        let a = lit_i64(module.node(lhs))?;
        let b = lit_i64(module.node(rhs))?;
        compare(op, a, b)?
    } else if ty.is_unsigned_integer() {
        let a = lit_u64(module.node(lhs))?;
        let b = lit_u64(module.node(rhs))?;
        compare(op, a, b)?
    } else if ty.is_float() {
        let a = lit_f64(module.node(lhs))?;
        let b = lit_f64(module.node(rhs))?;
        match op {
            Opcode::Eq => a == b,
            Opcode::Neq => a != b,
            Opcode::Lt => a < b,
            Opcode::Lte => a <= b,
            Opcode::Gt => a > b,
            Opcode::Gte => a >= b,
            _ => return None,
        }
    } else if ty == DataType::Bool {
        let a = lit_bool(module.node(lhs))?;
        let b = lit_bool(module.node(rhs))?;
        match op {
            Opcode::Eq => a == b,
            Opcode::Neq => a != b,
            _ => return None,
        }
    } else {
        return None;
    };
    Some(Value::Bool(result))
}

fn compare<T: Ord>(op: Opcode, a: T, b: T) -> Option<bool> {
    Some(match op {
        Opcode::Eq => a == b,
        Opcode::Neq => a != b,
        Opcode::Lt => a < b,
        Opcode::Lte => a <= b,
        Opcode::Gt => a > b,
        Opcode::Gte => a >= b,
        _ => return None,
    })
}

fn fold_bitwise(module: &mut Module, node: NodeId) -> Option<Value> {
    let op = module.node(node).op;
    let (lhs, rhs) = binary_inputs(module, node)?;
    let ty = promote_operands(module, lhs, rhs)?;
    if !ty.is_integer() {
        return None;
    }
    // Two's-complement bit patterns; signedness only matters when the
    // result is reconstructed.
    let a = lit_bits(module.node(lhs))?;
    let b = lit_bits(module.node(rhs))?;
    let r = match op {
        Opcode::Band => a & b,
        Opcode::Bor => a | b,
        Opcode::Bxor => a ^ b,
        _ => return None,
    };
    value_from_bits(ty, r)
}

fn fold_shift(module: &mut Module, node: NodeId) -> Option<Value> {
    let op = module.node(node).op;
    let (lhs, rhs) = binary_inputs(module, node)?;
    let ty = module.node(lhs).ty;
    let width = ty.bit_width();
    if width == 0 {
        return None;
    }
    // The shift amount is masked to the left operand's bit width.
    let amount = (lit_bits(module.node(rhs))? as u32) & (width - 1);
    match op {
        Opcode::Bshl => {
            let bits = lit_bits(module.node(lhs))?;
            value_from_bits(ty, bits << amount)
        }
        Opcode::Bshr if ty.is_signed_integer() => {
            let value = lit_i64(module.node(lhs))?;
            value_from_i64(ty, value >> amount)
        }
        Opcode::Bshr => {
            let bits = lit_bits(module.node(lhs))?;
            value_from_bits(ty, bits >> amount)
        }
        _ => None,
    }
}

fn fold_unary(module: &mut Module, node: NodeId) -> Option<Value> {
    let inputs = &module.node(node).inputs;
    if inputs.len() != 1 {
        return None;
    }
    let input = module.node(inputs[0]);
    let ty = input.ty;
    if !ty.is_integer() {
        return None;
    }
    let bits = lit_bits(input)?;
    value_from_bits(ty, !bits)
}

fn fold_cast(module: &mut Module, node: NodeId) -> Option<Value> {
    let target = module.node(node).ty;
    let inputs = &module.node(node).inputs;
    if inputs.len() != 1 {
        return None;
    }
    convert_literal(&module.node(inputs[0]).value, target)
}

/// A `From` merge folds when every incoming value is the same literal.
fn fold_from(module: &mut Module, node: NodeId) -> Option<Value> {
    let inputs = module.node(node).inputs.clone();
    let (&first, rest) = inputs.split_first()?;
    let first = module.node(first);
    for &other in rest {
        let other = module.node(other);
        if other.ty != first.ty || other.value != first.value {
            return None;
        }
    }
    Some(first.value.clone())
}

/// A branch on a literal condition becomes a jump to the matching
/// successor.
fn fold_branch(module: &mut Module, node: NodeId) -> Option<NodeId> {
    let inputs = &module.node(node).inputs;
    if inputs.len() != 3 {
        return None;
    }
    let taken = match &module.node(inputs[0]).value {
        Value::Bool(b) => *b,
        Value::Int8(v) => *v != 0,
        Value::Int16(v) => *v != 0,
        Value::Int32(v) => *v != 0,
        Value::Int64(v) => *v != 0,
        Value::Uint8(v) => *v != 0,
        Value::Uint16(v) => *v != 0,
        Value::Uint32(v) => *v != 0,
        Value::Uint64(v) => *v != 0,
        _ => return None,
    };
    Some(if taken { inputs[1] } else { inputs[2] })
}

/////
///// Literal payload access and reconstruction.
/////

fn lit_bool(node: &Node) -> Option<bool> {
    match node.value {
        Value::Bool(v) => Some(v),
        _ => None,
    }
}

fn lit_i64(node: &Node) -> Option<i64> {
    match node.value {
        Value::Int8(v) => Some(i64::from(v)),
        Value::Int16(v) => Some(i64::from(v)),
        Value::Int32(v) => Some(i64::from(v)),
        Value::Int64(v) => Some(v),
        Value::Uint8(v) => Some(i64::from(v)),
        Value::Uint16(v) => Some(i64::from(v)),
        Value::Uint32(v) => Some(i64::from(v)),
        Value::Uint64(v) => Some(v as i64),
        _ => None,
    }
}

fn lit_u64(node: &Node) -> Option<u64> {
    match node.value {
        Value::Uint8(v) => Some(u64::from(v)),
        Value::Uint16(v) => Some(u64::from(v)),
        Value::Uint32(v) => Some(u64::from(v)),
        Value::Uint64(v) => Some(v),
        Value::Int8(v) => Some(v as u64),
        Value::Int16(v) => Some(v as u64),
        Value::Int32(v) => Some(v as u64),
        Value::Int64(v) => Some(v as u64),
        _ => None,
    }
}

/// Raw two's-complement bit pattern of an integer literal.
fn lit_bits(node: &Node) -> Option<u64> {
    match node.value {
        Value::Int8(v) => Some(v as u8 as u64),
        Value::Int16(v) => Some(v as u16 as u64),
        Value::Int32(v) => Some(v as u32 as u64),
        Value::Int64(v) => Some(v as u64),
        _ => lit_u64(node),
    }
}

fn lit_f64(node: &Node) -> Option<f64> {
    match node.value {
        Value::Float32(v) => Some(f64::from(v)),
        Value::Float64(v) => Some(v),
        _ => None,
    }
}

fn value_from_i64(ty: DataType, v: i64) -> Option<Value> {
    Some(match ty {
        DataType::Int8 => Value::Int8(v as i8),
        DataType::Int16 => Value::Int16(v as i16),
        DataType::Int32 => Value::Int32(v as i32),
        DataType::Int64 => Value::Int64(v),
        _ => return value_from_bits(ty, v as u64),
    })
}

/// Truncate a 64-bit pattern back into the given integer type.
fn value_from_bits(ty: DataType, bits: u64) -> Option<Value> {
    Some(match ty {
        DataType::Int8 => Value::Int8(bits as u8 as i8),
        DataType::Int16 => Value::Int16(bits as u16 as i16),
        DataType::Int32 => Value::Int32(bits as u32 as i32),
        DataType::Int64 => Value::Int64(bits as i64),
        DataType::Uint8 => Value::Uint8(bits as u8),
        DataType::Uint16 => Value::Uint16(bits as u16),
        DataType::Uint32 => Value::Uint32(bits as u32),
        DataType::Uint64 => Value::Uint64(bits),
        _ => return None,
    })
}

/// Numeric value conversion between literal payloads, used both for
/// promoted operands and for `Cast` folding.
fn convert_literal(value: &Value, to: DataType) -> Option<Value> {
    enum Num {
        S(i64),
        U(u64),
        F(f64),
    }
    let num = match value {
        Value::Bool(v) => Num::S(i64::from(*v)),
        Value::Int8(v) => Num::S(i64::from(*v)),
        Value::Int16(v) => Num::S(i64::from(*v)),
        Value::Int32(v) => Num::S(i64::from(*v)),
        Value::Int64(v) => Num::S(*v),
        Value::Uint8(v) => Num::U(u64::from(*v)),
        Value::Uint16(v) => Num::U(u64::from(*v)),
        Value::Uint32(v) => Num::U(u64::from(*v)),
        Value::Uint64(v) => Num::U(*v),
        Value::Float32(v) => Num::F(f64::from(*v)),
        Value::Float64(v) => Num::F(*v),
        _ => return None,
    };
    Some(match (num, to) {
        (Num::S(v), DataType::Bool) => Value::Bool(v != 0),
        (Num::U(v), DataType::Bool) => Value::Bool(v != 0),
        (Num::F(v), DataType::Bool) => Value::Bool(v != 0.0),
        (Num::S(v), DataType::Float32) => Value::Float32(v as f32),
        (Num::U(v), DataType::Float32) => Value::Float32(v as f32),
        (Num::F(v), DataType::Float32) => Value::Float32(v as f32),
        (Num::S(v), DataType::Float64) => Value::Float64(v as f64),
        (Num::U(v), DataType::Float64) => Value::Float64(v as f64),
        (Num::F(v), DataType::Float64) => Value::Float64(v),
        (Num::S(v), _) => return value_from_i64(to, v),
        (Num::U(v), _) => return value_from_bits(to, v),
        (Num::F(v), _) if to.is_integer() => return value_from_i64(to, v as i64),
        _ => return None,
    })
}
