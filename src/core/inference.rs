//! Binary type promotion. Folding and the front-end both call
//! [`infer_binary_t`] to bring two operand nodes to a common type
//! before evaluating an operation; the promoted type is written back
//! into both nodes (and into vector element tags for vectors).

use crate::core::ir::Node;
use crate::core::value::{DataType, Value};

/// Promote both operand nodes in place to a common type.
///
/// Returns false for incompatible operands: any `Void`, a vector mixed
/// with a scalar, or any `Pointer`/`Array`/`Struct`/`Function` operand
/// (those require explicit casts).
pub fn infer_binary_t(lhs: &mut Node, rhs: &mut Node) -> bool {
    let lhs_type = lhs.ty;
    let rhs_type = rhs.ty;

    if lhs_type == rhs_type {
        if lhs_type == DataType::Vector {
            return promote_vector_elems(lhs, rhs);
        }
        // Identical non-vector types need no promotion.
        return true;
    }

    if lhs_type == DataType::Void || rhs_type == DataType::Void {
        return false;
    }

    if lhs_type == DataType::Vector || rhs_type == DataType::Vector {
        // Vector-scalar mixing is prohibited: it is ambiguous whether
        // to broadcast the scalar or extract vector elements.
        if lhs_type != DataType::Vector || rhs_type != DataType::Vector {
            return false;
        }
        return promote_vector_elems(lhs, rhs);
    }

    let promoted = infer_primitive_types(lhs_type, rhs_type);
    if promoted == DataType::Void {
        return false;
    }
    lhs.ty = promoted;
    rhs.ty = promoted;
    true
}

fn promote_vector_elems(lhs: &mut Node, rhs: &mut Node) -> bool {
    let (lhs_elem, rhs_elem) = match (&lhs.value, &rhs.value) {
        (Value::Vector(a), Value::Vector(b)) => (a.elem, b.elem),
        _ => return false,
    };
    if lhs_elem == rhs_elem {
        return true;
    }
    let promoted = infer_primitive_types(lhs_elem, rhs_elem);
    if promoted == DataType::Void {
        return false;
    }
    if let Value::Vector(v) = &mut lhs.value {
        v.elem = promoted;
    }
    if let Value::Vector(v) = &mut rhs.value {
        v.elem = promoted;
    }
    true
}

/// Common type of two primitive operands, or `Void` when no implicit
/// promotion exists.
pub fn infer_primitive_types(mut lhs: DataType, mut rhs: DataType) -> DataType {
    if lhs == rhs {
        return lhs;
    }

    // Composite and pointer operands require explicit casts; implicit
    // promotion would hide pointer arithmetic and struct mixing.
    if matches!(
        lhs,
        DataType::Pointer | DataType::Array | DataType::Struct | DataType::Function | DataType::Vector
    ) || matches!(
        rhs,
        DataType::Pointer | DataType::Array | DataType::Struct | DataType::Function | DataType::Vector
    ) {
        return DataType::Void;
    }

    // Bool arithmetic behaves as int32, the C convention.
    if lhs == DataType::Bool {
        lhs = DataType::Int32;
    }
    if rhs == DataType::Bool {
        rhs = DataType::Int32;
    }

    // Mixed float arithmetic widens to float64; float32 survives only
    // when both sides already are float32.
    if lhs.is_float() || rhs.is_float() {
        if lhs == DataType::Float32 && rhs == DataType::Float32 {
            return DataType::Float32;
        }
        return DataType::Float64;
    }

    if !lhs.is_integer() || !rhs.is_integer() {
        return DataType::Void;
    }

    // Subword operands widen to int32 first, matching target register
    // widths.
    if lhs.integer_rank() < DataType::Int32.integer_rank() {
        lhs = DataType::Int32;
    }
    if rhs.integer_rank() < DataType::Int32.integer_rank() {
        rhs = DataType::Int32;
    }

    if lhs == rhs {
        return lhs;
    }

    let lhs_rank = lhs.integer_rank();
    let rhs_rank = rhs.integer_rank();
    if lhs_rank == rhs_rank {
        // Mixed signedness at equal rank promotes to the next larger
        // signed type; uint64 is the exception since no larger signed
        // type exists.
        return match lhs_rank {
            2 => DataType::Int64,
            3 => DataType::Uint64,
            _ => DataType::Void,
        };
    }

    if lhs_rank > rhs_rank {
        lhs
    } else {
        rhs
    }
}
