use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::interpreter::type_system::{conform_to_node, is_truthy};
use crate::memory::value::{Instance, InstanceRef, Payload, PointerInstance, Primitive};
use crate::tree::{BinaryOp, Node, PrimitiveKind};
use std::cmp::Ordering;

/// A binary operand reduced to what the operator needs
#[derive(Clone)]
enum Operand {
    Pointer(PointerInstance),
    Number(Primitive),
    /// Empty slot, read as zero
    Absent,
}

fn operand(value: &InstanceRef) -> Result<Operand, RuntimeError> {
    match &*value.flatten().borrow() {
        Instance::Primitive(primitive) => Ok(Operand::Number(*primitive)),
        Instance::Pointer(pointer) => Ok(Operand::Pointer(pointer.clone())),
        Instance::Array(array) => Ok(Operand::Pointer(array.decay())),
        Instance::Nullable(_) => Ok(Operand::Absent),
        Instance::Compound(compound) => Err(RuntimeError::malformed(format!(
            "{} used as an operand",
            compound.ty
        ))),
    }
}

impl Operand {
    fn truth(&self) -> bool {
        match self {
            Operand::Pointer(pointer) => !pointer.is_null(),
            Operand::Number(number) => !number.is_zero(),
            Operand::Absent => false,
        }
    }
}

/// Apply `op` to two evaluated operands
pub(crate) fn binary_operation(
    op: BinaryOp,
    left: &InstanceRef,
    right: &InstanceRef,
) -> Result<InstanceRef, RuntimeError> {
    operate(op, operand(left)?, operand(right)?)
}

fn operate(op: BinaryOp, left: Operand, right: Operand) -> Result<InstanceRef, RuntimeError> {
    if op.is_logical() {
        let truth = match op {
            BinaryOp::And => left.truth() && right.truth(),
            _ => left.truth() || right.truth(),
        };
        return Ok(InstanceRef::primitive(Primitive::truth(truth)));
    }
    match (left, right) {
        (Operand::Pointer(left), Operand::Pointer(right)) => pointer_pair(op, &left, &right),
        (Operand::Pointer(pointer), Operand::Number(offset)) => {
            pointer_and_number(op, &pointer, offset, false)
        }
        (Operand::Number(offset), Operand::Pointer(pointer)) => {
            pointer_and_number(op, &pointer, offset, true)
        }
        (Operand::Pointer(pointer), Operand::Absent)
        | (Operand::Absent, Operand::Pointer(pointer)) => null_comparison(op, &pointer),
        (Operand::Number(left), Operand::Number(right)) => arithmetic(op, left, right),
        (Operand::Number(left), Operand::Absent) => {
            arithmetic(op, left, Primitive::zero(left.kind, left.unsigned))
        }
        (Operand::Absent, Operand::Number(right)) => {
            arithmetic(op, Primitive::zero(right.kind, right.unsigned), right)
        }
        (Operand::Absent, Operand::Absent) => arithmetic(op, Primitive::int(0), Primitive::int(0)),
    }
}

fn compared(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

fn truth(value: bool) -> Result<InstanceRef, RuntimeError> {
    Ok(InstanceRef::primitive(Primitive::truth(value)))
}

/// Pointers compare by where they point, never by what they point at
fn pointer_pair(
    op: BinaryOp,
    left: &PointerInstance,
    right: &PointerInstance,
) -> Result<InstanceRef, RuntimeError> {
    // Against the null pointer itself, a freed slot still reads as null
    if left.has_no_storage() && matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        return null_comparison(op, right);
    }
    if right.has_no_storage() && matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        return null_comparison(op, left);
    }
    match op {
        BinaryOp::Eq => truth(left.same_target(right)),
        BinaryOp::Ne => truth(!left.same_target(right)),
        _ if op.is_comparison() => truth(compared(op, left.address().cmp(&right.address()))),
        BinaryOp::Sub => Ok(InstanceRef::primitive(Primitive::long(
            left.offset.wrapping_sub(right.offset),
        ))),
        _ => Err(RuntimeError::malformed(format!(
            "operator '{}' applied to two pointers",
            op.symbol()
        ))),
    }
}

fn null_comparison(op: BinaryOp, pointer: &PointerInstance) -> Result<InstanceRef, RuntimeError> {
    match op {
        BinaryOp::Eq => truth(pointer.is_null()),
        BinaryOp::Ne => truth(!pointer.is_null()),
        _ if op.is_comparison() => {
            let ordering = if pointer.is_null() {
                Ordering::Equal
            } else {
                Ordering::Greater
            };
            truth(compared(op, ordering))
        }
        _ => Err(RuntimeError::malformed(format!(
            "operator '{}' applied to a pointer and an absent value",
            op.symbol()
        ))),
    }
}

fn pointer_and_number(
    op: BinaryOp,
    pointer: &PointerInstance,
    number: Primitive,
    number_first: bool,
) -> Result<InstanceRef, RuntimeError> {
    if op.is_comparison() {
        // Only the zero literal compares against a pointer, as null
        if number.is_zero() {
            return null_comparison(op, pointer);
        }
        return Err(RuntimeError::malformed(format!(
            "comparison of a pointer with the integer {}",
            number.as_i64()
        )));
    }
    if number.is_floating() {
        return Err(RuntimeError::malformed("pointer offset by a floating value"));
    }
    let delta = number.as_i64();
    let moved = match op {
        BinaryOp::Add => pointer.offset_by(delta),
        BinaryOp::Sub if !number_first => pointer.offset_by(delta.wrapping_neg()),
        _ => {
            return Err(RuntimeError::malformed(format!(
                "operator '{}' applied to a pointer and an integer",
                op.symbol()
            )))
        }
    };
    Ok(InstanceRef::pointer(moved))
}

/// Kind and signedness both operands are converted to before the operation
fn common_kind(left: &Primitive, right: &Primitive) -> (PrimitiveKind, bool) {
    let kind = left.kind.max(right.kind);
    if kind.is_floating() {
        return (kind, false);
    }
    let kind = kind.max(PrimitiveKind::Int);
    let unsigned = (left.kind == kind && left.unsigned) || (right.kind == kind && right.unsigned);
    (kind, unsigned)
}

fn arithmetic(op: BinaryOp, left: Primitive, right: Primitive) -> Result<InstanceRef, RuntimeError> {
    let (kind, unsigned) = common_kind(&left, &right);
    let result = if kind.is_floating() {
        floating(op, left.as_f64(), right.as_f64(), kind)?
    } else {
        let left = left.converted(kind, unsigned);
        let right = right.converted(kind, unsigned);
        let value = if unsigned {
            unsigned_integral(op, left.as_i64() as u64, right.as_i64() as u64)?
        } else {
            signed_integral(op, left.as_i64(), right.as_i64())?
        };
        match value {
            Some(value) => Primitive::new(kind, unsigned, Payload::Integral(value)),
            None => return comparison_result(op, left.as_i64(), right.as_i64(), unsigned),
        }
    };
    // A char left operand is promoted for the operation and narrowed back
    let narrow = left.kind == PrimitiveKind::Char && !op.is_comparison() && !result.is_floating();
    let result = if narrow {
        result.converted(PrimitiveKind::Char, left.unsigned)
    } else {
        result
    };
    Ok(InstanceRef::primitive(result))
}

fn comparison_result(
    op: BinaryOp,
    left: i64,
    right: i64,
    unsigned: bool,
) -> Result<InstanceRef, RuntimeError> {
    let ordering = if unsigned {
        (left as u64).cmp(&(right as u64))
    } else {
        left.cmp(&right)
    };
    truth(compared(op, ordering))
}

fn floating(op: BinaryOp, left: f64, right: f64, kind: PrimitiveKind) -> Result<Primitive, RuntimeError> {
    let value = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => left % right,
        _ if op.is_comparison() => {
            let holds = match op {
                BinaryOp::Eq => left == right,
                BinaryOp::Ne => left != right,
                BinaryOp::Lt => left < right,
                BinaryOp::Le => left <= right,
                BinaryOp::Gt => left > right,
                _ => left >= right,
            };
            return Ok(Primitive::truth(holds));
        }
        _ => {
            return Err(RuntimeError::malformed(format!(
                "operator '{}' applied to floating operands",
                op.symbol()
            )))
        }
    };
    Ok(Primitive::new(kind, false, Payload::Floating(value)))
}

/// Integral result, or `None` for comparisons
fn signed_integral(op: BinaryOp, left: i64, right: i64) -> Result<Option<i64>, RuntimeError> {
    let value = match op {
        BinaryOp::Add => left.wrapping_add(right),
        BinaryOp::Sub => left.wrapping_sub(right),
        BinaryOp::Mul => left.wrapping_mul(right),
        BinaryOp::Div if right == 0 => return Err(RuntimeError::division_by_zero("Division")),
        BinaryOp::Div => left.wrapping_div(right),
        BinaryOp::Mod if right == 0 => return Err(RuntimeError::division_by_zero("Modulo")),
        BinaryOp::Mod => left.wrapping_rem(right),
        BinaryOp::BitAnd => left & right,
        BinaryOp::BitOr => left | right,
        BinaryOp::BitXor => left ^ right,
        BinaryOp::Shl => left.wrapping_shl(right as u32),
        BinaryOp::Shr => left.wrapping_shr(right as u32),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn unsigned_integral(op: BinaryOp, left: u64, right: u64) -> Result<Option<i64>, RuntimeError> {
    let value = match op {
        BinaryOp::Div if right == 0 => return Err(RuntimeError::division_by_zero("Division")),
        BinaryOp::Div => left / right,
        BinaryOp::Mod if right == 0 => return Err(RuntimeError::division_by_zero("Modulo")),
        BinaryOp::Mod => left % right,
        BinaryOp::Shr => left.wrapping_shr(right as u32),
        _ => return signed_integral(op, left as i64, right as i64),
    };
    Ok(Some(value as i64))
}

impl Interpreter {
    pub(crate) fn evaluate_binary(
        &mut self,
        node: &Node,
        op: BinaryOp,
        lhs: &Node,
        rhs: &Node,
    ) -> Result<Outcome, RuntimeError> {
        if op.is_logical() {
            return self.evaluate_logical(op, lhs, rhs);
        }
        // The left operand is read before the right one is evaluated
        let left = operand(&self.evaluate_value(lhs)?)?;
        let right = operand(&self.evaluate_value(rhs)?)?;
        let result = operate(op, left, right)?;
        self.state.push(conform_to_node(result, &node.ty));
        Ok(Outcome::Normal)
    }

    /// `&&` and `||` skip the right operand once the left decides the result
    fn evaluate_logical(&mut self, op: BinaryOp, lhs: &Node, rhs: &Node) -> Result<Outcome, RuntimeError> {
        let left = is_truthy(&self.evaluate_value(lhs)?)?;
        let result = match (op, left) {
            (BinaryOp::And, false) => false,
            (BinaryOp::Or, true) => true,
            _ => is_truthy(&self.evaluate_value(rhs)?)?,
        };
        self.state.push_primitive(Primitive::truth(result));
        Ok(Outcome::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::create_string;
    use crate::tree::CxType;

    fn int(value: i64) -> InstanceRef {
        InstanceRef::primitive(Primitive::int(value))
    }

    fn apply(op: BinaryOp, left: &InstanceRef, right: &InstanceRef) -> Primitive {
        binary_operation(op, left, right).unwrap().as_primitive().unwrap()
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(apply(BinaryOp::Add, &int(5), &int(3)).as_i64(), 8);
        assert_eq!(apply(BinaryOp::Div, &int(-7), &int(2)).as_i64(), -3);
        assert_eq!(apply(BinaryOp::Mod, &int(-7), &int(2)).as_i64(), -1);
        assert_eq!(apply(BinaryOp::Shl, &int(1), &int(4)).as_i64(), 16);
    }

    #[test]
    fn test_mixed_arithmetic_is_floating() {
        let half = InstanceRef::primitive(Primitive::double(0.5));
        let sum = apply(BinaryOp::Add, &int(1), &half);
        assert_eq!(sum.kind, PrimitiveKind::Double);
        assert_eq!(sum.as_f64(), 1.5);
    }

    #[test]
    fn test_unsigned_comparison() {
        let big = InstanceRef::primitive(Primitive::new(
            PrimitiveKind::Int,
            true,
            Payload::Integral(-1),
        ));
        assert_eq!(apply(BinaryOp::Gt, &big, &int(1)).as_i64(), 1);
    }

    #[test]
    fn test_division_by_zero() {
        let result = binary_operation(BinaryOp::Div, &int(1), &int(0));
        assert!(matches!(result, Err(RuntimeError::DivisionByZero { .. })));
        let result = binary_operation(BinaryOp::Mod, &int(1), &int(0));
        assert!(matches!(result, Err(RuntimeError::DivisionByZero { .. })));
    }

    #[test]
    fn test_char_arithmetic_narrows_back() {
        let letter = InstanceRef::primitive(Primitive::char(b'a'));
        let next = apply(BinaryOp::Add, &letter, &int(1));
        assert_eq!(next.kind, PrimitiveKind::Char);
        assert_eq!(next.as_i64(), b'b' as i64);
    }

    #[test]
    fn test_pointer_arithmetic_and_identity() {
        let text = create_string("abc");
        let moved = binary_operation(BinaryOp::Add, &text, &int(2)).unwrap();
        assert_eq!(
            moved.as_pointer().unwrap().slot().unwrap().as_primitive().unwrap().as_i64(),
            b'c' as i64
        );
        let back = binary_operation(BinaryOp::Sub, &moved, &int(2)).unwrap();
        assert_eq!(apply(BinaryOp::Eq, &back, &text).as_i64(), 1);
        assert_eq!(apply(BinaryOp::Lt, &text, &moved).as_i64(), 1);
        assert_eq!(apply(BinaryOp::Sub, &moved, &text).as_i64(), 2);

        // Equal contents in different storage are different pointers
        let other = create_string("abc");
        assert_eq!(apply(BinaryOp::Eq, &other, &text).as_i64(), 0);
    }

    #[test]
    fn test_end_pointers_keep_position() {
        // char *s = "hi"; char *end = s + 2; s < end
        let text = create_string("hi");
        let end = binary_operation(BinaryOp::Add, &text, &int(2)).unwrap();
        assert_eq!(apply(BinaryOp::Lt, &text, &end).as_i64(), 1);
        assert_eq!(apply(BinaryOp::Gt, &end, &text).as_i64(), 1);
        assert_eq!(apply(BinaryOp::Ne, &text, &end).as_i64(), 1);

        // ("x" + 1) == ("yz" + 2)
        let first = binary_operation(BinaryOp::Add, &create_string("x"), &int(1)).unwrap();
        let second = binary_operation(BinaryOp::Add, &create_string("yz"), &int(2)).unwrap();
        assert_eq!(apply(BinaryOp::Eq, &first, &second).as_i64(), 0);

        // Still null when compared against zero or the null pointer
        let null = InstanceRef::pointer(PointerInstance::null(CxType::char()));
        assert_eq!(apply(BinaryOp::Eq, &end, &int(0)).as_i64(), 1);
        assert_eq!(apply(BinaryOp::Eq, &end, &null).as_i64(), 1);
    }

    #[test]
    fn test_zero_compares_as_null() {
        let null = InstanceRef::pointer(PointerInstance::null(CxType::int()));
        assert_eq!(apply(BinaryOp::Eq, &null, &int(0)).as_i64(), 1);
        assert_eq!(apply(BinaryOp::Ne, &create_string("x"), &int(0)).as_i64(), 1);
        let terminator = InstanceRef::absent(CxType::char());
        assert_eq!(apply(BinaryOp::Eq, &terminator, &int(0)).as_i64(), 1);
    }
}
