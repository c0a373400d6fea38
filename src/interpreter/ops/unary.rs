use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::interpreter::type_system::{conform_to_node, is_truthy};
use crate::memory::value::{Instance, InstanceRef, Payload, Primitive};
use crate::tree::{Node, PostfixOp, PrimitiveKind, UnaryOp};

/// Move a primitive by `delta` or a pointer by `delta` elements, in place
fn step_in_place(value: &InstanceRef, delta: i64) -> Result<(), RuntimeError> {
    if value.is_absent() {
        return value.copy_from(&InstanceRef::primitive(Primitive::int(delta)));
    }
    let mut instance = value.borrow_mut();
    match &mut *instance {
        Instance::Primitive(primitive) => {
            let payload = match primitive.payload {
                Payload::Integral(current) => Payload::Integral(current.wrapping_add(delta)),
                Payload::Floating(current) => Payload::Floating(current + delta as f64),
            };
            *primitive = primitive.with_payload(payload);
            Ok(())
        }
        Instance::Pointer(pointer) => {
            pointer.offset = pointer.offset.wrapping_add(delta);
            Ok(())
        }
        other => Err(RuntimeError::malformed(format!(
            "cannot step a {} value",
            other.kind_name()
        ))),
    }
}

/// Operand of `-` and `~`, integral kinds promoted to at least `int`
fn promoted(value: &InstanceRef) -> Result<Primitive, RuntimeError> {
    let primitive = match value.as_primitive() {
        Some(primitive) => primitive,
        None if value.is_absent() => Primitive::int(0),
        None => {
            return Err(RuntimeError::malformed(format!(
                "arithmetic on a {} value",
                value.borrow().kind_name()
            )))
        }
    };
    if primitive.is_floating() || primitive.kind >= PrimitiveKind::Int {
        Ok(primitive)
    } else {
        Ok(primitive.converted(PrimitiveKind::Int, false))
    }
}

impl Interpreter {
    /// Prefix operators. `++`/`--` update the operand and yield it; the
    /// others yield a new value and leave the operand alone.
    pub(crate) fn evaluate_unary(
        &mut self,
        node: &Node,
        op: UnaryOp,
        operand: &Node,
    ) -> Result<Outcome, RuntimeError> {
        let value = self.evaluate_value(operand)?;
        let result = match op {
            UnaryOp::Increment | UnaryOp::Decrement => {
                let delta = if op == UnaryOp::Increment { 1 } else { -1 };
                step_in_place(&value, delta)?;
                self.state.push(value);
                return Ok(Outcome::Normal);
            }
            UnaryOp::Not => Primitive::truth(!is_truthy(&value)?),
            UnaryOp::Plus => promoted(&value)?,
            UnaryOp::Neg => {
                let primitive = promoted(&value)?;
                let payload = match primitive.payload {
                    Payload::Integral(current) => Payload::Integral(current.wrapping_neg()),
                    Payload::Floating(current) => Payload::Floating(-current),
                };
                primitive.with_payload(payload)
            }
            UnaryOp::BitNot => {
                let primitive = promoted(&value)?;
                match primitive.payload {
                    Payload::Integral(current) => primitive.with_payload(Payload::Integral(!current)),
                    Payload::Floating(_) => {
                        return Err(RuntimeError::malformed("'~' applied to a floating value"))
                    }
                }
            }
        };
        self.state
            .push(conform_to_node(InstanceRef::primitive(result), &node.ty));
        Ok(Outcome::Normal)
    }

    /// `x++`/`x--`: update the operand, yield its previous value
    pub(crate) fn evaluate_postfix(&mut self, op: PostfixOp, operand: &Node) -> Result<Outcome, RuntimeError> {
        let value = self.evaluate_value(operand)?;
        let previous = value.copy();
        let delta = match op {
            PostfixOp::Increment => 1,
            PostfixOp::Decrement => -1,
        };
        step_in_place(&value, delta)?;
        self.state.push(previous);
        Ok(Outcome::Normal)
    }
}
