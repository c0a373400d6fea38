use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::interpreter::ops::binary_operation;
use crate::tree::{AssignOp, Node};

impl Interpreter {
    /// `lhs = rhs` and `lhs op= rhs`. The target is updated in place so every
    /// alias of it observes the store; the target itself is the result.
    pub(crate) fn evaluate_assignment(
        &mut self,
        op: AssignOp,
        lhs: &Node,
        rhs: &Node,
    ) -> Result<Outcome, RuntimeError> {
        let target = self.evaluate_value(lhs)?;
        let value = self.evaluate_value(rhs)?;
        let value = match op {
            AssignOp::Assign => value,
            AssignOp::Compound(op) => binary_operation(op, &target, &value)?,
        };
        tracing::trace!(target = %lhs.describe(), value = %value, "assign");
        target.copy_from(&value)?;
        self.state.push(target);
        Ok(Outcome::Normal)
    }
}
