//! Statement execution: declarations, blocks, conditionals and `return`

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::interpreter::type_system::is_truthy;
use crate::memory::value::{ArrayInstance, Instance, InstanceRef};
use crate::memory::{create_array, create_value};
use crate::tree::{CxType, Node, NodeKind};
use std::rc::Rc;

impl Interpreter {
    /// Run a statement and drop whatever values it left on the stack
    pub(crate) fn execute_statement(&mut self, node: &Node) -> Result<Outcome, RuntimeError> {
        let depth = self.state.value_depth();
        let outcome = self.evaluate(node);
        self.state.truncate_values(depth);
        outcome
    }

    pub(crate) fn execute_all(&mut self, statements: &[Node]) -> Result<Outcome, RuntimeError> {
        for statement in statements {
            let outcome = self.execute_statement(statement)?;
            if !outcome.is_normal() {
                return Ok(outcome);
            }
        }
        Ok(Outcome::Normal)
    }

    pub(crate) fn execute_compound(&mut self, statements: &[Node]) -> Result<Outcome, RuntimeError> {
        self.with_lexical_scope(|this| this.execute_all(statements))
    }

    pub(crate) fn execute_if(
        &mut self,
        cond: &Node,
        then: &Node,
        otherwise: Option<&Node>,
    ) -> Result<Outcome, RuntimeError> {
        if self.condition_holds(cond)? {
            self.execute_statement(then)
        } else if let Some(otherwise) = otherwise {
            self.execute_statement(otherwise)
        } else {
            Ok(Outcome::Normal)
        }
    }

    /// Evaluate a condition without leaving anything on the stack
    pub(crate) fn condition_holds(&mut self, cond: &Node) -> Result<bool, RuntimeError> {
        let depth = self.state.value_depth();
        let value = self.evaluate_value(cond);
        self.state.truncate_values(depth);
        is_truthy(&value?)
    }

    pub(crate) fn execute_return(&mut self, value: Option<&Node>) -> Result<Outcome, RuntimeError> {
        let value = match value {
            Some(node) => Some(self.evaluate_value(node)?.copy_for_binding()),
            None => None,
        };
        Ok(Outcome::Returned(value))
    }

    /// Bind `name` to a zero value of the declared type. Dimension
    /// expressions, when present, size the array at run time.
    pub(crate) fn execute_declaration(
        &mut self,
        node: &Node,
        name: &str,
        dims: &[Node],
    ) -> Result<InstanceRef, RuntimeError> {
        let program = Rc::clone(&self.program);
        let value = if dims.is_empty() {
            create_value(&node.ty, &program)?
        } else {
            let element = match node.ty.unqualified() {
                CxType::Array { element, .. } => element,
                _ => {
                    return Err(RuntimeError::malformed(format!(
                        "dimensions given for non-array '{}'",
                        name
                    )))
                }
            };
            let mut sizes = Vec::with_capacity(dims.len());
            for dim in dims {
                let size = self
                    .evaluate_value(dim)?
                    .as_primitive()
                    .ok_or_else(|| RuntimeError::malformed("array dimension is not a number"))?
                    .as_i64();
                let size = usize::try_from(size).map_err(|_| {
                    RuntimeError::segfault(format!("negative size {} for array '{}'", size, name))
                })?;
                sizes.push(size);
            }
            create_array(element, &sizes, &program)?
        };
        tracing::trace!(name, ty = %node.ty, "declare");
        self.state.bind(name, value.clone());
        Ok(value)
    }

    pub(crate) fn execute_initialized_declaration(
        &mut self,
        decl: &Node,
        init: &Node,
    ) -> Result<Outcome, RuntimeError> {
        let NodeKind::Declaration { name, dims } = &decl.kind else {
            return Err(RuntimeError::malformed(format!(
                "initialized {} is not a declaration",
                decl.describe()
            )));
        };
        if !init.ty.is_void() && !self.program.accepts(&decl.ty, &init.ty) {
            return Err(RuntimeError::invalid_cast(&init.ty, &decl.ty));
        }
        if dims.is_empty() {
            let initial = self.evaluate_value(init)?;
            let value = self.initialized_binding(&decl.ty, &initial)?;
            self.state.bind(name, value);
        } else {
            let binding = self.execute_declaration(decl, name, dims)?;
            let initial = self.evaluate_value(init)?;
            binding.copy_from(&initial)?;
        }
        Ok(Outcome::Normal)
    }

    /// A new binding of type `ty` holding `initial`. An array declared
    /// without a size takes its length from the initializer.
    pub(crate) fn initialized_binding(
        &mut self,
        ty: &CxType,
        initial: &InstanceRef,
    ) -> Result<InstanceRef, RuntimeError> {
        if let CxType::Array {
            element,
            size: None,
        } = ty.unqualified()
        {
            let sized: Option<Vec<InstanceRef>> = match &*initial.flatten().borrow() {
                Instance::Array(array) => {
                    Some(array.storage.borrow().iter().map(InstanceRef::copy).collect())
                }
                Instance::Pointer(pointer) => {
                    Some(pointer.remaining().iter().map(InstanceRef::copy).collect())
                }
                _ => None,
            };
            return match sized {
                Some(slots) => Ok(InstanceRef::array(ArrayInstance::from_slots(
                    (**element).clone(),
                    slots,
                ))),
                None => Err(RuntimeError::UnsizedArray {
                    element: element.to_string(),
                    location: None,
                }),
            };
        }
        let binding = create_value(ty, &self.program)?;
        binding.copy_from(initial)?;
        Ok(binding)
    }
}
