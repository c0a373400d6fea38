use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::memory::value::{Instance, InstanceRef};
use crate::tree::{Node, NodeKind};

/// Integer value of an index expression; an absent value indexes element 0
fn index_value(index: &InstanceRef) -> Result<i64, RuntimeError> {
    match index.as_primitive() {
        Some(primitive) if !primitive.is_floating() => Ok(primitive.as_i64()),
        Some(_) => Err(RuntimeError::malformed("array index is not an integer")),
        None if index.is_absent() => Ok(0),
        None => Err(RuntimeError::malformed(format!(
            "array index is a {} value",
            index.borrow().kind_name()
        ))),
    }
}

impl Interpreter {
    /// `array[index]` yields the slot itself, so it can be assigned through
    pub(crate) fn evaluate_index(&mut self, array: &Node, index: &Node) -> Result<Outcome, RuntimeError> {
        let container = self.evaluate_value(array)?;
        let index = index_value(&self.evaluate_value(index)?)?;
        let slot = match &*container.borrow() {
            Instance::Array(array) => array.slot(index)?,
            Instance::Pointer(pointer) => pointer.slot_at(index)?,
            Instance::Nullable(_) => {
                return Err(RuntimeError::segfault("index into an absent value"));
            }
            other => {
                return Err(RuntimeError::malformed(format!(
                    "index into a {} value",
                    other.kind_name()
                )))
            }
        };
        self.state.push(slot);
        Ok(Outcome::Normal)
    }

    /// `owner.field` and `owner->field`; a pointer owner is followed first
    pub(crate) fn evaluate_field(&mut self, owner: &Node, field: &str) -> Result<Outcome, RuntimeError> {
        let owner = self.evaluate_value(owner)?;
        let object = match &*owner.borrow() {
            Instance::Compound(_) => owner.clone(),
            Instance::Pointer(pointer) => {
                if pointer.is_null() {
                    return Err(RuntimeError::segfault(format!(
                        "field '{}' read through a null pointer",
                        field
                    )));
                }
                pointer.slot()?.flatten()
            }
            Instance::Nullable(_) => {
                return Err(RuntimeError::segfault(format!(
                    "field '{}' of an absent value",
                    field
                )));
            }
            other => {
                return Err(RuntimeError::malformed(format!(
                    "field '{}' of a {} value",
                    field,
                    other.kind_name()
                )))
            }
        };
        let value = object.field(field).ok_or_else(|| {
            RuntimeError::malformed(format!("{} has no field '{}'", object.ty(), field))
        })?;
        self.state.push(value);
        Ok(Outcome::Normal)
    }

    /// `*operand` yields the referenced slot. Empty storage faults; an empty
    /// slot (a string terminator, a freed element) reads as zero.
    pub(crate) fn evaluate_indirection(&mut self, operand: &Node) -> Result<Outcome, RuntimeError> {
        let value = self.evaluate_value(operand)?;
        let slot = match &*value.borrow() {
            Instance::Pointer(pointer) => pointer.slot()?,
            Instance::Array(array) => array.slot(0)?,
            Instance::Primitive(primitive) if primitive.is_zero() => {
                return Err(RuntimeError::segfault("null pointer dereference"));
            }
            Instance::Nullable(_) => {
                return Err(RuntimeError::segfault("dereference of an absent pointer"));
            }
            other => {
                return Err(RuntimeError::malformed(format!(
                    "dereference of a {} value",
                    other.kind_name()
                )))
            }
        };
        self.state.push(slot);
        Ok(Outcome::Normal)
    }

    /// `&operand`. Taking the address of an element keeps the element's
    /// storage, so the result can walk the rest of the array.
    pub(crate) fn evaluate_address_of(&mut self, operand: &Node) -> Result<Outcome, RuntimeError> {
        if let NodeKind::Index { array, index } = &operand.kind {
            let container = self.evaluate_value(array)?;
            let index = index_value(&self.evaluate_value(index)?)?;
            let base = container.as_pointer().ok_or_else(|| {
                RuntimeError::malformed(format!(
                    "address of an element of a {} value",
                    container.borrow().kind_name()
                ))
            })?;
            let element = base.offset_by(index);
            let len = element.storage.borrow().len() as i64;
            if !(0..=len).contains(&element.offset) {
                return Err(RuntimeError::segfault(format!(
                    "address of element {} outside {} element(s)",
                    element.offset, len
                )));
            }
            self.state.push(InstanceRef::pointer(element));
            return Ok(Outcome::Normal);
        }
        let value = self.evaluate_value(operand)?;
        self.state.push(value.to_pointer());
        Ok(Outcome::Normal)
    }
}
