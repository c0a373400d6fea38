//! Explicit conversions between instance kinds
//!
//! | from \ to        | primitive        | pointer              |
//! |------------------|------------------|----------------------|
//! | primitive        | numeric convert  | only zero, to null   |
//! | pointer          | only null, to 0  | alias, retyped       |
//! | array            | -                | decay                |
//! | absent           | zero             | null                 |
//!
//! Everything else is an invalid cast.

use super::value::{Instance, InstanceRef, PointerInstance, Primitive};
use crate::interpreter::errors::RuntimeError;
use crate::tree::CxType;
use std::rc::Rc;

impl InstanceRef {
    /// Convert this instance to `target`, producing a new instance.
    /// Pointer results alias the source's storage.
    pub fn cast_to(&self, target: &CxType) -> Result<InstanceRef, RuntimeError> {
        let source = self.flatten();
        let instance = source.borrow();
        let cast = match (&*instance, target.unqualified()) {
            (_, CxType::Primitive { kind, .. }) if kind.is_void() => None,
            (Instance::Primitive(value), CxType::Primitive { kind, unsigned }) => {
                Some(Instance::Primitive(value.converted(*kind, *unsigned)))
            }
            (Instance::Primitive(value), CxType::Pointer(pointee))
                if value.is_zero() && !value.is_floating() =>
            {
                Some(Instance::Pointer(PointerInstance::null((**pointee).clone())))
            }
            (Instance::Pointer(pointer), CxType::Pointer(pointee)) => {
                Some(Instance::Pointer(PointerInstance {
                    target: (**pointee).clone(),
                    storage: Rc::clone(&pointer.storage),
                    offset: pointer.offset,
                }))
            }
            (Instance::Pointer(pointer), CxType::Primitive { kind, unsigned })
                if pointer.is_null() =>
            {
                Some(Instance::Primitive(Primitive::zero(*kind, *unsigned)))
            }
            (Instance::Array(array), CxType::Pointer(pointee)) => {
                let mut pointer = array.decay();
                pointer.target = (**pointee).clone();
                Some(Instance::Pointer(pointer))
            }
            (Instance::Nullable(_), CxType::Primitive { kind, unsigned }) => {
                Some(Instance::Primitive(Primitive::zero(*kind, *unsigned)))
            }
            (Instance::Nullable(_), CxType::Pointer(pointee)) => {
                Some(Instance::Pointer(PointerInstance::null((**pointee).clone())))
            }
            _ => None,
        };
        match cast {
            Some(instance) => Ok(InstanceRef::new(instance)),
            None => Err(RuntimeError::invalid_cast(&instance.ty(), target)),
        }
    }
}
