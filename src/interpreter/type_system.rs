//! Conversions driven by resolved types: truthiness, binding coercion,
//! explicit casts and `sizeof`

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Outcome, RuntimeError};
use crate::memory::sizeof_type;
use crate::memory::value::{Instance, InstanceRef, Payload, Primitive};
use crate::tree::{CxType, Node, PrimitiveKind};

/// Condition semantics: floating values are true when non-zero, pointers
/// when non-null, and absent values are false
pub(crate) fn is_truthy(value: &InstanceRef) -> Result<bool, RuntimeError> {
    let value = value.flatten();
    let truth = match &*value.borrow() {
        Instance::Primitive(primitive) => match primitive.payload {
            Payload::Floating(value) => value != 0.0,
            Payload::Integral(value) => value != 0,
        },
        Instance::Pointer(pointer) => !pointer.is_null(),
        Instance::Nullable(_) => false,
        Instance::Array(_) => true,
        Instance::Compound(compound) => {
            return Err(RuntimeError::malformed(format!(
                "{} used as a condition",
                compound.ty
            )))
        }
    };
    Ok(truth)
}

/// The value bound to a parameter or returned from a function declared as
/// `declared`: a fresh copy (arrays decay), converted when a numeric or
/// null-pointer conversion applies
pub(crate) fn conform(value: &InstanceRef, declared: &CxType) -> Result<InstanceRef, RuntimeError> {
    let bound = value.copy_for_binding();
    let convert = match (declared.unqualified(), &*bound.borrow()) {
        (CxType::Primitive { kind, .. }, Instance::Primitive(_) | Instance::Nullable(_)) => {
            !kind.is_void()
        }
        (CxType::Pointer(_), Instance::Primitive(_) | Instance::Nullable(_)) => true,
        _ => false,
    };
    if convert {
        bound.cast_to(declared)
    } else {
        Ok(bound)
    }
}

/// Convert a primitive result to the primitive type the tree assigned to
/// its node; other values pass through
pub(crate) fn conform_to_node(value: InstanceRef, ty: &CxType) -> InstanceRef {
    let Some((kind, unsigned)) = ty.as_primitive() else {
        return value;
    };
    if kind.is_void() {
        return value;
    }
    let converted = match &*value.borrow() {
        Instance::Primitive(primitive)
            if primitive.kind != kind || primitive.unsigned != unsigned =>
        {
            Some(primitive.converted(kind, unsigned))
        }
        _ => None,
    };
    match converted {
        Some(primitive) => InstanceRef::primitive(primitive),
        None => value,
    }
}

impl Interpreter {
    /// `(T) operand`; a cast to `void` discards the value
    pub(crate) fn evaluate_cast(&mut self, node: &Node, operand: &Node) -> Result<Outcome, RuntimeError> {
        let value = self.evaluate_value(operand)?;
        if node.ty.is_void() {
            return Ok(Outcome::Normal);
        }
        let cast = value.cast_to(&node.ty)?;
        self.state.push(cast);
        Ok(Outcome::Normal)
    }

    pub(crate) fn evaluate_sizeof(&mut self, ty: &CxType) -> Result<Outcome, RuntimeError> {
        let size = sizeof_type(ty, &self.program);
        self.state.push_primitive(Primitive::new(
            PrimitiveKind::Long,
            true,
            Payload::Integral(size as i64),
        ));
        Ok(Outcome::Normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::create_string;
    use crate::memory::value::PointerInstance;

    #[test]
    fn test_truthiness() {
        let zero = InstanceRef::primitive(Primitive::double(0.0));
        let half = InstanceRef::primitive(Primitive::double(0.5));
        let null = InstanceRef::pointer(PointerInstance::null(CxType::int()));
        assert!(!is_truthy(&zero).unwrap());
        assert!(is_truthy(&half).unwrap());
        assert!(!is_truthy(&null).unwrap());
        assert!(is_truthy(&create_string("x")).unwrap());
        assert!(!is_truthy(&InstanceRef::absent(CxType::char())).unwrap());
    }

    #[test]
    fn test_conform_converts_numeric_arguments() {
        let value = InstanceRef::primitive(Primitive::int(3));
        let bound = conform(&value, &CxType::double()).unwrap();
        let primitive = bound.as_primitive().unwrap();
        assert_eq!(primitive.kind, PrimitiveKind::Double);
        assert!(!bound.ptr_eq(&value));
    }

    #[test]
    fn test_conform_turns_zero_into_null_pointer() {
        let zero = InstanceRef::primitive(Primitive::int(0));
        let bound = conform(&zero, &CxType::class("Node").pointer_to()).unwrap();
        assert!(bound.as_pointer().unwrap().is_null());
    }
}
