//! Memory model for the execution engine
//!
//! This module provides the core memory abstractions:
//! - [`value`]: runtime instances and their shared handles
//! - [`cast`]: explicit conversions between instance kinds
//! - [`stack`]: value stack, binding frames and dispatch contexts
//!
//! # Type Sizes
//!
//! `sizeof` uses fixed, platform-independent sizes:
//! - `char`: 1 byte, `short`: 2, `int` and `float`: 4, `long` and `double`: 8
//! - pointer: 8 bytes regardless of pointee type
//! - array: element size times length
//! - struct/class: sum of field sizes including inherited ones (no padding)

pub mod cast;
pub mod stack;
pub mod value;

use crate::interpreter::constants::{
    CHAR_SIZE, DOUBLE_SIZE, FLOAT_SIZE, INT_SIZE, LONG_SIZE, POINTER_SIZE, SHORT_SIZE,
};
use crate::interpreter::errors::RuntimeError;
use crate::tree::{CxType, PrimitiveKind, Program};
use value::{ArrayInstance, CompoundInstance, Instance, InstanceRef, PointerInstance, Primitive};

/// Zero value of `ty`. `void` has no instance.
pub fn create_new_instance(
    ty: &CxType,
    program: &Program,
) -> Result<Option<InstanceRef>, RuntimeError> {
    let instance = match ty.unqualified() {
        CxType::Primitive { kind, .. } if kind.is_void() => return Ok(None),
        CxType::Primitive { kind, unsigned } => {
            InstanceRef::primitive(Primitive::zero(*kind, *unsigned))
        }
        CxType::Pointer(target) => {
            InstanceRef::pointer(PointerInstance::null((**target).clone()))
        }
        CxType::Array {
            element,
            size: Some(size),
        } => create_array(element, &[*size], program)?,
        CxType::Array {
            element,
            size: None,
        } => {
            return Err(RuntimeError::UnsizedArray {
                element: element.to_string(),
                location: None,
            })
        }
        CxType::Struct(name) | CxType::Class(name) => create_compound(ty, name, program)?,
        CxType::Const(inner) => return create_new_instance(inner, program),
    };
    Ok(Some(instance))
}

/// Zero value of a type that must have one
pub fn create_value(ty: &CxType, program: &Program) -> Result<InstanceRef, RuntimeError> {
    create_new_instance(ty, program)?
        .ok_or_else(|| RuntimeError::malformed(format!("no value of type {}", ty)))
}

fn create_compound(
    ty: &CxType,
    name: &str,
    program: &Program,
) -> Result<InstanceRef, RuntimeError> {
    if program.compound(name).is_none() {
        return Err(RuntimeError::undefined(name));
    }
    let mut fields = Vec::new();
    for field in program.all_fields(name) {
        fields.push((field.name.clone(), create_value(&field.ty, program)?));
    }
    Ok(InstanceRef::new(Instance::Compound(CompoundInstance {
        ty: ty.unqualified().clone(),
        fields,
    })))
}

/// Zero-initialized array of `element` with one size per dimension,
/// outermost first. Inner dimensions with a static size in `element`
/// need not be listed.
pub fn create_array(
    element: &CxType,
    sizes: &[usize],
    program: &Program,
) -> Result<InstanceRef, RuntimeError> {
    let Some((&size, inner_sizes)) = sizes.split_first() else {
        return create_value(element, program);
    };
    let element_ty = match (element.unqualified(), inner_sizes.is_empty()) {
        (CxType::Array { element: inner, .. }, false) => {
            (**inner).clone().array_of(inner_sizes.first().copied())
        }
        _ => element.clone(),
    };
    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        let value = match element.unqualified() {
            CxType::Array { element: inner, .. } if !inner_sizes.is_empty() => {
                create_array(inner, inner_sizes, program)?
            }
            _ => create_value(element, program)?,
        };
        values.push(value);
    }
    Ok(InstanceRef::array(ArrayInstance::from_elements(
        element_ty, values,
    )))
}

/// A `char` pointer over the bytes of `text` followed by an empty
/// terminator slot
pub fn create_string(text: &str) -> InstanceRef {
    let values = text
        .bytes()
        .map(|byte| InstanceRef::primitive(Primitive::char(byte)))
        .collect();
    let array = ArrayInstance::from_elements(CxType::char(), values);
    array
        .storage
        .borrow_mut()
        .push(InstanceRef::absent(CxType::char()));
    InstanceRef::pointer(array.decay())
}

/// Size of a type in bytes
pub fn sizeof_type(ty: &CxType, program: &Program) -> u64 {
    match ty.unqualified() {
        CxType::Primitive { kind, .. } => match kind {
            PrimitiveKind::Void => 0,
            PrimitiveKind::Char => CHAR_SIZE,
            PrimitiveKind::Short => SHORT_SIZE,
            PrimitiveKind::Int => INT_SIZE,
            PrimitiveKind::Float => FLOAT_SIZE,
            PrimitiveKind::Long => LONG_SIZE,
            PrimitiveKind::Double => DOUBLE_SIZE,
        },
        CxType::Pointer(_) => POINTER_SIZE,
        CxType::Array { element, size } => {
            sizeof_type(element, program) * size.unwrap_or(0) as u64
        }
        CxType::Struct(name) | CxType::Class(name) => program
            .all_fields(name)
            .iter()
            .map(|field| sizeof_type(&field.ty, program))
            .sum(),
        CxType::Const(inner) => sizeof_type(inner, program),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build;

    fn shapes() -> Program {
        Program::new()
            .with_compound(build::class(
                "Shape",
                None,
                vec![build::member("id", CxType::int())],
            ))
            .with_compound(build::class(
                "Square",
                Some("Shape"),
                vec![
                    build::member("side", CxType::double()),
                    build::member("corners", CxType::long().array_of(Some(4))),
                ],
            ))
    }

    #[test]
    fn test_void_has_no_instance() {
        let program = Program::new();
        assert!(create_new_instance(&CxType::void(), &program)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unsized_array_is_an_error() {
        let program = Program::new();
        let result = create_new_instance(&CxType::int().array_of(None), &program);
        assert!(matches!(result, Err(RuntimeError::UnsizedArray { .. })));
    }

    #[test]
    fn test_compound_has_inherited_fields_zeroed() {
        let program = shapes();
        let square = create_value(&CxType::class("Square"), &program).unwrap();
        let instance = square.borrow();
        let Instance::Compound(compound) = &*instance else {
            panic!("expected compound");
        };
        let names: Vec<&str> = compound.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "side", "corners"]);
        assert!(compound.field("side").unwrap().as_primitive().unwrap().is_zero());
    }

    #[test]
    fn test_multi_dimensional_array() {
        let program = Program::new();
        let grid = create_array(&CxType::int().array_of(None), &[2, 3], &program).unwrap();
        let outer = grid.as_pointer().unwrap();
        let row = outer.slot_at(1).unwrap().as_pointer().unwrap();
        assert_eq!(row.remaining().len(), 3);
        assert!(row.slot_at(2).unwrap().as_primitive().unwrap().is_zero());
    }

    #[test]
    fn test_string_ends_in_absent_slot() {
        let text = create_string("hi").as_pointer().unwrap();
        assert_eq!(text.slot().unwrap().as_primitive().unwrap().as_i64(), b'h' as i64);
        assert!(text.slot_at(2).unwrap().is_absent());
        assert!(text.offset_by(2).is_null());
    }

    #[test]
    fn test_sizeof_sums_fields() {
        let program = shapes();
        assert_eq!(sizeof_type(&CxType::class("Square"), &program), 4 + 8 + 32);
        assert_eq!(sizeof_type(&CxType::char().pointer_to(), &program), 8);
    }
}
