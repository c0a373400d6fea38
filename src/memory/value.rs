//! Runtime instance representation
//!
//! Every runtime value is an [`Instance`] behind a shared, mutable handle
//! ([`InstanceRef`]). Sharing the handle is how aliasing works: a variable
//! binding, an array slot and a pointer's view of that slot can all be the same
//! instance, and a mutation through one is visible through the others.
//!
//! # Instance Variants
//!
//! - [`Instance::Primitive`]: numeric scalar with kind and signedness
//! - [`Instance::Array`]: fixed-length backing storage of slots
//! - [`Instance::Pointer`]: backing storage plus an offset into it
//! - [`Instance::Nullable`]: a slot that may be empty
//! - [`Instance::Compound`]: struct or class instance with named fields
//!
//! # Slots
//!
//! Backing storage holds one slot per element. Scalar, pointer and array
//! elements live inside a [`Instance::Nullable`] so a slot can be emptied by
//! `free` or left empty as a string terminator; compound elements are stored
//! directly. An empty slot is what the engine calls an *absent* value.
//!
//! # Null Pointers
//!
//! A pointer with empty backing storage is the null pointer. A pointer whose
//! current slot is empty (after `free`, or at a string terminator) reads as
//! null against `0` or the null pointer, but keeps its place when compared
//! with other pointers.

use crate::interpreter::errors::RuntimeError;
use crate::tree::{CxType, PrimitiveKind};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Numeric payload of a primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Integral(i64),
    Floating(f64),
}

/// A numeric scalar. The payload always fits the kind: integral kinds wrap to
/// their width and `float` is rounded through single precision.
#[derive(Debug, Clone, Copy)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub unsigned: bool,
    pub payload: Payload,
}

/// Narrow a payload to what `kind` can represent
fn fit(kind: PrimitiveKind, unsigned: bool, payload: Payload) -> Payload {
    let integral = match payload {
        Payload::Integral(value) => value,
        Payload::Floating(value) => value as i64,
    };
    let floating = match payload {
        Payload::Integral(value) if unsigned => value as u64 as f64,
        Payload::Integral(value) => value as f64,
        Payload::Floating(value) => value,
    };
    match (kind, unsigned) {
        (PrimitiveKind::Void, _) => payload,
        (PrimitiveKind::Float, _) => Payload::Floating(floating as f32 as f64),
        (PrimitiveKind::Double, _) => Payload::Floating(floating),
        (PrimitiveKind::Char, false) => Payload::Integral(integral as i8 as i64),
        (PrimitiveKind::Char, true) => Payload::Integral(integral as u8 as i64),
        (PrimitiveKind::Short, false) => Payload::Integral(integral as i16 as i64),
        (PrimitiveKind::Short, true) => Payload::Integral(integral as u16 as i64),
        (PrimitiveKind::Int, false) => Payload::Integral(integral as i32 as i64),
        (PrimitiveKind::Int, true) => Payload::Integral(integral as u32 as i64),
        (PrimitiveKind::Long, _) => Payload::Integral(integral),
    }
}

impl Primitive {
    pub fn new(kind: PrimitiveKind, unsigned: bool, payload: Payload) -> Self {
        Primitive {
            kind,
            unsigned,
            payload: fit(kind, unsigned, payload),
        }
    }

    pub fn zero(kind: PrimitiveKind, unsigned: bool) -> Self {
        let payload = if kind.is_floating() {
            Payload::Floating(0.0)
        } else {
            Payload::Integral(0)
        };
        Primitive::new(kind, unsigned, payload)
    }

    pub fn int(value: i64) -> Self {
        Primitive::new(PrimitiveKind::Int, false, Payload::Integral(value))
    }

    pub fn long(value: i64) -> Self {
        Primitive::new(PrimitiveKind::Long, false, Payload::Integral(value))
    }

    pub fn char(value: u8) -> Self {
        Primitive::new(PrimitiveKind::Char, false, Payload::Integral(value as i64))
    }

    pub fn double(value: f64) -> Self {
        Primitive::new(PrimitiveKind::Double, false, Payload::Floating(value))
    }

    /// 1 or 0 as an `int`
    pub fn truth(value: bool) -> Self {
        Primitive::int(value as i64)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.payload, Payload::Floating(_))
    }

    pub fn as_i64(&self) -> i64 {
        match self.payload {
            Payload::Integral(value) => value,
            Payload::Floating(value) => value as i64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self.payload {
            Payload::Integral(value) if self.unsigned => value as u64 as f64,
            Payload::Integral(value) => value as f64,
            Payload::Floating(value) => value,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self.payload {
            Payload::Integral(value) => value == 0,
            Payload::Floating(value) => value == 0.0,
        }
    }

    pub fn ty(&self) -> CxType {
        CxType::Primitive {
            kind: self.kind,
            unsigned: self.unsigned,
        }
    }

    /// Numeric conversion to another kind
    pub fn converted(&self, kind: PrimitiveKind, unsigned: bool) -> Primitive {
        Primitive::new(kind, unsigned, self.payload)
    }

    /// Same kind, new payload (re-fitted to the kind)
    pub fn with_payload(&self, payload: Payload) -> Primitive {
        Primitive::new(self.kind, self.unsigned, payload)
    }
}

/// Primitive equality compares payload and signedness, not kind
impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload && self.unsigned == other.unsigned
    }
}

/// Shared backing storage of arrays and pointers
pub type Storage = Rc<RefCell<Vec<InstanceRef>>>;

fn storage_of(slots: Vec<InstanceRef>) -> Storage {
    Rc::new(RefCell::new(slots))
}

/// Wrap a value the way backing storage holds it; compounds are stored bare
pub(crate) fn slot_for(value: InstanceRef) -> InstanceRef {
    if matches!(&*value.borrow(), Instance::Compound(_)) {
        return value;
    }
    value.to_nullable()
}

#[derive(Clone)]
pub struct ArrayInstance {
    pub element: CxType,
    pub storage: Storage,
}

impl ArrayInstance {
    /// Array over the given element values, each wrapped as a slot
    pub fn from_elements(element: CxType, values: Vec<InstanceRef>) -> Self {
        ArrayInstance {
            element,
            storage: storage_of(values.into_iter().map(slot_for).collect()),
        }
    }

    /// Array over slots that are already wrapped
    pub fn from_slots(element: CxType, slots: Vec<InstanceRef>) -> Self {
        ArrayInstance {
            element,
            storage: storage_of(slots),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The slot at `index`, bounds-checked
    pub fn slot(&self, index: i64) -> Result<InstanceRef, RuntimeError> {
        slot_in(&self.storage, index)
    }

    pub fn decay(&self) -> PointerInstance {
        PointerInstance {
            target: self.element.clone(),
            storage: Rc::clone(&self.storage),
            offset: 0,
        }
    }
}

fn slot_in(storage: &Storage, index: i64) -> Result<InstanceRef, RuntimeError> {
    let slots = storage.borrow();
    usize::try_from(index)
        .ok()
        .and_then(|index| slots.get(index))
        .cloned()
        .ok_or_else(|| {
            RuntimeError::segfault(format!(
                "index {} out of bounds for {} element(s)",
                index,
                slots.len()
            ))
        })
}

#[derive(Clone)]
pub struct PointerInstance {
    /// Declared pointee type
    pub target: CxType,
    pub storage: Storage,
    pub offset: i64,
}

impl PointerInstance {
    pub fn null(target: CxType) -> Self {
        PointerInstance {
            target,
            storage: storage_of(Vec::new()),
            offset: 0,
        }
    }

    /// Pointer over a fresh single-slot storage holding `value`
    pub fn to_value(target: CxType, value: InstanceRef) -> Self {
        PointerInstance {
            target,
            storage: storage_of(vec![slot_for(value)]),
            offset: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        let slots = self.storage.borrow();
        if slots.is_empty() {
            return true;
        }
        usize::try_from(self.offset)
            .ok()
            .and_then(|index| slots.get(index))
            .is_some_and(InstanceRef::is_absent)
    }

    /// The slot the pointer currently refers to
    pub fn slot(&self) -> Result<InstanceRef, RuntimeError> {
        if self.storage.borrow().is_empty() {
            return Err(RuntimeError::segfault("null pointer dereference"));
        }
        slot_in(&self.storage, self.offset)
    }

    /// The slot `delta` elements away from the current one
    pub fn slot_at(&self, delta: i64) -> Result<InstanceRef, RuntimeError> {
        self.offset_by(delta).slot()
    }

    pub fn offset_by(&self, delta: i64) -> PointerInstance {
        PointerInstance {
            target: self.target.clone(),
            storage: Rc::clone(&self.storage),
            offset: self.offset.wrapping_add(delta),
        }
    }

    /// True for the null pointer itself, not for a pointer at an empty slot
    pub fn has_no_storage(&self) -> bool {
        self.storage.borrow().is_empty()
    }

    /// Both null pointers, or same storage at the same offset
    pub fn same_target(&self, other: &PointerInstance) -> bool {
        match (self.has_no_storage(), other.has_no_storage()) {
            (true, true) => true,
            (false, false) => {
                Rc::ptr_eq(&self.storage, &other.storage) && self.offset == other.offset
            }
            _ => false,
        }
    }

    /// Total order used by relational comparison; the null pointer sorts first
    pub fn address(&self) -> (usize, i64) {
        if self.has_no_storage() {
            return (0, 0);
        }
        (Rc::as_ptr(&self.storage) as *const () as usize, self.offset)
    }

    /// Slots from the current offset to the end of storage
    pub fn remaining(&self) -> Vec<InstanceRef> {
        let slots = self.storage.borrow();
        usize::try_from(self.offset)
            .ok()
            .and_then(|start| slots.get(start..))
            .map(<[InstanceRef]>::to_vec)
            .unwrap_or_default()
    }

    /// Empty the referenced slot; every alias observes the release
    pub fn release(&self) -> Result<(), RuntimeError> {
        if self.storage.borrow().is_empty() {
            return Ok(());
        }
        let slot = self.slot()?;
        let is_compound = {
            let mut instance = slot.borrow_mut();
            match &mut *instance {
                Instance::Nullable(nullable) => {
                    nullable.value = None;
                    false
                }
                _ => true,
            }
        };
        if is_compound {
            let ty = slot.ty();
            let index = self.offset as usize;
            self.storage.borrow_mut()[index] = InstanceRef::absent(ty);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct NullableInstance {
    /// Declared slot type
    pub ty: CxType,
    pub value: Option<InstanceRef>,
}

#[derive(Clone)]
pub struct CompoundInstance {
    pub ty: CxType,
    /// Inherited fields first, in declaration order
    pub fields: Vec<(String, InstanceRef)>,
}

impl CompoundInstance {
    pub fn field(&self, name: &str) -> Option<InstanceRef> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.clone())
    }

    pub fn class_name(&self) -> Option<&str> {
        self.ty.compound_name()
    }
}

/// Runtime instances
#[derive(Clone)]
pub enum Instance {
    Primitive(Primitive),
    Array(ArrayInstance),
    Pointer(PointerInstance),
    Nullable(NullableInstance),
    Compound(CompoundInstance),
}

impl Instance {
    pub fn ty(&self) -> CxType {
        match self {
            Instance::Primitive(primitive) => primitive.ty(),
            Instance::Array(array) => array.element.clone().array_of(Some(array.len())),
            Instance::Pointer(pointer) => pointer.target.clone().pointer_to(),
            Instance::Nullable(NullableInstance {
                value: Some(value), ..
            }) => value.ty(),
            Instance::Nullable(nullable) => nullable.ty.clone(),
            Instance::Compound(compound) => compound.ty.clone(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Instance::Primitive(_) => "primitive",
            Instance::Array(_) => "array",
            Instance::Pointer(_) => "pointer",
            Instance::Nullable(_) => "nullable",
            Instance::Compound(_) => "compound",
        }
    }
}

/// What assigning one instance into another changes
enum Update {
    Nothing,
    Primitive(Primitive),
    Pointer { storage: Storage, offset: i64 },
    Pairs(Vec<(InstanceRef, InstanceRef)>),
}

/// Shared, mutable handle to an instance
#[derive(Clone)]
pub struct InstanceRef(Rc<RefCell<Instance>>);

impl InstanceRef {
    pub fn new(instance: Instance) -> Self {
        InstanceRef(Rc::new(RefCell::new(instance)))
    }

    pub fn primitive(primitive: Primitive) -> Self {
        InstanceRef::new(Instance::Primitive(primitive))
    }

    pub fn pointer(pointer: PointerInstance) -> Self {
        InstanceRef::new(Instance::Pointer(pointer))
    }

    pub fn array(array: ArrayInstance) -> Self {
        InstanceRef::new(Instance::Array(array))
    }

    /// An empty slot of the given type
    pub fn absent(ty: CxType) -> Self {
        InstanceRef::new(Instance::Nullable(NullableInstance { ty, value: None }))
    }

    pub fn borrow(&self) -> Ref<'_, Instance> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Instance> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &InstanceRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn ty(&self) -> CxType {
        self.borrow().ty()
    }

    pub fn is_absent(&self) -> bool {
        matches!(
            &*self.borrow(),
            Instance::Nullable(NullableInstance { value: None, .. })
        )
    }

    /// A non-empty nullable stands for its contents; anything else for itself
    pub fn flatten(&self) -> InstanceRef {
        match &*self.borrow() {
            Instance::Nullable(NullableInstance {
                value: Some(inner), ..
            }) => inner.flatten(),
            _ => self.clone(),
        }
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match &*self.flatten().borrow() {
            Instance::Primitive(primitive) => Some(*primitive),
            _ => None,
        }
    }

    /// Pointer view of this value; arrays decay
    pub fn as_pointer(&self) -> Option<PointerInstance> {
        match &*self.flatten().borrow() {
            Instance::Pointer(pointer) => Some(pointer.clone()),
            Instance::Array(array) => Some(array.decay()),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<InstanceRef> {
        match &*self.flatten().borrow() {
            Instance::Compound(compound) => compound.field(name),
            _ => None,
        }
    }

    /// Value copy: primitives, arrays and compounds are duplicated in depth,
    /// pointers alias the same storage and offset.
    pub fn copy(&self) -> InstanceRef {
        let copied = match &*self.borrow() {
            Instance::Primitive(primitive) => Instance::Primitive(*primitive),
            Instance::Pointer(pointer) => Instance::Pointer(pointer.clone()),
            Instance::Array(array) => Instance::Array(ArrayInstance {
                element: array.element.clone(),
                storage: storage_of(array.storage.borrow().iter().map(InstanceRef::copy).collect()),
            }),
            Instance::Nullable(nullable) => Instance::Nullable(NullableInstance {
                ty: nullable.ty.clone(),
                value: nullable.value.as_ref().map(InstanceRef::copy),
            }),
            Instance::Compound(compound) => Instance::Compound(CompoundInstance {
                ty: compound.ty.clone(),
                fields: compound
                    .fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.copy()))
                    .collect(),
            }),
        };
        InstanceRef::new(copied)
    }

    /// Copy used when binding a parameter: arrays decay to a pointer
    /// aliasing their storage, everything else is a value copy.
    pub fn copy_for_binding(&self) -> InstanceRef {
        let value = self.flatten();
        let decayed = match &*value.borrow() {
            Instance::Array(array) => Some(array.decay()),
            _ => None,
        };
        match decayed {
            Some(pointer) => InstanceRef::pointer(pointer),
            None => value.copy(),
        }
    }

    /// A pointer whose single slot holds this instance
    /// Wrap as a present nullable. An existing wrapper is reused, so
    /// wrapping twice still leaves one level around the same inner value.
    pub fn to_nullable(&self) -> InstanceRef {
        if matches!(&*self.borrow(), Instance::Nullable(_)) {
            return self.clone();
        }
        let ty = self.ty();
        InstanceRef::new(Instance::Nullable(NullableInstance {
            ty,
            value: Some(self.clone()),
        }))
    }

    pub fn to_pointer(&self) -> InstanceRef {
        let target = self.ty();
        InstanceRef::pointer(PointerInstance::to_value(target, self.clone()))
    }

    /// Assign `source` into this instance in place, so every alias of this
    /// instance observes the new value.
    pub fn copy_from(&self, source: &InstanceRef) -> Result<(), RuntimeError> {
        let source = source.flatten();
        if self.ptr_eq(&source) {
            return Ok(());
        }

        let slot = match &*self.borrow() {
            Instance::Nullable(nullable) => Some((nullable.ty.clone(), nullable.value.clone())),
            _ => None,
        };
        if let Some((declared, current)) = slot {
            return match current {
                Some(inner) => inner.copy_from(&source),
                None => self.fill(&declared, &source),
            };
        }

        let update = {
            let target = self.borrow();
            let value = source.borrow();
            assignment(&target, &value)?
        };
        match update {
            Update::Nothing => {}
            Update::Primitive(primitive) => {
                if let Instance::Primitive(target) = &mut *self.borrow_mut() {
                    *target = primitive;
                }
            }
            Update::Pointer { storage, offset } => {
                if let Instance::Pointer(target) = &mut *self.borrow_mut() {
                    target.storage = storage;
                    target.offset = offset;
                }
            }
            Update::Pairs(pairs) => {
                for (target, value) in pairs {
                    if value.is_absent() {
                        target.clear();
                    } else {
                        target.copy_from(&value)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Store a copy of `source` into this empty slot
    fn fill(&self, declared: &CxType, source: &InstanceRef) -> Result<(), RuntimeError> {
        if source.is_absent() {
            return Ok(());
        }
        let fresh = source.copy_for_binding();
        let fresh = match declared.unqualified() {
            CxType::Primitive { .. } | CxType::Pointer(_) if !declared.is_void() => {
                fresh.cast_to(declared)?
            }
            _ => fresh,
        };
        if let Instance::Nullable(nullable) = &mut *self.borrow_mut() {
            nullable.value = Some(fresh);
        }
        Ok(())
    }

    /// Empty a nullable slot
    fn clear(&self) {
        if let Instance::Nullable(nullable) = &mut *self.borrow_mut() {
            nullable.value = None;
        }
    }
}

fn assignment(target: &Instance, value: &Instance) -> Result<Update, RuntimeError> {
    let update = match (target, value) {
        (Instance::Primitive(target), Instance::Primitive(value)) => {
            Update::Primitive(value.converted(target.kind, target.unsigned))
        }
        // An absent value reads as zero
        (Instance::Primitive(target), Instance::Nullable(_)) => {
            Update::Primitive(Primitive::zero(target.kind, target.unsigned))
        }
        (Instance::Primitive(target), Instance::Pointer(pointer)) if pointer.is_null() => {
            Update::Primitive(Primitive::zero(target.kind, target.unsigned))
        }
        (Instance::Pointer(_), Instance::Pointer(pointer)) => Update::Pointer {
            storage: Rc::clone(&pointer.storage),
            offset: pointer.offset,
        },
        (Instance::Pointer(_), Instance::Array(array)) => Update::Pointer {
            storage: Rc::clone(&array.storage),
            offset: 0,
        },
        (Instance::Pointer(_), Instance::Primitive(value))
            if value.is_zero() && !value.is_floating() =>
        {
            Update::Pointer {
                storage: storage_of(Vec::new()),
                offset: 0,
            }
        }
        (Instance::Pointer(_), Instance::Nullable(_)) => Update::Pointer {
            storage: storage_of(Vec::new()),
            offset: 0,
        },
        (Instance::Array(target), Instance::Array(value)) => {
            if Rc::ptr_eq(&target.storage, &value.storage) {
                Update::Nothing
            } else {
                let targets = target.storage.borrow();
                let values = value.storage.borrow();
                Update::Pairs(targets.iter().cloned().zip(values.iter().cloned()).collect())
            }
        }
        (Instance::Array(target), Instance::Pointer(pointer)) => {
            let targets = target.storage.borrow().clone();
            Update::Pairs(targets.into_iter().zip(pointer.remaining()).collect())
        }
        (Instance::Compound(target), Instance::Compound(value)) => {
            let mut pairs = Vec::with_capacity(target.fields.len());
            for (name, field) in &target.fields {
                let Some(source) = value.field(name) else {
                    return Err(RuntimeError::invalid_cast(&value.ty, &target.ty));
                };
                pairs.push((field.clone(), source));
            }
            Update::Pairs(pairs)
        }
        (target, value) => return Err(RuntimeError::invalid_cast(&value.ty(), &target.ty())),
    };
    Ok(update)
}

const DISPLAY_ELEMENTS: usize = 16;

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::Primitive(primitive) => match primitive.payload {
                Payload::Floating(value) => write!(f, "{}", value),
                Payload::Integral(value) if primitive.kind == PrimitiveKind::Char => {
                    let byte = value as u8;
                    if byte.is_ascii_graphic() || byte == b' ' {
                        write!(f, "'{}'", byte as char)
                    } else {
                        write!(f, "{}", value)
                    }
                }
                Payload::Integral(value) => write!(f, "{}", value),
            },
            Instance::Pointer(pointer) if pointer.is_null() => write!(f, "nullptr"),
            Instance::Pointer(pointer) => {
                write!(f, "{}* @{}", pointer.target, pointer.offset)
            }
            Instance::Array(array) => {
                let slots = array.storage.borrow();
                write!(f, "[")?;
                for (i, slot) in slots.iter().take(DISPLAY_ELEMENTS).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", slot)?;
                }
                if slots.len() > DISPLAY_ELEMENTS {
                    write!(f, ", ...")?;
                }
                write!(f, "]")
            }
            Instance::Nullable(NullableInstance {
                value: Some(value), ..
            }) => write!(f, "{}", value),
            Instance::Nullable(_) => write!(f, "null"),
            Instance::Compound(compound) => {
                write!(f, "{} {{", compound.ty)?;
                for (i, (name, value)) in compound.fields.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}{} = {}", sep, name, value)?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(instance) => write!(f, "{}", instance),
            Err(_) => write!(f, "<in use>"),
        }
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceRef({})", self)
    }
}
