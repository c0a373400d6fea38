//! Resolved type descriptors
//!
//! Every node handed to the engine carries a [`CxType`] assigned by the
//! type-checking phase. The engine consumes these descriptors; it never infers
//! them. Const-qualified types wrap their underlying type in [`CxType::Const`],
//! which the engine strips wherever only the shape of the type matters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive kinds, ordered by conversion rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub fn is_void(self) -> bool {
        matches!(self, PrimitiveKind::Void)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Char | PrimitiveKind::Short | PrimitiveKind::Int | PrimitiveKind::Long
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }
}

/// A fully resolved type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CxType {
    Primitive { kind: PrimitiveKind, unsigned: bool },
    Pointer(Box<CxType>),
    /// `size` is `None` when the dimension is only known at run time
    /// (supplied by the declaration's dimension expressions) or not at all.
    Array {
        element: Box<CxType>,
        size: Option<usize>,
    },
    Struct(String),
    Class(String),
    Const(Box<CxType>),
}

impl Default for CxType {
    fn default() -> Self {
        CxType::void()
    }
}

impl CxType {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        CxType::Primitive {
            kind,
            unsigned: false,
        }
    }

    pub fn unsigned(kind: PrimitiveKind) -> Self {
        CxType::Primitive {
            kind,
            unsigned: true,
        }
    }

    pub fn void() -> Self {
        Self::primitive(PrimitiveKind::Void)
    }

    pub fn char() -> Self {
        Self::primitive(PrimitiveKind::Char)
    }

    pub fn short() -> Self {
        Self::primitive(PrimitiveKind::Short)
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveKind::Int)
    }

    pub fn long() -> Self {
        Self::primitive(PrimitiveKind::Long)
    }

    pub fn float() -> Self {
        Self::primitive(PrimitiveKind::Float)
    }

    pub fn double() -> Self {
        Self::primitive(PrimitiveKind::Double)
    }

    pub fn class(name: impl Into<String>) -> Self {
        CxType::Class(name.into())
    }

    pub fn structure(name: impl Into<String>) -> Self {
        CxType::Struct(name.into())
    }

    pub fn pointer_to(self) -> Self {
        CxType::Pointer(Box::new(self))
    }

    pub fn array_of(self, size: Option<usize>) -> Self {
        CxType::Array {
            element: Box::new(self),
            size,
        }
    }

    pub fn constant(self) -> Self {
        CxType::Const(Box::new(self))
    }

    /// Strip any number of const wrappers
    pub fn unqualified(&self) -> &CxType {
        match self {
            CxType::Const(inner) => inner.unqualified(),
            other => other,
        }
    }

    pub fn as_primitive(&self) -> Option<(PrimitiveKind, bool)> {
        match self.unqualified() {
            CxType::Primitive { kind, unsigned } => Some((*kind, *unsigned)),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.as_primitive(), Some((PrimitiveKind::Void, _)))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.unqualified(), CxType::Pointer(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.unqualified(), CxType::Array { .. })
    }

    /// The type reached through one level of indirection or indexing
    pub fn pointee(&self) -> Option<&CxType> {
        match self.unqualified() {
            CxType::Pointer(inner) => Some(inner),
            CxType::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Struct or class name, if this is a compound type
    pub fn compound_name(&self) -> Option<&str> {
        match self.unqualified() {
            CxType::Struct(name) | CxType::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for CxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CxType::Primitive { kind, unsigned } => {
                if *unsigned {
                    write!(f, "unsigned ")?;
                }
                write!(f, "{}", kind.name())
            }
            CxType::Pointer(inner) => write!(f, "{}*", inner),
            CxType::Array {
                element,
                size: Some(size),
            } => write!(f, "{}[{}]", element, size),
            CxType::Array {
                element,
                size: None,
            } => write!(f, "{}[]", element),
            CxType::Struct(name) => write!(f, "struct {}", name),
            CxType::Class(name) => write!(f, "class {}", name),
            CxType::Const(inner) => write!(f, "const {}", inner),
        }
    }
}
