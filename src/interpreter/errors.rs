//! Runtime error types for the execution engine
//!
//! This module defines [`RuntimeError`], the single fatal-fault type every
//! evaluation returns through `Result`. Non-local control flow (return, break,
//! continue) is not an error; it travels as [`Outcome`].
//!
//! Faults raised deep inside the memory model carry no location. The evaluator
//! attaches the location of the node being evaluated on the way out via
//! [`RuntimeError::or_location`], so the innermost node wins.

use crate::memory::value::InstanceRef;
use crate::tree::{CxType, SourceLocation};
use thiserror::Error;

/// How a statement finished when it did not fault
#[derive(Debug, Clone)]
pub enum Outcome {
    Normal,
    Returned(Option<InstanceRef>),
    Break,
    Continue,
}

impl Outcome {
    pub fn is_normal(&self) -> bool {
        matches!(self, Outcome::Normal)
    }
}

fn at(location: &Option<SourceLocation>) -> String {
    match location {
        Some(location) => format!(" at {}", location),
        None => String::new(),
    }
}

/// Runtime errors that can occur during execution
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Out-of-bounds index, null dereference or use of an absent value
    #[error("Segmentation fault: {message}{}", at(.location))]
    SegmentationFault {
        message: String,
        location: Option<SourceLocation>,
    },

    /// Conversion the cast matrix does not allow
    #[error("Invalid cast from {from} to {to}{}", at(.location))]
    InvalidCast {
        from: String,
        to: String,
        location: Option<SourceLocation>,
    },

    #[error("Undefined symbol '{name}'{}", at(.location))]
    UndefinedSymbol {
        name: String,
        location: Option<SourceLocation>,
    },

    /// No method of the receiver's class or its ancestors matched the call
    #[error("No method '{name}' on class {class} accepts ({args}){}", at(.location))]
    UnresolvedMethod {
        class: String,
        name: String,
        args: String,
        location: Option<SourceLocation>,
    },

    /// The tree handed over violates an invariant the type checker guarantees
    #[error("Malformed program tree: {message}{}", at(.location))]
    MalformedTree {
        message: String,
        location: Option<SourceLocation>,
    },

    #[error("{operation} by zero{}", at(.location))]
    DivisionByZero {
        operation: String,
        location: Option<SourceLocation>,
    },

    #[error("Value stack underflow{}", at(.location))]
    ValueStackUnderflow { location: Option<SourceLocation> },

    #[error("No entry point '{name}' defined")]
    MissingEntryPoint { name: String },

    #[error("Array of {element} declared without a size{}", at(.location))]
    UnsizedArray {
        element: String,
        location: Option<SourceLocation>,
    },

    #[error("Failed to write program output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to load program tree: {0}")]
    ProgramLoad(#[from] serde_json::Error),
}

impl RuntimeError {
    pub fn segfault(message: impl Into<String>) -> Self {
        RuntimeError::SegmentationFault {
            message: message.into(),
            location: None,
        }
    }

    pub fn invalid_cast(from: &CxType, to: &CxType) -> Self {
        RuntimeError::InvalidCast {
            from: from.to_string(),
            to: to.to_string(),
            location: None,
        }
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        RuntimeError::UndefinedSymbol {
            name: name.into(),
            location: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        RuntimeError::MalformedTree {
            message: message.into(),
            location: None,
        }
    }

    pub fn division_by_zero(operation: &str) -> Self {
        RuntimeError::DivisionByZero {
            operation: operation.to_string(),
            location: None,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            RuntimeError::SegmentationFault { location, .. }
            | RuntimeError::InvalidCast { location, .. }
            | RuntimeError::UndefinedSymbol { location, .. }
            | RuntimeError::UnresolvedMethod { location, .. }
            | RuntimeError::MalformedTree { location, .. }
            | RuntimeError::DivisionByZero { location, .. }
            | RuntimeError::ValueStackUnderflow { location }
            | RuntimeError::UnsizedArray { location, .. } => location.as_ref(),
            RuntimeError::MissingEntryPoint { .. }
            | RuntimeError::Output(_)
            | RuntimeError::ProgramLoad(_) => None,
        }
    }

    /// Fill in the location if none has been recorded yet
    pub fn or_location(mut self, fallback: Option<&SourceLocation>) -> Self {
        let Some(fallback) = fallback else {
            return self;
        };
        match &mut self {
            RuntimeError::SegmentationFault { location, .. }
            | RuntimeError::InvalidCast { location, .. }
            | RuntimeError::UndefinedSymbol { location, .. }
            | RuntimeError::UnresolvedMethod { location, .. }
            | RuntimeError::MalformedTree { location, .. }
            | RuntimeError::DivisionByZero { location, .. }
            | RuntimeError::ValueStackUnderflow { location }
            | RuntimeError::UnsizedArray { location, .. } => {
                if location.is_none() {
                    *location = Some(fallback.clone());
                }
            }
            RuntimeError::MissingEntryPoint { .. }
            | RuntimeError::Output(_)
            | RuntimeError::ProgramLoad(_) => {}
        }
        self
    }

    /// Faults that indicate a bug in the engine or the tree handed to it
    /// rather than in the running program
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            RuntimeError::UnresolvedMethod { .. }
                | RuntimeError::MalformedTree { .. }
                | RuntimeError::ValueStackUnderflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innermost_location_is_kept() {
        let inner = SourceLocation::new(3, 1).in_file("list.jdn");
        let outer = SourceLocation::new(9, 1).in_file("list.jdn");
        let error = RuntimeError::segfault("index 4 out of bounds")
            .or_location(Some(&inner))
            .or_location(Some(&outer));
        assert_eq!(error.location(), Some(&inner));
        assert_eq!(
            error.to_string(),
            "Segmentation fault: index 4 out of bounds at list.jdn:3"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(RuntimeError::malformed("dangling break").is_internal());
        assert!(!RuntimeError::division_by_zero("Division").is_internal());
    }
}
