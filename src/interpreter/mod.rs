//! Tree-walking execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: the [`Interpreter`] and its entry points
//! - [`errors`]: runtime faults and statement outcomes
//! - [`dispatch`]: calls, method resolution and constructors
//!
//! # Execution Model
//!
//! The interpreter walks a type-resolved program tree. Expressions push their
//! result onto the value stack; statements discard whatever they leave there
//! and report how they finished through [`Outcome`]. A `return` travels back
//! to the enclosing call as [`Outcome::Returned`], never as an error.
//!
//! # Built-in Functions
//!
//! `calloc`, `free` and `printf` are matched by name before user functions
//! and implemented directly in the engine.

mod builtins;
pub mod constants;
mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod errors;
mod expressions;
mod loops;
mod ops;
mod statements;
mod type_system;

pub use engine::{EngineConfig, Interpreter};
pub use errors::{Outcome, RuntimeError};
