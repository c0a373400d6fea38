//! # Introduction
//!
//! jodin-exec runs type-resolved Jodin programs directly, by walking the
//! program tree instead of compiling it. Jodin is C with classes: pointers,
//! fixed-size arrays, structs, single inheritance and virtual methods.
//!
//! ## Execution pipeline
//!
//! ```text
//! Program tree (JSON) → Program → Interpreter → exit status
//! ```
//!
//! 1. [`tree`]: the resolved program tree, its types and a builder for
//!    constructing trees in code.
//! 2. [`memory`]: the in-process memory model. Values are shared
//!    [`memory::value::InstanceRef`] handles, so pointers alias real storage
//!    and `free` is visible through every alias.
//! 3. [`interpreter`]: evaluates the tree against an
//!    [`memory::stack::ExecutionState`] and reports faults with a
//!    reconstructed call stack.
//! 4. [`output`]: where `printf` writes, stdout or a capture buffer.
//!
//! ## Supported language
//!
//! Types: `char`, `short`, `int`, `long` (signed and unsigned), `float`,
//! `double`, `void`, pointers, arrays, structs and classes.
//! Control flow: `if/else`, `while`, `do-while`, `for`, `break`, `continue`,
//! `return`, `?:`, short-circuit `&&` and `||`.
//! Built-ins: `calloc`, `free`, `printf`, `sizeof`.

use std::sync::Once;

pub mod interpreter;
pub mod memory;
pub mod output;
pub mod tree;

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber filtered by `RUST_LOG`. Does nothing when
/// `RUST_LOG` is unset, and only the first call has any effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}
