// Constants for the execution engine

/// Function invoked by [`Interpreter::run`](crate::interpreter::engine::Interpreter::run)
pub const ENTRY_SYMBOL: &str = "start";

/// Status returned by `run` when the program faults or the entry point
/// finishes without returning a value
pub const FAILURE_STATUS: i32 = -1;

/// Name the receiver is bound to inside methods and constructors
pub const RECEIVER_NAME: &str = "this";

/// Diagnostic frame name suffix for constructors (`Point::<init>`)
pub const CONSTRUCTOR_SUFFIX: &str = "<init>";

// Fixed type sizes reported by `sizeof`
pub const CHAR_SIZE: u64 = 1;
pub const SHORT_SIZE: u64 = 2;
pub const INT_SIZE: u64 = 4;
pub const FLOAT_SIZE: u64 = 4;
pub const LONG_SIZE: u64 = 8;
pub const DOUBLE_SIZE: u64 = 8;
pub const POINTER_SIZE: u64 = 8;

/// Remaining stack below which evaluation grows a new segment
pub const STACK_RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment
pub const STACK_SEGMENT_SIZE: usize = 1024 * 1024;
