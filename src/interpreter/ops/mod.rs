pub mod access;
pub mod assign;
pub mod binary;
pub mod unary;

pub(crate) use binary::binary_operation;
