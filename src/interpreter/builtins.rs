//! Built-in functions: `calloc`, `free` and `printf`
//!
//! Builtins are matched by name before user functions. Each runs under its own
//! diagnostic frame so faults inside them show up in the call stack.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::memory::create_array;
use crate::memory::value::{Instance, PointerInstance};
use crate::tree::{CxType, Node, NodeKind, Token};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Calloc,
    Free,
    Printf,
}

impl Builtin {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "calloc" => Some(Builtin::Calloc),
            "free" => Some(Builtin::Free),
            "printf" => Some(Builtin::Printf),
            _ => None,
        }
    }
}

impl Interpreter {
    pub(crate) fn call_builtin(
        &mut self,
        builtin: Builtin,
        call: &Node,
        name: &Token,
        args: &[Node],
    ) -> Result<(), RuntimeError> {
        self.with_diagnostic_frame(name.clone(), |this| match builtin {
            Builtin::Calloc => this.builtin_calloc(call, args),
            Builtin::Free => this.builtin_free(args),
            Builtin::Printf => this.builtin_printf(args),
        })
    }

    /// `calloc(count, sizeof(T))`: a zero-initialized array of `count`
    /// elements of `T`. Without a `sizeof` argument the element type comes
    /// from the call's resolved pointer type.
    fn builtin_calloc(&mut self, call: &Node, args: &[Node]) -> Result<(), RuntimeError> {
        let element = args
            .iter()
            .find_map(|arg| match &arg.kind {
                NodeKind::SizeOf(ty) => Some(ty.clone()),
                _ => None,
            })
            .or_else(|| call.ty.pointee().cloned())
            .ok_or_else(|| RuntimeError::malformed("calloc without an element type"))?;
        let count_arg = args
            .iter()
            .find(|arg| !matches!(arg.kind, NodeKind::SizeOf(_)))
            .ok_or_else(|| RuntimeError::malformed("calloc without an element count"))?;

        let count = self
            .evaluate_value(count_arg)?
            .as_primitive()
            .ok_or_else(|| RuntimeError::malformed("calloc count is not a number"))?
            .as_i64();
        let count = usize::try_from(count)
            .map_err(|_| RuntimeError::segfault(format!("calloc of {} elements", count)))?;

        let program = Rc::clone(&self.program);
        let array = create_array(&element, &[count], &program)?;
        tracing::trace!(%element, count, "calloc");
        self.state.push(array);
        Ok(())
    }

    /// `free(p)`: empty the slot `p` refers to. Freeing null is a no-op.
    fn builtin_free(&mut self, args: &[Node]) -> Result<(), RuntimeError> {
        let [arg] = args else {
            return Err(RuntimeError::malformed("free takes exactly one argument"));
        };
        let value = self.evaluate_value(arg)?;
        let pointer = match &*value.borrow() {
            Instance::Pointer(pointer) => Some(pointer.clone()),
            Instance::Array(array) => Some(array.decay()),
            Instance::Nullable(_) => None,
            Instance::Primitive(primitive) if primitive.is_zero() => None,
            other => {
                return Err(RuntimeError::invalid_cast(
                    &other.ty(),
                    &CxType::void().pointer_to(),
                ))
            }
        };
        if let Some(pointer) = pointer {
            pointer.release()?;
        }
        Ok(())
    }

    /// `printf(format, ...)`: write the format string with escape sequences
    /// expanded. Further arguments are evaluated but not formatted.
    fn builtin_printf(&mut self, args: &[Node]) -> Result<(), RuntimeError> {
        let Some((format, rest)) = args.split_first() else {
            return Err(RuntimeError::malformed("printf without a format string"));
        };
        let format = self.evaluate_value(format)?;
        for arg in rest {
            self.evaluate_value(arg)?;
        }
        let text = format
            .as_pointer()
            .ok_or_else(|| RuntimeError::invalid_cast(&format.ty(), &CxType::char().pointer_to()))?;
        let bytes = render_format(&text)?;
        self.output.write_bytes(&bytes)?;
        Ok(())
    }
}

/// Walk a `char` pointer up to its empty terminator, expanding backslash
/// escapes. Unknown escapes produce nothing.
pub(crate) fn render_format(text: &PointerInstance) -> Result<Vec<u8>, RuntimeError> {
    let mut bytes = Vec::new();
    let mut cursor = text.clone();
    loop {
        let Some(current) = cursor.slot()?.as_primitive() else {
            break;
        };
        cursor = cursor.offset_by(1);
        let byte = current.as_i64() as u8;
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let Some(escaped) = cursor.slot()?.as_primitive() else {
            break;
        };
        cursor = cursor.offset_by(1);
        match escaped.as_i64() as u8 {
            b'n' => bytes.push(b'\n'),
            b't' => bytes.push(b'\t'),
            b'r' => bytes.push(b'\r'),
            b'\\' => bytes.push(b'\\'),
            b'\'' => bytes.push(b'\''),
            b'"' => bytes.push(b'"'),
            b'?' => bytes.push(b'?'),
            _ => {}
        }
    }
    Ok(bytes)
}
