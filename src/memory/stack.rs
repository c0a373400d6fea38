//! Execution state
//!
//! This module provides the mutable state threaded through evaluation:
//! - the value stack, where expressions leave their results
//! - binding frames, one per call plus one per lexical scope
//! - dispatch contexts, deciding which receiver `this` refers to
//! - diagnostic frames, used to reconstruct a call stack on faults
//!
//! # Frames
//!
//! A call frame starts from the global bindings only, so callees never see
//! their caller's locals. A lexical scope starts from a copy of the enclosing
//! frame, so inner declarations shadow outer ones and vanish when the scope
//! closes. Opening a call frame also records the value stack depth, and closing
//! it truncates the value stack back to that depth.

use super::value::{InstanceRef, Primitive};
use crate::interpreter::errors::RuntimeError;
use crate::tree::Token;
use rustc_hash::FxHashMap;
use std::fmt;

type Bindings = FxHashMap<String, InstanceRef>;

/// One entry of the reconstructed call stack
#[derive(Debug, Clone)]
pub struct DiagnosticFrame {
    pub call_site: Token,
    /// Bindings made while this frame was innermost, in binding order
    pub locals: Vec<(String, InstanceRef)>,
}

#[derive(Debug, Clone)]
pub struct ExecutionState {
    values: Vec<InstanceRef>,
    globals: Bindings,
    frames: Vec<Bindings>,
    /// Value stack depth at each open call frame
    call_marks: Vec<usize>,
    /// Number of binding frames at each open call frame
    frame_marks: Vec<usize>,
    receivers: Vec<InstanceRef>,
    /// Whether `this` resolves in each dispatch context
    receiver_visible: Vec<bool>,
    diagnostics: Vec<DiagnosticFrame>,
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionState {
    pub fn new() -> Self {
        ExecutionState {
            values: Vec::new(),
            globals: Bindings::default(),
            frames: vec![Bindings::default()],
            call_marks: Vec::new(),
            frame_marks: Vec::new(),
            receivers: Vec::new(),
            receiver_visible: vec![false],
            diagnostics: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Value stack
    // ---------------------------------------------------------------------

    pub fn push(&mut self, value: InstanceRef) {
        self.values.push(value);
    }

    pub fn push_primitive(&mut self, primitive: Primitive) {
        self.values.push(InstanceRef::primitive(primitive));
    }

    /// Pop the top value; a non-empty nullable comes back as its contents
    pub fn pop(&mut self) -> Result<InstanceRef, RuntimeError> {
        self.values
            .pop()
            .map(|value| value.flatten())
            .ok_or(RuntimeError::ValueStackUnderflow { location: None })
    }

    /// The top `count` values, bottom first, without popping
    pub fn peek(&self, count: usize) -> Result<&[InstanceRef], RuntimeError> {
        let start = self
            .values
            .len()
            .checked_sub(count)
            .ok_or(RuntimeError::ValueStackUnderflow { location: None })?;
        Ok(&self.values[start..])
    }

    pub fn value_depth(&self) -> usize {
        self.values.len()
    }

    pub fn truncate_values(&mut self, depth: usize) {
        self.values.truncate(depth);
    }

    pub fn values(&self) -> &[InstanceRef] {
        &self.values
    }

    // ---------------------------------------------------------------------
    // Binding frames
    // ---------------------------------------------------------------------

    /// Bind `name` in the innermost frame and record it for diagnostics
    pub fn bind(&mut self, name: &str, value: InstanceRef) {
        if let Some(frame) = self.diagnostics.last_mut() {
            frame.locals.push((name.to_string(), value.clone()));
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<InstanceRef> {
        self.frames.last().and_then(|frame| frame.get(name)).cloned()
    }

    /// Snapshot the current bindings as the globals every call frame starts from
    pub fn seal_globals(&mut self) {
        if let Some(frame) = self.frames.last() {
            self.globals = frame.clone();
        }
    }

    pub fn globals(&self) -> &FxHashMap<String, InstanceRef> {
        &self.globals
    }

    pub fn open_call(&mut self) {
        self.call_marks.push(self.values.len());
        self.frame_marks.push(self.frames.len());
        self.frames.push(self.globals.clone());
    }

    /// Close the innermost call frame along with any lexical scopes left
    /// open inside it
    pub fn close_call(&mut self) {
        let (Some(depth), Some(frames)) = (self.call_marks.pop(), self.frame_marks.pop()) else {
            tracing::error!("close_call without a matching open_call");
            return;
        };
        self.frames.truncate(frames.max(1));
        self.values.truncate(depth);
    }

    pub fn open_scope(&mut self) {
        let inherited = self.frames.last().cloned().unwrap_or_default();
        self.frames.push(inherited);
    }

    pub fn close_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        } else {
            tracing::error!("close_scope would drop the global frame");
        }
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn call_depth(&self) -> usize {
        self.call_marks.len()
    }

    // ---------------------------------------------------------------------
    // Dispatch contexts
    // ---------------------------------------------------------------------

    /// Enter a method or constructor body running against `receiver`
    pub fn push_receiver(&mut self, receiver: InstanceRef) {
        self.receivers.push(receiver);
        self.receiver_visible.push(true);
    }

    /// Enter a free function body, where `this` does not resolve
    pub fn push_free_context(&mut self) {
        self.receiver_visible.push(false);
    }

    pub fn pop_dispatch(&mut self) {
        match self.receiver_visible.pop() {
            Some(true) => {
                self.receivers.pop();
            }
            Some(false) => {}
            None => tracing::error!("pop_dispatch without a matching push"),
        }
        if self.receiver_visible.is_empty() {
            self.receiver_visible.push(false);
        }
    }

    pub fn receiver(&self) -> Option<InstanceRef> {
        match self.receiver_visible.last() {
            Some(true) => self.receivers.last().cloned(),
            _ => None,
        }
    }

    pub fn receivers(&self) -> &[InstanceRef] {
        &self.receivers
    }

    // ---------------------------------------------------------------------
    // Diagnostic frames
    // ---------------------------------------------------------------------

    pub fn enter_diagnostic(&mut self, call_site: Token) {
        self.diagnostics.push(DiagnosticFrame {
            call_site,
            locals: Vec::new(),
        });
    }

    pub fn exit_diagnostic(&mut self) {
        self.diagnostics.pop();
    }

    pub fn diagnostics(&self) -> &[DiagnosticFrame] {
        &self.diagnostics
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Globals:")?;
        let mut globals: Vec<_> = self.globals.iter().collect();
        globals.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in globals {
            writeln!(f, "  {} = {}", name, value)?;
        }
        for (depth, frame) in self.diagnostics.iter().enumerate() {
            let indent = "  ".repeat(depth);
            writeln!(f, "{}Frame = {}", indent, frame.call_site.image)?;
            for (name, value) in &frame.locals {
                writeln!(f, "{}  + {} = {}", indent, name, value)?;
            }
        }
        writeln!(f, "Receivers:")?;
        for receiver in self.receivers.iter().rev() {
            writeln!(f, "  {}", receiver)?;
        }
        writeln!(f, "Value stack:")?;
        for value in self.values.iter().rev() {
            writeln!(f, "  {}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> InstanceRef {
        InstanceRef::primitive(Primitive::int(value))
    }

    #[test]
    fn test_call_frame_hides_caller_locals() {
        let mut state = ExecutionState::new();
        state.bind("limit", int(10));
        state.seal_globals();
        state.bind("local", int(1));

        state.open_call();
        assert!(state.lookup("limit").is_some());
        assert!(state.lookup("local").is_none());
        state.close_call();

        assert!(state.lookup("local").is_some());
    }

    #[test]
    fn test_scope_shadowing_is_undone() {
        let mut state = ExecutionState::new();
        state.bind("x", int(1));
        state.open_scope();
        state.bind("x", int(2));
        assert_eq!(state.lookup("x").unwrap().as_primitive().unwrap().as_i64(), 2);
        state.close_scope();
        assert_eq!(state.lookup("x").unwrap().as_primitive().unwrap().as_i64(), 1);
    }

    #[test]
    fn test_close_call_truncates_value_stack_and_scopes() {
        let mut state = ExecutionState::new();
        state.push(int(1));
        let frames = state.frame_depth();

        state.open_call();
        state.push(int(2));
        state.push(int(3));
        state.open_scope();
        state.open_scope();
        state.close_call();

        assert_eq!(state.value_depth(), 1);
        assert_eq!(state.frame_depth(), frames);
    }

    #[test]
    fn test_receiver_hidden_in_free_function() {
        let mut state = ExecutionState::new();
        state.push_receiver(int(7));
        assert!(state.receiver().is_some());
        state.push_free_context();
        assert!(state.receiver().is_none());
        state.pop_dispatch();
        assert!(state.receiver().is_some());
        state.pop_dispatch();
        assert!(state.receiver().is_none());
    }

    #[test]
    fn test_pop_flattens_and_underflows() {
        let mut state = ExecutionState::new();
        let value = int(11);
        state.push(value.to_nullable());
        let popped = state.pop().unwrap();
        assert!(popped.ptr_eq(&value));
        assert_eq!(popped.as_primitive().unwrap().as_i64(), 11);

        assert!(matches!(
            state.pop(),
            Err(RuntimeError::ValueStackUnderflow { .. })
        ));
    }
}
