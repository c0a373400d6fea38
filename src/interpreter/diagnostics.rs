//! Fault reports and state dumps
//!
//! Frames are torn down as a fault unwinds, so the call stack is recorded by
//! the innermost diagnostic frame the fault leaves and kept until the next run.

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::tree::{SourceLocation, Token};

fn trace_line(name: &str, location: Option<&SourceLocation>) -> String {
    match location {
        Some(location) => format!("{}({})", name, location),
        None => name.to_string(),
    }
}

impl Interpreter {
    /// Record the diagnostic stack, innermost first. Only the first fault
    /// of a run is recorded; outer frames see it already captured.
    pub(crate) fn capture_fault_trace(&mut self) {
        if self.fault_trace.is_some() {
            return;
        }
        let frames = self.state.diagnostics();
        let fault_site = self.nearest_token.as_ref().and_then(|token| token.location.as_ref());
        let mut trace = Vec::with_capacity(frames.len());
        for (depth, frame) in frames.iter().enumerate().rev() {
            // A frame is positioned where it called the next frame in
            let location = match frames.get(depth + 1) {
                Some(callee) => callee.call_site.location.as_ref(),
                None => fault_site,
            };
            trace.push(trace_line(&frame.call_site.image, location));
        }
        if self.config.dump_state_on_fault {
            self.fault_state = Some(self.state.to_string());
        }
        tracing::debug!(depth = trace.len(), "captured fault trace");
        self.fault_trace = Some(trace);
    }

    /// The text the driver prints for a fault: the error, the recorded call
    /// stack and, when enabled, the execution state at the time of the fault
    pub fn fault_report(&self, error: &RuntimeError) -> String {
        let mut report = format!("Error: {}", error);
        for line in self.fault_trace.iter().flatten() {
            report.push_str("\n\tat ");
            report.push_str(line);
        }
        if let Some(state) = &self.fault_state {
            report.push('\n');
            report.push_str(state.trim_end());
        }
        report
    }

    pub(crate) fn report_fault(&self, error: &RuntimeError) {
        if error.is_internal() {
            tracing::error!(%error, "internal fault");
        } else {
            tracing::error!(%error, "program fault");
        }
        eprintln!("{}", self.fault_report(error));
    }

    /// Dump the whole execution state at `TRACE` level
    pub fn log_state(&self) {
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(state = %self.state, "execution state");
        }
    }

    /// Token of the node evaluated most recently that carried a location
    pub fn nearest_token(&self) -> Option<&Token> {
        self.nearest_token.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_line_format() {
        let location = SourceLocation::new(4, 2).in_file("main.jdn");
        assert_eq!(trace_line("start", Some(&location)), "start(main.jdn:4)");
        assert_eq!(trace_line("start", None), "start");
    }
}
