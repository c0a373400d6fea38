//! Program output sink
//!
//! `printf` writes raw bytes here. The sink either forwards to stdout or
//! captures into a buffer, so tests can assert on exactly what a program
//! printed.

use std::io::{self, Write};

/// Where program output goes
#[derive(Debug, Clone, Default)]
pub enum OutputSink {
    #[default]
    Stdout,
    Buffer(Vec<u8>),
}

impl OutputSink {
    pub fn stdout() -> Self {
        OutputSink::Stdout
    }

    pub fn buffer() -> Self {
        OutputSink::Buffer(Vec::new())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self {
            OutputSink::Stdout => io::stdout().lock().write_all(bytes),
            OutputSink::Buffer(buffer) => {
                buffer.extend_from_slice(bytes);
                Ok(())
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout => io::stdout().flush(),
            OutputSink::Buffer(_) => Ok(()),
        }
    }

    /// Captured bytes; empty for stdout
    pub fn captured(&self) -> &[u8] {
        match self {
            OutputSink::Stdout => &[],
            OutputSink::Buffer(buffer) => buffer,
        }
    }

    /// Captured output as text, with invalid UTF-8 replaced
    pub fn get_output(&self) -> String {
        String::from_utf8_lossy(self.captured()).into_owned()
    }

    /// Captured output split into lines, without a trailing empty line
    pub fn lines(&self) -> Vec<String> {
        let text = self.get_output();
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        if lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        lines
    }

    pub fn clear(&mut self) {
        if let OutputSink::Buffer(buffer) = self {
            buffer.clear();
        }
    }
}
