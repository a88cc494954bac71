//! Destinations for finished diagnostic lines

use parking_lot::Mutex;
use std::io::Write;
use tracing::{info, warn};

/// Receives one finished line per handled event
pub trait LineSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Writes lines to the tracing subscriber under the `chaindbg` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LineSink for TracingSink {
    fn emit(&self, line: &str) {
        info!(target: "chaindbg", "{}", line.trim_end_matches('\n'));
    }
}

/// Writes lines verbatim to any writer (stdout by default)
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> LineSink for WriterSink<W> {
    fn emit(&self, line: &str) {
        let mut writer = self.writer.lock();
        if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
            warn!(error = %e, "chaindbgd: Failed to write diagnostic line");
        }
    }
}

/// Keeps every emitted line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines emitted so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl LineSink for MemorySink {
    fn emit(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
