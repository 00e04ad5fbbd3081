//! # Bounded in-memory log ring.
//!
//! [`LogBuffer`] keeps the most recent child output lines for the UI and
//! status consumers. [`BufferSink`] adapts it to the [`LogSink`] capability so
//! output pumps can feed it directly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::sink::LogSink;

/// Default ring capacity, in lines.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Bounded ring of log lines; the oldest line is dropped on overflow.
pub struct LogBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogBuffer {
    /// Creates an empty ring with the given capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a line, dropping the oldest on overflow.
    pub fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Returns a copy of the buffered lines, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// [`LogSink`] adapter appending each line to a shared [`LogBuffer`].
pub struct BufferSink {
    buffer: Arc<Mutex<LogBuffer>>,
}

impl BufferSink {
    /// Creates a sink feeding the given ring.
    pub fn new(buffer: Arc<Mutex<LogBuffer>>) -> Self {
        Self { buffer }
    }
}

impl LogSink for BufferSink {
    fn emit(&self, line: &str) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(line);
        }
    }
}
