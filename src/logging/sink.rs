//! # Pluggable sink for child output lines.
//!
//! [`LogSink`] is the extension point for consuming the multiplexed child
//! output stream. The supervisor installs a default sink that feeds its log
//! ring; the debug CLI flag swaps in a [`StdoutSink`], and foreground mode
//! wraps one in a [`PrefixSink`] to follow a single process.
//!
//! ## Contract
//! - `emit` is called from output-pump tasks with one formatted line at a
//!   time; implementations must be cheap and non-blocking.
//! - Implementations must never acquire a manager or runtime lock.

use std::sync::{Arc, RwLock};

/// Consumer of formatted child output lines.
pub trait LogSink: Send + Sync {
    /// Handles a single formatted line.
    fn emit(&self, line: &str);
}

/// Shared, swappable handle to the active [`LogSink`].
///
/// The handle is cloned into every runtime at construction; replacing the
/// sink through any clone re-routes all output pumps at once. Replacement is
/// atomic with respect to concurrent `emit` calls.
#[derive(Clone)]
pub struct SinkHandle {
    inner: Arc<RwLock<Arc<dyn LogSink>>>,
}

impl SinkHandle {
    /// Creates a handle pointing at the given sink.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(sink)),
        }
    }

    /// Emits a line through the currently installed sink.
    pub fn emit(&self, line: &str) {
        let sink = match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(_) => return,
        };
        sink.emit(line);
    }

    /// Replaces the installed sink.
    pub fn replace(&self, sink: Arc<dyn LogSink>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = sink;
        }
    }
}

/// Prints each line to stdout. Installed by the `--debug` CLI flag.
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn emit(&self, line: &str) {
        println!("{line}");
    }
}

/// Fans one line out to several sinks in order.
pub struct TeeSink {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl TeeSink {
    /// Creates a tee over the given sinks.
    pub fn new(sinks: Vec<Arc<dyn LogSink>>) -> Self {
        Self { sinks }
    }
}

impl LogSink for TeeSink {
    fn emit(&self, line: &str) {
        for sink in &self.sinks {
            sink.emit(line);
        }
    }
}

/// Forwards only lines carrying a given `[name]` tag.
///
/// Relies on the stable line format `[<name>][<pid>] <text>`; used by
/// foreground mode to follow one process out of the multiplexed stream.
pub struct PrefixSink {
    prefix: String,
    inner: Arc<dyn LogSink>,
}

impl PrefixSink {
    /// Creates a filter passing only lines of the named process.
    pub fn new(name: &str, inner: Arc<dyn LogSink>) -> Self {
        Self {
            prefix: format!("[{name}]"),
            inner,
        }
    }
}

impl LogSink for PrefixSink {
    fn emit(&self, line: &str) {
        if line.starts_with(&self.prefix) {
            self.inner.emit(line);
        }
    }
}
