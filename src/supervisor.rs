//! # Supervisor: the top-level control surface.
//!
//! The [`Supervisor`] composes a [`ProcessManager`] with the active
//! configuration, owns the bounded in-memory log ring, and is the single
//! object the UI, CLI, and any remote facade consume.
//!
//! ## Architecture
//! ```text
//! Config ──► Supervisor::new()
//!              │
//!              ├──► ProcessManager (name → ProcessRuntime)
//!              │        └──► runtimes emit child output via SinkHandle
//!              │
//!              ├──► log ring (capacity 1000, oldest dropped)
//!              │
//!              └──► control surface:
//!                    start_all / stop_all
//!                    start_process / stop_process / restart_process
//!                    reload_config
//!                    status / process_status
//!                    add_log / logs / set_logger
//! ```
//!
//! ## Rules
//! - Reload is coarse: every runtime is torn down and rebuilt from the new
//!   document, even for unchanged declarations. Requests racing a reload may
//!   transiently observe `NotFound`; that is the accepted contract.
//! - The log ring has its own lock, independent of manager and runtime locks;
//!   sinks never take the latter.
//! - Restart is stop → brief settle → start; stopping an already resting
//!   process is treated as benign.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::error::ControlError;
use crate::logging::{BufferSink, LogBuffer, LogSink, SinkHandle, TeeSink};
use crate::manager::ProcessManager;
use crate::process::ProcessInfo;

/// Settle period between the stop and start halves of a restart.
const RESTART_SETTLE: Duration = Duration::from_millis(100);

/// Active configuration and the manager built from it, replaced wholesale on
/// reload.
struct Active {
    config: Config,
    manager: ProcessManager,
}

/// Top-level supervisor over a declared process fleet.
pub struct Supervisor {
    active: RwLock<Active>,
    logs: Arc<Mutex<LogBuffer>>,
    sink: SinkHandle,
}

impl Supervisor {
    /// Builds a supervisor for the configuration; every process starts in
    /// `Stopped` until `start_all` or an explicit start.
    pub fn new(config: Config) -> Self {
        let logs = Arc::new(Mutex::new(LogBuffer::default()));
        let sink = SinkHandle::new(Arc::new(BufferSink::new(Arc::clone(&logs))));

        let manager = ProcessManager::new(sink.clone());
        for proc in &config.processes {
            // Names are unique post-normalization and nothing is live yet.
            let _ = manager.add(proc.clone());
        }

        Self {
            active: RwLock::new(Active { config, manager }),
            logs,
            sink,
        }
    }

    /// Starts every process declared with `autostart`.
    pub fn start_all(&self) -> Result<(), ControlError> {
        self.active().manager.start_all()
    }

    /// Signals a stop to every live process; teardown completes asynchronously.
    pub fn stop_all(&self) {
        self.active().manager.stop_all();
    }

    /// Starts one process by name.
    pub fn start_process(&self, name: &str) -> Result<(), ControlError> {
        self.active().manager.start(name)
    }

    /// Stops one process by name.
    pub fn stop_process(&self, name: &str) -> Result<(), ControlError> {
        self.active().manager.stop(name)
    }

    /// Restarts one process: stop, a brief settle, start.
    ///
    /// A process that was already resting is simply started; `NotRunning`
    /// from the stop half is benign.
    pub async fn restart_process(&self, name: &str) -> Result<(), ControlError> {
        match self.stop_process(name) {
            Ok(()) | Err(ControlError::NotRunning { .. }) => {}
            Err(e) => return Err(e),
        }
        tokio::time::sleep(RESTART_SETTLE).await;
        self.start_process(name)
    }

    /// Replaces the whole fleet with the new configuration.
    ///
    /// Stops every current process, builds a fresh manager seeded from the
    /// new document, and re-runs `start_all`. The old supervisory loops
    /// finish their teardowns in the background.
    pub fn reload_config(&self, new_config: Config) -> Result<(), ControlError> {
        let mut active = self.write_active();
        active.manager.stop_all();

        let manager = ProcessManager::new(self.sink.clone());
        for proc in &new_config.processes {
            manager.add(proc.clone())?;
        }
        active.config = new_config;
        active.manager = manager;
        info!("configuration reloaded");

        active.manager.start_all()
    }

    /// Point-in-time snapshot of every process.
    pub fn status(&self) -> HashMap<String, ProcessInfo> {
        self.active().manager.status()
    }

    /// Point-in-time snapshot of one process.
    pub fn process_status(&self, name: &str) -> Result<ProcessInfo, ControlError> {
        self.active().manager.process_status(name)
    }

    /// Appends a line to the in-memory log ring.
    pub fn add_log(&self, line: impl Into<String>) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(line);
        }
    }

    /// Copy of the buffered log lines, oldest first.
    pub fn logs(&self) -> Vec<String> {
        match self.logs.lock() {
            Ok(logs) => logs.snapshot(),
            Err(_) => Vec::new(),
        }
    }

    /// Installs an external sink alongside the log ring.
    ///
    /// Child output keeps feeding the ring and additionally drives `sink`;
    /// used by the debug CLI flag and by foreground mode.
    pub fn set_logger(&self, sink: Arc<dyn LogSink>) {
        let ring: Arc<dyn LogSink> = Arc::new(BufferSink::new(Arc::clone(&self.logs)));
        let tee: Arc<dyn LogSink> = Arc::new(TeeSink::new(vec![ring, sink]));
        self.active().manager.set_logger(tee);
    }

    fn active(&self) -> RwLockReadGuard<'_, Active> {
        self.active.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_active(&self) -> RwLockWriteGuard<'_, Active> {
        self.active.write().unwrap_or_else(|e| e.into_inner())
    }
}
