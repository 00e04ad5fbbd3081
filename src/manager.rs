//! # ProcessManager: the name → runtime map and its fan-out operations.
//!
//! The manager owns every [`ProcessRuntime`] behind a reader/writer lock and
//! services the fan-out operations the supervisor exposes: add, start, stop,
//! start-all, stop-all, status, and sink installation.
//!
//! ## Rules
//! - Lock order is strict: map lock before any runtime lock, and a holder of
//!   a runtime lock must never take the map lock.
//! - `stop_all` is fire-and-forget; supervisory loops finish the teardowns.
//! - `status` snapshots each runtime under its own lock only.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::error;

use crate::config::ProcessConfig;
use crate::error::ControlError;
use crate::logging::{LogSink, SinkHandle};
use crate::process::{ProcessInfo, ProcessRuntime};

/// Mapping from process name to its runtime.
pub struct ProcessManager {
    processes: RwLock<HashMap<String, Arc<ProcessRuntime>>>,
    sink: SinkHandle,
}

impl ProcessManager {
    /// Creates an empty manager whose runtimes will emit into `sink`.
    pub fn new(sink: SinkHandle) -> Self {
        Self {
            processes: RwLock::new(HashMap::new()),
            sink,
        }
    }

    /// Inserts a new runtime in `Stopped` for the declaration.
    ///
    /// A duplicate name overwrites the existing entry only when that entry is
    /// not live; a live entry must be stopped first.
    pub fn add(&self, config: ProcessConfig) -> Result<(), ControlError> {
        let mut map = self.write_map();
        if let Some(existing) = map.get(&config.name) {
            if existing.is_live() {
                return Err(ControlError::AlreadyRunning {
                    name: config.name.clone(),
                });
            }
        }
        let name = config.name.clone();
        let runtime = Arc::new(ProcessRuntime::new(config, self.sink.clone()));
        map.insert(name, runtime);
        Ok(())
    }

    /// Installs a new sink for the manager and every runtime.
    ///
    /// Runtimes share the manager's [`SinkHandle`], so swapping its target
    /// under the map lock re-routes all output pumps atomically.
    pub fn set_logger(&self, sink: Arc<dyn LogSink>) {
        let _map = self.write_map();
        self.sink.replace(sink);
    }

    /// Starts the named process.
    pub fn start(&self, name: &str) -> Result<(), ControlError> {
        let runtime = self.lookup(name)?;
        runtime.start()
    }

    /// Requests a stop of the named process.
    pub fn stop(&self, name: &str) -> Result<(), ControlError> {
        let runtime = self.lookup(name)?;
        runtime.stop()
    }

    /// Starts every process declared with `autostart`.
    ///
    /// Failures are logged per process; the first error is returned after the
    /// whole map has been attempted.
    pub fn start_all(&self) -> Result<(), ControlError> {
        let map = self.read_map();
        let mut first_err = None;
        for (name, runtime) in map.iter() {
            if !runtime.config().autostart {
                continue;
            }
            if let Err(e) = runtime.start() {
                error!(process = %name, error = %e, "autostart failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Signals a stop to every live runtime. Does not wait for deaths.
    pub fn stop_all(&self) {
        let map = self.read_map();
        for runtime in map.values() {
            if runtime.is_live() {
                // NotRunning here just means the runtime settled in between.
                let _ = runtime.stop();
            }
        }
    }

    /// Builds a point-in-time snapshot of every runtime.
    pub fn status(&self) -> HashMap<String, ProcessInfo> {
        let map = self.read_map();
        map.iter()
            .map(|(name, runtime)| (name.clone(), runtime.info()))
            .collect()
    }

    /// Snapshot of a single runtime.
    pub fn process_status(&self, name: &str) -> Result<ProcessInfo, ControlError> {
        let runtime = self.lookup(name)?;
        Ok(runtime.info())
    }

    fn lookup(&self, name: &str) -> Result<Arc<ProcessRuntime>, ControlError> {
        let map = self.read_map();
        map.get(name)
            .cloned()
            .ok_or_else(|| ControlError::NotFound {
                name: name.to_string(),
            })
    }

    fn read_map(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ProcessRuntime>>> {
        self.processes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ProcessRuntime>>> {
        self.processes.write().unwrap_or_else(|e| e.into_inner())
    }
}
