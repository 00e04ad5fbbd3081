//! # ProcessRuntime: single-process supervisor.
//!
//! One [`ProcessRuntime`] per declared process. It owns the child handle, the
//! externally visible state, the restart accounting, and the per-episode
//! cancellation token, and drives the supervisory loop.
//!
//! ## Architecture
//! ```text
//! ProcessConfig ──► ProcessRuntime::start()
//!
//! loop {
//!   ├─► check cancellation (fast-path)
//!   ├─► status = Starting, stamp start_time
//!   ├─► spawn child
//!   │     ├─► failure → status = Failed, record cause, exit (no restart)
//!   │     └─► success → status = Running, start output pumps
//!   ├─► select:
//!   │     ├─► quit fires  → graceful/forced teardown → Stopped, exit
//!   │     └─► self-exit   → classify: clean → Stopped, else Failed + cause
//!   └─► relaunch decision (self-exit only):
//!         ├─► auto-restart off        → exit
//!         ├─► restart cap reached     → Failed, disarm, exit
//!         └─► otherwise → status = Starting, sleep backoff (cancellable),
//!             restart_count += 1, continue
//! }
//! ```
//!
//! ## Rules
//! - Exactly one supervisory loop per runtime; `start()` only launches one
//!   from a resting state (`Stopped`/`Failed`).
//! - `stop()` never blocks; teardown completion is the loop's job.
//! - A fresh cancellation token is created on each `start()` and consumed by
//!   at most one `stop()`; tokens are never reused across episodes.
//! - The backoff delay resets per episode and grows per relaunch; the counter
//!   increments only after the inter-restart sleep actually elapsed.
//! - During the inter-restart sleep the status is `Starting`, so an external
//!   `stop()` lands without waiting out the backoff.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ProcessConfig;
use crate::error::{ControlError, ExitError};
use crate::logging::SinkHandle;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::process::child;
use crate::process::status::{ProcessInfo, ProcessStatus};

/// Maximum automatic relaunches within one start episode.
pub const MAX_RESTARTS: u32 = 5;

/// Mutable runtime state, guarded by the runtime's mutex.
struct RuntimeState {
    status: ProcessStatus,
    pid: Option<u32>,
    start_time: Option<SystemTime>,
    restart_count: u32,
    auto_restart: bool,
    exit_error: Option<ExitError>,
    quit: Option<CancellationToken>,
}

/// Supervises one declared process: spawn, monitor, restart, tear down.
pub struct ProcessRuntime {
    id: String,
    config: ProcessConfig,
    backoff: BackoffPolicy,
    sink: SinkHandle,
    state: Mutex<RuntimeState>,
}

impl ProcessRuntime {
    /// Creates a runtime in `Stopped` for the given declaration.
    pub fn new(config: ProcessConfig, sink: SinkHandle) -> Self {
        Self {
            id: config.name.clone(),
            config,
            backoff: BackoffPolicy::default(),
            sink,
            state: Mutex::new(RuntimeState {
                status: ProcessStatus::Stopped,
                pid: None,
                start_time: None,
                restart_count: 0,
                auto_restart: false,
                exit_error: None,
                quit: None,
            }),
        }
    }

    /// The process name this runtime supervises.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The immutable declaration this runtime was built from.
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Whether a supervisory episode is currently live.
    pub fn is_live(&self) -> bool {
        self.state().status.is_live()
    }

    /// Begins a new start episode.
    ///
    /// Fails with [`ControlError::AlreadyRunning`] unless the runtime rests in
    /// `Stopped` or `Failed`. Clears the previous episode's error and counter,
    /// re-arms auto-restart from the declaration, installs a fresh quit token,
    /// and launches the supervisory loop on a detached task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<(), ControlError> {
        let quit = {
            let mut st = self.state();
            if st.status.is_live() {
                return Err(ControlError::AlreadyRunning {
                    name: self.id.clone(),
                });
            }
            st.status = ProcessStatus::Starting;
            st.exit_error = None;
            st.restart_count = 0;
            st.auto_restart = self.config.restart_policy() == RestartPolicy::Always;

            let quit = CancellationToken::new();
            st.quit = Some(quit.clone());
            quit
        };

        let runtime = Arc::clone(self);
        tokio::spawn(runtime.supervise(quit));
        Ok(())
    }

    /// Requests teardown of the current episode.
    ///
    /// Fails with [`ControlError::NotRunning`] unless the runtime is `Running`
    /// or `Starting`. Disarms auto-restart so a stopped process never
    /// resurrects, flips the status to `Stopping`, and fires the quit token.
    /// Does not wait for the child to die.
    pub fn stop(&self) -> Result<(), ControlError> {
        let mut st = self.state();
        if !matches!(
            st.status,
            ProcessStatus::Running | ProcessStatus::Starting
        ) {
            return Err(ControlError::NotRunning {
                name: self.id.clone(),
            });
        }
        st.status = ProcessStatus::Stopping;
        st.auto_restart = false;
        if let Some(quit) = &st.quit {
            quit.cancel();
        }
        Ok(())
    }

    /// Returns a point-in-time snapshot of the runtime's state.
    pub fn info(&self) -> ProcessInfo {
        let st = self.state();
        ProcessInfo {
            pid: st.pid,
            status: st.status,
            start_time: st.start_time,
            restarts: st.restart_count,
            exit_error: st.exit_error.clone(),
        }
    }

    fn state(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The supervisory loop. One iteration is one child episode; the loop
    /// exits only into a resting state.
    async fn supervise(self: Arc<Self>, quit: CancellationToken) {
        let mut prev_delay = None;

        loop {
            if quit.is_cancelled() {
                self.settle_stopped();
                return;
            }

            {
                let mut st = self.state();
                st.status = ProcessStatus::Starting;
                st.start_time = Some(SystemTime::now());
            }

            let mut cmd = child::build_command(&self.config);
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    // Spawn failures are terminal: restarting would just spin
                    // on a bad declaration.
                    let mut st = self.state();
                    st.status = ProcessStatus::Failed;
                    st.pid = None;
                    st.exit_error = Some(ExitError::Spawn {
                        reason: e.to_string(),
                    });
                    error!(process = %self.id, error = %e, "failed to spawn");
                    return;
                }
            };

            let pid = child.id().unwrap_or_default();
            {
                let mut st = self.state();
                st.status = ProcessStatus::Running;
                st.pid = Some(pid);
            }
            info!(process = %self.id, pid, "started");
            child::spawn_output_pumps(&mut child, &self.id, pid, &self.sink);

            let wait_result = tokio::select! {
                _ = quit.cancelled() => {
                    info!(process = %self.id, pid, "stopping");
                    child::stop_child(
                        &mut child,
                        &self.id,
                        pid,
                        self.config.stop_signal,
                        self.config.stop_wait,
                    )
                    .await;
                    self.settle_stopped();
                    return;
                }
                res = child.wait() => res,
            };

            // A stop racing the self-exit wins: the child is already reaped,
            // so the episode just settles without restart consideration.
            if quit.is_cancelled() {
                self.settle_stopped();
                return;
            }

            let verdict = match wait_result {
                Ok(status) => child::classify_exit(status),
                Err(e) => Err(ExitError::Wait {
                    reason: e.to_string(),
                }),
            };

            let relaunch = {
                let mut st = self.state();
                st.pid = None;
                match &verdict {
                    Ok(()) => {
                        st.status = ProcessStatus::Stopped;
                        info!(process = %self.id, pid, "exited normally");
                    }
                    Err(cause) => {
                        st.status = ProcessStatus::Failed;
                        st.exit_error = Some(cause.clone());
                        error!(process = %self.id, pid, cause = %cause, "exited abnormally");
                    }
                }

                if !st.auto_restart {
                    false
                } else if st.restart_count >= MAX_RESTARTS {
                    st.status = ProcessStatus::Failed;
                    st.auto_restart = false;
                    warn!(
                        process = %self.id,
                        restarts = st.restart_count,
                        "restart cap reached, giving up"
                    );
                    false
                } else {
                    // Backoff pending: Starting keeps stop() legal while we
                    // sleep, so a stop never waits out the delay.
                    st.status = ProcessStatus::Starting;
                    true
                }
            };

            if !relaunch {
                return;
            }

            let delay = self.backoff.next(prev_delay);
            prev_delay = Some(delay);
            info!(process = %self.id, delay = ?delay, "restart scheduled");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = quit.cancelled() => {
                    self.settle_stopped();
                    return;
                }
            }

            {
                let mut st = self.state();
                st.restart_count += 1;
            }
        }
    }

    /// Final transition of a stop path: `Stopping` (or a cancelled launch)
    /// settles into `Stopped` with no child.
    fn settle_stopped(&self) {
        let mut st = self.state();
        st.status = ProcessStatus::Stopped;
        st.pid = None;
        info!(process = %self.id, "stopped");
    }
}
