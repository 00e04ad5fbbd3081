//! # Process status and the point-in-time snapshot.

use std::fmt;
use std::time::SystemTime;

use crate::error::ExitError;

/// Lifecycle state of a supervised process.
///
/// `Running`, `Starting`, and `Stopping` imply a live (or imminently live)
/// child; `Stopped` and `Failed` are resting states with no child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// No child; either never started or exited cleanly.
    Stopped,
    /// A launch (or relaunch after backoff) is underway.
    Starting,
    /// The child is alive.
    Running,
    /// An external stop is in progress; the child is being torn down.
    Stopping,
    /// The last episode ended abnormally, or the restart cap was reached.
    Failed,
}

impl ProcessStatus {
    /// Whether this state implies a live supervisory episode.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            ProcessStatus::Running | ProcessStatus::Starting | ProcessStatus::Stopping
        )
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Starting => "starting",
            ProcessStatus::Running => "running",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Failed => "failed",
        };
        f.pad(s)
    }
}

/// Point-in-time snapshot of a runtime's externally visible state.
///
/// Produced under the runtime's own lock, so a snapshot never pairs `Running`
/// with a missing PID nor `Stopped` with a live one; it may go stale the
/// moment it is returned.
#[derive(Clone, Debug)]
pub struct ProcessInfo {
    /// OS process id of the live child, if any.
    pub pid: Option<u32>,
    /// Lifecycle state at snapshot time.
    pub status: ProcessStatus,
    /// Wall-clock time of the most recent successful spawn.
    pub start_time: Option<SystemTime>,
    /// Restart attempts in the current start episode.
    pub restarts: u32,
    /// Cause of the last failed episode, if any.
    pub exit_error: Option<ExitError>,
}
