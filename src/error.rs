//! # Error types used by the supervisor and process runtimes.
//!
//! This module defines two main error enums:
//!
//! - [`ControlError`] errors returned by the control surface (start/stop/reload).
//! - [`ExitError`] the cause of a child's last failed episode.
//!
//! Both types provide a `as_label` helper for logs and metrics.
//! [`ControlError`] is what callers of [`Supervisor`](crate::Supervisor) and
//! [`ProcessManager`](crate::ProcessManager) match on; [`ExitError`] is stored
//! on the runtime and surfaced through status snapshots.

use thiserror::Error;

/// # Errors returned by the control surface.
///
/// These are recoverable and always handed back to the caller; the core never
/// panics on a failed control request.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The named process does not exist in the active configuration.
    #[error("process not found: {name}")]
    NotFound {
        /// The unknown process name.
        name: String,
    },

    /// Start was requested while the process already has a live child.
    #[error("process already running: {name}")]
    AlreadyRunning {
        /// The process name.
        name: String,
    },

    /// Stop was requested while the process has no live child.
    #[error("process not running: {name}")]
    NotRunning {
        /// The process name.
        name: String,
    },

    /// The child could not be launched.
    #[error("failed to spawn process '{name}': {reason}")]
    SpawnFailed {
        /// The process name.
        name: String,
        /// OS-level spawn error text.
        reason: String,
    },

    /// The configuration document could not be loaded or failed validation.
    #[error("invalid configuration: {reason}")]
    ConfigInvalid {
        /// What was wrong with the document.
        reason: String,
    },
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::NotFound { .. } => "control_not_found",
            ControlError::AlreadyRunning { .. } => "control_already_running",
            ControlError::NotRunning { .. } => "control_not_running",
            ControlError::SpawnFailed { .. } => "control_spawn_failed",
            ControlError::ConfigInvalid { .. } => "control_config_invalid",
        }
    }
}

/// # Cause of a child's last failed episode.
///
/// Recorded on the runtime when a child exits abnormally or cannot be
/// launched, cleared on the next external start. Spawn failures are terminal
/// and never trigger an automatic restart.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExitError {
    /// The child exited on its own with a non-zero status code.
    #[error("exited with status {code}")]
    NonZeroExit {
        /// The child's exit code.
        code: i32,
    },

    /// The child was terminated by a signal.
    #[error("terminated by signal {signal}")]
    Signaled {
        /// The raw signal number.
        signal: i32,
    },

    /// The child could not be spawned at all.
    #[error("spawn failed: {reason}")]
    Spawn {
        /// OS-level spawn error text.
        reason: String,
    },

    /// Waiting on the child failed; treated as a failed exit.
    #[error("wait failed: {reason}")]
    Wait {
        /// OS-level wait error text.
        reason: String,
    },
}

impl ExitError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            ExitError::NonZeroExit { .. } => "exit_non_zero",
            ExitError::Signaled { .. } => "exit_signaled",
            ExitError::Spawn { .. } => "exit_spawn_failed",
            ExitError::Wait { .. } => "exit_wait_failed",
        }
    }

    /// Exit code to propagate when this error ends a foreground run.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitError::NonZeroExit { code } => *code,
            _ => 1,
        }
    }
}
