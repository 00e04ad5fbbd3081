//! # Restart policies for supervised processes.
//!
//! [`RestartPolicy`] determines whether a process is relaunched after its
//! child exits on its own. External stops never trigger a restart.
//!
//! - [`RestartPolicy::Never`] the child runs one episode and rests afterwards (default).
//! - [`RestartPolicy::Always`] the child is relaunched after any self-exit,
//!   successful or not, until the restart cap is reached.

/// Policy controlling whether a process is relaunched after a self-exit.
///
/// Configured per process via the `autorestart` field; the string `"always"`
/// maps to [`RestartPolicy::Always`], anything else to
/// [`RestartPolicy::Never`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Relaunch after any exit, until the restart cap.
    Always,
    /// Never relaunch: one episode per external start (default).
    Never,
}

impl Default for RestartPolicy {
    /// Returns [`RestartPolicy::Never`].
    fn default() -> Self {
        RestartPolicy::Never
    }
}
