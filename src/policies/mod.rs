//! Policies governing process relaunch behavior:
//!  - [`BackoffPolicy`] for inter-restart delays;
//!  - [`RestartPolicy`] for the restart decision itself.
//!
//! ## Overview
//! - [`backoff`] — compute the next delay after a child exit with capped multiplicative growth.
//! - [`restart`] — decide whether a process is relaunched after a self-exit: *always / never*.
//!
//! ## Example
//! ```rust
//! use procvisor::{BackoffPolicy, RestartPolicy};
//! use std::time::Duration;
//!
//! // Delays grow 1s -> 1.5s -> 2.25s ... and never exceed the cap.
//! let backoff = BackoffPolicy::default();
//! let policy = RestartPolicy::Always;
//!
//! let mut prev: Option<Duration> = None;
//! let mut delays: Vec<Duration> = Vec::new();
//! for _ in 0..3 {
//!     if matches!(policy, RestartPolicy::Never) { break; }
//!     let d = backoff.next(prev);
//!     delays.push(d);
//!     prev = Some(d);
//! }
//!
//! assert_eq!(delays[0], Duration::from_secs(1));
//! assert_eq!(delays[1], Duration::from_millis(1500));
//! assert_eq!(delays[2], Duration::from_millis(2250));
//! ```

mod backoff;
mod restart;

pub use backoff::BackoffPolicy;
pub use restart::RestartPolicy;
