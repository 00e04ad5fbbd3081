//! # procvisor
//!
//! **Procvisor** is a lightweight process supervisor library.
//!
//! Operators declare a fleet of child processes (command, arguments, working
//! directory, environment, auto-start, auto-restart, stop signal, grace
//! window); the supervisor keeps the fleet in that state despite crashes and
//! control requests, exposes live status snapshots, and multiplexes child
//! output into a single log stream.
//!
//! ## Features
//!
//! | Area              | Description                                                        | Key types                                  |
//! |-------------------|--------------------------------------------------------------------|--------------------------------------------|
//! | **Supervision**   | Per-process lifecycle machine with bounded-exponential restarts.   | [`ProcessRuntime`], [`ProcessStatus`]      |
//! | **Orchestration** | Fleet-wide operations, config reload, status fan-in.               | [`Supervisor`], [`ProcessManager`]         |
//! | **Policies**      | Restart decision and relaunch backoff.                             | [`RestartPolicy`], [`BackoffPolicy`]       |
//! | **Configuration** | Typed YAML document with loader defaults.                          | [`Config`], [`ProcessConfig`]              |
//! | **Logging**       | Pluggable sink for the multiplexed child output stream.            | [`LogSink`], [`SinkHandle`], [`LogBuffer`] |
//! | **Errors**        | Typed control-surface and exit-cause errors.                       | [`ControlError`], [`ExitError`]            |
//!
//! ```no_run
//! use procvisor::{Config, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::load("gsv.yaml")?;
//!     let sv = Supervisor::new(cfg);
//!
//!     sv.start_all()?;
//!     procvisor::wait_for_shutdown_signal().await?;
//!
//!     sv.stop_all();
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod error;
mod logging;
mod manager;
mod policies;
mod print;
mod process;
mod shutdown;
mod supervisor;

// ---- Public re-exports ----

pub use config::{Config, ProcessConfig, StopSignal, DEFAULT_STOP_WAIT};
pub use error::{ControlError, ExitError};
pub use logging::{BufferSink, LogBuffer, LogSink, PrefixSink, SinkHandle, StdoutSink, TeeSink};
pub use manager::ProcessManager;
pub use policies::{BackoffPolicy, RestartPolicy};
pub use print::render_status;
pub use process::{ProcessInfo, ProcessRuntime, ProcessStatus, MAX_RESTARTS};
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::Supervisor;
