//! # One child episode's mechanics.
//!
//! Command construction, output pumps, exit classification, and the
//! graceful-then-forced teardown. The supervisory loop in
//! [`runtime`](super::runtime) composes these; nothing here touches runtime
//! state or locks.
//!
//! ## Rules
//! - Children run in their own process group so descendants can be signalled
//!   together; on Windows the child gets its own group and no console window.
//! - Output pumps exit naturally on EOF and never outlive the child by more
//!   than the buffered tail.
//! - `StopSignal::Kill` is always immediate; `StopSignal::Term` waits at most
//!   `stop_wait` before escalating to a kill.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::warn;

use crate::config::{ProcessConfig, StopSignal};
use crate::error::ExitError;
use crate::logging::SinkHandle;

/// Builds the launch command for a process declaration.
///
/// The child inherits the supervisor's environment with per-process overrides
/// layered on top (overrides win), runs in its own process group, and has all
/// three stdio streams detached from the supervisor's terminal.
pub(crate) fn build_command(cfg: &ProcessConfig) -> Command {
    let mut cmd = Command::new(&cfg.command);
    cmd.args(&cfg.args);

    if let Some(dir) = &cfg.directory {
        cmd.current_dir(dir);
    }
    cmd.envs(&cfg.environment);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            Ok(())
        });
    }

    #[cfg(windows)]
    {
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
    }

    cmd
}

/// Starts the stdout/stderr pump tasks for a freshly spawned child.
///
/// Each line is tagged `[<name>][<pid>]`, stderr lines additionally
/// `[ERROR]`, and handed to the sink. Pumps end on EOF; read errors are
/// logged and end the pump.
pub(crate) fn spawn_output_pumps(child: &mut Child, name: &str, pid: u32, sink: &SinkHandle) {
    if let Some(stdout) = child.stdout.take() {
        let sink = sink.clone();
        let tag = format!("[{name}][{pid}]");
        let name = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => sink.emit(&format!("{tag} {line}")),
                    Ok(None) => break,
                    Err(e) => {
                        warn!(process = %name, error = %e, "stdout pump failed");
                        break;
                    }
                }
            }
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let sink = sink.clone();
        let tag = format!("[{name}][{pid}][ERROR]");
        let name = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => sink.emit(&format!("{tag} {line}")),
                    Ok(None) => break,
                    Err(e) => {
                        warn!(process = %name, error = %e, "stderr pump failed");
                        break;
                    }
                }
            }
        });
    }
}

/// Classifies a self-exit: clean zero-status exits are `Ok`, everything else
/// carries its cause.
pub(crate) fn classify_exit(status: ExitStatus) -> Result<(), ExitError> {
    if status.success() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(ExitError::Signaled { signal });
        }
    }

    Err(ExitError::NonZeroExit {
        code: status.code().unwrap_or(-1),
    })
}

/// Tears down a live child after an external stop request.
///
/// `StopSignal::Kill` kills immediately. `StopSignal::Term` delivers the
/// polite interrupt to the child's process group and waits up to `stop_wait`
/// for the exit; on expiry it escalates to a kill. The wait result is drained
/// either way so the OS process is fully reaped before returning.
pub(crate) async fn stop_child(
    child: &mut Child,
    name: &str,
    pid: u32,
    signal: StopSignal,
    stop_wait: Duration,
) {
    match signal {
        StopSignal::Kill => {
            force_kill(child, name, pid).await;
        }
        StopSignal::Term => {
            deliver_term(name, pid);
            match tokio::time::timeout(stop_wait, child.wait()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(process = %name, error = %e, "wait after stop failed"),
                Err(_) => {
                    warn!(process = %name, pid, "grace window expired, killing");
                    force_kill(child, name, pid).await;
                }
            }
        }
    }
}

/// Sends the polite interrupt to the child's process group.
///
/// The child was made a session leader at spawn, so its pgid equals its pid;
/// signalling the group reaches descendants too. Falls back to the single pid
/// if the group signal fails. On non-Unix hosts there is no polite interrupt
/// and the caller's grace window simply elapses before the kill.
#[cfg(unix)]
fn deliver_term(name: &str, pid: u32) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let target = Pid::from_raw(pid as i32);
    if let Err(e) = killpg(target, Signal::SIGTERM) {
        warn!(process = %name, pid, error = %e, "killpg failed, signalling pid only");
        if let Err(e) = kill(target, Signal::SIGTERM) {
            warn!(process = %name, pid, error = %e, "SIGTERM delivery failed");
        }
    }
}

#[cfg(not(unix))]
fn deliver_term(_name: &str, _pid: u32) {}

/// Kills the child (its whole group where the host supports it) and drains
/// the wait result.
async fn force_kill(child: &mut Child, name: &str, pid: u32) {
    if !kill_group(pid) {
        if let Err(e) = child.start_kill() {
            warn!(process = %name, error = %e, "kill failed");
        }
    }
    if let Err(e) = child.wait().await {
        warn!(process = %name, error = %e, "wait after kill failed");
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) -> bool {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    killpg(Pid::from_raw(pid as i32), Signal::SIGKILL).is_ok()
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) -> bool {
    false
}
