//! # procvisor entry point.
//!
//! Loads the configuration, builds the [`Supervisor`], applies any one-shot
//! flags, and then supervises until a termination signal arrives. `SIGHUP`
//! reloads the configuration from the original path; `SIGINT`/`SIGTERM` stop
//! the fleet and exit after a short settle window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use procvisor::{
    render_status, wait_for_shutdown_signal, Config, PrefixSink, ProcessStatus, StdoutSink,
    Supervisor,
};

/// Window given to supervisory loops to finish killing descendants.
const SHUTDOWN_SETTLE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "procvisor", version, about = "Keep a declared fleet of child processes running")]
struct Args {
    /// Path to the configuration document.
    #[arg(default_value = "gsv.yaml")]
    config: PathBuf,

    /// Refresh the status table continuously.
    #[arg(long)]
    tui: bool,

    /// Mirror child output to stdout.
    #[arg(long)]
    debug: bool,

    /// Start only the named process instead of the autostart set.
    #[arg(long, value_name = "NAME")]
    start: Option<String>,

    /// Request a stop of the named process after startup.
    #[arg(long, value_name = "NAME")]
    stop: Option<String>,

    /// Restart the named process after startup.
    #[arg(long, value_name = "NAME")]
    restart: Option<String>,

    /// Foreground mode: run one process, exit on its termination.
    #[arg(long, value_name = "NAME")]
    run: Option<String>,

    /// Print the declared process names and exit.
    #[arg(long)]
    list: bool,

    /// Print a status snapshot and exit.
    #[arg(long)]
    status: bool,

    /// Exercise a configuration reload and exit.
    #[arg(long)]
    reload: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if args.list {
        for proc in &config.processes {
            println!("{}", proc.name);
        }
        return Ok(());
    }

    let sv = Arc::new(Supervisor::new(config));

    if args.debug {
        sv.set_logger(Arc::new(StdoutSink));
    }

    if args.status {
        print!("{}", render_status(&sv.status()));
        return Ok(());
    }

    if args.reload {
        let fresh =
            Config::load(&args.config).with_context(|| format!("re-loading {}", args.config.display()))?;
        sv.reload_config(fresh).context("reload failed")?;
        print!("{}", render_status(&sv.status()));
        sv.stop_all();
        tokio::time::sleep(SHUTDOWN_SETTLE).await;
        return Ok(());
    }

    if let Some(name) = &args.run {
        return run_foreground(&sv, name).await;
    }

    match &args.start {
        Some(name) => sv
            .start_process(name)
            .with_context(|| format!("cannot start '{name}'"))?,
        None => sv.start_all().context("startup failed")?,
    }

    if let Some(name) = &args.stop {
        if let Err(e) = sv.stop_process(name) {
            warn!(process = %name, error = %e, "stop request failed");
        }
    }
    if let Some(name) = &args.restart {
        sv.restart_process(name)
            .await
            .with_context(|| format!("cannot restart '{name}'"))?;
    }

    info!("supervisor started");
    print!("{}", render_status(&sv.status()));

    let pulse = if args.tui {
        Duration::from_secs(2)
    } else {
        Duration::from_secs(30)
    };
    supervise(&sv, &args.config, pulse).await
}

/// Supervising mode: a background status pulse, reload on SIGHUP, stop-all
/// and exit on termination signals.
async fn supervise(sv: &Arc<Supervisor>, config_path: &Path, pulse: Duration) -> anyhow::Result<()> {
    spawn_status_pulse(sv, pulse);
    spawn_reload_listener(sv, config_path);

    wait_for_shutdown_signal()
        .await
        .context("signal listener failed")?;

    info!("shutting down");
    sv.stop_all();
    tokio::time::sleep(SHUTDOWN_SETTLE).await;
    print!("{}", render_status(&sv.status()));
    info!("supervisor stopped");
    Ok(())
}

/// Prints the status table on a fixed cadence until the process exits.
fn spawn_status_pulse(sv: &Arc<Supervisor>, pulse: Duration) {
    let sv = Arc::clone(sv);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(pulse);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            print!("{}", render_status(&sv.status()));
        }
    });
}

/// Reloads the configuration from the original path on every SIGHUP.
#[cfg(unix)]
fn spawn_reload_listener(sv: &Arc<Supervisor>, config_path: &Path) {
    use tokio::signal::unix::{signal, SignalKind};

    let sv = Arc::clone(sv);
    let path = config_path.to_path_buf();
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "cannot listen for SIGHUP");
                return;
            }
        };
        while sighup.recv().await.is_some() {
            match Config::load(&path) {
                Ok(fresh) => {
                    if let Err(e) = sv.reload_config(fresh) {
                        error!(error = %e, "reload failed");
                    }
                }
                Err(e) => error!(error = %e, "config reload failed"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_listener(_sv: &Arc<Supervisor>, _config_path: &Path) {}

/// Foreground mode: follow one process's output, mirror its lifetime.
async fn run_foreground(sv: &Arc<Supervisor>, name: &str) -> anyhow::Result<()> {
    sv.set_logger(Arc::new(PrefixSink::new(name, Arc::new(StdoutSink))));
    sv.start_process(name)
        .with_context(|| format!("cannot start '{name}'"))?;

    tokio::select! {
        res = wait_for_shutdown_signal() => {
            res.context("signal listener failed")?;
            let _ = sv.stop_process(name);
            tokio::time::sleep(SHUTDOWN_SETTLE).await;
            Ok(())
        }
        code = wait_terminal(sv, name) => {
            let code = code?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
    }
}

/// Polls until the process rests, yielding its effective exit code.
async fn wait_terminal(sv: &Arc<Supervisor>, name: &str) -> anyhow::Result<i32> {
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let info = sv.process_status(name)?;
        match info.status {
            ProcessStatus::Stopped => return Ok(0),
            ProcessStatus::Failed => {
                return Ok(info.exit_error.map(|e| e.exit_code()).unwrap_or(1));
            }
            _ => {}
        }
    }
}
