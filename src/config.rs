//! # Supervisor configuration.
//!
//! [`Config`] is the typed form of the YAML document operators write: a
//! top-level `processes` sequence, one [`ProcessConfig`] per supervised
//! process. Loading normalizes the document:
//! - a non-empty `directory` is resolved to an absolute path;
//! - an absent `stop_signal` defaults to `SIGTERM`;
//! - an absent or zero `stop_wait` defaults to 10 seconds;
//! - duplicate names and empty commands are rejected.
//!
//! Duration fields accept human-readable suffixes (`5s`, `30s`, `500ms`).
//!
//! # Example
//! ```rust
//! use procvisor::{Config, RestartPolicy, StopSignal};
//!
//! let cfg = Config::from_yaml(r#"
//! processes:
//!   - name: web
//!     command: /usr/bin/python3
//!     args: ["-m", "http.server"]
//!     autostart: true
//!     autorestart: always
//!     stop_wait: 5s
//! "#).unwrap();
//!
//! let web = &cfg.processes[0];
//! assert_eq!(web.restart_policy(), RestartPolicy::Always);
//! assert_eq!(web.stop_signal, StopSignal::Term);
//! assert_eq!(web.stop_wait, std::time::Duration::from_secs(5));
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ControlError;
use crate::policies::RestartPolicy;

/// Default grace window between the polite stop signal and the forced kill.
pub const DEFAULT_STOP_WAIT: Duration = Duration::from_secs(10);

/// Top-level configuration: the declared process fleet.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// One entry per supervised process.
    pub processes: Vec<ProcessConfig>,
}

/// Signal used for the polite phase of a stop request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum StopSignal {
    /// Polite interrupt; the child gets `stop_wait` to exit before the kill.
    #[default]
    #[serde(rename = "SIGTERM")]
    Term,
    /// Immediate, non-maskable kill with no grace window.
    #[serde(rename = "SIGKILL")]
    Kill,
}

/// Declaration of a single supervised process. Immutable once loaded.
#[derive(Clone, Debug, Deserialize)]
pub struct ProcessConfig {
    /// Unique identifier across the configuration.
    pub name: String,
    /// Program to execute.
    pub command: String,
    /// Argument vector.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory; `None` inherits the supervisor's.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Child-specific environment overrides, layered atop the host environment.
    #[serde(default, rename = "env")]
    pub environment: HashMap<String, String>,
    /// Whether `start_all` launches this process.
    #[serde(default)]
    pub autostart: bool,
    /// Raw restart policy string; `"always"` enables auto-restart, anything
    /// else disables it.
    #[serde(default)]
    pub autorestart: String,
    /// Signal used to stop the child.
    #[serde(default)]
    pub stop_signal: StopSignal,
    /// Grace window between the polite signal and the forced kill.
    #[serde(default, deserialize_with = "duration_opt")]
    pub stop_wait: Duration,
}

impl ProcessConfig {
    /// Maps the raw `autorestart` value onto a [`RestartPolicy`].
    ///
    /// Unrecognized values mean "no auto-restart".
    pub fn restart_policy(&self) -> RestartPolicy {
        if self.autorestart == "always" {
            RestartPolicy::Always
        } else {
            RestartPolicy::Never
        }
    }
}

impl Config {
    /// Loads and normalizes a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| ControlError::ConfigInvalid {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_yaml(&data)
    }

    /// Parses and normalizes a configuration document from a YAML string.
    pub fn from_yaml(data: &str) -> Result<Self, ControlError> {
        let mut cfg: Config =
            serde_yaml::from_str(data).map_err(|e| ControlError::ConfigInvalid {
                reason: e.to_string(),
            })?;
        cfg.normalize()?;
        Ok(cfg)
    }

    /// Applies loader defaults and validates the document.
    fn normalize(&mut self) -> Result<(), ControlError> {
        let mut seen = HashSet::new();
        for proc in &mut self.processes {
            if proc.name.is_empty() {
                return Err(ControlError::ConfigInvalid {
                    reason: "process with empty name".into(),
                });
            }
            if !seen.insert(proc.name.clone()) {
                return Err(ControlError::ConfigInvalid {
                    reason: format!("duplicate process name: {}", proc.name),
                });
            }
            if proc.command.is_empty() {
                return Err(ControlError::ConfigInvalid {
                    reason: format!("process '{}' has an empty command", proc.name),
                });
            }

            if let Some(dir) = &proc.directory {
                if dir.as_os_str().is_empty() {
                    proc.directory = None;
                } else if dir.is_relative() {
                    let abs = std::env::current_dir()
                        .map_err(|e| ControlError::ConfigInvalid {
                            reason: format!("cannot resolve working directory: {e}"),
                        })?
                        .join(dir);
                    proc.directory = Some(abs);
                }
            }

            if proc.stop_wait.is_zero() {
                proc.stop_wait = DEFAULT_STOP_WAIT;
            }
        }
        Ok(())
    }
}

/// Deserializes a duration from a humantime string (`10s`, `500ms`).
///
/// Absent fields fall back to `Duration::ZERO` via `#[serde(default)]`; the
/// loader then substitutes the real default.
fn duration_opt<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
