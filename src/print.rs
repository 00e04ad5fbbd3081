//! # Textual status table.
//!
//! Pure presentation over [`ProcessInfo`] snapshots: no locks, no I/O. The
//! binary prints the rendered table on startup, on each status pulse, and
//! after shutdown.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use crate::process::{ProcessInfo, ProcessStatus};

/// Renders the status snapshot as an aligned table with a totals line.
///
/// Rows are sorted by name so consecutive renders are comparable.
pub fn render_status(statuses: &HashMap<String, ProcessInfo>) -> String {
    let mut names: Vec<&String> = statuses.keys().collect();
    names.sort();

    let mut out = String::new();
    out.push_str(&format!(
        "{:<16} {:>8} {:<10} {:>10} {:>9}  {}\n",
        "PROCESS", "PID", "STATUS", "UPTIME", "RESTARTS", "LAST ERROR"
    ));

    for name in &names {
        let info = &statuses[*name];
        let pid = match info.pid {
            Some(pid) => pid.to_string(),
            None => "-".to_string(),
        };
        let uptime = match info.start_time {
            Some(start) if info.status == ProcessStatus::Running => format_uptime(start),
            _ => "-".to_string(),
        };
        let last_error = match &info.exit_error {
            Some(e) => e.to_string(),
            None => String::new(),
        };
        out.push_str(&format!(
            "{:<16} {:>8} {:<10} {:>10} {:>9}  {}\n",
            name, pid, info.status, uptime, info.restarts, last_error
        ));
    }

    let running = count(statuses, ProcessStatus::Running);
    let failed = count(statuses, ProcessStatus::Failed);
    out.push_str(&format!(
        "total: {} | running: {} | failed: {}\n",
        statuses.len(),
        running,
        failed
    ));
    out
}

fn count(statuses: &HashMap<String, ProcessInfo>, status: ProcessStatus) -> usize {
    statuses.values().filter(|i| i.status == status).count()
}

fn format_uptime(start: SystemTime) -> String {
    let elapsed = SystemTime::now()
        .duration_since(start)
        .unwrap_or(Duration::ZERO);
    humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}
