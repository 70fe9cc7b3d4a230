//! Log file retention management
//!
//! Deletes dated log files older than their stream's retention window. File
//! names carry the date, so a sweep never looks at modification times.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::stream::StreamKind;
use super::Logger;
use crate::error::NameError;

/// A parsed `<kind>-<year>-<month>-<day>.log` file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogName {
    pub kind: StreamKind,
    pub date: NaiveDate,
}

/// Parse a log file name.
///
/// Names with fewer than four dash-separated segments are [`NameError::NotALog`]
/// and should be skipped quietly; every other failure is worth reporting.
pub fn parse_log_name(name: &str) -> Result<LogName, NameError> {
    let segments: Vec<&str> = name.split('-').collect();
    if segments.len() < 4 {
        return Err(NameError::NotALog);
    }

    let kind = StreamKind::from_prefix(segments[0])
        .ok_or_else(|| NameError::UnknownKind(segments[0].to_string()))?;

    let day = segments[3].replacen(".log", "", 1);
    let bad = |field: &'static str, problem: &'static str| NameError::BadDate {
        name: name.to_string(),
        field,
        problem,
    };

    let year = parse_field(segments[1]).map_err(|p| bad("year", p))?;
    let month = parse_field(segments[2]).map_err(|p| bad("month", p))?;
    let day = parse_field(&day).map_err(|p| bad("day", p))?;

    let date = NaiveDate::from_ymd_opt(year as i32, month, day)
        .ok_or_else(|| bad("date", "out of range"))?;

    Ok(LogName { kind, date })
}

fn parse_field(raw: &str) -> Result<u32, &'static str> {
    if raw.is_empty() {
        return Err("empty");
    }
    raw.parse().map_err(|_| "not a number")
}

/// Outcome of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Files deleted
    pub removed: Vec<PathBuf>,
    /// Expired files kept because a stream has them open
    pub protected: Vec<PathBuf>,
    /// Names or deletions that failed and were logged
    pub errors: usize,
}

impl RotationReport {
    fn merge(&mut self, other: RotationReport) {
        self.removed.extend(other.removed);
        self.protected.extend(other.protected);
        self.errors += other.errors;
    }
}

impl Logger {
    /// Retention window for a stream, in days
    pub fn retention_days(&self, kind: StreamKind) -> u32 {
        let config = self.config();
        match kind {
            StreamKind::Trace => config.trace_retention_days,
            StreamKind::Changes | StreamKind::Errors => config.priority_retention_days,
        }
    }

    /// Sweep `folder` and its subfolders, deleting expired log files.
    ///
    /// A file is expired when its date is strictly before today (UTC) minus
    /// the stream's retention window. Files a stream has open are kept.
    pub fn rotate_logs(&self, folder: &Path) -> RotationReport {
        let mut report = RotationReport::default();
        if !self.file_logging() {
            return report;
        }

        let entries = match fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(_) => return report,
        };

        let today = self.clock.today_utc();

        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                report.merge(self.rotate_logs(&path));
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();
            let parsed = match parse_log_name(&name) {
                Ok(parsed) => parsed,
                Err(NameError::NotALog) => continue,
                Err(err) => {
                    self.internal_error(&err.to_string());
                    report.errors += 1;
                    continue;
                }
            };

            let retention = i64::from(self.retention_days(parsed.kind));
            let Some(cutoff) = today.checked_sub_signed(chrono::Duration::days(retention)) else {
                continue;
            };
            if parsed.date < cutoff {
                self.remove_log(&path, &mut report);
            }
        }

        report
    }

    fn remove_log(&self, path: &Path, report: &mut RotationReport) {
        if !self.file_logging() {
            return;
        }
        if self.is_live(path) {
            debug!("Keeping expired log {} because it is open", path.display());
            report.protected.push(path.to_path_buf());
            return;
        }

        self.internal_trace(&format!("Removing log file: {}", path.display()));
        match fs::remove_file(path) {
            Ok(()) => report.removed.push(path.to_path_buf()),
            Err(err) => {
                self.internal_error(&format!(
                    "Failed to remove log file {}: {}",
                    path.display(),
                    err
                ));
                report.errors += 1;
            }
        }
    }

    /// Time between sweeps, never less than a minute
    pub fn rotation_interval(&self) -> Duration {
        let minutes = self.config().rotation_check_interval_minutes.max(1);
        Duration::from_secs(minutes.saturating_mul(60))
    }

    /// Start the background retention loop on the current Tokio runtime.
    ///
    /// Sweeps the base logs folder immediately, then once per
    /// [`rotation_interval`](Self::rotation_interval). The task runs until
    /// the process exits.
    pub fn spawn_rotation(self: &Arc<Self>) -> JoinHandle<()> {
        let logger = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let folder = logger.base_logs_folder();
                let sweeper = Arc::clone(&logger);
                match tokio::task::spawn_blocking(move || sweeper.rotate_logs(&folder)).await {
                    Ok(report) if !report.removed.is_empty() => {
                        info!("Cleaned up {} old log files", report.removed.len());
                    }
                    Ok(_) => {}
                    Err(err) => debug!("Retention sweep did not finish: {}", err),
                }
                tokio::time::sleep(logger.rotation_interval()).await;
            }
        })
    }
}
