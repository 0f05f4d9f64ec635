//! Structured logger with check recording and summary output.
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::STAGE_TARGET;
use super::types::{CheckEntry, CheckStatus, Log};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record_check` method is **not** included because its signature
/// differs from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with summary collection.
///
/// All messages are always written to a persistent log file at
/// `$XDG_CACHE_HOME/xdgmenu/<command>.log` (default `~/.cache/xdgmenu/<command>.log`)
/// with timestamps and ANSI codes stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    checks: Mutex<Vec<CheckEntry>>,
    log_file: Option<PathBuf>,
}

#[allow(clippy::unused_self)]
impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary. The log file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber).
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            checks: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded check entries (test-only).
    #[cfg(test)]
    pub(crate) fn check_entries(&self) -> Vec<CheckEntry> {
        self.checks.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file via the [`FileLayer`](super::subscriber::FileLayer)).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Record a check result for the summary.
    pub fn record_check(&self, name: &str, status: CheckStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.checks.lock() {
            guard.push(CheckEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return `true` if any recorded check has failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Count the number of failed checks.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.checks.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|t| t.status == CheckStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded checks.
    pub fn print_summary(&self) {
        let checks = match self.checks.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if checks.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut ok = 0u32;
        let mut warnings = 0u32;
        let mut failed = 0u32;
        let mut skipped = 0u32;

        for check in &checks {
            let (icon, color) = match check.status {
                CheckStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                CheckStatus::Warnings => {
                    warnings += 1;
                    ("!", "\x1b[33m")
                }
                CheckStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
                CheckStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[2m")
                }
            };

            let suffix = check
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", check.name));
        }

        let total = ok + warnings + failed + skipped;
        self.info(&format!(
            "{total} files: \x1b[32m{ok} ok\x1b[0m, \x1b[33m{warnings} with warnings\x1b[0m, \x1b[31m{failed} failed\x1b[0m, \x1b[2m{skipped} skipped\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error);

    fn record_check(&self, name: &str, status: CheckStatus, message: Option<&str>) {
        self.record_check(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::logger_with_log_file;
    use std::fs;

    #[test]
    fn logger_new() {
        let (log, _tmp, _guard) = logger_with_log_file();
        assert!(log.check_entries().is_empty(), "expected empty check list");
    }

    #[test]
    fn record_check_with_message() {
        let (log, _tmp, _guard) = logger_with_log_file();
        log.record_check("a.desktop", CheckStatus::Warnings, Some("key not in group"));
        let checks = log.check_entries();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].name, "a.desktop");
        assert_eq!(checks[0].status, CheckStatus::Warnings);
        assert_eq!(checks[0].message.as_deref(), Some("key not in group"));
    }

    #[test]
    fn failure_count_returns_correct_count() {
        let (log, _tmp, _guard) = logger_with_log_file();
        assert!(!log.has_failures());
        log.record_check("a", CheckStatus::Ok, None);
        log.record_check("b", CheckStatus::Failed, Some("no group"));
        log.record_check("c", CheckStatus::Failed, Some("unreadable"));
        log.record_check("d", CheckStatus::Skipped, None);
        assert_eq!(log.failure_count(), 2);
        assert!(log.has_failures());
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = logger_with_log_file();
        let log_ref: &dyn Log = &log;
        log_ref.record_check("via-trait", CheckStatus::Ok, None);
        assert_eq!(log.check_entries().len(), 1);
    }

    #[test]
    fn log_file_is_created() {
        let (log, _tmp, _guard) = logger_with_log_file();
        let path = log.log_path().expect("log path should exist");
        assert!(path.exists(), "log file should be created by the file layer");
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = logger_with_log_file();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[debug]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn warn_written_to_file() {
        let (log, _tmp, _guard) = logger_with_log_file();
        let marker = format!("warn-marker-{}", std::process::id());
        log.warn(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[warn]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn stage_written_to_file_with_arrow() {
        let (log, _tmp, _guard) = logger_with_log_file();
        let marker = format!("stage-marker-{}", std::process::id());
        log.stage(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains(&format!("==> {marker}")));
    }

    #[test]
    fn summary_written_to_file() {
        let (log, _tmp, _guard) = logger_with_log_file();
        log.record_check("good.desktop", CheckStatus::Ok, None);
        log.record_check("bad.desktop", CheckStatus::Failed, Some("no group"));
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("bad.desktop (no group)"));
        assert!(contents.contains("2 files"));
    }
}
