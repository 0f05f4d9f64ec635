//! Core logging types: check entries, status, and the [`Log`] trait.

/// Outcome of checking one item, kept for the run summary.
#[derive(Debug, Clone)]
pub struct CheckEntry {
    /// What was checked, usually a file path.
    pub name: String,
    /// Final status of the check.
    pub status: CheckStatus,
    /// Optional detail message (e.g., first problem found or skip reason).
    pub message: Option<String>,
}

/// Status of a completed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// No problems found.
    Ok,
    /// Only warning-level problems found.
    Warnings,
    /// At least one error-level problem, or the item could not be read.
    Failed,
    /// The item was not checked (e.g., not a descriptor file).
    Skipped,
}

/// Abstraction over logging backends.
///
/// Command code logs through this trait so tests can substitute a
/// recording implementation.
pub trait Log {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a check result for the summary.
    fn record_check(&self, name: &str, status: CheckStatus, message: Option<&str>);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn check_status_equality() {
        assert_eq!(CheckStatus::Ok, CheckStatus::Ok);
        assert_ne!(CheckStatus::Ok, CheckStatus::Failed);
        assert_ne!(CheckStatus::Warnings, CheckStatus::Skipped);
    }
}
