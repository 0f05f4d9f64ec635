//! Resolution of `TryExec` targets.
//!
//! Visibility computation needs to know whether a descriptor's `TryExec`
//! program exists. The check sits behind [`ExecutableLookup`] so tests can
//! decide the answer without touching `PATH`.

/// Answers whether a program can be executed.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutableLookup {
    /// Return `true` if `program` is an absolute path to an executable file,
    /// or a bare name found as an executable on `PATH`.
    fn is_executable(&self, program: &str) -> bool;
}

/// [`ExecutableLookup`] backed by the real `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLookup;

impl ExecutableLookup for SystemLookup {
    fn is_executable(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
