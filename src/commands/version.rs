//! Command: print version information.
use std::io::Write;

/// Version string, preferring the one stamped in at build time.
#[must_use]
pub fn version() -> &'static str {
    option_env!("XDGMENU_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the version to `out`.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub fn run(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "xdgmenu {}", version())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn prints_name_and_version() {
        let mut out = Vec::new();
        run(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("xdgmenu "));
        assert!(text.trim_end().len() > "xdgmenu ".len());
    }
}
