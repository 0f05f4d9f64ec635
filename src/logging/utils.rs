//! Helpers for the log file: location, run header and ANSI stripping.
use std::fs;
use std::path::PathBuf;

/// Timestamp layout of the run header.
pub(super) const HEADER_TIME: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamp layout of each logged event.
pub(super) const EVENT_TIME: &str = "%H:%M:%S";

/// Strip ANSI escape sequences from a string.
///
/// Handles SGR sequences (ending in `m`) and other CSI sequences (ending
/// in any letter in the `@`..`~` range). Check summaries are colored on
/// the console but stored plain.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(next) = chars.next()
                && next == '['
            {
                for inner in chars.by_ref() {
                    if ('@'..='~').contains(&inner) {
                        break;
                    }
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Log file for `command` under `$XDG_CACHE_HOME/xdgmenu/` (or
/// `~/.cache/xdgmenu/`); the directory is created on demand.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let cache_home = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map_or_else(
            || {
                std::env::var_os("HOME")
                    .map_or_else(|| PathBuf::from("."), PathBuf::from)
                    .join(".cache")
            },
            PathBuf::from,
        );
    let dir = cache_home.join("xdgmenu");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// The variables that decide which menu a run resolves, as
/// `prefix=<XDG_MENU_PREFIX> desktops=<XDG_CURRENT_DESKTOP>`.
pub(super) fn menu_environment(var: impl Fn(&str) -> Option<String>) -> String {
    let value = |key: &str| var(key).filter(|v| !v.is_empty()).unwrap_or_else(|| "-".to_string());
    format!(
        "prefix={} desktops={}",
        value("XDG_MENU_PREFIX"),
        value("XDG_CURRENT_DESKTOP")
    )
}

/// Current UTC time in `layout`.
pub(super) fn utc_now(layout: &str) -> String {
    chrono::Utc::now().format(layout).to_string()
}
