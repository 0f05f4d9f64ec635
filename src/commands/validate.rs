//! Command: check descriptor files for format problems.
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::{GlobalOpts, ValidateOpts};
use crate::desktop::{DesktopEntry, Severity, validate_entry};
use crate::logging::{CheckStatus, Log, Logger};
use crate::menu::Menu;

/// File extensions of descriptor records.
const RECORD_EXTENSIONS: &[&str] = &["desktop", "directory"];

/// Run the `validate` command.
///
/// Without paths, every record the resolved menu displays is checked.
///
/// # Errors
///
/// Returns an error if the menu cannot be resolved or any record failed.
pub fn run(global: &GlobalOpts, opts: &ValidateOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;

    log.stage("Validating records");
    if opts.paths.is_empty() {
        let menu = setup.load_menu(log)?;
        for record in menu_records(&menu) {
            check_record(record, log);
        }
    } else {
        for path in &opts.paths {
            check_path(path, &setup.platform.locales, log);
        }
    }

    log.print_summary();
    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} record(s) failed validation");
    }
    Ok(())
}

/// Records used by `menu`: directory records and allocated entries, each
/// file once.
#[must_use]
pub fn menu_records(menu: &Menu) -> Vec<&DesktopEntry> {
    let mut seen: HashSet<&Path> = HashSet::new();
    let mut records = Vec::new();
    for id in menu.tree.pre_order() {
        let node = menu.tree.node(id);
        for entry in node.directory.into_iter().chain(node.menu_entries.iter().copied()) {
            let record = &menu.entry(entry).record;
            if seen.insert(record.path()) {
                records.push(record);
            }
        }
    }
    records
}

/// Check a file, or every record below a directory.
pub fn check_path(path: &Path, locales: &[String], log: &dyn Log) {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && is_record_file(e.path()))
            .map(walkdir::DirEntry::into_path)
            .collect();
        files.sort();
        if files.is_empty() {
            log.record_check(&path.display().to_string(), CheckStatus::Skipped, Some("no records"));
        }
        for file in files {
            check_file(&file, locales, log);
        }
    } else if is_record_file(path) {
        check_file(path, locales, log);
    } else {
        log.record_check(
            &path.display().to_string(),
            CheckStatus::Skipped,
            Some("not a .desktop or .directory file"),
        );
    }
}

fn is_record_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| RECORD_EXTENSIONS.contains(&e))
}

fn check_file(path: &Path, locales: &[String], log: &dyn Log) {
    match DesktopEntry::parse(path, locales) {
        Ok(record) => {
            check_record(&record, log);
        }
        Err(e) => {
            log.error(&e.to_string());
            log.record_check(&path.display().to_string(), CheckStatus::Failed, Some(&e.to_string()));
        }
    }
}

/// Validate one record, log each issue and record the outcome.
pub fn check_record(record: &DesktopEntry, log: &dyn Log) -> CheckStatus {
    let name = record.path().display().to_string();
    let issues = validate_entry(record);
    for issue in &issues {
        let line = format!("{}: [{}] {}", issue.source, issue.item, issue.message);
        match issue.severity {
            Severity::Error => log.error(&line),
            Severity::Warning => log.warn(&line),
        }
    }

    let status = match issues.first().map(|i| i.severity) {
        None => CheckStatus::Ok,
        Some(Severity::Warning) => CheckStatus::Warnings,
        Some(Severity::Error) => CheckStatus::Failed,
    };
    let message = match issues.len() {
        0 => None,
        1 => issues.first().map(|i| i.message.clone()),
        n => issues.first().map(|i| format!("{} (+{} more)", i.message, n - 1)),
    };
    log.record_check(&name, status, message.as_deref());
    status
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::logger_with_log_file;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn valid_record_is_ok() {
        let (log, tmp, _guard) = logger_with_log_file();
        let path = write(
            tmp.path(),
            "good.desktop",
            "[Desktop Entry]\nType=Application\nName=Good\nExec=good\n",
        );
        check_path(&path, &[], &log);
        assert!(!log.has_failures());
        log.print_summary();
    }

    #[test]
    fn missing_group_fails() {
        let (log, tmp, _guard) = logger_with_log_file();
        let path = write(tmp.path(), "bad.desktop", "Name=Bad\n");
        check_path(&path, &[], &log);
        assert_eq!(log.failure_count(), 1);
    }

    #[test]
    fn other_files_are_skipped() {
        let (log, tmp, _guard) = logger_with_log_file();
        let path = write(tmp.path(), "notes.txt", "hello");
        check_path(&path, &[], &log);
        assert!(!log.has_failures());
    }

    #[test]
    fn directories_are_walked() {
        let (log, tmp, _guard) = logger_with_log_file();
        let dir = tmp.path().join("apps");
        fs::create_dir_all(&dir).unwrap();
        write(&dir, "a.desktop", "[Desktop Entry]\nType=Application\nName=A\nExec=a\n");
        write(&dir, "b.desktop", "garbage\n");
        write(&dir, "readme.txt", "ignored");
        check_path(&dir, &[], &log);
        assert_eq!(log.failure_count(), 1);
    }
}
