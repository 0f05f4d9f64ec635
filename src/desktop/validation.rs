//! Field-level checks for descriptor records.
//!
//! Validation never affects menu resolution: it only produces a batch of
//! [`ValidationIssue`]s for the `validate` command to report.

use std::fmt;
use std::path::Path;

use super::entry::DesktopEntry;
use super::ini::{split_list, split_locale_key};

/// Desktop environments registered for `OnlyShowIn` / `NotShowIn`.
const REGISTERED_DESKTOPS: &[&str] = &[
    "Budgie", "Cinnamon", "COSMIC", "DDE", "EDE", "Endless", "Enlightenment", "GNOME", "GNOME-Classic",
    "GNOME-Flashback", "KDE", "LXDE", "LXQt", "MATE", "Old", "Pantheon", "Razor", "ROX", "TDE",
    "Unity", "XFCE",
];

/// Registered menu categories.
const REGISTERED_CATEGORIES: &[&str] = &[
    "Legacy", "Core", "Development", "Building", "Debugger", "IDE", "GUIDesigner", "Profiling",
    "RevisionControl", "Translation", "Office", "Calendar", "ContactManagement", "Database",
    "Dictionary", "Chart", "Email", "Finance", "FlowChart", "PDA", "ProjectManagement",
    "Presentation", "Spreadsheet", "WordProcessor", "Graphics", "2DGraphics", "VectorGraphics",
    "RasterGraphics", "3DGraphics", "Scanning", "OCR", "Photography", "Viewer", "Settings",
    "DesktopSettings", "HardwareSettings", "PackageManager", "Network", "Dialup",
    "InstantMessaging", "Chat", "IRCClient", "FileTransfer", "HamRadio", "News", "P2P",
    "RemoteAccess", "Telephony", "WebBrowser", "WebDevelopment", "AudioVideo", "Audio", "Midi",
    "Mixer", "Sequencer", "Tuner", "Video", "TV", "AudioVideoEditing", "Player", "Recorder",
    "DiscBurning", "Game", "ActionGame", "AdventureGame", "ArcadeGame", "BoardGame",
    "BlocksGame", "CardGame", "KidsGame", "LogicGame", "RolePlaying", "Simulation",
    "SportsGame", "StrategyGame", "Education", "Art", "Construction", "Music", "Languages",
    "Science", "Astronomy", "Biology", "Chemistry", "Geology", "Math", "MedicalSoftware",
    "Physics", "Teaching", "Amusement", "Applet", "Archiving", "Compression", "Electronics",
    "Emulator", "Engineering", "FileTools", "FileManager", "Shell", "Screensaver",
    "TerminalEmulator", "TrayIcon", "System", "Filesystem", "Monitor", "Security", "Utility",
    "Accessibility", "Calculator", "Clock", "TextEditor", "Documentation", "ConsoleOnly", "KDE",
    "GNOME", "GTK", "Qt", "Motif", "Java",
];

/// Keys that only KDE understands.
const KDE_KEYS: &[&str] = &["ServiceTypes", "DocPath", "Keywords", "InitialPreference"];

/// Keys dropped from the desktop entry format.
const DEPRECATED_KEYS: &[&str] = &[
    "MiniIcon",
    "TerminalOptions",
    "DefaultApp",
    "Protocols",
    "Extensions",
    "BinaryPattern",
    "MapNotify",
];

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The record works but uses deprecated or unusual constructs.
    Warning,
    /// The record violates the format.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A problem found while validating a descriptor record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// File the issue was found in.
    pub source: String,
    /// Key or group that triggered the issue.
    pub item: String,
    /// Human-readable description.
    pub message: String,
    /// Warning or error.
    pub severity: Severity,
}

impl ValidationIssue {
    /// Build a warning.
    #[must_use]
    pub fn warning(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    /// Build an error.
    #[must_use]
    pub fn error(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            ..Self::warning(source, item, message)
        }
    }
}

/// A single family of checks over one record.
pub trait RecordValidator {
    /// Run the checks and return every issue found.
    fn validate(&self, entry: &DesktopEntry) -> Vec<ValidationIssue>;

    /// Short name of the check family (e.g., `"structure"`, `"keys"`).
    fn name(&self) -> &'static str;
}

/// Checks the record as a whole: header, extension, required keys, groups.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructureValidator;

impl RecordValidator for StructureValidator {
    fn validate(&self, entry: &DesktopEntry) -> Vec<ValidationIssue> {
        let source = entry.path().display().to_string();
        let record = entry.record();
        let mut issues = Vec::new();

        if record.default_group() == "KDE Desktop Entry" {
            issues.push(ValidationIssue::warning(
                &source,
                record.default_group(),
                "[KDE Desktop Entry]-Header is deprecated",
            ));
        }

        match extension(entry.path()) {
            "desktop" | "directory" => {}
            "kdelnk" => issues.push(ValidationIssue::warning(
                &source,
                "file",
                "File extension .kdelnk is deprecated",
            )),
            _ => issues.push(ValidationIssue::warning(&source, "file", "Unknown File extension")),
        }

        if !record.has_key("Type") {
            issues.push(ValidationIssue::error(&source, "Type", "Key 'Type' is missing"));
        }
        if !record.has_key("Name") {
            issues.push(ValidationIssue::error(&source, "Name", "Key 'Name' is missing"));
        }
        if !record.has_key("Version") {
            issues.push(ValidationIssue::warning(
                &source,
                "Version",
                "Key 'Version' is missing",
            ));
        }

        for group in record.groups() {
            let valid_name = group.name == record.default_group()
                || group
                    .name
                    .strip_prefix("Desktop Action ")
                    .is_some_and(|a| !a.is_empty() && a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
                || (group.name.starts_with("X-") && group.name.is_ascii());
            if !valid_name {
                issues.push(ValidationIssue::error(
                    &source,
                    &group.name,
                    format!("Invalid Group name: {}", group.name),
                ));
            } else if group.get("OnlyShowIn").is_some() && group.get("NotShowIn").is_some() {
                issues.push(ValidationIssue::error(
                    &source,
                    &group.name,
                    "Group may either have OnlyShowIn or NotShowIn, but not both",
                ));
            }
        }

        issues
    }

    fn name(&self) -> &'static str {
        "structure"
    }
}

/// Checks every key of the default group against the known key set.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyValidator;

/// Value shape expected for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    String,
    Boolean,
    Number,
}

impl KeyValidator {
    fn check_value(source: &str, key: &str, value: &str, kind: ValueKind, issues: &mut Vec<ValidationIssue>) {
        match kind {
            ValueKind::String => {
                if value.chars().any(char::is_control) {
                    issues.push(ValidationIssue::error(
                        source,
                        key,
                        format!("'{value}' is not a valid string"),
                    ));
                }
            }
            ValueKind::Boolean => match value {
                "true" | "false" => {}
                "1" | "0" => issues.push(ValidationIssue::warning(
                    source,
                    key,
                    format!("Value of key '{key}' is deprecated"),
                )),
                _ => issues.push(ValidationIssue::error(
                    source,
                    key,
                    format!("'{value}' is not a valid boolean"),
                )),
            },
            ValueKind::Number => {
                if value.parse::<f64>().is_err() {
                    issues.push(ValidationIssue::error(
                        source,
                        key,
                        format!("'{value}' is not a valid number"),
                    ));
                }
            }
        }
    }

    fn check_type(
        source: &str,
        key: &str,
        required: &str,
        entry: &DesktopEntry,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if entry.entry_type() != required {
            issues.push(ValidationIssue::error(
                source,
                key,
                format!("Key '{key}' only allowed in Type={required}"),
            ));
        }
    }

    fn check_registered(
        source: &str,
        key: &str,
        value: &str,
        registry: &[&str],
        what: &str,
        issues: &mut Vec<ValidationIssue>,
    ) {
        for item in split_list(value) {
            if !item.starts_with("X-") && !registry.contains(&item.as_str()) {
                issues.push(ValidationIssue::error(
                    source,
                    key,
                    format!("'{item}' is not a registered {what}"),
                ));
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn check_key(source: &str, key: &str, value: &str, entry: &DesktopEntry, issues: &mut Vec<ValidationIssue>) {
        let (base, locale) = split_locale_key(key);
        let translatable = matches!(
            base,
            "Name" | "GenericName" | "Comment" | "Icon" | "Keywords" | "MiniIcon" | "UnmountIcon" | "SwallowTitle"
        );
        if locale.is_some() && !translatable {
            issues.push(ValidationIssue::error(source, key, format!("Invalid key: {key}")));
            return;
        }

        match base {
            "Type" => {
                match value {
                    "Application" | "Link" | "FSDevice" | "Directory" => {}
                    "ServiceType" | "Service" => issues.push(ValidationIssue::warning(
                        source,
                        key,
                        format!("Type={value} is a KDE extension"),
                    )),
                    "MimeType" => issues.push(ValidationIssue::warning(
                        source,
                        key,
                        "Type=MimeType is deprecated",
                    )),
                    _ => issues.push(ValidationIssue::error(
                        source,
                        key,
                        format!(
                            "Value of key 'Type' must be Application, Link, FSDevice or Directory, but is '{value}'"
                        ),
                    )),
                }
                match extension(entry.path()) {
                    "directory" if value != "Directory" => issues.push(ValidationIssue::warning(
                        source,
                        key,
                        format!("File extension is .directory, but Type is '{value}'"),
                    )),
                    "desktop" if value == "Directory" => issues.push(ValidationIssue::warning(
                        source,
                        key,
                        "Files with Type=Directory should have the extension .directory",
                    )),
                    _ => {}
                }
            }
            "Version" => Self::check_value(source, key, value, ValueKind::Number, issues),
            "Encoding" => {
                if value == "Legacy-Mixed" {
                    issues.push(ValidationIssue::error(
                        source,
                        key,
                        "Encoding=Legacy-Mixed is deprecated and not supported",
                    ));
                } else if value != "UTF-8" {
                    issues.push(ValidationIssue::error(
                        source,
                        key,
                        "Value of key 'Encoding' must be UTF-8",
                    ));
                }
            }
            "Name" | "GenericName" | "Comment" | "Icon" => {
                Self::check_value(source, key, value, ValueKind::String, issues);
            }
            "NoDisplay" | "Hidden" => Self::check_value(source, key, value, ValueKind::Boolean, issues),
            "Terminal" | "StartupNotify" => {
                Self::check_value(source, key, value, ValueKind::Boolean, issues);
                Self::check_type(source, key, "Application", entry, issues);
            }
            "TryExec" | "Exec" | "Path" | "SwallowExec" | "FilePatterns" | "Actions" | "MimeType"
            | "StartupWMClass" | "SwallowTitle" => {
                Self::check_value(source, key, value, ValueKind::String, issues);
                Self::check_type(source, key, "Application", entry, issues);
            }
            "Categories" => {
                Self::check_type(source, key, "Application", entry, issues);
                Self::check_registered(source, key, value, REGISTERED_CATEGORIES, "Category", issues);
            }
            "OnlyShowIn" | "NotShowIn" => {
                Self::check_registered(source, key, value, REGISTERED_DESKTOPS, "OnlyShowIn value", issues);
            }
            "SortOrder" => Self::check_type(source, key, "Directory", entry, issues),
            "URL" => Self::check_type(source, key, "Link", entry, issues),
            "Dev" | "FSType" | "MountPoint" | "UnmountIcon" => {
                Self::check_type(source, key, "FSDevice", entry, issues);
            }
            "ReadOnly" => {
                Self::check_value(source, key, value, ValueKind::Boolean, issues);
                Self::check_type(source, key, "FSDevice", entry, issues);
            }
            "InitialPreference" => {
                Self::check_value(source, key, value, ValueKind::Number, issues);
                issues.push(ValidationIssue::warning(
                    source,
                    key,
                    format!("Key '{key}' is a KDE extension"),
                ));
            }
            k if KDE_KEYS.contains(&k) => issues.push(ValidationIssue::warning(
                source,
                key,
                format!("Key '{key}' is a KDE extension"),
            )),
            k if DEPRECATED_KEYS.contains(&k) => issues.push(ValidationIssue::warning(
                source,
                key,
                format!("Key '{key}' is deprecated"),
            )),
            k if k.strip_prefix("X-").is_some_and(|rest| {
                !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            }) => {}
            _ => issues.push(ValidationIssue::error(source, key, format!("Invalid key: {key}"))),
        }
    }
}

impl RecordValidator for KeyValidator {
    fn validate(&self, entry: &DesktopEntry) -> Vec<ValidationIssue> {
        let source = entry.path().display().to_string();
        let mut issues = Vec::new();
        let Some(group) = entry.record().group(entry.record().default_group()) else {
            return issues;
        };

        for (key, value) in &group.entries {
            Self::check_key(&source, key, value, entry, &mut issues);
            if value.is_empty() {
                issues.push(ValidationIssue::warning(
                    &source,
                    key,
                    format!("Value of Key '{key}' is empty"),
                ));
            }
        }
        issues
    }

    fn name(&self) -> &'static str {
        "keys"
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or_default()
}

/// Run every validator over `entry`, errors first.
#[must_use]
pub fn validate_entry(entry: &DesktopEntry) -> Vec<ValidationIssue> {
    let validators: [&dyn RecordValidator; 2] = [&StructureValidator, &KeyValidator];
    let mut issues: Vec<ValidationIssue> = validators
        .iter()
        .flat_map(|v| v.validate(entry))
        .collect();
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
    issues
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn entry_at(path: &str, content: &str) -> DesktopEntry {
        DesktopEntry::parse_str(content, Path::new(path), &[]).expect("test data should parse")
    }

    fn messages(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn clean_application_has_no_issues() {
        let e = entry_at(
            "gimp.desktop",
            "[Desktop Entry]\nVersion=1.0\nType=Application\nName=GIMP\nExec=gimp\n\
             Categories=Graphics;2DGraphics;\nX-GNOME-Bugzilla=gimp\n",
        );
        assert!(validate_entry(&e).is_empty(), "{:?}", validate_entry(&e));
    }

    #[test]
    fn missing_required_keys() {
        let e = entry_at("a.desktop", "[Desktop Entry]\nExec=x\n");
        let issues = StructureValidator.validate(&e);
        let msgs = messages(&issues);
        assert!(msgs.contains(&"Key 'Type' is missing"));
        assert!(msgs.contains(&"Key 'Name' is missing"));
        assert!(msgs.contains(&"Key 'Version' is missing"));
    }

    #[test]
    fn kde_header_and_extension_warnings() {
        let e = entry_at("a.kdelnk", "[KDE Desktop Entry]\nType=Application\nName=A\nVersion=1.0\n");
        let issues = StructureValidator.validate(&e);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn invalid_group_and_show_in_conflict() {
        let e = entry_at(
            "a.desktop",
            "[Desktop Entry]\nType=Application\nName=A\nVersion=1\nOnlyShowIn=GNOME;\nNotShowIn=KDE;\n[Bogus]\nA=b\n",
        );
        let msgs: Vec<String> = StructureValidator
            .validate(&e)
            .into_iter()
            .map(|i| i.message)
            .collect();
        assert!(msgs.contains(&"Invalid Group name: Bogus".to_string()));
        assert!(msgs.contains(&"Group may either have OnlyShowIn or NotShowIn, but not both".to_string()));
    }

    #[test]
    fn deprecated_boolean_is_warning_and_garbage_is_error() {
        let e = entry_at(
            "a.desktop",
            "[Desktop Entry]\nType=Application\nName=A\nNoDisplay=1\nHidden=maybe\n",
        );
        let issues = KeyValidator.validate(&e);
        assert!(issues.iter().any(|i| i.item == "NoDisplay" && i.severity == Severity::Warning));
        assert!(issues.iter().any(|i| i.item == "Hidden" && i.severity == Severity::Error));
    }

    #[test]
    fn type_restricted_keys() {
        let e = entry_at(
            "Games.directory",
            "[Desktop Entry]\nType=Directory\nName=Games\nExec=nope\n",
        );
        let issues = KeyValidator.validate(&e);
        assert_eq!(messages(&issues), ["Key 'Exec' only allowed in Type=Application"]);
    }

    #[test]
    fn type_extension_mismatch() {
        let e = entry_at("a.desktop", "[Desktop Entry]\nType=Directory\nName=A\n");
        let msgs = messages(&KeyValidator.validate(&e)).join("\n");
        assert!(msgs.contains("should have the extension .directory"));
    }

    #[test]
    fn unregistered_category_and_desktop() {
        let e = entry_at(
            "a.desktop",
            "[Desktop Entry]\nType=Application\nName=A\nCategories=Game;Gaem;X-Mine;\nOnlyShowIn=Nope;\n",
        );
        let msgs = messages(&KeyValidator.validate(&e)).join("\n");
        assert!(msgs.contains("'Gaem' is not a registered Category"));
        assert!(!msgs.contains("X-Mine"));
        assert!(msgs.contains("'Nope' is not a registered OnlyShowIn value"));
    }

    #[test]
    fn unknown_kde_and_deprecated_keys() {
        let e = entry_at(
            "a.desktop",
            "[Desktop Entry]\nType=Application\nName=A\nDocPath=x\nMiniIcon=y\nFrobnicate=z\nExec[de]=q\n",
        );
        let issues = KeyValidator.validate(&e);
        let msgs = messages(&issues);
        assert!(msgs.contains(&"Key 'DocPath' is a KDE extension"));
        assert!(msgs.contains(&"Key 'MiniIcon' is deprecated"));
        assert!(msgs.contains(&"Invalid key: Frobnicate"));
        assert!(msgs.contains(&"Invalid key: Exec[de]"));
    }

    #[test]
    fn empty_value_warns() {
        let e = entry_at("a.desktop", "[Desktop Entry]\nType=Application\nName=A\nComment=\n");
        let issues = KeyValidator.validate(&e);
        assert_eq!(messages(&issues), ["Value of Key 'Comment' is empty"]);
    }

    #[test]
    fn errors_sort_before_warnings() {
        let e = entry_at("a.desktop", "[Desktop Entry]\nComment=\n");
        let issues = validate_entry(&e);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues.last().unwrap().severity, Severity::Warning);
    }

    #[test]
    fn validator_names() {
        assert_eq!(StructureValidator.name(), "structure");
        assert_eq!(KeyValidator.name(), "keys");
    }
}
