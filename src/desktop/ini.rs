use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RecordError;

/// One `[Group]` of a descriptor file with its keys in file order.
///
/// # Examples
///
/// ```
/// use xdgmenu_cli::desktop::ini::Group;
///
/// let group = Group {
///     name: "Desktop Entry".to_string(),
///     entries: vec![("Name".to_string(), "Files".to_string())],
/// };
/// assert_eq!(group.get("Name"), Some("Files"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Header text between the brackets.
    pub name: String,
    /// Key/value pairs in file order. Keys are unique within a group.
    pub entries: Vec<(String, String)>,
}

impl Group {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Look up a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }
}

/// Parse descriptor content into groups.
///
/// Blank lines and `#` comments are skipped. A repeated group header starts
/// the group over and a repeated key overwrites the earlier value. A line
/// without `=` is kept as a key with an empty value so validation can
/// report it.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use xdgmenu_cli::desktop::ini::parse_groups_from_str;
///
/// let groups = parse_groups_from_str(
///     "[Desktop Entry]\nName=Files\nExec=nautilus\n",
///     Path::new("files.desktop"),
/// ).unwrap();
/// assert_eq!(groups[0].name, "Desktop Entry");
/// assert_eq!(groups[0].get("Exec"), Some("nautilus"));
/// ```
///
/// # Errors
///
/// Returns [`RecordError::ItemOutsideGroup`] if a key appears before the
/// first group header.
pub fn parse_groups_from_str(content: &str, path: &Path) -> Result<Vec<Group>, RecordError> {
    let mut groups: Vec<Group> = Vec::new();
    let mut current: Option<usize> = None;

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.strip_suffix(']').unwrap_or(header);
            if let Some(idx) = groups.iter().position(|g| g.name == name) {
                if let Some(group) = groups.get_mut(idx) {
                    group.entries.clear();
                }
                current = Some(idx);
            } else {
                groups.push(Group::new(name));
                current = Some(groups.len() - 1);
            }
            continue;
        }

        let Some(group) = current.and_then(|idx| groups.get_mut(idx)) else {
            return Err(RecordError::ItemOutsideGroup {
                line: line_num + 1,
                path: path.to_path_buf(),
            });
        };

        let (key, value) = trimmed
            .split_once('=')
            .map_or((trimmed, ""), |(k, v)| (k.trim(), v.trim()));
        group.set(key, value);
    }

    Ok(groups)
}

/// Split a list value on the first unescaped separator kind.
///
/// `;` wins over `|`, which wins over `,`. An escaped separator (`\;`) does
/// not split. Only escapes of the separator in use lose their backslash; other
/// escaped separators are kept verbatim. A trailing empty element is dropped.
///
/// # Examples
///
/// ```
/// use xdgmenu_cli::desktop::ini::split_list;
///
/// assert_eq!(split_list("Game;ArcadeGame;"), ["Game", "ArcadeGame"]);
/// assert_eq!(split_list("a|b"), ["a", "b"]);
/// assert_eq!(split_list(r"a\;b;c"), ["a;b", "c"]);
/// assert_eq!(split_list(r"a\;b,c"), [r"a\;b", "c"]);
/// ```
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
    let Some(sep) = [';', '|', ','].into_iter().find(|&s| has_unescaped(value, s)) else {
        return if value.is_empty() {
            Vec::new()
        } else {
            vec![value.to_string()]
        };
    };

    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&sep) {
            current.push(sep);
            chars.next();
        } else if c == sep {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    items.push(current);

    if items.last().is_some_and(String::is_empty) {
        items.pop();
    }
    items
}

fn has_unescaped(value: &str, sep: char) -> bool {
    let mut prev = None;
    for c in value.chars() {
        if c == sep && prev != Some('\\') {
            return true;
        }
        prev = Some(c);
    }
    false
}

/// Interpret a boolean value. Only `true`, `True` and the deprecated `1`
/// count as true.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(value, "true" | "True" | "1")
}

/// Split a key like `Name[de_DE]` into its base and locale parts.
///
/// # Examples
///
/// ```
/// use xdgmenu_cli::desktop::ini::split_locale_key;
///
/// assert_eq!(split_locale_key("Name[de]"), ("Name", Some("de")));
/// assert_eq!(split_locale_key("Exec"), ("Exec", None));
/// ```
#[must_use]
pub fn split_locale_key(key: &str) -> (&str, Option<&str>) {
    key.strip_suffix(']')
        .and_then(|k| k.split_once('['))
        .map_or((key, None), |(base, locale)| (base, Some(locale)))
}

/// A key/value record backed by one descriptor file.
///
/// Keeps group and key order so a record written back differs from the
/// original only where it was edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniRecord {
    path: PathBuf,
    groups: Vec<Group>,
    default_group: String,
    tainted: bool,
}

impl IniRecord {
    /// Read and parse `path`, requiring one of `headers` as a group.
    ///
    /// The first header found becomes the default group for lookups.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains keys outside
    /// any group, or has none of the accepted headers.
    pub fn parse(path: &Path, headers: &[&str]) -> Result<Self, RecordError> {
        let content = fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content, path, headers)
    }

    /// Parse record content that was read from `path`.
    ///
    /// # Errors
    ///
    /// Same as [`IniRecord::parse`], minus I/O.
    pub fn parse_str(content: &str, path: &Path, headers: &[&str]) -> Result<Self, RecordError> {
        let groups = parse_groups_from_str(content, path)?;
        let default_group = headers
            .iter()
            .find(|h| groups.iter().any(|g| g.name == **h))
            .ok_or_else(|| RecordError::MissingHeader {
                header: headers.first().copied().unwrap_or_default().to_string(),
                path: path.to_path_buf(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            default_group: (*default_group).to_string(),
            groups,
            tainted: false,
        })
    }

    /// Create an empty record with a single `default_group`.
    ///
    /// The record starts tainted since it does not exist on disk yet.
    #[must_use]
    pub fn new(path: &Path, default_group: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            groups: vec![Group::new(default_group)],
            default_group: default_group.to_string(),
            tainted: true,
        }
    }

    /// Path the record was read from (or will be written to).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Redirect future writes to `path`.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = path;
        self.tainted = true;
    }

    /// Name of the group used when none is given.
    #[must_use]
    pub fn default_group(&self) -> &str {
        &self.default_group
    }

    /// Whether the record has unsaved changes.
    #[must_use]
    pub const fn is_tainted(&self) -> bool {
        self.tainted
    }

    /// All groups in file order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Look up a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Raw value of `key` in the default group.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.group(&self.default_group)?.get(key)
    }

    /// Whether the default group has `key`.
    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Value of `key` in the default group, preferring the first matching
    /// `key[locale]` variant among `locales`.
    #[must_use]
    pub fn get_localized(&self, key: &str, locales: &[String]) -> Option<&str> {
        let group = self.group(&self.default_group)?;
        locales
            .iter()
            .find_map(|locale| group.get(&format!("{key}[{locale}]")))
            .or_else(|| group.get(key))
    }

    /// List value of `key` (see [`split_list`]); empty when absent.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_list).unwrap_or_default()
    }

    /// Boolean value of `key`; `false` when absent.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(parse_bool)
    }

    /// Set `key` in the default group.
    pub fn set(&mut self, key: &str, value: &str) {
        let default_group = self.default_group.clone();
        if let Some(group) = self.groups.iter_mut().find(|g| g.name == default_group) {
            group.set(key, value);
        } else {
            let mut group = Group::new(default_group);
            group.set(key, value);
            self.groups.insert(0, group);
        }
        self.tainted = true;
    }

    /// Set `key` in an existing group.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NoGroup`] if `group` does not exist.
    pub fn set_in(&mut self, group: &str, key: &str, value: &str) -> Result<(), RecordError> {
        let target = self
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| RecordError::NoGroup {
                group: group.to_string(),
                path: self.path.clone(),
            })?;
        target.set(key, value);
        self.tainted = true;
        Ok(())
    }

    /// Remove `key` and all of its locale variants from the default group.
    ///
    /// Returns the removed base value, if there was one.
    pub fn remove_key(&mut self, key: &str) -> Option<String> {
        let default_group = self.default_group.clone();
        let group = self.groups.iter_mut().find(|g| g.name == default_group)?;
        let base = group.get(key).map(String::from);
        let before = group.entries.len();
        group
            .entries
            .retain(|(k, _)| split_locale_key(k).0 != key);
        if group.entries.len() != before {
            self.tainted = true;
        }
        base
    }

    /// Serialize the record, default group first.
    #[must_use]
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        let ordered = self
            .groups
            .iter()
            .filter(|g| g.name == self.default_group)
            .chain(self.groups.iter().filter(|g| g.name != self.default_group));
        for group in ordered {
            let _ = writeln!(out, "[{}]", group.name);
            for (key, value) in &group.entries {
                let _ = writeln!(out, "{key}={value}");
            }
            out.push('\n');
        }
        out
    }

    /// Write the record to its path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Io`] if the directory or file cannot be written.
    pub fn write(&mut self) -> Result<(), RecordError> {
        let io_err = |source| RecordError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.path, self.to_ini_string()).map_err(io_err)?;
        self.tainted = false;
        Ok(())
    }
}
