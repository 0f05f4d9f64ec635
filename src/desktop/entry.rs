use std::path::Path;

use super::ini::IniRecord;
use crate::error::RecordError;

/// Group headers accepted for descriptor files, preferred first.
pub const DESKTOP_HEADERS: &[&str] = &["Desktop Entry", "KDE Desktop Entry"];

/// Typed view over a `.desktop` or `.directory` record.
///
/// Localized getters resolve `Key[locale]` variants using the locale
/// candidates captured when the entry was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    record: IniRecord,
    locales: Vec<String>,
}

impl DesktopEntry {
    /// Read a descriptor file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or lacks a
    /// `[Desktop Entry]` (or legacy `[KDE Desktop Entry]`) group.
    pub fn parse(path: &Path, locales: &[String]) -> Result<Self, RecordError> {
        Ok(Self {
            record: IniRecord::parse(path, DESKTOP_HEADERS)?,
            locales: locales.to_vec(),
        })
    }

    /// Parse descriptor content that was read from `path`.
    ///
    /// # Errors
    ///
    /// Same as [`DesktopEntry::parse`], minus I/O.
    pub fn parse_str(content: &str, path: &Path, locales: &[String]) -> Result<Self, RecordError> {
        Ok(Self {
            record: IniRecord::parse_str(content, path, DESKTOP_HEADERS)?,
            locales: locales.to_vec(),
        })
    }

    /// Start a new, unsaved record at `path`.
    ///
    /// `Type` is `Directory` for a `.directory` file and `Application`
    /// otherwise.
    #[must_use]
    pub fn new(path: &Path, locales: &[String]) -> Self {
        let kind = if path.extension().is_some_and(|e| e == "directory") {
            "Directory"
        } else {
            "Application"
        };
        let mut record = IniRecord::new(path, "Desktop Entry");
        record.set("Version", "1.0");
        record.set("Type", kind);
        Self {
            record,
            locales: locales.to_vec(),
        }
    }

    /// Underlying record.
    #[must_use]
    pub const fn record(&self) -> &IniRecord {
        &self.record
    }

    /// Mutable access to the underlying record.
    pub const fn record_mut(&mut self) -> &mut IniRecord {
        &mut self.record
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.record.path()
    }

    fn localized(&self, key: &str) -> &str {
        self.record
            .get_localized(key, &self.locales)
            .unwrap_or_default()
    }

    /// `Type` value.
    #[must_use]
    pub fn entry_type(&self) -> &str {
        self.record.get("Type").unwrap_or_default()
    }

    /// Localized `Name`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.localized("Name")
    }

    /// Localized `GenericName`.
    #[must_use]
    pub fn generic_name(&self) -> &str {
        self.localized("GenericName")
    }

    /// Localized `Comment`.
    #[must_use]
    pub fn comment(&self) -> &str {
        self.localized("Comment")
    }

    /// Localized `Icon`.
    #[must_use]
    pub fn icon(&self) -> &str {
        self.localized("Icon")
    }

    /// `Exec` command line.
    #[must_use]
    pub fn exec(&self) -> &str {
        self.record.get("Exec").unwrap_or_default()
    }

    /// `TryExec` program, if declared and non-empty.
    #[must_use]
    pub fn try_exec(&self) -> Option<&str> {
        self.record.get("TryExec").filter(|v| !v.is_empty())
    }

    /// `NoDisplay` flag.
    #[must_use]
    pub fn no_display(&self) -> bool {
        self.record.get_bool("NoDisplay")
    }

    /// `Hidden` flag.
    #[must_use]
    pub fn hidden(&self) -> bool {
        self.record.get_bool("Hidden")
    }

    /// `Terminal` flag.
    #[must_use]
    pub fn terminal(&self) -> bool {
        self.record.get_bool("Terminal")
    }

    /// `Categories` list.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.record.get_list("Categories")
    }

    /// `OnlyShowIn` list.
    #[must_use]
    pub fn only_show_in(&self) -> Vec<String> {
        self.record.get_list("OnlyShowIn")
    }

    /// `NotShowIn` list.
    #[must_use]
    pub fn not_show_in(&self) -> Vec<String> {
        self.record.get_list("NotShowIn")
    }

    /// Set a plain key.
    pub fn set(&mut self, key: &str, value: &str) {
        self.record.set(key, value);
    }

    /// Set a translatable key for the current locale.
    ///
    /// The untranslated key is filled in too when the record lacks it, so
    /// the value shows up in every locale.
    pub fn set_localized(&mut self, key: &str, value: &str) {
        if !self.record.has_key(key) {
            self.record.set(key, value);
        }
        if let Some(locale) = self.locales.first() {
            self.record.set(&format!("{key}[{locale}]"), value);
        } else {
            self.record.set(key, value);
        }
    }

    /// Set a boolean key.
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.record.set(key, if value { "true" } else { "false" });
    }

    /// Whether the record has unsaved changes.
    #[must_use]
    pub const fn is_tainted(&self) -> bool {
        self.record.is_tainted()
    }

    /// Write the record if it has unsaved changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&mut self) -> Result<(), RecordError> {
        if self.record.is_tainted() {
            self.record.write()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(content: &str, locales: &[&str]) -> DesktopEntry {
        let locales: Vec<String> = locales.iter().map(ToString::to_string).collect();
        DesktopEntry::parse_str(content, Path::new("app.desktop"), &locales)
            .expect("test data should parse")
    }

    #[test]
    fn typed_getters() {
        let e = entry(
            "[Desktop Entry]\nType=Application\nName=Gimp\nName[fr]=Gimp FR\nExec=gimp %U\n\
             TryExec=gimp\nTerminal=false\nCategories=Graphics;2DGraphics;\nOnlyShowIn=GNOME;XFCE;\n",
            &["fr"],
        );
        assert_eq!(e.entry_type(), "Application");
        assert_eq!(e.name(), "Gimp FR");
        assert_eq!(e.exec(), "gimp %U");
        assert_eq!(e.try_exec(), Some("gimp"));
        assert!(!e.terminal());
        assert_eq!(e.categories(), ["Graphics", "2DGraphics"]);
        assert_eq!(e.only_show_in(), ["GNOME", "XFCE"]);
        assert!(e.not_show_in().is_empty());
    }

    #[test]
    fn absent_keys_read_as_defaults() {
        let e = entry("[Desktop Entry]\nTryExec=\n", &[]);
        assert_eq!(e.name(), "");
        assert_eq!(e.try_exec(), None);
        assert!(!e.no_display());
        assert!(!e.hidden());
    }

    #[test]
    fn new_entry_type_follows_extension() {
        let app = DesktopEntry::new(Path::new("/x/a.desktop"), &[]);
        let dir = DesktopEntry::new(Path::new("/x/Games.directory"), &[]);
        assert_eq!(app.entry_type(), "Application");
        assert_eq!(dir.entry_type(), "Directory");
        assert!(app.is_tainted());
    }

    #[test]
    fn set_localized_fills_base_key_once() {
        let mut e = entry("[Desktop Entry]\nType=Application\n", &["de"]);
        e.set_localized("Name", "Spiel");
        assert_eq!(e.record().get("Name"), Some("Spiel"));
        assert_eq!(e.record().get("Name[de]"), Some("Spiel"));

        e.set_localized("Name", "Anderes");
        assert_eq!(e.record().get("Name"), Some("Spiel"));
        assert_eq!(e.name(), "Anderes");
    }

    #[test]
    fn set_bool_writes_canonical_value() {
        let mut e = entry("[Desktop Entry]\n", &[]);
        e.set_bool("NoDisplay", true);
        assert_eq!(e.record().get("NoDisplay"), Some("true"));
        assert!(e.no_display());
    }
}
