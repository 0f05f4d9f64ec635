//! Catalog of application descriptors found in the menu's search paths.
//!
//! Entries live in one arena addressed by [`EntryId`]. Directories are
//! scanned once; lookups over a directory list are deduplicated by
//! desktop-file id and memoized.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::tree::MenuId;
use crate::desktop::DesktopEntry;
use crate::platform::Platform;

/// Handle to an entry in an [`EntryCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

/// Where a record comes from, as far as editing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Installed system-wide; edits create a user copy.
    System,
    /// Only present in the user's data directory.
    User,
    /// A user copy shadowing a system record.
    Both,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// Bucket of scanned entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogKey {
    /// Everything found under one directory.
    Dir(PathBuf),
    /// Entries imported through `<LegacyDir>`.
    Legacy,
}

/// A descriptor record as placed in menus.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    /// Identifier: relative path with `/` replaced by `-`, legacy prefix
    /// prepended.
    pub desktop_file_id: String,
    /// Path relative to the directory it was found in.
    pub filename: PathBuf,
    /// Legacy prefix, empty for regular entries.
    pub prefix: String,
    /// The parsed record.
    pub record: DesktopEntry,
    /// Cached `Categories`, extended with `Legacy` for legacy imports.
    pub categories: Vec<String>,
    /// System record shadowed by this one.
    pub original: Option<EntryId>,
    /// Menus that allocated this entry.
    pub parents: Vec<MenuId>,
    pub(crate) allocated: bool,
    pub(crate) matched_include: bool,
    pub(crate) add: bool,
}

impl MenuEntry {
    /// Wrap a parsed record found at `filename` below its search directory.
    #[must_use]
    pub fn new(record: DesktopEntry, filename: PathBuf, prefix: &str) -> Self {
        let relative = filename.to_string_lossy().replace('/', "-");
        let desktop_file_id = if prefix.is_empty() {
            relative
        } else {
            format!("{prefix}-{relative}")
        };
        Self {
            desktop_file_id,
            categories: record.categories(),
            filename,
            prefix: prefix.to_string(),
            record,
            original: None,
            parents: Vec::new(),
            allocated: false,
            matched_include: false,
            add: false,
        }
    }

    /// Directory the entry was found in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        let depth = self.filename.components().count();
        self.record
            .path()
            .ancestors()
            .nth(depth)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Whether the entry has been allocated to any menu in this run.
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.allocated
    }
}

/// Arena of entries plus per-directory buckets and a lookup cache.
#[derive(Debug)]
pub struct EntryCatalog {
    entries: Vec<MenuEntry>,
    buckets: HashMap<CatalogKey, Vec<EntryId>>,
    cache: HashMap<(Vec<PathBuf>, bool), Vec<EntryId>>,
    locales: Vec<String>,
    data_home: PathBuf,
    root_mode: bool,
}

impl EntryCatalog {
    /// Create an empty catalog for `platform`.
    #[must_use]
    pub fn new(platform: &Platform) -> Self {
        Self {
            entries: Vec::new(),
            buckets: HashMap::from([(CatalogKey::Legacy, Vec::new())]),
            cache: HashMap::new(),
            locales: platform.locales.clone(),
            data_home: platform.dirs.data_home.clone(),
            root_mode: platform.root_mode,
        }
    }

    /// Locale candidates records are parsed with.
    #[must_use]
    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    /// Number of entries in the arena, including directory records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry.
    ///
    /// Ids are only created by this catalog, so they are always in range.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn entry(&self, id: EntryId) -> &MenuEntry {
        &self.entries[id.0]
    }

    /// Mutable entry access.
    #[allow(clippy::indexing_slicing)]
    pub fn entry_mut(&mut self, id: EntryId) -> &mut MenuEntry {
        &mut self.entries[id.0]
    }

    /// Add an entry to the arena without placing it in any bucket.
    pub fn insert(&mut self, entry: MenuEntry) -> EntryId {
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }

    /// Parse `dir/filename` and add it to the arena without bucketing it.
    ///
    /// Used for `.directory` records. Unreadable records yield `None`.
    pub fn load_record(&mut self, dir: &Path, filename: &Path) -> Option<EntryId> {
        match DesktopEntry::parse(&dir.join(filename), &self.locales) {
            Ok(record) => Some(self.insert(MenuEntry::new(record, filename.to_path_buf(), ""))),
            Err(e) => {
                tracing::debug!(file = %filename.display(), "skipping record: {e}");
                None
            }
        }
    }

    /// Entries imported through legacy directories, in scan order.
    #[must_use]
    pub fn legacy_ids(&self) -> &[EntryId] {
        self.buckets
            .get(&CatalogKey::Legacy)
            .map_or(&[], Vec::as_slice)
    }

    /// Provenance of an entry.
    #[must_use]
    pub fn origin(&self, id: EntryId) -> Origin {
        let entry = self.entry(id);
        if self.root_mode {
            Origin::User
        } else if entry.original.is_some() {
            Origin::Both
        } else if entry.record.path().starts_with(&self.data_home) {
            Origin::User
        } else {
            Origin::System
        }
    }

    /// Scan each directory once, recursively, for `*.desktop` files.
    pub fn scan(&mut self, dirs: &[PathBuf]) {
        for dir in dirs {
            self.scan_dir(dir, "", false);
        }
    }

    /// Scan one legacy directory, non-recursively, and add its entries to the
    /// legacy bucket as well.
    pub fn scan_legacy(&mut self, dir: &Path, prefix: &str) {
        self.scan_dir(dir, prefix, true);
    }

    fn scan_dir(&mut self, dir: &Path, prefix: &str, legacy: bool) {
        use rayon::prelude::*;

        let key = CatalogKey::Dir(dir.to_path_buf());
        if self.buckets.contains_key(&key) {
            return;
        }

        let max_depth = if legacy { 1 } else { usize::MAX };
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|p| p.extension().is_some_and(|ext| ext == "desktop"))
            .collect();

        let locales = &self.locales;
        let parsed: Vec<_> = files
            .par_iter()
            .map(|path| (path, DesktopEntry::parse(path, locales)))
            .collect();

        let mut ids = Vec::with_capacity(parsed.len());
        for (path, result) in parsed {
            match result {
                Ok(record) => {
                    let filename = path.strip_prefix(dir).unwrap_or(path).to_path_buf();
                    ids.push(self.insert(MenuEntry::new(record, filename, prefix)));
                }
                Err(e) => tracing::debug!(file = %path.display(), "skipping descriptor: {e}"),
            }
        }

        tracing::debug!(file = %dir.display(), "scanned {} entries", ids.len());
        if legacy {
            self.buckets
                .entry(CatalogKey::Legacy)
                .or_default()
                .extend(ids.iter().copied());
        }
        self.buckets.insert(key, ids);
    }

    /// Entries of `dirs` (and the legacy bucket when asked), first id wins.
    ///
    /// When a later duplicate is a system record and the winner a user
    /// record, the duplicate becomes the winner's shadowed original.
    pub fn lookup(&mut self, dirs: &[PathBuf], include_legacy: bool) -> Vec<EntryId> {
        let cache_key = (dirs.to_vec(), include_legacy);
        if let Some(hit) = self.cache.get(&cache_key) {
            return hit.clone();
        }

        let mut keys: Vec<CatalogKey> = dirs.iter().cloned().map(CatalogKey::Dir).collect();
        if include_legacy {
            keys.push(CatalogKey::Legacy);
        }

        let mut result: Vec<EntryId> = Vec::new();
        let mut seen: HashMap<String, EntryId> = HashMap::new();
        for key in keys {
            let Some(bucket) = self.buckets.get(&key).cloned() else {
                continue;
            };
            for id in bucket {
                let desktop_file_id = self.entry(id).desktop_file_id.clone();
                if let Some(&winner) = seen.get(&desktop_file_id) {
                    if winner != id
                        && self.origin(id) == Origin::System
                        && self.origin(winner) == Origin::User
                    {
                        self.entry_mut(winner).original = Some(id);
                    }
                } else {
                    seen.insert(desktop_file_id, id);
                    result.push(id);
                }
            }
        }

        self.cache.insert(cache_key, result.clone());
        result
    }

    /// Clear allocation state left by a previous run.
    pub fn reset_allocation(&mut self) {
        for entry in &mut self.entries {
            entry.allocated = false;
            entry.matched_include = false;
            entry.add = false;
            entry.parents.clear();
        }
    }
}
