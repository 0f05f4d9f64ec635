//! Menu resolution: from a definition document to a sorted display tree.
//!
//! [`parse`] runs the whole pipeline: read the document and everything it
//! merges, execute moves, settle inherited state, allocate entries in two
//! passes and sort. The result is a [`Menu`] holding the tree, the entry
//! catalog and the environment it was resolved against. [`MenuEditor`]
//! mutates a resolved menu and persists the changes.

pub mod catalog;
pub mod editor;
pub mod layout;
pub mod parser;
pub mod render;
pub mod resolve;
pub mod rule;
pub mod sort;
pub mod tree;
pub mod xml;

use std::fmt;
use std::path::{Path, PathBuf};

pub use catalog::{EntryCatalog, EntryId, MenuEntry, Origin};
pub use editor::{EditAction, EditOutcome, ItemRef, MenuEditor, Position, RecordEdit};
pub use parser::ParseOptions;
pub use render::{MenuSnapshot, SnapshotItem};
pub use sort::{DisplayItem, Show};
pub use tree::{MenuId, MenuNode, MenuTree};

use crate::error::ParseError;
use crate::exec::{ExecutableLookup, SystemLookup};
use crate::platform::Platform;
use rule::Pass;
use sort::SortContext;

/// A resolved menu.
pub struct Menu {
    /// The resolved tree.
    pub tree: MenuTree,
    /// Every descriptor and directory record seen while resolving.
    pub catalog: EntryCatalog,
    /// Environment the menu was resolved against.
    pub platform: Platform,
    /// Absolute path of the definition document.
    pub filename: PathBuf,
    exec: Box<dyn ExecutableLookup>,
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("filename", &self.filename)
            .field("platform", &self.platform)
            .field("entries", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

/// Resolve the menu at `filename` (or the default menu) with `TryExec`
/// checked against `PATH`.
///
/// # Errors
///
/// See [`parse_with`].
pub fn parse(filename: Option<&Path>, platform: &Platform, options: ParseOptions) -> Result<Menu, ParseError> {
    parse_with(filename, platform, options, Box::new(SystemLookup))
}

/// Resolve the menu at `filename` using `exec` for `TryExec` checks.
///
/// # Errors
///
/// Returns a [`ParseError`] when the document cannot be located, read or
/// parsed. Soft misses while resolving are logged and never abort.
pub fn parse_with(
    filename: Option<&Path>,
    platform: &Platform,
    options: ParseOptions,
    exec: Box<dyn ExecutableLookup>,
) -> Result<Menu, ParseError> {
    let filename = parser::locate(filename, platform)?;
    tracing::debug!(file = %filename.display(), "parsing");

    let mut catalog = EntryCatalog::new(platform);
    let mut tree = parser::parse_document(&filename, platform, options, &mut catalog)?;
    resolve::apply_moves(&mut tree);
    resolve::postparse(&mut tree, &mut catalog);
    resolve::allocate(&mut tree, &mut catalog, Pass::First);
    resolve::allocate(&mut tree, &mut catalog, Pass::Second);

    let mut menu = Menu {
        tree,
        catalog,
        platform: platform.clone(),
        filename,
        exec,
    };
    menu.sort();
    tracing::info!(
        "resolved {} ({} menus, {} records)",
        menu.filename.display(),
        menu.tree.post_order().len(),
        menu.catalog.len()
    );
    Ok(menu)
}

impl Menu {
    /// Rebuild every display list and recompute visibility.
    pub fn sort(&mut self) {
        let ctx = SortContext {
            catalog: &self.catalog,
            desktops: &self.platform.desktops,
            exec: self.exec.as_ref(),
        };
        sort::sort(&mut self.tree, &ctx);
    }

    /// The root menu.
    #[must_use]
    pub const fn root(&self) -> MenuId {
        self.tree.root()
    }

    /// Submenu at a slash-delimited path below the root.
    #[must_use]
    pub fn submenu(&self, path: &str) -> Option<MenuId> {
        self.tree.find_path(self.root(), path)
    }

    /// Display name of a menu.
    #[must_use]
    pub fn name(&self, id: MenuId) -> String {
        sort::menu_name(&self.tree, &self.catalog, id)
    }

    /// Look up an entry.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> &MenuEntry {
        self.catalog.entry(id)
    }

    /// Entry with `desktop_file_id` allocated anywhere in the tree.
    #[must_use]
    pub fn find_entry(&self, desktop_file_id: &str) -> Option<EntryId> {
        self.tree.pre_order().into_iter().find_map(|node| {
            self.tree
                .node(node)
                .menu_entries
                .iter()
                .copied()
                .find(|&e| self.catalog.entry(e).desktop_file_id == desktop_file_id)
        })
    }

    /// Serializable view of the display tree.
    #[must_use]
    pub fn snapshot(&self, hidden: bool) -> MenuSnapshot {
        self.snapshot_at(self.root(), hidden)
    }

    /// Serializable view of the subtree at `id`.
    #[must_use]
    pub fn snapshot_at(&self, id: MenuId, hidden: bool) -> MenuSnapshot {
        render::snapshot(self, id, hidden)
    }

    /// Indented text rendering of the display tree.
    #[must_use]
    pub fn render(&self, hidden: bool) -> String {
        self.render_at(self.root(), hidden)
    }

    /// Indented text rendering of the subtree at `id`.
    #[must_use]
    pub fn render_at(&self, id: MenuId, hidden: bool) -> String {
        render::render_text(self, id, hidden)
    }
}
