//! Views of a resolved menu for output: a serializable snapshot and an
//! indented text rendering.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use super::sort::{DisplayItem, Header};
use super::tree::MenuId;
use super::Menu;

/// A menu and its displayed items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuSnapshot {
    /// Display name.
    pub name: String,
    /// Path below the root.
    pub path: String,
    /// Visibility, `shown` when visible.
    pub show: String,
    /// Number of visible items.
    pub visible: usize,
    /// Directory record backing the menu.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Displayed items in order.
    pub items: Vec<SnapshotItem>,
}

/// One displayed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotItem {
    /// A nested menu.
    Menu(MenuSnapshot),
    /// An application entry.
    Entry {
        /// Desktop-file id.
        id: String,
        /// Display name.
        name: String,
        /// Record path.
        path: PathBuf,
        /// Provenance.
        origin: String,
        /// Visibility.
        show: String,
    },
    /// A visible separator.
    Separator,
    /// Header of an inlined menu.
    Header {
        /// Inlined menu name.
        name: String,
    },
}

/// Snapshot of `id`; with `hidden` false only visible items are included.
pub(crate) fn snapshot(menu: &Menu, id: MenuId, hidden: bool) -> MenuSnapshot {
    let node = menu.tree.node(id);
    let items = node
        .entries
        .iter()
        .filter(|item| hidden || item.is_shown(&menu.tree))
        .map(|item| match item {
            DisplayItem::Submenu { id: sub, alias } => {
                let mut nested = snapshot(menu, *sub, hidden);
                if let Some(Header { name, .. }) = alias {
                    nested.name.clone_from(name);
                }
                SnapshotItem::Menu(nested)
            }
            DisplayItem::Entry { id: entry, show, alias } => {
                let e = menu.catalog.entry(*entry);
                SnapshotItem::Entry {
                    id: e.desktop_file_id.clone(),
                    name: alias
                        .as_ref()
                        .map_or_else(|| e.record.name().to_string(), |h| h.name.clone()),
                    path: e.record.path().to_path_buf(),
                    origin: menu.catalog.origin(*entry).to_string(),
                    show: show.to_string(),
                }
            }
            DisplayItem::Separator { .. } => SnapshotItem::Separator,
            DisplayItem::Header(header) => SnapshotItem::Header {
                name: header.name.clone(),
            },
        })
        .collect();

    MenuSnapshot {
        name: menu.name(id),
        path: menu.tree.relative_path(id),
        show: node.show.to_string(),
        visible: node.visible,
        directory: node
            .directory
            .map(|d| menu.catalog.entry(d).record.path().to_path_buf()),
        items,
    }
}

/// Render the tree below `id` as indented lines: menus end in `/`, entries
/// show their id, separators are `---` and inline headers are bracketed.
/// With `hidden` invisible items are listed with their reason.
pub(crate) fn render_text(menu: &Menu, id: MenuId, hidden: bool) -> String {
    let root = snapshot(menu, id, hidden);
    let mut out = format!("{}/", root.name);
    write_items(&mut out, &root.items, 1);
    out
}

fn write_items(out: &mut String, items: &[SnapshotItem], depth: usize) {
    let indent = "  ".repeat(depth);
    for item in items {
        out.push('\n');
        match item {
            SnapshotItem::Menu(menu) => {
                let _ = write!(out, "{indent}{}/{}", menu.name, reason(&menu.show));
                write_items(out, &menu.items, depth + 1);
            }
            SnapshotItem::Entry { id, name, show, .. } => {
                let _ = write!(out, "{indent}{name} ({id}){}", reason(show));
            }
            SnapshotItem::Separator => {
                let _ = write!(out, "{indent}---");
            }
            SnapshotItem::Header { name } => {
                let _ = write!(out, "{indent}[{name}]");
            }
        }
    }
}

fn reason(show: &str) -> String {
    if show == "shown" {
        String::new()
    } else {
        format!(" [{show}]")
    }
}
