//! Layout ordering and visibility.
//!
//! Sorting rebuilds every node's display list from its layout, allocated
//! entries and already-sorted submenus, then computes visibility. It never
//! changes allocation, so running it twice gives the same result.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use super::catalog::{EntryCatalog, EntryId};
use super::layout::{InlineOverrides, LayoutItem, MergeKind};
use super::tree::{MenuId, MenuTree};
use crate::desktop::show_in::shown_in;
use crate::exec::ExecutableLookup;

/// Visibility of a displayed item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Show {
    /// Visible.
    #[default]
    Shown,
    /// Menu marked `<Deleted>`.
    Deleted,
    /// `NoDisplay=true`.
    NoDisplay,
    /// `Hidden=true`.
    Hidden,
    /// Menu with nothing visible in it.
    Empty,
    /// Excluded for the current desktop.
    NotShowIn,
    /// `TryExec` program not found.
    NoExec,
}

impl Show {
    /// Whether the item is visible.
    #[must_use]
    pub const fn is_shown(self) -> bool {
        matches!(self, Self::Shown)
    }
}

impl fmt::Display for Show {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Shown => "shown",
            Self::Deleted => "deleted",
            Self::NoDisplay => "nodisplay",
            Self::Hidden => "hidden",
            Self::Empty => "empty",
            Self::NotShowIn => "notshowin",
            Self::NoExec => "noexec",
        };
        f.write_str(s)
    }
}

/// Display texts of an inlined menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Menu name.
    pub name: String,
    /// Menu generic name.
    pub generic_name: String,
    /// Menu comment.
    pub comment: String,
}

/// One item of a menu's display list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayItem {
    /// A nested submenu.
    Submenu {
        /// The submenu.
        id: MenuId,
        /// Texts of the inlined parent when the submenu stands in for it.
        alias: Option<Header>,
    },
    /// An application entry.
    Entry {
        /// The entry.
        id: EntryId,
        /// Visibility in this menu.
        show: Show,
        /// Texts of the inlined parent when the entry stands in for it.
        alias: Option<Header>,
    },
    /// A separator line.
    Separator {
        /// Whether the separator is drawn.
        shown: bool,
    },
    /// Header placed in front of an inlined menu's items.
    Header(Header),
}

impl DisplayItem {
    /// Whether the item is visible, given the tree for submenu state.
    #[must_use]
    pub fn is_shown(&self, tree: &MenuTree) -> bool {
        match self {
            Self::Submenu { id, .. } => tree.node(*id).show.is_shown(),
            Self::Entry { show, .. } => show.is_shown(),
            Self::Separator { shown } => *shown,
            Self::Header(_) => true,
        }
    }
}

/// Inputs visibility depends on besides the tree itself.
#[derive(Clone, Copy)]
pub struct SortContext<'a> {
    /// Catalog holding entry and directory records.
    pub catalog: &'a EntryCatalog,
    /// Current desktops for `OnlyShowIn` / `NotShowIn`.
    pub desktops: &'a [String],
    /// `TryExec` resolution.
    pub exec: &'a dyn ExecutableLookup,
}

impl fmt::Debug for SortContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortContext")
            .field("desktops", &self.desktops)
            .finish_non_exhaustive()
    }
}

/// Display name of a menu: its directory record's name, else its `<Name>`.
#[must_use]
pub fn menu_name(tree: &MenuTree, catalog: &EntryCatalog, id: MenuId) -> String {
    let node = tree.node(id);
    node.directory
        .map(|d| catalog.entry(d).record.name())
        .filter(|n| !n.is_empty())
        .unwrap_or(node.name.as_str())
        .to_string()
}

/// Header texts for a menu.
#[must_use]
pub fn menu_header(tree: &MenuTree, catalog: &EntryCatalog, id: MenuId) -> Header {
    let record = tree.node(id).directory.map(|d| &catalog.entry(d).record);
    Header {
        name: menu_name(tree, catalog, id),
        generic_name: record.map(|r| r.generic_name().to_string()).unwrap_or_default(),
        comment: record.map(|r| r.comment().to_string()).unwrap_or_default(),
    }
}

/// Case-insensitive collation with the raw text as tie breaker.
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Sort the whole tree, children before parents.
pub fn sort(tree: &mut MenuTree, ctx: &SortContext<'_>) {
    for id in tree.post_order() {
        sort_node(tree, id, ctx);
    }
}

/// Item being merged by `<Merge>`, before it becomes a display item.
enum Mergeable {
    Menu(MenuId),
    Entry(EntryId),
}

fn sort_node(tree: &mut MenuTree, id: MenuId, ctx: &SortContext<'_>) {
    let node = tree.node(id);
    let layout = node.layout.clone().unwrap_or_default();
    let menu_entries = node.menu_entries.clone();
    let submenus = node.submenus.clone();

    let mut items: Vec<DisplayItem> = Vec::new();
    let mut show_empty: HashMap<MenuId, bool> = HashMap::new();

    for directive in &layout.order {
        match directive {
            LayoutItem::Separator => {
                items.push(DisplayItem::Separator { shown: true });
            }
            LayoutItem::Filename(desktop_file_id) => {
                if let Some(&entry) = menu_entries
                    .iter()
                    .find(|&&e| ctx.catalog.entry(e).desktop_file_id == *desktop_file_id)
                {
                    items.push(entry_item(entry));
                }
            }
            LayoutItem::Menuname { name, overrides } => {
                if let Some(sub) = tree.find_child(id, name) {
                    inline_submenu(tree, ctx, sub, overrides, &mut items, &mut show_empty);
                }
            }
            LayoutItem::Merge(kind) => {
                let mut merged: Vec<(String, Mergeable)> = Vec::new();
                if matches!(kind, MergeKind::Files | MergeKind::All) {
                    merged.extend(
                        menu_entries
                            .iter()
                            .filter(|&&e| !layout.names_file(&ctx.catalog.entry(e).desktop_file_id))
                            .map(|&e| (ctx.catalog.entry(e).record.name().to_string(), Mergeable::Entry(e))),
                    );
                }
                if matches!(kind, MergeKind::Menus | MergeKind::All) {
                    merged.extend(
                        submenus
                            .iter()
                            .filter(|&&s| !layout.names_menu(&tree.node(s).name))
                            .map(|&s| (menu_name(tree, ctx.catalog, s), Mergeable::Menu(s))),
                    );
                }
                merged.sort_by(|a, b| collate(&a.0, &b.0));
                for (_, item) in merged {
                    match item {
                        Mergeable::Entry(e) => items.push(entry_item(e)),
                        Mergeable::Menu(s) => inline_submenu(
                            tree,
                            ctx,
                            s,
                            &InlineOverrides::default(),
                            &mut items,
                            &mut show_empty,
                        ),
                    }
                }
            }
        }
    }

    let mut visible = 0usize;
    for item in &mut items {
        match item {
            DisplayItem::Submenu { id: sub, .. } => {
                let show = submenu_show(tree, ctx.catalog, *sub);
                tree.node_mut(*sub).show = show;
                if show.is_shown() {
                    visible += 1;
                }
            }
            DisplayItem::Entry { id: entry, show, .. } => {
                *show = entry_show(ctx, *entry);
                if show.is_shown() {
                    visible += 1;
                }
            }
            DisplayItem::Separator { .. } | DisplayItem::Header(_) => {}
        }
    }

    let mut dropped: Vec<MenuId> = Vec::new();
    for item in &items {
        let DisplayItem::Submenu { id: sub, .. } = item else {
            continue;
        };
        let node = tree.node(*sub);
        let keeps_empty = show_empty.get(sub).copied().unwrap_or(false);
        if node.visible > 0 || keeps_empty {
            continue;
        }
        let (was_shown, not_in_xml) = (node.show.is_shown(), node.not_in_xml);
        if was_shown {
            tree.node_mut(*sub).show = Show::Empty;
            visible = visible.saturating_sub(1);
        }
        if not_in_xml {
            dropped.push(*sub);
        }
    }
    items.retain(|item| !matches!(item, DisplayItem::Submenu { id, .. } if dropped.contains(id)));

    collapse_separators(tree, &mut items);

    let node = tree.node_mut(id);
    node.entries = items;
    node.visible = visible;
}

fn entry_item(id: EntryId) -> DisplayItem {
    DisplayItem::Entry {
        id,
        show: Show::Shown,
        alias: None,
    }
}

/// Append `sub` to `items`, spliced in when its inline options say so.
fn inline_submenu(
    tree: &MenuTree,
    ctx: &SortContext<'_>,
    sub: MenuId,
    overrides: &InlineOverrides,
    items: &mut Vec<DisplayItem>,
    show_empty: &mut HashMap<MenuId, bool>,
) {
    let node = tree.node(sub);
    let options = node
        .layout
        .as_ref()
        .map(|l| l.options)
        .unwrap_or_default()
        .with(overrides);
    show_empty.insert(sub, options.show_empty);

    let nested = DisplayItem::Submenu {
        id: sub,
        alias: None,
    };
    if !options.inline || !submenu_show(tree, ctx.catalog, sub).is_shown() {
        items.push(nested);
        return;
    }

    let children = &node.entries;
    if children.len() == 1 && options.inline_alias {
        let header = menu_header(tree, ctx.catalog, sub);
        let aliased = match children.first().cloned() {
            Some(DisplayItem::Entry { id, show, .. }) => DisplayItem::Entry {
                id,
                show,
                alias: Some(header),
            },
            Some(DisplayItem::Submenu { id, .. }) => DisplayItem::Submenu {
                id,
                alias: Some(header),
            },
            Some(other) => other,
            None => return,
        };
        items.push(aliased);
    } else if options.inline_limit == 0 || children.len() <= options.inline_limit {
        if options.inline_header {
            items.push(DisplayItem::Header(menu_header(tree, ctx.catalog, sub)));
        }
        items.extend(children.iter().cloned());
    } else {
        items.push(nested);
    }
}

fn submenu_show(tree: &MenuTree, catalog: &EntryCatalog, id: MenuId) -> Show {
    let node = tree.node(id);
    if node.is_deleted() {
        return Show::Deleted;
    }
    match node.directory.map(|d| &catalog.entry(d).record) {
        Some(record) if record.no_display() => Show::NoDisplay,
        Some(record) if record.hidden() => Show::Hidden,
        _ => Show::Shown,
    }
}

fn entry_show(ctx: &SortContext<'_>, id: EntryId) -> Show {
    let record = &ctx.catalog.entry(id).record;
    if record.no_display() {
        Show::NoDisplay
    } else if record.hidden() {
        Show::Hidden
    } else if record
        .try_exec()
        .is_some_and(|program| !ctx.exec.is_executable(program))
    {
        Show::NoExec
    } else if !shown_in(&record.only_show_in(), &record.not_show_in(), ctx.desktops) {
        Show::NotShowIn
    } else {
        Show::Shown
    }
}

/// Show a separator only between two visible items, once per gap.
fn collapse_separators(tree: &MenuTree, items: &mut [DisplayItem]) {
    let mut seen_visible = false;
    let mut pending: Option<usize> = None;
    for index in 0..items.len() {
        let Some(item) = items.get_mut(index) else {
            continue;
        };
        if let DisplayItem::Separator { shown } = item {
            *shown = false;
            if seen_visible && pending.is_none() {
                pending = Some(index);
            }
        } else if item.is_shown(tree) {
            if let Some(DisplayItem::Separator { shown }) = pending.take().and_then(|p| items.get_mut(p)) {
                *shown = true;
            }
            seen_visible = true;
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::MockExecutableLookup;
    use crate::menu::catalog::tests::catalog_with;
    use crate::menu::layout::{InlineOptions, Layout};
    use crate::menu::tree::MenuNode;

    struct Fixture {
        tree: MenuTree,
        catalog: EntryCatalog,
        entries: Vec<EntryId>,
        exec: MockExecutableLookup,
    }

    impl Fixture {
        fn new(entries: &[(&str, &str)]) -> Self {
            let (catalog, ids) = catalog_with(entries);
            let mut exec = MockExecutableLookup::new();
            exec.expect_is_executable().return_const(true);
            Self {
                tree: MenuTree::new(MenuNode::named("Applications")),
                catalog,
                entries: ids,
                exec,
            }
        }

        fn submenu(&mut self, parent: MenuId, name: &str) -> MenuId {
            let id = self.tree.alloc(MenuNode::named(name));
            self.tree.add_submenu(parent, id)
        }

        fn sort(&mut self) {
            let ctx = SortContext {
                catalog: &self.catalog,
                desktops: &[],
                exec: &self.exec,
            };
            sort(&mut self.tree, &ctx);
        }

        fn labels(&self, id: MenuId) -> Vec<String> {
            self.tree
                .node(id)
                .entries
                .iter()
                .map(|item| match item {
                    DisplayItem::Submenu { id, .. } => format!("menu:{}", self.tree.node(*id).name),
                    DisplayItem::Entry { id, show, .. } => {
                        format!("{}:{show}", self.catalog.entry(*id).desktop_file_id)
                    }
                    DisplayItem::Separator { shown } => format!("sep:{shown}"),
                    DisplayItem::Header(h) => format!("header:{}", h.name),
                })
                .collect()
        }
    }

    fn layout(order: Vec<LayoutItem>) -> Option<Layout> {
        Some(Layout {
            order,
            options: InlineOptions::default(),
        })
    }

    #[test]
    fn default_layout_puts_menus_before_sorted_files() {
        let mut f = Fixture::new(&[("zeta.desktop", ""), ("Alpha.desktop", ""), ("beta.desktop", "")]);
        let root = f.tree.root();
        f.tree.node_mut(root).menu_entries = f.entries.clone();
        let games = f.submenu(root, "Games");
        f.tree.node_mut(games).menu_entries = vec![f.entries[0]];
        f.sort();
        assert_eq!(
            f.labels(root),
            ["menu:Games", "Alpha.desktop:shown", "beta.desktop:shown", "zeta.desktop:shown"]
        );
        assert_eq!(f.tree.node(root).visible, 4);
    }

    #[test]
    fn separators_collapse_and_trim() {
        let mut f = Fixture::new(&[("a.desktop", ""), ("b.desktop", "")]);
        let root = f.tree.root();
        f.tree.node_mut(root).menu_entries = f.entries.clone();
        f.tree.node_mut(root).layout = layout(vec![
            LayoutItem::Separator,
            LayoutItem::Filename("a.desktop".into()),
            LayoutItem::Separator,
            LayoutItem::Separator,
            LayoutItem::Filename("b.desktop".into()),
            LayoutItem::Separator,
        ]);
        f.sort();
        assert_eq!(
            f.labels(root),
            ["sep:false", "a.desktop:shown", "sep:true", "sep:false", "b.desktop:shown", "sep:false"]
        );
        assert_eq!(f.tree.node(root).visible, 2);
    }

    #[test]
    fn separator_next_to_hidden_item_is_hidden() {
        let mut f = Fixture::new(&[("a.desktop", ""), ("b.desktop", "")]);
        f.catalog.entry_mut(f.entries[1]).record.set("NoDisplay", "true");
        let root = f.tree.root();
        f.tree.node_mut(root).menu_entries = f.entries.clone();
        f.tree.node_mut(root).layout = layout(vec![
            LayoutItem::Filename("a.desktop".into()),
            LayoutItem::Separator,
            LayoutItem::Filename("b.desktop".into()),
        ]);
        f.sort();
        assert_eq!(f.labels(root), ["a.desktop:shown", "sep:false", "b.desktop:nodisplay"]);
    }

    #[test]
    fn explicit_items_are_not_merged_twice() {
        let mut f = Fixture::new(&[("a.desktop", ""), ("b.desktop", "")]);
        let root = f.tree.root();
        f.tree.node_mut(root).menu_entries = f.entries.clone();
        let games = f.submenu(root, "Games");
        f.tree.node_mut(games).menu_entries = vec![f.entries[0]];
        let office = f.submenu(root, "Office");
        f.tree.node_mut(office).menu_entries = vec![f.entries[0]];
        f.tree.node_mut(root).layout = layout(vec![
            LayoutItem::Filename("b.desktop".into()),
            LayoutItem::Menuname {
                name: "Office".into(),
                overrides: InlineOverrides::default(),
            },
            LayoutItem::Merge(MergeKind::All),
        ]);
        f.sort();
        assert_eq!(
            f.labels(root),
            ["b.desktop:shown", "menu:Office", "a.desktop:shown", "menu:Games"]
        );
    }

    #[test]
    fn visibility_reasons() {
        let mut f = Fixture::new(&[
            ("hidden.desktop", ""),
            ("kde.desktop", ""),
            ("missing.desktop", ""),
        ]);
        f.catalog.entry_mut(f.entries[0]).record.set("Hidden", "true");
        f.catalog.entry_mut(f.entries[1]).record.set("OnlyShowIn", "KDE;");
        f.catalog.entry_mut(f.entries[2]).record.set("TryExec", "nope");
        let mut exec = MockExecutableLookup::new();
        exec.expect_is_executable()
            .withf(|p| p == "nope")
            .return_const(false);
        f.exec = exec;

        let root = f.tree.root();
        f.tree.node_mut(root).menu_entries = f.entries.clone();
        let desktops = vec!["GNOME".to_string()];
        let ctx = SortContext {
            catalog: &f.catalog,
            desktops: &desktops,
            exec: &f.exec,
        };
        sort(&mut f.tree, &ctx);
        assert_eq!(
            f.labels(root),
            ["hidden.desktop:hidden", "kde.desktop:notshowin", "missing.desktop:noexec"]
        );
        assert_eq!(f.tree.node(root).visible, 0);
    }

    #[test]
    fn empty_menus_are_hidden_or_dropped() {
        let mut f = Fixture::new(&[]);
        let root = f.tree.root();
        let declared = f.submenu(root, "Declared");
        let synthesized = f.submenu(root, "Synthesized");
        f.tree.node_mut(synthesized).not_in_xml = true;
        f.sort();
        assert_eq!(f.labels(root), ["menu:Declared"]);
        assert_eq!(f.tree.node(declared).show, Show::Empty);
        assert_eq!(f.tree.node(root).visible, 0);
    }

    #[test]
    fn show_empty_keeps_menu_visible() {
        let mut f = Fixture::new(&[]);
        let root = f.tree.root();
        let kept = f.submenu(root, "Kept");
        f.tree.node_mut(kept).layout = Some(Layout {
            options: InlineOptions {
                show_empty: true,
                ..InlineOptions::default()
            },
            ..Layout::default()
        });
        f.sort();
        assert_eq!(f.tree.node(kept).show, Show::Shown);
        assert_eq!(f.tree.node(root).visible, 1);
    }

    #[test]
    fn deleted_menu_is_hidden() {
        let mut f = Fixture::new(&[("a.desktop", "")]);
        let root = f.tree.root();
        let gone = f.submenu(root, "Gone");
        f.tree.node_mut(gone).deleted = Some(true);
        f.tree.node_mut(gone).menu_entries = f.entries.clone();
        f.sort();
        assert_eq!(f.tree.node(gone).show, Show::Deleted);
        assert_eq!(f.tree.node(root).visible, 0);
    }

    #[test]
    fn inline_with_header_under_limit() {
        let mut f = Fixture::new(&[("a.desktop", ""), ("b.desktop", "")]);
        let root = f.tree.root();
        let tools = f.submenu(root, "Tools");
        f.tree.node_mut(tools).menu_entries = f.entries.clone();
        f.tree.node_mut(tools).layout = Some(Layout {
            options: InlineOptions {
                inline: true,
                ..InlineOptions::default()
            },
            ..Layout::default()
        });
        f.sort();
        assert_eq!(
            f.labels(root),
            ["header:Tools", "a.desktop:shown", "b.desktop:shown"]
        );
    }

    #[test]
    fn hidden_menu_is_not_inlined() {
        let mut f = Fixture::new(&[("a.desktop", "")]);
        let root = f.tree.root();
        let gone = f.submenu(root, "Gone");
        f.tree.node_mut(gone).deleted = Some(true);
        f.tree.node_mut(gone).menu_entries = f.entries.clone();
        f.tree.node_mut(gone).layout = Some(Layout {
            options: InlineOptions {
                inline: true,
                ..InlineOptions::default()
            },
            ..Layout::default()
        });
        f.sort();
        assert_eq!(f.labels(root), ["menu:Gone"]);
        assert_eq!(f.tree.node(gone).show, Show::Deleted);
        assert_eq!(f.tree.node(root).visible, 0);
    }

    #[test]
    fn inline_over_limit_stays_nested() {
        let mut f = Fixture::new(&[("a.desktop", ""), ("b.desktop", ""), ("c.desktop", "")]);
        let root = f.tree.root();
        let tools = f.submenu(root, "Tools");
        f.tree.node_mut(tools).menu_entries = f.entries.clone();
        f.tree.node_mut(tools).layout = Some(Layout {
            options: InlineOptions {
                inline: true,
                inline_limit: 2,
                ..InlineOptions::default()
            },
            ..Layout::default()
        });
        f.sort();
        assert_eq!(f.labels(root), ["menu:Tools"]);
    }

    #[test]
    fn inline_alias_renames_single_child() {
        let mut f = Fixture::new(&[("a.desktop", "")]);
        let root = f.tree.root();
        let wrap = f.submenu(root, "Wrapper");
        f.tree.node_mut(wrap).menu_entries = f.entries.clone();
        f.tree.node_mut(root).layout = layout(vec![LayoutItem::Menuname {
            name: "Wrapper".into(),
            overrides: InlineOverrides {
                inline: Some(true),
                inline_alias: Some(true),
                ..InlineOverrides::default()
            },
        }]);
        f.sort();
        let items = &f.tree.node(root).entries;
        assert_eq!(items.len(), 1);
        assert!(
            matches!(&items[0], DisplayItem::Entry { alias: Some(h), .. } if h.name == "Wrapper"),
            "aliased entry expected, got {items:?}"
        );
    }

    #[test]
    fn sort_is_idempotent() {
        let mut f = Fixture::new(&[("a.desktop", ""), ("b.desktop", "")]);
        let root = f.tree.root();
        f.tree.node_mut(root).menu_entries = f.entries.clone();
        let sub = f.submenu(root, "Sub");
        f.tree.node_mut(sub).menu_entries = vec![f.entries[1]];
        f.sort();
        let first = (f.tree.node(root).entries.clone(), f.tree.node(root).visible);
        f.sort();
        assert_eq!((f.tree.node(root).entries.clone(), f.tree.node(root).visible), first);
    }

    #[test]
    fn collation_ignores_case() {
        assert_eq!(collate("apple", "Banana"), Ordering::Less);
        assert_eq!(collate("B", "b"), Ordering::Less);
        assert_eq!(collate("x", "x"), Ordering::Equal);
    }
}
