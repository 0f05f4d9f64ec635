//! Arena-backed menu tree.
//!
//! Nodes are addressed by [`MenuId`]. A node owns the ordered ids of its
//! submenus and keeps a plain back-reference to its parent for path
//! building. Slots are never reused: a node merged away or moved is simply
//! no longer reachable from the root.

use std::path::PathBuf;

use super::catalog::EntryId;
use super::layout::Layout;
use super::rule::Rule;
use super::sort::{DisplayItem, Show};

/// Handle to a node in a [`MenuTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuId(usize);

/// `<Move>` directive: both paths are relative to the owning node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOp {
    /// Path of the submenu to move.
    pub old: String,
    /// Destination path.
    pub new: String,
}

/// One menu of the tree.
#[derive(Debug, Clone, Default)]
pub struct MenuNode {
    /// `<Name>`.
    pub name: String,
    /// Resolved `.directory` record.
    pub directory: Option<EntryId>,
    /// Declared `.directory` file names.
    pub directories: Vec<String>,
    /// Application search directories.
    pub app_dirs: Vec<PathBuf>,
    /// `.directory` search directories.
    pub directory_dirs: Vec<PathBuf>,
    /// Include/exclude rules in document order.
    pub rules: Vec<Rule>,
    /// `<Layout>`, resolved by postparse.
    pub layout: Option<Layout>,
    /// `<DefaultLayout>`, resolved by postparse.
    pub default_layout: Option<Layout>,
    /// Pending `<Move>` directives.
    pub moves: Vec<MoveOp>,
    /// `<Deleted>` / `<NotDeleted>`, `None` until set.
    pub deleted: Option<bool>,
    /// `<OnlyUnallocated>` / `<NotOnlyUnallocated>`, `None` until set.
    pub only_unallocated: Option<bool>,
    /// Distance from the root.
    pub depth: usize,
    /// Parent node, `None` for the root and detached nodes.
    pub parent: Option<MenuId>,
    /// Created for structure (moves, legacy import) rather than declared.
    pub not_in_xml: bool,
    /// Child menus in order.
    pub submenus: Vec<MenuId>,
    /// Entries allocated to this menu.
    pub menu_entries: Vec<EntryId>,
    /// Display list built by sorting.
    pub entries: Vec<DisplayItem>,
    /// Visibility as computed by the parent's sort.
    pub show: Show,
    /// Number of visible items in `entries`.
    pub visible: usize,
}

impl MenuNode {
    /// Create a node named `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Effective `Deleted` flag.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    /// Effective `OnlyUnallocated` flag.
    #[must_use]
    pub fn is_only_unallocated(&self) -> bool {
        self.only_unallocated.unwrap_or(false)
    }
}

/// Arena of menu nodes with a single root.
#[derive(Debug, Clone)]
pub struct MenuTree {
    nodes: Vec<MenuNode>,
    root: MenuId,
}

impl Default for MenuTree {
    fn default() -> Self {
        Self::new(MenuNode::default())
    }
}

impl MenuTree {
    /// Create a tree whose root is `root`.
    #[must_use]
    pub fn new(root: MenuNode) -> Self {
        Self {
            nodes: vec![root],
            root: MenuId(0),
        }
    }

    /// The root node's id.
    #[must_use]
    pub const fn root(&self) -> MenuId {
        self.root
    }

    /// Look up a node.
    ///
    /// Ids are only created by this tree, so they are always in range.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn node(&self, id: MenuId) -> &MenuNode {
        &self.nodes[id.0]
    }

    /// Mutable node access.
    #[allow(clippy::indexing_slicing)]
    pub fn node_mut(&mut self, id: MenuId) -> &mut MenuNode {
        &mut self.nodes[id.0]
    }

    /// Add a node to the arena without attaching it anywhere.
    pub fn alloc(&mut self, node: MenuNode) -> MenuId {
        self.nodes.push(node);
        MenuId(self.nodes.len() - 1)
    }

    /// Attach `child` under `parent`.
    ///
    /// When `parent` already has a submenu with the same name, `child` is
    /// merged into it instead. Returns the node that now holds the content.
    pub fn add_submenu(&mut self, parent: MenuId, child: MenuId) -> MenuId {
        let name = self.node(child).name.clone();
        if let Some(existing) = self.find_child(parent, &name)
            && existing != child
        {
            self.merge_into(existing, child);
            return existing;
        }
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).submenus.push(child);
        self.set_depth(child, self.node(parent).depth + 1);
        child
    }

    /// Fold `source` into `target`.
    ///
    /// Lists are appended, flags and layouts override when `source` sets
    /// them, and submenus are added with same-name merging. `source` keeps
    /// its name but ends up empty and detached.
    pub fn merge_into(&mut self, target: MenuId, source: MenuId) {
        if target == source {
            return;
        }
        let src = std::mem::take(self.node_mut(source));
        self.node_mut(source).name.clone_from(&src.name);
        if let Some(old_parent) = src.parent {
            self.node_mut(old_parent).submenus.retain(|&s| s != source);
        }

        let dst = self.node_mut(target);
        dst.app_dirs.extend(src.app_dirs);
        dst.directory_dirs.extend(src.directory_dirs);
        dst.directories.extend(src.directories);
        dst.rules.extend(src.rules);
        dst.moves.extend(src.moves);
        dst.not_in_xml = dst.not_in_xml && src.not_in_xml;
        if src.deleted.is_some() {
            dst.deleted = src.deleted;
        }
        if src.only_unallocated.is_some() {
            dst.only_unallocated = src.only_unallocated;
        }
        if src.layout.is_some() {
            dst.layout = src.layout;
        }
        if src.default_layout.is_some() {
            dst.default_layout = src.default_layout;
        }

        for sub in src.submenus {
            self.node_mut(sub).parent = None;
            self.add_submenu(target, sub);
        }
    }

    /// Remove `id` from its parent's submenus.
    pub fn detach(&mut self, id: MenuId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).submenus.retain(|&s| s != id);
        }
    }

    fn set_depth(&mut self, id: MenuId, depth: usize) {
        self.node_mut(id).depth = depth;
        for sub in self.node(id).submenus.clone() {
            self.set_depth(sub, depth + 1);
        }
    }

    /// Direct child of `parent` named `name`.
    #[must_use]
    pub fn find_child(&self, parent: MenuId, name: &str) -> Option<MenuId> {
        self.node(parent)
            .submenus
            .iter()
            .copied()
            .find(|&s| self.node(s).name == name)
    }

    /// Descendant of `from` at the slash-delimited relative `path`.
    #[must_use]
    pub fn find_path(&self, from: MenuId, path: &str) -> Option<MenuId> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(from, |node, segment| self.find_child(node, segment))
    }

    /// Names from the root down to `id`, root included.
    #[must_use]
    pub fn path(&self, id: MenuId) -> String {
        let mut names = vec![self.node(id).name.as_str()];
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            names.push(self.node(parent).name.as_str());
            current = self.node(parent).parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Path of `id` below the root, root name excluded.
    #[must_use]
    pub fn relative_path(&self, id: MenuId) -> String {
        let full = self.path(id);
        let root = &self.node(self.root).name;
        full.strip_prefix(root.as_str())
            .map_or(full.as_str(), |rest| rest.trim_start_matches('/'))
            .to_string()
    }

    /// Reachable nodes, children before parents.
    #[must_use]
    pub fn post_order(&self) -> Vec<MenuId> {
        let mut out = Vec::new();
        self.collect_post_order(self.root, &mut out);
        out
    }

    fn collect_post_order(&self, id: MenuId, out: &mut Vec<MenuId>) {
        for &sub in &self.node(id).submenus {
            self.collect_post_order(sub, out);
        }
        out.push(id);
    }

    /// Reachable nodes, parents before children.
    #[must_use]
    pub fn pre_order(&self) -> Vec<MenuId> {
        let mut out = self.post_order();
        out.reverse();
        out
    }
}
