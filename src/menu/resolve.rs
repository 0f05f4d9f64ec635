//! Resolution passes over a parsed tree: moves, inheritance and allocation.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;

use super::catalog::{EntryCatalog, Origin};
use super::rule::{self, Pass};
use super::tree::{MenuId, MenuNode, MenuTree, MoveOp};

/// Remove duplicates, keeping the last occurrence of each item.
///
/// `[/a, /b, /a, /c]` becomes `[/b, /a, /c]`.
pub fn dedup_keep_last<T: Eq + Hash + Clone>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = items
        .drain(..)
        .rev()
        .filter(|item| seen.insert(item.clone()))
        .collect();
    kept.reverse();
    *items = kept;
}

/// Run every node's `<Move>` operations, children before parents.
pub fn apply_moves(tree: &mut MenuTree) {
    for id in tree.post_order() {
        let moves = std::mem::take(&mut tree.node_mut(id).moves);
        for op in &moves {
            apply_move(tree, id, op);
        }
    }
}

fn apply_move(tree: &mut MenuTree, at: MenuId, op: &MoveOp) {
    let Some(source) = tree.find_path(at, &op.old) else {
        tracing::debug!(menu = %tree.path(at), "move source '{}' not found", op.old);
        return;
    };

    let segments: Vec<&str> = op.new.split('/').filter(|s| !s.is_empty()).collect();
    let mut dest = at;
    let mut existing = 0;
    for segment in &segments {
        match tree.find_child(dest, segment) {
            Some(child) => {
                dest = child;
                existing += 1;
            }
            None => break,
        }
    }

    if is_ancestor_or_self(tree, source, dest) {
        tracing::debug!(menu = %tree.path(at), "cannot move '{}' into '{}'", op.old, op.new);
        return;
    }

    for (i, segment) in segments.iter().enumerate().skip(existing) {
        let mut node = MenuNode::named(*segment);
        node.not_in_xml = i + 1 < segments.len();
        let created = tree.alloc(node);
        dest = tree.add_submenu(dest, created);
    }
    tree.merge_into(dest, source);
}

fn is_ancestor_or_self(tree: &MenuTree, ancestor: MenuId, mut id: MenuId) -> bool {
    loop {
        if id == ancestor {
            return true;
        }
        match tree.node(id).parent {
            Some(parent) => id = parent,
            None => return false,
        }
    }
}

/// Settle inherited state top-down and pick each node's display directory.
///
/// Unset flags become `false`, layouts fall back to the parent's default
/// layout, directory lists gain the parent's entries in front and lose
/// duplicates. After a node's children are done its lists are reversed so
/// the most specific item comes first.
pub fn postparse(tree: &mut MenuTree, catalog: &mut EntryCatalog) {
    let root = tree.root();
    postparse_node(tree, catalog, root);
}

fn postparse_node(tree: &mut MenuTree, catalog: &mut EntryCatalog, id: MenuId) {
    let inherited = tree.node(id).parent.map(|p| {
        let parent = tree.node(p);
        (
            parent.default_layout.clone().unwrap_or_default(),
            parent.app_dirs.clone(),
            parent.directory_dirs.clone(),
        )
    });

    let node = tree.node_mut(id);
    node.deleted.get_or_insert(false);
    node.only_unallocated.get_or_insert(false);

    let inherited_layout = inherited
        .as_ref()
        .map(|(layout, _, _)| layout.clone())
        .unwrap_or_default();
    match (node.layout.is_some(), node.default_layout.is_some()) {
        (true, true) => {}
        (false, true) => node.layout.clone_from(&node.default_layout),
        (true, false) => node.default_layout = Some(inherited_layout),
        (false, false) => {
            node.layout = Some(inherited_layout.clone());
            node.default_layout = Some(inherited_layout);
        }
    }

    if let Some((_, app_dirs, directory_dirs)) = inherited {
        node.app_dirs.splice(0..0, app_dirs);
        node.directory_dirs.splice(0..0, directory_dirs);
    }
    dedup_keep_last(&mut node.directories);
    dedup_keep_last(&mut node.directory_dirs);
    dedup_keep_last(&mut node.app_dirs);

    for sub in node.submenus.clone() {
        postparse_node(tree, catalog, sub);
    }

    let node = tree.node_mut(id);
    node.directories.reverse();
    node.directory_dirs.reverse();
    node.app_dirs.reverse();

    let directories = node.directories.clone();
    let directory_dirs = node.directory_dirs.clone();
    let mut chosen = None;
    for name in &directories {
        for dir in &directory_dirs {
            if !dir.join(name).is_file() {
                continue;
            }
            let Some(found) = catalog.load_record(dir, Path::new(name)) else {
                continue;
            };
            match chosen {
                None => chosen = Some(found),
                Some(winner) => {
                    if catalog.origin(found) == Origin::System
                        && catalog.origin(winner) == Origin::User
                    {
                        catalog.entry_mut(winner).original = Some(found);
                    }
                }
            }
        }
        if chosen.is_some() {
            break;
        }
    }
    tree.node_mut(id).directory = chosen;
}

/// Allocate catalog entries to the nodes taking part in `pass`.
///
/// Nodes are visited children first. The first pass covers ordinary menus,
/// the second covers `<OnlyUnallocated>` ones. Every entry a node claims is
/// marked allocated.
pub fn allocate(tree: &mut MenuTree, catalog: &mut EntryCatalog, pass: Pass) {
    let mut claimed = 0;
    for id in tree.post_order() {
        let node = tree.node(id);
        if node.is_only_unallocated() != (pass == Pass::Second) || node.rules.is_empty() {
            continue;
        }
        let app_dirs = node.app_dirs.clone();
        let rules = node.rules.clone();

        catalog.scan(&app_dirs);
        let candidates = catalog.lookup(&app_dirs, true);
        let picked = rule::apply(&rules, catalog, &candidates, pass);
        for &entry_id in &picked {
            let entry = catalog.entry_mut(entry_id);
            entry.parents.push(id);
            entry.allocated = true;
        }
        claimed += picked.len();
        tree.node_mut(id).menu_entries.extend(picked);
    }
    tracing::debug!("allocation {pass:?}: {claimed} entries placed");
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::menu::layout::{Layout, LayoutItem, MergeKind};
    use crate::menu::rule::{Rule, RuleExpr, RuleKind};
    use crate::platform::{BaseDirs, Platform};

    fn child(tree: &mut MenuTree, parent: MenuId, name: &str) -> MenuId {
        let id = tree.alloc(MenuNode::named(name));
        tree.add_submenu(parent, id)
    }

    fn names(tree: &MenuTree, id: MenuId) -> Vec<String> {
        tree.node(id)
            .submenus
            .iter()
            .map(|&s| tree.node(s).name.clone())
            .collect()
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    fn app(dir: &Path, file: &str, name: &str, categories: &str) {
        write(
            &dir.join(file),
            &format!("[Desktop Entry]\nType=Application\nName={name}\nCategories={categories}\n"),
        );
    }

    fn ids(tree: &MenuTree, catalog: &EntryCatalog, id: MenuId) -> Vec<String> {
        tree.node(id)
            .menu_entries
            .iter()
            .map(|&e| catalog.entry(e).desktop_file_id.clone())
            .collect()
    }

    fn include(expr: RuleExpr) -> Rule {
        Rule {
            kind: RuleKind::Include,
            expr: RuleExpr::Or(vec![expr]),
        }
    }

    // -----------------------------------------------------------------------
    // dedup_keep_last
    // -----------------------------------------------------------------------

    #[test]
    fn dedup_keeps_last_occurrence() {
        let mut dirs: Vec<PathBuf> = ["/a", "/b", "/a", "/c"].iter().map(PathBuf::from).collect();
        dedup_keep_last(&mut dirs);
        assert_eq!(dirs, [PathBuf::from("/b"), PathBuf::from("/a"), PathBuf::from("/c")]);
    }

    #[test]
    fn dedup_without_duplicates_is_identity() {
        let mut items = vec![3, 1, 2];
        dedup_keep_last(&mut items);
        assert_eq!(items, [3, 1, 2]);
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    #[test]
    fn move_merges_into_existing_destination() {
        let mut tree = MenuTree::default();
        let root = tree.root();
        let a = child(&mut tree, root, "A");
        tree.node_mut(a).rules.push(Rule::include_filename("a.desktop"));
        let b = child(&mut tree, root, "B");
        tree.node_mut(root).moves.push(MoveOp {
            old: "A".into(),
            new: "B".into(),
        });

        apply_moves(&mut tree);
        assert_eq!(names(&tree, root), ["B"]);
        assert_eq!(tree.node(b).rules.len(), 1);
    }

    #[test]
    fn move_creates_intermediate_nodes() {
        let mut tree = MenuTree::default();
        let root = tree.root();
        let games = child(&mut tree, root, "Games");
        child(&mut tree, games, "Arcade");
        tree.node_mut(root).moves.push(MoveOp {
            old: "Games/Arcade".into(),
            new: "Fun/Retro".into(),
        });

        apply_moves(&mut tree);
        let fun = tree.find_child(root, "Fun").expect("Fun");
        assert!(tree.node(fun).not_in_xml);
        let retro = tree.find_path(root, "Fun/Retro").expect("Retro");
        assert!(!tree.node(retro).not_in_xml);
        assert_eq!(tree.node(retro).depth, 2);
        assert!(tree.node(games).submenus.is_empty());
    }

    #[test]
    fn missing_move_source_is_ignored() {
        let mut tree = MenuTree::default();
        let root = tree.root();
        child(&mut tree, root, "A");
        tree.node_mut(root).moves.push(MoveOp {
            old: "Nope".into(),
            new: "A".into(),
        });
        apply_moves(&mut tree);
        assert_eq!(names(&tree, root), ["A"]);
    }

    #[test]
    fn move_into_own_descendant_is_ignored() {
        let mut tree = MenuTree::default();
        let root = tree.root();
        let a = child(&mut tree, root, "A");
        tree.node_mut(root).moves.push(MoveOp {
            old: "A".into(),
            new: "A/B".into(),
        });
        apply_moves(&mut tree);
        assert_eq!(names(&tree, root), ["A"]);
        assert!(names(&tree, a).is_empty());
    }

    #[test]
    fn child_moves_run_before_parent_moves() {
        let mut tree = MenuTree::default();
        let root = tree.root();
        let outer = child(&mut tree, root, "Outer");
        child(&mut tree, outer, "X");
        tree.node_mut(outer).moves.push(MoveOp {
            old: "X".into(),
            new: "Y".into(),
        });
        tree.node_mut(root).moves.push(MoveOp {
            old: "Outer/Y".into(),
            new: "Z".into(),
        });
        apply_moves(&mut tree);
        assert_eq!(names(&tree, root), ["Outer", "Z"]);
        assert!(tree.node(outer).submenus.is_empty());
    }

    // -----------------------------------------------------------------------
    // Postparse
    // -----------------------------------------------------------------------

    fn empty_catalog() -> EntryCatalog {
        EntryCatalog::new(&Platform::new(BaseDirs::under(Path::new("/nonexistent")), Vec::new()))
    }

    #[test]
    fn unset_flags_become_false() {
        let mut tree = MenuTree::default();
        let mut catalog = empty_catalog();
        postparse(&mut tree, &mut catalog);
        let root = tree.node(tree.root());
        assert_eq!(root.deleted, Some(false));
        assert_eq!(root.only_unallocated, Some(false));
        assert_eq!(root.layout, Some(Layout::default()));
        assert_eq!(root.default_layout, Some(Layout::default()));
    }

    #[test]
    fn layouts_inherit_parent_default() {
        let custom = Layout {
            order: vec![LayoutItem::Merge(MergeKind::All)],
            ..Layout::default()
        };
        let own = Layout {
            order: vec![LayoutItem::Separator, LayoutItem::Merge(MergeKind::Files)],
            ..Layout::default()
        };
        let mut tree = MenuTree::default();
        let root = tree.root();
        tree.node_mut(root).default_layout = Some(custom.clone());
        let plain = child(&mut tree, root, "Plain");
        let with_layout = child(&mut tree, root, "WithLayout");
        tree.node_mut(with_layout).layout = Some(own.clone());
        let with_default = child(&mut tree, root, "WithDefault");
        tree.node_mut(with_default).default_layout = Some(own.clone());

        postparse(&mut tree, &mut empty_catalog());

        assert_eq!(tree.node(root).layout, Some(custom.clone()));
        assert_eq!(tree.node(plain).layout, Some(custom.clone()));
        assert_eq!(tree.node(plain).default_layout, Some(custom.clone()));
        assert_eq!(tree.node(with_layout).layout, Some(own.clone()));
        assert_eq!(tree.node(with_layout).default_layout, Some(custom));
        assert_eq!(tree.node(with_default).layout, Some(own));
    }

    #[test]
    fn dirs_are_inherited_deduplicated_and_reversed() {
        let mut tree = MenuTree::default();
        let root = tree.root();
        tree.node_mut(root).app_dirs = vec!["/p1".into(), "/p2".into()];
        let sub = child(&mut tree, root, "Sub");
        tree.node_mut(sub).app_dirs = vec!["/c1".into(), "/p1".into()];

        postparse(&mut tree, &mut empty_catalog());

        let paths = |v: &[&str]| v.iter().map(PathBuf::from).collect::<Vec<_>>();
        assert_eq!(tree.node(root).app_dirs, paths(&["/p2", "/p1"]));
        assert_eq!(tree.node(sub).app_dirs, paths(&["/p1", "/c1", "/p2"]));
    }

    #[test]
    fn directory_prefers_last_declared_name_and_dir() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        write(&first.join("a.directory"), "[Desktop Entry]\nName=First A\nType=Directory\n");
        write(&second.join("a.directory"), "[Desktop Entry]\nName=Second A\nType=Directory\n");
        write(&first.join("b.directory"), "[Desktop Entry]\nName=First B\nType=Directory\n");

        let mut tree = MenuTree::default();
        let root = tree.root();
        tree.node_mut(root).directory_dirs = vec![first, second];
        tree.node_mut(root).directories = vec!["b.directory".into(), "a.directory".into()];
        let mut catalog = empty_catalog();

        postparse(&mut tree, &mut catalog);
        let directory = tree.node(root).directory.expect("directory picked");
        assert_eq!(catalog.entry(directory).record.name(), "Second A");
    }

    #[test]
    fn user_directory_shadows_system_copy() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let platform = Platform::new(BaseDirs::under(tmp.path()), Vec::new());
        let system = tmp.path().join("sys/data/desktop-directories");
        let user = tmp.path().join("home/data/desktop-directories");
        write(&system.join("x.directory"), "[Desktop Entry]\nName=System\nType=Directory\n");
        write(&user.join("x.directory"), "[Desktop Entry]\nName=User\nType=Directory\n");

        let mut tree = MenuTree::default();
        let root = tree.root();
        tree.node_mut(root).directory_dirs = vec![system, user];
        tree.node_mut(root).directories = vec!["x.directory".into()];
        let mut catalog = EntryCatalog::new(&platform);

        postparse(&mut tree, &mut catalog);
        let directory = tree.node(root).directory.expect("directory picked");
        assert_eq!(catalog.entry(directory).record.name(), "User");
        assert_eq!(catalog.origin(directory), Origin::Both);
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    #[test]
    fn passes_allocate_monotonically() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let apps = tmp.path().join("apps");
        app(&apps, "tetris.desktop", "Tetris", "Game;");
        app(&apps, "editor.desktop", "Editor", "Utility;");
        app(&apps, "misc.desktop", "Misc", "");

        let mut tree = MenuTree::default();
        let root = tree.root();
        tree.node_mut(root).app_dirs = vec![apps];
        let games = child(&mut tree, root, "Games");
        tree.node_mut(games).rules.push(include(RuleExpr::Category("Game".into())));
        let other = child(&mut tree, root, "Other");
        tree.node_mut(other).only_unallocated = Some(true);
        tree.node_mut(other).rules.push(include(RuleExpr::All));
        let also_games = child(&mut tree, root, "AlsoGames");
        tree.node_mut(also_games).rules.push(include(RuleExpr::Category("Game".into())));

        let mut catalog = empty_catalog();
        postparse(&mut tree, &mut catalog);
        allocate(&mut tree, &mut catalog, Pass::First);

        assert_eq!(ids(&tree, &catalog, games), ["tetris.desktop"]);
        assert_eq!(ids(&tree, &catalog, also_games), ["tetris.desktop"]);
        assert!(ids(&tree, &catalog, other).is_empty());
        assert!(catalog.entry(tree.node(games).menu_entries[0]).is_allocated());

        allocate(&mut tree, &mut catalog, Pass::Second);
        let mut rest = ids(&tree, &catalog, other);
        rest.sort();
        assert_eq!(rest, ["editor.desktop", "misc.desktop"]);
        let tetris = tree.node(games).menu_entries[0];
        assert_eq!(catalog.entry(tetris).parents, vec![games, also_games]);
    }

    #[test]
    fn second_pass_menus_do_not_share_entries() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let apps = tmp.path().join("apps");
        app(&apps, "a.desktop", "A", "");

        let mut tree = MenuTree::default();
        let root = tree.root();
        tree.node_mut(root).app_dirs = vec![apps];
        let first = child(&mut tree, root, "First");
        let second = child(&mut tree, root, "Second");
        for id in [first, second] {
            tree.node_mut(id).only_unallocated = Some(true);
            tree.node_mut(id).rules.push(include(RuleExpr::All));
        }

        let mut catalog = empty_catalog();
        postparse(&mut tree, &mut catalog);
        allocate(&mut tree, &mut catalog, Pass::First);
        allocate(&mut tree, &mut catalog, Pass::Second);

        assert_eq!(tree.node(first).menu_entries.len(), 1);
        assert!(tree.node(second).menu_entries.is_empty());
    }

    #[test]
    fn node_without_rules_gets_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let apps = tmp.path().join("apps");
        app(&apps, "a.desktop", "A", "Game;");

        let mut tree = MenuTree::default();
        let root = tree.root();
        tree.node_mut(root).app_dirs = vec![apps];
        let mut catalog = empty_catalog();
        postparse(&mut tree, &mut catalog);
        allocate(&mut tree, &mut catalog, Pass::First);
        assert!(tree.node(root).menu_entries.is_empty());
    }
}
