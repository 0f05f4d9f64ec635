//! Reading menu definition documents into a [`MenuTree`].
//!
//! The parser only builds structure: directory lists, rules, layouts and
//! pending moves. Merge directives are followed recursively and folded into
//! the node that declared them. Legacy directories are the exception: they
//! are scanned here because the synthesized rules depend on what they hold.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::catalog::EntryCatalog;
use super::layout::Layout;
use super::rule::{Rule, RuleKind};
use super::tree::{MenuId, MenuNode, MenuTree, MoveOp};
use super::xml::Element;
use crate::error::ParseError;
use crate::platform::Platform;

/// Menu file looked up when none is given, after `XDG_MENU_PREFIX`.
const DEFAULT_MENU_FILE: &str = "applications.menu";

/// Category added to legacy entries outside the declaring menu's app dirs.
const LEGACY_CATEGORY: &str = "Legacy";

/// Options controlling how forgiving parsing is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Surface merge loops and unreadable merged documents as errors.
    pub strict: bool,
}

/// Find the definition document to parse.
///
/// Without a filename the default `applications.menu` (with the platform's
/// menu prefix) is used. Relative names are looked up in `menus/` below each
/// config directory, then relative to the working directory.
///
/// # Errors
///
/// Returns [`ParseError::NotMenuFile`] when the name does not end in
/// `.menu` and [`ParseError::NotFound`] when no such file exists.
pub fn locate(filename: Option<&Path>, platform: &Platform) -> Result<PathBuf, ParseError> {
    let name = filename.map_or_else(
        || PathBuf::from(format!("{}{DEFAULT_MENU_FILE}", platform.menu_prefix)),
        Path::to_path_buf,
    );
    if name.extension().is_none_or(|ext| ext != "menu") {
        return Err(ParseError::NotMenuFile(name));
    }

    if name.is_absolute() {
        return if name.is_file() {
            Ok(normalize(&name))
        } else {
            Err(ParseError::NotFound(name))
        };
    }

    platform
        .menu_config_dirs()
        .iter()
        .map(|dir| dir.join("menus").join(&name))
        .chain(std::iter::once(name.clone()))
        .find(|candidate| candidate.is_file())
        .map(|found| normalize(&found))
        .ok_or(ParseError::NotFound(name))
}

/// Parse the document at `path` and everything it merges.
///
/// Descriptors in legacy directories are added to `catalog`.
///
/// # Errors
///
/// Returns a [`ParseError`] when the document cannot be read, is not a
/// `<Menu>` document, or holds an empty mandatory element. In strict mode
/// merge loops and failed merges are errors too.
pub fn parse_document(
    path: &Path,
    platform: &Platform,
    options: ParseOptions,
    catalog: &mut EntryCatalog,
) -> Result<MenuTree, ParseError> {
    let path = normalize(path);
    let root_element = read_document(&path)?;
    if root_element.name != "Menu" {
        return Err(ParseError::NotAMenuDocument(path));
    }

    let mut ctx = ParseContext {
        platform,
        strict: options.strict,
        merged: HashSet::from([path.clone()]),
        legacy: HashSet::new(),
        merge_targets: HashMap::new(),
        catalog,
        tree: MenuTree::default(),
    };
    let root = ctx.tree.root();
    ctx.parse_children(&root_element, &path, root)?;
    Ok(ctx.tree)
}

/// Make `path` absolute and resolve `.` and `..` without touching the
/// filesystem.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn read_document(path: &Path) -> Result<Element, ParseError> {
    let content = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Element::parse_str(&content, path)
}

#[derive(Debug, Clone, Copy)]
enum Expect {
    Dir,
    File,
}

/// Resolve a path given in `file` and check that it exists.
fn resolve(value: &str, file: &Path, expect: Expect) -> Option<PathBuf> {
    let raw = Path::new(value);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        file.parent().unwrap_or_else(|| Path::new("/")).join(raw)
    };
    existing(&normalize(&joined), expect)
}

fn existing(path: &Path, expect: Expect) -> Option<PathBuf> {
    let found = match expect {
        Expect::Dir => path.is_dir(),
        Expect::File => path.is_file(),
    };
    if found {
        Some(path.to_path_buf())
    } else {
        tracing::debug!(file = %path.display(), "does not exist, skipping");
        None
    }
}

/// State shared by one parse: the tree under construction, the catalog for
/// legacy imports, and the visited sets that stop merge recursion.
struct ParseContext<'a> {
    platform: &'a Platform,
    strict: bool,
    merged: HashSet<PathBuf>,
    legacy: HashSet<PathBuf>,
    /// Scratch node of a merged document and the node it is folded into.
    merge_targets: HashMap<MenuId, MenuId>,
    catalog: &'a mut EntryCatalog,
    tree: MenuTree,
}

impl ParseContext<'_> {
    fn parse_children(&mut self, element: &Element, file: &Path, node: MenuId) -> Result<(), ParseError> {
        for child in &element.children {
            match child.name.as_str() {
                "Menu" => {
                    let sub = self.tree.alloc(MenuNode::default());
                    self.parse_children(child, file, sub)?;
                    self.tree.add_submenu(node, sub);
                }
                "Name" => self.tree.node_mut(node).name = child.required_text(file)?,
                "Directory" => {
                    let name = child.required_text(file)?;
                    self.tree.node_mut(node).directories.push(name);
                }
                "AppDir" => {
                    let value = child.required_text(file)?;
                    if let Some(dir) = resolve(&value, file, Expect::Dir) {
                        self.tree.node_mut(node).app_dirs.push(dir);
                    }
                }
                "DefaultAppDirs" => {
                    let dirs = self.default_data_dirs("applications");
                    self.tree.node_mut(node).app_dirs.extend(dirs);
                }
                "DirectoryDir" => {
                    let value = child.required_text(file)?;
                    if let Some(dir) = resolve(&value, file, Expect::Dir) {
                        self.tree.node_mut(node).directory_dirs.push(dir);
                    }
                }
                "DefaultDirectoryDirs" => {
                    let dirs = self.default_data_dirs("desktop-directories");
                    self.tree.node_mut(node).directory_dirs.extend(dirs);
                }
                "OnlyUnallocated" => self.tree.node_mut(node).only_unallocated = Some(true),
                "NotOnlyUnallocated" => self.tree.node_mut(node).only_unallocated = Some(false),
                "Deleted" => self.tree.node_mut(node).deleted = Some(true),
                "NotDeleted" => self.tree.node_mut(node).deleted = Some(false),
                "Include" => {
                    let rule = Rule::from_element(child, RuleKind::Include, file)?;
                    self.tree.node_mut(node).rules.push(rule);
                }
                "Exclude" => {
                    let rule = Rule::from_element(child, RuleKind::Exclude, file)?;
                    self.tree.node_mut(node).rules.push(rule);
                }
                "MergeFile" => {
                    if child.attribute("type") == Some("parent") {
                        self.merge_parent(file, node)?;
                    } else {
                        let value = child.required_text(file)?;
                        if let Some(path) = resolve(&value, file, Expect::File) {
                            self.merge_file(&path, node)?;
                        }
                    }
                }
                "MergeDir" => {
                    let value = child.required_text(file)?;
                    if let Some(dir) = resolve(&value, file, Expect::Dir) {
                        self.merge_dir(&dir, node)?;
                    }
                }
                "DefaultMergeDirs" => self.default_merge_dirs(file, node)?,
                "LegacyDir" => {
                    let value = child.required_text(file)?;
                    if let Some(dir) = resolve(&value, file, Expect::Dir) {
                        let prefix = child.attribute("prefix").unwrap_or_default();
                        if let Some(imported) = self.import_legacy(&dir, prefix, node) {
                            self.tree.merge_into(node, imported);
                        }
                    }
                }
                "KDELegacyDirs" => {
                    tracing::debug!(file = %file.display(), "ignoring <KDELegacyDirs>");
                }
                "Move" => {
                    if let Some(op) = parse_move(child, file)? {
                        self.tree.node_mut(node).moves.push(op);
                    }
                }
                "Layout" if !child.children.is_empty() => {
                    self.tree.node_mut(node).layout = Some(Layout::from_element(child, file)?);
                }
                "DefaultLayout" if !child.children.is_empty() => {
                    self.tree.node_mut(node).default_layout = Some(Layout::from_element(child, file)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// `<data dir>/<sub>` for every data dir, lowest precedence first.
    fn default_data_dirs(&self, sub: &str) -> Vec<PathBuf> {
        self.platform
            .dirs
            .data_search()
            .iter()
            .rev()
            .filter_map(|dir| existing(&normalize(&dir.join(sub)), Expect::Dir))
            .collect()
    }

    /// Merge another document into `node`.
    ///
    /// A document is merged at most once per parse. Read failures are
    /// skipped unless parsing strictly; errors inside a readable document
    /// always propagate.
    fn merge_file(&mut self, path: &Path, node: MenuId) -> Result<(), ParseError> {
        let path = normalize(path);
        if !self.merged.insert(path.clone()) {
            if self.strict {
                return Err(ParseError::MergeLoop(path));
            }
            tracing::debug!(file = %path.display(), "already merged, skipping");
            return Ok(());
        }

        let element = match read_document(&path) {
            Ok(element) => element,
            Err(source) if self.strict => {
                return Err(ParseError::MergeFailed {
                    path,
                    source: Box::new(source),
                });
            }
            Err(e) => {
                tracing::warn!("skipping merge: {e}");
                return Ok(());
            }
        };

        tracing::debug!(file = %path.display(), "merging");
        let scratch = self.tree.alloc(MenuNode::default());
        self.merge_targets.insert(scratch, node);
        self.parse_children(&element, &path, scratch)?;
        self.tree.merge_into(node, scratch);
        Ok(())
    }

    /// Merge the same relative path from the next lower-precedence config
    /// directory that has it.
    fn merge_parent(&mut self, file: &Path, node: MenuId) -> Result<(), ParseError> {
        let dirs: Vec<PathBuf> = self
            .platform
            .dirs
            .config_search()
            .iter()
            .map(|d| normalize(d))
            .collect();

        let Some((index, relative)) = dirs
            .iter()
            .enumerate()
            .find_map(|(i, dir)| file.strip_prefix(dir).ok().map(|rel| (i, rel.to_path_buf())))
        else {
            tracing::debug!(file = %file.display(), "not in a config directory, no parent to merge");
            return Ok(());
        };

        let parent = dirs
            .iter()
            .skip(index + 1)
            .map(|dir| dir.join(&relative))
            .find(|candidate| candidate.is_file());
        match parent {
            Some(parent) => self.merge_file(&parent, node),
            None => {
                tracing::debug!(file = %file.display(), "no parent document");
                Ok(())
            }
        }
    }

    /// Merge every `*.menu` file in `dir`, in file-name order.
    fn merge_dir(&mut self, dir: &Path, node: MenuId) -> Result<(), ParseError> {
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .map(walkdir::DirEntry::into_path)
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "menu"))
            .collect();
        for file in files {
            self.merge_file(&file, node)?;
        }
        Ok(())
    }

    /// Merge `<config dir>/menus/<stem>-merged/` for every config dir,
    /// lowest precedence first.
    fn default_merge_dirs(&mut self, file: &Path, node: MenuId) -> Result<(), ParseError> {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dirs = self.platform.dirs.config_search();
        for dir in dirs.iter().rev() {
            let merged = normalize(&dir.join("menus").join(format!("{stem}-merged")));
            if merged.is_dir() {
                self.merge_dir(&merged, node)?;
            }
        }
        Ok(())
    }

    /// Build a synthesized node for a legacy directory and its
    /// sub-directories.
    ///
    /// `owner` is the node that declared `<LegacyDir>`; descriptors outside
    /// its app dirs get the `Legacy` category. Returns `None` when the
    /// directory was already imported.
    fn import_legacy(&mut self, dir: &Path, prefix: &str, owner: MenuId) -> Option<MenuId> {
        if !self.legacy.insert(dir.to_path_buf()) {
            tracing::debug!(file = %dir.display(), "legacy dir already imported");
            return None;
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut node = MenuNode::named(name);
        node.app_dirs.push(dir.to_path_buf());
        node.directory_dirs.push(dir.to_path_buf());
        node.not_in_xml = true;
        let id = self.tree.alloc(node);

        let children: Vec<walkdir::DirEntry> = WalkDir::new(dir)
            .follow_links(true)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        for child in children {
            if child.file_name() == ".directory" {
                self.tree.node_mut(id).directories.push(".directory".to_string());
            } else if child.file_type().is_dir()
                && let Some(sub) = self.import_legacy(child.path(), prefix, owner)
            {
                self.tree.add_submenu(id, sub);
            }
        }

        self.catalog.scan_legacy(dir, prefix);
        let owned = self.owns_app_dir(owner, dir);
        for entry_id in self.catalog.lookup(&[dir.to_path_buf()], false) {
            let entry = self.catalog.entry_mut(entry_id);
            if entry.categories.is_empty() {
                let rule = Rule::include_filename(&entry.desktop_file_id);
                self.tree.node_mut(id).rules.push(rule);
            }
            if !owned {
                entry.categories.push(LEGACY_CATEGORY.to_string());
            }
        }
        Some(id)
    }

    /// Whether `dir` is an app dir of `node` or of a node it is merged into.
    fn owns_app_dir(&self, mut node: MenuId, dir: &Path) -> bool {
        loop {
            if self.tree.node(node).app_dirs.iter().any(|d| d == dir) {
                return true;
            }
            match self.merge_targets.get(&node) {
                Some(&target) => node = target,
                None => return false,
            }
        }
    }
}

/// `<Move><Old/><New/></Move>`; a move missing either half is dropped.
fn parse_move(element: &Element, file: &Path) -> Result<Option<MoveOp>, ParseError> {
    let old = element.find("Old").map(|e| e.required_text(file)).transpose()?;
    let new = element.find("New").map(|e| e.required_text(file)).transpose()?;
    match (old, new) {
        (Some(old), Some(new)) => Ok(Some(MoveOp { old, new })),
        _ => {
            tracing::debug!(file = %file.display(), "incomplete <Move>");
            Ok(None)
        }
    }
}
