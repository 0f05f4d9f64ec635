//! Structural editing of a resolved menu.
//!
//! The editor keeps two things in step: the in-memory tree, which is
//! re-sorted after every mutation, and the user's definition document,
//! which receives the directives needed to reproduce the change on the next
//! parse. Edited descriptor records are redirected to the user's data
//! directory; nothing touches disk until [`MenuEditor::save`].

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::catalog::{EntryId, MenuEntry, Origin};
use super::layout::{InlineOverrides, Layout, LayoutItem, MergeKind};
use super::sort::{DisplayItem, Show};
use super::tree::{MenuId, MenuNode};
use super::xml::Element;
use super::Menu;
use crate::desktop::DesktopEntry;
use crate::error::{EditError, ParseError};

/// Data sub-directory holding application records.
const APPLICATIONS_DIR: &str = "applications";

/// Data sub-directory holding menu directory records.
const DIRECTORIES_DIR: &str = "desktop-directories";

/// What deleting an item would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// The item only exists in the user's data; it can be removed.
    Delete,
    /// A user copy shadows a system record; removing it restores the
    /// system one.
    Revert,
    /// The item cannot be deleted or reverted.
    NotApplicable,
}

/// Result of a delete or revert request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The change was made.
    Done,
    /// The item does not support the request; nothing changed.
    NotApplicable,
}

/// An item of a menu's display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef {
    /// An application entry.
    Entry(EntryId),
    /// A submenu.
    Submenu(MenuId),
    /// The separator at this index of the display list.
    Separator(usize),
}

/// Where an item goes in its parent's display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Let the parent's layout place it.
    Append,
    /// Directly after another item; pins the parent's layout.
    After(ItemRef),
    /// Directly before another item; pins the parent's layout.
    Before(ItemRef),
}

/// Record fields to change. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordEdit {
    /// `Name`, written for the current locale.
    pub name: Option<String>,
    /// `GenericName`, written for the current locale.
    pub generic_name: Option<String>,
    /// `Comment`, written for the current locale.
    pub comment: Option<String>,
    /// `Exec`; ignored for menus.
    pub exec: Option<String>,
    /// `Icon`.
    pub icon: Option<String>,
    /// `Terminal`; ignored for menus.
    pub terminal: Option<bool>,
    /// `NoDisplay`.
    pub no_display: Option<bool>,
    /// `Hidden`.
    pub hidden: Option<bool>,
}

impl RecordEdit {
    fn named(&self, name: &str) -> Self {
        let mut edit = self.clone();
        edit.name.get_or_insert_with(|| name.to_string());
        edit
    }
}

/// Editor over a resolved [`Menu`] and the user's definition document.
#[derive(Debug)]
pub struct MenuEditor {
    menu: Menu,
    doc_path: PathBuf,
    doc: Element,
    reserved: HashSet<String>,
}

impl MenuEditor {
    /// Open the user's definition document for `menu`.
    ///
    /// The document is `<config home>/menus/<menu file name>`, or the menu
    /// file itself in root mode. A missing document is started from scratch
    /// with a `<MergeFile type="parent">` pointing at the menu file.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Document`] if the document exists but is not a
    /// menu document, and [`EditError::Io`] if it cannot be read.
    pub fn new(menu: Menu) -> Result<Self, EditError> {
        let doc_path = if menu.platform.root_mode {
            menu.filename.clone()
        } else {
            let file_name = menu
                .filename
                .file_name()
                .map_or_else(|| PathBuf::from("applications.menu"), PathBuf::from);
            menu.platform.dirs.config_home.join("menus").join(file_name)
        };

        let doc = match fs::read_to_string(&doc_path) {
            Ok(content) => {
                let doc = Element::parse_str(&content, &doc_path)?;
                if doc.name != "Menu" {
                    return Err(ParseError::NotAMenuDocument(doc_path).into());
                }
                doc
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Element::new("Menu")
                .child(Element::with_text("Name", "Applications"))
                .child(
                    Element::with_text("MergeFile", menu.filename.to_string_lossy())
                        .attr("type", "parent"),
                ),
            Err(source) => {
                return Err(EditError::Io {
                    path: doc_path,
                    source,
                });
            }
        };

        Ok(Self {
            menu,
            doc_path,
            doc,
            reserved: HashSet::new(),
        })
    }

    /// The menu being edited.
    #[must_use]
    pub const fn menu(&self) -> &Menu {
        &self.menu
    }

    /// The user's definition document as edited so far.
    #[must_use]
    pub const fn document(&self) -> &Element {
        &self.doc
    }

    /// Where [`save`](Self::save) writes the document.
    #[must_use]
    pub fn document_path(&self) -> &Path {
        &self.doc_path
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Create a new application entry named `name` in `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownItem`] if `position` refers to an item
    /// that is not in `parent`.
    pub fn create_entry(
        &mut self,
        parent: MenuId,
        name: &str,
        edit: &RecordEdit,
        position: Position,
    ) -> Result<EntryId, EditError> {
        let filename = self.unique_filename(parent, name, ".desktop");
        let path = self
            .menu
            .platform
            .writable_data_dir()
            .join(APPLICATIONS_DIR)
            .join(&filename);
        let record = DesktopEntry::new(&path, self.menu.catalog.locales());
        let id = self
            .menu
            .catalog
            .insert(MenuEntry::new(record, PathBuf::from(&filename), ""));
        self.apply_edit(id, &edit.named(name), false);

        self.add_item(parent, ItemRef::Entry(id), position, false)?;
        self.menu.sort();
        Ok(id)
    }

    /// Create a new submenu named `name` in `parent`, backed by a new
    /// directory record.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownItem`] if `position` refers to an item
    /// that is not in `parent`.
    pub fn create_submenu(
        &mut self,
        parent: MenuId,
        name: &str,
        edit: &RecordEdit,
        position: Position,
    ) -> Result<MenuId, EditError> {
        let filename = self.unique_filename(parent, name, ".directory");
        let menu_name = filename.trim_end_matches(".directory").to_string();

        let inherited = self
            .menu
            .tree
            .node(parent)
            .default_layout
            .clone()
            .unwrap_or_default();
        let mut node = MenuNode::named(menu_name.as_str());
        node.layout = Some(inherited.clone());
        node.default_layout = Some(inherited);
        node.deleted = Some(false);
        node.only_unallocated = Some(false);

        let path = self
            .menu
            .platform
            .writable_data_dir()
            .join(DIRECTORIES_DIR)
            .join(&filename);
        let record = DesktopEntry::new(&path, self.menu.catalog.locales());
        let directory = self
            .menu
            .catalog
            .insert(MenuEntry::new(record, PathBuf::from(&filename), ""));
        node.directory = Some(directory);
        self.apply_edit(directory, &edit.named(name), true);

        let id = self.menu.tree.alloc(node);
        let xml_path = join_path(&self.menu.tree.relative_path(parent), &menu_name);
        if let Some(element) = xml_menu(&mut self.doc, &xml_path, true) {
            element.children.push(Element::with_text("Directory", filename.as_str()));
        }

        self.add_item(parent, ItemRef::Submenu(id), position, false)?;
        self.menu.sort();
        Ok(id)
    }

    /// Insert a separator into `parent`.
    ///
    /// Separators only exist in layouts, so the parent's layout is always
    /// pinned.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownItem`] if `position` refers to an item
    /// that is not in `parent`.
    pub fn create_separator(&mut self, parent: MenuId, position: Position) -> Result<(), EditError> {
        self.add_item(parent, ItemRef::Separator(0), position, true)?;
        self.menu.sort();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Moving
    // -----------------------------------------------------------------------

    /// Move `entry` from `old_parent` to `new_parent`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownItem`] if `position` refers to an item
    /// that is not in `new_parent`.
    pub fn move_entry(
        &mut self,
        entry: EntryId,
        old_parent: MenuId,
        new_parent: MenuId,
        position: Position,
    ) -> Result<(), EditError> {
        self.remove_item(old_parent, ItemRef::Entry(entry), position != Position::Append);
        self.add_item(new_parent, ItemRef::Entry(entry), position, false)?;
        self.menu.sort();
        Ok(())
    }

    /// Move submenu `menu` from `old_parent` to `new_parent`.
    ///
    /// The document gets a `<Move>` on its root menu when the path changes.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidMove`] if `new_parent` is `menu` or one
    /// of its descendants, and [`EditError::UnknownItem`] if `position`
    /// refers to an item that is not in `new_parent`.
    pub fn move_submenu(
        &mut self,
        menu: MenuId,
        old_parent: MenuId,
        new_parent: MenuId,
        position: Position,
    ) -> Result<(), EditError> {
        if self.is_within(new_parent, menu) {
            return Err(EditError::InvalidMove {
                menu: self.menu.tree.relative_path(menu),
                target: self.menu.tree.relative_path(new_parent),
            });
        }

        let name = self.menu.tree.node(menu).name.clone();
        let old_path = join_path(&self.menu.tree.relative_path(old_parent), &name);
        let new_path = join_path(&self.menu.tree.relative_path(new_parent), &name);

        self.remove_item(old_parent, ItemRef::Submenu(menu), position != Position::Append);
        self.add_item(new_parent, ItemRef::Submenu(menu), position, false)?;

        if old_path != new_path {
            self.doc.children.push(
                Element::new("Move")
                    .child(Element::with_text("Old", old_path))
                    .child(Element::with_text("New", new_path)),
            );
        }
        self.menu.sort();
        Ok(())
    }

    /// Move the separator at `index` of `parent`'s display list.
    ///
    /// `position` is resolved after the separator was taken out.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownItem`] if there is no separator at
    /// `index` or `position` refers to an item that is not in `parent`.
    pub fn move_separator(&mut self, parent: MenuId, index: usize, position: Position) -> Result<(), EditError> {
        if self.index_of(parent, ItemRef::Separator(index)).is_none() {
            return Err(self.unknown_item(parent));
        }
        self.remove_item(parent, ItemRef::Separator(index), true);
        self.add_item(parent, ItemRef::Separator(0), position, true)?;
        self.menu.sort();
        Ok(())
    }

    /// Add `entry` to `new_parent` as well.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownItem`] if `position` refers to an item
    /// that is not in `new_parent`.
    pub fn copy_entry(&mut self, entry: EntryId, new_parent: MenuId, position: Position) -> Result<(), EditError> {
        self.add_item(new_parent, ItemRef::Entry(entry), position, false)?;
        self.menu.sort();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Change fields of an entry's record.
    pub fn edit_entry(&mut self, entry: EntryId, edit: &RecordEdit) {
        self.apply_edit(entry, edit, false);
        self.menu.sort();
    }

    /// Change fields of a submenu's directory record, creating the record
    /// when the submenu has none.
    pub fn edit_submenu(&mut self, menu: MenuId, edit: &RecordEdit) {
        let directory = self.ensure_directory(menu);
        self.apply_edit(directory, edit, true);
        self.menu.sort();
    }

    /// Set `NoDisplay` on an entry.
    pub fn hide_entry(&mut self, entry: EntryId) {
        self.edit_entry(
            entry,
            &RecordEdit {
                no_display: Some(true),
                ..RecordEdit::default()
            },
        );
    }

    /// Clear `NoDisplay` and `Hidden` on an entry.
    pub fn unhide_entry(&mut self, entry: EntryId) {
        self.edit_entry(
            entry,
            &RecordEdit {
                no_display: Some(false),
                hidden: Some(false),
                ..RecordEdit::default()
            },
        );
    }

    /// Set `NoDisplay` on a submenu's directory record.
    pub fn hide_submenu(&mut self, menu: MenuId) {
        self.edit_submenu(
            menu,
            &RecordEdit {
                no_display: Some(true),
                ..RecordEdit::default()
            },
        );
    }

    /// Clear `NoDisplay`, `Hidden` and any `<Deleted>` state of a submenu.
    pub fn unhide_submenu(&mut self, menu: MenuId) {
        let xml_path = self.menu.tree.relative_path(menu);
        if let Some(element) = xml_menu(&mut self.doc, &xml_path, false) {
            element
                .children
                .retain(|c| c.name != "Deleted" && c.name != "NotDeleted");
        }
        self.menu.tree.node_mut(menu).deleted = Some(false);
        self.edit_submenu(
            menu,
            &RecordEdit {
                no_display: Some(false),
                hidden: Some(false),
                ..RecordEdit::default()
            },
        );
    }

    // -----------------------------------------------------------------------
    // Deleting and reverting
    // -----------------------------------------------------------------------

    /// What [`delete_entry`](Self::delete_entry) and friends would do for
    /// `item`.
    #[must_use]
    pub fn action(&self, item: ItemRef) -> EditAction {
        let catalog = &self.menu.catalog;
        match item {
            ItemRef::Entry(entry) => match catalog.origin(entry) {
                Origin::Both => EditAction::Revert,
                Origin::User => EditAction::Delete,
                Origin::System => EditAction::NotApplicable,
            },
            ItemRef::Submenu(menu) => {
                let node = self.menu.tree.node(menu);
                match node.directory.map(|d| catalog.origin(d)) {
                    Some(Origin::Both) => EditAction::Revert,
                    Some(Origin::User) if node.submenus.is_empty() && node.menu_entries.is_empty() => {
                        EditAction::Delete
                    }
                    _ => EditAction::NotApplicable,
                }
            }
            ItemRef::Separator(_) => EditAction::NotApplicable,
        }
    }

    /// Delete a user-only entry from disk and from every menu holding it.
    pub fn delete_entry(&mut self, entry: EntryId) -> EditOutcome {
        if self.action(ItemRef::Entry(entry)) != EditAction::Delete {
            return EditOutcome::NotApplicable;
        }
        self.delete_record(entry);
        for parent in self.menu.catalog.entry(entry).parents.clone() {
            self.remove_item(parent, ItemRef::Entry(entry), false);
        }
        self.menu.sort();
        EditOutcome::Done
    }

    /// Delete a user copy and put the shadowed system entry back in its
    /// place.
    pub fn revert_entry(&mut self, entry: EntryId) -> EditOutcome {
        if self.action(ItemRef::Entry(entry)) != EditAction::Revert {
            return EditOutcome::NotApplicable;
        }
        let Some(original) = self.menu.catalog.entry(entry).original else {
            return EditOutcome::NotApplicable;
        };
        self.delete_record(entry);

        let parents = std::mem::take(&mut self.menu.catalog.entry_mut(entry).parents);
        self.menu.catalog.entry_mut(original).parents.clone_from(&parents);
        for parent in parents {
            let node = self.menu.tree.node_mut(parent);
            for slot in &mut node.menu_entries {
                if *slot == entry {
                    *slot = original;
                }
            }
            for item in &mut node.entries {
                if let DisplayItem::Entry { id, .. } = item
                    && *id == entry
                {
                    *id = original;
                }
            }
        }
        self.menu.sort();
        EditOutcome::Done
    }

    /// Delete an empty user-only submenu and its document element.
    pub fn delete_submenu(&mut self, menu: MenuId) -> EditOutcome {
        if self.action(ItemRef::Submenu(menu)) != EditAction::Delete {
            return EditOutcome::NotApplicable;
        }
        if let Some(directory) = self.menu.tree.node(menu).directory {
            self.delete_record(directory);
        }

        let xml_path = self.menu.tree.relative_path(menu);
        if let Some((parent_path, name)) = split_last(&xml_path)
            && let Some(element) = xml_menu(&mut self.doc, parent_path, false)
        {
            element.children.retain(|c| !is_menu_named(c, name));
        }

        if let Some(parent) = self.menu.tree.node(menu).parent {
            self.remove_item(parent, ItemRef::Submenu(menu), false);
        }
        self.menu.sort();
        EditOutcome::Done
    }

    /// Delete a submenu's user directory record and fall back to the
    /// system one.
    pub fn revert_submenu(&mut self, menu: MenuId) -> EditOutcome {
        if self.action(ItemRef::Submenu(menu)) != EditAction::Revert {
            return EditOutcome::NotApplicable;
        }
        let Some(directory) = self.menu.tree.node(menu).directory else {
            return EditOutcome::NotApplicable;
        };
        self.delete_record(directory);
        self.menu.tree.node_mut(menu).directory = self.menu.catalog.entry(directory).original;
        self.menu.sort();
        EditOutcome::Done
    }

    /// Remove the separator at `index` of `parent`'s display list.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::UnknownItem`] if there is no separator there.
    pub fn delete_separator(&mut self, parent: MenuId, index: usize) -> Result<(), EditError> {
        if self.index_of(parent, ItemRef::Separator(index)).is_none() {
            return Err(self.unknown_item(parent));
        }
        self.remove_item(parent, ItemRef::Separator(index), true);
        self.menu.sort();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write every changed record reachable from the root, then the
    /// definition document.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Record`] or [`EditError::Io`] when a file cannot
    /// be written.
    pub fn save(&mut self) -> Result<(), EditError> {
        let mut records: Vec<EntryId> = Vec::new();
        let mut seen = HashSet::new();
        for id in self.menu.tree.pre_order() {
            let node = self.menu.tree.node(id);
            let displayed = node.entries.iter().filter_map(|item| match item {
                DisplayItem::Entry { id, .. } => Some(*id),
                _ => None,
            });
            for record in node
                .directory
                .into_iter()
                .chain(node.menu_entries.iter().copied())
                .chain(displayed)
            {
                if seen.insert(record) {
                    records.push(record);
                }
            }
        }

        let mut written = 0;
        for id in records {
            let record = &mut self.menu.catalog.entry_mut(id).record;
            if record.is_tainted() {
                record.save()?;
                written += 1;
            }
        }

        let io_err = |source| EditError::Io {
            path: self.doc_path.clone(),
            source,
        };
        if let Some(dir) = self.doc_path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        fs::write(&self.doc_path, self.doc.to_document_string()).map_err(io_err)?;
        tracing::info!(file = %self.doc_path.display(), "saved menu and {written} records");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn unknown_item(&self, parent: MenuId) -> EditError {
        EditError::UnknownItem {
            menu: self.menu.tree.path(parent),
        }
    }

    /// `name` + `extension`, with `-N` appended until the name is unused in
    /// this session, on disk and among `parent`'s submenus.
    fn unique_filename(&mut self, parent: MenuId, name: &str, extension: &str) -> String {
        let base = name.replace('/', "");
        let sub = if extension == ".directory" {
            DIRECTORIES_DIR
        } else {
            APPLICATIONS_DIR
        };
        let dir = self.menu.platform.writable_data_dir().join(sub);

        let mut postfix = 0usize;
        loop {
            let filename = if postfix == 0 {
                format!("{base}{extension}")
            } else {
                format!("{base}-{postfix}{extension}")
            };
            let stem = filename.trim_end_matches(extension);
            let taken = self.reserved.contains(&filename)
                || dir.join(&filename).is_file()
                || (extension == ".directory" && self.menu.tree.find_child(parent, stem).is_some());
            if !taken {
                self.reserved.insert(filename.clone());
                return filename;
            }
            postfix += 1;
        }
    }

    /// Write `edit` into a record, then move system records to the user's
    /// data directory.
    fn apply_edit(&mut self, id: EntryId, edit: &RecordEdit, is_menu: bool) {
        let record = &mut self.menu.catalog.entry_mut(id).record;
        if let Some(name) = &edit.name {
            record.set_localized("Name", name);
        }
        if let Some(generic_name) = &edit.generic_name {
            record.set_localized("GenericName", generic_name);
        }
        if let Some(comment) = &edit.comment {
            record.set_localized("Comment", comment);
        }
        if let Some(icon) = &edit.icon {
            record.set("Icon", icon);
        }
        if !is_menu {
            if let Some(exec) = &edit.exec {
                record.set("Exec", exec);
            }
            if let Some(terminal) = edit.terminal {
                record.set_bool("Terminal", terminal);
            }
        }
        if let Some(no_display) = edit.no_display {
            record.set_bool("NoDisplay", no_display);
        }
        if let Some(hidden) = edit.hidden {
            record.set_bool("Hidden", hidden);
        }
        self.take_ownership(id);
    }

    /// Redirect a system record to the user's data directory, keeping the
    /// on-disk version as its original.
    fn take_ownership(&mut self, id: EntryId) {
        if self.menu.catalog.origin(id) != Origin::System {
            return;
        }

        let entry = self.menu.catalog.entry(id);
        let source = entry.record.path().to_path_buf();
        let filename = entry.filename.clone();
        let prefix = entry.prefix.clone();
        let sub = if entry.record.entry_type() == "Directory" {
            DIRECTORIES_DIR
        } else {
            APPLICATIONS_DIR
        };

        match DesktopEntry::parse(&source, self.menu.catalog.locales()) {
            Ok(record) => {
                let original = self
                    .menu
                    .catalog
                    .insert(MenuEntry::new(record, filename.clone(), &prefix));
                self.menu.catalog.entry_mut(id).original = Some(original);
            }
            Err(e) => tracing::debug!(file = %source.display(), "no original kept: {e}"),
        }

        let target = self.menu.platform.writable_data_dir().join(sub).join(&filename);
        self.menu.catalog.entry_mut(id).record.record_mut().set_path(target);
    }

    /// The submenu's directory record, created when it has none.
    ///
    /// A legacy `.directory` record is renamed after the menu so the user
    /// copy does not collide with other legacy menus.
    fn ensure_directory(&mut self, menu: MenuId) -> EntryId {
        let node = self.menu.tree.node(menu);
        let (name, current, parent) = (node.name.clone(), node.directory, node.parent);
        let xml_path = self.menu.tree.relative_path(menu);

        match current {
            Some(directory) if self.menu.catalog.entry(directory).filename == Path::new(".directory") => {
                let filename = format!("{name}.directory");
                if let Some(element) = xml_menu(&mut self.doc, &xml_path, true) {
                    element.children.push(Element::with_text("Directory", filename.as_str()));
                }
                let entry = self.menu.catalog.entry_mut(directory);
                entry.filename = PathBuf::from(&filename);
                entry.desktop_file_id = filename;
                directory
            }
            Some(directory) => directory,
            None => {
                let parent = parent.unwrap_or_else(|| self.menu.tree.root());
                let filename = self.unique_filename(parent, &name, ".directory");
                if let Some(element) = xml_menu(&mut self.doc, &xml_path, true) {
                    element.children.push(Element::with_text("Directory", filename.as_str()));
                }
                let path = self
                    .menu
                    .platform
                    .writable_data_dir()
                    .join(DIRECTORIES_DIR)
                    .join(&filename);
                let mut record = DesktopEntry::new(&path, self.menu.catalog.locales());
                record.set_localized("Name", &name);
                let directory = self
                    .menu
                    .catalog
                    .insert(MenuEntry::new(record, PathBuf::from(filename), ""));
                self.menu.tree.node_mut(menu).directory = Some(directory);
                directory
            }
        }
    }

    /// Delete a record's file, ignoring files that are already gone.
    fn delete_record(&mut self, id: EntryId) {
        let entry = self.menu.catalog.entry(id);
        let path = entry.record.path().to_path_buf();
        let filename = entry.filename.to_string_lossy().into_owned();
        if let Err(e) = fs::remove_file(&path) {
            tracing::debug!(file = %path.display(), "could not remove: {e}");
        }
        self.reserved.remove(&filename);
    }

    fn is_within(&self, mut id: MenuId, ancestor: MenuId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.menu.tree.node(id).parent {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Index of `item` in `parent`'s display list.
    fn index_of(&self, parent: MenuId, item: ItemRef) -> Option<usize> {
        let entries = &self.menu.tree.node(parent).entries;
        match item {
            ItemRef::Separator(index) => {
                matches!(entries.get(index), Some(DisplayItem::Separator { .. })).then_some(index)
            }
            ItemRef::Entry(entry) => entries
                .iter()
                .position(|i| matches!(i, DisplayItem::Entry { id, .. } if *id == entry)),
            ItemRef::Submenu(menu) => entries
                .iter()
                .position(|i| matches!(i, DisplayItem::Submenu { id, .. } if *id == menu)),
        }
    }

    /// Put `item` into `parent` at `position` and record it in the document.
    ///
    /// Positioned inserts, and any insert with `pin_layout`, rewrite the
    /// parent's layout from its display list.
    fn add_item(&mut self, parent: MenuId, item: ItemRef, position: Position, pin_layout: bool) -> Result<(), EditError> {
        let index = match position {
            Position::Append => None,
            Position::After(anchor) => Some(
                self.index_of(parent, anchor)
                    .ok_or_else(|| self.unknown_item(parent))?
                    + 1,
            ),
            Position::Before(anchor) => Some(
                self.index_of(parent, anchor)
                    .ok_or_else(|| self.unknown_item(parent))?,
            ),
        };

        let xml_path = self.menu.tree.relative_path(parent);
        let display = match item {
            ItemRef::Entry(entry) => {
                self.menu.tree.node_mut(parent).menu_entries.push(entry);
                let record = self.menu.catalog.entry_mut(entry);
                record.parents.push(parent);
                let desktop_file_id = record.desktop_file_id.clone();
                if let Some(element) = xml_menu(&mut self.doc, &xml_path, true) {
                    set_filename_rule(element, &desktop_file_id, "Include");
                }
                DisplayItem::Entry {
                    id: entry,
                    show: Show::Shown,
                    alias: None,
                }
            }
            ItemRef::Submenu(menu) => {
                let kept = self.menu.tree.add_submenu(parent, menu);
                DisplayItem::Submenu { id: kept, alias: None }
            }
            ItemRef::Separator(_) => DisplayItem::Separator { shown: true },
        };

        let entries = &mut self.menu.tree.node_mut(parent).entries;
        match index {
            Some(i) if i <= entries.len() => entries.insert(i, display),
            _ => entries.push(display),
        }

        if index.is_some() || pin_layout {
            self.pin_layout(parent);
        }
        Ok(())
    }

    /// Take `item` out of `parent`, recording an exclusion for entries.
    fn remove_item(&mut self, parent: MenuId, item: ItemRef, pin_layout: bool) {
        if let Some(index) = self.index_of(parent, item) {
            self.menu.tree.node_mut(parent).entries.remove(index);
        }

        match item {
            ItemRef::Entry(entry) => {
                self.menu
                    .tree
                    .node_mut(parent)
                    .menu_entries
                    .retain(|&e| e != entry);
                let record = self.menu.catalog.entry_mut(entry);
                record.parents.retain(|&p| p != parent);
                let desktop_file_id = record.desktop_file_id.clone();
                let xml_path = self.menu.tree.relative_path(parent);
                if let Some(element) = xml_menu(&mut self.doc, &xml_path, true) {
                    set_filename_rule(element, &desktop_file_id, "Exclude");
                }
            }
            ItemRef::Submenu(menu) => self.menu.tree.detach(menu),
            ItemRef::Separator(_) => {}
        }

        if pin_layout {
            self.pin_layout(parent);
        }
    }

    /// Replace `parent`'s layout with one listing its current display items
    /// between `Merge menus` and `Merge files`.
    fn pin_layout(&mut self, parent: MenuId) {
        let tree = &self.menu.tree;
        let node = tree.node(parent);
        let options = node.layout.as_ref().map(|l| l.options).unwrap_or_default();

        let mut order = vec![LayoutItem::Merge(MergeKind::Menus)];
        for item in &node.entries {
            match item {
                DisplayItem::Submenu { id, .. } => order.push(LayoutItem::Menuname {
                    name: tree.node(*id).name.clone(),
                    overrides: InlineOverrides::default(),
                }),
                DisplayItem::Entry { id, .. } if node.menu_entries.contains(id) => {
                    order.push(LayoutItem::Filename(
                        self.menu.catalog.entry(*id).desktop_file_id.clone(),
                    ));
                }
                DisplayItem::Separator { .. } => order.push(LayoutItem::Separator),
                DisplayItem::Entry { .. } | DisplayItem::Header(_) => {}
            }
        }
        order.push(LayoutItem::Merge(MergeKind::Files));
        let layout = Layout { order, options };

        let xml_path = tree.relative_path(parent);
        if let Some(element) = xml_menu(&mut self.doc, &xml_path, true) {
            element.children.retain(|c| c.name != "Layout");
            element.children.push(layout.to_element("Layout"));
        }
        self.menu.tree.node_mut(parent).layout = Some(layout);
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Split `a/b/c` into `("a/b", "c")`; a single segment has an empty parent.
fn split_last(path: &str) -> Option<(&str, &str)> {
    if path.is_empty() {
        return None;
    }
    Some(path.rsplit_once('/').unwrap_or(("", path)))
}

fn is_menu_named(element: &Element, name: &str) -> bool {
    element.name == "Menu" && element.find_all("Name").any(|n| n.trimmed_text() == name)
}

/// The `<Menu>` element at `path` below the document root, created on the
/// way when `create` is set.
fn xml_menu<'a>(root: &'a mut Element, path: &str, create: bool) -> Option<&'a mut Element> {
    let mut current = root;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let found = current.children.iter().position(|c| is_menu_named(c, segment));
        let index = match found {
            Some(index) => index,
            None if create => {
                current
                    .children
                    .push(Element::new("Menu").child(Element::with_text("Name", segment)));
                current.children.len() - 1
            }
            None => return None,
        };
        current = current.children.get_mut(index)?;
    }
    Some(current)
}

/// Replace any `<Include>`/`<Exclude>` naming `desktop_file_id` with a
/// fresh `<kind><Filename>…</Filename></kind>`.
fn set_filename_rule(element: &mut Element, desktop_file_id: &str, kind: &str) {
    element.children.retain(|c| {
        !((c.name == "Include" || c.name == "Exclude")
            && c.children
                .first()
                .is_some_and(|f| f.name == "Filename" && f.trimmed_text() == desktop_file_id))
    });
    element
        .children
        .push(Element::new(kind).child(Element::with_text("Filename", desktop_file_id)));
}
