//! Command: apply one change to the menu and save it.
use anyhow::{Context as _, Result, bail};
use std::io::Write;

use crate::cli::{EditCommand, EditOpts, GlobalOpts};
use crate::logging::{Log, Logger};
use crate::menu::{EditOutcome, EntryId, ItemRef, MenuEditor, MenuId, Position, RecordEdit};

/// Run the `edit` command.
///
/// # Errors
///
/// Returns an error if the menu cannot be resolved, the named item does not
/// exist, the change does not apply to it, or saving fails.
pub fn run(global: &GlobalOpts, opts: &EditOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let menu = setup.load_menu(log)?;
    let mut editor = MenuEditor::new(menu).context("opening user menu file")?;

    log.stage("Editing menu");
    apply(&mut editor, &opts.action, log)?;

    if opts.dry_run {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{}", editor.document().to_document_string())?;
        return Ok(());
    }

    log.stage("Saving");
    editor.save().context("saving menu changes")?;
    log.info(&format!("wrote {}", editor.document_path().display()));
    Ok(())
}

/// Apply `action` to the editor's menu.
///
/// # Errors
///
/// Returns an error if the named item does not exist or the change does
/// not apply to it.
pub fn apply(editor: &mut MenuEditor, action: &EditCommand, log: &dyn Log) -> Result<()> {
    match action {
        EditCommand::Hide { entry } => {
            let id = find_entry(editor, entry)?;
            editor.hide_entry(id);
            log.info(&format!("hid {entry}"));
        }
        EditCommand::Unhide { entry } => {
            let id = find_entry(editor, entry)?;
            editor.unhide_entry(id);
            log.info(&format!("unhid {entry}"));
        }
        EditCommand::HideMenu { path } => {
            let id = find_submenu(editor, path)?;
            editor.hide_submenu(id);
            log.info(&format!("hid menu {path}"));
        }
        EditCommand::UnhideMenu { path } => {
            let id = find_submenu(editor, path)?;
            editor.unhide_submenu(id);
            log.info(&format!("unhid menu {path}"));
        }
        EditCommand::CreateMenu {
            name,
            parent,
            comment,
            icon,
        } => {
            let parent_id = match parent.as_deref() {
                Some(path) => find_submenu(editor, path)?,
                None => editor.menu().root(),
            };
            let edit = RecordEdit {
                comment: comment.clone(),
                icon: icon.clone(),
                ..RecordEdit::default()
            };
            let id = editor.create_submenu(parent_id, name, &edit, Position::Append)?;
            log.info(&format!("created menu {}", editor.menu().tree.relative_path(id)));
        }
        EditCommand::Delete { item } => {
            let outcome = match find_item(editor, item)? {
                ItemRef::Entry(id) => editor.delete_entry(id),
                ItemRef::Submenu(id) => editor.delete_submenu(id),
                ItemRef::Separator(_) => EditOutcome::NotApplicable,
            };
            if outcome == EditOutcome::NotApplicable {
                bail!("'{item}' cannot be deleted: only user-created entries and empty user menus can");
            }
            log.info(&format!("deleted {item}"));
        }
        EditCommand::Revert { item } => {
            let outcome = match find_item(editor, item)? {
                ItemRef::Entry(id) => editor.revert_entry(id),
                ItemRef::Submenu(id) => editor.revert_submenu(id),
                ItemRef::Separator(_) => EditOutcome::NotApplicable,
            };
            if outcome == EditOutcome::NotApplicable {
                bail!("'{item}' has no user copy to revert");
            }
            log.info(&format!("reverted {item}"));
        }
    }
    Ok(())
}

fn find_entry(editor: &MenuEditor, desktop_file_id: &str) -> Result<EntryId> {
    editor
        .menu()
        .find_entry(desktop_file_id)
        .with_context(|| format!("no entry '{desktop_file_id}' in the menu"))
}

fn find_submenu(editor: &MenuEditor, path: &str) -> Result<MenuId> {
    editor
        .menu()
        .submenu(path)
        .with_context(|| format!("no submenu '{path}' in the menu"))
}

/// An entry by desktop-file id, otherwise a submenu by path.
fn find_item(editor: &MenuEditor, item: &str) -> Result<ItemRef> {
    if let Some(id) = editor.menu().find_entry(item) {
        return Ok(ItemRef::Entry(id));
    }
    editor
        .menu()
        .submenu(item)
        .map(ItemRef::Submenu)
        .with_context(|| format!("no entry or submenu '{item}' in the menu"))
}
