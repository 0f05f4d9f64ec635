//! Command: print the resolved menu.
use anyhow::{Context as _, Result};
use std::io::Write;

use crate::cli::{GlobalOpts, ShowOpts};
use crate::logging::Logger;
use crate::menu::Menu;

/// Run the `show` command.
///
/// # Errors
///
/// Returns an error if the menu cannot be resolved or the requested submenu
/// does not exist.
pub fn run(global: &GlobalOpts, opts: &ShowOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let menu = setup.load_menu(log)?;
    let mut stdout = std::io::stdout().lock();
    write_menu(&menu, opts, setup.config.show_hidden, &mut stdout)
}

/// Write `menu` (or the submenu named in `opts`) to `out` as text or JSON.
///
/// # Errors
///
/// Returns an error if the submenu does not exist or `out` cannot be
/// written.
pub fn write_menu(menu: &Menu, opts: &ShowOpts, show_hidden: bool, out: &mut impl Write) -> Result<()> {
    let hidden = opts.hidden || show_hidden;
    let id = match opts.path.as_deref() {
        Some(path) => menu
            .submenu(path)
            .with_context(|| format!("no submenu '{path}' in {}", menu.filename.display()))?,
        None => menu.root(),
    };

    if opts.json {
        serde_json::to_writer_pretty(&mut *out, &menu.snapshot_at(id, hidden))
            .context("writing JSON snapshot")?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", menu.render_at(id, hidden))?;
    }
    Ok(())
}
