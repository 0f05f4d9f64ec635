// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed XDG tree and a fluent builder so each
// integration test can set up isolated data and config directories without
// repeating filesystem boilerplate.
//
// Layout below the temporary root (see `BaseDirs::under`):
// - `home/data`   user data home (`XDG_DATA_HOME`)
// - `home/config` user config home (`XDG_CONFIG_HOME`)
// - `sys/data`    system data dir (`XDG_DATA_DIRS`)
// - `sys/config`  system config dir (`XDG_CONFIG_DIRS`)
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use xdgmenu_cli::cli::GlobalOpts;
use xdgmenu_cli::commands::CommandSetup;
use xdgmenu_cli::logging::Logger;
use xdgmenu_cli::menu::{self, Menu, ParseOptions};
use xdgmenu_cli::platform::{BaseDirs, Platform};

/// Build the text of an application descriptor.
pub fn application(name: &str, categories: &str) -> String {
    format!(
        "[Desktop Entry]\nType=Application\nName={name}\nExec={}\nCategories={categories}\n",
        name.to_lowercase()
    )
}

/// Build the text of a directory descriptor.
pub fn directory(name: &str) -> String {
    format!("[Desktop Entry]\nType=Directory\nName={name}\n")
}

/// An isolated XDG tree backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct MenuFixture {
    /// Temporary root holding the `home/` and `sys/` trees.
    pub root: tempfile::TempDir,
    desktops: Vec<String>,
}

impl MenuFixture {
    /// Create an empty tree.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        for dir in ["home/data", "home/config", "sys/data", "sys/config"] {
            std::fs::create_dir_all(root.path().join(dir)).expect("create base dir");
        }
        Self {
            root,
            desktops: Vec::new(),
        }
    }

    /// Path of the temporary root.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Resolve against these desktop names.
    pub fn with_desktops(mut self, desktops: &[&str]) -> Self {
        self.desktops = desktops.iter().map(|d| (*d).to_string()).collect();
        self
    }

    /// Platform pointing at this tree.
    pub fn platform(&self) -> Platform {
        Platform::new(BaseDirs::under(self.path()), self.desktops.clone())
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path().join(relative);
        std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create parent dir");
        std::fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Write the system `applications.menu`.
    pub fn system_menu(self, content: &str) -> Self {
        self.write("sys/config/menus/applications.menu", content);
        self
    }

    /// Write the user's `applications.menu`.
    pub fn user_menu(self, content: &str) -> Self {
        self.write("home/config/menus/applications.menu", content);
        self
    }

    /// Add a system application descriptor.
    pub fn system_app(self, file: &str, name: &str, categories: &str) -> Self {
        self.write(
            &format!("sys/data/applications/{file}"),
            &application(name, categories),
        );
        self
    }

    /// Add a user application descriptor.
    pub fn user_app(self, file: &str, name: &str, categories: &str) -> Self {
        self.write(
            &format!("home/data/applications/{file}"),
            &application(name, categories),
        );
        self
    }

    /// Add a system directory descriptor.
    pub fn system_directory(self, file: &str, name: &str) -> Self {
        self.write(&format!("sys/data/desktop-directories/{file}"), &directory(name));
        self
    }

    /// Resolve the default menu.
    pub fn resolve(&self) -> Menu {
        self.try_resolve(ParseOptions::default())
            .expect("menu should resolve")
    }

    /// Resolve the default menu with explicit options.
    pub fn try_resolve(&self, options: ParseOptions) -> Result<Menu, xdgmenu_cli::error::ParseError> {
        menu::parse(None, &self.platform(), options)
    }

    /// Command setup over this tree with the given flags.
    pub fn setup(&self, global: &GlobalOpts, log: &Logger) -> CommandSetup {
        CommandSetup::with_platform(global, self.platform(), log).expect("command setup")
    }
}
