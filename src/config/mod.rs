//! Layered configuration: built-in defaults, an optional TOML file, then
//! command-line overrides.
pub mod toml_loader;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::menu::ParseOptions;
use crate::platform::{BaseDirs, Platform};

/// Settings read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Definition document to resolve instead of the default one.
    pub menu: Option<PathBuf>,
    /// Desktop names replacing `XDG_CURRENT_DESKTOP`.
    pub desktop: Vec<String>,
    /// Turn merge loops and broken merges into errors.
    pub strict: bool,
    /// Edit the system definition in place.
    pub root_mode: bool,
    /// List invisible items by default.
    pub show_hidden: bool,
}

/// Values given on the command line; unset fields keep the file's values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--menu`
    pub menu: Option<PathBuf>,
    /// `--desktop`
    pub desktop: Vec<String>,
    /// `--strict`
    pub strict: bool,
    /// `--root`
    pub root_mode: bool,
}

/// Location of the configuration file below `dirs`.
#[must_use]
pub fn default_path(dirs: &BaseDirs) -> PathBuf {
    dirs.config_home.join("xdgmenu").join("config.toml")
}

impl Config {
    /// Load the configuration file at `path`, or the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is not valid TOML or has
    /// unknown keys.
    pub fn load(path: Option<&Path>, dirs: &BaseDirs) -> Result<Self> {
        let path = path.map_or_else(|| default_path(dirs), Path::to_path_buf);
        let config: Self = toml_loader::load_config(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        tracing::debug!("configuration: {config:?}");
        Ok(config)
    }

    /// Apply command-line overrides on top of this configuration.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.menu.is_some() {
            self.menu = overrides.menu;
        }
        if !overrides.desktop.is_empty() {
            self.desktop = overrides.desktop;
        }
        self.strict |= overrides.strict;
        self.root_mode |= overrides.root_mode;
        self
    }

    /// Parser options for this configuration.
    #[must_use]
    pub const fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict: self.strict,
        }
    }

    /// `platform` adjusted for the configured desktops and root mode.
    #[must_use]
    pub fn apply_to(&self, platform: Platform) -> Platform {
        let platform = platform.with_root_mode(self.root_mode);
        if self.desktop.is_empty() {
            platform
        } else {
            platform.with_desktops(self.desktop.clone())
        }
    }
}
