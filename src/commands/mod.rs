pub mod completions;
pub mod edit;
pub mod show;
pub mod validate;
pub mod version;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::logging::Logger;
use crate::menu::{self, Menu};
use crate::platform::Platform;

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates environment detection and configuration loading so that
/// each command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    pub platform: Platform,
    pub config: Config,
}

impl CommandSetup {
    /// Detect the environment and load the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be parsed.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        Self::with_platform(global, Platform::detect(), log)
    }

    /// Load the configuration on top of an already known environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be parsed.
    pub fn with_platform(global: &GlobalOpts, platform: Platform, log: &Logger) -> Result<Self> {
        log.stage("Loading configuration");
        let config = Config::load(global.config.as_deref(), &platform.dirs)?
            .with_overrides(global.overrides());
        let platform = config.apply_to(platform);

        log.debug(&format!("data dirs: {:?}", platform.dirs.data_search()));
        log.debug(&format!("config dirs: {:?}", platform.dirs.config_search()));
        log.info(&format!(
            "desktop: {}",
            if platform.desktops.is_empty() {
                "(none)".to_string()
            } else {
                platform.desktops.join(":")
            }
        ));

        Ok(Self { platform, config })
    }

    /// Resolve the configured menu.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition document cannot be located or
    /// parsed.
    pub fn load_menu(&self, log: &Logger) -> Result<Menu> {
        log.stage("Resolving menu");
        let menu = menu::parse(
            self.config.menu.as_deref(),
            &self.platform,
            self.config.parse_options(),
        )
        .context("resolving menu")?;
        log.info(&format!("menu: {}", menu.filename.display()));
        Ok(menu)
    }
}
