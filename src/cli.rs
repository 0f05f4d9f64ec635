use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

/// Top-level CLI entry point for the menu resolver.
#[derive(Parser, Debug)]
#[command(
    name = "xdgmenu",
    about = "Resolve, inspect and edit freedesktop.org application menus",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Configuration file (default: $XDG_CONFIG_HOME/xdgmenu/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Menu definition file to resolve instead of the default one
    #[arg(short, long, global = true)]
    pub menu: Option<PathBuf>,

    /// Current desktop names, colon separated (overrides XDG_CURRENT_DESKTOP)
    #[arg(short, long, global = true, value_delimiter = ':')]
    pub desktop: Vec<String>,

    /// Fail on merge loops and unreadable merged files
    #[arg(long, global = true)]
    pub strict: bool,

    /// Edit the system menu definition in place
    #[arg(long, global = true)]
    pub root: bool,
}

impl GlobalOpts {
    /// Configuration overrides given by these flags.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            menu: self.menu.clone(),
            desktop: self.desktop.clone(),
            strict: self.strict,
            root_mode: self.root,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved menu tree
    Show(ShowOpts),
    /// Check descriptor files for format problems
    Validate(ValidateOpts),
    /// Change the menu and save the result to the user's menu files
    Edit(EditOpts),
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `show` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ShowOpts {
    /// Also list items that are not displayed, with the reason
    #[arg(long)]
    pub hidden: bool,

    /// Print a JSON snapshot instead of an indented tree
    #[arg(long)]
    pub json: bool,

    /// Only show the submenu at this path (e.g. "Games/Arcade")
    pub path: Option<String>,
}

/// Options for the `validate` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ValidateOpts {
    /// Descriptor files to check (default: every record the menu uses)
    pub paths: Vec<PathBuf>,
}

/// Options for the `edit` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct EditOpts {
    #[command(subcommand)]
    pub action: EditCommand,

    /// Print the resulting menu document instead of saving
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Edit operations.
#[derive(Subcommand, Debug, Clone)]
pub enum EditCommand {
    /// Hide an application entry (sets NoDisplay)
    Hide {
        /// Desktop-file id, e.g. "firefox.desktop"
        entry: String,
    },
    /// Show a hidden application entry again
    Unhide {
        /// Desktop-file id
        entry: String,
    },
    /// Hide a submenu (sets NoDisplay on its directory record)
    HideMenu {
        /// Submenu path below the root, e.g. "Games"
        path: String,
    },
    /// Show a hidden or deleted submenu again
    UnhideMenu {
        /// Submenu path below the root
        path: String,
    },
    /// Create a new submenu
    CreateMenu {
        /// Name of the new submenu
        name: String,

        /// Parent submenu path (default: the root menu)
        #[arg(long)]
        parent: Option<String>,

        /// Comment for the new submenu
        #[arg(long)]
        comment: Option<String>,

        /// Icon for the new submenu
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a user-created entry or empty submenu
    Delete {
        /// Desktop-file id or submenu path
        item: String,
    },
    /// Drop the user's copy of an entry or submenu record
    Revert {
        /// Desktop-file id or submenu path
        item: String,
    },
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
