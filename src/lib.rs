//! freedesktop.org application menu engine.
//!
//! Resolves XDG menu definition documents into the menu a desktop shows:
//! merged definition files, legacy directories, category rules, layouts and
//! visibility. Resolved menus can be edited, and the edits are written back
//! as user-level overrides that survive the next resolution.
//!
//! The public API is organised into four layers:
//!
//! - **[`desktop`]**: parse, edit and validate `.desktop` / `.directory` records
//! - **[`menu`]**: the resolver pipeline, the resolved tree and [`menu::MenuEditor`]
//! - **[`platform`]** and **[`config`]**: search paths, desktops, locales and user settings
//! - **[`commands`]**: top-level subcommand orchestration (`show`, `validate`, `edit`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod desktop;
pub mod error;
pub mod exec;
pub mod logging;
pub mod menu;
pub mod platform;
