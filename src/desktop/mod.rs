//! Descriptor records: `.desktop` applications and `.directory` menus.
//!
//! - [`ini`] reads and writes the grouped key/value format
//! - [`entry`] gives typed, locale-aware access to the keys menus care about
//! - [`show_in`] evaluates `OnlyShowIn` / `NotShowIn` against running desktops
//! - [`validation`] reports format violations without affecting resolution

pub mod entry;
pub mod ini;
pub mod show_in;
pub mod validation;

pub use entry::DesktopEntry;
pub use validation::{Severity, ValidationIssue, validate_entry};
