//! Domain-specific error types for the menu engine.
//!
//! Library modules return typed errors (e.g., [`ParseError`], [`RecordError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! Soft failures never show up here: a missing search directory, an absent
//! move source or a duplicate desktop-file id is logged and skipped.
//!
//! # Error hierarchy
//!
//! ```text
//! MenuError
//! ├── Parse(ParseError)   — definition documents and merge recursion
//! ├── Record(RecordError) — descriptor (.desktop / .directory) files
//! └── Edit(EditError)     — editor lookups, invalid moves and persistence
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the menu engine.
#[derive(Error, Debug)]
pub enum MenuError {
    /// A definition document could not be parsed.
    #[error("Menu parse error: {0}")]
    Parse(#[from] ParseError),

    /// A descriptor record could not be read or written.
    #[error("Descriptor error: {0}")]
    Record(#[from] RecordError),

    /// A structural edit could not be carried out.
    #[error("Edit error: {0}")]
    Edit(#[from] EditError),
}

/// Errors raised while reading a menu definition document.
#[derive(Error, Debug)]
pub enum ParseError {
    /// No definition document exists at any of the searched locations.
    #[error("Menu file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The document does not carry the `.menu` extension.
    #[error("Not a .menu file: {}", .0.display())]
    NotMenuFile(PathBuf),

    /// The document is not well-formed markup.
    #[error("Invalid menu markup in {}: {message}", .path.display())]
    InvalidMarkup {
        /// Path of the offending document.
        path: PathBuf,
        /// Description reported by the markup reader.
        message: String,
    },

    /// The document root is not a `<Menu>` element.
    #[error("Root element of {} is not <Menu>", .0.display())]
    NotAMenuDocument(PathBuf),

    /// An element whose text content is mandatory was empty.
    #[error("<{element}> cannot be empty in {}", .path.display())]
    EmptyElement {
        /// Name of the empty element.
        element: String,
        /// Path of the document containing it.
        path: PathBuf,
    },

    /// A merge directive led back to a document that was already merged.
    ///
    /// Only reported in strict mode; otherwise the repeated merge is dropped.
    #[error("Infinite MergeFile loop detected: {}", .0.display())]
    MergeLoop(PathBuf),

    /// A document referenced by a merge directive failed to load.
    ///
    /// Only reported in strict mode; otherwise the merge is skipped.
    #[error("Failed to merge {}: {source}", .path.display())]
    MergeFailed {
        /// Path of the merged document.
        path: PathBuf,
        /// Underlying failure.
        source: Box<ParseError>,
    },

    /// An I/O error occurred while reading a definition document.
    #[error("IO error reading menu file {}: {source}", .path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised while reading or writing a descriptor record.
#[derive(Error, Debug)]
pub enum RecordError {
    /// None of the accepted group headers is present.
    #[error("[{header}]-Header missing in {}", .path.display())]
    MissingHeader {
        /// The preferred header name.
        header: String,
        /// Path of the record.
        path: PathBuf,
    },

    /// A key/value line appeared before any group header.
    #[error("Key outside of any group at line {line} in {}", .path.display())]
    ItemOutsideGroup {
        /// One-based line number.
        line: usize,
        /// Path of the record.
        path: PathBuf,
    },

    /// A write targeted a group that does not exist.
    #[error("No group [{group}] in {}", .path.display())]
    NoGroup {
        /// Requested group.
        group: String,
        /// Path of the record.
        path: PathBuf,
    },

    /// An I/O error occurred while reading or writing a record.
    #[error("IO error on descriptor file {}: {source}", .path.display())]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised by the menu editor.
#[derive(Error, Debug)]
pub enum EditError {
    /// A positional reference does not name an item of the parent menu.
    #[error("Item not found in menu '{menu}'")]
    UnknownItem {
        /// Path of the menu that was searched.
        menu: String,
    },

    /// A submenu cannot be moved below itself.
    #[error("Cannot move menu '{menu}' into '{target}'")]
    InvalidMove {
        /// Path of the menu being moved.
        menu: String,
        /// Path of the requested new parent.
        target: String,
    },

    /// The user's definition document exists but is not valid markup.
    #[error("Invalid user menu file: {0}")]
    Document(#[from] ParseError),

    /// A descriptor record could not be written.
    #[error("Failed to write descriptor: {0}")]
    Record(#[from] RecordError),

    /// The definition document could not be written.
    #[error("IO error writing {}: {source}", .path.display())]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
