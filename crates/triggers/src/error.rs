//! Error types and result alias for the triggers crate.
use std::{path::PathBuf, result::Result as StdResult};

use thiserror::Error;

use crate::NodeId;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced while building, editing, loading or saving a trigger tree.
#[derive(Error, Debug)]
pub enum Error {
    /// The word-character pattern does not compile.
    #[error("Invalid word character pattern '{pattern}': {message}")]
    InvalidWordChars {
        /// Offending pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },
    /// The window title filter does not compile.
    #[error("Invalid window filter '{pattern}': {message}")]
    InvalidWindowFilter {
        /// Offending pattern.
        pattern: String,
        /// Compiler message.
        message: String,
    },
    /// A persisted node lacks a field that has no default.
    #[error("{node}: missing required field '{field}'")]
    MissingField {
        /// Node label, e.g. `phrase 'signature'`.
        node: String,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A persisted node is present but malformed.
    #[error("{node}: {message}")]
    InvalidNode {
        /// Node label, e.g. `folder 'root'`.
        node: String,
        /// What was wrong with it.
        message: String,
    },
    /// The persisted document is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Reading or writing the tree file failed.
    #[error("I/O error at {}: {message}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// OS message.
        message: String,
    },
    /// No live node has this id.
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),
    /// Children can only be added to folders.
    #[error("Node {0:?} is not a folder")]
    NotAFolder(NodeId),
    /// The operation needs a node of a different kind.
    #[error("Node {id:?} is not a {expected}")]
    WrongKind {
        /// Node passed in.
        id: NodeId,
        /// Kind the operation needed.
        expected: &'static str,
    },
    /// The root folder cannot be removed.
    #[error("The root folder cannot be removed")]
    RemoveRoot,
}
