// Error types
// Every fallible operation in the library returns one of these

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the record store and its query front end
#[derive(Error, Debug)]
pub enum Error {
    /// A plain string reached an entry point that only takes structured templates
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// The store file could not be opened, read or locked
    #[error("Connection error on '{}': {reason}", .path.display())]
    Connection { path: PathBuf, reason: String },

    #[error("SQL parsing error: {0}")]
    Parse(String),

    #[error("Unsupported SQL: {0}")]
    Unsupported(String),

    #[error("Incorrect number of bindings supplied: the statement uses {expected}, {supplied} supplied")]
    BindingCount { expected: usize, supplied: usize },

    #[error("No value supplied for parameter '{0}'")]
    MissingParameter(String),

    #[error("No such table: {0}")]
    NoSuchTable(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("No such column: {0}")]
    NoSuchColumn(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn connection(path: &Path, reason: impl Into<String>) -> Self {
        Error::Connection {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
