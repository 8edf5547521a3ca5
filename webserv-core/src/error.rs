//! Error types for Webserv

use thiserror::Error;

/// Result type for Webserv configuration model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the configuration model
///
/// These are validation failures: they are raised by value-type parsing and
/// by the `validate()` passes that run once a block or the whole tree has
/// been built.
#[derive(Error, Debug)]
pub enum Error {
    /// The same listen binding was declared twice on one server
    #[error("Duplicate listen directive: {0}")]
    DuplicateListen(String),

    /// A path that cannot be used for the given purpose
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A required directive is absent
    #[error("Missing required directive: {0}")]
    MissingDirective(String),

    /// Two servers answer for the same binding and names
    #[error("Port conflict on {binding}: {reason}")]
    PortConflict { binding: String, reason: String },

    /// Unknown or malformed HTTP method
    #[error("Invalid HTTP method: '{0}'")]
    InvalidMethod(String),

    /// A value that failed to parse or is out of range
    #[error("Invalid {what} '{value}': {reason}")]
    InvalidValue {
        what: &'static str,
        value: String,
        reason: String,
    },

    /// Mutually exclusive settings
    #[error("Conflicting configuration: {0}")]
    Conflict(String),

    /// Serialized snapshot could not be decoded
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(what: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidValue {
            what,
            value: value.into(),
            reason: reason.into(),
        }
    }
}
