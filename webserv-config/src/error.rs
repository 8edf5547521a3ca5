//! Error types for the configuration compiler

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Grammar and directive-shape failures, always fatal to the current parse
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("{message}")]
    UnexpectedToken { line: usize, message: String },

    #[error("{message}")]
    UnexpectedEof { line: usize, message: String },

    #[error("{message}")]
    MissingSemicolon { line: usize, message: String },

    #[error("{message}")]
    MissingBrace { line: usize, message: String },

    #[error("{message}")]
    InvalidDirective { line: usize, message: String },
}

impl SyntaxError {
    pub fn invalid_directive(line: usize, message: impl Into<String>) -> Self {
        SyntaxError::InvalidDirective {
            line,
            message: message.into(),
        }
    }

    /// Line the error was detected on
    pub fn line(&self) -> usize {
        match self {
            SyntaxError::UnexpectedToken { line, .. }
            | SyntaxError::UnexpectedEof { line, .. }
            | SyntaxError::MissingSemicolon { line, .. }
            | SyntaxError::MissingBrace { line, .. }
            | SyntaxError::InvalidDirective { line, .. } => *line,
        }
    }
}

/// Failures locating or expanding configuration files
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Include depth {depth} exceeds the limit of {max} while resolving '{pattern}'", max = crate::include::MAX_DEPTH)]
    IncludeRecursion { pattern: String, depth: usize },

    /// Misuse of the parser machinery rather than a problem in the input
    #[error("Internal parser error: {0}")]
    Internal(String),
}

/// Configuration compiler error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Validation error: {0}")]
    Validation(#[from] webserv_core::Error),

    #[error("Load error: {0}")]
    Load(String),
}

impl ConfigError {
    /// Source line for syntax errors
    pub fn line(&self) -> Option<usize> {
        match self {
            ConfigError::Syntax(e) => Some(e.line()),
            _ => None,
        }
    }

    /// Map a filesystem failure on `path` into the taxonomy
    pub(crate) fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ResolutionError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into(),
            io::ErrorKind::PermissionDenied => ResolutionError::PermissionDenied {
                path: path.to_path_buf(),
            }
            .into(),
            _ => ConfigError::Load(format!("Failed to read {}: {}", path.display(), err)),
        }
    }
}

/// Result type for the configuration compiler
pub type ConfigResult<T> = Result<T, ConfigError>;
