//! Webserv Configuration Compiler
//!
//! This crate compiles nginx-style configuration files into the
//! [`HttpConfig`] tree defined in `webserv-core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use webserv_config::compile_str;
//!
//! let source = r#"
//!     http {
//!         server {
//!             listen 8080;
//!             server_name example.com;
//!             root /var/www;
//!
//!             location /api {
//!                 limit_except GET POST { deny all; }
//!             }
//!         }
//!     }
//! "#;
//!
//! let config = compile_str(source).unwrap();
//! ```

pub mod compiler;
pub mod error;
pub mod handlers;
pub mod include;
pub mod parser;
pub mod provider;

pub use compiler::{Compiler, IncludePolicy};
pub use error::{ConfigError, ConfigResult, ResolutionError, SyntaxError};
pub use include::{glob_match, IncludeResolver, MAX_DEPTH};
pub use parser::{tokenize, Token, TokenKind};
pub use provider::ConfigProvider;

use std::path::Path;
use webserv_core::config::{ConfigLoader, HttpConfig, SnapshotFormat};

/// Parse and validate one configuration file, leaving includes unexpanded
pub fn parse_file(path: impl AsRef<Path>) -> ConfigResult<HttpConfig> {
    Compiler::default().parse_file(path)
}

/// Merge servers from files matching `pattern`, logging failures
pub fn merge_includes(config: &mut HttpConfig, pattern: &str) -> ConfigResult<()> {
    Compiler::default().merge_includes(config, pattern)
}

/// Whole-tree validation of a configuration with every include merged
pub fn validate_configuration(config: &HttpConfig) -> ConfigResult<()> {
    Compiler::default().validate_configuration(config)
}

/// Load a JSON or TOML snapshot
pub fn load_snapshot(path: &Path) -> ConfigResult<HttpConfig> {
    ConfigLoader::load(path).map_err(|e| match e {
        webserv_core::Error::Io(io) => ConfigError::from_io(path, io),
        other => other.into(),
    })
}

/// Load a configuration file: snapshots by extension, everything else as DSL
pub fn compile_file(path: impl AsRef<Path>) -> ConfigResult<HttpConfig> {
    let path = path.as_ref();
    match SnapshotFormat::from_path(path) {
        Some(_) => load_snapshot(path),
        None => Compiler::default().compile(path),
    }
}

/// Compile configuration text
///
/// Relative includes resolve against the working directory.
pub fn compile_str(source: &str) -> ConfigResult<HttpConfig> {
    let compiler = Compiler::default();
    let mut config = compiler.parse_source(source, None)?;
    compiler.merge_declared_includes(&mut config)?;
    compiler.validate_configuration(&config)?;
    Ok(config)
}
