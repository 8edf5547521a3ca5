//! Webserv Core Library
//!
//! This crate provides the configuration model consumed by the Webserv
//! runtime: the http/server/location tree, the primitive value types it is
//! built from, and the validation rules that decide whether a tree is usable.

pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Webserv version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
