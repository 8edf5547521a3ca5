//! Parser module for the server configuration language
//!
//! This module provides the lexer, the scope-tracking parser context and
//! the block parser that builds an [`HttpConfig`] from tokens.

pub mod block;
pub mod context;
pub mod lexer;

pub use block::{location_modifier, parse_tokens, BlockParser};
pub use context::{ParserContext, Scope, ScopeFrame, ScopeKind};
pub use lexer::{tokenize, validate_braces, LexResult, Token, TokenKind};

use crate::error::ConfigResult;
use webserv_core::config::HttpConfig;

/// Tokenize and parse `source` into `config`
///
/// Structural validation of the finished document is left to the caller.
pub fn parse_into(source: &str, config: &mut HttpConfig) -> ConfigResult<()> {
    let tokens = tokenize(source)?;
    parse_tokens(tokens, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, SyntaxError};

    #[test]
    fn test_parse_into() {
        let mut config = HttpConfig::default();
        parse_into("http { server { listen 80; root /var/www; } }", &mut config).unwrap();
        assert_eq!(config.servers.len(), 1);
    }

    #[test]
    fn test_brace_errors_surface_before_parsing() {
        let mut config = HttpConfig::default();
        let err = parse_into("server { listen 80; root /x;\n", &mut config).unwrap_err();
        assert!(matches!(err, ConfigError::Syntax(SyntaxError::MissingBrace { .. })));
        assert!(config.servers.is_empty());
    }
}
