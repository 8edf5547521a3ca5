//! Block parser
//!
//! Recursive descent over the token stream:
//!
//! ```text
//! document    := (directive | block)* Eof
//! block       := "http" "{" http-body | "server" "{" server-body
//! http-body   := (directive | "server" "{" server-body)* "}"
//! server-body := (directive | location)* "}"
//! location    := [modifier] PATH "{" (directive | limit-except)* "}"
//! limit-except:= METHOD+ "{" ("deny" "all" ";")* "}"
//! directive   := NAME STRING* ";"
//! ```
//!
//! Servers and locations are built inside their scope frame and only moved
//! into the parent once the closing brace has been read and the entity has
//! validated.

use crate::error::{ConfigResult, ResolutionError, SyntaxError};
use crate::handlers::{self, Directive};
use crate::parser::context::{ParserContext, Scope, ScopeFrame};
use crate::parser::lexer::{Token, TokenKind};
use std::collections::BTreeSet;
use webserv_core::config::{HttpConfig, HttpMethod, LocationMatch};

/// Map a location modifier to its match kind and `^~` priority
///
/// Returns `None` when the token is not a modifier and is itself the path.
pub fn location_modifier(token: &str) -> Option<(LocationMatch, bool)> {
    match token {
        "=" => Some((LocationMatch::Exact, false)),
        "~" => Some((LocationMatch::RegexCaseSensitive, false)),
        "~*" => Some((LocationMatch::RegexCaseInsensitive, false)),
        "^~" => Some((LocationMatch::Prefix, true)),
        _ => None,
    }
}

/// Parser state
pub struct BlockParser {
    ctx: ParserContext,
}

impl BlockParser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            ctx: ParserContext::new(tokens),
        }
    }

    /// Parse the whole stream into `config`
    pub fn parse_document(&mut self, config: &mut HttpConfig) -> ConfigResult<()> {
        while !self.ctx.is_eof() {
            let token = self.ctx.current()?.clone();
            match token.kind {
                _ if token.is_word("http") => self.parse_http(config)?,
                _ if token.is_word("server") => self.parse_server(config)?,
                TokenKind::String => self.parse_statement(config)?,
                _ => return Err(self.unexpected(&token)),
            }
        }
        Ok(())
    }

    // ========================================
    // Directives
    // ========================================

    /// Read `NAME STRING* ;`
    fn parse_directive(&mut self) -> ConfigResult<Directive> {
        let name = self.ctx.expect(TokenKind::String, "directive name")?;
        let mut args = Vec::new();

        loop {
            let token = self.ctx.current()?;
            match token.kind {
                TokenKind::String => {
                    args.push(token.text.clone());
                    self.ctx.advance()?;
                }
                TokenKind::Semicolon => {
                    self.ctx.advance()?;
                    return Ok(Directive::new(name.text, args, name.line));
                }
                TokenKind::BlockStart => {
                    return Err(SyntaxError::invalid_directive(
                        token.line,
                        format!(
                            "Unexpected '{{' after directive '{}' at line {} in {} context: did you mean to declare a block?",
                            name.text,
                            token.line,
                            self.ctx.scope().kind()
                        ),
                    )
                    .into());
                }
                TokenKind::BlockEnd | TokenKind::Eof => {
                    return Err(SyntaxError::MissingSemicolon {
                        line: name.line,
                        message: format!(
                            "Expected semicolon after directive '{}' at line {}",
                            name.text, name.line
                        ),
                    }
                    .into());
                }
            }
        }
    }

    /// Read a directive and hand it to the innermost scope's table
    fn parse_statement(&mut self, config: &mut HttpConfig) -> ConfigResult<()> {
        let directive = self.parse_directive()?;
        match &mut self.ctx.scope_mut().scope {
            Scope::Global | Scope::Http => handlers::global::TABLE.apply(config, &directive),
            Scope::Server(server) => handlers::server::TABLE.apply(server.as_mut(), &directive),
            Scope::Location(location) => handlers::location::TABLE.apply(location.as_mut(), &directive),
        }
    }

    fn unexpected(&self, token: &Token) -> crate::error::ConfigError {
        SyntaxError::UnexpectedToken {
            line: token.line,
            message: format!(
                "Unexpected token {} at line {} in {}",
                token,
                token.line,
                self.ctx.scope_trail()
            ),
        }
        .into()
    }

    fn unexpected_eof(&self, block: &str, start_line: usize) -> crate::error::ConfigError {
        let line = self.ctx.current().map_or(start_line, |t| t.line);
        SyntaxError::UnexpectedEof {
            line,
            message: format!(
                "Unexpected end of file in {} block starting at line {}",
                block, start_line
            ),
        }
        .into()
    }

    fn unknown_block(&self, token: &Token) -> crate::error::ConfigError {
        SyntaxError::invalid_directive(
            token.line,
            format!(
                "Unknown block '{}' in {} context at line {}",
                token.text,
                self.ctx.scope().kind(),
                token.line
            ),
        )
        .into()
    }

    // ========================================
    // http
    // ========================================

    fn parse_http(&mut self, config: &mut HttpConfig) -> ConfigResult<()> {
        let start = self.ctx.advance()?;
        self.ctx.expect(TokenKind::BlockStart, "http block")?;
        self.ctx.push(ScopeFrame::new(Scope::Http, "http", start.line));

        loop {
            let token = self.ctx.current()?.clone();
            match token.kind {
                TokenKind::BlockEnd => {
                    self.ctx.advance()?;
                    break;
                }
                TokenKind::Eof => return Err(self.unexpected_eof("http", start.line)),
                _ if token.is_word("server") => self.parse_server(config)?,
                _ if token.is_word("http") || token.is_word("location") => {
                    return Err(self.unknown_block(&token));
                }
                TokenKind::String => self.parse_statement(config)?,
                _ => return Err(self.unexpected(&token)),
            }
        }

        self.ctx.pop()?;
        Ok(())
    }

    // ========================================
    // server
    // ========================================

    fn parse_server(&mut self, config: &mut HttpConfig) -> ConfigResult<()> {
        let start = self.ctx.advance()?;
        self.ctx.expect(TokenKind::BlockStart, "server block")?;
        let server = Box::new(config.child_server());
        self.ctx.push(ScopeFrame::new(Scope::Server(server), "server", start.line));

        loop {
            let token = self.ctx.current()?.clone();
            match token.kind {
                TokenKind::BlockEnd => {
                    self.ctx.advance()?;
                    break;
                }
                TokenKind::Eof => return Err(self.unexpected_eof("server", start.line)),
                _ if token.is_word("location") => self.parse_location()?,
                _ if token.is_word("server") || token.is_word("http") => {
                    return Err(self.unknown_block(&token));
                }
                TokenKind::String => self.parse_statement(config)?,
                _ => return Err(self.unexpected(&token)),
            }
        }

        let frame = self.ctx.pop()?;
        let closed = frame.kind();
        let Scope::Server(server) = frame.scope else {
            return Err(ResolutionError::Internal(format!(
                "closed {} while parsing a server block",
                closed
            ))
            .into());
        };
        server.validate()?;
        tracing::debug!(
            "Parsed server block at line {} ({} locations)",
            start.line,
            server.locations.len()
        );
        config.servers.push(*server);
        Ok(())
    }

    // ========================================
    // location
    // ========================================

    /// `location [modifier] PATH {`
    fn parse_location_header(&mut self) -> ConfigResult<(LocationMatch, bool, String)> {
        let first = self.ctx.expect(TokenKind::String, "location path")?;
        let header = match location_modifier(&first.text) {
            Some((kind, priority)) => {
                let path = self.ctx.expect(TokenKind::String, "location path")?;
                (kind, priority, path.text)
            }
            None if first.text.starts_with('@') => (LocationMatch::Exact, false, first.text),
            None => (LocationMatch::Prefix, false, first.text),
        };

        let next = self.ctx.current()?;
        if !next.is(TokenKind::BlockStart) {
            return Err(SyntaxError::MissingBrace {
                line: next.line,
                message: format!(
                    "Expected '{{' after location '{}' but found {} at line {}",
                    header.2, next, next.line
                ),
            }
            .into());
        }
        self.ctx.advance()?;
        Ok(header)
    }

    fn parse_location(&mut self) -> ConfigResult<()> {
        let start = self.ctx.advance()?;
        let (kind, priority, path) = self.parse_location_header()?;

        let mut location = match &self.ctx.scope().scope {
            Scope::Server(server) => server.child_location(kind, path.clone()),
            other => {
                return Err(ResolutionError::Internal(format!(
                    "location block opened in {} scope",
                    other.kind()
                ))
                .into());
            }
        };
        location.priority = priority;
        self.ctx.push(ScopeFrame::new(
            Scope::Location(Box::new(location)),
            path,
            start.line,
        ));

        loop {
            let token = self.ctx.current()?.clone();
            match token.kind {
                TokenKind::BlockEnd => {
                    self.ctx.advance()?;
                    break;
                }
                TokenKind::Eof => return Err(self.unexpected_eof("location", start.line)),
                _ if token.is_word("limit_except") => self.parse_limit_except()?,
                TokenKind::String if matches!(token.text.as_str(), "location" | "server" | "http") => {
                    return Err(self.unknown_block(&token));
                }
                TokenKind::String => self.parse_statement_in_location()?,
                _ => return Err(self.unexpected(&token)),
            }
        }

        let frame = self.ctx.pop()?;
        let closed = frame.kind();
        let Scope::Location(location) = frame.scope else {
            return Err(ResolutionError::Internal(format!(
                "closed {} while parsing a location block",
                closed
            ))
            .into());
        };
        location.validate()?;

        match &mut self.ctx.scope_mut().scope {
            Scope::Server(server) => {
                server.add_location(*location)?;
                Ok(())
            }
            other => Err(ResolutionError::Internal(format!(
                "location closed into {} scope",
                other.kind()
            ))
            .into()),
        }
    }

    fn parse_statement_in_location(&mut self) -> ConfigResult<()> {
        let directive = self.parse_directive()?;
        match &mut self.ctx.scope_mut().scope {
            Scope::Location(location) => handlers::location::TABLE.apply(location.as_mut(), &directive),
            other => Err(ResolutionError::Internal(format!(
                "location directive applied in {} scope",
                other.kind()
            ))
            .into()),
        }
    }

    // ========================================
    // limit_except
    // ========================================

    fn parse_limit_except(&mut self) -> ConfigResult<()> {
        let start = self.ctx.advance()?;

        let mut methods = BTreeSet::new();
        while self.ctx.check(TokenKind::String) {
            let token = self.ctx.advance()?;
            methods.insert(token.text.parse::<HttpMethod>()?);
        }
        if methods.is_empty() {
            return Err(SyntaxError::invalid_directive(
                start.line,
                format!("limit_except requires at least one method at line {}", start.line),
            )
            .into());
        }

        let next = self.ctx.current()?;
        if !next.is(TokenKind::BlockStart) {
            return Err(SyntaxError::MissingBrace {
                line: next.line,
                message: format!(
                    "Expected '{{' after limit_except methods but found {} at line {}",
                    next, next.line
                ),
            }
            .into());
        }
        self.ctx.advance()?;

        loop {
            let token = self.ctx.current()?.clone();
            match token.kind {
                TokenKind::BlockEnd => {
                    self.ctx.advance()?;
                    break;
                }
                TokenKind::Eof => return Err(self.unexpected_eof("limit_except", start.line)),
                TokenKind::String => {
                    let directive = self.parse_directive()?;
                    if directive.name == "deny" {
                        if directive.args != ["all"] {
                            return Err(SyntaxError::invalid_directive(
                                directive.line,
                                format!(
                                    "Expected 'deny all;' in limit_except block at line {}",
                                    directive.line
                                ),
                            )
                            .into());
                        }
                    } else {
                        tracing::warn!(
                            "Ignoring '{}' inside limit_except block at line {}",
                            directive.name,
                            directive.line
                        );
                    }
                }
                _ => return Err(self.unexpected(&token)),
            }
        }

        match &mut self.ctx.scope_mut().scope {
            Scope::Location(location) => {
                tracing::debug!(
                    "limit_except at line {} restricts '{}' to {:?}",
                    start.line,
                    location.path,
                    methods
                );
                location.allowed_methods = methods;
                Ok(())
            }
            other => Err(ResolutionError::Internal(format!(
                "limit_except parsed in {} scope",
                other.kind()
            ))
            .into()),
        }
    }
}

/// Parse a token stream into a fresh configuration
pub fn parse_tokens(tokens: Vec<Token>, config: &mut HttpConfig) -> ConfigResult<()> {
    let mut parser = BlockParser::new(tokens);
    parser.parse_document(config)
}
