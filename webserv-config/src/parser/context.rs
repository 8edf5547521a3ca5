//! Parser context
//!
//! A read cursor over one token stream plus the stack of open scopes. Each
//! frame owns the entity its block is building, so an error anywhere inside
//! a block drops the half-built server or location together with the
//! context. The only way an entity leaves the stack is [`ParserContext::pop`].

use crate::error::{ConfigResult, ResolutionError, SyntaxError};
use crate::parser::lexer::{Token, TokenKind};
use std::fmt;
use webserv_core::config::{LocationConfig, ServerConfig};

/// Nesting level of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Http,
    Server,
    Location,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeKind::Global => "global",
            ScopeKind::Http => "http",
            ScopeKind::Server => "server",
            ScopeKind::Location => "location",
        };
        f.write_str(name)
    }
}

/// Scope payload: the entity under construction, if the scope builds one
#[derive(Debug)]
pub enum Scope {
    Global,
    Http,
    Server(Box<ServerConfig>),
    Location(Box<LocationConfig>),
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Global => ScopeKind::Global,
            Scope::Http => ScopeKind::Http,
            Scope::Server(_) => ScopeKind::Server,
            Scope::Location(_) => ScopeKind::Location,
        }
    }
}

/// One open block
#[derive(Debug)]
pub struct ScopeFrame {
    pub scope: Scope,
    pub name: String,
    pub start_line: usize,
}

impl ScopeFrame {
    pub fn new(scope: Scope, name: impl Into<String>, start_line: usize) -> Self {
        Self {
            scope,
            name: name.into(),
            start_line,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.scope.kind()
    }
}

impl fmt::Display for ScopeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} context ({}) starting at line {}", self.kind(), self.name, self.start_line)
    }
}

/// Cursor and scope stack for a single parse pass
pub struct ParserContext {
    tokens: Vec<Token>,
    pos: usize,
    global: ScopeFrame,
    nested: Vec<ScopeFrame>,
}

impl ParserContext {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            global: ScopeFrame::new(Scope::Global, "global", 1),
            nested: Vec::new(),
        }
    }

    // ========================================
    // Cursor
    // ========================================

    /// Token under the cursor
    pub fn current(&self) -> ConfigResult<&Token> {
        self.tokens.get(self.pos).ok_or_else(|| {
            ResolutionError::Internal(format!(
                "read past the end of the token stream at position {}",
                self.pos
            ))
            .into()
        })
    }

    /// Token after the cursor
    pub fn peek(&self) -> ConfigResult<&Token> {
        self.tokens.get(self.pos + 1).ok_or_else(|| {
            ResolutionError::Internal(format!(
                "lookahead past the end of the token stream at position {}",
                self.pos + 1
            ))
            .into()
        })
    }

    /// Consume the token under the cursor
    pub fn advance(&mut self) -> ConfigResult<Token> {
        let token = self.current()?.clone();
        self.pos += 1;
        Ok(token)
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| t.is(kind))
    }

    pub fn is_eof(&self) -> bool {
        self.tokens.get(self.pos).is_none_or(|t| t.is(TokenKind::Eof))
    }

    /// Consume a token of `kind` or fail with a message naming `context`
    pub fn expect(&mut self, kind: TokenKind, context: &str) -> ConfigResult<Token> {
        let token = self.current()?;
        if token.is(kind) {
            return self.advance();
        }

        let message = format!(
            "Expected {} for {} but found {} at line {} in {}",
            kind,
            context,
            token,
            token.line,
            self.scope_trail()
        );
        let line = token.line;
        if token.is(TokenKind::Eof) {
            Err(SyntaxError::UnexpectedEof { line, message }.into())
        } else {
            Err(SyntaxError::UnexpectedToken { line, message }.into())
        }
    }

    // ========================================
    // Scope stack
    // ========================================

    pub fn push(&mut self, frame: ScopeFrame) {
        tracing::trace!("Entering {}", frame);
        self.nested.push(frame);
    }

    /// Close the innermost scope and hand back what it built
    pub fn pop(&mut self) -> ConfigResult<ScopeFrame> {
        let frame = self.nested.pop().ok_or_else(|| {
            ResolutionError::Internal("attempted to close the global scope".to_string())
        })?;
        tracing::trace!("Leaving {}", frame);
        Ok(frame)
    }

    pub fn scope(&self) -> &ScopeFrame {
        self.nested.last().unwrap_or(&self.global)
    }

    pub fn scope_mut(&mut self) -> &mut ScopeFrame {
        self.nested.last_mut().unwrap_or(&mut self.global)
    }

    /// Human readable path through the open scopes
    pub fn scope_trail(&self) -> String {
        let path = std::iter::once(&self.global)
            .chain(self.nested.iter())
            .map(|f| f.kind().to_string())
            .collect::<Vec<_>>()
            .join(" > ");
        let inner = self.scope();
        format!("{} [{}]", inner, path)
    }
}
