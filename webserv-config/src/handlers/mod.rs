//! Directive handlers
//!
//! Each scope has a table from directive name to a function that validates
//! the arguments and applies them to the entity the scope is building. The
//! helpers in this module are the validation primitives shared by all three
//! tables.

pub mod global;
pub mod location;
pub mod server;

use crate::error::{ConfigError, ConfigResult, SyntaxError};
use crate::parser::context::ScopeKind;
use std::collections::HashMap;
use webserv_core::config::{ErrorPages, ReturnAction, Size, StatusClass, StatusCode};

/// A `name arg... ;` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    pub line: usize,
}

impl Directive {
    pub fn new(name: impl Into<String>, args: Vec<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            args,
            line,
        }
    }

    /// Arguments from `start` joined with single spaces
    pub fn joined(&self, start: usize) -> String {
        self.args.get(start..).map(|a| a.join(" ")).unwrap_or_default()
    }

    /// Build an `InvalidDirective` error about this directive
    pub fn invalid(&self, reason: impl AsRef<str>) -> ConfigError {
        SyntaxError::invalid_directive(
            self.line,
            format!(
                "Error processing directive '{}': {} at line {}",
                self.name,
                reason.as_ref(),
                self.line
            ),
        )
        .into()
    }
}

/// Function applying one directive to the entity of type `T`
pub type HandlerFn<T> = fn(&mut T, &Directive) -> ConfigResult<()>;

/// Per-scope lookup table from directive name to handler
pub struct DirectiveTable<T> {
    scope: ScopeKind,
    handlers: HashMap<&'static str, HandlerFn<T>>,
}

impl<T> DirectiveTable<T> {
    pub fn new(scope: ScopeKind) -> Self {
        Self {
            scope,
            handlers: HashMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, handler: HandlerFn<T>) -> Self {
        self.handlers.insert(name, handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Apply `directive` to `target`
    ///
    /// Unknown names are reported and skipped; malformed arguments fail.
    pub fn apply(&self, target: &mut T, directive: &Directive) -> ConfigResult<()> {
        match self.handlers.get(directive.name.as_str()) {
            Some(handler) => {
                handler(target, directive)?;
                tracing::debug!(
                    "Parsed directive '{}' with {} arguments at line {}",
                    directive.name,
                    directive.args.len(),
                    directive.line
                );
            }
            None => {
                tracing::warn!(
                    "Unknown {} directive: '{}' at line {}",
                    self.scope,
                    directive.name,
                    directive.line
                );
            }
        }
        Ok(())
    }
}

// ============================================================
// Validation primitives
// ============================================================

/// Require exactly `n` arguments
pub fn expect_args(d: &Directive, n: usize) -> ConfigResult<()> {
    if d.args.len() != n {
        return Err(SyntaxError::invalid_directive(
            d.line,
            format!(
                "Directive '{}' requires exactly {} argument(s), but got {} at line {}",
                d.name,
                n,
                d.args.len(),
                d.line
            ),
        )
        .into());
    }
    Ok(())
}

/// Require at least `n` arguments
pub fn expect_min_args(d: &Directive, n: usize) -> ConfigResult<()> {
    if d.args.len() < n {
        return Err(SyntaxError::invalid_directive(
            d.line,
            format!(
                "Directive '{}' requires at least {} argument(s), but got {} at line {}",
                d.name,
                n,
                d.args.len(),
                d.line
            ),
        )
        .into());
    }
    Ok(())
}

/// Digits only, no sign, no overflow
pub fn parse_unsigned(d: &Directive, value: &str) -> ConfigResult<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(d.invalid(format!("'{}' is not an unsigned integer", value)));
    }
    value
        .bytes()
        .try_fold(0u64, |acc, b| acc.checked_mul(10)?.checked_add(u64::from(b - b'0')))
        .ok_or_else(|| d.invalid(format!("'{}' is too large", value)))
}

/// Unsigned value that must fit in a `u32`
pub fn parse_u32(d: &Directive, value: &str) -> ConfigResult<u32> {
    let n = parse_unsigned(d, value)?;
    u32::try_from(n).map_err(|_| d.invalid(format!("'{}' is too large", value)))
}

/// File mode: base 8 when every digit is octal, else base 10; at most 0777
pub fn parse_permissions(d: &Directive, value: &str) -> ConfigResult<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(d.invalid(format!("'{}' is not a permission mode", value)));
    }
    let radix = if value.bytes().all(|b| b < b'8') { 8 } else { 10 };
    match u32::from_str_radix(value, radix) {
        Ok(mode) if mode <= 0o777 => Ok(mode),
        _ => Err(d.invalid(format!("permission mode '{}' must be between 0 and 0777", value))),
    }
}

/// `on` or `off`
pub fn parse_switch(d: &Directive, value: &str) -> ConfigResult<bool> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(d.invalid(format!("expected 'on' or 'off', got '{}'", value))),
    }
}

pub fn parse_size(d: &Directive, value: &str) -> ConfigResult<Size> {
    value.parse().map_err(|e: webserv_core::Error| d.invalid(e.to_string()))
}

pub fn parse_status(d: &Directive, value: &str) -> ConfigResult<StatusCode> {
    let n = parse_unsigned(d, value)?;
    u16::try_from(n)
        .ok()
        .and_then(|n| StatusCode::new(n).ok())
        .ok_or_else(|| {
            d.invalid(format!(
                "status code {} must be between {} and {}",
                value,
                StatusCode::MIN,
                StatusCode::MAX
            ))
        })
}

/// Convert a value-type failure into an error about this directive
pub fn value_error(d: &Directive) -> impl Fn(webserv_core::Error) -> ConfigError + '_ {
    move |e| match e {
        webserv_core::Error::InvalidValue { .. } => d.invalid(e.to_string()),
        other => other.into(),
    }
}

/// `return CODE target...`
///
/// Redirect codes join the rest into a target URL. Success and error codes
/// join the rest into a response body with one layer of double quotes
/// removed.
pub fn parse_return(d: &Directive) -> ConfigResult<ReturnAction> {
    expect_min_args(d, 2)?;
    let code = parse_status(d, &d.args[0])?;
    let rest = d.joined(1);

    match code.class() {
        StatusClass::Redirection => Ok(ReturnAction::Redirect { code, target: rest }),
        StatusClass::Success | StatusClass::ClientError | StatusClass::ServerError => {
            let body = rest
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .map(str::to_string)
                .unwrap_or(rest);
            Ok(ReturnAction::Content { code, body })
        }
        StatusClass::Informational => Err(d.invalid(format!(
            "status code {} cannot be used with 'return'",
            code
        ))),
    }
}

/// `error_page CODE... uri`
pub fn parse_error_page(d: &Directive, pages: &mut ErrorPages) -> ConfigResult<()> {
    expect_min_args(d, 2)?;
    let (uri, codes) = d.args.split_last().ok_or_else(|| d.invalid("missing uri"))?;
    if uri.is_empty() {
        return Err(d.invalid("error page uri must not be empty"));
    }

    for code in codes {
        let n = parse_unsigned(d, code)?;
        let status = u16::try_from(n)
            .ok()
            .and_then(|n| StatusCode::error(n).ok())
            .ok_or_else(|| d.invalid(format!("error code {} must be between 400 and 599", code)))?;
        pages.insert(status, uri.clone());
    }
    Ok(())
}

/// Non-empty single path argument
pub fn parse_path(d: &Directive) -> ConfigResult<String> {
    expect_args(d, 1)?;
    let path = &d.args[0];
    if path.is_empty() {
        return Err(d.invalid("path must not be empty"));
    }
    Ok(path.clone())
}
