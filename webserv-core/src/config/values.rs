//! Primitive value types used by the configuration model
//!
//! Each type validates itself on construction, so a configuration tree that
//! holds one is known to hold a legal value.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================
// Status codes
// ============================================================

/// HTTP status code in the range 100-599
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct StatusCode(u16);

/// Response class of a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusCode {
    pub const MIN: u16 = 100;
    pub const MAX: u16 = 599;

    /// Validate a numeric status code
    pub fn new(code: u16) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&code) {
            Ok(Self(code))
        } else {
            Err(Error::invalid(
                "status code",
                code.to_string(),
                format!("must be between {} and {}", Self::MIN, Self::MAX),
            ))
        }
    }

    /// Status code usable by `error_page` (400-599)
    pub fn error(code: u16) -> Result<Self> {
        let status = Self::new(code)?;
        if status.is_error() {
            Ok(status)
        } else {
            Err(Error::invalid(
                "error code",
                code.to_string(),
                "must be between 400 and 599",
            ))
        }
    }

    pub fn class(self) -> StatusClass {
        match self.0 {
            100..=199 => StatusClass::Informational,
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirection,
            400..=499 => StatusClass::ClientError,
            _ => StatusClass::ServerError,
        }
    }

    pub fn is_redirection(self) -> bool {
        self.class() == StatusClass::Redirection
    }

    pub fn is_error(self) -> bool {
        matches!(self.class(), StatusClass::ClientError | StatusClass::ServerError)
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self> {
        Self::new(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================
// Sizes
// ============================================================

/// Byte size written as `<digits>[k|m|g][b]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Size(u64);

impl Size {
    pub const KIB: u64 = 1024;
    pub const MIB: u64 = 1024 * 1024;
    pub const GIB: u64 = 1024 * 1024 * 1024;

    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn mib(n: u64) -> Self {
        Self(n * Self::MIB)
    }

    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for Size {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let body = lower.strip_suffix('b').unwrap_or(&lower);

        let (digits, multiplier) = match body.as_bytes().last() {
            Some(b'k') => (&body[..body.len() - 1], Self::KIB),
            Some(b'm') => (&body[..body.len() - 1], Self::MIB),
            Some(b'g') => (&body[..body.len() - 1], Self::GIB),
            _ => (body, 1),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid("size", s, "expected digits with an optional k, m or g unit"));
        }

        digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .map(Size)
            .ok_or_else(|| Error::invalid("size", s, "value is too large"))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n != 0 && n % Self::GIB == 0 {
            write!(f, "{}g", n / Self::GIB)
        } else if n != 0 && n % Self::MIB == 0 {
            write!(f, "{}m", n / Self::MIB)
        } else if n != 0 && n % Self::KIB == 0 {
            write!(f, "{}k", n / Self::KIB)
        } else {
            write!(f, "{}", n)
        }
    }
}

// ============================================================
// HTTP methods
// ============================================================

/// Request method accepted by `limit_except`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "CONNECT" => Ok(HttpMethod::Connect),
            "OPTIONS" => Ok(HttpMethod::Options),
            "TRACE" => Ok(HttpMethod::Trace),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Upload access
// ============================================================

/// Unix-style permission mask built from `user:rw group:r all:r` tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadAccess(u32);

impl UploadAccess {
    pub const NONE: UploadAccess = UploadAccess(0);

    pub fn mode(self) -> u32 {
        self.0
    }

    fn class_shift(who: &str) -> Option<u32> {
        match who {
            "user" => Some(6),
            "group" => Some(3),
            "all" => Some(0),
            _ => None,
        }
    }
}

impl FromStr for UploadAccess {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self::NONE);
        }
        if s.is_empty() {
            return Err(Error::invalid("upload access", s, "empty access list"));
        }

        let mut mode = 0;
        for token in s.split_whitespace() {
            let lower = token.to_ascii_lowercase();
            let (who, perms) = lower
                .split_once(':')
                .ok_or_else(|| Error::invalid("upload access", token, "expected who:perms"))?;
            let shift = Self::class_shift(who)
                .ok_or_else(|| Error::invalid("upload access", token, "who must be user, group or all"))?;
            if perms.is_empty() {
                return Err(Error::invalid("upload access", token, "missing permissions"));
            }

            let mut bits = 0;
            for c in perms.chars() {
                let bit = match c {
                    'r' => 0o4,
                    'w' => 0o2,
                    _ => return Err(Error::invalid("upload access", token, "permissions must be r or w")),
                };
                if bits & bit != 0 {
                    return Err(Error::invalid("upload access", token, "permission repeated"));
                }
                bits |= bit;
            }
            mode |= bits << shift;
        }

        Ok(UploadAccess(mode))
    }
}
