//! Server (virtual host) configuration

use super::{default_index, error_pages_serde, ErrorPages, LocationConfig, LocationMatch, ReturnAction, Size};
use super::{DEFAULT_BODY_SIZE, MAX_BODY_SIZE};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One `listen` binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenAddr {
    /// Bound address; `None` listens on every interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub port: u16,
}

impl ListenAddr {
    pub const DEFAULT_PORT: u16 = 80;

    pub fn new(host: Option<String>, port: u16) -> Self {
        Self { host, port }
    }

    pub fn is_wildcard(&self) -> bool {
        self.host.is_none()
    }

    /// Do two bindings compete for the same socket?
    pub fn overlaps(&self, other: &ListenAddr) -> bool {
        self.port == other.port
            && (self.is_wildcard() || other.is_wildcard() || self.host == other.host)
    }

    fn parse_port(input: &str, port: &str) -> Result<u16> {
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid("listen", input, "port must be numeric"));
        }
        match port.parse::<u16>() {
            Ok(p) if p > 0 => Ok(p),
            _ => Err(Error::invalid("listen", input, "port must be between 1 and 65535")),
        }
    }

    fn normalize_host(host: &str) -> Option<String> {
        match host {
            "" | "*" | "0.0.0.0" | "::" => None,
            h => Some(h.to_ascii_lowercase()),
        }
    }
}

impl FromStr for ListenAddr {
    type Err = Error;

    /// Accepts `port`, `host:port`, `*:port`, `[v6]:port` and bare `host`
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::invalid("listen", s, "empty address"));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| Error::invalid("listen", s, "unterminated IPv6 address"))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Self::parse_port(s, port)?,
                None if tail.is_empty() => Self::DEFAULT_PORT,
                None => return Err(Error::invalid("listen", s, "unexpected text after IPv6 address")),
            };
            return Ok(Self::new(Self::normalize_host(host), port));
        }

        if s.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self::new(None, Self::parse_port(s, s)?));
        }

        match s.rsplit_once(':') {
            Some((host, _)) if host.contains(':') => {
                Err(Error::invalid("listen", s, "IPv6 addresses must be bracketed"))
            }
            Some((host, port)) => Ok(Self::new(Self::normalize_host(host), Self::parse_port(s, port)?)),
            None => Ok(Self::new(Self::normalize_host(s), Self::DEFAULT_PORT)),
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            None => write!(f, "*:{}", self.port),
            Some(h) if h.contains(':') => write!(f, "[{}]:{}", h, self.port),
            Some(h) => write!(f, "{}:{}", h, self.port),
        }
    }
}

/// Server block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub listens: Vec<ListenAddr>,

    #[serde(default)]
    pub server_names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(default = "default_index")]
    pub index: Vec<String>,

    #[serde(default, with = "error_pages_serde")]
    pub error_pages: ErrorPages,

    #[serde(default = "default_body_size")]
    pub client_max_body_size: Size,

    /// Marked with `listen ... default_server`
    #[serde(default)]
    pub default_server: bool,

    #[serde(default, rename = "return", skip_serializing_if = "Option::is_none")]
    pub return_action: Option<ReturnAction>,

    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

fn default_body_size() -> Size {
    DEFAULT_BODY_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listens: Vec::new(),
            server_names: Vec::new(),
            root: None,
            index: default_index(),
            error_pages: ErrorPages::new(),
            client_max_body_size: DEFAULT_BODY_SIZE,
            default_server: false,
            return_action: None,
            locations: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a location that starts from this server's inheritable settings
    pub fn child_location(&self, match_kind: LocationMatch, path: impl Into<String>) -> LocationConfig {
        let mut location = LocationConfig::new(match_kind, path);
        location.inherit_root(self.root.clone());
        location.index = self.index.clone();
        location.error_pages = self.error_pages.clone();
        location.client_max_body_size = self.client_max_body_size;
        location
    }

    pub fn add_listen(&mut self, listen: ListenAddr) -> Result<()> {
        if self.listens.contains(&listen) {
            return Err(Error::DuplicateListen(listen.to_string()));
        }
        self.listens.push(listen);
        Ok(())
    }

    pub fn add_location(&mut self, location: LocationConfig) -> Result<()> {
        if self.locations.iter().any(|l| l.same_target(&location)) {
            return Err(Error::InvalidPath {
                path: location.path,
                reason: "duplicate location".to_string(),
            });
        }
        self.locations.push(location);
        Ok(())
    }

    /// Serves requests that match no other server on its port
    pub fn is_default(&self) -> bool {
        self.default_server || self.server_names.is_empty()
    }

    pub fn listens_on(&self, port: u16) -> bool {
        self.listens.iter().any(|l| l.port == port)
    }

    /// Case-insensitive host match supporting `*.example.com` and `www.example.*`
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
        self.server_names.iter().any(|name| name_matches(&name.to_ascii_lowercase(), &host))
    }

    fn names_overlap(&self, other: &ServerConfig) -> bool {
        if self.server_names.is_empty() && other.server_names.is_empty() {
            return true;
        }
        self.server_names.iter().any(|a| {
            other
                .server_names
                .iter()
                .any(|b| a.eq_ignore_ascii_case(b))
        })
    }

    /// A binding shared with `other` under an overlapping name
    pub fn conflict_with(&self, other: &ServerConfig) -> Option<&ListenAddr> {
        if !self.names_overlap(other) {
            return None;
        }
        self.listens
            .iter()
            .find(|mine| other.listens.iter().any(|theirs| mine.overlaps(theirs)))
    }

    /// Pick the location serving `path`
    ///
    /// Exact matches win outright. A `^~` prefix that is the longest prefix
    /// match stops the search; otherwise the first matching regex location
    /// wins, falling back to the longest prefix.
    pub fn find_location(&self, path: &str) -> Option<&LocationConfig> {
        if let Some(exact) = self
            .locations
            .iter()
            .find(|l| l.match_kind == LocationMatch::Exact && l.matches(path))
        {
            return Some(exact);
        }

        let longest_prefix = self
            .locations
            .iter()
            .filter(|l| l.match_kind == LocationMatch::Prefix && l.matches(path))
            .max_by_key(|l| l.path.len());

        if let Some(prefix) = longest_prefix {
            if prefix.priority {
                return Some(prefix);
            }
        }

        self.locations
            .iter()
            .find(|l| l.match_kind.is_regex() && l.matches(path))
            .or(longest_prefix)
    }

    pub fn validate(&self) -> Result<()> {
        if self.listens.is_empty() {
            return Err(Error::MissingDirective(
                "server block requires at least one 'listen' directive".to_string(),
            ));
        }
        if self.locations.is_empty() && self.root.is_none() && self.return_action.is_none() {
            return Err(Error::MissingDirective(
                "server block requires a 'location', 'root' or 'return' directive".to_string(),
            ));
        }
        if self.client_max_body_size > MAX_BODY_SIZE {
            return Err(Error::invalid(
                "client_max_body_size",
                self.client_max_body_size.to_string(),
                format!("must not exceed {}", MAX_BODY_SIZE),
            ));
        }
        for location in &self.locations {
            location.validate()?;
        }
        Ok(())
    }
}

fn name_matches(pattern: &str, host: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix("*.") {
        host.len() > suffix.len() + 1
            && host.ends_with(suffix)
            && host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
    } else if let Some(prefix) = pattern.strip_suffix(".*") {
        host.len() > prefix.len() + 1
            && host.starts_with(prefix)
            && host.as_bytes()[prefix.len()] == b'.'
    } else {
        pattern == host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_parse() {
        let l: ListenAddr = "8080".parse().unwrap();
        assert!(l.is_wildcard());
        assert_eq!(l.port, 8080);

        let l: ListenAddr = "127.0.0.1:9000".parse().unwrap();
        assert_eq!(l.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(l.port, 9000);

        let l: ListenAddr = "*:80".parse().unwrap();
        assert!(l.is_wildcard());

        let l: ListenAddr = "[::1]:8443".parse().unwrap();
        assert_eq!(l.host.as_deref(), Some("::1"));
        assert_eq!(l.to_string(), "[::1]:8443");

        let l: ListenAddr = "localhost".parse().unwrap();
        assert_eq!(l.port, 80);
    }

    #[test]
    fn test_listen_parse_errors() {
        assert!("".parse::<ListenAddr>().is_err());
        assert!("0".parse::<ListenAddr>().is_err());
        assert!("70000".parse::<ListenAddr>().is_err());
        assert!("host:http".parse::<ListenAddr>().is_err());
        assert!("::1:80".parse::<ListenAddr>().is_err());
    }

    #[test]
    fn test_duplicate_listen() {
        let mut server = ServerConfig::new();
        server.add_listen("8080".parse().unwrap()).unwrap();
        assert!(matches!(
            server.add_listen("*:8080".parse().unwrap()),
            Err(Error::DuplicateListen(_))
        ));
    }

    #[test]
    fn test_child_location_inherits() {
        let mut server = ServerConfig::new();
        server.root = Some("/var/www".to_string());
        server.index = vec!["main.html".to_string()];
        server.client_max_body_size = Size::mib(8);

        let loc = server.child_location(LocationMatch::Prefix, "/docs");
        assert_eq!(loc.root.as_deref(), Some("/var/www"));
        assert!(!loc.has_explicit_root());
        assert_eq!(loc.index, vec!["main.html"]);
        assert_eq!(loc.client_max_body_size, Size::mib(8));
    }

    #[test]
    fn test_host_matching() {
        let mut server = ServerConfig::new();
        server.server_names = vec!["*.example.com".to_string(), "WWW.test.*".to_string()];
        assert!(server.matches_host("api.example.com"));
        assert!(server.matches_host("API.Example.com:8080"));
        assert!(!server.matches_host("example.com"));
        assert!(server.matches_host("www.test.org"));
        assert!(!server.matches_host("www.other.org"));
    }

    #[test]
    fn test_find_location_precedence() {
        let mut server = ServerConfig::new();
        server.add_location(LocationConfig::new(LocationMatch::Prefix, "/")).unwrap();
        server.add_location(LocationConfig::new(LocationMatch::Prefix, "/images/")).unwrap();
        server.add_location(LocationConfig::new(LocationMatch::RegexCaseInsensitive, r"\.(png|jpg)$")).unwrap();
        server.add_location(LocationConfig::new(LocationMatch::Exact, "/images/logo.png")).unwrap();
        let mut priority = LocationConfig::new(LocationMatch::Prefix, "/static/");
        priority.priority = true;
        server.add_location(priority).unwrap();

        assert_eq!(server.find_location("/images/logo.png").unwrap().path, "/images/logo.png");
        assert_eq!(server.find_location("/images/cat.PNG").unwrap().path, r"\.(png|jpg)$");
        assert_eq!(server.find_location("/images/readme.txt").unwrap().path, "/images/");
        assert_eq!(server.find_location("/static/a.png").unwrap().path, "/static/");
        assert_eq!(server.find_location("/about").unwrap().path, "/");
    }

    #[test]
    fn test_duplicate_location() {
        let mut server = ServerConfig::new();
        server.add_location(LocationConfig::new(LocationMatch::Prefix, "/a")).unwrap();
        server.add_location(LocationConfig::new(LocationMatch::Exact, "/a")).unwrap();
        assert!(server.add_location(LocationConfig::new(LocationMatch::Prefix, "/a")).is_err());
    }

    #[test]
    fn test_validate_requirements() {
        let mut server = ServerConfig::new();
        assert!(matches!(server.validate(), Err(Error::MissingDirective(_))));
        server.add_listen("80".parse().unwrap()).unwrap();
        assert!(matches!(server.validate(), Err(Error::MissingDirective(_))));
        server.root = Some("/var/www".to_string());
        assert!(server.validate().is_ok());
    }

    #[test]
    fn test_conflicts() {
        let mut a = ServerConfig::new();
        a.add_listen("80".parse().unwrap()).unwrap();
        a.server_names = vec!["a.com".to_string()];

        let mut b = ServerConfig::new();
        b.add_listen("127.0.0.1:80".parse().unwrap()).unwrap();
        b.server_names = vec!["b.com".to_string()];
        assert!(a.conflict_with(&b).is_none());

        b.server_names.push("A.COM".to_string());
        assert!(a.conflict_with(&b).is_some());

        b.listens = vec!["81".parse().unwrap()];
        assert!(a.conflict_with(&b).is_none());
    }
}
