//! Location (per-path) configuration

use super::{default_index, error_pages_serde, ErrorPages, HttpMethod, Size, StatusCode, UploadAccess};
use super::{DEFAULT_BODY_SIZE, MAX_BODY_SIZE};
use crate::error::{Error, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Extensions handed to the CGI runner when no `cgi_extension` is given
pub const DEFAULT_CGI_EXTENSION: &str = r"\.(php|py|pl|cgi)$";

/// How a location path is compared with a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationMatch {
    Exact,
    Prefix,
    RegexCaseSensitive,
    RegexCaseInsensitive,
}

impl LocationMatch {
    pub fn is_regex(self) -> bool {
        matches!(self, LocationMatch::RegexCaseSensitive | LocationMatch::RegexCaseInsensitive)
    }
}

/// Action configured by `return`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnAction {
    /// 3xx with a target URL
    Redirect { code: StatusCode, target: String },
    /// 2xx, 4xx or 5xx with inline body
    Content { code: StatusCode, body: String },
}

/// Response header added by `add_header`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// CGI settings, created by the first CGI directive in a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgiConfig {
    /// Script to run for every request in this location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Directory scripts are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Regex selecting the request paths handled as CGI
    #[serde(default = "default_cgi_extension")]
    pub extension: String,

    /// Extra environment passed to the script (`fastcgi_param`)
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_cgi_extension() -> String {
    DEFAULT_CGI_EXTENSION.to_string()
}

impl Default for CgiConfig {
    fn default() -> Self {
        Self {
            script: None,
            root: None,
            extension: default_cgi_extension(),
            params: BTreeMap::new(),
        }
    }
}

impl CgiConfig {
    pub fn validate(&self) -> Result<()> {
        Regex::new(&self.extension)
            .map_err(|e| Error::invalid("cgi extension", &self.extension, e.to_string()))?;
        Ok(())
    }
}

/// Upload settings, created by the first upload directive in a location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Set by `upload_store`
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_upload_store")]
    pub store: String,

    /// Mode for stored files
    #[serde(default = "default_upload_permissions")]
    pub permissions: u32,

    #[serde(default)]
    pub access: UploadAccess,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<Size>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_size: Option<Size>,
}

fn default_upload_store() -> String {
    "/tmp".to_string()
}

fn default_upload_permissions() -> u32 {
    0o644
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            store: default_upload_store(),
            permissions: default_upload_permissions(),
            access: UploadAccess::default(),
            max_file_size: None,
            max_total_size: None,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.store.is_empty() {
            return Err(Error::InvalidPath {
                path: self.store.clone(),
                reason: "upload store must not be empty".to_string(),
            });
        }
        if self.permissions > 0o777 {
            return Err(Error::invalid(
                "upload permissions",
                format!("{:o}", self.permissions),
                "must not exceed 0777",
            ));
        }
        if let (Some(file), Some(total)) = (self.max_file_size, self.max_total_size) {
            if file > total {
                return Err(Error::Conflict(format!(
                    "upload_max_file_size ({}) exceeds upload_max_total_size ({})",
                    file, total
                )));
            }
        }
        Ok(())
    }
}

/// Location block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    pub path: String,

    #[serde(rename = "match")]
    pub match_kind: LocationMatch,

    /// Declared with `^~`: a prefix match that suppresses regex locations
    #[serde(default)]
    pub priority: bool,

    /// Document root (inherited from the server unless set here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// `root` was copied from the server rather than set on this location
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    root_inherited: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default = "default_index")]
    pub index: Vec<String>,

    #[serde(default = "default_methods")]
    pub allowed_methods: BTreeSet<HttpMethod>,

    #[serde(default)]
    pub autoindex: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub try_files: Vec<String>,

    #[serde(default, with = "error_pages_serde")]
    pub error_pages: ErrorPages,

    #[serde(default = "default_body_size")]
    pub client_max_body_size: Size,

    #[serde(default, rename = "return", skip_serializing_if = "Option::is_none")]
    pub return_action: Option<ReturnAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgi: Option<CgiConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderEntry>,

    #[serde(skip)]
    compiled: OnceLock<Option<Regex>>,
}

fn default_methods() -> BTreeSet<HttpMethod> {
    [HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete, HttpMethod::Head]
        .into_iter()
        .collect()
}

fn default_body_size() -> Size {
    DEFAULT_BODY_SIZE
}

impl LocationConfig {
    /// Create a location with default settings
    pub fn new(match_kind: LocationMatch, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            match_kind,
            priority: false,
            root: None,
            root_inherited: false,
            alias: None,
            index: default_index(),
            allowed_methods: default_methods(),
            autoindex: false,
            try_files: Vec::new(),
            error_pages: ErrorPages::new(),
            client_max_body_size: DEFAULT_BODY_SIZE,
            return_action: None,
            upload: None,
            cgi: None,
            headers: Vec::new(),
            compiled: OnceLock::new(),
        }
    }

    /// Set the document root from a `root` directive
    pub fn set_root(&mut self, root: impl Into<String>) {
        self.root = Some(root.into());
        self.root_inherited = false;
    }

    /// Copy a parent's root without marking it as set by this location
    pub(crate) fn inherit_root(&mut self, root: Option<String>) {
        self.root_inherited = root.is_some();
        self.root = root;
    }

    pub fn has_explicit_root(&self) -> bool {
        self.root.is_some() && !self.root_inherited
    }

    pub fn is_named(&self) -> bool {
        self.path.starts_with('@')
    }

    pub fn is_method_allowed(&self, method: HttpMethod) -> bool {
        self.allowed_methods.contains(&method)
    }

    /// Upload settings, created with defaults on first access
    pub fn upload_mut(&mut self) -> &mut UploadConfig {
        self.upload.get_or_insert_with(UploadConfig::default)
    }

    /// CGI settings, created with defaults on first access
    pub fn cgi_mut(&mut self) -> &mut CgiConfig {
        self.cgi.get_or_insert_with(CgiConfig::default)
    }

    fn build_regex(&self) -> std::result::Result<Regex, regex::Error> {
        RegexBuilder::new(&self.path)
            .case_insensitive(self.match_kind == LocationMatch::RegexCaseInsensitive)
            .build()
    }

    fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| {
                if self.match_kind.is_regex() {
                    self.build_regex().ok()
                } else {
                    None
                }
            })
            .as_ref()
    }

    /// Does a request path select this location?
    pub fn matches(&self, request_path: &str) -> bool {
        if self.is_named() {
            return false;
        }
        match self.match_kind {
            LocationMatch::Exact => request_path == self.path,
            LocationMatch::Prefix => request_path.starts_with(&self.path),
            LocationMatch::RegexCaseSensitive | LocationMatch::RegexCaseInsensitive => {
                self.regex().is_some_and(|re| re.is_match(request_path))
            }
        }
    }

    /// Identity used to detect duplicate locations within a server
    pub fn same_target(&self, other: &LocationConfig) -> bool {
        self.path == other.path
            && self.match_kind == other.match_kind
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::InvalidPath {
                path: String::new(),
                reason: "location path must not be empty".to_string(),
            });
        }

        if let Some(name) = self.path.strip_prefix('@') {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::InvalidPath {
                    path: self.path.clone(),
                    reason: "named locations may only contain letters, digits and '_'".to_string(),
                });
            }
            if self.match_kind != LocationMatch::Exact {
                return Err(Error::InvalidPath {
                    path: self.path.clone(),
                    reason: "named locations cannot use a match modifier".to_string(),
                });
            }
        } else if self.match_kind.is_regex() {
            self.build_regex().map_err(|e| Error::InvalidPath {
                path: self.path.clone(),
                reason: format!("invalid regular expression: {}", e),
            })?;
        } else if !self.path.starts_with('/') {
            return Err(Error::InvalidPath {
                path: self.path.clone(),
                reason: "location path must start with '/'".to_string(),
            });
        }

        if self.alias.is_some() && self.has_explicit_root() {
            return Err(Error::Conflict(format!(
                "location '{}' sets both 'root' and 'alias'",
                self.path
            )));
        }

        if self.client_max_body_size > MAX_BODY_SIZE {
            return Err(Error::invalid(
                "client_max_body_size",
                self.client_max_body_size.to_string(),
                format!("must not exceed {}", MAX_BODY_SIZE),
            ));
        }

        if let Some(upload) = &self.upload {
            upload.validate()?;
            if upload.enabled && !self.is_method_allowed(HttpMethod::Post) {
                return Err(Error::Conflict(format!(
                    "location '{}' stores uploads but does not allow POST",
                    self.path
                )));
            }
        }

        if let Some(cgi) = &self.cgi {
            cgi.validate()?;
        }

        Ok(())
    }
}
