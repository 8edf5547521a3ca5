//! Root (`http`) configuration

use super::{error_pages_serde, ErrorPages, ServerConfig, Size};
use super::{DEFAULT_BODY_SIZE, MAX_BODY_SIZE};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root of a compiled configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// File this configuration was compiled from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    #[serde(default = "default_worker_processes")]
    pub worker_processes: u32,

    #[serde(default = "default_worker_connections")]
    pub worker_connections: u32,

    #[serde(default = "default_body_size")]
    pub client_max_body_size: Size,

    #[serde(default = "default_error_log")]
    pub error_log: String,

    #[serde(default = "default_access_log")]
    pub access_log: String,

    #[serde(default, with = "error_pages_serde")]
    pub error_pages: ErrorPages,

    /// Patterns declared by `include` at global or http scope
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

fn default_worker_processes() -> u32 {
    1
}

fn default_worker_connections() -> u32 {
    1024
}

fn default_body_size() -> Size {
    DEFAULT_BODY_SIZE
}

fn default_error_log() -> String {
    "/var/log/webserv_error.log".to_string()
}

fn default_access_log() -> String {
    "/var/log/webserv_access.log".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            source: None,
            worker_processes: default_worker_processes(),
            worker_connections: default_worker_connections(),
            client_max_body_size: DEFAULT_BODY_SIZE,
            error_log: default_error_log(),
            access_log: default_access_log(),
            error_pages: ErrorPages::new(),
            includes: Vec::new(),
            servers: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub const MAX_WORKER_PROCESSES: u32 = 64;
    pub const MAX_WORKER_CONNECTIONS: u32 = 65535;

    pub fn new(source: impl AsRef<Path>) -> Self {
        Self {
            source: Some(source.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Directory relative include patterns are resolved against
    pub fn base_dir(&self) -> Option<&Path> {
        self.source.as_deref().and_then(Path::parent)
    }

    pub fn set_worker_processes(&mut self, n: u32) -> Result<()> {
        if n == 0 || n > Self::MAX_WORKER_PROCESSES {
            return Err(Error::invalid(
                "worker_processes",
                n.to_string(),
                format!("must be between 1 and {}", Self::MAX_WORKER_PROCESSES),
            ));
        }
        self.worker_processes = n;
        Ok(())
    }

    pub fn set_worker_connections(&mut self, n: u32) -> Result<()> {
        if n == 0 || n > Self::MAX_WORKER_CONNECTIONS {
            return Err(Error::invalid(
                "worker_connections",
                n.to_string(),
                format!("must be between 1 and {}", Self::MAX_WORKER_CONNECTIONS),
            ));
        }
        self.worker_connections = n;
        Ok(())
    }

    /// Create a server that starts from the http-level inheritable settings
    pub fn child_server(&self) -> ServerConfig {
        ServerConfig {
            error_pages: self.error_pages.clone(),
            client_max_body_size: self.client_max_body_size,
            ..ServerConfig::default()
        }
    }

    /// Check http-level values and every server already attached
    pub fn validate(&self) -> Result<()> {
        self.check_workers()?;
        if self.client_max_body_size > MAX_BODY_SIZE {
            return Err(Error::invalid(
                "client_max_body_size",
                self.client_max_body_size.to_string(),
                format!("must not exceed {}", MAX_BODY_SIZE),
            ));
        }
        if self.error_log.is_empty() || self.access_log.is_empty() {
            return Err(Error::InvalidPath {
                path: String::new(),
                reason: "log paths must not be empty".to_string(),
            });
        }
        for server in &self.servers {
            server.validate()?;
        }
        Ok(())
    }

    fn check_workers(&self) -> Result<()> {
        if self.worker_processes == 0 || self.worker_processes > Self::MAX_WORKER_PROCESSES {
            return Err(Error::invalid(
                "worker_processes",
                self.worker_processes.to_string(),
                "out of range",
            ));
        }
        if self.worker_connections == 0 || self.worker_connections > Self::MAX_WORKER_CONNECTIONS {
            return Err(Error::invalid(
                "worker_connections",
                self.worker_connections.to_string(),
                "out of range",
            ));
        }
        Ok(())
    }

    /// Checks that only make sense once every include has been merged
    pub fn check_servers(&self) -> Result<()> {
        if self.servers.is_empty() {
            return Err(Error::MissingDirective(
                "configuration defines no server blocks".to_string(),
            ));
        }
        for (i, first) in self.servers.iter().enumerate() {
            for second in &self.servers[i + 1..] {
                if let Some(binding) = first.conflict_with(second) {
                    let names = if first.server_names.is_empty() {
                        "no server_name".to_string()
                    } else {
                        first.server_names.join(" ")
                    };
                    return Err(Error::PortConflict {
                        binding: binding.to_string(),
                        reason: format!("two servers share the same names ({})", names),
                    });
                }
            }
        }
        Ok(())
    }

    /// Pick the server for a request on `port` with the given `Host`
    ///
    /// A server whose `server_name` matches wins; otherwise the first default
    /// server on that port.
    pub fn select_server(&self, host: &str, port: u16) -> Option<&ServerConfig> {
        let candidates = || self.servers.iter().filter(move |s| s.listens_on(port));
        candidates()
            .find(|s| s.matches_host(host))
            .or_else(|| candidates().find(|s| s.is_default()))
    }
}
