//! Configuration provider
//!
//! Holds the configuration the server runs with. A failed load leaves the
//! provider empty, so callers never see a partially loaded tree.

use crate::compiler::Compiler;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use webserv_core::config::{HttpConfig, LocationConfig, ServerConfig, SnapshotFormat};

pub struct ConfigProvider {
    compiler: Compiler,
    config_path: Option<PathBuf>,
    include_path: Option<String>,
    config: Option<HttpConfig>,
}

impl Default for ConfigProvider {
    fn default() -> Self {
        Self::new(Compiler::default())
    }
}

impl ConfigProvider {
    pub fn new(compiler: Compiler) -> Self {
        Self {
            compiler,
            config_path: None,
            include_path: None,
            config: None,
        }
    }

    /// Load `path` plus an optional extra include pattern
    pub fn load(&mut self, path: impl AsRef<Path>, include: Option<&str>) -> ConfigResult<()> {
        let path = path.as_ref();
        self.config = None;
        self.config_path = Some(path.to_path_buf());
        self.include_path = include.map(str::to_string);

        let config = match SnapshotFormat::from_path(path) {
            Some(_) => {
                if include.is_some() {
                    tracing::warn!("Ignoring include pattern for snapshot {}", path.display());
                }
                crate::load_snapshot(path)?
            }
            None => self.compiler.compile_with(path, include)?,
        };

        tracing::info!(
            "Loaded configuration {} ({} servers)",
            path.display(),
            config.servers.len()
        );
        self.config = Some(config);
        Ok(())
    }

    /// Load again with the arguments of the last [`ConfigProvider::load`]
    pub fn reload(&mut self) -> ConfigResult<()> {
        let path = self
            .config_path
            .clone()
            .ok_or_else(|| ConfigError::Load("no configuration has been loaded".to_string()))?;
        let include = self.include_path.clone();
        tracing::info!("Reloading configuration {}", path.display());
        self.load(&path, include.as_deref())
    }

    pub fn is_valid(&self) -> bool {
        self.config.is_some()
    }

    pub fn configuration(&self) -> ConfigResult<&HttpConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| ConfigError::Load("no valid configuration is loaded".to_string()))
    }

    /// Server answering requests for `host` on `port`
    pub fn find_server(&self, host: &str, port: u16) -> ConfigResult<&ServerConfig> {
        self.configuration()?.select_server(host, port).ok_or_else(|| {
            webserv_core::Error::MissingDirective(format!(
                "no server for host '{}' on port {}",
                host, port
            ))
            .into()
        })
    }

    pub fn find_location<'a>(&self, server: &'a ServerConfig, path: &str) -> Option<&'a LocationConfig> {
        server.find_location(path)
    }

    /// Servers of the loaded configuration, empty when nothing is loaded
    pub fn all_servers(&self) -> &[ServerConfig] {
        self.config
            .as_ref()
            .map(|c| c.servers.as_slice())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
        http {
            server {
                listen 8080 default_server;
                server_name example.com;
                root /var/www/example;
                location / { }
                location = /health { return 200 ok; }
                location ~ \.php$ { script /usr/bin/php-cgi; }
            }
            server {
                listen 8080;
                server_name other.com;
                root /var/www/other;
            }
        }
    "#;

    fn provider(dir: &TempDir) -> (ConfigProvider, PathBuf) {
        let path = dir.path().join("webserv.conf");
        fs::write(&path, CONFIG).unwrap();
        let mut provider = ConfigProvider::default();
        provider.load(&path, None).unwrap();
        (provider, path)
    }

    #[test]
    fn test_load_and_lookup() {
        let dir = TempDir::new().unwrap();
        let (provider, _) = provider(&dir);
        assert!(provider.is_valid());
        assert_eq!(provider.all_servers().len(), 2);

        let server = provider.find_server("other.com", 8080).unwrap();
        assert_eq!(server.root.as_deref(), Some("/var/www/other"));

        let fallback = provider.find_server("unknown.com", 8080).unwrap();
        assert_eq!(fallback.server_names, vec!["example.com"]);
        assert!(provider.find_server("example.com", 9999).is_err());

        let main = provider.find_server("example.com", 8080).unwrap();
        assert_eq!(provider.find_location(main, "/health").unwrap().path, "/health");
        assert_eq!(provider.find_location(main, "/index.php").unwrap().path, r"\.php$");
        assert_eq!(provider.find_location(main, "/docs/a.html").unwrap().path, "/");
    }

    #[test]
    fn test_failed_load_clears_configuration() {
        let dir = TempDir::new().unwrap();
        let (mut provider, path) = provider(&dir);

        fs::write(&path, "server { listen 8080; ").unwrap();
        assert!(provider.reload().is_err());
        assert!(!provider.is_valid());
        assert!(provider.configuration().is_err());
        assert!(provider.all_servers().is_empty());

        fs::write(&path, CONFIG).unwrap();
        provider.reload().unwrap();
        assert!(provider.is_valid());
    }

    #[test]
    fn test_reload_without_load() {
        let mut provider = ConfigProvider::default();
        assert!(matches!(provider.reload(), Err(ConfigError::Load(_))));
        assert!(provider.find_server("a", 80).is_err());
    }

    #[test]
    fn test_snapshot_load() {
        let dir = TempDir::new().unwrap();
        let (provider, _) = provider(&dir);
        let snapshot = dir.path().join("compiled.json");
        fs::write(&snapshot, serde_json::to_string(provider.configuration().unwrap()).unwrap()).unwrap();

        let mut restored = ConfigProvider::default();
        restored.load(&snapshot, None).unwrap();
        assert_eq!(restored.all_servers().len(), 2);
        assert!(restored.find_server("example.com", 8080).is_ok());
    }
}
