//! Snapshot loader
//!
//! Loads a configuration tree that was previously compiled and serialized.

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use std::path::Path;

/// Snapshot formats understood by [`ConfigLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Toml,
}

impl SnapshotFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Configuration loader for serialized snapshots
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a snapshot file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<HttpConfig> {
        let path = path.as_ref();
        let format = SnapshotFormat::from_path(path).ok_or_else(|| {
            Error::Snapshot(format!("Unknown snapshot format: {}", path.display()))
        })?;
        let content = std::fs::read_to_string(path)?;

        let mut config = match format {
            SnapshotFormat::Json => Self::from_json(&content)?,
            SnapshotFormat::Toml => Self::from_toml(&content)?,
        };
        config.source = Some(path.to_path_buf());

        config.validate()?;
        config.check_servers()?;
        tracing::debug!("Loaded snapshot {} with {} servers", path.display(), config.servers.len());
        Ok(config)
    }

    /// Parse JSON snapshot
    pub fn from_json(content: &str) -> Result<HttpConfig> {
        serde_json::from_str(content)
            .map_err(|e| Error::Snapshot(format!("Invalid JSON: {}", e)))
    }

    /// Parse TOML snapshot
    pub fn from_toml(content: &str) -> Result<HttpConfig> {
        toml::from_str(content)
            .map_err(|e| Error::Snapshot(format!("Invalid TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocationMatch;

    #[test]
    fn test_json_loading() {
        let json = r#"{"servers": []}"#;
        let config = ConfigLoader::from_json(json).unwrap();
        assert!(config.servers.is_empty());
        assert_eq!(config.worker_processes, 1);
    }

    #[test]
    fn test_json_server_tree() {
        let json = r#"{
            "worker_processes": 4,
            "error_pages": {"404": "/404.html"},
            "servers": [{
                "listens": [{"port": 8080}],
                "server_names": ["example.com"],
                "locations": [{"path": "/", "match": "prefix", "root": "/var/www"}]
            }]
        }"#;
        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.worker_processes, 4);
        assert_eq!(config.error_pages.len(), 1);
        assert_eq!(config.servers[0].locations[0].index, vec!["index.html", "index.htm"]);
        assert!(config.check_servers().is_ok());
    }

    #[test]
    fn test_toml_loading() {
        let toml = r#"
            worker_connections = 512

            [error_pages]
            500 = "/50x.html"

            [[servers]]
            server_names = ["example.com"]
            root = "/var/www"

            [[servers.listens]]
            port = 80
        "#;
        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.worker_connections, 512);
        assert_eq!(config.servers[0].listens[0].port, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_error_code_rejected() {
        let json = r#"{"error_pages": {"302": "/moved.html"}}"#;
        assert!(matches!(ConfigLoader::from_json(json), Err(Error::Snapshot(_))));
    }

    #[test]
    fn test_snapshot_root_with_alias_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("site.json");
        std::fs::write(
            &path,
            r#"{"servers": [{"listens": [{"port": 80}], "locations": [
                {"path": "/s/", "match": "prefix", "root": "/var/www", "alias": "/srv/"}
            ]}]}"#,
        )
        .unwrap();
        assert!(matches!(ConfigLoader::load(&path), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_inherited_root_with_alias_reloads() {
        let mut config = HttpConfig::default();
        let mut server = config.child_server();
        server.listens.push("80".parse().unwrap());
        server.root = Some("/var/www".to_string());
        let mut location = server.child_location(LocationMatch::Prefix, "/s/");
        location.alias = Some("/srv/".to_string());
        server.locations.push(location);
        config.servers.push(server);

        let encoded = serde_json::to_string(&config).unwrap();
        assert!(encoded.contains(r#""root_inherited":true"#));
        let decoded = ConfigLoader::from_json(&encoded).unwrap();
        assert!(!decoded.servers[0].locations[0].has_explicit_root());
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_serialized_tree_reloads() {
        let json = r#"{"servers": [{"listens": [{"port": 81}], "root": "/srv"}]}"#;
        let config = ConfigLoader::from_json(json).unwrap();
        let encoded = toml::to_string(&config).unwrap();
        let decoded = ConfigLoader::from_toml(&encoded).unwrap();
        assert_eq!(decoded.servers[0].listens, config.servers[0].listens);
    }
}
