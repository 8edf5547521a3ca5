//! Compiler for configuration files
//!
//! Drives one file through tokenizing, block parsing and validation, then
//! merges includes into the result.

use crate::error::{ConfigError, ConfigResult};
use crate::include::{anchor, IncludeResolver};
use crate::parser;
use std::fs;
use std::path::Path;
use webserv_core::config::HttpConfig;

/// What a failed top-level include does to the load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncludePolicy {
    /// Log a warning and keep whatever merged successfully
    #[default]
    BestEffort,
    /// Fail the load
    Strict,
}

/// Configuration compiler
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    policy: IncludePolicy,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: IncludePolicy) -> Self {
        Self { policy }
    }

    /// Parse and validate one file without expanding its includes
    pub fn parse_file(&self, path: impl AsRef<Path>) -> ConfigResult<HttpConfig> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ConfigError::from_io(path, e))?;
        let source = String::from_utf8(bytes).map_err(|e| {
            ConfigError::Load(format!("{} is not valid UTF-8: {}", path.display(), e))
        })?;
        self.parse_source(&source, Some(path))
    }

    /// Parse and validate configuration text
    ///
    /// `origin` anchors relative include patterns declared in the text.
    pub fn parse_source(&self, source: &str, origin: Option<&Path>) -> ConfigResult<HttpConfig> {
        let mut config = origin.map_or_else(HttpConfig::default, |p| HttpConfig::new(p));
        parser::parse_into(source, &mut config)?;
        config.validate()?;

        tracing::info!(
            "Parsed configuration from {} with {} servers",
            origin.map_or_else(|| "<string>".to_string(), |p| p.display().to_string()),
            config.servers.len()
        );
        Ok(config)
    }

    /// Merge the servers of every file matching `pattern` into `config`
    ///
    /// Under [`IncludePolicy::BestEffort`] a failure is logged and the
    /// configuration keeps the servers merged before it.
    pub fn merge_includes(&self, config: &mut HttpConfig, pattern: impl AsRef<Path>) -> ConfigResult<()> {
        let pattern = pattern.as_ref();
        let resolver = IncludeResolver::new(self);
        match resolver.resolve(pattern, config, 0) {
            Ok(_) => Ok(()),
            Err(e) if self.policy == IncludePolicy::BestEffort => {
                tracing::warn!("Failed to merge include '{}': {}", pattern.display(), e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Expand the `include` directives recorded while parsing `config`
    pub fn merge_declared_includes(&self, config: &mut HttpConfig) -> ConfigResult<()> {
        let base = config.base_dir().map(Path::to_path_buf);
        for pattern in std::mem::take(&mut config.includes) {
            let anchored = anchor(&pattern, base.as_deref());
            self.merge_includes(config, &anchored)?;
            config.includes.push(pattern);
        }
        Ok(())
    }

    /// Whole-tree checks that need every server in place
    pub fn validate_configuration(&self, config: &HttpConfig) -> ConfigResult<()> {
        config.validate()?;
        config.check_servers()?;
        Ok(())
    }

    /// Parse `path`, merge its includes and an optional extra pattern, validate
    pub fn compile_with(&self, path: impl AsRef<Path>, include: Option<&str>) -> ConfigResult<HttpConfig> {
        let mut config = self.parse_file(path)?;
        self.merge_declared_includes(&mut config)?;
        if let Some(pattern) = include {
            self.merge_includes(&mut config, pattern)?;
        }
        self.validate_configuration(&config)?;
        Ok(config)
    }

    pub fn compile(&self, path: impl AsRef<Path>) -> ConfigResult<HttpConfig> {
        self.compile_with(path, None)
    }
}
