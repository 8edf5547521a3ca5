//! Include resolution
//!
//! An `include` pattern names one file or, with `*`/`?` in its last path
//! component, every regular file in one directory whose name matches. Each
//! file is compiled on its own and only its servers are merged into the
//! including configuration.

use crate::compiler::Compiler;
use crate::error::{ConfigError, ConfigResult, ResolutionError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use webserv_core::config::HttpConfig;

/// Deepest include nesting accepted
pub const MAX_DEPTH: usize = 10;

/// Expands include patterns and merges the servers they define
pub struct IncludeResolver<'a> {
    compiler: &'a Compiler,
}

impl<'a> IncludeResolver<'a> {
    pub fn new(compiler: &'a Compiler) -> Self {
        Self { compiler }
    }

    /// Merge every file matching `pattern` into `into`
    ///
    /// Returns the number of servers merged. Includes declared inside the
    /// matched files are resolved one level deeper, relative to the file
    /// that declares them.
    pub fn resolve(&self, pattern: &Path, into: &mut HttpConfig, depth: usize) -> ConfigResult<usize> {
        if depth >= MAX_DEPTH {
            return Err(ResolutionError::IncludeRecursion {
                pattern: pattern.display().to_string(),
                depth,
            }
            .into());
        }

        let files = expand(pattern)?;
        if files.is_empty() {
            tracing::warn!("Include pattern '{}' matched no files", pattern.display());
            return Ok(0);
        }

        let mut merged = 0;
        for file in files {
            tracing::debug!("Including {} at depth {}", file.display(), depth);
            let mut included = self.compiler.parse_file(&file)?;

            for nested in std::mem::take(&mut included.includes) {
                let nested = anchor(&nested, included.base_dir());
                self.resolve(&nested, &mut included, depth + 1)?;
            }

            merged += included.servers.len();
            into.servers.append(&mut included.servers);
        }

        tracing::info!(
            "Merged {} servers from include '{}'",
            merged,
            pattern.display()
        );
        Ok(merged)
    }
}

/// Resolve a relative pattern against `base`
pub fn anchor(pattern: &str, base: Option<&Path>) -> PathBuf {
    let path = Path::new(pattern);
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?'])
}

/// Files named by `pattern`, sorted
///
/// Wildcards are only honoured in the final path component.
pub fn expand(pattern: &Path) -> ConfigResult<Vec<PathBuf>> {
    let file_pattern = pattern
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !has_wildcard(&file_pattern) {
        return Ok(if pattern.is_file() {
            vec![pattern.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let dir = match pattern.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ConfigError::from_io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::from_io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let path = entry.path();
        if glob_match(name, &file_pattern) && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Match `name` against a pattern of literals, `*` and `?`
pub fn glob_match(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut n, mut p) = (0, 0);
    // Last `*` seen and the name position it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                n += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, from)) => {
                    p = star + 1;
                    n = from + 1;
                    backtrack = Some((star, from + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("app.conf", "*.conf"));
        assert!(!glob_match("app.conf.bak", "*.conf"));
        assert!(glob_match("abc", "a?c"));
        assert!(!glob_match("ac", "a?c"));
        assert!(glob_match("", "*"));
        assert!(glob_match("a.conf", "a*.c*f"));
        assert!(glob_match("default", "default"));
        assert!(!glob_match("default", "defaul"));
        assert!(glob_match("x-y-z.conf", "*-*-*.conf"));
    }

    #[test]
    fn test_expand_sorted_regular_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.conf"), "").unwrap();
        fs::write(dir.path().join("a.conf"), "").unwrap();
        fs::write(dir.path().join("c.conf.bak"), "").unwrap();
        fs::create_dir(dir.path().join("d.conf")).unwrap();

        let files = expand(&dir.path().join("*.conf")).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.conf", "b.conf"]);
    }

    #[test]
    fn test_expand_literal_and_missing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("site.conf");
        fs::write(&file, "").unwrap();

        assert_eq!(expand(&file).unwrap(), vec![file]);
        assert!(expand(&dir.path().join("missing.conf")).unwrap().is_empty());
        assert!(expand(&dir.path().join("nodir/*.conf")).unwrap().is_empty());
    }

    #[test]
    fn test_anchor() {
        let base = Path::new("/etc/webserv");
        assert_eq!(anchor("conf.d/*.conf", Some(base)), PathBuf::from("/etc/webserv/conf.d/*.conf"));
        assert_eq!(anchor("/abs/x.conf", Some(base)), PathBuf::from("/abs/x.conf"));
        assert_eq!(anchor("x.conf", None), PathBuf::from("x.conf"));
    }

    fn server_block(port: u16) -> String {
        format!("server {{ listen {}; root /srv/{}; }}\n", port, port)
    }

    /// `main` includes `f1`, which includes `f2`, and so on up to `f{hops}`
    fn write_chain(dir: &Path, hops: usize) -> PathBuf {
        for i in 1..=hops {
            let mut body = server_block(8000 + i as u16);
            if i < hops {
                body.push_str(&format!("include f{}.conf;\n", i + 1));
            }
            fs::write(dir.join(format!("f{}.conf", i)), body).unwrap();
        }
        dir.join("f1.conf")
    }

    #[test]
    fn test_include_chain_of_ten_succeeds() {
        let dir = TempDir::new().unwrap();
        let first = write_chain(dir.path(), 10);
        let compiler = Compiler::default();
        let mut config = HttpConfig::default();

        let merged = IncludeResolver::new(&compiler).resolve(&first, &mut config, 0).unwrap();
        assert_eq!(merged, 10);
        assert_eq!(config.servers.len(), 10);
    }

    #[test]
    fn test_include_chain_of_eleven_fails() {
        let dir = TempDir::new().unwrap();
        let first = write_chain(dir.path(), 11);
        let compiler = Compiler::default();
        let mut config = HttpConfig::default();

        let err = IncludeResolver::new(&compiler).resolve(&first, &mut config, 0).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Resolution(ResolutionError::IncludeRecursion { depth: 10, .. })
        ));
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_self_include_hits_depth_limit() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("loop.conf");
        fs::write(&file, "include loop.conf;\n").unwrap();
        let compiler = Compiler::default();
        let mut config = HttpConfig::default();

        let err = IncludeResolver::new(&compiler).resolve(&file, &mut config, 0).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Resolution(ResolutionError::IncludeRecursion { .. })
        ));
    }

    #[test]
    fn test_zero_matches_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let compiler = Compiler::default();
        let mut config = HttpConfig::default();
        let merged = IncludeResolver::new(&compiler)
            .resolve(&dir.path().join("*.conf"), &mut config, 0)
            .unwrap();
        assert_eq!(merged, 0);
    }

    #[test]
    fn test_depth_guard() {
        let compiler = Compiler::default();
        let mut config = HttpConfig::default();
        assert!(IncludeResolver::new(&compiler)
            .resolve(Path::new("whatever.conf"), &mut config, MAX_DEPTH)
            .is_err());
    }
}
