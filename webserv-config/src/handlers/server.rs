//! Directives accepted inside `server` blocks

use super::{
    expect_args, expect_min_args, parse_error_page, parse_path, parse_return, parse_size, value_error,
    Directive, DirectiveTable,
};
use crate::error::ConfigResult;
use crate::parser::context::ScopeKind;
use std::sync::LazyLock;
use webserv_core::config::{ListenAddr, ServerConfig};

pub static TABLE: LazyLock<DirectiveTable<ServerConfig>> = LazyLock::new(|| {
    DirectiveTable::new(ScopeKind::Server)
        .with("listen", listen)
        .with("server_name", server_name)
        .with("root", root)
        .with("index", index)
        .with("error_page", error_page)
        .with("client_max_body_size", client_max_body_size)
        .with("return", return_)
        .with("include", include)
});

/// `listen ADDRESS [default_server]`
fn listen(server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 1)?;
    match d.args.get(1).map(String::as_str) {
        None => {}
        Some("default_server") if d.args.len() == 2 => server.default_server = true,
        Some(other) => return Err(d.invalid(format!("unexpected listen parameter '{}'", other))),
    }
    let addr: ListenAddr = d.args[0].parse().map_err(value_error(d))?;
    server.add_listen(addr)?;
    Ok(())
}

fn server_name(server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 1)?;
    for name in &d.args {
        if !server.server_names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            server.server_names.push(name.clone());
        }
    }
    Ok(())
}

fn root(server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    server.root = Some(parse_path(d)?);
    Ok(())
}

fn index(server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 1)?;
    server.index = d.args.clone();
    Ok(())
}

fn error_page(server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    parse_error_page(d, &mut server.error_pages)
}

fn client_max_body_size(server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    server.client_max_body_size = parse_size(d, &d.args[0])?;
    Ok(())
}

fn return_(server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    server.return_action = Some(parse_return(d)?);
    Ok(())
}

/// Only http-level includes are expanded; here the pattern is checked and logged
fn include(_server: &mut ServerConfig, d: &Directive) -> ConfigResult<()> {
    let pattern = parse_path(d)?;
    tracing::info!(
        "Include '{}' at line {} is inside a server block and will not be expanded",
        pattern,
        d.line
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use webserv_core::config::ReturnAction;

    fn apply(server: &mut ServerConfig, name: &str, args: &[&str]) -> ConfigResult<()> {
        let d = Directive::new(name, args.iter().map(|a| a.to_string()).collect(), 3);
        TABLE.apply(server, &d)
    }

    #[test]
    fn test_listen() {
        let mut server = ServerConfig::new();
        apply(&mut server, "listen", &["8080"]).unwrap();
        apply(&mut server, "listen", &["127.0.0.1:9090", "default_server"]).unwrap();
        assert_eq!(server.listens.len(), 2);
        assert!(server.default_server);
        assert!(apply(&mut server, "listen", &["80", "ssl"]).is_err());
        assert!(apply(&mut server, "listen", &["http"]).is_ok());
        assert!(apply(&mut server, "listen", &["abc:xyz"]).is_err());
    }

    #[test]
    fn test_duplicate_listen_is_validation_error() {
        let mut server = ServerConfig::new();
        apply(&mut server, "listen", &["8080"]).unwrap();
        assert!(matches!(
            apply(&mut server, "listen", &["8080"]),
            Err(ConfigError::Validation(webserv_core::Error::DuplicateListen(_)))
        ));
    }

    #[test]
    fn test_names_root_index() {
        let mut server = ServerConfig::new();
        apply(&mut server, "server_name", &["example.com", "www.example.com"]).unwrap();
        apply(&mut server, "server_name", &["EXAMPLE.com"]).unwrap();
        apply(&mut server, "root", &["/var/www"]).unwrap();
        apply(&mut server, "index", &["home.html"]).unwrap();
        assert_eq!(server.server_names.len(), 2);
        assert_eq!(server.root.as_deref(), Some("/var/www"));
        assert_eq!(server.index, vec!["home.html"]);
        assert!(apply(&mut server, "root", &[]).is_err());
        assert!(apply(&mut server, "server_name", &[]).is_err());
    }

    #[test]
    fn test_server_return() {
        let mut server = ServerConfig::new();
        apply(&mut server, "return", &["301", "https://example.com$request_uri"]).unwrap();
        assert!(matches!(
            server.return_action,
            Some(ReturnAction::Redirect { ref target, .. }) if target == "https://example.com$request_uri"
        ));
    }

    #[test]
    fn test_include_is_logged_only() {
        let mut server = ServerConfig::new();
        apply(&mut server, "include", &["mime.types"]).unwrap();
        assert!(apply(&mut server, "include", &["a", "b"]).is_err());
    }
}
