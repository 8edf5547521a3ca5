//! Directives accepted at global and `http` scope

use super::{expect_args, parse_error_page, parse_path, parse_size, parse_u32, value_error, Directive, DirectiveTable};
use crate::error::ConfigResult;
use crate::parser::context::ScopeKind;
use std::sync::LazyLock;
use webserv_core::config::HttpConfig;

pub static TABLE: LazyLock<DirectiveTable<HttpConfig>> = LazyLock::new(|| {
    DirectiveTable::new(ScopeKind::Http)
        .with("worker_processes", worker_processes)
        .with("worker_connections", worker_connections)
        .with("client_max_body_size", client_max_body_size)
        .with("error_log", error_log)
        .with("access_log", access_log)
        .with("error_page", error_page)
        .with("include", include)
});

fn worker_processes(config: &mut HttpConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    let n = parse_u32(d, &d.args[0])?;
    config.set_worker_processes(n).map_err(value_error(d))
}

fn worker_connections(config: &mut HttpConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    let n = parse_u32(d, &d.args[0])?;
    config.set_worker_connections(n).map_err(value_error(d))
}

fn client_max_body_size(config: &mut HttpConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    config.client_max_body_size = parse_size(d, &d.args[0])?;
    Ok(())
}

fn error_log(config: &mut HttpConfig, d: &Directive) -> ConfigResult<()> {
    config.error_log = parse_path(d)?;
    Ok(())
}

fn access_log(config: &mut HttpConfig, d: &Directive) -> ConfigResult<()> {
    config.access_log = parse_path(d)?;
    Ok(())
}

fn error_page(config: &mut HttpConfig, d: &Directive) -> ConfigResult<()> {
    parse_error_page(d, &mut config.error_pages)
}

/// Recorded here, expanded by the compiler once the file is parsed
fn include(config: &mut HttpConfig, d: &Directive) -> ConfigResult<()> {
    let pattern = parse_path(d)?;
    tracing::debug!("Found include directive '{}' at line {}", pattern, d.line);
    config.includes.push(pattern);
    Ok(())
}
