//! Directives accepted inside `location` blocks

use super::{
    expect_args, expect_min_args, parse_error_page, parse_path, parse_permissions, parse_return,
    parse_size, parse_switch, value_error, Directive, DirectiveTable,
};
use crate::error::ConfigResult;
use crate::parser::context::ScopeKind;
use std::sync::LazyLock;
use webserv_core::config::{HeaderEntry, LocationConfig, UploadAccess};

pub static TABLE: LazyLock<DirectiveTable<LocationConfig>> = LazyLock::new(|| {
    DirectiveTable::new(ScopeKind::Location)
        .with("root", root)
        .with("alias", alias)
        .with("index", index)
        .with("autoindex", autoindex)
        .with("try_files", try_files)
        .with("return", return_)
        .with("error_page", error_page)
        .with("client_max_body_size", client_max_body_size)
        .with("upload_store", upload_store)
        .with("upload_store_permissions", upload_store_permissions)
        .with("upload_store_access", upload_store_access)
        .with("upload_max_file_size", upload_max_file_size)
        .with("upload_max_total_size", upload_max_total_size)
        .with("add_header", add_header)
        .with("fastcgi_param", fastcgi_param)
        .with("script", script)
        .with("cgi_root", cgi_root)
        .with("cgi_extension", cgi_extension)
        .with("include", include)
});

fn root(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    location.set_root(parse_path(d)?);
    Ok(())
}

fn alias(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    location.alias = Some(parse_path(d)?);
    Ok(())
}

fn index(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 1)?;
    location.index = d.args.clone();
    Ok(())
}

fn autoindex(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    location.autoindex = parse_switch(d, &d.args[0])?;
    Ok(())
}

fn try_files(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 2)?;
    location.try_files = d.args.clone();
    Ok(())
}

fn return_(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    location.return_action = Some(parse_return(d)?);
    Ok(())
}

fn error_page(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    parse_error_page(d, &mut location.error_pages)
}

fn client_max_body_size(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    location.client_max_body_size = parse_size(d, &d.args[0])?;
    Ok(())
}

// ============================================================
// Uploads
// ============================================================

fn upload_store(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    let store = parse_path(d)?;
    let upload = location.upload_mut();
    upload.store = store;
    upload.enabled = true;
    Ok(())
}

fn upload_store_permissions(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    location.upload_mut().permissions = parse_permissions(d, &d.args[0])?;
    Ok(())
}

/// `upload_store_access user:rw group:r all:r` or `upload_store_access none`
fn upload_store_access(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 1)?;
    let access: UploadAccess = d.joined(0).parse().map_err(value_error(d))?;
    location.upload_mut().access = access;
    Ok(())
}

fn upload_max_file_size(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    location.upload_mut().max_file_size = Some(parse_size(d, &d.args[0])?);
    Ok(())
}

fn upload_max_total_size(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    location.upload_mut().max_total_size = Some(parse_size(d, &d.args[0])?);
    Ok(())
}

// ============================================================
// Headers and CGI
// ============================================================

fn add_header(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 2)?;
    location.headers.push(HeaderEntry {
        name: d.args[0].clone(),
        value: d.joined(1),
    });
    Ok(())
}

fn fastcgi_param(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_min_args(d, 2)?;
    let value = d.joined(1);
    location.cgi_mut().params.insert(d.args[0].clone(), value);
    Ok(())
}

fn script(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    location.cgi_mut().script = Some(parse_path(d)?);
    Ok(())
}

fn cgi_root(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    location.cgi_mut().root = Some(parse_path(d)?);
    Ok(())
}

fn cgi_extension(location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    expect_args(d, 1)?;
    location.cgi_mut().extension = d.args[0].clone();
    Ok(())
}

fn include(_location: &mut LocationConfig, d: &Directive) -> ConfigResult<()> {
    let pattern = parse_path(d)?;
    tracing::info!(
        "Include '{}' at line {} is inside a location block and will not be expanded",
        pattern,
        d.line
    );
    Ok(())
}
