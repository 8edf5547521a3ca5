use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn webserv(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_webserv"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run webserv")
}

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_validate_ok() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "webserv.conf",
        "http {\n    server {\n        listen 8080;\n        root /var/www;\n    }\n}\n",
    );

    let output = webserv(&["validate", &config]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("is valid!"));
}

#[test]
fn test_validate_reports_syntax_error() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "broken.conf",
        "server {\n    listen 8080;\n    root;\n}\n",
    );

    let output = webserv(&["validate", &config]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Directive 'root' requires exactly 1 argument(s)"));
}

#[test]
fn test_validate_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.conf");

    let output = webserv(&["validate", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("File not found"));
}

#[test]
fn test_show_merges_include() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "main.conf", "server { listen 80; root /var/www; }\n");
    write(dir.path(), "extra.conf", "server { listen 81; server_name extra.test; root /srv; }\n");
    let pattern = dir.path().join("*.conf");

    // The pattern also matches main.conf, so port 80 is declared twice
    let output = webserv(&["show", &config, "--include", pattern.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let only_extra = dir.path().join("ext*.conf");
    let output = webserv(&["show", &config, "--include", only_extra.to_str().unwrap()]);
    assert!(output.status.success());
    let tree: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tree["servers"].as_array().unwrap().len(), 2);
    assert_eq!(tree["servers"][1]["server_names"][0], "extra.test");
}

#[test]
fn test_show_toml() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "main.conf", "server { listen 80; root /var/www; }\n");

    let output = webserv(&["show", &config, "--format", "toml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[[servers]]"));
}

#[test]
fn test_version() {
    let output = webserv(&["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Webserv v"));
}
