//! Loading configuration from files on disk.

use std::io::Write;
use std::time::Duration;
use stitch_config::{ConfigError, ConfigLoader, LogFormat};

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn loads_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "stitch.toml",
        r#"
[server]
http_addr = "127.0.0.1:3000"
request_timeout_ms = 1500

[logging]
format = "pretty"
service_name = "orders"
"#,
    );

    let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();
    let server = config.server_config();

    assert_eq!(server.http_addr(), "127.0.0.1:3000");
    assert_eq!(server.request_timeout(), Some(Duration::from_millis(1500)));
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.telemetry_config().service_name, "orders");
}

#[test]
fn loads_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "stitch.json",
        r#"{"metrics": {"enabled": true, "listen_addr": "127.0.0.1:9100"}}"#,
    );

    let config = ConfigLoader::new().with_file(&path).unwrap().load().unwrap();
    assert!(config.metrics_config().enabled);
    assert_eq!(config.metrics.listen_addr.as_deref(), Some("127.0.0.1:9100"));
}

#[test]
fn later_files_override_earlier_ones() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_file(
        &dir,
        "base.toml",
        "[server]\nhttp_addr = \"127.0.0.1:1\"\nkeep_alive = false\n",
    );
    let local = write_file(&dir, "local.toml", "[server]\nhttp_addr = \"127.0.0.1:2\"\n");

    let config = ConfigLoader::new()
        .with_file(&base)
        .unwrap()
        .with_file(&local)
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.server.http_addr, "127.0.0.1:2");
    assert!(!config.server.keep_alive);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ConfigLoader::new().with_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
}

#[test]
fn missing_optional_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigLoader::new()
        .with_optional_file(dir.path().join("absent.toml"))
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.server.http_addr, "0.0.0.0:8080");
}

#[test]
fn unsupported_extension_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "stitch.yaml", "server: {}\n");
    let result = ConfigLoader::new().with_file(&path);
    assert!(matches!(result, Err(ConfigError::UnsupportedFormat { .. })));
}

#[test]
fn malformed_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "stitch.toml", "[server\nhttp_addr = 1");
    let result = ConfigLoader::new().with_file(&path);
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn missing_dotenv_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = ConfigLoader::new().with_dotenv_file(dir.path().join(".env"));
    assert!(matches!(result, Err(ConfigError::Dotenv(_))));
}
