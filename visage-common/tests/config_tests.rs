//! Configuration loading tests
//!
//! Covers:
//! - Missing TOML file falls back to defaults
//! - TOML values are parsed into the typed config
//! - Environment variables override TOML values
//! - Invalid TOML is reported as a configuration error
//!
//! Note: tests that touch VISAGE_* / GOOGLE_AI_API_KEY are marked #[serial]
//! so they never race on process environment.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use visage_common::config::TomlConfig;
use visage_common::Error;

const ENV_VARS: [&str; 6] = [
    "VISAGE_ROOT_FOLDER",
    "VISAGE_DATABASE_PATH",
    "VISAGE_API_KEYS",
    "VISAGE_ORACLE_API_KEY",
    "VISAGE_ORACLE_MODEL",
    "GOOGLE_AI_API_KEY",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = TomlConfig::load(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.upload.max_file_size, 10 * 1024 * 1024);
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_file_is_parsed() {
    let file = write_config(
        r#"
root_folder = "/var/lib/visage"

[server]
host = "0.0.0.0"
port = 9100

[upload]
max_file_size = 2048
allowed_types = ["image/png"]

[oracle]
api_key = "oracle-secret"
model_name = "gemini-1.5-pro"
timeout_secs = 15

[auth]
api_keys = ["k-one", "k-two"]

[rate_limit]
requests_per_minute = 0
"#,
    );

    let config = TomlConfig::load(file.path()).unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.upload.max_file_size, 2048);
    assert_eq!(config.upload.allowed_types, vec!["image/png"]);
    assert_eq!(config.oracle.model_name, "gemini-1.5-pro");
    assert_eq!(config.oracle.timeout_secs, 15);
    // Fields absent from [oracle] keep their defaults
    assert_eq!(config.oracle.max_output_tokens, 2048);
    assert_eq!(config.auth.api_keys, vec!["k-one", "k-two"]);
    assert_eq!(config.rate_limit.requests_per_minute, 0);
    assert_eq!(
        config.database_path(),
        PathBuf::from("/var/lib/visage/visage.db")
    );
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config("[server]\nport = 8123\n");
    let config = TomlConfig::load(file.path()).unwrap();

    assert_eq!(config.server.port, 8123);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.oracle.model_name, "gemini-1.5-flash");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let file = write_config("[server\nport = ");
    let err = TomlConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let file = write_config("[auth]\napi_keys = [\"from-file\"]\n");

    env::set_var("VISAGE_API_KEYS", "env-a, env-b");
    env::set_var("VISAGE_ORACLE_MODEL", "gemini-test");
    env::set_var("VISAGE_DATABASE_PATH", "/tmp/visage-test.db");

    let mut config = TomlConfig::load(file.path()).unwrap();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.auth.api_keys, vec!["env-a", "env-b"]);
    assert_eq!(config.oracle.model_name, "gemini-test");
    assert_eq!(config.database_path(), PathBuf::from("/tmp/visage-test.db"));
}

#[test]
#[serial]
fn test_google_key_fallback() {
    clear_env();
    env::set_var("GOOGLE_AI_API_KEY", "google-fallback");

    let mut config = TomlConfig::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.oracle.api_key, "google-fallback");
}

#[test]
#[serial]
fn test_no_env_leaves_file_values() {
    clear_env();
    let file = write_config("[oracle]\napi_key = \"file-key\"\n");

    let mut config = TomlConfig::load(file.path()).unwrap();
    config.apply_env_overrides();

    assert_eq!(config.oracle.api_key, "file-key");
}
