#![allow(clippy::unwrap_used, clippy::expect_used)]

use objroute::config::{ConfigError, ServerConfig, UriType};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

// These tests read global env vars. Use a mutex to serialize access.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clean_env_vars() {
    std::env::remove_var("OBJR_URI_TYPE");
    std::env::remove_var("OBJR_POOL_IDLE_SECS");
}

fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_yaml_file() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clean_env_vars();

    let file = write_config(
        ".yaml",
        "name: users\nuri_type: all-lower\npool_idle_timeout_secs: 60\n",
    );
    let config = ServerConfig::load(file.path()).unwrap();
    assert_eq!(config.name, "users");
    assert_eq!(config.uri_type, UriType::AllLower);
    assert_eq!(config.pool_idle_timeout(), Duration::from_secs(60));
}

#[test]
fn test_load_json_file() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clean_env_vars();

    let file = write_config(".json", r#"{ "uri_type": "full-name" }"#);
    let config = ServerConfig::load(file.path()).unwrap();
    assert_eq!(config.uri_type, UriType::FullName);
    assert_eq!(config.pool_idle_timeout_secs, 300);
}

#[test]
fn test_env_overrides_file() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clean_env_vars();
    std::env::set_var("OBJR_URI_TYPE", "camel");
    std::env::set_var("OBJR_POOL_IDLE_SECS", "5");

    let file = write_config(".yml", "uri_type: all-lower\npool_idle_timeout_secs: 60\n");
    let config = ServerConfig::load(file.path()).unwrap();
    assert_eq!(config.uri_type, UriType::Camel);
    assert_eq!(config.pool_idle_timeout_secs, 5);

    std::env::set_var("OBJR_POOL_IDLE_SECS", "soon");
    assert_eq!(ServerConfig::from_env().pool_idle_timeout_secs, 300);
    clean_env_vars();
}

#[test]
fn test_missing_and_malformed_files() {
    let _guard = ENV_MUTEX.lock().unwrap();
    clean_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");
    let err = ServerConfig::load(&missing).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.yaml"));

    let file = write_config(".yaml", "pool_idle_timeout_secs: [1, 2]\n");
    assert!(matches!(
        ServerConfig::load(file.path()),
        Err(ConfigError::Yaml(_))
    ));
}
