// Configuration system integration tests

use std::fs;
use std::path::PathBuf;
use storage_sync::config::{load_config, AppConfig};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(&path, content).expect("Failed to write temp config");
    path
}

#[test]
fn test_load_default_config() {
    let config_path = PathBuf::from("config/default.yaml");

    if config_path.exists() {
        let result = load_config(&config_path);
        assert!(result.is_ok(), "Failed to load default config: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.storage.list_queue_capacity, 1024);
        assert!(!config.storage.s3.allow_http);
        assert!(config.remote.is_none());
        assert_eq!(config.logging.level, "info");
    }
}

#[test]
fn test_config_with_env_vars() {
    let temp_config = r#"
storage:
  max_workers: ${STORAGE_SYNC_IT_WORKERS:-16}
  s3:
    endpoint: ${STORAGE_SYNC_IT_ENDPOINT}
    allow_http: true

remote:
  host: ${STORAGE_SYNC_IT_HOST:-localhost}
  port: 2222
  username: root
  private_keys:
    - /keys/id_ed25519

logging:
  level: debug
"#;

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, temp_config);

    std::env::set_var("STORAGE_SYNC_IT_ENDPOINT", "http://minio:9000");
    std::env::remove_var("STORAGE_SYNC_IT_WORKERS");
    std::env::remove_var("STORAGE_SYNC_IT_HOST");

    let result = load_config(&path);
    assert!(result.is_ok(), "Failed to load config with env vars: {:?}", result.err());
    let config = result.unwrap();

    assert_eq!(config.storage.max_workers, 16);
    assert_eq!(config.storage.s3.endpoint.as_deref(), Some("http://minio:9000"));
    assert!(config.storage.s3.allow_http);

    let remote = config.remote.expect("remote section");
    assert_eq!(remote.host, "localhost");
    assert_eq!(remote.port, 2222);
    assert_eq!(remote.destination(), "root@localhost");
    assert_eq!(remote.private_keys, vec![PathBuf::from("/keys/id_ed25519")]);

    std::env::remove_var("STORAGE_SYNC_IT_ENDPOINT");
}

#[test]
fn test_config_validation() {
    let invalid_config = r#"
storage:
  max_workers: 0  # INVALID: must be > 0
"#;

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, invalid_config);

    let result = load_config(&path);
    assert!(result.is_err(), "Expected validation error for invalid config");
    assert!(format!("{:#}", result.unwrap_err()).contains("max_workers"));
}

#[test]
fn test_config_unknown_log_level() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "logging:\n  level: loud\n");

    let err = load_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("logging.level"));
}

#[test]
fn test_config_defaults() {
    let config = AppConfig::default();

    assert_eq!(config.storage.max_workers, 128);
    assert_eq!(config.storage.list_queue_capacity, 1024);
    assert!(config.storage.s3.region.is_none());
    assert!(config.storage.gcs.service_account_path.is_none());
    assert!(config.remote.is_none());
    assert_eq!(config.logging.level, "info");
}
