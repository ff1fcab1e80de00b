use evaluator_core::config::{ConfigManager, ConfigurationError};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write config file");
}

#[test]
fn test_environment_file_overrides_base() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "driver-config.yaml",
        "evaluator:\n  release_grace_period_ms: 100\n  heartbeat_sanity_check: true\nevents:\n  publisher_capacity: 500\n",
    );
    write(
        dir.path(),
        "driver-config.staging.yaml",
        "evaluator:\n  release_grace_period_ms: 250\n",
    );

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "staging")
            .unwrap();

    let config = manager.config();
    assert_eq!(manager.environment(), "staging");
    assert_eq!(
        config.evaluator.release_grace_period(),
        Duration::from_millis(250)
    );
    assert!(config.evaluator.heartbeat_sanity_check);
    assert_eq!(config.events.publisher_capacity, 500);
}

#[test]
fn test_missing_override_uses_base_and_defaults() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "driver-config.yaml",
        "restart:\n  reconciliation_window_ms: 5000\n",
    );

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "production")
            .unwrap();

    let config = manager.config();
    assert_eq!(
        config.restart.reconciliation_window(),
        Duration::from_secs(5)
    );
    assert_eq!(
        config.evaluator.release_grace_period(),
        Duration::from_millis(100)
    );
    assert_eq!(config.events.publisher_capacity, 1000);
    assert_eq!(manager.config_directory(), dir.path());
}

#[test]
fn test_invalid_yaml_is_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "driver-config.yaml", "evaluator: [unclosed\n");

    let result =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");

    assert!(matches!(
        result,
        Err(ConfigurationError::InvalidYaml { .. })
    ));
}

#[test]
fn test_invalid_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "driver-config.yaml",
        "events:\n  publisher_capacity: 0\n",
    );

    let result =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");

    match result {
        Err(ConfigurationError::InvalidValue { field, .. }) => {
            assert_eq!(field, "events.publisher_capacity");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn test_missing_base_file() {
    let dir = TempDir::new().unwrap();

    let result =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "test");

    assert!(matches!(
        result,
        Err(ConfigurationError::ConfigFileNotFound { .. })
    ));
}

#[test]
fn test_repository_config_for_test_environment() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config");

    let manager = ConfigManager::load_from_directory_with_env(Some(dir), "test").unwrap();

    let config = manager.config();
    assert_eq!(
        config.evaluator.release_grace_period(),
        Duration::from_millis(10)
    );
    assert_eq!(
        config.restart.reconciliation_window(),
        Duration::from_millis(500)
    );
    assert_eq!(config.events.publisher_capacity, 64);
    assert_eq!(manager.debug_config()["evaluator"]["heartbeat_sanity_check"], true);
}
