//! Tests for configuration loading and saving.

use slimebridge::config::{
    load_config_from, load_or_init_config, save_config_to, BridgeConfig, ConfigError,
};
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = BridgeConfig::default();
    config.server.host = "192.168.1.20".to_string();
    config.server.port = 6970;
    config.receiver.product_id = 0x7690;
    config.timing.telemetry_interval_secs = 10;

    save_config_to(&config, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(loaded.server_address(), "192.168.1.20:6970");
    assert_eq!(
        loaded.bridge_settings().telemetry_interval,
        Duration::from_secs(10)
    );
}

#[test]
fn test_invalid_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server\nport = \"x\"").unwrap();

    assert!(matches!(
        load_config_from(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_first_run_writes_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("SlimeBridge").join("config.toml");

    let config = load_or_init_config(&path).unwrap();
    assert_eq!(config, BridgeConfig::default());
    assert!(path.exists());

    // An edited file is loaded, not overwritten
    let mut edited = config;
    edited.server.port = 6971;
    save_config_to(&edited, &path).unwrap();
    assert_eq!(load_or_init_config(&path).unwrap().server.port, 6971);
}
