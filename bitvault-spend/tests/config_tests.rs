use bitcoin::Network;
use bitvault_spend::config::{ensure_config_exists, SpendConfig};
use bitvault_spend::error::{ErrorCategory, SpendError};
use bitvault_spend::fee_estimation::FeeRate;
use bitvault_spend::logging::LogLevel;
use bitvault_spend::pending::InMemoryPendingStore;
use bitvault_spend::planner::SpendPlanner;
use bitvault_spend::providers::ProviderRegistry;
use std::error::Error;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// Helper function to create a temporary directory and config file for testing
fn setup_test_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("spend.toml");
    fs::write(&config_path, content).expect("Failed to write test config");
    (temp_dir, config_path)
}

#[test]
fn test_load_config() {
    let (_dir, path) = setup_test_config(
        r#"
        [selection]
        network = "Testnet"
        min_confirmations = 3
        default_fee_rate_sat_per_kvb = 2500

        [provider]
        timeout_seconds = 10

        [logging]
        level = "Debug"
        console_logging = false
    "#,
    );

    let config = SpendConfig::load(&path).unwrap();
    assert_eq!(config.selection.network().unwrap(), Network::Testnet);
    assert_eq!(config.selection.min_confirmations, 3);
    assert_eq!(config.selection.default_fee_rate(), FeeRate::from_sat_per_kvb(2500));
    assert_eq!(config.provider.timeout_seconds, 10);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert!(!config.logging.console_logging);
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("spend.toml");

    let mut config = SpendConfig::default();
    config.selection.network = "signet".to_string();
    config.selection.min_confirmations = 6;
    config.save(&path).unwrap();

    assert_eq!(SpendConfig::load(&path).unwrap(), config);
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_dir, path) = setup_test_config(
        r#"
        [provider]
        timeout_seconds = 0
    "#,
    );
    let err = SpendConfig::load(&path).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_malformed_toml_is_serialization_error() {
    let (_dir, path) = setup_test_config("[selection\nnetwork = ");
    let err = SpendConfig::load(&path).unwrap_err();

    assert!(matches!(err, SpendError::Serialization { .. }));
    assert!(err.source().is_some());
    assert!(err.user_message().starts_with("Data format error"));
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = SpendConfig::load(&temp_dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, SpendError::Io { .. }));
    assert_eq!(err.category(), ErrorCategory::Io);
    assert!(!err.is_retryable());
}

#[test]
fn test_save_into_missing_directory_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("no-such-dir").join("spend.toml");

    let err = SpendConfig::default().save(&path).unwrap_err();
    assert!(matches!(err, SpendError::Io { .. }));
}

#[test]
fn test_ensure_config_exists_writes_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("spend.toml");

    ensure_config_exists(&path).unwrap();
    assert!(path.exists());
    assert_eq!(SpendConfig::load(&path).unwrap(), SpendConfig::default());

    // An existing file is left alone
    fs::write(&path, "[selection]\nmin_confirmations = 9\n").unwrap();
    ensure_config_exists(&path).unwrap();
    assert_eq!(SpendConfig::load(&path).unwrap().selection.min_confirmations, 9);
}

#[test]
fn test_planner_from_config() {
    let mut config = SpendConfig::default();
    config.selection.network = "regtest".to_string();
    let planner = SpendPlanner::from_config(
        &config,
        ProviderRegistry::new(),
        Arc::new(InMemoryPendingStore::new()),
    )
    .unwrap();
    assert_eq!(planner.network(), Network::Regtest);

    config.selection.network = "moonnet".to_string();
    assert!(SpendPlanner::from_config(
        &config,
        ProviderRegistry::new(),
        Arc::new(InMemoryPendingStore::new()),
    )
    .is_err());
}
