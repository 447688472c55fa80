use std::fs;

use serde_json::json;
use tempfile::tempdir;

use crate::config::{ConfigError, ConfigFormat, RegistryConfig};

#[test]
fn test_default_config() {
    let config = RegistryConfig::default();
    assert!(config.auto_enable_loaded_plugins);
    assert!(config.feature_flags.is_empty());
    assert!(config.initial_flags().is_empty());
    assert!(config.to_options().auto_enable_loaded_plugins);
    assert!(config.to_options().post_process_extensions.is_none());
}

#[test]
fn test_format_from_path() {
    assert_eq!(ConfigFormat::from_path("a/b.json".as_ref()), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_path("lattice.JSON".as_ref()), Some(ConfigFormat::Json));
    assert_eq!(ConfigFormat::from_path("lattice.ini".as_ref()), None);
    assert_eq!(ConfigFormat::from_path("lattice".as_ref()), None);
    #[cfg(feature = "yaml-config")]
    assert_eq!(ConfigFormat::from_path("lattice.yml".as_ref()), Some(ConfigFormat::Yaml));
    #[cfg(feature = "toml-config")]
    assert_eq!(ConfigFormat::from_path("lattice.toml".as_ref()), Some(ConfigFormat::Toml));
}

#[test]
fn test_json_partial_config_uses_defaults() {
    let config = RegistryConfig::from_str(r#"{ "feature_flags": { "A": true, "B": "yes", "C": false } }"#, ConfigFormat::Json)
        .expect("valid json config");
    assert!(config.auto_enable_loaded_plugins);
    assert_eq!(config.feature_flags.get("B"), Some(&json!("yes")));

    let flags = config.initial_flags();
    assert_eq!(flags.len(), 2);
    assert_eq!(flags.get("A"), Some(&true));
    assert_eq!(flags.get("C"), Some(&false));
    assert!(!flags.contains_key("B"));
}

#[test]
fn test_unknown_key_is_rejected() {
    let err = RegistryConfig::from_str(r#"{ "auto_enable": false }"#, ConfigFormat::Json).unwrap_err();
    match err {
        ConfigError::Deserialization { format, .. } => assert_eq!(format, "json"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(feature = "toml-config")]
#[test]
fn test_load_toml_file() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("lattice.toml");
    fs::write(
        &path,
        "auto_enable_loaded_plugins = false\n\n[feature_flags]\nTELEMETRY = true\nLEVEL = 3\n",
    )
    .expect("write config");

    let config = RegistryConfig::load(&path).expect("load toml config");
    assert!(!config.auto_enable_loaded_plugins);
    assert!(!config.to_options().auto_enable_loaded_plugins);
    let flags = config.initial_flags();
    assert_eq!(flags.len(), 1);
    assert_eq!(flags.get("TELEMETRY"), Some(&true));
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_load_yaml_file() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("lattice.yaml");
    fs::write(&path, "feature_flags:\n  DARK_MODE: false\n").expect("write config");

    let config = RegistryConfig::load(&path).expect("load yaml config");
    assert!(config.auto_enable_loaded_plugins);
    assert_eq!(config.initial_flags().get("DARK_MODE"), Some(&false));
}

#[cfg(feature = "yaml-config")]
#[test]
fn test_empty_yaml_is_default() {
    let config = RegistryConfig::from_str("  \n", ConfigFormat::Yaml).expect("empty yaml");
    assert_eq!(config, RegistryConfig::default());
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("absent.json");
    match RegistryConfig::load(&path) {
        Err(ConfigError::Io { operation, path: err_path, .. }) => {
            assert_eq!(operation, "read_to_string");
            assert_eq!(err_path, path);
        }
        other => panic!("expected I/O error, got {other:?}"),
    }
}

#[test]
fn test_load_unsupported_extension() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("lattice.ini");
    fs::write(&path, "x=1").expect("write config");
    let err = RegistryConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    assert!(err.to_string().contains("lattice.ini"));
}
