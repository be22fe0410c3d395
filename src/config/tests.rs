//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, serialization/deserialization,
//! and edge cases in configuration handling.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = TetherConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.seat.name, "seat0");
    assert_eq!(config.seat.version, SEAT_MAX_VERSION);
    assert!(config.registry.max_resources_per_client > 0);
    assert!(config.session.event_queue_capacity > 0);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_configuration_serialization_roundtrip() -> Result<()> {
    let mut original_config = TetherConfig::default();
    original_config.seat.touch = true;
    original_config.registry.max_resources_per_client = 16;

    let toml_string = toml::to_string(&original_config)?;
    let deserialized_config: TetherConfig = toml::from_str(&toml_string)?;

    assert_eq!(original_config, deserialized_config);

    Ok(())
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("tether.toml");

    let test_config = r#"
[seat]
name = "seat-test"
version = 1
pointer = false
keyboard = true
touch = true

[compositor]
compositor_version = 3
subcompositor_version = 1

[registry]
max_resources_per_client = 32

[session]
event_queue_capacity = 8

[logging]
level = "debug"
timestamps = "seconds"
module_path = true
tracing = true
"#;

    fs::write(&file_path, test_config)?;

    let config = TetherConfig::load(&file_path)?;

    assert_eq!(config.seat.name, "seat-test");
    assert_eq!(config.seat.version, 1);
    assert!(!config.seat.pointer);
    assert!(config.seat.touch);
    assert_eq!(config.compositor.compositor_version, 3);
    assert_eq!(config.registry.max_resources_per_client, 32);
    assert_eq!(config.session.event_queue_capacity, 8);
    assert_eq!(config.logging.timestamps, "seconds");
    assert!(config.logging.tracing);

    // Sections left out fall back to their defaults
    assert_eq!(config.window_management, WindowManagementConfig::default());

    Ok(())
}

#[test]
fn test_partial_section_uses_field_defaults() -> Result<()> {
    let config: TetherConfig = toml::from_str(
        r#"
[seat]
name = "only-name"
"#,
    )?;

    assert_eq!(config.seat.name, "only-name");
    assert_eq!(config.seat.version, SeatConfig::default().version);
    assert!(config.seat.pointer);
    assert!(config.validate().is_ok());

    Ok(())
}

#[test]
fn test_missing_file_falls_back_to_defaults() -> Result<()> {
    let dir = tempdir()?;
    let config = TetherConfig::load(dir.path().join("absent.toml"))?;

    assert_eq!(config, TetherConfig::default());

    Ok(())
}

#[test]
fn test_malformed_file_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("broken.toml");
    fs::write(&file_path, "[seat\nname = ")?;

    let err = TetherConfig::load(&file_path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));

    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() {
    let mut config = TetherConfig::default();
    config.seat.version = 0;
    assert!(config.validate().is_err());

    let mut config = TetherConfig::default();
    config.seat.version = SEAT_MAX_VERSION + 1;
    assert!(config.validate().is_err());

    let mut config = TetherConfig::default();
    config.seat.name.clear();
    assert!(config.validate().is_err());

    let mut config = TetherConfig::default();
    config.compositor.subcompositor_version = 2;
    assert!(config.validate().is_err());

    let mut config = TetherConfig::default();
    config.registry.max_resources_per_client = 0;
    assert!(config.validate().is_err());

    let mut config = TetherConfig::default();
    config.session.event_queue_capacity = 0;
    assert!(config.validate().is_err());

    let mut config = TetherConfig::default();
    config.logging.timestamps = "nanos".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_file_is_rejected_on_load() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("invalid.toml");
    fs::write(&file_path, "[window_management]\nversion = 9\n")?;

    assert!(TetherConfig::load(&file_path).is_err());

    Ok(())
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut config = TetherConfig::default();
    config.seat.name = "seat-saved".to_string();
    config.logging.module_path = true;
    config.save(&file_path)?;

    let reloaded = TetherConfig::load(&file_path)?;
    assert_eq!(reloaded, config);

    Ok(())
}

#[test]
fn test_home_expansion() -> Result<()> {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/".to_string());

    let expanded = expand_home(Path::new("~/tether/config.toml"))?;
    assert_eq!(expanded, Path::new(&home).join("tether/config.toml"));

    let untouched = expand_home(Path::new("/etc/tether.toml"))?;
    assert_eq!(untouched, Path::new("/etc/tether.toml"));

    Ok(())
}
