//! Configuration management for tether
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files: advertised global versions, the initial seat, resource
//! limits, session queue sizes and logging.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::seat::SEAT_MAX_VERSION;

/// Highest compositor version this implementation speaks
pub const COMPOSITOR_MAX_VERSION: u32 = 4;

/// Highest subcompositor version this implementation speaks
pub const SUBCOMPOSITOR_MAX_VERSION: u32 = 1;

/// Highest window management version this implementation speaks
pub const WINDOW_MANAGEMENT_MAX_VERSION: u32 = 1;

/// Main configuration struct containing all tether settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TetherConfig {
    /// Initial seat global
    #[serde(default)]
    pub seat: SeatConfig,

    /// Surface globals
    #[serde(default)]
    pub compositor: CompositorConfig,

    /// Window management global
    #[serde(default)]
    pub window_management: WindowManagementConfig,

    /// Per-client resource accounting
    #[serde(default)]
    pub registry: RegistryConfig,

    /// In-process session plumbing
    #[serde(default)]
    pub session: SessionConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Initial seat advertised at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeatConfig {
    /// Device name sent to bindings at version 2 and newer
    pub name: String,

    /// Advertised seat version
    pub version: u32,

    pub pointer: bool,
    pub keyboard: bool,
    pub touch: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompositorConfig {
    pub compositor_version: u32,
    pub subcompositor_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowManagementConfig {
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Live resources a single client may hold before allocation fails
    pub max_resources_per_client: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Bounded queue size of each window event subscriber
    pub event_queue_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,

    /// Timestamp precision: "none", "seconds", "millis"
    pub timestamps: String,

    /// Show the emitting module in each line
    pub module_path: bool,

    /// Also install a tracing subscriber for dispatch spans
    pub tracing: bool,
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            name: "seat0".to_string(),
            version: SEAT_MAX_VERSION,
            pointer: true,
            keyboard: true,
            touch: false,
        }
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            compositor_version: COMPOSITOR_MAX_VERSION,
            subcompositor_version: SUBCOMPOSITOR_MAX_VERSION,
        }
    }
}

impl Default for WindowManagementConfig {
    fn default() -> Self {
        Self {
            version: WINDOW_MANAGEMENT_MAX_VERSION,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_resources_per_client: 4096,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: 64,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            timestamps: "millis".to_string(),
            module_path: false,
            tracing: false,
        }
    }
}

impl TetherConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_home(path.as_ref())?;

        if !expanded_path.exists() {
            log::info!(
                "No config at {}, using defaults",
                expanded_path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: TetherConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.seat.version == 0 || self.seat.version > SEAT_MAX_VERSION {
            anyhow::bail!(
                "Invalid seat version {}: must be between 1 and {}",
                self.seat.version,
                SEAT_MAX_VERSION
            );
        }

        if self.seat.name.is_empty() {
            anyhow::bail!("Invalid seat name: must not be empty");
        }

        if self.compositor.compositor_version == 0
            || self.compositor.compositor_version > COMPOSITOR_MAX_VERSION
        {
            anyhow::bail!(
                "Invalid compositor version {}: must be between 1 and {}",
                self.compositor.compositor_version,
                COMPOSITOR_MAX_VERSION
            );
        }

        if self.compositor.subcompositor_version == 0
            || self.compositor.subcompositor_version > SUBCOMPOSITOR_MAX_VERSION
        {
            anyhow::bail!(
                "Invalid subcompositor version {}: must be between 1 and {}",
                self.compositor.subcompositor_version,
                SUBCOMPOSITOR_MAX_VERSION
            );
        }

        if self.window_management.version == 0
            || self.window_management.version > WINDOW_MANAGEMENT_MAX_VERSION
        {
            anyhow::bail!(
                "Invalid window management version {}: must be between 1 and {}",
                self.window_management.version,
                WINDOW_MANAGEMENT_MAX_VERSION
            );
        }

        if self.registry.max_resources_per_client == 0 {
            anyhow::bail!("Invalid max_resources_per_client: must be at least 1");
        }

        if self.session.event_queue_capacity == 0 {
            anyhow::bail!("Invalid event_queue_capacity: must be at least 1");
        }

        let valid_timestamps = ["none", "seconds", "millis"];
        if !valid_timestamps.contains(&self.logging.timestamps.as_str()) {
            anyhow::bail!("Invalid timestamp precision: {}", self.logging.timestamps);
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests;

#[cfg(test)]
mod property_tests;
