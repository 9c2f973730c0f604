//! Configuration system for winwm
//!
//! Loads configuration from TOML file at `~/.config/winwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reconciler: ReconcilerConfig,
    pub platform: PlatformConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, generating defaults if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let config = Self::from_toml_str(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse configuration text; missing sections and keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("winwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let default_config = Self::default();
        let toml_string = toml::to_string_pretty(&default_config)
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Reconciler behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Extra resize attempts allowed when a wrapping menu bar eats client height
    pub menu_wrap_retries: u32,
    /// Start with `wm tracing` switched on
    pub tracing: bool,
    /// Min size given to new toplevels
    pub default_min_width: i32,
    pub default_min_height: i32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            menu_wrap_retries: 4,
            tracing: false,
            default_min_width: 1,
            default_min_height: 1,
        }
    }
}

/// Simulated native window system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub screen_width: i32,
    pub screen_height: i32,
    /// Largest frame the user can track to
    pub max_track_width: i32,
    pub max_track_height: i32,
    /// Sizing border of resizable frames
    pub thick_frame: i32,
    /// Border of fixed-size frames
    pub thin_border: i32,
    /// Border of dialog frames
    pub dialog_border: i32,
    pub caption_height: i32,
    pub menu_height: i32,
    /// Frames narrower than this wrap their menu bar onto a second row
    /// (0 disables wrapping)
    pub menu_wrap_width: i32,
    /// Largest frame height the OS will grant (0 = unlimited)
    pub max_frame_height: i32,
    /// Number of palettes that can be realized at once
    pub palette_slots: usize,
    /// Position given to frames created without one
    pub default_x: i32,
    pub default_y: i32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280,
            screen_height: 1024,
            max_track_width: 1292,
            max_track_height: 1036,
            thick_frame: 4,
            thin_border: 1,
            dialog_border: 3,
            caption_height: 19,
            menu_height: 19,
            menu_wrap_width: 0,
            max_frame_height: 0,
            palette_slots: 4,
            default_x: 40,
            default_y: 40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            "[reconciler]\nmenu_wrap_retries = 2\n\n[platform]\nscreen_width = 800\n",
        )
        .unwrap();
        assert_eq!(config.reconciler.menu_wrap_retries, 2);
        assert!(!config.reconciler.tracing);
        assert_eq!(config.platform.screen_width, 800);
        assert_eq!(config.platform.screen_height, 1024);
    }

    #[test]
    fn test_missing_file_generates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winwm").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.reconciler.menu_wrap_retries, 4);
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.platform.caption_height, config.platform.caption_height);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(Config::from_toml_str("[reconciler\n").is_err());
    }
}
