//! Configuration file support for Mapty.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/mapty/config.toml`.

use crate::session::SessionOptions;
use crate::{Coordinates, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Map display configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapConfig {
    /// Zoom used both for the initial view and when focusing a workout
    #[serde(default = "default_zoom")]
    pub zoom: u8,

    #[serde(default = "default_pan_duration_secs")]
    pub pan_duration_secs: f64,

    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    #[serde(default = "default_attribution")]
    pub attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            pan_duration_secs: default_pan_duration_secs(),
            tile_url: default_tile_url(),
            attribution: default_attribution(),
        }
    }
}

/// Fixed position used when none is given on the command line
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct HomePosition {
    pub lat: f64,
    pub lng: f64,
}

/// Position acquisition configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_geolocation_attempts")]
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<HomePosition>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            attempts: default_geolocation_attempts(),
            home: None,
        }
    }
}

impl GeolocationConfig {
    /// The configured home position, validated
    pub fn home_position(&self) -> Result<Option<Coordinates>> {
        self.home
            .map(|home| Coordinates::new(home.lat, home.lng))
            .transpose()
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("mapty")
}

fn default_zoom() -> u8 {
    13
}

fn default_pan_duration_secs() -> f64 {
    1.4
}

fn default_tile_url() -> String {
    "https://tile.openstreetmap.org/{z}/{x}/{y}.png".into()
}

fn default_attribution() -> String {
    "© OpenStreetMap contributors".into()
}

fn default_geolocation_attempts() -> u32 {
    3
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the session cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.map.zoom > 20 {
            return Err(Error::Config(format!(
                "map.zoom {} is above the maximum of 20",
                self.map.zoom
            )));
        }
        if !self.map.pan_duration_secs.is_finite() || self.map.pan_duration_secs < 0.0 {
            return Err(Error::Config(format!(
                "map.pan_duration_secs must be a non-negative number, got {}",
                self.map.pan_duration_secs
            )));
        }
        if self.geolocation.attempts == 0 {
            return Err(Error::Config("geolocation.attempts must be at least 1".into()));
        }
        self.geolocation
            .home_position()
            .map_err(|e| Error::Config(format!("geolocation.home: {}", e)))?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("mapty").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Storage file for workouts
    pub fn storage_path(&self) -> PathBuf {
        self.data.data_dir.join("workouts.json")
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            zoom: self.map.zoom,
            pan_duration_secs: self.map.pan_duration_secs,
            geolocation_attempts: self.geolocation.attempts,
        }
    }
}
