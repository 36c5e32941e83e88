//! Configuration management for `PantryFinder`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::PantryFinderError;
use crate::resolver::{ResolverOptions, Strategy};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for `PantryFinder`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PantryFinderConfig {
    /// Geocoding provider configuration
    pub geocoding: GeocodingConfig,
    /// Reference data file locations
    pub data: DataConfig,
    /// Search defaults
    pub search: SearchConfig,
    /// Map presentation
    pub map: MapConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// OpenCage API key. Required to geocode street addresses.
    pub api_key: Option<String>,
    /// Base URL for the OpenCage geocoding API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

/// Reference data locations
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
    /// Agency directory CSV (Name, Contact, Hours, Address, Latitude, Longitude)
    pub agencies_csv: Option<PathBuf>,
    /// Tract-to-agency travel time CSV
    pub travel_times_csv: Option<PathBuf>,
    /// Census tract boundaries as GeoJSON
    pub tracts_geojson: Option<PathBuf>,
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub strategy: Strategy,
    /// Initial travel time budget in minutes
    pub time_budget_minutes: f64,
    /// Budget used when nothing is reachable within the initial one
    pub widened_time_budget_minutes: f64,
    /// Maximum number of agencies to return
    pub max_results: u32,
}

/// Map presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub zoom: f64,
    pub pitch: f64,
    /// Point radius in meters
    pub point_radius: f64,
    pub style: String,
    pub user_color: [u8; 3],
    pub agency_color: [u8; 3],
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

// Default value functions
fn default_geocoding_base_url() -> String {
    "https://api.opencagedata.com/geocode/v1".to_string()
}

fn default_geocoding_timeout() -> u32 {
    30
}

fn default_time_budget() -> f64 {
    20.0
}

fn default_widened_time_budget() -> f64 {
    60.0
}

fn default_max_results() -> u32 {
    10
}

fn default_map_style() -> String {
    "mapbox://styles/mapbox/light-v9".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_geocoding_timeout(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            time_budget_minutes: default_time_budget(),
            widened_time_budget_minutes: default_widened_time_budget(),
            max_results: default_max_results(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: 10.0,
            pitch: 0.0,
            point_radius: 250.0,
            style: default_map_style(),
            user_color: [0, 0, 255],
            agency_color: [255, 0, 0],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl SearchConfig {
    /// Resolver options for these search settings
    #[must_use]
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            strategy: self.strategy,
            time_budget_minutes: self.time_budget_minutes,
            widened_time_budget_minutes: self.widened_time_budget_minutes,
            max_results: self.max_results as usize,
        }
    }
}

impl PantryFinderConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // PANTRYFINDER_GEOCODING__API_KEY and friends
        builder = builder.add_source(
            Environment::with_prefix("PANTRYFINDER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: PantryFinderConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pantryfinder").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.search.time_budget_minutes == 0.0 {
            self.search.time_budget_minutes = default_time_budget();
        }
        if self.search.widened_time_budget_minutes == 0.0 {
            self.search.widened_time_budget_minutes = default_widened_time_budget();
        }
        if self.search.max_results == 0 {
            self.search.max_results = default_max_results();
        }
        if self.map.style.is_empty() {
            self.map.style = default_map_style();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.server.port == 0 {
            self.server.port = default_port();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate API keys and credentials
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(api_key) = &self.geocoding.api_key {
            if api_key.is_empty() {
                return Err(PantryFinderError::config(
                    "Geocoding API key cannot be empty if provided. Either remove it or provide a valid key.",
                )
                .into());
            }

            if api_key.len() < 8 {
                return Err(PantryFinderError::config(
                    "Geocoding API key appears to be invalid (too short). Please check your API key.",
                )
                .into());
            }

            if api_key.len() > 100 {
                return Err(PantryFinderError::config(
                    "Geocoding API key appears to be invalid (too long). Please check your API key.",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.geocoding.timeout_seconds > 300 {
            return Err(
                PantryFinderError::config("Geocoding timeout cannot exceed 300 seconds").into(),
            );
        }

        let budget = self.search.time_budget_minutes;
        if !budget.is_finite() || budget <= 0.0 {
            return Err(PantryFinderError::config(
                "Search time budget must be a positive number of minutes",
            )
            .into());
        }

        let widened = self.search.widened_time_budget_minutes;
        if !widened.is_finite() || widened < budget {
            return Err(PantryFinderError::config(
                "Widened time budget must be at least the initial time budget",
            )
            .into());
        }

        if self.search.max_results > 100 {
            return Err(PantryFinderError::config("Maximum results cannot exceed 100").into());
        }

        if !(0.0..=22.0).contains(&self.map.zoom) {
            return Err(PantryFinderError::config("Map zoom must be between 0 and 22").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(PantryFinderError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(PantryFinderError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.geocoding.base_url.starts_with("http://")
            && !self.geocoding.base_url.starts_with("https://")
        {
            return Err(PantryFinderError::config(
                "Geocoding base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}
