//! Configuration management for the `Eventopia` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::EventopiaError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `Eventopia` application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventopiaConfig {
    /// Event search provider configuration
    pub search: SearchConfig,
    /// Geocoding resolution configuration
    pub geocoding: GeocodingConfig,
    /// Generative model configuration
    pub generation: GenerationConfig,
    /// Document store configuration
    pub store: StoreConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// Event search provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search provider API key
    pub api_key: Option<String>,
    /// Base URL for the search API
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_seconds: u32,
    /// Number of result pages to aggregate per query
    #[serde(default = "default_search_pages")]
    pub pages: u32,
    /// Number of results per page (offset multiplier)
    #[serde(default = "default_search_page_size")]
    pub page_size: u32,
    /// Worker pool size for per-event geocoding
    #[serde(default = "default_search_workers")]
    pub workers: u32,
    /// Region string used when automatic location detection fails
    #[serde(default = "default_fallback_region")]
    pub fallback_region: String,
}

/// Geocoding resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Maximum attempts per address candidate
    #[serde(default = "default_geocoding_max_retries")]
    pub max_retries: u32,
    /// Fixed backoff between timed-out attempts, in seconds
    #[serde(default = "default_geocoding_backoff")]
    pub backoff_seconds: u32,
    /// Minimum delay between any two provider calls, in milliseconds
    #[serde(default = "default_geocoding_min_interval")]
    pub min_request_interval_ms: u32,
}

/// Generative model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Generative model API key
    pub api_key: Option<String>,
    /// Base URL for the generation API
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    /// Model name
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u32,
}

/// Document store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// TTL for cached event aggregates, in hours
    #[serde(default = "default_store_ttl")]
    pub ttl_hours: u32,
    /// Store directory location
    #[serde(default = "default_store_location")]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

// Default value functions
fn default_search_base_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_search_timeout() -> u32 {
    30
}

fn default_search_pages() -> u32 {
    3
}

fn default_search_page_size() -> u32 {
    10
}

fn default_search_workers() -> u32 {
    4
}

fn default_fallback_region() -> String {
    "USA".to_string()
}

fn default_geocoding_max_retries() -> u32 {
    3
}

fn default_geocoding_backoff() -> u32 {
    2
}

fn default_geocoding_min_interval() -> u32 {
    1000
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generation_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_generation_timeout() -> u32 {
    60
}

fn default_store_ttl() -> u32 {
    6
}

fn default_store_location() -> String {
    "~/.cache/eventopia".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_server_port() -> u16 {
    3000
}

impl Default for EventopiaConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig {
                api_key: None,
                base_url: default_search_base_url(),
                timeout_seconds: default_search_timeout(),
                pages: default_search_pages(),
                page_size: default_search_page_size(),
                workers: default_search_workers(),
                fallback_region: default_fallback_region(),
            },
            geocoding: GeocodingConfig {
                max_retries: default_geocoding_max_retries(),
                backoff_seconds: default_geocoding_backoff(),
                min_request_interval_ms: default_geocoding_min_interval(),
            },
            generation: GenerationConfig {
                api_key: None,
                base_url: default_generation_base_url(),
                model: default_generation_model(),
                timeout_seconds: default_generation_timeout(),
            },
            store: StoreConfig {
                ttl_hours: default_store_ttl(),
                location: default_store_location(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            server: ServerConfig {
                port: default_server_port(),
            },
        }
    }
}

impl EventopiaConfig {
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

        // Add environment variable overrides with EVENTOPIA_ prefix
        builder = builder.add_source(
            Environment::with_prefix("EVENTOPIA")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: EventopiaConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("eventopia").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.search.base_url.is_empty() {
            self.search.base_url = default_search_base_url();
        }
        if self.search.timeout_seconds == 0 {
            self.search.timeout_seconds = default_search_timeout();
        }
        if self.search.pages == 0 {
            self.search.pages = default_search_pages();
        }
        if self.search.page_size == 0 {
            self.search.page_size = default_search_page_size();
        }
        if self.search.workers == 0 {
            self.search.workers = default_search_workers();
        }
        if self.search.fallback_region.is_empty() {
            self.search.fallback_region = default_fallback_region();
        }
        if self.geocoding.max_retries == 0 {
            self.geocoding.max_retries = default_geocoding_max_retries();
        }
        if self.generation.base_url.is_empty() {
            self.generation.base_url = default_generation_base_url();
        }
        if self.generation.model.is_empty() {
            self.generation.model = default_generation_model();
        }
        if self.store.ttl_hours == 0 {
            self.store.ttl_hours = default_store_ttl();
        }
        if self.store.location.is_empty() {
            self.store.location = default_store_location();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Require the credentials the pipeline cannot run without.
    ///
    /// Called at startup; a missing key here is fatal, unlike the
    /// best-effort failures inside the pipeline.
    pub fn require_credentials(&self) -> Result<()> {
        match &self.search.api_key {
            Some(key) if !key.is_empty() => {}
            _ => {
                return Err(EventopiaError::config(
                    "Search API key is required. Set EVENTOPIA_SEARCH__API_KEY or add it to the config file.",
                )
                .into());
            }
        }

        match &self.generation.api_key {
            Some(key) if !key.is_empty() => {}
            _ => {
                return Err(EventopiaError::config(
                    "Generation API key is required. Set EVENTOPIA_GENERATION__API_KEY or add it to the config file.",
                )
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.search.timeout_seconds > 300 {
            return Err(
                EventopiaError::config("Search API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.search.pages > 10 {
            return Err(EventopiaError::config("Search page count cannot exceed 10").into());
        }

        if self.search.workers > 8 {
            return Err(EventopiaError::config("Geocoding worker count cannot exceed 8").into());
        }

        if self.geocoding.max_retries > 10 {
            return Err(EventopiaError::config("Geocoding max retries cannot exceed 10").into());
        }

        if self.geocoding.backoff_seconds > 60 {
            return Err(EventopiaError::config("Geocoding backoff cannot exceed 60 seconds").into());
        }

        if self.store.ttl_hours > 168 {
            return Err(
                EventopiaError::config("Store TTL cannot exceed 168 hours (1 week)").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(EventopiaError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(EventopiaError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.search.base_url.starts_with("http://")
            && !self.search.base_url.starts_with("https://")
        {
            return Err(EventopiaError::config(
                "Search API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if !self.generation.base_url.starts_with("http://")
            && !self.generation.base_url.starts_with("https://")
        {
            return Err(EventopiaError::config(
                "Generation API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(())
    }
}
