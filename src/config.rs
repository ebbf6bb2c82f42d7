//! Configuration management for `TourPlan`
//!
//! Handles loading configuration from a TOML file and environment variables,
//! and provides validation for all configuration settings.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::TourPlanError;
use crate::retry::RetryConfig;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TOURPLAN_CONFIG";

/// Root configuration structure for `TourPlan`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TourPlanConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub places: PlacesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Requests allowed per client within one window
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_seconds: u64,
}

/// Outbound HTTP settings shared by all upstream clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Public geocoding and POI services require an identifying agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Geocoding service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Candidates kept per lookup
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    #[serde(default = "default_geocoding_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Request timeout in seconds
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL for weather API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// IANA timezone or `auto`
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Per-attempt timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Points-of-interest search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    /// Search radius in metres for the first round
    #[serde(default = "default_radius")]
    pub default_radius_m: u32,
    #[serde(default = "default_expansion_factor")]
    pub expansion_factor: u32,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
    /// Maximum number of places to return
    #[serde(default = "default_poi_limit")]
    pub limit: usize,
    #[serde(default = "default_places_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Per-attempt timeout in seconds
    #[serde(default = "default_places_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_places_retry")]
    pub retry: RetryConfig,
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

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
    ]
}

fn default_rate_limit_requests() -> u32 {
    30
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_user_agent() -> String {
    crate::http::DEFAULT_USER_AGENT.to_string()
}

fn default_geocoding_base_url() -> String {
    crate::geocode::nominatim::DEFAULT_BASE_URL.to_string()
}

fn default_result_limit() -> usize {
    crate::geocode::DEFAULT_RESULT_LIMIT
}

fn default_geocoding_cache_ttl() -> u64 {
    crate::geocode::DEFAULT_CACHE_TTL.as_secs()
}

fn default_geocoding_timeout() -> u64 {
    10
}

fn default_weather_base_url() -> String {
    crate::weather::open_meteo::DEFAULT_BASE_URL.to_string()
}

fn default_timezone() -> String {
    crate::weather::open_meteo::DEFAULT_TIMEZONE.to_string()
}

fn default_weather_timeout() -> u64 {
    crate::weather::DEFAULT_TIMEOUT.as_secs()
}

fn default_forecast_days() -> usize {
    crate::weather::open_meteo::DEFAULT_FORECAST_DAYS
}

fn default_places_base_url() -> String {
    crate::places::overpass::DEFAULT_BASE_URL.to_string()
}

fn default_radius() -> u32 {
    crate::places::DEFAULT_RADIUS_M
}

fn default_expansion_factor() -> u32 {
    crate::places::RADIUS_EXPANSION_FACTOR
}

fn default_max_expansions() -> u32 {
    crate::places::MAX_EXPANSIONS
}

fn default_poi_limit() -> usize {
    crate::places::POI_LIMIT
}

fn default_places_cache_ttl() -> u64 {
    crate::places::DEFAULT_CACHE_TTL.as_secs()
}

fn default_places_timeout() -> u64 {
    crate::places::DEFAULT_TIMEOUT.as_secs()
}

fn default_places_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff_factor_ms: 400,
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_window_seconds: default_rate_limit_window(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            result_limit: default_result_limit(),
            cache_ttl_seconds: default_geocoding_cache_ttl(),
            timeout_seconds: default_geocoding_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            timezone: default_timezone(),
            timeout_seconds: default_weather_timeout(),
            forecast_days: default_forecast_days(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: default_places_base_url(),
            default_radius_m: default_radius(),
            expansion_factor: default_expansion_factor(),
            max_expansions: default_max_expansions(),
            limit: default_poi_limit(),
            cache_ttl_seconds: default_places_cache_ttl(),
            timeout_seconds: default_places_timeout(),
            retry: default_places_retry(),
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

impl PlacesConfig {
    #[must_use]
    pub fn search_settings(&self) -> crate::places::SearchSettings {
        crate::places::SearchSettings {
            initial_radius_m: self.default_radius_m,
            expansion_factor: self.expansion_factor,
            max_expansions: self.max_expansions,
            limit: self.limit,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_seconds)
    }
}

impl TourPlanConfig {
    /// Load configuration from `$TOURPLAN_CONFIG` or `tourplan.toml`, then
    /// environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("tourplan.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // e.g. TOURPLAN__SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("TOURPLAN")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TourPlanConfig = settings.try_deserialize().with_context(|| {
            format!(
                "Failed to deserialize configuration from {}",
                config_file.display()
            )
        })?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to empty or zeroed fields
    pub fn apply_defaults(&mut self) {
        if self.server.bind_address.is_empty() {
            self.server.bind_address = default_bind_address();
        }
        if self.server.rate_limit_requests == 0 {
            self.server.rate_limit_requests = default_rate_limit_requests();
        }
        if self.server.rate_limit_window_seconds == 0 {
            self.server.rate_limit_window_seconds = default_rate_limit_window();
        }
        if self.http.user_agent.trim().is_empty() {
            self.http.user_agent = default_user_agent();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.result_limit == 0 {
            self.geocoding.result_limit = default_result_limit();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_geocoding_timeout();
        }
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.timezone.is_empty() {
            self.weather.timezone = default_timezone();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.weather.forecast_days == 0 {
            self.weather.forecast_days = default_forecast_days();
        }
        if self.places.base_url.is_empty() {
            self.places.base_url = default_places_base_url();
        }
        if self.places.default_radius_m == 0 {
            self.places.default_radius_m = default_radius();
        }
        if self.places.expansion_factor == 0 {
            self.places.expansion_factor = default_expansion_factor();
        }
        if self.places.limit == 0 {
            self.places.limit = default_poi_limit();
        }
        if self.places.timeout_seconds == 0 {
            self.places.timeout_seconds = default_places_timeout();
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

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        for (service, timeout) in [
            ("Geocoding", self.geocoding.timeout_seconds),
            ("Weather", self.weather.timeout_seconds),
            ("Places", self.places.timeout_seconds),
        ] {
            if timeout > 300 {
                return Err(TourPlanError::config(format!(
                    "{service} timeout cannot exceed 300 seconds"
                ))
                .into());
            }
        }

        for (service, retry) in [
            ("Geocoding", &self.geocoding.retry),
            ("Weather", &self.weather.retry),
            ("Places", &self.places.retry),
        ] {
            if !(1..=10).contains(&retry.max_attempts) {
                return Err(TourPlanError::config(format!(
                    "{service} retry attempts must be between 1 and 10"
                ))
                .into());
            }
            if retry.backoff_factor_ms > 60_000 {
                return Err(TourPlanError::config(format!(
                    "{service} retry backoff cannot exceed 60000 ms"
                ))
                .into());
            }
        }

        if self.weather.forecast_days > 16 {
            return Err(TourPlanError::config("Forecast days cannot exceed 16").into());
        }

        if self.places.default_radius_m > 50_000 {
            return Err(TourPlanError::config("Search radius cannot exceed 50000 m").into());
        }

        if self.places.limit > 50 {
            return Err(TourPlanError::config("Places limit cannot exceed 50").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TourPlanError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TourPlanError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for (service, url) in [
            ("Geocoding", &self.geocoding.base_url),
            ("Weather", &self.weather.base_url),
            ("Places", &self.places.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TourPlanError::config(format!(
                    "{service} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
