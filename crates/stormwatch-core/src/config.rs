//! Configuration loading and typed config structures for the dashboard.
//!
//! The canonical configuration lives in `stormwatch-config.yaml`. This
//! module defines strongly-typed structs that mirror the YAML structure
//! and a loader that reads it. Every field has a default, so an empty (or
//! absent) file yields a working development setup.
//!
//! Provider credentials are normally supplied through the environment
//! rather than the file; see [`DashboardConfig::apply_env_overrides`].

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use stormwatch_providers::{DEFAULT_GEOCODING_URL, DEFAULT_WEATHER_URL};
use stormwatch_store::DEFAULT_MAX_RECORDS;
use stormwatch_types::Coordinates;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "stormwatch-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level dashboard configuration.
///
/// Mirrors the structure of `stormwatch-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Upstream provider endpoints and credentials.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Simulated lightning feed.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Strike store limits.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    ///
    /// Environment overrides apply in both cases.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file).
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
    ///
    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override values with process environment variables when set.
    ///
    /// - `STORMWATCH_HOST` / `STORMWATCH_PORT` -- listener address
    /// - `MAPBOX_API_KEY` (or `VITE_MAPBOX_API_KEY`) -- geocoding credential
    /// - `OPENWEATHERMAP_API_KEY` (or `VITE_OPENWEATHERMAP_API_KEY`) --
    ///   weather credential
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Override values from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("STORMWATCH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("STORMWATCH_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(key) = lookup("MAPBOX_API_KEY").or_else(|| lookup("VITE_MAPBOX_API_KEY")) {
            self.providers.geocoding_api_key = Some(key);
        }
        if let Some(key) =
            lookup("OPENWEATHERMAP_API_KEY").or_else(|| lookup("VITE_OPENWEATHERMAP_API_KEY"))
        {
            self.providers.weather_api_key = Some(key);
        }
    }

    /// Check values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// The host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of strikes returned by `GET /api/lightning`.
    #[serde(default = "default_lightning_limit")]
    pub lightning_limit: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            lightning_limit: default_lightning_limit(),
        }
    }
}

/// Upstream provider endpoints and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvidersConfig {
    /// Geocoding API root.
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,

    /// Geocoding access token (usually set via `MAPBOX_API_KEY`).
    #[serde(default)]
    pub geocoding_api_key: Option<String>,

    /// Weather API root.
    #[serde(default = "default_weather_url")]
    pub weather_url: String,

    /// Weather API key (usually set via `OPENWEATHERMAP_API_KEY`).
    #[serde(default)]
    pub weather_api_key: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ProvidersConfig {
    /// Per-request timeout as a [`Duration`].
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            geocoding_url: default_geocoding_url(),
            geocoding_api_key: None,
            weather_url: default_weather_url(),
            weather_api_key: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Simulated lightning feed settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Whether the feed runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Milliseconds between generated strikes.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Latitude strikes are scattered around.
    #[serde(default = "default_reference_lat")]
    pub reference_lat: f64,

    /// Longitude strikes are scattered around.
    #[serde(default = "default_reference_lon")]
    pub reference_lon: f64,

    /// Maximum offset in degrees applied independently to each axis.
    #[serde(default = "default_jitter_degrees")]
    pub jitter_degrees: f64,

    /// Strikes older than this are evicted after each insert.
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u32,

    /// RNG seed for reproducible runs (random when absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// Check the generator settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero period or retention
    /// window, an impossible reference point, or a jitter that is negative
    /// or not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "simulation.interval_ms must be at least 1".to_owned(),
            });
        }
        if self.retention_minutes == 0 {
            return Err(ConfigError::Invalid {
                reason: "simulation.retention_minutes must be at least 1".to_owned(),
            });
        }
        if !self.reference_point().is_valid() {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "simulation reference point ({}) is not a valid coordinate",
                    self.reference_point()
                ),
            });
        }
        if !self.jitter_degrees.is_finite() || self.jitter_degrees < 0.0 {
            return Err(ConfigError::Invalid {
                reason: "simulation.jitter_degrees must be a non-negative number".to_owned(),
            });
        }
        Ok(())
    }

    /// Generation period as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// The point strikes are scattered around.
    pub const fn reference_point(&self) -> Coordinates {
        Coordinates::new(self.reference_lat, self.reference_lon)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
            reference_lat: default_reference_lat(),
            reference_lon: default_reference_lon(),
            jitter_degrees: default_jitter_degrees(),
            retention_minutes: default_retention_minutes(),
            seed: None,
        }
    }
}

/// Strike store limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Hard cap on stored strikes (`null` = unbounded).
    #[serde(default = "default_max_records")]
    pub max_records: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl LoggingConfig {
    /// Whether JSON log lines were requested.
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
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

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    5000
}

const fn default_lightning_limit() -> usize {
    20
}

fn default_geocoding_url() -> String {
    String::from(DEFAULT_GEOCODING_URL)
}

fn default_weather_url() -> String {
    String::from(DEFAULT_WEATHER_URL)
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

const fn default_interval_ms() -> u64 {
    15_000
}

const fn default_reference_lat() -> f64 {
    37.7749
}

const fn default_reference_lon() -> f64 {
    -122.4194
}

const fn default_jitter_degrees() -> f64 {
    1.0
}

const fn default_retention_minutes() -> u32 {
    60
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_records() -> Option<usize> {
    Some(DEFAULT_MAX_RECORDS)
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("text")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DashboardConfig::parse("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.lightning_limit, 20);
        assert_eq!(config.simulation.interval(), Duration::from_secs(15));
        assert_eq!(config.simulation.retention_minutes, 60);
        assert_eq!(config.store.max_records, Some(DEFAULT_MAX_RECORDS));
        assert!(config.providers.geocoding_api_key.is_none());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let yaml = r"
server:
  port: 8088
simulation:
  interval_ms: 500
  seed: 7
store:
  max_records: null
logging:
  format: json
";
        let config = DashboardConfig::parse(yaml).unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.simulation.interval_ms, 500);
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.reference_lat, 37.7749);
        assert_eq!(config.store.max_records, None);
        assert!(config.logging.is_json());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        assert!(matches!(
            DashboardConfig::parse("server: [unterminated"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn overrides_prefer_primary_names() {
        let vars: BTreeMap<&str, &str> = [
            ("STORMWATCH_PORT", "9001"),
            ("MAPBOX_API_KEY", "pk.primary"),
            ("VITE_MAPBOX_API_KEY", "pk.fallback"),
            ("VITE_OPENWEATHERMAP_API_KEY", "owm.fallback"),
        ]
        .into_iter()
        .collect();

        let mut config = DashboardConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| (*v).to_owned()));

        assert_eq!(config.server.port, 9001);
        assert_eq!(config.providers.geocoding_api_key.as_deref(), Some("pk.primary"));
        assert_eq!(config.providers.weather_api_key.as_deref(), Some("owm.fallback"));
    }

    #[test]
    fn unparsable_port_override_is_ignored() {
        let mut config = DashboardConfig::default();
        config.apply_overrides(|name| (name == "STORMWATCH_PORT").then(|| "not-a-port".to_owned()));
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn validation_catches_unusable_values() {
        let mut config = DashboardConfig::default();
        config.simulation.interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = DashboardConfig::default();
        config.simulation.reference_lat = 123.0;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.simulation.jitter_degrees = -0.5;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.simulation.retention_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            DashboardConfig::load_or_default(Path::new("definitely/not/here.yaml")).unwrap();
        assert_eq!(config.simulation, SimulationConfig::default());
    }
}
