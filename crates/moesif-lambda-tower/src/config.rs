//! Configuration loading for the middleware.
//!
//! Plain settings are layered with figment, later sources overriding earlier:
//! 1. Default values (compiled in)
//! 2. Config file: `/var/task/moesif.toml` (optional)
//! 3. Environment variables with the `MOESIF_` prefix
//!
//! | Variable | Config key |
//! |----------|------------|
//! | `MOESIF_APPLICATION_ID` | `application_id` |
//! | `MOESIF_BASE_URI` | `base_uri` |
//! | `MOESIF_LOG_BODY` | `log_body` |
//! | `MOESIF_DEBUG` | `debug` |
//! | `MOESIF_TIMEOUT` | `timeout` (ms) |
//! | `MOESIF_CONFIG_REFRESH_INTERVAL` | `config_refresh_interval` (ms) |
//!
//! Extraction strategies are closures and can only be set through
//! [`OptionsBuilder`](crate::OptionsBuilder). A config source that names one
//! is rejected with [`ConfigurationError::NotCallable`].

use crate::error::{ConfigurationError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use moesif_api::{DEFAULT_BASE_URI, DEFAULT_REFRESH_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "/var/task/moesif.toml";
const ENV_PREFIX: &str = "MOESIF_";

/// Option names that must be supplied as functions.
pub(crate) const STRATEGY_KEYS: [&str; 10] = [
    "identify_user",
    "identify_company",
    "get_session_token",
    "get_metadata",
    "get_tags",
    "get_api_version",
    "mask_content",
    "ignore_route",
    "skip",
    "callback",
];

/// Data-only middleware settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoesifConfig {
    /// Collector application id.
    pub application_id: Option<String>,
    /// Collector base URI.
    pub base_uri: String,
    /// Whether request and response bodies are captured.
    pub log_body: bool,
    /// Whether diagnostic `debug` events are emitted.
    pub debug: bool,
    /// Collector request timeout in milliseconds.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Minimum time between sampling config fetches, in milliseconds.
    #[serde(with = "duration_ms")]
    pub config_refresh_interval: Duration,
}

impl Default for MoesifConfig {
    fn default() -> Self {
        Self {
            application_id: None,
            base_uri: DEFAULT_BASE_URI.to_string(),
            log_body: true,
            debug: false,
            timeout: Duration::from_secs(5),
            config_refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl MoesifConfig {
    /// Loads configuration from the default file path and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or names a strategy.
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration from a custom config file path and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or names a strategy.
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(MoesifConfig::default()));

        if config_path.as_ref().exists() {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        Self::from_figment(&figment)
    }

    /// Extracts configuration from a caller-assembled figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction fails or the figment names a strategy.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        ensure_no_strategy_data(figment)?;
        Ok(figment.extract()?)
    }
}

fn ensure_no_strategy_data(figment: &Figment) -> Result<()> {
    match STRATEGY_KEYS
        .iter()
        .find(|key| figment.find_value(key).is_ok())
    {
        Some(field) => Err(ConfigurationError::NotCallable { field: *field }),
        None => Ok(()),
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
