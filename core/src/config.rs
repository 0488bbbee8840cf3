//! Client configuration.
//!
//! # Design
//! Configuration is a value handed to `ApiClient::new` and never mutated
//! afterwards. A different base URL or timeout means a different client, so
//! in-flight calls always see the configuration they started with.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

const ENV_BASE_URL: &str = "API_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "API_TIMEOUT_SECS";
const ENV_COMPAT_MODE: &str = "API_COMPAT_MODE";

/// How encoding and decoding failures are surfaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatMode {
    /// Every failure is reported; URL-encoded bodies are percent-encoded.
    #[default]
    Strict,
    /// JSON encoding and decoding failures are dropped silently and
    /// URL-encoded bodies are joined without escaping.
    Legacy,
}

impl FromStr for CompatMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CompatMode::Strict),
            "legacy" => Ok(CompatMode::Legacy),
            _ => Err(ConfigError::Invalid {
                name: ENV_COMPAT_MODE,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(rename = "timeout_secs", deserialize_with = "duration_from_secs")]
    pub timeout: Duration,
    pub mode: CompatMode,
    /// Store 4xx/5xx responses in the cache as well as successful ones.
    pub store_error_responses: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            mode: CompatMode::Strict,
            store_error_responses: true,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_mode(mut self, mode: CompatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_store_error_responses(mut self, store: bool) -> Self {
        self.store_error_responses = store;
        self
    }

    /// Read `API_BASE_URL`, `API_TIMEOUT_SECS` and `API_COMPAT_MODE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, with variables resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(ENV_COMPAT_MODE) {
            config.mode = raw.parse()?;
        }
        Ok(config)
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
