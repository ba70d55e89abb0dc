//! Configuration for the LKEAP pipe
//!
//! The host supplies three options, read under these names:
//! `NAME_PREFIX`, `BASE_URL` and `API_KEY`. An optional `TIMEOUT_SECS` bounds
//! each HTTP request; without it the client's defaults apply.

use crate::error::{Error, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default prefix prepended to displayed model names
pub const DEFAULT_NAME_PREFIX: &str = "tencentcloud/";

/// Default LKEAP API root
pub const DEFAULT_BASE_URL: &str = "https://api.lkeap.cloud.tencent.com/v1";

/// Pipe configuration
#[derive(Clone)]
pub struct PipeConfig {
    /// Prefix added before model names
    pub name_prefix: String,
    /// Base URL for the LKEAP API endpoints
    pub base_url: Url,
    /// API key used as a bearer token (may be empty)
    pub api_key: SecretString,
    /// Per-request timeout, if any
    pub timeout: Option<Duration>,
}

impl PipeConfig {
    /// Create a configuration with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            ..Self::default()
        }
    }

    /// Create a configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env if present so local development picks up API_KEY
        let _ = dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load a configuration file (TOML, JSON, ...) with environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true))
            .add_source(config::Environment::default())
            .build()?;

        let raw: RawSettings = settings.try_deserialize()?;
        raw.into_config()
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let timeout_secs = match lookup("TIMEOUT_SECS") {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                Error::config(format!("TIMEOUT_SECS must be a number of seconds, got {value:?}"))
            })?),
            None => None,
        };

        RawSettings {
            name_prefix: lookup("NAME_PREFIX"),
            base_url: lookup("BASE_URL"),
            api_key: lookup("API_KEY"),
            timeout_secs,
        }
        .into_config()
    }

    /// Set the model name prefix
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Whether a non-empty API key is configured
    pub fn has_api_key(&self) -> bool {
        !self.api_key().is_empty()
    }

    /// Full URL for an API path relative to the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid LKEAP URL"),
            api_key: SecretString::from(String::new()),
            timeout: None,
        }
    }
}

impl std::fmt::Debug for PipeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeConfig")
            .field("name_prefix", &self.name_prefix)
            .field("base_url", &self.base_url)
            .field("api_key", &"***REDACTED***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Settings as supplied by the host, before validation
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default, alias = "NAME_PREFIX")]
    name_prefix: Option<String>,
    #[serde(default, alias = "BASE_URL")]
    base_url: Option<String>,
    #[serde(default, alias = "API_KEY")]
    api_key: Option<String>,
    #[serde(default, alias = "TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl RawSettings {
    fn into_config(self) -> Result<PipeConfig> {
        let mut config = PipeConfig::new(self.api_key.unwrap_or_default());

        if let Some(prefix) = self.name_prefix {
            config.name_prefix = prefix;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = Url::parse(&base_url)
                .map_err(|e| Error::config(format!("invalid BASE_URL {base_url:?}: {e}")))?;
        }
        config.timeout = self.timeout_secs.map(Duration::from_secs);

        Ok(config)
    }
}
