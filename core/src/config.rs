//! Connection configuration for the Mixgarden client.
//!
//! The API key is the only required setting. It comes either from the caller
//! or from `MIXGARDEN_API_KEY`; a missing or blank key is rejected here, so a
//! constructed `ClientConfig` always carries a usable key.

use std::fmt;
use std::time::Duration;

use crate::error::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.mixgarden.ai/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub const API_KEY_ENV: &str = "MIXGARDEN_API_KEY";
pub const BASE_URL_ENV: &str = "MIXGARDEN_BASE_URL";

#[derive(Clone)]
pub struct ClientConfig {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl ClientConfig {
    /// Build a config from an explicit key with the default base URL and timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::Configuration("API key must not be empty".to_string()));
        }
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Read the key (and optional base URL override) from the environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(None)
    }

    /// Use `explicit` when given, otherwise fall back to the environment.
    pub fn resolve(explicit: Option<String>) -> Result<Self> {
        Self::resolve_with(explicit, |name| std::env::var(name).ok())
    }

    /// Like [`ClientConfig::resolve`] with a custom variable lookup.
    pub fn resolve_with<F>(explicit: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = explicit
            .filter(|key| !key.trim().is_empty())
            .or_else(|| lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| {
                ApiError::Configuration(format!(
                    "no API key supplied and {API_KEY_ENV} is not set"
                ))
            })?;

        let config = Self::new(api_key)?;
        match lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            Some(url) => config.with_base_url(url),
            None => Ok(config),
        }
    }

    /// Override the base URL. A trailing `/` is dropped.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ApiError::Configuration(format!(
                "base URL must be http(s): {base_url}"
            )));
        }
        self.base_url = trimmed.to_string();
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
