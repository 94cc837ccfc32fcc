//! Configuration management for the meter poller
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{MeterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

pub use defaults::DEFAULT_API_URL;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Kraken API credentials and endpoint
    pub api: ApiConfig,

    /// Pricing used for host-side cost metrics
    pub pricing: PricingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Refresh interval in seconds
    pub poll_interval_seconds: u64,

    /// Where the cumulative energy total is persisted
    pub state_file: String,
}

/// Kraken GraphQL endpoint and account credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Account login e-mail
    pub email: String,

    /// Account password
    pub password: String,

    /// Endpoint override; empty means the default endpoint
    pub url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("url", &self.url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl ApiConfig {
    /// Endpoint to use, falling back to the default when no override is set
    pub fn endpoint(&self) -> &str {
        let url = self.url.trim();
        if url.is_empty() { DEFAULT_API_URL } else { url }
    }
}

/// Pricing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Flat rate in JPY per kWh
    pub yen_per_kwh: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file (its directory is used for the rolling appender)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "oejp_config.yaml",
            "/data/oejp_config.yaml",
            "/etc/oejp/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Override credentials and endpoint from `OEJP_EMAIL`, `OEJP_PASSWORD`
    /// and `OEJP_API_URL` when they are set and non-empty
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Same as [`Config::apply_env_overrides`] with an injectable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(email) = get("OEJP_EMAIL") {
            self.api.email = email;
        }
        if let Some(password) = get("OEJP_PASSWORD") {
            self.api.password = password;
        }
        if let Some(url) = get("OEJP_API_URL") {
            self.api.url = url;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.email.trim().is_empty() {
            return Err(MeterError::validation("api.email", "Cannot be empty"));
        }

        if self.api.password.is_empty() {
            return Err(MeterError::validation("api.password", "Cannot be empty"));
        }

        let endpoint = self.api.endpoint();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(MeterError::validation(
                "api.url",
                "Must be an http(s) URL",
            ));
        }

        if self.api.timeout_seconds == 0 {
            return Err(MeterError::validation(
                "api.timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if !self.pricing.yen_per_kwh.is_finite() || self.pricing.yen_per_kwh < 0.0 {
            return Err(MeterError::validation(
                "pricing.yen_per_kwh",
                "Must be a non-negative number",
            ));
        }

        if self.poll_interval_seconds == 0 {
            return Err(MeterError::validation(
                "poll_interval_seconds",
                "Must be greater than 0",
            ));
        }

        if self.state_file.trim().is_empty() {
            return Err(MeterError::config("state_file must not be empty"));
        }

        Ok(())
    }
}
