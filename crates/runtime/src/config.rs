//! Configuration management for the dispatch runtime
//!
//! Configuration is read from a TOML file, then selectively overridden from
//! environment variables. Every section has defaults, so an empty file (or no
//! file) yields a working setup with the built-in handler catalog, rule table
//! and intent patterns.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::handlers::{HandlerManifest, HandlerRegistry};
use crate::routing::RoutingConfig;
use crate::scheduler::{BackoffStrategy, SchedulerConfig};

pub const ENV_MAX_CONCURRENT_JOBS: &str = "AGENTGATE_MAX_CONCURRENT_JOBS";
pub const ENV_LEASE_TIMEOUT_SECS: &str = "AGENTGATE_LEASE_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "AGENTGATE_MAX_RETRIES";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

const VALID_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Environment variable error: {message}")]
    EnvError { message: String },

    #[error("IO error reading config file: {message}")]
    IoError { message: String },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },
}

/// Main dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub logging: LoggingConfig,
    pub scheduler: SchedulerConfig,
    pub routing: RoutingConfig,
    /// Handler catalog; the built-in catalog is used when absent
    pub handlers: Option<Vec<HandlerManifest>>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Plain level name (trace, debug, info, warn, error), case-insensitive.
    /// Per-target directives go through `RUST_LOG`, which takes precedence.
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("{}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override individual settings from the environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env(ENV_MAX_CONCURRENT_JOBS)? {
            self.scheduler.max_concurrent_jobs =
                parse_env(ENV_MAX_CONCURRENT_JOBS, &value, "expected a positive integer")?;
        }

        if let Some(value) = read_env(ENV_LEASE_TIMEOUT_SECS)? {
            let secs: u64 = parse_env(ENV_LEASE_TIMEOUT_SECS, &value, "expected seconds")?;
            self.scheduler.lease_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = read_env(ENV_MAX_RETRIES)? {
            self.scheduler.retry.max_retries =
                parse_env(ENV_MAX_RETRIES, &value, "expected a non-negative integer")?;
        }

        if let Some(level) = read_env(ENV_LOG_LEVEL)? {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.to_lowercase();
        if !VALID_LEVELS.contains(&level.as_str()) {
            return Err(invalid(
                "logging.level",
                format!("Must be one of: {}", VALID_LEVELS.join(", ")),
            ));
        }

        let scheduler = &self.scheduler;
        if scheduler.max_concurrent_jobs == 0 {
            return Err(invalid(
                "scheduler.max_concurrent_jobs",
                "Capacity must be > 0",
            ));
        }
        for (key, value) in [
            ("scheduler.lease_timeout", scheduler.lease_timeout),
            ("scheduler.sweep_interval", scheduler.sweep_interval),
            ("scheduler.store_timeout", scheduler.store_timeout),
        ] {
            if value.is_zero() {
                return Err(invalid(key, "Duration must be > 0"));
            }
        }
        if scheduler.event_capacity == 0 {
            return Err(invalid("scheduler.event_capacity", "Must be > 0"));
        }
        if let BackoffStrategy::Exponential {
            initial,
            max,
            multiplier,
        } = scheduler.retry.backoff
        {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(invalid(
                    "scheduler.retry.backoff.multiplier",
                    "Multiplier must be a finite number >= 1.0",
                ));
            }
            if initial > max {
                return Err(invalid(
                    "scheduler.retry.backoff",
                    "Initial delay cannot exceed max delay",
                ));
            }
        }

        let handlers = self.handler_registry()?;
        self.routing
            .validate(&handlers)
            .map_err(|e| invalid("routing", e.to_string()))?;

        Ok(())
    }

    /// Handler catalog described by this configuration
    pub fn handler_registry(&self) -> Result<HandlerRegistry, ConfigError> {
        match &self.handlers {
            Some(manifests) => HandlerRegistry::from_manifests(manifests.iter().cloned())
                .map_err(|e| invalid("handlers", e.to_string())),
            None => Ok(HandlerRegistry::builtin()),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_env(key: &str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvError {
            message: format!("{}: {}", key, e),
        }),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str, reason: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("{} (got '{}')", reason, value),
    })
}
