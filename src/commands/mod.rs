pub mod check_config;
pub mod drain;
pub mod handlers;
pub mod route;

use std::sync::Arc;

use agentgate_runtime::{DispatchConfig, DispatchRegistry, InMemoryContextStore, LogFormat, LoggingConfig};
use anyhow::Context;

/// Load configuration from the optional file plus environment overrides
pub fn load_config(path: Option<&str>) -> anyhow::Result<DispatchConfig> {
    let config = DispatchConfig::load(path).with_context(|| match path {
        Some(path) => format!("failed to load configuration from {}", path),
        None => "failed to load configuration from environment".to_string(),
    })?;
    init_tracing(&config.logging);
    Ok(config)
}

/// Build a registry backed by the in-memory context store
pub fn build_registry(config: &DispatchConfig) -> anyhow::Result<DispatchRegistry> {
    DispatchRegistry::new(config, Arc::new(InMemoryContextStore::new()))
        .context("failed to build dispatch registry")
}

/// Install the global subscriber; `RUST_LOG` takes precedence over the configured level
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialised: {}", e);
    }
}
