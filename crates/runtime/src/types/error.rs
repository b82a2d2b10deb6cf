//! Error types for the dispatch runtime

use thiserror::Error;

use super::JobId;
use crate::config::ConfigError;
use crate::routing::RoutingError;

/// Main dispatch error type
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Handler registry error: {0}")]
    Handlers(#[from] HandlerRegistryError),

    #[error("No agent could be determined for the request")]
    NoAgentDetermined,
}

/// Scheduling errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Unknown handler: {name}")]
    UnknownHandler { name: String },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: JobId },

    #[error("Scheduler shutdown in progress")]
    ShuttingDown,
}

/// Handler catalog errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerRegistryError {
    #[error("Handler '{name}' registered twice")]
    Duplicate { name: String },

    #[error("Handler name cannot be empty")]
    EmptyName,
}

/// Context store errors
#[derive(Error, Debug, Clone)]
pub enum ContextStoreError {
    #[error("Context record not found: {key}")]
    NotFound { key: String },

    #[error("Context store backend failure: {message}")]
    Backend { message: String },

    #[error("Context store timed out after {millis}ms: {operation}")]
    Timeout { operation: String, millis: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ContextStoreError {
    /// Whether a later attempt might succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ContextStoreError::Backend { .. } | ContextStoreError::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for ContextStoreError {
    fn from(err: serde_json::Error) -> Self {
        ContextStoreError::Serialization(err.to_string())
    }
}
