//! Agentgate dispatch runtime
//!
//! Decides which content-generation handler receives a request and when a
//! slot is available to run it. Handlers themselves run elsewhere: callers
//! poll [`DispatchRegistry::get_next_job`], execute the job, and report the
//! outcome with `complete_job` or `fail_job`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use agentgate_runtime::{DispatchConfig, DispatchRegistry, GenerationRequest, InMemoryContextStore};
//!
//! # async fn example() -> Result<(), agentgate_runtime::DispatchError> {
//! let registry = DispatchRegistry::new(
//!     &DispatchConfig::default(),
//!     Arc::new(InMemoryContextStore::new()),
//! )?;
//!
//! let submission = registry.submit(GenerationRequest::new("Write our brand story")).await?;
//! if let Some(job) = registry.get_next_job().await {
//!     // run the handler named by job.handler
//!     registry.complete_job(job.job_id).await;
//! }
//! # let _ = submission;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod handlers;
pub mod registry;
pub mod routing;
pub mod scheduler;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigError, DispatchConfig, LogFormat, LoggingConfig};
pub use context::{ContextStore, InMemoryContextStore, JobStatusRecord, SnapshotBuilder};
pub use handlers::{HandlerEntry, HandlerManifest, HandlerRegistry};
pub use registry::{DispatchRegistry, Submission};
pub use routing::{RoutingConfig, RoutingDecision, RoutingEngine, RoutingError, RoutingRule};
pub use scheduler::{
    FailOutcome, JobQueueItem, JobScheduler, QueueStats, RetryConfig, SchedulerConfig,
    SchedulerEvent,
};
pub use types::*;
