//! Context store access and snapshot assembly
//!
//! The persistence layer behind brand profiles, conversation history and job
//! status records is external. This module defines the narrow interface the
//! runtime consumes and the best-effort snapshot builder that runs once per
//! queued job.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use agentgate_runtime::context::{InMemoryContextStore, SnapshotBuilder};
//! use agentgate_runtime::types::GenerationRequest;
//!
//! # async fn example() {
//! let store = Arc::new(InMemoryContextStore::new());
//! let builder = SnapshotBuilder::new(store, Duration::from_secs(2));
//!
//! let request = GenerationRequest::new("brand story").with_profile("acme");
//! let snapshot = builder.build(&request).await;
//! assert!(snapshot.contains_key("profile_id"));
//! # }
//! ```

pub mod snapshot;
pub mod store;

pub use snapshot::*;
pub use store::*;
