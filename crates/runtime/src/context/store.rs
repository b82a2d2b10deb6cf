//! Context store interface and in-memory implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::types::{ContextStoreError, JobId, JobStatus, Snapshot};

/// Status record written for a job as it moves through the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusRecord {
    pub status: JobStatus,
    /// Percent complete, 0-100
    pub progress: u8,
    pub snapshot: Option<Snapshot>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatusRecord {
    pub fn new(status: JobStatus, snapshot: Option<Snapshot>) -> Self {
        let progress = match status {
            JobStatus::Completed => 100,
            _ => 0,
        };
        Self {
            status,
            progress,
            snapshot,
            updated_at: Utc::now(),
        }
    }
}

/// Key-value store holding brand profiles, conversations and job status
///
/// Implementations are best-effort from the runtime's perspective: every
/// error is logged by the caller and never surfaces to queue callers.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Fetch a cached brand profile
    async fn get_profile(&self, profile_id: &str) -> Result<Option<Value>, ContextStoreError>;

    /// Fetch conversation history recorded under a prior job
    async fn get_conversation(&self, job_id: &str) -> Result<Option<Value>, ContextStoreError>;

    /// Persist a job status record
    async fn put_job_status(
        &self,
        job_id: JobId,
        record: JobStatusRecord,
    ) -> Result<(), ContextStoreError>;
}

/// Process-local context store
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    profiles: RwLock<HashMap<String, Value>>,
    conversations: RwLock<HashMap<String, Value>>,
    job_status: RwLock<HashMap<JobId, JobStatusRecord>>,
    reject_writes: AtomicBool,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile_id: impl Into<String>, profile: Value) {
        self.profiles.write().await.insert(profile_id.into(), profile);
    }

    pub async fn insert_conversation(&self, job_id: impl Into<String>, history: Value) {
        self.conversations
            .write()
            .await
            .insert(job_id.into(), history);
    }

    /// Latest status record written for a job
    pub async fn job_status(&self, job_id: &JobId) -> Option<JobStatusRecord> {
        self.job_status.read().await.get(job_id).cloned()
    }

    /// Make subsequent status writes fail, for exercising error paths
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get_profile(&self, profile_id: &str) -> Result<Option<Value>, ContextStoreError> {
        Ok(self.profiles.read().await.get(profile_id).cloned())
    }

    async fn get_conversation(&self, job_id: &str) -> Result<Option<Value>, ContextStoreError> {
        Ok(self.conversations.read().await.get(job_id).cloned())
    }

    async fn put_job_status(
        &self,
        job_id: JobId,
        record: JobStatusRecord,
    ) -> Result<(), ContextStoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(ContextStoreError::Backend {
                message: "writes disabled".to_string(),
            });
        }
        self.job_status.write().await.insert(job_id, record);
        Ok(())
    }
}
