//! Queued job representation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::priority_queue::{QueueEntry, QueueKey};
use crate::types::{GenerationRequest, JobId, Snapshot};

/// Priority used when the request carries no override
pub const DEFAULT_PRIORITY: i32 = 0;

/// A unit of work waiting for, or holding, an execution slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobQueueItem {
    pub job_id: JobId,
    /// Target handler name
    pub handler: String,
    pub request: GenerationRequest,
    pub priority: i32,
    pub enqueued_at: DateTime<Utc>,
    /// Built once at enqueue time and carried unchanged through retries
    pub snapshot: Snapshot,
    /// Zero on first dispatch, incremented on each retry
    pub attempt: u32,
    /// Retry backoff: the job is not dispatched before this instant
    #[serde(skip)]
    pub not_before: Option<Instant>,
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl JobQueueItem {
    pub(crate) fn new(
        handler: impl Into<String>,
        request: GenerationRequest,
        snapshot: Snapshot,
        seq: u64,
    ) -> Self {
        let priority = request.priority.unwrap_or(DEFAULT_PRIORITY);
        Self {
            job_id: JobId::new(),
            handler: handler.into(),
            request,
            priority,
            enqueued_at: Utc::now(),
            snapshot,
            attempt: 0,
            not_before: None,
            seq,
        }
    }

    /// Copy of this job scheduled for another attempt
    pub(crate) fn retry(mut self, not_before: Instant, seq: u64) -> Self {
        self.attempt += 1;
        self.not_before = Some(not_before);
        self.seq = seq;
        self
    }
}

impl QueueEntry for JobQueueItem {
    fn job_id(&self) -> JobId {
        self.job_id
    }

    fn queue_key(&self) -> QueueKey {
        QueueKey::new(self.priority, self.seq)
    }

    fn is_eligible(&self, now: Instant) -> bool {
        self.not_before.map_or(true, |at| at <= now)
    }
}
