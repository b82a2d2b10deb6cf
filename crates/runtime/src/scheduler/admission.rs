//! Admission gate bounding the number of in-flight jobs

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

use super::job::JobQueueItem;
use crate::types::JobId;

/// An execution slot held by an active job
#[derive(Debug, Clone)]
pub struct Lease {
    pub item: JobQueueItem,
    pub acquired_at: DateTime<Utc>,
    pub deadline: Instant,
}

/// Fixed-capacity set of active jobs
///
/// `active_count() <= capacity()` holds after every operation. Release is
/// idempotent: releasing an id that holds no slot is a no-op.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    lease_timeout: Duration,
    active: HashMap<JobId, Lease>,
}

impl AdmissionGate {
    pub fn new(capacity: usize, lease_timeout: Duration) -> Self {
        Self {
            capacity,
            lease_timeout,
            active: HashMap::with_capacity(capacity),
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.active.len() < self.capacity
    }

    /// Grant a slot, handing the item back when the gate is saturated
    pub fn admit(&mut self, item: JobQueueItem, now: Instant) -> Result<Instant, JobQueueItem> {
        if !self.has_capacity() {
            return Err(item);
        }
        let deadline = now + self.lease_timeout;
        self.active.insert(
            item.job_id,
            Lease {
                item,
                acquired_at: Utc::now(),
                deadline,
            },
        );
        Ok(deadline)
    }

    pub fn release(&mut self, job_id: &JobId) -> Option<Lease> {
        self.active.remove(job_id)
    }

    /// Remove and return every lease whose deadline has passed
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<Lease> {
        let expired: Vec<JobId> = self
            .active
            .iter()
            .filter(|(_, lease)| lease.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        expired
            .iter()
            .filter_map(|id| self.active.remove(id))
            .collect()
    }

    /// Push an active job's deadline out by a full lease period
    pub fn renew(&mut self, job_id: &JobId, now: Instant) -> Option<Instant> {
        let lease = self.active.get_mut(job_id)?;
        lease.deadline = now + self.lease_timeout;
        Some(lease.deadline)
    }

    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.active.contains_key(job_id)
    }

    pub fn active_ids(&self) -> Vec<JobId> {
        self.active.keys().copied().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.active.len())
    }
}
