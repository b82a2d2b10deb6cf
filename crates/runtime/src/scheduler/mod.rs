//! Job scheduler
//!
//! Owns the pending-job queue and the admission gate. Both live behind one
//! lock so queue order and the active count always change together. Context
//! store I/O (snapshot assembly, status records) happens outside the lock.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};

use crate::context::{ContextStore, JobStatusRecord, SnapshotBuilder};
use crate::types::{GenerationRequest, JobId, JobStatus, SchedulerError, Snapshot};

pub mod admission;
pub mod job;
pub mod priority_queue;
pub mod retry;

pub use admission::{AdmissionGate, Lease};
pub use job::{JobQueueItem, DEFAULT_PRIORITY};
pub use priority_queue::{PriorityQueue, QueueEntry, QueueKey};
pub use retry::{BackoffStrategy, RetryConfig};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Admission gate capacity
    pub max_concurrent_jobs: usize,
    /// How long an admitted job may hold its slot before the sweep reclaims it
    #[serde(with = "humantime_serde")]
    pub lease_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    /// Upper bound on each context store call
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
    pub retry: RetryConfig,
    /// Buffered lifecycle events per subscriber
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            lease_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(30),
            store_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
            event_capacity: 256,
        }
    }
}

/// Lifecycle events published to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    Queued {
        job_id: JobId,
        handler: String,
        priority: i32,
    },
    Started {
        job_id: JobId,
        handler: String,
        attempt: u32,
    },
    Completed {
        job_id: JobId,
        handler: String,
    },
    Failed {
        job_id: JobId,
        handler: String,
        attempt: u32,
    },
    Requeued {
        job_id: JobId,
        handler: String,
        attempt: u32,
        #[serde(with = "humantime_serde")]
        delay: Duration,
    },
    TimedOut {
        job_id: JobId,
        handler: String,
        #[serde(with = "humantime_serde")]
        lease_timeout: Duration,
    },
    Cancelled {
        job_id: JobId,
        handler: String,
    },
    StoreWriteFailed {
        job_id: JobId,
        status: JobStatus,
        error: String,
    },
}

/// Result of reporting a job failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Slot released, job discarded
    Released,
    /// Slot released, job queued again after `delay`
    Requeued { attempt: u32, delay: Duration },
    /// The job held no slot
    NotActive,
}

/// Point-in-time queue and admission figures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued_count: usize,
    pub active_count: usize,
    pub capacity: usize,
    pub available: usize,
    pub completed_total: u64,
    pub failed_total: u64,
    pub timed_out_total: u64,
    pub requeued_total: u64,
    pub cancelled_total: u64,
    pub store_failures: u64,
}

#[derive(Debug, Default)]
struct SchedulerCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    requeued: AtomicU64,
    cancelled: AtomicU64,
    store_failures: AtomicU64,
}

#[derive(Debug)]
struct SchedulerState {
    queue: PriorityQueue<JobQueueItem>,
    gate: AdmissionGate,
}

/// Priority queue plus admission gate
pub struct JobScheduler {
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    seq: AtomicU64,
    snapshots: SnapshotBuilder,
    store: Arc<dyn ContextStore>,
    events: broadcast::Sender<SchedulerEvent>,
    counters: SchedulerCounters,
    shutdown_notify: Arc<Notify>,
    is_running: Arc<RwLock<bool>>,
}

impl JobScheduler {
    pub fn new(config: SchedulerConfig, store: Arc<dyn ContextStore>) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let state = SchedulerState {
            queue: PriorityQueue::new(),
            gate: AdmissionGate::new(config.max_concurrent_jobs, config.lease_timeout),
        };

        Self {
            snapshots: SnapshotBuilder::new(store.clone(), config.store_timeout),
            state: Mutex::new(state),
            seq: AtomicU64::new(0),
            events,
            counters: SchedulerCounters::default(),
            shutdown_notify: Arc::new(Notify::new()),
            is_running: Arc::new(RwLock::new(true)),
            store,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Build the job's snapshot, record its queued status and queue it
    ///
    /// The `queued` record is written before the job becomes admittable.
    pub async fn enqueue(
        &self,
        handler: &str,
        request: GenerationRequest,
    ) -> Result<JobId, SchedulerError> {
        if !*self.is_running.read() {
            return Err(SchedulerError::ShuttingDown);
        }

        let snapshot = self.snapshots.build(&request).await;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let item = JobQueueItem::new(handler, request, snapshot, seq);
        let job_id = item.job_id;
        let priority = item.priority;

        self.persist(job_id, JobStatus::Queued, Some(item.snapshot.clone()))
            .await;

        let queued = {
            let mut state = self.state.lock();
            state.queue.push(item);
            state.queue.len()
        };

        tracing::info!(%job_id, handler, priority, queued, "Job queued");
        self.emit(SchedulerEvent::Queued {
            job_id,
            handler: handler.to_string(),
            priority,
        });

        Ok(job_id)
    }

    /// Admit the highest priority eligible job if a slot is free
    ///
    /// Never blocks waiting for capacity: a saturated gate or an empty queue
    /// both yield `None`.
    pub async fn get_next_job(&self) -> Option<JobQueueItem> {
        if !*self.is_running.read() {
            return None;
        }

        let now = Instant::now();
        let item = {
            let mut state = self.state.lock();
            if !state.gate.has_capacity() {
                return None;
            }
            let item = state.queue.pop_first_eligible(now)?;
            match state.gate.admit(item.clone(), now) {
                Ok(_) => item,
                Err(item) => {
                    state.queue.push(item);
                    return None;
                }
            }
        };

        tracing::info!(
            job_id = %item.job_id,
            handler = %item.handler,
            priority = item.priority,
            attempt = item.attempt,
            "Job admitted"
        );
        self.emit(SchedulerEvent::Started {
            job_id: item.job_id,
            handler: item.handler.clone(),
            attempt: item.attempt,
        });
        self.persist(item.job_id, JobStatus::Running, None).await;

        Some(item)
    }

    /// Release a job's slot after success; false if it held none
    pub async fn complete_job(&self, job_id: JobId) -> bool {
        let lease = self.state.lock().gate.release(&job_id);
        let Some(lease) = lease else {
            tracing::debug!(%job_id, "Completion for job without an active slot");
            return false;
        };

        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        tracing::info!(%job_id, handler = %lease.item.handler, "Job completed");
        self.emit(SchedulerEvent::Completed {
            job_id,
            handler: lease.item.handler,
        });
        self.persist(job_id, JobStatus::Completed, None).await;
        true
    }

    /// Release a job's slot after failure, requeueing it if the retry policy allows
    ///
    /// A retried job is only pushed back onto the queue once its `retrying`
    /// status has been written.
    pub async fn fail_job(&self, job_id: JobId) -> FailOutcome {
        let lease = self.state.lock().gate.release(&job_id);
        let Some(lease) = lease else {
            tracing::debug!(%job_id, "Failure for job without an active slot");
            return FailOutcome::NotActive;
        };

        let item = lease.item;
        let handler = item.handler.clone();
        let attempt = item.attempt;

        self.counters.failed.fetch_add(1, Ordering::Relaxed);
        self.emit(SchedulerEvent::Failed {
            job_id,
            handler: handler.clone(),
            attempt,
        });

        if !self.config.retry.should_retry(attempt) {
            tracing::info!(%job_id, handler = %handler, attempt, "Job failed");
            self.persist(job_id, JobStatus::Failed, None).await;
            return FailOutcome::Released;
        }

        let next = attempt + 1;
        let delay = self.config.retry.backoff.delay_for(next);
        self.persist(job_id, JobStatus::Retrying, None).await;

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let not_before = Instant::now() + delay;
        self.state.lock().queue.push(item.retry(not_before, seq));

        self.counters.requeued.fetch_add(1, Ordering::Relaxed);
        tracing::info!(%job_id, handler = %handler, attempt = next, ?delay, "Job failed, requeued");
        self.emit(SchedulerEvent::Requeued {
            job_id,
            handler,
            attempt: next,
            delay,
        });
        FailOutcome::Requeued {
            attempt: next,
            delay,
        }
    }

    /// Drop a job that is still waiting in the queue
    pub async fn cancel_job(&self, job_id: JobId) -> Result<(), SchedulerError> {
        let item = self
            .state
            .lock()
            .queue
            .remove(&job_id)
            .ok_or(SchedulerError::JobNotFound { job_id })?;

        self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
        tracing::info!(%job_id, handler = %item.handler, "Job cancelled");
        self.emit(SchedulerEvent::Cancelled {
            job_id,
            handler: item.handler,
        });
        self.persist(job_id, JobStatus::Cancelled, None).await;
        Ok(())
    }

    /// Extend an active job's lease
    pub fn renew_lease(&self, job_id: JobId) -> bool {
        self.state
            .lock()
            .gate
            .renew(&job_id, Instant::now())
            .is_some()
    }

    /// Force-release every slot whose lease has expired
    pub async fn sweep_expired_leases(&self) -> Vec<JobId> {
        let expired = self.state.lock().gate.reclaim_expired(Instant::now());
        let lease_timeout = self.config.lease_timeout;

        let mut reclaimed = Vec::with_capacity(expired.len());
        for lease in expired {
            let job_id = lease.item.job_id;
            self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                %job_id,
                handler = %lease.item.handler,
                acquired_at = %lease.acquired_at,
                ?lease_timeout,
                "Job lease expired, slot reclaimed"
            );
            self.emit(SchedulerEvent::TimedOut {
                job_id,
                handler: lease.item.handler,
                lease_timeout,
            });
            self.persist(job_id, JobStatus::TimedOut, None).await;
            reclaimed.push(job_id);
        }
        reclaimed
    }

    /// Run the lease sweep on `sweep_interval` until shutdown
    pub fn spawn_lease_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let shutdown_notify = self.shutdown_notify.clone();
        let is_running = self.is_running.clone();
        let period = self.config.sweep_interval.max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut interval = interval(period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !*is_running.read() {
                            break;
                        }
                        scheduler.sweep_expired_leases().await;
                    }
                    _ = shutdown_notify.notified() => {
                        break;
                    }
                }
            }
            tracing::debug!("Lease sweeper stopped");
        })
    }

    /// Stop admitting and accepting work; idempotent
    ///
    /// Queued jobs stay queued and active jobs may still complete or fail.
    pub fn shutdown(&self) {
        {
            let mut is_running = self.is_running.write();
            if !*is_running {
                tracing::debug!("Scheduler already shutdown");
                return;
            }
            *is_running = false;
        }
        self.shutdown_notify.notify_waiters();

        let stats = self.stats();
        tracing::info!(
            queued = stats.queued_count,
            active = stats.active_count,
            completed = stats.completed_total,
            failed = stats.failed_total,
            timed_out = stats.timed_out_total,
            "Scheduler shutdown"
        );
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    pub fn stats(&self) -> QueueStats {
        let (queued_count, active_count, capacity, available) = {
            let state = self.state.lock();
            (
                state.queue.len(),
                state.gate.active_count(),
                state.gate.capacity(),
                state.gate.available(),
            )
        };

        QueueStats {
            queued_count,
            active_count,
            capacity,
            available,
            completed_total: self.counters.completed.load(Ordering::Relaxed),
            failed_total: self.counters.failed.load(Ordering::Relaxed),
            timed_out_total: self.counters.timed_out.load(Ordering::Relaxed),
            requeued_total: self.counters.requeued.load(Ordering::Relaxed),
            cancelled_total: self.counters.cancelled.load(Ordering::Relaxed),
            store_failures: self.counters.store_failures.load(Ordering::Relaxed),
        }
    }

    /// Queued job ids in dispatch order
    pub fn queued_jobs(&self) -> Vec<JobId> {
        self.state.lock().queue.ids_in_order()
    }

    /// Next job that would be admitted, skipping `excluding`, without admitting it
    pub fn peek_next(&self, excluding: &HashSet<JobId>) -> Option<JobQueueItem> {
        self.state
            .lock()
            .queue
            .peek_next(excluding, Instant::now())
            .cloned()
    }

    pub fn active_jobs(&self) -> Vec<JobId> {
        self.state.lock().gate.active_ids()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SchedulerEvent) {
        // Err only means nobody is subscribed
        let _ = self.events.send(event);
    }

    async fn persist(&self, job_id: JobId, status: JobStatus, snapshot: Option<Snapshot>) {
        let record = JobStatusRecord::new(status, snapshot);
        let write = self.store.put_job_status(job_id, record);
        let error = match tokio::time::timeout(self.config.store_timeout, write).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "timed out after {}ms",
                self.config.store_timeout.as_millis()
            ),
        };

        self.counters.store_failures.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(%job_id, %status, error = %error, "Failed to persist job status");
        self.emit(SchedulerEvent::StoreWriteFailed {
            job_id,
            status,
            error,
        });
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}
