//! Dispatch registry
//!
//! Single entry point combining the handler catalog, the routing engine and
//! the job scheduler. Callers (a dispatch loop, an HTTP layer) route requests,
//! queue jobs, poll for admitted work and report outcomes through it.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::DispatchConfig;
use crate::context::ContextStore;
use crate::handlers::{HandlerEntry, HandlerRegistry};
use crate::routing::{RoutingDecision, RoutingEngine, RoutingRule, RoutingStatsSnapshot};
use crate::scheduler::{FailOutcome, JobQueueItem, JobScheduler, QueueStats, SchedulerEvent};
use crate::types::{DispatchError, GenerationRequest, JobId, SchedulerError};

/// Outcome of routing and queueing a request in one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub job_id: JobId,
    pub decision: RoutingDecision,
}

/// Routing plus scheduling service
pub struct DispatchRegistry {
    routing: RoutingEngine,
    scheduler: Arc<JobScheduler>,
}

impl DispatchRegistry {
    /// Validate the configuration and build the registry with its handler catalog
    pub fn new(config: &DispatchConfig, store: Arc<dyn ContextStore>) -> Result<Self, DispatchError> {
        config.validate()?;
        let handlers = config.handler_registry()?;
        Self::with_handlers(config, handlers, store)
    }

    /// Build the registry around an explicit handler catalog
    pub fn with_handlers(
        config: &DispatchConfig,
        handlers: HandlerRegistry,
        store: Arc<dyn ContextStore>,
    ) -> Result<Self, DispatchError> {
        let routing = RoutingEngine::new(&config.routing, Arc::new(handlers))?;
        let scheduler = Arc::new(JobScheduler::new(config.scheduler.clone(), store));

        tracing::info!(
            handlers = routing.handlers().len(),
            rules = routing.rules().len(),
            capacity = config.scheduler.max_concurrent_jobs,
            "Dispatch registry initialized"
        );

        Ok(Self { routing, scheduler })
    }

    /// Pick a handler for the request, or `None` if nothing applies
    pub fn route(&self, request: &GenerationRequest) -> Option<RoutingDecision> {
        self.routing.route(request)
    }

    /// Queue a request for a named handler
    pub async fn queue_job(
        &self,
        handler: &str,
        request: GenerationRequest,
    ) -> Result<JobId, DispatchError> {
        if !self.routing.handlers().contains(handler) {
            return Err(SchedulerError::UnknownHandler {
                name: handler.to_string(),
            }
            .into());
        }
        Ok(self.scheduler.enqueue(handler, request).await?)
    }

    /// Route a request and queue it for the chosen handler
    pub async fn submit(&self, request: GenerationRequest) -> Result<Submission, DispatchError> {
        let decision = self
            .routing
            .route(&request)
            .ok_or(DispatchError::NoAgentDetermined)?;
        let job_id = self.queue_job(&decision.handler, request).await?;
        Ok(Submission { job_id, decision })
    }

    /// Admit the next job if a slot is free; never waits
    pub async fn get_next_job(&self) -> Option<JobQueueItem> {
        self.scheduler.get_next_job().await
    }

    pub async fn complete_job(&self, job_id: JobId) -> bool {
        self.scheduler.complete_job(job_id).await
    }

    pub async fn fail_job(&self, job_id: JobId) -> FailOutcome {
        self.scheduler.fail_job(job_id).await
    }

    pub async fn cancel_job(&self, job_id: JobId) -> Result<(), DispatchError> {
        Ok(self.scheduler.cancel_job(job_id).await?)
    }

    pub fn renew_lease(&self, job_id: JobId) -> bool {
        self.scheduler.renew_lease(job_id)
    }

    /// Queued job ids in dispatch order
    pub fn queued_jobs(&self) -> Vec<JobId> {
        self.scheduler.queued_jobs()
    }

    pub fn get_queue_stats(&self) -> QueueStats {
        self.scheduler.stats()
    }

    pub fn list_handlers(&self) -> Vec<HandlerEntry> {
        self.routing.handlers().list()
    }

    /// Replace the rule table; the previous table stays active on error
    pub fn reload_rules(&self, rules: Vec<RoutingRule>) -> Result<(), DispatchError> {
        Ok(self.routing.reload_rules(rules)?)
    }

    pub fn rules(&self) -> Vec<RoutingRule> {
        self.routing.rules()
    }

    pub fn routing_statistics(&self) -> RoutingStatsSnapshot {
        self.routing.statistics()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.scheduler.subscribe()
    }

    pub async fn sweep_expired_leases(&self) -> Vec<JobId> {
        self.scheduler.sweep_expired_leases().await
    }

    pub fn spawn_lease_sweeper(&self) -> JoinHandle<()> {
        self.scheduler.spawn_lease_sweeper()
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    pub fn scheduler(&self) -> &Arc<JobScheduler> {
        &self.scheduler
    }
}

impl std::fmt::Debug for DispatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRegistry")
            .field("routing", &self.routing)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InMemoryContextStore;
    use crate::routing::{MatchCondition, RouteSource};

    fn registry() -> DispatchRegistry {
        DispatchRegistry::new(
            &DispatchConfig::default(),
            Arc::new(InMemoryContextStore::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_queue_job_rejects_unknown_handler() {
        let registry = registry();
        let err = registry
            .queue_job("ghost-writer", GenerationRequest::new("boo"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Scheduler(SchedulerError::UnknownHandler { ref name }) if name == "ghost-writer"
        ));
        assert_eq!(registry.get_queue_stats().queued_count, 0);
    }

    #[tokio::test]
    async fn test_submit_routes_then_queues() {
        let registry = registry();
        let submission = registry
            .submit(GenerationRequest::new("Need a TAGLINE for launch"))
            .await
            .unwrap();
        assert_eq!(submission.decision.handler, "tagline-generator");

        let job = registry.get_next_job().await.unwrap();
        assert_eq!(job.job_id, submission.job_id);
        assert_eq!(job.handler, "tagline-generator");
    }

    #[tokio::test]
    async fn test_submit_without_match() {
        let registry = registry();
        let err = registry
            .submit(GenerationRequest::new("hello there"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoAgentDetermined));
    }

    #[test]
    fn test_list_handlers_sorted() {
        let handlers = registry().list_handlers();
        assert_eq!(handlers.len(), 10);
        let names: Vec<&str> = handlers.iter().map(|h| h.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_reload_rules() {
        let registry = registry();
        registry
            .reload_rules(vec![RoutingRule::new(
                "greetings",
                5,
                MatchCondition::contains_any(["hello"]),
                "social-post-writer",
            )])
            .unwrap();

        let decision = registry.route(&GenerationRequest::new("hello there")).unwrap();
        assert!(matches!(decision.source, RouteSource::Rule { ref name, .. } if name == "greetings"));
        assert!(registry
            .reload_rules(vec![RoutingRule::new(
                "bad",
                5,
                MatchCondition::contains_any(["x"]),
                "nobody",
            )])
            .is_err());
        assert_eq!(registry.rules().len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DispatchConfig::default();
        config.scheduler.max_concurrent_jobs = 0;
        let result = DispatchRegistry::new(&config, Arc::new(InMemoryContextStore::new()));
        assert!(matches!(result, Err(DispatchError::Configuration(_))));
    }
}
