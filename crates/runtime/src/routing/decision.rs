//! Routing decision types and statistics

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::handlers::CostEstimate;

/// Confidence assigned when the caller names the handler
pub const OVERRIDE_CONFIDENCE: f64 = 1.0;
/// Confidence assigned when a routing rule matches
pub const RULE_CONFIDENCE: f64 = 0.9;
/// Confidence assigned when the intent classifier matches
pub const INTENT_CONFIDENCE: f64 = 0.8;

/// Reason recorded for explicit overrides
pub const OVERRIDE_REASON: &str = "explicitly requested";

/// Which stage of the router produced a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteSource {
    Override,
    Rule { name: String, priority: u32 },
    Intent { keywords: Vec<String> },
}

/// Outcome of routing a request to a handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub handler: String,
    pub confidence: f64,
    pub reason: String,
    pub source: RouteSource,
    pub estimated_cost_usd: f64,
    #[serde(with = "humantime_serde")]
    pub estimated_duration: Duration,
}

impl RoutingDecision {
    pub(crate) fn new(
        handler: impl Into<String>,
        confidence: f64,
        reason: impl Into<String>,
        source: RouteSource,
        estimate: CostEstimate,
    ) -> Self {
        Self {
            handler: handler.into(),
            confidence,
            reason: reason.into(),
            source,
            estimated_cost_usd: estimate.cost_usd,
            estimated_duration: estimate.duration,
        }
    }
}

/// Routing counters with lock-free atomic updates
#[derive(Debug, Default)]
pub struct RoutingStatistics {
    total_requests: AtomicU64,
    override_routes: AtomicU64,
    rule_routes: AtomicU64,
    intent_routes: AtomicU64,
    unrouted: AtomicU64,
}

/// Point-in-time copy of [`RoutingStatistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStatsSnapshot {
    pub total_requests: u64,
    pub override_routes: u64,
    pub rule_routes: u64,
    pub intent_routes: u64,
    pub unrouted: u64,
}

impl RoutingStatistics {
    pub fn record(&self, decision: Option<&RoutingDecision>) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let counter = match decision.map(|d| &d.source) {
            Some(RouteSource::Override) => &self.override_routes,
            Some(RouteSource::Rule { .. }) => &self.rule_routes,
            Some(RouteSource::Intent { .. }) => &self.intent_routes,
            None => &self.unrouted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RoutingStatsSnapshot {
        RoutingStatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            override_routes: self.override_routes.load(Ordering::Relaxed),
            rule_routes: self.rule_routes.load(Ordering::Relaxed),
            intent_routes: self.intent_routes.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
        }
    }
}
