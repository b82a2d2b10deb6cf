//! Routing engine: override, rule table, then intent fallback

use arc_swap::ArcSwap;
use std::sync::Arc;

use super::classifier::IntentClassifier;
use super::config::{RoutingConfig, RoutingRule};
use super::decision::{
    RouteSource, RoutingDecision, RoutingStatistics, RoutingStatsSnapshot, OVERRIDE_CONFIDENCE,
    OVERRIDE_REASON,
};
use super::error::{ErrorSeverity, RoutingError};
use super::policy::RuleRouter;
use crate::handlers::{CostEstimate, HandlerRegistry};
use crate::types::GenerationRequest;

/// Picks the target handler for a request
///
/// Evaluation is a pure function of the current rule table, the classifier
/// patterns and the handler catalog. The rule table can be swapped at runtime
/// without blocking concurrent routing calls.
pub struct RoutingEngine {
    handlers: Arc<HandlerRegistry>,
    rules: ArcSwap<RuleRouter>,
    classifier: IntentClassifier,
    default_estimate: CostEstimate,
    statistics: RoutingStatistics,
}

impl RoutingEngine {
    /// Validate the configuration against the catalog and build the engine
    pub fn new(config: &RoutingConfig, handlers: Arc<HandlerRegistry>) -> Result<Self, RoutingError> {
        config.intents.validate(&handlers)?;
        let rules = RuleRouter::new(config.rules.clone(), &handlers)?;

        Ok(Self {
            classifier: IntentClassifier::new(&config.intents),
            rules: ArcSwap::from_pointee(rules),
            default_estimate: config.default_estimate,
            statistics: RoutingStatistics::default(),
            handlers,
        })
    }

    /// Route a request, returning `None` when nothing applies
    pub fn route(&self, request: &GenerationRequest) -> Option<RoutingDecision> {
        let decision = self.resolve(request);
        self.statistics.record(decision.as_ref());

        match &decision {
            Some(d) => tracing::debug!(
                handler = %d.handler,
                confidence = d.confidence,
                reason = %d.reason,
                "Routed request"
            ),
            None => tracing::debug!("No rule or intent matched request"),
        }
        decision
    }

    fn resolve(&self, request: &GenerationRequest) -> Option<RoutingDecision> {
        if let Some(decision) = self.explicit_override(request) {
            return Some(decision);
        }

        let rules = self.rules.load();
        rules
            .evaluate(request, &self.handlers, self.default_estimate)
            .or_else(|| {
                self.classifier
                    .classify(request, &self.handlers, self.default_estimate)
            })
    }

    fn explicit_override(&self, request: &GenerationRequest) -> Option<RoutingDecision> {
        let name = request.agent.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        if !self.handlers.contains(name) {
            tracing::warn!(
                handler = name,
                "Ignoring override for unknown handler, falling back to rules"
            );
            return None;
        }

        let estimate = self.handlers.estimate(name).unwrap_or(self.default_estimate);
        Some(RoutingDecision::new(
            name,
            OVERRIDE_CONFIDENCE,
            OVERRIDE_REASON,
            RouteSource::Override,
            estimate,
        ))
    }

    /// Validate a new rule table and swap it in atomically
    pub fn reload_rules(&self, rules: Vec<RoutingRule>) -> Result<(), RoutingError> {
        let router = match RuleRouter::new(rules, &self.handlers) {
            Ok(router) => router,
            Err(e) => {
                match e.severity() {
                    ErrorSeverity::High => {
                        tracing::error!(error = %e, "Rejected routing rule reload")
                    }
                    ErrorSeverity::Medium => {
                        tracing::warn!(error = %e, "Rejected routing rule reload")
                    }
                }
                return Err(e);
            }
        };
        let count = router.len();
        self.rules.store(Arc::new(router));
        tracing::info!(rules = count, "Routing rules reloaded");
        Ok(())
    }

    /// Current rules in evaluation order
    pub fn rules(&self) -> Vec<RoutingRule> {
        self.rules.load().rules().cloned().collect()
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn statistics(&self) -> RoutingStatsSnapshot {
        self.statistics.snapshot()
    }
}

impl std::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("handlers", &self.handlers.len())
            .field("rules", &self.rules.load().len())
            .field("intent_patterns", &self.classifier.pattern_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::config::MatchCondition;
    use crate::routing::decision::{INTENT_CONFIDENCE, RULE_CONFIDENCE};

    fn engine() -> RoutingEngine {
        RoutingEngine::new(&RoutingConfig::default(), Arc::new(HandlerRegistry::builtin())).unwrap()
    }

    #[test]
    fn test_override_wins_over_matching_rule() {
        let request = GenerationRequest::new("brand script for the launch video")
            .with_agent("tagline-generator");
        let decision = engine().route(&request).unwrap();

        assert_eq!(decision.handler, "tagline-generator");
        assert_eq!(decision.confidence, OVERRIDE_CONFIDENCE);
        assert_eq!(decision.reason, OVERRIDE_REASON);
        assert_eq!(decision.source, RouteSource::Override);
    }

    #[test]
    fn test_unknown_override_falls_through() {
        let request = GenerationRequest::new("brand script").with_agent("nonexistent");
        let decision = engine().route(&request).unwrap();
        assert_eq!(decision.handler, "brand-script-writer");
        assert_eq!(decision.confidence, RULE_CONFIDENCE);
    }

    #[test]
    fn test_rule_then_intent_then_none() {
        let engine = engine();

        let rule = engine
            .route(&GenerationRequest::new("brand script with a wireframe"))
            .unwrap();
        assert_eq!(rule.handler, "brand-script-writer");

        let intent = engine
            .route(&GenerationRequest::new("Need a TAGLINE for launch"))
            .unwrap();
        assert_eq!(intent.handler, "tagline-generator");
        assert_eq!(intent.confidence, INTENT_CONFIDENCE);

        assert!(engine.route(&GenerationRequest::new("hello there")).is_none());

        let stats = engine.statistics();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.rule_routes, 1);
        assert_eq!(stats.intent_routes, 1);
        assert_eq!(stats.unrouted, 1);
    }

    #[test]
    fn test_reload_rules_swaps_table() {
        let engine = engine();
        engine
            .reload_rules(vec![RoutingRule::new(
                "hello",
                1,
                MatchCondition::contains_any(["hello"]),
                "social-post-writer",
            )])
            .unwrap();

        let decision = engine.route(&GenerationRequest::new("hello there")).unwrap();
        assert_eq!(decision.handler, "social-post-writer");
        assert_eq!(engine.rules().len(), 1);
    }

    #[test]
    fn test_invalid_reload_keeps_previous_table() {
        let engine = engine();
        let before = engine.rules();

        let result = engine.reload_rules(vec![RoutingRule::new(
            "broken",
            1,
            MatchCondition::contains_any(["x"]),
            "ghost",
        )]);
        let err = result.unwrap_err();
        assert!(matches!(err, RoutingError::UnknownTarget { .. }));
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(engine.rules(), before);
    }
}
