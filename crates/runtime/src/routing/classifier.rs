//! Keyword intent classifier used as the routing fallback

use super::config::{IntentClassifierConfig, IntentPattern};
use super::decision::{RouteSource, RoutingDecision, INTENT_CONFIDENCE};
use crate::handlers::{CostEstimate, HandlerRegistry};
use crate::types::GenerationRequest;

/// Ordered keyword matcher
///
/// Patterns are tested in configuration order and the first pattern whose
/// keywords all appear in the request's intent text wins.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    enabled: bool,
    patterns: Vec<IntentPattern>,
}

impl IntentClassifier {
    /// Build a classifier; keywords are lowercased once here
    pub fn new(config: &IntentClassifierConfig) -> Self {
        let patterns = config
            .patterns
            .iter()
            .map(|p| IntentPattern {
                keywords: p.keywords.iter().map(|k| k.trim().to_lowercase()).collect(),
                target: p.target.clone(),
            })
            .collect();

        Self {
            enabled: config.enabled,
            patterns,
        }
    }

    /// Find the first pattern matching the request
    pub fn matching_pattern(&self, request: &GenerationRequest) -> Option<&IntentPattern> {
        if !self.enabled {
            return None;
        }
        let text = request.intent_text();
        if text.is_empty() {
            return None;
        }
        self.patterns
            .iter()
            .find(|p| p.keywords.iter().all(|k| text.contains(k.as_str())))
    }

    /// Classify a request into a routing decision
    pub fn classify(
        &self,
        request: &GenerationRequest,
        handlers: &HandlerRegistry,
        default_estimate: CostEstimate,
    ) -> Option<RoutingDecision> {
        let pattern = self.matching_pattern(request)?;
        let estimate = handlers.estimate(&pattern.target).unwrap_or(default_estimate);

        Some(RoutingDecision::new(
            pattern.target.clone(),
            INTENT_CONFIDENCE,
            format!("matched intent keywords: {}", pattern.keywords.join(" + ")),
            RouteSource::Intent {
                keywords: pattern.keywords.clone(),
            },
            estimate,
        ))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
