//! Configuration types for the routing module

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error::RoutingError;
use crate::handlers::{CostEstimate, HandlerRegistry};
use crate::types::RequestField;

/// Complete routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Declarative routing rules, evaluated by descending priority
    pub rules: Vec<RoutingRule>,
    /// Keyword fallback used when no rule matches
    pub intents: IntentClassifierConfig,
    /// Estimate reported when a handler's manifest has none
    pub default_estimate: CostEstimate,
}

/// Individual routing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Rule identifier
    pub name: String,
    /// Rule priority (higher = evaluated first)
    pub priority: u32,
    /// Predicate over the request
    pub condition: MatchCondition,
    /// Handler that receives matching requests
    pub target: String,
    /// Human-readable reason reported with the decision
    #[serde(default)]
    pub reason: String,
}

impl RoutingRule {
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        condition: MatchCondition,
        target: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            reason: format!("matched rule '{}'", name),
            name,
            priority,
            condition,
            target: target.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Predicate kinds a routing rule can express
///
/// Text conditions run against the lowercased intent text of the request
/// (description, content, purpose, context goal and context type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchCondition {
    /// Every term appears in the intent text
    ContainsAll { terms: Vec<String> },
    /// At least one term appears in the intent text
    ContainsAny { terms: Vec<String> },
    /// The intent text matches a regular expression
    Regex { pattern: String },
    /// A request field equals a value, ignoring case
    FieldEquals { field: RequestField, value: String },
    /// A request field is present and non-empty
    FieldPresent { field: RequestField },
    All { conditions: Vec<MatchCondition> },
    Any { conditions: Vec<MatchCondition> },
    Not { condition: Box<MatchCondition> },
}

impl MatchCondition {
    pub fn contains_all<S: Into<String>>(terms: impl IntoIterator<Item = S>) -> Self {
        MatchCondition::ContainsAll {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains_any<S: Into<String>>(terms: impl IntoIterator<Item = S>) -> Self {
        MatchCondition::ContainsAny {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn field_equals(field: RequestField, value: impl Into<String>) -> Self {
        MatchCondition::FieldEquals {
            field,
            value: value.into(),
        }
    }
}

/// Ordered keyword-set to handler mapping used by the intent classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPattern {
    /// All keywords must appear in the intent text
    pub keywords: Vec<String>,
    pub target: String,
}

impl IntentPattern {
    pub fn new<S: Into<String>>(keywords: impl IntoIterator<Item = S>, target: &str) -> Self {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            target: target.to_string(),
        }
    }
}

/// Intent classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentClassifierConfig {
    /// Enable the keyword fallback
    pub enabled: bool,
    /// Checked in order; compound intents must precede broader ones
    pub patterns: Vec<IntentPattern>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            intents: IntentClassifierConfig::default(),
            default_estimate: CostEstimate::default(),
        }
    }
}

impl Default for IntentClassifierConfig {
    fn default() -> Self {
        let patterns = vec![
            IntentPattern::new(["brand", "story"], "brand-story-writer"),
            IntentPattern::new(["brand", "script"], "brand-script-writer"),
            IntentPattern::new(["video", "script"], "brand-script-writer"),
            IntentPattern::new(["tagline"], "tagline-generator"),
            IntentPattern::new(["slogan"], "tagline-generator"),
            IntentPattern::new(["wireframe"], "wireframe-designer"),
            IntentPattern::new(["persona"], "persona-builder"),
            IntentPattern::new(["competitor"], "competitor-analyst"),
            IntentPattern::new(["newsletter"], "email-campaign-writer"),
            IntentPattern::new(["email"], "email-campaign-writer"),
            IntentPattern::new(["social"], "social-post-writer"),
            IntentPattern::new(["instagram"], "social-post-writer"),
            IntentPattern::new(["linkedin"], "social-post-writer"),
            IntentPattern::new(["blog"], "blog-writer"),
            IntentPattern::new(["article"], "blog-writer"),
            IntentPattern::new(["brand"], "brand-strategist"),
        ];

        Self {
            enabled: true,
            patterns,
        }
    }
}

fn default_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule::new(
            "brand-script",
            90,
            MatchCondition::contains_all(["brand", "script"]),
            "brand-script-writer",
        )
        .with_reason("brand script requests go to the script writer"),
        RoutingRule::new(
            "wireframe",
            70,
            MatchCondition::contains_any(["wireframe", "sitemap", "site map"]),
            "wireframe-designer",
        )
        .with_reason("layout and structure requests go to the wireframe designer"),
        RoutingRule::new(
            "persona-context",
            60,
            MatchCondition::field_equals(RequestField::ContextType, "persona"),
            "persona-builder",
        )
        .with_reason("persona context type"),
        RoutingRule::new(
            "competitive-analysis",
            50,
            MatchCondition::Regex {
                pattern: r"\bcompetit(or|ors|ive|ion)\b".to_string(),
            },
            "competitor-analyst",
        )
        .with_reason("competitive research"),
    ]
}

impl RoutingConfig {
    /// Validate rules and intents against the handler catalog
    pub fn validate(&self, handlers: &HandlerRegistry) -> Result<(), RoutingError> {
        validate_rules(&self.rules, handlers)?;
        self.intents.validate(handlers)
    }
}

impl IntentClassifierConfig {
    pub fn validate(&self, handlers: &HandlerRegistry) -> Result<(), RoutingError> {
        for (index, pattern) in self.patterns.iter().enumerate() {
            if pattern.keywords.is_empty() || pattern.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(RoutingError::InvalidIntent {
                    index,
                    reason: "keywords must be non-empty".to_string(),
                });
            }
            if !handlers.contains(&pattern.target) {
                return Err(RoutingError::UnknownIntentTarget {
                    index,
                    handler: pattern.target.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Check names are unique, targets exist and conditions are well formed
pub fn validate_rules(rules: &[RoutingRule], handlers: &HandlerRegistry) -> Result<(), RoutingError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.name.trim().is_empty() {
            return Err(RoutingError::InvalidRule {
                rule: rule.name.clone(),
                reason: "name cannot be empty".to_string(),
            });
        }
        if !seen.insert(rule.name.as_str()) {
            return Err(RoutingError::DuplicateRule {
                rule: rule.name.clone(),
            });
        }
        if !handlers.contains(&rule.target) {
            return Err(RoutingError::UnknownTarget {
                rule: rule.name.clone(),
                handler: rule.target.clone(),
            });
        }
        validate_condition(&rule.name, &rule.condition)?;
    }
    Ok(())
}

fn validate_condition(rule: &str, condition: &MatchCondition) -> Result<(), RoutingError> {
    let invalid = |reason: &str| RoutingError::InvalidRule {
        rule: rule.to_string(),
        reason: reason.to_string(),
    };

    match condition {
        MatchCondition::ContainsAll { terms } | MatchCondition::ContainsAny { terms } => {
            if terms.is_empty() || terms.iter().any(|t| t.trim().is_empty()) {
                return Err(invalid("terms must be non-empty"));
            }
        }
        MatchCondition::Regex { pattern } => {
            regex::Regex::new(pattern).map_err(|source| RoutingError::InvalidPattern {
                rule: rule.to_string(),
                pattern: pattern.clone(),
                source,
            })?;
        }
        MatchCondition::FieldEquals { .. } | MatchCondition::FieldPresent { .. } => {}
        MatchCondition::All { conditions } | MatchCondition::Any { conditions } => {
            if conditions.is_empty() {
                return Err(invalid("combinator needs at least one condition"));
            }
            for inner in conditions {
                validate_condition(rule, inner)?;
            }
        }
        MatchCondition::Not { condition } => validate_condition(rule, condition)?,
    }
    Ok(())
}
