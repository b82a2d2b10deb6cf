//! Rule evaluation for routing decisions

use regex::{Regex, RegexBuilder};

use super::config::{validate_rules, MatchCondition, RoutingRule};
use super::decision::{RouteSource, RoutingDecision, RULE_CONFIDENCE};
use super::error::RoutingError;
use crate::handlers::{CostEstimate, HandlerRegistry};
use crate::types::{GenerationRequest, RequestField};

/// Condition with regexes compiled and terms lowercased
///
/// Matching runs against lowercased request text, so regexes are built
/// case-insensitive.
#[derive(Debug, Clone)]
enum CompiledCondition {
    ContainsAll(Vec<String>),
    ContainsAny(Vec<String>),
    Regex(Regex),
    FieldEquals(RequestField, String),
    FieldPresent(RequestField),
    All(Vec<CompiledCondition>),
    Any(Vec<CompiledCondition>),
    Not(Box<CompiledCondition>),
}

impl CompiledCondition {
    fn compile(rule: &str, condition: &MatchCondition) -> Result<Self, RoutingError> {
        let lower = |terms: &[String]| terms.iter().map(|t| t.trim().to_lowercase()).collect();

        Ok(match condition {
            MatchCondition::ContainsAll { terms } => CompiledCondition::ContainsAll(lower(terms)),
            MatchCondition::ContainsAny { terms } => CompiledCondition::ContainsAny(lower(terms)),
            MatchCondition::Regex { pattern } => {
                let regex = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| RoutingError::InvalidPattern {
                        rule: rule.to_string(),
                        pattern: pattern.clone(),
                        source,
                    })?;
                CompiledCondition::Regex(regex)
            }
            MatchCondition::FieldEquals { field, value } => {
                CompiledCondition::FieldEquals(field.clone(), value.clone())
            }
            MatchCondition::FieldPresent { field } => CompiledCondition::FieldPresent(field.clone()),
            MatchCondition::All { conditions } => CompiledCondition::All(
                conditions
                    .iter()
                    .map(|c| Self::compile(rule, c))
                    .collect::<Result<_, _>>()?,
            ),
            MatchCondition::Any { conditions } => CompiledCondition::Any(
                conditions
                    .iter()
                    .map(|c| Self::compile(rule, c))
                    .collect::<Result<_, _>>()?,
            ),
            MatchCondition::Not { condition } => {
                CompiledCondition::Not(Box::new(Self::compile(rule, condition)?))
            }
        })
    }

    fn matches(&self, request: &GenerationRequest, text: &str) -> bool {
        match self {
            CompiledCondition::ContainsAll(terms) => terms.iter().all(|t| text.contains(t.as_str())),
            CompiledCondition::ContainsAny(terms) => terms.iter().any(|t| text.contains(t.as_str())),
            CompiledCondition::Regex(regex) => regex.is_match(text),
            CompiledCondition::FieldEquals(field, value) => request
                .field(field)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case(value.trim())),
            CompiledCondition::FieldPresent(field) => {
                request.field(field).is_some_and(|v| !v.trim().is_empty())
            }
            CompiledCondition::All(conditions) => conditions.iter().all(|c| c.matches(request, text)),
            CompiledCondition::Any(conditions) => conditions.iter().any(|c| c.matches(request, text)),
            CompiledCondition::Not(condition) => !condition.matches(request, text),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: RoutingRule,
    condition: CompiledCondition,
}

/// Immutable, priority-sorted rule table
///
/// Rules are sorted once when the table is built. The sort is stable, so
/// rules sharing a priority keep their registration order.
#[derive(Debug, Clone, Default)]
pub struct RuleRouter {
    rules: Vec<CompiledRule>,
}

impl RuleRouter {
    /// Validate and compile a rule table
    pub fn new(rules: Vec<RoutingRule>, handlers: &HandlerRegistry) -> Result<Self, RoutingError> {
        validate_rules(&rules, handlers)?;

        let mut compiled = rules
            .into_iter()
            .map(|rule| {
                let condition = CompiledCondition::compile(&rule.name, &rule.condition)?;
                Ok(CompiledRule { rule, condition })
            })
            .collect::<Result<Vec<_>, RoutingError>>()?;
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));

        Ok(Self { rules: compiled })
    }

    /// First rule, in priority order, whose condition matches
    pub fn matching_rule(&self, request: &GenerationRequest) -> Option<&RoutingRule> {
        let text = request.intent_text();
        self.rules
            .iter()
            .find(|r| r.condition.matches(request, &text))
            .map(|r| &r.rule)
    }

    /// Evaluate the table and build a decision for the winning rule
    pub fn evaluate(
        &self,
        request: &GenerationRequest,
        handlers: &HandlerRegistry,
        default_estimate: CostEstimate,
    ) -> Option<RoutingDecision> {
        let rule = self.matching_rule(request)?;
        let estimate = handlers.estimate(&rule.target).unwrap_or(default_estimate);
        let reason = if rule.reason.trim().is_empty() {
            format!("matched rule '{}'", rule.name)
        } else {
            rule.reason.clone()
        };

        Some(RoutingDecision::new(
            rule.target.clone(),
            RULE_CONFIDENCE,
            reason,
            RouteSource::Rule {
                name: rule.name.clone(),
                priority: rule.priority,
            },
            estimate,
        ))
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &RoutingRule> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
