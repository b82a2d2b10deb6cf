//! Handler catalog
//!
//! Maps handler names to their static manifests. The catalog is read-only once
//! built: routing consults it for existence checks and cost/duration estimates,
//! and the registry facade lists it for callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::types::HandlerRegistryError;

/// Broad grouping of what a handler produces
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerCategory {
    Strategy,
    Copywriting,
    Design,
    Marketing,
    Research,
    Custom(String),
}

/// Relative effort tier of a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Simple = 1,
    Moderate = 2,
    Complex = 3,
}

/// Expected spend and wall-clock time for one run of a handler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Estimated spend in USD
    pub cost_usd: f64,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl CostEstimate {
    pub const fn new(cost_usd: f64, duration: Duration) -> Self {
        Self { cost_usd, duration }
    }
}

impl Default for CostEstimate {
    fn default() -> Self {
        Self {
            cost_usd: 0.05,
            duration: Duration::from_secs(60),
        }
    }
}

/// Static metadata describing a handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerManifest {
    pub name: String,
    pub category: HandlerCategory,
    #[serde(default)]
    pub description: String,
    /// Missing estimates fall back to the routing default
    #[serde(default)]
    pub cost: Option<CostEstimate>,
    pub complexity: ComplexityTier,
}

impl HandlerManifest {
    pub fn new(
        name: impl Into<String>,
        category: HandlerCategory,
        complexity: ComplexityTier,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: String::new(),
            cost: None,
            complexity,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cost(mut self, cost_usd: f64, duration: Duration) -> Self {
        self.cost = Some(CostEstimate::new(cost_usd, duration));
        self
    }
}

/// Name and manifest pair returned by listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerEntry {
    pub name: String,
    pub manifest: HandlerManifest,
}

/// Read-only catalog of known handlers
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, HandlerManifest>,
}

impl HandlerRegistry {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, rejecting empty or duplicated names
    pub fn from_manifests(
        manifests: impl IntoIterator<Item = HandlerManifest>,
    ) -> Result<Self, HandlerRegistryError> {
        let mut handlers = BTreeMap::new();
        for manifest in manifests {
            if manifest.name.trim().is_empty() {
                return Err(HandlerRegistryError::EmptyName);
            }
            if handlers.contains_key(&manifest.name) {
                return Err(HandlerRegistryError::Duplicate {
                    name: manifest.name,
                });
            }
            handlers.insert(manifest.name.clone(), manifest);
        }
        Ok(Self { handlers })
    }

    /// The catalog shipped with the runtime
    pub fn builtin() -> Self {
        let handlers = builtin_manifests()
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        Self { handlers }
    }

    pub fn get(&self, name: &str) -> Option<&HandlerManifest> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Cost estimate for a handler, if its manifest carries one
    pub fn estimate(&self, name: &str) -> Option<CostEstimate> {
        self.handlers.get(name).and_then(|m| m.cost)
    }

    /// All handlers, sorted by name
    pub fn list(&self) -> Vec<HandlerEntry> {
        self.handlers
            .iter()
            .map(|(name, manifest)| HandlerEntry {
                name: name.clone(),
                manifest: manifest.clone(),
            })
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn builtin_manifests() -> Vec<HandlerManifest> {
    use ComplexityTier::*;
    use HandlerCategory::*;

    let secs = Duration::from_secs;
    vec![
        HandlerManifest::new("brand-strategist", Strategy, Complex)
            .with_description("Positioning, values and voice for a brand")
            .with_cost(0.12, secs(90)),
        HandlerManifest::new("brand-story-writer", Copywriting, Moderate)
            .with_description("Long-form origin and mission narratives")
            .with_cost(0.06, secs(45)),
        HandlerManifest::new("brand-script-writer", Copywriting, Moderate)
            .with_description("Video and audio scripts in the brand voice")
            .with_cost(0.08, secs(60)),
        HandlerManifest::new("tagline-generator", Copywriting, Simple)
            .with_description("Short taglines and slogans")
            .with_cost(0.01, secs(10)),
        HandlerManifest::new("wireframe-designer", Design, Complex)
            .with_description("Page structure and wireframe outlines")
            .with_cost(0.10, secs(120)),
        HandlerManifest::new("social-post-writer", Marketing, Simple)
            .with_description("Posts for social channels")
            .with_cost(0.02, secs(15)),
        HandlerManifest::new("email-campaign-writer", Marketing, Moderate)
            .with_description("Email sequences and newsletters")
            .with_cost(0.04, secs(30)),
        HandlerManifest::new("blog-writer", Copywriting, Moderate)
            .with_description("Blog posts and articles")
            .with_cost(0.05, secs(60)),
        HandlerManifest::new("persona-builder", Research, Moderate)
            .with_description("Audience personas from brand context")
            .with_cost(0.05, secs(45)),
        HandlerManifest::new("competitor-analyst", Research, Complex)
            .with_description("Competitive landscape summaries")
            .with_cost(0.09, secs(90)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_sorted_and_complete() {
        let registry = HandlerRegistry::builtin();
        assert_eq!(registry.len(), 10);

        let names: Vec<_> = registry.list().into_iter().map(|e| e.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(registry.contains("tagline-generator"));
        assert!(registry.list().iter().all(|e| e.manifest.cost.is_some()));
    }

    #[test]
    fn test_duplicate_manifest_rejected() {
        let result = HandlerRegistry::from_manifests(vec![
            HandlerManifest::new("a", HandlerCategory::Design, ComplexityTier::Simple),
            HandlerManifest::new("a", HandlerCategory::Research, ComplexityTier::Complex),
        ]);
        assert_eq!(
            result.unwrap_err(),
            HandlerRegistryError::Duplicate {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = HandlerRegistry::from_manifests(vec![HandlerManifest::new(
            "  ",
            HandlerCategory::Design,
            ComplexityTier::Simple,
        )]);
        assert_eq!(result.unwrap_err(), HandlerRegistryError::EmptyName);
    }

    #[test]
    fn test_estimate_missing_cost() {
        let registry = HandlerRegistry::from_manifests(vec![HandlerManifest::new(
            "bare",
            HandlerCategory::Custom("misc".to_string()),
            ComplexityTier::Simple,
        )])
        .unwrap();
        assert!(registry.estimate("bare").is_none());
        assert!(registry.estimate("missing").is_none());
    }
}
