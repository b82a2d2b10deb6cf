//! Core types shared by the routing, context and scheduling layers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

pub mod error;

pub use error::*;

/// Point-in-time view of a request's context, built once at enqueue time.
pub type Snapshot = Map<String, Value>;

/// Unique identifier for queued jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Contextual hints attached to a generation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// What the caller is trying to achieve
    #[serde(default)]
    pub goal: Option<String>,
    /// Kind of content being asked for (e.g. "persona", "landing page")
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    /// Anything else the caller attached
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// An incoming content-generation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    /// Explicitly requested handler, bypasses rule evaluation
    pub agent: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub purpose: Option<String>,
    pub context: Option<RequestContext>,
    /// Queue priority override (higher is dispatched first)
    pub priority: Option<i32>,
    /// Brand profile whose cached record should be attached to the snapshot
    pub profile_id: Option<String>,
    pub user_id: Option<String>,
    /// Prior job whose conversation history should be attached to the snapshot
    pub job_id: Option<String>,
    /// Caller-supplied overrides carried verbatim into the snapshot
    pub overrides: Option<Map<String, Value>>,
    /// Snapshot from an earlier job in the same session
    pub snapshot: Option<Snapshot>,
    pub metadata: HashMap<String, String>,
}

impl GenerationRequest {
    /// Create a request with just a description
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_prior_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_context(mut self, goal: Option<&str>, content_type: Option<&str>) -> Self {
        self.context = Some(RequestContext {
            goal: goal.map(str::to_string),
            content_type: content_type.map(str::to_string),
            extra: Map::new(),
        });
        self
    }

    /// Read one of the well-known request fields
    pub fn field(&self, field: &RequestField) -> Option<&str> {
        match field {
            RequestField::Agent => self.agent.as_deref(),
            RequestField::Description => self.description.as_deref(),
            RequestField::Content => self.content.as_deref(),
            RequestField::Purpose => self.purpose.as_deref(),
            RequestField::ContextGoal => self.context.as_ref().and_then(|c| c.goal.as_deref()),
            RequestField::ContextType => self
                .context
                .as_ref()
                .and_then(|c| c.content_type.as_deref()),
            RequestField::ProfileId => self.profile_id.as_deref(),
            RequestField::UserId => self.user_id.as_deref(),
            RequestField::Metadata(key) => self.metadata.get(key).map(String::as_str),
        }
    }

    /// Lowercased blob of the free-text fields used for keyword and pattern matching
    pub fn intent_text(&self) -> String {
        INTENT_FIELDS
            .iter()
            .filter_map(|f| self.field(f))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

const INTENT_FIELDS: [RequestField; 5] = [
    RequestField::Description,
    RequestField::Content,
    RequestField::Purpose,
    RequestField::ContextGoal,
    RequestField::ContextType,
];

/// Request fields addressable from routing rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestField {
    Agent,
    Description,
    Content,
    Purpose,
    ContextGoal,
    ContextType,
    ProfileId,
    UserId,
    Metadata(String),
}

impl std::fmt::Display for RequestField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestField::Agent => write!(f, "agent"),
            RequestField::Description => write!(f, "description"),
            RequestField::Content => write!(f, "content"),
            RequestField::Purpose => write!(f, "purpose"),
            RequestField::ContextGoal => write!(f, "context.goal"),
            RequestField::ContextType => write!(f, "context.type"),
            RequestField::ProfileId => write!(f, "profile_id"),
            RequestField::UserId => write!(f, "user_id"),
            RequestField::Metadata(key) => write!(f, "metadata.{}", key),
        }
    }
}

/// Status persisted to the context store as a job moves through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Retrying,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Retrying => "retrying",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed_out",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_text_joins_and_lowercases() {
        let request = GenerationRequest {
            description: Some("Need a TAGLINE".to_string()),
            purpose: Some("Product Launch".to_string()),
            content: Some(String::new()),
            ..Default::default()
        }
        .with_context(Some("Grow Awareness"), Some("Copy"));

        assert_eq!(
            request.intent_text(),
            "need a tagline product launch grow awareness copy"
        );
    }

    #[test]
    fn test_request_deserializes_context_type() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "description": "site map for the new store",
            "context": { "goal": "launch", "type": "wireframe", "audience": "retail" },
            "priority": 3
        }))
        .unwrap();

        assert_eq!(request.field(&RequestField::ContextType), Some("wireframe"));
        assert_eq!(request.priority, Some(3));
        let context = request.context.unwrap();
        assert_eq!(context.extra.get("audience"), Some(&Value::from("retail")));
    }

    #[test]
    fn test_job_id_roundtrips_through_display() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
