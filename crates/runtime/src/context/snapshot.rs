//! Best-effort context snapshot assembly

use chrono::Utc;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::store::ContextStore;
use crate::types::{ContextStoreError, GenerationRequest, Snapshot};

pub const KEY_PROFILE_ID: &str = "profile_id";
pub const KEY_USER_ID: &str = "user_id";
pub const KEY_JOB_ID: &str = "job_id";
pub const KEY_OVERRIDES: &str = "overrides";
pub const KEY_PRIOR_SNAPSHOT: &str = "prior_snapshot";
pub const KEY_BUILT_AT: &str = "built_at";
pub const KEY_PROFILE: &str = "profile";
pub const KEY_CONVERSATION: &str = "conversation_history";

/// Builds the snapshot attached to a job at enqueue time
///
/// Never fails. The profile and conversation lookups run concurrently and
/// independently; a lookup that errors, times out or finds nothing simply
/// leaves its key out of the snapshot.
#[derive(Clone)]
pub struct SnapshotBuilder {
    store: Arc<dyn ContextStore>,
    fetch_timeout: Duration,
}

impl SnapshotBuilder {
    pub fn new(store: Arc<dyn ContextStore>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
        }
    }

    pub async fn build(&self, request: &GenerationRequest) -> Snapshot {
        let mut snapshot = Snapshot::new();

        insert_str(&mut snapshot, KEY_PROFILE_ID, request.profile_id.as_deref());
        insert_str(&mut snapshot, KEY_USER_ID, request.user_id.as_deref());
        insert_str(&mut snapshot, KEY_JOB_ID, request.job_id.as_deref());
        if let Some(overrides) = &request.overrides {
            snapshot.insert(KEY_OVERRIDES.to_string(), Value::Object(overrides.clone()));
        }
        if let Some(prior) = &request.snapshot {
            snapshot.insert(KEY_PRIOR_SNAPSHOT.to_string(), Value::Object(prior.clone()));
        }
        snapshot.insert(KEY_BUILT_AT.to_string(), Value::from(Utc::now().to_rfc3339()));

        let profile_fut = async {
            match non_empty(request.profile_id.as_deref()) {
                Some(id) => {
                    self.fetch("get_profile", id, self.store.get_profile(id))
                        .await
                }
                None => None,
            }
        };
        let conversation_fut = async {
            match non_empty(request.job_id.as_deref()) {
                Some(id) => {
                    self.fetch("get_conversation", id, self.store.get_conversation(id))
                        .await
                }
                None => None,
            }
        };
        let (profile, conversation) = tokio::join!(profile_fut, conversation_fut);

        if let Some(profile) = profile {
            snapshot.insert(KEY_PROFILE.to_string(), profile);
        }
        if let Some(conversation) = conversation {
            snapshot.insert(KEY_CONVERSATION.to_string(), conversation);
        }

        snapshot
    }

    async fn fetch<F>(&self, operation: &str, key: &str, fut: F) -> Option<Value>
    where
        F: Future<Output = Result<Option<Value>, ContextStoreError>>,
    {
        let result = match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ContextStoreError::Timeout {
                operation: operation.to_string(),
                millis: self.fetch_timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                tracing::debug!(operation, key, "No context record found");
                None
            }
            Err(e) => {
                tracing::warn!(operation, key, error = %e, "Context fetch failed, omitting from snapshot");
                None
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn insert_str(snapshot: &mut Snapshot, key: &str, value: Option<&str>) {
    if let Some(v) = non_empty(value) {
        snapshot.insert(key.to_string(), Value::from(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::store::{InMemoryContextStore, JobStatusRecord};
    use crate::types::JobId;
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingProfileStore;

    #[async_trait]
    impl ContextStore for FailingProfileStore {
        async fn get_profile(&self, _id: &str) -> Result<Option<Value>, ContextStoreError> {
            Err(ContextStoreError::Backend {
                message: "connection refused".to_string(),
            })
        }

        async fn get_conversation(&self, _id: &str) -> Result<Option<Value>, ContextStoreError> {
            Ok(Some(json!(["earlier turn"])))
        }

        async fn put_job_status(
            &self,
            _job_id: JobId,
            _record: JobStatusRecord,
        ) -> Result<(), ContextStoreError> {
            Ok(())
        }
    }

    struct SlowStore;

    #[async_trait]
    impl ContextStore for SlowStore {
        async fn get_profile(&self, _id: &str) -> Result<Option<Value>, ContextStoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(json!({})))
        }

        async fn get_conversation(&self, _id: &str) -> Result<Option<Value>, ContextStoreError> {
            Ok(None)
        }

        async fn put_job_status(
            &self,
            _job_id: JobId,
            _record: JobStatusRecord,
        ) -> Result<(), ContextStoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_full_snapshot() {
        let store = Arc::new(InMemoryContextStore::new());
        store.insert_profile("acme", json!({"voice": "warm"})).await;
        store.insert_conversation("prior-1", json!(["hello"])).await;

        let mut request = GenerationRequest::new("brand story")
            .with_profile("acme")
            .with_user("u-7")
            .with_prior_job("prior-1");
        request.overrides = Some(json!({"tone": "playful"}).as_object().cloned().unwrap());
        request.snapshot = Some(json!({"draft": 2}).as_object().cloned().unwrap());

        let snapshot = SnapshotBuilder::new(store, Duration::from_secs(1))
            .build(&request)
            .await;

        assert_eq!(snapshot[KEY_PROFILE_ID], "acme");
        assert_eq!(snapshot[KEY_USER_ID], "u-7");
        assert_eq!(snapshot[KEY_JOB_ID], "prior-1");
        assert_eq!(snapshot[KEY_OVERRIDES]["tone"], "playful");
        assert_eq!(snapshot[KEY_PRIOR_SNAPSHOT], json!({"draft": 2}));
        assert_eq!(snapshot[KEY_PROFILE]["voice"], "warm");
        assert_eq!(snapshot[KEY_CONVERSATION], json!(["hello"]));
        assert!(snapshot.contains_key(KEY_BUILT_AT));
    }

    #[tokio::test]
    async fn test_unresolvable_profile_keeps_other_fields() {
        let store = Arc::new(InMemoryContextStore::new());
        let request = GenerationRequest::new("tagline")
            .with_profile("missing")
            .with_user("u-1");

        let snapshot = SnapshotBuilder::new(store, Duration::from_secs(1))
            .build(&request)
            .await;

        assert_eq!(snapshot[KEY_PROFILE_ID], "missing");
        assert_eq!(snapshot[KEY_USER_ID], "u-1");
        assert!(!snapshot.contains_key(KEY_PROFILE));
        assert!(!snapshot.contains_key(KEY_CONVERSATION));
    }

    #[tokio::test]
    async fn test_failing_profile_fetch_does_not_block_conversation() {
        let request = GenerationRequest::new("tagline")
            .with_profile("acme")
            .with_prior_job("prior-9");

        let snapshot = SnapshotBuilder::new(Arc::new(FailingProfileStore), Duration::from_secs(1))
            .build(&request)
            .await;

        assert!(!snapshot.contains_key(KEY_PROFILE));
        assert_eq!(snapshot[KEY_CONVERSATION], json!(["earlier turn"]));
        assert_eq!(snapshot[KEY_PROFILE_ID], "acme");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let request = GenerationRequest::new("tagline").with_profile("acme");

        let snapshot = SnapshotBuilder::new(Arc::new(SlowStore), Duration::from_millis(50))
            .build(&request)
            .await;

        assert!(!snapshot.contains_key(KEY_PROFILE));
        assert_eq!(snapshot[KEY_PROFILE_ID], "acme");
    }

    #[tokio::test]
    async fn test_blank_ids_skip_lookups() {
        let request = GenerationRequest::new("tagline").with_profile("   ");
        let snapshot = SnapshotBuilder::new(Arc::new(FailingProfileStore), Duration::from_secs(1))
            .build(&request)
            .await;

        assert!(!snapshot.contains_key(KEY_PROFILE_ID));
        assert!(!snapshot.contains_key(KEY_PROFILE));
    }
}
