//! In-memory checkpoint store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Checkpoint, CheckpointStore};
use crate::errors::CheckpointError;

/// Checkpoint store backed by a `HashMap` protected by `RwLock`.
///
/// Suitable for tests and single-process runs; use
/// [`FileCheckpointStore`](super::FileCheckpointStore) when resumption may
/// happen in a different process.
pub struct InMemoryCheckpointStore {
    sessions: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let mut guard = self.sessions.write().await;
        guard.insert(checkpoint.session_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let guard = self.sessions.read().await;
        Ok(guard.get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<bool, CheckpointError> {
        let mut guard = self.sessions.write().await;
        Ok(guard.remove(session_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::SessionStatus;
    use crate::state::ResearchState;

    #[tokio::test]
    async fn put_get_round_trip() {
        let store = InMemoryCheckpointStore::new();
        let cp = Checkpoint::new(
            "s1",
            SessionStatus::AwaitingFeedback,
            ResearchState::new("topic", 3),
        );
        store.put(&cp).await.unwrap();

        let loaded = store.get("s1").await.unwrap().expect("checkpoint exists");
        assert_eq!(loaded.status, SessionStatus::AwaitingFeedback);
        assert_eq!(loaded.state.topic, "topic");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemoryCheckpointStore::new();
        let a = Checkpoint::new(
            "a",
            SessionStatus::AwaitingFeedback,
            ResearchState::new("alpha", 1),
        );
        let b = Checkpoint::new(
            "b",
            SessionStatus::Completed,
            ResearchState::new("beta", 2),
        );
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().unwrap().state.topic, "alpha");
        assert_eq!(store.get("b").await.unwrap().unwrap().state.topic, "beta");
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = InMemoryCheckpointStore::new();
        assert!(!store.delete("ghost").await.unwrap());
        let cp = Checkpoint::new(
            "s1",
            SessionStatus::Completed,
            ResearchState::new("t", 1),
        );
        store.put(&cp).await.unwrap();
        assert!(store.delete("s1").await.unwrap());
        assert!(store.get("s1").await.unwrap().is_none());
    }
}
