//! Session checkpointing.
//!
//! The feedback gate is the single suspension point in the orchestrator, and
//! resumption may happen in a different process much later. A checkpoint is
//! therefore an explicit, durable snapshot of the whole [`ResearchState`]
//! plus a paused-at marker — never an implicit suspended call stack.

mod file;
mod in_memory;

pub use file::FileCheckpointStore;
pub use in_memory::InMemoryCheckpointStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CheckpointError;
use crate::state::ResearchState;

/// Where a checkpointed session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Paused at the feedback gate; `resume` continues from here.
    AwaitingFeedback,
    /// The run finished and the final report is in the snapshot.
    Completed,
}

/// A whole-state snapshot keyed by session identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub status: SessionStatus,
    pub state: ResearchState,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(session_id: impl Into<String>, status: SessionStatus, state: ResearchState) -> Self {
        Self {
            session_id: session_id.into(),
            status,
            state,
            updated_at: Utc::now(),
        }
    }
}

/// Persistence for session checkpoints.
///
/// All writes are whole-state snapshots. Sessions under different
/// identifiers must not interact; within a session the orchestrator is the
/// sole writer.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Store (create or replace) the snapshot for a session.
    async fn put(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Fetch the last snapshot for a session, if any.
    async fn get(&self, session_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Delete a session's snapshot. Returns `true` if it existed.
    async fn delete(&self, session_id: &str) -> Result<bool, CheckpointError>;
}
