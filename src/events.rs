//! Progress events emitted while a session runs.
//!
//! Events are observability only: the orchestrator never waits on the
//! receiver, and a dropped or absent receiver must not stall or fail a run.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::state::Analyst;

/// A notable point in a session's lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A fresh analyst panel was generated (initial or after feedback).
    AnalystsGenerated { analysts: Vec<Analyst> },
    /// The session paused at the feedback gate and was checkpointed.
    AwaitingFeedback { session_id: String },
    /// One interview branch was dispatched.
    InterviewStarted { analyst: String },
    /// One interview branch reached its terminal state.
    InterviewCompleted { analyst: String },
    /// The three reduction stages finished and the report was assembled.
    ReportAssembled { session_id: String },
    /// The assembled report was translated.
    ReportTranslated { session_id: String },
}

/// Fire-and-forget sender for [`PipelineEvent`]s.
#[derive(Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<PipelineEvent>>,
}

impl EventSink {
    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn new(sender: UnboundedSender<PipelineEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Emit an event. Send failures (receiver dropped) are ignored.
    pub(crate) fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
