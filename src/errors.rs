//! Error types for all pipeline collaborator and store operations.

use thiserror::Error;

/// Errors from the [`TextGenerator`](crate::collaborators::TextGenerator)
/// collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The provider call itself failed (transport, auth, rate limit).
    #[error("generation provider error: {message}")]
    Provider { message: String },
    /// A structured-output response did not conform to the declared schema.
    #[error("structured output did not match schema: {message}")]
    Schema { message: String },
}

/// Errors from the retrieval collaborators.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("web search error: {message}")]
    WebSearch { message: String },
    #[error("knowledge base error: {message}")]
    KnowledgeBase { message: String },
}

/// Errors from [`CheckpointStore`](crate::checkpoint::CheckpointStore).
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("session not found: {session_id}")]
    NotFound { session_id: String },
    #[error("checkpoint store error: {message}")]
    Store { message: String },
}

/// Top-level pipeline error. Configuration problems abort before any graph
/// execution starts; everything else surfaces from the node that raised it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// `resume` was called for a session that is not paused at the
    /// feedback gate.
    #[error("session {session_id} is not awaiting feedback")]
    NotPaused { session_id: String },

    /// An interview branch failed; the whole run fails with it (no partial
    /// report is produced). The branch's underlying error is carried as the
    /// source.
    #[error("interview branch for analyst '{analyst}' failed: {source}")]
    Interview {
        analyst: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
