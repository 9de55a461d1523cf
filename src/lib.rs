//! Multi-agent research pipeline.
//!
//! A session synthesizes a panel of analyst personas for a topic, pauses
//! for human feedback on the panel, then runs one retrieval-backed
//! interview per analyst concurrently and reduces the results into a
//! single report (introduction, body, conclusion, deduplicated sources),
//! optionally translated.
//!
//! The feedback gate is a durable suspension point: the session is
//! checkpointed there and can be resumed later, including from another
//! process.
//!
//! ```no_run
//! use std::sync::Arc;
//! use panelwright::{
//!     OpenAiCompatibleGenerator, Pipeline, SessionUpdate, TavilySearch,
//!     WikipediaKnowledgeBase,
//! };
//!
//! # async fn run() -> Result<(), panelwright::PipelineError> {
//! let pipeline = Pipeline::builder(
//!     Arc::new(OpenAiCompatibleGenerator::new("https://api.openai.com/v1", "key", "gpt-4o")),
//!     Arc::new(TavilySearch::new("key")),
//!     Arc::new(WikipediaKnowledgeBase::new()),
//! )
//! .build();
//!
//! let update = pipeline.start("session-1", "The future of edge caching").await?;
//! if let SessionUpdate::AwaitingFeedback { .. } = update {
//!     // Inspect the panel, then approve.
//!     pipeline.resume("session-1", None).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod events;
pub mod interview;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
mod report;
pub mod state;

pub use checkpoint::{
    Checkpoint, CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore, SessionStatus,
};
pub use collaborators::{
    complete_structured, GenRequest, KbDocument, KnowledgeBase, TextGenerator, WebDocument,
    WebSearch,
};
pub use config::{PipelineConfig, RetryPolicy};
pub use errors::{CheckpointError, GenerationError, PipelineError, RetrievalError};
pub use events::{EventSink, PipelineEvent};
pub use interview::{InterviewOutcome, InterviewRunner};
pub use orchestrator::{Pipeline, PipelineBuilder, SessionUpdate};
pub use providers::{OpenAiCompatibleGenerator, TavilySearch, WikipediaKnowledgeBase};
pub use state::{Analyst, InterviewState, Message, Perspectives, ResearchState, Role, SearchQuery};
