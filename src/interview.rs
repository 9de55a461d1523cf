//! Interview branch: the nested question/search/answer/route loop.
//!
//! Each branch owns one [`InterviewState`] seeded from the parent session
//! and runs to its terminal state independently of every other branch:
//!
//! ```text
//! AskQuestion -> {SearchWeb, SearchKnowledgeBase} (parallel)
//!             -> AnswerQuestion -> route -> {loop | SaveTranscript}
//!             -> WriteSection -> terminal
//! ```
//!
//! The loop ends when the analyst has used up `max_num_turns` answers or
//! closes the interview with the sentinel phrase.

use std::sync::Arc;

use crate::collaborators::{
    complete_structured, GenRequest, KbDocument, KnowledgeBase, TextGenerator, WebDocument,
    WebSearch,
};
use crate::config::{with_retry, PipelineConfig};
use crate::errors::PipelineError;
use crate::events::{EventSink, PipelineEvent};
use crate::prompts;
use crate::report::dedupe_section_sources;
use crate::state::{Analyst, InterviewState, Message, SearchQuery};

/// What one finished interview branch hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct InterviewOutcome {
    pub analyst: Analyst,
    /// Markdown section written from the interview, sources deduplicated.
    pub section: String,
    /// Role-prefixed flattened transcript.
    pub transcript: String,
}

/// Runs one interview branch end to end. Cloned once per dispatched branch;
/// the collaborators behind the `Arc`s are shared, the state is not.
#[derive(Clone)]
pub struct InterviewRunner {
    generator: Arc<dyn TextGenerator>,
    web: Arc<dyn WebSearch>,
    kb: Arc<dyn KnowledgeBase>,
    config: PipelineConfig,
    events: EventSink,
}

impl InterviewRunner {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        web: Arc<dyn WebSearch>,
        kb: Arc<dyn KnowledgeBase>,
        config: PipelineConfig,
        events: EventSink,
    ) -> Self {
        Self {
            generator,
            web,
            kb,
            config,
            events,
        }
    }

    /// Run the full branch for one analyst and return its outcome.
    pub async fn run(&self, analyst: Analyst, topic: &str) -> Result<InterviewOutcome, PipelineError> {
        self.events.emit(PipelineEvent::InterviewStarted {
            analyst: analyst.name.clone(),
        });
        tracing::info!(analyst = %analyst.name, "interview started");

        let mut state = InterviewState::new(analyst, topic);
        loop {
            self.ask_question(&mut state).await?;
            self.gather_context(&mut state).await?;
            self.answer_question(&mut state).await?;
            if !self.should_continue(&state) {
                break;
            }
        }

        state.interview = state.transcript();
        let section = self.write_section(&state).await?;

        self.events.emit(PipelineEvent::InterviewCompleted {
            analyst: state.analyst.name.clone(),
        });
        tracing::info!(analyst = %state.analyst.name, turns = state.expert_turns(), "interview completed");

        Ok(InterviewOutcome {
            analyst: state.analyst,
            section,
            transcript: state.interview,
        })
    }

    /// Generate the next analyst-voiced question from the full history.
    async fn ask_question(&self, state: &mut InterviewState) -> Result<(), PipelineError> {
        let system = prompts::question_instructions(&state.analyst.persona());
        let question = with_retry(&self.config.retry, || {
            self.generator
                .complete(GenRequest::new(system.clone(), state.messages.clone()))
        })
        .await?;
        state.messages.push(Message::analyst(question));
        Ok(())
    }

    /// Run both retrieval branches concurrently, then append their context
    /// blobs. Each branch derives its own query; a branch whose derived
    /// query is absent contributes nothing.
    async fn gather_context(&self, state: &mut InterviewState) -> Result<(), PipelineError> {
        let (web_blob, kb_blob) =
            tokio::try_join!(self.search_web(state), self.search_knowledge_base(state))?;
        state.context.extend(web_blob);
        state.context.extend(kb_blob);
        Ok(())
    }

    async fn search_web(&self, state: &InterviewState) -> Result<Option<String>, PipelineError> {
        let Some(query) = self.derive_query(state).await?.search_query else {
            tracing::debug!(analyst = %state.analyst.name, "no web query derived, skipping search");
            return Ok(None);
        };
        let docs = with_retry(&self.config.retry, || {
            self.web.search(&query, self.config.web_results_limit)
        })
        .await?;
        Ok(Some(format_web_documents(&docs)))
    }

    async fn search_knowledge_base(
        &self,
        state: &InterviewState,
    ) -> Result<Option<String>, PipelineError> {
        let Some(query) = self.derive_query(state).await?.search_query else {
            tracing::debug!(analyst = %state.analyst.name, "no knowledge-base query derived, skipping lookup");
            return Ok(None);
        };
        let docs = with_retry(&self.config.retry, || {
            self.kb.lookup(&query, self.config.kb_max_docs)
        })
        .await?;
        Ok(Some(format_kb_documents(&docs)))
    }

    /// Structured call turning the conversation so far into a search query.
    async fn derive_query(&self, state: &InterviewState) -> Result<SearchQuery, PipelineError> {
        let query = with_retry(&self.config.retry, || {
            complete_structured::<SearchQuery>(
                self.generator.as_ref(),
                GenRequest::new(prompts::search_query_instructions(), state.messages.clone()),
            )
        })
        .await?;
        Ok(query)
    }

    /// Generate the expert's answer from the accumulated context.
    async fn answer_question(&self, state: &mut InterviewState) -> Result<(), PipelineError> {
        let system =
            prompts::answer_instructions(&state.analyst.persona(), &state.context.join("\n\n"));
        let answer = with_retry(&self.config.retry, || {
            self.generator
                .complete(GenRequest::new(system.clone(), state.messages.clone()))
        })
        .await?;
        state.messages.push(Message::expert(answer));
        Ok(())
    }

    /// Route decision: keep looping until the turn budget is spent or the
    /// question preceding the latest answer carries the sentinel.
    fn should_continue(&self, state: &InterviewState) -> bool {
        if state.expert_turns() >= self.config.max_num_turns {
            return false;
        }
        let question = state.messages.iter().rev().nth(1);
        !matches!(
            question,
            Some(m) if m.content.contains(prompts::END_OF_INTERVIEW_SENTINEL)
        )
    }

    /// Produce this branch's report section from the retrieved context.
    async fn write_section(&self, state: &InterviewState) -> Result<String, PipelineError> {
        let system = prompts::section_writer_instructions(&state.analyst.description);
        let user = Message::moderator(format!(
            "Use this source to write your section: {}",
            state.context.join("\n\n")
        ));
        let section = with_retry(&self.config.retry, || {
            self.generator
                .complete(GenRequest::new(system.clone(), vec![user.clone()]))
        })
        .await?;
        Ok(dedupe_section_sources(&section))
    }
}

/// Tag each web document with its provenance.
pub(crate) fn format_web_documents(docs: &[WebDocument]) -> String {
    docs.iter()
        .map(|doc| format!("<Document href=\"{}\"/>\n{}\n</Document>", doc.url, doc.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Tag each knowledge-base document with its provenance. The page attribute
/// is present only when the backend reported one.
pub(crate) fn format_kb_documents(docs: &[KbDocument]) -> String {
    docs.iter()
        .map(|doc| match doc.page {
            Some(page) => format!(
                "<Document source=\"{}\" page=\"{}\"/>\n{}\n</Document>",
                doc.source, page, doc.content
            ),
            None => format!(
                "<Document source=\"{}\"/>\n{}\n</Document>",
                doc.source, doc.content
            ),
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}
