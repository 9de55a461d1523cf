//! Top-level session orchestrator.
//!
//! ```text
//! GenerateAnalysts -> HumanFeedbackGate -> {GenerateAnalysts | FanOutInterviews}
//!                  -> FanInBarrier
//!                  -> {WriteBody, WriteIntroduction, WriteConclusion} (parallel)
//!                  -> FinalizeReport [-> TranslateReport] -> terminal
//! ```
//!
//! The feedback gate is the only suspension point: `start` runs up to the
//! gate and checkpoints, `resume` continues from the snapshot — possibly in
//! a different process. Within a session the orchestrator is the sole
//! checkpoint writer; interview branches mutate only their own state and
//! hand results back through the fan-in barrier.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::checkpoint::{Checkpoint, CheckpointStore, InMemoryCheckpointStore, SessionStatus};
use crate::collaborators::{
    complete_structured, GenRequest, KnowledgeBase, TextGenerator, WebSearch,
};
use crate::config::{with_retry, PipelineConfig};
use crate::errors::{CheckpointError, PipelineError};
use crate::events::{EventSink, PipelineEvent};
use crate::interview::{InterviewOutcome, InterviewRunner};
use crate::prompts;
use crate::report::assemble_report;
use crate::state::{Analyst, Message, Perspectives, ResearchState};

/// What a session step returned to the caller.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// The session is paused at the feedback gate with this panel. Call
    /// [`Pipeline::resume`] to continue.
    AwaitingFeedback {
        session_id: String,
        analysts: Vec<Analyst>,
    },
    /// The session ran to completion.
    Completed {
        session_id: String,
        final_report: String,
        translated_report: Option<String>,
    },
}

/// Builder for [`Pipeline`]. Collaborators are required; the checkpoint
/// store defaults to in-memory, the config to its defaults, and events to a
/// disabled sink.
pub struct PipelineBuilder {
    generator: Arc<dyn TextGenerator>,
    web: Arc<dyn WebSearch>,
    kb: Arc<dyn KnowledgeBase>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    config: PipelineConfig,
    events: EventSink,
}

impl PipelineBuilder {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        web: Arc<dyn WebSearch>,
        kb: Arc<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            generator,
            web,
            kb,
            checkpoints: None,
            config: PipelineConfig::default(),
            events: EventSink::disabled(),
        }
    }

    pub fn checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            generator: self.generator,
            web: self.web,
            kb: self.kb,
            checkpoints: self
                .checkpoints
                .unwrap_or_else(|| Arc::new(InMemoryCheckpointStore::new())),
            config: self.config,
            events: self.events,
        }
    }
}

/// The research pipeline. One instance can drive any number of sessions;
/// sessions under different identifiers never interact.
pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    web: Arc<dyn WebSearch>,
    kb: Arc<dyn KnowledgeBase>,
    checkpoints: Arc<dyn CheckpointStore>,
    config: PipelineConfig,
    events: EventSink,
}

impl Pipeline {
    pub fn builder(
        generator: Arc<dyn TextGenerator>,
        web: Arc<dyn WebSearch>,
        kb: Arc<dyn KnowledgeBase>,
    ) -> PipelineBuilder {
        PipelineBuilder::new(generator, web, kb)
    }

    /// Start a new session: generate the analyst panel and pause at the
    /// feedback gate. A non-empty topic is required before any execution.
    pub async fn start(
        &self,
        session_id: &str,
        topic: &str,
    ) -> Result<SessionUpdate, PipelineError> {
        if topic.trim().is_empty() {
            return Err(PipelineError::Configuration {
                message: "topic must not be empty".into(),
            });
        }

        tracing::info!(session_id, topic, "session started");
        let mut state = ResearchState::new(topic, self.config.max_analysts);
        self.generate_analysts(&mut state).await?;
        self.pause_at_gate(session_id, state).await
    }

    /// Resume a session paused at the feedback gate. Feedback that is
    /// absent, empty, or "approve" (case-insensitive) proceeds to the
    /// interviews; anything else regenerates the panel and pauses again.
    pub async fn resume(
        &self,
        session_id: &str,
        feedback: Option<String>,
    ) -> Result<SessionUpdate, PipelineError> {
        let checkpoint = self
            .checkpoints
            .get(session_id)
            .await?
            .ok_or_else(|| CheckpointError::NotFound {
                session_id: session_id.to_string(),
            })?;
        if checkpoint.status != SessionStatus::AwaitingFeedback {
            return Err(PipelineError::NotPaused {
                session_id: session_id.to_string(),
            });
        }

        let mut state = checkpoint.state;
        state.human_feedback = feedback;

        if !state.feedback_approves() {
            tracing::info!(session_id, "feedback received, regenerating analyst panel");
            state.analysts.clear();
            self.generate_analysts(&mut state).await?;
            return self.pause_at_gate(session_id, state).await;
        }

        self.run_interviews(&mut state).await?;
        self.run_reductions(&mut state).await?;

        state.final_report = assemble_report(&state);
        self.events.emit(PipelineEvent::ReportAssembled {
            session_id: session_id.to_string(),
        });

        let translated_report = if self.config.translate_report {
            let translated = self.translate_report(&state).await?;
            state.translated_report = translated.clone();
            self.events.emit(PipelineEvent::ReportTranslated {
                session_id: session_id.to_string(),
            });
            Some(translated)
        } else {
            None
        };

        let final_report = state.final_report.clone();
        self.checkpoints
            .put(&Checkpoint::new(
                session_id,
                SessionStatus::Completed,
                state,
            ))
            .await?;
        tracing::info!(session_id, "session completed");

        Ok(SessionUpdate::Completed {
            session_id: session_id.to_string(),
            final_report,
            translated_report,
        })
    }

    /// Checkpoint at the feedback gate and report the paused panel.
    async fn pause_at_gate(
        &self,
        session_id: &str,
        state: ResearchState,
    ) -> Result<SessionUpdate, PipelineError> {
        let analysts = state.analysts.clone();
        self.checkpoints
            .put(&Checkpoint::new(
                session_id,
                SessionStatus::AwaitingFeedback,
                state,
            ))
            .await?;
        self.events.emit(PipelineEvent::AwaitingFeedback {
            session_id: session_id.to_string(),
        });
        Ok(SessionUpdate::AwaitingFeedback {
            session_id: session_id.to_string(),
            analysts,
        })
    }

    /// Structured call producing the analyst panel. Overwrites `analysts`
    /// wholesale and trims to the session's bound. The bound is fixed at
    /// session start and travels with the checkpoint, so a resume through a
    /// differently-configured pipeline keeps the original panel size.
    async fn generate_analysts(&self, state: &mut ResearchState) -> Result<(), PipelineError> {
        let feedback = state.human_feedback.clone().unwrap_or_default();
        let system = prompts::analyst_instructions(&state.topic, &feedback, state.max_analysts);
        let user = Message::moderator("Generate the set of analysts.");
        let perspectives = with_retry(&self.config.retry, || {
            complete_structured::<Perspectives>(
                self.generator.as_ref(),
                GenRequest::new(system.clone(), vec![user.clone()]),
            )
        })
        .await?;

        let mut analysts = perspectives.analysts;
        analysts.truncate(state.max_analysts);
        state.analysts = analysts;

        self.events.emit(PipelineEvent::AnalystsGenerated {
            analysts: state.analysts.clone(),
        });
        tracing::info!(count = state.analysts.len(), "analyst panel generated");
        Ok(())
    }

    /// Fan out one interview branch per analyst and join at the barrier.
    /// Every branch is drained before the merge; if any branch failed the
    /// whole run fails and no sections are merged.
    async fn run_interviews(&self, state: &mut ResearchState) -> Result<(), PipelineError> {
        let runner = InterviewRunner::new(
            Arc::clone(&self.generator),
            Arc::clone(&self.web),
            Arc::clone(&self.kb),
            self.config.clone(),
            self.events.clone(),
        );

        let mut branches = FuturesUnordered::new();
        for analyst in state.analysts.clone() {
            let runner = runner.clone();
            let topic = state.topic.clone();
            let name = analyst.name.clone();
            branches.push(tokio::spawn(async move {
                let outcome = runner.run(analyst, &topic).await;
                (name, outcome)
            }));
        }

        let mut outcomes: Vec<InterviewOutcome> = Vec::new();
        let mut first_error: Option<PipelineError> = None;
        while let Some(joined) = branches.next().await {
            match joined {
                Ok((_, Ok(outcome))) => outcomes.push(outcome),
                Ok((name, Err(error))) => {
                    tracing::error!(analyst = %name, error = %error, "interview branch failed");
                    first_error.get_or_insert(PipelineError::Interview {
                        analyst: name,
                        source: Box::new(error),
                    });
                }
                Err(join_error) => {
                    first_error.get_or_insert(PipelineError::Interview {
                        analyst: "unknown".into(),
                        source: Box::new(join_error),
                    });
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        state.merge_sections(outcomes.into_iter().map(|o| o.section).collect());
        Ok(())
    }

    /// The three reduction stages read the same joined section list and
    /// each write a disjoint scalar field; all must finish before assembly.
    async fn run_reductions(&self, state: &mut ResearchState) -> Result<(), PipelineError> {
        let sections = state.sections.join("\n\n");
        let (content, introduction, conclusion) = tokio::try_join!(
            self.write_body(&state.topic, &sections),
            self.write_framing(&state.topic, &sections, "Write the report introduction"),
            self.write_framing(&state.topic, &sections, "Write the report conclusion"),
        )?;
        state.content = content;
        state.introduction = introduction;
        state.conclusion = conclusion;
        Ok(())
    }

    async fn write_body(&self, topic: &str, sections: &str) -> Result<String, PipelineError> {
        let system = prompts::report_writer_instructions(topic, sections);
        let user = Message::moderator("Write a report based upon these memos.");
        let body = with_retry(&self.config.retry, || {
            self.generator
                .complete(GenRequest::new(system.clone(), vec![user.clone()]))
        })
        .await?;
        Ok(body)
    }

    async fn write_framing(
        &self,
        topic: &str,
        sections: &str,
        instruction: &str,
    ) -> Result<String, PipelineError> {
        let system = prompts::intro_conclusion_instructions(topic, sections);
        let user = Message::moderator(instruction);
        let framing = with_retry(&self.config.retry, || {
            self.generator
                .complete(GenRequest::new(system.clone(), vec![user.clone()]))
        })
        .await?;
        Ok(framing)
    }

    async fn translate_report(&self, state: &ResearchState) -> Result<String, PipelineError> {
        let user = Message::moderator(prompts::translate_user_prompt(
            &state.topic,
            &state.final_report,
        ));
        let translated = with_retry(&self.config.retry, || {
            self.generator.complete(GenRequest::new(
                prompts::translate_instructions(),
                vec![user.clone()],
            ))
        })
        .await?;
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::collaborators::{KbDocument, WebDocument};
    use crate::errors::{GenerationError, RetrievalError};

    struct NullGenerator;

    #[async_trait]
    impl TextGenerator for NullGenerator {
        async fn complete(&self, _request: GenRequest) -> Result<String, GenerationError> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    struct NullWeb;

    #[async_trait]
    impl WebSearch for NullWeb {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<WebDocument>, RetrievalError> {
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    struct NullKb;

    #[async_trait]
    impl KnowledgeBase for NullKb {
        async fn lookup(
            &self,
            _query: &str,
            _max_docs: usize,
        ) -> Result<Vec<KbDocument>, RetrievalError> {
            Ok(vec![])
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::builder(Arc::new(NullGenerator), Arc::new(NullWeb), Arc::new(NullKb)).build()
    }

    #[tokio::test]
    async fn empty_topic_fails_before_execution() {
        let err = pipeline().start("s1", "   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }), "got {err}");
    }

    #[tokio::test]
    async fn resume_of_unknown_session_is_not_found() {
        let err = pipeline().resume("ghost", None).await.unwrap_err();
        assert!(
            matches!(
                err,
                PipelineError::Checkpoint(CheckpointError::NotFound { .. })
            ),
            "got {err}"
        );
    }
}
