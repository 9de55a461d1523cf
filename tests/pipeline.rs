//! End-to-end pipeline tests over scripted collaborators.
//!
//! The generator double dispatches on the instruction template it receives,
//! so every stage of a session gets a plausible reply without any network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use panelwright::{
    CheckpointError, CheckpointStore, GenRequest, GenerationError, InMemoryCheckpointStore,
    KbDocument, KnowledgeBase, Pipeline, PipelineConfig, PipelineError, RetrievalError,
    SessionStatus, SessionUpdate, TextGenerator, WebDocument, WebSearch,
};

struct MockGenerator {
    panel_calls: AtomicUsize,
    section_calls: AtomicUsize,
}

impl MockGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            panel_calls: AtomicUsize::new(0),
            section_calls: AtomicUsize::new(0),
        })
    }

    fn panel_json(with_regulator: bool) -> String {
        let third = if with_regulator {
            r#"{"affiliation": "Oversight Board", "name": "Regulator Rhee", "role": "Regulator", "description": "Focus R"}"#
        } else {
            r#"{"affiliation": "Uni C", "name": "Analyst Three", "role": "Researcher", "description": "Focus C"}"#
        };
        format!(
            r#"{{"analysts": [
                {{"affiliation": "Uni A", "name": "Analyst One", "role": "Economist", "description": "Focus A"}},
                {{"affiliation": "Uni B", "name": "Analyst Two", "role": "Engineer", "description": "Focus B"}},
                {third}
            ]}}"#
        )
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(&self, request: GenRequest) -> Result<String, GenerationError> {
        let system = &request.system;
        if system.contains("analyst personas") {
            self.panel_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(Self::panel_json(system.contains("add a regulator")));
        }
        if system.contains("web search query") {
            return Ok(r#"{"search_query": "scripted query"}"#.into());
        }
        if system.contains("expert being interviewed") {
            return Ok("An answer grounded in the context [1].".into());
        }
        if system.contains("expert technical writer") {
            self.section_calls.fetch_add(1, Ordering::SeqCst);
            // The focus line carries the analyst description, so each
            // section names the analyst that produced it.
            let focus = system
                .lines()
                .find(|l| l.starts_with("Focus "))
                .unwrap_or("Focus ?");
            return Ok(format!(
                "## Section ({focus})\n### Summary\nInsight [1].\n### Sources\n[1] https://example.com/a\n[2] https://example.com/a"
            ));
        }
        if system.contains("creating a report") {
            return Ok("## Insights\nConsolidated body [1].\n## Sources\n[1] https://example.com/a".into());
        }
        if system.contains("finishing a report") {
            let wants_conclusion = request
                .messages
                .last()
                .map(|m| m.content.contains("conclusion"))
                .unwrap_or(false);
            return Ok(if wants_conclusion {
                "## Conclusion\nWrap-up.".into()
            } else {
                "# Title\n## Introduction\nOpening.".into()
            });
        }
        if system.contains("professional translator") {
            return Ok("TRANSLATED REPORT".into());
        }
        // Analyst question generation.
        Ok("Could you expand on that?".into())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct StubWeb;

#[async_trait]
impl WebSearch for StubWeb {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<WebDocument>, RetrievalError> {
        Ok(vec![WebDocument {
            url: "https://example.com/a".into(),
            content: "web evidence".into(),
        }])
    }

    fn name(&self) -> &str {
        "stub-web"
    }
}

struct StubKb;

#[async_trait]
impl KnowledgeBase for StubKb {
    async fn lookup(&self, _query: &str, _max_docs: usize) -> Result<Vec<KbDocument>, RetrievalError> {
        Ok(vec![KbDocument {
            source: "Example article".into(),
            page: Some(3),
            content: "kb evidence".into(),
        }])
    }

    fn name(&self) -> &str {
        "stub-kb"
    }
}

fn pipeline(
    generator: Arc<MockGenerator>,
    store: Arc<InMemoryCheckpointStore>,
    config: PipelineConfig,
) -> Pipeline {
    Pipeline::builder(generator, Arc::new(StubWeb), Arc::new(StubKb))
        .checkpoints(store)
        .config(config)
        .build()
}

fn two_analyst_config() -> PipelineConfig {
    PipelineConfig {
        max_analysts: 2,
        retry: panelwright::RetryPolicy {
            backoff_ms: 1,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn full_session_produces_one_section_per_analyst() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let pipeline = pipeline(Arc::clone(&generator), Arc::clone(&store), two_analyst_config());

    let update = pipeline.start("s1", "The future of edge caching").await.unwrap();
    let analysts = match update {
        SessionUpdate::AwaitingFeedback { analysts, .. } => analysts,
        other => panic!("expected feedback gate, got {other:?}"),
    };
    // Panel trimmed to the configured bound.
    assert_eq!(analysts.len(), 2);

    let update = pipeline.resume("s1", None).await.unwrap();
    let final_report = match update {
        SessionUpdate::Completed { final_report, translated_report, .. } => {
            assert!(translated_report.is_none());
            final_report
        }
        other => panic!("expected completion, got {other:?}"),
    };

    assert!(final_report.contains("## Introduction"));
    assert!(final_report.contains("Consolidated body [1]."));
    assert!(final_report.contains("## Conclusion"));
    assert!(final_report.contains("## Sources\n[1] https://example.com/a"));

    // One section per dispatched analyst, each from a distinct analyst.
    let checkpoint = store.get("s1").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, SessionStatus::Completed);
    assert_eq!(checkpoint.state.sections.len(), 2);
    assert!(checkpoint.state.sections.iter().any(|s| s.contains("Focus A")));
    assert!(checkpoint.state.sections.iter().any(|s| s.contains("Focus B")));
}

#[tokio::test]
async fn feedback_regenerates_panel_then_approval_completes() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let config = PipelineConfig {
        max_analysts: 3,
        ..two_analyst_config()
    };
    let pipeline = pipeline(Arc::clone(&generator), Arc::clone(&store), config);

    pipeline.start("s1", "Edge caching").await.unwrap();
    assert_eq!(generator.panel_calls.load(Ordering::SeqCst), 1);

    let update = pipeline
        .resume("s1", Some("add a regulator".into()))
        .await
        .unwrap();
    let analysts = match update {
        SessionUpdate::AwaitingFeedback { analysts, .. } => analysts,
        other => panic!("expected another feedback gate, got {other:?}"),
    };
    // Full regeneration, not an incremental edit.
    assert_eq!(generator.panel_calls.load(Ordering::SeqCst), 2);
    assert!(analysts.iter().any(|a| a.name == "Regulator Rhee"));

    let update = pipeline.resume("s1", Some("APPROVE".into())).await.unwrap();
    assert!(matches!(update, SessionUpdate::Completed { .. }));
}

#[tokio::test]
async fn resume_dispatches_interviews_exactly_once() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let pipeline = pipeline(Arc::clone(&generator), Arc::clone(&store), two_analyst_config());

    pipeline.start("s1", "Edge caching").await.unwrap();
    pipeline.resume("s1", Some(String::new())).await.unwrap();

    // One section-writer call per analyst, no duplicate dispatch.
    assert_eq!(generator.section_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn resumed_session_keeps_its_panel_bound() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let one_analyst = PipelineConfig {
        max_analysts: 1,
        ..two_analyst_config()
    };
    let starter = pipeline(Arc::clone(&generator), Arc::clone(&store), one_analyst);
    starter.start("s1", "Edge caching").await.unwrap();

    // Resume through a separate pipeline whose own config allows a larger
    // panel; the bound recorded at session start still applies.
    let resumer = pipeline(
        Arc::clone(&generator),
        Arc::clone(&store),
        PipelineConfig {
            max_analysts: 3,
            ..two_analyst_config()
        },
    );
    let update = resumer
        .resume("s1", Some("add a regulator".into()))
        .await
        .unwrap();
    let analysts = match update {
        SessionUpdate::AwaitingFeedback { analysts, .. } => analysts,
        other => panic!("expected another feedback gate, got {other:?}"),
    };
    assert_eq!(analysts.len(), 1);

    let checkpoint = store.get("s1").await.unwrap().unwrap();
    assert_eq!(checkpoint.state.max_analysts, 1);
    assert_eq!(checkpoint.state.analysts.len(), 1);

    let update = resumer.resume("s1", None).await.unwrap();
    assert!(matches!(update, SessionUpdate::Completed { .. }));
    let checkpoint = store.get("s1").await.unwrap().unwrap();
    assert_eq!(checkpoint.state.sections.len(), 1);
}

#[tokio::test]
async fn failed_branch_carries_its_cause_and_produces_no_report() {
    struct FailingWeb;

    #[async_trait]
    impl WebSearch for FailingWeb {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<WebDocument>, RetrievalError> {
            Err(RetrievalError::WebSearch {
                message: "503 upstream".into(),
            })
        }

        fn name(&self) -> &str {
            "failing-web"
        }
    }

    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let pipeline = Pipeline::builder(generator, Arc::new(FailingWeb), Arc::new(StubKb))
        .checkpoints(store.clone() as Arc<dyn CheckpointStore>)
        .config(two_analyst_config())
        .build();

    pipeline.start("s1", "Edge caching").await.unwrap();
    let err = pipeline.resume("s1", None).await.unwrap_err();
    match &err {
        PipelineError::Interview { analyst, source } => {
            assert!(analyst.starts_with("Analyst"), "got analyst {analyst:?}");
            // The branch's typed error survives, not a flattened string.
            let cause = source
                .downcast_ref::<PipelineError>()
                .expect("source is the branch's pipeline error");
            assert!(
                matches!(cause, PipelineError::Retrieval(RetrievalError::WebSearch { .. })),
                "got {cause}"
            );
        }
        other => panic!("expected interview failure, got {other}"),
    }

    // No partial report: the session is still parked at the gate.
    let checkpoint = store.get("s1").await.unwrap().unwrap();
    assert_eq!(checkpoint.status, SessionStatus::AwaitingFeedback);
    assert!(checkpoint.state.sections.is_empty());
}

#[tokio::test]
async fn resume_after_completion_is_rejected() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let pipeline = pipeline(generator, store, two_analyst_config());

    pipeline.start("s1", "Edge caching").await.unwrap();
    pipeline.resume("s1", None).await.unwrap();

    let err = pipeline.resume("s1", None).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotPaused { .. }), "got {err}");
}

#[tokio::test]
async fn resume_of_unknown_session_is_not_found() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let pipeline = pipeline(generator, store, two_analyst_config());

    let err = pipeline.resume("ghost", None).await.unwrap_err();
    assert!(
        matches!(err, PipelineError::Checkpoint(CheckpointError::NotFound { .. })),
        "got {err}"
    );
}

#[tokio::test]
async fn duplicate_section_sources_collapse_in_stored_sections() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let pipeline = pipeline(generator, Arc::clone(&store), two_analyst_config());

    pipeline.start("s1", "Edge caching").await.unwrap();
    pipeline.resume("s1", None).await.unwrap();

    let checkpoint = store.get("s1").await.unwrap().unwrap();
    for section in &checkpoint.state.sections {
        // The mock section writer lists the same URL twice.
        assert_eq!(section.matches("https://example.com/a").count(), 1, "{section}");
    }
}

#[tokio::test]
async fn translation_stage_runs_when_enabled() {
    let generator = MockGenerator::new();
    let store = Arc::new(InMemoryCheckpointStore::new());
    let config = PipelineConfig {
        translate_report: true,
        ..two_analyst_config()
    };
    let pipeline = pipeline(generator, store, config);

    pipeline.start("s1", "Edge caching").await.unwrap();
    let update = pipeline.resume("s1", None).await.unwrap();
    match update {
        SessionUpdate::Completed { translated_report, .. } => {
            assert_eq!(translated_report.as_deref(), Some("TRANSLATED REPORT"));
        }
        other => panic!("expected completion, got {other:?}"),
    }
}
