//! Command-line front end for the research pipeline.
//!
//! Two invocations drive one session:
//!
//! ```text
//! panelwright --session-id 1 --topic "The future of edge caching"
//! panelwright --session-id 1 --feedback approve
//! ```
//!
//! The first generates the analyst panel and pauses at the feedback gate;
//! the second resumes with feedback (non-approving feedback regenerates the
//! panel and pauses again).

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use panelwright::{
    EventSink, FileCheckpointStore, OpenAiCompatibleGenerator, Pipeline, PipelineConfig,
    PipelineEvent, SessionUpdate, TavilySearch, WikipediaKnowledgeBase,
};

#[derive(Parser, Debug)]
#[command(name = "panelwright", about = "Multi-agent research report pipeline", version)]
struct Args {
    /// Session identifier; reuse it to resume a paused session.
    #[arg(long, default_value = "1")]
    session_id: String,

    /// Research topic. Required when starting a new session.
    #[arg(long)]
    topic: Option<String>,

    /// Feedback on the analyst panel. Empty or "approve" proceeds to the
    /// interviews; anything else regenerates the panel.
    #[arg(long)]
    feedback: Option<String>,

    /// Upper bound on the analyst panel size.
    #[arg(long, default_value_t = 3)]
    max_analysts: usize,

    /// Translate the final report as a last stage.
    #[arg(long)]
    translate: bool,

    /// Directory for session checkpoints.
    #[arg(long, default_value = ".panelwright")]
    data_dir: PathBuf,
}

fn env_var(name: &str) -> Result<String, String> {
    std::env::var(name).map_err(|_| format!("environment variable {name} is not set"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let openai_key = env_var("OPENAI_API_KEY")?;
    let openai_base =
        std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let openai_model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let tavily_key = env_var("TAVILY_API_KEY")?;

    let config = PipelineConfig {
        max_analysts: args.max_analysts,
        translate_report: args.translate,
        ..PipelineConfig::default()
    };

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    let pipeline = Pipeline::builder(
        Arc::new(OpenAiCompatibleGenerator::new(
            openai_base,
            openai_key,
            openai_model,
        )),
        Arc::new(TavilySearch::new(tavily_key)),
        Arc::new(WikipediaKnowledgeBase::new()),
    )
    .checkpoints(Arc::new(FileCheckpointStore::new(args.data_dir)?))
    .config(config)
    .events(EventSink::new(event_tx))
    .build();

    let update = match (&args.topic, &args.feedback) {
        (Some(topic), None) => pipeline.start(&args.session_id, topic).await?,
        (None, feedback) => pipeline.resume(&args.session_id, feedback.clone()).await?,
        (Some(_), Some(_)) => {
            return Err("pass --topic to start a session or --feedback to resume one, not both"
                .into());
        }
    };

    drop(pipeline);
    printer.await?;

    match update {
        SessionUpdate::AwaitingFeedback { session_id, .. } => {
            println!(
                "Session {session_id} is awaiting feedback. Resume with:\n  panelwright --session-id {session_id} --feedback approve"
            );
        }
        SessionUpdate::Completed {
            final_report,
            translated_report,
            ..
        } => {
            println!("{final_report}");
            if let Some(translated) = translated_report {
                println!("\n\n====================\n\n{translated}");
            }
        }
    }

    Ok(())
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::AnalystsGenerated { analysts } => {
            for analyst in analysts {
                println!("Name: {}", analyst.name);
                println!("Affiliation: {}", analyst.affiliation);
                println!("Role: {}", analyst.role);
                println!("Description: {}", analyst.description);
                println!("{}", "-".repeat(50));
            }
        }
        PipelineEvent::InterviewStarted { analyst } => {
            println!("Interview started: {analyst}");
        }
        PipelineEvent::InterviewCompleted { analyst } => {
            println!("Interview completed: {analyst}");
        }
        PipelineEvent::AwaitingFeedback { .. }
        | PipelineEvent::ReportAssembled { .. }
        | PipelineEvent::ReportTranslated { .. } => {}
    }
}
