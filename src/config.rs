//! Pipeline tuning knobs — all fields have sensible defaults.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one [`Pipeline`](crate::orchestrator::Pipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Upper bound on the analyst panel size. Default: 3.
    #[serde(default = "default_max_analysts")]
    pub max_analysts: usize,
    /// Maximum question/answer rounds per interview. Default: 2.
    #[serde(default = "default_max_num_turns")]
    pub max_num_turns: usize,
    /// Web-search result limit per query. Default: 3.
    #[serde(default = "default_web_results_limit")]
    pub web_results_limit: usize,
    /// Knowledge-base document limit per query. Default: 2.
    #[serde(default = "default_kb_max_docs")]
    pub kb_max_docs: usize,
    /// Whether to translate the assembled report as a final stage.
    /// Default: false.
    #[serde(default)]
    pub translate_report: bool,
    /// Retry policy applied to every collaborator call.
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_analysts: default_max_analysts(),
            max_num_turns: default_max_num_turns(),
            web_results_limit: default_web_results_limit(),
            kb_max_docs: default_kb_max_docs(),
            translate_report: false,
            retry: RetryPolicy::default(),
        }
    }
}

fn default_max_analysts() -> usize {
    3
}
fn default_max_num_turns() -> usize {
    2
}
fn default_web_results_limit() -> usize {
    3
}
fn default_kb_max_docs() -> usize {
    2
}

/// Retry policy with exponential backoff.
///
/// The source system defined no retry behavior for collaborator calls; the
/// pipeline applies this bounded policy to every generation and retrieval
/// call, including structured-output schema failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryPolicy {
    /// Total attempts (1 = no retry). Default: 2.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial backoff in milliseconds. Default: 500.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Backoff multiplier per attempt. Default: 2.0.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Run `op` under `policy`, sleeping with exponential backoff between
/// attempts. The last error wins.
pub(crate) async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts => {
                let backoff =
                    policy.backoff_ms as f64 * policy.backoff_multiplier.powi(attempt as i32 - 1);
                tracing::warn!(attempt, error = %error, backoff_ms = backoff as u64, "collaborator call failed, retrying");
                tokio::time::sleep(Duration::from_millis(backoff as u64)).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
