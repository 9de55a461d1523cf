//! State model for the research pipeline.
//!
//! Two state scopes exist: [`ResearchState`] is owned by the top-level
//! orchestrator (one instance per session, serialized into checkpoints),
//! and [`InterviewState`] is owned by exactly one interview branch and is
//! never visible to any other branch.
//!
//! Concurrently-produced contributions are combined through the explicit
//! merge functions on `ResearchState` (append for lists, single-writer
//! overwrite for scalars) — never through a shared mutable collection.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Case-insensitive feedback value that routes the orchestrator past the
/// feedback gate. Absent or empty feedback means the same thing.
pub const APPROVE_SENTINEL: &str = "approve";

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Who produced a conversation turn. Fixed at construction; a message's
/// role never changes after it is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The scripted opener that seeds each interview.
    Moderator,
    /// The analyst persona asking questions.
    Analyst,
    /// The simulated subject-matter expert answering them.
    Expert,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Moderator => "Moderator",
            Role::Analyst => "Analyst",
            Role::Expert => "Expert",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn moderator(content: impl Into<String>) -> Self {
        Self {
            role: Role::Moderator,
            content: content.into(),
        }
    }

    pub fn analyst(content: impl Into<String>) -> Self {
        Self {
            role: Role::Analyst,
            content: content.into(),
        }
    }

    pub fn expert(content: impl Into<String>) -> Self {
        Self {
            role: Role::Expert,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Analyst personas
// ---------------------------------------------------------------------------

/// An immutable synthesized analyst persona. Produced only by the
/// analyst-generation step and regenerated wholesale on a feedback
/// iteration, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Analyst {
    /// Primary affiliation of the analyst.
    pub affiliation: String,
    /// Name of the analyst.
    pub name: String,
    /// Role of the analyst in the context of the topic.
    pub role: String,
    /// Description of the analyst focus, concerns and motives.
    pub description: String,
}

impl Analyst {
    /// Render the persona block used in interview prompts.
    pub fn persona(&self) -> String {
        format!(
            "Name: {}\nRole: {}\nAffiliation: {}\nDescription: {}\n",
            self.name, self.role, self.affiliation, self.description
        )
    }
}

/// Declared schema for the analyst-generation structured call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Perspectives {
    /// Comprehensive list of analysts with roles and affiliations.
    pub analysts: Vec<Analyst>,
}

/// Declared schema for the query-derivation structured calls. The query is
/// optional: the model may decide no retrieval is needed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Search query for retrieval.
    pub search_query: Option<String>,
}

// ---------------------------------------------------------------------------
// Top-level research state
// ---------------------------------------------------------------------------

/// Orchestrator-owned state, one instance per session. The whole struct is
/// what gets snapshotted into the checkpoint store at the feedback gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    /// Research topic. Immutable after session start.
    pub topic: String,
    /// Upper bound on the analyst panel size.
    pub max_analysts: usize,
    /// Human feedback supplied at resume time. Absent or empty means
    /// "approve".
    #[serde(default)]
    pub human_feedback: Option<String>,
    /// Current analyst panel. Overwritten wholesale on regeneration.
    #[serde(default)]
    pub analysts: Vec<Analyst>,
    /// Interview sections, appended at the fan-in barrier. Order across
    /// branches follows completion order and is not deterministic.
    #[serde(default)]
    pub sections: Vec<String>,
    /// Introduction for the final report.
    #[serde(default)]
    pub introduction: String,
    /// Consolidated body content for the final report.
    #[serde(default)]
    pub content: String,
    /// Conclusion for the final report.
    #[serde(default)]
    pub conclusion: String,
    /// Assembled final report.
    #[serde(default)]
    pub final_report: String,
    /// Optional translation of the final report.
    #[serde(default)]
    pub translated_report: String,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>, max_analysts: usize) -> Self {
        Self {
            topic: topic.into(),
            max_analysts,
            human_feedback: None,
            analysts: Vec::new(),
            sections: Vec::new(),
            introduction: String::new(),
            content: String::new(),
            conclusion: String::new(),
            final_report: String::new(),
            translated_report: String::new(),
        }
    }

    /// Routing test for the feedback gate: absent, empty, or the
    /// case-insensitive [`APPROVE_SENTINEL`] proceeds to fan-out; anything
    /// else routes back to regeneration.
    pub fn feedback_approves(&self) -> bool {
        match &self.human_feedback {
            None => true,
            Some(feedback) => {
                let trimmed = feedback.trim();
                trimmed.is_empty() || trimmed.eq_ignore_ascii_case(APPROVE_SENTINEL)
            }
        }
    }

    /// Append merge rule for `sections`, applied once under the fan-in
    /// barrier after every interview branch has reached its terminal state.
    pub fn merge_sections(&mut self, sections: Vec<String>) {
        self.sections.extend(sections);
    }
}

// ---------------------------------------------------------------------------
// Per-branch interview state
// ---------------------------------------------------------------------------

/// State owned by exactly one interview branch. Seeded from the parent with
/// an isolated copy of the fields the branch needs; handed back only
/// through the branch's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewState {
    /// The analyst conducting this interview. Read-only.
    pub analyst: Analyst,
    /// Conversation turns, append-only.
    pub messages: Vec<Message>,
    /// Retrieved-document blobs, appended in the completion order of the
    /// concurrent retrieval branches.
    pub context: Vec<String>,
    /// Flattened transcript, written once at interview end.
    pub interview: String,
}

impl InterviewState {
    /// Seed a new branch with the scripted opener referencing the topic.
    pub fn new(analyst: Analyst, topic: &str) -> Self {
        Self {
            analyst,
            messages: vec![Message::moderator(format!(
                "So you said you were writing an article on {topic}?"
            ))],
            context: Vec::new(),
            interview: String::new(),
        }
    }

    /// Number of expert answers so far. Drives loop termination.
    pub fn expert_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Expert)
            .count()
    }

    /// Flatten the message sequence into a role-prefixed transcript.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyst() -> Analyst {
        Analyst {
            affiliation: "Example Institute".into(),
            name: "Dr. Vale".into(),
            role: "Infrastructure analyst".into(),
            description: "Focuses on operational cost".into(),
        }
    }

    #[test]
    fn persona_contains_all_fields() {
        let p = analyst().persona();
        for needle in [
            "Dr. Vale",
            "Infrastructure analyst",
            "Example Institute",
            "operational cost",
        ] {
            assert!(p.contains(needle), "persona missing {needle}: {p}");
        }
    }

    #[test]
    fn feedback_routing() {
        let mut state = ResearchState::new("topic", 3);
        assert!(state.feedback_approves(), "absent feedback approves");

        state.human_feedback = Some(String::new());
        assert!(state.feedback_approves(), "empty feedback approves");

        state.human_feedback = Some("APPROVE".into());
        assert!(state.feedback_approves(), "sentinel is case-insensitive");

        state.human_feedback = Some("  Approve ".into());
        assert!(state.feedback_approves());

        state.human_feedback = Some("add a security analyst".into());
        assert!(!state.feedback_approves());
    }

    #[test]
    fn merge_sections_appends() {
        let mut state = ResearchState::new("topic", 2);
        state.merge_sections(vec!["a".into()]);
        state.merge_sections(vec!["b".into(), "c".into()]);
        assert_eq!(state.sections, vec!["a", "b", "c"]);
    }

    #[test]
    fn interview_seeded_with_opener() {
        let state = InterviewState::new(analyst(), "edge caching");
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::Moderator);
        assert!(state.messages[0].content.contains("edge caching"));
        assert_eq!(state.expert_turns(), 0);
    }

    #[test]
    fn expert_turns_counts_only_expert_messages() {
        let mut state = InterviewState::new(analyst(), "t");
        state.messages.push(Message::analyst("q1"));
        state.messages.push(Message::expert("a1"));
        state.messages.push(Message::analyst("q2"));
        state.messages.push(Message::expert("a2"));
        assert_eq!(state.expert_turns(), 2);
    }

    #[test]
    fn transcript_is_role_prefixed() {
        let mut state = InterviewState::new(analyst(), "t");
        state.messages.push(Message::analyst("why?"));
        state.messages.push(Message::expert("because."));
        let transcript = state.transcript();
        assert!(transcript.contains("Analyst: why?"));
        assert!(transcript.contains("Expert: because."));
        assert!(transcript.starts_with("Moderator: "));
    }

    #[test]
    fn research_state_round_trips_through_json() {
        let mut state = ResearchState::new("quantum networking", 3);
        state.analysts = vec![analyst()];
        state.sections = vec!["## Section".into()];
        let json = serde_json::to_string(&state).expect("serialize");
        let back: ResearchState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.topic, "quantum networking");
        assert_eq!(back.analysts.len(), 1);
        assert_eq!(back.sections, state.sections);
    }
}
