//! Text generation over any OpenAI-compatible chat-completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::collaborators::{GenRequest, TextGenerator};
use crate::errors::GenerationError;
use crate::state::{Message, Role};

/// [`TextGenerator`] backed by a chat-completions API.
pub struct OpenAiCompatibleGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Map conversation roles onto the chat API's vocabulary. The moderator
/// speaks for the user; the analyst and expert turns were both produced by
/// the model, so they go back as assistant turns.
fn chat_role(role: Role) -> &'static str {
    match role {
        Role::Moderator => "user",
        Role::Analyst | Role::Expert => "assistant",
    }
}

fn build_request(model: &str, request: &GenRequest) -> ChatRequest {
    let mut messages = vec![ChatMessage {
        role: "system",
        content: request.system.clone(),
    }];
    messages.extend(request.messages.iter().map(|m: &Message| ChatMessage {
        role: chat_role(m.role),
        content: m.content.clone(),
    }));

    let response_format = request.response_format.as_ref().map(|schema| {
        json!({
            "type": "json_schema",
            "json_schema": {
                "name": "response",
                "schema": schema,
                "strict": true,
            }
        })
    });

    ChatRequest {
        model: model.to_string(),
        messages,
        response_format,
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleGenerator {
    async fn complete(&self, request: GenRequest) -> Result<String, GenerationError> {
        let body = build_request(&self.model, &request);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Provider {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Provider {
                message: format!("{status}: {text}"),
            });
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| GenerationError::Provider {
                message: format!("malformed response: {e}"),
            })?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Provider {
                message: "response contained no choices".into(),
            })?;
        Ok(choice.message.content)
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}
