//! Collaborator trait interfaces.
//!
//! Every external service the pipeline talks to is defined as an async
//! trait so runs can be driven by real providers or by test doubles.
//! Production implementations live in [`providers`](crate::providers).

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{GenerationError, RetrievalError};
use crate::state::Message;

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// A single text-generation request: a filled instruction template plus the
/// ordered message history, optionally constrained to a JSON schema.
#[derive(Debug, Clone)]
pub struct GenRequest {
    /// System instruction with all named placeholders already filled.
    pub system: String,
    /// Ordered conversation history.
    pub messages: Vec<Message>,
    /// When set, the collaborator must return data conforming to this JSON
    /// schema (structured mode); otherwise the reply is free-form text.
    pub response_format: Option<Value>,
}

impl GenRequest {
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            response_format: None,
        }
    }
}

/// Text-generation collaborator. Two modes: free-form (natural-language
/// reply) and structured (schema-constrained via
/// [`complete_structured`]).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Make a completion request and return the raw reply text.
    async fn complete(&self, request: GenRequest) -> Result<String, GenerationError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Issue a structured-output call: attach the schema derived for `T` as the
/// response format, then parse the reply with a validating deserializer.
/// A non-conforming reply yields the typed [`GenerationError::Schema`]
/// failure rather than a panic or an ad hoc parse.
pub async fn complete_structured<T>(
    generator: &dyn TextGenerator,
    mut request: GenRequest,
) -> Result<T, GenerationError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema =
        serde_json::to_value(schemars::schema_for!(T)).map_err(|e| GenerationError::Schema {
            message: format!("failed to render schema: {e}"),
        })?;
    request.response_format = Some(schema);

    let raw = generator.complete(request).await?;
    serde_json::from_str(&raw).map_err(|e| GenerationError::Schema {
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// A document returned by the web-search collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebDocument {
    pub url: String,
    pub content: String,
}

/// Web-search collaborator: query in, up to `limit` documents out.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebDocument>, RetrievalError>;

    fn name(&self) -> &str;
}

/// A document returned by the knowledge-base collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbDocument {
    /// Source identifier (document path, page title, URL).
    pub source: String,
    /// Page number within the source, when the backend has one.
    pub page: Option<u32>,
    pub content: String,
}

/// Knowledge-base lookup collaborator.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn lookup(
        &self,
        query: &str,
        max_docs: usize,
    ) -> Result<Vec<KbDocument>, RetrievalError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SearchQuery;

    struct CannedGenerator {
        reply: String,
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn complete(&self, request: GenRequest) -> Result<String, GenerationError> {
            assert!(
                request.response_format.is_some(),
                "structured call must carry a schema"
            );
            Ok(self.reply.clone())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[tokio::test]
    async fn structured_call_parses_conforming_reply() {
        let generator = CannedGenerator {
            reply: r#"{"search_query": "rust async runtimes"}"#.into(),
        };
        let query: SearchQuery =
            complete_structured(&generator, GenRequest::new("derive a query", vec![]))
                .await
                .expect("conforming reply parses");
        assert_eq!(query.search_query.as_deref(), Some("rust async runtimes"));
    }

    #[tokio::test]
    async fn structured_call_yields_typed_schema_failure() {
        let generator = CannedGenerator {
            reply: "not json at all".into(),
        };
        let err = complete_structured::<SearchQuery>(
            &generator,
            GenRequest::new("derive a query", vec![]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenerationError::Schema { .. }), "got {err}");
    }
}
