//! Web search via the Tavily API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::{WebDocument, WebSearch};
use crate::errors::RetrievalError;

const DEFAULT_ENDPOINT: &str = "https://api.tavily.com/search";

/// [`WebSearch`] backed by Tavily.
pub struct TavilySearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Override the API endpoint, for tests and proxies.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    url: String,
    content: String,
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<WebDocument>, RetrievalError> {
        let body = SearchRequest {
            api_key: &self.api_key,
            query,
            max_results: limit,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::WebSearch {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::WebSearch {
                message: format!("{status}: {text}"),
            });
        }

        let parsed: SearchResponse =
            response.json().await.map_err(|e| RetrievalError::WebSearch {
                message: format!("malformed response: {e}"),
            })?;
        Ok(parsed
            .results
            .into_iter()
            .take(limit)
            .map(|r| WebDocument {
                url: r.url,
                content: r.content,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_tolerates_missing_results() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());

        let parsed: SearchResponse = serde_json::from_str(
            r#"{"results": [{"url": "https://a", "content": "c", "score": 0.9}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].url, "https://a");
    }
}
