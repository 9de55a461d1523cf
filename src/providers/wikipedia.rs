//! Knowledge-base lookup backed by the Wikipedia search API.
//!
//! One request does both steps: `generator=search` finds the pages,
//! `prop=extracts` pulls their plain-text intros.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::collaborators::{KbDocument, KnowledgeBase};
use crate::errors::RetrievalError;

const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// [`KnowledgeBase`] backed by Wikipedia article extracts.
pub struct WikipediaKnowledgeBase {
    client: reqwest::Client,
    endpoint: String,
}

impl WikipediaKnowledgeBase {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the API endpoint, for tests and mirrors.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Default for WikipediaKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
}

#[derive(Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    extract: Option<String>,
}

#[async_trait]
impl KnowledgeBase for WikipediaKnowledgeBase {
    async fn lookup(
        &self,
        query: &str,
        max_docs: usize,
    ) -> Result<Vec<KbDocument>, RetrievalError> {
        let limit = max_docs.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("generator", "search"),
            ("gsrsearch", query),
            ("gsrlimit", limit.as_str()),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("exintro", "1"),
        ];
        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| RetrievalError::KnowledgeBase {
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::KnowledgeBase {
                message: format!("{status}"),
            });
        }

        let parsed: QueryResponse =
            response
                .json()
                .await
                .map_err(|e| RetrievalError::KnowledgeBase {
                    message: format!("malformed response: {e}"),
                })?;

        // No hits comes back without a `query` object at all.
        let mut pages: Vec<Page> = parsed
            .query
            .map(|q| q.pages.into_values().collect())
            .unwrap_or_default();
        pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));

        Ok(pages
            .into_iter()
            .take(max_docs)
            .filter_map(|page| {
                page.extract.map(|content| KbDocument {
                    source: page.title,
                    page: None,
                    content,
                })
            })
            .collect())
    }

    fn name(&self) -> &str {
        "wikipedia"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_parse_and_order_by_search_rank() {
        let raw = r#"{
            "query": {
                "pages": {
                    "2": {"pageid": 2, "title": "Second", "index": 2, "extract": "b"},
                    "1": {"pageid": 1, "title": "First", "index": 1, "extract": "a"}
                }
            }
        }"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        let mut pages: Vec<Page> = parsed.query.unwrap().pages.into_values().collect();
        pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));
        assert_eq!(pages[0].title, "First");
        assert_eq!(pages[1].title, "Second");
    }

    #[test]
    fn empty_result_set_parses() {
        let parsed: QueryResponse = serde_json::from_str("{\"batchcomplete\": \"\"}").unwrap();
        assert!(parsed.query.is_none());
    }
}
