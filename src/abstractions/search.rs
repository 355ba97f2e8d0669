use crate::config::SearchConfig;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

pub const NO_RESULTS: &str = "No results found.";

/// Web search returning a single best snippet
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

/// Serper.dev Google search
pub struct SerperSearch {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SerperSearch {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::config("search.api_key is not set (SERPER_API_KEY)"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::config("failed to create HTTP client").with_source(e))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl WebSearch for SerperSearch {
    async fn search(&self, query: &str) -> Result<String> {
        info!(query, "web search");
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query }))
            .send()
            .await
            .map_err(|e| {
                PipelineError::external("search", format!("request failed: {e}")).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::external(
                "search",
                format!("search API returned {status}"),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            PipelineError::malformed("search", format!("unreadable response: {e}")).with_source(e)
        })?;
        let snippet = first_snippet(&body);
        debug!(snippet = %snippet, "search result");
        Ok(snippet)
    }
}

/// Snippet of the first organic result
pub fn first_snippet(body: &Value) -> String {
    match body.get("organic").and_then(Value::as_array) {
        Some(results) if !results.is_empty() => results[0]
            .get("snippet")
            .and_then(Value::as_str)
            .unwrap_or("No snippet found.")
            .to_string(),
        _ => NO_RESULTS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_snippet_takes_first_organic_result() {
        let body = json!({
            "organic": [
                {"title": "a", "snippet": "Fed holds rates steady"},
                {"title": "b", "snippet": "ignored"}
            ]
        });
        assert_eq!(first_snippet(&body), "Fed holds rates steady");
    }

    #[test]
    fn test_first_snippet_without_results() {
        assert_eq!(first_snippet(&json!({})), NO_RESULTS);
        assert_eq!(first_snippet(&json!({"organic": []})), NO_RESULTS);
        assert_eq!(
            first_snippet(&json!({"organic": [{"title": "x"}]})),
            "No snippet found."
        );
    }

    #[test]
    fn test_serper_requires_key() {
        assert!(SerperSearch::new(&SearchConfig::default()).is_err());
    }
}
