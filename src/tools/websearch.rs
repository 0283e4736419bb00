//! Web search adapter.
//!
//! Posts a query to the configured search endpoint and formats the top
//! ranked snippets into a text block for prompt augmentation.

use serde::Deserialize;
use serde_json::json;

use crate::provider::Config;

use super::errors::ToolError;
use super::{expect_success, service_http};

const SERVICE: &str = "websearch";

/// How many ranked results make it into the context block.
const MAX_RESULTS: usize = 5;

pub struct WebSearchClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl WebSearchClient {
    /// Build a client when both the endpoint and key are configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let url = config.search_url.clone()?;
        let api_key = config.search_api_key.clone()?;
        Some(Self {
            http: service_http(),
            url,
            api_key,
        })
    }

    /// Search and format the top results as a markdown context block.
    pub async fn search(&self, query: &str) -> Result<String, ToolError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ToolError::from_reqwest(&self.url, e))?;
        let response = expect_success(SERVICE, response).await?;
        let parsed: SearchResponse =
            response.json().await.map_err(|e| ToolError::InvalidResponse {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        if parsed.results.is_empty() {
            return Ok("No relevant search results found.".to_string());
        }

        let blocks: Vec<String> = parsed
            .results
            .into_iter()
            .take(MAX_RESULTS)
            .map(format_result)
            .collect();
        Ok(blocks.join("\n\n---\n\n"))
    }
}

fn format_result(result: SearchResult) -> String {
    let title = result.title.unwrap_or_else(|| "No title available".to_string());
    let url = result.url.unwrap_or_else(|| "No URL available".to_string());
    let content = result.content.unwrap_or_else(|| "No content available".to_string());
    let source = result.source.unwrap_or_else(|| "Unknown source".to_string());
    format!("### **{title}**\n📌 Source: {source}\n🔗 [Read more]({url})\n\n{content}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Config;

    fn config(with_search: bool) -> Config {
        Config::from_lookup(|key| match key {
            "TAVILY_API_URL" if with_search => Some("https://search.example/v1".to_string()),
            "TAVILY_API_KEY" if with_search => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_unconfigured_yields_none() {
        assert!(WebSearchClient::from_config(&config(false)).is_none());
    }

    #[test]
    fn test_configured_yields_client() {
        assert!(WebSearchClient::from_config(&config(true)).is_some());
    }

    #[test]
    fn test_format_result_fills_gaps() {
        let block = format_result(SearchResult {
            title: Some("Rust 1.80 released".to_string()),
            url: None,
            content: Some("Highlights…".to_string()),
            source: None,
        });
        assert!(block.contains("Rust 1.80 released"));
        assert!(block.contains("Unknown source"));
        assert!(block.contains("No URL available"));
    }
}
