//! Web search tool — Tavily-backed live search for time-sensitive queries.

use std::time::Duration;

use async_trait::async_trait;
use quill_core::config::WebSearchConfig;
use quill_core::error::Result;
use quill_core::traits::Tool;
use quill_core::types::{ToolDefinition, ToolResult};
use serde::Deserialize;

/// Sentinel returned when the provider yields nothing.
pub const NO_RESULTS: &str = "No search results found.";

pub struct WebSearchTool {
    endpoint: String,
    api_key: String,
    max_results: usize,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl WebSearchTool {
    pub fn new(config: &WebSearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            max_results: config.max_results,
            client,
        }
    }

    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchHit>, String> {
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": self.max_results,
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !resp.status().is_success() {
            return Err(format!("provider returned {}", resp.status()));
        }

        let parsed: SearchResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(parsed.results)
    }
}

/// Format hits as `Source: <url>\nContent: <content>` blocks separated by
/// blank lines.
fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| format!("Source: {}\nContent: {}", h.url, h.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "webSearchTool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "webSearchTool".into(),
            description: "Search the web for up-to-date information".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The query to search the web with"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: &str) -> Result<ToolResult> {
        let args: serde_json::Value = serde_json::from_str(arguments)
            .unwrap_or_else(|_| serde_json::json!({ "query": arguments }));
        let query = args["query"].as_str().unwrap_or(arguments);

        match self.search(query).await {
            Ok(hits) if hits.is_empty() => Ok(ToolResult {
                tool_call_id: String::new(),
                output: NO_RESULTS.into(),
                success: true,
            }),
            Ok(hits) => Ok(ToolResult {
                tool_call_id: String::new(),
                output: format_hits(&hits),
                success: true,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                Ok(ToolResult {
                    tool_call_id: String::new(),
                    output: format!("Web search failed: {e}"),
                    success: false,
                })
            }
        }
    }
}
