//! Knowledge-base search tool.

use std::sync::Arc;

use async_trait::async_trait;
use quill_core::error::Result;
use quill_core::traits::Tool;
use quill_core::types::{ScoredChunk, ToolDefinition, ToolResult};
use quill_knowledge::SearchIndex;

/// Sentinel returned when nothing in the knowledge base clears the
/// similarity threshold.
pub const NO_RESULTS: &str = "No relevant info found in knowledge base.";

pub struct KnowledgeBaseTool {
    index: Arc<SearchIndex>,
    threshold: f32,
    limit: usize,
}

impl KnowledgeBaseTool {
    pub fn new(index: Arc<SearchIndex>, threshold: f32, limit: usize) -> Self {
        Self { index, threshold, limit }
    }
}

/// Format hits as `Result <i> <content>` blocks separated by blank lines.
fn format_hits(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("Result {} {}", i + 1, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        "searchKnowledgeBase"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "searchKnowledgeBase".into(),
            description: "Search the knowledge base for relevant information".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The query to search knowledge base with"
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

        match self.index.search(query, self.threshold, self.limit).await {
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
                tracing::warn!(error = %e, "knowledge base search failed");
                Ok(ToolResult {
                    tool_call_id: String::new(),
                    output: format!("Error searching knowledge base: {e}"),
                    success: false,
                })
            }
        }
    }
}
