//! # Quill Tools
//!
//! The closed tool registry the conversation orchestrator exposes to the
//! model. Two fixed capabilities: knowledge-base search (wrapping the
//! vector index) and live web search (Tavily).
//!
//! Tools fail open: execution errors are caught inside the tool and
//! returned as descriptive text in the result envelope, never raised — the
//! model decides how to react to a failed lookup.

pub mod kb_search;
pub mod registry;
pub mod web_search;

pub use kb_search::KnowledgeBaseTool;
pub use registry::{ToolRegistry, validate_args};
pub use web_search::WebSearchTool;

use std::sync::Arc;

use quill_core::config::QuillConfig;
use quill_knowledge::SearchIndex;

/// Build the standard registry: `searchKnowledgeBase` + `webSearchTool`.
pub fn default_registry(index: Arc<SearchIndex>, config: &QuillConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(KnowledgeBaseTool::new(
        index,
        config.knowledge.search_threshold,
        config.knowledge.search_limit,
    )));
    registry.register(Box::new(WebSearchTool::new(&config.web_search)));
    registry
}
