//! # Quill Providers
//!
//! Clients for the external model boundaries: an OpenAI-compatible
//! streaming chat provider and the Gemini embedding API. Both are
//! constructed from config and injected into their consumers; nothing here
//! is a global.

pub mod gemini;
pub mod openai_compatible;

use std::sync::Arc;

use quill_core::config::QuillConfig;
use quill_core::error::Result;
use quill_core::traits::{Embedder, Provider};

/// Build the generation provider from config.
pub fn create_provider(config: &QuillConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(openai_compatible::OpenAiCompatibleProvider::new(
        &config.llm,
    )?))
}

/// Build the embedding provider from config.
pub fn create_embedder(config: &QuillConfig) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(gemini::GeminiEmbedder::new(&config.embedding)?))
}
