//! Similarity search over the knowledge base.

use std::sync::Arc;

use quill_core::error::{QuillError, Result};
use quill_core::traits::{Embedder, VectorStore};
use quill_core::types::ScoredChunk;

/// Default exclusive similarity threshold for ad-hoc searches.
pub const DEFAULT_THRESHOLD: f32 = 0.5;
/// Default result cap for ad-hoc searches.
pub const DEFAULT_LIMIT: usize = 5;

/// Embeds a query and ranks stored chunks by cosine similarity.
pub struct SearchIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl SearchIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Return stored chunks strictly above `threshold`, descending by
    /// similarity (ties by ascending id), at most `limit`. No match is an
    /// empty result, not an error.
    pub async fn search(
        &self,
        query: &str,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        if query.trim().is_empty() {
            return Err(QuillError::EmptyInput("query is empty".into()));
        }
        let embedding = self.embedder.embed(query).await?;
        let hits = self.store.query(&embedding, threshold, limit)?;
        tracing::debug!(query, hits = hits.len(), "knowledge search");
        Ok(hits)
    }

    /// `search` with the default threshold and limit.
    pub async fn search_default(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.search(query, DEFAULT_THRESHOLD, DEFAULT_LIMIT).await
    }
}
