//! Document ingestion pipeline: chunk → embed (one batch) → persist.
//!
//! All-or-nothing per document: the insert runs in a single store
//! transaction, and validation happens up front so a rejected document
//! leaves no rows behind. Rollback on the error paths is guaranteed by the
//! transaction guard's drop.

use std::sync::Arc;

use quill_core::error::{QuillError, Result};
use quill_core::traits::{Embedder, VectorStore};

use crate::chunker::TextChunker;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestReport {
    pub chunk_count: usize,
}

impl IngestReport {
    /// Human-readable success message for the caller.
    pub fn message(&self) -> String {
        format!(
            "Document processed and inserted with {} searchable chunks!",
            self.chunk_count
        )
    }
}

pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl IngestPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { chunker, embedder, store }
    }

    /// Ingest raw extracted document text.
    ///
    /// Re-ingesting the same text produces an independent set of chunks;
    /// there is no dedup.
    pub async fn ingest(&self, raw_text: &str) -> Result<IngestReport> {
        if raw_text.trim().is_empty() {
            return Err(QuillError::EmptyInput(
                "Document empty or no extractable text!".into(),
            ));
        }

        let chunks = self.chunker.chunk(raw_text);
        if chunks.is_empty() {
            return Err(QuillError::EmptyInput(
                "Document empty or no extractable text!".into(),
            ));
        }

        let embeddings = self.embedder.embed_many(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(QuillError::Embedding(format!(
                "batch returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let rows: Vec<(String, Vec<f32>)> =
            chunks.into_iter().zip(embeddings).collect();
        let chunk_count = self.store.insert_chunks(&rows)?;

        tracing::info!(chunk_count, "document ingested");
        Ok(IngestReport { chunk_count })
    }
}
