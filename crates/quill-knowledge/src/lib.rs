//! # Quill Knowledge Base
//!
//! Vector-embedded retrieval over ingested documents.
//!
//! ## How it works
//! ```text
//! Document text
//!   ↓ TextChunker (recursive split, 1000 chars, 200 overlap)
//! chunks
//!   ↓ Embedder::embed_many (one batch call, 768 dims)
//! (content, vector) rows
//!   ↓ SqliteVectorStore (single transaction)
//! queryable chunks
//!
//! Query → embed → cosine similarity scan → top-K above threshold
//! ```

pub mod chunker;
pub mod ingest;
pub mod search;
pub mod store;

pub use chunker::TextChunker;
pub use ingest::{IngestPipeline, IngestReport};
pub use search::SearchIndex;
pub use store::SqliteVectorStore;
