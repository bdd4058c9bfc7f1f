//! Trait seams between the Quill crates.
//!
//! All provider handles are explicitly constructed and injected at
//! construction time; there are no ambient singletons.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{ChatDelta, Message, ScoredChunk, ToolDefinition, ToolResult};

/// Sampling parameters for a generation request.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A streaming chat-completion provider.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Open a token stream for one model invocation. A transport or API
    /// failure here is fatal to the conversation turn.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<BoxStream<'static, Result<ChatDelta>>>;
}

/// Text → fixed-dimensionality vector encoder.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Newlines are normalized to spaces before
    /// encoding.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch in one provider call. Output preserves input order and
    /// length; `embed_many(texts)[i]` equals `embed(texts[i])`.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The enforced vector dimensionality.
    fn dimensions(&self) -> usize;
}

/// Append-only vector store with similarity queries.
pub trait VectorStore: Send + Sync {
    /// Persist `(content, embedding)` rows as a single logical write. Either
    /// all rows become queryable or the call fails and none do.
    fn insert_chunks(&self, rows: &[(String, Vec<f32>)]) -> Result<usize>;

    /// Rank stored chunks by cosine similarity to `query`, keeping those
    /// strictly above `threshold`, descending, at most `limit`. Ties break
    /// by ascending chunk id.
    fn query(&self, query: &[f32], threshold: f32, limit: usize) -> Result<Vec<ScoredChunk>>;
}

/// A capability the model can invoke mid-conversation.
///
/// `execute` must not let internal failures escape as `Err`: failures are
/// converted into a descriptive `ToolResult` with `success == false` so the
/// orchestrator can hand them back to the model as content.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, arguments: &str) -> Result<ToolResult>;
}
