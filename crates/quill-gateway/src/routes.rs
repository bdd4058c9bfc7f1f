//! Route handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use quill_core::error::QuillError;
use quill_core::types::{ChatRole, ConversationMessage};
use serde::Deserialize;

use crate::server::AppState;

/// Liveness probe.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "quill-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Raw extracted document text.
    pub text: String,
}

/// Ingest one document into the knowledge base. All-or-nothing: on any
/// failure no chunks of this document are persisted.
pub async fn ingest_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.pipeline.ingest(&req.text).await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "message": report.message() })),
        ),
        Err(QuillError::EmptyInput(msg)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": msg })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "ingestion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Full conversation so far; the server keeps no session state.
    pub messages: Vec<ConversationMessage>,
}

/// Run one conversation turn, streaming turn events as SSE. Each event's
/// data payload is one JSON-serialized `TurnEvent`.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<serde_json::Value>)>
{
    if req.messages.is_empty() || req.messages.last().map(|m| m.role) != Some(ChatRole::User) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "success": false,
                "error": "Request must end with a user message",
            })),
        ));
    }

    let events = state.agent.run_turn(req.messages);
    let stream = events.map(|ev| {
        let data = serde_json::to_string(&ev)
            .unwrap_or_else(|e| format!(r#"{{"type":"error","message":"{e}"}}"#));
        Ok(Event::default().data(data))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use quill_agent::Agent;
    use quill_core::config::QuillConfig;
    use quill_core::error::Result;
    use quill_core::traits::{Embedder, GenerateParams, Provider, VectorStore};
    use quill_core::types::{ChatDelta, Message, ToolDefinition};
    use quill_knowledge::{IngestPipeline, SqliteVectorStore, TextChunker};
    use quill_tools::ToolRegistry;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _params: &GenerateParams,
        ) -> Result<BoxStream<'static, Result<ChatDelta>>> {
            let deltas = vec![
                Ok(ChatDelta::Text("pong".into())),
                Ok(ChatDelta::Finish { reason: Some("stop".into()) }),
            ];
            Ok(futures::stream::iter(deltas).boxed())
        }
    }

    struct FlatEmbedder;

    #[async_trait]
    impl Embedder for FlatEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 768];
            v[0] = 1.0;
            Ok(v)
        }

        async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            768
        }
    }

    fn test_state() -> Arc<AppState> {
        let config = QuillConfig::default();
        let embedder: Arc<dyn Embedder> = Arc::new(FlatEmbedder);
        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::in_memory(768).unwrap());
        let pipeline = Arc::new(IngestPipeline::new(
            TextChunker::default(),
            Arc::clone(&embedder),
            store,
        ));
        let agent =
            Arc::new(Agent::new(&config, Arc::new(EchoProvider), ToolRegistry::new()));
        Arc::new(AppState { agent, pipeline })
    }

    #[tokio::test]
    async fn test_health_check() {
        let json = health_check().await;
        assert_eq!(json.0["status"], "ok");
        assert_eq!(json.0["service"], "quill-gateway");
    }

    #[tokio::test]
    async fn test_ingest_reports_chunk_count() {
        let state = test_state();
        let (status, json) = ingest_document(
            State(state),
            Json(IngestRequest { text: "Rivers carry water downhill.".into() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.0["success"].as_bool().unwrap());
        assert_eq!(
            json.0["message"],
            "Document processed and inserted with 1 searchable chunks!"
        );
    }

    #[tokio::test]
    async fn test_ingest_empty_is_bad_request() {
        let state = test_state();
        let (status, json) =
            ingest_document(State(state), Json(IngestRequest { text: "   \n ".into() })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!json.0["success"].as_bool().unwrap());
        assert_eq!(json.0["error"], "Document empty or no extractable text!");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_transcript() {
        let state = test_state();
        let result = chat(State(state), Json(ChatRequest { messages: vec![] })).await;
        let Err((status, _)) = result else { panic!("expected 400") };
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_streams_events_until_finished() {
        let state = test_state();
        let request = ChatRequest {
            messages: vec![ConversationMessage::user_text("ping")],
        };
        let sse = chat(State(state), Json(request)).await.ok().unwrap();

        let response = axum::response::IntoResponse::into_response(sse);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#""type":"text-delta""#));
        assert!(text.contains("pong"));
        assert!(text.contains(r#""type":"finished""#));
    }
}
