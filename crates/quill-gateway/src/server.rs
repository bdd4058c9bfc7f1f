//! Axum server wiring: state construction, router, startup.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use quill_agent::Agent;
use quill_core::config::QuillConfig;
use quill_knowledge::{IngestPipeline, SearchIndex, SqliteVectorStore, TextChunker};
use quill_providers::{create_embedder, create_provider};
use quill_tools::default_registry;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub pipeline: Arc<IngestPipeline>,
}

impl AppState {
    /// Wire up the full stack from config: embedder, vector store, search
    /// index, tool registry, provider, agent, and ingestion pipeline.
    pub fn from_config(config: &QuillConfig) -> quill_core::error::Result<Self> {
        let embedder = create_embedder(config)?;
        let db_path = config.knowledge.resolved_db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store: Arc<dyn quill_core::traits::VectorStore> =
            Arc::new(SqliteVectorStore::open(&db_path, config.embedding.dimensions)?);

        let index = Arc::new(SearchIndex::new(Arc::clone(&embedder), Arc::clone(&store)));
        let registry = default_registry(index, config);
        let provider = create_provider(config)?;
        let agent = Arc::new(Agent::new(config, provider, registry));

        let chunker = TextChunker::new(config.knowledge.chunk_size, config.knowledge.chunk_overlap);
        let pipeline = Arc::new(IngestPipeline::new(chunker, embedder, store));

        Ok(Self { agent, pipeline })
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/ingest", post(routes::ingest_document))
        .route("/api/chat", post(routes::chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Start the HTTP server and block until it exits.
pub async fn start(config: &QuillConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
