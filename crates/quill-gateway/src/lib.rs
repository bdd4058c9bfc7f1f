//! # Quill Gateway
//!
//! HTTP surface over the ingestion pipeline and the conversation
//! orchestrator: `POST /api/chat` streams turn events as SSE,
//! `POST /api/ingest` accepts raw document text.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
