//! # Quill Core
//!
//! Shared foundation for the Quill workspace: configuration, the error
//! taxonomy, wire/conversation types, and the trait seams every other crate
//! plugs into (`Provider`, `Embedder`, `VectorStore`, `Tool`).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
