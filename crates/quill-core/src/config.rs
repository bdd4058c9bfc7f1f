//! Quill configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl QuillConfig {
    /// Load config from the default path (~/.quill/config.toml), falling
    /// back to defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() { Self::load_from(&path) } else { Ok(Self::default()) }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::QuillError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::QuillError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::QuillError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quill")
            .join("config.toml")
    }

    /// Get the Quill home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".quill")
    }
}

/// Generation model (chat) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_api_key")]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Deterministic sampling bias; 0 per the chat route contract.
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request timeout in seconds for the model connection.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String { "https://api.groq.com/openai/v1".into() }
fn default_llm_api_key() -> String { std::env::var("GROQ_API_KEY").unwrap_or_default() }
fn default_llm_model() -> String { "openai/gpt-oss-20b".into() }
fn default_max_tokens() -> u32 { 2048 }
fn default_llm_timeout_secs() -> u64 { 120 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            api_key: default_llm_api_key(),
            model: default_llm_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_embedding_api_key")]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Requested output dimensionality; enforced on every returned vector.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embedding_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_embedding_api_key() -> String {
    std::env::var("GOOGLE_GENERATIVE_AI_API_KEY").unwrap_or_default()
}
fn default_embedding_model() -> String { "gemini-embedding-001".into() }
fn default_dimensions() -> usize { crate::types::EMBEDDING_DIM }
fn default_embedding_timeout_secs() -> u64 { 30 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            api_key: default_embedding_api_key(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

/// Knowledge base configuration (chunking + retrieval).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Sqlite database path for the vector store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Exclusive lower similarity bound for the knowledge-base tool.
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f32,
    /// Result cap for the knowledge-base tool.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_db_path() -> String { "~/.quill/knowledge.db".into() }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_search_threshold() -> f32 { 0.5 }
fn default_search_limit() -> usize { 3 }

impl KnowledgeConfig {
    /// Database path with a leading `~/` expanded to the home directory.
    pub fn resolved_db_path(&self) -> PathBuf {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => {
                dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(rest)
            }
            None => PathBuf::from(&self.db_path),
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            search_threshold: default_search_threshold(),
            search_limit: default_search_limit(),
        }
    }
}

/// Web search provider (Tavily) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_api_key")]
    pub api_key: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_endpoint() -> String { "https://api.tavily.com/search".into() }
fn default_search_api_key() -> String { std::env::var("TAVILY_API_KEY").unwrap_or_default() }
fn default_max_results() -> usize { 3 }
fn default_search_timeout_secs() -> u64 { 10 }

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: default_search_api_key(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

/// Conversation orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model invocations per turn. Exhaustion is a soft cutoff.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_max_steps() -> usize { 10 }
fn default_system_prompt() -> String {
    "You are a helpful assistant. \
     Use 'searchKnowledgeBase' for internal queries. \
     Use 'webSearchTool' for weather, news, or general real-time info. \
     If a tool fails, inform the user honestly. \
     You are a specialized assistant that uses tools. When a tool is required, \
     output the tool call immediately. Do not provide any conversational \
     preamble, 'Sure!', or analysis before the tool call. Output ONLY the \
     tool call structure."
        .into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_steps: default_max_steps(), system_prompt: default_system_prompt() }
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 7171 }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}
