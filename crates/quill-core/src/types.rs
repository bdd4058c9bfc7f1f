//! Shared types: provider wire messages, the caller-facing conversation
//! model, tool records, and knowledge-base chunks.

use serde::{Deserialize, Serialize};

/// Fixed embedding dimensionality. Every persisted chunk and every query
/// vector has exactly this many components.
pub const EMBEDDING_DIM: usize = 768;

// ── Provider wire model (OpenAI-compatible) ─────────────

/// Role of a wire-level message sent to the generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A wire-level chat message in the provider's format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), tool_call_id: None, tool_calls: None }
    }

    /// A tool result message, tied back to the call that produced it.
    pub fn tool(content: impl Into<String>, tool_call_id: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }
}

/// A model-issued request to invoke a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON arguments as streamed by the provider.
    pub arguments: String,
}

/// Declared interface of a tool, advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema-shaped parameter description.
    pub parameters: serde_json::Value,
}

/// Outcome of a tool execution.
///
/// Tools convert their own failures into descriptive `output` text with
/// `success == false` instead of returning `Err` — the orchestrator feeds
/// either way back into the model as content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub output: String,
    pub success: bool,
}

/// An incremental piece of a streamed model response.
#[derive(Debug, Clone)]
pub enum ChatDelta {
    /// A fragment of assistant text.
    Text(String),
    /// The model opened tool call slot `index`.
    ToolCallStart { index: usize, id: String, name: String },
    /// A fragment of the JSON arguments for tool call slot `index`.
    ToolCallArguments { index: usize, delta: String },
    /// End of the response, with the provider's finish reason if given.
    Finish { reason: Option<String> },
}

// ── Caller-facing conversation model ────────────────────

/// Role of a caller-facing conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn in the conversation, as exchanged with the caller. The caller
/// supplies the full prior sequence per request; there is no server-side
/// session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: ChatRole,
    pub parts: Vec<MessagePart>,
}

impl ConversationMessage {
    pub fn user_text(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, parts: vec![MessagePart::Text { content: content.into() }] }
    }
}

/// Ordered part of a conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        content: String,
    },
    ToolInvocation {
        tool_call_id: String,
        tool_name: String,
        state: InvocationState,
        input: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
}

/// Lifecycle of a tool invocation. Strictly forward-only; `Result` and
/// `Error` are terminal and carry exactly one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationState {
    InputStreaming,
    Call,
    Result,
    Error,
}

// ── Knowledge base ──────────────────────────────────────

/// A persisted, embedded segment of an ingested document. Immutable after
/// creation.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub id: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A chunk ranked against a query. Ephemeral, produced fresh per query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub id: i64,
    pub content: String,
    /// Cosine similarity in [-1, 1]; 1 = identical direction.
    pub similarity: f32,
}
