//! Events emitted over the course of one conversation turn.

use quill_core::types::{ConversationMessage, MessagePart};
use serde::Serialize;

/// One progress event of a running turn.
///
/// A well-formed turn ends with exactly one terminal event: `Finished` with
/// the full updated transcript, or `Error` when the model stream itself
/// failed. Tool failures are not fatal and never produce `Error`; they show
/// up as `ToolState` snapshots in the `error` state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TurnEvent {
    /// A fragment of assistant text, in model order.
    TextDelta { delta: String },
    /// Snapshot of a tool invocation after a state transition.
    ToolState { part: MessagePart },
    /// Terminal: the turn completed and this is the full transcript,
    /// input messages plus the new assistant message.
    Finished { messages: Vec<ConversationMessage> },
    /// Terminal: the model stream failed; the turn is abandoned.
    Error { message: String },
}
