//! Conversion from the caller-facing conversation model to the provider
//! wire format.

use quill_core::types::{
    ChatRole, ConversationMessage, FunctionCall, Message, MessagePart, Role, ToolCall,
};

/// Flatten a conversation transcript into provider wire messages.
///
/// User messages become one `user` message with their text parts joined.
/// Assistant text parts become `assistant` messages. Each recorded tool
/// invocation is replayed as the pair the provider originally saw: an
/// `assistant` message carrying the call, then a `tool` message carrying
/// its output.
pub fn to_wire(messages: &[ConversationMessage]) -> Vec<Message> {
    let mut out = Vec::new();
    for msg in messages {
        match msg.role {
            ChatRole::User => {
                let text: Vec<&str> = msg
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        MessagePart::Text { content } => Some(content.as_str()),
                        MessagePart::ToolInvocation { .. } => None,
                    })
                    .collect();
                out.push(Message::user(text.join("\n")));
            }
            ChatRole::Assistant => {
                for part in &msg.parts {
                    match part {
                        MessagePart::Text { content } => {
                            out.push(Message::assistant(content.clone()));
                        }
                        MessagePart::ToolInvocation {
                            tool_call_id,
                            tool_name,
                            input,
                            output,
                            ..
                        } => {
                            let call = ToolCall {
                                id: tool_call_id.clone(),
                                kind: "function".into(),
                                function: FunctionCall {
                                    name: tool_name.clone(),
                                    arguments: input.to_string(),
                                },
                            };
                            out.push(Message {
                                role: Role::Assistant,
                                content: String::new(),
                                tool_call_id: None,
                                tool_calls: Some(vec![call]),
                            });
                            out.push(Message::tool(
                                output.clone().unwrap_or_default(),
                                tool_call_id,
                            ));
                        }
                    }
                }
            }
        }
    }
    out
}
