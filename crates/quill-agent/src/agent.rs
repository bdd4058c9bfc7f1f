//! The step-bounded tool-calling loop.

use std::sync::Arc;

use futures::StreamExt;
use quill_core::config::QuillConfig;
use quill_core::traits::{GenerateParams, Provider};
use quill_core::types::{
    ChatDelta, ChatRole, ConversationMessage, FunctionCall, InvocationState, Message,
    MessagePart, Role, ToolCall,
};
use quill_tools::{ToolRegistry, validate_args};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::events::TurnEvent;
use crate::wire;

/// Tool outputs longer than this are truncated before being fed back to the
/// model, to keep the context window in check.
const MAX_TOOL_OUTPUT_CHARS: usize = 4000;

/// Drives conversation turns against a provider and a tool registry.
pub struct Agent {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    params: GenerateParams,
    system_prompt: String,
    max_steps: usize,
}

/// A tool call being assembled from streamed fragments, addressed by the
/// provider's slot index.
#[derive(Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

impl Agent {
    pub fn new(config: &QuillConfig, provider: Arc<dyn Provider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools: Arc::new(tools),
            params: GenerateParams {
                model: config.llm.model.clone(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_tokens,
            },
            system_prompt: config.agent.system_prompt.clone(),
            max_steps: config.agent.max_steps,
        }
    }

    /// Run one conversation turn. Returns immediately with an event stream;
    /// the turn is driven by a background task and stops early if the
    /// receiver is dropped.
    pub fn run_turn(
        self: &Arc<Self>,
        messages: Vec<ConversationMessage>,
    ) -> ReceiverStream<TurnEvent> {
        let (tx, rx) = mpsc::channel(64);
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            agent.drive(messages, tx).await;
        });
        ReceiverStream::new(rx)
    }

    async fn drive(&self, mut transcript: Vec<ConversationMessage>, tx: mpsc::Sender<TurnEvent>) {
        let mut history = vec![Message::system(&self.system_prompt)];
        history.extend(wire::to_wire(&transcript));
        let tool_defs = self.tools.definitions();
        let mut assistant = ConversationMessage { role: ChatRole::Assistant, parts: Vec::new() };

        for step in 0..self.max_steps {
            tracing::debug!(step, history_len = history.len(), "model invocation");
            let mut stream =
                match self.provider.chat_stream(&history, &tool_defs, &self.params).await {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!(error = %e, "model stream failed to open");
                        let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
                        return;
                    }
                };

            let mut text = String::new();
            let mut calls: Vec<PendingCall> = Vec::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(ChatDelta::Text(delta)) => {
                        text.push_str(&delta);
                        if tx.send(TurnEvent::TextDelta { delta }).await.is_err() {
                            return;
                        }
                    }
                    Ok(ChatDelta::ToolCallStart { index, id, name }) => {
                        while calls.len() <= index {
                            calls.push(PendingCall::default());
                        }
                        calls[index].id = id.clone();
                        calls[index].name = name.clone();
                        let snapshot = MessagePart::ToolInvocation {
                            tool_call_id: id,
                            tool_name: name,
                            state: InvocationState::InputStreaming,
                            input: serde_json::Value::Null,
                            output: None,
                        };
                        if tx.send(TurnEvent::ToolState { part: snapshot }).await.is_err() {
                            return;
                        }
                    }
                    Ok(ChatDelta::ToolCallArguments { index, delta }) => {
                        while calls.len() <= index {
                            calls.push(PendingCall::default());
                        }
                        calls[index].arguments.push_str(&delta);
                    }
                    Ok(ChatDelta::Finish { .. }) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "model stream broke mid-response");
                        let _ = tx.send(TurnEvent::Error { message: e.to_string() }).await;
                        return;
                    }
                }
            }

            if !text.is_empty() {
                assistant.parts.push(MessagePart::Text { content: text.clone() });
            }

            if calls.is_empty() {
                // Plain-text answer; the turn is done.
                transcript.push(assistant);
                tracing::info!(steps = step + 1, "turn finished");
                let _ = tx.send(TurnEvent::Finished { messages: transcript }).await;
                return;
            }

            // Some providers omit call ids; synthesize stable ones so the
            // result messages still pair up.
            for (i, call) in calls.iter_mut().enumerate() {
                if call.id.is_empty() {
                    call.id = format!("call_{step}_{i}");
                }
            }

            let tool_calls: Vec<ToolCall> = calls
                .iter()
                .map(|c| ToolCall {
                    id: c.id.clone(),
                    kind: "function".into(),
                    function: FunctionCall {
                        name: c.name.clone(),
                        arguments: c.arguments.clone(),
                    },
                })
                .collect();
            history.push(Message {
                role: Role::Assistant,
                content: text,
                tool_call_id: None,
                tool_calls: Some(tool_calls),
            });

            for call in &calls {
                let Some((part, output)) = self.invoke(call, &tx).await else {
                    return;
                };
                assistant.parts.push(part);
                history.push(Message::tool(output, &call.id));
            }
        }

        // Step budget exhausted: hand back whatever was produced.
        tracing::warn!(max_steps = self.max_steps, "turn hit step budget");
        transcript.push(assistant);
        let _ = tx.send(TurnEvent::Finished { messages: transcript }).await;
    }

    /// Resolve and execute one tool call, emitting lifecycle snapshots on
    /// the way. Returns the final invocation snapshot and the text to feed
    /// back to the model, or `None` when the event receiver is gone.
    ///
    /// Never fails the turn: bad input, unknown tools, and execution errors
    /// all come back as an `error`-state snapshot whose output describes
    /// the problem.
    async fn invoke(
        &self,
        call: &PendingCall,
        tx: &mpsc::Sender<TurnEvent>,
    ) -> Option<(MessagePart, String)> {
        let snapshot = |state: InvocationState,
                        input: serde_json::Value,
                        output: Option<String>| MessagePart::ToolInvocation {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            state,
            input,
            output,
        };
        let finish = |input: serde_json::Value, state: InvocationState, output: String| {
            (snapshot(state, input, Some(output.clone())), output)
        };

        let outcome = 'resolve: {
            let Some(tool) = self.tools.get(&call.name) else {
                let output = format!("Tool not found: {}", call.name);
                break 'resolve finish(serde_json::Value::Null, InvocationState::Error, output);
            };

            let input: serde_json::Value = match serde_json::from_str(&call.arguments) {
                Ok(v) => v,
                Err(e) => {
                    let output = format!("Invalid input for tool '{}': {e}", call.name);
                    break 'resolve finish(
                        serde_json::Value::Null,
                        InvocationState::Error,
                        output,
                    );
                }
            };
            if let Err(violation) = validate_args(&tool.definition(), &input) {
                let output = format!("Invalid input for tool '{}': {violation}", call.name);
                break 'resolve finish(input, InvocationState::Error, output);
            }

            let part = snapshot(InvocationState::Call, input.clone(), None);
            if tx.send(TurnEvent::ToolState { part }).await.is_err() {
                return None;
            }

            tracing::debug!(tool = %call.name, id = %call.id, "executing tool");
            match tool.execute(&call.arguments).await {
                Ok(result) => {
                    let state = if result.success {
                        InvocationState::Result
                    } else {
                        InvocationState::Error
                    };
                    finish(input, state, truncate_output(result.output))
                }
                Err(e) => {
                    let output = format!("Tool execution failed: {e}");
                    finish(input, InvocationState::Error, output)
                }
            }
        };

        if tx.send(TurnEvent::ToolState { part: outcome.0.clone() }).await.is_err() {
            return None;
        }
        Some(outcome)
    }
}

fn truncate_output(output: String) -> String {
    match output.char_indices().nth(MAX_TOOL_OUTPUT_CHARS) {
        Some((byte_idx, _)) => output[..byte_idx].to_string(),
        None => output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use quill_core::error::{QuillError, Result};
    use quill_core::traits::Tool;
    use quill_core::types::{ToolDefinition, ToolResult};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Deltas(Vec<ChatDelta>),
        Fatal(String),
    }

    /// Plays back scripted responses; repeats `fallback` once the scripts
    /// run out.
    struct MockProvider {
        scripts: Mutex<Vec<Script>>,
        fallback: Option<Vec<ChatDelta>>,
        invocations: AtomicUsize,
    }

    impl MockProvider {
        fn scripted(scripts: Vec<Script>) -> Self {
            Self { scripts: Mutex::new(scripts), fallback: None, invocations: AtomicUsize::new(0) }
        }

        fn repeating(deltas: Vec<ChatDelta>) -> Self {
            Self {
                scripts: Mutex::new(Vec::new()),
                fallback: Some(deltas),
                invocations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn chat_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _params: &GenerateParams,
        ) -> Result<BoxStream<'static, Result<ChatDelta>>> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().unwrap();
            let script = if scripts.is_empty() {
                Script::Deltas(self.fallback.clone().expect("mock ran out of scripts"))
            } else {
                scripts.remove(0)
            };
            match script {
                Script::Fatal(msg) => Err(QuillError::Provider(msg)),
                Script::Deltas(deltas) => {
                    Ok(futures::stream::iter(deltas.into_iter().map(Ok)).boxed())
                }
            }
        }
    }

    struct MockTool {
        output: String,
        success: bool,
        executions: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            "mockSearch"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "mockSearch".into(),
                description: "test search".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "required": ["query"],
                    "properties": { "query": { "type": "string" } }
                }),
            }
        }

        async fn execute(&self, _arguments: &str) -> Result<ToolResult> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResult {
                tool_call_id: String::new(),
                output: self.output.clone(),
                success: self.success,
            })
        }
    }

    fn tool_call_deltas(id: &str) -> Vec<ChatDelta> {
        vec![
            ChatDelta::ToolCallStart { index: 0, id: id.into(), name: "mockSearch".into() },
            ChatDelta::ToolCallArguments { index: 0, delta: r#"{"query":"#.into() },
            ChatDelta::ToolCallArguments { index: 0, delta: r#""rivers"}"#.into() },
            ChatDelta::Finish { reason: Some("tool_calls".into()) },
        ]
    }

    fn agent_with(
        provider: MockProvider,
        tool_output: &str,
        tool_success: bool,
        max_steps: usize,
    ) -> (Arc<Agent>, Arc<AtomicUsize>) {
        let executions = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(MockTool {
            output: tool_output.into(),
            success: tool_success,
            executions: Arc::clone(&executions),
        }));
        let mut config = QuillConfig::default();
        config.agent.max_steps = max_steps;
        (Arc::new(Agent::new(&config, Arc::new(provider), registry)), executions)
    }

    async fn collect(agent: &Arc<Agent>, messages: Vec<ConversationMessage>) -> Vec<TurnEvent> {
        agent.run_turn(messages).collect().await
    }

    fn invocation_states(events: &[TurnEvent]) -> Vec<InvocationState> {
        events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::ToolState {
                    part: MessagePart::ToolInvocation { state, .. },
                } => Some(*state),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let provider = MockProvider::scripted(vec![Script::Deltas(vec![
            ChatDelta::Text("Hello".into()),
            ChatDelta::Text(" there".into()),
            ChatDelta::Finish { reason: Some("stop".into()) },
        ])]);
        let (agent, executions) = agent_with(provider, "", true, 10);

        let events = collect(&agent, vec![ConversationMessage::user_text("hi")]).await;
        assert_eq!(executions.load(Ordering::SeqCst), 0);

        let deltas: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::TextDelta { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, ["Hello", " there"]);

        let TurnEvent::Finished { messages } = events.last().unwrap() else {
            panic!("expected Finished");
        };
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            &messages[1].parts[..],
            [MessagePart::Text { content }] if content == "Hello there"
        ));
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let provider = MockProvider::scripted(vec![
            Script::Deltas(tool_call_deltas("call_a")),
            Script::Deltas(vec![
                ChatDelta::Text("Rivers flow downhill.".into()),
                ChatDelta::Finish { reason: Some("stop".into()) },
            ]),
        ]);
        let (agent, executions) = agent_with(provider, "Result 1 rivers flow", true, 10);

        let events = collect(&agent, vec![ConversationMessage::user_text("rivers?")]).await;
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(
            invocation_states(&events),
            [InvocationState::InputStreaming, InvocationState::Call, InvocationState::Result]
        );

        let TurnEvent::Finished { messages } = events.last().unwrap() else {
            panic!("expected Finished");
        };
        let parts = &messages[1].parts;
        assert_eq!(parts.len(), 2);
        assert!(matches!(
            &parts[0],
            MessagePart::ToolInvocation {
                state: InvocationState::Result,
                output: Some(out),
                ..
            } if out == "Result 1 rivers flow"
        ));
        assert!(matches!(
            &parts[1],
            MessagePart::Text { content } if content == "Rivers flow downhill."
        ));
    }

    #[tokio::test]
    async fn test_failed_tool_does_not_abort_turn() {
        let provider = MockProvider::scripted(vec![
            Script::Deltas(tool_call_deltas("call_a")),
            Script::Deltas(vec![
                ChatDelta::Text("The search is unavailable right now.".into()),
                ChatDelta::Finish { reason: Some("stop".into()) },
            ]),
        ]);
        let (agent, _) = agent_with(provider, "Web search failed: timed out", false, 10);

        let events = collect(&agent, vec![ConversationMessage::user_text("weather?")]).await;
        assert!(invocation_states(&events).contains(&InvocationState::Error));
        let TurnEvent::Finished { messages } = events.last().unwrap() else {
            panic!("turn should survive a failed tool");
        };
        assert!(matches!(
            &messages[1].parts[0],
            MessagePart::ToolInvocation {
                state: InvocationState::Error,
                output: Some(out),
                ..
            } if out.starts_with("Web search failed:")
        ));
    }

    #[tokio::test]
    async fn test_step_budget_is_a_soft_cutoff() {
        // The model asks for a tool on every step and never answers.
        let provider = MockProvider::repeating(tool_call_deltas(""));
        let (agent, executions) = agent_with(provider, "Result 1 loop", true, 3);

        let events = collect(&agent, vec![ConversationMessage::user_text("loop")]).await;
        assert_eq!(executions.load(Ordering::SeqCst), 3);

        let TurnEvent::Finished { messages } = events.last().unwrap() else {
            panic!("budget exhaustion must still finish the turn");
        };
        let invocations = messages[1]
            .parts
            .iter()
            .filter(|p| matches!(p, MessagePart::ToolInvocation { .. }))
            .count();
        assert_eq!(invocations, 3);
    }

    #[tokio::test]
    async fn test_synthesized_call_ids_are_unique() {
        let provider = MockProvider::repeating(tool_call_deltas(""));
        let (agent, _) = agent_with(provider, "ok", true, 2);

        let events = collect(&agent, vec![ConversationMessage::user_text("go")]).await;
        let TurnEvent::Finished { messages } = events.last().unwrap() else {
            panic!("expected Finished");
        };
        let ids: Vec<&str> = messages[1]
            .parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::ToolInvocation { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(ids[0].starts_with("call_"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_fatal() {
        let provider = MockProvider::scripted(vec![Script::Fatal("api key rejected".into())]);
        let (agent, _) = agent_with(provider, "", true, 10);

        let events = collect(&agent, vec![ConversationMessage::user_text("hi")]).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TurnEvent::Error { message } if message.contains("api key rejected")
        ));
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_execution() {
        let provider = MockProvider::scripted(vec![
            Script::Deltas(vec![
                ChatDelta::ToolCallStart {
                    index: 0,
                    id: "call_a".into(),
                    name: "mockSearch".into(),
                },
                ChatDelta::ToolCallArguments { index: 0, delta: r#"{"query": 42}"#.into() },
                ChatDelta::Finish { reason: Some("tool_calls".into()) },
            ]),
            Script::Deltas(vec![
                ChatDelta::Text("Let me rephrase that.".into()),
                ChatDelta::Finish { reason: Some("stop".into()) },
            ]),
        ]);
        let (agent, executions) = agent_with(provider, "unused", true, 10);

        let events = collect(&agent, vec![ConversationMessage::user_text("go")]).await;
        assert_eq!(executions.load(Ordering::SeqCst), 0);

        let TurnEvent::Finished { messages } = events.last().unwrap() else {
            panic!("expected Finished");
        };
        assert!(matches!(
            &messages[1].parts[0],
            MessagePart::ToolInvocation {
                state: InvocationState::Error,
                output: Some(out),
                ..
            } if out.contains("Invalid input")
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let provider = MockProvider::scripted(vec![
            Script::Deltas(vec![
                ChatDelta::ToolCallStart {
                    index: 0,
                    id: "call_a".into(),
                    name: "noSuchTool".into(),
                },
                ChatDelta::ToolCallArguments { index: 0, delta: "{}".into() },
                ChatDelta::Finish { reason: Some("tool_calls".into()) },
            ]),
            Script::Deltas(vec![
                ChatDelta::Text("I cannot do that.".into()),
                ChatDelta::Finish { reason: Some("stop".into()) },
            ]),
        ]);
        let (agent, _) = agent_with(provider, "unused", true, 10);

        let events = collect(&agent, vec![ConversationMessage::user_text("go")]).await;
        let TurnEvent::Finished { messages } = events.last().unwrap() else {
            panic!("expected Finished");
        };
        assert!(matches!(
            &messages[1].parts[0],
            MessagePart::ToolInvocation {
                output: Some(out),
                ..
            } if out == "Tool not found: noSuchTool"
        ));
    }

    #[test]
    fn test_truncate_output_respects_char_boundaries() {
        let long = "д".repeat(MAX_TOOL_OUTPUT_CHARS + 10);
        let cut = truncate_output(long);
        assert_eq!(cut.chars().count(), MAX_TOOL_OUTPUT_CHARS);

        let short = truncate_output("small".into());
        assert_eq!(short, "small");
    }
}
