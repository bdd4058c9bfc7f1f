//! Streaming OpenAI-compatible chat provider.
//!
//! Works against any OpenAI-compatible chat-completions endpoint (Groq by
//! default). Responses are consumed as server-sent events and surfaced as
//! [`ChatDelta`]s: text fragments, tool-call openings, and tool-argument
//! fragments, terminated by a finish reason.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Value, json};

use quill_core::config::LlmConfig;
use quill_core::error::{QuillError, Result};
use quill_core::traits::{GenerateParams, Provider};
use quill_core::types::{ChatDelta, Message, ToolDefinition};

pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QuillError::Http(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            name: "openai-compatible".into(),
            api_key: config.api_key.clone(),
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_body(
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Value {
        let mut body = json!({
            "model": params.model,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "stream": true,
            "messages": serde_json::to_value(messages).unwrap_or_default(),
        });
        if !tools.is_empty() {
            let defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(defs);
        }
        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerateParams,
    ) -> Result<BoxStream<'static, Result<ChatDelta>>> {
        if self.api_key.is_empty() {
            return Err(QuillError::Provider(format!(
                "{}: API key not configured",
                self.name
            )));
        }

        let body = Self::build_body(messages, tools, params);
        let url = format!("{}/chat/completions", self.base_url);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                QuillError::Provider(format!(
                    "{} connection failed ({url}): {e}",
                    self.name
                ))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(QuillError::Provider(format!(
                "{} API error {status}: {text}",
                self.name
            )));
        }

        let name = self.name.clone();
        let byte_chunks = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed();
        let state = SseState {
            inner: byte_chunks,
            buf: String::new(),
            pending: VecDeque::new(),
            done: false,
            name,
        };

        Ok(futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(item) = st.pending.pop_front() {
                    return Some((item, st));
                }
                if st.done {
                    return None;
                }
                match st.inner.next().await {
                    Some(Ok(bytes)) => {
                        st.buf.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(pos) = st.buf.find('\n') {
                            let line =
                                st.buf[..pos].trim_end_matches('\r').to_string();
                            st.buf.drain(..=pos);
                            let (deltas, done) = parse_stream_line(&line);
                            st.pending.extend(deltas.into_iter().map(Ok));
                            if done {
                                st.done = true;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        st.done = true;
                        st.pending.push_back(Err(QuillError::Provider(format!(
                            "{} stream failed: {e}",
                            st.name
                        ))));
                    }
                    None => {
                        st.done = true;
                    }
                }
            }
        })
        .boxed())
    }
}

struct SseState {
    inner: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buf: String,
    pending: VecDeque<Result<ChatDelta>>,
    done: bool,
    name: String,
}

/// Parse one SSE line into chat deltas. Returns `(deltas, stream_done)`.
fn parse_stream_line(line: &str) -> (Vec<ChatDelta>, bool) {
    let Some(payload) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))
    else {
        return (vec![], false);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return (vec![], true);
    }
    let Ok(json) = serde_json::from_str::<Value>(payload) else {
        tracing::debug!(line = payload, "unparseable stream frame, skipping");
        return (vec![], false);
    };

    let mut deltas = Vec::new();
    let Some(choice) = json["choices"].get(0) else {
        return (deltas, false);
    };

    let delta = &choice["delta"];
    if let Some(text) = delta["content"].as_str()
        && !text.is_empty()
    {
        deltas.push(ChatDelta::Text(text.to_string()));
    }
    if let Some(tool_calls) = delta["tool_calls"].as_array() {
        for tc in tool_calls {
            let index = tc["index"].as_u64().unwrap_or(0) as usize;
            if let Some(name) = tc["function"]["name"].as_str() {
                deltas.push(ChatDelta::ToolCallStart {
                    index,
                    id: tc["id"].as_str().unwrap_or("").to_string(),
                    name: name.to_string(),
                });
            }
            if let Some(args) = tc["function"]["arguments"].as_str()
                && !args.is_empty()
            {
                deltas.push(ChatDelta::ToolCallArguments {
                    index,
                    delta: args.to_string(),
                });
            }
        }
    }
    if let Some(reason) = choice["finish_reason"].as_str() {
        deltas.push(ChatDelta::Finish { reason: Some(reason.to_string()) });
    }
    (deltas, false)
}
