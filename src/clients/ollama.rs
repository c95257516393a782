use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::{ChatMessage, LlmClient, LlmResponse, ToolCall, ToolSchema};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// LLM client backed by an Ollama server's `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint_chat(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let resp = self
            .client
            .post(self.endpoint_chat())
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("ollama chat request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("ollama chat HTTP {status}"));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse ollama response: {e}"))?;

        let tool_calls = parsed
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall {
                name: c.function.name,
                args: c.function.arguments,
            })
            .collect::<Vec<_>>();

        debug!(
            content_len = parsed.message.content.len(),
            tool_calls = tool_calls.len(),
            "ollama chat completed"
        );

        Ok(LlmResponse {
            content: parsed.message.content,
            tool_calls,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: wire_messages(messages),
            stream: false,
            tools: None,
        };
        self.chat(&request).await
    }

    async fn invoke_with_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolSchema,
    ) -> Result<LlmResponse> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: wire_messages(messages),
            stream: false,
            tools: Some(vec![json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            })]),
        };
        self.chat(&request).await
    }
}

fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}
