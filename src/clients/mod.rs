//! Capability interfaces for the external collaborators: the language-model
//! client and the web search backend. The workflow depends only on these
//! traits; concrete or test implementations are injected at construction.

mod ollama;
mod searxng;

pub use ollama::OllamaClient;
pub use searxng::SearxngClient;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A structured tool/function invocation returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

/// JSON-schema description of a tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Plain text completion for a list of role-tagged messages.
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<LlmResponse>;

    /// Completion with a single tool bound; the model may answer with a tool
    /// call carrying typed arguments instead of (or in addition to) text.
    async fn invoke_with_tool(
        &self,
        messages: &[ChatMessage],
        tool: &ToolSchema,
    ) -> Result<LlmResponse>;
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a web search, returning at most `max_results` records. Errors and
    /// empty result sets are both handled upstream by the fallback cascade.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}
