//! Structured query extraction. Wraps an LLM call and pulls a query string
//! out of either a tool-call argument or a JSON field embedded in free text.
//! All failure modes collapse to a deterministic fallback query; nothing
//! escapes this boundary as an error.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::clients::{ChatMessage, LlmClient, ToolSchema};
use crate::config::StructuredOutputMode;

/// Outcome of a structured extraction attempt. A `Fallback` is an ordinary
/// value, not an error; the caller decides whether the reason is worth a
/// diagnostic.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Generated(String),
    Fallback { query: String, reason: FallbackReason },
}

#[derive(Debug, Clone)]
pub enum FallbackReason {
    /// The model answered without invoking the bound tool.
    NoToolCall,
    /// The tool call or JSON object lacked the named field.
    MissingField,
    /// The response text did not contain parsable JSON.
    InvalidJson,
    /// The LLM invocation itself failed.
    LlmError(String),
}

impl QueryOutcome {
    pub fn into_query(self) -> String {
        match self {
            QueryOutcome::Generated(q) | QueryOutcome::Fallback { query: q, .. } => q,
        }
    }
}

pub fn query_tool_schema() -> ToolSchema {
    ToolSchema {
        name: "Query".to_string(),
        description: "Generate a query for web search".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The actual search query string"
                },
                "rationale": {
                    "type": "string",
                    "description": "Brief explanation of why this query is relevant"
                }
            },
            "required": ["query"]
        }),
    }
}

pub fn follow_up_tool_schema() -> ToolSchema {
    ToolSchema {
        name: "FollowUpQuery".to_string(),
        description: "Generate a follow-up query to address a knowledge gap".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "follow_up_query": {
                    "type": "string",
                    "description": "Write a specific question to address this gap"
                },
                "knowledge_gap": {
                    "type": "string",
                    "description": "Describe what information is missing or needs clarification"
                }
            },
            "required": ["follow_up_query"]
        }),
    }
}

pub struct QueryExtractor {
    llm: Arc<dyn LlmClient>,
}

impl QueryExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Extract the query named by `field` from the model's response, falling
    /// back to `Tell me more about <topic>` on any failure.
    pub async fn extract(
        &self,
        messages: &[ChatMessage],
        mode: StructuredOutputMode,
        tool: &ToolSchema,
        field: &str,
        topic: &str,
    ) -> QueryOutcome {
        let fallback_query = format!("Tell me more about {topic}");
        let fallback = |reason: FallbackReason| QueryOutcome::Fallback {
            query: fallback_query.clone(),
            reason,
        };

        match mode {
            StructuredOutputMode::ToolCall => {
                let response = match self.llm.invoke_with_tool(messages, tool).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(%topic, error = %e, "llm tool invocation failed");
                        return fallback(FallbackReason::LlmError(e.to_string()));
                    }
                };
                let Some(call) = response.tool_calls.first() else {
                    debug!(%topic, "model answered without a tool call");
                    return fallback(FallbackReason::NoToolCall);
                };
                match non_empty_str(&call.args, field) {
                    Some(query) => QueryOutcome::Generated(query),
                    None => fallback(FallbackReason::MissingField),
                }
            }
            StructuredOutputMode::JsonText => {
                let response = match self.llm.invoke(messages).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(%topic, error = %e, "llm invocation failed");
                        return fallback(FallbackReason::LlmError(e.to_string()));
                    }
                };
                let Some(parsed) = parse_json_block(&response.content) else {
                    debug!(%topic, "response text contained no parsable json");
                    return fallback(FallbackReason::InvalidJson);
                };
                match non_empty_str(&parsed, field) {
                    Some(query) => QueryOutcome::Generated(query),
                    None => fallback(FallbackReason::MissingField),
                }
            }
        }
    }
}

fn non_empty_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse the response as JSON, or failing that, the first `{...}` block
/// embedded in surrounding prose.
fn parse_json_block(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{LlmResponse, ToolCall};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    enum Script {
        Text(String),
        Tool(ToolCall),
        Error,
    }

    struct ScriptedLlm(Script);

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<LlmResponse> {
            match &self.0 {
                Script::Text(content) => Ok(LlmResponse {
                    content: content.clone(),
                    tool_calls: vec![],
                }),
                Script::Tool(_) => Ok(LlmResponse::default()),
                Script::Error => Err(anyhow!("model unavailable")),
            }
        }

        async fn invoke_with_tool(
            &self,
            _messages: &[ChatMessage],
            _tool: &ToolSchema,
        ) -> Result<LlmResponse> {
            match &self.0 {
                Script::Tool(call) => Ok(LlmResponse {
                    content: String::new(),
                    tool_calls: vec![call.clone()],
                }),
                Script::Text(content) => Ok(LlmResponse {
                    content: content.clone(),
                    tool_calls: vec![],
                }),
                Script::Error => Err(anyhow!("model unavailable")),
            }
        }
    }

    fn extractor(script: Script) -> QueryExtractor {
        QueryExtractor::new(Arc::new(ScriptedLlm(script)))
    }

    #[tokio::test]
    async fn tool_call_argument_is_extracted() {
        let ex = extractor(Script::Tool(ToolCall {
            name: "Query".to_string(),
            args: json!({"query": "rust async runtimes", "rationale": "r"}),
        }));
        let outcome = ex
            .extract(&[], StructuredOutputMode::ToolCall, &query_tool_schema(), "query", "rust")
            .await;
        assert!(matches!(outcome, QueryOutcome::Generated(ref q) if q == "rust async runtimes"));
    }

    #[tokio::test]
    async fn missing_tool_call_falls_back() {
        let ex = extractor(Script::Text("no tool call here".to_string()));
        let outcome = ex
            .extract(&[], StructuredOutputMode::ToolCall, &query_tool_schema(), "query", "rust")
            .await;
        match outcome {
            QueryOutcome::Fallback { query, reason } => {
                assert_eq!(query, "Tell me more about rust");
                assert!(matches!(reason, FallbackReason::NoToolCall));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn json_field_is_extracted_from_prose() {
        let ex = extractor(Script::Text(
            "Here is my query:\n{\"query\": \"tokio internals\", \"rationale\": \"x\"}\nDone."
                .to_string(),
        ));
        let outcome = ex
            .extract(&[], StructuredOutputMode::JsonText, &query_tool_schema(), "query", "rust")
            .await;
        assert!(matches!(outcome, QueryOutcome::Generated(ref q) if q == "tokio internals"));
    }

    #[tokio::test]
    async fn unparsable_text_falls_back() {
        let ex = extractor(Script::Text("not json at all".to_string()));
        let outcome = ex
            .extract(&[], StructuredOutputMode::JsonText, &query_tool_schema(), "query", "rust")
            .await;
        assert!(matches!(
            outcome,
            QueryOutcome::Fallback { reason: FallbackReason::InvalidJson, .. }
        ));
    }

    #[tokio::test]
    async fn empty_field_counts_as_missing() {
        let ex = extractor(Script::Text("{\"query\": \"  \"}".to_string()));
        let outcome = ex
            .extract(&[], StructuredOutputMode::JsonText, &query_tool_schema(), "query", "rust")
            .await;
        assert!(matches!(
            outcome,
            QueryOutcome::Fallback { reason: FallbackReason::MissingField, .. }
        ));
    }

    #[tokio::test]
    async fn llm_error_is_reported_in_the_reason() {
        let ex = extractor(Script::Error);
        let outcome = ex
            .extract(&[], StructuredOutputMode::JsonText, &query_tool_schema(), "query", "rust")
            .await;
        assert!(matches!(
            outcome,
            QueryOutcome::Fallback { reason: FallbackReason::LlmError(_), .. }
        ));
    }
}
