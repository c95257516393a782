use std::time::Duration;

/// How the LLM is asked for structured output when generating queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StructuredOutputMode {
    /// Bind a tool schema and read the arguments of the returned tool call.
    ToolCall,
    /// Ask for JSON in the response text and parse it out.
    #[default]
    JsonText,
}

/// Immutable per-invocation workflow configuration.
///
/// Passed into [`crate::workflow::ResearchWorkflow`] at construction; there is
/// no process-wide mutable settings state.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Research depth. The routing condition is `loop_count <= max_loops`, so
    /// the engine performs `max_loops + 1` web research steps.
    pub max_loops: u32,
    /// Token budget applied to each source's content when formatting.
    pub max_tokens_per_source: usize,
    pub structured_output: StructuredOutputMode,
    /// Strip `<think>` blocks from model responses before storing summaries.
    pub strip_thinking_tokens: bool,
    /// Wall-clock bound on a whole research invocation.
    pub workflow_timeout: Option<Duration>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_loops: 3,
            max_tokens_per_source: 1000,
            structured_output: StructuredOutputMode::default(),
            strip_thinking_tokens: true,
            workflow_timeout: None,
        }
    }
}

/// Timeouts for the page fetcher.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(90),
        }
    }
}
