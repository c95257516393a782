//! The research workflow engine: an explicit finite-state loop driving
//! generate-query, web research, summarize, reflect, and route until the
//! iteration cap is hit, then assembling the final verdict.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::clients::{LlmClient, SearchBackend};
use crate::config::WorkflowConfig;
use crate::extract::{
    follow_up_tool_schema, query_tool_schema, FallbackReason, QueryExtractor, QueryOutcome,
};
use crate::models::{FinalVerdict, ResearchState};
use crate::prompts;
use crate::scrape::Scraper;
use crate::search::ResearchPipeline;
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    GenerateQuery,
    WebResearch,
    Summarize,
    Reflect,
    Route,
    Finalize,
}

/// One workflow instance per research invocation; no state is shared across
/// concurrent invocations.
pub struct ResearchWorkflow {
    llm: Arc<dyn LlmClient>,
    extractor: QueryExtractor,
    pipeline: ResearchPipeline,
    config: WorkflowConfig,
}

impl ResearchWorkflow {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchBackend>,
        scraper: Arc<dyn Scraper>,
        config: WorkflowConfig,
    ) -> Self {
        let extractor = QueryExtractor::new(Arc::clone(&llm));
        let pipeline = ResearchPipeline::new(search, scraper, config.max_tokens_per_source);
        Self {
            llm,
            extractor,
            pipeline,
            config,
        }
    }

    /// Run the research loop to completion. Always returns a verdict; a
    /// failed session surfaces as `success = false` with an error message,
    /// never as an error.
    #[instrument(skip(self))]
    pub async fn run(&self, topic: &str) -> FinalVerdict {
        match self.config.workflow_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.drive(topic)).await {
                Ok(verdict) => verdict,
                Err(_) => {
                    warn!(%topic, ?limit, "research workflow hit the wall-clock limit");
                    timeout_verdict(limit.as_secs())
                }
            },
            None => self.drive(topic).await,
        }
    }

    async fn drive(&self, topic: &str) -> FinalVerdict {
        let mut state = ResearchState::new(topic);
        let mut phase = Phase::GenerateQuery;

        loop {
            phase = match phase {
                Phase::GenerateQuery => {
                    self.generate_query(&mut state).await;
                    Phase::WebResearch
                }
                Phase::WebResearch => {
                    self.web_research(&mut state).await;
                    Phase::Summarize
                }
                Phase::Summarize => {
                    self.summarize(&mut state).await;
                    Phase::Reflect
                }
                Phase::Reflect => {
                    self.reflect(&mut state).await;
                    Phase::Route
                }
                // The comparison is deliberately `<=`: the loop performs
                // `max_loops + 1` web research steps, matching the behavior
                // this engine replicates.
                Phase::Route => {
                    if state.loop_count <= self.config.max_loops {
                        Phase::WebResearch
                    } else {
                        Phase::Finalize
                    }
                }
                Phase::Finalize => return finalize(state),
            };
        }
    }

    async fn generate_query(&self, state: &mut ResearchState) {
        let messages =
            prompts::query_generation_messages(&state.topic, self.config.structured_output);
        let outcome = self
            .extractor
            .extract(
                &messages,
                self.config.structured_output,
                &query_tool_schema(),
                "query",
                &state.topic,
            )
            .await;
        if let QueryOutcome::Fallback {
            reason: FallbackReason::LlmError(ref e),
            ..
        } = outcome
        {
            state
                .diagnostics
                .push(format!("Generate query fallback triggered: {e}"));
        }
        state.query = outcome.into_query();
        info!(query = %state.query, "generated search query");
    }

    async fn web_research(&self, state: &mut ResearchState) {
        let step = self
            .pipeline
            .search_and_scrape(&state.query, state.loop_count)
            .await;
        state.results_history.push(step.formatted);
        state.sources_history.push(step.citations);
        // Incremented even on total failure so the loop always terminates.
        state.loop_count += 1;
        state.diagnostics.extend(step.diagnostics);
        info!(loop_count = state.loop_count, "completed web research step");
    }

    async fn summarize(&self, state: &mut ResearchState) {
        let latest = state
            .results_history
            .last()
            .map(String::as_str)
            .unwrap_or_default();
        let messages = prompts::summarize_messages(&state.topic, &state.summary, latest);
        match self.llm.invoke(&messages).await {
            Ok(response) => {
                let summary = if self.config.strip_thinking_tokens {
                    text::strip_thinking_tokens(&response.content)
                } else {
                    response.content
                };
                info!(summary_len = summary.len(), "updated running summary");
                state.summary = summary;
            }
            Err(e) => {
                // Summarization failure must never erase prior progress.
                let message = format!("Summarization error for topic '{}': {e}", state.topic);
                warn!("{message}");
                state.diagnostics.push(message);
                if state.summary.is_empty() {
                    state.summary = "Summary generation failed".to_string();
                }
            }
        }
    }

    async fn reflect(&self, state: &mut ResearchState) {
        let messages = prompts::reflection_messages(
            &state.topic,
            &state.summary,
            self.config.structured_output,
        );
        let outcome = self
            .extractor
            .extract(
                &messages,
                self.config.structured_output,
                &follow_up_tool_schema(),
                "follow_up_query",
                &state.topic,
            )
            .await;
        if let QueryOutcome::Fallback {
            reason: FallbackReason::LlmError(ref e),
            ..
        } = outcome
        {
            state
                .diagnostics
                .push(format!("Reflect query fallback triggered: {e}"));
        }
        state.query = outcome.into_query();
        info!(query = %state.query, "generated follow-up query");
    }
}

/// Assemble the terminal verdict from accumulated state.
fn finalize(state: ResearchState) -> FinalVerdict {
    let source_urls = citation_urls(&state.sources_history);

    let summary_body = if state.summary.is_empty() {
        "Summary generation unavailable.".to_string()
    } else {
        state.summary
    };

    let mut sections: Vec<String> = Vec::new();
    let title = if state.topic.is_empty() {
        "Research Article".to_string()
    } else {
        state.topic.clone()
    };
    sections.push(format!("# {title}"));
    sections.push(String::new());
    sections.push("## Summary".to_string());
    sections.push(String::new());
    sections.push(summary_body.clone());
    if !source_urls.is_empty() {
        sections.push(String::new());
        sections.push("## Sources".to_string());
        sections.push(String::new());
        for (index, url) in source_urls.iter().enumerate() {
            sections.push(format!("{}. {url}", index + 1));
        }
    }
    let article = sections.join("\n").trim().to_string();

    let diagnostics = dedup_preserving_order(state.diagnostics);

    let has_summary = summary_body.len() > 50;
    let has_sources = !source_urls.is_empty();
    let has_errors = !diagnostics.is_empty();
    let success = has_summary && has_sources && !has_errors;

    let mut error_message = if success {
        None
    } else if !has_summary {
        Some("Failed to generate summary".to_string())
    } else if !has_sources {
        Some("No sources found".to_string())
    } else {
        Some("Errors occurred during research".to_string())
    };

    if has_errors {
        let joined = diagnostics.join("; ");
        error_message = Some(match error_message {
            Some(message) => format!("{message}. Details: {joined}"),
            None => joined,
        });
    }

    FinalVerdict {
        article,
        success,
        sources: source_urls,
        error_message,
        diagnostics,
    }
}

/// Pull citable URLs out of the accumulated citation blocks: one candidate
/// per line, deduplicated in order of first appearance. A `* title : url`
/// bullet contributes its URL component; a bare line counts only when it is
/// itself http-prefixed.
fn citation_urls(sources_history: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    for block in sources_history {
        for line in block.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let candidate = line.rsplit_once(" : ").map(|(_, url)| url).unwrap_or(line);
            let candidate = candidate.trim();
            if candidate.starts_with("http") && seen.insert(candidate.to_string()) {
                urls.push(candidate.to_string());
            }
        }
    }
    urls
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

fn timeout_verdict(limit_secs: u64) -> FinalVerdict {
    let message = format!("Research workflow timed out after {limit_secs}s");
    FinalVerdict {
        article: String::new(),
        success: false,
        sources: Vec::new(),
        error_message: Some(message.clone()),
        diagnostics: vec![message],
    }
}
