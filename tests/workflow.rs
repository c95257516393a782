//! End-to-end workflow tests with scripted collaborator implementations
//! injected through the capability traits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use deep_researcher::clients::{ChatMessage, LlmClient, LlmResponse, SearchBackend, ToolSchema};
use deep_researcher::scrape::Scraper;
use deep_researcher::{
    ResearchWorkflow, ScrapeError, SearchResult, StructuredOutputMode, WorkflowConfig,
};

/// Route workflow tracing through the test harness. Safe to call from every
/// test; only the first call installs the subscriber.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("deep_researcher=debug")
        .with_test_writer()
        .try_init();
}

const LONG_SUMMARY: &str = "Quantum computing research has made significant strides in error \
     correction and qubit coherence, with several groups demonstrating logical qubits that \
     outperform their physical constituents.";

/// LLM stub that answers each prompt kind by inspecting the system message:
/// query generation and reflection get JSON, summarization gets prose.
struct HelpfulLlm {
    summarize_calls: AtomicUsize,
    /// Summarize calls after this many fail (usize::MAX = never fail).
    summarize_failures_after: usize,
}

impl HelpfulLlm {
    fn new() -> Self {
        Self {
            summarize_calls: AtomicUsize::new(0),
            summarize_failures_after: usize::MAX,
        }
    }

    fn failing_summaries_after(n: usize) -> Self {
        Self {
            summarize_calls: AtomicUsize::new(0),
            summarize_failures_after: n,
        }
    }
}

#[async_trait]
impl LlmClient for HelpfulLlm {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let system = &messages[0].content;
        let content = if system.contains("targeted web search query") {
            "{\"query\": \"quantum computing breakthroughs 2026\", \"rationale\": \"recent\"}"
                .to_string()
        } else if system.contains("knowledge gaps") {
            "{\"knowledge_gap\": \"benchmarks\", \"follow_up_query\": \"quantum error \
             correction benchmarks\"}"
                .to_string()
        } else {
            let call = self.summarize_calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.summarize_failures_after {
                return Err(anyhow!("model overloaded"));
            }
            LONG_SUMMARY.to_string()
        };
        Ok(LlmResponse {
            content,
            tool_calls: vec![],
        })
    }

    async fn invoke_with_tool(
        &self,
        messages: &[ChatMessage],
        _tool: &ToolSchema,
    ) -> Result<LlmResponse> {
        self.invoke(messages).await
    }
}

/// LLM stub whose every invocation fails.
struct DeadLlm;

#[async_trait]
impl LlmClient for DeadLlm {
    async fn invoke(&self, _messages: &[ChatMessage]) -> Result<LlmResponse> {
        Err(anyhow!("connection refused"))
    }

    async fn invoke_with_tool(
        &self,
        _messages: &[ChatMessage],
        _tool: &ToolSchema,
    ) -> Result<LlmResponse> {
        Err(anyhow!("connection refused"))
    }
}

/// Search backend that counts calls and returns one valid result per call.
struct CountingSearch {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SearchBackend for CountingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![SearchResult::new(
            format!("Result {n}"),
            format!("https://research.example/paper-{n}"),
            "a snippet about quantum computing progress",
        )])
    }
}

/// Search backend that fails on every call.
struct BrokenSearch;

#[async_trait]
impl SearchBackend for BrokenSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
        Err(anyhow!("dns failure"))
    }
}

/// Scraper that always produces page text.
struct HappyScraper;

#[async_trait]
impl Scraper for HappyScraper {
    async fn scrape(&self, _url: &str) -> Result<String, ScrapeError> {
        Ok("full page content describing quantum computing experiments in detail".to_string())
    }
}

/// Scraper that always fails; content should fall back to snippets.
struct RefusingScraper;

#[async_trait]
impl Scraper for RefusingScraper {
    async fn scrape(&self, url: &str) -> Result<String, ScrapeError> {
        Err(ScrapeError::Fetch(format!("HTTP 403 for {url}")))
    }
}

fn config(max_loops: u32) -> WorkflowConfig {
    WorkflowConfig {
        max_loops,
        structured_output: StructuredOutputMode::JsonText,
        ..WorkflowConfig::default()
    }
}

#[tokio::test]
async fn successful_session_emits_cited_article() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let workflow = ResearchWorkflow::new(
        Arc::new(HelpfulLlm::new()),
        Arc::new(CountingSearch {
            calls: Arc::clone(&calls),
        }),
        Arc::new(HappyScraper),
        config(1),
    );

    let verdict = workflow.run("quantum computing").await;

    assert!(verdict.success, "verdict: {verdict:?}");
    assert!(verdict.error_message.is_none());
    assert!(verdict.diagnostics.is_empty());
    // max_loops = 1 means two research steps, one search call each.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(verdict.article.contains("## Summary"));
    assert!(verdict.article.contains("http"));
    assert_eq!(verdict.sources.len(), 2);
    assert!(verdict.sources.iter().all(|s| s.starts_with("http")));
}

#[tokio::test]
async fn loop_runs_max_loops_plus_one_research_steps() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let workflow = ResearchWorkflow::new(
        Arc::new(HelpfulLlm::new()),
        Arc::new(CountingSearch {
            calls: Arc::clone(&calls),
        }),
        Arc::new(HappyScraper),
        config(3),
    );

    workflow.run("loop termination").await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn broken_search_degrades_to_offline_sources_and_fails_verdict() {
    init_tracing();
    let workflow = ResearchWorkflow::new(
        Arc::new(HelpfulLlm::new()),
        Arc::new(BrokenSearch),
        Arc::new(RefusingScraper),
        config(0),
    );

    let verdict = workflow.run("quantum computing").await;

    // The synthetic source keeps the pipeline alive, but the accumulated
    // diagnostics force a failed verdict.
    assert!(!verdict.success);
    assert!(verdict
        .sources
        .iter()
        .any(|s| s.starts_with("https://example.com/")));
    assert!(!verdict.diagnostics.is_empty());
    let message = verdict.error_message.expect("failure needs an explanation");
    assert!(message.contains("Errors occurred during research"));
    assert!(verdict.article.contains("## Summary"));
}

#[tokio::test]
async fn scrape_failures_are_not_session_failures() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let workflow = ResearchWorkflow::new(
        Arc::new(HelpfulLlm::new()),
        Arc::new(CountingSearch {
            calls: Arc::clone(&calls),
        }),
        Arc::new(RefusingScraper),
        config(0),
    );

    let verdict = workflow.run("quantum computing").await;

    assert!(verdict.success, "verdict: {verdict:?}");
    assert!(verdict.diagnostics.is_empty());
}

#[tokio::test]
async fn total_llm_outage_still_returns_a_verdict() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let workflow = ResearchWorkflow::new(
        Arc::new(DeadLlm),
        Arc::new(CountingSearch {
            calls: Arc::clone(&calls),
        }),
        Arc::new(HappyScraper),
        config(0),
    );

    let verdict = workflow.run("quantum computing").await;

    assert!(!verdict.success);
    // Fallback queries keep the search loop going even without a model.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let message = verdict.error_message.expect("failure needs an explanation");
    assert!(message.starts_with("Failed to generate summary"));
    assert!(verdict
        .diagnostics
        .iter()
        .any(|d| d.starts_with("Generate query fallback triggered")));
    assert!(verdict
        .diagnostics
        .iter()
        .any(|d| d.starts_with("Summarization error")));
}

#[tokio::test]
async fn summarization_failure_keeps_prior_summary() {
    init_tracing();
    let calls = Arc::new(AtomicUsize::new(0));
    let workflow = ResearchWorkflow::new(
        Arc::new(HelpfulLlm::failing_summaries_after(1)),
        Arc::new(CountingSearch {
            calls: Arc::clone(&calls),
        }),
        Arc::new(HappyScraper),
        config(1),
    );

    let verdict = workflow.run("quantum computing").await;

    // The second summarize call failed, so the first summary survives.
    assert!(verdict.article.contains(LONG_SUMMARY));
    assert!(!verdict.success);
    assert!(verdict
        .diagnostics
        .iter()
        .any(|d| d.starts_with("Summarization error")));
}

#[tokio::test]
async fn wall_clock_timeout_produces_failure_verdict() {
    init_tracing();

    struct StallingSearch;

    #[async_trait]
    impl SearchBackend for StallingSearch {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    let workflow = ResearchWorkflow::new(
        Arc::new(HelpfulLlm::new()),
        Arc::new(StallingSearch),
        Arc::new(HappyScraper),
        WorkflowConfig {
            max_loops: 0,
            workflow_timeout: Some(std::time::Duration::from_millis(50)),
            ..WorkflowConfig::default()
        },
    );

    let verdict = workflow.run("anything").await;

    assert!(!verdict.success);
    assert!(verdict
        .error_message
        .expect("timeout needs an explanation")
        .contains("timed out"));
}
