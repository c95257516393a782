use serde::{Deserialize, Serialize};

/// One web search hit, transient within a single research step.
///
/// `content` starts equal to `snippet` and is overwritten with scraped page
/// text when scraping succeeds. It is never emptied: a failed scrape leaves
/// the snippet in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub content: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        let snippet = snippet.into();
        Self {
            title: title.into(),
            url: url.into(),
            content: snippet.clone(),
            snippet,
        }
    }
}

/// Mutable state owned by exactly one workflow invocation.
///
/// Histories and diagnostics are append-only; after each web research step
/// `results_history.len() == sources_history.len() == loop_count`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchState {
    pub topic: String,
    pub query: String,
    pub loop_count: u32,
    pub summary: String,
    pub results_history: Vec<String>,
    pub sources_history: Vec<String>,
    pub diagnostics: Vec<String>,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }
}

/// Terminal output of a research invocation. The workflow always completes
/// with a verdict; failure is `success = false` plus `error_message`, never a
/// bare error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalVerdict {
    pub article: String,
    pub success: bool,
    pub sources: Vec<String>,
    pub error_message: Option<String>,
    pub diagnostics: Vec<String>,
}
