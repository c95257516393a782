//! Text aggregation: token-budget truncation, stable source deduplication,
//! and citation rendering.

use std::collections::HashSet;
use std::sync::OnceLock;

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::models::SearchResult;

/// Shared reference tokenizer. cl100k_base is embedded in the binary and is
/// safe for concurrent read-only use across invocations.
fn encoder() -> &'static CoreBPE {
    static BPE: OnceLock<CoreBPE> = OnceLock::new();
    BPE.get_or_init(|| cl100k_base().expect("cl100k_base vocabulary is embedded"))
}

/// Truncate `text` to at most `max_tokens` tokens of the reference tokenizer.
/// Text already within budget is returned unchanged, which makes the
/// operation idempotent for a fixed budget.
pub fn truncate_by_token_budget(text: &str, max_tokens: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let bpe = encoder();
    let tokens = bpe.encode_with_special_tokens(text);
    if tokens.len() <= max_tokens {
        return text.to_string();
    }
    // A cut can land mid-codepoint (tokens are byte sequences, not chars);
    // drop trailing tokens until the prefix decodes as valid UTF-8.
    for end in (1..=max_tokens).rev() {
        if let Ok(decoded) = bpe.decode(tokens[..end].to_vec()) {
            return decoded;
        }
    }
    String::new()
}

/// Deduplicate results by URL (first occurrence wins, order preserved) and
/// render each surviving source as a `Source:`/`Content:` block. Post-scrape
/// `content` is preferred over the search snippet; sources whose content is
/// empty after truncation are skipped.
pub fn deduplicate_and_format(results: &[SearchResult], max_tokens_per_source: usize) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut blocks: Vec<String> = Vec::new();

    for result in results {
        if !seen.insert(result.url.as_str()) {
            continue;
        }
        let content = if result.content.is_empty() {
            &result.snippet
        } else {
            &result.content
        };
        if content.is_empty() {
            continue;
        }
        let truncated = truncate_by_token_budget(content, max_tokens_per_source);
        if truncated.is_empty() {
            continue;
        }
        blocks.push(format!("Source: {}\nContent: {}\n---", result.url, truncated));
    }

    blocks.join("\n")
}

/// Render a bulleted citation list, one `* <title> : <url>` line per result.
/// Entries missing either field are skipped.
pub fn format_citations(results: &[SearchResult]) -> String {
    results
        .iter()
        .filter(|r| !r.title.is_empty() && !r.url.is_empty())
        .map(|r| format!("* {} : {}", r.title, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `<think>`/`<thinking>` blocks that reasoning models emit before
/// their answer.
pub fn strip_thinking_tokens(text: &str) -> String {
    let mut text = text.to_string();
    for (open, close) in [("<think>", "</think>"), ("<thinking>", "</thinking>")] {
        while let (Some(start), Some(end)) = (text.find(open), text.find(close)) {
            if end < start {
                break;
            }
            text.replace_range(start..end + close.len(), "");
        }
    }
    text.trim().to_string()
}
