//! Content sanitizer: turns a raw HTML body into the visible article text.

use scraper::{ElementRef, Html, Selector};

/// Elements that carry presentation or navigation noise rather than content.
const STRIP_TAGS: [&str; 6] = ["script", "style", "header", "footer", "nav", "aside"];

/// Extract visible text from a raw HTML body.
///
/// Text is taken from the `body` element only; a document without a body
/// yields an empty string. Stripped elements drop with all their descendants.
/// Text nodes are whitespace-normalized and joined with single spaces.
pub fn extract_text(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut parts: Vec<String> = Vec::new();
    collect_text(body, &mut parts);
    parts.join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    if STRIP_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !normalized.is_empty() {
                out.push(normalized);
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        }
    }
}
