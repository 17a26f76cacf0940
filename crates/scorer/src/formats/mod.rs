// ABOUTME: Markdown conversion of fetched pages for the LLM feature path.
// ABOUTME: Converts HTML with htmd and drops markdown blocks below a word-count threshold.

//! Page-to-markdown conversion.
//!
//! The LLM path reads pages as markdown rather than HTML: it is shorter,
//! keeps headings, quotes and links, and drops scripts and styles.

use once_cell::sync::Lazy;
use regex::Regex;

static BR_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?\s*>").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Count words in a text string using whitespace splitting.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Convert HTML to Markdown using htmd.
///
/// Skips script, style and noscript content, preserves links and images,
/// and collapses runs of blank lines to one. On conversion error the HTML is
/// returned unchanged.
pub fn html_to_markdown(html: &str) -> String {
    let preprocessed = BR_TAG_RE.replace_all(html, "\n");

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript", "head"])
        .build();

    let md = converter
        .convert(&preprocessed)
        .unwrap_or_else(|_| preprocessed.to_string());

    BLANK_LINES_RE.replace_all(&md, "\n\n").trim().to_string()
}

/// Keep only markdown blocks (paragraph-separated chunks) with at least
/// `threshold` words.
pub fn filter_blocks(markdown: &str, threshold: usize) -> String {
    markdown
        .split("\n\n")
        .filter(|block| word_count(block) >= threshold.max(1))
        .collect::<Vec<_>>()
        .join("\n\n")
}
