// ABOUTME: Statistics analyzer scoring the numeric and data density of a document.
// ABOUTME: Combines numeric-token ratio, table/figure tags, chart images, and statistical keywords.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{count_keywords, normalize};
use crate::document::{PageDocument, PageNode};

/// One to three digits, optional comma-grouped triples, optional fraction and percent sign.
static NUMERIC_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}(?:,\d{3})*(?:\.\d+)?%?\b").unwrap());

pub const STAT_KEYWORDS: &[&str] = &[
    "percent", "data", "average", "increase", "decrease", "survey", "figure",
];
pub const TABLE_TAGS: &[&str] = &["table", "figure", "figcaption"];
pub const CHART_HINTS: &[&str] = &["chart", "graph", "data"];

const NUM_RATIO_WEIGHT: f64 = 50.0;
const TABLE_WEIGHT: f64 = 2.0;
const CHART_WEIGHT: f64 = 3.0;
const KEYWORD_WEIGHT: f64 = 0.1;
const DIVISOR: f64 = 10.0;

/// Signal counts behind a statistics score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsBreakdown {
    pub sentence_count: usize,
    pub word_count: usize,
    pub numeric_tokens: usize,
    pub num_ratio: f64,
    pub table_tags: usize,
    pub img_charts: usize,
    pub keyword_count: usize,
    pub raw: f64,
    pub score: f64,
}

/// Split text into sentence-like units on `.`, `!` and `?`.
///
/// Units are kept as-is, empty ones included.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?']).collect()
}

fn is_chart_image<N: PageNode>(img: &N) -> bool {
    let mut hint = String::new();
    hint.push_str(img.attr("alt").unwrap_or_default());
    hint.push_str(img.attr("src").unwrap_or_default());
    let hint = hint.to_lowercase();
    CHART_HINTS.iter().any(|h| hint.contains(h))
}

/// Compute the statistics score along with its signal counts.
pub fn statistics_breakdown<D: PageDocument>(doc: &D) -> StatisticsBreakdown {
    let text = doc.full_text().to_lowercase();

    let sentence_count = split_sentences(&text).len();
    let numeric_tokens = NUMERIC_TOKEN_RE.find_iter(&text).count();
    let word_count = text.split_whitespace().count();
    let num_ratio = numeric_tokens as f64 / word_count.max(1) as f64;

    let table_tags = doc.find_all(TABLE_TAGS).len();
    let img_charts = doc
        .find_all(&["img"])
        .iter()
        .filter(|img| is_chart_image(*img))
        .count();

    let keyword_count = count_keywords(&text, STAT_KEYWORDS);

    let raw = num_ratio * NUM_RATIO_WEIGHT
        + table_tags as f64 * TABLE_WEIGHT
        + img_charts as f64 * CHART_WEIGHT
        + keyword_count as f64 * KEYWORD_WEIGHT;

    StatisticsBreakdown {
        sentence_count,
        word_count,
        numeric_tokens,
        num_ratio,
        table_tags,
        img_charts,
        keyword_count,
        raw,
        score: normalize(raw, DIVISOR),
    }
}

/// Score how much a document leans on numbers, tables, charts and data vocabulary.
pub fn statistics_score<D: PageDocument>(doc: &D) -> f64 {
    statistics_breakdown(doc).score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;
    use pretty_assertions::assert_eq;

    fn doc(html: &str) -> HtmlDocument {
        HtmlDocument::parse(html)
    }

    #[test]
    fn test_single_percentage_sentence_saturates() {
        let b = statistics_breakdown(&doc("<p>Sales rose 42% this year.</p>"));
        assert_eq!(b.numeric_tokens, 1);
        assert_eq!(b.word_count, 5);
        assert_eq!(b.num_ratio, 0.2);
        assert_eq!(b.score, 1.0);
    }

    #[test]
    fn test_empty_document_scores_zero() {
        let b = statistics_breakdown(&doc(""));
        assert_eq!(b.word_count, 0);
        assert_eq!(b.num_ratio, 0.0);
        assert_eq!(b.score, 0.0);
    }

    #[test]
    fn test_numeric_token_pattern() {
        let tokens: Vec<&str> = NUMERIC_TOKEN_RE
            .find_iter("42 1,234 3.5% 1234 12,34")
            .map(|m| m.as_str())
            .collect();
        // "1234" has no word boundary after three digits; "12,34" only yields "12" and "34"
        assert_eq!(tokens, vec!["42", "1,234", "3.5", "12", "34"]);
    }

    #[test]
    fn test_structural_signals() {
        let html = r#"<body>
            <table><tr><td>a</td></tr></table>
            <figure><img src="/img/sales-chart.png"><figcaption>c</figcaption></figure>
            <img alt="A photo of a cat" src="/cat.jpg">
            <img alt="Revenue GRAPH" src="/x.png">
        </body>"#;
        let b = statistics_breakdown(&doc(html));
        assert_eq!(b.table_tags, 3);
        assert_eq!(b.img_charts, 2);
    }

    #[test]
    fn test_keywords_count_substrings() {
        let b = statistics_breakdown(&doc("<p>Database survey data, on average</p>"));
        // data (x2: database, data), survey, average
        assert_eq!(b.keyword_count, 4);
    }

    #[test]
    fn test_raw_combination() {
        // ten words, no numbers; one table (2.0) and two keywords (0.2)
        let html = "<p>one two three four five six seven eight survey data</p><table></table>";
        let b = statistics_breakdown(&doc(html));
        assert_eq!(b.numeric_tokens, 0);
        assert!((b.raw - 2.2).abs() < 1e-9);
        assert!((b.score - 0.22).abs() < 1e-9);
    }

    #[test]
    fn test_sentences_are_not_filtered() {
        assert_eq!(split_sentences("a. b! c?"), vec!["a", " b", " c", ""]);
        assert_eq!(split_sentences(""), vec![""]);
    }

    #[test]
    fn test_more_tables_never_lower_the_score() {
        let base = "<p>Some plain words here</p>";
        let mut previous = statistics_score(&doc(base));
        for n in 1..8 {
            let html = format!("{}{}", base, "<table></table>".repeat(n));
            let score = statistics_score(&doc(&html));
            assert!(score >= previous);
            previous = score;
        }
        assert_eq!(previous, 1.0);
    }
}
