// ABOUTME: The heuristic scorer: three independent analyzers that turn a document into [0,1] scores.
// ABOUTME: Shared keyword counting, normalization, and rounding helpers live here.

//! Heuristic analyzers.
//!
//! Each analyzer is a pure function of a [`PageDocument`](crate::document::PageDocument)
//! (and, for citations, the document's origin). Each computes a weighted raw
//! sum of signal counts and normalizes it with `min(1.0, raw / divisor)`, so a
//! score never leaves `[0, 1]` however large the page is.

pub mod citation;
pub mod quotation;
pub mod statistics;

pub use citation::{cite_sources_breakdown, cite_sources_score, CitationBreakdown};
pub use quotation::{quotation_breakdown, quotation_score, QuotationBreakdown};
pub use statistics::{statistics_breakdown, statistics_score, StatisticsBreakdown};

/// Sum of the substring counts of every keyword in `text`.
///
/// Counting is plain substring matching, non-overlapping per keyword, so
/// "data" is also found inside "database" and "references" counts for both
/// "reference" and "references".
pub(crate) fn count_keywords(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().map(|kw| text.matches(kw).count()).sum()
}

/// Scale a raw score into `[0, 1]`.
pub(crate) fn normalize(raw: f64, divisor: f64) -> f64 {
    (raw / divisor).clamp(0.0, 1.0)
}

/// Round to three decimal places.
///
/// Goes through fixed-point formatting, which rounds the exact binary value
/// rather than `value * 1000`, so 0.0125 (stored slightly above) becomes 0.013
/// while an exact tie such as 0.0625 goes to the even neighbour, 0.062.
pub(crate) fn round3(value: f64) -> f64 {
    format!("{:.3}", value).parse().unwrap_or(value)
}
