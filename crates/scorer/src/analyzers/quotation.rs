// ABOUTME: Quotation analyzer scoring the presence of quoted speech in a document.
// ABOUTME: Combines q/blockquote tags, quoted phrases in the text, and attribution verbs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::{count_keywords, normalize, round3};
use crate::document::PageDocument;

/// 5 to 200 characters between straight or curly double quotes, never spanning a quote.
static QUOTED_PHRASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["“”][^"“”]{5,200}["“”]"#).unwrap());

pub const ATTRIBUTION_VERBS: &[&str] = &["said", "stated", "reported", "claimed", "noted"];
pub const QUOTE_TAGS: &[&str] = &["q", "blockquote"];

const TAG_WEIGHT: f64 = 2.0;
const PHRASE_WEIGHT: f64 = 0.5;
const VERB_WEIGHT: f64 = 0.1;
const DIVISOR: f64 = 8.0;

/// Signal counts behind a quotation score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotationBreakdown {
    pub q_tags: usize,
    pub quoted_phrases: usize,
    pub verb_count: usize,
    pub raw: f64,
    pub score: f64,
}

/// Compute the quotation score along with its signal counts.
pub fn quotation_breakdown<D: PageDocument>(doc: &D) -> QuotationBreakdown {
    let text = doc.full_text();

    let q_tags = doc.find_all(QUOTE_TAGS).len();
    let quoted_phrases = QUOTED_PHRASE_RE.find_iter(text).count();
    let verb_count = count_keywords(&text.to_lowercase(), ATTRIBUTION_VERBS);

    let raw = q_tags as f64 * TAG_WEIGHT
        + quoted_phrases as f64 * PHRASE_WEIGHT
        + verb_count as f64 * VERB_WEIGHT;

    QuotationBreakdown {
        q_tags,
        quoted_phrases,
        verb_count,
        raw,
        score: round3(normalize(raw, DIVISOR)),
    }
}

/// Score how much a document quotes people, rounded to three decimals.
pub fn quotation_score<D: PageDocument>(doc: &D) -> f64 {
    quotation_breakdown(doc).score
}
