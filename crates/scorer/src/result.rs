// ABOUTME: Result records produced by site analysis: AnalysisResult, ScoreBreakdown, and SiteReport.
// ABOUTME: AnalysisResult serializes to exactly the three score keys.

use serde::{Deserialize, Serialize};

use crate::analyzers::{CitationBreakdown, QuotationBreakdown, StatisticsBreakdown};
use crate::llm::FeatureRecord;

/// The three heuristic scores for one document, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalysisResult {
    pub statistics_score: f64,
    pub quotation_score: f64,
    pub cite_sources_score: f64,
}

impl AnalysisResult {
    /// Returns true if no analyzer found any signal.
    pub fn is_empty(&self) -> bool {
        self.statistics_score == 0.0 && self.quotation_score == 0.0 && self.cite_sources_score == 0.0
    }
}

/// Signal counts behind each of the three scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub statistics: StatisticsBreakdown,
    pub quotation: QuotationBreakdown,
    pub citation: CitationBreakdown,
}

impl ScoreBreakdown {
    /// The scores alone.
    pub fn result(&self) -> AnalysisResult {
        AnalysisResult {
            statistics_score: self.statistics.score,
            quotation_score: self.quotation.score,
            cite_sources_score: self.citation.score,
        }
    }
}

/// Everything known about one analyzed page.
///
/// `llm_features` and `llm_error` are only filled when the LLM path ran; an
/// LLM failure never removes `scores`.
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub url: String,
    pub origin: String,
    pub scores: AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_features: Option<FeatureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_error: Option<String>,
}
