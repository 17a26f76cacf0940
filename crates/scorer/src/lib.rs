// ABOUTME: Main library entry point for the Credence journalistic-quality scorer.
// ABOUTME: Re-exports the public API: Client, analyzers, document contract, results, errors, and the LLM path.

//! Credence - journalistic-quality signals for web pages.
//!
//! Fetches a page, parses it, and scores its use of statistics, quotations
//! and citations, each as a value in `[0, 1]`. An optional second path asks
//! a chat model to deduce a richer set of features from the page markdown.
//!
//! # Example
//!
//! ```no_run
//! use credence_scorer::{AnalysisError, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AnalysisError> {
//!     let client = Client::builder().build();
//!     let scores = client.analyze("https://example.com/article").await?;
//!     println!("{}", serde_json::to_string(&scores).unwrap());
//!     Ok(())
//! }
//! ```

pub mod analyzers;
pub mod client;
pub mod document;
pub mod error;
pub mod formats;
pub mod llm;
pub mod options;
pub mod resource;
pub mod result;

pub use crate::analyzers::citation::origin_of;
pub use crate::analyzers::{cite_sources_score, quotation_score, statistics_score};
pub use crate::client::{score_document, Client};
pub use crate::document::{HtmlDocument, PageDocument, PageNode};
pub use crate::error::{AnalysisError, ErrorCode};
pub use crate::llm::{FeatureExtractor, FeatureRecord, LlmError, LlmExtractor};
pub use crate::options::{ClientBuilder, LlmExtractorBuilder, LlmOptions, Options};
pub use crate::result::{AnalysisResult, ScoreBreakdown, SiteReport};
