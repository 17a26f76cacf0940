// ABOUTME: The LLM feature path: fetch a page, convert it to markdown, ask a model for six [0,1] features.
// ABOUTME: Independent of the heuristic scorer; its errors are reported separately as LlmError.

//! LLM-based feature extraction.
//!
//! An alternative to the heuristic scorer: the page is fetched, reduced to
//! markdown and handed to a chat model together with a JSON schema of the
//! six [`FeatureRecord`] fields. The whole extraction runs under its own
//! timeout and shares nothing with the heuristic path.

pub mod provider;
pub mod schema;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use crate::client::{build_http_client, fetch_options};
use crate::error::AnalysisError;
use crate::formats::{filter_blocks, html_to_markdown};
use crate::options::{LlmExtractorBuilder, LlmOptions};
use crate::resource::fetch;

pub use provider::{Provider, ProviderSpec, Sampling};
pub use schema::{feature_schema, FeatureRecord, FEATURE_DESCRIPTIONS};

/// Errors from the LLM path. Kept apart from [`AnalysisError`] so an LLM
/// failure is never mistaken for a failed page analysis.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("page fetch failed: {0}")]
    Fetch(#[from] AnalysisError),
    #[error("provider request failed: {0}")]
    Provider(String),
    #[error("LLM extraction timed out after {0:?}")]
    Timeout(Duration),
    #[error("response does not match the feature schema: {0}")]
    Schema(String),
    #[error("unsupported provider {0:?}, expected ollama/<model> or openai/<model>")]
    UnsupportedProvider(String),
    #[error("provider {0} needs an API token")]
    MissingToken(String),
}

/// Something that can deduce a [`FeatureRecord`] for a page.
pub trait FeatureExtractor {
    fn extract(&self, url: &str) -> impl Future<Output = Result<FeatureRecord, LlmError>> + Send;
}

/// [`FeatureExtractor`] backed by an Ollama or OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct LlmExtractor {
    spec: ProviderSpec,
    endpoint: String,
    opts: LlmOptions,
    http_client: reqwest::Client,
}

impl LlmExtractor {
    pub fn builder() -> LlmExtractorBuilder {
        LlmExtractorBuilder::new()
    }

    /// Create an extractor, validating the provider string and token up front.
    pub fn new(opts: LlmOptions) -> Result<Self, LlmError> {
        let spec: ProviderSpec = opts.provider.parse()?;
        if spec.provider.requires_token()
            && opts.api_token.as_deref().map_or(true, str::is_empty)
        {
            return Err(LlmError::MissingToken(spec.provider.to_string()));
        }
        let base = opts
            .base_url
            .as_deref()
            .unwrap_or_else(|| spec.provider.default_base_url())
            .trim_end_matches('/');
        let endpoint = format!("{}{}", base, spec.provider.endpoint_path());
        let http_client = build_http_client(&opts.fetch);
        Ok(Self {
            spec,
            endpoint,
            opts,
            http_client,
        })
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    /// Fetch `url` and render it as the markdown the model will read.
    pub async fn page_markdown(&self, url: &str) -> Result<String, LlmError> {
        let fetched = fetch(&self.http_client, url, &fetch_options(&self.opts.fetch)).await?;
        Ok(self.render_markdown(&fetched.text()))
    }

    fn render_markdown(&self, html: &str) -> String {
        filter_blocks(&html_to_markdown(html), self.opts.word_count_threshold)
    }

    /// Extract features from markup that was fetched elsewhere.
    ///
    /// Runs under the same time budget as [`FeatureExtractor::extract`].
    pub async fn extract_from_html(&self, url: &str, html: &str) -> Result<FeatureRecord, LlmError> {
        let budget = self.opts.page_timeout;
        let markdown = self.render_markdown(html);
        tokio::time::timeout(budget, self.extract_from_markdown(url, &markdown))
            .await
            .map_err(|_| LlmError::Timeout(budget))?
    }

    /// Send one schema-constrained request for already-rendered page content.
    pub async fn extract_from_markdown(
        &self,
        url: &str,
        markdown: &str,
    ) -> Result<FeatureRecord, LlmError> {
        let content = format!("URL: {}\n\n{}", url, markdown);
        let body = self.spec.request_body(
            &self.opts.instructions,
            &content,
            &feature_schema(),
            self.opts.sampling,
        );

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .timeout(self.opts.page_timeout)
            .json(&body);
        if let Some(token) = self.opts.api_token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        debug!(provider = %self.spec, endpoint = %self.endpoint, chars = content.len(), "requesting features");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.opts.page_timeout)
            } else {
                LlmError::Provider(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::Provider("rate limited".to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!("{}: {}", status, error_text)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Schema(format!("provider response is not JSON: {}", e)))?;
        let reply = self.spec.reply_text(&json)?;
        let record = FeatureRecord::from_reply(reply)?;
        info!(url, provider = %self.spec, "LLM features extracted");
        Ok(record)
    }
}

impl FeatureExtractor for LlmExtractor {
    async fn extract(&self, url: &str) -> Result<FeatureRecord, LlmError> {
        let budget = self.opts.page_timeout;
        let work = async {
            let markdown = self.page_markdown(url).await?;
            self.extract_from_markdown(url, &markdown).await
        };
        tokio::time::timeout(budget, work)
            .await
            .map_err(|_| LlmError::Timeout(budget))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PAGE: &str = "<html><body><h1>Climate</h1><p>Emissions fell 12% in 2023, the agency said.</p></body></html>";
    const FEATURES: &str = r#"{"statistics_addition":0.5,"quotation_addition":0.0,"cite_sources":0.5,"high_fluency":0.9,"accurate_terminology":0.9,"non_manipulative_tone":1.0}"#;

    fn extractor(server: &MockServer, provider: &str) -> LlmExtractor {
        let mut builder = LlmExtractor::builder()
            .provider(provider)
            .base_url(server.base_url())
            .allow_private_networks(true);
        if provider.starts_with("openai") {
            builder = builder.api_token("sk-test");
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_ollama_round_trip() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).header("content-type", "text/html").body(PAGE);
        });
        let chat = server.mock(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_includes("\"model\":\"gemma3\"")
                .body_includes("Emissions fell 12%");
            then.status(200).json_body(json!({
                "model": "gemma3",
                "message": { "role": "assistant", "content": FEATURES },
                "done": true
            }));
        });

        let record = extractor(&server, "ollama/gemma3")
            .extract(&server.url("/article"))
            .await
            .unwrap();
        page.assert();
        chat.assert();
        assert_eq!(record.statistics_addition, 0.5);
        assert_eq!(record.non_manipulative_tone, 1.0);
    }

    #[tokio::test]
    async fn test_openai_sends_bearer_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).body(PAGE);
        });
        let chat = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": FEATURES } }]
            }));
        });

        let record = extractor(&server, "openai/gpt-4o-mini")
            .extract(&server.url("/article"))
            .await
            .unwrap();
        chat.assert();
        assert_eq!(record.cite_sources, 0.5);
    }

    #[tokio::test]
    async fn test_provider_error_is_distinct_from_fetch_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).body(PAGE);
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(503).body("model not loaded");
        });
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let ex = extractor(&server, "ollama/gemma3");
        let err = ex.extract(&server.url("/article")).await.unwrap_err();
        assert!(matches!(err, LlmError::Provider(ref m) if m.contains("model not loaded")));

        let err = ex.extract(&server.url("/missing")).await.unwrap_err();
        assert!(matches!(err, LlmError::Fetch(ref e) if e.is_fetch()));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_schema_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).body(PAGE);
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(json!({
                "message": { "content": "{\"statistics_addition\": 2}" }
            }));
        });

        let err = extractor(&server, "ollama/gemma3")
            .extract(&server.url("/article"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Schema(_)));
    }

    #[tokio::test]
    async fn test_page_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).body(PAGE);
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(json!({ "message": { "content": FEATURES } }));
        });

        let ex = LlmExtractor::builder()
            .base_url(server.base_url())
            .allow_private_networks(true)
            .page_timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let err = ex.extract(&server.url("/article")).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_extract_from_html_skips_the_fetch() {
        let server = MockServer::start();
        let chat = server.mock(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_includes("Emissions fell 12%");
            then.status(200)
                .json_body(json!({ "message": { "content": FEATURES } }));
        });

        let record = extractor(&server, "ollama/gemma3")
            .extract_from_html("https://example.com/a", PAGE)
            .await
            .unwrap();
        chat.assert();
        assert_eq!(record.high_fluency, 0.9);
    }

    #[tokio::test]
    async fn test_slow_page_fetch_hits_fetch_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .body(PAGE);
        });

        let ex = LlmExtractor::builder()
            .base_url(server.base_url())
            .allow_private_networks(true)
            .fetch_timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let err = ex.extract(&server.url("/slow")).await.unwrap_err();
        assert!(matches!(err, LlmError::Fetch(ref e) if e.is_timeout()), "got {}", err);
    }

    #[tokio::test]
    async fn test_page_markdown_filters_short_blocks() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).body(PAGE);
        });

        let ex = LlmExtractor::builder()
            .allow_private_networks(true)
            .word_count_threshold(3)
            .build()
            .unwrap();
        let md = ex.page_markdown(&server.url("/article")).await.unwrap();
        assert!(!md.contains("# Climate"), "got: {}", md);
        assert!(md.contains("Emissions fell 12%"), "got: {}", md);
    }
}
