// ABOUTME: Configuration for site analysis and the LLM path: Options, LlmOptions, and their fluent builders.
// ABOUTME: ClientBuilder constructs Client; LlmExtractorBuilder constructs LlmExtractor.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::Client;
use crate::llm::provider::Sampling;
use crate::llm::{LlmError, LlmExtractor};
use crate::resource::DEFAULT_FETCH_TIMEOUT;

/// Default User-Agent for page fetches.
pub const DEFAULT_USER_AGENT: &str = "Credence/0.1 (+journalistic-quality scorer)";

/// Instructions sent with every LLM extraction request.
pub const DEFAULT_INSTRUCTIONS: &str = "From the crawled text, extract all the text and deduce the features that I described in the schema.";

/// Default `"<provider>/<model>"` for the LLM path.
pub const DEFAULT_PROVIDER: &str = "ollama/gemma3";

/// Default time budget for one LLM extraction, fetch included.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(80);

/// Configuration options for the analysis client.
#[derive(Debug, Clone)]
pub struct Options {
    pub timeout: Duration,
    pub user_agent: String,
    pub allow_private_networks: bool,
    pub http_client: Option<reqwest::Client>,
    pub headers: HashMap<String, String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_private_networks: false,
            http_client: None,
            headers: HashMap::new(),
        }
    }
}

/// Builder for constructing Client instances with custom configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    opts: Options,
}

impl ClientBuilder {
    /// Create a new ClientBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: Options::default(),
        }
    }

    /// Set the page fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Allow or disallow requests to private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.http_client = Some(client);
        self
    }

    /// Add a custom header to all requests.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.headers.insert(key.into(), value.into());
        self
    }

    /// Build the Client with the configured options.
    pub fn build(self) -> Client {
        Client::new(self.opts)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the LLM feature extractor.
#[derive(Debug, Clone)]
pub struct LlmOptions {
    pub provider: String,
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub page_timeout: Duration,
    pub sampling: Sampling,
    pub word_count_threshold: usize,
    pub instructions: String,
    pub fetch: Options,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            base_url: None,
            api_token: None,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            sampling: Sampling::default(),
            word_count_threshold: 1,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            fetch: Options::default(),
        }
    }
}

/// Builder for [`LlmExtractor`].
#[derive(Debug, Clone, Default)]
pub struct LlmExtractorBuilder {
    opts: LlmOptions,
}

impl LlmExtractorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `"<provider>/<model>"` string, e.g. `ollama/gemma3`.
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.opts.provider = provider.into();
        self
    }

    /// Override the provider's base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.opts.base_url = Some(base_url.into());
        self
    }

    /// Set the bearer token for providers that need one.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.opts.api_token = Some(token.into());
        self
    }

    /// Set the time budget for one extraction.
    pub fn page_timeout(mut self, timeout: Duration) -> Self {
        self.opts.page_timeout = timeout;
        self
    }

    /// Set the timeout for fetching the page itself.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.opts.fetch.timeout = timeout;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.opts.sampling.temperature = temperature;
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.opts.sampling.top_p = top_p;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.opts.sampling.max_tokens = max_tokens;
        self
    }

    /// Drop markdown blocks with fewer words than this before prompting.
    pub fn word_count_threshold(mut self, threshold: usize) -> Self {
        self.opts.word_count_threshold = threshold;
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.opts.instructions = instructions.into();
        self
    }

    /// Allow or disallow fetching pages from private networks.
    pub fn allow_private_networks(mut self, allow: bool) -> Self {
        self.opts.fetch.allow_private_networks = allow;
        self
    }

    /// Use a custom HTTP client for both the page fetch and the provider call.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.opts.fetch.http_client = Some(client);
        self
    }

    /// Build the extractor, validating the provider string and token.
    pub fn build(self) -> Result<LlmExtractor, LlmError> {
        LlmExtractor::new(self.opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderSpec;
    use serde_json::json;

    #[test]
    fn test_llm_defaults() {
        let opts = LlmOptions::default();
        assert_eq!(opts.provider, "ollama/gemma3");
        assert_eq!(opts.page_timeout, Duration::from_secs(80));
        assert_eq!(opts.sampling.temperature, 0.0);
        assert_eq!(opts.sampling.top_p, 0.9);
        assert_eq!(opts.sampling.max_tokens, 1000);
        assert_eq!(opts.word_count_threshold, 1);
    }

    #[test]
    fn test_fetch_defaults() {
        let opts = Options::default();
        assert_eq!(opts.timeout, Duration::from_secs(10));
        assert!(!opts.allow_private_networks);
    }

    #[test]
    fn test_llm_builder_rejects_unknown_provider() {
        let err = LlmExtractorBuilder::new()
            .provider("mystery/model")
            .build()
            .unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedProvider(_)));
    }

    #[test]
    fn test_llm_builder_requires_token_for_openai() {
        let err = LlmExtractorBuilder::new()
            .provider("openai/gpt-4o-mini")
            .build()
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingToken(_)));

        assert!(LlmExtractorBuilder::new()
            .provider("openai/gpt-4o-mini")
            .api_token("sk-test")
            .build()
            .is_ok());
    }

    #[test]
    fn test_llm_builder_fetch_timeout_is_separate_from_page_timeout() {
        let builder = LlmExtractorBuilder::new()
            .fetch_timeout(Duration::from_secs(3))
            .page_timeout(Duration::from_secs(30));
        assert_eq!(builder.opts.fetch.timeout, Duration::from_secs(3));
        assert_eq!(builder.opts.page_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_custom_sampling_and_instructions_reach_request_body() {
        let builder = LlmExtractorBuilder::new()
            .temperature(0.3)
            .top_p(0.5)
            .max_tokens(256)
            .instructions("Rate the page.");
        let opts = builder.opts;
        let spec: ProviderSpec = opts.provider.parse().unwrap();
        let body = spec.request_body(&opts.instructions, "page", &json!({}), opts.sampling);
        assert_eq!(body["options"]["temperature"], 0.3);
        assert_eq!(body["options"]["top_p"], 0.5);
        assert_eq!(body["options"]["num_predict"], 256);
        assert_eq!(body["messages"][0]["content"], "Rate the page.");

        let spec: ProviderSpec = "openai/gpt-4o-mini".parse().unwrap();
        let body = spec.request_body(&opts.instructions, "page", &json!({}), opts.sampling);
        assert_eq!(body["temperature"], 0.3);
        assert_eq!(body["top_p"], 0.5);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["messages"][0]["content"], "Rate the page.");
    }
}
