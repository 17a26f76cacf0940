// ABOUTME: Chat-completion providers for the LLM path: provider-string parsing, request bodies, reply extraction.
// ABOUTME: Supports Ollama's /api/chat and OpenAI-compatible /v1/chat/completions with a JSON schema.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use super::LlmError;

/// Sampling settings shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.9,
            max_tokens: 1000,
        }
    }
}

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Ollama => "http://localhost:11434",
            Provider::OpenAi => "https://api.openai.com",
        }
    }

    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Provider::Ollama => "/api/chat",
            Provider::OpenAi => "/v1/chat/completions",
        }
    }

    pub fn requires_token(&self) -> bool {
        matches!(self, Provider::OpenAi)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::Ollama => "ollama",
            Provider::OpenAi => "openai",
        };
        write!(f, "{}", s)
    }
}

/// A `"<provider>/<model>"` string such as `ollama/gemma3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    pub provider: Provider,
    pub model: String,
}

impl FromStr for ProviderSpec {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, model) = s
            .split_once('/')
            .filter(|(_, model)| !model.trim().is_empty())
            .ok_or_else(|| LlmError::UnsupportedProvider(s.to_string()))?;
        let provider = match name.trim().to_lowercase().as_str() {
            "ollama" => Provider::Ollama,
            "openai" => Provider::OpenAi,
            _ => return Err(LlmError::UnsupportedProvider(s.to_string())),
        };
        Ok(Self {
            provider,
            model: model.trim().to_string(),
        })
    }
}

impl fmt::Display for ProviderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl ProviderSpec {
    /// Build the chat request body for this provider.
    pub fn request_body(
        &self,
        instructions: &str,
        content: &str,
        schema: &Value,
        sampling: Sampling,
    ) -> Value {
        let messages = json!([
            { "role": "system", "content": instructions },
            { "role": "user", "content": content }
        ]);
        match self.provider {
            Provider::Ollama => json!({
                "model": self.model,
                "messages": messages,
                "format": schema,
                "stream": false,
                "options": {
                    "temperature": sampling.temperature,
                    "top_p": sampling.top_p,
                    "num_predict": sampling.max_tokens
                }
            }),
            Provider::OpenAi => json!({
                "model": self.model,
                "messages": messages,
                "temperature": sampling.temperature,
                "top_p": sampling.top_p,
                "max_tokens": sampling.max_tokens,
                "response_format": {
                    "type": "json_schema",
                    "json_schema": {
                        "name": "features",
                        "schema": schema,
                        "strict": true
                    }
                }
            }),
        }
    }

    /// Pull the assistant's text out of a provider response.
    pub fn reply_text<'a>(&self, response: &'a Value) -> Result<&'a str, LlmError> {
        let text = match self.provider {
            Provider::Ollama => response["message"]["content"].as_str(),
            Provider::OpenAi => response["choices"]
                .as_array()
                .and_then(|choices| choices.first())
                .and_then(|choice| choice["message"]["content"].as_str()),
        };
        text.ok_or_else(|| LlmError::Schema("no message content in provider response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_provider_spec() {
        let spec: ProviderSpec = "ollama/gemma3".parse().unwrap();
        assert_eq!(spec.provider, Provider::Ollama);
        assert_eq!(spec.model, "gemma3");
        assert_eq!(spec.to_string(), "ollama/gemma3");

        let spec: ProviderSpec = "OpenAI/gpt-4o-mini".parse().unwrap();
        assert_eq!(spec.provider, Provider::OpenAi);
        assert!(spec.provider.requires_token());
    }

    #[test]
    fn test_model_may_contain_slashes() {
        let spec: ProviderSpec = "ollama/library/llama3:8b".parse().unwrap();
        assert_eq!(spec.model, "library/llama3:8b");
    }

    #[test]
    fn test_reject_unknown_or_incomplete_specs() {
        for bad in ["gemma3", "ollama/", "groq/llama3", ""] {
            assert!(
                matches!(bad.parse::<ProviderSpec>(), Err(LlmError::UnsupportedProvider(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_ollama_request_body() {
        let spec: ProviderSpec = "ollama/gemma3".parse().unwrap();
        let body = spec.request_body("do it", "page", &json!({"type": "object"}), Sampling::default());
        assert_eq!(body["model"], "gemma3");
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"]["type"], "object");
        assert_eq!(body["options"]["num_predict"], 1000);
        assert_eq!(body["options"]["top_p"], 0.9);
        assert_eq!(body["messages"][1]["content"], "page");
    }

    #[test]
    fn test_openai_request_body() {
        let spec: ProviderSpec = "openai/gpt-4o-mini".parse().unwrap();
        let body = spec.request_body("do it", "page", &json!({}), Sampling::default());
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["response_format"]["type"], "json_schema");
    }

    #[test]
    fn test_reply_text() {
        let ollama: ProviderSpec = "ollama/m".parse().unwrap();
        let response = json!({"message": {"role": "assistant", "content": "{}"}});
        assert_eq!(ollama.reply_text(&response).unwrap(), "{}");

        let openai: ProviderSpec = "openai/m".parse().unwrap();
        let response = json!({"choices": [{"message": {"content": "[]"}}]});
        assert_eq!(openai.reply_text(&response).unwrap(), "[]");
        assert!(openai.reply_text(&json!({"choices": []})).is_err());
    }
}
