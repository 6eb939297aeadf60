//! Anthropic Messages API client
//!
//! Sends one user message per extraction call and reports token usage for
//! cost accounting.
//!
//! # Features
//!
//! - Async HTTP communication via `reqwest`
//! - Configurable endpoint, model and API version
//! - HTTP status mapped onto `LlmError` variants
//!
//! Retries and per-call timeouts are owned by the coverage controller, so the
//! client makes exactly one attempt per call.
//!
//! # Examples
//!
//! ```no_run
//! use covenant_llm::AnthropicClient;
//!
//! let client = AnthropicClient::new("sk-ant-...", "claude-sonnet-4-20250514").unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use covenant_domain::{ExtractionModel, ModelRequest, ModelResponse};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// API version header value
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Transport-level timeout; the engine applies its own, shorter per-call timeout
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

/// Anthropic Messages API client
pub struct AnthropicClient {
    endpoint: String,
    api_key: String,
    model: String,
    api_version: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicClient {
    /// Create a client for the given API key and model
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the key is empty or the HTTP client
    /// cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model: model.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            client,
        })
    }

    /// Create a client reading the key from `ANTHROPIC_API_KEY`
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| LlmError::Config(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(key, model)
    }

    /// Point the client at a different endpoint (proxies, test servers)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the API version header
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        let url = format!("{}/v1/messages", self.endpoint);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_output_tokens,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        debug!(
            "Model '{}' returned {} chars ({} in / {} out tokens)",
            self.model,
            text.len(),
            parsed.usage.input_tokens,
            parsed.usage.output_tokens
        );

        Ok(ModelResponse {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }
}

#[async_trait]
impl ExtractionModel for AnthropicClient {
    type Error = LlmError;

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, Self::Error> {
        self.send(&request).await
    }
}
