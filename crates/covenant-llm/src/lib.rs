//! Covenant Extraction Model Layer
//!
//! Implementations of the `ExtractionModel` trait from `covenant-domain`.
//!
//! # Providers
//!
//! - `MockModel`: Deterministic, scriptable model for tests and dry runs
//! - `AnthropicClient`: Anthropic Messages API over HTTP
//!
//! # Examples
//!
//! ```
//! use covenant_domain::{ExtractionModel, ModelRequest};
//! use covenant_llm::MockModel;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let model = MockModel::new("[]");
//! let request = ModelRequest { prompt: "any prompt".into(), max_output_tokens: 100 };
//! let response = model.complete(request).await.unwrap();
//! assert_eq!(response.text, "[]");
//! # }
//! ```

#![warn(missing_docs)]

pub mod anthropic;

use async_trait::async_trait;
use covenant_domain::{ExtractionModel, ModelRequest, ModelResponse};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

pub use anthropic::AnthropicClient;

/// Errors that can occur during model calls
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the model API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Missing or invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Approximate characters per token used by the mock's usage figures
const MOCK_CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone)]
enum Behaviour {
    Respond(String),
    Fail { remaining: Option<usize> },
    Delay(Duration, String),
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    behaviour: Behaviour,
}

/// Mock extraction model for deterministic testing
///
/// Responses are chosen by the first rule whose needle occurs in the prompt;
/// prompts matching no rule get the default response. Every prompt is
/// recorded so tests can assert which questions were sent with which chunk.
///
/// # Examples
///
/// ```
/// use covenant_domain::{ExtractionModel, ModelRequest};
/// use covenant_llm::MockModel;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut model = MockModel::new("[]");
/// model.add_response("[PAGE 2]", r#"[{"question_id": "q1", "value": true}]"#);
///
/// let request = ModelRequest { prompt: "[PAGE 2]\ntext".into(), max_output_tokens: 100 };
/// let response = model.complete(request).await.unwrap();
/// assert!(response.text.contains("q1"));
/// assert_eq!(model.call_count(), 1);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,
    default_response: String,
    rules: Arc<Mutex<Vec<Rule>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockModel {
    /// Create a mock returning a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            name: "mock-model".to_string(),
            default_response: response.into(),
            rules: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the model name reported for cost accounting
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Respond with `response` to prompts containing `needle`
    pub fn add_response(&mut self, needle: impl Into<String>, response: impl Into<String>) {
        self.push_rule(needle, Behaviour::Respond(response.into()));
    }

    /// Fail every prompt containing `needle`
    pub fn add_error(&mut self, needle: impl Into<String>) {
        self.push_rule(needle, Behaviour::Fail { remaining: None });
    }

    /// Fail the first `times` prompts containing `needle`, then fall through
    /// to later rules
    pub fn add_failures(&mut self, needle: impl Into<String>, times: usize) {
        self.push_rule(needle, Behaviour::Fail { remaining: Some(times) });
    }

    /// Sleep for `delay` before responding to prompts containing `needle`
    pub fn add_delay(
        &mut self,
        needle: impl Into<String>,
        delay: Duration,
        response: impl Into<String>,
    ) {
        self.push_rule(needle, Behaviour::Delay(delay, response.into()));
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Forget recorded prompts
    pub fn reset_call_count(&self) {
        lock(&self.prompts).clear();
    }

    fn push_rule(&mut self, needle: impl Into<String>, behaviour: Behaviour) {
        lock(&self.rules).push(Rule {
            needle: needle.into(),
            behaviour,
        });
    }

    /// Pick the behaviour for a prompt, consuming one-shot failures
    fn select(&self, prompt: &str) -> Behaviour {
        let mut rules = lock(&self.rules);
        for rule in rules.iter_mut() {
            if !prompt.contains(&rule.needle) {
                continue;
            }
            match &mut rule.behaviour {
                Behaviour::Fail {
                    remaining: Some(0),
                } => continue,
                Behaviour::Fail {
                    remaining: Some(n),
                } => {
                    *n -= 1;
                    return Behaviour::Fail { remaining: None };
                }
                other => return other.clone(),
            }
        }
        Behaviour::Respond(self.default_response.clone())
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new("[]")
    }
}

#[async_trait]
impl ExtractionModel for MockModel {
    type Error = LlmError;

    fn model_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, Self::Error> {
        lock(&self.prompts).push(request.prompt.clone());

        let text = match self.select(&request.prompt) {
            Behaviour::Respond(text) => text,
            Behaviour::Fail { .. } => return Err(LlmError::Other("Mock error".to_string())),
            Behaviour::Delay(delay, text) => {
                tokio::time::sleep(delay).await;
                text
            }
        };

        Ok(ModelResponse {
            input_tokens: (request.prompt.len() / MOCK_CHARS_PER_TOKEN) as u64,
            output_tokens: (text.len() / MOCK_CHARS_PER_TOKEN) as u64,
            text,
        })
    }
}

/// Lock a mutex, recovering the data if a panicking test poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
