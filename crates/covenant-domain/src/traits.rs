//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the extraction engine and its
//! infrastructure. Implementations live in other crates.

use crate::{ExtractionResult, Question};
use async_trait::async_trait;

/// A single request to the extraction model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    /// Complete prompt
    pub prompt: String,

    /// Upper bound on generated tokens
    pub max_output_tokens: u32,
}

/// The model's raw reply plus usage figures
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelResponse {
    /// Generated text (expected to contain structured JSON)
    pub text: String,

    /// Prompt tokens billed
    pub input_tokens: u64,

    /// Completion tokens billed
    pub output_tokens: u64,
}

/// Black-box extraction model
///
/// Implemented by the infrastructure layer (covenant-llm). Implementations
/// must be safe to share between concurrent passes.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Error type for model calls; every error is treated as transient by the engine
    type Error: std::fmt::Display + Send;

    /// Model identifier used for cost accounting
    fn model_name(&self) -> &str;

    /// Run one completion
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, Self::Error>;
}

/// Read-only directory of catalogue questions
///
/// Implemented by the application layer (covenant-extractor)
pub trait QuestionDirectory: Send + Sync {
    /// Error type for directory lookups
    type Error: std::fmt::Display;

    /// All questions, ordered by category then question order
    fn questions(&self) -> Result<Vec<Question>, Self::Error>;

    /// Category names in display order
    fn categories(&self) -> Result<Vec<String>, Self::Error>;
}

/// Persistence collaborator receiving finished pass results
pub trait ResultSink: Send + Sync {
    /// Error type for persistence operations
    type Error: std::fmt::Display;

    /// Store the result for a document, replacing any earlier result
    fn store(&self, result: &ExtractionResult) -> Result<(), Self::Error>;
}
