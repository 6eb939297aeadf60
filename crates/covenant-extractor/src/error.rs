//! Error types for the extraction engine

use thiserror::Error;

/// Errors that can occur during an extraction pass
///
/// Only `Config`, `Directory`, `ModelUnavailable` and `Sink` ever reach the
/// caller of a pass. `Transient`, `Timeout` and `Malformed` are absorbed by
/// the coverage controller and the response parser.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Invalid chunking or engine parameters; raised before any model call
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single model call failed
    #[error("Transient extraction error: {0}")]
    Transient(String),

    /// A single model call exceeded its timeout
    #[error("Extraction call timed out after {0}s")]
    Timeout(u64),

    /// The model returned output that could not be parsed
    #[error("Malformed model response: {0}")]
    Malformed(String),

    /// Every dispatched chunk failed every retry
    #[error("Extraction model unavailable: all {chunks} chunk(s) failed (last error: {last_error})")]
    ModelUnavailable {
        /// Chunks attempted
        chunks: usize,
        /// Last error observed
        last_error: String,
    },

    /// The question catalogue could not be loaded
    #[error("Question directory error: {0}")]
    Directory(String),

    /// The result could not be persisted
    #[error("Result sink error: {0}")]
    Sink(String),
}

impl ExtractorError {
    /// Whether the error is recovered locally by retrying the chunk
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractorError::Transient(_) | ExtractorError::Timeout(_))
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::Malformed(e.to_string())
    }
}

impl From<toml::de::Error> for ExtractorError {
    fn from(e: toml::de::Error) -> Self {
        ExtractorError::Config(format!("Failed to parse TOML: {}", e))
    }
}
