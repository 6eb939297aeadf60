//! Configuration for the extraction engine

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for an extraction pass
///
/// `chunk_overlap` must exceed the longest clause or definition expected to
/// straddle a chunk boundary, so that it appears whole in at least one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Target chunk size (characters)
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks; must be less than `chunk_size`
    pub chunk_overlap: usize,

    /// Maximum time for a single model call (seconds)
    pub call_timeout_secs: u64,

    /// Retries per chunk after the first failed attempt
    pub max_retries: u32,

    /// Base backoff between retries (milliseconds), doubled per attempt
    pub retry_backoff_ms: u64,

    /// Upper bound on tokens the model may generate per call
    pub max_output_tokens: u32,

    /// Maximum length of string answers (characters)
    pub max_string_chars: usize,

    /// Maximum length of source quotes (characters)
    pub max_quote_chars: usize,
}

impl ExtractorConfig {
    /// Get the per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }

    /// Apply per-pass chunking overrides
    pub fn with_overrides(mut self, overrides: &ChunkOverrides) -> Self {
        if let Some(size) = overrides.chunk_size {
            self.chunk_size = size;
        }
        if let Some(overlap) = overrides.chunk_overlap {
            self.chunk_overlap = overlap;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.chunk_size == 0 {
            return Err(ExtractorError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ExtractorError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.call_timeout_secs == 0 {
            return Err(ExtractorError::Config(
                "call_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_output_tokens == 0 {
            return Err(ExtractorError::Config(
                "max_output_tokens must be greater than 0".to_string(),
            ));
        }
        if self.max_string_chars == 0 || self.max_quote_chars == 0 {
            return Err(ExtractorError::Config(
                "max_string_chars and max_quote_chars must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Balanced settings: ~15k-token windows with a generous clause overlap
    fn default() -> Self {
        Self {
            chunk_size: 60_000,
            chunk_overlap: 4_000,
            call_timeout_secs: 180,
            max_retries: 2,
            retry_backoff_ms: 1_000,
            max_output_tokens: 8_000,
            max_string_chars: 2_000,
            max_quote_chars: 1_500,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: smaller windows, shorter timeouts, one retry
    pub fn aggressive() -> Self {
        Self {
            chunk_size: 30_000,
            chunk_overlap: 2_000,
            call_timeout_secs: 60,
            max_retries: 1,
            retry_backoff_ms: 500,
            max_output_tokens: 4_000,
            max_string_chars: 1_000,
            max_quote_chars: 800,
        }
    }

    /// Lenient preset: large windows, long timeouts, more retries
    pub fn lenient() -> Self {
        Self {
            chunk_size: 150_000,
            chunk_overlap: 8_000,
            call_timeout_secs: 300,
            max_retries: 4,
            retry_backoff_ms: 2_000,
            max_output_tokens: 16_000,
            max_string_chars: 4_000,
            max_quote_chars: 3_000,
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        let config: Self = toml::from_str(toml_str)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractorError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ExtractorError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

/// Per-pass chunking overrides supplied at the pass entry point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOverrides {
    /// Replacement chunk size
    pub chunk_size: Option<usize>,

    /// Replacement overlap
    pub chunk_overlap: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::aggressive().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = ExtractorConfig::default();
        config.chunk_overlap = config.chunk_size;
        assert!(matches!(config.validate(), Err(ExtractorError::Config(_))));

        config.chunk_overlap = config.chunk_size + 1;
        assert!(matches!(config.validate(), Err(ExtractorError::Config(_))));
    }

    #[test]
    fn test_zero_chunk_size() {
        let mut config = ExtractorConfig::default();
        config.chunk_size = 0;
        config.chunk_overlap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let config = ExtractorConfig::default();
        assert_eq!(config.retry_backoff(1), Duration::from_millis(1_000));
        assert_eq!(config.retry_backoff(2), Duration::from_millis(2_000));
        assert_eq!(config.retry_backoff(3), Duration::from_millis(4_000));
    }

    #[test]
    fn test_overrides() {
        let overrides = ChunkOverrides {
            chunk_size: Some(500),
            chunk_overlap: None,
        };
        let config = ExtractorConfig::default().with_overrides(&overrides);
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 4_000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ExtractorConfig::from_toml("chunk_size = 1000\nchunk_overlap = 100\n").unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.max_retries, ExtractorConfig::default().max_retries);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
