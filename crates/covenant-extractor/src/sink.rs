//! Result sinks: in-memory and JSON files

use crate::error::ExtractorError;
use covenant_domain::{ExtractionResult, ResultSink};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::info;

/// Keeps the latest result per document in memory
#[derive(Debug, Default)]
pub struct InMemoryResultSink {
    results: RwLock<HashMap<String, ExtractionResult>>,
}

impl InMemoryResultSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored result for a document
    pub fn get(&self, document_id: &str) -> Option<ExtractionResult> {
        self.results
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(document_id)
            .cloned()
    }

    /// Number of stored results
    pub fn len(&self) -> usize {
        self.results.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// True if nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for InMemoryResultSink {
    type Error = ExtractorError;

    fn store(&self, result: &ExtractionResult) -> Result<(), Self::Error> {
        self.results
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(result.document_id.clone(), result.clone());
        Ok(())
    }
}

/// Writes `<dir>/<document_id>.json`, replacing any earlier file
#[derive(Debug, Clone)]
pub struct JsonFileResultSink {
    dir: PathBuf,
}

impl JsonFileResultSink {
    /// Sink writing into `dir`, created on first store if missing
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a document's result is written to
    pub fn path_for(&self, document_id: &str) -> PathBuf {
        let file_name: String = document_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ResultSink for JsonFileResultSink {
    type Error = ExtractorError;

    fn store(&self, result: &ExtractionResult) -> Result<(), Self::Error> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ExtractorError::Sink(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.path_for(&result.document_id);
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| ExtractorError::Sink(format!("Failed to serialize result: {}", e)))?;
        std::fs::write(&path, json)
            .map_err(|e| ExtractorError::Sink(format!("Failed to write {}: {}", path.display(), e)))?;

        info!("Stored result for '{}' at {}", result.document_id, path.display());
        Ok(())
    }
}
