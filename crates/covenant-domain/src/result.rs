//! The output of one extraction pass

use crate::{AnswerValue, Confidence};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Final answer for one question
///
/// A "not found" record carries `AnswerValue::NotFound` and no provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Question identifier
    pub question_id: String,

    /// Typed value, `null` when not found
    pub value: AnswerValue,

    /// Confidence of the retained candidate (`none` if no candidate was ever recorded)
    pub confidence: Confidence,

    /// Verbatim quote
    pub source_text: Option<String>,

    /// Page of the quote
    pub source_page: Option<u32>,

    /// Section reference
    pub source_section: Option<String>,
}

impl AnswerRecord {
    /// Whether the record carries an answer
    pub fn is_answered(&self) -> bool {
        self.value.is_found()
    }
}

/// Pass-level statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Wall-clock duration of the pass
    pub elapsed_seconds: f64,

    /// Chunks actually dispatched (early exit may stop before `chunk_count`)
    pub chunks_processed: usize,

    /// Chunks the document was split into
    pub chunk_count: usize,

    /// Model invocations including retries
    pub model_calls: usize,

    /// Chunks whose every attempt failed
    pub failed_chunks: usize,

    /// Answers retained at HIGH confidence
    pub high_confidence_count: usize,

    /// Answers retained at MEDIUM confidence
    pub medium_confidence_count: usize,

    /// Answers retained at LOW confidence
    pub low_confidence_count: usize,

    /// Questions with a value
    pub total_answered: usize,

    /// Questions in the catalogue
    pub total_questions: usize,

    /// The pass was cancelled before completion
    #[serde(default)]
    pub cancelled: bool,
}

/// Category-grouped answers plus statistics for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Document the pass ran over
    pub document_id: String,

    /// Answers by category, each list in catalogue order
    pub categories: BTreeMap<String, Vec<AnswerRecord>>,

    /// Pass statistics
    pub stats: ExtractionStats,
}

impl ExtractionResult {
    /// Look up the answer to a question
    pub fn answer(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.answers().find(|a| a.question_id == question_id)
    }

    /// All answers, category by category
    pub fn answers(&self) -> impl Iterator<Item = &AnswerRecord> {
        self.categories.values().flatten()
    }
}
