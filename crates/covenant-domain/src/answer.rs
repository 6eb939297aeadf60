//! Typed answer values and per-chunk answer candidates

use crate::{Confidence, Provenance};
use serde::{Deserialize, Serialize};

/// A typed answer value, or an explicit "not found"
///
/// Serialized untagged: `NotFound` becomes `null`, every other variant its
/// natural JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    /// Boolean answer
    Boolean(bool),
    /// Integer answer
    Integer(i64),
    /// Floating-point answer
    Double(f64),
    /// Escaped, length-bounded text
    Text(String),
    /// Selected items
    Multiselect(Vec<String>),
    /// The document did not answer the question
    NotFound,
}

impl AnswerValue {
    /// Whether the value carries an answer
    pub fn is_found(&self) -> bool {
        !matches!(self, AnswerValue::NotFound)
    }
}

/// One extraction call's answer to one question
///
/// Ephemeral: the coverage controller either retains it as the question's
/// best candidate or drops it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCandidate {
    /// Question this answers
    pub question_id: String,

    /// Typed value
    pub value: AnswerValue,

    /// Self-rated confidence
    pub confidence: Confidence,

    /// Quote, page and section
    pub provenance: Provenance,

    /// Index of the chunk the answer came from
    pub chunk_index: usize,
}

impl AnswerCandidate {
    /// A "not found" candidate; always rated LOW
    pub fn not_found(question_id: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            question_id: question_id.into(),
            value: AnswerValue::NotFound,
            confidence: Confidence::Low,
            provenance: Provenance::default(),
            chunk_index,
        }
    }

    /// Whether the candidate carries an answer
    pub fn is_found(&self) -> bool {
        self.value.is_found()
    }

    /// Whether this candidate should replace `current` as a question's best
    ///
    /// Strictly higher confidence wins. At equal confidence the earlier
    /// candidate stays, unless it is "not found" and this one is not.
    pub fn supersedes(&self, current: &AnswerCandidate) -> bool {
        self.confidence > current.confidence
            || (self.confidence == current.confidence && self.is_found() && !current.is_found())
    }
}
