//! Confidence ratings for extracted answers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Self-rated confidence of a single extraction call in its answer
///
/// The derived ordering follows declaration order, giving the strict total
/// order `None < Low < Medium < High`. `None` means no answer has been
/// recorded at all and is never produced by the model itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// No candidate recorded
    #[default]
    None,
    /// Weak or indirect evidence
    Low,
    /// Plausible evidence, worth looking further
    Medium,
    /// Explicit, verbatim evidence
    High,
}

impl Confidence {
    /// Parse a model-supplied label (case-insensitive, surrounding whitespace ignored)
    ///
    /// Only the three model-facing levels are accepted; `"none"` is not a
    /// valid self-rating.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" | "med" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }

    /// Lowercase label used in prompts and serialized output
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::None => "none",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }

    /// Whether a candidate at this level ends the search for its question
    pub fn is_conclusive(&self) -> bool {
        *self == Confidence::High
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
