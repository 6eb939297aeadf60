//! Catalogue questions and their expected answer types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Expected type of a question's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerType {
    /// Yes/no
    Boolean,
    /// Whole number (counts, days, basis points)
    Integer,
    /// Decimal number (amounts, percentages, ratios)
    Double,
    /// Verbatim text
    String,
    /// Zero or more items from an open list
    Multiselect,
}

impl AnswerType {
    /// Lowercase name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerType::Boolean => "boolean",
            AnswerType::Integer => "integer",
            AnswerType::Double => "double",
            AnswerType::String => "string",
            AnswerType::Multiselect => "multiselect",
        }
    }

    /// Short hint telling the model what shape of value to return
    pub fn prompt_hint(&self) -> &'static str {
        match self {
            AnswerType::Boolean => "boolean true/false",
            AnswerType::Integer => "integer",
            AnswerType::Double => "number",
            AnswerType::String => "string, quoted verbatim",
            AnswerType::Multiselect => "array of strings",
        }
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when an answer type name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAnswerType(pub String);

impl fmt::Display for UnknownAnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown answer type '{}'", self.0)
    }
}

impl std::error::Error for UnknownAnswerType {}

impl FromStr for AnswerType {
    type Err = UnknownAnswerType;

    /// Accepts the canonical names plus the catalogue aliases
    /// `currency`/`percentage` (double) and `text` (string).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(AnswerType::Boolean),
            "integer" | "int" => Ok(AnswerType::Integer),
            "double" | "currency" | "percentage" | "number" => Ok(AnswerType::Double),
            "string" | "text" => Ok(AnswerType::String),
            "multiselect" => Ok(AnswerType::Multiselect),
            other => Err(UnknownAnswerType(other.to_string())),
        }
    }
}

/// A single catalogue question
///
/// Immutable and owned by the question directory; passes borrow them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier (e.g. "mfn_01")
    pub id: String,

    /// Category the question belongs to
    pub category: String,

    /// Expected answer type
    pub expected_type: AnswerType,

    /// Natural-language question
    pub text: String,

    /// What to look for in the document
    #[serde(default)]
    pub guidance: String,
}

impl Question {
    /// Create a new question
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        expected_type: AnswerType,
        text: impl Into<String>,
        guidance: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            expected_type,
            text: text.into(),
            guidance: guidance.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_type_aliases() {
        assert_eq!("currency".parse::<AnswerType>().unwrap(), AnswerType::Double);
        assert_eq!("Percentage".parse::<AnswerType>().unwrap(), AnswerType::Double);
        assert_eq!("text".parse::<AnswerType>().unwrap(), AnswerType::String);
        assert_eq!("boolean".parse::<AnswerType>().unwrap(), AnswerType::Boolean);
        assert!("date".parse::<AnswerType>().is_err());
    }

    #[test]
    fn test_question_deserializes_without_guidance() {
        let json = r#"{
            "id": "mfn_01",
            "category": "MFN",
            "expected_type": "boolean",
            "text": "Is there an MFN provision?"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.id, "mfn_01");
        assert_eq!(q.expected_type, AnswerType::Boolean);
        assert!(q.guidance.is_empty());
    }
}
