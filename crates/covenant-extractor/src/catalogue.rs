//! Question catalogue loaded from TOML
//!
//! ```toml
//! [[categories]]
//! name = "MFN"
//! order = 1
//! description = "Most favored nation protection"
//!
//! [[questions]]
//! id = "mfn_01"
//! category = "MFN"
//! answer_type = "boolean"
//! text = "Is there an MFN provision?"
//! guidance = "Look in the incremental facilities section"
//! order = 1
//! ```

use crate::error::ExtractorError;
use covenant_domain::{AnswerType, Question, QuestionDirectory};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Category metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Display name, referenced by questions
    pub name: String,

    /// Display position
    #[serde(default)]
    pub order: u32,

    /// Free-text description, used for topic routing
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct QuestionEntry {
    id: String,
    category: String,
    answer_type: String,
    text: String,
    #[serde(default)]
    guidance: String,
    #[serde(default)]
    order: u32,
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    questions: Vec<QuestionEntry>,
}

/// In-memory, validated question catalogue
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogueDirectory {
    categories: Vec<Category>,
    questions: Vec<Question>,
}

impl CatalogueDirectory {
    /// Build a catalogue, validating and ordering it
    ///
    /// Questions are ordered by their category's position, then by their own
    /// position within it, then by input order.
    ///
    /// # Errors
    ///
    /// `ExtractorError::Directory` for duplicate category names, duplicate
    /// question ids or questions naming an unknown category.
    pub fn new(mut categories: Vec<Category>, questions: Vec<(Question, u32)>) -> Result<Self, ExtractorError> {
        let mut seen = HashSet::new();
        for category in &categories {
            if !seen.insert(category.name.as_str()) {
                return Err(ExtractorError::Directory(format!(
                    "duplicate category '{}'",
                    category.name
                )));
            }
        }
        categories.sort_by_key(|c| c.order);

        let position: HashMap<&str, usize> = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.as_str(), i))
            .collect();

        let mut ids = HashSet::new();
        let mut ordered = Vec::with_capacity(questions.len());
        for (question, order) in questions {
            let Some(&cat_pos) = position.get(question.category.as_str()) else {
                return Err(ExtractorError::Directory(format!(
                    "question '{}' references unknown category '{}'",
                    question.id, question.category
                )));
            };
            if !ids.insert(question.id.clone()) {
                return Err(ExtractorError::Directory(format!(
                    "duplicate question id '{}'",
                    question.id
                )));
            }
            ordered.push((cat_pos, order, question));
        }
        ordered.sort_by_key(|(cat_pos, order, _)| (*cat_pos, *order));

        Ok(Self {
            categories,
            questions: ordered.into_iter().map(|(_, _, q)| q).collect(),
        })
    }

    /// Parse a catalogue from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        let file: CatalogueFile = toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Directory(format!("invalid catalogue: {}", e)))?;

        let mut questions = Vec::with_capacity(file.questions.len());
        for entry in file.questions {
            let expected_type: AnswerType = entry.answer_type.parse().map_err(|e| {
                ExtractorError::Directory(format!("question '{}': {}", entry.id, e))
            })?;
            questions.push((
                Question::new(entry.id, entry.category, expected_type, entry.text, entry.guidance),
                entry.order,
            ));
        }

        Self::new(file.categories, questions)
    }

    /// Load a catalogue file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractorError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ExtractorError::Directory(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Category metadata in display order
    pub fn category_list(&self) -> &[Category] {
        &self.categories
    }

    /// Questions in catalogue order
    pub fn question_list(&self) -> &[Question] {
        &self.questions
    }

    /// Look up a question
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Number of questions
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// True if the catalogue has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl QuestionDirectory for CatalogueDirectory {
    type Error = ExtractorError;

    fn questions(&self) -> Result<Vec<Question>, Self::Error> {
        Ok(self.questions.clone())
    }

    fn categories(&self) -> Result<Vec<String>, Self::Error> {
        Ok(self.categories.iter().map(|c| c.name.clone()).collect())
    }
}
