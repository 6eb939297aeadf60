//! Provenance backing an extracted answer

use serde::{Deserialize, Serialize};

/// Verbatim quote, page and section that justify an answer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// Exact text from the document
    pub source_text: String,

    /// 1-based page the quote was found on
    pub source_page: Option<u32>,

    /// Section reference (e.g. "Section 6.06(a)")
    pub source_section: Option<String>,
}

impl Provenance {
    /// Create provenance from a quote and page
    pub fn new(source_text: impl Into<String>, source_page: Option<u32>) -> Self {
        Self {
            source_text: source_text.into(),
            source_page,
            source_section: None,
        }
    }

    /// Attach a section reference
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.source_section = Some(section.into());
        self
    }

    /// True when there is nothing to cite
    pub fn is_empty(&self) -> bool {
        self.source_text.is_empty() && self.source_page.is_none() && self.source_section.is_none()
    }
}
