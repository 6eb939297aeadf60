//! Source documents as ordered pages

use serde::{Deserialize, Serialize};

/// Opening of the page-marker token that precedes every page's text
///
/// A full marker is `[PAGE N]` on a line of its own.
pub const PAGE_MARKER_PREFIX: &str = "[PAGE ";

/// Format the marker for a page
pub fn page_marker(number: u32) -> String {
    format!("{}{}]", PAGE_MARKER_PREFIX, number)
}

/// Parse a line as a page marker, returning its page number
pub fn parse_page_marker(line: &str) -> Option<u32> {
    line.trim()
        .strip_prefix(PAGE_MARKER_PREFIX)?
        .strip_suffix(']')?
        .trim()
        .parse()
        .ok()
}

/// A single page of text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number
    #[serde(alias = "page_number", alias = "page")]
    pub number: u32,

    /// Extracted page text
    pub text: String,
}

impl Page {
    /// Create a page
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// An immutable document: an identifier and its pages in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier (deal id, file stem, ...)
    pub id: String,

    /// Pages in reading order
    pub pages: Vec<Page>,
}

impl Document {
    /// Create a document from pages
    pub fn new(id: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: id.into(),
            pages,
        }
    }

    /// Build a document from text whose pages are separated by form feeds,
    /// as emitted by common PDF-to-text converters
    pub fn from_form_feed_text(id: impl Into<String>, text: &str) -> Self {
        let mut pages: Vec<Page> = text
            .split('\u{c}')
            .enumerate()
            .map(|(idx, page_text)| Page::new(idx as u32 + 1, page_text))
            .collect();

        // A trailing form feed leaves an empty final segment
        if pages.len() > 1 && pages.last().is_some_and(|p| p.text.trim().is_empty()) {
            pages.pop();
        }

        Self::new(id, pages)
    }

    /// Build a document from text that already carries `[PAGE N]` markers
    ///
    /// Text before the first marker, or text without any marker, is
    /// attributed to page 1.
    pub fn from_page_marked_text(id: impl Into<String>, text: &str) -> Self {
        let mut pages: Vec<Page> = Vec::new();
        let mut current: Option<Page> = None;

        for line in text.lines() {
            if let Some(number) = parse_page_marker(line) {
                if let Some(page) = current.take() {
                    pages.push(page);
                }
                current = Some(Page::new(number, String::new()));
                continue;
            }

            let page = current.get_or_insert_with(|| Page::new(1, String::new()));
            page.text.push_str(line);
            page.text.push('\n');
        }

        if let Some(page) = current {
            pages.push(page);
        }

        Self::new(id, pages)
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Concatenate all pages, each preceded by its marker line
    ///
    /// This is the text the chunker windows over; every substring of it can
    /// be traced to a page through the nearest preceding marker.
    pub fn page_marked_text(&self) -> String {
        let capacity = self.pages.iter().map(|p| p.text.len() + 16).sum();
        let mut text = String::with_capacity(capacity);

        for page in &self.pages {
            text.push_str(&page_marker(page.number));
            text.push('\n');
            text.push_str(&page.text);
            if !page.text.ends_with('\n') {
                text.push('\n');
            }
        }

        text
    }
}
