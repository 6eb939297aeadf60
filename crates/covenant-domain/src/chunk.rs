//! Overlapping windows over page-marked document text

use serde::{Deserialize, Serialize};

/// A contiguous slice of the page-marked document text
///
/// Offsets are character (not byte) offsets into the full text. For
/// consecutive chunks `a`, `b` produced with overlap `o`,
/// `a.end - o == b.start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the chunk sequence (0-based)
    pub index: usize,

    /// Start character offset (inclusive)
    pub start: usize,

    /// End character offset (exclusive)
    pub end: usize,

    /// Page numbers the chunk spans, ascending
    pub pages: Vec<u32>,

    /// The chunk text, page markers preserved verbatim
    pub text: String,
}

impl Chunk {
    /// Length in characters
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Chunks are never empty; provided for completeness
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// First and last page spanned
    pub fn page_range(&self) -> Option<(u32, u32)> {
        Some((*self.pages.first()?, *self.pages.last()?))
    }

    /// Whether the chunk spans the given page
    pub fn contains_page(&self, page: u32) -> bool {
        self.pages.binary_search(&page).is_ok()
    }
}
