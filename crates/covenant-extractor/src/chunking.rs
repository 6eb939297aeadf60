//! Overlapping, page-traceable chunking of page-marked text
//!
//! Windows are measured in characters. Each chunk after the first starts
//! `overlap` characters before the previous one ended, so a clause shorter
//! than the overlap that straddles a boundary appears whole in one chunk.

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use covenant_domain::Chunk;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\[PAGE (\d+)\][ \t]*$").expect("page marker pattern is valid")
});

/// Positions of page markers, in character offsets
#[derive(Debug, Clone, Default)]
pub struct PageIndex {
    markers: Vec<(usize, u32)>,
}

impl PageIndex {
    /// Index every `[PAGE N]` marker line in the text
    pub fn build(text: &str) -> Self {
        let mut markers = Vec::new();
        let mut last_byte = 0;
        let mut chars_before = 0;

        for caps in PAGE_MARKER.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            chars_before += text[last_byte..whole.start()].chars().count();
            last_byte = whole.start();

            if let Some(number) = caps.get(1).and_then(|m| m.as_str().parse().ok()) {
                markers.push((chars_before, number));
            }
        }

        Self { markers }
    }

    /// Page of the nearest marker at or before `offset`
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        let idx = self.markers.partition_point(|(pos, _)| *pos <= offset);
        idx.checked_sub(1).map(|i| self.markers[i].1)
    }

    /// Pages spanned by `[start, end)`, ascending and deduplicated
    pub fn pages_in(&self, start: usize, end: usize) -> Vec<u32> {
        let mut pages: Vec<u32> = self.page_at(start).into_iter().collect();
        pages.extend(
            self.markers
                .iter()
                .filter(|(pos, _)| *pos > start && *pos < end)
                .map(|(_, page)| *page),
        );
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// Number of markers found
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// True if the text carried no markers
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Page of the last marker line that starts before byte position `pos` of `text`
pub fn page_before(text: &str, pos: usize) -> Option<u32> {
    let pos = floor_char_boundary(text, pos);
    PAGE_MARKER
        .captures_iter(&text[..pos])
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Splits page-marked text into overlapping windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker
    ///
    /// # Errors
    ///
    /// `ExtractorError::Config` if `chunk_size` is zero or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ExtractorError> {
        if chunk_size == 0 {
            return Err(ExtractorError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ExtractorError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from engine configuration
    pub fn from_config(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Target chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Number of chunks a text of `char_len` characters yields
    pub fn chunk_count(&self, char_len: usize) -> usize {
        if char_len == 0 {
            return 0;
        }
        if char_len <= self.chunk_size {
            return 1;
        }
        let stride = self.chunk_size - self.overlap;
        1 + (char_len - self.chunk_size).div_ceil(stride)
    }

    /// Iterate over the chunks of `text`
    ///
    /// The iterator is cheap to clone; cloning (or calling `chunks` again)
    /// restarts the sequence.
    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());

        Chunks {
            text,
            offsets: Arc::new(offsets),
            pages: Arc::new(PageIndex::build(text)),
            chunker: *self,
            next_start: Some(0),
            index: 0,
        }
    }
}

/// Iterator over the chunks of one text
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    offsets: Arc<Vec<usize>>,
    pages: Arc<PageIndex>,
    chunker: Chunker,
    next_start: Option<usize>,
    index: usize,
}

impl Chunks<'_> {
    /// Total characters in the text
    pub fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total chunks in the full sequence
    pub fn total(&self) -> usize {
        self.chunker.chunk_count(self.char_len())
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let start = self.next_start?;
        let total = self.char_len();

        if start >= total {
            self.next_start = None;
            return None;
        }

        let end = (start + self.chunker.chunk_size).min(total);
        let chunk = Chunk {
            index: self.index,
            start,
            end,
            pages: self.pages.pages_in(start, end),
            text: self.text[self.offsets[start]..self.offsets[end]].to_string(),
        };

        self.next_start = if end == total {
            None
        } else {
            Some(end - self.chunker.overlap)
        };
        self.index += 1;

        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_domain::{Document, Page};
    use proptest::prelude::*;

    #[test]
    fn test_overlap_not_less_than_size_is_rejected() {
        assert!(matches!(Chunker::new(100, 100), Err(ExtractorError::Config(_))));
        assert!(matches!(Chunker::new(100, 150), Err(ExtractorError::Config(_))));
        assert!(matches!(Chunker::new(0, 0), Err(ExtractorError::Config(_))));
    }

    #[test]
    fn test_small_text_is_one_chunk() {
        let chunker = Chunker::new(100, 10).unwrap();
        let chunks: Vec<_> = chunker.chunks("Short text here.").collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short text here.");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 16));
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = Chunker::new(100, 10).unwrap();
        assert_eq!(chunker.chunks("").count(), 0);
        assert_eq!(chunker.chunk_count(0), 0);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = Chunker::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks: Vec<_> = chunker.chunks(text).collect();

        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "hijklmnopq");
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end - 3, pair[1].start);
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.end, 26);
        assert!(!last.is_empty());
    }

    #[test]
    fn test_multibyte_text_uses_char_offsets() {
        let chunker = Chunker::new(4, 1).unwrap();
        let text = "§§§§§§§";
        let chunks: Vec<_> = chunker.chunks(text).collect();
        assert_eq!(chunks[0].text, "§§§§");
        assert_eq!(chunks[1].start, 3);
        assert_eq!(chunks[1].text, "§§§§");
    }

    #[test]
    fn test_chunks_record_pages() {
        let doc = Document::new(
            "d",
            vec![
                Page::new(1, "a".repeat(40)),
                Page::new(2, "b".repeat(40)),
                Page::new(3, "c".repeat(40)),
            ],
        );
        let text = doc.page_marked_text();
        let chunker = Chunker::new(60, 10).unwrap();
        let chunks: Vec<_> = chunker.chunks(&text).collect();

        assert_eq!(chunks[0].pages, vec![1, 2]);
        assert!(chunks[0].text.starts_with("[PAGE 1]"));
        assert_eq!(chunks.last().unwrap().pages.last(), Some(&3));
        for chunk in &chunks {
            assert!(!chunk.pages.is_empty());
        }
    }

    #[test]
    fn test_iterator_is_restartable() {
        let chunker = Chunker::new(8, 2).unwrap();
        let text = "0123456789abcdefghij";
        let mut first = chunker.chunks(text);
        first.next();
        let restarted = chunker.chunks(text);
        let copy = restarted.clone();
        assert_eq!(restarted.collect::<Vec<_>>(), copy.collect::<Vec<_>>());
        assert_eq!(first.next().map(|c| c.index), Some(1));
    }

    #[test]
    fn test_page_index() {
        let text = "[PAGE 4]\nfoo\n[PAGE 5]\nbar\n";
        let index = PageIndex::build(text);
        assert_eq!(index.len(), 2);
        assert_eq!(index.page_at(0), Some(4));
        assert_eq!(index.page_at(12), Some(4));
        assert_eq!(index.page_at(13), Some(5));
        assert_eq!(index.pages_in(0, 26), vec![4, 5]);
    }

    #[test]
    fn test_page_before() {
        let text = "[PAGE 7]\nalpha\n[PAGE 8]\nbeta";
        let pos = text.find("beta").unwrap();
        assert_eq!(page_before(text, pos), Some(8));
        assert_eq!(page_before(text, 3), None);
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_text_without_gaps(
            len in 0usize..2_000,
            size in 1usize..300,
            overlap_frac in 0.0f64..1.0,
        ) {
            let overlap = ((size as f64) * overlap_frac) as usize;
            prop_assume!(overlap < size);
            let text = "x".repeat(len);
            let chunker = Chunker::new(size, overlap).unwrap();
            let chunks: Vec<_> = chunker.chunks(&text).collect();

            prop_assert_eq!(chunks.len(), chunker.chunk_count(len));
            if len == 0 {
                prop_assert!(chunks.is_empty());
            } else {
                prop_assert_eq!(chunks[0].start, 0);
                prop_assert_eq!(chunks.last().unwrap().end, len);
                for pair in chunks.windows(2) {
                    prop_assert_eq!(pair[0].end - overlap, pair[1].start);
                    prop_assert!(pair[1].start <= pair[0].end);
                }
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.index, i);
                    prop_assert!(!chunk.is_empty());
                    prop_assert!(chunk.len() <= size);
                }
            }
        }
    }
}
