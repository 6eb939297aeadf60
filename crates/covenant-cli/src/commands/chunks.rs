//! Chunks command implementation.

use crate::cli::ChunksArgs;
use crate::config::Config;
use crate::document::load_document;
use crate::error::Result;
use crate::output::Formatter;
use covenant_domain::{Chunk, Document};
use covenant_extractor::{ChunkOverrides, Chunker, ExtractorConfig};

/// Execute the chunks command.
pub fn execute_chunks(args: ChunksArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let document = load_document(&args.document, None)?;
    let chunks = preview_chunks(&document, &config.extractor, args.chunking.into())?;
    println!("{}", formatter.format_chunks(&chunks)?);
    Ok(())
}

/// Chunk a document exactly as an extraction pass would.
pub fn preview_chunks(
    document: &Document,
    config: &ExtractorConfig,
    overrides: ChunkOverrides,
) -> Result<Vec<Chunk>> {
    let config = config.clone().with_overrides(&overrides);
    config.validate()?;
    let text = document.page_marked_text();
    Ok(Chunker::from_config(&config)?.chunks(&text).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_domain::Page;

    #[test]
    fn test_preview_matches_pass_chunking() {
        let document = Document::new(
            "doc",
            vec![Page::new(1, "a".repeat(90)), Page::new(2, "b".repeat(90))],
        );
        let overrides = ChunkOverrides {
            chunk_size: Some(110),
            chunk_overlap: Some(10),
        };

        let chunks = preview_chunks(&document, &ExtractorConfig::default(), overrides).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[1].start, 100);
        assert!(chunks[1].pages.contains(&2));
    }

    #[test]
    fn test_overlap_not_below_size_is_rejected() {
        let document = Document::new("doc", vec![Page::new(1, "text")]);
        let overrides = ChunkOverrides {
            chunk_size: Some(10),
            chunk_overlap: Some(10),
        };
        assert!(preview_chunks(&document, &ExtractorConfig::default(), overrides).is_err());
    }
}
