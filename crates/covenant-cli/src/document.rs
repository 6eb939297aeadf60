//! Document loading.
//!
//! Three inputs are understood:
//! - `.json`: an array of `{"page": 1, "text": "..."}` objects
//! - text containing form feeds: one page per `\f`-separated segment
//! - any other text: `[PAGE N]` marker lines, or a single page without them

use crate::error::{CliError, Result};
use covenant_domain::{Document, Page};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct JsonPage {
    #[serde(alias = "number")]
    page: u32,
    text: String,
}

/// Load a document, using the file stem as its id unless one is given.
pub fn load_document(path: &Path, document_id: Option<&str>) -> Result<Document> {
    let id = match document_id {
        Some(id) => id.to_string(),
        None => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                CliError::InvalidInput(format!("Cannot derive a document id from {}", path.display()))
            })?,
    };

    let contents = fs::read_to_string(path)
        .map_err(|e| CliError::InvalidInput(format!("Failed to read {}: {}", path.display(), e)))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        parse_json_pages(id, &contents)
    } else {
        Ok(parse_text(id, &contents))
    }
}

fn parse_json_pages(id: String, contents: &str) -> Result<Document> {
    let pages: Vec<JsonPage> = serde_json::from_str(contents)?;
    if let Some(page) = pages.iter().find(|p| p.page == 0) {
        return Err(CliError::InvalidInput(format!(
            "Page numbers start at 1 (found page {})",
            page.page
        )));
    }
    Ok(Document::new(
        id,
        pages
            .into_iter()
            .map(|p| Page::new(p.page, p.text))
            .collect(),
    ))
}

fn parse_text(id: String, contents: &str) -> Document {
    if contents.contains('\u{c}') {
        Document::from_form_feed_text(id, contents)
    } else {
        Document::from_page_marked_text(id, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_json_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "acme.json",
            r#"[{"page": 1, "text": "CREDIT AGREEMENT"}, {"page": 2, "text": "Section 2.14"}]"#,
        );

        let doc = load_document(&path, None).unwrap();
        assert_eq!(doc.id, "acme");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].number, 2);
        assert_eq!(doc.pages[1].text, "Section 2.14");
    }

    #[test]
    fn test_json_rejects_page_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.json", r#"[{"page": 0, "text": "x"}]"#);
        assert!(matches!(
            load_document(&path, None),
            Err(CliError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_form_feed_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "acme.txt", "first page\u{c}second page\u{c}");

        let doc = load_document(&path, Some("acme-2024")).unwrap();
        assert_eq!(doc.id, "acme-2024");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].text, "second page");
    }

    #[test]
    fn test_page_marked_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "acme.txt", "[PAGE 3]\nalpha\n[PAGE 4]\nbeta\n");

        let doc = load_document(&path, None).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[0].number, 3);
        assert_eq!(doc.pages[1].text, "beta\n");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_document(&dir.path().join("absent.txt"), None).unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }
}
