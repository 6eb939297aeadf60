//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::{Color, Colorize};
use covenant_domain::{AnswerValue, Chunk, Confidence, ExtractionResult};
use covenant_extractor::{CatalogueDirectory, RouteResult};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest value or question text shown in a table cell
const MAX_CELL_CHARS: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format an extraction result.
    pub fn format_result(&self, result: &ExtractionResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
            OutputFormat::Table => Ok(self.format_result_table(result)),
        }
    }

    fn format_result_table(&self, result: &ExtractionResult) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Category", "Question", "Value", "Confidence", "Page", "Section"]);

        for (category, records) in &result.categories {
            for record in records {
                builder.push_record([
                    category.clone(),
                    record.question_id.clone(),
                    truncate(&format_value(&record.value)),
                    self.confidence(record.confidence),
                    record
                        .source_page
                        .map(|p| p.to_string())
                        .unwrap_or_default(),
                    record.source_section.clone().unwrap_or_default(),
                ]);
            }
        }

        let stats = &result.stats;
        let summary = format!(
            "{}: {}/{} answered ({} high, {} medium, {} low) from {} of {} chunks, {} model calls, {:.1}s",
            result.document_id,
            stats.total_answered,
            stats.total_questions,
            stats.high_confidence_count,
            stats.medium_confidence_count,
            stats.low_confidence_count,
            stats.chunks_processed,
            stats.chunk_count,
            stats.model_calls,
            stats.elapsed_seconds
        );

        let mut lines = vec![rounded(builder), self.info(&summary)];
        if stats.failed_chunks > 0 {
            lines.push(self.warning(&format!(
                "{} chunk(s) failed after retries",
                stats.failed_chunks
            )));
        }
        if stats.cancelled {
            lines.push(self.warning("Pass cancelled; result is partial and was not stored"));
        }
        lines.join("\n")
    }

    /// Format the chunks of a document.
    pub fn format_chunks(&self, chunks: &[Chunk]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = chunks
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "index": c.index,
                            "start": c.start,
                            "end": c.end,
                            "chars": c.len(),
                            "pages": c.pages,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if chunks.is_empty() {
                    return Ok(self.warning("Document is empty; no chunks."));
                }

                let mut builder = Builder::default();
                builder.push_record(["#", "Start", "End", "Chars", "Pages"]);
                for chunk in chunks {
                    let pages = match chunk.page_range() {
                        Some((first, last)) if first == last => first.to_string(),
                        Some((first, last)) => format!("{}-{}", first, last),
                        None => String::new(),
                    };
                    builder.push_record([
                        chunk.index.to_string(),
                        chunk.start.to_string(),
                        chunk.end.to_string(),
                        chunk.len().to_string(),
                        pages,
                    ]);
                }
                Ok(rounded(builder))
            }
        }
    }

    /// Format the question catalogue.
    pub fn format_questions(&self, catalogue: &CatalogueDirectory) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "categories": catalogue.category_list(),
                    "questions": catalogue.question_list(),
                });
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if catalogue.is_empty() {
                    return Ok(self.warning("Catalogue has no questions."));
                }

                let mut builder = Builder::default();
                builder.push_record(["Category", "ID", "Type", "Question"]);
                for question in catalogue.question_list() {
                    builder.push_record([
                        question.category.clone(),
                        question.id.clone(),
                        question.expected_type.as_str().to_string(),
                        truncate(&question.text),
                    ]);
                }
                Ok(rounded(builder))
            }
        }
    }

    /// Format the routing of a free-form question.
    pub fn format_route(&self, question: &str, route: &RouteResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let matches: Vec<serde_json::Value> = route
                    .matches
                    .iter()
                    .map(|m| serde_json::json!({ "category": m.category, "score": m.score }))
                    .collect();
                let json = serde_json::json!({
                    "question": question,
                    "matches": matches,
                    "question_ids": route.question_ids,
                    "is_specific": route.is_specific,
                });
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Table => {
                if route.matches.is_empty() {
                    return Ok(self.warning("No category matched; all questions apply."));
                }

                let mut builder = Builder::default();
                builder.push_record(["Category", "Score"]);
                for m in &route.matches {
                    builder.push_record([m.category.clone(), m.score.to_string()]);
                }
                let scope = if route.is_specific { "specific" } else { "broad" };
                Ok(format!(
                    "{}\n{}",
                    rounded(builder),
                    self.info(&format!(
                        "{} question(s), {} match",
                        route.question_ids.len(),
                        scope
                    ))
                ))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), Color::Green)
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), Color::Red)
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), Color::Blue)
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), Color::Yellow)
    }

    fn confidence(&self, confidence: Confidence) -> String {
        let color = match confidence {
            Confidence::High => Color::Green,
            Confidence::Medium => Color::Yellow,
            Confidence::Low => Color::Red,
            Confidence::None => Color::BrightBlack,
        };
        self.colorize(confidence.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: Color) -> String {
        if !self.color_enabled {
            return text.to_string();
        }
        text.color(color).to_string()
    }
}

/// Render an answer value for display.
pub fn format_value(value: &AnswerValue) -> String {
    match value {
        AnswerValue::Boolean(true) => "yes".to_string(),
        AnswerValue::Boolean(false) => "no".to_string(),
        AnswerValue::Integer(n) => n.to_string(),
        AnswerValue::Double(x) => x.to_string(),
        AnswerValue::Text(s) => s.clone(),
        AnswerValue::Multiselect(items) => items.join(", "),
        AnswerValue::NotFound => "-".to_string(),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    let mut short: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
    short.push('…');
    short
}

fn rounded(builder: Builder) -> String {
    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_domain::{AnswerRecord, ExtractionStats};
    use covenant_extractor::RouteMatch;
    use std::collections::BTreeMap;

    fn result() -> ExtractionResult {
        let mut categories = BTreeMap::new();
        categories.insert(
            "MFN".to_string(),
            vec![
                AnswerRecord {
                    question_id: "mfn_exists".to_string(),
                    value: AnswerValue::Boolean(true),
                    confidence: Confidence::High,
                    source_text: Some("most favored nation".to_string()),
                    source_page: Some(45),
                    source_section: Some("Section 2.14(d)".to_string()),
                },
                AnswerRecord {
                    question_id: "mfn_sunset".to_string(),
                    value: AnswerValue::NotFound,
                    confidence: Confidence::Low,
                    source_text: None,
                    source_page: None,
                    source_section: None,
                },
            ],
        );
        ExtractionResult {
            document_id: "acme-2024".to_string(),
            categories,
            stats: ExtractionStats {
                chunk_count: 3,
                chunks_processed: 2,
                model_calls: 2,
                high_confidence_count: 1,
                total_answered: 1,
                total_questions: 2,
                ..ExtractionStats::default()
            },
        }
    }

    #[test]
    fn test_result_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_result(&result()).unwrap();
        assert!(output.contains("Confidence"));
        assert!(output.contains("mfn_exists"));
        assert!(output.contains("Section 2.14(d)"));
        assert!(output.contains("1/2 answered"));
        assert!(!output.contains("cancelled"));
    }

    #[test]
    fn test_cancelled_result_is_flagged() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let mut result = result();
        result.stats.cancelled = true;
        let output = formatter.format_result(&result).unwrap();
        assert!(output.contains("Pass cancelled"));
    }

    #[test]
    fn test_result_json_is_the_serialized_result() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_result(&result()).unwrap();
        let parsed: ExtractionResult = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, result());
    }

    #[test]
    fn test_empty_chunks() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_chunks(&[]).unwrap();
        assert!(output.contains("no chunks"));
    }

    #[test]
    fn test_chunks_table_shows_page_range() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let chunk = Chunk {
            index: 0,
            start: 0,
            end: 120,
            pages: vec![1, 2],
            text: "x".repeat(120),
        };
        let output = formatter.format_chunks(&[chunk]).unwrap();
        assert!(output.contains("1-2"));
        assert!(output.contains("120"));
    }

    #[test]
    fn test_route_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let route = RouteResult {
            matches: vec![RouteMatch {
                category: "MFN".to_string(),
                score: 14,
            }],
            question_ids: vec!["mfn_exists".to_string()],
            is_specific: true,
        };
        let output = formatter.format_route("mfn?", &route).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["matches"][0]["score"], 14);
        assert_eq!(json["is_specific"], true);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&AnswerValue::Boolean(false)), "no");
        assert_eq!(format_value(&AnswerValue::Integer(12)), "12");
        assert_eq!(
            format_value(&AnswerValue::Multiselect(vec!["a".into(), "b".into()])),
            "a, b"
        );
        assert_eq!(format_value(&AnswerValue::NotFound), "-");
    }

    #[test]
    fn test_truncate_long_cells() {
        let long = "a".repeat(100);
        assert_eq!(truncate(&long).chars().count(), MAX_CELL_CHARS);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.confidence(Confidence::High), "high");
    }
}
