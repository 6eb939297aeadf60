//! Result assembly from finalized question states

use crate::controller::CoverageOutcome;
use covenant_domain::{AnswerRecord, AnswerValue, Confidence, ExtractionResult, ExtractionStats};
use std::collections::BTreeMap;
use std::time::Duration;

/// Groups final answers by category and computes pass statistics
///
/// Pure: performs no I/O and reads the states without modifying them.
pub struct ResultAssembler;

impl ResultAssembler {
    /// Build the pass result
    ///
    /// Every category in `categories` appears in the output, even when it has
    /// no questions. When the pass was cancelled, questions still open are
    /// reported as "not found" with no provenance, whatever they held.
    pub fn assemble(
        document_id: &str,
        categories: &[String],
        outcome: &CoverageOutcome,
        elapsed: Duration,
    ) -> ExtractionResult {
        let mut grouped: BTreeMap<String, Vec<AnswerRecord>> = categories
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();

        let mut stats = ExtractionStats {
            elapsed_seconds: elapsed.as_secs_f64(),
            chunks_processed: outcome.chunks_processed,
            chunk_count: outcome.chunk_count,
            model_calls: outcome.model_calls,
            failed_chunks: outcome.failed_chunks,
            total_questions: outcome.states.len(),
            cancelled: outcome.cancelled,
            ..ExtractionStats::default()
        };

        for state in &outcome.states {
            let question = state.question();
            let record = match state.best() {
                // a cancelled pass reports only resolved questions
                _ if outcome.cancelled && state.is_open() => {
                    not_found(&question.id, Confidence::None)
                }
                Some(best) if best.is_found() => AnswerRecord {
                    question_id: question.id.clone(),
                    value: best.value.clone(),
                    confidence: best.confidence,
                    source_text: Some(best.provenance.source_text.clone())
                        .filter(|text| !text.is_empty()),
                    source_page: best.provenance.source_page,
                    source_section: best.provenance.source_section.clone(),
                },
                Some(best) => not_found(&question.id, best.confidence),
                None => not_found(&question.id, Confidence::None),
            };

            if record.is_answered() {
                stats.total_answered += 1;
                match record.confidence {
                    Confidence::High => stats.high_confidence_count += 1,
                    Confidence::Medium => stats.medium_confidence_count += 1,
                    Confidence::Low => stats.low_confidence_count += 1,
                    Confidence::None => {}
                }
            }

            grouped
                .entry(question.category.clone())
                .or_default()
                .push(record);
        }

        ExtractionResult {
            document_id: document_id.to_string(),
            categories: grouped,
            stats,
        }
    }
}

fn not_found(question_id: &str, confidence: Confidence) -> AnswerRecord {
    AnswerRecord {
        question_id: question_id.to_string(),
        value: AnswerValue::NotFound,
        confidence,
        source_text: None,
        source_page: None,
        source_section: None,
    }
}
