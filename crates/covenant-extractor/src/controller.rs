//! Coverage controller: the per-pass state machine over chunks
//!
//! Chunks are visited strictly in order because each chunk's open-question
//! set depends on what earlier chunks resolved. A question leaves the open
//! set as soon as it holds a HIGH answer; the pass halts early once nothing
//! is open, and every question still open after the last chunk is resolved
//! with whatever it holds.

use crate::answer_extractor::AnswerExtractor;
use crate::cancel::CancelToken;
use crate::chunking::Chunks;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use covenant_domain::{AnswerCandidate, Chunk, Confidence, ExtractionModel, Question};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Lifecycle of a question within one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    /// Still offered to upcoming chunks
    Open,
    /// Frozen; never offered again
    Resolved,
}

/// Best-so-far answer for one question
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionState {
    question: Question,
    best: Option<AnswerCandidate>,
    status: QuestionStatus,
}

impl QuestionState {
    /// Fresh, open state with no candidate
    pub fn new(question: Question) -> Self {
        Self {
            question,
            best: None,
            status: QuestionStatus::Open,
        }
    }

    /// The question
    pub fn question(&self) -> &Question {
        &self.question
    }

    /// Retained candidate, if any
    pub fn best(&self) -> Option<&AnswerCandidate> {
        self.best.as_ref()
    }

    /// Confidence of the retained candidate; `None` when nothing is recorded
    pub fn best_confidence(&self) -> Confidence {
        self.best
            .as_ref()
            .map(|c| c.confidence)
            .unwrap_or(Confidence::None)
    }

    /// Current status
    pub fn status(&self) -> QuestionStatus {
        self.status
    }

    /// Whether the question is still offered to chunks
    pub fn is_open(&self) -> bool {
        self.status == QuestionStatus::Open
    }

    /// Offer a candidate; returns whether it became the new best
    ///
    /// A candidate is retained only if nothing is recorded yet or its
    /// confidence is strictly higher than the recorded one. At equal
    /// confidence the earlier candidate stays, except that a found value
    /// replaces a recorded "not found". A HIGH best resolves the question.
    pub fn offer(&mut self, candidate: AnswerCandidate) -> bool {
        if self.status == QuestionStatus::Resolved {
            return false;
        }

        let replace = self
            .best
            .as_ref()
            .is_none_or(|best| candidate.supersedes(best));

        if replace {
            self.best = Some(candidate);
            if self.best_confidence().is_conclusive() {
                self.status = QuestionStatus::Resolved;
            }
        }
        replace
    }

    /// Freeze the question with whatever it holds
    pub fn resolve(&mut self) {
        self.status = QuestionStatus::Resolved;
    }
}

/// Progress notification emitted before each chunk is dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Chunk about to be dispatched
    pub chunk_index: usize,
    /// Chunks in the document
    pub chunk_count: usize,
    /// Questions still open
    pub open_questions: usize,
}

/// Final states and counters of a coverage run
#[derive(Debug, Clone)]
pub struct CoverageOutcome {
    /// One state per question, in catalogue order
    pub states: Vec<QuestionState>,
    /// Chunks dispatched
    pub chunks_processed: usize,
    /// Chunks the document was split into
    pub chunk_count: usize,
    /// Model invocations including retries
    pub model_calls: usize,
    /// Chunks whose every attempt failed
    pub failed_chunks: usize,
    /// The run stopped because cancellation was requested
    pub cancelled: bool,
}

enum ChunkAttempt {
    Answered(Vec<AnswerCandidate>),
    Failed(ExtractorError),
    Cancelled,
}

/// Drives the answer extractor over the chunks of one document
pub struct CoverageController<'a, M>
where
    M: ExtractionModel,
{
    extractor: &'a AnswerExtractor<M>,
    config: &'a ExtractorConfig,
}

impl<'a, M> CoverageController<'a, M>
where
    M: ExtractionModel,
{
    /// Create a controller for one pass
    pub fn new(extractor: &'a AnswerExtractor<M>, config: &'a ExtractorConfig) -> Self {
        Self { extractor, config }
    }

    /// Run the pass over `chunks`
    ///
    /// # Errors
    ///
    /// `ExtractorError::ModelUnavailable` when every dispatched chunk
    /// exhausted its retries. Per-chunk failures are otherwise absorbed.
    pub async fn run<F>(
        &self,
        document_id: &str,
        questions: Vec<Question>,
        chunks: Chunks<'_>,
        cancel: &CancelToken,
        mut on_progress: F,
    ) -> Result<CoverageOutcome, ExtractorError>
    where
        F: FnMut(ChunkProgress) + Send,
    {
        let chunk_count = chunks.total();
        let mut states: Vec<QuestionState> = questions.into_iter().map(QuestionState::new).collect();
        let positions: HashMap<String, usize> = states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.question.id.clone(), i))
            .collect();

        let mut outcome = CoverageOutcome {
            states: Vec::new(),
            chunks_processed: 0,
            chunk_count,
            model_calls: 0,
            failed_chunks: 0,
            cancelled: false,
        };
        let mut last_error: Option<ExtractorError> = None;

        for chunk in chunks {
            if cancel.is_cancelled() {
                info!("Pass for '{}' cancelled before chunk {}", document_id, chunk.index);
                outcome.cancelled = true;
                break;
            }

            let open: Vec<&Question> = states
                .iter()
                .filter(|s| s.is_open())
                .map(|s| &s.question)
                .collect();
            if open.is_empty() {
                info!(
                    "All questions resolved after {} of {} chunks",
                    outcome.chunks_processed, chunk_count
                );
                break;
            }

            on_progress(ChunkProgress {
                chunk_index: chunk.index,
                chunk_count,
                open_questions: open.len(),
            });
            info!(
                "Chunk {}/{}: {} open questions, pages {:?}",
                chunk.index + 1,
                chunk_count,
                open.len(),
                chunk.page_range()
            );

            let attempt = self
                .extract_with_retry(document_id, &chunk, chunk_count, &open, cancel, &mut outcome.model_calls)
                .await;
            outcome.chunks_processed += 1;

            match attempt {
                ChunkAttempt::Answered(candidates) => {
                    for candidate in candidates {
                        let Some(&pos) = positions.get(&candidate.question_id) else {
                            continue;
                        };
                        let state = &mut states[pos];
                        let confidence = candidate.confidence;
                        if state.offer(candidate) {
                            debug!(
                                "'{}' best is now {} from chunk {}",
                                state.question.id, confidence, chunk.index
                            );
                        }
                    }
                }
                ChunkAttempt::Failed(e) => {
                    warn!("Chunk {} contributed no answers: {}", chunk.index, e);
                    outcome.failed_chunks += 1;
                    last_error = Some(e);
                }
                ChunkAttempt::Cancelled => {
                    info!("Pass for '{}' cancelled during chunk {}", document_id, chunk.index);
                    outcome.cancelled = true;
                    break;
                }
            }
        }

        if !outcome.cancelled
            && outcome.chunks_processed > 0
            && outcome.failed_chunks == outcome.chunks_processed
        {
            return Err(ExtractorError::ModelUnavailable {
                chunks: outcome.failed_chunks,
                last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
            });
        }

        if !outcome.cancelled {
            for state in states.iter_mut().filter(|s| s.is_open()) {
                state.resolve();
            }
        }

        outcome.states = states;
        Ok(outcome)
    }

    async fn extract_with_retry(
        &self,
        document_id: &str,
        chunk: &Chunk,
        chunk_count: usize,
        questions: &[&Question],
        cancel: &CancelToken,
        model_calls: &mut usize,
    ) -> ChunkAttempt {
        let mut attempt = 0;
        loop {
            *model_calls += 1;
            match self
                .extractor
                .extract(document_id, chunk, chunk_count, questions)
                .await
            {
                Ok(candidates) => return ChunkAttempt::Answered(candidates),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = self.config.retry_backoff(attempt);
                    warn!(
                        "Chunk {} attempt {} failed ({}), retrying in {:?}",
                        chunk.index, attempt, e, backoff
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = cancel.cancelled() => return ChunkAttempt::Cancelled,
                    }
                }
                Err(e) => return ChunkAttempt::Failed(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covenant_domain::{AnswerType, AnswerValue, Provenance};

    fn question() -> Question {
        Question::new("q1", "Cat", AnswerType::String, "What?", "")
    }

    fn candidate(value: &str, confidence: Confidence, chunk_index: usize) -> AnswerCandidate {
        AnswerCandidate {
            question_id: "q1".to_string(),
            value: AnswerValue::Text(value.to_string()),
            confidence,
            provenance: Provenance::new(value, Some(1)),
            chunk_index,
        }
    }

    #[test]
    fn test_first_candidate_is_retained() {
        let mut state = QuestionState::new(question());
        assert_eq!(state.best_confidence(), Confidence::None);
        assert!(state.offer(candidate("a", Confidence::Low, 0)));
        assert_eq!(state.best_confidence(), Confidence::Low);
        assert!(state.is_open());
    }

    #[test]
    fn test_only_strict_improvement_replaces() {
        let mut state = QuestionState::new(question());
        state.offer(candidate("a", Confidence::Medium, 0));
        assert!(!state.offer(candidate("b", Confidence::Medium, 1)));
        assert!(!state.offer(candidate("c", Confidence::Low, 2)));
        assert_eq!(state.best().unwrap().chunk_index, 0);

        assert!(state.offer(candidate("d", Confidence::High, 3)));
        assert_eq!(state.best().unwrap().chunk_index, 3);
    }

    #[test]
    fn test_high_resolves_and_freezes() {
        let mut state = QuestionState::new(question());
        state.offer(candidate("a", Confidence::High, 0));
        assert_eq!(state.status(), QuestionStatus::Resolved);
        assert!(!state.offer(candidate("b", Confidence::High, 1)));
        assert_eq!(state.best().unwrap().chunk_index, 0);
    }

    #[test]
    fn test_found_value_replaces_not_found_at_equal_confidence() {
        let mut state = QuestionState::new(question());
        state.offer(AnswerCandidate::not_found("q1", 0));
        assert!(state.offer(candidate("a", Confidence::Low, 1)));
        assert!(!state.offer(AnswerCandidate::not_found("q1", 2)));
        assert_eq!(state.best().unwrap().chunk_index, 1);
    }

    #[test]
    fn test_resolve_freezes_open_state() {
        let mut state = QuestionState::new(question());
        state.resolve();
        assert!(!state.offer(candidate("a", Confidence::Medium, 0)));
        assert!(state.best().is_none());
    }
}
