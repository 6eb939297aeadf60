//! Pass entry point

use crate::answer_extractor::AnswerExtractor;
use crate::assembler::ResultAssembler;
use crate::cancel::CancelToken;
use crate::chunking::Chunker;
use crate::config::{ChunkOverrides, ExtractorConfig};
use crate::controller::{ChunkProgress, CoverageController};
use crate::cost::{CostSink, TracingCostSink};
use crate::error::ExtractorError;
use crate::status::{InMemoryStatusStore, PassPhase, PassStatus, StatusStore};
use covenant_domain::{
    Document, ExtractionModel, ExtractionResult, QuestionDirectory, ResultSink,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Runs extraction passes over documents
///
/// One engine may serve many concurrent passes; each pass builds its own
/// controller and shares only the collaborators.
pub struct ExtractionEngine<M, D, S>
where
    M: ExtractionModel,
    D: QuestionDirectory,
    S: ResultSink,
{
    model: Arc<M>,
    directory: Arc<D>,
    sink: Arc<S>,
    cost_sink: Arc<dyn CostSink>,
    status: Arc<dyn StatusStore>,
    config: ExtractorConfig,
}

impl<M, D, S> ExtractionEngine<M, D, S>
where
    M: ExtractionModel,
    D: QuestionDirectory,
    S: ResultSink,
{
    /// Create an engine logging costs via `tracing` and tracking status in memory
    pub fn new(model: Arc<M>, directory: Arc<D>, sink: Arc<S>, config: ExtractorConfig) -> Self {
        Self {
            model,
            directory,
            sink,
            cost_sink: Arc::new(TracingCostSink),
            status: Arc::new(InMemoryStatusStore::new()),
            config,
        }
    }

    /// Use a different cost sink
    pub fn with_cost_sink(mut self, cost_sink: Arc<dyn CostSink>) -> Self {
        self.cost_sink = cost_sink;
        self
    }

    /// Use a different status store
    pub fn with_status_store(mut self, status: Arc<dyn StatusStore>) -> Self {
        self.status = status;
        self
    }

    /// Engine configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Status store the engine reports to
    pub fn status_store(&self) -> &Arc<dyn StatusStore> {
        &self.status
    }

    /// Answer every catalogue question for `document`
    ///
    /// Configuration is validated before any model call. A cancelled pass
    /// returns its partial result with `stats.cancelled` set and is not
    /// handed to the result sink.
    ///
    /// # Errors
    ///
    /// - `Config` for invalid chunking parameters
    /// - `Directory` if the catalogue cannot be loaded or has duplicate ids
    /// - `ModelUnavailable` if every dispatched chunk failed every retry
    /// - `Sink` if the result cannot be stored
    pub async fn run_pass(
        &self,
        document: &Document,
        overrides: Option<ChunkOverrides>,
        cancel: CancelToken,
    ) -> Result<ExtractionResult, ExtractorError> {
        let pass_id = Uuid::now_v7();
        self.report(pass_id, &document.id, PassPhase::Pending);

        let outcome = self.execute(pass_id, document, overrides, &cancel).await;
        match &outcome {
            Ok(result) if result.stats.cancelled => {
                self.report(pass_id, &document.id, PassPhase::Cancelled);
            }
            Ok(result) => {
                self.report(
                    pass_id,
                    &document.id,
                    PassPhase::Complete {
                        answered: result.stats.total_answered,
                        total: result.stats.total_questions,
                    },
                );
            }
            Err(e) => {
                error!("Pass {} for '{}' failed: {}", pass_id, document.id, e);
                self.report(pass_id, &document.id, PassPhase::Failed { error: e.to_string() });
            }
        }
        outcome
    }

    async fn execute(
        &self,
        pass_id: Uuid,
        document: &Document,
        overrides: Option<ChunkOverrides>,
        cancel: &CancelToken,
    ) -> Result<ExtractionResult, ExtractorError> {
        let config = match overrides {
            Some(overrides) => self.config.clone().with_overrides(&overrides),
            None => self.config.clone(),
        };
        config.validate()?;
        let chunker = Chunker::from_config(&config)?;

        let questions = self
            .directory
            .questions()
            .map_err(|e| ExtractorError::Directory(e.to_string()))?;
        let categories = self
            .directory
            .categories()
            .map_err(|e| ExtractorError::Directory(e.to_string()))?;
        {
            let mut ids = HashSet::new();
            if let Some(dup) = questions.iter().find(|q| !ids.insert(q.id.as_str())) {
                return Err(ExtractorError::Directory(format!(
                    "duplicate question id '{}'",
                    dup.id
                )));
            }
        }

        let text = document.page_marked_text();
        let chunks = chunker.chunks(&text);
        info!(
            "Pass {} for '{}': {} pages, {} chars, {} chunks, {} questions",
            pass_id,
            document.id,
            document.page_count(),
            chunks.char_len(),
            chunks.total(),
            questions.len()
        );

        let started = Instant::now();
        let extractor = AnswerExtractor::new(Arc::clone(&self.model), Arc::clone(&self.cost_sink), &config);
        let controller = CoverageController::new(&extractor, &config);

        let status = Arc::clone(&self.status);
        let document_id = document.id.clone();
        let on_progress = move |progress: ChunkProgress| {
            status.update(PassStatus {
                pass_id,
                document_id: document_id.clone(),
                phase: PassPhase::Extracting {
                    progress: (progress.chunk_index * 100 / progress.chunk_count.max(1)) as u8,
                    step: format!(
                        "chunk {} of {}, {} questions open",
                        progress.chunk_index + 1,
                        progress.chunk_count,
                        progress.open_questions
                    ),
                },
            });
        };

        let outcome = controller
            .run(&document.id, questions, chunks, cancel, on_progress)
            .await?;

        let result = ResultAssembler::assemble(&document.id, &categories, &outcome, started.elapsed());
        info!(
            "Pass {} for '{}' finished: {}/{} answered ({} high, {} medium, {} low), {} of {} chunks, {} calls",
            pass_id,
            document.id,
            result.stats.total_answered,
            result.stats.total_questions,
            result.stats.high_confidence_count,
            result.stats.medium_confidence_count,
            result.stats.low_confidence_count,
            result.stats.chunks_processed,
            result.stats.chunk_count,
            result.stats.model_calls
        );

        if !result.stats.cancelled {
            self.sink
                .store(&result)
                .map_err(|e| ExtractorError::Sink(e.to_string()))?;
        }

        Ok(result)
    }

    fn report(&self, pass_id: Uuid, document_id: &str, phase: PassPhase) {
        self.status.update(PassStatus {
            pass_id,
            document_id: document_id.to_string(),
            phase,
        });
    }
}
