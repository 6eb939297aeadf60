//! One model call per chunk, turned into typed candidates

use crate::config::ExtractorConfig;
use crate::cost::{CostSink, UsageRecord};
use crate::error::ExtractorError;
use crate::parser::{parse_model_response, ParseLimits};
use crate::prompt::PromptBuilder;
use covenant_domain::{AnswerCandidate, Chunk, ExtractionModel, ModelRequest, Question};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Answers a batch of open questions against one chunk
pub struct AnswerExtractor<M>
where
    M: ExtractionModel,
{
    model: Arc<M>,
    cost_sink: Arc<dyn CostSink>,
    call_timeout: Duration,
    max_output_tokens: u32,
    limits: ParseLimits,
}

impl<M> AnswerExtractor<M>
where
    M: ExtractionModel,
{
    /// Create a new answer extractor
    pub fn new(model: Arc<M>, cost_sink: Arc<dyn CostSink>, config: &ExtractorConfig) -> Self {
        Self {
            model,
            cost_sink,
            call_timeout: config.call_timeout(),
            max_output_tokens: config.max_output_tokens,
            limits: ParseLimits::from(config),
        }
    }

    /// Make one model call for `chunk` and `questions`
    ///
    /// A response that cannot be parsed yields a "not found" candidate at
    /// LOW for every question.
    ///
    /// # Errors
    ///
    /// `ExtractorError::Timeout` if the call exceeds the per-call timeout and
    /// `ExtractorError::Transient` if the model reports an error. Both are
    /// retried by the coverage controller.
    pub async fn extract(
        &self,
        document_id: &str,
        chunk: &Chunk,
        total_chunks: usize,
        questions: &[&Question],
    ) -> Result<Vec<AnswerCandidate>, ExtractorError> {
        let prompt = PromptBuilder::new(chunk, total_chunks, questions).build();
        debug!(
            "Chunk {}: prompt {} chars, {} questions",
            chunk.index,
            prompt.len(),
            questions.len()
        );

        let request = ModelRequest {
            prompt,
            max_output_tokens: self.max_output_tokens,
        };

        let started = Instant::now();
        let response = timeout(self.call_timeout, self.model.complete(request))
            .await
            .map_err(|_| ExtractorError::Timeout(self.call_timeout.as_secs()))?
            .map_err(|e| ExtractorError::Transient(e.to_string()))?;

        self.cost_sink.record(UsageRecord {
            document_id: document_id.to_string(),
            step: format!("chunk_{}", chunk.index),
            model: self.model.model_name().to_string(),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            duration: started.elapsed(),
        });

        debug!("Chunk {}: response {} chars", chunk.index, response.text.len());

        match parse_model_response(&response.text, chunk, questions, &self.limits) {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                warn!(
                    "Chunk {}: {}; recording all {} questions as not found",
                    chunk.index,
                    e,
                    questions.len()
                );
                Ok(questions
                    .iter()
                    .map(|q| AnswerCandidate::not_found(&q.id, chunk.index))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostLedger;
    use covenant_domain::{AnswerType, AnswerValue, Confidence};
    use covenant_llm::MockModel;

    fn chunk() -> Chunk {
        Chunk {
            index: 0,
            start: 0,
            end: 32,
            pages: vec![1],
            text: "[PAGE 1]\nThe MFN sunset is 12 months.".to_string(),
        }
    }

    fn questions() -> Vec<Question> {
        vec![
            Question::new("mfn_sunset", "MFN", AnswerType::Integer, "MFN sunset?", ""),
            Question::new("mfn_exists", "MFN", AnswerType::Boolean, "MFN exists?", ""),
        ]
    }

    fn extractor(model: MockModel, ledger: Arc<CostLedger>) -> AnswerExtractor<MockModel> {
        AnswerExtractor::new(Arc::new(model), ledger, &ExtractorConfig::default())
    }

    #[tokio::test]
    async fn test_extract_parses_candidates_and_records_usage() {
        let model = MockModel::new(
            r#"[{"question_id": "mfn_sunset", "value": 12, "confidence": "high",
                 "source_text": "The MFN sunset is 12 months.", "source_page": 1}]"#,
        );
        let ledger = Arc::new(CostLedger::new());
        let extractor = extractor(model.clone(), ledger.clone());
        let qs = questions();
        let refs: Vec<&Question> = qs.iter().collect();

        let candidates = extractor.extract("doc", &chunk(), 1, &refs).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].value, AnswerValue::Integer(12));
        assert_eq!(model.call_count(), 1);

        let records = ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].step, "chunk_0");
        assert_eq!(records[0].model, "mock-model");
    }

    #[tokio::test]
    async fn test_malformed_response_marks_all_not_found() {
        let model = MockModel::new("I could not find anything useful.");
        let extractor = extractor(model, Arc::new(CostLedger::new()));
        let qs = questions();
        let refs: Vec<&Question> = qs.iter().collect();

        let candidates = extractor.extract("doc", &chunk(), 1, &refs).await.unwrap();

        assert_eq!(candidates.len(), 2);
        for candidate in candidates {
            assert_eq!(candidate.value, AnswerValue::NotFound);
            assert_eq!(candidate.confidence, Confidence::Low);
        }
    }

    #[tokio::test]
    async fn test_model_error_is_transient() {
        let mut model = MockModel::default();
        model.add_error("[PAGE 1]");
        let ledger = Arc::new(CostLedger::new());
        let extractor = extractor(model, ledger.clone());
        let qs = questions();
        let refs: Vec<&Question> = qs.iter().collect();

        let result = extractor.extract("doc", &chunk(), 1, &refs).await;
        assert!(matches!(result, Err(ExtractorError::Transient(_))));
        assert!(ledger.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let mut model = MockModel::default();
        model.add_delay("[PAGE 1]", Duration::from_secs(600), "[]");
        let extractor = extractor(model, Arc::new(CostLedger::new()));
        let qs = questions();
        let refs: Vec<&Question> = qs.iter().collect();

        let result = extractor.extract("doc", &chunk(), 1, &refs).await;
        assert!(matches!(result, Err(ExtractorError::Timeout(180))));
    }
}
