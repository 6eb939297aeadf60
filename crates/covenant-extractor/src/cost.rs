//! Token usage and cost accounting for model calls
//!
//! Pricing lives here rather than in configuration because it is vendor
//! pricing that changes independently of the engine. Unknown models are
//! costed at zero with a warning.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

/// Per-1K-token rates in USD: (model, input, output)
const MODEL_PRICING: &[(&str, f64, f64)] = &[
    ("claude-sonnet-4-20250514", 0.003, 0.015),
    ("claude-sonnet-4-5-20250929", 0.003, 0.015),
    ("claude-opus-4-20250514", 0.015, 0.075),
    ("claude-opus-4-5-20251101", 0.015, 0.075),
    ("claude-haiku-4-5-20251001", 0.0008, 0.004),
];

/// Look up (input, output) rates per 1K tokens
pub fn model_rates(model: &str) -> Option<(f64, f64)> {
    MODEL_PRICING
        .iter()
        .find(|(name, _, _)| *name == model)
        .map(|(_, input, output)| (*input, *output))
}

/// Token usage of a single model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Document the call was made for
    pub document_id: String,

    /// Pass step, e.g. `chunk_3`
    pub step: String,

    /// Model identifier
    pub model: String,

    /// Prompt tokens
    pub input_tokens: u64,

    /// Completion tokens
    pub output_tokens: u64,

    /// Call duration
    pub duration: Duration,
}

impl UsageRecord {
    /// Cost in USD; zero for models missing from the pricing table
    pub fn cost_usd(&self) -> f64 {
        match model_rates(&self.model) {
            Some((input, output)) => {
                (self.input_tokens as f64 / 1000.0) * input
                    + (self.output_tokens as f64 / 1000.0) * output
            }
            None => {
                warn!(
                    model = %self.model,
                    "Unknown model not in pricing table, cost reported as $0"
                );
                0.0
            }
        }
    }
}

/// Append-only receiver of usage records
pub trait CostSink: Send + Sync {
    /// Record one model call
    fn record(&self, usage: UsageRecord);
}

/// Emits each record as a structured `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCostSink;

impl CostSink for TracingCostSink {
    fn record(&self, usage: UsageRecord) {
        info!(
            event = "model_call_cost",
            document_id = %usage.document_id,
            step = %usage.step,
            model = %usage.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            cost_usd = round4(usage.cost_usd()),
            duration_seconds = usage.duration.as_secs_f64(),
        );
    }
}

/// In-memory ledger of every recorded call
///
/// Each record is also emitted as a `model_call_cost` event.
#[derive(Debug, Default)]
pub struct CostLedger {
    records: Mutex<Vec<UsageRecord>>,
}

impl CostLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded calls
    pub fn records(&self) -> Vec<UsageRecord> {
        self.lock().clone()
    }

    /// Totals for one document
    pub fn summary(&self, document_id: &str) -> CostSummary {
        let records = self.lock();
        let mut summary = CostSummary {
            document_id: document_id.to_string(),
            ..CostSummary::default()
        };
        for record in records.iter().filter(|r| r.document_id == document_id) {
            summary.num_calls += 1;
            summary.total_input_tokens += record.input_tokens;
            summary.total_output_tokens += record.output_tokens;
            summary.total_cost_usd += record.cost_usd();
        }
        summary
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UsageRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CostSink for CostLedger {
    fn record(&self, usage: UsageRecord) {
        TracingCostSink.record(usage.clone());
        self.lock().push(usage);
    }
}

/// Aggregated cost of one document's extraction
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CostSummary {
    /// Document
    pub document_id: String,
    /// Model calls made
    pub num_calls: usize,
    /// Prompt tokens across calls
    pub total_input_tokens: u64,
    /// Completion tokens across calls
    pub total_output_tokens: u64,
    /// Cost in USD across calls
    pub total_cost_usd: f64,
}

impl CostSummary {
    /// Emit the summary as a structured `tracing` event
    pub fn log(&self) {
        info!(
            event = "extraction_cost_summary",
            document_id = %self.document_id,
            num_calls = self.num_calls,
            total_input_tokens = self.total_input_tokens,
            total_output_tokens = self.total_output_tokens,
            total_cost_usd = round4(self.total_cost_usd),
        );
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(doc: &str, model: &str, input: u64, output: u64) -> UsageRecord {
        UsageRecord {
            document_id: doc.to_string(),
            step: "chunk_0".to_string(),
            model: model.to_string(),
            input_tokens: input,
            output_tokens: output,
            duration: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_cost_from_pricing_table() {
        let record = usage("d", "claude-sonnet-4-20250514", 10_000, 2_000);
        assert!((record.cost_usd() - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_costs_nothing() {
        let record = usage("d", "mock-model", 10_000, 2_000);
        assert_eq!(record.cost_usd(), 0.0);
    }

    #[test]
    fn test_ledger_summary_filters_by_document() {
        let ledger = CostLedger::new();
        ledger.record(usage("a", "claude-haiku-4-5-20251001", 1_000, 1_000));
        ledger.record(usage("a", "claude-haiku-4-5-20251001", 1_000, 0));
        ledger.record(usage("b", "claude-haiku-4-5-20251001", 5_000, 0));

        let summary = ledger.summary("a");
        assert_eq!(summary.num_calls, 2);
        assert_eq!(summary.total_input_tokens, 2_000);
        assert_eq!(summary.total_output_tokens, 1_000);
        assert!((summary.total_cost_usd - 0.0056).abs() < 1e-9);
        assert_eq!(ledger.records().len(), 3);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_456), 0.1235);
    }
}
