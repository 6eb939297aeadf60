//! Covenant Extractor
//!
//! Answers a fixed catalogue of questions about a long credit agreement with
//! the fewest model calls, each answer backed by a verbatim quote and a page
//! and section citation.
//!
//! # Overview
//!
//! A document too large for one context window is split into overlapping
//! chunks. Each chunk is sent once, together with every question that is
//! still open. The best answer per question is kept by confidence; a HIGH
//! answer closes the question, and the pass stops as soon as nothing is left
//! open or the document is exhausted.
//!
//! # Architecture
//!
//! ```text
//! Document → Chunker → { AnswerExtractor ⇄ CoverageController } → ResultAssembler → ResultSink
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use covenant_domain::{Document, Page};
//! use covenant_extractor::{
//!     CancelToken, CatalogueDirectory, ExtractionEngine, ExtractorConfig, InMemoryResultSink,
//! };
//! use covenant_llm::AnthropicClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let model = AnthropicClient::from_env("claude-sonnet-4-20250514")?;
//! let catalogue = CatalogueDirectory::from_file("questions.toml")?;
//! let engine = ExtractionEngine::new(
//!     Arc::new(model),
//!     Arc::new(catalogue),
//!     Arc::new(InMemoryResultSink::new()),
//!     ExtractorConfig::default(),
//! );
//!
//! let document = Document::new("acme-2024", vec![Page::new(1, "CREDIT AGREEMENT ...")]);
//! let result = engine.run_pass(&document, None, CancelToken::never()).await?;
//!
//! println!(
//!     "Answered {}/{} questions",
//!     result.stats.total_answered, result.stats.total_questions
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod answer_extractor;
mod assembler;
mod cancel;
mod catalogue;
mod chunking;
mod config;
mod controller;
mod cost;
mod engine;
mod error;
mod parser;
mod prompt;
mod router;
mod sink;
mod status;


pub use answer_extractor::AnswerExtractor;
pub use assembler::ResultAssembler;
pub use cancel::{CancelHandle, CancelToken};
pub use catalogue::{CatalogueDirectory, Category};
pub use chunking::{page_before, Chunker, Chunks, PageIndex};
pub use config::{ChunkOverrides, ExtractorConfig};
pub use controller::{
    ChunkProgress, CoverageController, CoverageOutcome, QuestionState, QuestionStatus,
};
pub use cost::{model_rates, CostLedger, CostSink, CostSummary, TracingCostSink, UsageRecord};
pub use engine::ExtractionEngine;
pub use error::ExtractorError;
pub use parser::{coerce_value, escape_literal, parse_model_response, ParseLimits};
pub use prompt::PromptBuilder;
pub use router::{
    build_index, tokenize, CatalogueFileSource, CategoryKeywords, CategorySource, RouteMatch,
    RouteResult, TopicRouter, DEFAULT_INDEX_TTL,
};
pub use sink::{InMemoryResultSink, JsonFileResultSink};
pub use status::{InMemoryStatusStore, PassPhase, PassStatus, StatusStore};
