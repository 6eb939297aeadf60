//! Covenant Domain Layer
//!
//! Core value types and collaborator traits for answering a fixed catalogue of
//! questions about long legal documents (credit agreements).
//!
//! ## Key Concepts
//!
//! - **Question**: A catalogue entry with an expected answer type and guidance
//! - **Confidence**: A closed, totally ordered rating (NONE < LOW < MEDIUM < HIGH)
//! - **AnswerCandidate**: One extraction call's answer for one question, with provenance
//! - **Chunk**: A bounded, page-traceable window of the page-marked document text
//! - **ExtractionResult**: The category-grouped answers of one pass plus its statistics
//!
//! ## Architecture
//!
//! This crate holds no behaviour beyond value semantics. The extraction model,
//! the question directory and the result sink are traits implemented by the
//! infrastructure crates (`covenant-llm`, `covenant-extractor`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod answer;
pub mod chunk;
pub mod confidence;
pub mod document;
pub mod provenance;
pub mod question;
pub mod result;
pub mod traits;

// Re-exports for convenience
pub use answer::{AnswerCandidate, AnswerValue};
pub use chunk::Chunk;
pub use confidence::Confidence;
pub use document::{Document, Page, PAGE_MARKER_PREFIX};
pub use provenance::Provenance;
pub use question::{AnswerType, Question, UnknownAnswerType};
pub use result::{AnswerRecord, ExtractionResult, ExtractionStats};
pub use traits::{ExtractionModel, ModelRequest, ModelResponse, QuestionDirectory, ResultSink};
