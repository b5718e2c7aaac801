//! lexner Extractor - Legal named-entity extraction pipeline
//!
//! Turns plain-text Spanish court rulings into classified, normalized,
//! deduplicated entity spans:
//! - an external extractor (LLM) proposes candidates when available
//! - a rule-based miner covers every failure of the external extractor
//! - a classifier cascade repairs types and normalizes every span
//! - dedup keeps the first occurrence of each `(type, normalized)` pair

use std::time::Duration;

use async_trait::async_trait;
use lexner_core::RawCandidate;
use thiserror::Error;

pub mod batch;
pub mod classifier;
pub mod dedup;
pub mod gazetteer;
pub mod labels;
pub mod llm;
pub mod miner;
pub mod normalize;
pub mod offsets;
pub mod orchestrator;
pub mod output;
pub mod tokenize;

pub use batch::{tokenize_directory, BatchReport, BatchRunner, TokenReport};
pub use classifier::Classifier;
pub use dedup::dedupe;
pub use gazetteer::Gazetteer;
pub use llm::{LlmExtractor, LlmExtractorConfig};
pub use miner::Miner;
pub use normalize::normalize;
pub use orchestrator::{
    DocumentExtraction, ExtractionFailure, ExtractionResult, Orchestrator, SpanSource,
};
pub use tokenize::tokenize;

/// What an external extractor returned
#[derive(Debug, Clone, Default)]
pub struct ExtractorOutput {
    /// Candidates the extractor managed to parse itself
    pub structured: Option<Vec<RawCandidate>>,
    /// Unparsed model output
    pub raw_text: Option<String>,
}

impl ExtractorOutput {
    pub fn structured(candidates: Vec<RawCandidate>) -> Self {
        Self {
            structured: Some(candidates),
            raw_text: None,
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            structured: None,
            raw_text: Some(text.into()),
        }
    }
}

/// Failures of an external extractor
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("extraction service unavailable: {0}")]
    Unavailable(String),

    /// The extractor's own output parser gave up; the raw model output may
    /// still hold a recoverable array.
    #[error("extractor could not parse the model output")]
    ParserFailed { raw_text: Option<String> },

    #[error("extraction timed out after {0:?}")]
    Timeout(Duration),
}

/// Trait for external (non-local) candidate extractors
#[async_trait]
pub trait ExternalExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractorOutput, ExtractorError>;

    /// Extractor name for logging
    fn name(&self) -> &str;
}
