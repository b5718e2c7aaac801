//! Extraction orchestrator
//!
//! Per document: try the external extractor, recover what can be recovered
//! from its output, otherwise fall back to the local miner. Spans from either
//! source go through the classifier and dedup before leaving.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use lexner_core::{EntityType, ExtractionConfig, LexError, RawCandidate, Span};

use crate::classifier::Classifier;
use crate::dedup::dedupe;
use crate::gazetteer::Gazetteer;
use crate::labels::map_label;
use crate::llm::candidates_from_value;
use crate::miner::Miner;
use crate::offsets::CharIndex;
use crate::{ExternalExtractor, ExtractorError, ExtractorOutput};

/// Why the external extractor produced nothing usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// No external extractor configured
    Offline,
    Unavailable(String),
    Timeout(Duration),
    /// Output present but no JSON array could be recovered from it
    Unparseable,
    /// Output parsed but held no usable candidate
    Empty,
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => write!(f, "no external extractor configured"),
            Self::Unavailable(reason) => write!(f, "{reason}"),
            Self::Timeout(after) => write!(f, "timed out after {after:?}"),
            Self::Unparseable => write!(f, "no JSON array in extractor output"),
            Self::Empty => write!(f, "extractor returned no candidates"),
        }
    }
}

/// Outcome of the external extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    Success(Vec<RawCandidate>),
    Failure(ExtractionFailure),
}

/// Where the spans of a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanSource {
    External,
    Fallback,
}

/// Classified, deduplicated spans of one document
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub spans: Vec<Span>,
    pub source: SpanSource,
}

/// Document-level extraction state machine
pub struct Orchestrator {
    extractor: Option<Arc<dyn ExternalExtractor>>,
    miner: Miner,
    classifier: Classifier,
    locate_offsets: bool,
}

impl Orchestrator {
    /// Offline orchestrator; add an external extractor with
    /// [`Orchestrator::with_extractor`].
    pub fn new(gazetteer: Arc<Gazetteer>, config: &ExtractionConfig) -> Self {
        Self {
            extractor: None,
            miner: Miner::with_formula_cap(gazetteer.clone(), config.formula_max_chars),
            classifier: Classifier::new(gazetteer),
            locate_offsets: config.locate_offsets,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ExternalExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn is_offline(&self) -> bool {
        self.extractor.is_none()
    }

    /// Extract spans from a document. Never fails.
    pub async fn extract(&self, text: &str) -> DocumentExtraction {
        let (spans, source) = match self.attempt(text).await {
            ExtractionResult::Success(candidates) => {
                (self.candidates_to_spans(text, candidates), SpanSource::External)
            }
            ExtractionResult::Failure(ExtractionFailure::Offline) => {
                (self.miner.mine(text), SpanSource::Fallback)
            }
            ExtractionResult::Failure(reason) => {
                let err = LexError::ExtractionUnavailable(reason.to_string());
                warn!(reason = %err, "Falling back to local miner");
                (self.miner.mine(text), SpanSource::Fallback)
            }
        };

        let spans = dedupe(self.classifier.classify_all(spans));
        info!(source = ?source, spans = spans.len(), "Document extracted");

        DocumentExtraction { spans, source }
    }

    /// Run the external extractor, if any, and resolve its outcome
    pub async fn attempt(&self, text: &str) -> ExtractionResult {
        match &self.extractor {
            Some(extractor) => {
                debug!(extractor = extractor.name(), "Attempting external extraction");
                Self::resolve(extractor.extract(text).await)
            }
            None => ExtractionResult::Failure(ExtractionFailure::Offline),
        }
    }

    /// Turn an extractor outcome into candidates or a failure reason.
    ///
    /// Structured output wins; otherwise the raw output (including the raw
    /// text attached to a parser failure) is searched for a JSON array.
    pub fn resolve(outcome: Result<ExtractorOutput, ExtractorError>) -> ExtractionResult {
        let candidates = match outcome {
            Ok(ExtractorOutput {
                structured: Some(candidates),
                ..
            }) if !candidates.is_empty() => Ok(candidates),
            Ok(ExtractorOutput {
                raw_text: Some(raw),
                ..
            })
            | Err(ExtractorError::ParserFailed {
                raw_text: Some(raw),
            }) => recover_candidates(&raw),
            Ok(_) => Err(ExtractionFailure::Empty),
            Err(ExtractorError::ParserFailed { raw_text: None }) => {
                Err(ExtractionFailure::Unparseable)
            }
            Err(ExtractorError::Unavailable(reason)) => Err(ExtractionFailure::Unavailable(reason)),
            Err(ExtractorError::Timeout(after)) => Err(ExtractionFailure::Timeout(after)),
        };

        match candidates {
            Ok(candidates) => ExtractionResult::Success(candidates),
            Err(reason) => ExtractionResult::Failure(reason),
        }
    }

    /// Upstream candidates as unclassified spans with char offsets
    fn candidates_to_spans(&self, text: &str, candidates: Vec<RawCandidate>) -> Vec<Span> {
        let index = CharIndex::new(text);

        candidates
            .into_iter()
            .map(|candidate| {
                let entity_type = map_label(candidate.label.as_deref()).unwrap_or_else(|err| {
                    debug!(error = %err, text = %candidate.text, "Defaulting candidate type to OTHER");
                    EntityType::Other
                });

                let reported = match (candidate.start, candidate.end) {
                    (Some(start), Some(end)) if start <= end => Some((start, end)),
                    (Some(start), None) => start
                        .checked_add(candidate.text.chars().count())
                        .map(|end| (start, end)),
                    _ => None,
                };
                let offsets = match reported {
                    Some(offsets) => Some(offsets),
                    None if self.locate_offsets => locate(text, &index, &candidate.text),
                    None => None,
                };

                let span = Span::new(candidate.text, entity_type);
                match offsets {
                    Some((start, end)) => span.with_offsets(start, end),
                    None => span,
                }
            })
            .collect()
    }
}

/// Char offsets of the first occurrence of `needle` in `text`
fn locate(text: &str, index: &CharIndex, needle: &str) -> Option<(usize, usize)> {
    let start = text.find(needle)?;
    Some((
        index.char_offset(start),
        index.char_offset(start + needle.len()),
    ))
}

fn recover_candidates(raw: &str) -> Result<Vec<RawCandidate>, ExtractionFailure> {
    let items = recover_json_array(raw).ok_or(ExtractionFailure::Unparseable)?;
    let candidates = candidates_from_value(Value::Array(items)).unwrap_or_default();
    if candidates.is_empty() {
        Err(ExtractionFailure::Empty)
    } else {
        Ok(candidates)
    }
}

/// First well-formed JSON array in free-form text whose elements include at
/// least one object. Handles code fences and prose around the array.
pub fn recover_json_array(raw: &str) -> Option<Vec<Value>> {
    raw.match_indices('[').find_map(|(i, _)| {
        let mut stream = serde_json::Deserializer::from_str(&raw[i..]).into_iter::<Vec<Value>>();
        match stream.next() {
            Some(Ok(items)) if items.iter().any(Value::is_object) => Some(items),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> Orchestrator {
        Orchestrator::new(Arc::new(Gazetteer::new()), &ExtractionConfig::default())
    }

    #[test]
    fn test_recover_json_array_from_fenced_text() {
        let raw = "Claro, aquí tienes:\n```json\n[{\"text\": \"Quito\", \"type\": \"PLACE\"}]\n```\nSaludos";
        let items = recover_json_array(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["text"], "Quito");
    }

    #[test]
    fn test_recover_json_array_skips_non_json_brackets() {
        let raw = "ver [nota 1] y luego [{\"text\": \"COIP\"}] fin";
        let items = recover_json_array(raw).unwrap();
        assert_eq!(items[0]["text"], "COIP");
    }

    #[test]
    fn test_recover_json_array_none() {
        assert!(recover_json_array("sin arreglo").is_none());
        assert!(recover_json_array("[1, 2, 3]").is_none());
        assert!(recover_json_array("[{\"text\": ").is_none());
    }

    #[test]
    fn test_resolve_structured() {
        let outcome = Ok(ExtractorOutput::structured(vec![RawCandidate::new("Juan Pérez", "PERSON")]));
        assert!(matches!(
            Orchestrator::resolve(outcome),
            ExtractionResult::Success(c) if c.len() == 1
        ));
    }

    #[test]
    fn test_resolve_parser_failure_with_raw_text() {
        let outcome = Err(ExtractorError::ParserFailed {
            raw_text: Some("```json\n[{\"text\": \"COIP\", \"type\": \"ley\"}]\nextra\n```".to_string()),
        });
        match Orchestrator::resolve(outcome) {
            ExtractionResult::Success(candidates) => assert_eq!(candidates[0].text, "COIP"),
            other => panic!("expected recovery, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_failures() {
        assert_eq!(
            Orchestrator::resolve(Err(ExtractorError::Unavailable("503".to_string()))),
            ExtractionResult::Failure(ExtractionFailure::Unavailable("503".to_string()))
        );
        assert_eq!(
            Orchestrator::resolve(Err(ExtractorError::ParserFailed { raw_text: None })),
            ExtractionResult::Failure(ExtractionFailure::Unparseable)
        );
        assert_eq!(
            Orchestrator::resolve(Ok(ExtractorOutput::raw("no sé"))),
            ExtractionResult::Failure(ExtractionFailure::Unparseable)
        );
        assert_eq!(
            Orchestrator::resolve(Ok(ExtractorOutput::default())),
            ExtractionResult::Failure(ExtractionFailure::Empty)
        );
        assert_eq!(
            Orchestrator::resolve(Ok(ExtractorOutput::structured(Vec::new()))),
            ExtractionResult::Failure(ExtractionFailure::Empty)
        );
    }

    #[test]
    fn test_candidates_to_spans_locates_offsets() {
        let orchestrator = offline();
        let text = "Señor Juan Pérez y el COIP";
        let spans = orchestrator.candidates_to_spans(
            text,
            vec![
                RawCandidate::new("Juan Pérez", "persona"),
                RawCandidate {
                    text: "COIP".to_string(),
                    ..Default::default()
                },
                RawCandidate::new("inexistente", "PERSON"),
            ],
        );

        assert_eq!(spans[0].entity_type, EntityType::Person);
        assert_eq!((spans[0].start, spans[0].end), (Some(6), Some(16)));
        assert_eq!(spans[1].entity_type, EntityType::Other);
        assert_eq!(spans[1].start, Some(22));
        assert_eq!(spans[2].start, None);
    }

    #[test]
    fn test_candidates_keep_reported_offsets() {
        let orchestrator = offline();
        let mut candidate = RawCandidate::new("Quito", "lugar");
        candidate.start = Some(40);
        let spans = orchestrator.candidates_to_spans("Quito", vec![candidate]);
        assert_eq!((spans[0].start, spans[0].end), (Some(40), Some(45)));
    }

    #[test]
    fn test_candidates_with_overflowing_start_are_located() {
        let orchestrator = offline();
        let mut candidate = RawCandidate::new("Juan Pérez", "PERSON");
        candidate.start = Some(usize::MAX);
        let spans = orchestrator.candidates_to_spans("Juan Pérez", vec![candidate]);
        assert_eq!((spans[0].start, spans[0].end), (Some(0), Some(10)));
    }

    #[tokio::test]
    async fn test_offline_extract_uses_miner() {
        let doc = offline().extract("Art. \n232 del COIP").await;
        assert_eq!(doc.source, SpanSource::Fallback);
        assert_eq!(doc.spans.len(), 1);
        assert_eq!(doc.spans[0].entity_type, EntityType::LegalArticle);
        assert_eq!(doc.spans[0].normalized_text, "art. 232 del coip");
        assert_eq!(doc.spans[0].text, "Art. 232 del COIP");
    }

    #[tokio::test]
    async fn test_offline_extract_dedupes() {
        let text = "Instituto Ecuatoriano Seguridad Social. Oficio del Instituto Ecuatoriano Seguridad Social.";
        let doc = offline().extract(text).await;
        let orgs: Vec<&Span> = doc
            .spans
            .iter()
            .filter(|s| s.entity_type == EntityType::Organization)
            .collect();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].start, Some(0));
    }

    #[tokio::test]
    async fn test_offline_extract_empty_document() {
        let doc = offline().extract("").await;
        assert!(doc.spans.is_empty());
        assert_eq!(doc.source, SpanSource::Fallback);
    }
}
