//! lexner Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout lexner:
//! - The closed entity type vocabulary and the `Span` record
//! - Upstream candidate records as produced by an external extractor
//! - Common error types
//! - The `LlmClient` trait implemented by the HTTP clients
//! - Configuration management

pub mod config;

pub use config::{AppConfig, ConfigError, ExtractionConfig, LlmConfig, LlmProvider, LoggingConfig};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for lexner operations
#[derive(Error, Debug)]
pub enum LexError {
    /// The external extraction service could not produce usable output.
    /// Recovered by the orchestrator through the local miner.
    #[error("Extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    #[error("Malformed candidate: {0}")]
    MalformedCandidate(String),

    #[error("Input directory does not exist: {}", .0.display())]
    NoInputDirectory(PathBuf),

    #[error("Unrecognized date pattern: {0}")]
    UnrecognizedDatePattern(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LexError>;

impl From<ConfigError> for LexError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

// ============================================================================
// Entity Types
// ============================================================================

/// Closed set of entity types a classified span can carry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Organization,
    LegalArticle,
    Date,
    LegalWork,
    Crime,
    CaseNumber,
    Place,
    JudicialFormula,
    Other,
}

impl EntityType {
    /// Every variant, in summary order
    pub const ALL: [EntityType; 10] = [
        Self::Person,
        Self::Organization,
        Self::LegalArticle,
        Self::Date,
        Self::LegalWork,
        Self::Crime,
        Self::CaseNumber,
        Self::Place,
        Self::JudicialFormula,
        Self::Other,
    ];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::LegalArticle => "LEGAL_ARTICLE",
            Self::Date => "DATE",
            Self::LegalWork => "LEGAL_WORK",
            Self::Crime => "CRIME",
            Self::CaseNumber => "CASE_NUMBER",
            Self::Place => "PLACE",
            Self::JudicialFormula => "JUDICIAL_FORMULA",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = LexError;

    /// Parses the canonical names only (case-insensitive). Open-vocabulary
    /// labels from upstream extractors are mapped by the extractor crate.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['-', ' '], "_").to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| LexError::MalformedCandidate(format!("unknown entity type: {s}")))
    }
}

// ============================================================================
// Span
// ============================================================================

/// A classified excerpt of document text.
///
/// Serializes as `{text, type, start, end, normalized}`. Offsets are
/// character offsets into the source document and may be absent when the
/// upstream extractor did not report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Source text (whitespace-cleaned once classified)
    pub text: String,

    /// Semantic type
    #[serde(rename = "type")]
    pub entity_type: EntityType,

    /// Start character offset
    pub start: Option<usize>,

    /// End character offset (exclusive)
    pub end: Option<usize>,

    /// Canonical form (ISO-8601 for parseable dates)
    #[serde(rename = "normalized")]
    pub normalized_text: String,
}

impl Span {
    /// Create a span without offsets. `normalized_text` is left empty until
    /// the span goes through the classifier.
    pub fn new(text: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            text: text.into(),
            entity_type,
            start: None,
            end: None,
            normalized_text: String::new(),
        }
    }

    /// Set character offsets
    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Set the normalized form
    pub fn with_normalized(mut self, normalized: impl Into<String>) -> Self {
        self.normalized_text = normalized.into();
        self
    }

    /// Semantic identity used for deduplication
    pub fn identity(&self) -> (EntityType, &str) {
        (self.entity_type, self.normalized_text.as_str())
    }
}

// ============================================================================
// Upstream candidates
// ============================================================================

/// A candidate record as emitted by the external extraction service.
///
/// The label is open vocabulary and may be missing; offsets may be numbers,
/// numeric strings or absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    #[serde(
        alias = "extraction_text",
        alias = "span",
        alias = "texto",
        alias = "token"
    )]
    pub text: String,

    #[serde(
        default,
        rename = "type",
        alias = "label",
        alias = "entity_type",
        alias = "extraction_class",
        alias = "tipo"
    )]
    pub label: Option<String>,

    #[serde(default, alias = "normalized_text")]
    pub normalized: Option<String>,

    #[serde(default, alias = "position", deserialize_with = "lenient_offset")]
    pub start: Option<usize>,

    #[serde(default, deserialize_with = "lenient_offset")]
    pub end: Option<usize>,

    /// Extra attributes (langextract-style `attributes` object)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, serde_json::Value>>,
}

impl RawCandidate {
    /// Create a candidate with a label
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Lenient conversion from an arbitrary JSON value.
    ///
    /// Returns `None` for non-objects and records without usable text.
    /// Values nested under `attributes` fill fields missing at top level.
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        let mut candidate: RawCandidate = serde_json::from_value(value).ok()?;
        if candidate.text.trim().is_empty() {
            return None;
        }

        if let Some(attrs) = candidate.attributes.take() {
            if candidate.normalized.is_none() {
                candidate.normalized = attrs
                    .get("normalized")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
            }
            if candidate.start.is_none() {
                candidate.start = attrs
                    .get("start")
                    .or_else(|| attrs.get("position"))
                    .and_then(offset_from_value);
            }
            if candidate.end.is_none() {
                candidate.end = attrs.get("end").and_then(offset_from_value);
            }
            candidate.attributes = Some(attrs);
        }

        Some(candidate)
    }
}

fn offset_from_value(value: &serde_json::Value) -> Option<usize> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_offset<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(offset_from_value))
}

// ============================================================================
// Tokens
// ============================================================================

/// A whitespace-delimited token with its normalized form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    pub normalized: String,
    /// Character offset of the token start
    pub position: usize,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for LLM clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Client name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_display() {
        assert_eq!(EntityType::LegalArticle.to_string(), "LEGAL_ARTICLE");
        assert_eq!(EntityType::Person.as_str(), "PERSON");
    }

    #[test]
    fn test_entity_type_parse() {
        assert_eq!(
            "legal-article".parse::<EntityType>().unwrap(),
            EntityType::LegalArticle
        );
        assert_eq!(
            "case number".parse::<EntityType>().unwrap(),
            EntityType::CaseNumber
        );
        assert!("persona".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_span_serialization_shape() {
        let span = Span::new("Juan Pérez", EntityType::Person)
            .with_offsets(11, 21)
            .with_normalized("juan perez");
        let json = serde_json::to_value(&span).unwrap();

        assert_eq!(json["type"], "PERSON");
        assert_eq!(json["normalized"], "juan perez");
        assert_eq!(json["start"], 11);

        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_span_without_offsets_serializes_null() {
        let span = Span::new("COIP", EntityType::LegalWork).with_normalized("coip");
        let json = serde_json::to_value(&span).unwrap();
        assert!(json["start"].is_null());
        assert!(json["end"].is_null());
    }

    #[test]
    fn test_raw_candidate_aliases() {
        let value = serde_json::json!({
            "extraction_text": "Juan Pérez",
            "extraction_class": "persona",
            "attributes": {"normalized": "juan perez", "position": "11"}
        });
        let candidate = RawCandidate::from_value(value).unwrap();

        assert_eq!(candidate.text, "Juan Pérez");
        assert_eq!(candidate.label.as_deref(), Some("persona"));
        assert_eq!(candidate.normalized.as_deref(), Some("juan perez"));
        assert_eq!(candidate.start, Some(11));
    }

    #[test]
    fn test_raw_candidate_lenient_offsets() {
        let value = serde_json::json!({"text": "COIP", "start": "4", "end": true});
        let candidate = RawCandidate::from_value(value).unwrap();
        assert_eq!(candidate.start, Some(4));
        assert_eq!(candidate.end, None);
        assert_eq!(candidate.label, None);
    }

    #[test]
    fn test_raw_candidate_rejects_missing_text() {
        assert!(RawCandidate::from_value(serde_json::json!({"type": "PERSON"})).is_none());
        assert!(RawCandidate::from_value(serde_json::json!({"text": "  "})).is_none());
        assert!(RawCandidate::from_value(serde_json::json!("Juan")).is_none());
    }
}
