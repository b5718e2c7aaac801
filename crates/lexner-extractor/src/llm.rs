//! LLM-backed external extractor
//!
//! Wraps any [`LlmClient`] as an [`ExternalExtractor`]: builds the extraction
//! prompt, bounds the call with a timeout and sorts the response into
//! structured candidates or raw text for the orchestrator to recover.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use lexner_core::{EntityType, LlmClient, LlmConfig, RawCandidate};

use crate::{ExternalExtractor, ExtractorError, ExtractorOutput};

/// Configuration for the LLM extractor
#[derive(Debug, Clone)]
pub struct LlmExtractorConfig {
    /// System prompt for entity extraction
    pub system_prompt: String,
    /// Entity types offered to the model
    pub entity_types: Vec<EntityType>,
    /// Upper bound for a single extraction call
    pub timeout: Duration,
}

impl Default for LlmExtractorConfig {
    fn default() -> Self {
        Self {
            system_prompt: include_str!("prompts/extraction_system.txt").to_string(),
            entity_types: EntityType::ALL.to_vec(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl LlmExtractorConfig {
    pub fn from_llm_config(config: &LlmConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            ..Default::default()
        }
    }
}

/// External extractor backed by an LLM
pub struct LlmExtractor {
    client: Arc<dyn LlmClient>,
    pub config: LlmExtractorConfig,
}

impl LlmExtractor {
    /// Create with the default prompt and timeout
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self::with_config(client, LlmExtractorConfig::default())
    }

    /// Create with custom config
    pub fn with_config(client: Arc<dyn LlmClient>, config: LlmExtractorConfig) -> Self {
        Self { client, config }
    }

    /// Build the extraction prompt
    pub fn build_prompt(&self, text: &str) -> String {
        let entity_types: Vec<&str> = self
            .config
            .entity_types
            .iter()
            .map(|e| e.as_str())
            .collect();

        format!(
            "{}\n\nTipos de entidad: {}\n\nTexto:\n{}\n\nSalida:",
            self.config.system_prompt,
            entity_types.join(", "),
            text
        )
    }

    /// Sort a model response into structured candidates or raw text.
    ///
    /// A bare JSON array, or an object with an `extractions` array, is
    /// structured output. A fenced block that does not parse is a resolver
    /// failure carrying the raw response. Anything else is raw text.
    pub fn interpret(response: &str) -> Result<ExtractorOutput, ExtractorError> {
        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Ok(ExtractorOutput::default());
        }

        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return match candidates_from_value(value) {
                Some(candidates) => Ok(ExtractorOutput::structured(candidates)),
                None => Err(ExtractorError::ParserFailed {
                    raw_text: Some(response.to_string()),
                }),
            };
        }

        if let Some(fenced) = fenced_block(trimmed) {
            return serde_json::from_str::<Value>(fenced)
                .ok()
                .and_then(candidates_from_value)
                .map(ExtractorOutput::structured)
                .ok_or_else(|| ExtractorError::ParserFailed {
                    raw_text: Some(response.to_string()),
                });
        }

        Ok(ExtractorOutput::raw(response))
    }
}

#[async_trait]
impl ExternalExtractor for LlmExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractorOutput, ExtractorError> {
        let prompt = self.build_prompt(text);

        let response = tokio::time::timeout(self.config.timeout, self.client.generate(&prompt))
            .await
            .map_err(|_| ExtractorError::Timeout(self.config.timeout))?
            .map_err(|e| ExtractorError::Unavailable(e.to_string()))?;

        debug!(
            client = self.client.name(),
            bytes = response.len(),
            "Received extraction response"
        );
        Self::interpret(&response)
    }

    fn name(&self) -> &str {
        self.client.name()
    }
}

/// Candidates from a JSON array, or from an `{"extractions": [...]}` object
pub(crate) fn candidates_from_value(value: Value) -> Option<Vec<RawCandidate>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("extractions") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    Some(items.into_iter().filter_map(RawCandidate::from_value).collect())
}

/// Body of the first ``` fenced block, without the language tag
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(body[..close].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexner_core::{LexError, Result};

    struct CannedClient(&'static str);

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct BrokenClient;

    #[async_trait]
    impl LlmClient for BrokenClient {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(LexError::LlmError("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_build_prompt() {
        let extractor = LlmExtractor::new(Arc::new(CannedClient("[]")));
        let prompt = extractor.build_prompt("Juan Pérez declaró.");
        assert!(prompt.contains("PERSON"));
        assert!(prompt.contains("LEGAL_ARTICLE"));
        assert!(prompt.ends_with("Juan Pérez declaró.\n\nSalida:"));
    }

    #[test]
    fn test_interpret_bare_array() {
        let out = LlmExtractor::interpret(r#"[{"text": "Juan Pérez", "type": "PERSON"}]"#).unwrap();
        let candidates = out.structured.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label.as_deref(), Some("PERSON"));
    }

    #[test]
    fn test_interpret_extractions_object() {
        let response = r#"{"extractions": [
            {"extraction_text": "COIP", "extraction_class": "ley", "attributes": {"position": 10}}
        ]}"#;
        let candidates = LlmExtractor::interpret(response).unwrap().structured.unwrap();
        assert_eq!(candidates[0].text, "COIP");
        assert_eq!(candidates[0].start, Some(10));
    }

    #[test]
    fn test_interpret_fenced_array() {
        let response = "```json\n[{\"text\": \"Quito\", \"type\": \"lugar\"}]\n```";
        let candidates = LlmExtractor::interpret(response).unwrap().structured.unwrap();
        assert_eq!(candidates[0].text, "Quito");
    }

    #[test]
    fn test_interpret_broken_fence_is_parser_failure() {
        let response = "```json\n[{\"text\": \"Quito\"}]\nfin de la respuesta\n```";
        match LlmExtractor::interpret(response) {
            Err(ExtractorError::ParserFailed { raw_text }) => {
                assert_eq!(raw_text.as_deref(), Some(response));
            }
            other => panic!("expected parser failure, got {other:?}"),
        }
    }

    #[test]
    fn test_interpret_prose_is_raw() {
        let out = LlmExtractor::interpret("Aquí está: [{\"text\": \"Quito\"}] listo").unwrap();
        assert!(out.structured.is_none());
        assert!(out.raw_text.unwrap().contains("Quito"));
    }

    #[test]
    fn test_interpret_empty() {
        let out = LlmExtractor::interpret("   ").unwrap();
        assert!(out.structured.is_none());
        assert!(out.raw_text.is_none());
    }

    #[test]
    fn test_interpret_scalar_json_is_parser_failure() {
        assert!(matches!(
            LlmExtractor::interpret("42"),
            Err(ExtractorError::ParserFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_maps_client_error() {
        let extractor = LlmExtractor::new(Arc::new(BrokenClient));
        let err = extractor.extract("texto").await.unwrap_err();
        assert!(matches!(err, ExtractorError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_extract_structured() {
        let extractor = LlmExtractor::new(Arc::new(CannedClient(
            r#"[{"text": "Juan Pérez", "type": "persona", "start": 0, "end": 10}]"#,
        )));
        let out = extractor.extract("Juan Pérez declaró.").await.unwrap();
        assert_eq!(out.structured.unwrap()[0].end, Some(10));
        assert_eq!(extractor.name(), "canned");
    }
}
