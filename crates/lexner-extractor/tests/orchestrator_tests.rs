//! Orchestrator behaviour against scripted LLM clients

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lexner_core::{EntityType, ExtractionConfig, LexError, LlmClient, Result, Span};
use lexner_extractor::{
    Gazetteer, LlmExtractor, LlmExtractorConfig, Orchestrator, SpanSource,
};

const RULING: &str = "El acusado Juan Pérez es culpable de homicidio agravado.";

/// Returns a fixed response
struct Scripted(String);

#[async_trait]
impl LlmClient for Scripted {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct Failing;

#[async_trait]
impl LlmClient for Failing {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(LexError::LlmError("401 Unauthorized".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct Slow;

#[async_trait]
impl LlmClient for Slow {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("[]".to_string())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

fn orchestrator_with(client: Arc<dyn LlmClient>) -> Orchestrator {
    let extractor = LlmExtractor::with_config(
        client,
        LlmExtractorConfig {
            timeout: Duration::from_millis(50),
            ..Default::default()
        },
    );
    Orchestrator::new(Arc::new(Gazetteer::new()), &ExtractionConfig::default())
        .with_extractor(Arc::new(extractor))
}

fn scripted(response: &str) -> Orchestrator {
    orchestrator_with(Arc::new(Scripted(response.to_string())))
}

fn find<'a>(spans: &'a [Span], text: &str) -> &'a Span {
    spans
        .iter()
        .find(|s| s.text == text)
        .unwrap_or_else(|| panic!("no span {text:?} in {spans:#?}"))
}

#[tokio::test]
async fn test_structured_output_is_classified() {
    let response = r#"[
        {"text": "Juan Pérez", "type": "persona", "start": 11, "end": 21},
        {"text": "homicidio agravado", "type": "delito"},
        {"text": "Fiscal General", "type": "PERSON"},
        {"text": "12 de marzo de 2021", "type": "OTHER", "normalized": "ignored"}
    ]"#;
    let doc = scripted(response).extract(RULING).await;

    assert_eq!(doc.source, SpanSource::External);
    assert_eq!(doc.spans.len(), 4);

    let person = find(&doc.spans, "Juan Pérez");
    assert_eq!(person.entity_type, EntityType::Person);
    assert_eq!(person.normalized_text, "juan perez");
    assert_eq!((person.start, person.end), (Some(11), Some(21)));

    let crime = find(&doc.spans, "homicidio agravado");
    assert_eq!(crime.entity_type, EntityType::Crime);
    assert_eq!(crime.start, Some(37));

    assert_eq!(find(&doc.spans, "Fiscal General").entity_type, EntityType::Other);

    let date = find(&doc.spans, "12 de marzo de 2021");
    assert_eq!(date.entity_type, EntityType::Date);
    assert_eq!(date.normalized_text, "2021-03-12");
    assert_eq!(date.start, None);
}

#[tokio::test]
async fn test_structured_output_is_deduplicated() {
    let response = r#"[
        {"text": "Instituto Ecuatoriano Seguridad Social", "type": "ORGANIZATION"},
        {"text": "INSTITUTO  ECUATORIANO SEGURIDAD SOCIAL", "type": "organizacion"},
        {"text": "Instituto Ecuatoriano Seguridad Social", "type": "ORGANIZATION"}
    ]"#;
    let doc = scripted(response).extract("Oficio del Instituto Ecuatoriano Seguridad Social").await;

    assert_eq!(doc.spans.len(), 1);
    assert_eq!(doc.spans[0].entity_type, EntityType::Organization);
    assert_eq!(doc.spans[0].start, Some(11));
}

#[tokio::test]
async fn test_missing_label_defaults_to_other() {
    let doc = scripted(r#"[{"text": "la presente causa"}]"#)
        .extract("Se conoce la presente causa.")
        .await;

    assert_eq!(doc.source, SpanSource::External);
    assert_eq!(doc.spans[0].entity_type, EntityType::Other);
}

#[tokio::test]
async fn test_missing_label_still_gets_structural_type() {
    let doc = scripted(r#"[{"text": "Art. \n232 del COIP"}]"#)
        .extract("Art. \n232 del COIP")
        .await;

    assert_eq!(doc.spans[0].entity_type, EntityType::LegalArticle);
    assert_eq!(doc.spans[0].normalized_text, "art. 232 del coip");
}

#[tokio::test]
async fn test_huge_start_offset_is_tolerated() {
    let doc = scripted(r#"[{"text": "Juan Pérez", "type": "PERSON", "start": 18446744073709551615}]"#)
        .extract("Juan Pérez")
        .await;

    assert_eq!(doc.source, SpanSource::External);
    assert_eq!(doc.spans.len(), 1);
    assert_eq!(doc.spans[0].entity_type, EntityType::Person);
    assert_eq!((doc.spans[0].start, doc.spans[0].end), (Some(0), Some(10)));
}

#[tokio::test]
async fn test_raw_output_with_prose_is_recovered() {
    let response = "Estas son las entidades:\n\
                    [{\"text\": \"Juan Pérez\", \"type\": \"PER\"}]\n\
                    Espero que sirva.";
    let doc = scripted(response).extract(RULING).await;

    assert_eq!(doc.source, SpanSource::External);
    assert_eq!(doc.spans.len(), 1);
    assert_eq!(doc.spans[0].entity_type, EntityType::Person);
    assert_eq!(doc.spans[0].start, Some(11));
}

#[tokio::test]
async fn test_broken_fence_is_recovered() {
    let response = "```json\n[{\"text\": \"homicidio agravado\", \"type\": \"delito\"}]\nNota: revisar.\n```";
    let doc = scripted(response).extract(RULING).await;

    assert_eq!(doc.source, SpanSource::External);
    assert_eq!(doc.spans[0].entity_type, EntityType::Crime);
}

#[tokio::test]
async fn test_garbage_falls_back_to_miner() {
    let doc = scripted("Lo siento, no puedo ayudar con eso.").extract(RULING).await;

    assert_eq!(doc.source, SpanSource::Fallback);
    let person = find(&doc.spans, "Juan Pérez");
    assert_eq!(person.entity_type, EntityType::Person);
    assert_eq!(find(&doc.spans, "homicidio agravado").entity_type, EntityType::Crime);
    assert!(doc.spans.iter().all(|s| s.entity_type != EntityType::Organization));
}

#[tokio::test]
async fn test_empty_array_falls_back_to_miner() {
    let doc = scripted("[]").extract(RULING).await;
    assert_eq!(doc.source, SpanSource::Fallback);
    assert!(!doc.spans.is_empty());
}

#[tokio::test]
async fn test_failing_client_falls_back_to_miner() {
    let doc = orchestrator_with(Arc::new(Failing))
        .extract("Unidad Judicial Penal Norte de Guayaquil")
        .await;

    assert_eq!(doc.source, SpanSource::Fallback);
    assert_eq!(doc.spans.len(), 1);
    assert_eq!(doc.spans[0].entity_type, EntityType::Organization);
}

#[tokio::test]
async fn test_timeout_falls_back_to_miner() {
    let doc = orchestrator_with(Arc::new(Slow))
        .extract("12 de marzo de 2021")
        .await;

    assert_eq!(doc.source, SpanSource::Fallback);
    assert_eq!(doc.spans.len(), 1);
    assert_eq!(doc.spans[0].entity_type, EntityType::Date);
    assert_eq!(doc.spans[0].normalized_text, "2021-03-12");
}

#[tokio::test]
async fn test_offline_orchestrator() {
    let orchestrator = Orchestrator::new(Arc::new(Gazetteer::new()), &ExtractionConfig::default());
    assert!(orchestrator.is_offline());

    let doc = orchestrator.extract(RULING).await;
    assert_eq!(doc.source, SpanSource::Fallback);
    assert_eq!(find(&doc.spans, "Juan Pérez").normalized_text, "juan perez");
}
