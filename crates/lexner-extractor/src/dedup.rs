//! Span deduplication

use std::collections::HashSet;

use lexner_core::{EntityType, Span};

/// Drop spans whose `(type, normalized_text)` was already seen. The first
/// occurrence wins and relative order is preserved.
pub fn dedupe(spans: Vec<Span>) -> Vec<Span> {
    let mut seen: HashSet<(EntityType, String)> = HashSet::with_capacity(spans.len());
    spans
        .into_iter()
        .filter(|span| seen.insert((span.entity_type, span.normalized_text.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, t: EntityType, normalized: &str) -> Span {
        Span::new(text, t).with_normalized(normalized)
    }

    #[test]
    fn test_dedupe_first_occurrence_wins() {
        let spans = vec![
            span("Instituto Ecuatoriano Seguridad Social", EntityType::Organization, "instituto ecuatoriano seguridad social")
                .with_offsets(0, 38),
            span("Juan Pérez", EntityType::Person, "juan perez"),
            span("INSTITUTO ECUATORIANO SEGURIDAD SOCIAL", EntityType::Organization, "instituto ecuatoriano seguridad social")
                .with_offsets(80, 118),
        ];

        let out = dedupe(spans);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].start, Some(0));
        assert_eq!(out[1].text, "Juan Pérez");
    }

    #[test]
    fn test_dedupe_keeps_same_text_with_different_type() {
        let spans = vec![
            span("Pichincha", EntityType::Place, "pichincha"),
            span("Pichincha", EntityType::Organization, "pichincha"),
        ];
        assert_eq!(dedupe(spans).len(), 2);
    }

    #[test]
    fn test_dedupe_is_stable() {
        let spans = vec![
            span("a", EntityType::Other, "a"),
            span("b", EntityType::Other, "b"),
            span("a", EntityType::Other, "a"),
        ];
        let once = dedupe(spans);
        assert_eq!(dedupe(once.clone()), once);
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe(Vec::new()).is_empty());
    }
}
