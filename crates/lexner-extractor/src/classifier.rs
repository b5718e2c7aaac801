//! Type classifier / repair cascade
//!
//! Given a candidate span (text + claimed type), decides the final type by
//! running an ordered list of rules; the first rule that returns a decision
//! wins. Structural rules apply to any claimed type, every other rule only
//! repairs spans claimed as PERSON. Normalization of `text` and
//! `normalized_text` happens on every call regardless of the outcome.
//!
//! The cascade is a fixed point: feeding a classified span back in returns
//! it unchanged.

use std::sync::Arc;

use tracing::{debug, trace};

use lexner_core::{EntityType, LexError, Span};

use crate::gazetteer::Gazetteer;
use crate::normalize::{clean_whitespace, is_all_uppercase, normalize, normalize_token};

/// Borrowed view of a span under classification
#[derive(Debug, Clone, Copy)]
pub struct SpanView<'a> {
    /// Whitespace-cleaned text
    pub text: &'a str,
    /// Normalized text
    pub normalized: &'a str,
    /// Type claimed by the upstream source
    pub claimed: EntityType,
}

/// A single cascade rule. `None` means "no opinion".
pub type Rule = fn(&Classifier, &SpanView<'_>) -> Option<EntityType>;

/// Rules in priority order
const CASCADE: [(&str, Rule); 6] = [
    ("structural", Classifier::structural_rule),
    ("concept_phrase", Classifier::concept_phrase_rule),
    ("role_title", Classifier::role_title_rule),
    ("organization", Classifier::organization_rule),
    ("legal_work", Classifier::legal_work_rule),
    ("name_shape", Classifier::name_shape_rule),
];

/// Rule-based span classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    gazetteer: Arc<Gazetteer>,
}

impl Classifier {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        Self { gazetteer }
    }

    /// Classify and normalize a span. Total and idempotent.
    pub fn classify(&self, span: Span) -> Span {
        let text = clean_whitespace(&span.text);
        let normalized = normalize(&text);
        let view = SpanView {
            text: &text,
            normalized: &normalized,
            claimed: span.entity_type,
        };

        let entity_type = self.resolve(&view);
        if entity_type != span.entity_type {
            debug!(
                text = %text,
                from = %span.entity_type,
                to = %entity_type,
                "Reclassified span"
            );
        }

        let normalized_text = canonical_form(&self.gazetteer, entity_type, &text);

        Span {
            text,
            entity_type,
            start: span.start,
            end: span.end,
            normalized_text,
        }
    }

    /// Classify every span in order
    pub fn classify_all(&self, spans: Vec<Span>) -> Vec<Span> {
        spans.into_iter().map(|s| self.classify(s)).collect()
    }

    /// Run the cascade and return the decided type
    pub fn resolve(&self, view: &SpanView<'_>) -> EntityType {
        for (name, rule) in CASCADE {
            if let Some(decided) = rule(self, view) {
                trace!(rule = name, text = view.text, decided = %decided, "Cascade rule fired");
                return decided;
            }
        }
        view.claimed
    }

    // ------------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------------

    /// Article citation, date, case-number header, place. Overrides any claim.
    pub fn structural_rule(&self, view: &SpanView<'_>) -> Option<EntityType> {
        let p = self.gazetteer.patterns();

        if p.article_start.is_match(view.text) {
            Some(EntityType::LegalArticle)
        } else if p.full_date.is_match(view.text) {
            Some(EntityType::Date)
        } else if p.case_header.is_match(view.text) {
            Some(EntityType::CaseNumber)
        } else if p.place.is_match(view.text) && !self.gazetteer.looks_organizational(view.normalized)
        {
            Some(EntityType::Place)
        } else {
            None
        }
    }

    /// PERSON made of legal-concept vocabulary is a concept, not a name
    pub fn concept_phrase_rule(&self, view: &SpanView<'_>) -> Option<EntityType> {
        if view.claimed != EntityType::Person {
            return None;
        }
        self.gazetteer
            .is_concept_phrase(view.normalized)
            .then_some(EntityType::Other)
    }

    /// PERSON carrying a role title with no name left once titles are removed
    pub fn role_title_rule(&self, view: &SpanView<'_>) -> Option<EntityType> {
        if view.claimed != EntityType::Person || !self.gazetteer.has_role_title(view.normalized) {
            return None;
        }

        let remainder: Vec<&str> = view
            .text
            .split_whitespace()
            .filter(|t| !self.gazetteer.is_role_title(&normalize_token(t)))
            .collect();
        if self.looks_like_name(&remainder.join(" ")) {
            return None;
        }

        Some(self.organization_or_other(view.normalized))
    }

    /// PERSON that reads like an institution
    pub fn organization_rule(&self, view: &SpanView<'_>) -> Option<EntityType> {
        if view.claimed != EntityType::Person {
            return None;
        }
        self.gazetteer
            .looks_organizational(view.normalized)
            .then_some(EntityType::Organization)
    }

    /// PERSON naming a code, statute or other legal work
    pub fn legal_work_rule(&self, view: &SpanView<'_>) -> Option<EntityType> {
        if view.claimed != EntityType::Person {
            return None;
        }
        self.gazetteer
            .has_legal_work_term(view.normalized)
            .then_some(EntityType::LegalWork)
    }

    /// PERSON that does not have the shape of a personal name
    pub fn name_shape_rule(&self, view: &SpanView<'_>) -> Option<EntityType> {
        if view.claimed != EntityType::Person || self.looks_like_name(view.text) {
            return None;
        }
        Some(self.organization_or_other(view.normalized))
    }

    fn organization_or_other(&self, normalized: &str) -> EntityType {
        if self.gazetteer.looks_organizational(normalized) {
            EntityType::Organization
        } else {
            EntityType::Other
        }
    }

    /// 2-4 tokens, not shouted, no leading article/preposition, no
    /// institution head, and at least two `Capitalized` tokens.
    pub fn looks_like_name(&self, text: &str) -> bool {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if !(2..=4).contains(&tokens.len()) {
            return false;
        }

        if text.chars().count() > 3 && is_all_uppercase(text) {
            return false;
        }

        if self.gazetteer.is_function_word(&normalize_token(tokens[0])) {
            return false;
        }

        if tokens
            .iter()
            .any(|t| self.gazetteer.is_institution_head(&normalize_token(t)))
        {
            return false;
        }

        let capitalized = &self.gazetteer.patterns().capitalized;
        let shaped = tokens
            .iter()
            .map(|t| t.trim_end_matches([',', ';', ':', '.']))
            .filter(|t| capitalized.is_match(t))
            .count();
        shaped >= 2
    }
}

/// Canonical `normalized_text` for a span of the given type.
///
/// Dates become ISO-8601 when the date can be parsed into a real calendar
/// day; anything else (including unparseable dates) uses [`normalize`].
pub fn canonical_form(gazetteer: &Gazetteer, entity_type: EntityType, text: &str) -> String {
    let cleaned = clean_whitespace(text);

    if entity_type == EntityType::Date {
        match gazetteer.iso_date(&cleaned) {
            Some(iso) => return iso,
            None => {
                let err = LexError::UnrecognizedDatePattern(cleaned.clone());
                debug!(error = %err, "Falling back to plain normalization");
            }
        }
    }

    normalize(&cleaned)
}
