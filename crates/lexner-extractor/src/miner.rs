//! Candidate span miner
//!
//! Deterministic, rule-based span extraction used whenever the external
//! extractor is unavailable or its output cannot be parsed. Rules run in a
//! fixed priority order and a byte range claimed by an earlier rule cannot
//! be captured again by a later one.

use std::ops::Range;
use std::sync::Arc;

use regex::Regex;
use tracing::trace;

use lexner_core::{EntityType, Span};

use crate::classifier::canonical_form;
use crate::gazetteer::Gazetteer;
use crate::normalize::{is_all_uppercase, normalize_token, words};
use crate::offsets::CharIndex;

/// Default cap (in chars) of a judicial formula without its closing marker
pub const DEFAULT_FORMULA_MAX_CHARS: usize = 600;

/// Rule-based span miner
#[derive(Debug, Clone)]
pub struct Miner {
    gazetteer: Arc<Gazetteer>,
    formula_max_chars: usize,
}

impl Miner {
    pub fn new(gazetteer: Arc<Gazetteer>) -> Self {
        Self::with_formula_cap(gazetteer, DEFAULT_FORMULA_MAX_CHARS)
    }

    pub fn with_formula_cap(gazetteer: Arc<Gazetteer>, formula_max_chars: usize) -> Self {
        Self {
            gazetteer,
            formula_max_chars,
        }
    }

    /// Mine spans from a document. Never fails; spans are returned in
    /// document order with raw text and character offsets.
    pub fn mine(&self, text: &str) -> Vec<Span> {
        let mut claims = Claims::new(text, &self.gazetteer);

        self.mine_formulas(text, &mut claims);
        self.mine_dates(text, &mut claims);
        claims.claim_all(&self.gazetteer.patterns().article, EntityType::LegalArticle);
        claims.claim_all(&self.gazetteer.patterns().case_number, EntityType::CaseNumber);
        claims.claim_all(
            &self.gazetteer.patterns().organization_keyword,
            EntityType::Organization,
        );
        claims.claim_all(
            &self.gazetteer.patterns().organization_corporate,
            EntityType::Organization,
        );
        self.mine_persons(text, &mut claims);
        claims.claim_all(&self.gazetteer.patterns().crime, EntityType::Crime);

        let spans = claims.into_spans();
        trace!(spans = spans.len(), "Mined spans");
        spans
    }

    /// Opening formula up to its closing marker, or up to the cap
    fn mine_formulas(&self, text: &str, claims: &mut Claims<'_>) {
        let patterns = self.gazetteer.patterns();

        for opening in patterns.formula_opening.find_iter(text) {
            let start_char = claims.index.char_offset(opening.start());
            let cap_end = claims
                .index
                .byte_offset(start_char + self.formula_max_chars)
                .max(opening.end());

            let end = patterns
                .formula_closing
                .find(&text[opening.end()..])
                .map(|closing| opening.end() + closing.end())
                .filter(|&end| end <= cap_end)
                .unwrap_or(cap_end);

            claims.claim(opening.start()..end, EntityType::JudicialFormula);
        }
    }

    /// Date expressions that name a real calendar day
    fn mine_dates(&self, text: &str, claims: &mut Claims<'_>) {
        let patterns = self.gazetteer.patterns();
        let mut found: Vec<Range<usize>> = patterns
            .long_date
            .find_iter(text)
            .chain(patterns.numeric_date.find_iter(text))
            .filter(|m| {
                let valid = self.gazetteer.iso_date(m.as_str()).is_some();
                if !valid {
                    trace!(date = m.as_str(), "Skipping impossible date");
                }
                valid
            })
            .map(|m| m.range())
            .collect();
        found.sort_by_key(|r| r.start);

        for range in found {
            claims.claim(range, EntityType::Date);
        }
    }

    /// Runs of 2-4 capitalized words that are not part of an organization
    fn mine_persons(&self, text: &str, claims: &mut Claims<'_>) {
        let patterns = self.gazetteer.patterns();
        let organizations: Vec<Range<usize>> = patterns
            .organization_keyword
            .find_iter(text)
            .chain(patterns.organization_corporate.find_iter(text))
            .map(|m| m.range())
            .collect();

        for run in patterns.person_run.find_iter(text) {
            let kept: Vec<(usize, &str)> = words(run.as_str())
                .into_iter()
                .skip_while(|(_, w)| self.gazetteer.is_function_word(&normalize_token(w)))
                .collect();
            if kept.len() < 2 {
                continue;
            }

            let range = run.start() + kept[0].0..run.end();
            if organizations.iter().any(|org| overlaps(org, &range)) {
                trace!(run = run.as_str(), "Person run overlaps organization");
                continue;
            }
            if is_all_uppercase(&text[range.clone()]) {
                continue;
            }

            claims.claim(range, EntityType::Person);
        }
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Claimed byte ranges plus the spans emitted so far
struct Claims<'t> {
    text: &'t str,
    gazetteer: &'t Gazetteer,
    index: CharIndex,
    ranges: Vec<Range<usize>>,
    spans: Vec<Span>,
}

impl<'t> Claims<'t> {
    fn new(text: &'t str, gazetteer: &'t Gazetteer) -> Self {
        Self {
            text,
            gazetteer,
            index: CharIndex::new(text),
            ranges: Vec::new(),
            spans: Vec::new(),
        }
    }

    fn claim_all(&mut self, pattern: &Regex, entity_type: EntityType) {
        let text = self.text;
        for m in pattern.find_iter(text) {
            self.claim(m.range(), entity_type);
        }
    }

    /// Emit a span for `range` unless it is empty or already claimed
    fn claim(&mut self, range: Range<usize>, entity_type: EntityType) -> bool {
        if range.is_empty() || self.ranges.iter().any(|r| overlaps(r, &range)) {
            return false;
        }

        let raw = &self.text[range.clone()];
        if raw.trim().is_empty() {
            return false;
        }

        let span = Span::new(raw, entity_type)
            .with_offsets(
                self.index.char_offset(range.start),
                self.index.char_offset(range.end),
            )
            .with_normalized(canonical_form(self.gazetteer, entity_type, raw));

        self.ranges.push(range);
        self.spans.push(span);
        true
    }

    fn into_spans(mut self) -> Vec<Span> {
        self.spans.sort_by_key(|s| s.start);
        self.spans
    }
}
