//! Text normalization
//!
//! Two total, idempotent functions over arbitrary strings:
//! - [`clean_whitespace`] keeps case and accents, only flattens line breaks
//!   and whitespace runs (used to rewrite `Span::text`)
//! - [`normalize`] additionally lowercases and strips combining marks
//!   (used for `Span::normalized_text` and every gazetteer lookup)

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Two-character `\n` artifact left behind by some PDF-to-text exports
pub(crate) const LITERAL_NEWLINE: &str = "\\n";

/// Replace line breaks (real or literal) with spaces, collapse whitespace
/// runs and trim.
pub fn clean_whitespace(text: &str) -> String {
    text.replace(LITERAL_NEWLINE, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical comparison form: lowercase, accent-stripped, whitespace-collapsed.
///
/// Case folding and mark stripping run before whitespace handling so that a
/// mark sitting between two spaces cannot leave a double space behind.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    clean_whitespace(&folded)
}

/// Lowercase and strip marks from a single token, dropping surrounding
/// punctuation that OCR tends to glue onto words.
pub(crate) fn normalize_token(token: &str) -> String {
    normalize(token.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '"' | '«' | '»')))
}

/// Whitespace-delimited words with their byte offsets
pub fn words(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }

    out
}

/// Text has at least one letter and no lowercase letters
pub fn is_all_uppercase(text: &str) -> bool {
    let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| !c.is_lowercase())
}
