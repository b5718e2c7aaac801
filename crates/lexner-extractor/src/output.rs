//! Output artifacts
//!
//! Per document: a pretty-printed JSON array of spans and a grouped,
//! human-readable summary. The token pipeline gets the same pair with a
//! `Tokens:` / `Normalizados:` summary instead.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use lexner_core::{EntityType, LexError, Result, Span, Token};

/// Suffix of span artifacts (`<stem>_procesado.json|txt`)
pub const SPANS_SUFFIX: &str = "_procesado";
/// Suffix of token artifacts (`<stem>_tokens.json|txt`)
pub const TOKENS_SUFFIX: &str = "_tokens";

pub fn spans_json(spans: &[Span]) -> Result<String> {
    serde_json::to_string_pretty(spans).map_err(|e| LexError::Serialization(e.to_string()))
}

/// One `TYPE (count)` header per non-empty type, followed by up to
/// `max_examples` span texts.
pub fn spans_summary(spans: &[Span], max_examples: usize) -> String {
    let mut out = String::new();

    for entity_type in EntityType::ALL {
        let texts: Vec<&str> = spans
            .iter()
            .filter(|s| s.entity_type == entity_type)
            .map(|s| s.text.as_str())
            .collect();
        if texts.is_empty() {
            continue;
        }

        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "{} ({})", entity_type, texts.len());
        for text in texts.iter().take(max_examples) {
            let _ = writeln!(out, "  - {text}");
        }
    }

    out
}

pub fn tokens_json(tokens: &[Token]) -> Result<String> {
    serde_json::to_string_pretty(tokens).map_err(|e| LexError::Serialization(e.to_string()))
}

pub fn tokens_summary(tokens: &[Token]) -> String {
    let raw: Vec<&str> = tokens.iter().map(|t| t.token.as_str()).collect();
    let normalized: Vec<&str> = tokens.iter().map(|t| t.normalized.as_str()).collect();
    format!(
        "Tokens:\n{}\n\nNormalizados:\n{}\n",
        raw.join(" "),
        normalized.join(" ")
    )
}

/// Write `<stem>_procesado.json` and `<stem>_procesado.txt`
pub fn write_spans(
    output_dir: &Path,
    stem: &str,
    spans: &[Span],
    max_examples: usize,
) -> Result<(PathBuf, PathBuf)> {
    write_pair(
        output_dir,
        &format!("{stem}{SPANS_SUFFIX}"),
        &spans_json(spans)?,
        &spans_summary(spans, max_examples),
    )
}

/// Write `<stem>_tokens.json` and `<stem>_tokens.txt`
pub fn write_tokens(output_dir: &Path, stem: &str, tokens: &[Token]) -> Result<(PathBuf, PathBuf)> {
    write_pair(
        output_dir,
        &format!("{stem}{TOKENS_SUFFIX}"),
        &tokens_json(tokens)?,
        &tokens_summary(tokens),
    )
}

fn write_pair(dir: &Path, base: &str, json: &str, summary: &str) -> Result<(PathBuf, PathBuf)> {
    let json_path = dir.join(format!("{base}.json"));
    let txt_path = dir.join(format!("{base}.txt"));

    write_file(&json_path, json)?;
    write_file(&txt_path, summary)?;
    Ok((json_path, txt_path))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|source| LexError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Span> {
        vec![
            Span::new("Juan Pérez", EntityType::Person)
                .with_offsets(0, 10)
                .with_normalized("juan perez"),
            Span::new("Art. 140 del COIP", EntityType::LegalArticle).with_normalized("art. 140 del coip"),
            Span::new("Ana Vera", EntityType::Person).with_normalized("ana vera"),
        ]
    }

    #[test]
    fn test_spans_json_shape() {
        let json = spans_json(&sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["type"], "PERSON");
        assert_eq!(parsed[0]["normalized"], "juan perez");
        assert!(parsed[1]["start"].is_null());
        // Non-ASCII kept as UTF-8
        assert!(json.contains("Pérez"));
    }

    #[test]
    fn test_spans_summary_groups_by_type() {
        let summary = spans_summary(&sample(), 50);
        assert_eq!(
            summary,
            "PERSON (2)\n  - Juan Pérez\n  - Ana Vera\n\nLEGAL_ARTICLE (1)\n  - Art. 140 del COIP\n"
        );
    }

    #[test]
    fn test_spans_summary_caps_examples() {
        let spans: Vec<Span> = (0..60)
            .map(|i| Span::new(format!("caso {i}"), EntityType::Other))
            .collect();
        let summary = spans_summary(&spans, 50);
        assert!(summary.starts_with("OTHER (60)\n"));
        assert_eq!(summary.lines().filter(|l| l.starts_with("  - ")).count(), 50);
    }

    #[test]
    fn test_spans_summary_empty() {
        assert_eq!(spans_summary(&[], 50), "");
    }

    #[test]
    fn test_tokens_summary() {
        let tokens = crate::tokenize::tokenize("La Corte dictó");
        assert_eq!(
            tokens_summary(&tokens),
            "Tokens:\nLa Corte dictó\n\nNormalizados:\nla corte dicto\n"
        );
    }

    #[test]
    fn test_write_spans_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let (json, txt) = write_spans(dir.path(), "sentencia_01", &sample(), 50).unwrap();
        assert!(json.ends_with("sentencia_01_procesado.json"));
        assert!(txt.ends_with("sentencia_01_procesado.txt"));
        assert!(std::fs::read_to_string(txt).unwrap().contains("PERSON (2)"));
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = write_tokens(&missing, "x", &[]).unwrap_err();
        assert!(matches!(err, LexError::Io { .. }));
    }
}
