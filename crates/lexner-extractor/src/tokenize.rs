//! Whitespace tokenizer with per-token normalization

use lexner_core::Token;

use crate::normalize::{normalize, words, LITERAL_NEWLINE};
use crate::offsets::CharIndex;

/// Split on whitespace and on the literal `\n` artifact; positions are char
/// offsets of each token start
pub fn tokenize(text: &str) -> Vec<Token> {
    let index = CharIndex::new(text);

    words(text)
        .into_iter()
        .flat_map(|(byte, word)| pieces(byte, word))
        .map(|(byte, piece)| Token {
            token: piece.to_string(),
            normalized: normalize(piece),
            position: index.char_offset(byte),
        })
        .collect()
}

/// Non-empty pieces of `word` between literal `\n` sequences
fn pieces(byte: usize, word: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = byte;
    word.split(LITERAL_NEWLINE).filter_map(move |piece| {
        let start = offset;
        offset += piece.len() + LITERAL_NEWLINE.len();
        (!piece.is_empty()).then_some((start, piece))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_positions_and_forms() {
        let tokens = tokenize("La Corte Suprema dictó sentencia.");
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 3, 9, 17, 23]);
        assert_eq!(tokens[3].token, "dictó");
        assert_eq!(tokens[3].normalized, "dicto");
        assert_eq!(tokens[4].normalized, "sentencia.");
    }

    #[test]
    fn test_tokenize_char_positions_after_accents() {
        let tokens = tokenize("Núñez\n  Pérez");
        assert_eq!(tokens[1].position, 8);
    }

    #[test]
    fn test_tokenize_splits_literal_newline() {
        let tokens = tokenize("Art.\\n232 del\\n\\nCOIP");
        let forms: Vec<&str> = tokens.iter().map(|t| t.normalized.as_str()).collect();
        assert_eq!(forms, vec!["art.", "232", "del", "coip"]);
        assert_eq!(tokens[1].token, "232");
        assert_eq!(tokens[1].position, 6);
        assert_eq!(tokens[3].position, 17);
        assert!(tokens.iter().all(|t| !t.normalized.contains(' ')));
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \n\t").is_empty());
    }
}
