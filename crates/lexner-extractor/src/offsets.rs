//! Byte to character offset conversion
//!
//! Regex matches report byte offsets; spans carry character offsets so that
//! consumers in other languages can slice the document directly.

/// Precomputed char boundaries of a document
#[derive(Debug, Clone)]
pub struct CharIndex {
    /// Byte offset of every char, in order
    boundaries: Vec<usize>,
    len_bytes: usize,
}

impl CharIndex {
    pub fn new(text: &str) -> Self {
        Self {
            boundaries: text.char_indices().map(|(i, _)| i).collect(),
            len_bytes: text.len(),
        }
    }

    /// Character offset of a byte offset. Offsets inside a multi-byte char
    /// resolve to that char.
    pub fn char_offset(&self, byte: usize) -> usize {
        if byte >= self.len_bytes {
            return self.boundaries.len();
        }
        match self.boundaries.binary_search(&byte) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Byte offset of a character offset, clamped to the end of the text
    pub fn byte_offset(&self, chars: usize) -> usize {
        self.boundaries.get(chars).copied().unwrap_or(self.len_bytes)
    }

    /// Number of chars in the document
    pub fn len_chars(&self) -> usize {
        self.boundaries.len()
    }
}
