//! Recursive character text splitter.
//!
//! Splits page text into overlapping windows of at most `chunk_size`
//! characters, preferring the coarsest boundary that is present in the
//! text.
//!
//! # Algorithm
//!
//! 1. Pick the first separator from the list that occurs in the text
//!    (the empty separator always matches and splits per character).
//! 2. Split on it, keeping the separator at the start of each following
//!    piece.
//! 3. Pieces shorter than `chunk_size` are merged greedily into windows.
//!    When a window is full it is emitted and pieces are dropped from its
//!    front until at most `chunk_overlap` characters remain, which then
//!    seed the next window.
//! 4. Pieces that are still too long are split again with the remaining
//!    separators.
//!
//! Lengths are measured in characters, not bytes. Emitted chunks are
//! trimmed and never empty.
//!
//! # Example
//!
//! ```rust
//! use docvec_core::chunk::TextSplitter;
//!
//! let splitter = TextSplitter::new(800, 200).unwrap();
//! let chunks = splitter.split_text("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks, vec!["Hello world.\n\nSecond paragraph.".to_string()]);
//! ```

use std::collections::VecDeque;

use anyhow::{bail, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Boundaries tried in order, coarsest first.
pub const DEFAULT_SEPARATORS: [&str; 8] = ["\n\n\n", "\n\n", "\n", ". ", "! ", "? ", " ", ""];

/// Splits text into overlapping, size-bounded chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Create a splitter with the default separators.
    ///
    /// Fails if `chunk_size` is zero or `chunk_overlap` is not smaller than
    /// `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator list. An empty separator is appended if
    /// missing so every piece can eventually fit.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut separators: Vec<String> = separators.into_iter().map(Into::into).collect();
        if !separators.iter().any(|s| s.is_empty()) {
            separators.push(String::new());
        }
        self.separators = separators;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into chunks. Empty or whitespace-only text yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = "";
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge_splits(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_splits(&fitting));
        }

        chunks
    }

    /// Greedily join pieces into windows, carrying an overlap tail forward.
    ///
    /// Pieces already carry their separator, so they are joined directly.
    fn merge_splits(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);

                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split on `separator`, keeping it at the start of every piece after the
/// first. An empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, _) in text.match_indices(separator) {
        pieces.push(&text[start..i]);
        start = i;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_small_text_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split_text("A short page of text.");
        assert_eq!(chunks, vec!["A short page of text.".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        let splitter = TextSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let splitter = TextSplitter::new(12, 0).unwrap();
        let chunks = splitter.split_text("para one.\n\npara two.");
        assert_eq!(chunks, vec!["para one.".to_string(), "para two.".to_string()]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let splitter = TextSplitter::new(50, 20).unwrap();
        let text = format!(
            "{}\n\n{}\n{}",
            numbered_words(80),
            numbered_words(30),
            "x".repeat(130)
        );
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "chunk too long: {:?}", chunk);
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let splitter = TextSplitter::new(50, 20).unwrap();
        let chunks = splitter.split_text(&numbered_words(60));
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(
                pair[0].split(' ').any(|w| w == first_word),
                "{:?} does not overlap {:?}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn test_zero_overlap_has_no_shared_words() {
        let splitter = TextSplitter::new(30, 0).unwrap();
        let chunks = splitter.split_text(&numbered_words(40));
        let words: Vec<&str> = chunks.iter().flat_map(|c| c.split(' ')).collect();
        assert_eq!(words.len(), 40);
    }

    #[test]
    fn test_multibyte_text_measured_in_chars() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let text = "привет мир ".repeat(10);
        let chunks = splitter.split_text(&text);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
    }

    #[test]
    fn test_unbroken_text_split_per_char() {
        let splitter = TextSplitter::new(10, 0).unwrap();
        let chunks = splitter.split_text(&"z".repeat(25));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], "zzzzz");
    }

    #[test]
    fn test_invalid_config() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(100, 150).is_err());
    }

    #[test]
    fn test_custom_separators_gain_empty_fallback() {
        let splitter = TextSplitter::new(5, 0).unwrap().with_separators(["|"]);
        let chunks = splitter.split_text("ab|cd|efghijkl");
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 5);
        }
        assert_eq!(chunks[0], "ab|cd");
    }
}
