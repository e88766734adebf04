//! Text normalization applied before embedding.
//!
//! Extracted PDF text is noisy: hard line breaks, tab runs, stray glyphs
//! that survive as one-letter tokens. [`normalize`] flattens whitespace,
//! tightens spacing around punctuation, drops single-character noise, and
//! caps the length at a sentence boundary when one is close enough.
//!
//! # Algorithm
//!
//! 1. Collapse every whitespace run into one space.
//! 2. Remove the space before `. , ! ? ; :`.
//! 3. Drop single-character tokens unless they are numeric, one of the
//!    marks above, or a member of the [`KeepSet`].
//! 4. If longer than `max_length` characters, cut at `max_length`. When the
//!    last `". "`, `"! "` or `"? "` in the cut text starts at or after 70% of
//!    `max_length`, cut just after that mark and append `..`, otherwise
//!    append `...`.
//!
//! # Example
//!
//! ```rust
//! use docvec_core::normalize::{normalize, KeepSet};
//!
//! let clean = normalize("Hello \n\n world , x again", 2000, &KeepSet::english());
//! assert_eq!(clean, "Hello world, again");
//! ```

use std::collections::BTreeSet;

/// Default cap on normalized text, in characters.
pub const DEFAULT_MAX_LENGTH: usize = 2000;

/// Marks that may stand alone as tokens and never take a leading space.
pub const PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];

const SENTENCE_ENDS: [&str; 3] = [". ", "! ", "? "];

/// Minimum position of a sentence end, as a share of `max_length`, for the
/// soft cut to apply.
const SENTENCE_CUT_RATIO: f64 = 0.7;

/// Single-letter words that survive the noise filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepSet {
    letters: BTreeSet<char>,
}

impl KeepSet {
    /// Keep no letters; only digits and punctuation survive as one-char tokens.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn english() -> Self {
        ['a', 'A', 'I'].into_iter().collect()
    }

    /// Russian one-letter prepositions and conjunctions.
    pub fn russian() -> Self {
        ['а', 'в', 'к', 'о', 'с', 'у', 'и'].into_iter().collect()
    }

    /// Look up a built-in set by language name (`english`, `russian`, `none`).
    pub fn for_language(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "english" | "en" => Some(Self::english()),
            "russian" | "ru" => Some(Self::russian()),
            "none" => Some(Self::none()),
            _ => None,
        }
    }

    pub fn with_letters<I: IntoIterator<Item = char>>(mut self, letters: I) -> Self {
        self.letters.extend(letters);
        self
    }

    pub fn contains(&self, c: char) -> bool {
        self.letters.contains(&c)
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}

impl FromIterator<char> for KeepSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self {
            letters: iter.into_iter().collect(),
        }
    }
}

/// Clean `text` for embedding. See the module docs for the exact rules.
///
/// A `max_length` of `0` disables truncation. The result never exceeds
/// `max_length + 3` characters.
pub fn normalize(text: &str, max_length: usize, keep: &KeepSet) -> String {
    if text.is_empty() {
        return String::new();
    }

    let collapsed = collapse_whitespace(text);
    let tightened = tighten_punctuation(&collapsed);

    let filtered = tightened
        .split(' ')
        .filter(|token| keep_token(token, keep))
        .collect::<Vec<_>>()
        .join(" ");

    truncate(filtered, max_length).trim().to_string()
}

fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Input must already be whitespace-collapsed.
fn tighten_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' && chars.peek().is_some_and(|next| is_punctuation(*next)) {
            continue;
        }
        out.push(c);
    }
    out
}

fn keep_token(token: &str, keep: &KeepSet) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (None, _) => false,
        (Some(c), None) => c.is_numeric() || is_punctuation(c) || keep.contains(c),
        (Some(_), Some(_)) => true,
    }
}

fn truncate(text: String, max_length: usize) -> String {
    if max_length == 0 || text.chars().count() <= max_length {
        return text;
    }

    let cut = text
        .char_indices()
        .nth(max_length)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let truncated = &text[..cut];

    let last_end = SENTENCE_ENDS
        .iter()
        .filter_map(|mark| truncated.rfind(mark))
        .max();

    match last_end {
        Some(pos)
            if truncated[..pos].chars().count() as f64
                >= max_length as f64 * SENTENCE_CUT_RATIO =>
        {
            format!("{}..", &truncated[..pos + 1])
        }
        _ => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize("", 2000, &KeepSet::english()), "");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        let text = "First line\n\n\nsecond\t\t\tline   with    gaps\r\n end";
        assert_eq!(
            normalize(text, 2000, &KeepSet::none()),
            "First line second line with gaps end"
        );
    }

    #[test]
    fn test_space_before_punctuation_removed() {
        let text = "word , next ; last !";
        assert_eq!(normalize(text, 2000, &KeepSet::none()), "word, next; last!");
    }

    #[test]
    fn test_no_space_inserted_after_punctuation() {
        let text = "Pi is 3.14 and see example.com now";
        assert_eq!(normalize(text, 2000, &KeepSet::none()), text);
    }

    #[test]
    fn test_single_letters_filtered() {
        let text = "the x cat 5 sat on a mat q";
        assert_eq!(
            normalize(text, 2000, &KeepSet::english()),
            "the cat 5 sat on a mat"
        );
        assert_eq!(
            normalize(text, 2000, &KeepSet::none()),
            "the cat 5 sat on mat"
        );
    }

    #[test]
    fn test_russian_keep_set() {
        let text = "кот и пёс ж в доме";
        assert_eq!(normalize(text, 2000, &KeepSet::russian()), "кот и пёс в доме");
    }

    #[test]
    fn test_standalone_punctuation_kept() {
        // "-" is neither punctuation nor alphanumeric, so it is dropped.
        let text = "alpha - beta . gamma";
        assert_eq!(normalize(text, 2000, &KeepSet::none()), "alpha beta. gamma");
    }

    #[test]
    fn test_hard_cut_appends_three_dots() {
        let word = "abcdefghij".repeat(10);
        let clean = normalize(&word, 50, &KeepSet::none());
        assert_eq!(clean, format!("{}...", &word[..50]));
    }

    #[test]
    fn test_soft_cut_at_late_sentence_end() {
        let text = format!("{}. {}", "x".repeat(40), "y".repeat(40));
        let clean = normalize(&text, 50, &KeepSet::none());
        assert_eq!(clean, format!("{}...", "x".repeat(40)));
        assert!(clean.chars().count() <= 53);
    }

    #[test]
    fn test_early_sentence_end_ignored() {
        let text = format!("{}. {}", "x".repeat(20), "y".repeat(60));
        let clean = normalize(&text, 50, &KeepSet::none());
        assert_eq!(clean, format!("{}. {}...", "x".repeat(20), "y".repeat(28)));
    }

    #[test]
    fn test_zero_max_length_disables_truncation() {
        let text = "word ".repeat(1000);
        let clean = normalize(&text, 0, &KeepSet::none());
        assert_eq!(clean.chars().count(), 4999);
    }

    #[test]
    fn test_length_bound_holds() {
        let samples = [
            "Short.".to_string(),
            "Sentence one is here. ".repeat(200),
            "Вопрос? Ответ! Снова. ".repeat(150),
            "nopunctuationatall".repeat(300),
        ];
        for max in [10usize, 50, 333, 2000] {
            for sample in &samples {
                let clean = normalize(sample, max, &KeepSet::english());
                assert!(
                    clean.chars().count() <= max + 3,
                    "len {} > {} + 3",
                    clean.chars().count(),
                    max
                );
            }
        }
    }

    #[test]
    fn test_keep_set_lookup() {
        assert_eq!(KeepSet::for_language("Russian"), Some(KeepSet::russian()));
        assert_eq!(KeepSet::for_language("none"), Some(KeepSet::none()));
        assert!(KeepSet::for_language("klingon").is_none());
        let custom = KeepSet::none().with_letters(['y']);
        assert!(custom.contains('y'));
        assert_eq!(custom.len(), 1);
    }
}
