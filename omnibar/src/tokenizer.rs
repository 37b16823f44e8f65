//! Query and field text normalization.
//!
//! Both sides of a match go through the same char pipeline: canonical
//! decomposition, combining marks dropped, lowercase. Tokens are then split out of
//! the normalized query; field text keeps a byte → original-char map so spans found
//! in normalized text can be reported against what the user sees.

use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::interface::MatchSpan;

/// Normalize one char of input, pushing zero or more output chars.
fn normalize_char(c: char, mut push: impl FnMut(char)) {
    for decomposed in std::iter::once(c).nfd() {
        if is_combining_mark(decomposed) {
            continue;
        }
        for lower in decomposed.to_lowercase() {
            push(lower);
        }
    }
}

/// Decompose, strip diacritics and lowercase `text`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        normalize_char(c, |n| out.push(n));
    }
    out
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '/' | '_')
}

/// Split `text` into normalized tokens, deduplicated in first-occurrence order.
///
/// Separators are runs of whitespace, `-`, `/` and `_`. A `.` also separates unless
/// it sits between two digits, so version numbers like `1.0` survive while
/// `example.com` becomes `example`, `com`.
pub fn tokenize(text: &str) -> Vec<String> {
    let chars: Vec<char> = normalize(text).chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let splits = if c == '.' {
            let digit_before = i > 0 && chars[i - 1].is_ascii_digit();
            let digit_after = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            !(digit_before && digit_after)
        } else {
            is_separator(c)
        };

        if splits {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    dedup_tokens(tokens)
}

/// Drop repeated tokens, keeping the first occurrence of each.
pub fn dedup_tokens(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tokens.len());
    tokens.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Normalized field text with a map back to char offsets of the original.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    text: String,
    /// Original char index for every byte of `text`
    origin: Vec<usize>,
    /// Per original char: true when it normalized to nothing (combining marks)
    silent: Vec<bool>,
}

impl NormalizedText {
    pub fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());
        let mut silent = Vec::with_capacity(original.len());
        for (char_idx, c) in original.chars().enumerate() {
            let before = text.len();
            normalize_char(c, |n| {
                text.push(n);
                origin.extend(std::iter::repeat(char_idx).take(n.len_utf8()));
            });
            silent.push(text.len() == before);
        }
        Self { text, origin, silent }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Translate a non-empty byte range of the normalized text into a span over the
    /// original text. The span also covers any marks trailing its last char, so a
    /// decomposed `e` + U+0301 is never split.
    pub fn original_span(&self, byte_start: usize, byte_end: usize) -> MatchSpan {
        debug_assert!(byte_start < byte_end && byte_end <= self.text.len());
        let mut end = self.origin[byte_end - 1] + 1;
        while self.silent.get(end).copied().unwrap_or(false) {
            end += 1;
        }
        MatchSpan::new(self.origin[byte_start], end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_whitespace_and_separators() {
        assert_eq!(tokenize("Hello  World"), vec!["hello", "world"]);
        assert_eq!(tokenize("foo-bar/baz_qux"), vec!["foo", "bar", "baz", "qux"]);
        assert_eq!(tokenize("  \t\n "), Vec::<String>::new());
        assert_eq!(tokenize(""), Vec::<String>::new());
    }

    #[test]
    fn test_tokenize_dots() {
        assert_eq!(tokenize("example.com"), vec!["example", "com"]);
        assert_eq!(tokenize("version 1.0"), vec!["version", "1.0"]);
        assert_eq!(tokenize("v1.x"), vec!["v1", "x"]);
        assert_eq!(tokenize("end."), vec!["end"]);
        assert_eq!(tokenize(".5"), vec!["5"]);
        assert_eq!(tokenize("192.168.0.1"), vec!["192.168.0.1"]);
    }

    #[test]
    fn test_tokenize_strips_diacritics() {
        assert_eq!(tokenize("Café Crème"), vec!["cafe", "creme"]);
        assert_eq!(tokenize("ÅNGSTRÖM"), vec!["angstrom"]);
    }

    #[test]
    fn test_tokenize_dedups_in_order() {
        assert_eq!(tokenize("gmail gmail"), tokenize("gmail"));
        assert_eq!(tokenize("b a B c a"), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_tokenize_keeps_bang_prefix() {
        assert_eq!(tokenize("!w rust"), vec!["!w", "rust"]);
    }

    #[test]
    fn test_normalized_text_maps_back_to_original_chars() {
        let nt = NormalizedText::new("Café Zillow");
        assert_eq!(nt.as_str(), "cafe zillow");
        let start = nt.as_str().find("zillow").unwrap();
        assert_eq!(nt.original_span(start, start + 6), MatchSpan::new(5, 11));
        assert_eq!(nt.original_span(0, 4), MatchSpan::new(0, 4));
    }

    #[test]
    fn test_span_covers_trailing_combining_marks() {
        let nt = NormalizedText::new("cafe\u{301} bar");
        assert_eq!(nt.as_str(), "cafe bar");
        assert_eq!(nt.original_span(0, 4), MatchSpan::new(0, 5));
        assert_eq!(nt.original_span(0, 3), MatchSpan::new(0, 3));
        assert_eq!(nt.original_span(5, 8), MatchSpan::new(6, 9));
    }

    #[test]
    fn test_normalized_text_multibyte_lowercase() {
        // 'İ' lowercases to 'i' + combining dot, the mark is dropped
        let nt = NormalizedText::new("İstanbul");
        assert_eq!(nt.as_str(), "istanbul");
        assert_eq!(nt.original_span(0, nt.as_str().len()), MatchSpan::new(0, 8));
    }
}
