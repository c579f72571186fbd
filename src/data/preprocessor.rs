// ============================================================
// Layer 4 — Text Preprocessor and Tokenizer
// ============================================================
// Cleans raw slide / summary text and splits it into tokens.
//
// Slide text pasted from presentations often contains:
//   - Non-breaking spaces (U+00A0) and zero-width spaces (U+200B)
//   - Carriage returns (\r) from Windows line endings
//   - Tab characters from table formatting
//   - Control characters
//
// Left alone, these would show up as tokens of their own.
//
// Cleaning:
//   1. Invisible and control characters become spaces
//   2. Runs of whitespace collapse to one space; slide breaks
//      carry no meaning for the model, so newlines go too
//
// Tokenisation (after cleaning):
//   lowercase, then every maximal run of word characters is a
//   token and every other non-space character is a token on its
//   own, so "Hello, world!" → ["hello", ",", "world", "!"].
//
// Reference: Rust Book §8 (Strings in Rust)
//            regex crate documentation

use once_cell::sync::Lazy;
use regex::Regex;

// \w and \s are Unicode-aware in the regex crate
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+|[^\s\w]").expect("token pattern is a valid regex")
});

/// Characters pasted from slide decks that should read as a gap.
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
        || c.is_control()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean and split `text` into lowercase tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned = self.clean(text).to_lowercase();
        TOKEN_RE
            .find_iter(&cleaned)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Single-spaced, trimmed text with invisible characters removed.
    pub fn clean(&self, text: &str) -> String {
        let visible: String = text
            .chars()
            .map(|c| if is_invisible(c) { ' ' } else { c })
            .collect();

        visible.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_multiple_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello   world"), "hello world");
    }

    #[test]
    fn test_trims_edges() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  hello world  "), "hello world");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("hello\x01world"), "hello world");
    }

    #[test]
    fn test_slide_breaks_become_single_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Title\r\n\r\n\tbullet one\n\n\nbullet two"), "Title bullet one bullet two");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
        assert!(p.tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_splits_punctuation() {
        let p = Preprocessor::new();
        assert_eq!(
            p.tokenize("Hello, World! It's 2024."),
            vec!["hello", ",", "world", "!", "it", "'", "s", "2024", "."]
        );
    }

    #[test]
    fn test_tokenize_keeps_unicode_words_and_underscores() {
        let p = Preprocessor::new();
        assert_eq!(p.tokenize("Perché snake_case"), vec!["perché", "snake_case"]);
    }

    #[test]
    fn test_tokenize_ignores_invisible_characters() {
        let p = Preprocessor::new();
        assert_eq!(p.tokenize("a\u{200B}b\x01c"), vec!["a", "b", "c"]);
    }
}
