// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits rather
// than concrete types:
//   - CsvCorpusLoader implements CorpusSource
//   - SummarizerContext implements Summarizer
//
// The web layer only ever needs `Summarizer::describe`.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::corpus_row::CorpusRow;
use crate::domain::description::DescriptionState;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can supply (slides, summary, reflection) rows.
pub trait CorpusSource {
    /// Load all usable rows from this source.
    fn load_rows(&self) -> Result<Vec<CorpusRow>>;
}

// ─── Summarizer ───────────────────────────────────────────────────────────────
/// Any component that turns raw slide text into a short summary.
pub trait Summarizer {
    /// Generate a summary for `text`. Pad and end tokens are already
    /// stripped from the result.
    fn summarize(&self, text: &str) -> Result<String>;

    /// Resolve the description shown to an end user.
    ///
    /// Finalized text is returned unchanged. Otherwise a summary is
    /// generated from `source_text`; when generation fails or yields
    /// nothing, `fallback` is returned and the failure is only logged.
    fn describe(&self, state: &DescriptionState, source_text: &str, fallback: &str) -> String {
        if let DescriptionState::Finalized(text) = state {
            return text.clone();
        }
        match self.summarize(source_text) {
            Ok(generated) if !generated.trim().is_empty() => generated,
            Ok(_) => {
                tracing::warn!("Generated summary was empty, using fallback description");
                fallback.to_string()
            }
            Err(e) => {
                tracing::warn!("Summary generation failed: {e:#}");
                fallback.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl Summarizer for Fixed {
        fn summarize(&self, _text: &str) -> Result<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("model unavailable"))
        }
    }

    #[test]
    fn test_finalized_is_returned_without_generation() {
        let s     = Fixed(None);
        let state = DescriptionState::Finalized("kept".into());
        assert_eq!(s.describe(&state, "slides", "fallback"), "kept");
    }

    #[test]
    fn test_placeholder_triggers_generation() {
        let s = Fixed(Some("a generated summary"));
        assert_eq!(
            s.describe(&DescriptionState::Placeholder, "slides", "fallback"),
            "a generated summary"
        );
    }

    #[test]
    fn test_failure_degrades_to_fallback() {
        let s = Fixed(None);
        assert_eq!(s.describe(&DescriptionState::Absent, "slides", "fallback"), "fallback");
    }

    #[test]
    fn test_empty_generation_degrades_to_fallback() {
        let s = Fixed(Some("   "));
        assert_eq!(s.describe(&DescriptionState::Absent, "slides", "fallback"), "fallback");
    }
}
