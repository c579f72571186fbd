// ============================================================
// Layer 3 — Corpus Row Domain Type
// ============================================================
// One training example as it comes out of the corpus file:
// the concatenated slide text of a presentation and the
// human-written summary and reflection for it.
//
// Missing text cells are empty strings by the time a CorpusRow
// exists; the loader decides which rows to reject.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRow {
    /// Optional identifier, kept for traceability in logs
    pub id: Option<String>,

    /// Source side: the slide texts of one presentation
    pub slides: String,

    pub summary: String,

    pub reflection: String,
}

impl CorpusRow {
    pub fn new(
        slides:     impl Into<String>,
        summary:    impl Into<String>,
        reflection: impl Into<String>,
    ) -> Self {
        Self {
            id:         None,
            slides:     slides.into(),
            summary:    summary.into(),
            reflection: reflection.into(),
        }
    }

    /// Target side text: summary followed by reflection.
    pub fn target_text(&self) -> String {
        format!("{} {}", self.summary, self.reflection)
    }
}
