// ============================================================
// Layer 3 — Description State
// ============================================================
// The web layer stores a description per article. Instead of
// comparing the stored text against a magic placeholder string,
// the field has three explicit states:
//
//   Absent       — nothing stored yet        → generate
//   Placeholder  — stored text is a stand-in → generate
//   Finalized    — real text, written by hand or cached → use as is
//
// Reference: Rust Book §6 (Enums and Pattern Matching)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "text", rename_all = "snake_case")]
pub enum DescriptionState {
    Absent,
    Placeholder,
    Finalized(String),
}

impl DescriptionState {
    /// Classify a stored value from a store that still uses a
    /// sentinel string for "please generate".
    pub fn from_stored(stored: Option<&str>, sentinel: &str) -> Self {
        match stored {
            None                                 => Self::Absent,
            Some(s) if s.trim().is_empty()       => Self::Absent,
            Some(s) if s == sentinel             => Self::Placeholder,
            Some(s)                              => Self::Finalized(s.to_string()),
        }
    }

    pub fn needs_generation(&self) -> bool {
        !matches!(self, Self::Finalized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stored_classifies_all_three_states() {
        assert_eq!(DescriptionState::from_stored(None, "des"), DescriptionState::Absent);
        assert_eq!(DescriptionState::from_stored(Some("  "), "des"), DescriptionState::Absent);
        assert_eq!(DescriptionState::from_stored(Some("des"), "des"), DescriptionState::Placeholder);
        assert_eq!(
            DescriptionState::from_stored(Some("A real description"), "des"),
            DescriptionState::Finalized("A real description".to_string()),
        );
    }

    #[test]
    fn test_only_finalized_skips_generation() {
        assert!(DescriptionState::Absent.needs_generation());
        assert!(DescriptionState::Placeholder.needs_generation());
        assert!(!DescriptionState::Finalized("x".into()).needs_generation());
    }
}
