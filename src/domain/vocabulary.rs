// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Bidirectional token <-> id mapping built once from the
// training corpus and immutable afterwards.
//
// Layout:
//   id 0  <pad>   fills sequences up to their fixed length
//   id 1  <sos>   first decoder input token
//   id 2  <eos>   emitted after the last real target token
//   id 3  <unk>   any token not in the vocabulary
//   id 4… corpus tokens, most frequent first
//
// Ties in frequency keep first-seen order (stable sort), so
// building twice from the same corpus gives the same ids.
//
// Reference: Rust Book §8 (HashMap), §13 (Iterators)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::{SummarizerError, SummarizerResult};

pub const PAD_TOKEN: &str = "<pad>";
pub const SOS_TOKEN: &str = "<sos>";
pub const EOS_TOKEN: &str = "<eos>";
pub const UNK_TOKEN: &str = "<unk>";

/// The reserved tokens in id order.
pub const RESERVED_TOKENS: [&str; 4] = [PAD_TOKEN, SOS_TOKEN, EOS_TOKEN, UNK_TOKEN];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    idx2tok: Vec<String>,
    tok2idx: HashMap<String, u32>,
}

impl Vocabulary {
    pub const PAD_ID: u32 = 0;
    pub const SOS_ID: u32 = 1;
    pub const EOS_ID: u32 = 2;
    pub const UNK_ID: u32 = 3;

    /// Build a vocabulary from a token stream.
    ///
    /// Keeps at most `max_vocab` corpus tokens on top of the four
    /// reserved ones. An empty stream yields the reserved tokens only.
    pub fn build<I, S>(tokens: I, max_vocab: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // (token, count) in first-seen order
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut slot:   HashMap<String, usize> = HashMap::new();

        for tok in tokens {
            let tok = tok.as_ref();
            if RESERVED_TOKENS.contains(&tok) {
                continue;
            }
            match slot.get(tok) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    slot.insert(tok.to_string(), counts.len());
                    counts.push((tok.to_string(), 1));
                }
            }
        }

        // Vec::sort_by is stable: equal counts keep first-seen order
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(max_vocab);

        let idx2tok: Vec<String> = RESERVED_TOKENS
            .iter()
            .map(|t| t.to_string())
            .chain(counts.into_iter().map(|(t, _)| t))
            .collect();

        tracing::debug!("Vocabulary built with {} entries", idx2tok.len());
        Self::index(idx2tok)
    }

    /// Rebuild a vocabulary from a persisted token list.
    ///
    /// The list must start with the reserved tokens and contain no
    /// duplicates.
    pub fn from_tokens(idx2tok: Vec<String>) -> SummarizerResult<Self> {
        if idx2tok.len() < RESERVED_TOKENS.len()
            || idx2tok.iter().zip(RESERVED_TOKENS).any(|(a, b)| a.as_str() != b)
        {
            return Err(SummarizerError::Data(format!(
                "vocabulary must start with {:?}",
                RESERVED_TOKENS
            )));
        }
        let vocab = Self::index(idx2tok);
        if vocab.tok2idx.len() != vocab.idx2tok.len() {
            return Err(SummarizerError::Data(
                "vocabulary contains duplicate tokens".to_string(),
            ));
        }
        Ok(vocab)
    }

    fn index(idx2tok: Vec<String>) -> Self {
        let tok2idx = idx2tok
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Self { idx2tok, tok2idx }
    }

    pub fn len(&self) -> usize {
        self.idx2tok.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idx2tok.is_empty()
    }

    /// Id of a token; unseen tokens map to `<unk>`.
    pub fn id_of(&self, token: &str) -> u32 {
        self.tok2idx.get(token).copied().unwrap_or(Self::UNK_ID)
    }

    pub fn token_of(&self, id: u32) -> Option<&str> {
        self.idx2tok.get(id as usize).map(String::as_str)
    }

    /// Map ids back to tokens, dropping `<pad>` and `<eos>`.
    /// Ids outside the vocabulary are skipped.
    pub fn decode_ids(&self, ids: &[u32]) -> Vec<&str> {
        ids.iter()
            .filter(|&&id| id != Self::PAD_ID && id != Self::EOS_ID)
            .filter_map(|&id| self.token_of(id))
            .collect()
    }

    /// Space-joined text for a generated id sequence.
    pub fn decode_to_string(&self, ids: &[u32]) -> String {
        self.decode_ids(ids).join(" ")
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = SummarizerError;

    fn try_from(tokens: Vec<String>) -> SummarizerResult<Self> {
        Self::from_tokens(tokens)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(v: Vocabulary) -> Self {
        v.idx2tok
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::Preprocessor;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_reserved_ids_come_first() {
        let p      = Preprocessor::new();
        let corpus = ["the cat sat", "a dog ran"];
        let v      = Vocabulary::build(corpus.iter().flat_map(|text| p.tokenize(text)), 10);
        assert_eq!(v.token_of(0), Some(PAD_TOKEN));
        assert_eq!(v.token_of(1), Some(SOS_TOKEN));
        assert_eq!(v.token_of(2), Some(EOS_TOKEN));
        assert_eq!(v.token_of(3), Some(UNK_TOKEN));
        // 4 reserved + 6 distinct corpus tokens
        assert_eq!(v.len(), 10);
        for token in ["the", "cat", "sat", "a", "dog", "ran"] {
            assert!(v.id_of(token) >= 4);
        }
    }

    #[test]
    fn test_max_vocab_caps_corpus_tokens() {
        let v = Vocabulary::build(words("a b c d e f g h i j k l"), 5);
        assert_eq!(v.len(), 4 + 5);
    }

    #[test]
    fn test_frequency_order_with_stable_ties() {
        let v = Vocabulary::build(words("x y y z z z w"), 10);
        assert_eq!(v.id_of("z"), 4);
        assert_eq!(v.id_of("y"), 5);
        // x and w both appear once; x was seen first
        assert_eq!(v.id_of("x"), 6);
        assert_eq!(v.id_of("w"), 7);
    }

    #[test]
    fn test_empty_corpus_has_only_reserved_tokens() {
        let v = Vocabulary::build(Vec::<String>::new(), 100);
        assert_eq!(v.len(), 4);
    }

    #[test]
    fn test_reserved_strings_never_collide() {
        let v = Vocabulary::build(words("<pad> <eos> hello"), 10);
        assert_eq!(v.len(), 5);
        assert_eq!(v.id_of("<pad>"), Vocabulary::PAD_ID);
        assert_eq!(v.id_of("hello"), 4);
    }

    #[test]
    fn test_unknown_token_maps_to_unk() {
        let v = Vocabulary::build(words("hello world"), 10);
        assert_eq!(v.id_of("never-seen"), Vocabulary::UNK_ID);
    }

    #[test]
    fn test_decode_strips_pad_and_eos() {
        let v = Vocabulary::build(words("hello world"), 10);
        let ids = [v.id_of("hello"), v.id_of("world"), Vocabulary::EOS_ID, 0, 0];
        assert_eq!(v.decode_to_string(&ids), "hello world");
    }

    #[test]
    fn test_from_tokens_rejects_bad_layout() {
        assert!(Vocabulary::from_tokens(words("a b c d")).is_err());
        let mut dup: Vec<String> = RESERVED_TOKENS.iter().map(|t| t.to_string()).collect();
        dup.push("x".into());
        dup.push("x".into());
        assert!(Vocabulary::from_tokens(dup).is_err());
    }

    #[test]
    fn test_serde_round_trip_as_token_list() {
        let v    = Vocabulary::build(words("one two two"), 10);
        let json = serde_json::to_string(&v).unwrap();
        assert!(json.starts_with("[\"<pad>\""));
        let back: Vocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
