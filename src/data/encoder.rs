// ============================================================
// Layer 4 — Sequence Encoder
// ============================================================
// Turns token lists into the fixed-length id sequences the
// model is trained on.
//
//   encode_and_pad(tokens, n)
//       map through the vocabulary (unseen → <unk>),
//       truncate to n, right-pad with <pad>
//
//   build_sample(src_tokens, tgt_tokens)
//       encoder_input = encode_and_pad(src, src_len)
//       target        = encode_and_pad(tgt, tgt_len - 1)
//       decoder_input = [<sos>] + target             (len tgt_len)
//       label         = real target + [<eos>] + pad  (len tgt_len)
//
// The target is encoded to tgt_len - 1 ids, so there is always
// room for <eos> right after the real content:
//
//   tgt_len = 6, target = [a, b]
//   decoder_input: <sos>  a     b     <pad> <pad> <pad>
//   label:         a      b     <eos> <pad> <pad> <pad>
//
//   label[i] == decoder_input[i + 1] for every real position i.
//
// Reference: Vaswani et al. (2017) §5 (teacher forcing)

use crate::data::dataset::SummarySample;
use crate::domain::error::{SummarizerError, SummarizerResult};
use crate::domain::vocabulary::Vocabulary;

pub struct SequenceEncoder<'a> {
    vocab:   &'a Vocabulary,
    src_len: usize,
    tgt_len: usize,
}

impl<'a> SequenceEncoder<'a> {
    /// `tgt_len` counts the start token, so it must be at least 2.
    pub fn new(vocab: &'a Vocabulary, src_len: usize, tgt_len: usize) -> SummarizerResult<Self> {
        if src_len == 0 || tgt_len < 2 {
            return Err(SummarizerError::Config(format!(
                "need src_len >= 1 and tgt_len >= 2, got src_len={src_len}, tgt_len={tgt_len}"
            )));
        }
        Ok(Self { vocab, src_len, tgt_len })
    }

    pub fn src_len(&self) -> usize {
        self.src_len
    }

    pub fn tgt_len(&self) -> usize {
        self.tgt_len
    }

    /// Map, truncate to `target_length`, and right-pad with `<pad>`.
    pub fn encode_and_pad<S: AsRef<str>>(&self, tokens: &[S], target_length: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = tokens
            .iter()
            .take(target_length)
            .map(|t| self.vocab.id_of(t.as_ref()))
            .collect();
        ids.resize(target_length, Vocabulary::PAD_ID);
        ids
    }

    /// Source side of a sample: `src_len` ids.
    pub fn encode_source<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<u32> {
        self.encode_and_pad(tokens, self.src_len)
    }

    /// Build one (encoder_input, decoder_input, label) triple.
    pub fn build_sample<S: AsRef<str>, T: AsRef<str>>(
        &self,
        src_tokens: &[S],
        tgt_tokens: &[T],
    ) -> SummarySample {
        let encoder_input = self.encode_source(src_tokens);

        let real   = tgt_tokens.len().min(self.tgt_len - 1);
        let target = self.encode_and_pad(tgt_tokens, self.tgt_len - 1);

        let mut decoder_input = Vec::with_capacity(self.tgt_len);
        decoder_input.push(Vocabulary::SOS_ID);
        decoder_input.extend_from_slice(&target);

        let mut label = Vec::with_capacity(self.tgt_len);
        label.extend_from_slice(&target[..real]);
        label.push(Vocabulary::EOS_ID);
        label.resize(self.tgt_len, Vocabulary::PAD_ID);

        SummarySample { encoder_input, decoder_input, label }
    }
}
