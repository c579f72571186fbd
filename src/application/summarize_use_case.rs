// ============================================================
// Layer 2 — Summarizer Context
// ============================================================
// The explicit inference context: created once at process
// start, then passed by reference into every summarise call.
// It owns everything a request needs and nothing is global:
//
//   session       GraphSession over the exported artifact (CPU)
//   vocab         the vocabulary of the checkpoint that was exported
//   preprocessor  the same cleaning + tokenisation used in training
//   src_len       source length the model was trained with
//   max_len       greedy decoding budget
//
// Requests only read the context, so independent requests can
// share one instance.
//
//   text ─► tokenize ─► encode + pad (src_len) ─► greedy decode
//        ─► strip <pad>/<eos> ─► space-join

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::Path;

use crate::data::{batcher::ids_to_tensor, encoder::SequenceEncoder, preprocessor::Preprocessor};
use crate::domain::error::{SummarizerError, SummarizerResult};
use crate::domain::traits::Summarizer;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::export::session::{greedy_decode_session, GraphSession};

type ServeBackend = burn::backend::NdArray;

/// Greedy decoding budget when none is given.
pub const DEFAULT_MAX_LEN: usize = 20;

pub struct SummarizerContext {
    session:      GraphSession<ServeBackend>,
    vocab:        Vocabulary,
    preprocessor: Preprocessor,
    src_len:      usize,
    max_len:      usize,
}

impl SummarizerContext {
    pub fn new(
        session: GraphSession<ServeBackend>,
        vocab:   Vocabulary,
        src_len: usize,
        max_len: usize,
    ) -> SummarizerResult<Self> {
        let graph = session.graph();
        if vocab.len() != graph.vocab_size {
            return Err(SummarizerError::Graph(format!(
                "vocabulary has {} tokens but the artifact scores {}",
                vocab.len(),
                graph.vocab_size
            )));
        }
        let src_len = src_len.min(graph.max_src_len);
        Ok(Self { session, vocab, preprocessor: Preprocessor::new(), src_len, max_len })
    }

    /// Load the artifact and the vocabulary of the epoch it was frozen from.
    pub fn load(checkpoint_dir: &Path, artifact: &Path, max_len: usize) -> Result<Self> {
        let device  = Default::default();
        let session = GraphSession::<ServeBackend>::load(artifact, &device)?;
        let epoch   = session.graph().source_epoch;
        let meta    = CheckpointManager::open(checkpoint_dir)?
            .load_meta(epoch)
            .with_context(|| format!("Artifact was frozen from epoch {epoch}"))?;

        tracing::info!(
            "Summarizer ready: epoch {}, vocab {}, src_len {}, max_len {}",
            epoch,
            meta.vocab.len(),
            meta.model.src_len,
            max_len
        );
        Ok(Self::new(session, meta.vocab, meta.model.src_len, max_len)?)
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Generated ids for one text, cut after the first <eos>.
    pub fn generate_ids(&self, text: &str) -> SummarizerResult<Vec<u32>> {
        let tokens  = self.preprocessor.tokenize(text);
        let encoder = SequenceEncoder::new(&self.vocab, self.src_len, self.session.graph().max_tgt_len)?;
        let src     = encoder.encode_source(&tokens);

        let src_ids: Tensor<ServeBackend, 2, Int> = ids_to_tensor(&[src.as_slice()], self.session.device());
        let mut rows = greedy_decode_session(&self.session, src_ids, self.max_len)?;
        Ok(rows.pop().unwrap_or_default())
    }
}

impl Summarizer for SummarizerContext {
    fn summarize(&self, text: &str) -> Result<String> {
        let ids     = self.generate_ids(text)?;
        let summary = self.vocab.decode_to_string(&ids);
        tracing::debug!("Generated {} ids → '{}'", ids.len(), summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::description::DescriptionState;
    use crate::infra::checkpoint::CheckpointMeta;
    use crate::ml::export::freeze::freeze;
    use crate::ml::model::{Seq2Seq, Seq2SeqConfig};
    use burn::module::Param;

    fn vocab() -> Vocabulary {
        Vocabulary::build("rust is fast and safe".split_whitespace(), 10)
    }

    fn model_config() -> Seq2SeqConfig {
        Seq2SeqConfig::new(vocab().len(), 6, 5)
            .with_d_model(8)
            .with_num_layers(1)
            .with_num_heads(2)
            .with_d_ff(16)
    }

    fn model() -> Seq2Seq<ServeBackend> {
        model_config().init(&Default::default()).unwrap()
    }

    /// Projection that always scores `favourite` highest.
    fn always(mut model: Seq2Seq<ServeBackend>, favourite: u32) -> Seq2Seq<ServeBackend> {
        let mut bias = vec![0.0f32; vocab().len()];
        bias[favourite as usize] = 10.0;
        model.projection.weight = model.projection.weight.map(|w| w.zeros_like());
        model.projection.bias   = Some(Param::from_tensor(Tensor::from_data(
            TensorData::new(bias, [vocab().len()]),
            &Default::default(),
        )));
        model
    }

    fn context(model: &Seq2Seq<ServeBackend>, max_len: usize) -> SummarizerContext {
        let session = GraphSession::new(freeze(model, 1).unwrap(), &Default::default()).unwrap();
        SummarizerContext::new(session, vocab(), 6, max_len).unwrap()
    }

    #[test]
    fn test_summary_is_plain_text_within_budget() {
        let ctx     = context(&model(), 4);
        let ids     = ctx.generate_ids("Rust is fast, and SAFE!").unwrap();
        let summary = ctx.summarize("Rust is fast, and SAFE!").unwrap();
        assert!(ids.len() <= 4);
        assert!(!summary.contains("<pad>") && !summary.contains("<eos>"));
        assert_eq!(ctx.summarize("Rust is fast, and SAFE!").unwrap(), summary);
    }

    #[test]
    fn test_eos_only_model_falls_back_in_describe() {
        let ctx = context(&always(model(), Vocabulary::EOS_ID), 3);
        assert_eq!(ctx.summarize("anything").unwrap(), "");
        assert_eq!(
            ctx.describe(&DescriptionState::Placeholder, "anything", "stored description"),
            "stored description"
        );
    }

    #[test]
    fn test_generated_tokens_are_space_joined() {
        let fast = vocab().id_of("fast");
        let ctx  = context(&always(model(), fast), 3);
        assert_eq!(ctx.summarize("rust").unwrap(), "fast fast fast");
        assert_eq!(
            ctx.describe(&DescriptionState::Absent, "rust", "fallback"),
            "fast fast fast"
        );
    }

    #[test]
    fn test_vocabulary_must_match_artifact() {
        let session = GraphSession::new(freeze(&model(), 1).unwrap(), &Default::default()).unwrap();
        let small   = Vocabulary::build(["x"], 10);
        assert!(SummarizerContext::new(session, small, 6, 3).is_err());
    }

    #[test]
    fn test_load_uses_vocabulary_of_source_epoch() {
        let dir      = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("artifact.json");
        freeze(&model(), 7).unwrap().save(&artifact).unwrap();

        let meta = CheckpointMeta { epoch: 7, model: model_config(), vocab: vocab(), train_loss: 1.0, val_loss: None };
        std::fs::write(
            dir.path().join("checkpoint_epoch_7.json"),
            serde_json::to_string(&meta).unwrap(),
        )
        .unwrap();

        let ctx = SummarizerContext::load(dir.path(), &artifact, DEFAULT_MAX_LEN).unwrap();
        assert_eq!(ctx.vocab(), &vocab());
        assert!(ctx.summarize("rust is safe").is_ok());
    }

    #[test]
    fn test_load_without_metadata_fails() {
        let dir      = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("artifact.json");
        freeze(&model(), 2).unwrap().save(&artifact).unwrap();
        assert!(SummarizerContext::load(dir.path(), &artifact, 5).is_err());
    }

    #[test]
    fn test_load_leaves_missing_checkpoint_dir_alone() {
        let dir      = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("artifact.json");
        let missing  = dir.path().join("no_such_dir");
        freeze(&model(), 2).unwrap().save(&artifact).unwrap();
        assert!(SummarizerContext::load(&missing, &artifact, 5).is_err());
        assert!(!missing.exists());
    }
}
