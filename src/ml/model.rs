// ============================================================
// Layer 5 — Seq2Seq Summarisation Model
// ============================================================
// Encoder-decoder transformer over one shared vocabulary:
//
//   src ids ─► embed·√d ─► +PE ─► Encoder ──────────┐
//                                                   ▼ memory
//   tgt ids ─► embed·√d ─► +PE ─► Decoder (causal + cross) ─► Linear ─► logits
//
// Source and target keep separate embedding tables and
// positional modules (sized src_len / tgt_len).
//
// Loss is cross-entropy over the vocabulary at every target
// position whose label is not <pad>, averaged over those
// positions only.
//
// Reference: Vaswani et al. (2017), Burn Book §3

use burn::{
    nn::{Embedding, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::data::batcher::SummaryBatch;
use crate::domain::error::{SummarizerError, SummarizerResult};
use crate::domain::vocabulary::Vocabulary;
use crate::ml::block::{BlockConfig, Decoder, Encoder};
use crate::ml::mask::{causal_mask, source_mask};
use crate::ml::positional::{PositionalEncoding, PositionalEncodingConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub vocab_size: usize,
    pub src_len:    usize,
    pub tgt_len:    usize,
    #[config(default = 128)]
    pub d_model: usize,
    #[config(default = 4)]
    pub num_layers: usize,
    #[config(default = 8)]
    pub num_heads: usize,
    #[config(default = 512)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 1e-6)]
    pub norm_eps: f64,
    /// Hide <pad> source keys from encoder self-attention and cross-attention.
    #[config(default = false)]
    pub mask_source_padding: bool,
}

impl Seq2SeqConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        let fail = |msg: String| -> SummarizerResult<()> { Err(SummarizerError::Config(msg)) };
        if self.num_heads == 0 {
            return fail("num_heads must be positive".into());
        }
        if self.d_model % self.num_heads != 0 {
            return fail(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            ));
        }
        if self.d_model < 2 {
            return fail(format!("d_model must be at least 2, got {}", self.d_model));
        }
        if self.src_len == 0 {
            return fail("src_len must be positive".into());
        }
        if self.tgt_len < 2 {
            return fail(format!("tgt_len must be at least 2, got {}", self.tgt_len));
        }
        if self.vocab_size < 4 {
            return fail(format!(
                "vocab_size must cover the 4 reserved tokens, got {}",
                self.vocab_size
            ));
        }
        Ok(())
    }

    fn block_config(&self) -> BlockConfig {
        BlockConfig::new(self.d_model, self.num_heads, self.d_ff)
            .with_dropout(self.dropout)
            .with_norm_eps(self.norm_eps)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SummarizerResult<Seq2Seq<B>> {
        self.validate()?;
        let xavier = Initializer::XavierUniform { gain: 1.0 };
        let blocks = self.block_config();

        // Embedding has no fan-in of its own; give Xavier the table shape.
        let embedding = || Embedding {
            weight: xavier.init_with::<B, 2, _>(
                [self.vocab_size, self.d_model],
                Some(self.vocab_size),
                Some(self.d_model),
                device,
            ),
        };
        let positional = |len: usize| {
            PositionalEncodingConfig::new(len, self.d_model)
                .with_dropout(self.dropout)
                .init(device)
        };

        Ok(Seq2Seq {
            src_embedding: embedding(),
            tgt_embedding: embedding(),
            src_position:  positional(self.src_len),
            tgt_position:  positional(self.tgt_len),
            encoder:       blocks.init_encoder(self.num_layers, device)?,
            decoder:       blocks.init_decoder(self.num_layers, device)?,
            projection:    LinearConfig::new(self.d_model, self.vocab_size)
                .with_initializer(xavier.clone())
                .init(device),
            d_model:             self.d_model,
            mask_source_padding: self.mask_source_padding,
        })
    }
}

#[derive(Module, Debug)]
pub struct Seq2Seq<B: Backend> {
    pub src_embedding:       Embedding<B>,
    pub tgt_embedding:       Embedding<B>,
    pub src_position:        PositionalEncoding<B>,
    pub tgt_position:        PositionalEncoding<B>,
    pub encoder:             Encoder<B>,
    pub decoder:             Decoder<B>,
    pub projection:          Linear<B>,
    pub d_model:             usize,
    pub mask_source_padding: bool,
}

impl<B: Backend> Seq2Seq<B> {
    pub fn src_capacity(&self) -> usize {
        self.src_position.max_len
    }

    pub fn tgt_capacity(&self) -> usize {
        self.tgt_position.max_len
    }

    /// Reject inputs longer than the positional tables.
    pub fn check_lengths(&self, src_len: usize, tgt_len: usize) -> SummarizerResult<()> {
        if src_len > self.src_capacity() {
            return Err(SummarizerError::SequenceTooLong { len: src_len, max: self.src_capacity() });
        }
        if tgt_len > self.tgt_capacity() {
            return Err(SummarizerError::SequenceTooLong { len: tgt_len, max: self.tgt_capacity() });
        }
        Ok(())
    }

    /// Source mask this model was configured to use, `None` when every
    /// source position is visible.
    pub fn source_mask(&self, src_ids: &Tensor<B, 2, Int>) -> Option<Tensor<B, 4, Bool>> {
        source_mask(src_ids, self.mask_source_padding, Vocabulary::PAD_ID)
    }

    /// src_ids: [batch, src_seq] → [batch, src_seq, d_model]
    pub fn encode(&self, src_ids: Tensor<B, 2, Int>, src_mask: Option<Tensor<B, 4, Bool>>) -> Tensor<B, 3> {
        let x = self.src_embedding.forward(src_ids) * (self.d_model as f64).sqrt();
        let x = self.src_position.forward(x);
        self.encoder.forward(x, src_mask)
    }

    /// tgt_ids: [batch, tgt_seq] → [batch, tgt_seq, d_model]
    pub fn decode(
        &self,
        encoder_output: Tensor<B, 3>,
        src_mask:       Option<Tensor<B, 4, Bool>>,
        tgt_ids:        Tensor<B, 2, Int>,
        tgt_mask:       Tensor<B, 4, Bool>,
    ) -> Tensor<B, 3> {
        let x = self.tgt_embedding.forward(tgt_ids) * (self.d_model as f64).sqrt();
        let x = self.tgt_position.forward(x);
        self.decoder.forward(x, encoder_output, src_mask, tgt_mask)
    }

    /// [batch, seq, d_model] → [batch, seq, vocab] unnormalised scores
    pub fn project(&self, decoder_output: Tensor<B, 3>) -> Tensor<B, 3> {
        self.projection.forward(decoder_output)
    }

    /// Teacher-forced pass with masks built internally.
    pub fn forward(&self, src_ids: Tensor<B, 2, Int>, tgt_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let tgt_len  = tgt_ids.dims()[1];
        let src_mask = self.source_mask(&src_ids);
        let tgt_mask = causal_mask(tgt_len, &tgt_ids.device());
        let memory   = self.encode(src_ids, src_mask.clone());
        self.project(self.decode(memory, src_mask, tgt_ids, tgt_mask))
    }

    /// Loss over one batch; returns (loss, logits).
    pub fn forward_loss(&self, batch: SummaryBatch<B>) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward(batch.encoder_input, batch.decoder_input);
        let loss   = masked_cross_entropy(logits.clone(), batch.labels, Vocabulary::PAD_ID);
        (loss, logits)
    }
}

/// Mean cross-entropy over positions whose label is not `pad_id`.
///
/// logits: [batch, seq, vocab], labels: [batch, seq] → [1]
pub fn masked_cross_entropy<B: Backend>(
    logits: Tensor<B, 3>,
    labels: Tensor<B, 2, Int>,
    pad_id: u32,
) -> Tensor<B, 1> {
    let [batch, seq, vocab] = logits.dims();
    let rows   = batch * seq;
    let labels = labels.reshape([rows, 1]);

    let log_probs = log_softmax(logits.reshape([rows, vocab]), 1);
    let picked    = log_probs.gather(1, labels.clone()).reshape([rows]);
    let keep      = labels.reshape([rows]).not_equal_elem(pad_id as i64).float();

    let count = keep.clone().sum().clamp_min(1.0);
    (picked.neg() * keep).sum() / count
}
