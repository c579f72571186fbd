// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load corpus rows            (Layer 4 - data)
//   Step 2: Clean + tokenise text       (Layer 4 - data)
//   Step 3: Build or restore vocabulary (Layer 3 - domain / Layer 6 - infra)
//   Step 4: Encode training samples     (Layer 4 - data)
//   Step 5: Split train/validation      (Layer 4 - data)
//   Step 6: Build datasets              (Layer 4 - data)
//   Step 7: Save config                 (Layer 6 - infra)
//   Step 8: Run training loop           (Layer 5 - ml)
//
// On --resume the vocabulary and model config come from the
// latest checkpoint, so ids keep their meaning across runs.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::{SummaryDataset, SummarySample},
    encoder::SequenceEncoder,
    loader::CsvCorpusLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::{error::SummarizerError, traits::CorpusSource, vocabulary::Vocabulary};
use crate::infra::{checkpoint::CheckpointManager, metrics::EpochMetrics};
use crate::ml::{model::Seq2SeqConfig, trainer::run_training};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved next to the checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus:              PathBuf,
    pub checkpoint_dir:      PathBuf,
    pub src_len:             usize,
    pub tgt_len:             usize,
    pub max_vocab:           usize,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub lr:                  f64,
    pub d_model:             usize,
    pub num_layers:          usize,
    pub num_heads:           usize,
    pub d_ff:                usize,
    pub dropout:             f64,
    pub val_fraction:        f64,
    pub seed:                u64,
    pub mask_source_padding: bool,
    pub resume:              bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus:              PathBuf::from("data/corpus.csv"),
            checkpoint_dir:      PathBuf::from("checkpoints"),
            src_len:             40,
            tgt_len:             20,
            max_vocab:           30_000,
            batch_size:          32,
            epochs:              30,
            lr:                  1e-3,
            d_model:             128,
            num_layers:          4,
            num_heads:           8,
            d_ff:                512,
            dropout:             0.1,
            val_fraction:        0.1,
            seed:                42,
            mask_source_padding: false,
            resume:              false,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self, vocab_size: usize) -> Seq2SeqConfig {
        Seq2SeqConfig::new(vocab_size, self.src_len, self.tgt_len)
            .with_d_model(self.d_model)
            .with_num_layers(self.num_layers)
            .with_num_heads(self.num_heads)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
            .with_mask_source_padding(self.mask_source_padding)
    }
}

/// One tokenised (source, target) pair.
struct TokenizedRow {
    source: Vec<String>,
    target: Vec<String>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<Vec<EpochMetrics>> {
        let cfg = &self.config;

        // ── Step 1: Load corpus rows ──────────────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.corpus.display());
        let rows = CsvCorpusLoader::new(&cfg.corpus).load_rows()?;
        if rows.is_empty() {
            return Err(SummarizerError::Data("corpus has no usable rows".into()).into());
        }

        // ── Step 2: Clean + tokenise ──────────────────────────────────────────
        let preprocessor = Preprocessor::new();
        let tokenized: Vec<TokenizedRow> = rows
            .iter()
            .map(|row| TokenizedRow {
                source: preprocessor.tokenize(&row.slides),
                target: preprocessor.tokenize(&row.target_text()),
            })
            .collect();

        // ── Step 3: Vocabulary + model config ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        let (vocab, model_cfg, resume_from) = if cfg.resume {
            let epoch = ckpt_manager.latest_epoch()?;
            let meta  = ckpt_manager.load_meta(epoch)?;
            tracing::info!("Resuming from epoch {} with its saved vocabulary", epoch);
            (meta.vocab, meta.model, Some(epoch))
        } else {
            let all_tokens = tokenized
                .iter()
                .flat_map(|r| r.source.iter().chain(r.target.iter()));
            let vocab     = Vocabulary::build(all_tokens, cfg.max_vocab);
            let model_cfg = cfg.model_config(vocab.len());
            (vocab, model_cfg, None)
        };
        model_cfg.validate()?;
        tracing::info!("Vocabulary size: {}", vocab.len());

        // ── Step 4: Encode samples ────────────────────────────────────────────
        let encoder = SequenceEncoder::new(&vocab, model_cfg.src_len, model_cfg.tgt_len)?;
        let samples: Vec<SummarySample> = tokenized
            .iter()
            .map(|r| encoder.build_sample(r.source.as_slice(), r.target.as_slice()))
            .collect();
        tracing::info!("Built {} training samples", samples.len());

        // ── Step 5: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) =
            split_train_val(samples, 1.0 - cfg.val_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );
        if train_samples.is_empty() {
            return Err(SummarizerError::Data("no samples left for training".into()).into());
        }

        // ── Step 6: Build Burn datasets ───────────────────────────────────────
        let train_dataset = SummaryDataset::new(train_samples);
        let val_dataset   = SummaryDataset::new(val_samples);

        // ── Step 7: Save config ───────────────────────────────────────────────
        ckpt_manager.save_config(cfg)?;

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &model_cfg, &vocab, train_dataset, val_dataset, &ckpt_manager, resume_from)
            .context("Training run failed")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_training_script() {
        let cfg = TrainConfig::default();
        assert_eq!((cfg.src_len, cfg.tgt_len), (40, 20));
        assert_eq!((cfg.batch_size, cfg.epochs), (32, 30));
        assert_eq!(cfg.lr, 1e-3);
        assert_eq!(cfg.max_vocab, 30_000);
        assert!(cfg.model_config(100).validate().is_ok());
    }

    #[test]
    fn test_model_config_carries_hyper_parameters() {
        let cfg = TrainConfig { d_model: 64, num_heads: 4, mask_source_padding: true, ..TrainConfig::default() };
        let m   = cfg.model_config(50);
        assert_eq!(m.vocab_size, 50);
        assert_eq!(m.d_model, 64);
        assert_eq!(m.num_heads, 4);
        assert!(m.mask_source_padding);
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = TrainConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.corpus, cfg.corpus);
        assert_eq!(back.seed, cfg.seed);
    }

    #[test]
    fn test_empty_corpus_is_a_data_error() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.csv");
        std::fs::write(&corpus, "slides,summary,reflection\n").unwrap();

        let cfg = TrainConfig {
            corpus,
            checkpoint_dir: dir.path().join("ckpt"),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<SummarizerError>(), Some(SummarizerError::Data(_))));
    }
}
