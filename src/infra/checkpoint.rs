// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores training state with Burn's gzipped
// MessagePack recorder at full precision, plus JSON metadata.
// Weights and Adam moments reload bit for bit, so export and
// --resume see exactly what training produced.
//
// What gets saved per epoch n (1-based):
//   1. model_epoch_{n}.mpk.gz      — all learned parameters
//   2. optim_epoch_{n}.mpk.gz      — Adam moment estimates
//   3. checkpoint_epoch_{n}.json   — epoch, model config,
//                                    vocabulary, losses
//   4. latest_epoch.json           — number of the newest epoch
//
// The model config and vocabulary travel with every epoch, so
// any single checkpoint is enough to rebuild the model and to
// map ids back to text. Nothing is ever deleted; choosing the
// best epoch is left to whoever deploys the model.
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz
//     optim_epoch_1.mpk.gz
//     checkpoint_epoch_1.json
//     ...
//     latest_epoch.json
//     train_config.json      ← the run's TrainConfig
//     metrics.csv            ← see metrics.rs
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::SummarizerError;
use crate::domain::vocabulary::Vocabulary;
use crate::ml::model::{Seq2Seq, Seq2SeqConfig};

/// Writes `<name>.mpk.gz` files.
type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Everything about an epoch that is not a tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub epoch:      usize,
    pub model:      Seq2SeqConfig,
    pub vocab:      Vocabulary,
    pub train_loss: f64,
    /// `None` when the validation split was empty
    pub val_loss:   Option<f64>,
}

/// Manages saving and loading of checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Manager for a training run.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        // like `mkdir -p`; a real failure surfaces on the first write
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Read-only manager over an existing directory. Never creates it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(SummarizerError::MissingCheckpoint(format!(
                "'{}' is not a directory",
                dir.display()
            ))
            .into());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    fn optim_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optim_epoch_{epoch}"))
    }

    fn meta_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("checkpoint_epoch_{epoch}.json"))
    }

    /// Save model, optimizer state and metadata for `meta.epoch`,
    /// then move the latest-epoch pointer.
    pub fn save_epoch<B, O>(&self, model: &Seq2Seq<B>, optim: &O, meta: &CheckpointMeta) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2Seq<B>, B>,
    {
        let epoch = meta.epoch;

        let path = self.model_path(epoch);
        CheckpointRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        let path = self.optim_path(epoch);
        CheckpointRecorder::new()
            .record(optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer state to '{}'", path.display()))?;

        let path = self.meta_path(epoch);
        fs::write(&path, serde_json::to_string_pretty(meta)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;

        // Written last so the pointer never names a half-written epoch
        fs::write(self.dir.join("latest_epoch.json"), serde_json::to_string(&epoch)?)
            .context("Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Read the metadata of one epoch.
    pub fn load_meta(&self, epoch: usize) -> Result<CheckpointMeta> {
        let path = self.meta_path(epoch);
        let json = fs::read_to_string(&path).map_err(|_| {
            SummarizerError::MissingCheckpoint(format!("{} (epoch {epoch})", self.dir.display()))
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint metadata '{}'", path.display()))
    }

    /// Rebuild the model of `epoch` from its config and load its weights.
    pub fn load_model<B: Backend>(&self, epoch: usize, device: &B::Device) -> Result<(Seq2Seq<B>, CheckpointMeta)> {
        let meta  = self.load_meta(epoch)?;
        let model = meta.model.init::<B>(device)?;
        let path  = self.model_path(epoch);

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load model weights '{}'", path.display()))?;
        Ok((model.load_record(record), meta))
    }

    /// Restore optimizer state saved alongside `epoch`.
    pub fn load_optimizer<B, O>(&self, optim: O, epoch: usize, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2Seq<B>, B>,
    {
        let path   = self.optim_path(epoch);
        let record = CheckpointRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;
        Ok(optim.load_record(record))
    }

    /// Number of the most recently saved epoch.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s    = fs::read_to_string(&path)
            .map_err(|_| SummarizerError::MissingCheckpoint(self.dir.display().to_string()))?;
        Ok(serde_json::from_str::<usize>(s.trim())?)
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;

    type TrainBackend = Autodiff<NdArray>;

    fn tiny_model_config() -> Seq2SeqConfig {
        Seq2SeqConfig::new(6, 4, 3)
            .with_d_model(4)
            .with_num_layers(1)
            .with_num_heads(2)
            .with_d_ff(8)
    }

    fn meta(epoch: usize) -> CheckpointMeta {
        CheckpointMeta {
            epoch,
            model:      tiny_model_config(),
            vocab:      Vocabulary::build(["a", "b"], 10),
            train_loss: 1.5,
            val_loss:   None,
        }
    }

    #[test]
    fn test_missing_directory_contents_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path());
        let err = mgr.latest_epoch().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SummarizerError>(),
            Some(SummarizerError::MissingCheckpoint(_))
        ));
        assert!(mgr.load_meta(1).is_err());
    }

    #[test]
    fn test_save_and_reload_epoch() {
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path());
        let device = Default::default();

        let model = tiny_model_config().init::<TrainBackend>(&device).unwrap();
        let optim = AdamConfig::new().init::<TrainBackend, Seq2Seq<TrainBackend>>();

        mgr.save_epoch(&model, &optim, &meta(1)).unwrap();
        mgr.save_epoch(&model, &optim, &meta(2)).unwrap();

        assert_eq!(mgr.latest_epoch().unwrap(), 2);
        assert!(dir.path().join("model_epoch_1.mpk.gz").exists());
        assert!(dir.path().join("optim_epoch_2.mpk.gz").exists());
        assert!(dir.path().join("checkpoint_epoch_2.json").exists());

        let (loaded, m) = mgr.load_model::<NdArray>(2, &device).unwrap();
        assert_eq!(m.epoch, 2);
        assert_eq!(m.vocab.len(), 6);
        assert_eq!(loaded.encoder.layers.len(), 1);

        let fresh = AdamConfig::new().init::<TrainBackend, Seq2Seq<TrainBackend>>();
        assert!(mgr.load_optimizer::<TrainBackend, _>(fresh, 2, &device).is_ok());
    }

    #[test]
    fn test_weights_reload_exactly() {
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path());
        let device = Default::default();

        let model = tiny_model_config().init::<TrainBackend>(&device).unwrap();
        let optim = AdamConfig::new().init::<TrainBackend, Seq2Seq<TrainBackend>>();
        mgr.save_epoch(&model, &optim, &meta(1)).unwrap();

        let (loaded, _) = mgr.load_model::<NdArray>(1, &device).unwrap();
        let values = |w: burn::tensor::TensorData| w.to_vec::<f32>().unwrap();
        assert_eq!(
            values(loaded.projection.weight.val().into_data()),
            values(model.projection.weight.val().into_data()),
        );
        assert_eq!(
            values(loaded.src_embedding.weight.val().into_data()),
            values(model.src_embedding.weight.val().into_data()),
        );
    }

    #[test]
    fn test_open_never_creates_the_directory() {
        let dir     = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo");
        let err     = CheckpointManager::open(&missing).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SummarizerError>(),
            Some(SummarizerError::MissingCheckpoint(_))
        ));
        assert!(!missing.exists());
        assert!(CheckpointManager::open(dir.path()).is_ok());
    }
}
