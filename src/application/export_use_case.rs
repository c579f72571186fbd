// ============================================================
// Layer 2 — ExportUseCase
// ============================================================
// Turns one checkpoint into a portable inference artifact:
//
//   Step 1: Pick the epoch (given, or the latest saved)
//   Step 2: Rebuild the model and load its weights (CPU)
//   Step 3: Freeze + self-check + compare with the live model
//   Step 4: Write the artifact JSON
//
// A failed comparison is fatal: nothing is written.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::export::{export_graph, graph::InferenceGraph};

type ExportBackend = burn::backend::NdArray;

pub struct ExportUseCase {
    checkpoint_dir: PathBuf,
    epoch:          Option<usize>,
    output:         PathBuf,
}

impl ExportUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>, epoch: Option<usize>, output: impl Into<PathBuf>) -> Self {
        Self { checkpoint_dir: checkpoint_dir.into(), epoch, output: output.into() }
    }

    pub fn execute(&self) -> Result<InferenceGraph> {
        let ckpt_manager = CheckpointManager::open(&self.checkpoint_dir)?;

        // ── Step 1: Which epoch ───────────────────────────────────────────────
        let epoch = match self.epoch {
            Some(epoch) => epoch,
            None        => ckpt_manager.latest_epoch()?,
        };

        // ── Step 2: Rebuild model ─────────────────────────────────────────────
        let device     = Default::default();
        let (model, _) = ckpt_manager.load_model::<ExportBackend>(epoch, &device)?;

        // ── Step 3: Freeze and validate ───────────────────────────────────────
        let graph = export_graph(&model, epoch, &device)
            .with_context(|| format!("Export of epoch {epoch} failed validation"))?;

        // ── Step 4: Write artifact ────────────────────────────────────────────
        graph.save(&self.output)?;
        tracing::info!(
            "Exported epoch {} ({} constants, {} nodes) to '{}'",
            epoch,
            graph.constants.len(),
            graph.nodes.len(),
            self.output.display()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::Vocabulary;
    use crate::infra::checkpoint::CheckpointMeta;
    use crate::ml::model::{Seq2Seq, Seq2SeqConfig};
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamConfig;

    type TrainBackend = Autodiff<NdArray>;

    #[test]
    fn test_exports_latest_checkpoint() {
        let dir       = tempfile::tempdir().unwrap();
        let mgr       = CheckpointManager::new(dir.path());
        let vocab     = Vocabulary::build("a b c d".split_whitespace(), 10);
        let model_cfg = Seq2SeqConfig::new(vocab.len(), 5, 4)
            .with_d_model(8)
            .with_num_layers(1)
            .with_num_heads(2)
            .with_d_ff(16);
        let model = model_cfg.init::<TrainBackend>(&Default::default()).unwrap();
        let optim = AdamConfig::new().init::<TrainBackend, Seq2Seq<TrainBackend>>();
        let meta  = CheckpointMeta { epoch: 3, model: model_cfg, vocab, train_loss: 1.0, val_loss: Some(1.2) };
        mgr.save_epoch(&model, &optim, &meta).unwrap();

        let output = dir.path().join("artifact.json");
        let graph  = ExportUseCase::new(dir.path(), None, &output).execute().unwrap();
        assert_eq!(graph.source_epoch, 3);
        assert!(output.exists());
        let written = InferenceGraph::load(&output).unwrap();
        assert_eq!(written.source_epoch, 3);
        assert_eq!(written.nodes, graph.nodes);
        assert_eq!(written.constants.len(), graph.constants.len());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("artifact.json");
        assert!(ExportUseCase::new(dir.path(), None, &out).execute().is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_mistyped_checkpoint_dir_is_not_created() {
        let dir     = tempfile::tempdir().unwrap();
        let missing = dir.path().join("chekpoints");
        let out     = dir.path().join("artifact.json");
        assert!(ExportUseCase::new(&missing, None, &out).execute().is_err());
        assert!(!missing.exists());
    }
}
