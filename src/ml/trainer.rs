// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Teacher-forced train + validation loop using Burn's
// DataLoader and Adam.
//
// Per epoch:
//   1. Shuffled training batches: forward → masked CE loss →
//      backward → Adam step. One forward pass per batch over
//      the full decoder input (not autoregressive).
//   2. Validation on model.valid() (inner backend, dropout off,
//      no gradient tape).
//   3. Checkpoint + metrics row, every epoch, improved or not.
//
// Losses are per-sample means: each batch loss is weighted by
// its batch size before averaging over the split.
//
// A non-finite batch loss aborts the run with
// SummarizerError::Divergence; there is no retry and no
// gradient clipping.
//
// Key Burn 0.20 insight:
//   - Training uses Autodiff<Wgpu> for gradients
//   - model.valid() returns the model on the inner backend
//   - the validation loader must batch onto that inner backend
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SummaryBatcher, dataset::SummaryDataset};
use crate::domain::error::SummarizerError;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{Seq2Seq, Seq2SeqConfig};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Train on the default WGPU device.
pub fn run_training(
    cfg:           &TrainConfig,
    model_cfg:     &Seq2SeqConfig,
    vocab:         &Vocabulary,
    train_dataset: SummaryDataset,
    val_dataset:   SummaryDataset,
    ckpt_manager:  &CheckpointManager,
    resume_from:   Option<usize>,
) -> Result<Vec<EpochMetrics>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(
        cfg, model_cfg, vocab, train_dataset, val_dataset, ckpt_manager, resume_from, device,
    )
}

/// Backend-generic loop. `resume_from` names a saved epoch whose
/// model and optimizer state are restored; training continues
/// with the epoch after it.
#[allow(clippy::too_many_arguments)]
pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    model_cfg:     &Seq2SeqConfig,
    vocab:         &Vocabulary,
    train_dataset: SummaryDataset,
    val_dataset:   SummaryDataset,
    ckpt_manager:  &CheckpointManager,
    resume_from:   Option<usize>,
    device:        B::Device,
) -> Result<Vec<EpochMetrics>> {

    // ── Build or restore model + Adam ─────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);

    let (mut model, mut optim, first_epoch) = match resume_from {
        Some(epoch) => {
            let (model, _) = ckpt_manager.load_model::<B>(epoch, &device)?;
            let optim      = ckpt_manager.load_optimizer::<B, _>(optim_cfg.init::<B, Seq2Seq<B>>(), epoch, &device)?;
            tracing::info!("Resuming after epoch {}", epoch);
            (model, optim, epoch + 1)
        }
        None => {
            let model: Seq2Seq<B> = model_cfg.init(&device)?;
            (model, optim_cfg.init::<B, Seq2Seq<B>>(), 1)
        }
    };
    tracing::info!(
        "Model ready: {} layers, d_model={}, heads={}, vocab={}",
        model_cfg.num_layers, model_cfg.d_model, model_cfg.num_heads, model_cfg.vocab_size,
    );

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_samples = train_dataset.sample_count();
    let val_samples   = val_dataset.sample_count();

    let train_loader = DataLoaderBuilder::<B, _, _>::new(SummaryBatcher::new())
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .set_device(device.clone())
        .build(train_dataset);

    // Inner backend: no autodiff overhead
    let val_loader = DataLoaderBuilder::<B::InnerBackend, _, _>::new(SummaryBatcher::new())
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .set_device(device.clone())
        .build(val_dataset);

    let metrics_logger = MetricsLogger::new(ckpt_manager.dir())?;
    let mut history    = Vec::new();
    let mut best_val   = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in first_epoch..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;

        for (index, batch) in train_loader.iter().enumerate() {
            let batch_size = batch.encoder_input.dims()[0];
            let (loss, _)  = model.forward_loss(batch);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(SummarizerError::Divergence { epoch, batch: index + 1, loss: loss_val }.into());
            }
            train_loss_sum += loss_val * batch_size as f64;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = train_loss_sum / train_samples.max(1) as f64;

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut val_loss_sum = 0.0f64;

        for batch in val_loader.iter() {
            let batch_size = batch.encoder_input.dims()[0];
            let (loss, _)  = model_valid.forward_loss(batch);
            val_loss_sum  += loss.into_scalar().elem::<f64>() * batch_size as f64;
        }

        let val_loss = (val_samples > 0).then(|| val_loss_sum / val_samples as f64);

        match val_loss {
            Some(v) => println!(
                "Epoch {:>3}/{} | train_loss={:.6} | val_loss={:.6}",
                epoch, cfg.epochs, train_loss, v,
            ),
            None => println!(
                "Epoch {:>3}/{} | train_loss={:.6} | val_loss=n/a",
                epoch, cfg.epochs, train_loss,
            ),
        }

        // ── Persist ───────────────────────────────────────────────────────────
        let meta = CheckpointMeta {
            epoch,
            model: model_cfg.clone(),
            vocab: vocab.clone(),
            train_loss,
            val_loss,
        };
        ckpt_manager.save_epoch(&model, &optim, &meta)?;

        let row = EpochMetrics::new(epoch, train_loss, val_loss);
        if row.is_improvement(best_val) {
            best_val = row.val_loss.unwrap_or(best_val);
            tracing::info!("Epoch {} has the best validation loss so far ({:.6})", epoch, best_val);
        }
        metrics_logger.log(&row)?;
        history.push(row);

        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(history)
}
