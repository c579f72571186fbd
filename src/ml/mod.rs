// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn tensors lives here. Other
// layers hand in plain ids and get back plain ids, losses
// or graphs.
//
// What's in this layer:
//
//   positional.rs — fixed sinusoidal position signal
//   norm.rs       — layer normalisation (std + eps form)
//   mask.rs       — causal and padding attention masks
//   attention.rs  — scaled dot-product + multi-head attention
//   block.rs      — feed-forward, pre-norm residuals,
//                   encoder/decoder blocks and stacks
//   model.rs      — Seq2Seq encode / decode / project and
//                   the pad-masked cross-entropy loss
//   trainer.rs    — teacher-forced training loop with
//                   per-epoch validation and checkpoints
//   inferencer.rs — greedy arg-max decoding
//   export/       — frozen inference graph, its runtime and
//                   the live-vs-exported validation
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Sinusoidal positional encoding
pub mod positional;

/// Layer normalisation
pub mod norm;

/// Attention masks
pub mod mask;

/// Multi-head attention and its kernels
pub mod attention;

/// Transformer blocks and stacks
pub mod block;

/// Seq2Seq model and loss
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Greedy decoding
pub mod inferencer;

/// Portable inference graph
pub mod export;
