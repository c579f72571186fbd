// ============================================================
// Layer 5 — Export / Serve Bridge
// ============================================================
// Turns a trained Seq2Seq into a portable artifact and back:
//
//   Seq2Seq ──ServingWrapper──► (src, tgt) → logits   live
//      │
//      └──freeze──► InferenceGraph ──GraphSession──► (src, tgt) → logits
//                        │
//                        └── check() + compare with the live
//                            wrapper on a dummy input
//
// The wrapper builds both masks itself, so neither side needs
// mask-construction logic from its caller.
//
//   graph.rs    — artifact format and structural self-check
//   freeze.rs   — parameters → constants, modules → nodes
//   session.rs  — graph interpreter + session greedy decoding

/// Artifact format and structural self-check
pub mod graph;

/// Folds a trained model into an InferenceGraph
pub mod freeze;

/// Runs an InferenceGraph on a Burn backend
pub mod session;

use burn::prelude::*;

use crate::domain::error::{SummarizerError, SummarizerResult};
use crate::domain::vocabulary::Vocabulary;
use crate::ml::model::Seq2Seq;
use graph::InferenceGraph;
use session::GraphSession;

/// Largest element-wise difference accepted between live and exported logits.
pub const EXPORT_TOLERANCE: f32 = 1e-3;

/// The live model behind the artifact's calling convention.
pub struct ServingWrapper<'a, B: Backend> {
    model: &'a Seq2Seq<B>,
}

impl<'a, B: Backend> ServingWrapper<'a, B> {
    pub fn new(model: &'a Seq2Seq<B>) -> Self {
        Self { model }
    }

    /// (src, tgt) → logits, masks built internally.
    pub fn forward(&self, src: Tensor<B, 2, Int>, tgt: Tensor<B, 2, Int>) -> SummarizerResult<Tensor<B, 3>> {
        self.model.check_lengths(src.dims()[1], tgt.dims()[1])?;
        Ok(self.model.forward(src, tgt))
    }
}

/// Deterministic dummy (src, tgt) within the model's limits:
/// two rows, the second half-padded.
fn dummy_inputs<B: Backend>(
    vocab_size: usize,
    src_len:    usize,
    tgt_len:    usize,
    device:     &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    let corpus = vocab_size.saturating_sub(4);
    let token  = |i: usize| match corpus {
        0 => Vocabulary::UNK_ID as i64,
        n => 4 + (i % n) as i64,
    };
    let row = |len: usize, first: Option<i64>, real: usize| -> Vec<i64> {
        (0..len)
            .map(|i| match (i, first) {
                (0, Some(id)) => id,
                _ if i < real => token(i),
                _ => Vocabulary::PAD_ID as i64,
            })
            .collect()
    };
    let sos = Some(Vocabulary::SOS_ID as i64);

    let mut src = row(src_len, None, src_len);
    src.extend(row(src_len, None, src_len.div_ceil(2)));
    let mut tgt = row(tgt_len, sos, tgt_len);
    tgt.extend(row(tgt_len, sos, tgt_len.div_ceil(2)));

    (
        Tensor::from_data(TensorData::new(src, [2, src_len]), device),
        Tensor::from_data(TensorData::new(tgt, [2, tgt_len]), device),
    )
}

/// Run one dummy input through the live wrapper and a session over
/// `graph`; returns the largest absolute logit difference.
pub fn validate_export<B: Backend>(
    model:  &Seq2Seq<B>,
    graph:  &InferenceGraph,
    device: &B::Device,
) -> SummarizerResult<f32> {
    graph.check()?;
    let session = GraphSession::<B>::new(graph.clone(), device)?;

    let src_len = model.src_capacity().min(8);
    let tgt_len = model.tgt_capacity().min(5);
    let (src, tgt) = dummy_inputs::<B>(graph.vocab_size, src_len, tgt_len, device);

    let live   = ServingWrapper::new(model).forward(src.clone(), tgt.clone())?;
    let served = session.run(src, tgt)?;

    if live.dims() != served.dims() {
        return Err(SummarizerError::ExportMismatch(format!(
            "live output shape {:?} differs from exported {:?}",
            live.dims(),
            served.dims()
        )));
    }

    let live:   Vec<f32> = live.into_data().iter::<f32>().collect();
    let served: Vec<f32> = served.into_data().iter::<f32>().collect();
    if served.iter().any(|v| !v.is_finite()) {
        return Err(SummarizerError::ExportMismatch("exported output contains non-finite values".into()));
    }

    let max_diff = live
        .iter()
        .zip(&served)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    if max_diff > EXPORT_TOLERANCE {
        return Err(SummarizerError::ExportMismatch(format!(
            "max logit difference {max_diff:.6} exceeds {EXPORT_TOLERANCE}"
        )));
    }
    Ok(max_diff)
}

/// Freeze, self-check and validate in one go.
pub fn export_graph<B: Backend>(
    model:        &Seq2Seq<B>,
    source_epoch: usize,
    device:       &B::Device,
) -> SummarizerResult<InferenceGraph> {
    let graph    = freeze::freeze(model, source_epoch)?;
    let max_diff = validate_export(model, &graph, device)?;
    tracing::info!("Exported graph validated (max logit difference {:.2e})", max_diff);
    Ok(graph)
}
