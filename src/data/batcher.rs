// ============================================================
// Layer 4 — Summary Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<SummarySample>
// into three [batch_size, seq_len] Int tensors.
//
//   [s1_t1, s1_t2, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// All sequences are padded to the same length when the sample
// is built, so batching is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SummarySample;

// ─── SummaryBatch ─────────────────────────────────────────────────────────────
/// A batch of samples ready for a teacher-forced forward pass.
#[derive(Debug, Clone)]
pub struct SummaryBatch<B: Backend> {
    /// Source ids — shape: [batch_size, src_len]
    pub encoder_input: Tensor<B, 2, Int>,

    /// <sos> + target ids — shape: [batch_size, tgt_len]
    pub decoder_input: Tensor<B, 2, Int>,

    /// target ids + <eos> — shape: [batch_size, tgt_len]
    pub labels: Tensor<B, 2, Int>,
}

// ─── SummaryBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct SummaryBatcher;

impl SummaryBatcher {
    pub fn new() -> Self {
        Self
    }
}

/// Stack equal-length id rows into a [rows, len] Int tensor.
pub fn ids_to_tensor<B: Backend>(rows: &[&[u32]], device: &B::Device) -> Tensor<B, 2, Int> {
    let len = rows.first().map_or(0, |r| r.len());
    let flat: Vec<i64> = rows
        .iter()
        .flat_map(|r| r.iter().map(|&id| id as i64))
        .collect();
    Tensor::<B, 2, Int>::from_data(TensorData::new(flat, [rows.len(), len]), device)
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<B, SummarySample, SummaryBatch<B>> for SummaryBatcher {
    fn batch(&self, items: Vec<SummarySample>, device: &B::Device) -> SummaryBatch<B> {
        let enc: Vec<&[u32]> = items.iter().map(|s| s.encoder_input.as_slice()).collect();
        let dec: Vec<&[u32]> = items.iter().map(|s| s.decoder_input.as_slice()).collect();
        let lab: Vec<&[u32]> = items.iter().map(|s| s.label.as_slice()).collect();

        SummaryBatch {
            encoder_input: ids_to_tensor(&enc, device),
            decoder_input: ids_to_tensor(&dec, device),
            labels:        ids_to_tensor(&lab, device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_values() {
        let device = Default::default();
        let items = vec![
            SummarySample { encoder_input: vec![4, 5, 0], decoder_input: vec![1, 6], label: vec![6, 2] },
            SummarySample { encoder_input: vec![7, 0, 0], decoder_input: vec![1, 0], label: vec![2, 0] },
        ];
        let batch: SummaryBatch<TestBackend> = SummaryBatcher::new().batch(items, &device);

        assert_eq!(batch.encoder_input.dims(), [2, 3]);
        assert_eq!(batch.decoder_input.dims(), [2, 2]);
        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![6, 2, 2, 0]);
    }
}
