// ============================================================
// Layer 5 — Attention Masks
// ============================================================
// Masks are Bool tensors of shape [batch or 1, 1, q_len, k_len]
// where `true` means "query may attend to this key". The
// attention kernel broadcasts them over heads (and batch).
//
//   causal  — lower triangle incl. the diagonal, built fresh
//             for whatever target length is being decoded
//   padding — keys that are not <pad>
//
// Example causal mask for len = 4 (1 = allowed):
//   1 0 0 0
//   1 1 0 0
//   1 1 1 0
//   1 1 1 1

use burn::prelude::*;

/// Row-major `len x len` lower-triangular pattern.
pub fn causal_pattern(len: usize) -> Vec<bool> {
    (0..len)
        .flat_map(|i| (0..len).map(move |j| j <= i))
        .collect()
}

/// [1, 1, len, len] causal mask.
pub fn causal_mask<B: Backend>(len: usize, device: &B::Device) -> Tensor<B, 4, Bool> {
    Tensor::<B, 2, Bool>::from_data(TensorData::new(causal_pattern(len), [len, len]), device)
        .reshape([1, 1, len, len])
}

/// [batch, 1, 1, len] mask that hides `pad_id` keys.
pub fn padding_mask<B: Backend>(ids: Tensor<B, 2, Int>, pad_id: u32) -> Tensor<B, 4, Bool> {
    let [batch, len] = ids.dims();
    ids.not_equal_elem(pad_id as i64).reshape([batch, 1, 1, len])
}

/// Source-side mask for encoder self-attention and cross-attention.
/// `None` means every source position is visible.
pub fn source_mask<B: Backend>(
    src:          &Tensor<B, 2, Int>,
    mask_padding: bool,
    pad_id:       u32,
) -> Option<Tensor<B, 4, Bool>> {
    mask_padding.then(|| padding_mask(src.clone(), pad_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_causal_pattern_is_lower_triangular_inclusive() {
        let len = 5;
        let p   = causal_pattern(len);
        for i in 0..len {
            for j in 0..len {
                assert_eq!(p[i * len + j], j <= i, "position {i} vs key {j}");
            }
        }
    }

    #[test]
    fn test_causal_mask_tensor_matches_pattern() {
        let device = Default::default();
        let mask   = causal_mask::<TestBackend>(3, &device);
        assert_eq!(mask.dims(), [1, 1, 3, 3]);
        let values: Vec<i64> = mask.int().into_data().iter::<i64>().collect();
        assert_eq!(values, vec![1, 0, 0, 1, 1, 0, 1, 1, 1]);
    }

    #[test]
    fn test_padding_mask_hides_pad_keys() {
        let device = Default::default();
        let ids = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![5i64, 6, 0, 7, 0, 0], [2, 3]),
            &device,
        );
        let mask = padding_mask(ids, 0);
        assert_eq!(mask.dims(), [2, 1, 1, 3]);
        let values: Vec<i64> = mask.int().into_data().iter::<i64>().collect();
        assert_eq!(values, vec![1, 1, 0, 1, 0, 0]);
    }

    #[test]
    fn test_source_mask_is_optional() {
        let device = Default::default();
        let ids    = Tensor::<TestBackend, 2, Int>::zeros([1, 4], &device);
        assert!(source_mask(&ids, false, 0).is_none());
        assert!(source_mask(&ids, true, 0).is_some());
    }
}
