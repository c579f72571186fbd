// ============================================================
// Layer 5 — Multi-Head Attention
// ============================================================
// Scaled dot-product attention, written from tensor primitives:
//
//   scores  = Q · Kᵀ / √d_k                 [b, h, q, k]
//   scores  = -1e9 where mask is false
//   weights = softmax(scores, over k)       rows sum to 1
//   weights = dropout(weights)              train-time only
//   context = weights · V                   [b, h, q, d_k]
//
// The multi-head wrapper projects Q/K/V, splits d_model into
// h heads of d_k = d_model / h, runs the kernel per head,
// concatenates the heads and applies the output projection.
//
// `scaled_dot_product_attention`, `split_heads`, `merge_heads`
// and `linear` are free functions so the exported-graph runtime
// executes the same arithmetic on frozen weights.
//
// Reference: Vaswani et al. (2017) §3.2

use burn::{
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::domain::error::{SummarizerError, SummarizerResult};

/// Score assigned to disallowed key positions before the softmax.
pub const MASKED_SCORE: f32 = -1e9;

/// x · W + b with W laid out [d_in, d_out].
pub fn linear<B: Backend>(
    x:      Tensor<B, 3>,
    weight: Tensor<B, 2>,
    bias:   Option<Tensor<B, 1>>,
) -> Tensor<B, 3> {
    let out = x.matmul(weight.unsqueeze::<3>());
    match bias {
        Some(b) => out + b.unsqueeze::<3>(),
        None    => out,
    }
}

/// [b, len, d_model] → [b, heads, len, d_k]
pub fn split_heads<B: Backend>(x: Tensor<B, 3>, heads: usize) -> Tensor<B, 4> {
    let [batch, len, d_model] = x.dims();
    x.reshape([batch, len, heads, d_model / heads]).swap_dims(1, 2)
}

/// [b, heads, len, d_k] → [b, len, d_model]
pub fn merge_heads<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, heads, len, d_k] = x.dims();
    x.swap_dims(1, 2).reshape([batch, len, heads * d_k])
}

/// Returns (context, weights). `mask` broadcasts over batch and heads.
pub fn scaled_dot_product_attention<B: Backend>(
    query:   Tensor<B, 4>,
    key:     Tensor<B, 4>,
    value:   Tensor<B, 4>,
    mask:    Option<Tensor<B, 4, Bool>>,
    dropout: Option<&Dropout>,
) -> (Tensor<B, 4>, Tensor<B, 4>) {
    let [batch, heads, q_len, d_k] = query.dims();
    let k_len = key.dims()[2];

    let scores = query.matmul(key.swap_dims(2, 3)) / (d_k as f64).sqrt();
    let scores = match mask {
        Some(mask) => {
            let blocked = mask.expand([batch, heads, q_len, k_len]).bool_not();
            scores.mask_fill(blocked, MASKED_SCORE)
        }
        None => scores,
    };

    let weights = softmax(scores, 3);
    let weights = match dropout {
        Some(d) => d.forward(weights),
        None    => weights,
    };
    (weights.clone().matmul(value), weights)
}

#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl MultiHeadAttentionConfig {
    pub fn validate(&self) -> SummarizerResult<()> {
        if self.num_heads == 0 {
            return Err(SummarizerError::Config("num_heads must be positive".into()));
        }
        if self.d_model % self.num_heads != 0 {
            return Err(SummarizerError::Config(format!(
                "d_model ({}) must be divisible by num_heads ({})",
                self.d_model, self.num_heads
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> SummarizerResult<MultiHeadAttention<B>> {
        self.validate()?;
        let proj = || {
            LinearConfig::new(self.d_model, self.d_model)
                .with_initializer(Initializer::XavierUniform { gain: 1.0 })
                .init(device)
        };
        Ok(MultiHeadAttention {
            w_q:       proj(),
            w_k:       proj(),
            w_v:       proj(),
            w_o:       proj(),
            dropout:   DropoutConfig::new(self.dropout).init(),
            num_heads: self.num_heads,
        })
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    pub w_q:       Linear<B>,
    pub w_k:       Linear<B>,
    pub w_v:       Linear<B>,
    pub w_o:       Linear<B>,
    pub dropout:   Dropout,
    pub num_heads: usize,
}

impl<B: Backend> MultiHeadAttention<B> {
    /// query: [b, q, d_model], key/value: [b, k, d_model] → [b, q, d_model]
    pub fn forward(
        &self,
        query: Tensor<B, 3>,
        key:   Tensor<B, 3>,
        value: Tensor<B, 3>,
        mask:  Option<Tensor<B, 4, Bool>>,
    ) -> Tensor<B, 3> {
        let q = split_heads(self.w_q.forward(query), self.num_heads);
        let k = split_heads(self.w_k.forward(key),   self.num_heads);
        let v = split_heads(self.w_v.forward(value), self.num_heads);

        let (context, _) = scaled_dot_product_attention(q, k, v, mask, Some(&self.dropout));
        self.w_o.forward(merge_heads(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::mask::causal_mask;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn random(shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::random(shape, burn::tensor::Distribution::Normal(0.0, 1.0), &Default::default())
    }

    #[test]
    fn test_weights_sum_to_one_and_masked_keys_get_zero() {
        let (b, h, l, d) = (2, 2, 5, 4);
        let mask = causal_mask::<TestBackend>(l, &Default::default());
        let (_, weights) =
            scaled_dot_product_attention(random([b, h, l, d]), random([b, h, l, d]), random([b, h, l, d]), Some(mask), None);

        let w: Vec<f32> = weights.into_data().iter::<f32>().collect();
        for row in 0..(b * h * l) {
            let i     = row % l;
            let slice = &w[row * l..(row + 1) * l];
            let total: f32 = slice.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "row {row} sums to {total}");
            for (j, &weight) in slice.iter().enumerate() {
                if j > i {
                    assert!(weight.abs() < 1e-7, "masked key {j} for query {i} has weight {weight}");
                }
            }
        }
    }

    #[test]
    fn test_unmasked_weights_sum_to_one() {
        let (_, weights) =
            scaled_dot_product_attention(random([1, 1, 3, 8]), random([1, 1, 6, 8]), random([1, 1, 6, 8]), None, None);
        assert_eq!(weights.dims(), [1, 1, 3, 6]);
        let sums: Vec<f32> = weights.sum_dim(3).into_data().iter::<f32>().collect();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_split_merge_heads_is_identity() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::random([2, 3, 8], burn::tensor::Distribution::Default, &device);
        let back = merge_heads(split_heads(x.clone(), 4));
        let a: Vec<f32> = x.into_data().iter::<f32>().collect();
        let b: Vec<f32> = back.into_data().iter::<f32>().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_head_count_must_divide_width() {
        let device = Default::default();
        let err = MultiHeadAttentionConfig::new(10, 3).init::<TestBackend>(&device);
        assert!(matches!(err, Err(SummarizerError::Config(_))));
        assert!(MultiHeadAttentionConfig::new(10, 0).init::<TestBackend>(&device).is_err());
    }

    #[test]
    fn test_module_output_shape_follows_query() {
        let device = Default::default();
        let mha    = MultiHeadAttentionConfig::new(8, 2).init::<TestBackend>(&device).unwrap();
        let q      = Tensor::<TestBackend, 3>::ones([2, 3, 8], &device);
        let kv     = Tensor::<TestBackend, 3>::ones([2, 7, 8], &device);
        assert_eq!(mha.forward(q, kv.clone(), kv, None).dims(), [2, 3, 8]);
    }

    #[test]
    fn test_module_matches_free_functions() {
        let device = Default::default();
        let mha    = MultiHeadAttentionConfig::new(8, 2).init::<TestBackend>(&device).unwrap();
        let x      = Tensor::<TestBackend, 3>::random([1, 4, 8], burn::tensor::Distribution::Default, &device);

        let from_module = mha.forward(x.clone(), x.clone(), x.clone(), None);

        let p = |l: &Linear<TestBackend>| (l.weight.val(), l.bias.as_ref().map(|b| b.val()));
        let (wq, bq) = p(&mha.w_q);
        let (wk, bk) = p(&mha.w_k);
        let (wv, bv) = p(&mha.w_v);
        let (wo, bo) = p(&mha.w_o);
        let (ctx, _) = scaled_dot_product_attention(
            split_heads(linear(x.clone(), wq, bq), 2),
            split_heads(linear(x.clone(), wk, bk), 2),
            split_heads(linear(x, wv, bv), 2),
            None,
            None,
        );
        let from_kernels = linear(merge_heads(ctx), wo, bo);

        let a: Vec<f32> = from_module.into_data().iter::<f32>().collect();
        let b: Vec<f32> = from_kernels.into_data().iter::<f32>().collect();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-5);
        }
    }
}
