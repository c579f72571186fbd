// ============================================================
// Layer 5 — Layer Normalisation
// ============================================================
//   y = alpha * (x - mean) / (std + eps) + bias
//
// over the last dimension, with the unbiased (n - 1) standard
// deviation. alpha starts at 1, bias at 0.
//
// `layer_norm` is a free function so the inference runtime can
// run the exact same arithmetic on exported weights.

use burn::{
    module::Param,
    prelude::*,
};

/// Normalise x: [batch, seq, d] over d. Requires d >= 2.
pub fn layer_norm<B: Backend>(
    x:     Tensor<B, 3>,
    alpha: Tensor<B, 1>,
    bias:  Tensor<B, 1>,
    eps:   f64,
) -> Tensor<B, 3> {
    let [_, _, d] = x.dims();
    let mean      = x.clone().mean_dim(2);
    let centered  = x - mean;
    let std = (centered.clone().powf_scalar(2.0).sum_dim(2) / (d as f64 - 1.0)).sqrt();
    let normed = centered / (std + eps);
    normed * alpha.unsqueeze::<3>() + bias.unsqueeze::<3>()
}

#[derive(Config, Debug)]
pub struct LayerNormalizationConfig {
    pub d_model: usize,
    #[config(default = 1e-6)]
    pub eps: f64,
}

impl LayerNormalizationConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LayerNormalization<B> {
        LayerNormalization {
            alpha: Param::from_tensor(Tensor::ones([self.d_model], device)),
            bias:  Param::from_tensor(Tensor::zeros([self.d_model], device)),
            eps:   self.eps,
        }
    }
}

#[derive(Module, Debug)]
pub struct LayerNormalization<B: Backend> {
    pub alpha: Param<Tensor<B, 1>>,
    pub bias:  Param<Tensor<B, 1>>,
    pub eps:   f64,
}

impl<B: Backend> LayerNormalization<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        layer_norm(x, self.alpha.val(), self.bias.val(), self.eps)
    }
}
