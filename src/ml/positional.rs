// ============================================================
// Layer 5 — Sinusoidal Positional Encoding
// ============================================================
// Attention has no notion of order, so each position gets a
// fixed signal added to its (scaled) token embedding:
//
//   PE[p, 2i]   = sin(p / 10000^(2i / d_model))
//   PE[p, 2i+1] = cos(p / 10000^(2i / d_model))
//
// The table depends only on (max_len, d_model), is computed
// once at construction and never trained. Dropout follows the
// addition and is only active on an autodiff backend.
//
// Reference: Vaswani et al. (2017) §3.5

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
};

/// Row-major [max_len, d_model] sinusoid table.
pub fn sinusoid_table(max_len: usize, d_model: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_len * d_model];
    for p in 0..max_len {
        for c in 0..d_model {
            let pair  = (c / 2) * 2;
            let rate  = 10_000f64.powf(pair as f64 / d_model as f64);
            let angle = p as f64 / rate;
            table[p * d_model + c] = if c % 2 == 0 { angle.sin() } else { angle.cos() } as f32;
        }
    }
    table
}

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    pub max_len: usize,
    pub d_model: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl PositionalEncodingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionalEncoding<B> {
        let data  = TensorData::new(sinusoid_table(self.max_len, self.d_model), [self.max_len, self.d_model]);
        let table = Tensor::<B, 2>::from_data(data, device);
        PositionalEncoding {
            table,
            dropout: DropoutConfig::new(self.dropout).init(),
            max_len: self.max_len,
        }
    }
}

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    /// Constant [max_len, d_model] table, not a trainable parameter
    pub table:   Tensor<B, 2>,
    pub dropout: Dropout,
    pub max_len: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    /// x: [batch, seq_len, d_model] with seq_len <= max_len
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [_, seq_len, d_model] = x.dims();
        let signal = self
            .table
            .clone()
            .slice([0..seq_len, 0..d_model])
            .unsqueeze::<3>();
        self.dropout.forward(x + signal)
    }
}
