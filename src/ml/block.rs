// ============================================================
// Layer 5 — Transformer Blocks
// ============================================================
// Pre-norm residual form for every sublayer:
//
//   x = x + dropout(sublayer(norm(x)))
//
// The residual wrapper receives its sublayer as a `Sublayer`
// value that names what to run and carries its extra inputs:
//
//   SelfAttention  { attention, mask }           q = k = v = x
//   CrossAttention { attention, memory, mask }   k = v = encoder output
//   FeedForward(ff)                              linear → relu → dropout → linear
//
//   EncoderBlock: self-attn ─► feed-forward           (2 residuals)
//   DecoderBlock: self-attn ─► cross-attn ─► ff       (3 residuals)
//
// Encoder / Decoder stack N independent blocks and normalise
// the output of the last one.
//
// Reference: Vaswani et al. (2017) §3.1, Xiong et al. (2020)

use burn::{
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::error::SummarizerResult;
use crate::ml::attention::{MultiHeadAttention, MultiHeadAttentionConfig};
use crate::ml::norm::{LayerNormalization, LayerNormalizationConfig};

// ─── Shared hyper-parameters ──────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    #[config(default = 1e-6)]
    pub norm_eps: f64,
}

impl BlockConfig {
    fn attention<B: Backend>(&self, device: &B::Device) -> SummarizerResult<MultiHeadAttention<B>> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn feed_forward<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        let xavier = Initializer::XavierUniform { gain: 1.0 };
        FeedForward {
            linear_1: LinearConfig::new(self.d_model, self.d_ff)
                .with_initializer(xavier.clone())
                .init(device),
            linear_2: LinearConfig::new(self.d_ff, self.d_model)
                .with_initializer(xavier)
                .init(device),
            dropout:  DropoutConfig::new(self.dropout).init(),
        }
    }

    fn norm<B: Backend>(&self, device: &B::Device) -> LayerNormalization<B> {
        LayerNormalizationConfig::new(self.d_model)
            .with_eps(self.norm_eps)
            .init(device)
    }

    fn residual<B: Backend>(&self, device: &B::Device) -> ResidualConnection<B> {
        ResidualConnection {
            norm:    self.norm(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }

    pub fn init_encoder_block<B: Backend>(&self, device: &B::Device) -> SummarizerResult<EncoderBlock<B>> {
        Ok(EncoderBlock {
            self_attention:        self.attention(device)?,
            feed_forward:          self.feed_forward(device),
            attention_residual:    self.residual(device),
            feed_forward_residual: self.residual(device),
        })
    }

    pub fn init_decoder_block<B: Backend>(&self, device: &B::Device) -> SummarizerResult<DecoderBlock<B>> {
        Ok(DecoderBlock {
            self_attention:        self.attention(device)?,
            cross_attention:       self.attention(device)?,
            feed_forward:          self.feed_forward(device),
            self_residual:         self.residual(device),
            cross_residual:        self.residual(device),
            feed_forward_residual: self.residual(device),
        })
    }

    pub fn init_encoder<B: Backend>(&self, num_layers: usize, device: &B::Device) -> SummarizerResult<Encoder<B>> {
        let layers = (0..num_layers)
            .map(|_| self.init_encoder_block(device))
            .collect::<SummarizerResult<Vec<_>>>()?;
        Ok(Encoder { layers, norm: self.norm(device) })
    }

    pub fn init_decoder<B: Backend>(&self, num_layers: usize, device: &B::Device) -> SummarizerResult<Decoder<B>> {
        let layers = (0..num_layers)
            .map(|_| self.init_decoder_block(device))
            .collect::<SummarizerResult<Vec<_>>>()?;
        Ok(Decoder { layers, norm: self.norm(device) })
    }
}

// ─── Feed-forward ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub linear_1: Linear<B>,
    pub linear_2: Linear<B>,
    pub dropout:  Dropout,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let hidden = self.dropout.forward(relu(self.linear_1.forward(x)));
        self.linear_2.forward(hidden)
    }
}

// ─── Sublayer ─────────────────────────────────────────────────────────────────
/// What a residual connection wraps, together with its extra inputs.
pub enum Sublayer<'a, B: Backend> {
    SelfAttention {
        attention: &'a MultiHeadAttention<B>,
        mask:      Option<Tensor<B, 4, Bool>>,
    },
    CrossAttention {
        attention: &'a MultiHeadAttention<B>,
        memory:    Tensor<B, 3>,
        mask:      Option<Tensor<B, 4, Bool>>,
    },
    FeedForward(&'a FeedForward<B>),
}

impl<B: Backend> Sublayer<'_, B> {
    pub fn apply(self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            Sublayer::SelfAttention { attention, mask } => {
                attention.forward(x.clone(), x.clone(), x, mask)
            }
            Sublayer::CrossAttention { attention, memory, mask } => {
                attention.forward(x, memory.clone(), memory, mask)
            }
            Sublayer::FeedForward(ff) => ff.forward(x),
        }
    }
}

// ─── Residual connection ──────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ResidualConnection<B: Backend> {
    pub norm:    LayerNormalization<B>,
    pub dropout: Dropout,
}

impl<B: Backend> ResidualConnection<B> {
    pub fn forward(&self, x: Tensor<B, 3>, sublayer: Sublayer<'_, B>) -> Tensor<B, 3> {
        let out = sublayer.apply(self.norm.forward(x.clone()));
        x + self.dropout.forward(out)
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attention:        MultiHeadAttention<B>,
    pub feed_forward:          FeedForward<B>,
    pub attention_residual:    ResidualConnection<B>,
    pub feed_forward_residual: ResidualConnection<B>,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, src_mask: Option<Tensor<B, 4, Bool>>) -> Tensor<B, 3> {
        let x = self.attention_residual.forward(
            x,
            Sublayer::SelfAttention { attention: &self.self_attention, mask: src_mask },
        );
        self.feed_forward_residual
            .forward(x, Sublayer::FeedForward(&self.feed_forward))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub layers: Vec<EncoderBlock<B>>,
    pub norm:   LayerNormalization<B>,
}

impl<B: Backend> Encoder<B> {
    pub fn forward(&self, mut x: Tensor<B, 3>, src_mask: Option<Tensor<B, 4, Bool>>) -> Tensor<B, 3> {
        for layer in &self.layers {
            x = layer.forward(x, src_mask.clone());
        }
        self.norm.forward(x)
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attention:        MultiHeadAttention<B>,
    pub cross_attention:       MultiHeadAttention<B>,
    pub feed_forward:          FeedForward<B>,
    pub self_residual:         ResidualConnection<B>,
    pub cross_residual:        ResidualConnection<B>,
    pub feed_forward_residual: ResidualConnection<B>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(
        &self,
        x:        Tensor<B, 3>,
        memory:   Tensor<B, 3>,
        src_mask: Option<Tensor<B, 4, Bool>>,
        tgt_mask: Tensor<B, 4, Bool>,
    ) -> Tensor<B, 3> {
        let x = self.self_residual.forward(
            x,
            Sublayer::SelfAttention { attention: &self.self_attention, mask: Some(tgt_mask) },
        );
        let x = self.cross_residual.forward(
            x,
            Sublayer::CrossAttention { attention: &self.cross_attention, memory, mask: src_mask },
        );
        self.feed_forward_residual
            .forward(x, Sublayer::FeedForward(&self.feed_forward))
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub layers: Vec<DecoderBlock<B>>,
    pub norm:   LayerNormalization<B>,
}

impl<B: Backend> Decoder<B> {
    pub fn forward(
        &self,
        mut x:    Tensor<B, 3>,
        memory:   Tensor<B, 3>,
        src_mask: Option<Tensor<B, 4, Bool>>,
        tgt_mask: Tensor<B, 4, Bool>,
    ) -> Tensor<B, 3> {
        for layer in &self.layers {
            x = layer.forward(x, memory.clone(), src_mask.clone(), tgt_mask.clone());
        }
        self.norm.forward(x)
    }
}
