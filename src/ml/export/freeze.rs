// ============================================================
// Layer 5 — Graph Freezer
// ============================================================
// Walks a trained Seq2Seq and writes every parameter into an
// InferenceGraph as a constant, emitting the nodes in forward
// order. Constant folding on the way:
//
//   - embedding tables are pre-multiplied by √d_model
//   - the positional tables become plain constants
//   - dropout has no node (inference only)
//   - with source padding masking off, the all-ones source
//     mask disappears (Attention mask = None)
//
// Names follow the module path, e.g.
//   encoder.0.self_attention.w_q.weight
//   decoder.1.cross_residual.norm.alpha

use burn::{module::Param, nn::Linear, prelude::*};

use crate::domain::error::SummarizerResult;
use crate::domain::vocabulary::Vocabulary;
use crate::ml::attention::MultiHeadAttention;
use crate::ml::block::{FeedForward, ResidualConnection};
use crate::ml::export::graph::{
    AttentionMask, Constant, InferenceGraph, Node, Op, FORMAT_VERSION, OUTPUT, SRC_INPUT, TGT_INPUT,
};
use crate::ml::model::Seq2Seq;
use crate::ml::norm::LayerNormalization;

struct GraphBuilder {
    constants: Vec<Constant>,
    nodes:     Vec<Node>,
}

impl GraphBuilder {
    fn constant<B: Backend, const D: usize>(&mut self, name: impl Into<String>, tensor: Tensor<B, D>) -> String {
        let name = name.into();
        let dims = tensor.dims().to_vec();
        let data = tensor.into_data().iter::<f32>().collect();
        self.constants.push(Constant { name: name.clone(), dims, data });
        name
    }

    fn node(&mut self, name: impl Into<String>, op: Op, inputs: Vec<String>) -> String {
        let name = name.into();
        self.nodes.push(Node { name: name.clone(), op, inputs, output: name.clone() });
        name
    }

    fn linear<B: Backend>(&mut self, prefix: &str, linear: &Linear<B>) -> (String, String) {
        let weight = linear.weight.val();
        let bias   = match &linear.bias {
            Some(b) => b.val(),
            None    => Tensor::zeros([weight.dims()[1]], &weight.device()),
        };
        (
            self.constant(format!("{prefix}.weight"), weight),
            self.constant(format!("{prefix}.bias"), bias),
        )
    }

    fn apply_linear<B: Backend>(&mut self, prefix: &str, linear: &Linear<B>, x: String) -> String {
        let (w, b) = self.linear(prefix, linear);
        self.node(prefix, Op::Linear, vec![x, w, b])
    }

    fn layer_norm<B: Backend>(&mut self, prefix: &str, norm: &LayerNormalization<B>, x: String) -> String {
        let alpha = self.constant(format!("{prefix}.alpha"), norm.alpha.val());
        let bias  = self.constant(format!("{prefix}.bias"), norm.bias.val());
        self.node(prefix, Op::LayerNorm { eps: norm.eps }, vec![x, alpha, bias])
    }

    fn attention<B: Backend>(
        &mut self,
        prefix: &str,
        attn:   &MultiHeadAttention<B>,
        query:  String,
        memory: String,
        mask:   AttentionMask,
    ) -> String {
        let mut inputs = vec![query, memory];
        for (part, linear) in [("w_q", &attn.w_q), ("w_k", &attn.w_k), ("w_v", &attn.w_v), ("w_o", &attn.w_o)] {
            let (w, b) = self.linear(&format!("{prefix}.{part}"), linear);
            inputs.push(w);
            inputs.push(b);
        }
        if let AttentionMask::KeyPadding { .. } = mask {
            inputs.push(SRC_INPUT.to_string());
        }
        self.node(prefix, Op::Attention { heads: attn.num_heads, mask }, inputs)
    }

    fn feed_forward<B: Backend>(&mut self, prefix: &str, ff: &FeedForward<B>, x: String) -> String {
        let h = self.apply_linear(&format!("{prefix}.linear_1"), &ff.linear_1, x);
        let h = self.node(format!("{prefix}.relu"), Op::Relu, vec![h]);
        self.apply_linear(&format!("{prefix}.linear_2"), &ff.linear_2, h)
    }

    /// x + sublayer(norm(x)); `sublayer` receives the normalised value name.
    fn residual<B: Backend>(
        &mut self,
        prefix:   &str,
        residual: &ResidualConnection<B>,
        x:        String,
        sublayer: impl FnOnce(&mut Self, String) -> String,
    ) -> String {
        let normed = self.layer_norm(&format!("{prefix}.norm"), &residual.norm, x.clone());
        let out    = sublayer(self, normed);
        self.node(format!("{prefix}.add"), Op::Add, vec![x, out])
    }

    fn embed<B: Backend>(&mut self, prefix: &str, table: Param<Tensor<B, 2>>, scale: f64, ids: &str, positional: Tensor<B, 2>) -> String {
        let table = self.constant(format!("{prefix}.weight"), table.val() * scale);
        let x     = self.node(format!("{prefix}.gather"), Op::Gather, vec![table, ids.to_string()]);
        let pe    = self.constant(format!("{prefix}.positional"), positional);
        self.node(format!("{prefix}.add_positional"), Op::AddPositional, vec![x, pe])
    }
}

/// Freeze `model` into a checked inference graph.
pub fn freeze<B: Backend>(model: &Seq2Seq<B>, source_epoch: usize) -> SummarizerResult<InferenceGraph> {
    let vocab_size = model.projection.weight.dims()[1];
    let scale      = (model.d_model as f64).sqrt();
    let mut g      = GraphBuilder { constants: Vec::new(), nodes: Vec::new() };

    let src_mask = if model.mask_source_padding {
        AttentionMask::KeyPadding { pad_id: Vocabulary::PAD_ID }
    } else {
        AttentionMask::None
    };

    // ── Encoder ───────────────────────────────────────────────────────────────
    let mut x = g.embed("src_embedding", model.src_embedding.weight.clone(), scale, SRC_INPUT, model.src_position.table.clone());
    for (i, block) in model.encoder.layers.iter().enumerate() {
        let p = format!("encoder.{i}");
        x = g.residual(&format!("{p}.attention_residual"), &block.attention_residual, x, |g, n| {
            g.attention(&format!("{p}.self_attention"), &block.self_attention, n.clone(), n, src_mask)
        });
        x = g.residual(&format!("{p}.feed_forward_residual"), &block.feed_forward_residual, x, |g, n| {
            g.feed_forward(&format!("{p}.feed_forward"), &block.feed_forward, n)
        });
    }
    let memory = g.layer_norm("encoder.norm", &model.encoder.norm, x);

    // ── Decoder ───────────────────────────────────────────────────────────────
    let mut y = g.embed("tgt_embedding", model.tgt_embedding.weight.clone(), scale, TGT_INPUT, model.tgt_position.table.clone());
    for (i, block) in model.decoder.layers.iter().enumerate() {
        let p = format!("decoder.{i}");
        y = g.residual(&format!("{p}.self_residual"), &block.self_residual, y, |g, n| {
            g.attention(&format!("{p}.self_attention"), &block.self_attention, n.clone(), n, AttentionMask::Causal)
        });
        y = g.residual(&format!("{p}.cross_residual"), &block.cross_residual, y, |g, n| {
            g.attention(&format!("{p}.cross_attention"), &block.cross_attention, n, memory.clone(), src_mask)
        });
        y = g.residual(&format!("{p}.feed_forward_residual"), &block.feed_forward_residual, y, |g, n| {
            g.feed_forward(&format!("{p}.feed_forward"), &block.feed_forward, n)
        });
    }
    let y = g.layer_norm("decoder.norm", &model.decoder.norm, y);

    // ── Projection → logits ───────────────────────────────────────────────────
    let (w, b) = g.linear("projection", &model.projection);
    g.node(OUTPUT, Op::Linear, vec![y, w, b]);

    let (inputs, output) = InferenceGraph::io_specs(vocab_size);
    let graph = InferenceGraph {
        format_version: FORMAT_VERSION,
        producer:       format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        source_epoch,
        vocab_size,
        max_src_len:    model.src_capacity(),
        max_tgt_len:    model.tgt_capacity(),
        inputs,
        output,
        constants:      g.constants,
        nodes:          g.nodes,
    };
    graph.check()?;

    tracing::debug!(
        "Froze epoch {} into {} constants and {} nodes",
        source_epoch,
        graph.constants.len(),
        graph.nodes.len()
    );
    Ok(graph)
}
