// ============================================================
// Layer 5 — Graph Session (serving runtime)
// ============================================================
// Executes an InferenceGraph on a Burn backend. The session
// exposes only the artifact's contract:
//
//   run(src [batch, src_seq], tgt [batch, tgt_seq]) → logits
//
// There is no separate encode/decode, so greedy decoding over
// a session re-submits src and the whole growing tgt on every
// step. The kernels are the same free functions the live model
// uses (layer_norm, linear, attention helpers, masks).
//
// Constants are uploaded once at construction; each run only
// allocates activations.

use anyhow::Result;
use burn::{prelude::*, tensor::activation::relu};
use std::{collections::HashMap, path::Path};

use crate::domain::error::{SummarizerError, SummarizerResult};
use crate::domain::vocabulary::Vocabulary;
use crate::ml::attention::{linear, merge_heads, scaled_dot_product_attention, split_heads};
use crate::ml::export::graph::{AttentionMask, InferenceGraph, Op, SRC_INPUT, TGT_INPUT};
use crate::ml::inferencer::greedy_loop;
use crate::ml::mask::{causal_mask, padding_mask};
use crate::ml::norm::layer_norm;

/// A value flowing between nodes.
enum Value<B: Backend> {
    Ids(Tensor<B, 2, Int>),
    Vector(Tensor<B, 1>),
    Matrix(Tensor<B, 2>),
    Hidden(Tensor<B, 3>),
}

fn wrong_kind(name: &str, expected: &str) -> SummarizerError {
    SummarizerError::Graph(format!("'{name}' is not {expected}"))
}

impl<B: Backend> Value<B> {
    fn ids(&self, name: &str) -> SummarizerResult<Tensor<B, 2, Int>> {
        match self {
            Value::Ids(t) => Ok(t.clone()),
            _ => Err(wrong_kind(name, "an id tensor")),
        }
    }

    fn vector(&self, name: &str) -> SummarizerResult<Tensor<B, 1>> {
        match self {
            Value::Vector(t) => Ok(t.clone()),
            _ => Err(wrong_kind(name, "a vector")),
        }
    }

    fn matrix(&self, name: &str) -> SummarizerResult<Tensor<B, 2>> {
        match self {
            Value::Matrix(t) => Ok(t.clone()),
            _ => Err(wrong_kind(name, "a matrix")),
        }
    }

    fn hidden(&self, name: &str) -> SummarizerResult<Tensor<B, 3>> {
        match self {
            Value::Hidden(t) => Ok(t.clone()),
            _ => Err(wrong_kind(name, "a [batch, seq, features] tensor")),
        }
    }
}

pub struct GraphSession<B: Backend> {
    graph:     InferenceGraph,
    constants: HashMap<String, Value<B>>,
    device:    B::Device,
}

/// Named values visible while one run is in progress.
struct Scope<'a, B: Backend> {
    constants: &'a HashMap<String, Value<B>>,
    values:    HashMap<String, Value<B>>,
}

impl<B: Backend> Scope<'_, B> {
    fn get(&self, name: &str) -> SummarizerResult<&Value<B>> {
        self.values
            .get(name)
            .or_else(|| self.constants.get(name))
            .ok_or_else(|| SummarizerError::Graph(format!("'{name}' is undefined")))
    }

    fn ids(&self, name: &str) -> SummarizerResult<Tensor<B, 2, Int>> { self.get(name)?.ids(name) }
    fn vector(&self, name: &str) -> SummarizerResult<Tensor<B, 1>> { self.get(name)?.vector(name) }
    fn matrix(&self, name: &str) -> SummarizerResult<Tensor<B, 2>> { self.get(name)?.matrix(name) }
    fn hidden(&self, name: &str) -> SummarizerResult<Tensor<B, 3>> { self.get(name)?.hidden(name) }
}

impl<B: Backend> GraphSession<B> {
    pub fn new(graph: InferenceGraph, device: &B::Device) -> SummarizerResult<Self> {
        graph.check()?;
        let mut constants = HashMap::with_capacity(graph.constants.len());
        for c in &graph.constants {
            let value = match c.dims.as_slice() {
                [n] => Value::Vector(Tensor::from_data(TensorData::new(c.data.clone(), [*n]), device)),
                [r, k] => Value::Matrix(Tensor::from_data(TensorData::new(c.data.clone(), [*r, *k]), device)),
                dims => return Err(SummarizerError::Graph(format!("constant '{}' has unsupported dims {dims:?}", c.name))),
            };
            constants.insert(c.name.clone(), value);
        }
        Ok(Self { graph, constants, device: device.clone() })
    }

    pub fn load(path: &Path, device: &B::Device) -> Result<Self> {
        let graph = InferenceGraph::load(path)?;
        Ok(Self::new(graph, device)?)
    }

    pub fn graph(&self) -> &InferenceGraph {
        &self.graph
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Every id must index a row of the embedding tables.
    fn check_ids(&self, name: &str, ids: &Tensor<B, 2, Int>) -> SummarizerResult<()> {
        if ids.shape().num_elements() == 0 {
            return Ok(());
        }
        let lowest:  i64 = ids.clone().min().into_scalar().elem();
        let highest: i64 = ids.clone().max().into_scalar().elem();
        if lowest < 0 || highest >= self.graph.vocab_size as i64 {
            return Err(SummarizerError::Graph(format!(
                "input '{name}' holds ids in [{lowest}, {highest}] but the vocabulary has {} tokens",
                self.graph.vocab_size
            )));
        }
        Ok(())
    }

    /// (src, tgt) → logits [batch, tgt_seq, vocab]
    pub fn run(&self, src: Tensor<B, 2, Int>, tgt: Tensor<B, 2, Int>) -> SummarizerResult<Tensor<B, 3>> {
        let [src_batch, src_len] = src.dims();
        let [tgt_batch, tgt_len] = tgt.dims();
        if src_batch != tgt_batch {
            return Err(SummarizerError::Graph(format!(
                "src batch {src_batch} does not match tgt batch {tgt_batch}"
            )));
        }
        if src_len > self.graph.max_src_len {
            return Err(SummarizerError::SequenceTooLong { len: src_len, max: self.graph.max_src_len });
        }
        if tgt_len > self.graph.max_tgt_len {
            return Err(SummarizerError::SequenceTooLong { len: tgt_len, max: self.graph.max_tgt_len });
        }
        self.check_ids(SRC_INPUT, &src)?;
        self.check_ids(TGT_INPUT, &tgt)?;

        let mut scope = Scope { constants: &self.constants, values: HashMap::new() };
        scope.values.insert(SRC_INPUT.to_string(), Value::Ids(src));
        scope.values.insert(TGT_INPUT.to_string(), Value::Ids(tgt));

        for node in &self.graph.nodes {
            let at  = |i: usize| node.inputs[i].as_str();
            let out = match &node.op {
                Op::Gather => {
                    let table            = scope.matrix(at(0))?;
                    let ids              = scope.ids(at(1))?;
                    let [batch, len]     = ids.dims();
                    let [_, d]           = table.dims();
                    let flat             = ids.reshape([batch * len]);
                    Value::Hidden(table.select(0, flat).reshape([batch, len, d]))
                }
                Op::AddPositional => {
                    let x            = scope.hidden(at(0))?;
                    let table        = scope.matrix(at(1))?;
                    let [_, len, d]  = x.dims();
                    Value::Hidden(x + table.slice([0..len, 0..d]).unsqueeze::<3>())
                }
                Op::LayerNorm { eps } => Value::Hidden(layer_norm(
                    scope.hidden(at(0))?,
                    scope.vector(at(1))?,
                    scope.vector(at(2))?,
                    *eps,
                )),
                Op::Linear => Value::Hidden(linear(
                    scope.hidden(at(0))?,
                    scope.matrix(at(1))?,
                    Some(scope.vector(at(2))?),
                )),
                Op::Relu => Value::Hidden(relu(scope.hidden(at(0))?)),
                Op::Add  => Value::Hidden(scope.hidden(at(0))? + scope.hidden(at(1))?),
                Op::Attention { heads, mask } => {
                    let query  = scope.hidden(at(0))?;
                    let memory = scope.hidden(at(1))?;
                    let proj   = |i: usize, x: Tensor<B, 3>| -> SummarizerResult<Tensor<B, 3>> {
                        Ok(linear(x, scope.matrix(at(i))?, Some(scope.vector(at(i + 1))?)))
                    };
                    let q_len = query.dims()[1];
                    let q     = split_heads(proj(2, query)?, *heads);
                    let k     = split_heads(proj(4, memory.clone())?, *heads);
                    let v     = split_heads(proj(6, memory)?, *heads);
                    let mask  = match mask {
                        AttentionMask::None               => None,
                        AttentionMask::Causal             => Some(causal_mask::<B>(q_len, &self.device)),
                        AttentionMask::KeyPadding { pad_id } => Some(padding_mask(scope.ids(at(10))?, *pad_id)),
                    };
                    let (context, _) = scaled_dot_product_attention(q, k, v, mask, None);
                    Value::Hidden(proj(8, merge_heads(context))?)
                }
            };
            scope.values.insert(node.output.clone(), out);
        }

        scope.hidden(&self.graph.output.name)
    }
}

/// Greedy decode through the session's narrow (src, tgt) → logits entry point.
pub fn greedy_decode_session<B: Backend>(
    session: &GraphSession<B>,
    src_ids: Tensor<B, 2, Int>,
    max_len: usize,
) -> SummarizerResult<Vec<Vec<u32>>> {
    let [batch, _] = src_ids.dims();
    let max_len    = max_len.min(session.graph.max_tgt_len);
    let vocab      = session.graph.vocab_size;

    greedy_loop(batch, max_len, Vocabulary::SOS_ID, Vocabulary::EOS_ID, session.device(), |tgt| {
        let len    = tgt.dims()[1];
        let logits = session.run(src_ids.clone(), tgt)?;
        Ok(logits.slice([0..batch, len - 1..len, 0..vocab]).reshape([batch, vocab]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::ids_to_tensor;
    use crate::ml::export::freeze::freeze;
    use crate::ml::inferencer::greedy_decode;
    use crate::ml::model::{Seq2Seq, Seq2SeqConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny(mask_source_padding: bool) -> Seq2Seq<TestBackend> {
        Seq2SeqConfig::new(11, 6, 5)
            .with_d_model(8)
            .with_num_layers(2)
            .with_num_heads(2)
            .with_d_ff(16)
            .with_mask_source_padding(mask_source_padding)
            .init(&Default::default())
            .unwrap()
    }

    fn inputs() -> (Tensor<TestBackend, 2, Int>, Tensor<TestBackend, 2, Int>) {
        let device = Default::default();
        (
            ids_to_tensor(&[&[4, 5, 6, 7, 0, 0], &[8, 9, 0, 0, 0, 0]], &device),
            ids_to_tensor(&[&[1, 4, 5], &[1, 8, 0]], &device),
        )
    }

    fn assert_close(a: Tensor<TestBackend, 3>, b: Tensor<TestBackend, 3>) {
        assert_eq!(a.dims(), b.dims());
        let a: Vec<f32> = a.into_data().iter::<f32>().collect();
        let b: Vec<f32> = b.into_data().iter::<f32>().collect();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }

    #[test]
    fn test_session_output_matches_live_model() {
        for masked in [false, true] {
            let model   = tiny(masked);
            let session = GraphSession::<TestBackend>::new(freeze(&model, 1).unwrap(), &Default::default()).unwrap();
            let (src, tgt) = inputs();

            let live   = model.forward(src.clone(), tgt.clone());
            let served = session.run(src, tgt).unwrap();
            assert_eq!(served.dims(), [2, 3, 11]);
            assert_close(live, served);
        }
    }

    #[test]
    fn test_session_greedy_matches_live_greedy() {
        let model   = tiny(false);
        let session = GraphSession::<TestBackend>::new(freeze(&model, 1).unwrap(), &Default::default()).unwrap();
        let (src, _) = inputs();
        assert_eq!(
            greedy_decode_session(&session, src.clone(), 4).unwrap(),
            greedy_decode(&model, src, 4).unwrap(),
        );
    }

    #[test]
    fn test_sequence_limits_are_enforced() {
        let model   = tiny(false);
        let session = GraphSession::<TestBackend>::new(freeze(&model, 1).unwrap(), &Default::default()).unwrap();
        let device  = Default::default();
        let src     = ids_to_tensor::<TestBackend>(&[&[4; 7]], &device);
        let tgt     = ids_to_tensor::<TestBackend>(&[&[1]], &device);
        assert!(matches!(session.run(src, tgt), Err(SummarizerError::SequenceTooLong { len: 7, max: 6 })));
    }

    #[test]
    fn test_batch_mismatch_is_rejected() {
        let model   = tiny(false);
        let session = GraphSession::<TestBackend>::new(freeze(&model, 1).unwrap(), &Default::default()).unwrap();
        let device  = Default::default();
        let src     = ids_to_tensor::<TestBackend>(&[&[4, 5], &[6, 7]], &device);
        let tgt     = ids_to_tensor::<TestBackend>(&[&[1]], &device);
        assert!(session.run(src, tgt).is_err());
    }

    #[test]
    fn test_out_of_vocabulary_ids_are_rejected() {
        let model   = tiny(false);
        let session = GraphSession::<TestBackend>::new(freeze(&model, 1).unwrap(), &Default::default()).unwrap();
        let device  = Default::default();

        let src = ids_to_tensor::<TestBackend>(&[&[4, 11]], &device);
        let tgt = ids_to_tensor::<TestBackend>(&[&[1]], &device);
        assert!(matches!(session.run(src, tgt), Err(SummarizerError::Graph(_))));

        let src = ids_to_tensor::<TestBackend>(&[&[4, 10]], &device);
        let tgt = ids_to_tensor::<TestBackend>(&[&[1, 42]], &device);
        assert!(matches!(session.run(src, tgt), Err(SummarizerError::Graph(_))));

        let src = ids_to_tensor::<TestBackend>(&[&[4, 10]], &device);
        let tgt = ids_to_tensor::<TestBackend>(&[&[1]], &device);
        assert_eq!(session.run(src, tgt).unwrap().dims(), [1, 1, 11]);
    }
}
