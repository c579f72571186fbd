// ============================================================
// Layer 5 — Portable Inference Graph
// ============================================================
// A self-contained, JSON-serialisable description of the
// frozen model:
//
//   inputs        src  int64 [batch, src_seq]
//                 tgt  int64 [batch, tgt_seq]
//   output        logits float32 [batch, tgt_seq, vocab]
//   constants     named f32 tensors (weights, tables)
//   nodes         ordered ops, each writing one named value
//
// batch / src_seq / tgt_seq are dynamic; the sequence axes are
// bounded by `max_src_len` / `max_tgt_len` (the positional
// tables). Nodes are topologically ordered: every input is a
// graph input, a constant, or the output of an earlier node.
//
// Op inputs (in order):
//   Gather         table, ids
//   AddPositional  x, table
//   LayerNorm      x, alpha, bias
//   Linear         x, weight [d_in, d_out], bias
//   Relu           x
//   Add            a, b
//   Attention      query_in, memory, w_q, b_q, w_k, b_k,
//                  w_v, b_v, w_o, b_o [, key_ids for KeyPadding]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};

use crate::domain::error::{SummarizerError, SummarizerResult};

pub const FORMAT_VERSION: u32 = 1;
pub const SRC_INPUT:  &str = "src";
pub const TGT_INPUT:  &str = "tgt";
pub const OUTPUT:     &str = "logits";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dim {
    Fixed(usize),
    Dynamic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Int64,
    Float32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub elem: ElementType,
    pub dims: Vec<Dim>,
}

/// A frozen tensor, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub dims: Vec<usize>,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttentionMask {
    None,
    Causal,
    KeyPadding { pad_id: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
    Gather,
    AddPositional,
    LayerNorm { eps: f64 },
    Linear,
    Relu,
    Add,
    Attention { heads: usize, mask: AttentionMask },
}

impl Op {
    fn arity(&self) -> usize {
        match self {
            Op::Relu => 1,
            Op::Gather | Op::AddPositional | Op::Add => 2,
            Op::LayerNorm { .. } | Op::Linear => 3,
            Op::Attention { mask: AttentionMask::KeyPadding { .. }, .. } => 11,
            Op::Attention { .. } => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name:   String,
    pub op:     Op,
    pub inputs: Vec<String>,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceGraph {
    pub format_version: u32,
    pub producer:       String,
    /// Checkpoint epoch the weights were frozen from
    pub source_epoch:   usize,
    pub vocab_size:     usize,
    pub max_src_len:    usize,
    pub max_tgt_len:    usize,
    pub inputs:         Vec<TensorSpec>,
    pub output:         TensorSpec,
    pub constants:      Vec<Constant>,
    pub nodes:          Vec<Node>,
}

impl InferenceGraph {
    /// The fixed calling convention: (src, tgt) → logits.
    pub fn io_specs(vocab_size: usize) -> (Vec<TensorSpec>, TensorSpec) {
        let dynamic = |n: &str| Dim::Dynamic(n.to_string());
        let inputs = vec![
            TensorSpec { name: SRC_INPUT.into(), elem: ElementType::Int64, dims: vec![dynamic("batch"), dynamic("src_seq")] },
            TensorSpec { name: TGT_INPUT.into(), elem: ElementType::Int64, dims: vec![dynamic("batch"), dynamic("tgt_seq")] },
        ];
        let output = TensorSpec {
            name: OUTPUT.into(),
            elem: ElementType::Float32,
            dims: vec![dynamic("batch"), dynamic("tgt_seq"), Dim::Fixed(vocab_size)],
        };
        (inputs, output)
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Structural self-check. Does not run anything.
    pub fn check(&self) -> SummarizerResult<()> {
        let fail = |msg: String| -> SummarizerResult<()> { Err(SummarizerError::Graph(msg)) };

        if self.format_version != FORMAT_VERSION {
            return fail(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                self.format_version
            ));
        }

        let (inputs, output) = Self::io_specs(self.vocab_size);
        if self.inputs != inputs || self.output != output {
            return fail("inputs/output do not follow the (src, tgt) → logits convention".into());
        }
        if self.max_src_len == 0 || self.max_tgt_len == 0 {
            return fail("sequence limits must be positive".into());
        }

        let mut defined: HashSet<&str> = HashSet::new();
        for spec in &self.inputs {
            defined.insert(spec.name.as_str());
        }

        for c in &self.constants {
            if !(1..=2).contains(&c.dims.len()) {
                return fail(format!("constant '{}' has rank {}, expected 1 or 2", c.name, c.dims.len()));
            }
            let expected: usize = c.dims.iter().product();
            if c.data.len() != expected {
                return fail(format!(
                    "constant '{}' holds {} values but its dims {:?} need {}",
                    c.name, c.data.len(), c.dims, expected
                ));
            }
            if !defined.insert(c.name.as_str()) {
                return fail(format!("name '{}' is defined twice", c.name));
            }
        }

        for node in &self.nodes {
            if node.inputs.len() != node.op.arity() {
                return fail(format!(
                    "node '{}' ({:?}) takes {} inputs, got {}",
                    node.name, node.op, node.op.arity(), node.inputs.len()
                ));
            }
            if let Some(missing) = node.inputs.iter().find(|i| !defined.contains(i.as_str())) {
                return fail(format!("node '{}' reads '{}' before it is defined", node.name, missing));
            }
            match &node.op {
                Op::LayerNorm { eps } if *eps <= 0.0 => {
                    return fail(format!("node '{}' has non-positive eps", node.name));
                }
                Op::Attention { heads: 0, .. } => {
                    return fail(format!("node '{}' has zero heads", node.name));
                }
                _ => {}
            }
            if !defined.insert(node.output.as_str()) {
                return fail(format!("name '{}' is defined twice", node.output));
            }
        }

        match self.nodes.last() {
            Some(last) if last.output == self.output.name => Ok(()),
            _ => fail(format!("no final node produces '{}'", self.output.name)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write inference graph to '{}'", path.display()))?;
        tracing::info!("Wrote inference graph to '{}'", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read inference graph '{}'", path.display()))?;
        let graph: Self = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse inference graph '{}'", path.display()))?;
        graph.check()?;
        Ok(graph)
    }
}
