// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed failures that callers may want to match on. Everything
// above the domain layer wraps these in anyhow::Error with
// context, the same way I/O errors are wrapped.
//
//   Config           — invalid model hyper-parameters (fatal at construction)
//   Data             — malformed corpus or vocabulary
//   Divergence       — non-finite training loss (aborts the run)
//   ExportMismatch   — exported graph disagrees with the live model
//   Graph            — structurally invalid or mis-fed inference graph
//   MissingCheckpoint— nothing to load from the checkpoint directory
//   SequenceTooLong  — input longer than the positional table
//
// Reference: Rust Book §9 (Error Handling), thiserror docs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("invalid model configuration: {0}")]
    Config(String),

    #[error("invalid corpus data: {0}")]
    Data(String),

    #[error("training diverged at epoch {epoch}, batch {batch}: loss = {loss}")]
    Divergence { epoch: usize, batch: usize, loss: f64 },

    #[error("exported artifact does not match the live model: {0}")]
    ExportMismatch(String),

    #[error("malformed inference graph: {0}")]
    Graph(String),

    #[error("no checkpoint found in '{0}'")]
    MissingCheckpoint(String),

    #[error("sequence of length {len} exceeds the {max} positions the model was built for")]
    SequenceTooLong { len: usize, max: usize },
}

pub type SummarizerResult<T> = std::result::Result<T, SummarizerError>;
