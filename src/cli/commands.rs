// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `export` and `summarize`.
//
// clap's derive macros generate help text, error messages for
// missing args and type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{ArgGroup, Args, Subcommand};
use std::path::PathBuf;

use crate::application::summarize_use_case::DEFAULT_MAX_LEN;
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the summarisation model on a slides/summary/reflection CSV
    Train(TrainArgs),

    /// Freeze a checkpoint into a portable inference artifact
    Export(ExportArgs),

    /// Summarise slide text with an exported artifact
    Summarize(SummarizeArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV corpus with slides, summary and reflection columns
    #[arg(long, default_value = "data/corpus.csv")]
    pub corpus: PathBuf,

    /// Directory for checkpoints, metrics and the run config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Source sequence length (slide tokens)
    #[arg(long, default_value_t = 40)]
    pub src_len: usize,

    /// Target sequence length, including the start token
    #[arg(long, default_value_t = 20)]
    pub tgt_len: usize,

    /// Upper bound on vocabulary size, special tokens included
    #[arg(long, default_value_t = 30_000)]
    pub max_vocab: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Model width; must be divisible by num_heads
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// Encoder and decoder depth
    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Inner width of the feed-forward sublayer
    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Share of samples held out for validation
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Seed for the split and the batch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Hide <pad> source positions from attention
    #[arg(long)]
    pub mask_source_padding: bool,

    /// Continue from the latest checkpoint in checkpoint_dir
    #[arg(long)]
    pub resume: bool,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus:              a.corpus,
            checkpoint_dir:      a.checkpoint_dir,
            src_len:             a.src_len,
            tgt_len:             a.tgt_len,
            max_vocab:           a.max_vocab,
            batch_size:          a.batch_size,
            epochs:              a.epochs,
            lr:                  a.lr,
            d_model:             a.d_model,
            num_layers:          a.num_layers,
            num_heads:           a.num_heads,
            d_ff:                a.d_ff,
            dropout:             a.dropout,
            val_fraction:        a.val_fraction,
            seed:                a.seed,
            mask_source_padding: a.mask_source_padding,
            resume:              a.resume,
        }
    }
}

/// All arguments for the `export` command
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Epoch to export; defaults to the latest saved one
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Where to write the artifact
    #[arg(long, default_value = "summarizer.graph.json")]
    pub output: PathBuf,
}

/// All arguments for the `summarize` command
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["text", "file"])))]
pub struct SummarizeArgs {
    /// Directory holding the checkpoint the artifact was frozen from
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value = "summarizer.graph.json")]
    pub artifact: PathBuf,

    /// Slide text to summarise
    #[arg(long)]
    pub text: Option<String>,

    /// Read the slide text from a file instead
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Maximum number of generated tokens
    #[arg(long, default_value_t = DEFAULT_MAX_LEN)]
    pub max_len: usize,
}
