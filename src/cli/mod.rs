// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
//   1. `train`     — trains the model on a CSV corpus
//   2. `export`    — freezes a checkpoint into an artifact
//   3. `summarize` — loads an artifact and prints a summary
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, ExportArgs, SummarizeArgs, TrainArgs};

use crate::domain::traits::Summarizer;

#[derive(Parser, Debug)]
#[command(
    name = "slide-summarizer",
    version,
    about = "Train a transformer that summarises presentation slides, export it, and run it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Export(args)    => run_export(args),
            Commands::Summarize(args) => run_summarize(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on corpus: {}", args.corpus.display());

    let history = TrainUseCase::new(args.into()).execute()?;

    match history.last() {
        Some(last) => println!("Training complete after epoch {}. Checkpoints saved.", last.epoch),
        None       => println!("Nothing to train: checkpoint already covers every epoch."),
    }
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<()> {
    use crate::application::export_use_case::ExportUseCase;

    let graph = ExportUseCase::new(args.checkpoint_dir, args.epoch, &args.output).execute()?;
    println!("Exported epoch {} to {}", graph.source_epoch, args.output.display());
    Ok(())
}

fn run_summarize(args: SummarizeArgs) -> Result<()> {
    use crate::application::summarize_use_case::SummarizerContext;

    let text = match (args.text, args.file) {
        (Some(text), _)    => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?,
        (None, None)       => anyhow::bail!("either --text or --file is required"),
    };

    let context = SummarizerContext::load(&args.checkpoint_dir, &args.artifact, args.max_len)?;
    let summary = context.summarize(&text)?;
    println!("\nSummary: {}", summary);
    Ok(())
}
