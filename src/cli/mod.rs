// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `finetune`        — fine-tunes a pretrained checkpoint
//   2. `train-tokenizer` — trains the unigram tokenizer
//   3. `build-cache`     — encodes the prompt corpus
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{BuildCacheArgs, Commands, FinetuneArgs, TrainTokenizerArgs};

#[derive(Parser, Debug)]
#[command(
    name = "jamo-finetune",
    version = "0.1.0",
    about = "Fine-tune the jamo language model and train its tokenizer."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Finetune(args)       => run_finetune(args),
            Commands::TrainTokenizer(args) => run_train_tokenizer(args),
            Commands::BuildCache(args)     => run_build_cache(args),
        }
    }
}

fn run_finetune(args: FinetuneArgs) -> Result<()> {
    use crate::application::finetune_use_case::FinetuneUseCase;

    tracing::info!(
        "Fine-tuning '{:?}' from '{}' into '{}'",
        args.model_size,
        args.pretrained_dir,
        args.checkpoint_dir
    );
    let checkpoint_dir = args.checkpoint_dir.clone();
    FinetuneUseCase::new(args.into()).execute()?;

    println!("Fine-tuning complete. Checkpoints in '{}'.", checkpoint_dir);
    Ok(())
}

fn run_train_tokenizer(args: TrainTokenizerArgs) -> Result<()> {
    use crate::application::tokenizer_use_case::TrainTokenizerUseCase;

    let (model, vocab) = TrainTokenizerUseCase::new(args.into()).execute()?;
    println!("Tokenizer written to '{}' and '{}'.", model.display(), vocab.display());
    Ok(())
}

fn run_build_cache(args: BuildCacheArgs) -> Result<()> {
    use crate::application::cache_use_case::BuildCacheUseCase;

    let cache_path    = args.cache_path.clone();
    let (train, eval) = BuildCacheUseCase::new(args.into()).execute()?;
    println!("Cache '{}' ready: {} train, {} eval.", cache_path, train, eval);
    Ok(())
}
