// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and their flags. Flag names use
// underscores (--model_size, --batch_size, ...) to match the
// scripts that drive these runs.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{cache_use_case::CacheConfig, finetune_use_case::FinetuneConfig};
use crate::infra::tokenizer_store::TokenizerTrainingConfig;
use crate::ml::{device::DeviceKind, model::ModelSize};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a pretrained checkpoint on the prompt cache
    Finetune(FinetuneArgs),

    /// Train a unigram tokenizer on a raw-text corpus
    TrainTokenizer(TrainTokenizerArgs),

    /// Encode an instruction corpus into the prompt cache
    BuildCache(BuildCacheArgs),
}

#[derive(Args, Debug)]
pub struct FinetuneArgs {
    /// Size preset of the pretrained model
    #[arg(long = "model_size", value_enum, default_value_t = ModelSize::Small)]
    pub model_size: ModelSize,

    /// Peak learning rate reached after warmup
    #[arg(long = "learning_rate", default_value_t = 5e-4)]
    pub learning_rate: f64,

    #[arg(long = "batch_size", default_value_t = 60)]
    pub batch_size: usize,

    #[arg(long = "max_iters", default_value_t = 200)]
    pub max_iters: usize,

    /// Iterations of linear warmup from 0 to learning_rate
    #[arg(long = "warmup_iters", default_value_t = 40)]
    pub warmup_iters: usize,

    /// Save every N iterations (0 = only at the end)
    #[arg(long = "save_interval", default_value_t = 50)]
    pub save_interval: usize,

    /// Evaluate every N iterations (0 = never)
    #[arg(long = "eval_interval", default_value_t = 50)]
    pub eval_interval: usize,

    /// Micro-batches per optimizer step
    #[arg(long = "gradient_accumulate", default_value_t = 6)]
    pub gradient_accumulate: usize,

    /// Output directory for fine-tuned checkpoints and metrics.csv
    #[arg(long = "checkpoint_dir", default_value = "../tmp/finetuned")]
    pub checkpoint_dir: String,

    /// Instruction corpus the cache was built from
    #[arg(long = "corpus_path", default_value = "../tmp/ko_alpaca_data.json")]
    pub corpus_path: String,

    #[arg(long = "tokenizer_path", default_value = "hg_tokenizer")]
    pub tokenizer_path: String,

    #[arg(long = "with_lr_scheduler")]
    pub with_lr_scheduler: bool,

    /// Directory holding the pretrained checkpoint
    #[arg(long = "pretrained_dir", default_value = "../tmp/checkpoint")]
    pub pretrained_dir: String,

    /// Prompt cache written by build-cache
    #[arg(long = "cache_path", default_value = "../tmp/cache/sft-cache.db")]
    pub cache_path: String,

    #[arg(long, value_enum, default_value_t = DeviceKind::Gpu)]
    pub device: DeviceKind,
}

/// The application layer never sees clap types.
impl From<FinetuneArgs> for FinetuneConfig {
    fn from(a: FinetuneArgs) -> Self {
        FinetuneConfig {
            model_size:          a.model_size,
            learning_rate:       a.learning_rate,
            batch_size:          a.batch_size,
            max_iters:           a.max_iters,
            warmup_iters:        a.warmup_iters,
            save_interval:       a.save_interval,
            eval_interval:       a.eval_interval,
            gradient_accumulate: a.gradient_accumulate,
            checkpoint_dir:      a.checkpoint_dir,
            corpus_path:         a.corpus_path,
            tokenizer_path:      a.tokenizer_path,
            with_lr_scheduler:   a.with_lr_scheduler,
            pretrained_dir:      a.pretrained_dir,
            cache_path:          a.cache_path,
            device:              a.device,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainTokenizerArgs {
    /// Raw text corpus
    #[arg(long, default_value = "../tmp/512_chunk.txt")]
    pub corpus: PathBuf,

    /// Output prefix for <prefix>.model and <prefix>.vocab
    #[arg(long, default_value = "corpus")]
    pub prefix: String,

    /// Vocabulary size; 7 reserved slots are added on top
    #[arg(long = "vocab_size", default_value_t = 9993)]
    pub vocab_size: usize,

    #[arg(long = "max_piece_length", default_value_t = 16)]
    pub max_piece_length: usize,
}

impl From<TrainTokenizerArgs> for TokenizerTrainingConfig {
    fn from(a: TrainTokenizerArgs) -> Self {
        TokenizerTrainingConfig {
            corpus:           a.corpus,
            prefix:           a.prefix,
            vocab_size:       a.vocab_size,
            max_piece_length: a.max_piece_length,
        }
    }
}

#[derive(Args, Debug)]
pub struct BuildCacheArgs {
    #[arg(long = "corpus_path", default_value = "../tmp/ko_alpaca_data.json")]
    pub corpus_path: String,

    /// Tokenizer written by train-tokenizer
    #[arg(long = "tokenizer_path", default_value = "corpus.model")]
    pub tokenizer_path: String,

    #[arg(long = "cache_path", default_value = "../tmp/cache/sft-cache.db")]
    pub cache_path: String,

    /// Preset whose block size the rows are cut to
    #[arg(long = "model_size", value_enum, default_value_t = ModelSize::Small)]
    pub model_size: ModelSize,

    /// Fraction of examples held out for evaluation
    #[arg(long = "eval_ratio", default_value_t = 0.05)]
    pub eval_ratio: f64,

    #[arg(long, default_value_t = 1231928)]
    pub seed: u64,
}

impl From<BuildCacheArgs> for CacheConfig {
    fn from(a: BuildCacheArgs) -> Self {
        CacheConfig {
            corpus_path:    a.corpus_path,
            tokenizer_path: a.tokenizer_path,
            cache_path:     a.cache_path,
            model_size:     a.model_size,
            eval_ratio:     a.eval_ratio,
            seed:           a.seed,
        }
    }
}
