// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Trains a unigram tokenizer over a raw-text corpus and writes
// two artifacts under a fixed prefix:
//
//   <prefix>.model  — the full tokenizer (HuggingFace JSON)
//   <prefix>.vocab  — one "piece<TAB>id" line per entry, by id
//
// Reserved ids (fixed across every tokenizer we train):
//
//   0  <p>     padding
//   1  <unk>   unknown
//   2  <s>     begin of sequence
//   3  </s>    end of sequence
//
// The requested vocabulary is `vocab_size + 7`; the extra slots
// are reserved for special tokens.
//
// Reference: Kudo (2018) Subword Regularization (unigram LM)
//            tokenizers crate documentation

use anyhow::{anyhow, Context, Result};
use std::{fs, path::{Path, PathBuf}};
use tokenizers::{
    models::unigram::{Unigram, UnigramTrainerBuilder},
    normalizers::NFKC,
    pre_tokenizers::metaspace::Metaspace,
    AddedToken, DecoderWrapper, NormalizerWrapper, PostProcessorWrapper, PreTokenizerWrapper,
    Tokenizer, TokenizerBuilder, TokenizerImpl,
};

/// Slots added on top of the requested vocabulary size
pub const RESERVED_SLOTS: usize = 7;

type UnigramTokenizer =
    TokenizerImpl<Unigram, NormalizerWrapper, PreTokenizerWrapper, PostProcessorWrapper, DecoderWrapper>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialToken {
    Pad,
    Unk,
    Bos,
    Eos,
}

impl SpecialToken {
    pub const ALL: [SpecialToken; 4] =
        [SpecialToken::Pad, SpecialToken::Unk, SpecialToken::Bos, SpecialToken::Eos];

    pub fn id(&self) -> u32 {
        match self {
            SpecialToken::Pad => 0,
            SpecialToken::Unk => 1,
            SpecialToken::Bos => 2,
            SpecialToken::Eos => 3,
        }
    }

    pub fn piece(&self) -> &'static str {
        match self {
            SpecialToken::Pad => "<p>",
            SpecialToken::Unk => "<unk>",
            SpecialToken::Bos => "<s>",
            SpecialToken::Eos => "</s>",
        }
    }
}

// ─── Training configuration ───────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TokenizerTrainingConfig {
    /// Raw text, one sentence or chunk per line
    pub corpus: PathBuf,
    /// Output prefix; artifacts are <prefix>.model and <prefix>.vocab
    pub prefix: String,
    /// Vocabulary size before the reserved slots are added
    pub vocab_size: usize,
    /// Longest piece the trainer may keep
    pub max_piece_length: usize,
}

impl Default for TokenizerTrainingConfig {
    fn default() -> Self {
        Self {
            corpus:           PathBuf::from("../tmp/512_chunk.txt"),
            prefix:           "corpus".to_string(),
            vocab_size:       9993,
            max_piece_length: 16,
        }
    }
}

impl TokenizerTrainingConfig {
    /// The vocabulary size actually requested from the trainer
    pub fn total_vocab_size(&self) -> usize {
        self.vocab_size + RESERVED_SLOTS
    }

    pub fn model_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.model", self.prefix))
    }

    pub fn vocab_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.vocab", self.prefix))
    }
}

// ─── TokenizerStore ───────────────────────────────────────────────────────────
pub struct TokenizerStore;

impl TokenizerStore {
    /// Train a unigram tokenizer and write both artifacts.
    /// Returns the paths of (<prefix>.model, <prefix>.vocab).
    pub fn train(cfg: &TokenizerTrainingConfig) -> Result<(PathBuf, PathBuf)> {
        let total = cfg.total_vocab_size();
        tracing::info!(
            "Training unigram tokenizer on '{}' (vocab_size={} + {} reserved = {})",
            cfg.corpus.display(),
            cfg.vocab_size,
            RESERVED_SLOTS,
            total
        );

        let corpus = cfg.corpus
            .to_str()
            .ok_or_else(|| anyhow!("Corpus path '{}' is not valid UTF-8", cfg.corpus.display()))?
            .to_string();
        if !cfg.corpus.is_file() {
            return Err(anyhow!("Corpus '{}' does not exist", cfg.corpus.display()));
        }

        let mut trainer = UnigramTrainerBuilder::default()
            .show_progress(false)
            .vocab_size(total as u32)
            .max_piece_length(cfg.max_piece_length)
            .special_tokens(
                SpecialToken::ALL
                    .iter()
                    .map(|t| AddedToken::from(t.piece(), true))
                    .collect(),
            )
            .unk_token(Some(SpecialToken::Unk.piece().to_string()))
            .build()
            .map_err(|e| anyhow!("Invalid unigram trainer settings: {e}"))?;

        let mut tokenizer: UnigramTokenizer = TokenizerBuilder::new()
            .with_model(Unigram::default())
            .with_normalizer(Some(NormalizerWrapper::from(NFKC)))
            .with_pre_tokenizer(Some(PreTokenizerWrapper::from(Metaspace::default())))
            .with_decoder(Some(DecoderWrapper::from(Metaspace::default())))
            .build()
            .map_err(|e| anyhow!("Cannot assemble tokenizer: {e}"))?;

        tokenizer
            .train_from_files(&mut trainer, vec![corpus])
            .map_err(|e| anyhow!("Unigram training failed: {e}"))?;

        for special in SpecialToken::ALL {
            match tokenizer.token_to_id(special.piece()) {
                Some(id) if id == special.id() => {}
                other => tracing::warn!(
                    "Special token {} landed on {:?}, expected {}",
                    special.piece(),
                    other,
                    special.id()
                ),
            }
        }

        let model_path = cfg.model_path();
        let vocab_path = cfg.vocab_path();
        if let Some(parent) = model_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create '{}'", parent.display()))?;
            }
        }

        tokenizer
            .save(&model_path, false)
            .map_err(|e| anyhow!("Cannot write '{}': {e}", model_path.display()))?;

        let mut vocab: Vec<(String, u32)> = tokenizer.get_vocab(false).into_iter().collect();
        vocab.sort_by_key(|(_, id)| *id);
        let lines: String = vocab
            .iter()
            .map(|(piece, id)| format!("{piece}\t{id}\n"))
            .collect();
        fs::write(&vocab_path, lines)
            .with_context(|| format!("Cannot write '{}'", vocab_path.display()))?;

        tracing::info!(
            "Tokenizer with {} pieces saved to '{}' and '{}'",
            vocab.len(),
            model_path.display(),
            vocab_path.display()
        );

        Ok((model_path, vocab_path))
    }

    /// Load a previously trained tokenizer from its .model file
    pub fn load(path: impl AsRef<Path>) -> Result<Tokenizer> {
        let path = path.as_ref();
        Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }
}
