// ============================================================
// Layer 2 — TrainTokenizerUseCase
// ============================================================
// One-shot unigram training over a raw-text corpus. The work
// itself lives in infra::tokenizer_store.

use anyhow::Result;
use std::path::PathBuf;

use crate::infra::tokenizer_store::{TokenizerStore, TokenizerTrainingConfig};

pub struct TrainTokenizerUseCase {
    config: TokenizerTrainingConfig,
}

impl TrainTokenizerUseCase {
    pub fn new(config: TokenizerTrainingConfig) -> Self {
        Self { config }
    }

    /// Returns the written (<prefix>.model, <prefix>.vocab) paths
    pub fn execute(&self) -> Result<(PathBuf, PathBuf)> {
        TokenizerStore::train(&self.config)
    }
}
