// ============================================================
// Layer 2 — BuildCacheUseCase
// ============================================================
// Turns an instruction corpus into the pre-tokenized cache that
// `finetune` reads:
//
//   Step 1: Load prompt records          (Layer 4 - data)
//   Step 2: Load the tokenizer           (Layer 6 - infra)
//   Step 3: Encode to block-length rows  (Layer 4 - data)
//   Step 4: Seeded train/eval split      (Layer 4 - data)
//   Step 5: Write both splits            (Layer 4 - data)
//
// Reference: Burn Book §4 (Dataset)

use anyhow::{bail, Result};

use crate::data::{
    dataset::{CacheSplit, CacheWriter},
    encoder::ExampleEncoder,
    loader::JsonCorpusLoader,
    splitter::split_train_eval,
};
use crate::domain::traits::CorpusSource;
use crate::infra::tokenizer_store::{SpecialToken, TokenizerStore};
use crate::ml::model::ModelSize;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub corpus_path:    String,
    pub tokenizer_path: String,
    pub cache_path:     String,
    /// Only the block size of the preset is used
    pub model_size:     ModelSize,
    pub eval_ratio:     f64,
    pub seed:           u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            corpus_path:    "../tmp/ko_alpaca_data.json".to_string(),
            tokenizer_path: "corpus.model".to_string(),
            cache_path:     "../tmp/cache/sft-cache.db".to_string(),
            model_size:     ModelSize::Small,
            eval_ratio:     0.05,
            seed:           1231928,
        }
    }
}

pub struct BuildCacheUseCase {
    config: CacheConfig,
}

impl BuildCacheUseCase {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    /// Returns the number of (train, eval) examples written
    pub fn execute(&self) -> Result<(usize, usize)> {
        let cfg = &self.config;

        // ── Step 1 ────────────────────────────────────────────────────────────
        let records = JsonCorpusLoader::new(&cfg.corpus_path).load_all()?;

        // ── Step 2 ────────────────────────────────────────────────────────────
        let tokenizer  = TokenizerStore::load(&cfg.tokenizer_path)?;
        let block_size = cfg.model_size.config().block_size;

        // ── Step 3 ────────────────────────────────────────────────────────────
        let encoder = ExampleEncoder::new(
            &tokenizer,
            block_size,
            SpecialToken::Bos.id(),
            SpecialToken::Eos.id(),
            SpecialToken::Pad.id(),
        );

        let mut examples = Vec::with_capacity(records.len());
        for record in &records {
            match encoder.encode(record)? {
                Some(example) => examples.push(example),
                None => tracing::debug!("Prompt fills the whole block, record skipped"),
            }
        }
        let targets: usize = examples.iter().map(|ex| ex.countable_targets()).sum();
        tracing::info!(
            "Encoded {} examples of block length {} ({} response targets)",
            examples.len(),
            examples.first().map_or(block_size, |ex| ex.block_len()),
            targets
        );
        let skipped = records.len() - examples.len();
        if skipped > 0 {
            tracing::warn!("{} records had no response token inside the block", skipped);
        }

        // ── Step 4 ────────────────────────────────────────────────────────────
        let (train, eval) = split_train_eval(examples, cfg.eval_ratio, cfg.seed);
        if train.is_empty() || eval.is_empty() {
            bail!(
                "Split of {} examples left an empty split ({} train, {} eval); adjust --eval_ratio",
                train.len() + eval.len(),
                train.len(),
                eval.len()
            );
        }

        // ── Step 5 ────────────────────────────────────────────────────────────
        let mut writer = CacheWriter::create(&cfg.cache_path)?;
        for example in &train {
            writer.write(CacheSplit::Train, example)?;
        }
        for example in &eval {
            writer.write(CacheSplit::Eval, example)?;
        }
        writer.finish()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::PromptDataset;
    use crate::infra::tokenizer_store::TokenizerTrainingConfig;
    use burn::data::dataset::Dataset;
    use std::{fs, path::Path};
    use tempfile::tempdir;

    fn prepare(dir: &Path) -> CacheConfig {
        let text = "오늘 날씨를 알려줘\n맑고 따뜻합니다\nname three colors\nred green blue\n";
        let raw  = dir.join("chunk.txt");
        fs::write(&raw, text.repeat(40)).expect("write text");

        let tok = TokenizerTrainingConfig {
            corpus:           raw,
            prefix:           dir.join("corpus").to_string_lossy().into_owned(),
            vocab_size:       93,
            max_piece_length: 8,
        };
        let (model_path, _) = TokenizerStore::train(&tok).expect("tokenizer");

        let records: Vec<serde_json::Value> = (0..10)
            .map(|i| {
                serde_json::json!({
                    "instruction": format!("name three colors {i}"),
                    "input": "",
                    "output": "red green blue",
                })
            })
            .collect();
        let corpus = dir.join("corpus.json");
        fs::write(&corpus, serde_json::to_string(&records).unwrap()).expect("write corpus");

        CacheConfig {
            corpus_path:    corpus.to_string_lossy().into_owned(),
            tokenizer_path: model_path.to_string_lossy().into_owned(),
            cache_path:     dir.join("cache").join("sft.db").to_string_lossy().into_owned(),
            model_size:     ModelSize::Small,
            eval_ratio:     0.2,
            seed:           7,
        }
    }

    #[test]
    fn test_build_cache_writes_both_splits() {
        let dir = tempdir().expect("tempdir");
        let cfg = prepare(dir.path());

        let (train, eval) = BuildCacheUseCase::new(cfg.clone()).execute().expect("build");
        assert_eq!((train, eval), (8, 2));

        let train_set = PromptDataset::open(&cfg.cache_path, CacheSplit::Train).expect("train");
        let eval_set  = PromptDataset::open(&cfg.cache_path, CacheSplit::Eval).expect("eval");
        assert_eq!(train_set.len(), 8);
        assert_eq!(eval_set.len(), 2);

        let row = train_set.get(0).expect("row");
        assert_eq!(row.block_len(), 256);
        assert_eq!(row.input_ids[0], SpecialToken::Bos.id() as i64);
        assert!(row.countable_targets() > 0);
    }

    #[test]
    fn test_zero_eval_ratio_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let cfg = CacheConfig { eval_ratio: 0.0, ..prepare(dir.path()) };
        assert!(BuildCacheUseCase::new(cfg).execute().is_err());
    }
}
