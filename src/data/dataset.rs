// ============================================================
// Layer 4 — Cached Prompt Dataset
// ============================================================
// The fine-tuning driver never tokenises text itself. It reads
// fixed-length examples from a pre-built cache: one SQLite file
// with one table per split ("train" and "eval"), written by
// `build-cache` and opened read-only here.
//
// SqliteDataset provides len() and random access by row index
// without loading the whole cache into memory.
//
// Reference: Burn Book §4 (Datasets)

use anyhow::{Context, Result};
use burn::data::dataset::{Dataset, SqliteDataset, SqliteDatasetWriter};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

/// Target label for positions that must not contribute to the loss
pub const IGNORE_INDEX: i64 = -1;

/// One pre-tokenised training example of block length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptExample {
    pub input_ids:  Vec<i64>,
    pub target_ids: Vec<i64>,
}

impl PromptExample {
    pub fn new(input_ids: Vec<i64>, target_ids: Vec<i64>) -> Self {
        Self { input_ids, target_ids }
    }

    pub fn block_len(&self) -> usize {
        self.input_ids.len()
    }

    /// Number of target positions that are not IGNORE_INDEX
    pub fn countable_targets(&self) -> usize {
        self.target_ids.iter().filter(|&&t| t != IGNORE_INDEX).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSplit {
    Train,
    Eval,
}

impl CacheSplit {
    /// Table name inside the SQLite cache
    pub fn table(&self) -> &'static str {
        match self {
            CacheSplit::Train => "train",
            CacheSplit::Eval  => "eval",
        }
    }
}

// ─── PromptDataset ────────────────────────────────────────────────────────────
/// Read-only view over one split of the cache.
pub struct PromptDataset {
    inner: SqliteDataset<PromptExample>,
}

impl PromptDataset {
    pub fn open(path: impl AsRef<Path>, split: CacheSplit) -> Result<Self> {
        let path  = path.as_ref();
        let inner = SqliteDataset::from_db_file(path, split.table())
            .with_context(|| {
                format!(
                    "Cannot open split '{}' of cache '{}'. Has build-cache been run?",
                    split.table(),
                    path.display()
                )
            })?;

        tracing::info!(
            "Opened {} split of '{}' ({} examples)",
            split.table(),
            path.display(),
            inner.len()
        );
        Ok(Self { inner })
    }
}

impl Dataset<PromptExample> for PromptDataset {
    fn get(&self, index: usize) -> Option<PromptExample> {
        self.inner.get(index)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

// ─── CacheWriter ──────────────────────────────────────────────────────────────
/// Writes both splits of a new cache file.
pub struct CacheWriter {
    inner:   SqliteDatasetWriter<PromptExample>,
    path:    PathBuf,
    train:   usize,
    eval:    usize,
}

impl CacheWriter {
    /// Create the cache, replacing any previous file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create '{}'", parent.display()))?;
            }
        }

        let inner = SqliteDatasetWriter::new(&path, true)
            .with_context(|| format!("Cannot create cache '{}'", path.display()))?;

        Ok(Self { inner, path, train: 0, eval: 0 })
    }

    pub fn write(&mut self, split: CacheSplit, example: &PromptExample) -> Result<()> {
        self.inner
            .write(split.table(), example)
            .with_context(|| format!("Cannot write to cache '{}'", self.path.display()))?;

        match split {
            CacheSplit::Train => self.train += 1,
            CacheSplit::Eval  => self.eval  += 1,
        }
        Ok(())
    }

    /// Flush and move the finished cache into place.
    /// Returns (train_count, eval_count).
    pub fn finish(mut self) -> Result<(usize, usize)> {
        self.inner
            .set_completed()
            .with_context(|| format!("Cannot finalise cache '{}'", self.path.display()))?;

        tracing::info!(
            "Cache '{}' written: {} train, {} eval",
            self.path.display(),
            self.train,
            self.eval
        );
        Ok((self.train, self.eval))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn example(seed: i64) -> PromptExample {
        PromptExample::new(vec![seed, seed + 1, 0], vec![-1, seed + 2, -1])
    }

    #[test]
    fn test_round_trip_through_cache() {
        let dir  = tempdir().expect("tempdir");
        let path = dir.path().join("cache").join("sft-cache.db");

        let mut writer = CacheWriter::create(&path).expect("create cache");
        for i in 0..5 {
            writer.write(CacheSplit::Train, &example(i)).expect("write train");
        }
        writer.write(CacheSplit::Eval, &example(100)).expect("write eval");
        assert_eq!(writer.finish().expect("finish"), (5, 1));

        let train = PromptDataset::open(&path, CacheSplit::Train).expect("open train");
        let eval  = PromptDataset::open(&path, CacheSplit::Eval).expect("open eval");
        assert_eq!(train.len(), 5);
        assert_eq!(eval.len(),  1);
        assert_eq!(train.get(3), Some(example(3)));
        assert_eq!(eval.get(0),  Some(example(100)));
        assert_eq!(train.get(5), None);
    }

    #[test]
    fn test_missing_cache_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let err = PromptDataset::open(dir.path().join("missing.db"), CacheSplit::Train);
        assert!(err.is_err());
    }

    #[test]
    fn test_countable_targets_skips_ignore_index() {
        assert_eq!(example(1).countable_targets(), 1);
        assert_eq!(example(1).block_len(), 3);
    }
}
