// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Loads instruction records from an Alpaca-style JSON file:
//
//   [
//     {"instruction": "...", "input": "...", "output": "..."},
//     ...
//   ]
//
// Records without an instruction or output are dropped with a
// debug event; everything else is returned in file order.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::prompt::PromptRecord;
use crate::domain::traits::CorpusSource;

/// Reads a single JSON array of prompt records.
pub struct JsonCorpusLoader {
    path: PathBuf,
}

impl JsonCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for JsonCorpusLoader {
    fn load_all(&self) -> Result<Vec<PromptRecord>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;

        let records: Vec<PromptRecord> = serde_json::from_str(&raw)
            .with_context(|| {
                format!("Corpus '{}' is not a JSON array of prompt records", self.path.display())
            })?;

        let total = records.len();
        let records: Vec<PromptRecord> = records
            .into_iter()
            .filter(PromptRecord::is_trainable)
            .collect();

        if records.len() < total {
            tracing::debug!(
                "Dropped {} records with an empty instruction or output",
                total - records.len()
            );
        }
        tracing::info!("Loaded {} prompt records from '{}'", records.len(), self.path.display());

        Ok(records)
    }
}
