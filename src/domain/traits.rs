// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The cache builder only needs "something that yields prompt
// records". JsonCorpusLoader reads an Alpaca-style JSON array;
// other corpus formats plug in by implementing CorpusSource.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::prompt::PromptRecord;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load instruction records from a source.
///
/// Implementations:
///   - JsonCorpusLoader → a JSON array of {instruction, input, output}
pub trait CorpusSource {
    /// Load every record from this source, in source order.
    fn load_all(&self) -> Result<Vec<PromptRecord>>;
}
