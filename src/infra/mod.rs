// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the application and ML
// layers:
//
//   checkpoint.rs      — model weights, sizing metadata, run config
//   tokenizer_store.rs — unigram tokenizer training and loading
//   metrics.rs         — tagged scalar CSV log
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer training, saving, and loading
pub mod tokenizer_store;

/// Scalar metrics CSV logger
pub mod metrics;
