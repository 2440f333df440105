// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Two directions through this layer:
//
//   build-cache (offline)
//
//     corpus.json ─► JsonCorpusLoader ─► ExampleEncoder
//                         │                   │
//                         ▼                   ▼
//                   PromptRecord        PromptExample
//                                             │
//                              split_train_eval (seeded)
//                                             │
//                                             ▼
//                                   CacheWriter (SQLite)
//
//   finetune
//
//     SQLite cache ─► PromptDataset ─► PromptBatcher ─► DataLoader
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads Alpaca-style JSON corpora
pub mod loader;

/// Prompt/response → masked fixed-length example
pub mod encoder;

/// Cached dataset (read) and cache writer
pub mod dataset;

/// Stacks examples into tensor batches
pub mod batcher;

/// Seeded train/eval split
pub mod splitter;
