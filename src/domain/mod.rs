// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the fine-tuning corpus
// IS, independent of how it is tokenised or trained on.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO tokenizer types
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One instruction / input / output record and its prompt template
pub mod prompt;

// Abstractions that the data layer implements
pub mod traits;
