// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal per subcommand.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - No direct cache or file access (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Fine-tuning a pretrained checkpoint on the prompt cache
pub mod finetune_use_case;

// Building the prompt cache from an instruction corpus
pub mod cache_use_case;

// Training the unigram tokenizer
pub mod tokenizer_use_case;
