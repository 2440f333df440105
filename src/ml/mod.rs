// ============================================================
// Layer 5 — ML Layer (Burn)
// ============================================================
// All Burn model and training code lives here.
//
//   model.rs     — causal decoder + size presets
//   loss.rs      — cross-entropy that ignores label -1
//   schedule.rs  — linear-warmup learning-rate policy
//   device.rs    — gpu / cpu backend selection
//   trainer.rs   — the fine-tuning loop and evaluation
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

pub mod model;
pub mod loss;
pub mod schedule;
pub mod device;
pub mod trainer;

/// A model small enough to train in unit tests on the CPU backend.
#[cfg(test)]
pub(crate) fn tiny_test_config() -> model::JamoConfig {
    model::JamoConfig::new(16, 8, 16, 2, 1, 32).with_dropout(0.0)
}
