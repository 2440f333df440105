// ============================================================
// Layer 2 — FinetuneUseCase
// ============================================================
// Orchestrates a fine-tuning run in order:
//
//   Step 1: Pick the compute backend       (Layer 5 - ml)
//   Step 2: Load the pretrained checkpoint (Layer 6 - infra)
//   Step 3: Build the AdamW optimiser      (Layer 5 - ml)
//   Step 4: Open the cached splits         (Layer 4 - data)
//   Step 5: Save model + run config        (Layer 6 - infra)
//   Step 6: Run the training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{optim::AdamWConfig, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::{
    checkpoint::{load_pretrained, CheckpointManager},
    metrics::MetricsLogger,
};
use crate::ml::{
    device::{CpuBackend, DeviceKind, GpuBackend},
    model::ModelSize,
    schedule::LrPolicy,
    trainer::{build_loaders, FineTuner, LoopSettings},
};

// ─── Fine-tuning Configuration ───────────────────────────────────────────────
// Everything a run was started with. Saved next to the weights
// as finetune_config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinetuneConfig {
    pub model_size:          ModelSize,
    pub learning_rate:       f64,
    pub batch_size:          usize,
    pub max_iters:           usize,
    pub warmup_iters:        usize,
    pub save_interval:       usize,
    pub eval_interval:       usize,
    pub gradient_accumulate: usize,
    pub checkpoint_dir:      String,
    pub corpus_path:         String,
    pub tokenizer_path:      String,
    pub with_lr_scheduler:   bool,
    pub pretrained_dir:      String,
    pub cache_path:          String,
    pub device:              DeviceKind,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            model_size:          ModelSize::Small,
            learning_rate:       5e-4,
            batch_size:          60,
            max_iters:           200,
            warmup_iters:        40,
            save_interval:       50,
            eval_interval:       50,
            gradient_accumulate: 6,
            checkpoint_dir:      "../tmp/finetuned".to_string(),
            corpus_path:         "../tmp/ko_alpaca_data.json".to_string(),
            tokenizer_path:      "hg_tokenizer".to_string(),
            with_lr_scheduler:   false,
            pretrained_dir:      "../tmp/checkpoint".to_string(),
            cache_path:          "../tmp/cache/sft-cache.db".to_string(),
            device:              DeviceKind::Gpu,
        }
    }
}

impl FinetuneConfig {
    pub fn lr_policy(&self) -> LrPolicy {
        LrPolicy::linear_warmup(self.learning_rate, self.warmup_iters)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            batch_size:          self.batch_size,
            max_iters:           self.max_iters,
            save_interval:       self.save_interval,
            eval_interval:       self.eval_interval,
            gradient_accumulate: self.gradient_accumulate,
        }
    }
}

// ─── FinetuneUseCase ──────────────────────────────────────────────────────────
pub struct FinetuneUseCase {
    config: FinetuneConfig,
}

impl FinetuneUseCase {
    pub fn new(config: FinetuneConfig) -> Self {
        Self { config }
    }

    /// Execute the run on the configured device
    pub fn execute(&self) -> Result<()> {
        match self.config.device {
            DeviceKind::Gpu => {
                let device = DeviceKind::gpu_device();
                tracing::info!("Using WGPU device: {:?}", device);
                self.run::<GpuBackend>(&device)
            }
            DeviceKind::Cpu => {
                let device = DeviceKind::cpu_device();
                tracing::info!("Using NdArray device: {:?}", device);
                self.run::<CpuBackend>(&device)
            }
        }
    }

    fn run<B: AutodiffBackend>(&self, device: &B::Device) -> Result<()> {
        let cfg = &self.config;

        if cfg.with_lr_scheduler {
            tracing::info!("with_lr_scheduler is set; the schedule stays linear warmup then constant");
        }
        tracing::debug!(
            "Cache was built from '{}'; tokenizer '{}' is not used while fine-tuning",
            cfg.corpus_path,
            cfg.tokenizer_path
        );

        // ── Step 2: Pretrained model ──────────────────────────────────────────
        let (model, model_config) =
            load_pretrained::<B>(&cfg.pretrained_dir, cfg.model_size, device)?;
        tracing::info!(
            "Model '{}' ready: {} layers, n_embd={}, block_size={}",
            cfg.model_size.name(),
            model_config.n_layer,
            model_config.n_embd,
            model_config.block_size
        );

        // ── Step 3: AdamW ─────────────────────────────────────────────────────
        let optimizer = AdamWConfig::new()
            .with_beta_1(0.965)
            .with_beta_2(0.99)
            .with_weight_decay(0.2)
            .init();

        // ── Step 4: Loaders ───────────────────────────────────────────────────
        let loaders = build_loaders::<B>(
            Path::new(&cfg.cache_path),
            cfg.batch_size,
            model_config.block_size,
            device,
        )?;

        // ── Step 5: Output directory ──────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.checkpoint_dir);
        checkpoints.save_model_config(&model_config)?;
        checkpoints.save_run_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Train ─────────────────────────────────────────────────────
        FineTuner::new(
            cfg.loop_settings(),
            cfg.lr_policy(),
            model,
            optimizer,
            loaders,
            checkpoints,
            metrics,
        )
        .train()?;

        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_policy_warms_up_over_forty_iterations() {
        let policy = FinetuneConfig::default().lr_policy();
        assert_eq!(policy.lr(0), 0.0);
        assert!((policy.lr(20) - 2.5e-4).abs() < 1e-12);
        assert_eq!(policy.lr(40), 5e-4);
    }

    #[test]
    fn test_loop_settings_follow_config() {
        let settings = FinetuneConfig::default().loop_settings();
        assert_eq!(settings.batch_size, 60);
        assert_eq!(settings.max_iters, 200);
        assert_eq!(settings.gradient_accumulate, 6);
        assert_eq!(settings.save_interval, 50);
        assert_eq!(settings.eval_interval, 50);
    }

    #[test]
    fn test_run_config_serialises_lowercase_tags() {
        let json = serde_json::to_string(&FinetuneConfig::default()).unwrap();
        assert!(json.contains("\"model_size\":\"small\""));
        assert!(json.contains("\"device\":\"gpu\""));
    }

    #[test]
    fn test_missing_pretrained_checkpoint_fails() {
        let dir    = tempdir().expect("tempdir");
        let config = FinetuneConfig {
            pretrained_dir: dir.path().join("nothing").to_string_lossy().into_owned(),
            checkpoint_dir: dir.path().join("out").to_string_lossy().into_owned(),
            device:         DeviceKind::Cpu,
            ..Default::default()
        };
        assert!(FinetuneUseCase::new(config).execute().is_err());
    }
}
