// ============================================================
// Layer 5 — Fine-Tuning Loop
// ============================================================
// Iteration-based training with gradient accumulation, using
// Burn's DataLoader, GradientsAccumulator, and any Optimizer.
//
// One iteration:
//   lr     = policy.lr(iteration)
//   repeat gradient_accumulate times:
//       loss  = masked_ce(model(x), y) / gradient_accumulate
//       grads += ∂loss/∂θ
//   θ      = optimizer.step(lr, θ, grads)
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - The eval loader must therefore batch on B::InnerBackend
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{path::Path, sync::Arc};

use crate::data::{
    batcher::{full_batches, PromptBatch, PromptBatcher},
    dataset::{CacheSplit, PromptDataset},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{MetricsLogger, EVAL_LOSS, LEARNING_RATE, TRAIN_LOSS},
};
use crate::ml::{
    loss::{masked_cross_entropy, mean_batch_loss},
    model::JamoModel,
    schedule::LrPolicy,
};

/// Seed of the training shuffle
pub const TRAIN_SHUFFLE_SEED: u64 = 1231928;

/// Iteration counts and batch geometry of one run.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub batch_size:          usize,
    pub max_iters:           usize,
    /// 0 disables periodic checkpoints
    pub save_interval:       usize,
    /// 0 disables periodic evaluation
    pub eval_interval:       usize,
    pub gradient_accumulate: usize,
}

fn due(iteration: usize, interval: usize) -> bool {
    interval > 0 && iteration % interval == 0
}

// ─── Loaders ──────────────────────────────────────────────────────────────────
pub struct Loaders<B: AutodiffBackend> {
    pub train: Arc<dyn DataLoader<PromptBatch<B>>>,
    pub eval:  Arc<dyn DataLoader<PromptBatch<B::InnerBackend>>>,
}

/// Open both cache splits and wrap them in data loaders.
/// Training batches are shuffled with `TRAIN_SHUFFLE_SEED`,
/// evaluation batches keep cache order.
pub fn build_loaders<B: AutodiffBackend>(
    cache_path: &Path,
    batch_size: usize,
    block_size: usize,
    device:     &B::Device,
) -> Result<Loaders<B>> {
    let train_dataset = PromptDataset::open(cache_path, CacheSplit::Train)?;
    let eval_dataset  = PromptDataset::open(cache_path, CacheSplit::Eval)?;

    let train_batcher = PromptBatcher::<B>::new(device.clone(), block_size);
    let train = DataLoaderBuilder::new(train_batcher)
        .batch_size(batch_size)
        .shuffle(TRAIN_SHUFFLE_SEED)
        .num_workers(1)
        .build(train_dataset);

    // InnerBackend, no autodiff overhead
    let eval_batcher = PromptBatcher::<B::InnerBackend>::new(device.clone(), block_size);
    let eval = DataLoaderBuilder::new(eval_batcher)
        .batch_size(batch_size)
        .num_workers(1)
        .build(eval_dataset);

    Ok(Loaders { train, eval })
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
/// Mean loss over every full evaluation batch.
///
/// Batches whose targets are all ignored do not count; an empty
/// evaluation set gives None.
pub fn evaluate<B: Backend>(
    model:      &JamoModel<B>,
    loader:     &dyn DataLoader<PromptBatch<B>>,
    batch_size: usize,
) -> Option<f64> {
    let losses = full_batches(loader, batch_size).map(|batch| {
        masked_cross_entropy(model.forward(batch.inputs), batch.targets)
            .map(|loss| loss.into_scalar().elem::<f64>())
    });
    mean_batch_loss(losses)
}

// ─── FineTuner ────────────────────────────────────────────────────────────────
pub struct FineTuner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<JamoModel<B>, B>,
{
    settings:    LoopSettings,
    policy:      LrPolicy,
    model:       JamoModel<B>,
    optimizer:   O,
    loaders:     Loaders<B>,
    checkpoints: CheckpointManager,
    metrics:     MetricsLogger,
}

impl<B, O> FineTuner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<JamoModel<B>, B>,
{
    pub fn new(
        settings:    LoopSettings,
        policy:      LrPolicy,
        model:       JamoModel<B>,
        optimizer:   O,
        loaders:     Loaders<B>,
        checkpoints: CheckpointManager,
        metrics:     MetricsLogger,
    ) -> Self {
        Self { settings, policy, model, optimizer, loaders, checkpoints, metrics }
    }

    /// Run the loop to `max_iters` and return the trained model.
    pub fn train(self) -> Result<JamoModel<B>> {
        let FineTuner { settings, policy, mut model, mut optimizer, loaders, checkpoints, metrics } =
            self;

        let accumulate = settings.gradient_accumulate.max(1);
        let train      = loaders.train.clone();
        let mut batches = full_batches(train.as_ref(), settings.batch_size);
        let mut last_saved = None;

        tracing::info!(
            "Fine-tuning for {} iterations (batch_size={}, gradient_accumulate={}, peak lr={:.1e})",
            settings.max_iters,
            settings.batch_size,
            accumulate,
            policy.base_lr()
        );
        tracing::info!("Metrics → '{}'", metrics.csv_path().display());

        for iteration in 1..=settings.max_iters {
            let lr = policy.lr(iteration);

            let mut accumulator = GradientsAccumulator::<JamoModel<B>>::new();
            let mut loss_sum    = 0.0f64;
            let mut contributed = 0usize;

            for _ in 0..accumulate {
                let batch = match batches.next() {
                    Some(batch) => batch,
                    None => {
                        // epoch boundary: reshuffle and start over
                        batches = full_batches(train.as_ref(), settings.batch_size);
                        match batches.next() {
                            Some(batch) => batch,
                            None => bail!(
                                "Training split has no full batch of {} examples",
                                settings.batch_size
                            ),
                        }
                    }
                };

                let logits = model.forward(batch.inputs);
                let Some(loss) = masked_cross_entropy(logits, batch.targets) else {
                    tracing::debug!("Iteration {}: micro-batch has no countable target", iteration);
                    continue;
                };

                loss_sum    += loss.clone().into_scalar().elem::<f64>();
                contributed += 1;

                // gradients are scaled by the full accumulation factor
                let loss  = loss.div_scalar(accumulate as f64);
                let grads = GradientsParams::from_grads(loss.backward(), &model);
                accumulator.accumulate(&model, grads);
            }

            if contributed == 0 {
                tracing::warn!("Iteration {}: no micro-batch produced a loss, skipping step", iteration);
            } else {
                // mean over the micro-batches that produced a loss
                let train_loss = loss_sum / contributed as f64;
                model = optimizer.step(lr, model, accumulator.grads());
                metrics.add_scalar(TRAIN_LOSS, train_loss, iteration)?;
                tracing::info!("iter {:>5} | loss {:.4} | lr {:.3e}", iteration, train_loss, lr);
            }
            metrics.add_scalar(LEARNING_RATE, lr, iteration)?;

            if due(iteration, settings.eval_interval) {
                let valid = model.valid();
                match evaluate(&valid, loaders.eval.as_ref(), settings.batch_size) {
                    Some(loss) => {
                        metrics.add_scalar(EVAL_LOSS, loss, iteration)?;
                        tracing::info!("iter {:>5} | eval_loss {:.4}", iteration, loss);
                    }
                    None => tracing::warn!("Iteration {}: evaluation set yielded no loss", iteration),
                }
            }

            if due(iteration, settings.save_interval) {
                checkpoints.save_model(&model, iteration)?;
                last_saved = Some(iteration);
                tracing::info!("Checkpoint saved for iteration {}", iteration);
            }
        }

        if settings.max_iters > 0 && last_saved != Some(settings.max_iters) {
            checkpoints.save_model(&model, settings.max_iters)?;
            tracing::info!("Final checkpoint saved for iteration {}", settings.max_iters);
        }

        tracing::info!("Fine-tuning complete!");
        Ok(model)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{CacheWriter, PromptExample};
    use crate::ml::tiny_test_config;
    use burn::{backend::{Autodiff, NdArray}, optim::AdamWConfig};
    use std::fs;
    use tempfile::tempdir;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn sample(k: i64) -> PromptExample {
        let input: Vec<i64>  = (0..8).map(|i| 2 + (i + k) % 12).collect();
        let mut target: Vec<i64> = input[1..].to_vec();
        target.push(3);
        target[0] = -1;
        PromptExample::new(input, target)
    }

    /// Same inputs as `sample`, every target ignored
    fn fully_masked(k: i64) -> PromptExample {
        PromptExample::new(sample(k).input_ids, vec![-1; 8])
    }

    fn write_examples(path: &Path, train: &[PromptExample], eval: &[PromptExample]) {
        let mut writer = CacheWriter::create(path).expect("create cache");
        for ex in train {
            writer.write(CacheSplit::Train, ex).expect("write train");
        }
        for ex in eval {
            writer.write(CacheSplit::Eval, ex).expect("write eval");
        }
        writer.finish().expect("finish cache");
    }

    fn write_cache(path: &Path, train: usize, eval: usize) {
        let train: Vec<_> = (0..train as i64).map(sample).collect();
        let eval: Vec<_>  = (0..eval as i64).map(sample).collect();
        write_examples(path, &train, &eval);
    }

    fn lm_head(model: &JamoModel<TestBackend>) -> Vec<f32> {
        model.lm_head.weight.val().into_data().convert::<f32>().to_vec().unwrap()
    }

    fn metric(csv: &str, tag: &str, iteration: usize) -> Option<f64> {
        let prefix = format!("{tag},{iteration},");
        csv.lines()
            .find_map(|line| line.strip_prefix(prefix.as_str()))
            .map(|value| value.parse().unwrap())
    }

    struct Run {
        before: Vec<f32>,
        after:  Vec<f32>,
        csv:    String,
    }

    /// One iteration, batch_size 1, two micro-batches.
    fn run_one_iteration(dir: &Path, lr: f64, eval_interval: usize) -> Run {
        let device  = Default::default();
        let config  = tiny_test_config();
        let model   = config.init::<TestBackend>(&device);
        let before  = lm_head(&model);
        let loaders = build_loaders::<TestBackend>(&dir.join("cache.db"), 1, config.block_size, &device)
            .expect("loaders");

        let out   = dir.join("out");
        let tuner = FineTuner::new(
            LoopSettings {
                batch_size:          1,
                max_iters:           1,
                save_interval:       0,
                eval_interval,
                gradient_accumulate: 2,
            },
            LrPolicy::Constant { lr },
            model,
            AdamWConfig::new().init(),
            loaders,
            CheckpointManager::new(&out),
            MetricsLogger::new(&out).expect("metrics"),
        );
        let trained = tuner.train().expect("train");

        Run {
            before,
            after: lm_head(&trained),
            csv:   fs::read_to_string(out.join("metrics.csv")).expect("metrics.csv"),
        }
    }

    #[test]
    fn test_due_ignores_zero_interval() {
        assert!(!due(5, 0));
        assert!(due(50, 50));
        assert!(!due(49, 50));
    }

    #[test]
    fn test_train_logs_metrics_and_saves_final_checkpoint() {
        let dir   = tempdir().expect("tempdir");
        let cache = dir.path().join("cache.db");
        write_cache(&cache, 5, 4);

        let device = Default::default();
        let config = tiny_test_config();
        let model  = config.init::<TestBackend>(&device);
        let loaders =
            build_loaders::<TestBackend>(&cache, 2, config.block_size, &device).expect("loaders");

        let out      = dir.path().join("out");
        let settings = LoopSettings {
            batch_size:          2,
            max_iters:           3,
            save_interval:       0,
            eval_interval:       1,
            gradient_accumulate: 2,
        };
        let tuner = FineTuner::new(
            settings,
            LrPolicy::linear_warmup(1e-3, 2),
            model,
            AdamWConfig::new().init(),
            loaders,
            CheckpointManager::new(&out),
            MetricsLogger::new(&out).expect("metrics"),
        );
        tuner.train().expect("train");

        let csv = fs::read_to_string(out.join("metrics.csv")).expect("metrics.csv");
        assert!(csv.starts_with("tag,iteration,value"));
        assert_eq!(csv.lines().filter(|l| l.starts_with("Loss/eval,")).count(), 3);
        assert!(csv.contains("LearningRate,2,0.001000"));
        assert_eq!(CheckpointManager::new(&out).latest_iteration().expect("latest"), 3);
    }

    #[test]
    fn test_train_loss_averages_only_counted_micro_batches() {
        let dir = tempdir().expect("tempdir");
        write_examples(&dir.path().join("cache.db"), &[sample(0), fully_masked(1)], &[sample(0)]);

        // lr 0 keeps the weights, so eval sees the model the train loss was measured on
        let run = run_one_iteration(dir.path(), 0.0, 1);

        let train = metric(&run.csv, "Loss/train", 1).expect("train loss row");
        let eval  = metric(&run.csv, "Loss/eval", 1).expect("eval loss row");
        assert!((train - eval).abs() < 1e-4, "train {train} vs eval {eval}");
    }

    #[test]
    fn test_step_skipped_when_no_target_counts() {
        let dir = tempdir().expect("tempdir");
        write_examples(
            &dir.path().join("cache.db"),
            &[fully_masked(0), fully_masked(1)],
            &[sample(0)],
        );

        let run = run_one_iteration(dir.path(), 1e-2, 0);

        assert_eq!(metric(&run.csv, "Loss/train", 1), None);
        assert_eq!(metric(&run.csv, "LearningRate", 1), Some(0.01));
        assert_eq!(run.before, run.after);
    }

    #[test]
    fn test_accumulated_step_updates_weights() {
        let dir = tempdir().expect("tempdir");
        write_examples(&dir.path().join("cache.db"), &[sample(0), sample(1)], &[sample(0)]);

        let run = run_one_iteration(dir.path(), 1e-2, 0);

        assert!(metric(&run.csv, "Loss/train", 1).is_some());
        assert_ne!(run.before, run.after);
    }

    #[test]
    fn test_training_shuffle_is_seeded() {
        let dir   = tempdir().expect("tempdir");
        let cache = dir.path().join("cache.db");
        write_cache(&cache, 8, 2);

        let device = Default::default();
        let order  = || -> Vec<Vec<i64>> {
            let loaders = build_loaders::<TestBackend>(&cache, 2, 8, &device).expect("loaders");
            loaders
                .train
                .iter()
                .map(|batch| batch.inputs.into_data().convert::<i64>().to_vec().unwrap())
                .collect()
        };

        let first = order();
        assert_eq!(first.len(), 4);
        assert_eq!(first, order());
    }

    #[test]
    fn test_train_fails_without_full_batch() {
        let dir   = tempdir().expect("tempdir");
        let cache = dir.path().join("cache.db");
        write_cache(&cache, 1, 1);

        let device = Default::default();
        let config = tiny_test_config();
        let loaders =
            build_loaders::<TestBackend>(&cache, 2, config.block_size, &device).expect("loaders");
        let out = dir.path().join("out");

        let tuner = FineTuner::new(
            LoopSettings {
                batch_size:          2,
                max_iters:           1,
                save_interval:       0,
                eval_interval:       0,
                gradient_accumulate: 1,
            },
            LrPolicy::Constant { lr: 1e-3 },
            config.init::<TestBackend>(&device),
            AdamWConfig::new().init(),
            loaders,
            CheckpointManager::new(&out),
            MetricsLogger::new(&out).expect("metrics"),
        );
        assert!(tuner.train().is_err());
    }

    #[test]
    fn test_evaluate_empty_split_is_none() {
        let dir   = tempdir().expect("tempdir");
        let cache = dir.path().join("cache.db");
        write_cache(&cache, 2, 1);

        let device  = Default::default();
        let config  = tiny_test_config();
        let loaders =
            build_loaders::<TestBackend>(&cache, 2, config.block_size, &device).expect("loaders");
        let model   = config.init::<TestBackend>(&device).valid();

        assert_eq!(evaluate(&model, loaders.eval.as_ref(), 2), None);
    }
}
