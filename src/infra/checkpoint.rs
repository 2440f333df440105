// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's gzipped named
// MessagePack recorder at half precision.
//
// Directory layout (pretrained and fine-tuned alike):
//
//   <dir>/
//     model_config.json     ← sizing metadata (JamoConfig)
//     iter_50.mpk.gz        ← weights after iteration 50
//     iter_100.mpk.gz
//     latest.json           ← number of the newest iteration
//     finetune_config.json  ← run settings (fine-tuned dirs only)
//
// Loading needs the architecture before the weights, so the
// size tag is checked against model_config.json when present.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    prelude::*,
    record::{HalfPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::Serialize;
use std::{fs, path::{Path, PathBuf}};

use crate::ml::model::{JamoConfig, JamoModel, ModelSize};

const MODEL_CONFIG_FILE: &str = "model_config.json";
const LATEST_FILE:       &str = "latest.json";
const RUN_CONFIG_FILE:   &str = "finetune_config.json";

/// Writes <name>.mpk.gz
type WeightsRecorder = NamedMpkGzFileRecorder<HalfPrecisionSettings>;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))
    }

    fn weights_path(&self, iteration: usize) -> PathBuf {
        // the recorder appends .mpk.gz
        self.dir.join(format!("iter_{iteration}"))
    }

    /// Save weights for `iteration` and move the latest pointer to it.
    pub fn save_model<B: Backend>(&self, model: &JamoModel<B>, iteration: usize) -> Result<()> {
        self.ensure_dir()?;
        let path = self.weights_path(iteration);

        WeightsRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join(LATEST_FILE);
        fs::write(&latest_path, serde_json::to_string(&iteration)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        tracing::debug!("Saved checkpoint: iteration {}", iteration);
        Ok(())
    }

    /// Build a model from `config` and load the newest weights into it.
    pub fn load_model<B: Backend>(
        &self,
        config: &JamoConfig,
        device: &B::Device,
    ) -> Result<JamoModel<B>> {
        let iteration = self.latest_iteration()?;
        let path      = self.weights_path(iteration);

        tracing::info!("Loading checkpoint '{}' (iteration {})", self.dir.display(), iteration);

        let record = WeightsRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(config.init::<B>(device).load_record(record))
    }

    pub fn save_model_config(&self, config: &JamoConfig) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(MODEL_CONFIG_FILE);
        config
            .save(&path)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    /// Sizing metadata, or None for a directory that carries none.
    pub fn load_model_config(&self) -> Result<Option<JamoConfig>> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        JamoConfig::load(&path)
            .map(Some)
            .map_err(|e| anyhow!("Cannot read '{}': {e}", path.display()))
    }

    pub fn save_run_config<T: Serialize>(&self, cfg: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(RUN_CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved run config to '{}'", path.display());
        Ok(())
    }

    /// Newest saved iteration, read from latest.json.
    pub fn latest_iteration(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("No checkpoint found: cannot read '{}'", path.display()))?;
        Ok(serde_json::from_str::<usize>(s.trim())?)
    }
}

/// Load the pretrained model at `dir` for the given size tag.
///
/// When the directory records its own sizing metadata it must
/// describe the same architecture as the size tag.
pub fn load_pretrained<B: Backend>(
    dir:    impl Into<PathBuf>,
    size:   ModelSize,
    device: &B::Device,
) -> Result<(JamoModel<B>, JamoConfig)> {
    let manager = CheckpointManager::new(dir);
    let preset  = size.config();

    let config = match manager.load_model_config()? {
        Some(stored) if !stored.same_architecture(&preset) => bail!(
            "Checkpoint '{}' does not match model size '{}': stored {:?}",
            manager.dir().display(),
            size.name(),
            stored
        ),
        Some(stored) => stored,
        None => {
            tracing::warn!(
                "'{}' has no {}; assuming the '{}' preset",
                manager.dir().display(),
                MODEL_CONFIG_FILE,
                size.name()
            );
            preset
        }
    };

    let model = manager.load_model::<B>(&config, device)?;
    tracing::info!("Loaded '{}' model with {} parameters", size.name(), model.num_params());
    Ok((model, config))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::tiny_test_config;
    use burn::backend::NdArray;
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_save_then_load_latest() {
        let dir     = tempdir().expect("tempdir");
        let device  = Default::default();
        let config  = tiny_test_config();
        let manager = CheckpointManager::new(dir.path());

        let model: JamoModel<TestBackend> = config.init(&device);
        manager.save_model_config(&config).expect("save config");
        manager.save_model(&model, 5).expect("save 5");
        manager.save_model(&model, 10).expect("save 10");

        assert_eq!(manager.latest_iteration().expect("latest"), 10);
        assert!(dir.path().join("iter_10.mpk.gz").exists());

        let stored = manager.load_model_config().expect("read").expect("present");
        assert!(stored.same_architecture(&config));

        let loaded = manager.load_model::<TestBackend>(&stored, &device).expect("load");
        assert_eq!(loaded.num_params(), model.num_params());
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir     = tempdir().expect("tempdir");
        let manager = CheckpointManager::new(dir.path());
        assert!(manager.latest_iteration().is_err());
        assert!(manager.load_model_config().expect("no io error").is_none());
    }

    #[test]
    fn test_pretrained_size_mismatch_is_rejected() {
        let dir     = tempdir().expect("tempdir");
        let manager = CheckpointManager::new(dir.path());
        manager.save_model_config(&tiny_test_config()).expect("save config");

        let err = load_pretrained::<TestBackend>(dir.path(), ModelSize::Small, &Default::default())
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
