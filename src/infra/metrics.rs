// ============================================================
// Layer 6 — Scalar Metrics Logger
// ============================================================
// Records tagged scalars to a CSV file, one row per value:
//
//   tag,iteration,value
//   Loss/train,1,9.210341
//   LearningRate,1,0.000013
//   Loss/eval,50,4.118220
//
// Tags follow the usual "Group/name" convention so the file can
// be pivoted into one curve per tag.
//
// Output file: <checkpoint_dir>/metrics.csv (rewritten at the start
// of every run)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

pub const TRAIN_LOSS: &str    = "Loss/train";
pub const EVAL_LOSS: &str     = "Loss/eval";
pub const LEARNING_RATE: &str = "LearningRate";

/// One recorded value
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub tag:       String,
    pub iteration: usize,
    pub value:     f64,
}

impl Scalar {
    pub fn new(tag: impl Into<String>, iteration: usize, value: f64) -> Self {
        Self { tag: tag.into(), iteration, value }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Starts a fresh metrics.csv holding only the header; rows of an
    /// earlier run in the same directory are discarded.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if csv_path.exists() {
            tracing::warn!("Overwriting metrics from a previous run in '{}'", csv_path.display());
        }
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "tag,iteration,value")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, s: &Scalar) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{},{:.6}", s.tag, s.iteration, s.value)?;
        Ok(())
    }

    pub fn add_scalar(&self, tag: &str, value: f64, iteration: usize) -> Result<()> {
        self.log(&Scalar::new(tag, iteration, value))
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
