// ============================================================
// Layer 4 — Prompt Batcher
// ============================================================
// Implements Burn's Batcher trait to stack PromptExamples into
// [batch_size, block_size] Int tensors.
//
// Examples written by build-cache are already block length, but
// the batcher does not rely on it: short rows are padded (input
// with PAD, target with -1) and long rows are truncated so every
// batch has a rectangular shape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::{batcher::Batcher, DataLoader},
    prelude::*,
};

use crate::data::dataset::{PromptExample, IGNORE_INDEX};

/// Input id used to pad short rows
pub const PAD_INPUT: i64 = 0;

// ─── PromptBatch ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PromptBatch<B: Backend> {
    /// Token ids fed to the model, shape [batch_size, block_size]
    pub inputs: Tensor<B, 2, Int>,

    /// Next-token labels (-1 where ignored), shape [batch_size, block_size]
    pub targets: Tensor<B, 2, Int>,

    /// Number of examples stacked into this batch
    pub size: usize,
}

// ─── PromptBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct PromptBatcher<B: Backend> {
    pub device:     B::Device,
    pub block_size: usize,
}

impl<B: Backend> PromptBatcher<B> {
    pub fn new(device: B::Device, block_size: usize) -> Self {
        Self { device, block_size }
    }
}

fn fit_to_block(ids: &[i64], block_size: usize, fill: i64) -> impl Iterator<Item = i64> + '_ {
    ids.iter()
        .copied()
        .chain(std::iter::repeat(fill))
        .take(block_size)
}

impl<B: Backend> Batcher<PromptExample, PromptBatch<B>> for PromptBatcher<B> {
    fn batch(&self, items: Vec<PromptExample>) -> PromptBatch<B> {
        let size = items.len();

        let inputs: Vec<i64> = items
            .iter()
            .flat_map(|ex| fit_to_block(&ex.input_ids, self.block_size, PAD_INPUT))
            .collect();

        let targets: Vec<i64> = items
            .iter()
            .flat_map(|ex| fit_to_block(&ex.target_ids, self.block_size, IGNORE_INDEX))
            .collect();

        let inputs = Tensor::<B, 2, Int>::from_data(
            TensorData::new(inputs, [size, self.block_size]),
            &self.device,
        );
        let targets = Tensor::<B, 2, Int>::from_data(
            TensorData::new(targets, [size, self.block_size]),
            &self.device,
        );

        PromptBatch { inputs, targets, size }
    }
}

/// Iterate a loader once, skipping the incomplete tail batch.
pub fn full_batches<'a, B: Backend>(
    loader:     &'a dyn DataLoader<PromptBatch<B>>,
    batch_size: usize,
) -> impl Iterator<Item = PromptBatch<B>> + 'a {
    loader.iter().filter(move |batch| batch.size == batch_size)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_batch_shapes_and_padding() {
        let device  = Default::default();
        let batcher = PromptBatcher::<TestBackend>::new(device, 4);

        let batch = batcher.batch(vec![
            PromptExample::new(vec![2, 5, 6, 7, 8, 9], vec![-1, 6, 7, 8, 9, 3]),
            PromptExample::new(vec![2, 5],             vec![-1, 3]),
        ]);

        assert_eq!(batch.size, 2);
        assert_eq!(batch.inputs.dims(),  [2, 4]);
        assert_eq!(batch.targets.dims(), [2, 4]);

        let inputs: Vec<i64> = batch.inputs.into_data().convert::<i64>().to_vec().unwrap();
        let targets: Vec<i64> = batch.targets.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(inputs,  vec![2, 5, 6, 7, 2, 5, 0, 0]);
        assert_eq!(targets, vec![-1, 6, 7, 8, -1, 3, -1, -1]);
    }
}
