// ============================================================
// Layer 5 — Masked Cross-Entropy
// ============================================================
// Token-level cross-entropy that skips every target equal to -1.
//
// Burn's CrossEntropyLoss cannot take a negative class index, so
// the masked positions are clamped to class 0 for the gather and
// then multiplied out of the sum:
//
//   loss = Σ_i mask_i · (−log p(target_i)) / Σ_i mask_i
//
// A batch whose targets are all -1 has no defined loss; it yields
// None instead of dividing by zero.

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::data::dataset::IGNORE_INDEX;

/// logits: [batch, time, vocab], targets: [batch, time] → scalar loss
pub fn masked_cross_entropy<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
) -> Option<Tensor<B, 1>> {
    let [batch, time, vocab] = logits.dims();
    let rows = batch * time;

    let logits  = logits.reshape([rows, vocab]);
    let targets = targets.reshape([rows]);

    let keep  = targets.clone().greater_elem(IGNORE_INDEX);
    let count = keep.clone().int().sum().into_scalar().elem::<i64>();
    if count == 0 {
        return None;
    }

    let safe_targets = targets.clamp_min(0).reshape([rows, 1]);
    let picked = log_softmax(logits, 1)
        .gather(1, safe_targets)
        .reshape([rows]);

    let nll = picked.neg().mul(keep.float()).sum();
    Some(nll.div_scalar(count as f64))
}

/// Arithmetic mean over the batches that produced a loss.
///
/// Batches without a countable target (None) are left out; if
/// nothing remains the mean is undefined and None is returned.
pub fn mean_batch_loss<I>(losses: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, n) = losses
        .into_iter()
        .flatten()
        .fold((0.0f64, 0usize), |(sum, n), loss| (sum + loss, n + 1));

    (n > 0).then(|| sum / n as f64)
}
