// ============================================================
// Layer 4 — Train/Evaluation Splitter
// ============================================================
// Shuffles examples with a SEEDED generator and splits them
// into a training set and an evaluation set.
//
// The seed makes the cache reproducible: running build-cache
// twice over the same corpus produces the same two splits.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom over a
// StdRng created with SeedableRng::seed_from_u64.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, eval).
///
/// `eval_fraction` is clamped to [0, 1]. The evaluation set is
/// rounded to the nearest whole sample.
pub fn split_train_eval<T>(
    mut samples:   Vec<T>,
    eval_fraction: f64,
    seed:          u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total     = samples.len();
    let eval_len  = ((total as f64) * eval_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at  = total - eval_len.min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..total)
    let eval = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} evaluation (seed {})",
        samples.len(),
        eval.len(),
        seed,
    );

    (samples, eval)
}
