// ============================================================
// Layer 5 — Learning-Rate Policy
// ============================================================
// A small value type handed to the loop driver by value.
//
//   LinearWarmup:  lr(i) = base_lr · i / warmup_iters   for i < warmup_iters
//                  lr(i) = base_lr                        otherwise
//   Constant:      lr(i) = lr
//
// There is no decay after warmup.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LrPolicy {
    Constant { lr: f64 },
    LinearWarmup { base_lr: f64, warmup_iters: usize },
}

impl LrPolicy {
    /// Zero warmup iterations gives a constant policy.
    pub fn linear_warmup(base_lr: f64, warmup_iters: usize) -> Self {
        if warmup_iters == 0 {
            LrPolicy::Constant { lr: base_lr }
        } else {
            LrPolicy::LinearWarmup { base_lr, warmup_iters }
        }
    }

    /// Learning rate to use for `iteration`.
    pub fn lr(&self, iteration: usize) -> f64 {
        match *self {
            LrPolicy::Constant { lr } => lr,
            LrPolicy::LinearWarmup { base_lr, warmup_iters } if iteration < warmup_iters => {
                base_lr * iteration as f64 / warmup_iters as f64
            }
            LrPolicy::LinearWarmup { base_lr, .. } => base_lr,
        }
    }

    pub fn base_lr(&self) -> f64 {
        match *self {
            LrPolicy::Constant { lr }              => lr,
            LrPolicy::LinearWarmup { base_lr, .. } => base_lr,
        }
    }
}
