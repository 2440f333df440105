// ============================================================
// Layer 5 — Causal Language Model (Burn)
// ============================================================
// A GPT-style decoder: token + position embeddings, a stack of
// pre-norm causal self-attention blocks, and a vocabulary head.
//
//   input_ids [batch, time]  ──►  logits [batch, time, vocab]
//
// The fine-tuning driver only needs forward() and Burn's Module
// machinery (records, valid(), parameter visiting); everything
// else about the architecture is fixed by the checkpoint.
//
// Reference: Burn Book §3 (Building Blocks)
//            Radford et al. (2019) GPT-2

use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Vocabulary produced by `train-tokenizer` with its default settings
pub const DEFAULT_VOCAB_SIZE: usize = 10_000;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct JamoConfig {
    pub vocab_size: usize,
    /// Maximum sequence length; also the length of every cached example
    pub block_size: usize,
    pub n_embd:     usize,
    pub n_head:     usize,
    pub n_layer:    usize,
    pub d_ff:       usize,
    #[config(default = 0.1)]
    pub dropout:    f64,
}

impl JamoConfig {
    /// True when both configs describe the same parameter shapes.
    /// Dropout is ignored since it carries no weights.
    pub fn same_architecture(&self, other: &JamoConfig) -> bool {
        self.vocab_size == other.vocab_size
            && self.block_size == other.block_size
            && self.n_embd == other.n_embd
            && self.n_head == other.n_head
            && self.n_layer == other.n_layer
            && self.d_ff == other.d_ff
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> JamoModel<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.n_embd).init(device);
        let position_embedding = EmbeddingConfig::new(self.block_size, self.n_embd).init(device);
        let blocks: Vec<DecoderBlock<B>> = (0..self.n_layer)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.n_embd).init(device);
        let lm_head    = LinearConfig::new(self.n_embd, self.vocab_size)
            .with_bias(false)
            .init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        JamoModel {
            token_embedding, position_embedding, blocks,
            final_norm, lm_head, dropout,
            block_size: self.block_size,
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.n_embd, self.n_head)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.n_embd, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.n_embd).init(device);
        let norm1   = LayerNormConfig::new(self.n_embd).init(device);
        let norm2   = LayerNormConfig::new(self.n_embd).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        DecoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

// ─── Size presets ─────────────────────────────────────────────────────────────
/// The size tag accepted by `--model_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn config(&self) -> JamoConfig {
        let (n_embd, n_head, n_layer) = match self {
            ModelSize::Small  => (768,  12, 12),
            ModelSize::Medium => (1024, 16, 24),
            ModelSize::Large  => (1280, 20, 36),
        };
        JamoConfig::new(DEFAULT_VOCAB_SIZE, 256, n_embd, n_head, n_layer, 4 * n_embd)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelSize::Small  => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large  => "large",
        }
    }
}

// ─── Modules ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 3, Bool>) -> Tensor<B, 3> {
        let h = self.norm1.forward(x.clone());
        let attn_output = self.self_attn
            .forward(MhaInput::self_attn(h).mask_attn(mask))
            .context;
        let x = x + self.dropout.forward(attn_output);

        let h = self.norm2.forward(x.clone());
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(h))
        );
        x + self.dropout.forward(ffn_out)
    }
}

#[derive(Module, Debug)]
pub struct JamoModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub blocks:             Vec<DecoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
    pub block_size:         usize,
}

impl<B: Backend> JamoModel<B> {
    /// input_ids: [batch, time] → logits: [batch, time, vocab]
    ///
    /// `time` must not exceed the configured block size.
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let tok_emb = self.token_embedding.forward(input_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        // true above the diagonal: position t never attends to t' > t
        let mask = generate_autoregressive_mask::<B>(batch_size, seq_len, &device);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for block in &self.blocks {
            x = block.forward(x, mask.clone());
        }
        let x = self.final_norm.forward(x);

        self.lm_head.forward(x)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::tiny_test_config as tiny_config;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: JamoModel<TestBackend> = tiny_config().init(&device);
        let input = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![1i64, 2, 3, 4, 5, 6], [2, 3]),
            &device,
        );
        assert_eq!(model.forward(input).dims(), [2, 3, 16]);
    }

    #[test]
    fn test_presets_share_vocab_and_block() {
        for size in [ModelSize::Small, ModelSize::Medium, ModelSize::Large] {
            let cfg = size.config();
            assert_eq!(cfg.vocab_size, DEFAULT_VOCAB_SIZE);
            assert_eq!(cfg.n_embd % cfg.n_head, 0, "{} heads must divide width", size.name());
        }
        assert!(!ModelSize::Small.config().same_architecture(&ModelSize::Medium.config()));
    }

    #[test]
    fn test_same_architecture_ignores_dropout() {
        let a = tiny_config();
        let b = tiny_config().with_dropout(0.5);
        assert!(a.same_architecture(&b));
    }
}
