// ============================================================
// Layer 4 — Example Encoder
// ============================================================
// Turns one PromptRecord into one fixed-length PromptExample.
//
// Token layout before shifting:
//
//   [BOS] p0 p1 ... pP  r0 r1 ... rR [EOS]
//   └────── prompt ───┘ └─ response ─┘
//
// After shifting by one position:
//
//   input_ids  = [BOS] p0 ... pP r0 ... rR
//   target_ids =  p0   p1 ... r0 r1 ... [EOS]
//
// Every target that predicts a prompt token is replaced by -1 so
// the loss only covers the response. Sequences are truncated to
// block_size and padded up to it (input with PAD, target with -1).

use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;

use crate::data::dataset::{PromptExample, IGNORE_INDEX};
use crate::domain::prompt::PromptRecord;

/// Build a single example from already-encoded prompt and response ids.
///
/// Returns None when truncation leaves no response target at all.
pub fn build_example(
    prompt_ids:   &[u32],
    response_ids: &[u32],
    block_size:   usize,
    bos_id:       u32,
    eos_id:       u32,
    pad_id:       u32,
) -> Option<PromptExample> {
    if block_size == 0 {
        return None;
    }

    let mut tokens: Vec<i64> = Vec::with_capacity(prompt_ids.len() + response_ids.len() + 2);
    tokens.push(bos_id as i64);
    tokens.extend(prompt_ids.iter().map(|&id| id as i64));
    tokens.extend(response_ids.iter().map(|&id| id as i64));
    tokens.push(eos_id as i64);
    tokens.truncate(block_size + 1);

    let mut input_ids:  Vec<i64> = tokens[..tokens.len() - 1].to_vec();
    let mut target_ids: Vec<i64> = tokens[1..].to_vec();

    // target j predicts tokens[j + 1]; the first prompt_ids.len() of those are prompt
    let masked = prompt_ids.len().min(target_ids.len());
    target_ids[..masked].fill(IGNORE_INDEX);

    if target_ids.iter().all(|&t| t == IGNORE_INDEX) {
        return None;
    }

    input_ids.resize(block_size, pad_id as i64);
    target_ids.resize(block_size, IGNORE_INDEX);

    Some(PromptExample::new(input_ids, target_ids))
}

/// Encodes prompt records with a trained tokenizer.
pub struct ExampleEncoder<'a> {
    tokenizer:  &'a Tokenizer,
    block_size: usize,
    bos_id:     u32,
    eos_id:     u32,
    pad_id:     u32,
}

impl<'a> ExampleEncoder<'a> {
    pub fn new(
        tokenizer:  &'a Tokenizer,
        block_size: usize,
        bos_id:     u32,
        eos_id:     u32,
        pad_id:     u32,
    ) -> Self {
        Self { tokenizer, block_size, bos_id, eos_id, pad_id }
    }

    pub fn encode(&self, record: &PromptRecord) -> Result<Option<PromptExample>> {
        let prompt = self.tokenizer
            .encode(record.prompt(), false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        let response = self.tokenizer
            .encode(record.response(), false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;

        Ok(build_example(
            prompt.get_ids(),
            response.get_ids(),
            self.block_size,
            self.bos_id,
            self.eos_id,
            self.pad_id,
        ))
    }
}
