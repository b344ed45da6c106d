// ============================================================
// Layer 4 — Transliteration Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<TranslitSample>
// of ragged index sequences into padded tensors.
//
//   Input:  N samples, source lengths S_i, target lengths T_i
//   Output: sources [N, max S_i], targets [N, max T_i]
//
// Padding uses index 0 (<pad>) on both sides. The source mask is
// true at real positions and false at padding.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslitSample;
use crate::domain::vocabulary::PAD_INDEX;

// ─── TranslitBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TranslitBatch<B: Backend> {
    /// Source index sequences — shape: [batch_size, src_len]
    pub sources: Tensor<B, 2, Int>,

    /// Source validity — shape: [batch_size, src_len], true = real symbol
    pub source_mask: Tensor<B, 2, Bool>,

    /// Target index sequences including <sos>/<eos> — shape: [batch_size, tgt_len]
    pub targets: Tensor<B, 2, Int>,
}

impl<B: Backend> TranslitBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.sources.dims()[0]
    }
}

// ─── TranslitBatcher ──────────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct TranslitBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TranslitBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// Right-pad every sequence with `<pad>` to the longest one and flatten
/// row-major. Returns the flat buffer and the padded length.
fn pad_flat(sequences: &[&[usize]]) -> (Vec<i32>, usize) {
    let max_len = sequences.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut flat = Vec::with_capacity(sequences.len() * max_len);
    for seq in sequences {
        flat.extend(seq.iter().map(|&x| x as i32));
        flat.extend(std::iter::repeat(PAD_INDEX as i32).take(max_len - seq.len()));
    }
    (flat, max_len)
}

impl<B: Backend> Batcher<TranslitSample, TranslitBatch<B>> for TranslitBatcher<B> {
    fn batch(&self, items: Vec<TranslitSample>) -> TranslitBatch<B> {
        let batch_size = items.len();

        let sources: Vec<&[usize]> = items.iter().map(|s| s.source.as_slice()).collect();
        let targets: Vec<&[usize]> = items.iter().map(|s| s.target.as_slice()).collect();
        let (src_flat, src_len) = pad_flat(&sources);
        let (tgt_flat, tgt_len) = pad_flat(&targets);

        let sources = Tensor::<B, 1, Int>::from_ints(src_flat.as_slice(), &self.device)
            .reshape([batch_size, src_len]);
        let targets = Tensor::<B, 1, Int>::from_ints(tgt_flat.as_slice(), &self.device)
            .reshape([batch_size, tgt_len]);

        let source_mask = sources.clone().equal_elem(PAD_INDEX as i32).bool_not();

        TranslitBatch { sources, source_mask, targets }
    }
}
