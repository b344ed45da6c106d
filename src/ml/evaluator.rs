// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a model on one dataset split:
//   - mean_loss: teacher-forced loss, weighted by batch size
//   - evaluate:  greedy decode of every example, scored with
//                corpus BLEU against ALL references per example

use std::sync::Arc;

use anyhow::Result;
use burn::{data::dataloader::DataLoader, data::dataset::Dataset, prelude::*};

use crate::data::batcher::TranslitBatch;
use crate::data::dataset::TranslitDataset;
use crate::domain::vocabulary::EOS_INDEX;
use crate::ml::bleu::{corpus_bleu, MAX_NGRAM};
use crate::ml::model::{TranslitModel, MAX_GENERATION_STEPS};

/// Split-level mean of per-batch mean losses, weighted by batch size:
/// sum(loss_i * n_i) / sum(n_i). Returns NaN for an empty split.
pub fn weighted_mean_loss(batches: &[(f64, usize)]) -> f64 {
    let total: usize = batches.iter().map(|&(_, n)| n).sum();
    if total == 0 {
        return f64::NAN;
    }
    let weighted: f64 = batches.iter().map(|&(loss, n)| loss * n as f64).sum();
    weighted / total as f64
}

/// Teacher-forced loss over every batch of a loader.
pub fn mean_loss<B: Backend>(
    model:  &TranslitModel<B>,
    loader: &Arc<dyn DataLoader<TranslitBatch<B>>>,
) -> f64 {
    let per_batch: Vec<(f64, usize)> = loader
        .iter()
        .map(|batch| {
            let size = batch.batch_size();
            let (loss, _) = model.forward_loss(batch);
            (loss.into_scalar().elem::<f64>(), size)
        })
        .collect();
    weighted_mean_loss(&per_batch)
}

/// Content symbols of a decoded or encoded target: everything between
/// `<sos>` and `<eos>`, reserved markers dropped.
pub fn content(indices: &[usize]) -> Vec<usize> {
    indices.iter().copied().filter(|&i| i > EOS_INDEX).collect()
}

pub struct Evaluator {
    dataset: Arc<TranslitDataset>,
}

impl Evaluator {
    pub fn new(dataset: Arc<TranslitDataset>) -> Self {
        Self { dataset }
    }

    /// Corpus BLEU of greedy decodes over the whole split.
    pub fn evaluate<B: Backend>(&self, model: &TranslitModel<B>, device: &B::Device) -> Result<f64> {
        let mut hypotheses = Vec::with_capacity(self.dataset.len());
        let mut references = Vec::with_capacity(self.dataset.len());

        for index in 0..self.dataset.len() {
            let Some(set) = self.dataset.references(index) else {
                anyhow::bail!("reference set {index} is missing");
            };
            let generation = model.generate(&set.source, MAX_GENERATION_STEPS, device)?;
            hypotheses.push(content(&generation.indices));
            references.push(set.references.iter().map(|r| content(r)).collect::<Vec<_>>());
        }

        let score = corpus_bleu(&hypotheses, &references, MAX_NGRAM);
        tracing::debug!("BLEU over {} examples: {:.4}", hypotheses.len(), score);
        Ok(score)
    }
}
