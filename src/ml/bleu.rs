// ============================================================
// Layer 5 — Corpus BLEU
// ============================================================
// BLEU over symbol sequences, scored at corpus level:
//
//   p_n = Σ clipped n-gram matches / Σ hypothesis n-grams
//   BP  = 1 if c > r else exp(1 - r / c)
//   BLEU = BP · exp(mean(log p_n)),  n = 1..4
//
// Counts are pooled across the whole corpus before precisions are
// taken, so short hypotheses with no 4-grams of their own still
// contribute through the others.

use std::collections::HashMap;
use std::hash::Hash;

/// Standard BLEU order.
pub const MAX_NGRAM: usize = 4;

/// Corpus BLEU with uniform weights over orders `1..=max_n`.
///
/// * clipped n-gram counts use, per n-gram, the maximum count found in
///   any single reference of that example
/// * the effective reference length of an example is the reference
///   length closest to its hypothesis length (ties go to the shorter)
/// * no smoothing: any order with zero matches gives 0
///
/// `references[i]` holds every accepted reference for `hypotheses[i]`.
pub fn corpus_bleu<T: Eq + Hash + Clone>(
    hypotheses: &[Vec<T>],
    references: &[Vec<Vec<T>>],
    max_n: usize,
) -> f64 {
    if hypotheses.is_empty() || max_n == 0 {
        return 0.0;
    }

    let mut clipped = vec![0usize; max_n];
    let mut totals  = vec![0usize; max_n];
    let mut hyp_len = 0usize;
    let mut ref_len = 0usize;

    for (hyp, refs) in hypotheses.iter().zip(references) {
        hyp_len += hyp.len();
        ref_len += closest_ref_len(hyp.len(), refs);

        for n in 1..=max_n {
            let hyp_counts = ngram_counts(hyp, n);
            totals[n - 1] += hyp_counts.values().sum::<usize>();

            let ref_counts: Vec<HashMap<&[T], usize>> =
                refs.iter().map(|r| ngram_counts(r, n)).collect();
            for (gram, &count) in &hyp_counts {
                let max_ref = ref_counts
                    .iter()
                    .map(|rc| rc.get(gram).copied().unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                clipped[n - 1] += count.min(max_ref);
            }
        }
    }

    let mut log_precision = 0.0;
    for (&c, &t) in clipped.iter().zip(&totals) {
        if c == 0 || t == 0 {
            return 0.0;
        }
        log_precision += (c as f64 / t as f64).ln();
    }
    log_precision /= max_n as f64;

    let brevity = if hyp_len > ref_len {
        1.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    };

    brevity * log_precision.exp()
}

fn closest_ref_len<T>(hyp_len: usize, refs: &[Vec<T>]) -> usize {
    refs.iter()
        .map(Vec::len)
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

fn ngram_counts<T: Eq + Hash>(tokens: &[T], n: usize) -> HashMap<&[T], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}
