// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model math lives here, generic over a burn Backend.
//
//   model.rs      — bidirectional GRU encoder, attention decoder,
//                   masked cross-entropy, greedy generation
//   trainer.rs    — epoch loop: Adam steps, evaluation, metric
//                   reporting, checkpoint retention
//   evaluator.rs  — weighted mean loss and corpus BLEU of
//                   greedy decodes against full reference sets
//   bleu.rs       — corpus BLEU over symbol sequences
//   inferencer.rs — Converter: snapshot → katakana for one word
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Bahdanau et al. (2015) Neural Machine Translation by
//            Jointly Learning to Align and Translate

/// Encoder-decoder transliteration model
pub mod model;

/// Full training loop with evaluation and checkpointing
pub mod trainer;

/// Loss and BLEU evaluation over a dataset
pub mod evaluator;

/// Corpus-level BLEU
pub mod bleu;

/// Converter — loads a snapshot and transliterates words
pub mod inferencer;
