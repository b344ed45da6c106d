// ============================================================
// Layer 5 — Converter
// ============================================================
// Loads a trained snapshot and turns romanized words into
// katakana with greedy decoding.
//
//   convert("kanalizer", 16) → "カナライザー"

use std::path::Path;

use anyhow::Result;
use burn::prelude::*;
use thiserror::Error;

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::TranslitError;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::load_model;
use crate::ml::model::{TranslitModel, TranslitModelConfig, MAX_GENERATION_STEPS};

/// Default and upper bound for `max_length`.
pub const DEFAULT_MAX_LENGTH: usize = MAX_GENERATION_STEPS;

// One content symbol plus the end marker
const MIN_MAX_LENGTH: usize = 2;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("input is empty")]
    EmptyInput,

    #[error("max_length must be at least {MIN_MAX_LENGTH}, got {max_length}")]
    MaxLengthTooSmall { max_length: usize },

    #[error(transparent)]
    Encoding(#[from] TranslitError),

    #[error(transparent)]
    Model(#[from] anyhow::Error),
}

/// Converted word plus whether decoding reached `<eos>`.
///
/// `text` holds content symbols only. It is empty when every generated
/// symbol was a reserved marker (`<pad>` or `<sos>`), which greedy decoding
/// does not rule out; the first symbol is never `<eos>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOutput {
    pub text:     String,
    pub complete: bool,
}

pub struct Converter<B: Backend> {
    model:        TranslitModel<B>,
    source_vocab: Vocabulary,
    target_vocab: Vocabulary,
    device:       B::Device,
}

impl<B: Backend> Converter<B> {
    pub fn new(model: TranslitModel<B>, device: B::Device) -> Self {
        Self {
            model,
            source_vocab: Vocabulary::source(),
            target_vocab: Vocabulary::target(),
            device,
        }
    }

    /// Rebuild the model shape from `config` and load `checkpoint` into it.
    pub fn from_checkpoint(config: &TrainConfig, checkpoint: &Path, device: B::Device) -> Result<Self> {
        let model_cfg = TranslitModelConfig::new(
            Vocabulary::source().len(),
            Vocabulary::target().len(),
            config.dim,
        );
        let model = load_model(model_cfg.init::<B>(&device), checkpoint, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, device))
    }

    /// Transliterate `word`, generating at most `min(max_length, 16)` symbols
    /// (end marker included).
    pub fn convert(&self, word: &str, max_length: usize) -> Result<ConvertOutput, ConvertError> {
        if word.is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        if max_length < MIN_MAX_LENGTH {
            return Err(ConvertError::MaxLengthTooSmall { max_length });
        }

        let source = self.source_vocab.encode(word)?;
        let budget = max_length.min(MAX_GENERATION_STEPS);
        let generation = self.model.generate(&source, budget, &self.device)?;

        let text = self.target_vocab.decode_word(&generation.indices);
        tracing::debug!("{} -> {} (complete: {})", word, text, generation.finished);

        Ok(ConvertOutput { text, complete: generation.finished })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn converter() -> Converter<NdArray> {
        let device = Default::default();
        let model = TranslitModelConfig::new(Vocabulary::source().len(), Vocabulary::target().len(), 8)
            .init::<NdArray>(&device);
        Converter::new(model, device)
    }

    #[test]
    fn test_output_is_katakana() {
        let conversion = converter().convert("kanalizer", DEFAULT_MAX_LENGTH).unwrap();
        let target = Vocabulary::target();
        assert!(conversion.text.chars().all(|c| target.contains(c)));
        assert!(conversion.text.chars().count() <= DEFAULT_MAX_LENGTH);
    }

    #[test]
    fn test_conversion_is_non_empty() {
        let device = Default::default();
        let mut model = TranslitModelConfig::new(Vocabulary::source().len(), Vocabulary::target().len(), 8)
            .init::<NdArray>(&device);

        // Favour one content symbol, then the end marker
        let target = Vocabulary::target();
        let mut bias = vec![0.0f32; target.len()];
        bias[crate::domain::vocabulary::EOS_INDEX] = 1e4;
        bias[5] = 1e3;
        model.output.bias = Some(burn::module::Param::from_tensor(
            Tensor::<NdArray, 1>::from_floats(bias.as_slice(), &device),
        ));

        let output = Converter::new(model, device).convert("kanalizer", DEFAULT_MAX_LENGTH).unwrap();
        assert!(!output.text.is_empty());
        assert_eq!(output.text, target.decode_word(&[5]));
        assert!(output.complete);
    }

    #[test]
    fn test_zero_max_length_fails() {
        assert!(matches!(
            converter().convert("kanalizer", 0),
            Err(ConvertError::MaxLengthTooSmall { max_length: 0 })
        ));
        assert!(converter().convert("kanalizer", 1).is_err());
    }

    #[test]
    fn test_empty_word_fails() {
        assert!(matches!(converter().convert("", DEFAULT_MAX_LENGTH), Err(ConvertError::EmptyInput)));
    }

    #[test]
    fn test_invalid_chars_fail() {
        match converter().convert("あ", DEFAULT_MAX_LENGTH) {
            Err(ConvertError::Encoding(TranslitError::Encoding { chars, .. })) => {
                assert_eq!(chars, vec!['あ'])
            }
            other => panic!("expected encoding error, got {other:?}"),
        }
    }

    #[test]
    fn test_loaded_snapshot_converts() {
        use crate::infra::checkpoint::{CheckpointManager, CompareMode, ModelSnapshot};

        let device = Default::default();
        let model = TranslitModelConfig::new(Vocabulary::source().len(), Vocabulary::target().len(), 8)
            .init::<NdArray>(&device);
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = CheckpointManager::new("latest", dir.path(), 1, CompareMode::Max).unwrap();
        mgr.update(1, 1.0, &ModelSnapshot(&model)).unwrap();

        let config = TrainConfig { dim: 8, ..TrainConfig::default() };
        let in_memory = Converter::new(model, device);
        let loaded = Converter::<NdArray>::from_checkpoint(
            &config,
            &dir.path().join("model-latest-e1.mpk"),
            Default::default(),
        )
        .unwrap();

        // Half-precision storage can nudge near-ties, so compare shape only
        let a = in_memory.convert("piano", DEFAULT_MAX_LENGTH).unwrap();
        let b = loaded.convert("piano", DEFAULT_MAX_LENGTH).unwrap();
        assert!(a.text.chars().count() <= DEFAULT_MAX_LENGTH);
        assert!(b.text.chars().count() <= DEFAULT_MAX_LENGTH);
    }
}
