// ============================================================
// Layer 3 — TranslitRecord Domain Type
// ============================================================
// One labelled example: a romanized source word and every
// katakana transliteration accepted for it.
//
// Example line in the dataset file:
//   {"word": "kanalizer", "kata": ["カナライザー", "カナライザ"]}

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, TranslitError};
use crate::domain::vocabulary::Vocabulary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslitRecord {
    /// Source word over the romanized alphabet
    pub word: String,

    /// Reference transliterations; never empty once validated
    #[serde(rename = "kata")]
    pub references: Vec<String>,
}

impl TranslitRecord {
    pub fn new(word: impl Into<String>, references: Vec<String>) -> Self {
        Self { word: word.into(), references }
    }

    /// Checks the record against both alphabets.
    ///
    /// An empty word or reference list is a data error; a symbol
    /// outside either table is an encoding error.
    pub fn validate(&self, source: &Vocabulary, target: &Vocabulary) -> Result<()> {
        if self.word.is_empty() {
            return Err(TranslitError::Data("record with an empty source word".into()));
        }
        if self.references.is_empty() {
            return Err(TranslitError::Data(format!(
                "record {:?} has no reference transliterations",
                self.word
            )));
        }
        source.encode(&self.word)?;
        for reference in &self.references {
            if reference.is_empty() {
                return Err(TranslitError::Data(format!(
                    "record {:?} has an empty reference",
                    self.word
                )));
            }
            target.encode(reference)?;
        }
        Ok(())
    }
}
