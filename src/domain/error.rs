// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure in the core falls into one of four kinds.
// None of them is recovered locally: they propagate to the
// CLI and terminate the run with a non-zero status.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranslitError {
    /// Required field missing after migration, or a value out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A word contains symbols outside the fixed vocabulary.
    #[error("word {word:?} contains symbols outside the vocabulary: {chars:?}")]
    Encoding { word: String, chars: Vec<char> },

    /// Empty dataset, empty word, or a record without references.
    #[error("invalid data: {0}")]
    Data(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TranslitError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, TranslitError>;
