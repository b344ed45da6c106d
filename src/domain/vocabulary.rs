// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Two fixed, ordered symbol tables:
//   source: lowercase latin letters (romanized input)
//   target: katakana
//
// Both share the same reserved prefix:
//   0 = <pad>   never a content symbol
//   1 = <sos>   prefixed to every encoded sequence
//   2 = <eos>   appended to every encoded sequence
//
// Content symbols start at index 3 in table order.

use std::collections::HashMap;

use crate::domain::error::{Result, TranslitError};

pub const PAD_INDEX: usize = 0;
pub const SOS_INDEX: usize = 1;
pub const EOS_INDEX: usize = 2;

const PAD_SYMBOL: &str = "<pad>";
const SOS_SYMBOL: &str = "<sos>";
const EOS_SYMBOL: &str = "<eos>";
const UNKNOWN_SYMBOL: &str = "<unk>";

const RESERVED: [&str; 3] = [PAD_SYMBOL, SOS_SYMBOL, EOS_SYMBOL];

/// Bidirectional symbol <-> index table for one alphabet.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    symbols: Vec<String>,
    index:   HashMap<char, usize>,
}

impl Vocabulary {
    fn from_chars(chars: impl IntoIterator<Item = char>) -> Self {
        let mut symbols: Vec<String> = RESERVED.iter().map(|s| s.to_string()).collect();
        let mut index = HashMap::new();
        for c in chars {
            index.insert(c, symbols.len());
            symbols.push(c.to_string());
        }
        Self { symbols, index }
    }

    /// Romanized input alphabet: `a` through `z`.
    pub fn source() -> Self {
        Self::from_chars('a'..='z')
    }

    /// Katakana output alphabet: `ァ` (U+30A1) through `ヶ` (U+30F6),
    /// followed by the prolonged sound mark `ー`.
    pub fn target() -> Self {
        Self::from_chars(('\u{30A1}'..='\u{30F6}').chain(std::iter::once('\u{30FC}')))
    }

    /// Number of entries including the three reserved symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn contains(&self, c: char) -> bool {
        self.index.contains_key(&c)
    }

    /// `[<sos>, w_0, ..., w_n, <eos>]`.
    ///
    /// Fails if any character is absent from the table; the error lists
    /// every offending character, in order of first appearance.
    pub fn encode(&self, word: &str) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(word.chars().count() + 2);
        let mut unknown: Vec<char> = Vec::new();

        indices.push(SOS_INDEX);
        for c in word.chars() {
            match self.index.get(&c) {
                Some(&i) => indices.push(i),
                None if !unknown.contains(&c) => unknown.push(c),
                None => {}
            }
        }
        indices.push(EOS_INDEX);

        if unknown.is_empty() {
            Ok(indices)
        } else {
            Err(TranslitError::Encoding { word: word.to_string(), chars: unknown })
        }
    }

    /// Inverse lookup. Reserved markers come back as literal symbols
    /// (`<sos>`, `<eos>`, `<pad>`).
    pub fn decode(&self, indices: &[usize]) -> Vec<&str> {
        indices
            .iter()
            .map(|&i| self.symbols.get(i).map(String::as_str).unwrap_or(UNKNOWN_SYMBOL))
            .collect()
    }

    /// Like [`decode`](Self::decode) but drops reserved markers and joins
    /// the content symbols into a word.
    pub fn decode_word(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .filter(|&&i| i > EOS_INDEX)
            .filter_map(|&i| self.symbols.get(i))
            .map(String::as_str)
            .collect()
    }
}
