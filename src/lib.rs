// ============================================================
// kana-translit
// ============================================================
// Romanized → katakana transliteration with a recurrent
// attention model. The binary in main.rs is a thin entry
// point over the CLI layer; benches link against this crate.

#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
