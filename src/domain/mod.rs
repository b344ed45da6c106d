// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that define what the system works with:
// symbol tables, labelled records, the error taxonomy, and the
// persistence seam used by the checkpoint manager.
//
// Nothing in here touches burn or the filesystem.

// Source and target symbol tables with start/end markers
pub mod vocabulary;

// One labelled (word, references) record
pub mod record;

// Error taxonomy shared across layers
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
