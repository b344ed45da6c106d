// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The checkpoint manager decides WHEN and WHERE a snapshot is
// written; implementors of `Snapshot` decide HOW.
//
// Implementations:
//   - ModelSnapshot → burn CompactRecorder (.mpk)
//   - test doubles  → plain files

use std::path::Path;

// ─── Snapshot ─────────────────────────────────────────────────────────────────
/// Anything whose current state can be written to disk as one file.
pub trait Snapshot {
    /// Extension of the file produced by [`save`](Snapshot::save),
    /// without the leading dot (e.g. `"mpk"`).
    fn extension(&self) -> &'static str;

    /// Write the snapshot. `stem` is the target path without extension;
    /// the written file must be `stem` + `.` + [`extension`](Snapshot::extension).
    fn save(&self, stem: &Path) -> anyhow::Result<()>;
}
