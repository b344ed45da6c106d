// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Keeps at most K snapshots per label on disk, choosing which to
// keep by score.
//
//   label      "latest", "best-bleu", "best-loss", ...
//   mode       Max keeps the highest scores, Min the lowest
//   capacity   K, may be 0 (nothing is ever written)
//
// File naming: {dir}/model-{label}-e{epoch}.{ext}
// Re-running an epoch overwrites the same file.
//
// Entries live in an insertion-ordered Vec. The worst entry is
// found by one linear scan; on equal scores the first entry
// scanned (earliest inserted) is the worst, and the candidate is
// always scanned last.
//
// A snapshot is written before the worst entry is evicted, so the
// directory briefly holds K + 1 files for this label. In-memory
// state only changes after the matching disk operation succeeds.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use thiserror::Error;

use crate::domain::traits::Snapshot;
use crate::ml::model::TranslitModel;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("cannot write snapshot '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("cannot delete snapshot '{}': {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint directory is locked by another run: '{}'", path.display())]
    Locked { path: PathBuf },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Higher scores are better
    Max,
    /// Lower scores are better
    Min,
}

impl CompareMode {
    /// True if `a` is strictly worse than `b`.
    fn is_worse(self, a: f64, b: f64) -> bool {
        match self {
            CompareMode::Max => a < b,
            CompareMode::Min => a > b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    epoch: usize,
    score: f64,
    path:  PathBuf,
}

#[derive(Debug)]
pub struct CheckpointManager {
    label:    String,
    dir:      PathBuf,
    capacity: usize,
    mode:     CompareMode,
    entries:  Vec<Entry>,
}

impl CheckpointManager {
    /// Create a manager writing into `dir` (created if missing).
    pub fn new(
        label:    impl Into<String>,
        dir:      impl Into<PathBuf>,
        capacity: usize,
        mode:     CompareMode,
    ) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CheckpointError::Io { path: dir.clone(), source })?;
        Ok(Self { label: label.into(), dir, capacity, mode, entries: Vec::new() })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Retained (epoch, score) pairs in insertion order.
    pub fn entries(&self) -> Vec<(usize, f64)> {
        self.entries.iter().map(|e| (e.epoch, e.score)).collect()
    }

    /// Path of the retained snapshot for `epoch`, if any.
    pub fn snapshot_path(&self, epoch: usize) -> Option<&Path> {
        self.entries.iter().find(|e| e.epoch == epoch).map(|e| e.path.as_path())
    }

    fn stem_for(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model-{}-e{}", self.label, epoch))
    }

    /// Offer the snapshot for `epoch` with `score`.
    ///
    /// The snapshot is written unless the manager is already full and the
    /// candidate itself would be the one evicted. Afterwards, if more than
    /// `capacity` entries are held, the worst is deleted from disk and
    /// forgotten.
    pub fn update<S: Snapshot + ?Sized>(
        &mut self,
        epoch:    usize,
        score:    f64,
        snapshot: &S,
    ) -> Result<(), CheckpointError> {
        let stem = self.stem_for(epoch);
        let path = stem.with_file_name(format!(
            "model-{}-e{}.{}",
            self.label,
            epoch,
            snapshot.extension()
        ));

        let mut candidates = self.entries.clone();
        match candidates.iter_mut().find(|e| e.epoch == epoch) {
            Some(existing) => existing.score = score,
            None => candidates.push(Entry { epoch, score, path: path.clone() }),
        }
        let worst = self.worst(&candidates);

        if self.entries.len() < self.capacity || worst != Some(epoch) {
            snapshot
                .save(&stem)
                .map_err(|e| CheckpointError::Write { path: path.clone(), source: e.into() })?;
            self.entries = candidates;
            tracing::debug!("[{}] saved epoch {} (score {})", self.label, epoch, score);
        }

        if self.entries.len() > self.capacity {
            if let Some(evicted) = worst {
                self.evict(evicted)?;
            }
        }

        Ok(())
    }

    /// Linear scan; the first strictly-worst entry wins.
    fn worst(&self, entries: &[Entry]) -> Option<usize> {
        let mut worst: Option<&Entry> = None;
        for entry in entries {
            match worst {
                Some(w) if !self.mode.is_worse(entry.score, w.score) => {}
                _ => worst = Some(entry),
            }
        }
        worst.map(|e| e.epoch)
    }

    fn evict(&mut self, epoch: usize) -> Result<(), CheckpointError> {
        let Some(pos) = self.entries.iter().position(|e| e.epoch == epoch) else {
            return Ok(());
        };
        let path = self.entries[pos].path.clone();
        fs::remove_file(&path).map_err(|source| CheckpointError::Delete { path: path.clone(), source })?;
        self.entries.remove(pos);
        tracing::debug!("[{}] evicted epoch {}", self.label, epoch);
        Ok(())
    }
}

// ─── Model snapshots ──────────────────────────────────────────────────────────
// Burn's CompactRecorder stores the model record as named
// MessagePack with half-precision floats. The recorder appends its
// own extension to the stem it is given; the manager must name the
// same file.

/// Extension `CompactRecorder` appends, without the leading dot.
pub fn snapshot_extension<B: Backend>() -> &'static str {
    <CompactRecorder as FileRecorder<B>>::file_extension()
}

/// Borrowed model, written with `CompactRecorder`.
pub struct ModelSnapshot<'a, B: Backend>(pub &'a TranslitModel<B>);

impl<B: Backend> Snapshot for ModelSnapshot<'_, B> {
    fn extension(&self) -> &'static str {
        snapshot_extension::<B>()
    }

    fn save(&self, stem: &Path) -> anyhow::Result<()> {
        CompactRecorder::new()
            .record(self.0.clone().into_record(), stem.to_path_buf())
            .with_context(|| format!("recording model to '{}'", stem.display()))
    }
}

/// Load weights into `model` from a snapshot written by [`ModelSnapshot`].
///
/// `path` may be given with or without the recorder's extension.
pub fn load_model<B: Backend>(
    model:  TranslitModel<B>,
    path:   &Path,
    device: &B::Device,
) -> anyhow::Result<TranslitModel<B>> {
    let stem = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => match name.strip_suffix(&format!(".{}", snapshot_extension::<B>())) {
            Some(stem) => path.with_file_name(stem),
            None => path.to_path_buf(),
        },
        None => path.to_path_buf(),
    };

    let record = CompactRecorder::new()
        .load(stem.clone(), device)
        .with_context(|| format!("cannot load snapshot '{}'", stem.display()))?;
    tracing::info!("Loaded snapshot '{}'", path.display());
    Ok(model.load_record(record))
}
