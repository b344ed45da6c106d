// ============================================================
// Layer 4 — Transliteration Dataset
// ============================================================
// Holds the validated records of one split and encodes them
// lazily into index sequences.
//
// Two access modes:
//   get(i)        one reference drawn at random, for training
//   references(i) every reference, for scoring
//
// Encoding cache: record index → encoded source plus the
// encoded target for each mode that has been requested. The
// cache is checked BEFORE the random draw, so the first draw for
// an index wins for the lifetime of the dataset and every epoch
// trains on that same reference. Entries are never evicted.
//
// The cache and the draw RNG sit behind one lock per dataset so
// concurrent loader workers still observe first-draw-wins.

use std::{collections::HashMap, path::Path};

use burn::data::dataset::Dataset;
use parking_lot::Mutex;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::data::loader::load_records;
use crate::domain::error::{Result, TranslitError};
use crate::domain::record::TranslitRecord;
use crate::domain::vocabulary::Vocabulary;

/// One encoded training pair. Both sequences carry `<sos>` / `<eos>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslitSample {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
}

/// An encoded source with every encoded reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSet {
    pub source:     Vec<usize>,
    pub references: Vec<Vec<usize>>,
}

#[derive(Debug, Default)]
struct CacheEntry {
    source: Vec<usize>,
    single: Option<Vec<usize>>,
    full:   Option<Vec<Vec<usize>>>,
}

#[derive(Debug)]
struct EncodingCache {
    entries: HashMap<usize, CacheEntry>,
    rng:     StdRng,
}

pub struct TranslitDataset {
    records:      Vec<TranslitRecord>,
    source_vocab: Vocabulary,
    target_vocab: Vocabulary,
    cache:        Mutex<EncodingCache>,
}

impl TranslitDataset {
    /// Build a dataset from already-loaded records.
    ///
    /// Every record is validated up front: one bad record fails the
    /// whole construction. `seed` drives the reference draws.
    pub fn new(records: Vec<TranslitRecord>, seed: u64) -> Result<Self> {
        if records.is_empty() {
            return Err(TranslitError::Data("dataset is empty".into()));
        }

        let source_vocab = Vocabulary::source();
        let target_vocab = Vocabulary::target();
        for record in &records {
            record.validate(&source_vocab, &target_vocab)?;
        }

        Ok(Self {
            records,
            source_vocab,
            target_vocab,
            cache: Mutex::new(EncodingCache {
                entries: HashMap::new(),
                rng:     StdRng::seed_from_u64(seed),
            }),
        })
    }

    /// Load from a JSON-lines file, optionally subsampled to `max_items`.
    ///
    /// The subsample (without replacement) happens once, here, and is
    /// fixed for the lifetime of the dataset.
    pub fn from_file(path: impl AsRef<Path>, max_items: Option<usize>, seed: u64) -> Result<Self> {
        let path    = path.as_ref();
        let records = subsample(load_records(path)?, max_items, seed);
        tracing::info!("Loaded {} records from '{}'", records.len(), path.display());
        Self::new(records, seed.wrapping_add(1))
    }

    pub fn record(&self, index: usize) -> Option<&TranslitRecord> {
        self.records.get(index)
    }

    pub fn source_vocab(&self) -> &Vocabulary {
        &self.source_vocab
    }

    pub fn target_vocab(&self) -> &Vocabulary {
        &self.target_vocab
    }

    /// Full-reference access: the source and every reference, encoded.
    pub fn references(&self, index: usize) -> Option<ReferenceSet> {
        let mut cache = self.cache.lock();
        let entry = self.entry(&mut cache.entries, index)?;

        if entry.full.is_none() {
            let record = &self.records[index];
            let encoded = record
                .references
                .iter()
                .map(|r| self.target_vocab.encode(r))
                .collect::<Result<Vec<_>>>()
                .ok()?;
            entry.full = Some(encoded);
        }

        Some(ReferenceSet {
            source:     entry.source.clone(),
            references: entry.full.clone()?,
        })
    }

    fn entry<'a>(
        &self,
        entries: &'a mut HashMap<usize, CacheEntry>,
        index: usize,
    ) -> Option<&'a mut CacheEntry> {
        let record = self.records.get(index)?;
        if !entries.contains_key(&index) {
            let source = self.source_vocab.encode(&record.word).ok()?;
            entries.insert(index, CacheEntry { source, ..CacheEntry::default() });
        }
        entries.get_mut(&index)
    }
}

impl Dataset<TranslitSample> for TranslitDataset {
    /// Single-reference access. The cache hit is returned before any
    /// randomness is consulted.
    fn get(&self, index: usize) -> Option<TranslitSample> {
        let mut guard = self.cache.lock();
        let cache = &mut *guard;

        let entry = self.entry(&mut cache.entries, index)?;
        if let Some(target) = &entry.single {
            return Some(TranslitSample { source: entry.source.clone(), target: target.clone() });
        }

        let references = &self.records[index].references;
        let choice = cache.rng.gen_range(0..references.len());
        let target = self.target_vocab.encode(&references[choice]).ok()?;
        entry.single = Some(target.clone());

        Some(TranslitSample { source: entry.source.clone(), target })
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

fn subsample(records: Vec<TranslitRecord>, max_items: Option<usize>, seed: u64) -> Vec<TranslitRecord> {
    match max_items {
        Some(max) if max < records.len() => {
            let mut rng = StdRng::seed_from_u64(seed);
            records.choose_multiple(&mut rng, max).cloned().collect()
        }
        _ => records,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn many_refs() -> Vec<TranslitRecord> {
        vec![
            TranslitRecord::new(
                "data",
                vec!["データ".into(), "デイタ".into(), "ダータ".into(), "デタ".into()],
            ),
            TranslitRecord::new("piano", vec!["ピアノ".into()]),
        ]
    }

    #[test]
    fn test_first_draw_is_cached() {
        let ds = TranslitDataset::new(many_refs(), 0).unwrap();
        let first = ds.get(0).unwrap();
        for _ in 0..20 {
            assert_eq!(ds.get(0).unwrap(), first);
        }
    }

    #[test]
    fn test_draw_is_one_of_the_references() {
        let ds = TranslitDataset::new(many_refs(), 5).unwrap();
        let sample = ds.get(0).unwrap();
        let word = ds.target_vocab().decode_word(&sample.target);
        assert!(ds.record(0).unwrap().references.contains(&word));
        assert_eq!(ds.source_vocab().decode_word(&sample.source), "data");
    }

    #[test]
    fn test_full_mode_returns_every_reference() {
        let ds = TranslitDataset::new(many_refs(), 0).unwrap();
        let set = ds.references(0).unwrap();
        assert_eq!(set.references.len(), 4);
        let decoded: Vec<String> = set
            .references
            .iter()
            .map(|r| ds.target_vocab().decode_word(r))
            .collect();
        assert_eq!(decoded, ds.record(0).unwrap().references);
    }

    #[test]
    fn test_modes_do_not_clobber_each_other() {
        let ds = TranslitDataset::new(many_refs(), 3).unwrap();
        let single = ds.get(0).unwrap();
        assert_eq!(ds.references(0).unwrap().references.len(), 4);
        assert_eq!(ds.get(0).unwrap(), single);
    }

    #[test]
    fn test_out_of_range_is_none() {
        let ds = TranslitDataset::new(many_refs(), 0).unwrap();
        assert!(ds.get(2).is_none());
        assert!(ds.references(2).is_none());
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        assert!(matches!(TranslitDataset::new(vec![], 0), Err(TranslitError::Data(_))));
    }

    #[test]
    fn test_one_bad_record_fails_the_load() {
        let mut records = many_refs();
        records.push(TranslitRecord::new("naïve", vec!["ナイーブ".into()]));
        assert!(matches!(
            TranslitDataset::new(records, 0),
            Err(TranslitError::Encoding { .. })
        ));
    }

    #[test]
    fn test_subsample_is_fixed_by_seed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for word in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            writeln!(file, r#"{{"word": "{word}", "kata": ["ア"]}}"#).unwrap();
        }

        let a = TranslitDataset::from_file(file.path(), Some(3), 11).unwrap();
        let b = TranslitDataset::from_file(file.path(), Some(3), 11).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a.records, b.records);

        let all = TranslitDataset::from_file(file.path(), Some(100), 11).unwrap();
        assert_eq!(all.len(), 8);
    }
}
