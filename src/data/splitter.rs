// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles records with a seeded RNG and splits them into
// (train, test). The same seed always yields the same split.
//
// Split ratio: `test_ratio` of the records go to the test set,
// the training set gets round(n * (1 - test_ratio)).

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` and split into (train, test).
///
/// # Arguments
/// * `samples`    - All available samples (consumed by this function)
/// * `test_ratio` - Proportion for the test set, in `[0, 1)`
/// * `seed`       - Seed for the shuffle
pub fn split_train_test<T>(mut samples: Vec<T>, test_ratio: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * (1.0 - test_ratio)).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..total)
    let test = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} train, {} test (seed {})",
        samples.len(),
        test.len(),
        seed,
    );

    (samples, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test)     = split_train_test(items, 0.2, 0);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, test)     = split_train_test(items, 0.3, 7);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_test((0..40).collect::<Vec<usize>>(), 0.25, 42);
        let b = split_train_test((0..40).collect::<Vec<usize>>(), 0.25, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_ratio_keeps_everything_for_training() {
        let items: Vec<usize> = (0..10).collect();
        let (train, test)     = split_train_test(items, 0.0, 1);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }

    #[test]
    fn test_empty_dataset() {
        let (train, test) = split_train_test(Vec::<usize>::new(), 0.5, 3);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }
}
