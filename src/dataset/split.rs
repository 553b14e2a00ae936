//! Train/validation split.
//!
//! The CIFAR-100 train partition is divided 80/20 into training and
//! validation index sets. The shuffle is seeded so a given seed always
//! produces the same split.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Fraction of the train partition used for training
pub const TRAIN_FRACTION: f64 = 0.8;

/// Disjoint train/validation index sets over a dataset of `total` samples
#[derive(Debug, Clone)]
pub struct TrainValSplit {
    /// Indices of the training subset
    pub train: Vec<usize>,
    /// Indices of the held-out validation subset
    pub val: Vec<usize>,
}

impl TrainValSplit {
    /// Split `total` indices 80/20 after a seeded shuffle.
    ///
    /// The training set gets `floor(0.8 * total)` samples and validation the
    /// remainder, so the two sets are disjoint and exhaustive.
    pub fn new(total: usize, seed: u64) -> Self {
        let mut indices: Vec<usize> = (0..total).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let train_size = (TRAIN_FRACTION * total as f64) as usize;
        let val = indices.split_off(train_size);

        Self {
            train: indices,
            val,
        }
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn val_len(&self) -> usize {
        self.val.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sizes_sum_to_total() {
        let split = TrainValSplit::new(50_000, 42);
        assert_eq!(split.train_len(), 40_000);
        assert_eq!(split.val_len(), 10_000);
        assert_eq!(split.train_len() + split.val_len(), 50_000);
    }

    #[test]
    fn test_validation_is_remainder() {
        // With a total that does not divide evenly the validation set gets
        // total - floor(0.8 * total) samples.
        let split = TrainValSplit::new(1003, 7);
        assert_eq!(split.train_len(), 802);
        assert_eq!(split.val_len(), 201);
    }

    #[test]
    fn test_sets_are_disjoint_and_exhaustive() {
        let split = TrainValSplit::new(1000, 13);

        let train: HashSet<usize> = split.train.iter().copied().collect();
        let val: HashSet<usize> = split.val.iter().copied().collect();

        assert_eq!(train.len(), split.train_len());
        assert_eq!(val.len(), split.val_len());
        assert!(train.is_disjoint(&val));

        let all: HashSet<usize> = train.union(&val).copied().collect();
        assert_eq!(all.len(), 1000);
        assert!(all.contains(&0));
        assert!(all.contains(&999));
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = TrainValSplit::new(500, 42);
        let b = TrainValSplit::new(500, 42);
        assert_eq!(a.train, b.train);
        assert_eq!(a.val, b.val);
    }

    #[test]
    fn test_different_seed_different_split() {
        let a = TrainValSplit::new(500, 42);
        let b = TrainValSplit::new(500, 43);
        assert_ne!(a.train, b.train);
    }
}
