//! Per-epoch metric accumulation.

/// Loss and accuracy for one finished epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    /// Mean loss over the batches of the epoch
    pub loss: f64,
    /// Classification accuracy as a percentage (0-100)
    pub accuracy: f64,
}

/// Running accumulators for one pass over a partition.
///
/// Tracks the summed batch loss, the number of batches, and the
/// correct/total sample counts. Reset at the start of every epoch and
/// consumed at epoch end.
#[derive(Debug, Clone, Default)]
pub struct EpochAccumulator {
    loss_sum: f64,
    batches: usize,
    correct: usize,
    total: usize,
}

impl EpochAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch: its loss, correct predictions and sample count
    pub fn record_batch(&mut self, loss: f64, correct: usize, samples: usize) {
        self.loss_sum += loss;
        self.batches += 1;
        self.correct += correct;
        self.total += samples;
    }

    /// Mean loss over the recorded batches
    pub fn mean_loss(&self) -> f64 {
        if self.batches > 0 {
            self.loss_sum / self.batches as f64
        } else {
            0.0
        }
    }

    /// Accuracy percentage over the recorded samples
    pub fn accuracy_pct(&self) -> f64 {
        if self.total > 0 {
            100.0 * self.correct as f64 / self.total as f64
        } else {
            0.0
        }
    }

    /// Samples recorded so far
    pub fn samples(&self) -> usize {
        self.total
    }

    /// Consume the accumulators into epoch-level metrics
    pub fn finalize(&self) -> EpochMetrics {
        EpochMetrics {
            loss: self.mean_loss(),
            accuracy: self.accuracy_pct(),
        }
    }

    /// Clear all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulation() {
        let mut acc = EpochAccumulator::new();
        acc.record_batch(1.0, 8, 10);
        acc.record_batch(0.5, 9, 10);

        assert!((acc.mean_loss() - 0.75).abs() < 1e-9);
        assert!((acc.accuracy_pct() - 85.0).abs() < 1e-9);
        assert_eq!(acc.samples(), 20);

        let metrics = acc.finalize();
        assert!((metrics.loss - 0.75).abs() < 1e-9);
        assert!((metrics.accuracy - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_accumulator() {
        let acc = EpochAccumulator::new();
        assert_eq!(acc.mean_loss(), 0.0);
        assert_eq!(acc.accuracy_pct(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut acc = EpochAccumulator::new();
        acc.record_batch(2.0, 5, 10);
        acc.reset();
        assert_eq!(acc.samples(), 0);
        assert_eq!(acc.mean_loss(), 0.0);
    }
}
