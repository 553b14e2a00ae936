//! Early stopping over the validation loss.
//!
//! A monotone patience counter: a validation loss counts as an improvement
//! only when it undercuts the best loss seen so far by more than
//! `min_delta`; every other value increments the counter, and once the
//! counter reaches `tolerance` the stop signal is raised. The signal is
//! advisory; the caller decides whether to actually halt.

use serde::{Deserialize, Serialize};

/// Early stopping parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingConfig {
    /// Consecutive non-improving epochs before the stop signal
    pub tolerance: usize,
    /// Margin a new loss must undercut the best by to count as improvement
    pub min_delta: f64,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self {
            tolerance: 3,
            min_delta: 0.0,
        }
    }
}

/// Patience state: best loss seen and the consecutive non-improvement count
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    tolerance: usize,
    min_delta: f64,
    counter: usize,
    best_loss: f64,
}

impl EarlyStopping {
    pub fn new(config: EarlyStoppingConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            min_delta: config.min_delta,
            counter: 0,
            best_loss: f64::INFINITY,
        }
    }

    /// Feed one validation loss; returns `true` when the stop signal fires.
    ///
    /// Ties and sub-`min_delta` improvements count as non-improving.
    pub fn check(&mut self, validation_loss: f64) -> bool {
        if validation_loss + self.min_delta < self.best_loss {
            self.best_loss = validation_loss;
            self.counter = 0;
        } else {
            self.counter += 1;
            if self.counter >= self.tolerance {
                return true;
            }
        }
        false
    }

    /// Best validation loss observed so far
    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    /// Current consecutive non-improvement count
    pub fn counter(&self) -> usize {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopper(tolerance: usize, min_delta: f64) -> EarlyStopping {
        EarlyStopping::new(EarlyStoppingConfig {
            tolerance,
            min_delta,
        })
    }

    #[test]
    fn test_strictly_decreasing_never_stops() {
        let mut es = stopper(3, 0.0);
        let mut loss = 1.0;
        for _ in 0..100 {
            assert!(!es.check(loss));
            loss *= 0.99;
        }
        assert_eq!(es.counter(), 0);
    }

    #[test]
    fn test_constant_sequence_stops_at_tolerance() {
        let mut es = stopper(4, 0.0);

        assert!(!es.check(0.5)); // establishes the baseline
        assert!(!es.check(0.5)); // 1
        assert!(!es.check(0.5)); // 2
        assert!(!es.check(0.5)); // 3
        assert!(es.check(0.5)); // 4th repeated value raises the signal
    }

    #[test]
    fn test_min_delta_margin_counts_as_non_improving() {
        let mut es = stopper(2, 0.1);

        assert!(!es.check(1.0)); // best = 1.0
        assert!(!es.check(0.95)); // improves by < 0.1, counter = 1
        assert!(es.check(0.92)); // still within the margin, counter = 2
        assert_eq!(es.best_loss(), 1.0);
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut es = stopper(3, 0.0);

        assert!(!es.check(1.0));
        assert!(!es.check(1.1)); // counter = 1
        assert!(!es.check(1.2)); // counter = 2
        assert!(!es.check(0.8)); // improvement, counter = 0
        assert_eq!(es.counter(), 0);
        assert_eq!(es.best_loss(), 0.8);
    }

    #[test]
    fn test_reference_sequence() {
        // [1.0, 0.9, 0.95, 0.95, 0.95] with tolerance 3 stops on the third
        // consecutive non-improvement after the 0.9 baseline.
        let mut es = stopper(3, 0.0);
        let signals: Vec<bool> = [1.0, 0.9, 0.95, 0.95, 0.95]
            .iter()
            .map(|&v| es.check(v))
            .collect();
        assert_eq!(signals, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_signal_is_not_terminal_state() {
        // The caller may ignore the signal; a later improvement still resets.
        let mut es = stopper(1, 0.0);
        assert!(!es.check(1.0));
        assert!(es.check(1.0));
        assert!(!es.check(0.5));
        assert_eq!(es.counter(), 0);
    }
}
