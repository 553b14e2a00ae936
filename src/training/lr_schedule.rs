//! Learning rate schedules, stepped once per epoch.

use serde::{Deserialize, Serialize};

/// Schedule type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SchedulerType {
    /// Constant learning rate
    Constant,

    /// Multiply the rate by `gamma` every `step_size` epochs
    StepLr { step_size: usize, gamma: f64 },

    /// Multiply the rate by `gamma` every epoch
    ExponentialLr { gamma: f64 },
}

impl Default for SchedulerType {
    fn default() -> Self {
        Self::StepLr {
            step_size: 30,
            gamma: 0.1,
        }
    }
}

/// Tracks the current learning rate across epochs
#[derive(Debug, Clone)]
pub struct LearningRateScheduler {
    scheduler_type: SchedulerType,
    base_lr: f64,
    current_lr: f64,
    current_epoch: usize,
}

impl LearningRateScheduler {
    pub fn new(scheduler_type: SchedulerType, base_lr: f64) -> Self {
        Self {
            scheduler_type,
            base_lr,
            current_lr: base_lr,
            current_epoch: 0,
        }
    }

    /// Current learning rate
    pub fn get_lr(&self) -> f64 {
        self.current_lr
    }

    /// Advance one epoch
    pub fn step(&mut self) {
        self.current_epoch += 1;

        match self.scheduler_type {
            SchedulerType::Constant => {}

            SchedulerType::StepLr { step_size, gamma } => {
                if step_size > 0 && self.current_epoch % step_size == 0 {
                    self.current_lr *= gamma;
                }
            }

            SchedulerType::ExponentialLr { gamma } => {
                self.current_lr *= gamma;
            }
        }
    }

    pub fn current_epoch(&self) -> usize {
        self.current_epoch
    }

    /// Restore the initial rate
    pub fn reset(&mut self) {
        self.current_lr = self.base_lr;
        self.current_epoch = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let mut scheduler = LearningRateScheduler::new(SchedulerType::Constant, 0.1);
        for _ in 0..10 {
            scheduler.step();
        }
        assert_eq!(scheduler.get_lr(), 0.1);
    }

    #[test]
    fn test_step_decay() {
        let mut scheduler = LearningRateScheduler::new(
            SchedulerType::StepLr {
                step_size: 30,
                gamma: 0.1,
            },
            0.1,
        );

        for _ in 0..29 {
            scheduler.step();
        }
        assert!((scheduler.get_lr() - 0.1).abs() < 1e-12);

        scheduler.step(); // epoch 30
        assert!((scheduler.get_lr() - 0.01).abs() < 1e-12);

        for _ in 0..30 {
            scheduler.step();
        }
        assert!((scheduler.get_lr() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_decay() {
        let mut scheduler =
            LearningRateScheduler::new(SchedulerType::ExponentialLr { gamma: 0.9 }, 1.0);

        scheduler.step();
        assert!((scheduler.get_lr() - 0.9).abs() < 1e-12);
        scheduler.step();
        assert!((scheduler.get_lr() - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_reset() {
        let mut scheduler =
            LearningRateScheduler::new(SchedulerType::ExponentialLr { gamma: 0.5 }, 0.2);
        scheduler.step();
        assert_ne!(scheduler.get_lr(), 0.2);

        scheduler.reset();
        assert_eq!(scheduler.get_lr(), 0.2);
        assert_eq!(scheduler.current_epoch(), 0);
    }
}
