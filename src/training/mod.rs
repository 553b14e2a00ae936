//! Training loops, policies and run orchestration.
//!
//! - `loops`: one-epoch training pass and the validation pass
//! - `early_stop`: patience counter over the validation loss
//! - `lr_schedule`: per-epoch learning rate schedules
//! - `run`: full training runs for the three model variants

pub mod early_stop;
pub mod loops;
pub mod lr_schedule;
pub mod run;

pub use early_stop::{EarlyStopping, EarlyStoppingConfig};
pub use loops::{train_epoch, validate};
pub use lr_schedule::{LearningRateScheduler, SchedulerType};
pub use run::{run_training, TrainingSummary};
