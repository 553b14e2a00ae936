//! Logging and metric helpers.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, TrainingLogger};
pub use metrics::{EpochAccumulator, EpochMetrics};
