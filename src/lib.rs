//! # CIFAR-100 Challenge
//!
//! Training and evaluation of CIFAR-100 image classifiers with the Burn
//! framework. Three model variants are supported:
//!
//! - **simple**: a hand-written CNN trained with SGD + momentum
//! - **deep**: a deep residual network trained from random initialization
//! - **transfer**: the same deep network initialized from a pretrained
//!   weights record and fine-tuned with AdamW
//!
//! Every run trains on an 80/20 split of the CIFAR-100 train partition,
//! checkpoints the best model by validation accuracy, and can then be
//! evaluated against the clean test partition and an out-of-distribution
//! image directory, producing a `submission_ood.csv` artifact.
//!
//! ## Modules
//!
//! - `dataset`: CIFAR-100 binary loading, splits, batching, augmentation,
//!   OOD directory loading
//! - `model`: the two network architectures behind the `ImageClassifier` seam
//! - `training`: epoch loops, LR scheduling, early stopping, run orchestration
//! - `eval`: checkpoint evaluation and the submission artifact
//! - `tracker`: experiment run directory and metric logging
//! - `utils`: logging and metric accumulators

pub mod backend;
pub mod config;
pub mod dataset;
pub mod eval;
pub mod model;
pub mod tracker;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::RunConfig;
pub use dataset::burn_dataset::{CifarBatch, CifarBatcher, CifarDataset, CifarItem};
pub use dataset::cifar::{Cifar100, CifarImage, DatasetSplit};
pub use dataset::split::TrainValSplit;
pub use model::{ImageClassifier, ModelVariant};
pub use tracker::{EpochRecord, RunTracker};
pub use training::early_stop::{EarlyStopping, EarlyStoppingConfig};
pub use training::run::{run_training, TrainingSummary};

/// Number of fine-grained CIFAR-100 classes
pub const NUM_CLASSES: usize = 100;

/// CIFAR images are 32x32 RGB
pub const IMAGE_SIZE: usize = 32;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
