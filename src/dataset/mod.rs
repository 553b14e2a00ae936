//! Dataset loading, splitting, batching and augmentation.
//!
//! - `cifar`: the CIFAR-100 binary release (download + parse)
//! - `split`: seeded 80/20 train/validation index split
//! - `burn_dataset`: Burn `Dataset`/`Batcher` integration
//! - `augmentation`: random transforms for the training path
//! - `ood`: the out-of-distribution image directory

pub mod augmentation;
pub mod burn_dataset;
pub mod cifar;
pub mod ood;
pub mod split;

pub use augmentation::{AugmentationConfig, Augmenter};
pub use burn_dataset::{AugmentingCifarBatcher, CifarBatch, CifarBatcher, CifarDataset, CifarItem};
pub use cifar::{Cifar100, CifarImage, DatasetSplit, FINE_LABEL_NAMES};
pub use ood::{OodDataset, OodSample};
pub use split::TrainValSplit;
