//! Run configuration.
//!
//! All run parameters live in a single `RunConfig` built once at startup and
//! read-only afterwards. The per-variant constructors reproduce the
//! hyperparameters each model is trained with.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::ModelVariant;
use crate::training::early_stop::EarlyStoppingConfig;
use crate::training::lr_schedule::SchedulerType;

/// Complete configuration for one training/evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Model variant to train
    pub model: ModelVariant,

    /// Batch size for training and evaluation
    pub batch_size: usize,

    /// Initial learning rate
    pub learning_rate: f64,

    /// Number of training epochs
    pub epochs: usize,

    /// Worker threads for per-sample decode work (OOD images)
    pub num_workers: usize,

    /// Root data directory; the CIFAR-100 binaries are downloaded here on demand
    pub data_dir: PathBuf,

    /// Directory holding the out-of-distribution test images
    pub ood_dir: PathBuf,

    /// Best-model checkpoint path (the recorder appends its own extension)
    pub checkpoint_path: PathBuf,

    /// Output path for the OOD submission artifact
    pub submission_path: PathBuf,

    /// Experiment tracker project name
    pub tracker_project: String,

    /// Optional HTTP endpoint to mirror tracker records to
    pub tracker_endpoint: Option<String>,

    /// Random seed for splits, shuffling and augmentation
    pub seed: u64,

    /// Apply random augmentation on the training path
    pub augmentation: bool,

    /// Early stopping policy; `None` disables it
    pub early_stopping: Option<EarlyStoppingConfig>,

    /// Learning rate schedule, stepped once per epoch
    pub lr_schedule: SchedulerType,

    /// Weight decay for optimizers that use it
    pub weight_decay: f64,

    /// Pretrained weights record for the transfer variant
    pub pretrained_path: Option<PathBuf>,
}

impl RunConfig {
    /// Preset for the hand-written CNN: SGD with momentum 0.9, lr 0.1
    pub fn simple() -> Self {
        Self {
            model: ModelVariant::Simple,
            batch_size: 512,
            learning_rate: 0.1,
            epochs: 5,
            augmentation: false,
            early_stopping: None,
            ..Self::base()
        }
    }

    /// Preset for the deep network trained from scratch: SGD, lr 0.2
    pub fn deep() -> Self {
        Self {
            model: ModelVariant::Deep,
            batch_size: 512,
            learning_rate: 0.2,
            epochs: 5,
            augmentation: true,
            early_stopping: None,
            ..Self::base()
        }
    }

    /// Preset for fine-tuning pretrained weights: AdamW, lr 1e-3, early stopping
    pub fn transfer() -> Self {
        Self {
            model: ModelVariant::Transfer,
            batch_size: 512,
            learning_rate: 0.001,
            epochs: 50,
            augmentation: true,
            early_stopping: Some(EarlyStoppingConfig {
                tolerance: 5,
                min_delta: 0.0,
            }),
            ..Self::base()
        }
    }

    /// Preset for a given variant
    pub fn for_variant(variant: ModelVariant) -> Self {
        match variant {
            ModelVariant::Simple => Self::simple(),
            ModelVariant::Deep => Self::deep(),
            ModelVariant::Transfer => Self::transfer(),
        }
    }

    fn base() -> Self {
        Self {
            model: ModelVariant::Simple,
            batch_size: 512,
            learning_rate: 0.1,
            epochs: 5,
            num_workers: 4,
            data_dir: PathBuf::from("data"),
            ood_dir: PathBuf::from("data/ood-test"),
            checkpoint_path: PathBuf::from("output/best_model"),
            submission_path: PathBuf::from("submission_ood.csv"),
            tracker_project: "cifar100-challenge".to_string(),
            tracker_endpoint: None,
            seed: 42,
            augmentation: false,
            early_stopping: None,
            lr_schedule: SchedulerType::StepLr {
                step_size: 30,
                gamma: 0.1,
            },
            weight_decay: 1e-4,
            pretrained_path: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be greater than 0");
        }
        if self.epochs == 0 {
            anyhow::bail!("epochs must be greater than 0");
        }
        if self.learning_rate <= 0.0 {
            anyhow::bail!("learning_rate must be positive");
        }
        if self.num_workers == 0 {
            anyhow::bail!("num_workers must be at least 1");
        }
        if self.model == ModelVariant::Transfer && self.pretrained_path.is_none() {
            anyhow::bail!("the transfer variant requires --pretrained <record file>");
        }
        Ok(())
    }

    /// Pretty-print the configuration to the console
    pub fn print(&self) {
        println!("\nRun configuration:");
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{:?}", self),
        }
        println!();
    }
}
