//! Full training runs.
//!
//! Wires the pieces together for one run: dataset download and split, model
//! and optimizer construction per variant, the epoch loop with scheduling,
//! tracker logging, best-model checkpointing and early stopping.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::{AutodiffModule, Module},
    optim::{momentum::MomentumConfig, AdamWConfig, Optimizer, SgdConfig},
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RunConfig;
use crate::dataset::augmentation::Augmenter;
use crate::dataset::burn_dataset::{
    AugmentingCifarBatcher, CifarBatch, CifarBatcher, CifarDataset, CifarItem,
};
use crate::dataset::cifar::{Cifar100, DatasetSplit};
use crate::dataset::split::TrainValSplit;
use crate::model::{
    DeepCnn, DeepCnnConfig, ImageClassifier, ModelVariant, SimpleCnn, SimpleCnnConfig,
};
use crate::tracker::{EpochRecord, RunTracker};
use crate::training::early_stop::EarlyStopping;
use crate::training::loops::{train_epoch, validate};
use crate::training::lr_schedule::LearningRateScheduler;
use crate::utils::logging::TrainingLogger;

/// Root directory for tracker run directories
const TRACKER_ROOT: &str = "output/runs";

/// Outcome of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Best validation accuracy (percent) seen across epochs
    pub best_val_accuracy: f64,
    /// Validation loss at the best-accuracy epoch
    pub best_val_loss: f64,
    /// Number of epochs actually run
    pub epochs_run: usize,
    /// Whether early stopping cut the run short
    pub stopped_early: bool,
    /// Checkpoint file holding the best parameters
    pub checkpoint_file: PathBuf,
}

/// Best-model tracking for the checkpoint gate.
///
/// `update` reports whether the new epoch strictly improved the best
/// validation accuracy; the checkpoint is overwritten exactly then.
#[derive(Debug, Clone)]
pub struct BestModel {
    pub accuracy: f64,
    pub loss: f64,
}

impl Default for BestModel {
    fn default() -> Self {
        Self {
            accuracy: 0.0,
            loss: f64::INFINITY,
        }
    }
}

impl BestModel {
    pub fn update(&mut self, val_accuracy: f64, val_loss: f64) -> bool {
        if val_accuracy > self.accuracy {
            self.accuracy = val_accuracy;
            self.loss = val_loss;
            true
        } else {
            false
        }
    }
}

/// Train the configured model variant and checkpoint the best parameters.
pub fn run_training<B: AutodiffBackend>(config: &RunConfig) -> Result<TrainingSummary> {
    config.validate()?;

    let device = B::Device::default();
    B::seed(config.seed);

    info!("Loading CIFAR-100 train partition");
    let partition = Cifar100::load_or_download(&config.data_dir, DatasetSplit::Train)?;
    info!("Loaded {} training images", partition.len());

    let split = TrainValSplit::new(partition.len(), config.seed);
    info!(
        "Split: {} train / {} validation",
        split.train_len(),
        split.val_len()
    );

    let images = Arc::new(partition.images);
    let train_dataset = CifarDataset::subset(images.clone(), split.train);
    let val_dataset = CifarDataset::subset(images, split.val);

    let mut tracker = RunTracker::init(
        TRACKER_ROOT,
        &config.tracker_project,
        config,
        config.tracker_endpoint.clone(),
    )?;
    tracker.watch(config.model.name())?;

    let summary = match config.model {
        ModelVariant::Simple => {
            let model = SimpleCnn::<B>::new(&SimpleCnnConfig::new(), &device);
            let optimizer = SgdConfig::new()
                .with_momentum(Some(MomentumConfig::new()))
                .init();
            dispatch(model, optimizer, config, &train_dataset, &val_dataset, &mut tracker, &device)
        }
        ModelVariant::Deep => {
            let model = DeepCnn::<B>::new(&DeepCnnConfig::new(), &device);
            let optimizer = SgdConfig::new().init();
            dispatch(model, optimizer, config, &train_dataset, &val_dataset, &mut tracker, &device)
        }
        ModelVariant::Transfer => {
            let pretrained = config
                .pretrained_path
                .as_ref()
                .context("transfer variant requires a pretrained weights path")?;
            let model = DeepCnn::<B>::load_from_file(&DeepCnnConfig::new(), pretrained, &device)
                .map_err(|e| {
                    anyhow::anyhow!("failed to load pretrained weights {:?}: {e}", pretrained)
                })?;
            let optimizer = AdamWConfig::new()
                .with_weight_decay(config.weight_decay as f32)
                .init();
            dispatch(model, optimizer, config, &train_dataset, &val_dataset, &mut tracker, &device)
        }
    }?;

    tracker.finish()?;
    Ok(summary)
}

/// Select the training batcher (augmenting or deterministic) and run `fit`
#[allow(clippy::too_many_arguments)]
fn dispatch<B, M, O>(
    model: M,
    optimizer: O,
    config: &RunConfig,
    train_dataset: &CifarDataset,
    val_dataset: &CifarDataset,
    tracker: &mut RunTracker,
    device: &B::Device,
) -> Result<TrainingSummary>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    if config.augmentation {
        let batcher = AugmentingCifarBatcher::<B>::new(device.clone(), Augmenter::with_defaults());
        fit(model, optimizer, batcher, config, train_dataset, val_dataset, tracker, device)
    } else {
        let batcher = CifarBatcher::<B>::new(device.clone());
        fit(model, optimizer, batcher, config, train_dataset, val_dataset, tracker, device)
    }
}

/// The epoch loop shared by every variant
#[allow(clippy::too_many_arguments)]
fn fit<B, M, O, BT>(
    mut model: M,
    mut optimizer: O,
    train_batcher: BT,
    config: &RunConfig,
    train_dataset: &CifarDataset,
    val_dataset: &CifarDataset,
    tracker: &mut RunTracker,
    device: &B::Device,
) -> Result<TrainingSummary>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
    BT: Batcher<B, CifarItem, CifarBatch<B>>,
{
    let val_batcher = CifarBatcher::<B::InnerBackend>::new(device.clone());
    let mut scheduler = LearningRateScheduler::new(config.lr_schedule, config.learning_rate);
    let mut early_stopping = config.early_stopping.map(EarlyStopping::new);
    let mut logger = TrainingLogger::new(config.epochs);
    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);

    if let Some(parent) = config.checkpoint_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create checkpoint directory {:?}", parent))?;
    }
    // CompactRecorder writes MessagePack with this extension.
    let checkpoint_file = config.checkpoint_path.with_extension("mpk");

    let mut best = BestModel::default();
    let mut epochs_run = 0;
    let mut stopped_early = false;

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);

        let mut order: Vec<usize> = (0..train_dataset.len()).collect();
        order.shuffle(&mut epoch_rng);

        let lr = scheduler.get_lr();
        let (updated, train_metrics) = train_epoch(
            epoch,
            config.epochs,
            model,
            &mut optimizer,
            train_dataset,
            &order,
            &train_batcher,
            config.batch_size,
            lr,
            device,
        );
        model = updated;

        let val_metrics = validate(&model, val_dataset, &val_batcher, config.batch_size, device);
        scheduler.step();
        epochs_run = epoch + 1;

        tracker.log_epoch(&EpochRecord {
            epoch: epoch + 1,
            train_loss: train_metrics.loss,
            train_acc: train_metrics.accuracy,
            val_loss: val_metrics.loss,
            val_acc: val_metrics.accuracy,
            lr,
        })?;
        logger.end_epoch(
            train_metrics.loss,
            train_metrics.accuracy,
            val_metrics.loss,
            val_metrics.accuracy,
            lr,
        );

        // Best model by validation accuracy, strictly improved
        if best.update(val_metrics.accuracy, val_metrics.loss) {
            model
                .clone()
                .save_file(&config.checkpoint_path, &CompactRecorder::new())
                .map_err(|e| anyhow::anyhow!("failed to save checkpoint: {e}"))?;
            tracker.save_artifact(&checkpoint_file)?;
            logger.log_new_best(best.accuracy);
        }

        if let Some(es) = early_stopping.as_mut() {
            if es.check(val_metrics.loss) {
                if let Some(es_config) = config.early_stopping {
                    logger.log_early_stop(es_config.tolerance);
                }
                stopped_early = true;
                break;
            }
        }
    }

    logger.log_complete(best.accuracy);

    Ok(TrainingSummary {
        best_val_accuracy: best.accuracy,
        best_val_loss: best.loss,
        epochs_run,
        stopped_early,
        checkpoint_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrainingBackend;
    use crate::dataset::cifar::CifarImage;
    use crate::training::lr_schedule::SchedulerType;
    use std::sync::Arc;

    fn tiny_dataset(n: usize) -> CifarDataset {
        let images: Vec<CifarImage> = (0..n)
            .map(|i| CifarImage::new(vec![(i * 31 % 251) as u8; 3 * 32 * 32], i % 100))
            .collect();
        CifarDataset::full(Arc::new(images))
    }

    #[test]
    fn test_best_model_gate_is_strict() {
        let mut best = BestModel::default();

        assert!(best.update(10.0, 2.0)); // first improvement
        assert!(!best.update(10.0, 1.0)); // equal accuracy does not overwrite
        assert_eq!(best.loss, 2.0);
        assert!(!best.update(9.0, 0.5)); // worse accuracy does not overwrite
        assert!(best.update(10.5, 1.5)); // strictly greater does
        assert_eq!(best.accuracy, 10.5);
        assert_eq!(best.loss, 1.5);
    }

    #[test]
    fn test_best_model_starts_at_zero() {
        let mut best = BestModel::default();
        // A 0% validation accuracy never overwrites the initial state.
        assert!(!best.update(0.0, 1.0));
        assert_eq!(best.accuracy, 0.0);
        assert!(best.loss.is_infinite());
    }

    #[test]
    fn test_fit_checkpoints_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();

        let config = RunConfig {
            epochs: 2,
            batch_size: 4,
            learning_rate: 0.01,
            checkpoint_path: dir.path().join("best_model"),
            lr_schedule: SchedulerType::Constant,
            augmentation: false,
            early_stopping: None,
            ..RunConfig::simple()
        };

        let model_config = DeepCnnConfig::new()
            .with_base_filters(4)
            .with_blocks_per_stage(1);
        let model = DeepCnn::<TrainingBackend>::new(&model_config, &device);
        let optimizer = SgdConfig::new().init();

        let train = tiny_dataset(8);
        let val = tiny_dataset(4);

        let mut tracker =
            RunTracker::init(dir.path().join("runs"), "test", &config, None).unwrap();

        let summary = fit(
            model,
            optimizer,
            CifarBatcher::<TrainingBackend>::new(device),
            &config,
            &train,
            &val,
            &mut tracker,
            &Default::default(),
        )
        .unwrap();

        assert_eq!(summary.epochs_run, 2);
        assert!(!summary.stopped_early);
        // With 100 classes and 4 validation samples accuracy is almost
        // certainly nonzero at least once; the checkpoint exists whenever
        // any epoch improved on the initial 0%.
        if summary.best_val_accuracy > 0.0 {
            assert!(summary.checkpoint_file.exists());
        }

        let records = crate::tracker::read_metrics(tracker.run_dir()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].epoch, 1);
    }

    #[test]
    fn test_fit_early_stop_bounds_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();

        let config = RunConfig {
            epochs: 10,
            batch_size: 4,
            learning_rate: 0.01,
            checkpoint_path: dir.path().join("best_model"),
            lr_schedule: SchedulerType::Constant,
            augmentation: false,
            early_stopping: Some(crate::training::early_stop::EarlyStoppingConfig {
                tolerance: 1,
                min_delta: f64::INFINITY,
            }),
            ..RunConfig::simple()
        };

        let model_config = DeepCnnConfig::new()
            .with_base_filters(4)
            .with_blocks_per_stage(1);
        let model = DeepCnn::<TrainingBackend>::new(&model_config, &device);
        let optimizer = SgdConfig::new().init();

        let train = tiny_dataset(8);
        let val = tiny_dataset(4);

        let mut tracker =
            RunTracker::init(dir.path().join("runs"), "test", &config, None).unwrap();

        let summary = fit(
            model,
            optimizer,
            CifarBatcher::<TrainingBackend>::new(device),
            &config,
            &train,
            &val,
            &mut tracker,
            &Default::default(),
        )
        .unwrap();

        // min_delta = inf means nothing ever counts as improvement, so the
        // signal fires on the very first epoch.
        assert!(summary.stopped_early);
        assert_eq!(summary.epochs_run, 1);
    }
}
