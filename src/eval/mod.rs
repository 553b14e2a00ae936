//! Evaluation of the checkpointed best model.
//!
//! Loads the persisted parameters into a non-autodiff model, measures
//! accuracy on the clean CIFAR-100 test partition, runs the
//! out-of-distribution partition (no ground truth available) and writes the
//! submission artifact.

pub mod submission;

use std::sync::Arc;

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::Module,
    prelude::*,
    record::CompactRecorder,
};
use tracing::info;

use crate::config::RunConfig;
use crate::dataset::burn_dataset::{normalize, CifarBatcher, CifarDataset, CifarItem};
use crate::dataset::cifar::{Cifar100, DatasetSplit};
use crate::dataset::ood::OodDataset;
use crate::model::{
    DeepCnn, DeepCnnConfig, ImageClassifier, ModelVariant, SimpleCnn, SimpleCnnConfig,
};
use crate::training::loops::count_correct;
use crate::IMAGE_SIZE;

/// Result of the clean test pass
#[derive(Debug, Clone)]
pub struct CleanEvaluation {
    /// Argmax prediction per test sample, in iteration order
    pub predictions: Vec<usize>,
    /// Accuracy percentage over the test partition
    pub accuracy: f64,
}

/// Result of the full evaluation stage
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Clean CIFAR-100 test accuracy (percent)
    pub clean_accuracy: f64,
    /// Number of clean test samples evaluated
    pub clean_samples: usize,
    /// Number of OOD predictions written to the submission file
    pub ood_samples: usize,
}

/// Evaluate a model over the clean test partition
pub fn evaluate_clean<B, M>(
    model: &M,
    dataset: &CifarDataset,
    batcher: &CifarBatcher<B>,
    batch_size: usize,
    device: &B::Device,
) -> CleanEvaluation
where
    B: Backend,
    M: ImageClassifier<B>,
{
    let mut predictions = Vec::with_capacity(dataset.len());
    let mut correct = 0usize;
    let mut total = 0usize;

    let len = dataset.len();
    for start in (0..len).step_by(batch_size.max(1)) {
        let end = (start + batch_size).min(len);
        let items: Vec<CifarItem> = (start..end).filter_map(|i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }

        let batch = batcher.batch(items, device);
        let output = model.forward(batch.images);

        let predicted = output.clone().argmax(1).squeeze::<1>(1);
        let predicted_vec: Vec<i64> = predicted.into_data().to_vec().unwrap();
        predictions.extend(predicted_vec.iter().map(|&p| p as usize));

        correct += count_correct(output, batch.targets.clone());
        total += batch.targets.dims()[0];
    }

    let accuracy = if total > 0 {
        100.0 * correct as f64 / total as f64
    } else {
        0.0
    };

    CleanEvaluation {
        predictions,
        accuracy,
    }
}

/// Run the OOD partition through the model, producing (id, predicted label)
/// pairs in iteration order. No accuracy is computable here.
pub fn evaluate_ood<B, M>(
    model: &M,
    ood: &OodDataset,
    batch_size: usize,
    device: &B::Device,
) -> Vec<(usize, usize)>
where
    B: Backend,
    M: ImageClassifier<B>,
{
    let mut results = Vec::with_capacity(ood.len());

    for chunk in ood.samples.chunks(batch_size.max(1)) {
        let mut pixels = Vec::with_capacity(chunk.len() * 3 * IMAGE_SIZE * IMAGE_SIZE);
        for sample in chunk {
            pixels.extend(sample.pixels.iter().map(|&p| p as f32 / 255.0));
        }

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(pixels, [chunk.len(), 3, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        );
        let images = normalize(images, device);

        let output = model.forward(images);
        let predicted = output.argmax(1).squeeze::<1>(1);
        let predicted_vec: Vec<i64> = predicted.into_data().to_vec().unwrap();

        for (sample, &label) in chunk.iter().zip(predicted_vec.iter()) {
            results.push((sample.id, label as usize));
        }
    }

    results
}

/// Full evaluation stage: load the best checkpoint, score the clean test
/// partition, predict the OOD partition and write the submission file.
pub fn evaluate_from_checkpoint<B: Backend>(config: &RunConfig) -> Result<EvalReport> {
    let device = B::Device::default();

    match config.model {
        ModelVariant::Simple => {
            let model = SimpleCnn::<B>::new(&SimpleCnnConfig::new(), &device)
                .load_file(&config.checkpoint_path, &CompactRecorder::new(), &device)
                .map_err(|e| {
                    anyhow::anyhow!(
                        "failed to load checkpoint {:?}: {e}",
                        config.checkpoint_path
                    )
                })?;
            run_eval_stage(&model, config, &device)
        }
        ModelVariant::Deep | ModelVariant::Transfer => {
            let model =
                DeepCnn::<B>::load_from_file(&DeepCnnConfig::new(), &config.checkpoint_path, &device)
                    .map_err(|e| {
                        anyhow::anyhow!(
                            "failed to load checkpoint {:?}: {e}",
                            config.checkpoint_path
                        )
                    })?;
            run_eval_stage(&model, config, &device)
        }
    }
}

fn run_eval_stage<B, M>(model: &M, config: &RunConfig, device: &B::Device) -> Result<EvalReport>
where
    B: Backend,
    M: ImageClassifier<B>,
{
    info!("Loading CIFAR-100 test partition");
    let test_partition = Cifar100::load_or_download(&config.data_dir, DatasetSplit::Test)?;
    let test_dataset = CifarDataset::full(Arc::new(test_partition.images));
    let batcher = CifarBatcher::<B>::new(device.clone());

    let clean = evaluate_clean(model, &test_dataset, &batcher, config.batch_size, device);
    info!("Clean CIFAR-100 test accuracy: {:.2}%", clean.accuracy);

    info!("Loading OOD partition from {:?}", config.ood_dir);
    let ood = OodDataset::load(&config.ood_dir, config.num_workers)?;
    let ood_predictions = evaluate_ood(model, &ood, config.batch_size, device);

    submission::write_submission(&config.submission_path, &ood_predictions).with_context(|| {
        format!("failed to write submission {:?}", config.submission_path)
    })?;
    info!(
        "Wrote {} OOD predictions to {:?}",
        ood_predictions.len(),
        config.submission_path
    );

    Ok(EvalReport {
        clean_accuracy: clean.accuracy,
        clean_samples: clean.predictions.len(),
        ood_samples: ood_predictions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use crate::dataset::cifar::CifarImage;
    use crate::dataset::ood::OodSample;

    fn tiny_dataset(n: usize) -> CifarDataset {
        let images: Vec<CifarImage> = (0..n)
            .map(|i| CifarImage::new(vec![(i * 13 % 251) as u8; 3 * 32 * 32], i % 100))
            .collect();
        CifarDataset::full(Arc::new(images))
    }

    fn tiny_model() -> DeepCnn<DefaultBackend> {
        let config = DeepCnnConfig::new()
            .with_base_filters(4)
            .with_blocks_per_stage(1);
        DeepCnn::new(&config, &Default::default())
    }

    #[test]
    fn test_evaluate_clean_prediction_count() {
        let device = Default::default();
        let model = tiny_model();
        let dataset = tiny_dataset(7);
        let batcher = CifarBatcher::<DefaultBackend>::new(Default::default());

        let result = evaluate_clean(&model, &dataset, &batcher, 3, &device);
        assert_eq!(result.predictions.len(), 7);
        assert!((0.0..=100.0).contains(&result.accuracy));
        assert!(result.predictions.iter().all(|&p| p < 100));
    }

    #[test]
    fn test_evaluate_ood_preserves_order() {
        let device = Default::default();
        let model = tiny_model();

        let ood = OodDataset {
            samples: (0..5)
                .map(|id| OodSample {
                    id: id * 2,
                    pixels: vec![(id * 40) as u8; 3 * 32 * 32],
                })
                .collect(),
        };

        let predictions = evaluate_ood(&model, &ood, 2, &device);
        let ids: Vec<usize> = predictions.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 2, 4, 6, 8]);
    }
}
