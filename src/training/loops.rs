//! One-epoch training and validation passes.
//!
//! Both loops traverse their partition exactly once and accumulate running
//! loss and accuracy. The training pass mutates parameters through the
//! optimizer; the validation pass runs the non-autodiff model and leaves
//! parameters untouched. Failures in the underlying tensor computation
//! propagate to the caller.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use tracing::debug;

use crate::dataset::burn_dataset::{CifarBatch, CifarBatcher, CifarDataset, CifarItem};
use crate::model::ImageClassifier;
use crate::utils::metrics::{EpochAccumulator, EpochMetrics};

/// Count the predictions in `output` whose argmax equals the target
pub fn count_correct<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = output.argmax(1).squeeze::<1>(1);
    let correct: i64 = predictions.equal(targets).int().sum().into_scalar().elem();
    correct as usize
}

/// Train for exactly one pass over `order`.
///
/// For each batch: forward pass, cross-entropy loss against the integer
/// targets, backward pass, one optimizer step. Returns the updated model
/// and the epoch's (mean loss, accuracy).
#[allow(clippy::too_many_arguments)]
pub fn train_epoch<B, M, O, BT>(
    epoch: usize,
    total_epochs: usize,
    mut model: M,
    optimizer: &mut O,
    dataset: &CifarDataset,
    order: &[usize],
    batcher: &BT,
    batch_size: usize,
    learning_rate: f64,
    device: &B::Device,
) -> (M, EpochMetrics)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    O: Optimizer<M, B>,
    BT: Batcher<B, CifarItem, CifarBatch<B>>,
{
    let mut running = EpochAccumulator::new();
    let num_batches = order.len().div_ceil(batch_size.max(1));

    for (batch_idx, chunk) in order.chunks(batch_size.max(1)).enumerate() {
        let items: Vec<CifarItem> = chunk.iter().filter_map(|&i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }

        let batch = batcher.batch(items, device);

        // Forward pass
        let output = model.forward(batch.images.clone());

        // Loss against integer targets
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.clone().into_scalar().elem();

        let samples = batch.targets.dims()[0];
        let correct = count_correct(output, batch.targets);
        running.record_batch(loss_value, correct, samples);

        // Backward pass and parameter update
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optimizer.step(learning_rate, model, grads);

        if (batch_idx + 1) % 10 == 0 || batch_idx + 1 == num_batches {
            debug!(
                "Epoch {}/{} batch {}/{}: loss = {:.4}, acc = {:.2}%",
                epoch + 1,
                total_epochs,
                batch_idx + 1,
                num_batches,
                loss_value,
                running.accuracy_pct()
            );
        }
    }

    (model, running.finalize())
}

/// One pass over a held-out partition with gradients disabled.
///
/// Runs the inner (non-autodiff) model; model state is untouched. Returns
/// (mean loss, accuracy).
pub fn validate<B, M>(
    model: &M,
    dataset: &CifarDataset,
    batcher: &CifarBatcher<B::InnerBackend>,
    batch_size: usize,
    device: &B::Device,
) -> EpochMetrics
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
{
    let inner_model = model.valid();
    let mut running = EpochAccumulator::new();

    let len = dataset.len();
    for start in (0..len).step_by(batch_size.max(1)) {
        let end = (start + batch_size).min(len);
        let items: Vec<CifarItem> = (start..end).filter_map(|i| dataset.get(i)).collect();
        if items.is_empty() {
            continue;
        }

        let batch = batcher.batch(items, device);
        let output = inner_model.forward(batch.images.clone());

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        let loss_value: f64 = loss.into_scalar().elem();

        let samples = batch.targets.dims()[0];
        let correct = count_correct(output, batch.targets);
        running.record_batch(loss_value, correct, samples);
    }

    running.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DefaultBackend, TrainingBackend};
    use crate::dataset::cifar::CifarImage;
    use crate::model::{DeepCnn, DeepCnnConfig};
    use burn::optim::SgdConfig;
    use std::sync::Arc;

    fn tiny_dataset(n: usize) -> CifarDataset {
        let images: Vec<CifarImage> = (0..n)
            .map(|i| CifarImage::new(vec![(i * 37 % 251) as u8; 3 * 32 * 32], i % 100))
            .collect();
        CifarDataset::full(Arc::new(images))
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        // Logits strongly favoring class 1 for both rows.
        let output = Tensor::<DefaultBackend, 2>::from_floats(
            [[0.0, 5.0, 0.0], [0.0, 5.0, 0.0]],
            &device,
        );
        let targets = Tensor::<DefaultBackend, 1, Int>::from_ints([1, 2], &device);
        assert_eq!(count_correct(output, targets), 1);
    }

    #[test]
    fn test_train_epoch_runs_and_reports() {
        let device = Default::default();
        let config = DeepCnnConfig::new()
            .with_base_filters(4)
            .with_blocks_per_stage(1);
        let model = DeepCnn::<TrainingBackend>::new(&config, &device);
        let mut optimizer = SgdConfig::new().init();

        let dataset = tiny_dataset(8);
        let order: Vec<usize> = (0..8).collect();
        let batcher = CifarBatcher::<TrainingBackend>::new(device);

        let (_model, metrics) = train_epoch(
            0,
            1,
            model,
            &mut optimizer,
            &dataset,
            &order,
            &batcher,
            4,
            0.01,
            &Default::default(),
        );

        assert!(metrics.loss.is_finite());
        assert!((0.0..=100.0).contains(&metrics.accuracy));
    }

    #[test]
    fn test_validate_leaves_model_usable() {
        let device = Default::default();
        let config = DeepCnnConfig::new()
            .with_base_filters(4)
            .with_blocks_per_stage(1);
        let model = DeepCnn::<TrainingBackend>::new(&config, &device);

        let dataset = tiny_dataset(6);
        let batcher = CifarBatcher::<DefaultBackend>::new(Default::default());

        let first = validate::<TrainingBackend, _>(&model, &dataset, &batcher, 4, &device);
        let second = validate::<TrainingBackend, _>(&model, &dataset, &batcher, 4, &device);

        // Validation is side-effect free, so two passes agree.
        assert!((first.loss - second.loss).abs() < 1e-6);
        assert_eq!(first.accuracy, second.accuracy);
    }
}
