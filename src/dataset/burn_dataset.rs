//! Burn dataset integration for CIFAR-100.
//!
//! Implements Burn's `Dataset` trait over the in-memory image store and the
//! `Batcher`s that turn items into normalized tensors. The plain batcher is
//! deterministic and is the only path validation/test data goes through; the
//! augmenting batcher applies random transforms first and is used for
//! training only.

use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::augmentation::Augmenter;
use crate::dataset::cifar::CifarImage;
use crate::IMAGE_SIZE;

/// Per-channel mean of the CIFAR-100 train partition
pub const CIFAR100_MEAN: [f32; 3] = [0.5071, 0.4867, 0.4408];

/// Per-channel standard deviation of the CIFAR-100 train partition
pub const CIFAR100_STD: [f32; 3] = [0.2675, 0.2565, 0.2761];

/// A single sample handed to a batcher: raw planar pixels plus the label
#[derive(Clone, Debug)]
pub struct CifarItem {
    /// Planar RGB pixel data, 3 * 32 * 32 bytes
    pub pixels: Vec<u8>,
    /// Fine class label (0-99)
    pub label: usize,
}

/// A view over a subset of the CIFAR images, selected by index.
///
/// The image store is shared, so the train and validation datasets hold the
/// same backing vector without copying 150 MB of pixels.
#[derive(Clone, Debug)]
pub struct CifarDataset {
    images: Arc<Vec<CifarImage>>,
    indices: Vec<usize>,
}

impl CifarDataset {
    /// Dataset over an explicit index subset
    pub fn subset(images: Arc<Vec<CifarImage>>, indices: Vec<usize>) -> Self {
        Self { images, indices }
    }

    /// Dataset over every image in the store
    pub fn full(images: Arc<Vec<CifarImage>>) -> Self {
        let indices = (0..images.len()).collect();
        Self { images, indices }
    }
}

impl Dataset<CifarItem> for CifarDataset {
    fn get(&self, index: usize) -> Option<CifarItem> {
        let image_index = *self.indices.get(index)?;
        let image = self.images.get(image_index)?;
        Some(CifarItem {
            pixels: image.data.clone(),
            label: image.label,
        })
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// A batch of CIFAR images ready for the model
#[derive(Clone, Debug)]
pub struct CifarBatch<B: Backend> {
    /// Images with shape [batch_size, 3, 32, 32]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Apply the per-channel dataset statistics: (x - mean) / std.
/// Input pixels are expected in [0, 1].
pub fn normalize<B: Backend>(images: Tensor<B, 4>, device: &B::Device) -> Tensor<B, 4> {
    let mean = Tensor::<B, 4>::from_floats(
        TensorData::new(CIFAR100_MEAN.to_vec(), [1, 3, 1, 1]),
        device,
    );
    let std = Tensor::<B, 4>::from_floats(
        TensorData::new(CIFAR100_STD.to_vec(), [1, 3, 1, 1]),
        device,
    );
    (images - mean) / std
}

fn to_batch<B: Backend>(
    pixels: Vec<f32>,
    labels: Vec<i64>,
    device: &B::Device,
) -> CifarBatch<B> {
    let batch_size = labels.len();

    let images = Tensor::<B, 4>::from_floats(
        TensorData::new(pixels, [batch_size, 3, IMAGE_SIZE, IMAGE_SIZE]),
        device,
    );
    let images = normalize(images, device);

    let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [batch_size]), device);

    CifarBatch { images, targets }
}

/// Deterministic batcher: scale to [0, 1] and normalize. Used for the
/// validation and test paths.
#[derive(Clone, Debug)]
pub struct CifarBatcher<B: Backend> {
    #[allow(dead_code)]
    device: B::Device,
}

impl<B: Backend> CifarBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<B, CifarItem, CifarBatch<B>> for CifarBatcher<B> {
    fn batch(&self, items: Vec<CifarItem>, device: &B::Device) -> CifarBatch<B> {
        let mut pixels = Vec::with_capacity(items.len() * 3 * IMAGE_SIZE * IMAGE_SIZE);
        let mut labels = Vec::with_capacity(items.len());

        for item in items {
            pixels.extend(item.pixels.iter().map(|&p| p as f32 / 255.0));
            labels.push(item.label as i64);
        }

        to_batch(pixels, labels, device)
    }
}

/// Batcher that applies random augmentation before the deterministic tail.
/// Used for the training path only.
#[derive(Clone, Debug)]
pub struct AugmentingCifarBatcher<B: Backend> {
    #[allow(dead_code)]
    device: B::Device,
    augmenter: Augmenter,
}

impl<B: Backend> AugmentingCifarBatcher<B> {
    pub fn new(device: B::Device, augmenter: Augmenter) -> Self {
        Self { device, augmenter }
    }
}

impl<B: Backend> Batcher<B, CifarItem, CifarBatch<B>> for AugmentingCifarBatcher<B> {
    fn batch(&self, items: Vec<CifarItem>, device: &B::Device) -> CifarBatch<B> {
        let mut pixels = Vec::with_capacity(items.len() * 3 * IMAGE_SIZE * IMAGE_SIZE);
        let mut labels = Vec::with_capacity(items.len());

        // Fresh per-batch RNG; batches stay independent of iteration order.
        let mut rng = ChaCha8Rng::seed_from_u64(rand::random::<u64>());

        for item in items {
            let augmented = self.augmenter.augment(&item.pixels, &mut rng);
            pixels.extend(augmented.iter().map(|&p| p as f32 / 255.0));
            labels.push(item.label as i64);
        }

        to_batch(pixels, labels, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    fn store(n: usize) -> Arc<Vec<CifarImage>> {
        let images = (0..n)
            .map(|i| CifarImage::new(vec![(i * 10) as u8; 3 * IMAGE_SIZE * IMAGE_SIZE], i % 100))
            .collect();
        Arc::new(images)
    }

    #[test]
    fn test_dataset_subset_indexing() {
        let dataset = CifarDataset::subset(store(10), vec![3, 7]);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(0).unwrap().label, 3);
        assert_eq!(dataset.get(1).unwrap().label, 7);
        assert!(dataset.get(2).is_none());
    }

    #[test]
    fn test_dataset_full() {
        let dataset = CifarDataset::full(store(5));
        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.get(4).unwrap().label, 4);
    }

    #[test]
    fn test_batcher_shapes() {
        let device = Default::default();
        let batcher = CifarBatcher::<DefaultBackend>::new(device);

        let items: Vec<CifarItem> = (0..4)
            .map(|i| CifarItem {
                pixels: vec![128u8; 3 * IMAGE_SIZE * IMAGE_SIZE],
                label: i,
            })
            .collect();

        let batch = batcher.batch(items, &Default::default());
        assert_eq!(batch.images.dims(), [4, 3, IMAGE_SIZE, IMAGE_SIZE]);
        assert_eq!(batch.targets.dims(), [4]);
    }

    #[test]
    fn test_batcher_normalizes() {
        let device = Default::default();
        let batcher = CifarBatcher::<DefaultBackend>::new(device);

        // All-black pixels land at (0 - mean) / std per channel.
        let items = vec![CifarItem {
            pixels: vec![0u8; 3 * IMAGE_SIZE * IMAGE_SIZE],
            label: 0,
        }];

        let batch = batcher.batch(items, &Default::default());
        let values: Vec<f32> = batch.images.into_data().to_vec().unwrap();

        let expected_r = -CIFAR100_MEAN[0] / CIFAR100_STD[0];
        assert!((values[0] - expected_r).abs() < 1e-4);
    }

    #[test]
    fn test_augmenting_batcher_shapes() {
        let device = Default::default();
        let batcher =
            AugmentingCifarBatcher::<DefaultBackend>::new(device, Augmenter::with_defaults());

        let items: Vec<CifarItem> = (0..2)
            .map(|i| CifarItem {
                pixels: vec![64u8; 3 * IMAGE_SIZE * IMAGE_SIZE],
                label: i,
            })
            .collect();

        let batch = batcher.batch(items, &Default::default());
        assert_eq!(batch.images.dims(), [2, 3, IMAGE_SIZE, IMAGE_SIZE]);
        assert_eq!(batch.targets.dims(), [2]);
    }
}
