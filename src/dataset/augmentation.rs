//! Data augmentation for the training path.
//!
//! Random horizontal flips and small rotations, applied directly to the
//! planar CIFAR pixel data. Validation, test and OOD paths never go through
//! this module; they only get the deterministic normalization in the
//! batcher.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::IMAGE_SIZE;

/// Configuration for random training-time transforms
#[derive(Clone, Debug)]
pub struct AugmentationConfig {
    /// Probability of a horizontal flip
    pub horizontal_flip_prob: f32,
    /// Maximum rotation angle in degrees (+/-)
    pub rotation_degrees: f32,
    /// Probability of applying a rotation
    pub rotation_prob: f32,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            horizontal_flip_prob: 0.5,
            rotation_degrees: 15.0,
            rotation_prob: 1.0,
        }
    }
}

impl AugmentationConfig {
    /// Disable all transforms
    pub fn none() -> Self {
        Self {
            horizontal_flip_prob: 0.0,
            rotation_degrees: 0.0,
            rotation_prob: 0.0,
        }
    }
}

/// Applies random transforms to planar 32x32 RGB pixel data
#[derive(Clone, Debug)]
pub struct Augmenter {
    config: AugmentationConfig,
}

impl Augmenter {
    pub fn new(config: AugmentationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(AugmentationConfig::default())
    }

    /// Apply the configured transforms to one image.
    ///
    /// `data` is planar CHW, 3 * 32 * 32 bytes.
    pub fn augment(&self, data: &[u8], rng: &mut ChaCha8Rng) -> Vec<u8> {
        debug_assert_eq!(data.len(), 3 * IMAGE_SIZE * IMAGE_SIZE);
        let mut result = data.to_vec();

        if rng.gen::<f32>() < self.config.horizontal_flip_prob {
            result = flip_horizontal(&result);
        }

        if self.config.rotation_degrees > 0.0 && rng.gen::<f32>() < self.config.rotation_prob {
            let angle =
                rng.gen_range(-self.config.rotation_degrees..=self.config.rotation_degrees);
            result = rotate(&result, angle);
        }

        result
    }
}

/// Mirror each row of each channel plane
pub fn flip_horizontal(data: &[u8]) -> Vec<u8> {
    let size = IMAGE_SIZE;
    let mut out = vec![0u8; data.len()];

    for c in 0..3 {
        let plane = c * size * size;
        for y in 0..size {
            for x in 0..size {
                out[plane + y * size + x] = data[plane + y * size + (size - 1 - x)];
            }
        }
    }

    out
}

/// Rotate around the image center with bilinear sampling.
///
/// Pixels sampled from outside the source image come out black, matching the
/// zero-fill behavior of the usual rotation transforms.
pub fn rotate(data: &[u8], angle_degrees: f32) -> Vec<u8> {
    if angle_degrees.abs() < 0.1 {
        return data.to_vec();
    }

    let size = IMAGE_SIZE;
    let angle = angle_degrees.to_radians();
    let (cos_a, sin_a) = (angle.cos(), angle.sin());
    let center = size as f32 / 2.0;

    let mut out = vec![0u8; data.len()];

    for c in 0..3 {
        let plane = &data[c * size * size..(c + 1) * size * size];
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;

                let src_x = center + dx * cos_a + dy * sin_a;
                let src_y = center - dx * sin_a + dy * cos_a;

                out[c * size * size + y * size + x] = bilinear_sample(plane, src_x, src_y);
            }
        }
    }

    out
}

fn bilinear_sample(plane: &[u8], x: f32, y: f32) -> u8 {
    let size = IMAGE_SIZE;

    if x < 0.0 || y < 0.0 || x >= size as f32 - 1.0 || y >= size as f32 - 1.0 {
        return 0;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(size - 1);
    let y1 = (y0 + 1).min(size - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let v00 = plane[y0 * size + x0] as f32;
    let v10 = plane[y0 * size + x1] as f32;
    let v01 = plane[y1 * size + x0] as f32;
    let v11 = plane[y1 * size + x1] as f32;

    let v = v00 * (1.0 - fx) * (1.0 - fy)
        + v10 * fx * (1.0 - fy)
        + v01 * (1.0 - fx) * fy
        + v11 * fx * fy;

    v.round().clamp(0.0, 255.0) as u8
}
