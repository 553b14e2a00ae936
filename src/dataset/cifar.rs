//! CIFAR-100 dataset loader and utilities.
//!
//! Loads the CIFAR-100 binary release: 50,000 train and 10,000 test images,
//! 32x32 RGB, 100 fine classes grouped into 20 coarse classes. Only the fine
//! labels are used here. The archive is downloaded on demand if the binaries
//! are not already present under the data directory.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{IMAGE_SIZE, NUM_CLASSES};

/// CIFAR-100 fine label names, in label order
pub const FINE_LABEL_NAMES: [&str; 100] = [
    "apple",
    "aquarium_fish",
    "baby",
    "bear",
    "beaver",
    "bed",
    "bee",
    "beetle",
    "bicycle",
    "bottle",
    "bowl",
    "boy",
    "bridge",
    "bus",
    "butterfly",
    "camel",
    "can",
    "castle",
    "caterpillar",
    "cattle",
    "chair",
    "chimpanzee",
    "clock",
    "cloud",
    "cockroach",
    "couch",
    "crab",
    "crocodile",
    "cup",
    "dinosaur",
    "dolphin",
    "elephant",
    "flatfish",
    "forest",
    "fox",
    "girl",
    "hamster",
    "house",
    "kangaroo",
    "keyboard",
    "lamp",
    "lawn_mower",
    "leopard",
    "lion",
    "lizard",
    "lobster",
    "man",
    "maple_tree",
    "motorcycle",
    "mountain",
    "mouse",
    "mushroom",
    "oak_tree",
    "orange",
    "orchid",
    "otter",
    "palm_tree",
    "pear",
    "pickup_truck",
    "pine_tree",
    "plain",
    "plate",
    "poppy",
    "porcupine",
    "possum",
    "rabbit",
    "raccoon",
    "ray",
    "road",
    "rocket",
    "rose",
    "sea",
    "seal",
    "shark",
    "shrew",
    "skunk",
    "skyscraper",
    "snail",
    "snake",
    "spider",
    "squirrel",
    "streetcar",
    "sunflower",
    "sweet_pepper",
    "table",
    "tank",
    "telephone",
    "television",
    "tiger",
    "tractor",
    "train",
    "trout",
    "tulip",
    "turtle",
    "wardrobe",
    "whale",
    "willow_tree",
    "wolf",
    "woman",
    "worm",
];

const PIXELS_PER_IMAGE: usize = 3 * IMAGE_SIZE * IMAGE_SIZE; // 3072
const RECORD_SIZE: usize = 2 + PIXELS_PER_IMAGE; // coarse byte + fine byte + pixels
const TRAIN_IMAGES: usize = 50_000;
const TEST_IMAGES: usize = 10_000;

const DOWNLOAD_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-100-binary.tar.gz";
const EXTRACTED_DIR: &str = "cifar-100-binary";

/// A single CIFAR-100 image with its fine label.
///
/// Pixel data is stored exactly as the binary release lays it out: the red
/// plane, then the green plane, then the blue plane, which is already the
/// CHW layout the tensors need.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CifarImage {
    /// Planar RGB pixel data, 3072 bytes
    pub data: Vec<u8>,
    /// Fine class label (0-99)
    pub label: usize,
}

impl CifarImage {
    pub fn new(data: Vec<u8>, label: usize) -> Self {
        Self { data, label }
    }

    /// Pixel data scaled to [0, 1], CHW order
    pub fn normalized_data(&self) -> Vec<f32> {
        self.data.iter().map(|&x| x as f32 / 255.0).collect()
    }

    /// Fine class name for this image
    pub fn class_name(&self) -> &'static str {
        FINE_LABEL_NAMES[self.label]
    }

    /// Image dimensions (height, width, channels)
    pub fn shape(&self) -> (usize, usize, usize) {
        (IMAGE_SIZE, IMAGE_SIZE, 3)
    }
}

/// Which partition of the dataset to load
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetSplit {
    Train,
    Test,
}

/// An in-memory CIFAR-100 partition
#[derive(Clone, Debug)]
pub struct Cifar100 {
    pub images: Vec<CifarImage>,
    pub split: DatasetSplit,
}

impl Cifar100 {
    /// Load a partition from the extracted binary files, downloading the
    /// archive first if it is missing.
    pub fn load_or_download(data_dir: impl AsRef<Path>, split: DatasetSplit) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let binary_dir = data_dir.join(EXTRACTED_DIR);

        if !binary_dir.join("train.bin").exists() {
            download_cifar100(data_dir)?;
        }

        Self::load_from_binary(&binary_dir, split)
    }

    /// Load a partition from an extracted `cifar-100-binary` directory
    pub fn load_from_binary(binary_dir: impl AsRef<Path>, split: DatasetSplit) -> Result<Self> {
        let binary_dir = binary_dir.as_ref();

        let (file, expected) = match split {
            DatasetSplit::Train => (binary_dir.join("train.bin"), TRAIN_IMAGES),
            DatasetSplit::Test => (binary_dir.join("test.bin"), TEST_IMAGES),
        };

        let images = load_cifar_file(&file, expected)?;
        Ok(Self { images, split })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Samples per fine class
    pub fn class_distribution(&self) -> Vec<usize> {
        let mut counts = vec![0usize; NUM_CLASSES];
        for img in &self.images {
            if img.label < NUM_CLASSES {
                counts[img.label] += 1;
            }
        }
        counts
    }

    /// Print dataset statistics to the console
    pub fn print_stats(&self) {
        let counts = self.class_distribution();
        println!("\nDataset statistics:");
        println!("  Total samples: {}", self.len());
        println!("  Number of classes: {}", NUM_CLASSES);
        println!("\n  Samples per class:");
        for (idx, count) in counts.iter().enumerate() {
            println!("    {:3}. {:16} {:5}", idx, FINE_LABEL_NAMES[idx], count);
        }
    }
}

/// Parse one CIFAR-100 binary file.
///
/// Record layout: [coarse label (1 byte)][fine label (1 byte)][red plane
/// (1024 bytes)][green plane (1024 bytes)][blue plane (1024 bytes)].
fn load_cifar_file(path: &Path, expected_images: usize) -> Result<Vec<CifarImage>> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open CIFAR file {:?}", path))?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .with_context(|| format!("failed to read CIFAR file {:?}", path))?;

    if buffer.len() != RECORD_SIZE * expected_images {
        anyhow::bail!(
            "invalid CIFAR file size for {:?}: expected {}, got {}",
            path,
            RECORD_SIZE * expected_images,
            buffer.len()
        );
    }

    let mut images = Vec::with_capacity(expected_images);
    for i in 0..expected_images {
        let offset = i * RECORD_SIZE;
        // Byte 0 is the coarse label; the fine label at byte 1 is the one used.
        let label = buffer[offset + 1] as usize;
        if label >= NUM_CLASSES {
            anyhow::bail!("fine label {} out of range in {:?}", label, path);
        }
        let data = buffer[offset + 2..offset + RECORD_SIZE].to_vec();
        images.push(CifarImage::new(data, label));
    }

    Ok(images)
}

/// Download and extract the CIFAR-100 binary archive into `data_dir`
pub fn download_cifar100(data_dir: impl AsRef<Path>) -> Result<()> {
    let data_dir = data_dir.as_ref();
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {:?}", data_dir))?;

    let tar_gz_path = data_dir.join("cifar-100-binary.tar.gz");

    if tar_gz_path.exists() {
        tracing::info!("CIFAR-100 archive already present, skipping download");
    } else {
        tracing::info!("Downloading CIFAR-100 from {}", DOWNLOAD_URL);

        let response = reqwest::blocking::get(DOWNLOAD_URL)
            .with_context(|| format!("failed to download {}", DOWNLOAD_URL))?;
        let bytes = response
            .bytes()
            .context("failed to read CIFAR-100 download response")?;

        let mut file = File::create(&tar_gz_path)
            .with_context(|| format!("failed to create {:?}", tar_gz_path))?;
        file.write_all(&bytes)
            .with_context(|| format!("failed to write {:?}", tar_gz_path))?;

        tracing::info!("Download complete ({} bytes)", bytes.len());
    }

    let extracted_dir = data_dir.join(EXTRACTED_DIR);
    if extracted_dir.exists() {
        tracing::info!("CIFAR-100 already extracted");
    } else {
        tracing::info!("Extracting CIFAR-100 archive");
        extract_tar_gz(&tar_gz_path, data_dir)?;
    }

    Ok(())
}

fn extract_tar_gz(tar_gz_path: &Path, output_dir: &Path) -> Result<()> {
    let tar_gz =
        File::open(tar_gz_path).with_context(|| format!("failed to open {:?}", tar_gz_path))?;
    let decompressor = flate2::read::GzDecoder::new(tar_gz);
    let mut archive = tar::Archive::new(decompressor);
    archive
        .unpack(output_dir)
        .with_context(|| format!("failed to extract archive into {:?}", output_dir))?;
    Ok(())
}

/// Path of the extracted binary directory under a data directory
pub fn binary_dir(data_dir: impl AsRef<Path>) -> PathBuf {
    data_dir.as_ref().join(EXTRACTED_DIR)
}
