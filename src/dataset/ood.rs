//! Out-of-distribution test set.
//!
//! The OOD partition is a flat directory of distorted images with no ground
//! truth labels. Samples are ordered by the numeric file stem when every
//! stem parses as a number (the usual `0.png`, `1.png`, ... layout) and
//! lexicographically otherwise; the submission file follows this order.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use walkdir::WalkDir;

use crate::IMAGE_SIZE;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// One OOD sample: submission id plus planar RGB pixels
#[derive(Clone, Debug)]
pub struct OodSample {
    /// Identifier used in the submission file
    pub id: usize,
    /// Planar RGB pixel data, 3 * 32 * 32 bytes
    pub pixels: Vec<u8>,
}

/// The loaded OOD partition, in submission order
#[derive(Clone, Debug)]
pub struct OodDataset {
    pub samples: Vec<OodSample>,
}

impl OodDataset {
    /// Scan `ood_dir` and decode every image, fanning the decode work out
    /// over `num_workers` threads.
    pub fn load(ood_dir: impl AsRef<Path>, num_workers: usize) -> Result<Self> {
        let ood_dir = ood_dir.as_ref();
        if !ood_dir.exists() {
            anyhow::bail!("OOD directory does not exist: {:?}", ood_dir);
        }

        let files = collect_image_files(ood_dir);
        if files.is_empty() {
            anyhow::bail!("no images found under {:?}", ood_dir);
        }

        let samples = decode_files(&files, num_workers.max(1))?;
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Collect image paths and fix the iteration order
fn collect_image_files(dir: &Path) -> Vec<(usize, PathBuf)> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    let numeric_stem = |p: &Path| -> Option<usize> {
        p.file_stem()?.to_str()?.parse().ok()
    };

    if files.iter().all(|p| numeric_stem(p).is_some()) {
        files.sort_by_key(|p| numeric_stem(p).unwrap_or(usize::MAX));
        files
            .into_iter()
            .map(|p| (numeric_stem(&p).unwrap_or(0), p))
            .collect()
    } else {
        files.sort();
        files.into_iter().enumerate().collect()
    }
}

/// Decode every file into 32x32 planar pixels, `workers` threads at a time
fn decode_files(files: &[(usize, PathBuf)], workers: usize) -> Result<Vec<OodSample>> {
    let results: Mutex<Vec<(usize, OodSample)>> = Mutex::new(Vec::with_capacity(files.len()));
    let errors: Mutex<Vec<anyhow::Error>> = Mutex::new(Vec::new());

    let results_ref = &results;
    let errors_ref = &errors;
    std::thread::scope(|scope| {
        let chunk_size = files.len().div_ceil(workers);
        for chunk in files.chunks(chunk_size) {
            scope.spawn(move || {
                for (id, path) in chunk {
                    match decode_image(path) {
                        Ok(pixels) => {
                            results_ref
                                .lock()
                                .unwrap()
                                .push((*id, OodSample { id: *id, pixels }));
                        }
                        Err(e) => errors_ref.lock().unwrap().push(e),
                    }
                }
            });
        }
    });

    let errors = errors.into_inner().unwrap();
    if let Some(e) = errors.into_iter().next() {
        return Err(e);
    }

    let mut results = results.into_inner().unwrap();
    results.sort_by_key(|(id, _)| *id);
    Ok(results.into_iter().map(|(_, sample)| sample).collect())
}

/// Decode one image file into planar 32x32 RGB bytes
fn decode_image(path: &Path) -> Result<Vec<u8>> {
    let img = image::open(path).with_context(|| format!("failed to decode image {:?}", path))?;
    let img = img.resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle);
    let rgb = img.to_rgb8();

    let size = IMAGE_SIZE;
    let mut pixels = vec![0u8; 3 * size * size];
    for y in 0..size {
        for x in 0..size {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            pixels[y * size + x] = pixel[0];
            pixels[size * size + y * size + x] = pixel[1];
            pixels[2 * size * size + y * size + x] = pixel[2];
        }
    }

    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn write_test_image(path: &Path, value: u8) {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(32, 32, |_, _| Rgb([value, value, value]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_numeric_ordering() {
        let dir = tempfile::tempdir().unwrap();
        // Written out of order on purpose; 10 sorts after 2 numerically.
        for name in ["10", "2", "0"] {
            write_test_image(&dir.path().join(format!("{}.png", name)), 100);
        }

        let dataset = OodDataset::load(dir.path(), 2).unwrap();
        let ids: Vec<usize> = dataset.samples.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 2, 10]);
    }

    #[test]
    fn test_decoded_pixel_layout() {
        let dir = tempfile::tempdir().unwrap();
        write_test_image(&dir.path().join("0.png"), 200);

        let dataset = OodDataset::load(dir.path(), 1).unwrap();
        let sample = &dataset.samples[0];
        assert_eq!(sample.pixels.len(), 3 * IMAGE_SIZE * IMAGE_SIZE);
        assert!(sample.pixels.iter().all(|&p| p > 190));
    }

    #[test]
    fn test_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(OodDataset::load(&missing, 1).is_err());
    }

    #[test]
    fn test_empty_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OodDataset::load(dir.path(), 1).is_err());
    }

    #[test]
    fn test_non_numeric_stems_fall_back_to_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        write_test_image(&dir.path().join("b.png"), 10);
        write_test_image(&dir.path().join("a.png"), 20);

        let dataset = OodDataset::load(dir.path(), 1).unwrap();
        let ids: Vec<usize> = dataset.samples.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1]);
        // a.png sorts first and gets id 0
        assert!(dataset.samples[0].pixels.iter().all(|&p| p > 10));
    }
}
