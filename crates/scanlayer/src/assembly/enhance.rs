//! Scan clean-up ahead of embedding: binarize, then sharpen.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{imageops, DynamicImage, GrayImage, ImageFormat, Luma};

use crate::error::StorageError;
use crate::storage::write_bytes_atomic;

const SHARPEN_SIGMA: f32 = 2.0;
const SHARPEN_THRESHOLD: i32 = 3;

/// Mean and population standard deviation of the luma channel.
fn luma_stats(gray: &GrayImage) -> (f64, f64) {
    let count = (gray.width() as f64) * (gray.height() as f64);
    if count == 0.0 {
        return (0.0, 0.0);
    }
    let (sum, sum_sq) = gray.pixels().fold((0.0, 0.0), |(sum, sum_sq), p| {
        let v = p[0] as f64;
        (sum + v, sum_sq + v * v)
    });
    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Threshold below which pixels turn black.
pub fn adaptive_threshold(gray: &GrayImage) -> f64 {
    let (mean, std) = luma_stats(gray);
    (mean - std / 2.0).clamp(0.0, 255.0)
}

pub fn enhance(img: &DynamicImage) -> GrayImage {
    let gray = img.to_luma8();
    let threshold = adaptive_threshold(&gray);
    let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y)[0] as f64 > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    imageops::unsharpen(&binary, SHARPEN_SIGMA, SHARPEN_THRESHOLD)
}

/// `<image_dir>_enhanced/<image stem>.png`.
pub fn enhanced_path(image_dir: &Path, image_path: &Path) -> PathBuf {
    let dir_name = image_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "page".to_string());
    image_dir
        .with_file_name(format!("{}_enhanced", dir_name))
        .join(format!("{}.png", stem))
}

pub fn save_png(gray: &GrayImage, path: &Path) -> Result<(), StorageError> {
    let mut png = Vec::new();
    gray.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| StorageError::WriteFile {
            path: path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;
    write_bytes_atomic(path, &png)
}
