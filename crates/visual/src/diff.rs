//! Pixel-level screenshot comparison
//!
//! The score is a normalized root-mean-square over per-channel absolute
//! differences: 0.0 for pixel-identical images, 1.0 when every channel is
//! maximally different. Dimension drift between captures is absorbed by
//! resampling the current image to the baseline's dimensions, so a viewport
//! change still yields a score instead of an error.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::VisualResult;

const COLOR_CHANNELS: f64 = 3.0;

/// Compare two images, returning the normalized RMS score and the per-pixel
/// absolute-difference image.
pub fn diff_images(baseline: &DynamicImage, current: &DynamicImage) -> (f64, RgbaImage) {
    let (width, height) = baseline.dimensions();

    // An empty baseline has no pixels to disagree on
    if width == 0 || height == 0 {
        return (0.0, RgbaImage::new(width, height));
    }

    let resampled;
    let current = if current.dimensions() == (width, height) {
        current
    } else {
        debug!(
            "resampling current {:?} to baseline {}x{}",
            current.dimensions(),
            width,
            height
        );
        resampled = current.resize_exact(width, height, FilterType::Nearest);
        &resampled
    };

    let baseline = baseline.to_rgba8();
    let current = current.to_rgba8();

    let mut diff_img = RgbaImage::new(width, height);
    let mut sum_sq = 0.0f64;

    for y in 0..height {
        for x in 0..width {
            let b = baseline.get_pixel(x, y).0;
            let c = current.get_pixel(x, y).0;

            let mut d = [0u8, 0, 0, 255];
            for ch in 0..3 {
                d[ch] = b[ch].abs_diff(c[ch]);
                sum_sq += (d[ch] as f64) * (d[ch] as f64);
            }
            diff_img.put_pixel(x, y, Rgba(d));
        }
    }

    let rms = (sum_sq / (width as f64 * height as f64 * COLOR_CHANNELS)).sqrt();
    (rms / 255.0, diff_img)
}

/// Compare two screenshot files, writing the diff image next to them.
///
/// Byte-identical files short-circuit to 0.0 without decoding.
pub fn diff_files(baseline_path: &Path, current_path: &Path, diff_path: &Path) -> VisualResult<f64> {
    if hash_file(baseline_path)? == hash_file(current_path)? {
        debug!("screenshots are byte-identical, skipping pixel compare");
        return Ok(0.0);
    }

    let baseline = image::open(baseline_path)?;
    let current = image::open(current_path)?;

    let (score, diff_img) = diff_images(&baseline, &current);
    diff_img.save(diff_path)?;

    Ok(score)
}

/// SHA-256 of a file's contents, hex encoded.
pub fn hash_file(path: &Path) -> VisualResult<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
