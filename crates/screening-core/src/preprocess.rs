//! Image preprocessing for the risk classifier.
//!
//! Every image becomes an `f32` tensor of shape (1, 224, 224, 3), NHWC:
//! - decode and convert to 8-bit RGB (grayscale/alpha inputs are expanded/dropped)
//! - bilinear resize to 224x224, aspect ratio not preserved
//! - scale each channel by 1/255 into [0, 1]

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

/// Side length the classifier was trained on.
pub const INPUT_SIZE: u32 = 224;
const CHANNELS: usize = 3;

/// Resize and normalize an already-decoded image.
pub fn preprocess_image(image: &DynamicImage) -> Array4<f32> {
    let rgb = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let side = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, side, side, CHANNELS));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..CHANNELS {
            tensor[[0, y as usize, x as usize, c]] = f32::from(pixel[c]) / 255.0;
        }
    }
    tensor
}

/// Decode an in-memory JPEG/PNG and preprocess it.
pub fn preprocess_bytes(bytes: &[u8]) -> Result<Array4<f32>> {
    let image = image::load_from_memory(bytes).context("failed to decode image")?;
    Ok(preprocess_image(&image))
}

pub fn preprocess_file(path: &Path) -> Result<Array4<f32>> {
    let image =
        image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(preprocess_image(&image))
}
