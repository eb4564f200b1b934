// heightmap.rs - Grayscale image to elevation samples
//
// 16-bit luminance is used so 8-bit and 16-bit PNGs both keep their precision.

use image::{DynamicImage, imageops::FilterType};

/// Resample to `resolution` x `resolution` and map luminance 0..=1 to `min..=max`.
/// Row-major, image row 0 becomes grid row y = 0.
pub fn to_elevations(img: &DynamicImage, resolution: u32, min: f32, max: f32) -> Vec<f32> {
    let luma = if img.width() == resolution && img.height() == resolution {
        img.to_luma16()
    } else {
        img.resize_exact(resolution, resolution, FilterType::Lanczos3).to_luma16()
    };
    luma.pixels()
        .map(|p| {
            let t = p.0[0] as f32 / u16::MAX as f32;
            min + (max - min) * t
        })
        .collect()
}

/// Smallest and largest value, for the summary line.
pub fn range(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
