// terrain.rs - Height field storage and sample queries
//
// Grid layout is row-major, index = x + y * resolution.
// Elevation is stored as half floats, normals as interleaved (nx, nz) i8 pairs.
// Both buffers are uploaded to the GPU as-is.

use half::f16;

use crate::config::TerrainConfig;
use crate::error::{Result, TerrainError};

#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    resolution: usize,
    spacing: f32,
    pub(crate) elevation: Vec<f16>,
    pub(crate) normal: Vec<i8>,
}

impl HeightField {
    /// Flat field at elevation 0 with zeroed normals.
    pub fn new(config: &TerrainConfig) -> Self {
        let resolution = config.resolution();
        let samples = resolution * resolution;
        Self {
            resolution,
            spacing: config.sample_spacing(),
            elevation: vec![f16::ZERO; samples],
            normal: vec![0; samples * 2],
        }
    }

    /// Field from row-major f32 samples; every value is validated like `set_elevation`.
    pub fn from_elevations(config: &TerrainConfig, values: &[f32]) -> Result<Self> {
        let mut field = Self::new(config);
        let expected = field.elevation.len();
        if values.len() != expected {
            return Err(TerrainError::DimensionMismatch {
                expected,
                actual: values.len(),
            });
        }
        for (i, &value) in values.iter().enumerate() {
            let (x, y) = (i % field.resolution, i / field.resolution);
            field.elevation[i] = to_half(x, y, value)?;
        }
        Ok(field)
    }

    /// Reassemble a field from persisted buffers. Lengths are checked by the caller.
    pub(crate) fn from_raw(config: &TerrainConfig, elevation: Vec<f16>, normal: Vec<i8>) -> Self {
        Self {
            resolution: config.resolution(),
            spacing: config.sample_spacing(),
            elevation,
            normal,
        }
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// World distance between neighbouring samples.
    #[inline]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.resolution || y >= self.resolution {
            return Err(TerrainError::IndexOutOfRange {
                x,
                y,
                resolution: self.resolution,
            });
        }
        Ok(x + y * self.resolution)
    }

    pub fn set_elevation(&mut self, x: usize, y: usize, value: f32) -> Result<()> {
        let idx = self.index(x, y)?;
        self.elevation[idx] = to_half(x, y, value)?;
        Ok(())
    }

    pub fn elevation(&self, x: usize, y: usize) -> Result<f32> {
        let idx = self.index(x, y)?;
        Ok(self.elevation[idx].to_f32())
    }

    /// Set every sample to `value`.
    pub fn fill(&mut self, value: f32) -> Result<()> {
        let h = to_half(0, 0, value)?;
        self.elevation.fill(h);
        Ok(())
    }

    /// Quantized (nx, nz) at a sample; (0, 0) on the border.
    pub fn normal(&self, x: usize, y: usize) -> Result<(i8, i8)> {
        let idx = self.index(x, y)?;
        Ok((self.normal[idx * 2], self.normal[idx * 2 + 1]))
    }

    /// Global (min, max) elevation.
    pub fn min_max(&self) -> (f32, f32) {
        self.elevation
            .iter()
            .map(|h| h.to_f32())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), h| (lo.min(h), hi.max(h)))
    }

    pub fn elevations(&self) -> &[f16] {
        &self.elevation
    }

    pub fn normals(&self) -> &[i8] {
        &self.normal
    }

    /// Elevation texture bytes (R16Float).
    pub fn elevation_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.elevation)
    }

    /// Normal texture bytes (RG8Snorm).
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normal)
    }
}

/// Reject values that are not finite before or after half conversion.
fn to_half(x: usize, y: usize, value: f32) -> Result<f16> {
    let h = f16::from_f32(value);
    if !value.is_finite() || !h.is_finite() {
        return Err(TerrainError::InvalidElevation { x, y, value });
    }
    Ok(h)
}
