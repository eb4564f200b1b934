// config.rs - Chunk dimensions and derived layout sizes
//
// Everything else is derived from the tree depth:
//   leaf grid   = 2^depth per axis
//   sample grid = 2 * leaf grid per axis (each leaf owns a 2x2 block)
//   heap        = 2 lanes (min, max) per node, levels 0..=depth

use crate::error::{Result, TerrainError};

pub const DEFAULT_DEPTH: u32 = 8;
pub const DEFAULT_CHUNK_WORLD_SIZE: f32 = 128.0;

/// Morton codes are u32 with 16 bits per axis, and the heap must stay allocatable.
pub const MAX_DEPTH: u32 = 12;

/// Scalars per heap node: min and max elevation.
pub const LANES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainConfig {
    pub depth: u32,
    pub chunk_world_size: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            chunk_world_size: DEFAULT_CHUNK_WORLD_SIZE,
        }
    }
}

impl TerrainConfig {
    pub fn with_depth(depth: u32) -> Self {
        Self { depth, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 || self.depth > MAX_DEPTH {
            return Err(TerrainError::InvalidConfig(format!(
                "depth {} outside 1..={}",
                self.depth, MAX_DEPTH
            )));
        }
        if !self.chunk_world_size.is_finite() || self.chunk_world_size <= 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "chunk world size {} must be finite and positive",
                self.chunk_world_size
            )));
        }
        Ok(())
    }

    /// Samples per axis (R).
    #[inline]
    pub fn resolution(&self) -> usize {
        1 << (self.depth + 1)
    }

    /// Leaves per axis.
    #[inline]
    pub fn leaf_dim(&self) -> usize {
        1 << self.depth
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        1 << (2 * self.depth)
    }

    /// Nodes across all levels, root included.
    #[inline]
    pub fn node_count(&self) -> usize {
        ((1usize << (2 * (self.depth + 1))) - 1) / 3
    }

    #[inline]
    pub fn heap_len(&self) -> usize {
        self.node_count() * LANES
    }

    /// World distance between neighbouring samples.
    #[inline]
    pub fn sample_spacing(&self) -> f32 {
        self.chunk_world_size / (self.resolution() - 1) as f32
    }
}
