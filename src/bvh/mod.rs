// bvh/ - Min/max elevation quadtree over a height field
//
// One flat heap of f16 lane pairs, banded by depth (see layout.rs).
// Built once per height field snapshot and immutable afterwards;
// the BVH keeps its own copy of the elevation it was built from so
// ray queries never observe a field edited after the build.

mod build;
pub mod layout;
mod traverse;

use half::f16;
use web_time::Instant;

use crate::config::TerrainConfig;
use crate::error::{Result, TerrainError};
use crate::world::HeightField;

pub use layout::{NodeId, SampleRect};
pub use traverse::TerrainHit;

/// Elevation interval of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    #[inline]
    pub fn contains_value(&self, h: f32) -> bool {
        self.min <= h && h <= self.max
    }

    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    /// `None` for the empty marker (min > max) or NaN lanes.
    #[inline]
    pub(crate) fn from_slot(slot: build::Slot) -> Option<Bounds> {
        let (min, max) = (slot[0].to_f32(), slot[1].to_f32());
        (min <= max).then_some(Bounds { min, max })
    }

    #[inline]
    pub(crate) fn to_slot(bounds: Option<Bounds>) -> build::Slot {
        match bounds {
            Some(b) => [f16::from_f32(b.min), f16::from_f32(b.max)],
            None => build::EMPTY_SLOT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainBvh {
    config: TerrainConfig,
    heap: Vec<f16>,
    samples: Vec<f16>,
}

impl TerrainBvh {
    pub fn build(config: &TerrainConfig, field: &HeightField) -> Result<Self> {
        config.validate()?;
        if field.resolution() != config.resolution() {
            return Err(TerrainError::DimensionMismatch {
                expected: config.resolution(),
                actual: field.resolution(),
            });
        }

        let started = Instant::now();
        let mut heap = vec![f16::ZERO; config.heap_len()];
        let root = build::build_heap(config, field, &mut heap);
        log::debug!(
            "bvh built: depth {}, {} nodes, root {:?} in {:?}",
            config.depth,
            config.node_count(),
            root,
            started.elapsed()
        );

        Ok(Self {
            config: *config,
            heap,
            samples: field.elevations().to_vec(),
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn depth(&self) -> u32 {
        self.config.depth
    }

    /// `None` for nodes outside the tree and for nodes with no samples.
    #[inline]
    pub fn query_bounds(&self, node: NodeId) -> Option<Bounds> {
        if !node.is_valid(&self.config) {
            return None;
        }
        let slot = node.heap_slot();
        Bounds::from_slot([self.heap[slot], self.heap[slot + 1]])
    }

    pub fn root_bounds(&self) -> Option<Bounds> {
        self.query_bounds(NodeId::ROOT)
    }

    pub fn heap(&self) -> &[f16] {
        &self.heap
    }

    /// Heap bytes for a storage buffer upload.
    pub fn heap_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.heap)
    }

    pub(crate) fn samples(&self) -> &[f16] {
        &self.samples
    }

    #[inline]
    pub(crate) fn sample(&self, x: usize, y: usize) -> f32 {
        self.samples[x + y * self.config.resolution()].to_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_resolution_is_rejected() {
        let field = HeightField::new(&TerrainConfig::with_depth(3));
        let err = TerrainBvh::build(&TerrainConfig::with_depth(4), &field).unwrap_err();
        assert!(matches!(err, TerrainError::DimensionMismatch { expected: 32, actual: 16 }));
    }

    #[test]
    fn flat_field_has_flat_bounds_everywhere() {
        let cfg = TerrainConfig::with_depth(2);
        let mut field = HeightField::new(&cfg);
        field.fill(3.5).unwrap();
        let bvh = TerrainBvh::build(&cfg, &field).unwrap();
        for d in 0..=2 {
            for i in 0..layout::band_len(d) as u32 {
                assert_eq!(bvh.query_bounds(NodeId::new(d, i)), Some(Bounds::new(3.5, 3.5)));
            }
        }
        assert_eq!(bvh.heap().len(), cfg.heap_len());
        assert_eq!(bvh.heap_bytes().len(), cfg.heap_len() * 2);
    }

    #[test]
    fn out_of_tree_nodes_have_no_bounds() {
        let cfg = TerrainConfig::with_depth(2);
        let bvh = TerrainBvh::build(&cfg, &HeightField::new(&cfg)).unwrap();
        assert_eq!(bvh.query_bounds(NodeId::new(3, 0)), None);
        assert_eq!(bvh.query_bounds(NodeId::new(1, 4)), None);
    }

    #[test]
    fn empty_slot_round_trips_as_none() {
        assert_eq!(Bounds::from_slot(Bounds::to_slot(None)), None);
        let b = Bounds::new(-1.0, 2.0);
        assert_eq!(Bounds::from_slot(Bounds::to_slot(Some(b))), Some(b));
        assert!(b.contains(&Bounds::new(0.0, 2.0)));
        assert!(!b.contains(&Bounds::new(0.0, 2.5)));
        assert!(b.contains_value(-1.0));
    }
}
