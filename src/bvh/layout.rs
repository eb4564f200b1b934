// layout.rs - Implicit quadtree heap addressing
//
// Heap layout (node units, 2 f16 lanes per node):
//   band d starts at (4^d - 1) / 3 and holds 4^d nodes
//   node index within a band is the Morton code of its (x, y) at that level
//   children of node n live at 4n + quadrant in the next band
//   quadrant bit 0 = +x half, bit 1 = +y half

use crate::config::{LANES, TerrainConfig};
use crate::morton;

/// First node of band `depth`.
#[inline]
pub const fn band_offset(depth: u32) -> usize {
    ((1usize << (2 * depth)) - 1) / 3
}

/// Nodes in band `depth`.
#[inline]
pub const fn band_len(depth: u32) -> usize {
    1usize << (2 * depth)
}

#[inline]
pub const fn child_index(parent: u32, quadrant: u32) -> u32 {
    parent * 4 + quadrant
}

#[inline]
pub const fn parent_index(child: u32) -> u32 {
    child / 4
}

/// Inclusive rectangle of sample coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRect {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl SampleRect {
    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub depth: u32,
    pub index: u32,
}

impl NodeId {
    pub const ROOT: NodeId = NodeId { depth: 0, index: 0 };

    pub const fn new(depth: u32, index: u32) -> Self {
        Self { depth, index }
    }

    /// Node at grid cell (x, y) of level `depth`.
    pub fn at(depth: u32, x: u32, y: u32) -> Self {
        Self::new(depth, morton::interleave(x, y))
    }

    pub fn child(&self, quadrant: u32) -> NodeId {
        debug_assert!(quadrant < 4);
        NodeId::new(self.depth + 1, child_index(self.index, quadrant))
    }

    pub fn children(&self) -> [NodeId; 4] {
        [self.child(0), self.child(1), self.child(2), self.child(3)]
    }

    pub fn parent(&self) -> Option<NodeId> {
        (self.depth > 0).then(|| NodeId::new(self.depth - 1, parent_index(self.index)))
    }

    /// Grid cell of this node within its level.
    #[inline]
    pub fn cell(&self) -> (u32, u32) {
        morton::deinterleave(self.index)
    }

    pub fn is_valid(&self, config: &TerrainConfig) -> bool {
        self.depth <= config.depth && (self.index as usize) < band_len(self.depth)
    }

    pub fn is_leaf(&self, config: &TerrainConfig) -> bool {
        self.depth == config.depth
    }

    /// Position of the node's first lane in the flat heap.
    #[inline]
    pub fn heap_slot(&self) -> usize {
        (band_offset(self.depth) + self.index as usize) * LANES
    }

    /// Samples covered by this node, including the one-sample overlap
    /// each leaf shares with its +x / +y neighbours.
    pub fn footprint(&self, config: &TerrainConfig) -> SampleRect {
        let span = 1usize << (config.depth - self.depth);
        let last = config.resolution() - 1;
        let (cx, cy) = self.cell();
        let x0 = 2 * cx as usize * span;
        let y0 = 2 * cy as usize * span;
        SampleRect {
            x0,
            y0,
            x1: (x0 + 2 * span).min(last),
            y1: (y0 + 2 * span).min(last),
        }
    }
}
