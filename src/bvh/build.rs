// build.rs - Bottom-up min/max construction
//
// 1. Leaf band: min/max of the up-to-3x3 samples anchored at (2lx, 2ly).
// 2. Every band above: min/max over the four children, written by a
//    recursive builder that owns disjoint sub-slices of each deeper band.
//
// Empty nodes are stored as [+inf, -inf] and never merged into a parent.

use half::f16;

use super::Bounds;
use crate::config::{LANES, TerrainConfig};
use crate::morton;
use crate::world::HeightField;

pub(crate) type Slot = [f16; LANES];

pub(crate) const EMPTY_SLOT: Slot = [f16::INFINITY, f16::NEG_INFINITY];

/// Fill `heap` (length `config.heap_len()`) from `field`. Returns the root bound.
pub(crate) fn build_heap(config: &TerrainConfig, field: &HeightField, heap: &mut [f16]) -> Option<Bounds> {
    let nodes: &mut [Slot] = bytemuck::cast_slice_mut(heap);

    let mut bands: Vec<&mut [Slot]> = Vec::with_capacity(config.depth as usize + 1);
    let mut rest = nodes;
    for d in 0..=config.depth {
        let (band, tail) = std::mem::take(&mut rest).split_at_mut(1 << (2 * d));
        bands.push(band);
        rest = tail;
    }
    debug_assert!(rest.is_empty());

    if let Some(leaves) = bands.last_mut() {
        fill_leaves(field, leaves);
    }
    aggregate(bands, true)
}

/// Bound of the samples a leaf covers, or `EMPTY_SLOT` if none are in range.
fn leaf_slot(elevation: &[f16], resolution: usize, leaf: usize) -> Slot {
    let (lx, ly) = morton::deinterleave(leaf as u32);
    let (x0, y0) = (2 * lx as usize, 2 * ly as usize);
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for y in y0..(y0 + 3).min(resolution) {
        for x in x0..(x0 + 3).min(resolution) {
            let h = elevation[x + y * resolution].to_f32();
            lo = lo.min(h);
            hi = hi.max(h);
        }
    }
    [f16::from_f32(lo), f16::from_f32(hi)]
}

fn fill_leaves(field: &HeightField, leaves: &mut [Slot]) {
    let elevation = field.elevations();
    let resolution = field.resolution();

    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            for (i, slot) in leaves.iter_mut().enumerate() {
                *slot = leaf_slot(elevation, resolution, i);
            }
        } else {
            use rayon::prelude::*;
            leaves
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, slot)| *slot = leaf_slot(elevation, resolution, i));
        }
    }
}

/// `levels[0]` holds this node; `levels[k]` holds its 4^k descendants at relative depth k.
/// Returns the bound written for this node.
fn aggregate(mut levels: Vec<&mut [Slot]>, parallel: bool) -> Option<Bounds> {
    let node = levels.remove(0);
    if levels.is_empty() {
        return Bounds::from_slot(node[0]);
    }

    // Morton order keeps each quadrant's descendants contiguous within every band
    let mut quads: [Vec<&mut [Slot]>; 4] = Default::default();
    for band in levels {
        let quarter = band.len() / 4;
        for (q, chunk) in band.chunks_mut(quarter).enumerate() {
            quads[q].push(chunk);
        }
    }

    let children = reduce_quadrants(quads, parallel);
    let merged = children
        .into_iter()
        .flatten()
        .reduce(|a, b| a.union(b));

    node[0] = Bounds::to_slot(merged);
    merged
}

#[cfg(not(target_arch = "wasm32"))]
fn reduce_quadrants(quads: [Vec<&mut [Slot]>; 4], parallel: bool) -> [Option<Bounds>; 4] {
    if !parallel {
        return quads.map(|q| aggregate(q, false));
    }
    let [q0, q1, q2, q3] = quads;
    let ((a, b), (c, d)) = rayon::join(
        move || rayon::join(move || aggregate(q0, false), move || aggregate(q1, false)),
        move || rayon::join(move || aggregate(q2, false), move || aggregate(q3, false)),
    );
    [a, b, c, d]
}

#[cfg(target_arch = "wasm32")]
fn reduce_quadrants(quads: [Vec<&mut [Slot]>; 4], _parallel: bool) -> [Option<Bounds>; 4] {
    quads.map(|q| aggregate(q, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(depth: u32, f: impl Fn(usize, usize) -> f32) -> (TerrainConfig, HeightField) {
        let cfg = TerrainConfig::with_depth(depth);
        let mut field = HeightField::new(&cfg);
        let r = field.resolution();
        for y in 0..r {
            for x in 0..r {
                field.set_elevation(x, y, f(x, y)).unwrap();
            }
        }
        (cfg, field)
    }

    #[test]
    fn leaf_covers_three_by_three_neighbourhood() {
        let (_, field) = field(2, |x, y| (x + 10 * y) as f32);
        // leaf (1, 0) -> samples x 2..=4, y 0..=2
        let slot = leaf_slot(field.elevations(), 8, morton::interleave(1, 0) as usize);
        assert_eq!(slot, [f16::from_f32(2.0), f16::from_f32(24.0)]);
        // last leaf is clipped to the grid edge: x 6..=7, y 6..=7
        let slot = leaf_slot(field.elevations(), 8, morton::interleave(3, 3) as usize);
        assert_eq!(slot, [f16::from_f32(66.0), f16::from_f32(77.0)]);
    }

    #[test]
    fn leaf_outside_grid_is_empty() {
        let (_, field) = field(1, |_, _| 1.0);
        // resolution 4: a leaf anchored at x = 4 sees nothing
        let slot = leaf_slot(field.elevations(), 4, morton::interleave(2, 0) as usize);
        assert_eq!(slot, EMPTY_SLOT);
        assert_eq!(Bounds::from_slot(slot), None);
    }

    #[test]
    fn parents_merge_children() {
        let (cfg, field) = field(3, |x, y| ((x * 31 + y * 17) % 23) as f32 - 11.0);
        let mut heap = vec![f16::ZERO; cfg.heap_len()];
        let root = build_heap(&cfg, &field, &mut heap).unwrap();
        assert_eq!((root.min, root.max), field.min_max());

        let nodes: &[Slot] = bytemuck::cast_slice(&heap);
        for d in 0..cfg.depth {
            let base = crate::bvh::layout::band_offset(d);
            let next = crate::bvh::layout::band_offset(d + 1);
            for i in 0..(1usize << (2 * d)) {
                let parent = nodes[base + i];
                let kids = &nodes[next + 4 * i..next + 4 * i + 4];
                let lo = kids.iter().map(|k| k[0].to_f32()).fold(f32::INFINITY, f32::min);
                let hi = kids.iter().map(|k| k[1].to_f32()).fold(f32::NEG_INFINITY, f32::max);
                assert_eq!(parent, [f16::from_f32(lo), f16::from_f32(hi)]);
            }
        }
    }

    #[test]
    fn sequential_and_parallel_builds_agree() {
        let (cfg, field) = field(4, |x, y| ((x ^ y) % 9) as f32 * 0.5);
        let mut a = vec![f16::ZERO; cfg.heap_len()];
        build_heap(&cfg, &field, &mut a);

        let mut b = vec![f16::ZERO; cfg.heap_len()];
        {
            let nodes: &mut [Slot] = bytemuck::cast_slice_mut(&mut b);
            let mut bands: Vec<&mut [Slot]> = Vec::new();
            let mut rest = nodes;
            for d in 0..=cfg.depth {
                let (band, tail) = std::mem::take(&mut rest).split_at_mut(1 << (2 * d));
                bands.push(band);
                rest = tail;
            }
            fill_leaves(&field, bands.last_mut().unwrap());
            aggregate(bands, false);
        }
        assert_eq!(a, b);
    }
}
