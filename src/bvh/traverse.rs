// traverse.rs - Ray / terrain intersection
//
// World mapping: sample (x, y) -> (x * s, elevation, y * s), Y up.
// Nodes are tested as boxes: footprint on XZ, [min, max] on Y.
// Children are visited front to back; leaves are refined against the
// same two-triangles-per-quad surface the mesh draws.
// Grazing contacts count as hits, including rays lying in a triangle's plane.

use glam::{Vec2, Vec3};

use super::{Bounds, NodeId, SampleRect, TerrainBvh};
use crate::mesh::quad_triangles;

/// Contact slack per unit of chunk extent. Boxes are widened by it so rays
/// along a shared edge reach both sides; coplanar tests accept it as distance.
const SLACK_PER_UNIT: f32 = 1.0e-6;
/// Barycentric slack for hits exactly on triangle edges and vertices.
const BARY_EPSILON: f32 = 1.0e-6;
/// |det| below this fraction of |d| |e1| |e2| means the ray runs parallel to the triangle.
const PARALLEL_EPSILON: f32 = 1.0e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainHit {
    /// Distance along the ray, in units of the direction vector.
    pub t: f32,
    pub position: Vec3,
    /// Geometric normal of the hit triangle, facing up.
    pub normal: Vec3,
    /// Quad (x, y) that was hit.
    pub cell: (u32, u32),
}

struct RaySlab {
    origin: Vec3,
    dir: Vec3,
    slack: f32,
}

impl RaySlab {
    /// Entry/exit distances for a box, clipped to t >= 0.
    fn clip(&self, lo: Vec3, hi: Vec3) -> Option<(f32, f32)> {
        let mut t0 = 0.0f32;
        let mut t1 = f32::INFINITY;
        for axis in 0..3 {
            let (o, d) = (self.origin[axis], self.dir[axis]);
            let (lo, hi) = (lo[axis] - self.slack, hi[axis] + self.slack);
            if d == 0.0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut ta, mut tb) = ((lo - o) * inv, (hi - o) * inv);
            if ta > tb {
                std::mem::swap(&mut ta, &mut tb);
            }
            t0 = t0.max(ta);
            t1 = t1.min(tb);
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

impl TerrainBvh {
    /// Nearest hit along `origin + t * direction` for t >= 0.
    /// `direction` need not be normalized.
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3) -> Option<TerrainHit> {
        if !origin.is_finite() || !direction.is_finite() || direction.length_squared() == 0.0 {
            return None;
        }
        let ray = RaySlab {
            origin,
            dir: direction,
            slack: self.contact_slack(),
        };
        let mut best = None;
        self.visit(NodeId::ROOT, &ray, &mut best);
        best
    }

    /// Largest coordinate magnitude in the chunk, times the unit slack.
    fn contact_slack(&self) -> f32 {
        let extent = self
            .root_bounds()
            .map_or(0.0, |b| b.min.abs().max(b.max.abs()))
            .max(self.config.chunk_world_size)
            .max(1.0);
        extent * SLACK_PER_UNIT
    }

    fn node_entry(&self, node: NodeId, ray: &RaySlab) -> Option<(f32, SampleRect)> {
        let bounds = self.query_bounds(node)?;
        let rect = node.footprint(&self.config);
        let (lo, hi) = self.node_box(&rect, bounds);
        ray.clip(lo, hi).map(|(t_enter, _)| (t_enter, rect))
    }

    fn node_box(&self, rect: &SampleRect, bounds: Bounds) -> (Vec3, Vec3) {
        let s = self.config.sample_spacing();
        (
            Vec3::new(rect.x0 as f32 * s, bounds.min, rect.y0 as f32 * s),
            Vec3::new(rect.x1 as f32 * s, bounds.max, rect.y1 as f32 * s),
        )
    }

    fn visit(&self, node: NodeId, ray: &RaySlab, best: &mut Option<TerrainHit>) {
        let Some((t_enter, rect)) = self.node_entry(node, ray) else {
            return;
        };
        if best.as_ref().is_some_and(|hit| t_enter > hit.t) {
            return;
        }
        if node.is_leaf(&self.config) {
            self.refine_leaf(&rect, ray, best);
            return;
        }

        let mut order: Vec<(f32, NodeId)> = node
            .children()
            .into_iter()
            .filter_map(|child| self.node_entry(child, ray).map(|(t, _)| (t, child)))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (t, child) in order {
            if best.as_ref().is_some_and(|hit| t > hit.t) {
                break;
            }
            self.visit(child, ray, best);
        }
    }

    fn refine_leaf(&self, rect: &SampleRect, ray: &RaySlab, best: &mut Option<TerrainHit>) {
        let r = self.config.resolution();
        for qy in rect.y0..rect.y1 {
            for qx in rect.x0..rect.x1 {
                for tri in quad_triangles(qx, qy, r) {
                    let corners = tri.map(|i| self.vertex(i % r, i / r));
                    let Some(t) = intersect_triangle(ray, corners) else {
                        continue;
                    };
                    if best.as_ref().is_some_and(|hit| t >= hit.t) {
                        continue;
                    }
                    let mut normal = (corners[1] - corners[0])
                        .cross(corners[2] - corners[0])
                        .normalize_or_zero();
                    if normal.y < 0.0 {
                        normal = -normal;
                    }
                    *best = Some(TerrainHit {
                        t,
                        position: ray.origin + ray.dir * t,
                        normal,
                        cell: (qx as u32, qy as u32),
                    });
                }
            }
        }
    }

    #[inline]
    fn vertex(&self, x: usize, y: usize) -> Vec3 {
        let s = self.config.sample_spacing();
        Vec3::new(x as f32 * s, self.sample(x, y), y as f32 * s)
    }
}

/// Two-sided Moller-Trumbore, with a coplanar fallback for parallel rays.
fn intersect_triangle(ray: &RaySlab, [v0, v1, v2]: [Vec3; 3]) -> Option<f32> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() <= PARALLEL_EPSILON * ray.dir.length() * e1.length() * e2.length() {
        return coplanar_entry(ray, [v0, v1, v2]);
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - v0;
    let u = tvec.dot(p) * inv_det;
    if u < -BARY_EPSILON || u > 1.0 + BARY_EPSILON {
        return None;
    }
    let q = tvec.cross(e1);
    let v = ray.dir.dot(q) * inv_det;
    if v < -BARY_EPSILON || u + v > 1.0 + BARY_EPSILON {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// First t >= 0 at which a ray lying in the triangle's plane is inside it.
/// Terrain triangles never stand vertical, so the test runs on the XZ shadow.
fn coplanar_entry(ray: &RaySlab, [v0, v1, v2]: [Vec3; 3]) -> Option<f32> {
    let normal = (v1 - v0).cross(v2 - v0);
    let area = normal.length();
    if area == 0.0 || (ray.origin - v0).dot(normal).abs() > ray.slack * area {
        return None;
    }

    let flat = |v: Vec3| Vec2::new(v.x, v.z);
    let (origin, dir) = (flat(ray.origin), flat(ray.dir));
    let corners = [flat(v0), flat(v1), flat(v2)];
    let winding = (corners[1] - corners[0])
        .perp_dot(corners[2] - corners[0])
        .signum();

    let mut t0 = 0.0f32;
    let mut t1 = f32::INFINITY;
    for i in 0..3 {
        let (a, b) = (corners[i], corners[(i + 1) % 3]);
        let edge = b - a;
        // inside(t) = start + rate * t >= 0, distances scaled by |edge|
        let start = winding * edge.perp_dot(origin - a) + ray.slack * edge.length();
        let rate = winding * edge.perp_dot(dir);
        if rate == 0.0 {
            if start < 0.0 {
                return None;
            }
            continue;
        }
        let t = -start / rate;
        if rate > 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some(t0)
}
