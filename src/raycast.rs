// raycast.rs - Screen picks and camera rays against the terrain
//
// Rays come from the camera as plain vectors; nothing here touches the
// render pipeline. NDC z runs -1 (near) to 1 (far) for unprojection.

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::bvh::{TerrainBvh, TerrainHit};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Ray through a point in normalized device coordinates.
    /// `None` if the matrix is degenerate for that point.
    pub fn from_ndc(ndc: Vec2, view_proj_inverse: Mat4) -> Option<Ray> {
        let near = unproject(view_proj_inverse, Vec4::new(ndc.x, ndc.y, -1.0, 1.0))?;
        let far = unproject(view_proj_inverse, Vec4::new(ndc.x, ndc.y, 1.0, 1.0))?;
        let direction = (far - near).try_normalize()?;
        Some(Ray { origin: near, direction })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

fn unproject(inverse: Mat4, clip: Vec4) -> Option<Vec3> {
    let p = inverse * clip;
    if p.w.abs() < f32::EPSILON {
        return None;
    }
    let v = p.truncate() / p.w;
    v.is_finite().then_some(v)
}

/// Picking and camera-collision entry point over a published BVH.
#[derive(Clone)]
pub struct RayTerrainQuery {
    bvh: Arc<TerrainBvh>,
}

impl RayTerrainQuery {
    pub fn new(bvh: Arc<TerrainBvh>) -> Self {
        Self { bvh }
    }

    pub fn cast(&self, ray: &Ray) -> Option<TerrainHit> {
        self.bvh.intersect_ray(ray.origin, ray.direction)
    }

    /// Hit under a screen point.
    pub fn pick(&self, ndc: Vec2, view_proj_inverse: Mat4) -> Option<TerrainHit> {
        let ray = Ray::from_ndc(ndc, view_proj_inverse)?;
        let hit = self.cast(&ray);
        log::trace!("pick {:?} -> {:?}", ndc, hit.map(|h| h.position));
        hit
    }

    /// Hit no further than `max_distance` along a normalized ray, e.g. to
    /// keep the camera above ground.
    pub fn cast_within(&self, ray: &Ray, max_distance: f32) -> Option<TerrainHit> {
        self.cast(ray).filter(|hit| hit.t <= max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::world::HeightField;
    use approx::assert_abs_diff_eq;

    fn camera() -> Mat4 {
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.5, 0.1, 500.0);
        let view = Mat4::look_at_rh(Vec3::new(64.0, 80.0, 64.0), Vec3::new(64.0, 0.0, 63.0), Vec3::Y);
        (proj * view).inverse()
    }

    #[test]
    fn ndc_center_points_at_target() {
        let ray = Ray::from_ndc(Vec2::ZERO, camera()).unwrap();
        let expected = (Vec3::new(64.0, 0.0, 63.0) - Vec3::new(64.0, 80.0, 64.0)).normalize();
        assert_abs_diff_eq!(ray.direction.dot(expected), 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ray.direction.length(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn degenerate_matrix_yields_no_ray() {
        assert!(Ray::from_ndc(Vec2::ZERO, Mat4::ZERO).is_none());
    }

    #[test]
    fn pick_lands_on_terrain() {
        let cfg = TerrainConfig::with_depth(4);
        let mut field = HeightField::new(&cfg);
        field.fill(2.0).unwrap();
        let bvh = Arc::new(TerrainBvh::build(&cfg, &field).unwrap());
        let query = RayTerrainQuery::new(bvh);

        let hit = query.pick(Vec2::ZERO, camera()).unwrap();
        assert_abs_diff_eq!(hit.position.y, 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(hit.position.x, 64.0, epsilon = 1e-2);

        let ray = Ray::new(Vec3::new(10.0, 12.0, 10.0), Vec3::NEG_Y);
        assert!(query.cast_within(&ray, 5.0).is_none());
        let hit = query.cast_within(&ray, 10.0).unwrap();
        assert_abs_diff_eq!(ray.at(hit.t).y, 2.0, epsilon = 1e-4);
    }
}
