// normals.rs - Surface normals from elevation
//
// Central differences over interior samples only; the border keeps (0, 0).
// Components are quantized to i8 by truncation toward zero.

use glam::Vec3;

use super::HeightField;

/// Quantize the X and Z components of the surface normal for the given
/// central differences (right - left, down - up) at sample spacing `spacing`.
#[inline]
pub fn quantize_normal(dh_x: f32, dh_z: f32, spacing: f32) -> (i8, i8) {
    let xz = -2.0 * spacing;
    let v1 = Vec3::new(xz, dh_x, 0.0);
    let v2 = Vec3::new(0.0, dh_z, xz);
    let n = v2.cross(v1).normalize_or_zero();
    ((n.x * 127.0) as i8, (n.z * 127.0) as i8)
}

impl HeightField {
    /// Recompute every interior normal from the current elevation.
    pub fn compute_normals(&mut self) {
        let r = self.resolution();
        let spacing = self.spacing();
        for y in 1..r - 1 {
            for x in 1..r - 1 {
                let idx = x + y * r;
                let dh_x = self.elevation[idx + 1].to_f32() - self.elevation[idx - 1].to_f32();
                let dh_z = self.elevation[idx + r].to_f32() - self.elevation[idx - r].to_f32();
                let (nx, nz) = quantize_normal(dh_x, dh_z, spacing);
                self.normal[idx * 2] = nx;
                self.normal[idx * 2 + 1] = nz;
            }
        }
        log::debug!("normals recomputed for {}x{} field", r, r);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;

    #[test]
    fn flat_ground_points_straight_up() {
        assert_eq!(quantize_normal(0.0, 0.0, 0.25), (0, 0));
    }

    #[test]
    fn slope_tilts_only_its_axis() {
        let (nx, nz) = quantize_normal(1.0, 0.0, 0.5);
        // cross(v2, v1) = (2s*dx, 4s^2, 2s*dz) -> (1, 1, 0) / sqrt(2)
        assert_eq!(nx, 89);
        assert_eq!(nz, 0);
        let (nx, nz) = quantize_normal(0.0, -1.0, 0.5);
        assert_eq!(nx, 0);
        assert_eq!(nz, -89);
    }

    #[test]
    fn interior_normals_stay_in_unit_disc() {
        let cfg = TerrainConfig::with_depth(3);
        let mut field = HeightField::new(&cfg);
        let r = field.resolution();
        for y in 0..r {
            for x in 0..r {
                let h = ((x * 7 + y * 13) % 11) as f32 * 3.0 - 15.0;
                field.set_elevation(x, y, h).unwrap();
            }
        }
        field.compute_normals();
        for y in 1..r - 1 {
            for x in 1..r - 1 {
                let (nx, nz) = field.normal(x, y).unwrap();
                let len_sq = nx as i32 * nx as i32 + nz as i32 * nz as i32;
                assert!(len_sq <= 127 * 127, "({x}, {y}) -> ({nx}, {nz})");
            }
        }
    }

    #[test]
    fn border_keeps_default_normal() {
        let cfg = TerrainConfig::with_depth(2);
        let mut field = HeightField::new(&cfg);
        let r = field.resolution();
        for y in 0..r {
            for x in 0..r {
                field.set_elevation(x, y, (x * x + y) as f32).unwrap();
            }
        }
        field.compute_normals();
        for i in 0..r {
            assert_eq!(field.normal(i, 0).unwrap(), (0, 0));
            assert_eq!(field.normal(0, i).unwrap(), (0, 0));
            assert_eq!(field.normal(i, r - 1).unwrap(), (0, 0));
            assert_eq!(field.normal(r - 1, i).unwrap(), (0, 0));
        }
        assert_ne!(field.normal(2, 2).unwrap(), (0, 0));
    }
}
