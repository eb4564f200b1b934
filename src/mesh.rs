// mesh.rs - Flat grid mesh for the terrain draw call
//
// One vertex per sample: (x, z) world position on the ground plane + uv.
// The vertex shader reads elevation from the height texture, so the mesh
// itself never changes when the terrain is edited.
//
// Quad triangulation (p = x + y * R):
//   [p, p + R, p + 1]  [p + 1, p + R, p + R + 1]

use bytemuck::{Pod, Zeroable};

use crate::config::TerrainConfig;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Sample indices of the two triangles of quad (x, y).
#[inline]
pub fn quad_triangles(x: usize, y: usize, resolution: usize) -> [[usize; 3]; 2] {
    let p = x + y * resolution;
    [
        [p, p + resolution, p + 1],
        [p + 1, p + resolution, p + resolution + 1],
    ]
}

pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

impl TerrainMesh {
    pub fn generate(config: &TerrainConfig) -> Self {
        let r = config.resolution();
        let quads = r - 1;
        let world = config.chunk_world_size;

        let mut vertices = Vec::with_capacity(r * r);
        for y in 0..r {
            for x in 0..r {
                let u = x as f32 / quads as f32;
                let v = y as f32 / quads as f32;
                vertices.push(TerrainVertex {
                    position: [u * world, v * world],
                    uv: [u, v],
                });
            }
        }

        let mut indices = Vec::with_capacity(quads * quads * 6);
        for y in 0..quads {
            for x in 0..quads {
                for tri in quad_triangles(x, y, r) {
                    indices.extend(tri.iter().map(|&i| i as u32));
                }
            }
        }

        log::debug!("terrain mesh: {} vertices, {} indices", vertices.len(), indices.len());
        Self { vertices, indices }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
