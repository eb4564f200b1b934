use wasm_bindgen::prelude::*;

// ============================================================================
// TERRAIN - Height field chunk with a min/max quadtree for ray queries
// ============================================================================
//
// JS owns the GPU side. It reads elevation/normal/heap/mesh bytes straight
// out of wasm memory through the pointer accessors below; pointers stay valid
// until the next call that rebuilds or reallocates (rebuild, load).

pub mod bvh;
pub mod chunk;
pub mod config;
pub mod error;
pub mod mesh;
pub mod morton;
pub mod raycast;
pub mod world;

pub use bvh::{Bounds, NodeId, TerrainBvh, TerrainHit};
pub use chunk::TerrainChunk;
pub use config::TerrainConfig;
pub use error::{Result, TerrainError};
pub use mesh::{TerrainMesh, TerrainVertex};
pub use raycast::{Ray, RayTerrainQuery};
pub use world::HeightField;

use glam::{Mat4, Vec2};
use js_sys::Float32Array;

fn js_err(err: TerrainError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Route `log` output to the browser console.
#[wasm_bindgen]
pub fn init_logging() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            let _ = console_log::init_with_level(log::Level::Debug);
        }
    }
}

#[wasm_bindgen]
pub struct TerrainWorld {
    chunk: TerrainChunk,
    mesh: TerrainMesh,
}

impl TerrainWorld {
    fn with_chunk(chunk: TerrainChunk) -> Self {
        let mesh = TerrainMesh::generate(chunk.config());
        Self { chunk, mesh }
    }
}

#[wasm_bindgen]
impl TerrainWorld {
    #[wasm_bindgen(constructor)]
    pub fn new(depth: Option<u32>, chunk_world_size: Option<f32>) -> std::result::Result<TerrainWorld, JsValue> {
        let defaults = TerrainConfig::default();
        let config = TerrainConfig {
            depth: depth.unwrap_or(defaults.depth),
            chunk_world_size: chunk_world_size.unwrap_or(defaults.chunk_world_size),
        };
        let chunk = TerrainChunk::new(config).map_err(js_err)?;
        Ok(Self::with_chunk(chunk))
    }

    pub fn resolution(&self) -> u32 {
        self.chunk.config().resolution() as u32
    }

    pub fn set_elevation(&mut self, x: u32, y: u32, value: f32) -> std::result::Result<(), JsValue> {
        self.chunk
            .set_elevation(x as usize, y as usize, value)
            .map_err(js_err)
    }

    pub fn elevation_at(&self, x: u32, y: u32) -> std::result::Result<f32, JsValue> {
        self.chunk.field().elevation(x as usize, y as usize).map_err(js_err)
    }

    /// Recompute normals and the BVH. On error the previous BVH is kept.
    pub fn rebuild(&mut self) -> std::result::Result<(), JsValue> {
        self.chunk.rebuild().map_err(js_err)
    }

    pub fn is_dirty(&self) -> bool {
        self.chunk.is_dirty()
    }

    /// [min, max] of the published BVH root.
    pub fn root_bounds(&self) -> Option<Float32Array> {
        self.chunk
            .bvh()
            .root_bounds()
            .map(|b| Float32Array::from(&[b.min, b.max][..]))
    }

    /// Terrain hit under a screen point as [x, y, z, t].
    pub fn raycast(
        &self,
        ndc_x: f32,
        ndc_y: f32,
        view_proj_inverse: &[f32],
    ) -> std::result::Result<Option<Float32Array>, JsValue> {
        if view_proj_inverse.len() != 16 {
            return Err(js_sys::Error::new("view_proj_inverse must hold 16 floats").into());
        }
        let inverse = Mat4::from_cols_slice(view_proj_inverse);
        let hit = self.chunk.query().pick(Vec2::new(ndc_x, ndc_y), inverse);
        Ok(hit.map(|h| Float32Array::from(&[h.position.x, h.position.y, h.position.z, h.t][..])))
    }

    pub fn save(&self) -> std::result::Result<Vec<u8>, JsValue> {
        let mut bytes = Vec::new();
        self.chunk.save(&mut bytes).map_err(js_err)?;
        Ok(bytes)
    }

    pub fn load(bytes: &[u8]) -> std::result::Result<TerrainWorld, JsValue> {
        let chunk = TerrainChunk::load(bytes).map_err(js_err)?;
        Ok(Self::with_chunk(chunk))
    }

    pub fn elevation_ptr(&self) -> *const u8 { self.chunk.field().elevation_bytes().as_ptr() }
    pub fn elevation_len(&self) -> usize { self.chunk.field().elevation_bytes().len() }
    pub fn normal_ptr(&self) -> *const u8 { self.chunk.field().normal_bytes().as_ptr() }
    pub fn normal_len(&self) -> usize { self.chunk.field().normal_bytes().len() }
    pub fn heap_ptr(&self) -> *const u8 { self.chunk.bvh().heap_bytes().as_ptr() }
    pub fn heap_len(&self) -> usize { self.chunk.bvh().heap_bytes().len() }
    pub fn vertex_ptr(&self) -> *const u8 { self.mesh.vertex_bytes().as_ptr() }
    pub fn vertex_len(&self) -> usize { self.mesh.vertex_bytes().len() }
    pub fn index_ptr(&self) -> *const u8 { self.mesh.index_bytes().as_ptr() }
    pub fn index_len(&self) -> usize { self.mesh.index_bytes().len() }
}
