// chunk/ - One terrain chunk: height field + published BVH
//
// Edits go to the height field; `rebuild` derives normals and a fresh BVH
// and swaps it in only once complete. Readers holding the previous Arc keep
// a consistent tree for as long as they need it.

mod persist;

use std::sync::Arc;

use crate::bvh::TerrainBvh;
use crate::config::TerrainConfig;
use crate::error::Result;
use crate::raycast::RayTerrainQuery;
use crate::world::HeightField;

pub use persist::{FORMAT_MAGIC, FORMAT_VERSION};

pub struct TerrainChunk {
    config: TerrainConfig,
    field: HeightField,
    bvh: Arc<TerrainBvh>,
    dirty: bool,
}

impl TerrainChunk {
    pub fn new(config: TerrainConfig) -> Result<Self> {
        config.validate()?;
        let field = HeightField::new(&config);
        let bvh = Arc::new(TerrainBvh::build(&config, &field)?);
        Ok(Self {
            config,
            field,
            bvh,
            dirty: false,
        })
    }

    /// Chunk over an existing field, with normals derived and the BVH published.
    pub fn from_field(config: TerrainConfig, mut field: HeightField) -> Result<Self> {
        config.validate()?;
        field.compute_normals();
        let bvh = Arc::new(TerrainBvh::build(&config, &field)?);
        Ok(Self {
            config,
            field,
            bvh,
            dirty: false,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    /// Edits are not visible to queries until `rebuild`.
    pub fn set_elevation(&mut self, x: usize, y: usize, value: f32) -> Result<()> {
        self.field.set_elevation(x, y, value)?;
        self.dirty = true;
        Ok(())
    }

    /// Currently published BVH.
    pub fn bvh(&self) -> Arc<TerrainBvh> {
        Arc::clone(&self.bvh)
    }

    pub fn query(&self) -> RayTerrainQuery {
        RayTerrainQuery::new(self.bvh())
    }

    /// Field has edits the published BVH does not reflect.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute normals and publish a new BVH. On failure the previous
    /// BVH stays published.
    pub fn rebuild(&mut self) -> Result<()> {
        self.field.compute_normals();
        match TerrainBvh::build(&self.config, &self.field) {
            Ok(bvh) => {
                self.bvh = Arc::new(bvh);
                self.dirty = false;
                log::info!("terrain rebuilt, root bounds {:?}", self.bvh.root_bounds());
                Ok(())
            }
            Err(err) => {
                log::warn!("terrain rebuild failed, keeping previous bvh: {}", err);
                Err(err)
            }
        }
    }
}
