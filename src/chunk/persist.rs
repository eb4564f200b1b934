// persist.rs - Binary dump of a chunk
//
// Layout (little-endian):
//   magic "TBVH" | version u32 | depth u32 | resolution u32 | world size f32
//   elevation  R*R   f16
//   normals    R*R*2 i8
//   heap       2 * nodes f16
//
// Loading fails fast on any header or length mismatch. The stored heap must
// match the one derived from the stored elevation, lane for lane.

use std::io::{Read, Write};
use std::sync::Arc;

use half::f16;

use super::TerrainChunk;
use crate::bvh::TerrainBvh;
use crate::config::TerrainConfig;
use crate::error::{Result, TerrainError};
use crate::world::HeightField;

pub const FORMAT_MAGIC: [u8; 4] = *b"TBVH";
pub const FORMAT_VERSION: u32 = 1;

impl TerrainChunk {
    pub fn save<W: Write>(&self, mut out: W) -> Result<()> {
        // Never pair edited elevation with a heap built from older samples
        let fresh;
        let bvh = if self.bvh.samples() == self.field.elevations() {
            &*self.bvh
        } else {
            fresh = TerrainBvh::build(&self.config, &self.field)?;
            &fresh
        };

        out.write_all(&FORMAT_MAGIC)?;
        out.write_all(&FORMAT_VERSION.to_le_bytes())?;
        out.write_all(&self.config.depth.to_le_bytes())?;
        out.write_all(&(self.config.resolution() as u32).to_le_bytes())?;
        out.write_all(&self.config.chunk_world_size.to_le_bytes())?;
        write_f16s(&mut out, self.field.elevations())?;
        out.write_all(bytemuck::cast_slice(self.field.normals()))?;
        write_f16s(&mut out, bvh.heap())?;
        out.flush()?;
        log::info!(
            "saved terrain chunk: depth {}, {} samples, {} heap lanes",
            self.config.depth,
            self.field.elevations().len(),
            bvh.heap().len()
        );
        Ok(())
    }

    pub fn load<R: Read>(mut input: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        read_exact(&mut input, &mut magic, "magic")?;
        if magic != FORMAT_MAGIC {
            return Err(TerrainError::format(format!("bad magic {:?}", magic)));
        }
        let version = read_u32(&mut input, "version")?;
        if version != FORMAT_VERSION {
            return Err(TerrainError::format(format!(
                "version {} unsupported (expected {})",
                version, FORMAT_VERSION
            )));
        }
        let depth = read_u32(&mut input, "depth")?;
        let resolution = read_u32(&mut input, "resolution")? as usize;
        let chunk_world_size = f32::from_bits(read_u32(&mut input, "world size")?);

        let config = TerrainConfig { depth, chunk_world_size };
        config
            .validate()
            .map_err(|err| TerrainError::format(err.to_string()))?;
        if resolution != config.resolution() {
            return Err(TerrainError::format(format!(
                "resolution {} does not match depth {} (expected {})",
                resolution,
                depth,
                config.resolution()
            )));
        }

        let samples = resolution * resolution;
        let elevation = read_f16s(&mut input, samples, "elevation")?;
        if let Some(bad) = elevation.iter().position(|h| !h.is_finite()) {
            return Err(TerrainError::format(format!(
                "non-finite elevation at ({}, {})",
                bad % resolution,
                bad / resolution
            )));
        }
        let mut normal = vec![0u8; samples * 2];
        read_exact(&mut input, &mut normal, "normals")?;
        let normal: Vec<i8> = bytemuck::cast_slice(&normal).to_vec();
        let heap = read_f16s(&mut input, config.heap_len(), "heap")?;

        let mut trailing = [0u8; 1];
        if input.read(&mut trailing)? != 0 {
            return Err(TerrainError::format("trailing bytes after heap"));
        }

        let field = HeightField::from_raw(&config, elevation, normal);
        let bvh = TerrainBvh::build(&config, &field)?;
        if let Some(lane) = heap
            .iter()
            .zip(bvh.heap())
            .position(|(stored, derived)| stored.to_bits() != derived.to_bits())
        {
            return Err(TerrainError::format(format!(
                "heap lane {} is {} but the elevation gives {}",
                lane,
                heap[lane],
                bvh.heap()[lane]
            )));
        }
        log::info!("loaded terrain chunk: depth {}, root {:?}", depth, bvh.root_bounds());
        Ok(Self {
            config,
            field,
            bvh: Arc::new(bvh),
            dirty: false,
        })
    }
}

fn write_f16s<W: Write>(out: &mut W, values: &[f16]) -> Result<()> {
    let mut buf = Vec::with_capacity(values.len() * 2);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    out.write_all(&buf)?;
    Ok(())
}

fn read_exact<R: Read>(input: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    input.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => TerrainError::format(format!("truncated {}", what)),
        _ => TerrainError::Io(err),
    })
}

fn read_u32<R: Read>(input: &mut R, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(input, &mut buf, what)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f16s<R: Read>(input: &mut R, count: usize, what: &str) -> Result<Vec<f16>> {
    let mut buf = vec![0u8; count * 2];
    read_exact(input, &mut buf, what)?;
    Ok(buf
        .chunks_exact(2)
        .map(|b| f16::from_le_bytes([b[0], b[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::Bounds;

    fn sample_chunk() -> TerrainChunk {
        let mut chunk = TerrainChunk::new(TerrainConfig::with_depth(3)).unwrap();
        chunk.set_elevation(2, 3, -1.25).unwrap();
        chunk.set_elevation(9, 9, 6.5).unwrap();
        chunk.rebuild().unwrap();
        chunk
    }

    #[test]
    fn dump_restores_field_and_tree() {
        let chunk = sample_chunk();
        let mut bytes = Vec::new();
        chunk.save(&mut bytes).unwrap();

        let loaded = TerrainChunk::load(bytes.as_slice()).unwrap();
        assert_eq!(loaded.config(), chunk.config());
        assert_eq!(loaded.field(), chunk.field());
        assert_eq!(*loaded.bvh(), *chunk.bvh());
        assert_eq!(loaded.bvh().root_bounds(), Some(Bounds::new(-1.25, 6.5)));
    }

    #[test]
    fn unsaved_edits_are_dumped_with_matching_heap() {
        let mut chunk = sample_chunk();
        chunk.set_elevation(0, 0, 20.0).unwrap();
        let mut bytes = Vec::new();
        chunk.save(&mut bytes).unwrap();
        let loaded = TerrainChunk::load(bytes.as_slice()).unwrap();
        assert_eq!(loaded.bvh().root_bounds(), Some(Bounds::new(-1.25, 20.0)));
    }

    #[test]
    fn header_mismatches_fail_fast() {
        let mut bytes = Vec::new();
        sample_chunk().save(&mut bytes).unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(TerrainChunk::load(bad_magic.as_slice()), Err(TerrainError::FormatMismatch(_))));

        let mut bad_version = bytes.clone();
        bad_version[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(TerrainChunk::load(bad_version.as_slice()), Err(TerrainError::FormatMismatch(_))));

        let mut bad_resolution = bytes.clone();
        bad_resolution[12..16].copy_from_slice(&32u32.to_le_bytes());
        assert!(matches!(TerrainChunk::load(bad_resolution.as_slice()), Err(TerrainError::FormatMismatch(_))));

        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(TerrainChunk::load(truncated), Err(TerrainError::FormatMismatch(_))));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(TerrainChunk::load(trailing.as_slice()), Err(TerrainError::FormatMismatch(_))));
    }

    #[test]
    fn corrupted_heap_is_rejected() {
        let mut bytes = Vec::new();
        sample_chunk().save(&mut bytes).unwrap();
        let cfg = TerrainConfig::with_depth(3);
        let heap_start = bytes.len() - cfg.heap_len() * 2;

        // root min lane
        let mut nan_root = bytes.clone();
        nan_root[heap_start..heap_start + 2].copy_from_slice(&f16::NAN.to_le_bytes());
        assert!(matches!(TerrainChunk::load(nan_root.as_slice()), Err(TerrainError::FormatMismatch(_))));

        // a leaf max lane that no longer matches its samples
        let mut stale_leaf = bytes.clone();
        let last = bytes.len() - 2;
        stale_leaf[last..].copy_from_slice(&f16::from_f32(100.0).to_le_bytes());
        assert!(matches!(TerrainChunk::load(stale_leaf.as_slice()), Err(TerrainError::FormatMismatch(_))));

        // swapped lanes, min > max
        let mut inverted = bytes;
        inverted.swap(heap_start, heap_start + 2);
        inverted.swap(heap_start + 1, heap_start + 3);
        assert!(matches!(TerrainChunk::load(inverted.as_slice()), Err(TerrainError::FormatMismatch(_))));
    }

    #[test]
    fn header_is_little_endian() {
        let mut bytes = Vec::new();
        sample_chunk().save(&mut bytes).unwrap();
        assert_eq!(&bytes[..4], b"TBVH");
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3);
        let cfg = TerrainConfig::with_depth(3);
        assert_eq!(bytes.len(), 20 + 16 * 16 * 2 + 16 * 16 * 2 + cfg.heap_len() * 2);
    }
}
