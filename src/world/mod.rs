// world/ - Terrain sample data
//
// The height field owns elevation and derived normals.
// It knows nothing about the BVH or the renderer.

mod terrain;
mod normals;

pub use terrain::*;
pub use normals::*;
