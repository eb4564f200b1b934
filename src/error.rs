// error.rs - Terrain error kinds
//
// All errors are local and recoverable; none are retried.

#[derive(thiserror::Error, Debug)]
pub enum TerrainError {
    #[error("sample ({x}, {y}) outside {resolution}x{resolution} grid")]
    IndexOutOfRange { x: usize, y: usize, resolution: usize },

    #[error("elevation {value} at ({x}, {y}) is not a finite half-precision value")]
    InvalidElevation { x: usize, y: usize, value: f32 },

    #[error("height field resolution {actual} does not match BVH resolution {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("persisted terrain incompatible: {0}")]
    FormatMismatch(String),

    #[error("invalid terrain config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerrainError {
    pub fn format<T: ToString>(msg: T) -> Self {
        TerrainError::FormatMismatch(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;
