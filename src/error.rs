use std::io;

/// All error types for the world-tiler pipeline.
#[derive(thiserror::Error, Debug)]
pub enum WorldTilerError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Missing base tile {zoom}/{x}/{y}")]
    MissingBaseTile { zoom: u32, x: u32, y: u32 },
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Mosaic error: {0}")]
    Mosaic(String),
    #[error("Terrain error: {0}")]
    Terrain(String),
    #[error("Fusion error: {0}")]
    Fusion(String),
    #[error("Mesh error: {0}")]
    Mesh(String),
    #[error("World frame error: {0}")]
    WorldFrame(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WorldTilerError>;
