use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("cannot read mesh {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed OBJ data: {0}")]
    Parse(#[from] tobj::LoadError),

    #[error("mesh {0} contains no triangles")]
    Empty(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum TerrainError {
    #[error("terrain grid needs at least 2x2 samples, got {rows}x{cols}")]
    GridTooSmall { rows: usize, cols: usize },

    #[error("terrain extent must be positive, got {width}x{depth}")]
    InvalidExtent { width: f32, depth: f32 },
}
