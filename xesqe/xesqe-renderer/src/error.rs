use thiserror::Error;
use xesqe_rhi::RhiError;
use xesqe_world::{MeshError, TerrainError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Terrain(#[from] TerrainError),
}

impl AppError {
    /// True for problems with the loaded content rather than the device.
    pub fn is_content_error(&self) -> bool {
        matches!(self, AppError::Mesh(_) | AppError::Terrain(_))
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
