use thiserror::Error;

use crate::{FenceValue, ResourceId, ResourceState};

/// Errors raised by RHI devices and command lists. All of them are fatal to the caller's setup step.
#[derive(Error, Debug)]
pub enum RhiError {
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    #[error("failed to create {label}: {reason}")]
    ResourceCreation { label: String, reason: String },

    #[error("pipeline '{label}' failed to compile: {message}")]
    ShaderCompilation { label: String, message: String },

    #[error("resource {0} does not belong to this device")]
    ForeignResource(ResourceId),

    #[error("buffer {0} is not host-visible")]
    NotHostVisible(ResourceId),

    #[error("zero-sized buffer '{0}'")]
    EmptyBuffer(String),

    #[error("write of {len} bytes at offset {offset} overflows buffer {id} ({size} bytes)")]
    WriteOutOfBounds {
        id: ResourceId,
        offset: u64,
        len: u64,
        size: u64,
    },

    #[error("resource {resource} barrier expects {expected:?} but it is in {actual:?}")]
    StateMismatch {
        resource: ResourceId,
        expected: ResourceState,
        actual: ResourceState,
    },

    #[error("command list: {0}")]
    InvalidCommandList(String),

    #[error("command allocator still in flight: needs fence {retire_at}, completed {completed}")]
    AllocatorInUse {
        retire_at: FenceValue,
        completed: FenceValue,
    },

    #[error("fence value {0} was never signaled")]
    FenceNeverSignaled(FenceValue),

    #[error("swap chain buffers are still referenced")]
    BuffersInUse,

    #[error("no back buffer acquired")]
    NoBackBuffer,

    #[error("surface error: {0}")]
    Surface(String),

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

pub type RhiResult<T> = Result<T, RhiError>;
