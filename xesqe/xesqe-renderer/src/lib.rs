//! Xesqe renderer: device context, staging uploads, PBR/debug pipeline states and a frame loop that
//! flushes the GPU after every frame.
//!
//! The renderer is written against the `xesqe_rhi` traits only. The demo hands it a wgpu device; tests
//! hand it a recording mock.

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod input;
pub mod pipeline;
pub mod surface;
pub mod upload;

pub use app::{Application, Control};
pub use config::AppConfig;
pub use context::GpuContext;
pub use error::{AppError, Result};
pub use frame::{record_frame, FrameStage};
pub use input::{InputEvent, Key, KeyState, MouseButton};
pub use pipeline::{DrawConstants, Pipelines};
pub use surface::PresentationSurface;
pub use upload::{create_default_buffer, GpuBufferPair, MeshBuffers};
