//! Xesqe RHI: a small explicit-API rendering hardware interface.
//!
//! Work is recorded into a [`CommandList`] with explicit resource-state barriers and executed on the
//! device queue. CPU/GPU ordering is expressed with a monotonically increasing [`Fence`] value: the host
//! signals a value after submitting work and waits until the device reports it completed.

use std::any::Any;
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

pub mod command;
pub mod error;

pub use command::{Command, CommandList, IndexFormat, ListState, Resource, ScissorRect, Viewport};
pub use error::{RhiError, RhiResult};

/// Unique identifier for a GPU resource.
pub type ResourceId = u64;

/// A value of a [`Fence`]; higher values are signaled later.
pub type FenceValue = u64;

bitflags::bitflags! {
    /// Buffer usage flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const COPY_SRC = 1 << 3;
        const COPY_DST = 1 << 4;
    }
}

/// Which memory heap a buffer lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapType {
    /// Device-local memory; only reachable from the CPU through a copy.
    #[default]
    Default,
    /// Host-visible memory the CPU writes directly; used as a staging relay.
    Upload,
}

/// Usage state of a resource. Transitions are recorded explicitly with barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    #[default]
    Common,
    CopyDest,
    /// Readable by the input assembler and shaders (vertex/index data).
    GenericRead,
    RenderTarget,
    DepthWrite,
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    D32Float,
}

#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    pub label: Option<&'static str>,
    pub size: u64,
    pub usage: BufferUsage,
    pub heap: HeapType,
}

impl Default for BufferDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: 0,
            usage: BufferUsage::VERTEX,
            heap: HeapType::Default,
        }
    }
}

pub trait Buffer: Send + Sync + Debug {
    fn id(&self) -> ResourceId;
    fn size(&self) -> u64;
    fn heap(&self) -> HeapType;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub label: Option<&'static str>,
    pub size: (u32, u32),
    pub format: TextureFormat,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: (1, 1),
            format: TextureFormat::Rgba8Unorm,
        }
    }
}

/// A 2D render target or depth buffer. Freshly created textures are in [`ResourceState::Common`].
pub trait Texture: Send + Sync + Debug {
    fn id(&self) -> ResourceId;
    fn size(&self) -> (u32, u32);
    fn format(&self) -> TextureFormat;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// One attribute of the interleaved vertex layout. Shader locations follow declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    pub semantic: &'static str,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLayout {
    pub stride: u32,
    pub elements: Vec<InputElement>,
}

impl InputLayout {
    /// Build a tightly packed layout from `(semantic, format)` pairs.
    pub fn packed(elements: &[(&'static str, VertexFormat)]) -> Self {
        let mut offset = 0;
        let elements = elements
            .iter()
            .map(|&(semantic, format)| {
                let element = InputElement {
                    semantic,
                    format,
                    offset,
                };
                offset += format.size();
                element
            })
            .collect();
        Self {
            stride: offset,
            elements,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderVisibility {
    #[default]
    All,
    Vertex,
    Pixel,
}

/// An inline block of 32-bit constants. Root signatures here carry no descriptor tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootParameter {
    pub num_values: u32,
    pub shader_register: u32,
    pub visibility: ShaderVisibility,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSignatureDescriptor {
    pub parameters: Vec<RootParameter>,
}

impl RootSignatureDescriptor {
    /// Byte offset of each slot when the constants are packed into one uniform block.
    /// Slots start on 16-byte boundaries so they line up with `vec4`/`mat4x4` members.
    pub fn constant_offsets(&self) -> Vec<u32> {
        let mut offset = 0u32;
        self.parameters
            .iter()
            .map(|p| {
                let start = align_to(offset, 16);
                offset = start + p.num_values * 4;
                start
            })
            .collect()
    }

    /// Total size of the packed constant block, rounded up to 16 bytes.
    pub fn constants_size(&self) -> u32 {
        match (self.constant_offsets().last(), self.parameters.last()) {
            (Some(&start), Some(p)) => align_to(start + p.num_values * 4, 16),
            _ => 0,
        }
    }
}

/// A shader entry point in WGSL; compiled by the backend when the pipeline is created.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    pub source: Cow<'static, str>,
    pub entry_point: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontFace {
    #[default]
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterizerState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunc {
    Never,
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_enable: bool,
    pub depth_write: bool,
    pub compare: CompareFunc,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write: true,
            compare: CompareFunc::Less,
        }
    }
}

impl DepthStencilState {
    pub fn disabled() -> Self {
        Self {
            depth_enable: false,
            depth_write: false,
            compare: CompareFunc::Always,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    LineList,
}

/// Everything a pipeline state object bakes: shaders, root signature, vertex layout and fixed-function state.
/// **Compatibility:** the render targets bound when drawing must match `rtv_format`/`dsv_format`.
#[derive(Debug, Clone)]
pub struct PipelineStateDescriptor {
    pub label: &'static str,
    pub root_signature: RootSignatureDescriptor,
    pub vertex_shader: ShaderProgram,
    pub pixel_shader: ShaderProgram,
    pub input_layout: InputLayout,
    pub topology: PrimitiveTopology,
    pub rasterizer: RasterizerState,
    pub depth_stencil: DepthStencilState,
    pub rtv_format: TextureFormat,
    pub dsv_format: Option<TextureFormat>,
}

pub trait PipelineState: Send + Sync + Debug {
    fn id(&self) -> ResourceId;
    fn root_signature(&self) -> &RootSignatureDescriptor;
    fn as_any(&self) -> &dyn Any;
}

/// CPU-visible completion counter for queue work.
pub trait Fence: Send + Sync + Debug {
    /// Highest value the device has finished.
    fn completed_value(&self) -> FenceValue;
    /// Block until `completed_value() >= value`. There is no timeout.
    fn wait(&self, value: FenceValue) -> RhiResult<()>;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone)]
pub struct SwapchainDescriptor {
    pub width: u32,
    pub height: u32,
    pub buffer_count: u32,
    /// 1 = wait for vertical blank, 0 = present immediately.
    pub sync_interval: u32,
}

impl Default for SwapchainDescriptor {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            buffer_count: 2,
            sync_interval: 1,
        }
    }
}

/// Rotating set of presentable back buffers. Back buffers start in [`ResourceState::Present`].
pub trait Swapchain: Send + Debug {
    fn extent(&self) -> (u32, u32);
    fn format(&self) -> TextureFormat;
    fn buffer_count(&self) -> u32;
    /// Index of the back buffer the next frame renders into. Acquires it if needed.
    fn current_back_buffer_index(&mut self) -> RhiResult<u32>;
    fn back_buffer(&self, index: u32) -> RhiResult<Arc<dyn Texture>>;
    /// Resize every back buffer. Fails with [`RhiError::BuffersInUse`] while any handle returned by
    /// [`back_buffer`](Self::back_buffer) is still alive.
    fn resize_buffers(&mut self, width: u32, height: u32) -> RhiResult<()>;
    fn present(&mut self, sync_interval: u32) -> RhiResult<()>;
}

/// The core device trait that all backends implement.
pub trait Device: Send + Sync + Debug {
    fn adapter_name(&self) -> String;

    fn create_buffer(&self, desc: &BufferDescriptor) -> RhiResult<Arc<dyn Buffer>>;

    /// Write CPU data into an [`HeapType::Upload`] buffer. The write is visible to work submitted afterwards.
    fn write_buffer(&self, buffer: &dyn Buffer, offset: u64, data: &[u8]) -> RhiResult<()>;

    fn create_texture(&self, desc: &TextureDescriptor) -> RhiResult<Arc<dyn Texture>>;

    fn create_pipeline_state(
        &self,
        desc: &PipelineStateDescriptor,
    ) -> RhiResult<Arc<dyn PipelineState>>;

    fn create_fence(&self, initial_value: FenceValue) -> RhiResult<Box<dyn Fence>>;

    /// Execute a closed command list on the queue. Does not block.
    fn execute_command_list(&self, list: &CommandList) -> RhiResult<()>;

    /// Enqueue a signal: `fence` reaches `value` once all previously executed work has finished.
    fn signal(&self, fence: &dyn Fence, value: FenceValue) -> RhiResult<()>;

    /// Create the swap chain for the surface this device was created with.
    fn create_swapchain(&self, _desc: &SwapchainDescriptor) -> RhiResult<Box<dyn Swapchain>> {
        Err(RhiError::Unsupported("swap chain"))
    }
}

pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

#[cfg(feature = "wgpu")]
pub mod wgpu_backend;

#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuDevice;

#[cfg(test)]
mod tests {
    use super::*;

    fn constants(n: &[u32]) -> RootSignatureDescriptor {
        RootSignatureDescriptor {
            parameters: n
                .iter()
                .enumerate()
                .map(|(i, &num_values)| RootParameter {
                    num_values,
                    shader_register: i as u32,
                    visibility: ShaderVisibility::All,
                })
                .collect(),
        }
    }

    #[test]
    fn root_constants_pack_on_16_byte_boundaries() {
        let sig = constants(&[16, 4, 4, 4, 16]);
        assert_eq!(sig.constant_offsets(), vec![0, 64, 80, 96, 112]);
        assert_eq!(sig.constants_size(), 176);

        let odd = constants(&[3, 1]);
        assert_eq!(odd.constant_offsets(), vec![0, 16]);
        assert_eq!(odd.constants_size(), 32);
        assert_eq!(constants(&[]).constants_size(), 0);
    }

    #[test]
    fn packed_layout_accumulates_offsets() {
        let layout = InputLayout::packed(&[
            ("POSITION", VertexFormat::Float32x3),
            ("NORMAL", VertexFormat::Float32x3),
            ("METALLIC", VertexFormat::Float32),
        ]);
        assert_eq!(layout.stride, 28);
        let offsets: Vec<u32> = layout.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
    }
}
