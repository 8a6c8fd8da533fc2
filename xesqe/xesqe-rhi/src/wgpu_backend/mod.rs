//! wgpu backend for Xesqe RHI.
//!
//! Command lists are translated into one wgpu command encoder when they are executed. Barriers are
//! validated while recording and need no translation here since wgpu tracks resource usage itself.
//! Root constants are emulated with a uniform ring buffer bound at a dynamic offset per draw.

mod buffer;
mod execute;
mod fence;
mod pipeline;
mod swapchain;
mod texture;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::SurfaceTargetUnsafe;

use crate::{
    Buffer, BufferDescriptor, CommandList, Device, Fence, FenceValue, HeapType, PipelineState,
    PipelineStateDescriptor, RhiError, RhiResult, Swapchain, SwapchainDescriptor, Texture,
    TextureDescriptor,
};

pub use buffer::WgpuBuffer;
pub use fence::WgpuFence;
pub use pipeline::WgpuPipelineState;
pub use swapchain::{WgpuBackBuffer, WgpuSwapchain};
pub use texture::WgpuTexture;

pub struct WgpuDevice {
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: wgpu::Queue,
    /// Surface the device was created against; moved into the swap chain.
    surface: Mutex<Option<wgpu::Surface<'static>>>,
    /// Backing store for emulated root constants, grown on demand.
    ring: Mutex<Option<wgpu::Buffer>>,
    ids: Arc<AtomicU64>,
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

impl WgpuDevice {
    /// Create a device able to present to `window`.
    /// The host must keep the window alive for as long as this device and its swap chain exist.
    pub fn from_window(window: &(impl HasWindowHandle + HasDisplayHandle)) -> RhiResult<Self> {
        let (raw_window_handle, raw_display_handle) = {
            let wh = window
                .window_handle()
                .map_err(|e| RhiError::Surface(e.to_string()))?;
            let dh = window
                .display_handle()
                .map_err(|e| RhiError::Surface(e.to_string()))?;
            (wh.as_raw(), dh.as_raw())
        };
        let instance = wgpu::Instance::default();
        let target = SurfaceTargetUnsafe::RawHandle {
            raw_window_handle,
            raw_display_handle,
        };
        // SAFETY: the window outlives the surface; see the contract above.
        let surface = unsafe { instance.create_surface_unsafe(target) }
            .map_err(|e| RhiError::Surface(e.to_string()))?;
        pollster::block_on(Self::from_instance(instance, surface))
    }

    async fn from_instance(
        instance: wgpu::Instance,
        surface: wgpu::Surface<'static>,
    ) -> RhiResult<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RhiError::DeviceCreation("no compatible adapter".into()))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("xesqe"),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| RhiError::DeviceCreation(e.to_string()))?;
        device.on_uncaptured_error(Box::new(|err| log::error!("wgpu: {err}")));
        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);
        Ok(Self {
            adapter,
            device: Arc::new(device),
            queue,
            surface: Mutex::new(Some(surface)),
            ring: Mutex::new(None),
            ids: Arc::new(AtomicU64::new(1)),
        })
    }

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }

    fn uniform_alignment(&self) -> u32 {
        self.device.limits().min_uniform_buffer_offset_alignment
    }

    /// Run `f` inside an error scope and turn a captured error into `Err`.
    fn scoped<T>(&self, filter: wgpu::ErrorFilter, f: impl FnOnce() -> T) -> Result<T, String> {
        self.device.push_error_scope(filter);
        let value = f();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }
}

impl Device for WgpuDevice {
    fn adapter_name(&self) -> String {
        self.adapter.get_info().name
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> RhiResult<Arc<dyn Buffer>> {
        let label = desc.label.unwrap_or("buffer");
        if desc.size == 0 {
            return Err(RhiError::EmptyBuffer(label.into()));
        }
        let raw = self
            .scoped(wgpu::ErrorFilter::OutOfMemory, || {
                self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: desc.label,
                    size: desc.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
                    usage: buffer::buffer_usage(desc.usage, desc.heap),
                    mapped_at_creation: false,
                })
            })
            .map_err(|reason| RhiError::ResourceCreation {
                label: label.into(),
                reason,
            })?;
        Ok(Arc::new(WgpuBuffer {
            raw,
            size: desc.size,
            heap: desc.heap,
            id: self.next_id(),
        }))
    }

    fn write_buffer(&self, buffer: &dyn Buffer, offset: u64, data: &[u8]) -> RhiResult<()> {
        let b = buffer
            .as_any()
            .downcast_ref::<WgpuBuffer>()
            .ok_or(RhiError::ForeignResource(buffer.id()))?;
        if b.heap != HeapType::Upload {
            return Err(RhiError::NotHostVisible(b.id));
        }
        let len = data.len() as u64;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || offset + len > b.size {
            return Err(RhiError::WriteOutOfBounds {
                id: b.id,
                offset,
                len,
                size: b.size,
            });
        }
        if len % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            self.queue.write_buffer(&b.raw, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT) as usize, 0);
            self.queue.write_buffer(&b.raw, offset, &padded);
        }
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> RhiResult<Arc<dyn Texture>> {
        let label = desc.label.unwrap_or("texture");
        let raw = self
            .scoped(wgpu::ErrorFilter::Validation, || {
                self.device.create_texture(&wgpu::TextureDescriptor {
                    label: desc.label,
                    size: wgpu::Extent3d {
                        width: desc.size.0.max(1),
                        height: desc.size.1.max(1),
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: texture::texture_format(desc.format),
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
            })
            .map_err(|reason| RhiError::ResourceCreation {
                label: label.into(),
                reason,
            })?;
        Ok(Arc::new(WgpuTexture {
            raw,
            size: desc.size,
            format: desc.format,
            id: self.next_id(),
        }))
    }

    fn create_pipeline_state(
        &self,
        desc: &PipelineStateDescriptor,
    ) -> RhiResult<Arc<dyn PipelineState>> {
        let id = self.next_id();
        let pso = self
            .scoped(wgpu::ErrorFilter::Validation, || {
                pipeline::create_pipeline(&self.device, desc, id)
            })
            .map_err(|message| RhiError::ShaderCompilation {
                label: desc.label.into(),
                message,
            })?;
        log::debug!("pipeline '{}' created", desc.label);
        Ok(Arc::new(pso))
    }

    fn create_fence(&self, initial_value: FenceValue) -> RhiResult<Box<dyn Fence>> {
        Ok(Box::new(WgpuFence::new(self.device.clone(), initial_value)))
    }

    fn execute_command_list(&self, list: &CommandList) -> RhiResult<()> {
        execute::execute(self, list)
    }

    fn signal(&self, fence: &dyn Fence, value: FenceValue) -> RhiResult<()> {
        let fence = fence
            .as_any()
            .downcast_ref::<WgpuFence>()
            .ok_or_else(|| RhiError::Unsupported("signaling a fence from another backend"))?;
        let completed = fence.arm(value);
        self.queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });
        Ok(())
    }

    fn create_swapchain(&self, desc: &SwapchainDescriptor) -> RhiResult<Box<dyn Swapchain>> {
        let surface = self
            .surface
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RhiError::Unsupported("surface already owned by a swap chain"))?;
        let swapchain = WgpuSwapchain::new(
            surface,
            &self.adapter,
            self.device.clone(),
            desc,
            self.ids.clone(),
        )?;
        Ok(Box::new(swapchain))
    }
}
