//! Swap chain over a wgpu surface.
//!
//! wgpu hands out one surface texture at a time, so every back-buffer handle shares a single frame
//! slot. The handle for the current index resolves to whatever frame is acquired in that slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    ResourceId, RhiError, RhiResult, Swapchain, SwapchainDescriptor, Texture, TextureFormat,
};

use super::texture::{texture_format, PRESENTABLE};

type FrameSlot = Arc<Mutex<Option<wgpu::SurfaceTexture>>>;

pub struct WgpuBackBuffer {
    index: u32,
    extent: (u32, u32),
    format: TextureFormat,
    frame: FrameSlot,
    id: ResourceId,
}

impl WgpuBackBuffer {
    pub(super) fn view(&self) -> RhiResult<wgpu::TextureView> {
        let slot = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
        let frame = slot.as_ref().ok_or(RhiError::NoBackBuffer)?;
        Ok(frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default()))
    }
}

impl std::fmt::Debug for WgpuBackBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackBuffer")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("extent", &self.extent)
            .finish()
    }
}

impl Texture for WgpuBackBuffer {
    fn id(&self) -> ResourceId {
        self.id
    }
    fn size(&self) -> (u32, u32) {
        self.extent
    }
    fn format(&self) -> TextureFormat {
        self.format
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub struct WgpuSwapchain {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,
    sync_interval: u32,
    buffer_count: u32,
    current: u32,
    frame: FrameSlot,
    back_buffers: Vec<Arc<dyn Texture>>,
    ids: Arc<AtomicU64>,
}

impl std::fmt::Debug for WgpuSwapchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuSwapchain")
            .field("extent", &(self.config.width, self.config.height))
            .field("format", &self.format)
            .field("current", &self.current)
            .finish()
    }
}

fn present_mode(sync_interval: u32) -> wgpu::PresentMode {
    if sync_interval == 0 {
        wgpu::PresentMode::AutoNoVsync
    } else {
        wgpu::PresentMode::Fifo
    }
}

impl WgpuSwapchain {
    pub(super) fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        device: Arc<wgpu::Device>,
        desc: &SwapchainDescriptor,
        ids: Arc<AtomicU64>,
    ) -> RhiResult<Self> {
        let caps = surface.get_capabilities(adapter);
        let format = PRESENTABLE
            .into_iter()
            .find(|f| caps.formats.contains(&texture_format(*f)))
            .ok_or_else(|| {
                RhiError::Surface(format!("no supported surface format in {:?}", caps.formats))
            })?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Opaque);
        let buffer_count = desc.buffer_count.max(1);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format(format),
            width: desc.width.max(1),
            height: desc.height.max(1),
            present_mode: present_mode(desc.sync_interval),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: buffer_count,
        };
        surface.configure(&device, &config);
        log::info!(
            "swap chain {}x{} {:?}, {} buffers",
            config.width,
            config.height,
            format,
            buffer_count
        );
        let mut swapchain = Self {
            surface,
            device,
            config,
            format,
            sync_interval: desc.sync_interval,
            buffer_count,
            current: 0,
            frame: Arc::new(Mutex::new(None)),
            back_buffers: Vec::new(),
            ids,
        };
        swapchain.create_back_buffers();
        Ok(swapchain)
    }

    fn create_back_buffers(&mut self) {
        let extent = (self.config.width, self.config.height);
        self.back_buffers = (0..self.buffer_count)
            .map(|index| {
                Arc::new(WgpuBackBuffer {
                    index,
                    extent,
                    format: self.format,
                    frame: self.frame.clone(),
                    id: self.ids.fetch_add(1, Ordering::Relaxed),
                }) as Arc<dyn Texture>
            })
            .collect();
    }

    fn acquire(&mut self) -> RhiResult<()> {
        let slot = self.frame.clone();
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::warn!("surface outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(|e| RhiError::Surface(e.to_string()))?
            }
            Err(e) => return Err(RhiError::Surface(e.to_string())),
        };
        *slot = Some(frame);
        Ok(())
    }
}

impl Swapchain for WgpuSwapchain {
    fn extent(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn current_back_buffer_index(&mut self) -> RhiResult<u32> {
        self.acquire()?;
        Ok(self.current)
    }

    fn back_buffer(&self, index: u32) -> RhiResult<Arc<dyn Texture>> {
        self.back_buffers
            .get(index as usize)
            .cloned()
            .ok_or_else(|| RhiError::Surface(format!("back buffer {index} out of range")))
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> RhiResult<()> {
        if self.back_buffers.iter().any(|b| Arc::strong_count(b) > 1) {
            return Err(RhiError::BuffersInUse);
        }
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.current = 0;
        self.create_back_buffers();
        log::info!("swap chain resized to {}x{}", self.config.width, self.config.height);
        Ok(())
    }

    fn present(&mut self, sync_interval: u32) -> RhiResult<()> {
        let frame = self
            .frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(RhiError::NoBackBuffer)?;
        frame.present();
        self.current = (self.current + 1) % self.buffer_count;
        if sync_interval != self.sync_interval {
            self.sync_interval = sync_interval;
            self.config.present_mode = present_mode(sync_interval);
            self.surface.configure(&self.device, &self.config);
        }
        Ok(())
    }
}
