//! Swap chain, back-buffer handles and the depth buffer sized to the window.

use std::sync::Arc;

use xesqe_rhi::{
    CommandList, Device, ResourceState, RhiError, RhiResult, ScissorRect, Swapchain,
    SwapchainDescriptor, Texture, TextureDescriptor, TextureFormat, Viewport,
};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::D32Float;

#[derive(Debug)]
pub struct PresentationSurface {
    swapchain: Box<dyn Swapchain>,
    back_buffers: Vec<Arc<dyn Texture>>,
    depth: Arc<dyn Texture>,
    viewport: Viewport,
    scissor: ScissorRect,
    sync_interval: u32,
}

impl PresentationSurface {
    /// Create the swap chain and a matching depth buffer. The depth buffer starts in
    /// [`ResourceState::Common`]; see [`record_depth_init`](Self::record_depth_init).
    pub fn new(device: &dyn Device, width: u32, height: u32, sync_interval: u32) -> RhiResult<Self> {
        let swapchain = device.create_swapchain(&SwapchainDescriptor {
            width,
            height,
            buffer_count: 2,
            sync_interval,
        })?;
        let back_buffers = back_buffer_handles(swapchain.as_ref())?;
        let depth = create_depth(device, width, height)?;
        Ok(Self {
            swapchain,
            back_buffers,
            depth,
            viewport: Viewport::full(width, height),
            scissor: ScissorRect::full(width, height),
            sync_interval,
        })
    }

    /// Resize the swap chain and recreate the back-buffer handles and the depth buffer. No command
    /// list may still reference the old back buffers. On failure the surface keeps its previous size
    /// and targets.
    pub fn resize(&mut self, device: &dyn Device, width: u32, height: u32) -> RhiResult<()> {
        let depth = create_depth(device, width, height)?;
        // the swap chain refuses while this surface still holds its buffers
        self.back_buffers.clear();
        if let Err(e) = self.swapchain.resize_buffers(width, height) {
            self.back_buffers = back_buffer_handles(self.swapchain.as_ref())?;
            return Err(e);
        }
        self.back_buffers = back_buffer_handles(self.swapchain.as_ref())?;
        self.depth = depth;
        self.viewport = Viewport::full(width, height);
        self.scissor = ScissorRect::full(width, height);
        Ok(())
    }

    pub fn record_depth_init(&self, list: &mut CommandList) {
        list.texture_barrier(&self.depth, ResourceState::Common, ResourceState::DepthWrite);
    }

    pub fn current_back_buffer(&mut self) -> RhiResult<Arc<dyn Texture>> {
        let index = self.swapchain.current_back_buffer_index()?;
        self.back_buffers
            .get(index as usize)
            .cloned()
            .ok_or(RhiError::NoBackBuffer)
    }

    pub fn depth(&self) -> &Arc<dyn Texture> {
        &self.depth
    }

    pub fn present(&mut self) -> RhiResult<()> {
        self.swapchain.present(self.sync_interval)
    }

    pub fn format(&self) -> TextureFormat {
        self.swapchain.format()
    }

    pub fn extent(&self) -> (u32, u32) {
        self.swapchain.extent()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scissor(&self) -> ScissorRect {
        self.scissor
    }

    pub fn aspect(&self) -> f32 {
        let (w, h) = self.extent();
        w as f32 / h.max(1) as f32
    }
}

fn back_buffer_handles(swapchain: &dyn Swapchain) -> RhiResult<Vec<Arc<dyn Texture>>> {
    (0..swapchain.buffer_count())
        .map(|i| swapchain.back_buffer(i))
        .collect()
}

fn create_depth(device: &dyn Device, width: u32, height: u32) -> RhiResult<Arc<dyn Texture>> {
    device.create_texture(&TextureDescriptor {
        label: Some("depth"),
        size: (width, height),
        format: DEPTH_FORMAT,
    })
}
