use crate::{ResourceId, RhiError, RhiResult, Texture, TextureFormat};

use super::WgpuBackBuffer;

pub struct WgpuTexture {
    pub(crate) raw: wgpu::Texture,
    pub(crate) size: (u32, u32),
    pub(crate) format: TextureFormat,
    pub(crate) id: ResourceId,
}

impl std::fmt::Debug for WgpuTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuTexture")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("format", &self.format)
            .finish()
    }
}

impl Texture for WgpuTexture {
    fn id(&self) -> ResourceId {
        self.id
    }
    fn size(&self) -> (u32, u32) {
        self.size
    }
    fn format(&self) -> TextureFormat {
        self.format
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Resolve a render target to a view; back buffers resolve to the currently acquired frame.
pub(super) fn texture_view(texture: &dyn Texture) -> RhiResult<wgpu::TextureView> {
    if let Some(t) = texture.as_any().downcast_ref::<WgpuTexture>() {
        return Ok(t.raw.create_view(&wgpu::TextureViewDescriptor::default()));
    }
    if let Some(b) = texture.as_any().downcast_ref::<WgpuBackBuffer>() {
        return b.view();
    }
    Err(RhiError::ForeignResource(texture.id()))
}

pub(super) fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        TextureFormat::D32Float => wgpu::TextureFormat::Depth32Float,
    }
}

/// Surface formats we can present to, in order of preference. Shaders encode gamma themselves,
/// so linear formats come first.
pub(super) const PRESENTABLE: [TextureFormat; 4] = [
    TextureFormat::Rgba8Unorm,
    TextureFormat::Bgra8Unorm,
    TextureFormat::Rgba8UnormSrgb,
    TextureFormat::Bgra8UnormSrgb,
];
