//! CPU to GPU transfers through an upload-heap staging buffer.
//!
//! The data is written into a host-visible staging buffer and copied into a device-local buffer by
//! commands recorded into the caller's list. The staging half of the pair stays alive until the fence
//! value that retires that list has completed.

use std::sync::Arc;

use xesqe_rhi::{
    Buffer, BufferDescriptor, BufferUsage, CommandList, Device, FenceValue, HeapType, IndexFormat,
    ResourceState, RhiError, RhiResult,
};

#[derive(Debug)]
pub struct GpuBufferPair {
    device_local: Arc<dyn Buffer>,
    staging: Option<Arc<dyn Buffer>>,
    retire_at: FenceValue,
}

impl GpuBufferPair {
    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.device_local
    }

    pub fn has_staging(&self) -> bool {
        self.staging.is_some()
    }

    /// Tie the staging buffer to the fence value of the submission that copies from it.
    pub fn bind_retire(&mut self, retire_at: FenceValue) {
        self.retire_at = retire_at;
    }

    /// Drop the staging buffer once `completed` has reached the bound fence value.
    /// Returns whether the pair no longer holds staging memory.
    pub fn release_staging(&mut self, completed: FenceValue) -> bool {
        if self.staging.is_some() && completed >= self.retire_at {
            self.staging = None;
        }
        self.staging.is_none()
    }
}

/// Create a device-local buffer holding `data` and record the copy that fills it.
///
/// On return the recorded commands leave the buffer in [`ResourceState::GenericRead`]. The pair's
/// staging buffer is unreleasable until [`GpuBufferPair::bind_retire`] is called.
pub fn create_default_buffer(
    device: &dyn Device,
    list: &mut CommandList,
    label: &'static str,
    data: &[u8],
    usage: BufferUsage,
) -> RhiResult<GpuBufferPair> {
    if data.is_empty() {
        return Err(RhiError::EmptyBuffer(label.into()));
    }
    let size = data.len() as u64;
    let device_local = device.create_buffer(&BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | BufferUsage::COPY_DST,
        heap: HeapType::Default,
    })?;
    let staging = device.create_buffer(&BufferDescriptor {
        label: Some("staging"),
        size,
        usage: BufferUsage::COPY_SRC,
        heap: HeapType::Upload,
    })?;
    device.write_buffer(staging.as_ref(), 0, data)?;

    list.buffer_barrier(&device_local, ResourceState::Common, ResourceState::CopyDest);
    list.copy_buffer(&device_local, &staging, size);
    list.buffer_barrier(&device_local, ResourceState::CopyDest, ResourceState::GenericRead);
    log::debug!("upload '{label}': {size} bytes");

    Ok(GpuBufferPair {
        device_local,
        staging: Some(staging),
        retire_at: FenceValue::MAX,
    })
}

/// Vertex and index buffers of one uploaded mesh.
#[derive(Debug)]
pub struct MeshBuffers {
    pub vertices: GpuBufferPair,
    pub indices: GpuBufferPair,
    pub stride: u32,
    pub index_count: u32,
    pub index_format: IndexFormat,
}

impl MeshBuffers {
    pub fn upload<V: bytemuck::Pod>(
        device: &dyn Device,
        list: &mut CommandList,
        label: &'static str,
        vertices: &[V],
        indices: &[u32],
    ) -> RhiResult<Self> {
        Ok(Self {
            vertices: create_default_buffer(
                device,
                list,
                label,
                bytemuck::cast_slice(vertices),
                BufferUsage::VERTEX,
            )?,
            indices: create_default_buffer(
                device,
                list,
                label,
                bytemuck::cast_slice(indices),
                BufferUsage::INDEX,
            )?,
            stride: std::mem::size_of::<V>() as u32,
            index_count: indices.len() as u32,
            index_format: IndexFormat::Uint32,
        })
    }

    pub fn bind_retire(&mut self, retire_at: FenceValue) {
        self.vertices.bind_retire(retire_at);
        self.indices.bind_retire(retire_at);
    }

    pub fn release_staging(&mut self, completed: FenceValue) -> bool {
        let v = self.vertices.release_staging(completed);
        let i = self.indices.release_staging(completed);
        v && i
    }
}

/// Vertex-only buffer of a non-indexed debug mesh.
#[derive(Debug)]
pub struct DebugBuffers {
    pub vertices: GpuBufferPair,
    pub stride: u32,
    pub vertex_count: u32,
}

impl DebugBuffers {
    pub fn upload<V: bytemuck::Pod>(
        device: &dyn Device,
        list: &mut CommandList,
        label: &'static str,
        vertices: &[V],
    ) -> RhiResult<Self> {
        Ok(Self {
            vertices: create_default_buffer(
                device,
                list,
                label,
                bytemuck::cast_slice(vertices),
                BufferUsage::VERTEX,
            )?,
            stride: std::mem::size_of::<V>() as u32,
            vertex_count: vertices.len() as u32,
        })
    }
}
