use crate::{Buffer, BufferUsage, HeapType, ResourceId};

pub struct WgpuBuffer {
    pub(crate) raw: wgpu::Buffer,
    pub(crate) size: u64,
    pub(crate) heap: HeapType,
    pub(crate) id: ResourceId,
}

impl std::fmt::Debug for WgpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBuffer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("heap", &self.heap)
            .finish()
    }
}

impl Buffer for WgpuBuffer {
    fn id(&self) -> ResourceId {
        self.id
    }
    fn size(&self) -> u64 {
        self.size
    }
    fn heap(&self) -> HeapType {
        self.heap
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Upload-heap buffers are filled through the queue, so they need `COPY_DST` as well as `COPY_SRC`.
pub(super) fn buffer_usage(usage: BufferUsage, heap: HeapType) -> wgpu::BufferUsages {
    if heap == HeapType::Upload {
        return wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
    }
    let mut out = wgpu::BufferUsages::empty();
    if usage.contains(BufferUsage::VERTEX) {
        out |= wgpu::BufferUsages::VERTEX;
    }
    if usage.contains(BufferUsage::INDEX) {
        out |= wgpu::BufferUsages::INDEX;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        out |= wgpu::BufferUsages::UNIFORM;
    }
    if usage.contains(BufferUsage::COPY_SRC) {
        out |= wgpu::BufferUsages::COPY_SRC;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        out |= wgpu::BufferUsages::COPY_DST;
    }
    out
}
