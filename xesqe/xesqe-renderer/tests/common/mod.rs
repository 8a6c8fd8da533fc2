//! A device that executes nothing and records every call, for checking ordering and synchronization.

#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use xesqe_rhi::{
    Buffer, BufferDescriptor, Command, CommandList, Device, Fence, FenceValue, HeapType, ListState,
    PipelineState, PipelineStateDescriptor, ResourceId, RhiError, RhiResult, RootSignatureDescriptor,
    Swapchain, SwapchainDescriptor, Texture, TextureDescriptor, TextureFormat,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawInfo {
    Indexed {
        vertex_buffer: &'static str,
        index_count: u32,
    },
    Plain {
        vertex_buffer: &'static str,
        vertex_count: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer {
        label: &'static str,
        size: u64,
        heap: HeapType,
    },
    WriteBuffer {
        id: ResourceId,
        len: usize,
    },
    CreateTexture {
        format: TextureFormat,
        size: (u32, u32),
    },
    CreatePipeline(&'static str),
    Execute {
        commands: usize,
        draws: Vec<DrawInfo>,
    },
    Signal(FenceValue),
    Wait(FenceValue),
    ResizeBuffers(u32, u32),
    Present,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

fn log(calls: &CallLog, call: Call) {
    calls.lock().unwrap().push(call);
}

#[derive(Debug)]
pub struct MockBuffer {
    pub id: ResourceId,
    pub label: &'static str,
    pub size: u64,
    pub heap: HeapType,
}

impl Buffer for MockBuffer {
    fn id(&self) -> ResourceId {
        self.id
    }
    fn size(&self) -> u64 {
        self.size
    }
    fn heap(&self) -> HeapType {
        self.heap
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockTexture {
    pub id: ResourceId,
    pub size: (u32, u32),
    pub format: TextureFormat,
}

impl Texture for MockTexture {
    fn id(&self) -> ResourceId {
        self.id
    }
    fn size(&self) -> (u32, u32) {
        self.size
    }
    fn format(&self) -> TextureFormat {
        self.format
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockPipeline {
    pub id: ResourceId,
    pub root_signature: RootSignatureDescriptor,
}

impl PipelineState for MockPipeline {
    fn id(&self) -> ResourceId {
        self.id
    }
    fn root_signature(&self) -> &RootSignatureDescriptor {
        &self.root_signature
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Completes signaled values immediately, or only when waited on if the device lags.
#[derive(Debug)]
pub struct MockFence {
    completed: AtomicU64,
    signaled: AtomicU64,
    calls: CallLog,
}

impl Fence for MockFence {
    fn completed_value(&self) -> FenceValue {
        self.completed.load(Ordering::SeqCst)
    }

    fn wait(&self, value: FenceValue) -> RhiResult<()> {
        log(&self.calls, Call::Wait(value));
        let signaled = self.signaled.load(Ordering::SeqCst);
        if signaled < value {
            return Err(RhiError::FenceNeverSignaled(value));
        }
        self.completed.fetch_max(signaled, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockSwapchain {
    extent: (u32, u32),
    buffers: Vec<Arc<dyn Texture>>,
    current: u32,
    ids: Arc<AtomicU64>,
    calls: CallLog,
}

impl MockSwapchain {
    fn create_buffers(&mut self, count: u32) {
        self.buffers = (0..count)
            .map(|_| {
                Arc::new(MockTexture {
                    id: self.ids.fetch_add(1, Ordering::SeqCst),
                    size: self.extent,
                    format: TextureFormat::Bgra8UnormSrgb,
                }) as Arc<dyn Texture>
            })
            .collect();
    }
}

impl Swapchain for MockSwapchain {
    fn extent(&self) -> (u32, u32) {
        self.extent
    }
    fn format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }
    fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }
    fn current_back_buffer_index(&mut self) -> RhiResult<u32> {
        Ok(self.current)
    }
    fn back_buffer(&self, index: u32) -> RhiResult<Arc<dyn Texture>> {
        self.buffers
            .get(index as usize)
            .cloned()
            .ok_or(RhiError::NoBackBuffer)
    }
    fn resize_buffers(&mut self, width: u32, height: u32) -> RhiResult<()> {
        if self.buffers.iter().any(|b| Arc::strong_count(b) > 1) {
            return Err(RhiError::BuffersInUse);
        }
        log(&self.calls, Call::ResizeBuffers(width, height));
        self.extent = (width, height);
        self.current = 0;
        let count = self.buffers.len() as u32;
        self.create_buffers(count);
        Ok(())
    }
    fn present(&mut self, _sync_interval: u32) -> RhiResult<()> {
        log(&self.calls, Call::Present);
        self.current = (self.current + 1) % self.buffer_count();
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockDevice {
    pub calls: CallLog,
    ids: Arc<AtomicU64>,
    lagging: bool,
}

impl MockDevice {
    /// Work completes as soon as it is signaled.
    pub fn new() -> Arc<Self> {
        Self::build(false)
    }

    /// Work completes only when the host waits for it.
    pub fn lagging() -> Arc<Self> {
        Self::build(true)
    }

    fn build(lagging: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            ids: Arc::new(AtomicU64::new(1)),
            lagging,
        })
    }

    fn next_id(&self) -> ResourceId {
        self.ids.fetch_add(1, Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn executes(&self) -> Vec<Vec<DrawInfo>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Execute { draws, .. } => Some(draws),
                _ => None,
            })
            .collect()
    }
}

fn buffer_label(buffer: &Arc<dyn Buffer>) -> &'static str {
    buffer
        .as_any()
        .downcast_ref::<MockBuffer>()
        .map_or("?", |b| b.label)
}

impl Device for MockDevice {
    fn adapter_name(&self) -> String {
        "mock".into()
    }

    fn create_buffer(&self, desc: &BufferDescriptor) -> RhiResult<Arc<dyn Buffer>> {
        let label = desc.label.unwrap_or("buffer");
        if desc.size == 0 {
            return Err(RhiError::EmptyBuffer(label.into()));
        }
        log(
            &self.calls,
            Call::CreateBuffer {
                label,
                size: desc.size,
                heap: desc.heap,
            },
        );
        Ok(Arc::new(MockBuffer {
            id: self.next_id(),
            label,
            size: desc.size,
            heap: desc.heap,
        }))
    }

    fn write_buffer(&self, buffer: &dyn Buffer, offset: u64, data: &[u8]) -> RhiResult<()> {
        if buffer.heap() != HeapType::Upload {
            return Err(RhiError::NotHostVisible(buffer.id()));
        }
        if offset + data.len() as u64 > buffer.size() {
            return Err(RhiError::WriteOutOfBounds {
                id: buffer.id(),
                offset,
                len: data.len() as u64,
                size: buffer.size(),
            });
        }
        log(
            &self.calls,
            Call::WriteBuffer {
                id: buffer.id(),
                len: data.len(),
            },
        );
        Ok(())
    }

    fn create_texture(&self, desc: &TextureDescriptor) -> RhiResult<Arc<dyn Texture>> {
        log(
            &self.calls,
            Call::CreateTexture {
                format: desc.format,
                size: desc.size,
            },
        );
        Ok(Arc::new(MockTexture {
            id: self.next_id(),
            size: desc.size,
            format: desc.format,
        }))
    }

    fn create_pipeline_state(
        &self,
        desc: &PipelineStateDescriptor,
    ) -> RhiResult<Arc<dyn PipelineState>> {
        log(&self.calls, Call::CreatePipeline(desc.label));
        Ok(Arc::new(MockPipeline {
            id: self.next_id(),
            root_signature: desc.root_signature.clone(),
        }))
    }

    fn create_fence(&self, initial_value: FenceValue) -> RhiResult<Box<dyn Fence>> {
        Ok(Box::new(MockFence {
            completed: AtomicU64::new(initial_value),
            signaled: AtomicU64::new(initial_value),
            calls: self.calls.clone(),
        }))
    }

    fn execute_command_list(&self, list: &CommandList) -> RhiResult<()> {
        if list.state() != ListState::Closed {
            return Err(RhiError::InvalidCommandList("executed while not closed".into()));
        }
        let mut vertex_buffer = "?";
        let mut draws = Vec::new();
        for command in list.commands() {
            match command {
                Command::SetVertexBuffer { buffer, .. } => vertex_buffer = buffer_label(buffer),
                Command::DrawIndexed { index_count, .. } => draws.push(DrawInfo::Indexed {
                    vertex_buffer,
                    index_count: *index_count,
                }),
                Command::Draw { vertex_count, .. } => draws.push(DrawInfo::Plain {
                    vertex_buffer,
                    vertex_count: *vertex_count,
                }),
                _ => {}
            }
        }
        log(
            &self.calls,
            Call::Execute {
                commands: list.commands().len(),
                draws,
            },
        );
        Ok(())
    }

    fn signal(&self, fence: &dyn Fence, value: FenceValue) -> RhiResult<()> {
        let fence = fence
            .as_any()
            .downcast_ref::<MockFence>()
            .ok_or(RhiError::Unsupported("foreign fence"))?;
        log(&self.calls, Call::Signal(value));
        fence.signaled.fetch_max(value, Ordering::SeqCst);
        if !self.lagging {
            fence.completed.fetch_max(value, Ordering::SeqCst);
        }
        Ok(())
    }

    fn create_swapchain(&self, desc: &SwapchainDescriptor) -> RhiResult<Box<dyn Swapchain>> {
        let mut swapchain = MockSwapchain {
            extent: (desc.width, desc.height),
            buffers: Vec::new(),
            current: 0,
            ids: self.ids.clone(),
            calls: self.calls.clone(),
        };
        swapchain.create_buffers(desc.buffer_count.max(1));
        Ok(Box::new(swapchain))
    }
}
