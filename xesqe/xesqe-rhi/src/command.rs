//! Recorded command lists.
//!
//! A [`CommandList`] is a backend-agnostic stream of [`Command`]s. Backends translate it when it is
//! executed. Recording validates barrier transitions and bindings; the first problem found is reported
//! by [`CommandList::close`].
//!
//! The list also plays the role of its command allocator: once submitted it cannot be reset until the
//! fence value it was submitted under has completed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    Buffer, FenceValue, PipelineState, ResourceId, ResourceState, RhiError, RhiResult, Texture,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl ScissorRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// A resource a barrier applies to.
#[derive(Debug, Clone)]
pub enum Resource {
    Buffer(Arc<dyn Buffer>),
    Texture(Arc<dyn Texture>),
}

impl Resource {
    pub fn id(&self) -> ResourceId {
        match self {
            Resource::Buffer(b) => b.id(),
            Resource::Texture(t) => t.id(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Barrier {
        resource: Resource,
        before: ResourceState,
        after: ResourceState,
    },
    CopyBuffer {
        src: Arc<dyn Buffer>,
        dst: Arc<dyn Buffer>,
        size: u64,
    },
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    ClearRenderTarget {
        target: Arc<dyn Texture>,
        color: [f32; 4],
    },
    ClearDepth {
        target: Arc<dyn Texture>,
        depth: f32,
    },
    SetRenderTargets {
        color: Arc<dyn Texture>,
        depth: Option<Arc<dyn Texture>>,
    },
    SetPipelineState(Arc<dyn PipelineState>),
    SetRootConstants {
        slot: u32,
        values: Vec<f32>,
    },
    SetVertexBuffer {
        buffer: Arc<dyn Buffer>,
        stride: u32,
    },
    SetIndexBuffer {
        buffer: Arc<dyn Buffer>,
        format: IndexFormat,
    },
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
    Draw {
        vertex_count: u32,
        start_vertex: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Recording,
    Closed,
    /// Executed on the queue; retires once the fence reaches `retire_at`.
    Submitted { retire_at: FenceValue },
}

#[derive(Debug)]
pub struct CommandList {
    label: &'static str,
    state: ListState,
    commands: Vec<Command>,
    tracked: HashMap<ResourceId, ResourceState>,
    pipeline_bound: bool,
    targets_bound: bool,
    error: Option<RhiError>,
}

impl CommandList {
    /// A new list starts closed, like a freshly created list that has been closed once.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            state: ListState::Closed,
            commands: Vec::new(),
            tracked: HashMap::new(),
            pipeline_bound: false,
            targets_bound: false,
            error: None,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn state(&self) -> ListState {
        self.state
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Reset the allocator and reopen the list for recording.
    /// Refused while the GPU may still be reading the previous recording.
    pub fn reset(&mut self, completed: FenceValue) -> RhiResult<()> {
        match self.state {
            ListState::Recording => {
                return Err(RhiError::InvalidCommandList(format!(
                    "'{}' reset while still recording",
                    self.label
                )))
            }
            ListState::Submitted { retire_at } if completed < retire_at => {
                return Err(RhiError::AllocatorInUse {
                    retire_at,
                    completed,
                })
            }
            _ => {}
        }
        self.commands.clear();
        self.tracked.clear();
        self.pipeline_bound = false;
        self.targets_bound = false;
        self.error = None;
        self.state = ListState::Recording;
        Ok(())
    }

    pub fn close(&mut self) -> RhiResult<()> {
        if self.state != ListState::Recording {
            return Err(RhiError::InvalidCommandList(format!(
                "'{}' closed while not recording",
                self.label
            )));
        }
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.state = ListState::Closed;
        Ok(())
    }

    /// Record that the list was executed and will retire at `retire_at`.
    pub fn mark_submitted(&mut self, retire_at: FenceValue) -> RhiResult<()> {
        if self.state != ListState::Closed {
            return Err(RhiError::InvalidCommandList(format!(
                "'{}' submitted without being closed",
                self.label
            )));
        }
        self.state = ListState::Submitted { retire_at };
        Ok(())
    }

    pub fn buffer_barrier(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        before: ResourceState,
        after: ResourceState,
    ) {
        self.barrier(Resource::Buffer(buffer.clone()), before, after);
    }

    pub fn texture_barrier(
        &mut self,
        texture: &Arc<dyn Texture>,
        before: ResourceState,
        after: ResourceState,
    ) {
        self.barrier(Resource::Texture(texture.clone()), before, after);
    }

    fn barrier(&mut self, resource: Resource, before: ResourceState, after: ResourceState) {
        let id = resource.id();
        if let Some(&actual) = self.tracked.get(&id) {
            if actual != before {
                self.fail(RhiError::StateMismatch {
                    resource: id,
                    expected: before,
                    actual,
                });
            }
        }
        self.tracked.insert(id, after);
        self.push(Command::Barrier {
            resource,
            before,
            after,
        });
    }

    /// State of a resource as of the last barrier recorded in this list.
    pub fn tracked_state(&self, id: ResourceId) -> Option<ResourceState> {
        self.tracked.get(&id).copied()
    }

    pub fn copy_buffer(&mut self, dst: &Arc<dyn Buffer>, src: &Arc<dyn Buffer>, size: u64) {
        if size > src.size() || size > dst.size() {
            self.fail(RhiError::InvalidCommandList(format!(
                "copy of {size} bytes exceeds buffer {} or {}",
                src.id(),
                dst.id()
            )));
        }
        if let Some(state) = self.tracked_state(dst.id()) {
            if state != ResourceState::CopyDest {
                self.fail(RhiError::StateMismatch {
                    resource: dst.id(),
                    expected: ResourceState::CopyDest,
                    actual: state,
                });
            }
        }
        self.push(Command::CopyBuffer {
            src: src.clone(),
            dst: dst.clone(),
            size,
        });
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.push(Command::SetViewport(viewport));
    }

    pub fn set_scissor(&mut self, rect: ScissorRect) {
        self.push(Command::SetScissor(rect));
    }

    pub fn clear_render_target(&mut self, target: &Arc<dyn Texture>, color: [f32; 4]) {
        self.expect_state(target.id(), ResourceState::RenderTarget);
        self.push(Command::ClearRenderTarget {
            target: target.clone(),
            color,
        });
    }

    pub fn clear_depth(&mut self, target: &Arc<dyn Texture>, depth: f32) {
        self.expect_state(target.id(), ResourceState::DepthWrite);
        self.push(Command::ClearDepth {
            target: target.clone(),
            depth,
        });
    }

    pub fn set_render_targets(&mut self, color: &Arc<dyn Texture>, depth: Option<&Arc<dyn Texture>>) {
        self.expect_state(color.id(), ResourceState::RenderTarget);
        self.targets_bound = true;
        self.push(Command::SetRenderTargets {
            color: color.clone(),
            depth: depth.cloned(),
        });
    }

    pub fn set_pipeline_state(&mut self, pipeline: &Arc<dyn PipelineState>) {
        self.pipeline_bound = true;
        self.push(Command::SetPipelineState(pipeline.clone()));
    }

    /// Set one inline-constant slot of the bound pipeline's root signature.
    pub fn set_root_constants(&mut self, slot: u32, values: &[f32]) {
        if !self.pipeline_bound {
            self.fail(RhiError::InvalidCommandList(
                "root constants set before a pipeline state".into(),
            ));
        }
        self.push(Command::SetRootConstants {
            slot,
            values: values.to_vec(),
        });
    }

    pub fn set_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, stride: u32) {
        self.push(Command::SetVertexBuffer {
            buffer: buffer.clone(),
            stride,
        });
    }

    pub fn set_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, format: IndexFormat) {
        self.push(Command::SetIndexBuffer {
            buffer: buffer.clone(),
            format,
        });
    }

    pub fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.expect_draw_bindings();
        self.push(Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
    }

    pub fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.expect_draw_bindings();
        self.push(Command::Draw {
            vertex_count,
            start_vertex,
        });
    }

    fn expect_state(&mut self, id: ResourceId, expected: ResourceState) {
        if let Some(actual) = self.tracked_state(id) {
            if actual != expected {
                self.fail(RhiError::StateMismatch {
                    resource: id,
                    expected,
                    actual,
                });
            }
        }
    }

    fn expect_draw_bindings(&mut self) {
        if !self.pipeline_bound {
            self.fail(RhiError::InvalidCommandList("draw without a pipeline state".into()));
        }
        if !self.targets_bound {
            self.fail(RhiError::InvalidCommandList("draw without render targets".into()));
        }
    }

    fn push(&mut self, command: Command) {
        if self.state != ListState::Recording {
            self.fail(RhiError::InvalidCommandList(format!(
                "'{}' recorded into while not recording",
                self.label
            )));
            return;
        }
        self.commands.push(command);
    }

    fn fail(&mut self, err: RhiError) {
        log::debug!("command list '{}': {err}", self.label);
        self.error.get_or_insert(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeapType, RootSignatureDescriptor, TextureFormat};
    use std::any::Any;

    #[derive(Debug)]
    struct FakeBuffer(ResourceId, u64);

    impl Buffer for FakeBuffer {
        fn id(&self) -> ResourceId {
            self.0
        }
        fn size(&self) -> u64 {
            self.1
        }
        fn heap(&self) -> HeapType {
            HeapType::Default
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct FakeTexture(ResourceId);

    impl Texture for FakeTexture {
        fn id(&self) -> ResourceId {
            self.0
        }
        fn size(&self) -> (u32, u32) {
            (4, 4)
        }
        fn format(&self) -> TextureFormat {
            TextureFormat::Rgba8Unorm
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct FakePipeline(RootSignatureDescriptor);

    impl PipelineState for FakePipeline {
        fn id(&self) -> ResourceId {
            99
        }
        fn root_signature(&self) -> &RootSignatureDescriptor {
            &self.0
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn buffer(id: ResourceId) -> Arc<dyn Buffer> {
        Arc::new(FakeBuffer(id, 64))
    }

    fn recording() -> CommandList {
        let mut list = CommandList::new("test");
        list.reset(0).unwrap();
        list
    }

    #[test]
    fn upload_transitions_close_cleanly() {
        let mut list = recording();
        let dst = buffer(1);
        let src = buffer(2);
        list.buffer_barrier(&dst, ResourceState::Common, ResourceState::CopyDest);
        list.copy_buffer(&dst, &src, 64);
        list.buffer_barrier(&dst, ResourceState::CopyDest, ResourceState::GenericRead);
        list.close().unwrap();
        assert_eq!(list.commands().len(), 3);
        assert_eq!(list.tracked_state(1), Some(ResourceState::GenericRead));
    }

    #[test]
    fn mismatched_barrier_fails_on_close() {
        let mut list = recording();
        let dst = buffer(1);
        list.buffer_barrier(&dst, ResourceState::Common, ResourceState::CopyDest);
        list.buffer_barrier(&dst, ResourceState::Common, ResourceState::GenericRead);
        assert!(matches!(
            list.close(),
            Err(RhiError::StateMismatch {
                resource: 1,
                expected: ResourceState::Common,
                actual: ResourceState::CopyDest,
            })
        ));
    }

    #[test]
    fn copy_into_buffer_outside_copy_dest_is_rejected() {
        let mut list = recording();
        let dst = buffer(1);
        list.buffer_barrier(&dst, ResourceState::Common, ResourceState::GenericRead);
        list.copy_buffer(&dst, &buffer(2), 16);
        assert!(list.close().is_err());
    }

    #[test]
    fn draw_requires_pipeline_and_targets() {
        let mut list = recording();
        list.draw_indexed(3, 0, 0);
        assert!(matches!(list.close(), Err(RhiError::InvalidCommandList(_))));

        let mut list = recording();
        let rt: Arc<dyn Texture> = Arc::new(FakeTexture(7));
        let pso: Arc<dyn PipelineState> =
            Arc::new(FakePipeline(RootSignatureDescriptor::default()));
        list.texture_barrier(&rt, ResourceState::Present, ResourceState::RenderTarget);
        list.clear_render_target(&rt, [0.0; 4]);
        list.set_render_targets(&rt, None);
        list.set_pipeline_state(&pso);
        list.set_root_constants(0, &[1.0; 4]);
        list.draw_indexed(3, 0, 0);
        list.texture_barrier(&rt, ResourceState::RenderTarget, ResourceState::Present);
        list.close().unwrap();
    }

    #[test]
    fn clearing_a_target_still_in_present_is_rejected() {
        let mut list = recording();
        let rt: Arc<dyn Texture> = Arc::new(FakeTexture(7));
        list.texture_barrier(&rt, ResourceState::RenderTarget, ResourceState::Present);
        list.clear_render_target(&rt, [0.0; 4]);
        assert!(list.close().is_err());
    }

    #[test]
    fn reset_waits_for_the_submission_fence() {
        let mut list = recording();
        list.close().unwrap();
        list.mark_submitted(3).unwrap();
        assert!(matches!(
            list.reset(2),
            Err(RhiError::AllocatorInUse {
                retire_at: 3,
                completed: 2
            })
        ));
        assert_eq!(list.state(), ListState::Submitted { retire_at: 3 });
        list.reset(3).unwrap();
        assert_eq!(list.state(), ListState::Recording);
        assert!(list.commands().is_empty());
    }

    #[test]
    fn recording_into_closed_list_is_an_error() {
        let mut list = CommandList::new("closed");
        list.set_viewport(Viewport::full(4, 4));
        assert!(list.commands().is_empty());
        list.reset(0).unwrap();
        // reset clears the stale error
        list.close().unwrap();
        assert!(list.mark_submitted(1).is_ok());
        assert!(list.mark_submitted(2).is_err());
    }
}
