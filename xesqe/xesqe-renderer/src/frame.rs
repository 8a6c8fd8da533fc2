//! Recording of one frame into the shared command list.

use std::sync::Arc;

use glam::Mat4;
use xesqe_rhi::{CommandList, PipelineState, ResourceState, ScissorRect, Texture, Viewport};

use crate::pipeline::{DrawConstants, SLOT_WVP};
use crate::upload::{DebugBuffers, MeshBuffers};

/// Where a frame is in its record, submit, present and flush cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameStage {
    #[default]
    Idle,
    Recording,
    Submitted,
    Presented,
}

pub struct FrameTargets<'a> {
    pub back_buffer: &'a Arc<dyn Texture>,
    pub depth: &'a Arc<dyn Texture>,
    pub viewport: Viewport,
    pub scissor: ScissorRect,
    pub clear_color: [f32; 4],
}

pub struct MeshDraw<'a> {
    pub pipeline: &'a Arc<dyn PipelineState>,
    pub mesh: &'a MeshBuffers,
    pub constants: DrawConstants,
}

pub struct MarkerDraw<'a> {
    pub pipeline: &'a Arc<dyn PipelineState>,
    pub buffers: &'a DebugBuffers,
    pub wvp: Mat4,
}

/// Record a full frame: clear, one indexed draw per mesh in order, then the optional marker.
/// The back buffer is left in [`ResourceState::Present`].
pub fn record_frame(
    list: &mut CommandList,
    targets: &FrameTargets<'_>,
    meshes: &[MeshDraw<'_>],
    marker: Option<&MarkerDraw<'_>>,
) {
    list.set_viewport(targets.viewport);
    list.set_scissor(targets.scissor);
    list.texture_barrier(
        targets.back_buffer,
        ResourceState::Present,
        ResourceState::RenderTarget,
    );
    list.clear_render_target(targets.back_buffer, targets.clear_color);
    list.clear_depth(targets.depth, 1.0);
    list.set_render_targets(targets.back_buffer, Some(targets.depth));

    for draw in meshes {
        list.set_pipeline_state(draw.pipeline);
        list.set_vertex_buffer(draw.mesh.vertices.buffer(), draw.mesh.stride);
        list.set_index_buffer(draw.mesh.indices.buffer(), draw.mesh.index_format);
        draw.constants.record(list);
        list.draw_indexed(draw.mesh.index_count, 0, 0);
    }

    if let Some(marker) = marker {
        list.set_pipeline_state(marker.pipeline);
        list.set_vertex_buffer(marker.buffers.vertices.buffer(), marker.buffers.stride);
        list.set_root_constants(SLOT_WVP, &marker.wvp.to_cols_array());
        list.draw(marker.buffers.vertex_count, 0);
    }

    list.texture_barrier(
        targets.back_buffer,
        ResourceState::RenderTarget,
        ResourceState::Present,
    );
}
