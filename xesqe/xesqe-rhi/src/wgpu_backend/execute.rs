//! Translation of a recorded [`CommandList`] into wgpu passes.
//!
//! The list is first planned into copies and render passes: clears become load ops of the next pass
//! that uses the target, and every draw snapshots the current root constants into the uniform ring.
//! The plan is then encoded and submitted in one command buffer.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::{Arc, PoisonError};

use crate::{
    Buffer, Command, CommandList, IndexFormat, ListState, ResourceId, RhiError, RhiResult,
    ScissorRect, Texture, Viewport,
};

use super::texture::texture_view;
use super::{WgpuBuffer, WgpuDevice, WgpuPipelineState};

#[derive(Clone, Copy)]
enum DrawCall {
    Indexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
    Plain {
        vertex_count: u32,
        start_vertex: u32,
    },
}

struct DrawOp<'a> {
    pipeline: &'a WgpuPipelineState,
    vertex: Option<&'a wgpu::Buffer>,
    index: Option<(&'a wgpu::Buffer, wgpu::IndexFormat)>,
    call: DrawCall,
    constants_offset: u32,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
}

struct Attachment<C> {
    view: wgpu::TextureView,
    clear: Option<C>,
}

struct PassOp<'a> {
    color: Option<Attachment<[f32; 4]>>,
    depth: Option<Attachment<f32>>,
    draws: Vec<DrawOp<'a>>,
}

enum Op<'a> {
    Copy {
        src: &'a wgpu::Buffer,
        dst: &'a wgpu::Buffer,
        size: u64,
    },
    Pass(PassOp<'a>),
}

#[derive(Default)]
struct Plan<'a> {
    ops: Vec<Op<'a>>,
    constants: Vec<u8>,
    pipelines: HashMap<ResourceId, &'a WgpuPipelineState>,
}

struct Planner<'a> {
    alignment: usize,
    plan: Plan<'a>,
    open: Option<PassOp<'a>>,
    color_target: Option<&'a Arc<dyn Texture>>,
    depth_target: Option<&'a Arc<dyn Texture>>,
    color_clears: Vec<(&'a Arc<dyn Texture>, [f32; 4])>,
    depth_clears: Vec<(&'a Arc<dyn Texture>, f32)>,
    pipeline: Option<&'a WgpuPipelineState>,
    block: Vec<u8>,
    vertex: Option<&'a wgpu::Buffer>,
    index: Option<(&'a wgpu::Buffer, wgpu::IndexFormat)>,
    viewport: Option<Viewport>,
    scissor: Option<ScissorRect>,
}

fn raw_buffer(buffer: &Arc<dyn Buffer>) -> RhiResult<&wgpu::Buffer> {
    buffer
        .as_any()
        .downcast_ref::<WgpuBuffer>()
        .map(|b| &b.raw)
        .ok_or(RhiError::ForeignResource(buffer.id()))
}

fn take_clear<'a, C: Copy>(
    clears: &mut Vec<(&'a Arc<dyn Texture>, C)>,
    id: ResourceId,
) -> Option<C> {
    let pos = clears.iter().position(|(t, _)| t.id() == id)?;
    Some(clears.remove(pos).1)
}

fn replace_clear<'a, C>(clears: &mut Vec<(&'a Arc<dyn Texture>, C)>, target: &'a Arc<dyn Texture>, value: C) {
    clears.retain(|(t, _)| t.id() != target.id());
    clears.push((target, value));
}

impl<'a> Planner<'a> {
    fn new(alignment: u32) -> Self {
        Self {
            alignment: alignment.max(1) as usize,
            plan: Plan::default(),
            open: None,
            color_target: None,
            depth_target: None,
            color_clears: Vec::new(),
            depth_clears: Vec::new(),
            pipeline: None,
            block: Vec::new(),
            vertex: None,
            index: None,
            viewport: None,
            scissor: None,
        }
    }

    fn record(&mut self, command: &'a Command) -> RhiResult<()> {
        match command {
            Command::Barrier { .. } => {}
            Command::CopyBuffer { src, dst, size } => {
                self.close_pass();
                self.plan.ops.push(Op::Copy {
                    src: raw_buffer(src)?,
                    dst: raw_buffer(dst)?,
                    size: size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
                });
            }
            Command::SetViewport(v) => self.viewport = Some(*v),
            Command::SetScissor(s) => self.scissor = Some(*s),
            Command::ClearRenderTarget { target, color } => {
                self.close_pass();
                replace_clear(&mut self.color_clears, target, *color);
            }
            Command::ClearDepth { target, depth } => {
                self.close_pass();
                replace_clear(&mut self.depth_clears, target, *depth);
            }
            Command::SetRenderTargets { color, depth } => {
                self.close_pass();
                self.color_target = Some(color);
                self.depth_target = depth.as_ref();
            }
            Command::SetPipelineState(pso) => {
                let pso = pso
                    .as_any()
                    .downcast_ref::<WgpuPipelineState>()
                    .ok_or(RhiError::ForeignResource(pso.id()))?;
                self.block.resize(pso.constants_size as usize, 0);
                self.plan.pipelines.insert(pso.id, pso);
                self.pipeline = Some(pso);
            }
            Command::SetRootConstants { slot, values } => {
                let pso = self.pipeline.ok_or_else(|| {
                    RhiError::InvalidCommandList("root constants without a pipeline".into())
                })?;
                let param = pso.root_signature.parameters.get(*slot as usize);
                let offset = pso.offsets.get(*slot as usize);
                match (param, offset) {
                    (Some(p), Some(&offset)) if values.len() <= p.num_values as usize => {
                        let start = offset as usize;
                        let bytes: &[u8] = bytemuck::cast_slice(values);
                        self.block[start..start + bytes.len()].copy_from_slice(bytes);
                    }
                    _ => {
                        return Err(RhiError::InvalidCommandList(format!(
                            "root constant slot {slot} ({} values) does not fit '{}'",
                            values.len(),
                            pso.label
                        )))
                    }
                }
            }
            Command::SetVertexBuffer { buffer, .. } => self.vertex = Some(raw_buffer(buffer)?),
            Command::SetIndexBuffer { buffer, format } => {
                let format = match format {
                    IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
                    IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
                };
                self.index = Some((raw_buffer(buffer)?, format));
            }
            Command::DrawIndexed {
                index_count,
                start_index,
                base_vertex,
            } => {
                if self.index.is_none() {
                    return Err(RhiError::InvalidCommandList(
                        "indexed draw without an index buffer".into(),
                    ));
                }
                self.push_draw(DrawCall::Indexed {
                    index_count: *index_count,
                    start_index: *start_index,
                    base_vertex: *base_vertex,
                })?;
            }
            Command::Draw {
                vertex_count,
                start_vertex,
            } => self.push_draw(DrawCall::Plain {
                vertex_count: *vertex_count,
                start_vertex: *start_vertex,
            })?,
        }
        Ok(())
    }

    fn push_draw(&mut self, call: DrawCall) -> RhiResult<()> {
        let pipeline = self
            .pipeline
            .ok_or_else(|| RhiError::InvalidCommandList("draw without a pipeline".into()))?;
        let constants_offset = self.snapshot_constants();
        let draw = DrawOp {
            pipeline,
            vertex: self.vertex,
            index: self.index,
            call,
            constants_offset,
            viewport: self.viewport,
            scissor: self.scissor,
        };
        self.open_pass()?.draws.push(draw);
        Ok(())
    }

    fn snapshot_constants(&mut self) -> u32 {
        if self.block.is_empty() {
            return 0;
        }
        let offset = self.plan.constants.len();
        self.plan.constants.extend_from_slice(&self.block);
        let padded = self.plan.constants.len().next_multiple_of(self.alignment);
        self.plan.constants.resize(padded, 0);
        offset as u32
    }

    fn open_pass(&mut self) -> RhiResult<&mut PassOp<'a>> {
        if self.open.is_none() {
            let color = self
                .color_target
                .ok_or_else(|| RhiError::InvalidCommandList("draw without render targets".into()))?;
            let color = Attachment {
                view: texture_view(color.as_ref())?,
                clear: take_clear(&mut self.color_clears, color.id()),
            };
            let depth = match self.depth_target {
                Some(depth) => Some(Attachment {
                    view: texture_view(depth.as_ref())?,
                    clear: take_clear(&mut self.depth_clears, depth.id()),
                }),
                None => None,
            };
            self.open = Some(PassOp {
                color: Some(color),
                depth,
                draws: Vec::new(),
            });
        }
        self.open
            .as_mut()
            .ok_or_else(|| RhiError::InvalidCommandList("no open pass".into()))
    }

    fn close_pass(&mut self) {
        if let Some(pass) = self.open.take() {
            self.plan.ops.push(Op::Pass(pass));
        }
    }

    /// Close the last pass and turn clears no draw consumed into clear-only passes.
    fn finish(mut self) -> RhiResult<Plan<'a>> {
        self.close_pass();
        for (target, color) in std::mem::take(&mut self.color_clears) {
            self.plan.ops.push(Op::Pass(PassOp {
                color: Some(Attachment {
                    view: texture_view(target.as_ref())?,
                    clear: Some(color),
                }),
                depth: None,
                draws: Vec::new(),
            }));
        }
        for (target, depth) in std::mem::take(&mut self.depth_clears) {
            self.plan.ops.push(Op::Pass(PassOp {
                color: None,
                depth: Some(Attachment {
                    view: texture_view(target.as_ref())?,
                    clear: Some(depth),
                }),
                draws: Vec::new(),
            }));
        }
        Ok(self.plan)
    }
}

fn ensure_ring<'r>(
    device: &wgpu::Device,
    slot: &'r mut Option<wgpu::Buffer>,
    needed: u64,
) -> &'r wgpu::Buffer {
    if slot.as_ref().is_some_and(|ring| ring.size() < needed) {
        *slot = None;
    }
    slot.get_or_insert_with(|| {
        let size = needed.next_power_of_two().max(4096);
        log::debug!("root constant ring grown to {size} bytes");
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("xesqe root constants"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    })
}

fn encode_pass(
    encoder: &mut wgpu::CommandEncoder,
    pass: &PassOp<'_>,
    bind_groups: &HashMap<ResourceId, wgpu::BindGroup>,
) {
    let colors: Vec<Option<wgpu::RenderPassColorAttachment>> = pass
        .color
        .iter()
        .map(|a| {
            Some(wgpu::RenderPassColorAttachment {
                view: &a.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: match a.clear {
                        Some([r, g, b, alpha]) => wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: alpha as f64,
                        }),
                        None => wgpu::LoadOp::Load,
                    },
                    store: wgpu::StoreOp::Store,
                },
            })
        })
        .collect();
    let depth = pass
        .depth
        .as_ref()
        .map(|a| wgpu::RenderPassDepthStencilAttachment {
            view: &a.view,
            depth_ops: Some(wgpu::Operations {
                load: a.clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        });
    let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("xesqe pass"),
        color_attachments: &colors,
        depth_stencil_attachment: depth,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    for draw in &pass.draws {
        rp.set_pipeline(&draw.pipeline.raw);
        if let Some(group) = bind_groups.get(&draw.pipeline.id) {
            rp.set_bind_group(0, group, &[draw.constants_offset]);
        }
        if let Some(v) = draw.viewport {
            rp.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth);
        }
        if let Some(s) = draw.scissor {
            rp.set_scissor_rect(
                s.left,
                s.top,
                s.right.saturating_sub(s.left),
                s.bottom.saturating_sub(s.top),
            );
        }
        if let Some(vertex) = draw.vertex {
            rp.set_vertex_buffer(0, vertex.slice(..));
        }
        match draw.call {
            DrawCall::Indexed {
                index_count,
                start_index,
                base_vertex,
            } => {
                if let Some((index, format)) = draw.index {
                    rp.set_index_buffer(index.slice(..), format);
                }
                rp.draw_indexed(start_index..start_index + index_count, base_vertex, 0..1);
            }
            DrawCall::Plain {
                vertex_count,
                start_vertex,
            } => rp.draw(start_vertex..start_vertex + vertex_count, 0..1),
        }
    }
}

pub(super) fn execute(device: &WgpuDevice, list: &CommandList) -> RhiResult<()> {
    if list.state() != ListState::Closed {
        return Err(RhiError::InvalidCommandList(format!(
            "'{}' executed while {:?}",
            list.label(),
            list.state()
        )));
    }
    let mut planner = Planner::new(device.uniform_alignment());
    for command in list.commands() {
        planner.record(command)?;
    }
    let plan = planner.finish()?;

    let mut ring = device.ring.lock().unwrap_or_else(PoisonError::into_inner);
    let mut bind_groups = HashMap::new();
    if !plan.constants.is_empty() {
        let ring = ensure_ring(&device.device, &mut ring, plan.constants.len() as u64);
        device.queue.write_buffer(ring, 0, &plan.constants);
        for pso in plan.pipelines.values() {
            let Some(size) = NonZeroU64::new(pso.constants_size) else {
                continue;
            };
            let group = device.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(pso.label),
                layout: &pso.bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: ring,
                        offset: 0,
                        size: Some(size),
                    }),
                }],
            });
            bind_groups.insert(pso.id, group);
        }
    }

    let mut encoder = device
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(list.label()),
        });
    for op in &plan.ops {
        match op {
            Op::Copy { src, dst, size } => encoder.copy_buffer_to_buffer(src, 0, dst, 0, *size),
            Op::Pass(pass) => encode_pass(&mut encoder, pass, &bind_groups),
        }
    }
    device.queue.submit(Some(encoder.finish()));
    log::trace!(
        "executed '{}': {} ops, {} constant bytes",
        list.label(),
        plan.ops.len(),
        plan.constants.len()
    );
    Ok(())
}
