use std::num::NonZeroU64;

use crate::{
    CompareFunc, CullMode, FrontFace, PipelineState, PipelineStateDescriptor, PrimitiveTopology,
    ResourceId, RootSignatureDescriptor, ShaderVisibility, VertexFormat,
};

use super::texture::texture_format;

/// A render pipeline plus the uniform layout that stands in for its root constants.
pub struct WgpuPipelineState {
    pub(crate) raw: wgpu::RenderPipeline,
    pub(crate) bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) root_signature: RootSignatureDescriptor,
    pub(crate) offsets: Vec<u32>,
    pub(crate) constants_size: u64,
    pub(crate) label: &'static str,
    pub(crate) id: ResourceId,
}

impl std::fmt::Debug for WgpuPipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuPipelineState")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("constants_size", &self.constants_size)
            .finish()
    }
}

impl PipelineState for WgpuPipelineState {
    fn id(&self) -> ResourceId {
        self.id
    }
    fn root_signature(&self) -> &RootSignatureDescriptor {
        &self.root_signature
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32 => wgpu::VertexFormat::Float32,
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn compare_function(func: CompareFunc) -> wgpu::CompareFunction {
    match func {
        CompareFunc::Never => wgpu::CompareFunction::Never,
        CompareFunc::Less => wgpu::CompareFunction::Less,
        CompareFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunc::Equal => wgpu::CompareFunction::Equal,
        CompareFunc::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
        CompareFunc::Greater => wgpu::CompareFunction::Greater,
        CompareFunc::Always => wgpu::CompareFunction::Always,
    }
}

fn visibility(sig: &RootSignatureDescriptor) -> wgpu::ShaderStages {
    sig.parameters
        .iter()
        .fold(wgpu::ShaderStages::NONE, |acc, p| {
            acc | match p.visibility {
                ShaderVisibility::All => wgpu::ShaderStages::VERTEX_FRAGMENT,
                ShaderVisibility::Vertex => wgpu::ShaderStages::VERTEX,
                ShaderVisibility::Pixel => wgpu::ShaderStages::FRAGMENT,
            }
        })
}

pub(super) fn create_pipeline(
    device: &wgpu::Device,
    desc: &PipelineStateDescriptor,
    id: ResourceId,
) -> WgpuPipelineState {
    let constants_size = desc.root_signature.constants_size() as u64;
    let entries: Vec<wgpu::BindGroupLayoutEntry> = NonZeroU64::new(constants_size)
        .map(|size| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: visibility(&desc.root_signature),
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: Some(size),
            },
            count: None,
        })
        .into_iter()
        .collect();
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(desc.label),
        entries: &entries,
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });
    let vs = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(desc.vertex_shader.source.clone()),
    });
    let ps = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(desc.pixel_shader.source.clone()),
    });
    let attributes: Vec<wgpu::VertexAttribute> = desc
        .input_layout
        .elements
        .iter()
        .enumerate()
        .map(|(location, e)| wgpu::VertexAttribute {
            format: vertex_format(e.format),
            offset: e.offset as u64,
            shader_location: location as u32,
        })
        .collect();
    let ds = desc.depth_stencil;
    let depth_stencil = desc.dsv_format.map(|format| wgpu::DepthStencilState {
        format: texture_format(format),
        depth_write_enabled: ds.depth_enable && ds.depth_write,
        depth_compare: if ds.depth_enable {
            compare_function(ds.compare)
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    });
    let raw = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vs,
            entry_point: Some(desc.vertex_shader.entry_point),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: desc.input_layout.stride as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: match desc.topology {
                PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
                PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            },
            strip_index_format: None,
            front_face: match desc.rasterizer.front_face {
                FrontFace::Clockwise => wgpu::FrontFace::Cw,
                FrontFace::CounterClockwise => wgpu::FrontFace::Ccw,
            },
            cull_mode: match desc.rasterizer.cull_mode {
                CullMode::None => None,
                CullMode::Front => Some(wgpu::Face::Front),
                CullMode::Back => Some(wgpu::Face::Back),
            },
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &ps,
            entry_point: Some(desc.pixel_shader.entry_point),
            targets: &[Some(wgpu::ColorTargetState {
                format: texture_format(desc.rtv_format),
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    });
    WgpuPipelineState {
        raw,
        bind_group_layout,
        root_signature: desc.root_signature.clone(),
        offsets: desc.root_signature.constant_offsets(),
        constants_size,
        label: desc.label,
        id,
    }
}
