//! Root signatures, vertex layouts and the two pipeline states the demo draws with.

use std::borrow::Cow;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use xesqe_rhi::{
    CommandList, CullMode, DepthStencilState, Device, InputLayout, PipelineState,
    PipelineStateDescriptor, PrimitiveTopology, RasterizerState, RhiResult, RootParameter,
    RootSignatureDescriptor, ShaderProgram, ShaderVisibility, TextureFormat, VertexFormat,
};

const PBR_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/pbr.wgsl"));
const DEBUG_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/debug.wgsl"));

pub const SLOT_WVP: u32 = 0;
pub const SLOT_CAMERA_POS: u32 = 1;
pub const SLOT_LIGHT_POS: u32 = 2;
pub const SLOT_LIGHT_COLOR: u32 = 3;
pub const SLOT_WORLD: u32 = 4;

fn constants(shader_register: u32, num_values: u32) -> RootParameter {
    RootParameter {
        num_values,
        shader_register,
        visibility: ShaderVisibility::All,
    }
}

/// WVP, camera position, light position, light color, world.
pub fn pbr_root_signature() -> RootSignatureDescriptor {
    RootSignatureDescriptor {
        parameters: vec![
            constants(SLOT_WVP, 16),
            constants(SLOT_CAMERA_POS, 4),
            constants(SLOT_LIGHT_POS, 4),
            constants(SLOT_LIGHT_COLOR, 4),
            constants(SLOT_WORLD, 16),
        ],
    }
}

pub fn debug_root_signature() -> RootSignatureDescriptor {
    RootSignatureDescriptor {
        parameters: vec![constants(SLOT_WVP, 16)],
    }
}

/// Matches [`xesqe_world::Vertex`].
pub fn pbr_input_layout() -> InputLayout {
    InputLayout::packed(&[
        ("POSITION", VertexFormat::Float32x3),
        ("NORMAL", VertexFormat::Float32x3),
        ("ALBEDO", VertexFormat::Float32x3),
        ("METALLIC", VertexFormat::Float32),
        ("ROUGHNESS", VertexFormat::Float32),
        ("AO", VertexFormat::Float32),
    ])
}

/// Matches [`xesqe_world::DebugVertex`].
pub fn debug_input_layout() -> InputLayout {
    InputLayout::packed(&[
        ("POSITION", VertexFormat::Float32x3),
        ("COLOR", VertexFormat::Float32x3),
    ])
}

fn program(source: &'static str, entry_point: &'static str) -> ShaderProgram {
    ShaderProgram {
        source: Cow::Borrowed(source),
        entry_point,
    }
}

pub fn pbr_pipeline_desc(rtv_format: TextureFormat, dsv_format: TextureFormat) -> PipelineStateDescriptor {
    PipelineStateDescriptor {
        label: "pbr",
        root_signature: pbr_root_signature(),
        vertex_shader: program(PBR_SHADER, "vs_main"),
        pixel_shader: program(PBR_SHADER, "fs_main"),
        input_layout: pbr_input_layout(),
        topology: PrimitiveTopology::TriangleList,
        rasterizer: RasterizerState::default(),
        depth_stencil: DepthStencilState::default(),
        rtv_format,
        dsv_format: Some(dsv_format),
    }
}

pub fn debug_pipeline_desc(rtv_format: TextureFormat, dsv_format: TextureFormat) -> PipelineStateDescriptor {
    PipelineStateDescriptor {
        label: "debug",
        root_signature: debug_root_signature(),
        vertex_shader: program(DEBUG_SHADER, "vs_main"),
        pixel_shader: program(DEBUG_SHADER, "fs_main"),
        input_layout: debug_input_layout(),
        topology: PrimitiveTopology::TriangleList,
        rasterizer: RasterizerState {
            cull_mode: CullMode::None,
            ..RasterizerState::default()
        },
        depth_stencil: DepthStencilState::disabled(),
        rtv_format,
        dsv_format: Some(dsv_format),
    }
}

#[derive(Debug, Clone)]
pub struct Pipelines {
    pub pbr: Arc<dyn PipelineState>,
    pub debug: Arc<dyn PipelineState>,
}

impl Pipelines {
    pub fn build(
        device: &dyn Device,
        rtv_format: TextureFormat,
        dsv_format: TextureFormat,
    ) -> RhiResult<Self> {
        Ok(Self {
            pbr: device.create_pipeline_state(&pbr_pipeline_desc(rtv_format, dsv_format))?,
            debug: device.create_pipeline_state(&debug_pipeline_desc(rtv_format, dsv_format))?,
        })
    }
}

/// Per-draw constants of the PBR pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawConstants {
    pub world: Mat4,
    pub view_proj: Mat4,
    pub camera_pos: Vec3,
    pub light_pos: Vec3,
    pub light_color: Vec3,
}

impl DrawConstants {
    pub fn wvp(&self) -> Mat4 {
        self.view_proj * self.world
    }

    pub fn record(&self, list: &mut CommandList) {
        list.set_root_constants(SLOT_WVP, &self.wvp().to_cols_array());
        list.set_root_constants(SLOT_CAMERA_POS, &self.camera_pos.extend(0.0).to_array());
        list.set_root_constants(SLOT_LIGHT_POS, &self.light_pos.extend(0.0).to_array());
        list.set_root_constants(SLOT_LIGHT_COLOR, &self.light_color.extend(0.0).to_array());
        list.set_root_constants(SLOT_WORLD, &self.world.to_cols_array());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_layouts_match_vertex_structs() {
        assert_eq!(
            pbr_input_layout().stride as usize,
            std::mem::size_of::<xesqe_world::Vertex>()
        );
        assert_eq!(
            debug_input_layout().stride as usize,
            std::mem::size_of::<xesqe_world::DebugVertex>()
        );
        assert_eq!(pbr_input_layout().elements[3].offset, 36);
    }

    #[test]
    fn pbr_constants_fit_the_shader_block() {
        let sig = pbr_root_signature();
        assert_eq!(sig.constant_offsets(), vec![0, 64, 80, 96, 112]);
        assert_eq!(sig.constants_size(), 176);
    }

    #[test]
    fn debug_pipeline_skips_depth_and_culling() {
        let desc = debug_pipeline_desc(TextureFormat::Bgra8Unorm, TextureFormat::D32Float);
        assert!(!desc.depth_stencil.depth_enable);
        assert_eq!(desc.rasterizer.cull_mode, CullMode::None);
        let pbr = pbr_pipeline_desc(TextureFormat::Bgra8Unorm, TextureFormat::D32Float);
        assert!(pbr.depth_stencil.depth_enable);
        assert_eq!(pbr.rasterizer.cull_mode, CullMode::Back);
    }
}
