//! The demo application: owns every GPU resource and drives the flush-per-frame loop.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use xesqe_rhi::Device;
use xesqe_world::{light_marker, load_obj, Mesh, Scene, Terrain};

use crate::config::AppConfig;
use crate::context::GpuContext;
use crate::error::Result;
use crate::frame::{record_frame, FrameStage, FrameTargets, MarkerDraw, MeshDraw};
use crate::input::{scene_input, DragState, InputEvent, KeyState};
use crate::pipeline::{DrawConstants, Pipelines};
use crate::surface::{PresentationSurface, DEPTH_FORMAT};
use crate::upload::{DebugBuffers, MeshBuffers};

const MARKER_SEGMENTS: u32 = 32;
const MARKER_RADIUS: f32 = 2.0;
const MARKER_COLOR: [f32; 3] = [1.0, 1.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub struct Application {
    // Dropped first: its final flush runs while the resources below are still alive.
    gpu: GpuContext,
    surface: PresentationSurface,
    pipelines: Pipelines,
    terrain_mesh: MeshBuffers,
    model_mesh: MeshBuffers,
    marker: Option<DebugBuffers>,
    scene: Scene,
    config: AppConfig,
    drag: DragState,
    stage: FrameStage,
}

impl Application {
    /// Load the model named by the config and set everything up.
    pub fn initialize(device: Arc<dyn Device>, config: AppConfig) -> Result<Self> {
        let model = load_obj(&config.model_path)?;
        Self::initialize_with_mesh(device, config, model)
    }

    pub fn initialize_with_mesh(
        device: Arc<dyn Device>,
        config: AppConfig,
        model: Mesh,
    ) -> Result<Self> {
        let terrain = Terrain::new(config.terrain)?;
        let terrain_data = terrain.to_mesh();

        let mut gpu = GpuContext::new(device.clone())?;
        let surface = PresentationSurface::new(
            device.as_ref(),
            config.width,
            config.height,
            config.sync_interval(),
        )?;
        let pipelines = Pipelines::build(device.as_ref(), surface.format(), DEPTH_FORMAT)?;

        let list = gpu.begin_commands()?;
        let mut terrain_mesh = MeshBuffers::upload(
            device.as_ref(),
            list,
            "terrain",
            &terrain_data.vertices,
            &terrain_data.indices,
        )?;
        let mut model_mesh =
            MeshBuffers::upload(device.as_ref(), list, "model", &model.vertices, &model.indices)?;
        let mut marker = if config.light_marker {
            let disc = light_marker(MARKER_SEGMENTS, MARKER_RADIUS, MARKER_COLOR);
            Some(DebugBuffers::upload(device.as_ref(), list, "light marker", &disc)?)
        } else {
            None
        };
        surface.record_depth_init(list);

        let retire_at = gpu.submit()?;
        terrain_mesh.bind_retire(retire_at);
        model_mesh.bind_retire(retire_at);
        if let Some(m) = marker.as_mut() {
            m.vertices.bind_retire(retire_at);
        }
        gpu.flush()?;

        let completed = gpu.completed_fence();
        terrain_mesh.release_staging(completed);
        model_mesh.release_staging(completed);
        if let Some(m) = marker.as_mut() {
            m.vertices.release_staging(completed);
        }

        let mut scene = Scene::new(terrain, config.scene_settings());
        scene.set_aspect(surface.aspect());

        log::info!(
            "initialized on {}: terrain {} triangles, model {} triangles",
            device.adapter_name(),
            terrain_data.triangle_count(),
            model.triangle_count()
        );

        Ok(Self {
            gpu,
            surface,
            pipelines,
            terrain_mesh,
            model_mesh,
            marker,
            scene,
            config,
            drag: DragState::default(),
            stage: FrameStage::Idle,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn stage(&self) -> FrameStage {
        self.stage
    }

    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn handle_event(&mut self, event: InputEvent) -> Result<Control> {
        match event {
            InputEvent::Resize { width, height } => self.resize(width, height)?,
            InputEvent::MouseDown { button, x, y } => self.drag.begin(button, x, y),
            InputEvent::MouseUp { button, .. } => self.drag.end(button),
            InputEvent::MouseMove { x, y } => self.drag.motion(x, y),
            InputEvent::Reset => self.scene.reset(),
            InputEvent::Close => return Ok(Control::Quit),
        }
        Ok(Control::Continue)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_captured()
    }

    pub fn update(&mut self, dt: f32, keys: &dyn KeyState) {
        let input = scene_input(keys, &mut self.drag, self.config.impulse_strength);
        self.scene.step(dt, &input);
    }

    /// Record, submit and present one frame, then wait for the GPU to finish it.
    pub fn draw(&mut self) -> Result<()> {
        let back_buffer = self.surface.current_back_buffer()?;
        let depth = self.surface.depth().clone();
        let targets = FrameTargets {
            back_buffer: &back_buffer,
            depth: &depth,
            viewport: self.surface.viewport(),
            scissor: self.surface.scissor(),
            clear_color: self.config.clear_color,
        };

        let camera = self.scene.camera();
        let light = self.scene.light();
        let view_proj = camera.view_proj();
        let constants = |world: Mat4| DrawConstants {
            world,
            view_proj,
            camera_pos: camera.position(),
            light_pos: light.position(),
            light_color: light.color,
        };
        let meshes = [
            MeshDraw {
                pipeline: &self.pipelines.pbr,
                mesh: &self.terrain_mesh,
                constants: constants(Mat4::IDENTITY),
            },
            MeshDraw {
                pipeline: &self.pipelines.pbr,
                mesh: &self.model_mesh,
                constants: constants(self.scene.model_world()),
            },
        ];
        let marker = self.marker.as_ref().map(|buffers| MarkerDraw {
            pipeline: &self.pipelines.debug,
            buffers,
            wvp: view_proj * Mat4::from_translation(light.position() - Vec3::Y),
        });

        let list = self.gpu.begin_commands()?;
        self.stage = FrameStage::Recording;
        record_frame(list, &targets, &meshes, marker.as_ref());

        self.gpu.submit()?;
        self.stage = FrameStage::Submitted;
        self.surface.present()?;
        self.stage = FrameStage::Presented;
        self.gpu.flush()?;
        self.stage = FrameStage::Idle;
        log::trace!("frame done at fence {}", self.gpu.current_fence());
        Ok(())
    }

    /// Advance the scene by the fixed timestep and draw a frame.
    pub fn tick(&mut self, keys: &dyn KeyState) -> Result<()> {
        self.update(self.config.fixed_dt, keys);
        self.draw()
    }

    /// Recreate the size-dependent resources. A zero-sized area (minimized window) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let device = self.gpu.device().clone();
        self.gpu.flush()?;
        // drops the list's references to the old back buffers
        self.gpu.begin_commands()?;
        self.surface.resize(device.as_ref(), width, height)?;
        self.surface.record_depth_init(self.gpu.commands());
        self.gpu.submit()?;
        self.gpu.flush()?;
        self.scene.set_aspect(self.surface.aspect());
        log::info!("resized to {width}x{height}");
        Ok(())
    }
}
