//! Demo configuration: window, content, simulation and lens settings.

use std::path::PathBuf;

use glam::Vec3;
use xesqe_world::{LightOrbit, PhysicsParams, SceneSettings, TerrainConfig};

/// Cornflower blue.
pub const CLEAR_COLOR: [f32; 4] = [0.392, 0.584, 0.929, 1.0];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    /// Initial client area in physical pixels.
    pub width: u32,
    pub height: u32,
    pub model_path: PathBuf,
    pub terrain: TerrainConfig,
    pub physics: PhysicsParams,
    /// Run the body simulation. When off the model stays at the origin.
    pub physics_enabled: bool,
    pub spawn_height: f32,
    /// Fixed RNG seed for bounce torque; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Seconds the scene advances per redraw.
    pub fixed_dt: f32,
    pub camera_start: Vec3,
    /// World units per second.
    pub camera_speed: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub clear_color: [f32; 4],
    pub light: LightOrbit,
    /// Draw the flat disc under the light with the debug pipeline.
    pub light_marker: bool,
    /// Present with vertical sync (interval 1) or immediately (interval 0).
    pub vsync: bool,
    /// Impulse magnitude per tick while an arrow key is held.
    pub impulse_strength: f32,
    pub jump_speed: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let scene = SceneSettings::default();
        Self {
            title: "Xesqe".to_string(),
            width: 1280,
            height: 720,
            model_path: PathBuf::from("assets/model.obj"),
            terrain: TerrainConfig::default(),
            physics: scene.physics,
            physics_enabled: scene.physics_enabled,
            spawn_height: scene.spawn_height,
            seed: None,
            fixed_dt: 0.016,
            camera_start: scene.camera_start,
            camera_speed: scene.camera_speed,
            fov_y: scene.fov_y,
            near: scene.near,
            far: scene.far,
            clear_color: CLEAR_COLOR,
            light: scene.light,
            light_marker: false,
            vsync: true,
            impulse_strength: 0.5,
            jump_speed: scene.jump_speed,
        }
    }
}

impl AppConfig {
    /// Apply `XESQE_MODEL`, `XESQE_SEED`, `XESQE_NO_PHYSICS` and `XESQE_LIGHT_MARKER`.
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = var("XESQE_MODEL").filter(|p| !p.is_empty()) {
            self.model_path = PathBuf::from(path);
        }
        if let Some(seed) = var("XESQE_SEED") {
            match seed.trim().parse() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => log::warn!("ignoring XESQE_SEED={seed:?}: not an integer"),
            }
        }
        if var("XESQE_NO_PHYSICS").is_some_and(|v| is_truthy(&v)) {
            self.physics_enabled = false;
        }
        if let Some(v) = var("XESQE_LIGHT_MARKER") {
            self.light_marker = is_truthy(&v);
        }
        self
    }

    pub fn sync_interval(&self) -> u32 {
        u32::from(self.vsync)
    }

    pub fn scene_settings(&self) -> SceneSettings {
        SceneSettings {
            camera_start: self.camera_start,
            camera_speed: self.camera_speed,
            fov_y: self.fov_y,
            near: self.near,
            far: self.far,
            spawn_height: self.spawn_height,
            physics: self.physics,
            physics_enabled: self.physics_enabled,
            light: self.light,
            jump_speed: self.jump_speed,
            seed: self.seed,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
