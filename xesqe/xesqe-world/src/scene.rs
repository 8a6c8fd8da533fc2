//! Everything that moves, advanced together once per tick.

use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::camera::{fly, Camera, FlyInput};
use crate::light::LightOrbit;
use crate::physics::{step, Body, PhysicsParams};
use crate::terrain::Terrain;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    pub camera_start: Vec3,
    /// World units per second.
    pub camera_speed: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// The body is dropped from this height above the origin.
    pub spawn_height: f32,
    pub physics: PhysicsParams,
    pub physics_enabled: bool,
    pub light: LightOrbit,
    /// Launch speed for a body jump.
    pub jump_speed: f32,
    /// `None` draws a seed from entropy.
    pub seed: Option<u64>,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            camera_start: Vec3::new(0.0, 20.0, -60.0),
            camera_speed: 10.0,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 1.0,
            far: 1000.0,
            spawn_height: 20.0,
            physics: PhysicsParams::default(),
            physics_enabled: true,
            light: LightOrbit::default(),
            jump_speed: 8.0,
            seed: None,
        }
    }
}

/// Input gathered for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SceneInput {
    pub fly: FlyInput,
    /// Impulse applied to the body this tick.
    pub impulse: Vec3,
    pub jump: bool,
}

#[derive(Debug)]
pub struct Scene {
    settings: SceneSettings,
    terrain: Terrain,
    camera: Camera,
    body: Body,
    light: LightOrbit,
    rng: StdRng,
}

impl Scene {
    pub fn new(terrain: Terrain, settings: SceneSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            camera: Self::spawn_camera(&settings),
            body: Self::spawn_body(&settings),
            light: settings.light,
            settings,
            terrain,
            rng,
        }
    }

    fn spawn_camera(settings: &SceneSettings) -> Camera {
        let mut camera = Camera::new(settings.camera_start);
        camera.set_lens(settings.fov_y, camera.aspect(), settings.near, settings.far);
        camera
    }

    fn spawn_body(settings: &SceneSettings) -> Body {
        Body::at(Vec3::new(0.0, settings.spawn_height, 0.0))
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn light(&self) -> &LightOrbit {
        &self.light
    }

    /// World transform of the model. Identity when physics is off.
    pub fn model_world(&self) -> Mat4 {
        if self.settings.physics_enabled {
            self.body.world_matrix()
        } else {
            Mat4::IDENTITY
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        let c = &mut self.camera;
        c.set_lens(c.fov_y(), aspect, c.near(), c.far());
    }

    pub fn step(&mut self, dt: f32, input: &SceneInput) {
        self.camera = fly(self.camera, &input.fly, self.settings.camera_speed, dt);
        self.light = self.light.advance(dt);

        if !self.settings.physics_enabled {
            return;
        }
        let mut body = self.body.with_impulse(input.impulse);
        if input.jump {
            body = body.jump(self.settings.jump_speed);
        }
        self.body = step(
            body,
            &self.settings.physics,
            &self.terrain,
            dt,
            &mut self.rng,
        );
    }

    /// Put the camera and the body back where they started. The lens aspect is kept.
    pub fn reset(&mut self) {
        let aspect = self.camera.aspect();
        self.camera = Self::spawn_camera(&self.settings);
        self.set_aspect(aspect);
        self.body = Self::spawn_body(&self.settings);
        log::info!("scene reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainConfig;

    fn scene(physics_enabled: bool) -> Scene {
        let terrain = Terrain::new(TerrainConfig::default()).unwrap();
        Scene::new(
            terrain,
            SceneSettings {
                seed: Some(42),
                physics_enabled,
                ..SceneSettings::default()
            },
        )
    }

    #[test]
    fn body_falls_and_lands_on_the_terrain() {
        let mut s = scene(true);
        for _ in 0..2000 {
            s.step(0.016, &SceneInput::default());
        }
        let b = s.body();
        let floor = s.terrain().height_at(b.position.x, b.position.z);
        assert!(b.on_ground);
        assert!((b.position.y - (floor + 1.0)).abs() < 1e-3);
    }

    #[test]
    fn reset_restores_spawn_and_keeps_aspect() {
        let mut s = scene(true);
        s.set_aspect(2.0);
        let input = SceneInput {
            fly: FlyInput {
                forward: 1.0,
                yaw: 0.1,
                ..FlyInput::default()
            },
            ..SceneInput::default()
        };
        for _ in 0..30 {
            s.step(0.016, &input);
        }
        assert_ne!(s.camera().position(), s.settings().camera_start);
        s.reset();
        assert_eq!(s.camera().position(), s.settings().camera_start);
        assert_eq!(s.camera().look(), Vec3::Z);
        assert_eq!(s.camera().aspect(), 2.0);
        assert_eq!(s.body().position, Vec3::new(0.0, 20.0, 0.0));
    }

    #[test]
    fn physics_off_freezes_the_model() {
        let mut s = scene(false);
        s.step(0.016, &SceneInput::default());
        assert_eq!(s.body().position, Vec3::new(0.0, 20.0, 0.0));
        assert_eq!(s.model_world(), Mat4::IDENTITY);
    }

    #[test]
    fn seeded_scenes_agree() {
        let (mut a, mut b) = (scene(true), scene(true));
        for _ in 0..400 {
            a.step(0.016, &SceneInput::default());
            b.step(0.016, &SceneInput::default());
        }
        assert_eq!(a.body(), b.body());
    }
}
