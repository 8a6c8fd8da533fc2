//! Rigid-body bounce over a height field.
//!
//! [`step`] advances a [`Body`] by one tick with semi-implicit Euler. Contact with the ground snaps the
//! body back up, reflects its fall scaled by the bounciness and kicks it with a random torque. Slow
//! impacts settle the body on the ground, where friction bleeds off its horizontal and angular motion.

use glam::{Mat4, Quat, Vec3};
use rand::Rng;

pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Height field the body collides with.
pub trait Ground {
    fn height_at(&self, x: f32, z: f32) -> f32;
}

/// Infinite plane at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatGround(pub f32);

impl Ground for FlatGround {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Distance from the body's origin to its lowest point.
    pub ground_offset: f32,
    /// Impacts slower than this settle the body instead of bouncing it.
    pub rest_speed: f32,
    /// Peak random torque per unit of impact speed.
    pub torque_per_impact: f32,
    /// How many times faster angular motion decays on the ground than linear motion.
    pub angular_friction_scale: f32,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            ground_offset: 1.0,
            rest_speed: 0.5,
            torque_per_impact: 0.2,
            angular_friction_scale: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    pub orientation: Quat,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub bounciness: f32,
    pub friction: f32,
    pub angular_damping: f32,
    pub on_ground: bool,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: GRAVITY,
            orientation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            bounciness: 0.5,
            friction: 0.8,
            angular_damping: 0.5,
            on_ground: false,
        }
    }
}

impl Body {
    /// A body at rest at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Rotation first, then translation.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Change velocity by `impulse / mass`.
    pub fn with_impulse(mut self, impulse: Vec3) -> Self {
        if self.mass > 0.0 {
            self.velocity += impulse / self.mass;
        }
        self
    }

    /// Launch upward if resting on the ground; otherwise unchanged.
    pub fn jump(mut self, speed: f32) -> Self {
        if self.on_ground {
            self.velocity.y += speed;
            self.on_ground = false;
        }
        self
    }
}

/// Advance `body` by `dt` seconds.
pub fn step<G, R>(body: Body, params: &PhysicsParams, ground: &G, dt: f32, rng: &mut R) -> Body
where
    G: Ground + ?Sized,
    R: Rng + ?Sized,
{
    let mut b = body;

    b.velocity += b.acceleration * dt;
    b.position += b.velocity * dt;

    b.angular_velocity *= (1.0 - b.angular_damping * dt).max(0.0);
    let angular_speed = b.angular_velocity.length();
    if angular_speed > 1e-3 {
        let delta = Quat::from_axis_angle(b.angular_velocity / angular_speed, angular_speed * dt);
        b.orientation = (b.orientation * delta).normalize();
    }

    let floor = ground.height_at(b.position.x, b.position.z);
    if b.position.y - params.ground_offset <= floor {
        b.position.y = floor + params.ground_offset;
        if !b.on_ground && b.velocity.y < 0.0 {
            let impact = -b.velocity.y;
            if impact < params.rest_speed {
                b.on_ground = true;
                b.velocity.y = 0.0;
            } else {
                b.velocity.y = impact * b.bounciness;
                let kick = params.torque_per_impact * impact;
                b.angular_velocity += Vec3::new(
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                ) * kick;
            }
        } else if b.on_ground {
            b.velocity.y = b.velocity.y.max(0.0);
        }
    } else {
        b.on_ground = false;
    }

    if b.on_ground {
        let linear = (-b.friction * dt).exp();
        b.velocity.x *= linear;
        b.velocity.z *= linear;
        b.angular_velocity *= (-b.friction * params.angular_friction_scale * dt).exp();
    }

    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DT: f32 = 0.016;

    fn run_until_settled(mut body: Body, rng: &mut StdRng) -> (Vec<f32>, usize, Body) {
        let params = PhysicsParams::default();
        let ground = FlatGround(0.0);
        let mut peaks = Vec::new();
        let mut prev = body;
        for tick in 0..20_000 {
            let next = step(body, &params, &ground, DT, rng);
            if prev.velocity.y > 0.0 && body.velocity.y > 0.0 && next.velocity.y <= 0.0 {
                peaks.push(next.position.y);
            }
            prev = body;
            body = next;
            if body.on_ground {
                return (peaks, tick, body);
            }
        }
        (peaks, usize::MAX, body)
    }

    #[test]
    fn dropped_body_loses_height_every_bounce_and_settles() {
        let mut rng = StdRng::seed_from_u64(7);
        let (peaks, ticks, body) = run_until_settled(Body::at(Vec3::new(0.0, 20.0, 0.0)), &mut rng);
        assert!(ticks < 20_000, "body never settled");
        assert!(peaks.len() >= 2);
        assert!(peaks.windows(2).all(|w| w[1] < w[0]), "{peaks:?}");
        assert!(peaks[0] < 20.0);
        assert!(body.on_ground);
        assert_eq!(body.velocity.y, 0.0);
        assert!((body.position.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn vertical_drop_stays_on_its_column() {
        let mut rng = StdRng::seed_from_u64(1);
        let start = Vec3::new(3.0, 10.0, -2.0);
        let (_, _, body) = run_until_settled(Body::at(start), &mut rng);
        assert_eq!(body.position.x, start.x);
        assert_eq!(body.position.z, start.z);
    }

    #[test]
    fn resting_body_does_not_bounce_again() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = PhysicsParams::default();
        let mut body = Body {
            on_ground: true,
            ..Body::at(Vec3::new(0.0, params.ground_offset, 0.0))
        };
        for _ in 0..100 {
            body = step(body, &params, &FlatGround(0.0), DT, &mut rng);
            assert!(body.on_ground);
            assert_eq!(body.velocity.y, 0.0);
            assert_eq!(body.angular_velocity, Vec3::ZERO);
        }
    }

    #[test]
    fn hard_impact_bounces_and_spins() {
        let mut rng = StdRng::seed_from_u64(11);
        let params = PhysicsParams::default();
        let body = Body {
            velocity: Vec3::new(0.0, -10.0, 0.0),
            ..Body::at(Vec3::new(0.0, 1.05, 0.0))
        };
        let after = step(body, &params, &FlatGround(0.0), DT, &mut rng);
        let impact = 10.0 + 9.81 * DT;
        assert!((after.velocity.y - impact * body.bounciness).abs() < 1e-4);
        assert!(!after.on_ground);
        assert!(after.angular_velocity.length() > 0.0);
        assert!(after.angular_velocity.abs().max_element() <= params.torque_per_impact * impact);
    }

    #[test]
    fn same_seed_same_trajectory() {
        let body = Body {
            velocity: Vec3::new(1.0, -8.0, 0.5),
            ..Body::at(Vec3::new(0.0, 1.5, 0.0))
        };
        let params = PhysicsParams::default();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..300).fold(body, |b, _| step(b, &params, &FlatGround(0.0), DT, &mut rng))
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn orientation_stays_unit_length() {
        let mut rng = StdRng::seed_from_u64(2);
        let params = PhysicsParams::default();
        let mut body = Body {
            angular_velocity: Vec3::new(4.0, -7.0, 2.5),
            angular_damping: 0.0,
            ..Body::at(Vec3::new(0.0, 500.0, 0.0))
        };
        for _ in 0..1000 {
            body = step(body, &params, &FlatGround(-1e6), DT, &mut rng);
        }
        assert!((body.orientation.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ground_friction_slows_sliding() {
        let mut rng = StdRng::seed_from_u64(4);
        let params = PhysicsParams::default();
        let mut body = Body {
            on_ground: true,
            velocity: Vec3::new(5.0, 0.0, -3.0),
            ..Body::at(Vec3::new(0.0, params.ground_offset, 0.0))
        };
        let before = body.velocity.length();
        body = step(body, &params, &FlatGround(0.0), DT, &mut rng);
        let expected = before * (-body.friction * DT).exp();
        assert!((body.velocity.length() - expected).abs() < 1e-4);
    }

    #[test]
    fn world_matrix_rotates_then_translates() {
        let body = Body {
            orientation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..Body::at(Vec3::new(10.0, 0.0, 0.0))
        };
        let p = body.world_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(10.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn jump_only_from_the_ground() {
        let airborne = Body::default().jump(5.0);
        assert_eq!(airborne.velocity.y, 0.0);
        let grounded = Body {
            on_ground: true,
            ..Body::default()
        }
        .jump(5.0);
        assert_eq!(grounded.velocity.y, 5.0);
        assert!(!grounded.on_ground);
        let pushed = Body {
            mass: 2.0,
            ..Body::default()
        }
        .with_impulse(Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(pushed.velocity.x, 2.0);
    }
}
