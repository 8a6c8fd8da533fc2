use glam::Vec3;

/// Point light circling the world Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightOrbit {
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
    /// Radians per second.
    pub speed: f32,
    pub color: Vec3,
}

impl Default for LightOrbit {
    fn default() -> Self {
        Self {
            angle: 0.0,
            radius: 10.0,
            height: 80.0,
            speed: 0.5,
            color: Vec3::splat(300.0),
        }
    }
}

impl LightOrbit {
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.angle.cos(),
            self.height,
            self.radius * self.angle.sin(),
        )
    }

    pub fn advance(self, dt: f32) -> Self {
        Self {
            angle: (self.angle + self.speed * dt) % std::f32::consts::TAU,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_keeps_radius_and_height() {
        let mut light = LightOrbit::default();
        assert_eq!(light.position(), Vec3::new(10.0, 80.0, 0.0));
        for _ in 0..500 {
            light = light.advance(0.016);
            let p = light.position();
            assert!((Vec3::new(p.x, 0.0, p.z).length() - 10.0).abs() < 1e-4);
            assert_eq!(p.y, 80.0);
        }
        assert!((light.angle - 500.0 * 0.016 * 0.5).abs() < 1e-3);
    }
}
