//! Free-fly camera in a left-handed, Y-up world.

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Vec3,
    right: Vec3,
    up: Vec3,
    look: Vec3,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    view: Mat4,
    proj: Mat4,
}

impl Camera {
    /// Camera at `position` looking down +Z with a default lens.
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            right: Vec3::X,
            up: Vec3::Y,
            look: Vec3::Z,
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 1.0,
            near: 1.0,
            far: 1000.0,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        };
        camera.set_lens(camera.fov_y, camera.aspect, camera.near, camera.far);
        camera.update_view_matrix();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn look(&self) -> Vec3 {
        self.look
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Left-handed perspective with depth mapped to [0, 1].
    pub fn set_lens(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.proj = Mat4::perspective_lh(fov_y, aspect, near, far);
    }

    pub fn walk(&mut self, distance: f32) {
        self.position += self.look * distance;
    }

    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right * distance;
    }

    pub fn jump(&mut self, distance: f32) {
        self.position += self.up * distance;
    }

    /// Rotate up and look about the right vector.
    pub fn pitch(&mut self, angle: f32) {
        let r = Quat::from_axis_angle(self.right, angle);
        self.up = r * self.up;
        self.look = r * self.look;
    }

    /// Rotate the whole basis about world Y.
    pub fn rotate_y(&mut self, angle: f32) {
        let r = Mat3::from_rotation_y(angle);
        self.right = r * self.right;
        self.up = r * self.up;
        self.look = r * self.look;
    }

    /// Re-orthonormalize the basis and rebuild the view matrix.
    pub fn update_view_matrix(&mut self) {
        let l = self.look.normalize();
        let u = l.cross(self.right).normalize();
        let r = u.cross(l);
        self.look = l;
        self.up = u;
        self.right = r;

        let p = self.position;
        self.view = Mat4::from_cols(
            Vec4::new(r.x, u.x, l.x, 0.0),
            Vec4::new(r.y, u.y, l.y, 0.0),
            Vec4::new(r.z, u.z, l.z, 0.0),
            Vec4::new(-p.dot(r), -p.dot(u), -p.dot(l), 1.0),
        );
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }
}

/// Movement requested for one tick. Axes are -1, 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlyInput {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    /// Radians about world Y.
    pub yaw: f32,
    /// Radians about the camera's right vector.
    pub pitch: f32,
}

/// Apply one tick of fly controls and refresh the view matrix.
pub fn fly(mut camera: Camera, input: &FlyInput, speed: f32, dt: f32) -> Camera {
    let step = speed * dt;
    camera.walk(input.forward * step);
    camera.strafe(input.right * step);
    camera.jump(input.up * step);
    if input.pitch != 0.0 {
        camera.pitch(input.pitch);
    }
    if input.yaw != 0.0 {
        camera.rotate_y(input.yaw);
    }
    camera.update_view_matrix();
    camera
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(c: &Camera) {
        for v in [c.right(), c.up(), c.look()] {
            assert!((v.length() - 1.0).abs() < 1e-4, "{v}");
        }
        assert!(c.right().dot(c.up()).abs() < 1e-4);
        assert!(c.right().dot(c.look()).abs() < 1e-4);
        assert!(c.up().dot(c.look()).abs() < 1e-4);
        // left-handed: right x up = look
        assert!((c.right().cross(c.up()) - c.look()).length() < 1e-3);
    }

    #[test]
    fn basis_stays_orthonormal_under_any_motion() {
        let mut c = Camera::new(Vec3::new(0.0, 2.0, -15.0));
        for i in 0..2000 {
            let t = i as f32;
            c.walk((t * 0.37).sin() * 3.0);
            c.strafe((t * 0.11).cos());
            c.pitch((t * 0.73).sin() * 0.05);
            c.rotate_y((t * 0.29).cos() * 0.08);
            c.jump(0.1);
            c.update_view_matrix();
            assert_orthonormal(&c);
        }
    }

    #[test]
    fn view_moves_eye_to_origin_looking_down_z() {
        let eye = Vec3::new(3.0, 4.0, -10.0);
        let c = Camera::new(eye);
        assert!(c.view().transform_point3(eye).length() < 1e-5);
        let ahead = c.view().transform_point3(eye + Vec3::Z * 5.0);
        assert!((ahead - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn projection_maps_near_and_far_to_unit_depth() {
        let mut c = Camera::new(Vec3::ZERO);
        c.set_lens(0.8, 16.0 / 9.0, 1.0, 1000.0);
        let near = c.proj().project_point3(Vec3::new(0.0, 0.0, 1.0));
        let far = c.proj().project_point3(Vec3::new(0.0, 0.0, 1000.0));
        assert!(near.z.abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-4);
        assert_eq!(c.aspect(), 16.0 / 9.0);
    }

    #[test]
    fn walk_and_strafe_follow_the_basis() {
        let mut c = Camera::new(Vec3::ZERO);
        c.rotate_y(std::f32::consts::FRAC_PI_2);
        c.update_view_matrix();
        c.walk(2.0);
        // +Z turned a quarter about Y points along +X
        assert!((c.position() - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        c.strafe(1.0);
        assert!((c.position() - Vec3::new(2.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn fly_scales_by_speed_and_dt() {
        let start = Camera::new(Vec3::ZERO);
        let input = FlyInput {
            forward: 1.0,
            up: -1.0,
            ..FlyInput::default()
        };
        let moved = fly(start, &input, 10.0, 0.5);
        assert!((moved.position() - Vec3::new(0.0, -5.0, 5.0)).length() < 1e-5);
        assert_eq!(fly(start, &FlyInput::default(), 10.0, 0.5), start);
    }
}
