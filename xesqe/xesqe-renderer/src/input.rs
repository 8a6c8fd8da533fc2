//! Window-system input as seen by the application.

use glam::Vec3;
use xesqe_world::{FlyInput, SceneInput};

/// Degrees of camera rotation per pixel of mouse drag.
pub const DRAG_DEGREES_PER_PIXEL: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    fn mask(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// New client area in physical pixels.
    Resize { width: u32, height: u32 },
    MouseDown { button: MouseButton, x: f32, y: f32 },
    MouseUp { button: MouseButton, x: f32, y: f32 },
    MouseMove { x: f32, y: f32 },
    Reset,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    Up,
    Down,
    PushLeft,
    PushRight,
    PushForward,
    PushBack,
    Jump,
}

/// Held-key query polled once per tick.
pub trait KeyState {
    fn is_down(&self, key: Key) -> bool;
}

impl<F: Fn(Key) -> bool> KeyState for F {
    fn is_down(&self, key: Key) -> bool {
        self(key)
    }
}

fn axis(keys: &dyn KeyState, positive: Key, negative: Key) -> f32 {
    match (keys.is_down(positive), keys.is_down(negative)) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Mouse capture. The pointer stays captured while any button is held; moving it with the left
/// button held turns the camera, whatever the other buttons do.
#[derive(Debug, Default, Clone, Copy)]
pub struct DragState {
    /// Bit set of held buttons.
    held: u8,
    last: (f32, f32),
    yaw: f32,
    pitch: f32,
}

impl DragState {
    pub fn begin(&mut self, button: MouseButton, x: f32, y: f32) {
        self.held |= button.mask();
        self.last = (x, y);
    }

    pub fn end(&mut self, button: MouseButton) {
        self.held &= !button.mask();
    }

    pub fn is_captured(&self) -> bool {
        self.held != 0
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.held & button.mask() != 0
    }

    pub fn motion(&mut self, x: f32, y: f32) {
        if self.is_held(MouseButton::Left) {
            let (lx, ly) = self.last;
            self.yaw += (DRAG_DEGREES_PER_PIXEL * (x - lx)).to_radians();
            self.pitch += (DRAG_DEGREES_PER_PIXEL * (y - ly)).to_radians();
        }
        self.last = (x, y);
    }

    /// Accumulated (yaw, pitch) in radians since the last call.
    pub fn take(&mut self) -> (f32, f32) {
        let out = (self.yaw, self.pitch);
        self.yaw = 0.0;
        self.pitch = 0.0;
        out
    }
}

/// Gather one tick of scene input from held keys and pending drag rotation.
pub fn scene_input(keys: &dyn KeyState, drag: &mut DragState, impulse_strength: f32) -> SceneInput {
    let (yaw, pitch) = drag.take();
    let push = Vec3::new(
        axis(keys, Key::PushRight, Key::PushLeft),
        0.0,
        axis(keys, Key::PushForward, Key::PushBack),
    );
    SceneInput {
        fly: FlyInput {
            forward: axis(keys, Key::Forward, Key::Back),
            right: axis(keys, Key::StrafeRight, Key::StrafeLeft),
            up: axis(keys, Key::Up, Key::Down),
            yaw,
            pitch,
        },
        impulse: push * impulse_strength,
        jump: keys.is_down(Key::Jump),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_converts_pixels_to_radians() {
        let mut drag = DragState::default();
        drag.motion(50.0, 50.0);
        assert_eq!(drag.take(), (0.0, 0.0));
        drag.begin(MouseButton::Right, 0.0, 0.0);
        drag.motion(100.0, 100.0);
        assert_eq!(drag.take(), (0.0, 0.0));
        drag.end(MouseButton::Right);
        drag.begin(MouseButton::Left, 100.0, 100.0);
        drag.motion(140.0, 90.0);
        drag.motion(180.0, 90.0);
        let (yaw, pitch) = drag.take();
        assert!((yaw - 20f32.to_radians()).abs() < 1e-6);
        assert!((pitch + 2.5f32.to_radians()).abs() < 1e-6);
        drag.end(MouseButton::Left);
        assert!(!drag.is_captured());
        drag.motion(0.0, 0.0);
        assert_eq!(drag.take(), (0.0, 0.0));
    }

    #[test]
    fn left_button_turns_regardless_of_other_buttons() {
        let mut drag = DragState::default();
        drag.begin(MouseButton::Left, 0.0, 0.0);
        drag.begin(MouseButton::Right, 0.0, 0.0);
        drag.motion(40.0, 0.0);
        let (yaw, _) = drag.take();
        assert!((yaw - 10f32.to_radians()).abs() < 1e-6);

        drag.end(MouseButton::Right);
        assert!(drag.is_captured());
        drag.motion(80.0, 0.0);
        let (yaw, _) = drag.take();
        assert!((yaw - 10f32.to_radians()).abs() < 1e-6);

        // right alone captures but does not turn
        drag.end(MouseButton::Left);
        drag.begin(MouseButton::Right, 80.0, 0.0);
        drag.motion(120.0, 0.0);
        assert_eq!(drag.take(), (0.0, 0.0));
        drag.end(MouseButton::Right);
        assert!(!drag.is_captured());
    }

    #[test]
    fn opposing_keys_cancel() {
        let keys = |k: Key| matches!(k, Key::Forward | Key::Back | Key::StrafeRight | Key::PushLeft | Key::Jump);
        let input = scene_input(&keys, &mut DragState::default(), 2.0);
        assert_eq!(input.fly.forward, 0.0);
        assert_eq!(input.fly.right, 1.0);
        assert_eq!(input.impulse, Vec3::new(-2.0, 0.0, 0.0));
        assert!(input.jump);
    }
}
