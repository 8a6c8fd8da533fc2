//! Xesqe demo: a bouncing model over procedural terrain, with a fly camera.
//! Run from repo root: cargo run -p demo --bin xesqe -- path/to/model.obj
//!
//! W/S/A/D fly, Space/LeftCtrl rise and sink, left-drag looks around.
//! Arrow keys push the model, B makes it jump, R resets.

use std::collections::HashSet;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};
use xesqe_renderer::{AppConfig, Application, Control, InputEvent, Key, MouseButton};
use xesqe_rhi::WgpuDevice;

fn key_code(key: Key) -> KeyCode {
    match key {
        Key::Forward => KeyCode::KeyW,
        Key::Back => KeyCode::KeyS,
        Key::StrafeLeft => KeyCode::KeyA,
        Key::StrafeRight => KeyCode::KeyD,
        Key::Up => KeyCode::Space,
        Key::Down => KeyCode::ControlLeft,
        Key::PushLeft => KeyCode::ArrowLeft,
        Key::PushRight => KeyCode::ArrowRight,
        Key::PushForward => KeyCode::ArrowUp,
        Key::PushBack => KeyCode::ArrowDown,
        Key::Jump => KeyCode::KeyB,
    }
}

fn mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}

struct Demo {
    config: AppConfig,
    // Declared before the window: the device surface must go before the window it draws into.
    app: Option<Application>,
    window: Option<Window>,
    held: HashSet<KeyCode>,
    cursor: (f32, f32),
}

impl Demo {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            app: None,
            window: None,
            held: HashSet::new(),
            cursor: (0.0, 0.0),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), String> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(self.config.width, self.config.height));
        let window = event_loop.create_window(attrs).map_err(|e| e.to_string())?;
        let size = window.inner_size();
        let config = AppConfig {
            width: size.width.max(1),
            height: size.height.max(1),
            ..self.config.clone()
        };
        let device = WgpuDevice::from_window(&window).map_err(|e| e.to_string())?;
        let app = Application::initialize(Arc::new(device), config).map_err(|e| e.to_string())?;
        window.request_redraw();
        self.window = Some(window);
        self.app = Some(app);
        Ok(())
    }

    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: InputEvent) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        match app.handle_event(event) {
            Ok(Control::Continue) => {}
            Ok(Control::Quit) => event_loop.exit(),
            Err(e) => {
                log::error!("{e}");
                event_loop.exit();
            }
        }
    }

    fn keyboard(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match event.state {
            ElementState::Pressed => {
                self.held.insert(code);
                if code == KeyCode::KeyR && !event.repeat {
                    self.dispatch(event_loop, InputEvent::Reset);
                }
            }
            ElementState::Released => {
                self.held.remove(&code);
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(app), Some(window)) = (self.app.as_mut(), self.window.as_ref()) else {
            return;
        };
        let held = &self.held;
        let keys = |key: Key| held.contains(&key_code(key));
        window.pre_present_notify();
        if let Err(e) = app.tick(&keys) {
            log::error!("frame failed: {e}");
            event_loop.exit();
            return;
        }
        window.request_redraw();
    }
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            log::error!("initialization failed: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.dispatch(event_loop, InputEvent::Close),
            WindowEvent::Resized(size) => self.dispatch(
                event_loop,
                InputEvent::Resize {
                    width: size.width,
                    height: size.height,
                },
            ),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                let (x, y) = self.cursor;
                self.dispatch(event_loop, InputEvent::MouseMove { x, y });
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = mouse_button(button) else {
                    return;
                };
                let (x, y) = self.cursor;
                let event = match state {
                    ElementState::Pressed => InputEvent::MouseDown { button, x, y },
                    ElementState::Released => InputEvent::MouseUp { button, x, y },
                };
                self.dispatch(event_loop, event);
            }
            WindowEvent::KeyboardInput { event, .. } => self.keyboard(event_loop, event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = AppConfig::default().with_env();
    if let Some(path) = std::env::args().nth(1) {
        config.model_path = path.into();
    }

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("cannot create event loop: {e}");
            return;
        }
    };
    let mut demo = Demo::new(config);
    if let Err(e) = event_loop.run_app(&mut demo) {
        log::error!("event loop: {e}");
    }
}
