use std::{sync::Arc, time::Instant};

use log::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{WindowAttributes, WindowId},
};

use crate::{config::EngineConfig, engine::Engine, gfx::camera::InputSnapshot};

/// Accumulator turning variable wall-clock deltas into fixed update steps
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimestep {
    step: f64,
    max_delta: f64,
    accumulator: f64,
}

impl FixedTimestep {
    pub fn new(step: f64, max_delta: f64) -> Self {
        Self {
            step,
            max_delta,
            accumulator: 0.0,
        }
    }

    /// Adds one iteration's wall-clock delta and returns how many steps to run
    ///
    /// The delta is clamped to `max_delta` so a stall does not trigger a long
    /// burst of catch-up steps.
    pub fn advance(&mut self, delta: f64) -> u32 {
        self.accumulator += delta.clamp(0.0, self.max_delta);
        let mut steps = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}

/// Held keys, the look button and mouse motion gathered from window events
#[derive(Debug, Default)]
struct InputState {
    snapshot: InputSnapshot,
}

impl InputState {
    fn key(&mut self, code: KeyCode, pressed: bool) {
        let slot = match code {
            KeyCode::KeyW => &mut self.snapshot.forward,
            KeyCode::KeyS => &mut self.snapshot.back,
            KeyCode::KeyA => &mut self.snapshot.left,
            KeyCode::KeyD => &mut self.snapshot.right,
            KeyCode::KeyQ => &mut self.snapshot.down,
            KeyCode::KeyE => &mut self.snapshot.up,
            _ => return,
        };
        *slot = pressed;
    }

    fn mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.snapshot.look_active {
            self.snapshot.mouse_delta.0 += dx as f32;
            self.snapshot.mouse_delta.1 += dy as f32;
        }
    }

    /// Snapshot for the coming update steps; the mouse motion is handed out once
    fn take(&mut self, ui_wants_mouse: bool, ui_wants_keyboard: bool) -> InputSnapshot {
        let snapshot = InputSnapshot {
            ui_wants_mouse,
            ui_wants_keyboard,
            ..self.snapshot
        };
        self.snapshot.mouse_delta = (0.0, 0.0);
        snapshot
    }
}

pub struct GgineApp {
    event_loop: EventLoop<()>,
    app_state: AppState,
}

struct AppState {
    config: EngineConfig,
    engine: Option<Engine>,
    input: InputState,
    timestep: FixedTimestep,
    last_tick: Option<Instant>,
    fatal: Option<anyhow::Error>,
}

impl GgineApp {
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()?;
        let timestep = FixedTimestep::new(config.fixed_timestep, config.max_frame_delta);

        Ok(Self {
            event_loop,
            app_state: AppState {
                config,
                engine: None,
                input: InputState::default(),
                timestep,
                last_tick: None,
                fatal: None,
            },
        })
    }

    /// Runs the event loop until the window closes
    pub fn run(mut self) -> anyhow::Result<()> {
        self.event_loop.set_control_flow(ControlFlow::Poll);
        self.event_loop.run_app(&mut self.app_state)?;

        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        self.fatal = Some(err);
        self.engine = None;
        event_loop.exit();
    }

    /// One host iteration: fixed-step updates, then a single render
    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        let now = Instant::now();
        let delta = self
            .last_tick
            .replace(now)
            .map(|last| now.duration_since(last).as_secs_f64())
            .unwrap_or(0.0);

        let steps = self.timestep.advance(delta);
        if steps > 0 {
            let mut input = self
                .input
                .take(engine.ui_wants_mouse(), engine.ui_wants_keyboard());
            for _ in 0..steps {
                engine.update(self.timestep.step(), &input);
                input = input.without_motion();
            }
        }

        if let Err(err) = engine.render() {
            self.fail(event_loop, err.into());
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => return self.fail(event_loop, err.into()),
        };

        match pollster::block_on(Engine::new(Arc::clone(&window), &self.config)) {
            Ok(engine) => {
                info!("Window {}x{} ready", self.config.width, self.config.height);
                self.engine = Some(engine);
            }
            Err(err) => self.fail(event_loop, err.into()),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        // UI sees input first
        let captured = engine.handle_window_event(window_id, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => engine.resize(width, height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                // Releases always land so keys never stick behind the UI
                if captured && pressed {
                    return;
                }
                if code == KeyCode::Escape && pressed {
                    event_loop.exit();
                    return;
                }
                self.input.key(code, pressed);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if !(captured && pressed) {
                    self.input.snapshot.look_active = pressed;
                }
            }
            WindowEvent::RedrawRequested => self.tick(event_loop),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_ref() {
            engine.window().request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Engine teardown waits for the GPU while the window is still alive
        self.engine = None;
    }
}
