use glam::Vec2;
use vesper_core::App;
use vesper_input::{InputSender, PhysicalInput, input_sender};
use winit::{
    application::ApplicationHandler,
    error::EventLoopError,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

pub const WINDOW_TITLE: &str = "Vesper";

// Holds the App while winit owns the thread
struct VesperRunner {
    app: App,
    input: InputSender,
    window: Option<Window>,
}

impl VesperRunner {
    fn new(app: App) -> Self {
        let input = input_sender(&app.world);
        Self {
            app,
            input,
            window: None,
        }
    }

    fn send(&self, input: PhysicalInput) {
        self.input.send(input);
    }
}

impl ApplicationHandler for VesperRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match event_loop.create_window(Window::default_attributes().with_title(WINDOW_TITLE)) {
            Ok(window) => self.window = Some(window),
            Err(err) => {
                log::error!("failed to create window: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat,
                        ..
                    },
                ..
            } => {
                // OS key repeat is not a new press
                if !repeat {
                    self.send(PhysicalInput::Key {
                        code,
                        pressed: state == ElementState::Pressed,
                    });
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.send(PhysicalInput::MouseButton {
                    button,
                    pressed: state == ElementState::Pressed,
                });
            }
            WindowEvent::CloseRequested => {
                log::info!("close requested, stopping");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if !self.app.update() {
                    event_loop.exit();
                    return;
                }

                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (x, y) } = event {
            self.send(PhysicalInput::MouseDelta(Vec2::new(x as f32, y as f32)));
        }
    }
}

/// Runs `app` inside a winit event loop until the window closes or the app
/// quits. `InputPlugin` must already be added.
pub fn run_vesper_app(app: App) -> Result<(), EventLoopError> {
    let event_loop = EventLoop::new()?;

    // Poll keeps frames coming even without OS events.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = VesperRunner::new(app);
    event_loop.run_app(&mut runner)
}
