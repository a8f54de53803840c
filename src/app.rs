//! Window and event loop.
//!
//! The winit callbacks only record input: keys and resizes from the window,
//! mouse-look from raw device motion. Every `RedrawRequested` runs one
//! frame: tick the clock, drain the queued events into the
//! [`RenderContext`], then render.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{CursorGrabMode, Window, WindowAttributes, WindowId};

use crate::clock::FrameClock;
use crate::config::ViewerConfig;
use crate::context::RenderContext;
use crate::error::ViewerError;
use crate::input::{EventQueue, InputEvent};
use crate::renderer::Renderer;

/// Open the window and run until it closes or Escape is pressed.
///
/// Any startup failure ends the loop and is returned.
pub fn run(config: ViewerConfig) -> Result<(), ViewerError> {
    // Validate the scene before a window exists.
    let context = RenderContext::new(&config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::Pending {
        config,
        context: Box::new(context),
    };
    event_loop.run_app(&mut app)?;

    match app {
        ViewerApp::Failed(error) => Err(error),
        _ => Ok(()),
    }
}

enum ViewerApp {
    Pending {
        config: ViewerConfig,
        context: Box<RenderContext>,
    },
    Running {
        window: Arc<Window>,
        renderer: Box<Renderer>,
        context: Box<RenderContext>,
        events: EventQueue,
        clock: FrameClock,
    },
    Failed(ViewerError),
    Finished,
}

impl ViewerApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &ViewerConfig,
    ) -> Result<(Arc<Window>, Renderer), ViewerError> {
        let attributes = WindowAttributes::default()
            .with_title(&config.window.title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.window.width,
                config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attributes)?);
        capture_cursor(&window);

        let renderer = Renderer::new(window.clone(), config)?;
        Ok((window, renderer))
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ViewerError) {
        log::error!("{error}");
        *self = ViewerApp::Failed(error);
        event_loop.exit();
    }
}

/// Hide the cursor and hold it in place. Mouse-look reads raw device motion,
/// so the grab only keeps the pointer from leaving the window.
fn capture_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(e) = grabbed {
        log::warn!("Cursor grab unavailable: {e}");
    }
    window.set_cursor_visible(false);
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ViewerApp::Pending { config, .. } = self else {
            return;
        };

        match Self::start(event_loop, config) {
            Ok((window, renderer)) => {
                let ViewerApp::Pending { context, .. } =
                    std::mem::replace(self, ViewerApp::Finished)
                else {
                    return;
                };
                window.request_redraw();
                *self = ViewerApp::Running {
                    window,
                    renderer: Box::new(renderer),
                    context,
                    events: EventQueue::new(),
                    clock: FrameClock::new(),
                };
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ViewerApp::Running {
            window,
            renderer,
            context,
            events,
            clock,
        } = self
        else {
            return;
        };

        if let Some(input) = InputEvent::from_window_event(&event) {
            events.push(input);
        }

        match event {
            WindowEvent::CloseRequested => {
                *self = ViewerApp::Finished;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                renderer.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let time = clock.tick();
                context.begin_frame(events.drain(), time);

                if context.should_quit() {
                    *self = ViewerApp::Finished;
                    event_loop.exit();
                    return;
                }

                if let Err(error) = renderer.render(context) {
                    self.fail(event_loop, error);
                    return;
                }

                if time.frame % 600 == 0 && time.frame > 0 {
                    log::debug!("{:.0} fps", FrameClock::fps(&time));
                }
                window.request_redraw();
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        let ViewerApp::Running { events, .. } = self else {
            return;
        };
        if let Some(input) = InputEvent::from_device_event(&event) {
            events.push(input);
        }
    }
}
