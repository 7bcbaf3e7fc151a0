//! Platform layer: windowing, event loop and per-viewer input routing.
//!
//! Design goals:
//! - One window per viewer; viewers share nothing but the event loop.
//! - Redraws are requested only for viewers that are loading, showing a mesh
//!   or settling their failure overlay, paced by vsync.
//! - Clear log messages to help future debugging.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

pub mod input;
pub mod loader;
pub mod overlay;
pub mod viewport;

pub use loader::ViewerEvent;
pub use viewport::{ViewerSpec, Viewport};

/// Everything the event loop needs to open the viewers.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub backends: wgpu::Backends,
    pub show_fps: bool,
    pub width: u32,
    pub height: u32,
    pub viewers: Vec<ViewerSpec>,
}

struct App {
    config: RunConfig,
    proxy: EventLoopProxy<ViewerEvent>,
    viewports: HashMap<WindowId, Viewport>,
    started: bool,
}

impl App {
    fn new(config: RunConfig, proxy: EventLoopProxy<ViewerEvent>) -> Self {
        Self {
            config,
            proxy,
            viewports: HashMap::new(),
            started: false,
        }
    }

    /// Open one window per viewer and start its load. A viewer whose window or
    /// GPU cannot be set up is skipped; the others still run.
    fn open_viewers(&mut self, event_loop: &ActiveEventLoop) {
        let specs = self.config.viewers.clone();
        for spec in &specs {
            let attrs = Window::default_attributes()
                .with_title(spec.label.as_str())
                .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
            let window = match event_loop.create_window(attrs) {
                Ok(window) => Arc::new(window),
                Err(e) => {
                    log::warn!("Viewer '{}': cannot create window: {e}", spec.label);
                    continue;
                }
            };

            match Viewport::new(window, spec, self.config.backends, self.config.show_fps) {
                Ok(mut viewport) => {
                    viewport.start_load(&self.proxy);
                    self.viewports.insert(viewport.window().id(), viewport);
                }
                Err(e) => {
                    log::error!("Viewer '{}': renderer unavailable: {e}", spec.label);
                }
            }
        }
    }

    fn close(&mut self, event_loop: &ActiveEventLoop, id: WindowId) {
        self.viewports.remove(&id);
        if self.viewports.is_empty() {
            log::info!("All viewers closed. Exiting event loop.");
            event_loop.exit();
        }
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;
        self.open_viewers(event_loop);
        if self.viewports.is_empty() {
            log::error!("No viewer could be initialized. Exiting.");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(viewport) = self.viewports.get_mut(&id) else {
            return;
        };

        viewport.overlay_event(&event);
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested for {:?}", id);
                self.close(event_loop, id);
            }
            WindowEvent::Resized(new_size) => viewport.resize(new_size),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {:.3}", scale_factor);
                viewport.resize(viewport.window().inner_size());
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => viewport.pointer_pressed(),
                ElementState::Released => viewport.pointer_released(),
            },
            WindowEvent::CursorMoved { position, .. } => viewport.pointer_moved(position),
            // A release outside the window is not always delivered.
            WindowEvent::Focused(false) => viewport.pointer_released(),
            WindowEvent::MouseWheel { delta, .. } => viewport.wheel(delta),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && !event.repeat
                    && event.physical_key == PhysicalKey::Code(KeyCode::KeyR) =>
            {
                viewport.start_load(&self.proxy);
            }
            WindowEvent::DroppedFile(path) => {
                log::info!("Dropped file: {}", path.display());
                viewport.replace_source(path, &self.proxy);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = viewport.redraw() {
                    log::error!("Unrecoverable surface error ({e:?}); closing viewer");
                    self.close(event_loop, id);
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::MeshLoaded { window_id, outcome } => {
                match self.viewports.get_mut(&window_id) {
                    Some(viewport) => viewport.finish_load(outcome),
                    None => log::debug!("Load finished for a closed viewer; dropped"),
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        for viewport in self.viewports.values() {
            if viewport.wants_frames() {
                viewport.window().request_redraw();
            }
        }
    }
}

/// Run every configured viewer until all windows are closed.
pub fn run_with_renderer(config: RunConfig) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    log::info!("Opening {} viewer(s)", config.viewers.len());
    let mut app = App::new(config, event_loop.create_proxy());
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    Ok(())
}
