//! One viewer: a window, its GPU state and its controller.
//!
//! A `Viewport` exclusively owns everything it renders with. Dropping it
//! (window closed) releases the surface and device and stops input routing
//! and redraws for that window; late load completions find no viewport and
//! are discarded.

use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Error;
use asset::MeshData;
use corelib::{LoadTicket, Vec2, ViewerConfig, ViewerPhase, ViewerState, viewer::FAILURE_MESSAGE};
use renderer::{GpuState, RendererError};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{MouseScrollDelta, WindowEvent},
    event_loop::EventLoopProxy,
    window::Window,
};

use crate::{
    input,
    loader::{self, LoadOutcome, ViewerEvent},
    overlay::MessageOverlay,
};

/// What to show in one viewer.
#[derive(Clone, Debug)]
pub struct ViewerSpec {
    pub label: String,
    pub path: PathBuf,
    pub config: ViewerConfig,
}

pub struct Viewport {
    window: Arc<Window>,
    gpu: GpuState,
    state: ViewerState,
    overlay: MessageOverlay,
    label: String,
    source: PathBuf,
    /// Last cursor position, logical pixels.
    cursor: Vec2,
    fps: Option<FpsCounter>,
}

impl Viewport {
    /// Bind a controller and GPU state to an already created window.
    pub fn new(
        window: Arc<Window>,
        spec: &ViewerSpec,
        backends: wgpu::Backends,
        show_fps: bool,
    ) -> Result<Self, RendererError> {
        let PhysicalSize { width, height } = window.inner_size();
        let state = ViewerState::new(spec.config, width, height);
        let (w, h) = state.size();
        let gpu = pollster::block_on(GpuState::new(window.clone(), backends, w, h))?;
        window.set_cursor(input::cursor_icon(state.cursor_hint()));
        let overlay = MessageOverlay::new(window.clone(), &gpu);

        log::info!("Viewer '{}' initialized at {}x{}", spec.label, w, h);
        Ok(Self {
            window,
            gpu,
            state,
            overlay,
            label: spec.label.clone(),
            source: spec.path.clone(),
            cursor: Vec2::ZERO,
            fps: show_fps.then(FpsCounter::new),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// (Re)start loading `source`. Any load still in flight becomes stale.
    pub fn start_load(&mut self, proxy: &EventLoopProxy<ViewerEvent>) {
        let ticket = self.state.begin_load();
        self.gpu.clear_mesh();
        self.overlay.hide();
        self.window.set_title(&self.label);
        log::info!(
            "Viewer '{}': loading {} (generation {})",
            self.label,
            self.source.display(),
            ticket.generation()
        );

        let proxy = proxy.clone();
        let window_id = self.window.id();
        let spawned = loader::spawn_load(ticket, self.source.clone(), move |outcome| {
            if proxy
                .send_event(ViewerEvent::MeshLoaded { window_id, outcome })
                .is_err()
            {
                log::debug!("Event loop closed before the load finished");
            }
        });
        if let Err(e) = spawned {
            self.fail(ticket, &Error::new(e).context("Failed to spawn loader thread"));
        }
        self.window.request_redraw();
    }

    /// Switch to a different file and load it.
    pub fn replace_source(&mut self, path: PathBuf, proxy: &EventLoopProxy<ViewerEvent>) {
        self.source = path;
        self.start_load(proxy);
    }

    pub fn finish_load(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { ticket, result } = outcome;
        match result {
            Ok(mesh) => self.accept(ticket, &mesh),
            Err(e) => self.fail(ticket, &e),
        }
        self.window.request_redraw();
    }

    fn accept(&mut self, ticket: LoadTicket, mesh: &MeshData) {
        let Some(summary) = self.state.complete_load(ticket, mesh.bounds()) else {
            return;
        };
        self.gpu.set_mesh(mesh);
        if mesh.is_empty() {
            log::warn!("Viewer '{}': no geometry to display", self.label);
        }
        log::info!(
            "Viewer '{}': loaded {} triangles from {}",
            self.label,
            mesh.triangle_count(),
            self.source.display()
        );
        log::debug!(
            "Viewer '{}': size {:.2?}, max dimension {:.2}, scale {}, distance {:.2}",
            self.label,
            summary.raw_size.to_array(),
            summary.raw_size.max_element(),
            summary.scale,
            summary.distance
        );
        log::debug!(
            "Viewer '{}': centered bounds center {:.4?} ({})",
            self.label,
            summary.centered_center.to_array(),
            if summary.is_centered() {
                "centered"
            } else {
                "off-center"
            }
        );
    }

    fn fail(&mut self, ticket: LoadTicket, err: &Error) {
        if !self.state.fail_load(ticket) {
            return;
        }
        log::error!(
            "Viewer '{}': failed to load {}: {err:#}",
            self.label,
            self.source.display()
        );
        self.gpu.clear_mesh();
        let message = self.state.failure_message().unwrap_or(FAILURE_MESSAGE);
        self.overlay.show(message);
        self.window.set_title(message);
        self.sync_cursor();
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            // Minimized; keep the last configuration.
            return;
        }
        self.state.resize(size.width, size.height);
        let (w, h) = self.state.size();
        self.gpu.resize(w, h);
        log::debug!("Viewer '{}' resized: {}x{}", self.label, w, h);
    }

    pub fn pointer_pressed(&mut self) {
        self.state.pointer_down(self.cursor.x, self.cursor.y);
        self.sync_cursor();
    }

    pub fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = input::logical_point(position, self.window.scale_factor());
        self.state.pointer_move(self.cursor.x, self.cursor.y);
    }

    pub fn pointer_released(&mut self) {
        self.state.pointer_up();
        self.sync_cursor();
    }

    pub fn wheel(&mut self, delta: MouseScrollDelta) {
        self.state
            .wheel(input::wheel_delta_pixels(delta, self.window.scale_factor()));
    }

    /// Let the overlay track scale factor and size changes.
    pub fn overlay_event(&mut self, event: &WindowEvent) {
        if self.overlay.on_window_event(event) {
            self.window.request_redraw();
        }
    }

    fn sync_cursor(&self) {
        self.window
            .set_cursor(input::cursor_icon(self.state.cursor_hint()));
    }

    /// Whether the render loop should keep requesting frames.
    pub fn wants_frames(&self) -> bool {
        matches!(self.state.phase(), ViewerPhase::Loading | ViewerPhase::Ready)
            || self.overlay.needs_repaint()
    }

    /// Render one frame. Only unrecoverable surface errors are returned.
    pub fn redraw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let params = self.state.frame();
        match self.gpu.render(params.as_ref(), Some(&mut self.overlay)) {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Viewer '{}': surface lost ({e:?}), reconfiguring", self.label);
                self.gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Viewer '{}': frame timeout, skipping", self.label);
            }
            Err(e) => return Err(e),
        }

        if let Some(fps) = self.fps.as_mut().and_then(|c| c.tick(Instant::now())) {
            log::info!("Viewer '{}': {:.1} fps", self.label, fps);
        }
        Ok(())
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        log::info!("Viewer '{}' disposed", self.label);
    }
}

/// Frames-per-second over one-second windows.
struct FpsCounter {
    frames: u32,
    since: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frames: 0,
            since: Instant::now(),
        }
    }

    /// Count a frame; returns the rate once at least a second has passed.
    fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.duration_since(self.since).as_secs_f32();
        if elapsed < 1.0 {
            return None;
        }
        let fps = self.frames as f32 / elapsed;
        self.frames = 0;
        self.since = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fps_reports_once_per_second() {
        let mut counter = FpsCounter::new();
        let start = counter.since;
        for i in 1..60 {
            assert!(counter.tick(start + Duration::from_millis(i * 16)).is_none());
        }
        let fps = counter.tick(start + Duration::from_secs(2)).expect("a report");
        assert!((fps - 30.0).abs() < 1e-3);
        assert_eq!(counter.frames, 0);
    }
}
