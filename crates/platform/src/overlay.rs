//! In-window text drawn over the scene with egui.
//!
//! A viewer whose model failed to load shows the failure message centered on
//! its surface instead of a model.

use std::sync::Arc;

use egui_wgpu::ScreenDescriptor;
use renderer::{GpuState, OverlayPass, OverlayTarget};
use wgpu::{
    CommandBuffer, LoadOp, Operations, RenderPassColorAttachment, RenderPassDescriptor, StoreOp,
};
use winit::{event::WindowEvent, window::Window};

const MESSAGE_SIZE: f32 = 18.0;
const MESSAGE_COLOR: egui::Color32 = egui::Color32::from_gray(0x44);

pub struct MessageOverlay {
    window: Arc<Window>,
    ctx: egui::Context,
    state: egui_winit::State,
    painter: egui_wgpu::Renderer,
    message: Option<String>,
    needs_repaint: bool,
}

impl MessageOverlay {
    pub fn new(window: Arc<Window>, gpu: &GpuState) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let painter = egui_wgpu::Renderer::new(gpu.device(), gpu.surface_format(), None, 1, false);
        Self {
            window,
            ctx,
            state,
            painter,
            message: None,
            needs_repaint: false,
        }
    }

    pub fn show(&mut self, message: &str) {
        self.message = Some(message.to_string());
        self.needs_repaint = true;
    }

    pub fn hide(&mut self) {
        self.message = None;
        self.needs_repaint = false;
    }

    /// Whether egui asked for another frame while a message is shown.
    pub fn needs_repaint(&self) -> bool {
        self.message.is_some() && self.needs_repaint
    }

    /// Feed a window event to egui (scale factor, size). Returns `true` when
    /// the overlay should be redrawn.
    pub fn on_window_event(&mut self, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(&self.window, event);
        self.message.is_some() && response.repaint
    }
}

/// The message, centered on a transparent full-window panel.
fn message_ui(ctx: &egui::Context, message: &str) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            ui.centered_and_justified(|ui| {
                ui.label(
                    egui::RichText::new(message)
                        .size(MESSAGE_SIZE)
                        .color(MESSAGE_COLOR),
                );
            });
        });
}

impl OverlayPass for MessageOverlay {
    fn record(&mut self, target: OverlayTarget<'_>) -> Vec<CommandBuffer> {
        let Some(message) = self.message.clone() else {
            return Vec::new();
        };

        let raw_input = self.state.take_egui_input(&self.window);
        let egui::FullOutput {
            platform_output,
            textures_delta,
            shapes,
            pixels_per_point,
            viewport_output,
            ..
        } = self.ctx.run(raw_input, |ctx| message_ui(ctx, &message));
        self.state
            .handle_platform_output(&self.window, platform_output);
        self.needs_repaint = viewport_output
            .get(&egui::ViewportId::ROOT)
            .is_some_and(|v| v.repaint_delay.is_zero());

        let jobs = self.ctx.tessellate(shapes, pixels_per_point);
        let screen = ScreenDescriptor {
            size_in_pixels: [target.size.0, target.size.1],
            pixels_per_point,
        };
        for (id, delta) in &textures_delta.set {
            self.painter
                .update_texture(target.device, target.queue, *id, delta);
        }
        let buffers = self.painter.update_buffers(
            target.device,
            target.queue,
            target.encoder,
            &jobs,
            &screen,
        );
        {
            let mut pass = target
                .encoder
                .begin_render_pass(&RenderPassDescriptor {
                    label: Some("OverlayPass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view: target.view,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Load,
                            store: StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.painter.render(&mut pass, &jobs, &screen);
        }
        for id in &textures_delta.free {
            self.painter.free_texture(id);
        }
        buffers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::viewer::FAILURE_MESSAGE;

    fn text_shapes(output: &egui::FullOutput) -> Vec<(String, egui::Rect)> {
        output
            .shapes
            .iter()
            .filter_map(|clipped| match &clipped.shape {
                egui::Shape::Text(text) => Some((
                    text.galley.text().to_string(),
                    text.galley.rect.translate(text.pos.to_vec2()),
                )),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn failure_message_is_drawn_centered() {
        let ctx = egui::Context::default();
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(800.0, 600.0),
            )),
            ..Default::default()
        };
        let output = ctx.run(input, |ctx| message_ui(ctx, FAILURE_MESSAGE));

        let texts = text_shapes(&output);
        assert_eq!(texts.len(), 1, "shapes: {texts:?}");
        let (text, rect) = &texts[0];
        assert_eq!(text, FAILURE_MESSAGE);
        let center = rect.center();
        assert!((center.x - 400.0).abs() < 4.0, "center {center:?}");
        assert!((center.y - 300.0).abs() < 4.0, "center {center:?}");
    }
}
