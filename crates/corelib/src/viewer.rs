//! Viewer controller: camera distance, drag rotation, wheel zoom, model
//! centering and the load lifecycle of one viewer.
//!
//! The controller never touches the GPU or the window. The platform layer
//! feeds it pointer/wheel/resize input and load completions, and asks it for
//! [`FrameParams`] once per redraw. Input between two frames is coalesced:
//! the next frame sees only the latest angles, distance and scale.

use std::f32::consts::FRAC_PI_2;

use crate::{
    Mat4, Vec2, Vec3,
    bounds::Aabb,
    camera::Camera,
    config::{DistanceMode, PitchClamp, ScaleMode, ViewerConfig, WheelTarget},
    transform::Transform,
};

/// Shown in place of the model when loading fails.
pub const FAILURE_MESSAGE: &str = "Model failed to load";

/// Stamp identifying one load request. Completions carrying an older stamp
/// are ignored, so a viewer only ever shows the mesh it was last asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewerPhase {
    Uninitialized,
    Loading,
    Ready,
    Failed { message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorHint {
    Grab,
    Grabbing,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameParams {
    pub model: Mat4,
    pub view_proj: Mat4,
    /// False while loading: the frame is background only.
    pub draw_mesh: bool,
}

impl FrameParams {
    pub fn identity() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            draw_mesh: false,
        }
    }
}

/// Outcome of a successful load, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadSummary {
    /// Size of the corrected, unscaled mesh (zero for empty meshes).
    pub raw_size: Vec3,
    pub scale: f32,
    pub distance: f32,
    /// Bounding-box center after centering and scaling; should be the origin.
    pub centered_center: Vec3,
}

impl LoadSummary {
    pub fn is_centered(&self) -> bool {
        self.centered_center.length() < 0.01
    }
}

pub struct ViewerState {
    config: ViewerConfig,
    phase: ViewerPhase,
    generation: u64,
    width: u32,
    height: u32,
    camera: Camera,
    distance: f32,
    yaw: f32,
    pitch: f32,
    group: Transform,
    /// Translation of the mesh inside the group; moves its center to the origin.
    model_offset: Vec3,
    /// Last pointer position while a drag is active.
    drag: Option<Vec2>,
}

impl ViewerState {
    pub fn new(config: ViewerConfig, width: u32, height: u32) -> Self {
        let (width, height) = surface_size(width, height, config.fallback_size);
        let distance = config.initial_distance();
        let camera = Camera::orbit(
            distance,
            config.fov_y_rad,
            config.z_near,
            config.z_far,
            width as f32 / height as f32,
        );
        Self {
            config,
            phase: ViewerPhase::Uninitialized,
            generation: 0,
            width,
            height,
            camera,
            distance,
            yaw: 0.0,
            pitch: 0.0,
            group: Transform::identity(),
            model_offset: Vec3::ZERO,
            drag: None,
        }
    }

    /// Start (or restart) loading. Earlier tickets become stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.phase = ViewerPhase::Loading;
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.drag = None;
        self.group = Transform::identity();
        self.model_offset = Vec3::ZERO;
        self.distance = self.config.initial_distance();
        self.camera.set_distance(self.distance);
        LoadTicket(self.generation)
    }

    #[inline]
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation && self.phase == ViewerPhase::Loading
    }

    /// Rotation applied to the mesh before centering.
    #[inline]
    pub fn correction(&self) -> Mat4 {
        Mat4::from_rotation_x(self.config.up_axis_correction)
    }

    /// Accept a loaded mesh given its raw (uncorrected) bounds; `None` means
    /// the mesh is empty. Returns `None` for stale tickets.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        bounds: Option<Aabb>,
    ) -> Option<LoadSummary> {
        if !self.is_current(ticket) {
            log::debug!(
                "Ignoring stale load completion (ticket {}, current {})",
                ticket.0,
                self.generation
            );
            return None;
        }

        let corrected = bounds.map(|b| b.transformed(&self.correction()));
        let raw_size = corrected.map(|b| b.size()).unwrap_or(Vec3::ZERO);
        let max_dim = corrected.map(|b| b.max_dimension()).unwrap_or(0.0);
        // Extents near f32::MAX overflow to infinity; treat them like an unsized mesh.
        let sized = max_dim.is_finite() && corrected.is_some_and(|b| !b.is_degenerate());

        self.model_offset = corrected
            .map(|b| -b.center())
            .filter(|offset| offset.is_finite())
            .unwrap_or(Vec3::ZERO);

        let scale = match self.config.scale_mode {
            ScaleMode::Fixed(s) => s,
            ScaleMode::AutoFit { target_extent } if sized => target_extent / max_dim,
            ScaleMode::AutoFit { .. } => 1.0,
        };
        self.group = Transform::from_trs(Vec3::ZERO, Vec3::ZERO, scale);

        let distance = match self.config.distance_mode {
            DistanceMode::Fixed(d) => d,
            DistanceMode::Computed { multiplier } if sized => multiplier * max_dim * scale,
            DistanceMode::Computed { .. } => self.config.initial_distance(),
        };
        let distance = if distance.is_finite() {
            distance
        } else {
            self.config.initial_distance()
        };
        self.distance = self.config.clamp_distance(distance);
        self.camera.set_distance(self.distance);
        self.phase = ViewerPhase::Ready;

        let centered_center = match bounds {
            Some(b) => b.transformed(&self.model_matrix()).center(),
            None => Vec3::ZERO,
        };
        Some(LoadSummary {
            raw_size,
            scale,
            distance: self.distance,
            centered_center,
        })
    }

    /// Mark the current load as failed. Returns `false` for stale tickets.
    pub fn fail_load(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) {
            log::debug!("Ignoring stale load failure (ticket {})", ticket.0);
            return false;
        }
        self.drag = None;
        self.phase = ViewerPhase::Failed {
            message: FAILURE_MESSAGE.to_string(),
        };
        true
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if matches!(self.phase, ViewerPhase::Failed { .. }) {
            return;
        }
        self.drag = Some(Vec2::new(x, y));
    }

    /// Accumulate drag deltas into yaw (horizontal) and pitch (vertical).
    /// Returns `true` if the angles changed.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        let Some(last) = self.drag else {
            return false;
        };
        let pos = Vec2::new(x, y);
        let delta = pos - last;
        self.drag = Some(pos);

        self.yaw += delta.x * self.config.sensitivity;
        self.pitch += delta.y * self.config.sensitivity;
        if self.config.pitch_clamp == PitchClamp::Clamped {
            self.pitch = self.pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
        }
        delta != Vec2::ZERO
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Apply a wheel delta (positive = away from the user).
    pub fn wheel(&mut self, delta_y: f32) {
        match self.config.wheel_target {
            WheelTarget::Distance => {
                self.distance = self
                    .config
                    .clamp_distance(self.distance + delta_y * self.config.wheel_distance_step);
                self.camera.set_distance(self.distance);
            }
            WheelTarget::Scale => {
                let step = self.config.wheel_scale_step;
                if delta_y > 0.0 {
                    self.group.scale_by(1.0 - step);
                } else if delta_y < 0.0 {
                    self.group.scale_by(1.0 + step);
                }
            }
        }
    }

    /// Track a new surface size. Rotation, distance and scale are kept.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = surface_size(width, height, self.config.fallback_size);
        self.width = width;
        self.height = height;
        self.camera = self.camera.with_aspect(width as f32 / height as f32);
    }

    /// Model matrix: group (rotation, scale) * centering offset * correction.
    pub fn model_matrix(&self) -> Mat4 {
        self.group.matrix() * Mat4::from_translation(self.model_offset) * self.correction()
    }

    /// Per-frame update: push the latest angles into the group and the latest
    /// distance into the camera. `None` when there is nothing to draw.
    pub fn frame(&mut self) -> Option<FrameParams> {
        let draw_mesh = match self.phase {
            ViewerPhase::Ready => true,
            ViewerPhase::Loading => false,
            ViewerPhase::Uninitialized | ViewerPhase::Failed { .. } => return None,
        };
        self.group.rotation_euler = Vec3::new(self.pitch, self.yaw, 0.0);
        self.camera.set_distance(self.distance);
        Some(FrameParams {
            model: self.model_matrix(),
            view_proj: self.camera.proj_view(),
            draw_mesh,
        })
    }

    pub fn phase(&self) -> &ViewerPhase {
        &self.phase
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.phase {
            ViewerPhase::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn scale(&self) -> f32 {
        self.group.scale
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn cursor_hint(&self) -> CursorHint {
        if self.is_dragging() {
            CursorHint::Grabbing
        } else {
            CursorHint::Grab
        }
    }
}

fn surface_size(width: u32, height: u32, fallback: (u32, u32)) -> (u32, u32) {
    let w = if width == 0 { fallback.0 } else { width };
    let h = if height == 0 { fallback.1 } else { height };
    (w.max(1), h.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerOptions;

    fn ready(config: ViewerConfig, bounds: Option<Aabb>) -> (ViewerState, LoadSummary) {
        let mut v = ViewerState::new(config, 800, 600);
        let ticket = v.begin_load();
        let summary = v.complete_load(ticket, bounds).expect("current ticket");
        (v, summary)
    }

    fn offset_box() -> Aabb {
        Aabb::new(Vec3::new(10.0, 20.0, -4.0), Vec3::new(12.0, 26.0, -1.0))
    }

    fn auto_fit() -> ViewerConfig {
        ViewerConfig::from_options(&ViewerOptions {
            use_fixed_scale: Some(false),
            ..Default::default()
        })
    }

    #[test]
    fn zero_size_falls_back() {
        let v = ViewerState::new(ViewerConfig::default(), 0, 0);
        assert_eq!(v.size(), (400, 400));
        assert_eq!(v.phase(), &ViewerPhase::Uninitialized);
    }

    #[test]
    fn load_centers_mesh_at_origin() {
        let (v, summary) = ready(ViewerConfig::default(), Some(offset_box()));
        assert!(summary.is_centered(), "center {:?}", summary.centered_center);
        assert_eq!(v.phase(), &ViewerPhase::Ready);

        let corners = offset_box().corners().map(|c| v.model_matrix().transform_point3(c));
        let center = Aabb::from_points(corners).unwrap().center();
        assert!(center.length() < 1e-4);
    }

    #[test]
    fn fixed_policies_use_configured_values() {
        let (v, summary) = ready(ViewerConfig::default(), Some(offset_box()));
        assert_eq!(summary.scale, 2.0);
        assert_eq!(v.distance(), 5.0);
        assert!((summary.raw_size - Vec3::new(2.0, 6.0, 3.0)).length() < 1e-4);
    }

    #[test]
    fn auto_fit_scales_by_largest_dimension() {
        let (v, summary) = ready(auto_fit(), Some(offset_box()));
        assert!((summary.scale - 2.0 / 6.0).abs() < 1e-6);
        // multiplier (2) * max_dim (6) * scale (1/3) = 4
        assert!((v.distance() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn computed_distance_is_clamped() {
        let cfg = ViewerConfig {
            scale_mode: ScaleMode::Fixed(1.0),
            distance_mode: DistanceMode::Computed { multiplier: 2.0 },
            ..ViewerConfig::default()
        };
        let tiny = Aabb::new(Vec3::ZERO, Vec3::splat(0.001));
        let (v, _) = ready(cfg, Some(tiny));
        assert_eq!(v.distance(), 0.5);

        let huge = Aabb::new(Vec3::ZERO, Vec3::splat(1.0e6));
        let (v, _) = ready(cfg, Some(huge));
        assert_eq!(v.distance(), 50.0);
    }

    #[test]
    fn overflowing_bounds_keep_distance_in_range() {
        let points = [
            Vec3::new(3.0e38, 0.0, 0.0),
            Vec3::new(-3.0e38, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let bounds = Aabb::from_points(points);
        for cfg in [auto_fit(), ViewerConfig::default()] {
            let (v, summary) = ready(cfg, bounds);
            assert!((0.5..=50.0).contains(&v.distance()), "distance {}", v.distance());
            assert!(summary.scale.is_finite() && summary.scale > 0.0);
            assert!(v.model_matrix().is_finite());
        }
    }

    #[test]
    fn empty_mesh_is_ready_with_defaults() {
        let (v, summary) = ready(auto_fit(), None);
        assert_eq!(v.phase(), &ViewerPhase::Ready);
        assert_eq!(summary.scale, 1.0);
        assert_eq!(v.distance(), 5.0);
    }

    #[test]
    fn drag_accumulates_scaled_deltas() {
        let (mut v, _) = ready(ViewerConfig::default(), Some(offset_box()));
        v.pointer_down(100.0, 100.0);
        assert_eq!(v.cursor_hint(), CursorHint::Grabbing);
        assert!(v.pointer_move(130.0, 90.0));
        assert!((v.yaw() - 0.30).abs() < 1e-6);
        assert!((v.pitch() + 0.10).abs() < 1e-6);

        v.pointer_up();
        assert_eq!(v.cursor_hint(), CursorHint::Grab);
        assert!(!v.pointer_move(500.0, 500.0));
        assert!((v.yaw() - 0.30).abs() < 1e-6);
    }

    #[test]
    fn free_pitch_is_unbounded() {
        let (mut v, _) = ready(ViewerConfig::default(), Some(offset_box()));
        v.pointer_down(0.0, 0.0);
        v.pointer_move(0.0, 1000.0);
        assert!((v.pitch() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn clamped_pitch_stops_at_quarter_turn() {
        let cfg = ViewerConfig::default().with_pitch_clamp(PitchClamp::Clamped);
        let (mut v, _) = ready(cfg, Some(offset_box()));
        v.pointer_down(0.0, 0.0);
        v.pointer_move(0.0, 1000.0);
        assert_eq!(v.pitch(), FRAC_PI_2);
        v.pointer_move(0.0, -5000.0);
        assert_eq!(v.pitch(), -FRAC_PI_2);
    }

    #[test]
    fn wheel_scales_group_multiplicatively() {
        let (mut v, _) = ready(ViewerConfig::default(), Some(offset_box()));
        v.wheel(100.0);
        assert!((v.scale() - 2.0 * 0.95).abs() < 1e-6);
        v.wheel(-100.0);
        assert!((v.scale() - 2.0 * 0.95 * 1.05).abs() < 1e-6);
        assert_eq!(v.distance(), 5.0);
    }

    #[test]
    fn wheel_moves_camera_within_range() {
        let cfg = ViewerConfig::default().with_wheel_target(WheelTarget::Distance);
        let (mut v, _) = ready(cfg, Some(offset_box()));
        v.wheel(100.0);
        assert!((v.distance() - 6.0).abs() < 1e-6);
        v.wheel(1.0e6);
        assert_eq!(v.distance(), 50.0);
        v.wheel(-1.0e6);
        assert_eq!(v.distance(), 0.5);
        assert_eq!(v.scale(), 2.0);
    }

    #[test]
    fn resize_keeps_interaction_state() {
        let (mut v, _) = ready(ViewerConfig::default(), Some(offset_box()));
        v.pointer_down(0.0, 0.0);
        v.pointer_move(50.0, 20.0);
        v.wheel(100.0);
        let (yaw, pitch, scale, distance) = (v.yaw(), v.pitch(), v.scale(), v.distance());

        v.resize(1024, 256);
        assert_eq!(v.size(), (1024, 256));
        assert!((v.camera().aspect - 4.0).abs() < 1e-6);
        assert_eq!((v.yaw(), v.pitch(), v.scale(), v.distance()), (yaw, pitch, scale, distance));
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut v = ViewerState::new(ViewerConfig::default(), 800, 600);
        let first = v.begin_load();
        let second = v.begin_load();
        assert!(v.complete_load(first, Some(offset_box())).is_none());
        assert!(!v.fail_load(first));
        assert_eq!(v.phase(), &ViewerPhase::Loading);
        assert!(v.complete_load(second, Some(offset_box())).is_some());
        assert_eq!(second.generation(), 2);
    }

    #[test]
    fn failure_shows_message_and_stops_frames() {
        let mut v = ViewerState::new(ViewerConfig::default(), 800, 600);
        let ticket = v.begin_load();
        assert!(v.fail_load(ticket));
        assert_eq!(v.failure_message(), Some(FAILURE_MESSAGE));
        assert!(v.frame().is_none());
        v.pointer_down(1.0, 1.0);
        assert!(!v.is_dragging());
    }

    #[test]
    fn reload_after_failure_clears_message() {
        let mut v = ViewerState::new(ViewerConfig::default(), 800, 600);
        let ticket = v.begin_load();
        v.fail_load(ticket);
        let ticket = v.begin_load();
        assert_eq!(v.failure_message(), None);
        v.complete_load(ticket, Some(offset_box()));
        assert_eq!(v.failure_message(), None);
        assert!(v.frame().is_some_and(|f| f.draw_mesh));
    }

    #[test]
    fn frames_follow_phase() {
        let mut v = ViewerState::new(ViewerConfig::default(), 800, 600);
        assert!(v.frame().is_none());
        let ticket = v.begin_load();
        assert_eq!(v.frame().map(|f| f.draw_mesh), Some(false));
        v.complete_load(ticket, Some(offset_box()));

        v.pointer_down(0.0, 0.0);
        v.pointer_move(10.0, 0.0);
        v.pointer_move(20.0, 0.0);
        let frame = v.frame().expect("ready frame");
        assert!(frame.draw_mesh);
        // Coalesced: both moves land in one frame.
        assert!((v.yaw() - 0.2).abs() < 1e-6);
        assert!(frame.view_proj.to_cols_array().iter().all(|f| f.is_finite()));
    }

    #[test]
    fn reload_resets_interaction_state() {
        let (mut v, _) = ready(ViewerConfig::default(), Some(offset_box()));
        v.pointer_down(0.0, 0.0);
        v.pointer_move(40.0, 40.0);
        v.begin_load();
        assert_eq!((v.yaw(), v.pitch()), (0.0, 0.0));
        assert!(!v.is_dragging());
        assert_eq!(v.phase(), &ViewerPhase::Loading);
    }
}
