//! Core types: math re-exports, Transform, Camera, bounds and the viewer controller.
//! Everything here is GPU-free so the interaction model can be tested headless.

pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, vec3};

pub mod bounds;
pub mod camera;
pub mod config;
pub mod error;
pub mod transform;
pub mod viewer;

pub use bounds::Aabb;
pub use config::{DistanceMode, PitchClamp, ScaleMode, ViewerConfig, ViewerOptions, WheelTarget};
pub use error::{ViewerError, ViewerResult};
pub use viewer::{CursorHint, FrameParams, LoadSummary, LoadTicket, ViewerPhase, ViewerState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_is_identity_matrix() {
        let t = transform::Transform::identity();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_then_scale_matrix() {
        let t = transform::Transform::from_trs(vec3(1.0, 2.0, 3.0), Vec3::ZERO, 2.0);
        // Last column is the translation, diagonal is the scale (no rotation).
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn camera_pv_is_finite() {
        let cam = camera::Camera::orbit(4.0, 45f32.to_radians(), 0.1, 100.0, 16.0 / 9.0);
        let pv = cam.proj_view();
        let a = pv.to_cols_array();
        assert!(a.iter().all(|f| f.is_finite()));
    }
}
