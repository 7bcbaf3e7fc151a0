//! Viewer configuration: the policies a viewer instance runs with.
//!
//! Callers usually start from [`ViewerOptions`] (every field optional) and
//! resolve it with [`ViewerConfig::from_options`]. Pitch clamping and the
//! wheel target are picked on the resolved config.

use std::f32::consts::PI;

use crate::error::{ViewerError, ViewerResult};

pub const DEFAULT_SCALE: f32 = 2.0;
pub const DEFAULT_DISTANCE: f32 = 5.0;
pub const DEFAULT_TARGET_EXTENT: f32 = 2.0;
pub const DEFAULT_DISTANCE_MULTIPLIER: f32 = 2.0;
pub const DEFAULT_SENSITIVITY: f32 = 0.01;
pub const DEFAULT_FALLBACK_SIZE: (u32, u32) = (400, 400);

/// How the model group is sized once a mesh has loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleMode {
    /// Uniform scale factor applied as is.
    Fixed(f32),
    /// Scale so the largest bounding-box dimension spans `target_extent` world units.
    AutoFit { target_extent: f32 },
}

/// How the camera distance is chosen once a mesh has loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DistanceMode {
    Fixed(f32),
    /// `multiplier` times the scaled largest dimension.
    Computed { multiplier: f32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PitchClamp {
    #[default]
    Free,
    /// Pitch limited to ±90°.
    Clamped,
}

/// What the scroll wheel changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WheelTarget {
    Distance,
    #[default]
    Scale,
}

/// Per-viewer overrides, all optional.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewerOptions {
    pub scale: Option<f32>,
    pub camera_distance: Option<f32>,
    pub use_fixed_scale: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerConfig {
    pub scale_mode: ScaleMode,
    pub distance_mode: DistanceMode,
    pub pitch_clamp: PitchClamp,
    pub wheel_target: WheelTarget,
    /// Radians per pixel of pointer drag.
    pub sensitivity: f32,
    /// Inclusive camera distance range.
    pub distance_range: (f32, f32),
    /// Distance change per unit of wheel delta.
    pub wheel_distance_step: f32,
    /// Fractional scale change per wheel notch.
    pub wheel_scale_step: f32,
    /// Rotation about X applied to the mesh before centering (up-axis fix).
    pub up_axis_correction: f32,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// Surface size used when the window reports zero pixels.
    pub fallback_size: (u32, u32),
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scale_mode: ScaleMode::Fixed(DEFAULT_SCALE),
            distance_mode: DistanceMode::Fixed(DEFAULT_DISTANCE),
            pitch_clamp: PitchClamp::Free,
            wheel_target: WheelTarget::Scale,
            sensitivity: DEFAULT_SENSITIVITY,
            distance_range: (0.5, 50.0),
            wheel_distance_step: 0.01,
            wheel_scale_step: 0.05,
            up_axis_correction: PI,
            fov_y_rad: 45f32.to_radians(),
            z_near: 0.1,
            z_far: 1000.0,
            fallback_size: DEFAULT_FALLBACK_SIZE,
        }
    }
}

impl ViewerConfig {
    /// Resolve optional overrides into explicit scale and distance policies.
    ///
    /// Fixed scale (the default) pairs with a fixed distance; auto-fit pairs
    /// with a computed distance unless a distance is given explicitly.
    pub fn from_options(options: &ViewerOptions) -> Self {
        let fixed = options.use_fixed_scale.unwrap_or(true);
        let scale_mode = if fixed {
            ScaleMode::Fixed(options.scale.unwrap_or(DEFAULT_SCALE))
        } else {
            ScaleMode::AutoFit {
                target_extent: options.scale.unwrap_or(DEFAULT_TARGET_EXTENT),
            }
        };
        let distance_mode = match options.camera_distance {
            Some(d) => DistanceMode::Fixed(d),
            None if fixed => DistanceMode::Fixed(DEFAULT_DISTANCE),
            None => DistanceMode::Computed {
                multiplier: DEFAULT_DISTANCE_MULTIPLIER,
            },
        };
        Self {
            scale_mode,
            distance_mode,
            ..Self::default()
        }
    }

    pub fn with_pitch_clamp(mut self, clamp: PitchClamp) -> Self {
        self.pitch_clamp = clamp;
        self
    }

    pub fn with_wheel_target(mut self, target: WheelTarget) -> Self {
        self.wheel_target = target;
        self
    }

    pub fn clamp_distance(&self, distance: f32) -> f32 {
        let (min, max) = self.distance_range;
        distance.clamp(min, max)
    }

    /// Distance used before any mesh is loaded (and for empty meshes).
    pub fn initial_distance(&self) -> f32 {
        match self.distance_mode {
            DistanceMode::Fixed(d) => self.clamp_distance(d),
            DistanceMode::Computed { .. } => self.clamp_distance(DEFAULT_DISTANCE),
        }
    }

    pub fn validate(&self) -> ViewerResult<()> {
        let positive = |name: &str, v: f32| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ViewerError::InvalidConfig(format!(
                    "{name} must be positive, got {v}"
                )))
            }
        };
        match self.scale_mode {
            ScaleMode::Fixed(s) => positive("scale", s)?,
            ScaleMode::AutoFit { target_extent } => positive("target extent", target_extent)?,
        }
        match self.distance_mode {
            DistanceMode::Fixed(d) => positive("camera distance", d)?,
            DistanceMode::Computed { multiplier } => positive("distance multiplier", multiplier)?,
        }
        positive("sensitivity", self.sensitivity)?;
        let (min, max) = self.distance_range;
        positive("minimum distance", min)?;
        if !(max >= min) {
            return Err(ViewerError::InvalidConfig(format!(
                "distance range is inverted: [{min}, {max}]"
            )));
        }
        if !(0.0..1.0).contains(&self.wheel_scale_step) {
            return Err(ViewerError::InvalidConfig(format!(
                "wheel scale step must be in [0, 1), got {}",
                self.wheel_scale_step
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_resolve_to_fixed_policies() {
        let cfg = ViewerConfig::from_options(&ViewerOptions::default());
        assert_eq!(cfg.scale_mode, ScaleMode::Fixed(DEFAULT_SCALE));
        assert_eq!(cfg.distance_mode, DistanceMode::Fixed(DEFAULT_DISTANCE));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn auto_fit_without_distance_computes_distance() {
        let cfg = ViewerConfig::from_options(&ViewerOptions {
            scale: Some(3.0),
            use_fixed_scale: Some(false),
            ..Default::default()
        });
        assert_eq!(cfg.scale_mode, ScaleMode::AutoFit { target_extent: 3.0 });
        assert_eq!(
            cfg.distance_mode,
            DistanceMode::Computed {
                multiplier: DEFAULT_DISTANCE_MULTIPLIER
            }
        );
    }

    #[test]
    fn explicit_distance_wins_over_auto_fit() {
        let cfg = ViewerConfig::from_options(&ViewerOptions {
            camera_distance: Some(8.0),
            use_fixed_scale: Some(false),
            ..Default::default()
        });
        assert_eq!(cfg.distance_mode, DistanceMode::Fixed(8.0));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = ViewerConfig::from_options(&ViewerOptions {
            scale: Some(0.0),
            ..Default::default()
        });
        assert!(matches!(cfg.validate(), Err(ViewerError::InvalidConfig(_))));

        let cfg = ViewerConfig {
            distance_range: (10.0, 1.0),
            ..ViewerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn initial_distance_is_clamped() {
        let cfg = ViewerConfig::from_options(&ViewerOptions {
            camera_distance: Some(500.0),
            ..Default::default()
        });
        assert_eq!(cfg.initial_distance(), 50.0);
    }
}
