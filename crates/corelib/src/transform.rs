use crate::{EulerRot, Mat4, Quat, Vec3};

/// Transform of the model group: translation, Euler XYZ rotation, uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    /// Euler angles in radians (XYZ order): x = pitch, y = yaw.
    pub rotation_euler: Vec3,
    pub scale: f32,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: 1.0,
        }
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: f32) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        )
    }

    /// Multiply the uniform scale by `factor`.
    #[inline]
    pub fn scale_by(&mut self, factor: f32) {
        self.scale *= factor;
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            self.rotation(),
            self.translation,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn scale_by_is_multiplicative() {
        let mut t = Transform::identity();
        t.scale_by(2.0);
        t.scale_by(0.5);
        t.scale_by(3.0);
        assert!((t.scale - 3.0).abs() < 1e-6);
    }

    #[test]
    fn yaw_rotates_x_axis_onto_negative_z() {
        let t = Transform::from_trs(Vec3::ZERO, Vec3::new(0.0, FRAC_PI_2, 0.0), 1.0);
        let p = t.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::NEG_Z).length() < 1e-5);
    }
}
