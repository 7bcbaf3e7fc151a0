use crate::{Mat4, Vec3};

/// Perspective camera (right-handed) orbiting the origin on the +Z axis.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Camera {
    /// Camera at `(0, 0, distance)` looking at the origin.
    pub fn orbit(distance: f32, fov_y_rad: f32, z_near: f32, z_far: f32, aspect: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, distance),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_rad,
            z_near,
            z_far,
            aspect,
        }
    }

    #[inline]
    pub fn distance(&self) -> f32 {
        (self.eye - self.target).length()
    }

    /// Move back along +Z to `distance`, keeping the origin as target.
    #[inline]
    pub fn set_distance(&mut self, distance: f32) {
        self.target = Vec3::ZERO;
        self.eye = Vec3::new(0.0, 0.0, distance);
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Depth maps to [0, 1], which is what wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}
