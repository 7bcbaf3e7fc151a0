//! Axis-aligned bounding boxes used to center and size loaded meshes.

use crate::{Mat4, Vec3};

/// Below this extent a box is treated as a point for sizing purposes.
pub const DEGENERATE_EXTENT: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.max_dimension() <= DEGENERATE_EXTENT
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box around the eight transformed corners. Exact for axis-aligned
    /// rotations; a conservative bound otherwise.
    pub fn transformed(&self, m: &Mat4) -> Self {
        let corners = self.corners().map(|c| m.transform_point3(c));
        let mut min = corners[0];
        let mut max = corners[0];
        for c in &corners[1..] {
            min = min.min(*c);
            max = max.max(*c);
        }
        Self { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn empty_points_have_no_bounds() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn center_and_size() {
        let b = Aabb::from_points([
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(3.0, 4.0, 2.0),
            Vec3::new(0.0, -2.0, 6.0),
        ])
        .unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, 2.0));
        assert_eq!(b.max, Vec3::new(3.0, 4.0, 6.0));
        assert_eq!(b.center(), Vec3::new(1.0, 1.0, 4.0));
        assert_eq!(b.max_dimension(), 6.0);
        assert!(!b.is_degenerate());
    }

    #[test]
    fn half_turn_about_x_flips_y_and_z() {
        let b = Aabb::new(Vec3::new(0.0, 1.0, 2.0), Vec3::new(1.0, 3.0, 5.0));
        let t = b.transformed(&Mat4::from_rotation_x(PI));
        assert!((t.min - Vec3::new(0.0, -3.0, -5.0)).length() < 1e-5);
        assert!((t.max - Vec3::new(1.0, -1.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn single_point_is_degenerate() {
        let b = Aabb::from_points([Vec3::ONE]).unwrap();
        assert!(b.is_degenerate());
        assert_eq!(b.center(), Vec3::ONE);
    }
}
