//! Translating winit input into controller units.
//!
//! The controller works in logical pixels, so drag and wheel sensitivity do
//! not change with the display's scale factor.

use corelib::{CursorHint, Vec2};
use winit::{
    dpi::{LogicalPosition, PhysicalPosition},
    event::MouseScrollDelta,
    window::CursorIcon,
};

/// Pixels per wheel line, matching what browsers report for one notch.
pub const PIXELS_PER_LINE: f32 = 100.0;

/// Wheel delta in DOM convention: positive when scrolling away from the user.
/// Pixel deltas arrive in physical pixels and are converted to logical ones.
pub fn wheel_delta_pixels(delta: MouseScrollDelta, scale_factor: f64) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
        MouseScrollDelta::PixelDelta(pos) => {
            let logical: LogicalPosition<f64> = pos.to_logical(scale_factor);
            -(logical.y as f32)
        }
    }
}

/// Cursor position in logical pixels.
pub fn logical_point(position: PhysicalPosition<f64>, scale_factor: f64) -> Vec2 {
    let logical: LogicalPosition<f64> = position.to_logical(scale_factor);
    Vec2::new(logical.x as f32, logical.y as f32)
}

pub fn cursor_icon(hint: CursorHint) -> CursorIcon {
    match hint {
        CursorHint::Grab => CursorIcon::Grab,
        CursorHint::Grabbing => CursorIcon::Grabbing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_delta_is_scaled_and_flipped() {
        assert_eq!(wheel_delta_pixels(MouseScrollDelta::LineDelta(0.0, 1.0), 1.0), -100.0);
        assert_eq!(wheel_delta_pixels(MouseScrollDelta::LineDelta(3.0, -2.0), 2.0), 200.0);
    }

    #[test]
    fn pixel_delta_is_flipped() {
        let delta = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -42.0));
        assert_eq!(wheel_delta_pixels(delta, 1.0), 42.0);
    }

    #[test]
    fn pixel_delta_uses_logical_pixels_on_hidpi() {
        let delta = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -42.0));
        assert_eq!(wheel_delta_pixels(delta, 2.0), 21.0);
    }

    #[test]
    fn cursor_position_is_logical() {
        let p = logical_point(PhysicalPosition::new(300.0, 120.0), 2.0);
        assert_eq!(p, Vec2::new(150.0, 60.0));
        assert_eq!(logical_point(PhysicalPosition::new(7.0, 9.0), 1.0), Vec2::new(7.0, 9.0));
    }

    #[test]
    fn cursor_follows_drag_hint() {
        assert_eq!(cursor_icon(CursorHint::Grab), CursorIcon::Grab);
        assert_eq!(cursor_icon(CursorHint::Grabbing), CursorIcon::Grabbing);
    }
}
