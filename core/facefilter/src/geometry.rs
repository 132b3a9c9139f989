//! Rectangle math for face regions.
//!
//! All rectangles here use a bottom-left origin: `y` grows upward. Boxes
//! handed out by detectors are normalized to the unit square; pixel-space
//! rectangles are the same boxes multiplied by the image extent. The flip
//! to the raster's top-left origin happens in `raster`, nowhere else.

use serde::{Deserialize, Serialize};

/// A point in bottom-left-origin coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of an image or rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either side is zero, negative or not a number.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned rectangle with its origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin covering `size`.
    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// The normalized `[0,1] x [0,1]` square.
    pub fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// Rectangle of the given size centered on `center`.
    pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Shrink by `dx` on the left and right and by `dy` on the bottom and
    /// top. Negative insets grow the rectangle around the same center.
    pub fn inset_by(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.x + dx,
            self.y + dy,
            self.width - 2.0 * dx,
            self.height - 2.0 * dy,
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }
}

/// Scale a normalized unit-square box to pixel coordinates of `extent`.
pub fn to_pixel_rect(unit_box: Rect, extent: Size) -> Rect {
    Rect::new(
        unit_box.x * extent.width,
        unit_box.y * extent.height,
        unit_box.width * extent.width,
        unit_box.height * extent.height,
    )
}

/// Grow `rect` by `overshoot` times its own width and height on every side.
/// The center stays put; an overshoot of 0 returns `rect` unchanged.
pub fn expand(rect: Rect, overshoot: f64) -> Rect {
    rect.inset_by(-rect.width * overshoot, -rect.height * overshoot)
}

/// Cut away whatever part of `rect` lies outside `bounds`.
///
/// Only the violating side moves: a rectangle poking out on the left keeps
/// its right edge and loses width, it is never shifted back inside. Each
/// axis is handled on its own. A rectangle that misses `bounds` entirely
/// collapses to zero size on the nearest edge.
pub fn clamp_to_bounds(rect: Rect, bounds: Rect) -> Rect {
    let (x, width) = clamp_axis(rect.min_x(), rect.max_x(), bounds.min_x(), bounds.max_x());
    let (y, height) = clamp_axis(rect.min_y(), rect.max_y(), bounds.min_y(), bounds.max_y());
    Rect::new(x, y, width, height)
}

fn clamp_axis(min: f64, max: f64, lower: f64, upper: f64) -> (f64, f64) {
    let new_min = min.max(lower).min(upper);
    let new_max = max.min(upper).max(new_min);
    (new_min, new_max - new_min)
}

/// Relative padding used around a face when cropping its preview.
///
/// The overshoot is rounded up to the next multiple of `step` so the crop
/// window only changes size when the overshoot crosses a step boundary.
pub fn preview_pad_factor(overshoot: f64, step: f64, offset: f64, epsilon: f64) -> f64 {
    ((overshoot + epsilon) / step).ceil() * step + offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_rect_eq(actual: Rect, expected: Rect) {
        assert_relative_eq!(actual.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(actual.width, expected.width, epsilon = 1e-9);
        assert_relative_eq!(actual.height, expected.height, epsilon = 1e-9);
    }

    #[test]
    fn pixel_rect_scales_each_axis() {
        let px = to_pixel_rect(Rect::new(0.4, 0.4, 0.2, 0.2), Size::new(1000.0, 1000.0));
        assert_rect_eq(px, Rect::new(400.0, 400.0, 200.0, 200.0));

        let px = to_pixel_rect(Rect::new(0.5, 0.25, 0.1, 0.5), Size::new(200.0, 80.0));
        assert_rect_eq(px, Rect::new(100.0, 20.0, 20.0, 40.0));
    }

    #[test]
    fn expand_with_zero_overshoot_is_identity() {
        let rect = Rect::new(12.5, 7.0, 31.0, 44.0);
        assert_eq!(expand(rect, 0.0), rect);
    }

    #[test]
    fn expand_grows_each_side_by_overshoot() {
        let expanded = expand(Rect::new(400.0, 400.0, 200.0, 200.0), 0.5);
        assert_rect_eq(expanded, Rect::new(300.0, 300.0, 400.0, 400.0));
    }

    #[test]
    fn expand_preserves_center() {
        let rect = Rect::new(10.0, 20.0, 30.0, 60.0);
        let expanded = expand(rect, 0.3);
        assert_relative_eq!(expanded.center().x, rect.center().x, epsilon = 1e-9);
        assert_relative_eq!(expanded.center().y, rect.center().y, epsilon = 1e-9);
    }

    #[test]
    fn clamp_shrinks_violating_side_only() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);

        // Left overflow: right edge stays at 30
        let clamped = clamp_to_bounds(Rect::new(-10.0, 10.0, 40.0, 20.0), bounds);
        assert_rect_eq(clamped, Rect::new(0.0, 10.0, 30.0, 20.0));

        // Top overflow: bottom edge stays at 90
        let clamped = clamp_to_bounds(Rect::new(10.0, 90.0, 20.0, 30.0), bounds);
        assert_rect_eq(clamped, Rect::new(10.0, 90.0, 20.0, 10.0));

        // Overflow on all four sides
        let clamped = clamp_to_bounds(Rect::new(-5.0, -5.0, 120.0, 130.0), bounds);
        assert_rect_eq(clamped, bounds);
    }

    #[test]
    fn clamp_inside_is_identity() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(clamp_to_bounds(rect, bounds), rect);
    }

    #[test]
    fn clamp_is_idempotent() {
        let bounds = Rect::from_size(Size::new(640.0, 480.0));
        let rects = [
            Rect::new(-50.0, -20.0, 100.0, 90.0),
            Rect::new(600.0, 450.0, 100.0, 90.0),
            Rect::new(700.0, 10.0, 10.0, 10.0),
            Rect::new(100.0, 100.0, 50.0, 50.0),
        ];
        for rect in rects {
            let once = clamp_to_bounds(rect, bounds);
            let twice = clamp_to_bounds(once, bounds);
            assert_eq!(once, twice);
            assert!(bounds.contains_rect(&once), "{once:?} escapes {bounds:?}");
        }
    }

    #[test]
    fn clamp_of_disjoint_rect_collapses_on_edge() {
        let bounds = Rect::new(0.0, 0.0, 10.0, 10.0);
        let clamped = clamp_to_bounds(Rect::new(12.0, 2.0, 2.0, 2.0), bounds);
        assert!(clamped.is_empty());
        assert!(bounds.contains_rect(&clamped));
    }

    #[test]
    fn pad_factor_rounds_up_in_steps() {
        // overshoot 0 -> one step of 0.4 plus the 0.1 offset
        assert_relative_eq!(preview_pad_factor(0.0, 0.4, 0.1, 0.01), 0.5, epsilon = 1e-9);
        assert_relative_eq!(preview_pad_factor(0.3, 0.4, 0.1, 0.01), 0.5, epsilon = 1e-9);
        assert_relative_eq!(preview_pad_factor(0.4, 0.4, 0.1, 0.01), 0.9, epsilon = 1e-9);
        assert_relative_eq!(preview_pad_factor(0.5, 0.2, 0.1, 0.01), 0.7, epsilon = 1e-9);
    }
}
