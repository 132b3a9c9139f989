//! Bridge between bottom-left geometry and the top-left `image` rasters.

use image::{imageops, RgbaImage};

use crate::geometry::{Rect, Size};

/// Integer pixel window in raster (top-left origin) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelWindow {
    /// Snap a bottom-left pixel rectangle onto a `width` x `height` raster.
    ///
    /// Each edge is rounded to the nearest pixel boundary and the result is
    /// clipped to the raster. Returns `None` when nothing is left.
    pub fn snap(rect: Rect, width: u32, height: u32) -> Option<Self> {
        let snap = |value: f64, limit: u32| value.round().clamp(0.0, limit as f64) as u32;

        let left = snap(rect.min_x(), width);
        let right = snap(rect.max_x(), width);
        let bottom = snap(rect.min_y(), height);
        let top = snap(rect.max_y(), height);

        if right <= left || top <= bottom {
            return None;
        }

        Some(Self {
            x: left,
            y: height - top,
            width: right - left,
            height: top - bottom,
        })
    }

    /// The window as a bottom-left rectangle on a raster `height` pixels tall.
    pub fn to_rect(&self, height: u32) -> Rect {
        Rect::new(
            self.x as f64,
            (height - self.y - self.height) as f64,
            self.width as f64,
            self.height as f64,
        )
    }
}

/// Pixel extent of a raster.
pub fn extent(image: &RgbaImage) -> Size {
    Size::new(image.width() as f64, image.height() as f64)
}

pub fn crop(image: &RgbaImage, window: PixelWindow) -> RgbaImage {
    imageops::crop_imm(image, window.x, window.y, window.width, window.height).to_image()
}

/// Source-over composite `patch` onto `target` at `window`.
///
/// Anything in `patch` beyond the window's size is cut off, so filters that
/// grow their output cannot bleed past the region they were given.
pub fn composite_over(target: &mut RgbaImage, patch: &RgbaImage, window: PixelWindow) {
    let width = window.width.min(patch.width());
    let height = window.height.min(patch.height());
    let clipped = imageops::crop_imm(patch, 0, 0, width, height).to_image();
    imageops::overlay(target, &clipped, window.x as i64, window.y as i64);
}
