use serde::{Deserialize, Serialize};

use crate::error::FaceFilterError;
use crate::filter::{Filter, FilterKind};
use crate::geometry::{clamp_to_bounds, to_pixel_rect, Point, Rect, Size};

/// Fallback width of a manually added box, as a fraction of image width.
const DEFAULT_BOX_FRACTION: f64 = 0.1;

/// Divisor turning the largest face side (pixels) into a filter strength.
const SUGGESTED_STRENGTH_DIVISOR: f64 = 7.0;

/// One face: where it is, how much padding it gets, and how it is obscured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Normalized unit-square box, bottom-left origin, without overshoot.
    pub bounding_box: Rect,

    /// Fraction of the box size added as padding on every side.
    pub overshoot: f64,

    pub filter: Filter,
}

impl FaceRegion {
    pub fn new(bounding_box: Rect, filter: Filter) -> Self {
        Self {
            bounding_box,
            overshoot: 0.0,
            filter,
        }
    }

    /// The unpadded box in pixel coordinates of `extent`.
    pub fn pixel_rect(&self, extent: Size) -> Rect {
        to_pixel_rect(self.bounding_box, extent)
    }
}

/// Which regions a mutation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTarget {
    Index(usize),
    All,
}

/// Check that `index` addresses one of `len` regions.
pub fn check_index(index: usize, len: usize) -> Result<(), FaceFilterError> {
    if index < len {
        Ok(())
    } else {
        Err(FaceFilterError::NoSuchRegion { index, len })
    }
}

/// Check that a face box has finite coordinates and positive sides.
pub fn check_box(rect: Rect) -> Result<(), FaceFilterError> {
    let finite = [rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite());
    if finite && rect.width > 0.0 && rect.height > 0.0 {
        Ok(())
    } else {
        Err(FaceFilterError::InvalidBox {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        })
    }
}

pub fn check_overshoot(overshoot: f64) -> Result<(), FaceFilterError> {
    if overshoot.is_finite() && overshoot >= 0.0 {
        Ok(())
    } else {
        Err(FaceFilterError::InvalidOvershoot(overshoot))
    }
}

/// Box for a region added by hand at `point` (normalized coordinates).
///
/// The size is the mean size of `existing`. Without existing regions the box
/// is a tenth of the image width wide and just as many pixels tall. The
/// result is clamped to the unit square.
pub fn manual_region_box(
    point: Point,
    existing: &[FaceRegion],
    extent: Size,
) -> Result<Rect, FaceFilterError> {
    if !Rect::unit().contains_point(point) {
        return Err(FaceFilterError::PointOutOfBounds {
            x: point.x,
            y: point.y,
        });
    }

    let (sum_w, sum_h) = existing.iter().fold((0.0, 0.0), |(w, h), region| {
        (w + region.bounding_box.width, h + region.bounding_box.height)
    });

    let (width, height) = if sum_w > 0.0 && sum_h > 0.0 {
        let count = existing.len() as f64;
        (sum_w / count, sum_h / count)
    } else {
        if extent.is_degenerate() {
            return Err(FaceFilterError::EmptyImage);
        }
        (
            DEFAULT_BOX_FRACTION,
            extent.width / extent.height * DEFAULT_BOX_FRACTION,
        )
    };

    Ok(clamp_to_bounds(
        Rect::centered_at(point, width, height),
        Rect::unit(),
    ))
}

/// Filter strength scaled to the largest face in `regions`.
///
/// Returns `None` without regions. The value is clamped into the kind's
/// parameter range.
pub fn suggested_parameter(kind: FilterKind, regions: &[FaceRegion], extent: Size) -> Option<f32> {
    let largest = regions
        .iter()
        .map(|region| {
            let px = region.pixel_rect(extent);
            px.width.max(px.height)
        })
        .fold(None, |acc: Option<f64>, side| {
            Some(acc.map_or(side, |max| max.max(side)))
        })?;

    let (min, max) = kind.parameter_range();
    Some(((largest / SUGGESTED_STRENGTH_DIVISOR).round() as f32).clamp(min, max))
}
