use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::FaceFilterError;

/// Largest accepted overview cell side, in pixels.
pub const MAX_CELL_WIDTH: u32 = 4096;

/// Resampling used when scaling previews into overview tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TileResize {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl TileResize {
    pub(crate) fn filter_type(self) -> FilterType {
        match self {
            TileResize::Nearest => FilterType::Nearest,
            TileResize::Triangle => FilterType::Triangle,
            TileResize::CatmullRom => FilterType::CatmullRom,
            TileResize::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Tunables for preview framing and the overview grid.
///
/// All fields have defaults, so a partial document deserializes fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Step the preview padding is rounded up to.
    pub area_increase_factor: f64,

    /// Padding added on top of the rounded step.
    pub area_increase_offset: f64,

    /// Nudge added to the overshoot before rounding, so an overshoot of 0
    /// still gets one full step of context.
    pub padding_epsilon: f64,

    /// `area_increase_factor` used for overview tiles (tighter framing).
    pub overview_area_increase_factor: f64,

    /// Side length of one square overview tile, in pixels.
    pub cell_width: u32,

    /// RGBA color behind the overview tiles.
    pub background: [u8; 4],

    pub tile_resize: TileResize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            area_increase_factor: 0.4,
            area_increase_offset: 0.1,
            padding_epsilon: 0.01,
            overview_area_increase_factor: 0.2,
            cell_width: 200,
            background: [0, 0, 0, 255],
            tile_resize: TileResize::default(),
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> Result<(), FaceFilterError> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        let non_negative = |value: f64| value.is_finite() && value >= 0.0;

        if !positive(self.area_increase_factor) {
            return Err(FaceFilterError::InvalidSettings(format!(
                "area_increase_factor must be > 0, got {}",
                self.area_increase_factor
            )));
        }
        if !positive(self.overview_area_increase_factor) {
            return Err(FaceFilterError::InvalidSettings(format!(
                "overview_area_increase_factor must be > 0, got {}",
                self.overview_area_increase_factor
            )));
        }
        if !non_negative(self.area_increase_offset) || !non_negative(self.padding_epsilon) {
            return Err(FaceFilterError::InvalidSettings(
                "area_increase_offset and padding_epsilon must be >= 0".to_string(),
            ));
        }
        if self.cell_width == 0 || self.cell_width > MAX_CELL_WIDTH {
            return Err(FaceFilterError::InvalidSettings(format!(
                "cell_width must be in 1..={MAX_CELL_WIDTH}, got {}",
                self.cell_width
            )));
        }
        Ok(())
    }
}
