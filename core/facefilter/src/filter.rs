use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::FaceFilterError;

/// The obscuring filter assigned to a face region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Filter {
    /// Pass-through: the region is rendered unfiltered.
    #[default]
    None,

    /// Gaussian blur; `radius` is used as the blur sigma in pixels.
    GaussianBlur { radius: f32 },

    /// Square mosaic with cells of `scale` pixels.
    Pixellate { scale: f32 },

    /// Hexagonal mosaic with hexagons `scale` pixels wide.
    HexagonalPixellate { scale: f32 },
}

impl Filter {
    /// Build a filter from its kebab-case name and single parameter.
    ///
    /// An empty name clears the filter. The parameter is clamped to the
    /// kind's allowed range.
    pub fn from_name(name: &str, parameter: f32) -> Result<Self, FaceFilterError> {
        if name.is_empty() {
            return Ok(Filter::None);
        }
        let kind = FilterKind::from_name(name)
            .ok_or_else(|| FaceFilterError::UnknownFilter(name.to_string()))?;
        Ok(kind.with_parameter(parameter))
    }

    pub fn kind(&self) -> Option<FilterKind> {
        match self {
            Filter::None => None,
            Filter::GaussianBlur { .. } => Some(FilterKind::GaussianBlur),
            Filter::Pixellate { .. } => Some(FilterKind::Pixellate),
            Filter::HexagonalPixellate { .. } => Some(FilterKind::HexagonalPixellate),
        }
    }

    pub fn parameter(&self) -> Option<f32> {
        match *self {
            Filter::None => None,
            Filter::GaussianBlur { radius } => Some(radius),
            Filter::Pixellate { scale } | Filter::HexagonalPixellate { scale } => Some(scale),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Filter::None)
    }

    pub fn name(&self) -> &'static str {
        self.kind().map_or("", |kind| kind.name())
    }
}

/// The closed set of filters the engine knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    GaussianBlur,
    Pixellate,
    HexagonalPixellate,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [
        FilterKind::GaussianBlur,
        FilterKind::Pixellate,
        FilterKind::HexagonalPixellate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::GaussianBlur => "gaussian-blur",
            FilterKind::Pixellate => "pixellate",
            FilterKind::HexagonalPixellate => "hexagonal-pixellate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Name of the single tunable parameter.
    pub fn parameter_name(&self) -> &'static str {
        match self {
            FilterKind::GaussianBlur => "radius",
            FilterKind::Pixellate | FilterKind::HexagonalPixellate => "scale",
        }
    }

    pub fn default_parameter(&self) -> f32 {
        match self {
            FilterKind::GaussianBlur => 10.0,
            FilterKind::Pixellate | FilterKind::HexagonalPixellate => 20.0,
        }
    }

    /// Inclusive `(min, max)` of the parameter.
    pub fn parameter_range(&self) -> (f32, f32) {
        match self {
            FilterKind::GaussianBlur => (0.0, 100.0),
            FilterKind::Pixellate | FilterKind::HexagonalPixellate => (1.0, 100.0),
        }
    }

    pub fn with_parameter(&self, value: f32) -> Filter {
        let (min, max) = self.parameter_range();
        let value = if value.is_nan() {
            self.default_parameter()
        } else {
            value.clamp(min, max)
        };
        match self {
            FilterKind::GaussianBlur => Filter::GaussianBlur { radius: value },
            FilterKind::Pixellate => Filter::Pixellate { scale: value },
            FilterKind::HexagonalPixellate => Filter::HexagonalPixellate { scale: value },
        }
    }

    pub fn default_filter(&self) -> Filter {
        self.with_parameter(self.default_parameter())
    }
}

/// Source of filter implementations.
///
/// Implement this trait to plug in another image-processing backend. The
/// engine never passes [`Filter::None`]; returning
/// [`FaceFilterError::FilterUnavailable`] aborts the render that asked.
pub trait FilterCatalog: Send + Sync {
    /// Filter `image` and return a raster at least as large as the input.
    fn apply(&self, filter: &Filter, image: &RgbaImage) -> Result<RgbaImage, FaceFilterError>;
}

/// Pure-Rust filters built on the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFilters;

impl FilterCatalog for BuiltinFilters {
    fn apply(&self, filter: &Filter, image: &RgbaImage) -> Result<RgbaImage, FaceFilterError> {
        let output = match *filter {
            Filter::None => image.clone(),
            Filter::GaussianBlur { radius } => gaussian_blur(image, radius),
            Filter::Pixellate { scale } => pixellate(image, scale),
            Filter::HexagonalPixellate { scale } => hexagonal_pixellate(image, scale),
        };
        Ok(output)
    }
}

fn gaussian_blur(image: &RgbaImage, radius: f32) -> RgbaImage {
    if radius <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    image::imageops::blur(image, radius)
}

/// Running per-channel sum for averaging a mosaic cell.
#[derive(Debug, Clone, Copy, Default)]
struct ColorSum {
    channels: [u64; 4],
    count: u64,
}

impl ColorSum {
    fn add(&mut self, pixel: &Rgba<u8>) {
        for (sum, value) in self.channels.iter_mut().zip(pixel.0) {
            *sum += value as u64;
        }
        self.count += 1;
    }

    fn mean(&self) -> Rgba<u8> {
        let count = self.count.max(1);
        Rgba(self.channels.map(|sum| ((sum + count / 2) / count) as u8))
    }
}

fn pixellate(image: &RgbaImage, scale: f32) -> RgbaImage {
    let cell = (scale.round() as u32).max(1);
    let (width, height) = image.dimensions();
    let mut output = RgbaImage::new(width, height);

    for cell_y in (0..height).step_by(cell as usize) {
        for cell_x in (0..width).step_by(cell as usize) {
            let cell_w = cell.min(width - cell_x);
            let cell_h = cell.min(height - cell_y);

            let mut sum = ColorSum::default();
            for y in cell_y..cell_y + cell_h {
                for x in cell_x..cell_x + cell_w {
                    sum.add(image.get_pixel(x, y));
                }
            }

            let mean = sum.mean();
            for y in cell_y..cell_y + cell_h {
                for x in cell_x..cell_x + cell_w {
                    output.put_pixel(x, y, mean);
                }
            }
        }
    }

    output
}

fn hexagonal_pixellate(image: &RgbaImage, scale: f32) -> RgbaImage {
    // Pointy-top hexagons: `scale` is the flat-to-flat width.
    let size = (scale.max(1.0) as f64) / 3f64.sqrt();
    let (width, height) = image.dimensions();

    let cells: Vec<(i64, i64)> = image
        .enumerate_pixels()
        .map(|(x, y, _)| hex_cell(x as f64 + 0.5, y as f64 + 0.5, size))
        .collect();

    let mut sums: HashMap<(i64, i64), ColorSum> = HashMap::new();
    for (pixel, cell) in image.pixels().zip(&cells) {
        sums.entry(*cell).or_default().add(pixel);
    }

    let mut output = RgbaImage::new(width, height);
    for ((_, _, out), cell) in output.enumerate_pixels_mut().zip(&cells) {
        if let Some(sum) = sums.get(cell) {
            *out = sum.mean();
        }
    }
    output
}

/// Axial coordinates of the hexagon containing `(x, y)`.
fn hex_cell(x: f64, y: f64, size: f64) -> (i64, i64) {
    let q = (3f64.sqrt() / 3.0 * x - y / 3.0) / size;
    let r = (2.0 / 3.0 * y) / size;
    cube_round(q, r)
}

fn cube_round(q: f64, r: f64) -> (i64, i64) {
    let s = -q - r;
    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i64, rr as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_gradient(width: u32, height: u32) -> RgbaImage {
        let mut img = RgbaImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgba([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
                255,
            ]);
        }
        img
    }

    #[test]
    fn from_name_round_trips_every_kind() {
        for kind in FilterKind::ALL {
            let filter = Filter::from_name(kind.name(), kind.default_parameter()).unwrap();
            assert_eq!(filter.kind(), Some(kind));
            assert_eq!(filter.parameter(), Some(kind.default_parameter()));
        }
    }

    #[test]
    fn empty_name_clears_filter() {
        assert_eq!(Filter::from_name("", 5.0).unwrap(), Filter::None);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let err = Filter::from_name("sepia", 1.0).unwrap_err();
        assert!(matches!(err, FaceFilterError::UnknownFilter(name) if name == "sepia"));
    }

    #[test]
    fn parameter_is_clamped_to_range() {
        assert_eq!(
            FilterKind::Pixellate.with_parameter(0.0),
            Filter::Pixellate { scale: 1.0 }
        );
        assert_eq!(
            FilterKind::GaussianBlur.with_parameter(500.0),
            Filter::GaussianBlur { radius: 100.0 }
        );
    }

    #[test]
    fn builtin_filters_keep_dimensions() {
        let img = make_gradient(37, 23);
        for kind in FilterKind::ALL {
            let out = BuiltinFilters.apply(&kind.default_filter(), &img).unwrap();
            assert_eq!(out.dimensions(), img.dimensions(), "{}", kind.name());
        }
    }

    #[test]
    fn pixellate_fills_cells_with_one_color() {
        let img = make_gradient(40, 40);
        let out = pixellate(&img, 10.0);
        let first = *out.get_pixel(0, 0);
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(*out.get_pixel(x, y), first);
            }
        }
        assert_ne!(*out.get_pixel(0, 0), *out.get_pixel(39, 39));
    }

    #[test]
    fn pixellate_of_uniform_image_is_identity() {
        let img = RgbaImage::from_pixel(17, 9, Rgba([10, 20, 30, 255]));
        assert_eq!(pixellate(&img, 4.0), img);
        assert_eq!(hexagonal_pixellate(&img, 6.0), img);
    }

    #[test]
    fn hexagonal_pixellate_reduces_distinct_colors() {
        let img = make_gradient(60, 60);
        let out = hexagonal_pixellate(&img, 20.0);
        let distinct_in: std::collections::HashSet<_> = img.pixels().map(|p| p.0).collect();
        let distinct_out: std::collections::HashSet<_> = out.pixels().map(|p| p.0).collect();
        assert!(distinct_out.len() < distinct_in.len() / 4);
    }

    #[test]
    fn zero_radius_blur_is_identity() {
        let img = make_gradient(16, 16);
        assert_eq!(gaussian_blur(&img, 0.0), img);
    }

    #[test]
    fn blur_changes_gradient() {
        let img = make_gradient(32, 32);
        assert_ne!(gaussian_blur(&img, 4.0), img);
    }
}
