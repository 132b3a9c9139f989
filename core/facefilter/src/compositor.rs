use std::sync::Arc;

use image::{imageops, Rgba, RgbaImage};
use tracing::debug;

use crate::config::RenderSettings;
use crate::error::FaceFilterError;
use crate::filter::{BuiltinFilters, Filter, FilterCatalog};
use crate::geometry::{clamp_to_bounds, expand, preview_pad_factor, Rect};
use crate::raster::{self, PixelWindow};
use crate::region::FaceRegion;

/// Renders face regions onto their source image.
///
/// Every render is a pure function of the input raster and the regions
/// passed in, so one `Compositor` can be shared across threads.
#[derive(Clone)]
pub struct Compositor {
    settings: RenderSettings,
    catalog: Arc<dyn FilterCatalog>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            settings: RenderSettings::default(),
            catalog: Arc::new(BuiltinFilters),
        }
    }
}

impl Compositor {
    pub fn new(
        settings: RenderSettings,
        catalog: Arc<dyn FilterCatalog>,
    ) -> Result<Self, FaceFilterError> {
        settings.validate()?;
        Ok(Self { settings, catalog })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn catalog(&self) -> Arc<dyn FilterCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Same settings, different filter implementation.
    pub fn with_catalog(&self, catalog: Arc<dyn FilterCatalog>) -> Self {
        Self {
            settings: self.settings.clone(),
            catalog,
        }
    }

    /// Composite every filtered region over `input`.
    ///
    /// Patches are always cut from the untouched input, and later regions
    /// are painted over earlier ones where they overlap.
    pub fn render_result(
        &self,
        input: &RgbaImage,
        regions: &[FaceRegion],
    ) -> Result<RgbaImage, FaceFilterError> {
        ensure_not_empty(input)?;
        let extent = raster::extent(input);

        let mut output = input.clone();
        for (index, region) in regions.iter().enumerate() {
            if region.filter.is_none() {
                continue;
            }
            let adjusted = expand(region.pixel_rect(extent), region.overshoot);
            debug!(index, filter = region.filter.name(), ?adjusted, "compositing region");
            self.paint_region(input, &mut output, adjusted, &region.filter)?;
        }

        Ok(output)
    }

    /// Zoomed, padded view of a single region for fine-tuning.
    pub fn render_preview(
        &self,
        input: &RgbaImage,
        region: &FaceRegion,
    ) -> Result<RgbaImage, FaceFilterError> {
        self.render_framed_preview(input, region, self.settings.area_increase_factor)
    }

    /// Tile every region's preview into one grid image.
    pub fn render_overview(
        &self,
        input: &RgbaImage,
        regions: &[FaceRegion],
    ) -> Result<RgbaImage, FaceFilterError> {
        ensure_not_empty(input)?;
        let layout = GridLayout::new(regions.len(), self.settings.cell_width)?;
        let (canvas_w, canvas_h) = layout.canvas_size();
        debug!(
            faces = regions.len(),
            columns = layout.columns,
            rows = layout.rows,
            "rendering overview"
        );

        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba(self.settings.background));
        let cell = layout.cell_width;
        for (index, region) in regions.iter().enumerate() {
            let preview = match self.render_framed_preview(
                input,
                region,
                self.settings.overview_area_increase_factor,
            ) {
                Ok(preview) => preview,
                // The cell keeps the background
                Err(FaceFilterError::EmptyRegion(rect)) => {
                    debug!(index, ?rect, "region covers no pixels, leaving cell empty");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let tile = imageops::resize(
                &preview,
                cell,
                cell,
                self.settings.tile_resize.filter_type(),
            );
            if let Some(window) = layout.cell_window(index) {
                raster::composite_over(&mut canvas, &tile, window);
            }
        }

        Ok(canvas)
    }

    fn render_framed_preview(
        &self,
        input: &RgbaImage,
        region: &FaceRegion,
        area_increase_factor: f64,
    ) -> Result<RgbaImage, FaceFilterError> {
        ensure_not_empty(input)?;
        let extent = raster::extent(input);
        let pixel_box = region.pixel_rect(extent);

        let pad = preview_pad_factor(
            region.overshoot,
            area_increase_factor,
            self.settings.area_increase_offset,
            self.settings.padding_epsilon,
        );
        let crop_rect = clamp_to_bounds(
            pixel_box.inset_by(-pixel_box.width * pad, -pixel_box.height * pad),
            Rect::from_size(extent),
        );
        let window = PixelWindow::snap(crop_rect, input.width(), input.height())
            .ok_or(FaceFilterError::EmptyRegion(region.bounding_box))?;

        let preview_input = raster::crop(input, window);
        if region.filter.is_none() {
            return Ok(preview_input);
        }

        // Face position inside the cropped frame
        let origin = window.to_rect(input.height());
        let local_box = pixel_box.translated(-origin.x, -origin.y);
        let adjusted = expand(local_box, region.overshoot);
        debug!(?window, ?adjusted, pad, "rendering preview");

        let mut output = preview_input.clone();
        self.paint_region(&preview_input, &mut output, adjusted, &region.filter)?;
        Ok(output)
    }

    /// Filter the part of `source` under `rect` and composite it onto `target`.
    fn paint_region(
        &self,
        source: &RgbaImage,
        target: &mut RgbaImage,
        rect: Rect,
        filter: &Filter,
    ) -> Result<(), FaceFilterError> {
        let Some(window) = PixelWindow::snap(rect, source.width(), source.height()) else {
            debug!(?rect, "region lies outside the image, skipping");
            return Ok(());
        };
        let patch = raster::crop(source, window);
        let filtered = self.catalog.apply(filter, &patch)?;
        raster::composite_over(target, &filtered, window);
        Ok(())
    }
}

fn ensure_not_empty(image: &RgbaImage) -> Result<(), FaceFilterError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(FaceFilterError::EmptyImage);
    }
    Ok(())
}

/// Largest overview canvas, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Column-major tiling of the overview grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    columns: u32,
    rows: u32,
    cell_width: u32,
}

impl GridLayout {
    /// Layout for `faces` tiles of `cell_width` pixels.
    ///
    /// Fails with `NoRegions` when there is nothing to lay out and with
    /// `InvalidSettings` when the canvas would not fit in
    /// [`MAX_CANVAS_PIXELS`].
    pub fn new(faces: usize, cell_width: u32) -> Result<Self, FaceFilterError> {
        if faces == 0 {
            return Err(FaceFilterError::NoRegions);
        }
        let too_large = || {
            FaceFilterError::InvalidSettings(format!(
                "overview of {faces} cells of {cell_width} px exceeds {MAX_CANVAS_PIXELS} pixels"
            ))
        };
        if cell_width == 0 {
            return Err(FaceFilterError::InvalidSettings(
                "cell_width must be > 0".to_string(),
            ));
        }
        let faces = u32::try_from(faces).map_err(|_| too_large())?;
        let columns = ((faces as f64).sqrt().floor() as u32).max(1);
        let rows = faces.div_ceil(columns);

        let canvas_w = columns.checked_mul(cell_width).ok_or_else(too_large)?;
        let canvas_h = rows.checked_mul(cell_width).ok_or_else(too_large)?;
        if canvas_w as u64 * canvas_h as u64 > MAX_CANVAS_PIXELS {
            return Err(too_large());
        }

        Ok(Self {
            columns,
            rows,
            cell_width,
        })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.columns * self.cell_width, self.rows * self.cell_width)
    }

    /// `(column, row)` of tile `index`, rows counted upward from the bottom.
    pub fn cell(&self, index: usize) -> (u32, u32) {
        let index = index as u32;
        let column = index / self.rows;
        let row = self.rows - 1 - index % self.rows;
        (column, row)
    }

    /// Raster window of tile `index` on the canvas.
    pub fn cell_window(&self, index: usize) -> Option<PixelWindow> {
        let (column, row) = self.cell(index);
        let cell = self.cell_width as f64;
        let (canvas_w, canvas_h) = self.canvas_size();
        PixelWindow::snap(
            Rect::new(column as f64 * cell, row as f64 * cell, cell, cell),
            canvas_w,
            canvas_h,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKind;

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

    fn region(x: f64, y: f64, w: f64, h: f64, filter: Filter) -> FaceRegion {
        FaceRegion::new(Rect::new(x, y, w, h), filter)
    }

    #[test]
    fn grid_for_thirteen_faces() {
        let layout = GridLayout::new(13, 200).unwrap();
        assert_eq!(layout.columns, 3);
        assert_eq!(layout.rows, 5);
        assert_eq!(layout.canvas_size(), (600, 1000));
    }

    #[test]
    fn grid_small_counts() {
        let one = GridLayout::new(1, 50).unwrap();
        assert_eq!((one.columns, one.rows), (1, 1));
        let three = GridLayout::new(3, 50).unwrap();
        assert_eq!((three.columns, three.rows), (1, 3));
        let four = GridLayout::new(4, 50).unwrap();
        assert_eq!((four.columns, four.rows), (2, 2));
        assert!(matches!(
            GridLayout::new(0, 50),
            Err(FaceFilterError::NoRegions)
        ));
    }

    #[test]
    fn grid_fills_columns_first() {
        let layout = GridLayout::new(13, 200).unwrap();
        assert_eq!(layout.cell(0), (0, 4));
        assert_eq!(layout.cell(4), (0, 0));
        assert_eq!(layout.cell(5), (1, 4));
        assert_eq!(layout.cell(12), (2, 2));

        // Row 4 counted from the bottom is the top raster row
        assert_eq!(
            layout.cell_window(0),
            Some(PixelWindow {
                x: 0,
                y: 0,
                width: 200,
                height: 200
            })
        );
        assert_eq!(
            layout.cell_window(12),
            Some(PixelWindow {
                x: 400,
                y: 400,
                width: 200,
                height: 200
            })
        );
    }

    #[test]
    fn oversized_grid_is_rejected() {
        assert!(matches!(
            GridLayout::new(4, u32::MAX),
            Err(FaceFilterError::InvalidSettings(_))
        ));
        assert!(matches!(
            GridLayout::new(1_000_000, 4096),
            Err(FaceFilterError::InvalidSettings(_))
        ));

        let settings = RenderSettings {
            cell_width: u32::MAX,
            ..RenderSettings::default()
        };
        assert!(matches!(
            Compositor::new(settings, Arc::new(BuiltinFilters)),
            Err(FaceFilterError::InvalidSettings(_))
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        let compositor = Compositor::default();
        let empty = RgbaImage::new(0, 10);
        assert!(matches!(
            compositor.render_result(&empty, &[]),
            Err(FaceFilterError::EmptyImage)
        ));

        let face = region(0.2, 0.2, 0.5, 0.5, FilterKind::Pixellate.default_filter());
        assert!(matches!(
            compositor.render_preview(&empty, &face),
            Err(FaceFilterError::EmptyImage)
        ));
        assert!(matches!(
            compositor.render_overview(&empty, &[face]),
            Err(FaceFilterError::EmptyImage)
        ));
    }

    #[test]
    fn region_outside_image_has_no_preview() {
        let compositor = Compositor::default();
        let img = make_gradient(100, 100);
        let outside = region(2.0, 2.0, 0.1, 0.1, Filter::None);
        assert!(matches!(
            compositor.render_preview(&img, &outside),
            Err(FaceFilterError::EmptyRegion(_))
        ));
    }

    #[test]
    fn overview_keeps_background_for_regions_outside_image() {
        let settings = RenderSettings {
            cell_width: 20,
            ..RenderSettings::default()
        };
        let compositor = Compositor::new(settings, Arc::new(BuiltinFilters)).unwrap();
        let img = make_gradient(100, 100);
        let regions = [
            region(0.2, 0.2, 0.3, 0.3, Filter::None),
            region(2.0, 2.0, 0.1, 0.1, Filter::None),
        ];
        let overview = compositor.render_overview(&img, &regions).unwrap();
        // One column, two rows; index 1 sits in the lower cell
        assert_eq!(overview.dimensions(), (20, 40));
        assert_eq!(*overview.get_pixel(10, 30), Rgba([0, 0, 0, 255]));
        assert_ne!(*overview.get_pixel(10, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn one_compositor_renders_from_many_threads() {
        let compositor = Compositor::default();
        let img = make_gradient(160, 120);
        let regions = [
            region(0.1, 0.1, 0.3, 0.4, FilterKind::GaussianBlur.with_parameter(3.0)),
            region(0.5, 0.4, 0.3, 0.4, FilterKind::HexagonalPixellate.with_parameter(6.0)),
        ];
        let expected = compositor.render_result(&img, &regions).unwrap();
        let expected_overview = compositor.render_overview(&img, &regions).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        (
                            compositor.render_result(&img, &regions).unwrap(),
                            compositor.render_overview(&img, &regions).unwrap(),
                        )
                    })
                })
                .collect();
            for handle in handles {
                let (result, overview) = handle.join().unwrap();
                assert_eq!(result, expected);
                assert_eq!(overview, expected_overview);
            }
        });
    }

    #[test]
    fn unfiltered_regions_leave_input_untouched() {
        let compositor = Compositor::default();
        let img = make_gradient(64, 48);
        let regions = [region(0.2, 0.2, 0.5, 0.5, Filter::None)];
        assert_eq!(compositor.render_result(&img, &regions).unwrap(), img);
    }

    #[test]
    fn preview_without_filter_is_padded_crop() {
        let compositor = Compositor::default();
        let img = make_gradient(1000, 1000);
        let face = region(0.4, 0.4, 0.2, 0.2, Filter::None);
        let preview = compositor.render_preview(&img, &face).unwrap();
        // pad factor 0.5 -> 100 px on every side of the 200 px box
        assert_eq!(preview.dimensions(), (400, 400));
        // Raster top of the crop is at 1000 - 700 = 300
        assert_eq!(preview.get_pixel(0, 0), img.get_pixel(300, 300));
    }

    #[test]
    fn preview_crop_is_clamped_at_image_edge() {
        let compositor = Compositor::default();
        let img = make_gradient(1000, 1000);
        // Touches the left and bottom edges
        let face = region(0.0, 0.0, 0.2, 0.2, Filter::None);
        let preview = compositor.render_preview(&img, &face).unwrap();
        assert_eq!(preview.dimensions(), (300, 300));
        assert_eq!(preview.get_pixel(0, 299), img.get_pixel(0, 999));
    }

    #[test]
    fn preview_filters_only_the_face() {
        let compositor = Compositor::default();
        let img = make_gradient(1000, 1000);
        let face = region(0.4, 0.4, 0.2, 0.2, FilterKind::Pixellate.with_parameter(50.0));
        let preview = compositor.render_preview(&img, &face).unwrap();
        assert_eq!(preview.dimensions(), (400, 400));

        // Padding ring is untouched
        assert_eq!(preview.get_pixel(50, 50), img.get_pixel(350, 350));
        assert_eq!(preview.get_pixel(399, 399), img.get_pixel(699, 699));
        // The face sits at 100..300 inside the preview and is a flat mosaic cell
        assert_eq!(preview.get_pixel(100, 100), preview.get_pixel(149, 149));
        assert_ne!(preview.get_pixel(149, 149), img.get_pixel(449, 449));
    }

    #[test]
    fn overview_tiles_have_cell_size() {
        let settings = RenderSettings {
            cell_width: 20,
            ..RenderSettings::default()
        };
        let compositor = Compositor::new(settings, Arc::new(BuiltinFilters)).unwrap();
        let img = make_gradient(300, 200);
        let regions: Vec<FaceRegion> = (0..5)
            .map(|i| region(0.1 + 0.15 * i as f64, 0.4, 0.1, 0.15, Filter::None))
            .collect();
        let overview = compositor.render_overview(&img, &regions).unwrap();
        // 5 faces -> 2 columns x 3 rows
        assert_eq!(overview.dimensions(), (40, 60));
        // 6th cell (column 1, bottom raster row) keeps the background
        assert_eq!(*overview.get_pixel(30, 50), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn overview_without_regions_is_an_error() {
        let compositor = Compositor::default();
        let img = make_gradient(10, 10);
        assert!(matches!(
            compositor.render_overview(&img, &[]),
            Err(FaceFilterError::NoRegions)
        ));
    }

    struct EmptyCatalog;

    impl FilterCatalog for EmptyCatalog {
        fn apply(&self, filter: &Filter, _image: &RgbaImage) -> Result<RgbaImage, FaceFilterError> {
            Err(FaceFilterError::FilterUnavailable(filter.name().to_string()))
        }
    }

    #[test]
    fn unavailable_filter_is_surfaced() {
        let compositor = Compositor::new(RenderSettings::default(), Arc::new(EmptyCatalog)).unwrap();
        let img = make_gradient(50, 50);
        let regions = [region(0.1, 0.1, 0.5, 0.5, FilterKind::GaussianBlur.default_filter())];
        let err = compositor.render_result(&img, &regions).unwrap_err();
        assert!(matches!(err, FaceFilterError::FilterUnavailable(name) if name == "gaussian-blur"));
    }
}
