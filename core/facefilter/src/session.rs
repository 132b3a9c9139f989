use std::collections::HashMap;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use tracing::{debug, info};

use crate::compositor::Compositor;
use crate::config::RenderSettings;
use crate::error::FaceFilterError;
use crate::face_detector::FaceDetector;
use crate::filter::{Filter, FilterCatalog, FilterKind};
use crate::geometry::{Point, Rect};
use crate::raster;
use crate::region::{
    check_box, check_index, check_overshoot, manual_region_box, suggested_parameter, FaceRegion,
    RegionTarget,
};

/// One photo being edited: the source image, its face regions and a cache
/// of rendered previews.
///
/// A session is not synchronized. Keep it on one thread, or hand it to a
/// [`crate::RenderWorker`] and talk to it through commands.
pub struct FaceSession {
    input: RgbaImage,
    regions: Vec<FaceRegion>,
    previews: HashMap<usize, RgbaImage>,
    compositor: Compositor,
    detector: Option<Box<dyn FaceDetector>>,
    default_filter: Filter,
}

impl FaceSession {
    /// Start a session on a decoded image.
    pub fn new(image: DynamicImage) -> Result<Self, FaceFilterError> {
        Ok(Self {
            input: flatten(image)?,
            regions: Vec::new(),
            previews: HashMap::new(),
            compositor: Compositor::default(),
            detector: None,
            default_filter: FilterKind::Pixellate.default_filter(),
        })
    }

    /// Start a session from encoded image bytes (JPEG, PNG, or WebP).
    pub fn from_bytes(input: &[u8]) -> Result<Self, FaceFilterError> {
        let image =
            image::load_from_memory(input).map_err(|e| FaceFilterError::Decode(e.to_string()))?;
        Self::new(image)
    }

    /// Replace the render settings (default: [`RenderSettings::default`]).
    pub fn settings(mut self, settings: RenderSettings) -> Result<Self, FaceFilterError> {
        self.compositor = Compositor::new(settings, self.compositor.catalog())?;
        self.previews.clear();
        Ok(self)
    }

    /// Provide another filter implementation (default: [`crate::BuiltinFilters`]).
    pub fn filter_catalog(mut self, catalog: Arc<dyn FilterCatalog>) -> Self {
        self.compositor = self.compositor.with_catalog(catalog);
        self.previews.clear();
        self
    }

    /// Provide the detector used by [`FaceSession::detect_faces`].
    pub fn face_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Filter given to detected and manually added regions
    /// (default: pixellate at its default scale).
    pub fn default_filter(mut self, filter: Filter) -> Self {
        self.default_filter = filter;
        self
    }

    /// Swap in a new source image. All regions and cached previews are dropped.
    pub fn reset(&mut self, image: DynamicImage) -> Result<(), FaceFilterError> {
        self.input = flatten(image)?;
        self.regions.clear();
        self.previews.clear();
        info!(
            width = self.input.width(),
            height = self.input.height(),
            "session reset"
        );
        Ok(())
    }

    /// Run the configured detector and add one region per face found.
    pub fn detect_faces(&mut self) -> Result<usize, FaceFilterError> {
        let detector = self.detector.as_ref().ok_or(FaceFilterError::NoDetector)?;
        let (width, height) = self.input.dimensions();
        let gray = image::imageops::grayscale(&self.input);

        let boxes: Vec<Rect> = detector
            .detect(gray.as_raw(), width, height)
            .iter()
            .map(|face| face.to_unit_rect(width, height))
            .filter(|rect| check_box(*rect).is_ok())
            .collect();

        info!(faces = boxes.len(), "face detection finished");
        self.add_detected(boxes)
    }

    /// Add regions for boxes found by an external detector. Boxes are
    /// normalized unit-square rectangles with a bottom-left origin.
    ///
    /// Either every box is added or, when one has a non-finite coordinate
    /// or a side that is not positive, none is.
    pub fn add_detected(
        &mut self,
        boxes: impl IntoIterator<Item = Rect>,
    ) -> Result<usize, FaceFilterError> {
        let boxes: Vec<Rect> = boxes.into_iter().collect();
        for rect in &boxes {
            check_box(*rect)?;
        }
        let filter = self.default_filter;
        self.regions
            .extend(boxes.iter().map(|rect| FaceRegion::new(*rect, filter)));
        Ok(boxes.len())
    }

    /// Add a region centered on `point` (normalized coordinates) and return
    /// its index.
    pub fn add_region(&mut self, point: Point) -> Result<usize, FaceFilterError> {
        let rect = manual_region_box(point, &self.regions, raster::extent(&self.input))?;
        self.regions.push(FaceRegion::new(rect, self.default_filter));
        debug!(?rect, index = self.regions.len() - 1, "region added");
        Ok(self.regions.len() - 1)
    }

    /// Assign `filter` to one or all regions. [`Filter::None`] clears it.
    pub fn set_filter(&mut self, target: RegionTarget, filter: Filter) -> Result<(), FaceFilterError> {
        for region in self.targets(target)? {
            region.filter = filter;
        }
        Ok(())
    }

    pub fn set_overshoot(&mut self, target: RegionTarget, overshoot: f64) -> Result<(), FaceFilterError> {
        check_overshoot(overshoot)?;
        for region in self.targets(target)? {
            region.overshoot = overshoot;
        }
        Ok(())
    }

    /// Give every region the same filter and overshoot, keeping their boxes.
    pub fn apply_to_all(&mut self, filter: Filter, overshoot: f64) -> Result<(), FaceFilterError> {
        check_overshoot(overshoot)?;
        for region in &mut self.regions {
            region.filter = filter;
            region.overshoot = overshoot;
        }
        Ok(())
    }

    fn targets(
        &mut self,
        target: RegionTarget,
    ) -> Result<&mut [FaceRegion], FaceFilterError> {
        match target {
            RegionTarget::All => Ok(self.regions.as_mut_slice()),
            RegionTarget::Index(index) => {
                check_index(index, self.regions.len())?;
                Ok(&mut self.regions[index..=index])
            }
        }
    }

    pub fn region(&self, index: usize) -> Result<&FaceRegion, FaceFilterError> {
        check_index(index, self.regions.len())?;
        Ok(&self.regions[index])
    }

    pub fn regions(&self) -> &[FaceRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The source image as RGBA.
    pub fn image(&self) -> &RgbaImage {
        &self.input
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Filter of `kind` with a strength matched to the largest face, or the
    /// kind's default when there are no regions yet.
    pub fn suggested_filter(&self, kind: FilterKind) -> Filter {
        match suggested_parameter(kind, &self.regions, raster::extent(&self.input)) {
            Some(value) => kind.with_parameter(value),
            None => kind.default_filter(),
        }
    }

    pub fn render_result(&self) -> Result<RgbaImage, FaceFilterError> {
        self.compositor.render_result(&self.input, &self.regions)
    }

    /// Preview of region `index`, served from the cache when one is there.
    ///
    /// The cache is not invalidated by mutations; call
    /// [`FaceSession::invalidate_preview`] after changing a region.
    pub fn render_preview(&mut self, index: usize) -> Result<RgbaImage, FaceFilterError> {
        check_index(index, self.regions.len())?;
        if let Some(cached) = self.previews.get(&index) {
            debug!(index, "preview cache hit");
            return Ok(cached.clone());
        }
        let preview = self
            .compositor
            .render_preview(&self.input, &self.regions[index])?;
        self.previews.insert(index, preview.clone());
        Ok(preview)
    }

    pub fn render_overview(&self) -> Result<RgbaImage, FaceFilterError> {
        self.compositor.render_overview(&self.input, &self.regions)
    }

    pub fn invalidate_preview(&mut self, index: usize) {
        self.previews.remove(&index);
    }

    pub fn invalidate_previews(&mut self) {
        self.previews.clear();
    }

    /// True when a preview for `index` is cached.
    pub fn has_cached_preview(&self, index: usize) -> bool {
        self.previews.contains_key(&index)
    }
}

fn flatten(image: DynamicImage) -> Result<RgbaImage, FaceFilterError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(FaceFilterError::EmptyImage);
    }
    Ok(image.into_rgba8())
}
