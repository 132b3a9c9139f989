use std::path::Path;

use crate::error::FaceFilterError;
use crate::face_detector::{FaceBounds, FaceDetector};

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The SeetaFace frontal model (`seeta_fd_frontal_v1.0.bin`) is not bundled;
/// load it from bytes or from a file.
pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
    score_thresh: f64,
}

impl RustfaceDetector {
    /// Create a detector from the raw model bytes.
    pub fn from_model_bytes(model_data: &[u8]) -> Result<Self, FaceFilterError> {
        let model = rustface::read_model(std::io::Cursor::new(model_data))
            .map_err(|e| FaceFilterError::Model(e.to_string()))?;
        Ok(Self {
            model,
            min_face_size: 20,
            score_thresh: 2.0,
        })
    }

    /// Create a detector from a model file on disk.
    pub fn from_model_path(path: impl AsRef<Path>) -> Result<Self, FaceFilterError> {
        let data = std::fs::read(path.as_ref()).map_err(|e| {
            FaceFilterError::Model(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_model_bytes(&data)
    }

    /// Smallest face side in pixels the detector looks for (default: 20).
    pub fn min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }

    /// Minimum detection score (default: 2.0).
    pub fn score_thresh(mut self, thresh: f64) -> Self {
        self.score_thresh = thresh;
        self
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(self.score_thresh);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray, width, height));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    x: bbox.x() as f64,
                    y: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: face.score(),
                }
            })
            .collect()
    }
}
