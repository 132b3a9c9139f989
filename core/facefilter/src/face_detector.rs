use crate::geometry::Rect;

/// Bounding box of a detected face within an image.
#[derive(Debug, Clone)]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score.
    pub confidence: f64,
}

impl FaceBounds {
    /// Normalize to the unit square with a bottom-left origin, the way face
    /// regions store their boxes.
    pub fn to_unit_rect(&self, image_width: u32, image_height: u32) -> Rect {
        let (w, h) = (image_width as f64, image_height as f64);
        Rect::new(
            self.x / w,
            (h - self.y - self.height) / h,
            self.width / w,
            self.height / h,
        )
    }
}

/// Pluggable face detection backend.
///
/// Implement this trait to provide a custom face detector (ONNX, dlib, etc.)
/// and pass it to [`crate::FaceSession::face_detector`]. Results must come
/// back in a stable order for one call.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    fn detect(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds>;
}
