use thiserror::Error;

use crate::geometry::Rect;

#[derive(Debug, Error)]
pub enum FaceFilterError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("image dimensions are zero")]
    EmptyImage,

    #[error("no such region: index {index}, session has {len}")]
    NoSuchRegion { index: usize, len: usize },

    #[error("session has no face regions")]
    NoRegions,

    #[error("invalid face box {x}, {y}, {width}x{height}: sides must be finite and > 0")]
    InvalidBox {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    #[error("region {0:?} does not cover any pixel of the image")]
    EmptyRegion(Rect),

    #[error("point ({x}, {y}) is outside the unit square")]
    PointOutOfBounds { x: f64, y: f64 },

    #[error("overshoot must be finite and >= 0, got {0}")]
    InvalidOvershoot(f64),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("filter not available in catalog: {0}")]
    FilterUnavailable(String),

    #[error("invalid render settings: {0}")]
    InvalidSettings(String),

    #[error("no face detector configured")]
    NoDetector,

    #[error("failed to load face detection model: {0}")]
    Model(String),

    #[error("render worker has stopped")]
    WorkerStopped,
}
