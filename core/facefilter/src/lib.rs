//! Face-region compositing: obscure faces in a photo with per-face filters.
//!
//! Faces are kept as [`FaceRegion`]s (a normalized box, an overshoot and a
//! [`Filter`]). The [`Compositor`] turns an image plus its regions into the
//! final composited result, a padded preview of any single face, or an
//! overview grid of all faces. [`FaceSession`] owns one image and its
//! regions, and [`RenderWorker`] runs a session on a background thread.
//!
//! Geometry uses a bottom-left origin throughout; boxes are in the unit
//! square.
//!
//! # Example
//!
//! ```no_run
//! use facefilter::{FaceSession, FilterKind, Point, RegionTarget};
//!
//! let raw_bytes = std::fs::read("photo.jpg").unwrap();
//! let mut session = FaceSession::from_bytes(&raw_bytes).unwrap();
//! session.add_region(Point::new(0.5, 0.6)).unwrap();
//! session
//!     .set_filter(RegionTarget::All, FilterKind::GaussianBlur.default_filter())
//!     .unwrap();
//! let result = session.render_result().unwrap();
//! result.save("blurred.png").unwrap();
//! ```

mod compositor;
mod config;
mod error;
/// Face detection traits and data types.
pub mod face_detector;
mod filter;
/// Rectangle math in normalized and pixel coordinates.
pub mod geometry;
mod queue;
mod raster;
mod region;
#[cfg(feature = "rustface")]
/// Built-in SeetaFace-based face detector backend.
pub mod rustface_backend;
mod session;
mod worker;

pub use compositor::{Compositor, GridLayout};
pub use config::{RenderSettings, TileResize};
/// Error type returned by facefilter operations.
pub use error::FaceFilterError;
/// Face detection trait and face bounding-box type.
pub use face_detector::{FaceBounds, FaceDetector};
pub use filter::{BuiltinFilters, Filter, FilterCatalog, FilterKind};
pub use geometry::{Point, Rect, Size};
pub use queue::{RenderKey, RenderQueue};
pub use region::{check_box, manual_region_box, suggested_parameter, FaceRegion, RegionTarget};
#[cfg(feature = "rustface")]
/// Detector that runs a SeetaFace model.
pub use rustface_backend::RustfaceDetector;
pub use session::FaceSession;
pub use worker::{RenderWorker, SessionCommand, WorkerEvent};
