//! Measure a rectangle framed by four fiducial markers.
//!
//! Given the image-space corners of four markers placed near the corners of
//! a physical rectangle, this crate computes:
//! - the rectangle's true corners, compensating for the inset between each
//!   marker and the rectangle edge,
//! - its width and height in millimetres,
//! - a pixel size for a perspective-corrected output that preserves the
//!   physical aspect ratio.
//!
//! Marker detection itself is out of scope; plug any detector in through
//! [`MarkerDetector`].
//!
//! ## Quickstart
//!
//! ```
//! use fiducial_rect::{resolve, DetectedMarkerSet, MarkerCorners, TargetSpec};
//!
//! let detected: DetectedMarkerSet = [
//!     (1, MarkerCorners::axis_aligned(5.0, 5.0, 20.0)),
//!     (2, MarkerCorners::axis_aligned(275.0, 5.0, 20.0)),
//!     (3, MarkerCorners::axis_aligned(275.0, 175.0, 20.0)),
//!     (4, MarkerCorners::axis_aligned(5.0, 175.0, 20.0)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let results = resolve(&detected, &[TargetSpec([1, 2, 3, 4])]);
//! let board = &results[&0];
//! assert_eq!((board.width, board.height), (300, 200));
//! assert!((board.mm_width - 600.0).abs() < 1e-9);
//! ```
//!
//! ## API map
//! - [`compute`] / [`compute_with`]: geometry for one set of four markers.
//! - [`resolve`] / [`RectMeasurer`]: many targets against one frame.
//! - [`analyse_image`]: detector + resolution for one frame.
//! - [`io`]: JSON configs, detection files, reports and the response shape.

pub mod detect;
mod engine;
pub mod io;
mod resolve;

pub use engine::{
    compute, compute_with, ComputeResult, CornerRole, Degeneracy, MeasureError, MeasureParams,
    OffsetModel, RectCorner, CORNER_ROLES,
};
pub use resolve::{resolve, RectMeasurer, ResolveReport, ResultSet, TargetOutcome, TargetSpec};

pub use detect::{analyse_image, MarkerDetector, PrecomputedDetections};

pub use fiducial_rect_core as core;
pub use fiducial_rect_core::{
    DetectedMarker, DetectedMarkerSet, GrayImageView, MarkerCorners, MarkerId, Point2D,
};
