//! Core types for measuring a rectangle framed by four fiducial markers.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete marker detector or image decoding library; the
//! measurement engine itself lives in `fiducial-rect`.

mod homography;
mod image;
mod logger;
mod marker;

pub use homography::{homography_from_4pt, Homography, UNIT_SQUARE};
pub use image::{GrayImageView, ImageError};
pub use marker::{DetectedMarker, DetectedMarkerSet, MarkerCorners, MarkerId, Point2D};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
