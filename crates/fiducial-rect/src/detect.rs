//! Per-frame pipeline: detect markers once, then measure every target.
//!
//! Marker detection is delegated to a [`MarkerDetector`]; the detector value
//! owns its dictionary and thresholds, so several differently configured
//! detectors can coexist in one process.

use fiducial_rect_core::{DetectedMarkerSet, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::resolve::{RectMeasurer, ResultSet, TargetSpec};

/// Maps a grayscale frame to the fiducial markers visible in it.
pub trait MarkerDetector {
    fn detect(&self, image: &GrayImageView<'_>) -> DetectedMarkerSet;
}

impl<F> MarkerDetector for F
where
    F: Fn(&GrayImageView<'_>) -> DetectedMarkerSet,
{
    fn detect(&self, image: &GrayImageView<'_>) -> DetectedMarkerSet {
        self(image)
    }
}

/// Detector returning a fixed detection set, e.g. one loaded from JSON.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedDetections(pub DetectedMarkerSet);

impl MarkerDetector for PrecomputedDetections {
    fn detect(&self, _image: &GrayImageView<'_>) -> DetectedMarkerSet {
        self.0.clone()
    }
}

/// Run `detector` on `image` and resolve `targets` against its output.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(detector, image, targets, measurer),
        fields(width = image.width, height = image.height, targets = targets.len())
    )
)]
pub fn analyse_image<D: MarkerDetector + ?Sized>(
    detector: &D,
    image: &GrayImageView<'_>,
    targets: &[TargetSpec],
    measurer: &RectMeasurer,
) -> ResultSet {
    let detected = detector.detect(image);
    log::debug!("detected markers: {:?}", detected.ids());
    measurer.resolve(&detected, targets)
}

/// Convert an `image::GrayImage` into the borrowed view type.
#[cfg(feature = "image")]
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// [`analyse_image`] for an `image::GrayImage`.
#[cfg(feature = "image")]
pub fn analyse_gray_image<D: MarkerDetector + ?Sized>(
    detector: &D,
    img: &::image::GrayImage,
    targets: &[TargetSpec],
    measurer: &RectMeasurer,
) -> ResultSet {
    analyse_image(detector, &gray_view(img), targets, measurer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use fiducial_rect_core::MarkerCorners;
    use std::cell::Cell;

    fn board() -> DetectedMarkerSet {
        [
            (10, MarkerCorners::axis_aligned(5.0, 5.0, 20.0)),
            (20, MarkerCorners::axis_aligned(75.0, 5.0, 20.0)),
            (30, MarkerCorners::axis_aligned(75.0, 75.0, 20.0)),
            (40, MarkerCorners::axis_aligned(5.0, 75.0, 20.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn closure_detector_runs_once_per_frame() {
        let calls = Cell::new(0);
        let detector = |_img: &GrayImageView<'_>| {
            calls.set(calls.get() + 1);
            board()
        };
        let pixels = [0u8; 16];
        let image = GrayImageView::new(4, 4, &pixels).expect("view");
        let targets = [
            TargetSpec([10, 20, 30, 40]),
            TargetSpec([40, 30, 20, 11]),
        ];

        let results = analyse_image(&detector, &image, &targets, &RectMeasurer::default());
        assert_eq!(calls.get(), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[&0], resolve(&board(), &targets[..1])[&0]);
    }

    #[test]
    fn precomputed_detections_work_as_trait_object() {
        let detector: Box<dyn MarkerDetector> = Box::new(PrecomputedDetections(board()));
        let pixels = [0u8; 1];
        let image = GrayImageView::new(1, 1, &pixels).expect("view");

        let results = analyse_image(
            detector.as_ref(),
            &image,
            &[TargetSpec([10, 20, 30, 40])],
            &RectMeasurer::default(),
        );
        assert_eq!(results[&0].width, 100);
    }

    #[cfg(feature = "image")]
    #[test]
    fn gray_image_adapter_passes_dimensions() {
        let img = ::image::GrayImage::new(64, 48);
        let detector = |view: &GrayImageView<'_>| {
            assert_eq!((view.width, view.height), (64, 48));
            board()
        };
        let results = analyse_gray_image(
            &detector,
            &img,
            &[TargetSpec([10, 20, 30, 40])],
            &RectMeasurer::default(),
        );
        assert_eq!(results.len(), 1);
    }
}
