//! Rectangle geometry from four marker corner quadruples.
//!
//! One marker sits near each corner of the measured rectangle, inset from
//! the true edge by a known physical offset. Each rectangle corner is
//! recovered by pushing the marker's outermost corner further outward along
//! the marker diagonal, then pixel-to-millimetre scale is read off the
//! markers' own edge lengths.

use fiducial_rect_core::{homography_from_4pt, MarkerCorners, Point2D, UNIT_SQUARE};
use nalgebra::{distance, Point2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Corner of the measured rectangle, in output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectCorner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl RectCorner {
    pub const ALL: [RectCorner; 4] = [
        RectCorner::TopLeft,
        RectCorner::TopRight,
        RectCorner::BottomRight,
        RectCorner::BottomLeft,
    ];

    /// Position of this corner in `ComputeResult::points`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Which marker corner feeds a rectangle corner, and the direction it is
/// pushed along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CornerRole {
    pub corner: RectCorner,
    /// Index into the four-marker input.
    pub slot: usize,
    /// Marker-local corner that sits closest to the rectangle corner.
    pub anchor: usize,
    /// Diagonally opposite marker-local corner; extrapolation runs away from it.
    pub opposite: usize,
}

/// Marker slot `k` contributes its local corner `k`, pushed away from corner `k + 2`.
pub const CORNER_ROLES: [CornerRole; 4] = [
    CornerRole {
        corner: RectCorner::TopLeft,
        slot: 0,
        anchor: 0,
        opposite: 2,
    },
    CornerRole {
        corner: RectCorner::TopRight,
        slot: 1,
        anchor: 1,
        opposite: 3,
    },
    CornerRole {
        corner: RectCorner::BottomRight,
        slot: 2,
        anchor: 2,
        opposite: 0,
    },
    CornerRole {
        corner: RectCorner::BottomLeft,
        slot: 3,
        anchor: 3,
        opposite: 1,
    },
];

/// How the marker-to-edge offset is projected into the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OffsetModel {
    /// Straight-line extrapolation along the image-space marker diagonal.
    #[default]
    Linear,
    /// Extrapolation in the marker's own plane, mapped back through the
    /// marker's homography. Accounts for foreshortening along the diagonal.
    Projective,
}

/// Physical constants and numeric guards for one measurement setup.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureParams {
    /// Printed marker edge length.
    pub marker_size_mm: f64,
    /// Distance from a marker's outer edge to the rectangle edge.
    pub offset_mm: f64,
    pub offset_model: OffsetModel,
    /// Shortest edge, in pixels, accepted as non-degenerate.
    pub min_edge_px: f64,
}

impl Default for MeasureParams {
    fn default() -> Self {
        Self {
            marker_size_mm: 40.0,
            offset_mm: 10.0,
            offset_model: OffsetModel::Linear,
            min_edge_px: 1e-6,
        }
    }
}

impl MeasureParams {
    pub fn new(marker_size_mm: f64, offset_mm: f64) -> Self {
        Self {
            marker_size_mm,
            offset_mm,
            ..Self::default()
        }
    }

    pub fn with_offset_model(mut self, offset_model: OffsetModel) -> Self {
        self.offset_model = offset_model;
        self
    }

    pub fn validate(&self) -> Result<(), MeasureError> {
        if !self.marker_size_mm.is_finite() || self.marker_size_mm <= 0.0 {
            return Err(MeasureError::InvalidMarkerSize(self.marker_size_mm));
        }
        if !self.offset_mm.is_finite() || self.offset_mm < 0.0 {
            return Err(MeasureError::InvalidOffset(self.offset_mm));
        }
        if !self.min_edge_px.is_finite() || self.min_edge_px < 0.0 {
            return Err(MeasureError::InvalidMinEdge(self.min_edge_px));
        }
        Ok(())
    }

    /// Offset expressed in marker edge lengths.
    #[inline]
    pub fn offset_scale(&self) -> f64 {
        self.offset_mm / self.marker_size_mm
    }
}

/// Input geometry the engine cannot measure.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Degeneracy {
    #[error("marker {slot} has a non-finite corner coordinate")]
    NonFiniteCorner { slot: usize },
    #[error("{edge} is {length_px:.3e} px long")]
    ShortEdge { edge: &'static str, length_px: f64 },
    #[error("{edge} length overflows f64")]
    NonFiniteEdge { edge: &'static str },
    #[error("marker {slot} corners do not span a plane")]
    CollapsedMarker { slot: usize },
}

/// Errors produced by the geometry engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("marker_size_mm must be finite and > 0 (got {0})")]
    InvalidMarkerSize(f64),
    #[error("offset_mm must be finite and >= 0 (got {0})")]
    InvalidOffset(f64),
    #[error("min_edge_px must be finite and >= 0 (got {0})")]
    InvalidMinEdge(f64),
    #[error("degenerate marker geometry: {0}")]
    DegenerateGeometry(#[from] Degeneracy),
}

impl MeasureError {
    /// `true` for errors caused by the parameters rather than the markers.
    pub fn is_config(&self) -> bool {
        !matches!(self, MeasureError::DegenerateGeometry(_))
    }
}

/// Corrected rectangle corners plus physical and output-pixel size.
///
/// Serializes to the wire shape
/// `{"points": [[x, y]; 4], "mm_width", "mm_height", "width", "height"}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComputeResult {
    /// Top-left, top-right, bottom-right, bottom-left.
    pub points: [Point2D; 4],
    pub mm_width: f64,
    pub mm_height: f64,
    /// Recommended width of the rectified output, in pixels.
    pub width: u32,
    /// Recommended height of the rectified output, in pixels.
    pub height: u32,
}

impl ComputeResult {
    #[inline]
    pub fn corner(&self, corner: RectCorner) -> Point2D {
        self.points[corner.index()]
    }

    /// Output width over output height; `None` when the height truncated to zero.
    #[inline]
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.height > 0).then(|| self.width as f64 / self.height as f64)
    }
}

/// Measure the rectangle framed by `markers` using the linear offset model.
///
/// `markers[k]` must be the marker sitting at rectangle corner `k`
/// (TL, TR, BR, BL), with its own corners in TL, TR, BR, BL order.
pub fn compute(
    markers: &[MarkerCorners; 4],
    marker_size_mm: f64,
    offset_mm: f64,
) -> Result<ComputeResult, MeasureError> {
    compute_with(markers, &MeasureParams::new(marker_size_mm, offset_mm))
}

/// Measure the rectangle framed by `markers` with explicit parameters.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(markers))
)]
pub fn compute_with(
    markers: &[MarkerCorners; 4],
    params: &MeasureParams,
) -> Result<ComputeResult, MeasureError> {
    params.validate()?;
    if let Some(slot) = markers.iter().position(|m| !m.is_finite()) {
        return Err(Degeneracy::NonFiniteCorner { slot }.into());
    }

    let offset_scale = params.offset_scale();
    let mut points = [Point2::origin(); 4];
    for role in CORNER_ROLES {
        points[role.corner.index()] =
            extrapolate_corner(&markers[role.slot], role, offset_scale, params.offset_model)?;
    }
    let [top_left, top_right, bottom_right, bottom_left] = points;

    let guard = |edge: &'static str, length_px: f64| {
        if !length_px.is_finite() {
            Err(Degeneracy::NonFiniteEdge { edge })
        } else if length_px >= params.min_edge_px && length_px > 0.0 {
            Ok(length_px)
        } else {
            Err(Degeneracy::ShortEdge { edge, length_px })
        }
    };

    let px_width_top = guard("rectangle top edge", distance(&top_left, &top_right))?;
    let px_width_bottom = guard("rectangle bottom edge", distance(&bottom_left, &bottom_right))?;
    let px_height_left = guard("rectangle left edge", distance(&top_left, &bottom_left))?;
    let px_height_right = guard("rectangle right edge", distance(&top_right, &bottom_right))?;

    let marker_px_width = (guard("marker 0 top edge", markers[0].edge_length(0, 1))?
        + guard("marker 1 top edge", markers[1].edge_length(0, 1))?)
        / 2.0;
    let marker_px_height = (guard("marker 0 left edge", markers[0].edge_length(0, 3))?
        + guard("marker 3 left edge", markers[3].edge_length(0, 3))?)
        / 2.0;

    let mm_width = px_width_top / marker_px_width * params.marker_size_mm;
    let mm_height = px_height_left / marker_px_height * params.marker_size_mm;

    // Largest of the four edge estimates, heights converted to width units.
    let ratio = mm_width / mm_height;
    let width = px_width_top
        .max(px_width_bottom)
        .max(px_height_left.max(px_height_right) * ratio);
    let height = width / ratio;

    log::trace!(
        "measured {mm_width:.2} x {mm_height:.2} mm, output {width:.1} x {height:.1} px"
    );

    Ok(ComputeResult {
        points,
        mm_width,
        mm_height,
        width: width as u32,
        height: height as u32,
    })
}

fn extrapolate_corner(
    marker: &MarkerCorners,
    role: CornerRole,
    offset_scale: f64,
    model: OffsetModel,
) -> Result<Point2D, Degeneracy> {
    match model {
        OffsetModel::Linear => {
            let anchor = marker[role.anchor];
            Ok(anchor - (marker[role.opposite] - anchor) * offset_scale)
        }
        OffsetModel::Projective => {
            let collapsed = Degeneracy::CollapsedMarker { slot: role.slot };
            let h = homography_from_4pt(&UNIT_SQUARE, marker.points()).ok_or(collapsed.clone())?;
            let anchor = UNIT_SQUARE[role.anchor];
            let local = anchor - (UNIT_SQUARE[role.opposite] - anchor) * offset_scale;
            h.apply(local).ok_or(collapsed)
        }
    }
}
