//! Marker identifiers, corner quadruples and per-frame detection sets.

use std::collections::HashMap;
use std::ops::Index;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A pixel position in image coordinates.
pub type Point2D = Point2<f64>;

/// Identifier decoded from a fiducial marker.
pub type MarkerId = u32;

/// The four image-space corners of one detected marker.
///
/// Corners are stored in the marker's own local order: top-left, top-right,
/// bottom-right, bottom-left. Serializes as `[[x, y]; 4]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerCorners(pub [Point2D; 4]);

impl MarkerCorners {
    pub fn new(corners: [Point2D; 4]) -> Self {
        Self(corners)
    }

    /// Build from plain `[x, y]` pairs.
    pub fn from_array(corners: [[f64; 2]; 4]) -> Self {
        Self(corners.map(|[x, y]| Point2::new(x, y)))
    }

    /// Axis-aligned square with top-left corner at `(x, y)`.
    pub fn axis_aligned(x: f64, y: f64, side: f64) -> Self {
        Self::from_array([[x, y], [x + side, y], [x + side, y + side], [x, y + side]])
    }

    #[inline]
    pub fn points(&self) -> &[Point2D; 4] {
        &self.0
    }

    /// Euclidean pixel distance between two of this marker's corners.
    #[inline]
    pub fn edge_length(&self, from: usize, to: usize) -> f64 {
        nalgebra::distance(&self.0[from], &self.0[to])
    }

    /// Return a copy with every coordinate multiplied by `k`.
    pub fn scaled(&self, k: f64) -> Self {
        Self(self.0.map(|p| Point2::new(p.x * k, p.y * k)))
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

impl Index<usize> for MarkerCorners {
    type Output = Point2D;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// One detector output record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: MarkerId,
    pub corners: MarkerCorners,
}

/// Markers detected in a single frame, keyed by identifier.
///
/// Built once per frame and treated as read-only afterwards. When the same
/// identifier is inserted twice, the later corners win.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectedMarkerSet {
    markers: HashMap<MarkerId, MarkerCorners>,
}

impl DetectedMarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: MarkerId, corners: MarkerCorners) -> Option<MarkerCorners> {
        self.markers.insert(id, corners)
    }

    #[inline]
    pub fn get(&self, id: MarkerId) -> Option<&MarkerCorners> {
        self.markers.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: MarkerId) -> bool {
        self.markers.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Detected identifiers in ascending order.
    pub fn ids(&self) -> Vec<MarkerId> {
        let mut ids: Vec<MarkerId> = self.markers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = DetectedMarker> + '_ {
        self.markers
            .iter()
            .map(|(&id, &corners)| DetectedMarker { id, corners })
    }

    /// Flatten into detector records sorted by identifier.
    pub fn to_vec(&self) -> Vec<DetectedMarker> {
        let mut out: Vec<DetectedMarker> = self.iter().collect();
        out.sort_unstable_by_key(|m| m.id);
        out
    }
}

impl FromIterator<(MarkerId, MarkerCorners)> for DetectedMarkerSet {
    fn from_iter<T: IntoIterator<Item = (MarkerId, MarkerCorners)>>(iter: T) -> Self {
        Self {
            markers: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<DetectedMarker> for DetectedMarkerSet {
    fn from_iter<T: IntoIterator<Item = DetectedMarker>>(iter: T) -> Self {
        iter.into_iter().map(|m| (m.id, m.corners)).collect()
    }
}

impl Serialize for DetectedMarkerSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DetectedMarkerSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<DetectedMarker>::deserialize(deserializer)?;
        Ok(records.into_iter().collect())
    }
}
