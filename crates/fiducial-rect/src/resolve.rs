//! Matching target marker quadruples against one frame's detections.

use std::collections::BTreeMap;

use fiducial_rect_core::{DetectedMarkerSet, MarkerCorners, MarkerId};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::engine::{compute_with, ComputeResult, MeasureError, MeasureParams};

/// Four marker identifiers framing one rectangle, in TL, TR, BR, BL order.
///
/// Serializes as a plain `[id, id, id, id]` array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSpec(pub [MarkerId; 4]);

impl TargetSpec {
    pub fn new(ids: [MarkerId; 4]) -> Self {
        Self(ids)
    }

    #[inline]
    pub fn ids(&self) -> [MarkerId; 4] {
        self.0
    }

    /// Identifiers of this target that are absent from `detected`.
    pub fn missing(&self, detected: &DetectedMarkerSet) -> Vec<MarkerId> {
        self.0
            .iter()
            .copied()
            .filter(|&id| !detected.contains(id))
            .collect()
    }

    /// Look up the four markers in declaration order, or `None` if any is absent.
    pub fn gather(&self, detected: &DetectedMarkerSet) -> Option<[MarkerCorners; 4]> {
        let [a, b, c, d] = self.0;
        Some([
            *detected.get(a)?,
            *detected.get(b)?,
            *detected.get(c)?,
            *detected.get(d)?,
        ])
    }
}

impl From<[MarkerId; 4]> for TargetSpec {
    fn from(ids: [MarkerId; 4]) -> Self {
        Self(ids)
    }
}

/// Measurements keyed by index into the target list.
///
/// A missing key means the target could not be measured in this frame.
pub type ResultSet = BTreeMap<usize, ComputeResult>;

/// What happened to one target during resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetOutcome {
    Resolved,
    MissingMarkers { missing: Vec<MarkerId> },
    Degenerate { reason: String },
}

/// Results plus a per-target outcome, aligned with the input target list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveReport {
    pub results: ResultSet,
    pub outcomes: Vec<TargetOutcome>,
}

impl ResolveReport {
    /// Number of targets that produced a measurement.
    pub fn resolved(&self) -> usize {
        self.results.len()
    }
}

/// Validated measurement setup applied to every target of a frame.
#[derive(Clone, Debug, Default)]
pub struct RectMeasurer {
    params: MeasureParams,
}

impl RectMeasurer {
    /// Validate `params` once so per-target work cannot hit configuration errors.
    pub fn new(params: MeasureParams) -> Result<Self, MeasureError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &MeasureParams {
        &self.params
    }

    pub fn compute(&self, markers: &[MarkerCorners; 4]) -> Result<ComputeResult, MeasureError> {
        compute_with(markers, &self.params)
    }

    /// Measure every target whose four markers were all detected.
    pub fn resolve(&self, detected: &DetectedMarkerSet, targets: &[TargetSpec]) -> ResultSet {
        self.resolve_report(detected, targets).results
    }

    /// Like [`RectMeasurer::resolve`], also reporting why targets were skipped.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, detected, targets),
            fields(markers = detected.len(), targets = targets.len())
        )
    )]
    pub fn resolve_report(
        &self,
        detected: &DetectedMarkerSet,
        targets: &[TargetSpec],
    ) -> ResolveReport {
        let mut report = ResolveReport {
            results: ResultSet::new(),
            outcomes: Vec::with_capacity(targets.len()),
        };

        for (index, target) in targets.iter().enumerate() {
            let Some(markers) = target.gather(detected) else {
                let missing = target.missing(detected);
                log::debug!("target {index} {:?}: missing markers {missing:?}", target.0);
                report
                    .outcomes
                    .push(TargetOutcome::MissingMarkers { missing });
                continue;
            };

            match self.compute(&markers) {
                Ok(result) => {
                    report.results.insert(index, result);
                    report.outcomes.push(TargetOutcome::Resolved);
                }
                Err(err) => {
                    log::warn!("target {index} {:?} skipped: {err}", target.0);
                    report.outcomes.push(TargetOutcome::Degenerate {
                        reason: err.to_string(),
                    });
                }
            }
        }

        log::debug!(
            "resolved {}/{} targets from {} markers",
            report.resolved(),
            targets.len(),
            detected.len()
        );
        report
    }
}

/// Resolve `targets` with the default 40 mm marker / 10 mm offset setup.
pub fn resolve(detected: &DetectedMarkerSet, targets: &[TargetSpec]) -> ResultSet {
    RectMeasurer::default().resolve(detected, targets)
}
