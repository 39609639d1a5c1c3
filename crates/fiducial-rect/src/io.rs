//! JSON configuration, detection files and reports.

use std::{
    fs,
    path::{Path, PathBuf},
};

use fiducial_rect_core::{DetectedMarkerSet, MarkerId};
use serde::{Deserialize, Serialize};

use crate::{
    MeasureError, MeasureParams, RectMeasurer, ResolveReport, ResultSet, TargetOutcome, TargetSpec,
};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Measure(#[from] MeasureError),
}

/// Parse a JSON array of four-integer arrays, e.g. `[[1, 2, 3, 4]]`.
///
/// Wrong arity, non-integer and negative identifiers are rejected.
pub fn parse_targets(raw: &str) -> Result<Vec<TargetSpec>, IoError> {
    Ok(serde_json::from_str(raw)?)
}

/// Load detector output: a JSON array of `{"id": .., "corners": [[x, y]; 4]}`.
pub fn load_detections(path: impl AsRef<Path>) -> Result<DetectedMarkerSet, IoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn write_detections(
    detected: &DetectedMarkerSet,
    path: impl AsRef<Path>,
) -> Result<(), IoError> {
    fs::write(path, serde_json::to_string_pretty(detected)?)?;
    Ok(())
}

/// Render results in the service response shape: an object keyed by target index.
pub fn response_json(results: &ResultSet) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Measurement job description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureConfig {
    pub detections_path: String,
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub params: MeasureParams,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl MeasureConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Output destination, a relative path taken against `base_dir`.
    pub fn output_path(&self, base_dir: Option<&Path>) -> Option<PathBuf> {
        self.output_path
            .as_deref()
            .map(|raw| relative_to(base_dir, raw))
    }

    pub fn build_measurer(&self) -> Result<RectMeasurer, ConfigError> {
        Ok(RectMeasurer::new(self.params)?)
    }

    /// Load detections, resolving a relative path against `base_dir`.
    pub fn load_detections(&self, base_dir: Option<&Path>) -> Result<DetectedMarkerSet, IoError> {
        load_detections(relative_to(base_dir, &self.detections_path))
    }
}

fn relative_to(base_dir: Option<&Path>, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

/// Full record of one measurement run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureReport {
    pub detections_path: String,
    #[serde(default)]
    pub config_path: Option<String>,
    pub params: MeasureParams,
    pub detected_ids: Vec<MarkerId>,
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub results: ResultSet,
    #[serde(default)]
    pub outcomes: Vec<TargetOutcome>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MeasureReport {
    pub fn new(
        cfg: &MeasureConfig,
        config_path: Option<&Path>,
        detected: &DetectedMarkerSet,
    ) -> Self {
        Self {
            detections_path: cfg.detections_path.clone(),
            config_path: config_path.map(|p| p.to_string_lossy().into_owned()),
            params: cfg.params,
            detected_ids: detected.ids(),
            targets: cfg.targets.clone(),
            results: ResultSet::new(),
            outcomes: Vec::new(),
            error: None,
        }
    }

    pub fn set_resolution(&mut self, report: ResolveReport) {
        self.results = report.results;
        self.outcomes = report.outcomes;
        self.error = None;
    }

    pub fn set_error(&mut self, err: impl std::fmt::Display) {
        self.error = Some(err.to_string());
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
