use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_MAX_SAMPLES, DEFAULT_VALIDATION_THRESHOLD, MAX_DETECTOR_SIZE, MIN_DETECTOR_SIZE,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Camera,
    Video,
    Image,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Camera => write!(f, "camera"),
            SourceKind::Video => write!(f, "video"),
            SourceKind::Image => write!(f, "image"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub kind: SourceKind,
    /// Device path, file path, or stream URL, depending on `kind`.
    pub location: String,
    /// Longest-side resolution the detector should process for this source.
    #[serde(default = "default_resolution")]
    pub resolution: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_path: PathBuf,
    pub events_path: PathBuf,
    pub captures_path: PathBuf,
    pub uploads_path: PathBuf,
    #[serde(default = "default_max_samples")]
    pub max_samples_per_identity: usize,
    #[serde(default = "default_validation_threshold")]
    pub validation_threshold: f32,
    #[serde(default = "default_min_detector_size")]
    pub min_detector_size: u32,
    #[serde(default = "default_max_detector_size")]
    pub max_detector_size: u32,
    pub sources: Vec<SourceConfig>,
}

fn default_resolution() -> u32 {
    MAX_DETECTOR_SIZE
}

fn default_max_samples() -> usize {
    DEFAULT_MAX_SAMPLES
}

fn default_validation_threshold() -> f32 {
    DEFAULT_VALIDATION_THRESHOLD
}

fn default_min_detector_size() -> u32 {
    MIN_DETECTOR_SIZE
}

fn default_max_detector_size() -> u32 {
    MAX_DETECTOR_SIZE
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Clamp a per-source resolution to the configured detector bounds.
    pub fn clamped_resolution(&self, resolution: u32) -> u32 {
        resolution.clamp(self.min_detector_size, self.max_detector_size)
    }
}
