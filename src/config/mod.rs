//! Inputs for the pose and intrinsics report.
//!
//! [`PoseConfig::default`] holds the reference image used by the viewer: a
//! `SIMPLE_RADIAL` camera at 780x1040 whose intrinsics are rescaled by 0.25.
//! A YAML file in the layout of `samples/pose.yaml` can replace any of it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::Resolution;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to load YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// World-to-camera rotation as `[w, x, y, z]`.
    pub qvec: [f64; 4],
    /// World-to-camera translation.
    pub tvec: [f64; 3],
    pub camera: CameraConfig,
    /// Divisor applied to the intrinsics matrix.
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// COLMAP model name, e.g. `SIMPLE_RADIAL`.
    pub model: String,
    pub params: Vec<f64>,
    pub resolution: Resolution,
}

impl Default for PoseConfig {
    fn default() -> Self {
        PoseConfig {
            qvec: [
                0.9990926759388453,
                0.041015142534461625,
                -0.006827321814614928,
                0.009217952325488814,
            ],
            tvec: [-0.13173343396334097, 2.956248679762018, 1.8841122492704774],
            camera: CameraConfig::default(),
            scale: 0.25,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            model: "SIMPLE_RADIAL".to_string(),
            params: vec![1476.124535197411, 390.0, 520.0, 0.10500275806299399],
            resolution: Resolution {
                width: 780,
                height: 1040,
            },
        }
    }
}

impl PoseConfig {
    pub fn load_from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }
}
