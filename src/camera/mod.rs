//! COLMAP camera models and pinhole intrinsics.
//!
//! COLMAP describes every camera by a model name and a flat parameter list
//! whose layout depends on the model. This module names the closed set of
//! models, extracts the pinhole intrinsics `fx, fy, cx, cy` from the
//! parameter list, and builds the 3x3 intrinsics matrix `K`.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    #[error("Unknown camera model: {0}")]
    UnknownModel(String),
    #[error("Camera model {0} has no pinhole intrinsics mapping")]
    UnsupportedModel(ColmapCameraModel),
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Scale must be finite and non-zero, got {0}")]
    InvalidScale(f64),
    #[error("Matrix singularity detected")]
    SingularMatrix,
}

/// The camera models known to COLMAP, with their on-disk ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColmapCameraModel {
    SimplePinhole,
    Pinhole,
    SimpleRadial,
    Radial,
    OpenCv,
    OpenCvFisheye,
    FullOpenCv,
    Fov,
    SimpleRadialFisheye,
    RadialFisheye,
    ThinPrismFisheye,
}

impl ColmapCameraModel {
    pub const ALL: [ColmapCameraModel; 11] = [
        ColmapCameraModel::SimplePinhole,
        ColmapCameraModel::Pinhole,
        ColmapCameraModel::SimpleRadial,
        ColmapCameraModel::Radial,
        ColmapCameraModel::OpenCv,
        ColmapCameraModel::OpenCvFisheye,
        ColmapCameraModel::FullOpenCv,
        ColmapCameraModel::Fov,
        ColmapCameraModel::SimpleRadialFisheye,
        ColmapCameraModel::RadialFisheye,
        ColmapCameraModel::ThinPrismFisheye,
    ];

    /// The numeric id COLMAP writes into `cameras.bin`.
    pub fn id(self) -> i32 {
        match self {
            ColmapCameraModel::SimplePinhole => 0,
            ColmapCameraModel::Pinhole => 1,
            ColmapCameraModel::SimpleRadial => 2,
            ColmapCameraModel::Radial => 3,
            ColmapCameraModel::OpenCv => 4,
            ColmapCameraModel::OpenCvFisheye => 5,
            ColmapCameraModel::FullOpenCv => 6,
            ColmapCameraModel::Fov => 7,
            ColmapCameraModel::SimpleRadialFisheye => 8,
            ColmapCameraModel::RadialFisheye => 9,
            ColmapCameraModel::ThinPrismFisheye => 10,
        }
    }

    pub fn from_id(id: i32) -> Result<Self, CameraModelError> {
        Self::ALL
            .into_iter()
            .find(|model| model.id() == id)
            .ok_or_else(|| CameraModelError::UnknownModel(format!("model id {id}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            ColmapCameraModel::SimplePinhole => "SIMPLE_PINHOLE",
            ColmapCameraModel::Pinhole => "PINHOLE",
            ColmapCameraModel::SimpleRadial => "SIMPLE_RADIAL",
            ColmapCameraModel::Radial => "RADIAL",
            ColmapCameraModel::OpenCv => "OPENCV",
            ColmapCameraModel::OpenCvFisheye => "OPENCV_FISHEYE",
            ColmapCameraModel::FullOpenCv => "FULL_OPENCV",
            ColmapCameraModel::Fov => "FOV",
            ColmapCameraModel::SimpleRadialFisheye => "SIMPLE_RADIAL_FISHEYE",
            ColmapCameraModel::RadialFisheye => "RADIAL_FISHEYE",
            ColmapCameraModel::ThinPrismFisheye => "THIN_PRISM_FISHEYE",
        }
    }

    /// Number of entries in the model's parameter list.
    pub fn num_params(self) -> usize {
        match self {
            ColmapCameraModel::SimplePinhole => 3,
            ColmapCameraModel::Pinhole => 4,
            ColmapCameraModel::SimpleRadial => 4,
            ColmapCameraModel::Radial => 5,
            ColmapCameraModel::OpenCv => 8,
            ColmapCameraModel::OpenCvFisheye => 8,
            ColmapCameraModel::FullOpenCv => 12,
            ColmapCameraModel::Fov => 5,
            ColmapCameraModel::SimpleRadialFisheye => 4,
            ColmapCameraModel::RadialFisheye => 5,
            ColmapCameraModel::ThinPrismFisheye => 12,
        }
    }

    /// Extracts the pinhole intrinsics from a COLMAP parameter list.
    ///
    /// Models with a single focal length (`SIMPLE_PINHOLE`, `SIMPLE_RADIAL`,
    /// `RADIAL`) store `f, cx, cy, ...`; models with two (`PINHOLE`, `OPENCV`,
    /// `OPENCV_FISHEYE`, `FULL_OPENCV`) store `fx, fy, cx, cy, ...`. Trailing
    /// distortion coefficients are ignored.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::UnsupportedModel`] for any other model.
    /// * [`CameraModelError::InvalidParams`] if `params` is too short for the
    ///   model's layout.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use colmap_scene_tools::camera::ColmapCameraModel;
    ///
    /// let params = [1476.124535197411, 390.0, 520.0, 0.10500275806299399];
    /// let intrinsics = ColmapCameraModel::SimpleRadial.intrinsics(&params).unwrap();
    /// assert_eq!(intrinsics.fx, intrinsics.fy);
    /// assert_eq!(intrinsics.cx, 390.0);
    /// ```
    pub fn intrinsics(self, params: &[f64]) -> Result<Intrinsics, CameraModelError> {
        match self {
            ColmapCameraModel::SimplePinhole
            | ColmapCameraModel::SimpleRadial
            | ColmapCameraModel::Radial => {
                let [f, cx, cy] = leading_params::<3>(self, params)?;
                Ok(Intrinsics {
                    fx: f,
                    fy: f,
                    cx,
                    cy,
                })
            }
            ColmapCameraModel::Pinhole
            | ColmapCameraModel::OpenCv
            | ColmapCameraModel::OpenCvFisheye
            | ColmapCameraModel::FullOpenCv => {
                let [fx, fy, cx, cy] = leading_params::<4>(self, params)?;
                Ok(Intrinsics { fx, fy, cx, cy })
            }
            ColmapCameraModel::Fov
            | ColmapCameraModel::SimpleRadialFisheye
            | ColmapCameraModel::RadialFisheye
            | ColmapCameraModel::ThinPrismFisheye => Err(CameraModelError::UnsupportedModel(self)),
        }
    }
}

fn leading_params<const N: usize>(
    model: ColmapCameraModel,
    params: &[f64],
) -> Result<[f64; N], CameraModelError> {
    params
        .get(..N)
        .and_then(|head| head.try_into().ok())
        .ok_or_else(|| {
            CameraModelError::InvalidParams(format!(
                "{model} needs at least {N} parameters, got {}",
                params.len()
            ))
        })
}

impl fmt::Display for ColmapCameraModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColmapCameraModel {
    type Err = CameraModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.name() == s)
            .ok_or_else(|| CameraModelError::UnknownModel(s.to_string()))
    }
}

/// Parses a COLMAP model name and extracts its pinhole intrinsics.
pub fn intrinsics_from_colmap(
    model: &str,
    params: &[f64],
) -> Result<Intrinsics, CameraModelError> {
    model.parse::<ColmapCameraModel>()?.intrinsics(params)
}

impl Intrinsics {
    /// The intrinsics matrix `K`: identity with `fx`, `fy`, `cx`, `cy` set.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let mut k = Matrix3::identity();
        k[(0, 0)] = self.fx;
        k[(1, 1)] = self.fy;
        k[(0, 2)] = self.cx;
        k[(1, 2)] = self.cy;
        k
    }

    /// Returns `K / scale`, dividing every entry including the homogeneous
    /// corner.
    ///
    /// # Errors
    ///
    /// [`CameraModelError::InvalidScale`] if `scale` is zero or not finite.
    pub fn scaled_matrix(&self, scale: f64) -> Result<Matrix3<f64>, CameraModelError> {
        if scale == 0.0 || !scale.is_finite() {
            return Err(CameraModelError::InvalidScale(scale));
        }
        Ok(self.to_matrix() / scale)
    }
}

/// Inverts an intrinsics matrix.
///
/// # Errors
///
/// [`CameraModelError::SingularMatrix`] if `k` has no inverse, e.g. when a
/// focal length is zero.
pub fn inverse_intrinsics(k: &Matrix3<f64>) -> Result<Matrix3<f64>, CameraModelError> {
    k.try_inverse().ok_or(CameraModelError::SingularMatrix)
}
