use crate::camera::{inverse_intrinsics, CameraModelError, ColmapCameraModel, Intrinsics};
use crate::colmap::{ColmapCamera, ColmapImage};
use crate::config::PoseConfig;
use crate::geometry::{is_unit_quaternion, quaternion_norm, CameraPose};
use log::{info, warn};
use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const UNIT_QUATERNION_TOLERANCE: f64 = 1e-6;

#[derive(thiserror::Error, Debug)]
pub enum UtilError {
    #[error(transparent)]
    CameraModel(#[from] CameraModelError),
    #[error("Image {image_id} references missing camera {camera_id}")]
    MissingCamera { image_id: u32, camera_id: u32 },
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to write JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Camera-to-world pose and rescaled intrinsics of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseReport {
    /// `R^T`, the camera-to-world rotation.
    pub rotation_transposed: Matrix3<f64>,
    /// `-R^T * t`, the camera center in world coordinates.
    pub translation: Vector3<f64>,
    pub intrinsics: Intrinsics,
    /// Intrinsics matrix divided by the scale.
    pub k: Matrix3<f64>,
    pub k_inv: Matrix3<f64>,
    pub camera_to_world: Matrix4<f64>,
}

impl PoseReport {
    /// Computes the report for a COLMAP image pose and camera.
    ///
    /// A quaternion that is not unit-norm is logged and used as is.
    ///
    /// # Errors
    ///
    /// Any [`CameraModelError`] from the intrinsics dispatch, the scale, or
    /// the matrix inversion.
    pub fn compute(
        qvec: &[f64; 4],
        tvec: &[f64; 3],
        model: ColmapCameraModel,
        params: &[f64],
        scale: f64,
    ) -> Result<Self, CameraModelError> {
        if !is_unit_quaternion(qvec, UNIT_QUATERNION_TOLERANCE) {
            warn!(
                "Quaternion {:?} has norm {}, rotation will not be orthonormal",
                qvec,
                quaternion_norm(qvec)
            );
        }

        let camera_to_world = CameraPose::from_colmap(qvec, tvec).inverse();
        let intrinsics = model.intrinsics(params)?;
        let k = intrinsics.scaled_matrix(scale)?;
        let k_inv = inverse_intrinsics(&k)?;

        Ok(PoseReport {
            camera_to_world: camera_to_world.to_homogeneous(),
            rotation_transposed: camera_to_world.rotation,
            translation: camera_to_world.translation,
            intrinsics,
            k,
            k_inv,
        })
    }

    pub fn from_config(config: &PoseConfig) -> Result<Self, CameraModelError> {
        let model = config.camera.model.parse::<ColmapCameraModel>()?;
        info!(
            "Camera {} at {}x{}, scale {}",
            model, config.camera.resolution.width, config.camera.resolution.height, config.scale
        );
        Self::compute(
            &config.qvec,
            &config.tvec,
            model,
            &config.camera.params,
            config.scale,
        )
    }

    /// Computes the report of a registered image using its camera.
    pub fn from_colmap(
        image: &ColmapImage,
        cameras: &[ColmapCamera],
        scale: f64,
    ) -> Result<Self, UtilError> {
        let camera = cameras
            .iter()
            .find(|camera| camera.camera_id == image.camera_id)
            .ok_or(UtilError::MissingCamera {
                image_id: image.image_id,
                camera_id: image.camera_id,
            })?;
        Ok(Self::compute(
            &image.qvec,
            &image.tvec,
            camera.model,
            &camera.params,
            scale,
        )?)
    }
}

/// Prints the report to stdout in the order `R_T`, `t`, intrinsics, `K`,
/// `Kinv`, `T`.
pub fn display_pose_report(report: &PoseReport) {
    println!("R_T: {}", report.rotation_transposed);
    println!("t: {}", report.translation.transpose());
    println!(
        "{} {} {} {}",
        report.intrinsics.fx, report.intrinsics.fy, report.intrinsics.cx, report.intrinsics.cy
    );
    println!("K: {}", report.k);
    println!("Kinv: {}", report.k_inv);
    println!("T: {}", report.camera_to_world);
}

#[derive(Serialize)]
struct PoseReportJson<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    rotation_transposed: Vec<Vec<f64>>,
    translation: [f64; 3],
    intrinsics: &'a Intrinsics,
    k: Vec<Vec<f64>>,
    k_inv: Vec<Vec<f64>>,
    camera_to_world: Vec<Vec<f64>>,
}

impl<'a> PoseReportJson<'a> {
    fn new(image: Option<&'a str>, report: &'a PoseReport) -> Self {
        PoseReportJson {
            image,
            rotation_transposed: matrix_rows(&report.rotation_transposed),
            translation: report.translation.into(),
            intrinsics: &report.intrinsics,
            k: matrix_rows(&report.k),
            k_inv: matrix_rows(&report.k_inv),
            camera_to_world: matrix_rows(&report.camera_to_world),
        }
    }
}

fn matrix_rows<const R: usize, const C: usize>(
    matrix: &nalgebra::SMatrix<f64, R, C>,
) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), UtilError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Writes the report as pretty JSON with row-major matrices.
pub fn export_pose_report(report: &PoseReport, path: impl AsRef<Path>) -> Result<(), UtilError> {
    write_json(&PoseReportJson::new(None, report), path.as_ref())?;
    info!("Pose report written to {}", path.as_ref().display());
    Ok(())
}

/// Writes one JSON array holding the report of every image, each tagged
/// with the image name.
pub fn export_image_reports(
    reports: &[(String, PoseReport)],
    path: impl AsRef<Path>,
) -> Result<(), UtilError> {
    let json: Vec<PoseReportJson> = reports
        .iter()
        .map(|(name, report)| PoseReportJson::new(Some(name.as_str()), report))
        .collect();
    write_json(&json, path.as_ref())?;
    info!(
        "{} image reports written to {}",
        reports.len(),
        path.as_ref().display()
    );
    Ok(())
}
