//! Rotation and pose math for COLMAP reconstructions.
//!
//! COLMAP stores each registered image as a world-to-camera transform: a unit
//! quaternion `(w, x, y, z)` and a translation `t`, so that a world point `X`
//! maps to camera coordinates as `R * X + t`. This module converts the
//! quaternion to a rotation matrix and inverts the pose into the
//! camera-to-world transform used for drawing camera frustums.

use nalgebra::{Matrix3, Matrix4, Vector3};

/// Converts a COLMAP quaternion `(w, x, y, z)` to a 3x3 rotation matrix.
///
/// The quaternion is used as given. A non-unit quaternion produces a scaled,
/// non-orthonormal matrix; use [`is_unit_quaternion`] to check the input first
/// when it does not come straight from COLMAP.
///
/// # Arguments
///
/// * `qvec` - The quaternion components in `[w, x, y, z]` order.
///
/// # Examples
///
/// ```rust
/// use colmap_scene_tools::geometry::qvec2rotmat;
/// use nalgebra::Matrix3;
///
/// let rotation = qvec2rotmat(&[1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(rotation, Matrix3::identity());
/// ```
pub fn qvec2rotmat(qvec: &[f64; 4]) -> Matrix3<f64> {
    let [w, x, y, z] = *qvec;

    Matrix3::new(
        1.0 - 2.0 * y * y - 2.0 * z * z,
        2.0 * x * y - 2.0 * w * z,
        2.0 * z * x + 2.0 * w * y,
        2.0 * x * y + 2.0 * w * z,
        1.0 - 2.0 * x * x - 2.0 * z * z,
        2.0 * y * z - 2.0 * w * x,
        2.0 * z * x - 2.0 * w * y,
        2.0 * y * z + 2.0 * w * x,
        1.0 - 2.0 * x * x - 2.0 * y * y,
    )
}

/// Euclidean norm of a quaternion.
pub fn quaternion_norm(qvec: &[f64; 4]) -> f64 {
    qvec.iter().map(|q| q * q).sum::<f64>().sqrt()
}

/// Returns `true` when the quaternion norm is within `tolerance` of one.
pub fn is_unit_quaternion(qvec: &[f64; 4], tolerance: f64) -> bool {
    (quaternion_norm(qvec) - 1.0).abs() <= tolerance
}

/// A rigid transform made of a rotation and a translation.
///
/// Whether it maps world to camera or camera to world depends on where it
/// came from: [`CameraPose::from_colmap`] yields world-to-camera and
/// [`CameraPose::inverse`] flips the direction.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl CameraPose {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        CameraPose {
            rotation,
            translation,
        }
    }

    /// Builds the world-to-camera pose stored by COLMAP for one image.
    pub fn from_colmap(qvec: &[f64; 4], tvec: &[f64; 3]) -> Self {
        CameraPose::new(qvec2rotmat(qvec), Vector3::from_column_slice(tvec))
    }

    /// Inverts the pose: the rotation becomes `R^T` and the translation
    /// `-R^T * t`.
    ///
    /// Uses the transpose rather than a general inverse, which is exact only
    /// when `rotation` is orthonormal.
    pub fn inverse(&self) -> Self {
        let rotation_t = self.rotation.transpose();
        let translation = -(rotation_t * self.translation);
        CameraPose::new(rotation_t, translation)
    }

    /// Assembles the 4x4 homogeneous matrix `[R | t; 0 0 0 1]`.
    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut transform = Matrix4::identity();
        transform
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation);
        transform
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.translation);
        transform
    }

    /// The camera-to-world transform of a world-to-camera pose.
    pub fn camera_to_world(&self) -> Matrix4<f64> {
        self.inverse().to_homogeneous()
    }
}
