//! COLMAP Scene Tools Library
//!
//! Small utilities around COLMAP sparse reconstructions:
//! - Quaternion to rotation matrix conversion and pose inversion
//! - Pinhole intrinsics for the COLMAP camera models
//! - Readers for `cameras.bin`, `images.bin` and `points3D.bin`
//! - Conversion of the scenes table from CSV to JSON
//!
//! The `colmap_pose` and `scenes_to_json` binaries wrap these as
//! command-line tools.

pub mod camera;
pub mod colmap;
pub mod config;
pub mod geometry;
pub mod scenes;
pub mod util;

// Re-export commonly used types
pub use camera::{
    intrinsics_from_colmap, CameraModelError, ColmapCameraModel, Intrinsics, Resolution,
};
pub use colmap::{ColmapCamera, ColmapError, ColmapImage, ColmapPoint3d};
pub use config::PoseConfig;
pub use geometry::{qvec2rotmat, CameraPose};
pub use scenes::{convert_file, SceneRecord, ScenesError};
pub use util::PoseReport;
