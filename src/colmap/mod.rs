//! Readers for COLMAP's binary sparse reconstruction files.
//!
//! A sparse model directory holds `cameras.bin`, `images.bin` and
//! `points3D.bin`. All three are little-endian and start with a `u64`
//! record count.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;

use crate::camera::{CameraModelError, ColmapCameraModel, Intrinsics, Resolution};
use crate::geometry::CameraPose;

#[derive(thiserror::Error, Debug)]
pub enum ColmapError {
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    CameraModel(#[from] CameraModelError),
    #[error("Image {image_id} name is not valid UTF-8")]
    InvalidImageName { image_id: u32 },
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// A camera entry from `cameras.bin`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    pub camera_id: u32,
    pub model: ColmapCameraModel,
    pub width: u64,
    pub height: u64,
    pub params: Vec<f64>,
}

impl ColmapCamera {
    pub fn intrinsics(&self) -> Result<Intrinsics, CameraModelError> {
        self.model.intrinsics(&self.params)
    }

    pub fn resolution(&self) -> Result<Resolution, ColmapError> {
        Ok(Resolution {
            width: to_u32("width", self.width)?,
            height: to_u32("height", self.height)?,
        })
    }
}

/// A registered image from `images.bin`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    pub image_id: u32,
    pub qvec: [f64; 4], // qw, qx, qy, qz
    pub tvec: [f64; 3],
    pub camera_id: u32,
    pub name: String,
    /// Keypoints with the id of the 3D point they observe, if triangulated.
    pub points2d: Vec<([f64; 2], Option<u64>)>,
}

impl ColmapImage {
    /// The world-to-camera pose of this image.
    pub fn pose(&self) -> CameraPose {
        CameraPose::from_colmap(&self.qvec, &self.tvec)
    }
}

/// A triangulated point from `points3D.bin`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapPoint3d {
    pub point3d_id: u64,
    pub xyz: [f64; 3],
    pub rgb: [u8; 3],
    pub error: f64,
    /// `(image_id, point2d_idx)` pairs observing this point.
    pub track: Vec<(u32, u32)>,
}

pub fn read_cameras_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    let file = File::open(path.as_ref())?;
    debug!("Reading cameras from {}", path.as_ref().display());
    read_cameras(BufReader::new(file))
}

pub fn read_images_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let file = File::open(path.as_ref())?;
    debug!("Reading images from {}", path.as_ref().display());
    read_images(BufReader::new(file))
}

pub fn read_points3d_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    let file = File::open(path.as_ref())?;
    debug!("Reading 3D points from {}", path.as_ref().display());
    read_points3d(BufReader::new(file))
}

/// Decodes the contents of a `cameras.bin` file.
///
/// The parameter count of each camera follows from its model id.
pub fn read_cameras<R: Read>(mut reader: R) -> Result<Vec<ColmapCamera>, ColmapError> {
    let num_cameras = reader.read_u64::<LittleEndian>()?;
    let mut cameras = Vec::new();

    for _ in 0..num_cameras {
        let camera_id = to_u32("camera_id", reader.read_i32::<LittleEndian>()?)?;
        let model = ColmapCameraModel::from_id(reader.read_i32::<LittleEndian>()?)?;
        let width = reader.read_u64::<LittleEndian>()?;
        let height = reader.read_u64::<LittleEndian>()?;

        let mut params = vec![0.0; model.num_params()];
        reader.read_f64_into::<LittleEndian>(&mut params)?;

        cameras.push(ColmapCamera {
            camera_id,
            model,
            width,
            height,
            params,
        });
    }

    debug!("Read {} cameras", cameras.len());
    Ok(cameras)
}

/// Decodes the contents of an `images.bin` file.
pub fn read_images<R: BufRead>(mut reader: R) -> Result<Vec<ColmapImage>, ColmapError> {
    let num_images = reader.read_u64::<LittleEndian>()?;
    let mut images = Vec::new();

    for _ in 0..num_images {
        let image_id = reader.read_u32::<LittleEndian>()?;

        let mut qvec = [0.0; 4];
        reader.read_f64_into::<LittleEndian>(&mut qvec)?;
        let mut tvec = [0.0; 3];
        reader.read_f64_into::<LittleEndian>(&mut tvec)?;

        let camera_id = reader.read_u32::<LittleEndian>()?;

        let mut name = Vec::new();
        reader.read_until(0, &mut name)?;
        if name.pop() != Some(0) {
            return Err(ColmapError::IOError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "image name is not NUL-terminated",
            )));
        }
        let name =
            String::from_utf8(name).map_err(|_| ColmapError::InvalidImageName { image_id })?;

        let num_points2d = reader.read_u64::<LittleEndian>()?;
        let mut points2d = Vec::new();
        for _ in 0..num_points2d {
            let x = reader.read_f64::<LittleEndian>()?;
            let y = reader.read_f64::<LittleEndian>()?;
            // -1 marks a keypoint without a triangulated point
            let point3d_id = u64::try_from(reader.read_i64::<LittleEndian>()?).ok();
            points2d.push(([x, y], point3d_id));
        }

        images.push(ColmapImage {
            image_id,
            qvec,
            tvec,
            camera_id,
            name,
            points2d,
        });
    }

    debug!("Read {} images", images.len());
    Ok(images)
}

/// Decodes the contents of a `points3D.bin` file.
pub fn read_points3d<R: Read>(mut reader: R) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    let num_points = reader.read_u64::<LittleEndian>()?;
    let mut points = Vec::new();

    for _ in 0..num_points {
        let point3d_id = reader.read_u64::<LittleEndian>()?;

        let mut xyz = [0.0; 3];
        reader.read_f64_into::<LittleEndian>(&mut xyz)?;
        let mut rgb = [0u8; 3];
        reader.read_exact(&mut rgb)?;
        let error = reader.read_f64::<LittleEndian>()?;

        let track_len = reader.read_u64::<LittleEndian>()?;
        let mut track = Vec::new();
        for _ in 0..track_len {
            let image_id = to_u32("image_id", reader.read_i32::<LittleEndian>()?)?;
            let point2d_idx = to_u32("point2d_idx", reader.read_i32::<LittleEndian>()?)?;
            track.push((image_id, point2d_idx));
        }

        points.push(ColmapPoint3d {
            point3d_id,
            xyz,
            rgb,
            error,
            track,
        });
    }

    debug!("Read {} 3D points", points.len());
    Ok(points)
}

fn to_u32<T>(field: &'static str, value: T) -> Result<u32, ColmapError>
where
    T: TryInto<u32> + Copy + std::fmt::Display,
{
    value.try_into().map_err(|_| ColmapError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::{Cursor, Write};

    fn write_camera(buf: &mut Vec<u8>, camera_id: i32, model_id: i32, params: &[f64]) {
        buf.write_i32::<LittleEndian>(camera_id).unwrap();
        buf.write_i32::<LittleEndian>(model_id).unwrap();
        buf.write_u64::<LittleEndian>(780).unwrap();
        buf.write_u64::<LittleEndian>(1040).unwrap();
        for p in params {
            buf.write_f64::<LittleEndian>(*p).unwrap();
        }
    }

    #[test]
    fn test_read_cameras() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(2).unwrap();
        write_camera(&mut buf, 1, 2, &[1476.1, 390.0, 520.0, 0.105]);
        write_camera(&mut buf, 2, 1, &[500.0, 510.0, 320.0, 240.0]);

        let cameras = read_cameras(Cursor::new(buf)).unwrap();
        assert_eq!(cameras.len(), 2);

        assert_eq!(cameras[0].camera_id, 1);
        assert_eq!(cameras[0].model, ColmapCameraModel::SimpleRadial);
        assert_eq!(cameras[0].params, vec![1476.1, 390.0, 520.0, 0.105]);
        assert_eq!(
            cameras[0].resolution().unwrap(),
            Resolution {
                width: 780,
                height: 1040
            }
        );
        assert_eq!(cameras[0].intrinsics().unwrap().fy, 1476.1);

        assert_eq!(cameras[1].model, ColmapCameraModel::Pinhole);
        assert_eq!(cameras[1].intrinsics().unwrap().fy, 510.0);
    }

    #[test]
    fn test_read_cameras_param_count_follows_model() {
        // OPENCV has 8 parameters, followed by a SIMPLE_PINHOLE with 3
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(2).unwrap();
        write_camera(&mut buf, 1, 4, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        write_camera(&mut buf, 2, 0, &[9.0, 10.0, 11.0]);

        let cameras = read_cameras(Cursor::new(buf)).unwrap();
        assert_eq!(cameras[0].params.len(), 8);
        assert_eq!(cameras[1].params, vec![9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_read_cameras_unknown_model_id() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        write_camera(&mut buf, 1, 99, &[]);

        let result = read_cameras(Cursor::new(buf));
        assert!(matches!(
            result,
            Err(ColmapError::CameraModel(CameraModelError::UnknownModel(_)))
        ));
    }

    #[test]
    fn test_read_cameras_truncated() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        write_camera(&mut buf, 1, 1, &[500.0, 500.0]);

        assert!(matches!(
            read_cameras(Cursor::new(buf)),
            Err(ColmapError::IOError(_))
        ));
    }

    #[test]
    fn test_read_images() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_u32::<LittleEndian>(7).unwrap();
        for q in [1.0, 0.0, 0.0, 0.0, 0.5, -1.0, 2.0] {
            buf.write_f64::<LittleEndian>(q).unwrap();
        }
        buf.write_u32::<LittleEndian>(1).unwrap();
        buf.write_all(b"church/0001.jpg\0").unwrap();
        buf.write_u64::<LittleEndian>(2).unwrap();
        for (x, y, id) in [(10.5, 20.5, 42i64), (11.0, 21.0, -1)] {
            buf.write_f64::<LittleEndian>(x).unwrap();
            buf.write_f64::<LittleEndian>(y).unwrap();
            buf.write_i64::<LittleEndian>(id).unwrap();
        }

        let images = read_images(Cursor::new(buf)).unwrap();
        assert_eq!(images.len(), 1);

        let image = &images[0];
        assert_eq!(image.image_id, 7);
        assert_eq!(image.camera_id, 1);
        assert_eq!(image.name, "church/0001.jpg");
        assert_eq!(image.tvec, [0.5, -1.0, 2.0]);
        assert_eq!(
            image.points2d,
            vec![([10.5, 20.5], Some(42)), ([11.0, 21.0], None)]
        );

        let camera_to_world = image.pose().camera_to_world();
        assert_eq!(camera_to_world[(0, 3)], -0.5);
        assert_eq!(camera_to_world[(1, 3)], 1.0);
        assert_eq!(camera_to_world[(2, 3)], -2.0);
    }

    #[test]
    fn test_read_images_missing_name_terminator() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_u32::<LittleEndian>(7).unwrap();
        for _ in 0..7 {
            buf.write_f64::<LittleEndian>(0.0).unwrap();
        }
        buf.write_u32::<LittleEndian>(1).unwrap();
        buf.write_all(b"unterminated").unwrap();

        assert!(read_images(Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_read_points3d() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_u64::<LittleEndian>(3).unwrap();
        for v in [1.0, 2.0, 3.0] {
            buf.write_f64::<LittleEndian>(v).unwrap();
        }
        buf.write_all(&[255, 128, 0]).unwrap();
        buf.write_f64::<LittleEndian>(0.75).unwrap();
        buf.write_u64::<LittleEndian>(2).unwrap();
        for (image_id, idx) in [(7, 0), (8, 12)] {
            buf.write_i32::<LittleEndian>(image_id).unwrap();
            buf.write_i32::<LittleEndian>(idx).unwrap();
        }

        let points = read_points3d(Cursor::new(buf)).unwrap();
        assert_eq!(
            points,
            vec![ColmapPoint3d {
                point3d_id: 3,
                xyz: [1.0, 2.0, 3.0],
                rgb: [255, 128, 0],
                error: 0.75,
                track: vec![(7, 0), (8, 12)],
            }]
        );
    }

    #[test]
    fn test_resolution_out_of_range() {
        let camera = ColmapCamera {
            camera_id: 1,
            model: ColmapCameraModel::Pinhole,
            width: (1 << 32) + 640,
            height: 480,
            params: vec![500.0, 500.0, 320.0, 240.0],
        };

        assert!(matches!(
            camera.resolution(),
            Err(ColmapError::InvalidValue { field: "width", .. })
        ));
    }

    #[test]
    fn test_negative_track_index_is_rejected() {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_u64::<LittleEndian>(3).unwrap();
        for v in [1.0, 2.0, 3.0] {
            buf.write_f64::<LittleEndian>(v).unwrap();
        }
        buf.write_all(&[0, 0, 0]).unwrap();
        buf.write_f64::<LittleEndian>(0.5).unwrap();
        buf.write_u64::<LittleEndian>(1).unwrap();
        buf.write_i32::<LittleEndian>(7).unwrap();
        buf.write_i32::<LittleEndian>(-4).unwrap();

        assert!(matches!(
            read_points3d(Cursor::new(buf)),
            Err(ColmapError::InvalidValue { field: "point2d_idx", .. })
        ));
    }

    #[test]
    fn test_read_cameras_bin_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_cameras_bin(dir.path().join("cameras.bin"));
        assert!(matches!(result, Err(ColmapError::IOError(_))));
    }
}
