//! Camera pose and intrinsics printer.
//!
//! Prints the camera-to-world rotation `R_T`, the camera center `t`, the
//! pinhole intrinsics, the rescaled intrinsics matrix `K`, its inverse `Kinv`
//! and the homogeneous camera-to-world transform `T`.
//!
//! Usage:
//! ```bash
//! # reference image of the default scene
//! cargo run --bin colmap_pose
//!
//! # every registered image of a sparse reconstruction
//! cargo run --bin colmap_pose -- --sparse-dir sparse/0 --scale 0.25 --json images.json
//! ```

use clap::Parser;
use colmap_scene_tools::colmap::{read_cameras_bin, read_images_bin};
use colmap_scene_tools::config::PoseConfig;
use colmap_scene_tools::util::{
    display_pose_report, export_image_reports, export_pose_report, PoseReport,
};
use log::info;
use std::path::{Path, PathBuf};

/// Camera pose and intrinsics printer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML file with qvec, tvec, camera and scale (defaults to the reference image)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Divisor for the intrinsics matrix, overrides the config value
    #[arg(short = 's', long)]
    scale: Option<f64>,

    /// COLMAP sparse model directory holding cameras.bin and images.bin
    #[arg(short = 'd', long, conflicts_with = "config")]
    sparse_dir: Option<PathBuf>,

    /// Also write the report as JSON, one array entry per image with --sparse-dir
    #[arg(short = 'j', long)]
    json: Option<PathBuf>,
}

fn run_sparse(
    sparse_dir: &Path,
    scale: f64,
    json: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cameras = read_cameras_bin(sparse_dir.join("cameras.bin"))?;
    let images = read_images_bin(sparse_dir.join("images.bin"))?;
    info!(
        "Loaded {} cameras and {} images from {}",
        cameras.len(),
        images.len(),
        sparse_dir.display()
    );

    let mut reports = Vec::with_capacity(images.len());
    for image in &images {
        println!("{} (image {})", image.name, image.image_id);
        let report = PoseReport::from_colmap(image, &cameras, scale)?;
        display_pose_report(&report);
        reports.push((image.name.clone(), report));
    }

    if let Some(path) = json {
        export_image_reports(&reports, path)?;
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading pose config from: {}", path.display());
            PoseConfig::load_from_yaml(path)?
        }
        None => PoseConfig::default(),
    };
    if let Some(scale) = cli.scale {
        config.scale = scale;
    }

    if let Some(sparse_dir) = &cli.sparse_dir {
        return run_sparse(sparse_dir, config.scale, cli.json.as_deref());
    }

    let report = PoseReport::from_config(&config)?;
    display_pose_report(&report);

    if let Some(path) = &cli.json {
        export_pose_report(&report, path)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    run(&cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::fs;
    use std::io::Write;

    fn write_sparse_model(dir: &Path) {
        let mut cameras = Vec::new();
        cameras.write_u64::<LittleEndian>(1).unwrap();
        cameras.write_i32::<LittleEndian>(1).unwrap();
        cameras.write_i32::<LittleEndian>(1).unwrap(); // PINHOLE
        cameras.write_u64::<LittleEndian>(640).unwrap();
        cameras.write_u64::<LittleEndian>(480).unwrap();
        for p in [500.0, 500.0, 320.0, 240.0] {
            cameras.write_f64::<LittleEndian>(p).unwrap();
        }
        fs::write(dir.join("cameras.bin"), cameras).unwrap();

        let mut images = Vec::new();
        images.write_u64::<LittleEndian>(1).unwrap();
        images.write_u32::<LittleEndian>(1).unwrap();
        for v in [1.0, 0.0, 0.0, 0.0, 0.5, -1.0, 2.0] {
            images.write_f64::<LittleEndian>(v).unwrap();
        }
        images.write_u32::<LittleEndian>(1).unwrap();
        images.write_all(b"view.jpg\0").unwrap();
        images.write_u64::<LittleEndian>(0).unwrap();
        fs::write(dir.join("images.bin"), images).unwrap();
    }

    #[test]
    fn test_sparse_dir_writes_json_reports() {
        let dir = tempfile::tempdir().unwrap();
        write_sparse_model(dir.path());
        let json = dir.path().join("reports.json");

        let cli = Cli::try_parse_from([
            "colmap_pose",
            "--sparse-dir",
            dir.path().to_str().unwrap(),
            "--json",
            json.to_str().unwrap(),
        ])
        .unwrap();
        run(&cli).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["image"], "view.jpg");
        assert_eq!(entries[0]["translation"], serde_json::json!([-0.5, 1.0, -2.0]));
    }

    #[test]
    fn test_sparse_dir_conflicts_with_config() {
        let result = Cli::try_parse_from([
            "colmap_pose",
            "--sparse-dir",
            "sparse/0",
            "--config",
            "samples/pose.yaml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_run_writes_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("pose.json");

        let cli = Cli::try_parse_from(["colmap_pose", "--json", json.to_str().unwrap()]).unwrap();
        run(&cli).unwrap();

        assert!(json.exists());
    }
}
