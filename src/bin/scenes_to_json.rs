//! Converts the scenes table from CSV to a JSON array of objects.
//!
//! Usage:
//! ```bash
//! cargo run --bin scenes_to_json
//! cargo run --bin scenes_to_json -- --input scenes.csv --output scenes.json
//! ```

use clap::Parser;
use colmap_scene_tools::scenes::{convert_file, DEFAULT_INPUT, DEFAULT_OUTPUT};
use log::info;
use std::path::PathBuf;

/// Scenes CSV to JSON converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file with a header row
    #[arg(short = 'i', long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// JSON file to write
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();

    let count = convert_file(&cli.input, &cli.output)?;
    info!("Converted {} scenes", count);

    println!("done");
    Ok(())
}
