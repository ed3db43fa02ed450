//! Conversion of the scenes table from CSV to JSON.
//!
//! Every data row of the CSV becomes one JSON object keyed by the header
//! row. Values stay strings and rows keep their file order, so the JSON is a
//! straight transcription of the table.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

/// Input table, relative to the working directory.
pub const DEFAULT_INPUT: &str = "src/scripts/scenes.csv";
/// Output document, relative to the working directory.
pub const DEFAULT_OUTPUT: &str = "src/scripts/scenes.json";

/// Key that collects the cells of a row that runs past the header.
pub const SURPLUS_KEY: &str = "null";

/// One CSV row, keyed by column header in header order.
pub type SceneRecord = Map<String, Value>;

#[derive(thiserror::Error, Debug)]
pub enum ScenesError {
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads a CSV table whose first row is the header.
///
/// A row with fewer cells than the header gets `null` for the missing
/// columns. Cells past the last header column are gathered into an array
/// under [`SURPLUS_KEY`].
///
/// # Errors
///
/// [`ScenesError::Csv`] if the input is not valid UTF-8 or not valid CSV.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<SceneRecord>, ScenesError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    debug!("CSV header: {:?}", headers);

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;

        let mut record = SceneRecord::new();
        for (i, header) in headers.iter().enumerate() {
            let value = row
                .get(i)
                .map_or(Value::Null, |cell| Value::String(cell.to_string()));
            record.insert(header.to_string(), value);
        }
        if row.len() > headers.len() {
            let surplus = row
                .iter()
                .skip(headers.len())
                .map(|cell| Value::String(cell.to_string()))
                .collect();
            record.insert(SURPLUS_KEY.to_string(), Value::Array(surplus));
        }

        records.push(record);
    }

    Ok(records)
}

/// Writes records as a JSON array indented by four spaces.
///
/// Non-ASCII characters are written as-is and no trailing newline follows
/// the closing bracket.
pub fn write_records<W: Write>(writer: W, records: &[SceneRecord]) -> Result<(), ScenesError> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    records.serialize(&mut serializer)?;
    Ok(())
}

/// Converts the CSV file at `input` into a JSON file at `output`.
///
/// The input is read completely before the output is created, so a failed
/// read leaves any existing output untouched. Returns the number of records.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<usize, ScenesError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let records = read_records(File::open(input)?)?;
    info!("Read {} records from {}", records.len(), input.display());

    let mut writer = BufWriter::new(File::create(output)?);
    write_records(&mut writer, &records)?;
    writer.flush()?;
    info!("Wrote {}", output.display());

    Ok(records.len())
}
