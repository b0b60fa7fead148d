//! CSV and JSON loaders for input records.

use csv::{ReaderBuilder, Trim};
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{InputError, Result};

use super::records::{
    InputRecord, LocationRow, Payload, SoftphoneRow, UserRow, WorkspaceRow, normalize_row,
};

/// Reads CSV rows as normalized payloads, skipping blank lines.
///
/// # Errors
///
/// Returns an error if the CSV is malformed.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<Payload>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), Value::String(value.to_string())))
            .collect();
        rows.push(normalize_row(row));
    }
    Ok(rows)
}

/// Reads a CSV file as normalized payloads.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn read_csv_file(path: &Path) -> Result<Vec<Payload>> {
    debug!("Reading CSV: {}", path.display());
    let file = std::fs::File::open(path)?;
    read_csv_rows(std::io::BufReader::new(file))
}

/// Builds and validates records from payloads.
///
/// `first_row` is the row number of the first payload (2 for CSV files).
///
/// # Errors
///
/// Returns [`InputError::InvalidRow`] for the first row that fails validation.
pub fn records_from_rows<R: InputRecord>(
    rows: Vec<Payload>,
    source_name: &str,
    first_row: usize,
) -> Result<Vec<R>> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, payload)| {
            let record = R::from_payload(payload);
            record.validate().map_err(|e| InputError::InvalidRow {
                source_name: source_name.to_string(),
                row: idx + first_row,
                message: format!("{} {e}", R::KIND),
            })?;
            Ok(record)
        })
        .collect()
}

fn load_records<R: InputRecord>(path: &Path) -> Result<Vec<R>> {
    let rows = read_csv_file(path)?;
    let records = records_from_rows(rows, &path.display().to_string(), 2)?;
    info!("Loaded {} {} rows from {}", records.len(), R::KIND, path.display());
    Ok(records)
}

/// Loads `input_locations.csv`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row is invalid.
pub fn load_locations(path: &Path) -> Result<Vec<LocationRow>> {
    load_records(path)
}

/// Loads `input_users.csv`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row is invalid.
pub fn load_users(path: &Path) -> Result<Vec<UserRow>> {
    load_records(path)
}

/// Loads `input_workspaces.csv`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row is invalid.
pub fn load_workspaces(path: &Path) -> Result<Vec<WorkspaceRow>> {
    load_records(path)
}

/// Loads `v2/input_softphones.csv`, numbering rows from 2.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row is invalid.
pub fn load_softphones(path: &Path) -> Result<Vec<SoftphoneRow>> {
    let mut records: Vec<SoftphoneRow> = load_records(path)?;
    for (idx, record) in records.iter_mut().enumerate() {
        record.row_number = idx + 2;
    }
    Ok(records)
}

/// Normalizes uploaded location objects.
///
/// # Errors
///
/// Returns an error if an item is not an object or fails validation.
pub fn load_locations_from_json(rows: Vec<Value>) -> Result<Vec<LocationRow>> {
    let payloads = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| match row {
            Value::Object(map) => Ok(normalize_row(map)),
            _ => Err(InputError::InvalidRow {
                source_name: String::from("upload"),
                row: idx + 1,
                message: String::from("expected a JSON object"),
            }
            .into()),
        })
        .collect::<Result<Vec<_>>>()?;
    records_from_rows(payloads, "upload", 1)
}

/// Parses a JSON document that must be a list of objects.
///
/// # Errors
///
/// Returns [`InputError::UnsupportedUpload`] when it is not a list.
pub fn json_rows(bytes: &[u8]) -> Result<Vec<Value>> {
    match serde_json::from_slice(bytes)? {
        Value::Array(items) => Ok(items),
        _ => Err(InputError::UnsupportedUpload {
            message: String::from("JSON must be a list of objects"),
        }
        .into()),
    }
}

/// Parses an uploaded file by extension (`.csv` or `.json`).
///
/// # Errors
///
/// Returns an error for other extensions or malformed content.
pub fn rows_from_file_bytes(file_name: &str, bytes: &[u8]) -> Result<Vec<Value>> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => Ok(read_csv_rows(bytes)?
            .into_iter()
            .map(Value::Object)
            .collect()),
        Some("json") => json_rows(bytes),
        _ => Err(InputError::UnsupportedUpload {
            message: String::from("only .csv or .json files are accepted"),
        }
        .into()),
    }
}
