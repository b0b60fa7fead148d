//! CSV writing for export artifacts.

use serde_json::Value;
use std::path::Path;

use crate::error::Result;
use crate::inputs::Payload;

/// Writes `rows` with a fixed header; missing columns are empty.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_csv(path: &Path, rows: &[Payload], columns: &[&str]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| cell(row.get(*column))))?;
    }
    writer.flush()?;
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items.iter().map(|v| cell(Some(v))).collect::<Vec<_>>().join("|"),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_csv_fills_missing_columns() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("nested").join("groups.csv");
        let rows = vec![
            json!({"group_id": "G1", "name": "Sales", "extra": 1})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            json!({"group_id": "G2", "name": null, "tags": ["a", "b"]})
                .as_object()
                .cloned()
                .unwrap_or_default(),
        ];

        write_csv(&path, &rows, &["group_id", "name", "tags"]).expect("write");
        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content, "group_id,name,tags\nG1,Sales,\nG2,,a|b\n");
    }
}
