//! Input handling: SQL source, mapping rows (CSV or JSON), and the optional
//! physical data-model file.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use t2t_lineage_core::{DataModel, MappingRow};

/// Read the SQL source from a file, or stdin when no path is given.
pub fn read_sql(path: &Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read SQL file: {}", path.display())),
        None => {
            let mut sql = String::new();
            io::stdin()
                .read_to_string(&mut sql)
                .context("failed to read SQL from stdin")?;
            Ok(sql)
        }
    }
}

/// Read declared mapping rows from a `.csv` or `.json` file.
///
/// Both formats route through [`MappingRow::from_row`] so that mapping
/// contracts authored with any of the accepted column-name variants
/// (`Target Table`, `dest_field`, ...) parse the same way regardless of
/// file format.
pub fn read_mapping_rows(path: &Path) -> Result<Vec<MappingRow>> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let raw_rows = if is_json {
        read_json_rows(path)?
    } else {
        read_csv_rows(path)?
    };

    raw_rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            MappingRow::from_row(row, index)
                .map_err(|(row, field)| anyhow::anyhow!("mapping row {row}: missing field `{field}`"))
        })
        .collect()
}

fn read_csv_rows(path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open mapping-rows CSV: {}", path.display()))?;

    reader
        .deserialize::<HashMap<String, String>>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse mapping-rows CSV: {}", path.display()))
}

fn read_json_rows(path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read mapping-rows JSON: {}", path.display()))?;
    let values: Vec<HashMap<String, serde_json::Value>> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse mapping-rows JSON: {}", path.display()))?;

    Ok(values
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(k, v)| json_scalar(&v).map(|s| (k, s)))
                .collect()
        })
        .collect())
}

fn json_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Read the optional physical data-model file, shaped as
/// `{"tables": {"T_A": ["AMT", "ID"]}}`.
pub fn read_data_model(path: &Option<PathBuf>) -> Result<Option<DataModel>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read data-model file: {}", path.display()))?;
    let dm: DataModel = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse data-model file: {}", path.display()))?;
    if dm.is_empty() {
        bail!("data-model file {} declares no tables", path.display());
    }
    Ok(Some(dm))
}
