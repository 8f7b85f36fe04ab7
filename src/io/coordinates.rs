//! Coordinate input: identifier lists and per-structure coordinate tables.

use super::tables::trimmed_table_reader;
use crate::error::{Result, TdaError};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// Supplies the point cloud of a structure
pub trait CoordinateSource: Sync {
    /// `Ok(None)` when no coordinate data exists for `id`.
    fn load(&self, id: &str) -> Result<Option<Array2<f64>>>;
}

/// Directory of `<id>.csv` files with fractional x, y, z columns
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
}

impl CsvDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.csv", id))
    }
}

impl CoordinateSource for CsvDirectory {
    fn load(&self, id: &str) -> Result<Option<Array2<f64>>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        parse_coordinates(&text).map(Some)
    }
}

/// Parse a three-column coordinate table.
pub fn parse_coordinates(text: &str) -> Result<Array2<f64>> {
    let mut reader = trimmed_table_reader().from_reader(text.as_bytes());
    let mut flat = Vec::new();
    let mut rows = 0;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != 3 {
            return Err(TdaError::Parse {
                line,
                reason: format!("expected 3 columns, found {}", record.len()),
            });
        }
        for field in &record {
            let value = clean_coordinate(field).ok_or_else(|| TdaError::Parse {
                line,
                reason: format!("invalid coordinate '{}'", field),
            })?;
            flat.push(value);
        }
        rows += 1;
    }

    Array2::from_shape_vec((rows, 3), flat).map_err(|e| TdaError::Parse {
        line: 0,
        reason: e.to_string(),
    })
}

/// Parse a coordinate, dropping a parenthesised uncertainty suffix:
/// `0.1234(5)` → `0.1234`.
pub fn clean_coordinate(token: &str) -> Option<f64> {
    let token = token.trim();
    let value = match token.find('(') {
        Some(open) if token.ends_with(')') => &token[..open],
        Some(_) => return None,
        None => token,
    };
    value.trim().parse().ok()
}

/// Read an identifier list, one per line. An absent or empty list is fatal.
pub fn read_identifier_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| TdaError::config(format!("cannot read identifier list {}: {}", path.display(), e)))?;

    let ids: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(TdaError::config(format!("identifier list {} is empty", path.display())));
    }
    Ok(ids)
}
