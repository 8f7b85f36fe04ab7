//! Line-oriented result tables.
//!
//! Rows are headerless CSV, so a diagram field such as
//! `"[(1, (0.2, 0.4))]"` is quoted and survives intact. Tables are appended
//! row by row and flushed after each row: a batch killed halfway leaves every
//! finished structure on disk.

use crate::analysis::{OutcomeSink, StructureOutcome, StructureRecord};
use crate::error::Result;
use crate::information::save_landscape;
use crate::topology::PersistenceDiagram;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Results table inside a batch output directory
pub const RESULTS_TABLE: &str = "results.csv";
/// Times table inside a batch output directory
pub const TIMES_TABLE: &str = "times.csv";
/// Landscape subdirectory inside a batch output directory
pub const LANDSCAPE_DIR: &str = "landscapes";

/// Appends CSV rows to a file
pub struct TableWriter {
    out: csv::Writer<File>,
}

impl TableWriter {
    /// Truncate or create the table
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_file(File::create(path)?))
    }

    /// Append to an existing table, creating it if needed
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: File) -> Self {
        Self {
            out: WriterBuilder::new().has_headers(false).flexible(true).from_writer(file),
        }
    }

    pub fn write_row(&mut self, fields: &[&str]) -> Result<()> {
        self.out.write_record(fields)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Headerless reader tolerant of rows with differing field counts
pub(crate) fn table_reader() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// Reader for whitespace-padded numeric tables
pub(crate) fn trimmed_table_reader() -> ReaderBuilder {
    let mut builder = table_reader();
    builder.trim(Trim::All);
    builder
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Read `(identifier, value)` rows. Rows with an empty value are skipped.
pub fn read_two_column(path: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
    let mut reader = table_reader().from_path(path)?;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let id = record.get(0).unwrap_or_default().trim();
        match record.get(1) {
            Some(value) if !value.trim().is_empty() && !id.is_empty() => {
                rows.push((id.to_string(), value.to_string()))
            }
            _ if id.is_empty() && record.len() <= 1 => {}
            _ => warn!(line = line_of(&record), id = %id, "skipping row without a value"),
        }
    }
    Ok(rows)
}

/// Load structure records from a results table, repairing diagram text.
pub fn read_results_table(path: impl AsRef<Path>) -> Result<Vec<StructureRecord>> {
    Ok(read_two_column(path)?
        .into_iter()
        .map(|(id, field)| StructureRecord::from_result_field(&id, &field))
        .collect())
}

/// Streams batch outcomes to the results table, the times table and the
/// landscape directory of one output directory.
///
/// Tables are opened in append mode; [`completed`](Self::completed) lists the
/// identifiers a previous run already recorded.
pub struct BatchWriter {
    results: Mutex<TableWriter>,
    times: Mutex<TableWriter>,
    landscape_dir: PathBuf,
    completed: HashSet<String>,
}

impl BatchWriter {
    pub fn resume(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let landscape_dir = dir.join(LANDSCAPE_DIR);
        fs::create_dir_all(&landscape_dir)?;

        let results_path = dir.join(RESULTS_TABLE);
        let completed: HashSet<String> = if results_path.exists() {
            read_two_column(&results_path)?.into_iter().map(|(id, _)| id).collect()
        } else {
            HashSet::new()
        };
        if !completed.is_empty() {
            debug!(structures = completed.len(), results = %results_path.display(), "resuming results table");
        }

        Ok(Self {
            results: Mutex::new(TableWriter::append(&results_path)?),
            times: Mutex::new(TableWriter::append(dir.join(TIMES_TABLE))?),
            landscape_dir,
            completed,
        })
    }

    /// Identifiers present in the results table when the writer was opened
    pub fn completed(&self) -> &HashSet<String> {
        &self.completed
    }

    pub fn landscape_path(&self, id: &str) -> PathBuf {
        self.landscape_dir.join(format!("{}.landscape", id))
    }
}

impl OutcomeSink for BatchWriter {
    fn record(&self, outcome: &StructureOutcome) -> Result<()> {
        let id = outcome.record.id.as_str();
        // Landscape first: a results row implies its artifact exists
        if let Some(values) = &outcome.landscape {
            save_landscape(self.landscape_path(id), values)?;
        }
        self.results.lock().write_row(&[id, &outcome.record.result_field()])?;
        self.times.lock().write_row(&[id, &outcome.timing.field()])?;
        Ok(())
    }
}

/// Write the identifiers lacking a Betti dimension and their diagrams.
pub fn write_lacking_dimension(
    list_path: impl AsRef<Path>,
    table_path: impl AsRef<Path>,
    lacking: &[(&str, &PersistenceDiagram)],
) -> Result<()> {
    let mut list = TableWriter::create(list_path)?;
    let mut table = TableWriter::create(table_path)?;
    for &(id, diagram) in lacking {
        list.write_row(&[id])?;
        table.write_row(&[id, &diagram.to_string()])?;
    }
    Ok(())
}
