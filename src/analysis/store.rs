//! Diagram Store
//!
//! Owns the identifier → diagram mapping for one analysis run. Every
//! identifier that was attempted keeps a record, including the ones without
//! coordinates or whose computation failed, so reports can tell "absent"
//! from "never attempted".

use super::repair::recover_diagram;
use crate::error::{Result, TdaError};
use crate::topology::PersistenceDiagram;
use std::collections::BTreeMap;
use tracing::warn;

/// Sentinel written for identifiers without coordinate data
pub const MISSING_SENTINEL: &str = "missing";
/// Sentinel written for identifiers whose computation failed
pub const ERROR_SENTINEL: &str = "Error";

/// Outcome of processing one structure
#[derive(Debug, Clone, PartialEq)]
pub enum StructureStatus {
    Computed(PersistenceDiagram),
    /// No coordinate data found
    Missing,
    /// Computation or recovery failed, with the cause
    Failed(String),
}

/// One identifier and its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct StructureRecord {
    pub id: String,
    pub status: StructureStatus,
}

impl StructureRecord {
    pub fn computed(id: impl Into<String>, diagram: PersistenceDiagram) -> Self {
        Self {
            id: id.into(),
            status: StructureStatus::Computed(diagram),
        }
    }

    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: StructureStatus::Missing,
        }
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: StructureStatus::Failed(reason.into()),
        }
    }

    /// Record for a per-structure error
    pub fn from_error(id: impl Into<String>, err: &TdaError) -> Self {
        match err {
            TdaError::MissingInput { .. } => Self::missing(id),
            other => Self::failed(id, other.to_string()),
        }
    }

    pub fn diagram(&self) -> Option<&PersistenceDiagram> {
        match &self.status {
            StructureStatus::Computed(pd) => Some(pd),
            _ => None,
        }
    }

    /// Value written to the results table: the diagram text or a sentinel.
    pub fn result_field(&self) -> String {
        match &self.status {
            StructureStatus::Computed(pd) => pd.to_string(),
            StructureStatus::Missing => MISSING_SENTINEL.to_string(),
            StructureStatus::Failed(_) => ERROR_SENTINEL.to_string(),
        }
    }

    /// Rebuild a record from a results-table field, repairing truncated text.
    ///
    /// Unrecoverable diagrams become `Failed` and are logged.
    pub fn from_result_field(id: &str, field: &str) -> Self {
        let field = field.trim();
        match field {
            // Older tables wrote "xyz missing"
            MISSING_SENTINEL | "xyz missing" => Self::missing(id),
            ERROR_SENTINEL => Self::failed(id, "computation failed in an earlier run"),
            text => match recover_diagram(id, text) {
                Ok(pd) => Self::computed(id, pd),
                Err(e) => {
                    warn!(id = %id, error = %e, "excluding structure with unrecoverable diagram");
                    Self::failed(id, e.to_string())
                }
            },
        }
    }
}

/// In-memory identifier → diagram mapping
#[derive(Debug, Clone, Default)]
pub struct DiagramStore {
    records: BTreeMap<String, StructureRecord>,
}

impl DiagramStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = StructureRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert a record, replacing any earlier one for the same identifier.
    pub fn insert(&mut self, record: StructureRecord) {
        if self.records.contains_key(&record.id) {
            warn!(id = %record.id, "duplicate identifier; keeping the latest record");
        }
        self.records.insert(record.id.clone(), record);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&StructureStatus> {
        self.records.get(id).map(|r| &r.status)
    }

    pub fn diagram(&self, id: &str) -> Option<&PersistenceDiagram> {
        self.records.get(id).and_then(StructureRecord::diagram)
    }

    /// True iff `id` has a diagram whose highest Betti number is ≥ `dimension`.
    pub fn has_betti_dimension(&self, id: &str, dimension: usize) -> bool {
        self.diagram(id).is_some_and(|pd| pd.has_betti_dimension(dimension))
    }

    /// `(birth, death)` run of Betti number `betti`; empty when absent.
    pub fn extract_by_dimension(&self, id: &str, betti: usize) -> Vec<(f64, f64)> {
        self.diagram(id)
            .map(|pd| pd.extract_by_dimension(betti))
            .unwrap_or_default()
    }

    /// Intervals for a comparison that requires Betti dimension `dimension`.
    pub fn comparison_intervals(&self, id: &str, dimension: usize) -> Result<Vec<(f64, f64)>> {
        match self.records.get(id).map(|r| &r.status) {
            None | Some(StructureStatus::Missing) => Err(TdaError::missing(id)),
            Some(StructureStatus::Failed(reason)) => Err(TdaError::computation(id, reason.clone())),
            Some(StructureStatus::Computed(pd)) if !pd.has_betti_dimension(dimension) => {
                Err(TdaError::incomplete(id, dimension))
            }
            Some(StructureStatus::Computed(pd)) => Ok(pd.extract_by_dimension(dimension)),
        }
    }

    /// All identifiers, sorted
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &StructureRecord> {
        self.records.values()
    }

    /// Identifiers with a diagram reaching Betti dimension `dimension`
    pub fn with_dimension(&self, dimension: usize) -> Vec<&str> {
        self.identifiers()
            .filter(|id| self.has_betti_dimension(id, dimension))
            .collect()
    }

    /// Computed diagrams that do not reach Betti dimension `dimension`
    pub fn lacking_dimension(&self, dimension: usize) -> Vec<(&str, &PersistenceDiagram)> {
        self.records
            .values()
            .filter_map(|r| r.diagram().map(|pd| (r.id.as_str(), pd)))
            .filter(|(_, pd)| !pd.has_betti_dimension(dimension))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
