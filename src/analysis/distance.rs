//! Pairwise Bottleneck Distance Matrices
//!
//! One matrix per homology dimension. The work is the list of unordered
//! pairs (diagonal included) among structures that reach the required Betti
//! dimension; pairs are evaluated in parallel and each result goes straight
//! to a [`DistanceSink`]. With a [`CheckpointSink`] every pair is on disk as
//! soon as it is computed, and a restarted build skips what is already there.

use super::store::DiagramStore;
use crate::error::{Result, TdaError};
use crate::topology::bottleneck_distance;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Self-distances above this are reported as suspicious
const SELF_DISTANCE_TOLERANCE: f64 = 1e-12;

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Symmetric bottleneck distances keyed by identifier pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceMatrix {
    pub dimension: usize,
    entries: BTreeMap<(String, String), f64>,
}

impl DistanceMatrix {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, a: &str, b: &str, distance: f64) {
        self.entries.insert(pair_key(a, b), distance);
    }

    /// Distance between `a` and `b`; `None` when the pair was never defined.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.entries.get(&pair_key(a, b)).copied()
    }

    /// Every defined distance from `id`, itself included.
    pub fn row(&self, id: &str) -> Vec<(String, f64)> {
        self.entries
            .iter()
            .filter_map(|((a, b), &d)| {
                if a == id {
                    Some((b.clone(), d))
                } else if b == id {
                    Some((a.clone(), d))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn identifiers(&self) -> BTreeSet<&str> {
        self.entries
            .keys()
            .flat_map(|(a, b)| [a.as_str(), b.as_str()])
            .collect()
    }

    /// Number of stored unordered pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Thread-safe destination for computed distances
pub trait DistanceSink: Send + Sync {
    fn record(&self, dimension: usize, a: &str, b: &str, distance: f64) -> Result<()>;
}

/// Collects distances in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    matrices: Mutex<BTreeMap<usize, DistanceMatrix>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_matrices(self) -> BTreeMap<usize, DistanceMatrix> {
        self.matrices.into_inner()
    }
}

impl DistanceSink for MemorySink {
    fn record(&self, dimension: usize, a: &str, b: &str, distance: f64) -> Result<()> {
        self.matrices
            .lock()
            .entry(dimension)
            .or_insert_with(|| DistanceMatrix::new(dimension))
            .insert(a, b, distance);
        Ok(())
    }
}

/// One line of a checkpoint file. An infinite distance is stored as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub dimension: usize,
    pub a: String,
    pub b: String,
    pub distance: Option<f64>,
}

impl CheckpointRecord {
    pub fn distance(&self) -> f64 {
        self.distance.unwrap_or(f64::INFINITY)
    }
}

/// Appends one JSON line per computed pair, flushed immediately
pub struct CheckpointSink {
    out: Mutex<BufWriter<File>>,
}

impl CheckpointSink {
    /// Open `path` for appending and return the records already in it.
    ///
    /// A torn last line from an interrupted run is ignored.
    pub fn resume(path: impl AsRef<Path>) -> Result<(Self, Vec<CheckpointRecord>)> {
        let path = path.as_ref();
        let existing = if path.exists() {
            read_checkpoint(path)?
        } else {
            Vec::new()
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), completed = existing.len(), "checkpoint opened");
        Ok((
            Self {
                out: Mutex::new(BufWriter::new(file)),
            },
            existing,
        ))
    }
}

impl DistanceSink for CheckpointSink {
    fn record(&self, dimension: usize, a: &str, b: &str, distance: f64) -> Result<()> {
        let record = CheckpointRecord {
            dimension,
            a: a.to_string(),
            b: b.to_string(),
            distance: distance.is_finite().then_some(distance),
        };
        let line = serde_json::to_string(&record)?;
        let mut out = self.out.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

/// Read every intact record of a checkpoint file.
pub fn read_checkpoint(path: impl AsRef<Path>) -> Result<Vec<CheckpointRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(line = idx + 1, error = %e, "skipping unreadable checkpoint line"),
        }
    }
    Ok(records)
}

/// Assemble matrices from checkpoint records.
pub fn matrices_from_records(records: &[CheckpointRecord]) -> BTreeMap<usize, DistanceMatrix> {
    let mut matrices = BTreeMap::new();
    for r in records {
        matrices
            .entry(r.dimension)
            .or_insert_with(|| DistanceMatrix::new(r.dimension))
            .insert(&r.a, &r.b, r.distance());
    }
    matrices
}

/// Computes bottleneck matrices over the structures of a [`DiagramStore`]
pub struct DistanceMatrixBuilder<'a> {
    store: &'a DiagramStore,
    required_betti: usize,
}

impl<'a> DistanceMatrixBuilder<'a> {
    pub fn new(store: &'a DiagramStore) -> Self {
        Self {
            store,
            required_betti: 0,
        }
    }

    /// Only compare structures whose highest Betti number reaches `betti`
    /// (in addition to the matrix dimension itself).
    pub fn with_required_betti(mut self, betti: usize) -> Self {
        self.required_betti = betti;
        self
    }

    /// Identifiers taking part in the matrix of `dimension`
    pub fn eligible(&self, dimension: usize) -> Vec<&'a str> {
        self.store.with_dimension(dimension.max(self.required_betti))
    }

    /// Unordered pairs (diagonal included) still to be computed
    pub fn pending_pairs(
        &self,
        dimension: usize,
        completed: &HashSet<(String, String)>,
    ) -> Vec<(&'a str, &'a str)> {
        let ids = self.eligible(dimension);
        let mut pairs = Vec::with_capacity(ids.len() * (ids.len() + 1) / 2);
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i..] {
                if !completed.contains(&pair_key(a, b)) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Compute every pending pair of `dimension` into `sink`.
    ///
    /// Returns the number of pairs computed. A sink error stops the build.
    pub fn build<S: DistanceSink + ?Sized>(
        &self,
        dimension: usize,
        sink: &S,
        completed: &HashSet<(String, String)>,
    ) -> Result<usize> {
        let start = Instant::now();
        let ids = self.eligible(dimension);
        let intervals: HashMap<&str, Vec<(f64, f64)>> = ids
            .iter()
            .map(|&id| (id, self.store.extract_by_dimension(id, dimension)))
            .collect();

        let pairs = self.pending_pairs(dimension, completed);
        info!(
            dimension,
            structures = ids.len(),
            pending = pairs.len(),
            skipped = completed.len(),
            "building bottleneck matrix"
        );

        pairs.par_iter().try_for_each(|&(a, b)| -> Result<()> {
            let d = bottleneck_distance(&intervals[a], &intervals[b]);
            if a == b && d > SELF_DISTANCE_TOLERANCE {
                warn!(id = %a, dimension, distance = d, "non-zero self distance");
            }
            debug!(a = %a, b = %b, dimension, distance = d, "pair evaluated");
            sink.record(dimension, a, b, d)
        })?;

        info!(
            dimension,
            computed = pairs.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "bottleneck matrix complete"
        );
        Ok(pairs.len())
    }

    /// Compute the full matrix of `dimension` in memory.
    pub fn build_matrix(&self, dimension: usize) -> Result<DistanceMatrix> {
        let sink = MemorySink::new();
        self.build(dimension, &sink, &HashSet::new())?;
        Ok(sink
            .into_matrices()
            .remove(&dimension)
            .unwrap_or_else(|| DistanceMatrix::new(dimension)))
    }

    /// Build (or finish) every requested dimension against a checkpoint file
    /// and return the assembled matrices.
    pub fn build_checkpointed(
        &self,
        dimensions: &[usize],
        checkpoint: impl AsRef<Path>,
    ) -> Result<BTreeMap<usize, DistanceMatrix>> {
        let checkpoint = checkpoint.as_ref();
        let (sink, existing) = CheckpointSink::resume(checkpoint)?;

        for &dimension in dimensions {
            let completed: HashSet<(String, String)> = existing
                .iter()
                .filter(|r| r.dimension == dimension)
                .map(|r| pair_key(&r.a, &r.b))
                .collect();
            self.build(dimension, &sink, &completed)?;
        }
        drop(sink);

        let records = read_checkpoint(checkpoint)?;
        let mut matrices = matrices_from_records(&records);
        matrices.retain(|dim, _| dimensions.contains(dim));
        for &dimension in dimensions {
            matrices.entry(dimension).or_insert_with(|| DistanceMatrix::new(dimension));
        }
        Ok(matrices)
    }
}

/// Look up a distance, naming the structure that makes the pair undefined.
pub fn require_distance(
    matrix: &DistanceMatrix,
    store: &DiagramStore,
    a: &str,
    b: &str,
) -> Result<f64> {
    matrix.get(a, b).ok_or_else(|| {
        let culprit = if store.has_betti_dimension(a, matrix.dimension) { b } else { a };
        TdaError::incomplete(culprit, matrix.dimension)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::store::StructureRecord;
    use crate::topology::{PersistenceDiagram, PersistenceInterval};

    fn diagram(entries: &[(usize, f64, f64)]) -> PersistenceDiagram {
        PersistenceDiagram::from_intervals(
            entries
                .iter()
                .map(|&(b, birth, death)| PersistenceInterval::new(b, birth, death))
                .collect(),
        )
    }

    fn store() -> DiagramStore {
        DiagramStore::from_records(vec![
            StructureRecord::computed("A", diagram(&[(1, 0.0, 0.5), (2, 0.3, 0.6)])),
            StructureRecord::computed("B", diagram(&[(1, 0.0, 0.5), (2, 0.3, 0.6)])),
            StructureRecord::computed("C", diagram(&[(1, 0.0, 2.0), (2, 0.3, 0.4)])),
            StructureRecord::computed("FLAT", diagram(&[(0, 0.0, 0.1), (1, 0.1, 0.3)])),
            StructureRecord::missing("X"),
        ])
    }

    #[test]
    fn test_matrix_symmetric_with_zero_diagonal() {
        let s = store();
        let m = DistanceMatrixBuilder::new(&s).build_matrix(1).unwrap();

        assert_eq!(m.get("A", "B"), Some(0.0));
        assert_eq!(m.get("A", "A"), Some(0.0));
        assert_eq!(m.get("A", "C"), m.get("C", "A"));
        assert!(m.get("A", "C").unwrap() > 0.0);
        assert_eq!(m.get("A", "C"), m.get("B", "C"));
        assert!(m.get("X", "A").is_none());
    }

    #[test]
    fn test_betti_two_matrix_excludes_flat_structures() {
        let s = store();
        let m = DistanceMatrixBuilder::new(&s).build_matrix(2).unwrap();
        assert!(!m.identifiers().contains("FLAT"));
        assert!(m.get("FLAT", "A").is_none());
        // 3 structures: 3 off-diagonal pairs + 3 self pairs
        assert_eq!(m.len(), 6);

        let err = require_distance(&m, &s, "A", "FLAT").unwrap_err();
        assert!(matches!(err, TdaError::IncompleteDimension { ref id, dimension: 2 } if id == "FLAT"));
    }

    #[test]
    fn test_required_betti_gates_lower_dimension() {
        let s = store();
        let m = DistanceMatrixBuilder::new(&s).with_required_betti(2).build_matrix(1).unwrap();
        assert!(m.get("FLAT", "FLAT").is_none());
        assert!(m.get("A", "C").is_some());
    }

    #[test]
    fn test_row_includes_self() {
        let s = store();
        let m = DistanceMatrixBuilder::new(&s).build_matrix(2).unwrap();
        let row = m.row("A");
        assert_eq!(row.len(), 3);
        assert!(row.iter().any(|(id, d)| id == "A" && *d == 0.0));
    }

    #[test]
    fn test_checkpoint_resume_skips_completed_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.jsonl");
        let s = store();
        let builder = DistanceMatrixBuilder::new(&s);

        // Simulate an interrupted run: two pairs done and a torn line
        {
            let (sink, existing) = CheckpointSink::resume(&path).unwrap();
            assert!(existing.is_empty());
            sink.record(2, "A", "B", 0.0).unwrap();
            sink.record(2, "A", "A", 0.0).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            write!(f, "{{\"dimension\":2,\"a\":\"B\"").unwrap();
            writeln!(f).unwrap();
        }

        let (_, existing) = CheckpointSink::resume(&path).unwrap();
        assert_eq!(existing.len(), 2);
        let completed: HashSet<_> = existing.iter().map(|r| pair_key(&r.a, &r.b)).collect();
        assert_eq!(builder.pending_pairs(2, &completed).len(), 4);

        let matrices = builder.build_checkpointed(&[2], &path).unwrap();
        let full = builder.build_matrix(2).unwrap();
        assert_eq!(matrices[&2], full);
    }

    #[test]
    fn test_infinite_distance_checkpointed_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distances.jsonl");
        {
            let (sink, _) = CheckpointSink::resume(&path).unwrap();
            sink.record(1, "P", "Q", f64::INFINITY).unwrap();
        }
        let records = read_checkpoint(&path).unwrap();
        assert_eq!(records[0].distance, None);
        assert!(matrices_from_records(&records)[&1].get("Q", "P").unwrap().is_infinite());
    }
}
