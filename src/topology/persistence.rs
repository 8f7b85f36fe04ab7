//! Persistent Homology via the Standard Algorithm
//!
//! 1. Enumerate the Rips simplices up to the maximum simplex dimension
//! 2. Sort simplices by (filtration value, dimension, vertices)
//! 3. Reduce the boundary matrix over Z/2Z with left-to-right column additions
//! 4. Read (birth, death) pairs off the pivots; unpaired cycles are essential
//!
//! Homology is reported for dimensions strictly below the maximum simplex
//! dimension: top-dimensional cycles can never be killed inside the
//! truncated complex, so their intervals would be meaningless.
//!
//! ## Reference
//!
//! Edelsbrunner, Letscher, Zomorodian (2002). "Topological Persistence
//! and Simplification". Discrete & Computational Geometry.

use super::{PersistenceDiagram, PersistenceInterval, Simplex, VietorisRips};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;
use thiserror::Error;

/// Columns reduced between deadline checks
const DEADLINE_CHECK_INTERVAL: usize = 1024;

/// Resource limits for one persistence computation
#[derive(Debug, Clone, Copy)]
pub struct ComputeLimits {
    /// Abort once the complex has more simplices than this
    pub max_simplices: usize,
    /// Abort once this instant has passed
    pub deadline: Option<Instant>,
}

impl Default for ComputeLimits {
    fn default() -> Self {
        Self {
            max_simplices: usize::MAX,
            deadline: None,
        }
    }
}

/// Why a persistence computation was abandoned
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceFailure {
    #[error("Rips complex exceeds {limit} simplices")]
    SimplexLimit { limit: usize },

    #[error("deadline exceeded after reducing {reduced} of {total} columns")]
    DeadlineExceeded { reduced: usize, total: usize },
}

/// Sparse column representation for boundary matrix
#[derive(Debug, Clone)]
struct SparseColumn {
    /// Non-zero row indices (stored in BTreeSet for efficient operations)
    rows: BTreeSet<usize>,
}

impl SparseColumn {
    fn new() -> Self {
        Self { rows: BTreeSet::new() }
    }

    fn is_zero(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the lowest (maximum) non-zero index
    fn low(&self) -> Option<usize> {
        self.rows.iter().next_back().copied()
    }

    /// Toggle a single row (addition in Z/2Z)
    fn toggle(&mut self, row: usize) {
        if !self.rows.remove(&row) {
            self.rows.insert(row);
        }
    }

    /// XOR (symmetric difference) with another column - addition in Z/2Z
    fn add_assign(&mut self, other: &SparseColumn) {
        for &row in &other.rows {
            self.toggle(row);
        }
    }
}

/// Compute the persistence diagram of a Rips complex.
///
/// # Arguments
/// * `vr` - Rips complex (point distances and maximum edge length)
/// * `max_dimension` - Maximum simplex dimension; homology below it is reported
/// * `limits` - Simplex ceiling and optional deadline
///
/// # Returns
/// Diagram grouped by Betti number ascending, longest-lived first within each
/// dimension. Zero-length intervals are dropped.
pub fn compute_persistence(
    vr: &VietorisRips,
    max_dimension: usize,
    limits: &ComputeLimits,
) -> Result<PersistenceDiagram, PersistenceFailure> {
    // Step 1: Build filtration
    let mut simplices = vr
        .expand(max_dimension, limits.max_simplices)
        .ok_or(PersistenceFailure::SimplexLimit {
            limit: limits.max_simplices,
        })?;

    // Step 2: Sort by (filtration, dimension, lexicographic vertices)
    simplices.sort_by(|a, b| {
        a.filtration
            .total_cmp(&b.filtration)
            .then(a.dimension().cmp(&b.dimension()))
            .then(a.vertices.cmp(&b.vertices))
    });

    let columns = reduce_boundary_matrix(&simplices, limits.deadline)?;

    // Step 4: Extract persistence pairs
    let m = simplices.len();
    let mut intervals = Vec::new();
    let mut paired = vec![false; m];

    for (col_idx, column) in columns.iter().enumerate() {
        if let Some(low_idx) = column.low() {
            let birth_simplex = &simplices[low_idx];
            let death_simplex = &simplices[col_idx];
            let dim = birth_simplex.dimension();

            paired[low_idx] = true;
            paired[col_idx] = true;

            if death_simplex.filtration > birth_simplex.filtration && dim < max_dimension {
                intervals.push(PersistenceInterval::new(
                    dim,
                    birth_simplex.filtration,
                    death_simplex.filtration,
                ));
            }
        }
    }

    // Essential features (unpaired simplices that create homology)
    for (idx, simplex) in simplices.iter().enumerate() {
        if !paired[idx] && columns[idx].is_zero() && simplex.dimension() < max_dimension {
            intervals.push(PersistenceInterval::new(
                simplex.dimension(),
                simplex.filtration,
                f64::INFINITY,
            ));
        }
    }

    intervals.sort_by(|a, b| {
        a.betti
            .cmp(&b.betti)
            .then(b.persistence().total_cmp(&a.persistence()))
            .then(a.birth.total_cmp(&b.birth))
    });

    Ok(PersistenceDiagram::from_intervals(intervals))
}

/// Step 3: build and reduce the boundary matrix of a sorted filtration
fn reduce_boundary_matrix(
    simplices: &[Simplex],
    deadline: Option<Instant>,
) -> Result<Vec<SparseColumn>, PersistenceFailure> {
    let simplex_index: HashMap<&[usize], usize> = simplices
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.vertices.as_slice(), idx))
        .collect();

    let m = simplices.len();
    let mut columns: Vec<SparseColumn> = Vec::with_capacity(m);
    let mut low_to_col: HashMap<usize, usize> = HashMap::new();

    for (col_idx, simplex) in simplices.iter().enumerate() {
        if col_idx % DEADLINE_CHECK_INTERVAL == 0 {
            if let Some(deadline) = deadline {
                if Instant::now() > deadline {
                    return Err(PersistenceFailure::DeadlineExceeded {
                        reduced: col_idx,
                        total: m,
                    });
                }
            }
        }

        // Boundary of [v0, v1, ..., vk] = sum of [v0, ..., v̂i, ..., vk]
        let mut boundary = SparseColumn::new();
        if simplex.dimension() > 0 {
            let mut face = Vec::with_capacity(simplex.vertices.len() - 1);
            for i in 0..simplex.vertices.len() {
                face.clear();
                face.extend(
                    simplex
                        .vertices
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j != i)
                        .map(|(_, &v)| v),
                );
                if let Some(&face_idx) = simplex_index.get(face.as_slice()) {
                    boundary.toggle(face_idx);
                }
            }
        }

        while let Some(low_idx) = boundary.low() {
            match low_to_col.get(&low_idx) {
                Some(&pivot_col) => boundary.add_assign(&columns[pivot_col]),
                None => break,
            }
        }

        if let Some(low_idx) = boundary.low() {
            low_to_col.insert(low_idx, col_idx);
        }

        columns.push(boundary);
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn persistence_of(dm: Array2<f64>, max_edge: f64, max_dim: usize) -> PersistenceDiagram {
        let vr = VietorisRips::new(dm, max_edge);
        compute_persistence(&vr, max_dim, &ComputeLimits::default()).unwrap()
    }

    #[test]
    fn test_two_points() {
        let dm = array![
            [0.0, 1.0],
            [1.0, 0.0]
        ];

        let pd = persistence_of(dm, 2.0, 2);

        // One finite H0 interval [0, 1) plus the essential component
        let h0 = pd.extract_by_dimension(0);
        assert_eq!(h0.len(), 2);
        assert!(h0[0].1.is_infinite());
        assert!((h0[1].0 - 0.0).abs() < 1e-10);
        assert!((h0[1].1 - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_square_cycle() {
        // Square: cycle born at 1, filled at sqrt(2)
        let s2 = 2.0_f64.sqrt();
        let dm = array![
            [0.0, 1.0, s2,  1.0],
            [1.0, 0.0, 1.0, s2 ],
            [s2,  1.0, 0.0, 1.0],
            [1.0, s2,  1.0, 0.0]
        ];

        let pd = persistence_of(dm, 2.0, 2);

        let h1 = pd.extract_by_dimension(1);
        assert_eq!(h1.len(), 1, "Square should have one H1 cycle");
        assert!((h1[0].0 - 1.0).abs() < 1e-10, "Cycle born at 1");
        assert!((h1[0].1 - s2).abs() < 1e-10, "Cycle dies at sqrt(2)");
    }

    #[test]
    fn test_octahedron_void() {
        // Vertices of an octahedron enclose a void that the 3-simplices fill
        let points = array![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0]
        ];
        let vr = VietorisRips::from_points(&points, 2.5);
        let pd = compute_persistence(&vr, 3, &ComputeLimits::default()).unwrap();

        let h2 = pd.extract_by_dimension(2);
        assert_eq!(h2.len(), 1);
        assert!((h2[0].0 - 2.0_f64.sqrt()).abs() < 1e-10);
        assert!((h2[0].1 - 2.0).abs() < 1e-10);
        assert!(pd.has_betti_dimension(2));
        // Nothing above max_dimension - 1 is reported
        assert_eq!(pd.max_betti(), Some(2));
    }

    #[test]
    fn test_output_grouped_by_dimension() {
        let s2 = 2.0_f64.sqrt();
        let dm = array![
            [0.0, 1.0, s2,  1.0],
            [1.0, 0.0, 1.0, s2 ],
            [s2,  1.0, 0.0, 1.0],
            [1.0, s2,  1.0, 0.0]
        ];
        let pd = persistence_of(dm, 2.0, 3);
        assert!(PersistenceDiagram::is_grouped(pd.intervals()));
    }

    #[test]
    fn test_simplex_limit_reported() {
        let dm = Array2::from_shape_fn((8, 8), |(i, j)| if i == j { 0.0 } else { 0.1 });
        let vr = VietorisRips::new(dm, 1.0);
        let limits = ComputeLimits {
            max_simplices: 20,
            deadline: None,
        };
        let err = compute_persistence(&vr, 3, &limits).unwrap_err();
        assert_eq!(err, PersistenceFailure::SimplexLimit { limit: 20 });
    }

    #[test]
    fn test_expired_deadline() {
        let dm = Array2::from_shape_fn((4, 4), |(i, j)| if i == j { 0.0 } else { 1.0 });
        let vr = VietorisRips::new(dm, 2.0);
        let limits = ComputeLimits {
            max_simplices: usize::MAX,
            deadline: Some(Instant::now() - std::time::Duration::from_secs(1)),
        };
        assert!(matches!(
            compute_persistence(&vr, 3, &limits),
            Err(PersistenceFailure::DeadlineExceeded { .. })
        ));
    }
}
