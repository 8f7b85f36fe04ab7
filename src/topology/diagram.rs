//! Persistence Diagram Value Type
//!
//! A diagram is an ordered list of `(betti, (birth, death))` entries. Entries
//! are kept grouped by Betti number in non-decreasing order; extraction by
//! dimension walks that order instead of filtering, so the grouping is
//! enforced when a diagram is built.
//!
//! The text form written to results tables lists the groups in descending
//! Betti order, each group keeping its stored order:
//!
//! ```text
//! [(1, (0.3, 0.45)), (0, (0.0, inf)), (0, (0.0, 0.21))]
//! ```
//!
//! H0 entries come last, so a field cut short by a fixed-width store loses
//! zero-birth H0 entries before it touches a loop or a cavity.

use std::cmp::Reverse;
use std::fmt;

/// A single `(betti, (birth, death))` entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistenceInterval {
    pub betti: usize,
    pub birth: f64,
    pub death: f64,
}

impl PersistenceInterval {
    pub fn new(betti: usize, birth: f64, death: f64) -> Self {
        Self { betti, birth, death }
    }

    pub fn persistence(&self) -> f64 {
        if self.death.is_infinite() {
            f64::INFINITY
        } else {
            self.death - self.birth
        }
    }
}

/// Persistence diagram with Betti-contiguous ordering
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistenceDiagram {
    intervals: Vec<PersistenceInterval>,
}

impl PersistenceDiagram {
    pub fn new() -> Self {
        Self { intervals: Vec::new() }
    }

    /// Build a diagram, stably re-sorting by Betti number when the input is
    /// not already grouped in non-decreasing order.
    pub fn from_intervals(intervals: Vec<PersistenceInterval>) -> Self {
        Self::canonicalize(intervals).0
    }

    /// As [`from_intervals`](Self::from_intervals), also reporting whether the
    /// input had to be re-sorted.
    pub fn canonicalize(mut intervals: Vec<PersistenceInterval>) -> (Self, bool) {
        let reordered = !Self::is_grouped(&intervals);
        if reordered {
            intervals.sort_by_key(|i| i.betti);
        }
        (Self { intervals }, reordered)
    }

    /// True iff Betti numbers never decrease along the list.
    pub fn is_grouped(intervals: &[PersistenceInterval]) -> bool {
        intervals.windows(2).all(|w| w[0].betti <= w[1].betti)
    }

    pub fn intervals(&self) -> &[PersistenceInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Highest Betti number present.
    pub fn max_betti(&self) -> Option<usize> {
        self.intervals.last().map(|i| i.betti)
    }

    /// True iff the highest Betti number present is at least `dimension`.
    pub fn has_betti_dimension(&self, dimension: usize) -> bool {
        self.max_betti().is_some_and(|b| b >= dimension)
    }

    /// `(birth, death)` pairs of the contiguous run with Betti number `betti`,
    /// in stored order. Empty when the dimension is absent.
    pub fn extract_by_dimension(&self, betti: usize) -> Vec<(f64, f64)> {
        self.intervals
            .iter()
            .skip_while(|i| i.betti < betti)
            .take_while(|i| i.betti == betti)
            .map(|i| (i.birth, i.death))
            .collect()
    }

    /// Finite `(birth, death)` pairs in dimension `betti`.
    pub fn finite_intervals(&self, betti: usize) -> Vec<(f64, f64)> {
        self.extract_by_dimension(betti)
            .into_iter()
            .filter(|(_, d)| d.is_finite())
            .collect()
    }
}

impl fmt::Display for PersistenceDiagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<&PersistenceInterval> = self.intervals.iter().collect();
        entries.sort_by_key(|i| Reverse(i.betti));

        write!(f, "[")?;
        for (idx, i) in entries.into_iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({}, ({:?}, {:?}))", i.betti, i.birth, i.death)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PersistenceDiagram {
        PersistenceDiagram::from_intervals(vec![
            PersistenceInterval::new(0, 0.0, f64::INFINITY),
            PersistenceInterval::new(0, 0.0, 0.2),
            PersistenceInterval::new(1, 0.3, 0.45),
            PersistenceInterval::new(1, 0.31, 0.4),
            PersistenceInterval::new(2, 0.5, 0.55),
        ])
    }

    #[test]
    fn test_extract_contiguous_run() {
        let pd = sample();
        assert_eq!(pd.extract_by_dimension(1), vec![(0.3, 0.45), (0.31, 0.4)]);
        assert_eq!(pd.extract_by_dimension(2), vec![(0.5, 0.55)]);
        assert!(pd.extract_by_dimension(3).is_empty());
    }

    #[test]
    fn test_has_betti_dimension() {
        let pd = sample();
        assert!(pd.has_betti_dimension(2));
        assert!(!pd.has_betti_dimension(3));
        assert!(!PersistenceDiagram::new().has_betti_dimension(0));
    }

    #[test]
    fn test_descending_input_is_regrouped() {
        let (pd, reordered) = PersistenceDiagram::canonicalize(vec![
            PersistenceInterval::new(2, 0.5, 0.55),
            PersistenceInterval::new(1, 0.3, 0.45),
            PersistenceInterval::new(1, 0.31, 0.4),
            PersistenceInterval::new(0, 0.0, 0.2),
        ]);
        assert!(reordered);
        assert_eq!(pd.max_betti(), Some(2));
        assert_eq!(pd.extract_by_dimension(1), vec![(0.3, 0.45), (0.31, 0.4)]);
        assert_eq!(pd.intervals()[0].betti, 0);
    }

    #[test]
    fn test_display_format() {
        let pd = PersistenceDiagram::from_intervals(vec![
            PersistenceInterval::new(0, 0.0, f64::INFINITY),
            PersistenceInterval::new(1, 0.25, 0.5),
        ]);
        assert_eq!(pd.to_string(), "[(1, (0.25, 0.5)), (0, (0.0, inf))]");
    }

    #[test]
    fn test_text_lists_higher_dimensions_first() {
        let text = sample().to_string();
        assert_eq!(
            text,
            "[(2, (0.5, 0.55)), (1, (0.3, 0.45)), (1, (0.31, 0.4)), (0, (0.0, inf)), (0, (0.0, 0.2))]"
        );
        // Memory order stays ascending
        assert_eq!(sample().intervals()[0].betti, 0);
    }
}
