//! Similarity Ranking
//!
//! Turns one row of a bottleneck matrix into the set of structures that are
//! "close enough" to a reference. Distances are normalised against the
//! largest finite distance of the row; the closest distinct structure is
//! always kept and sets the bar the others are measured against.

use super::distance::DistanceMatrix;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Structures similar to one reference, with raw bottleneck distances
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilaritySet {
    pub reference: String,
    pub threshold: f64,
    pub matches: BTreeMap<String, f64>,
}

impl SimilaritySet {
    /// Matches plus the reference itself at distance zero.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = self.matches.clone();
        map.insert(self.reference.clone(), 0.0);
        map
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// One identifier of a ranked row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub id: String,
    pub distance: f64,
    pub similarity: f64,
}

/// Stateless ranking of distance-matrix rows
pub struct SimilarityRanker;

impl SimilarityRanker {
    /// Sort a row by distance and attach normalised similarities.
    ///
    /// The reference sorts first among equal distances. Infinite distances
    /// get similarity 0 and do not take part in normalisation. When the
    /// largest finite distance is 0 every entry has similarity 1.
    pub fn ranked(row: &[(String, f64)], reference: &str) -> Vec<RankedEntry> {
        let mut sorted: Vec<&(String, f64)> = row.iter().collect();
        sorted.sort_by(|(a, da), (b, db)| {
            da.partial_cmp(db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| (b == reference).cmp(&(a == reference)))
                .then_with(|| a.cmp(b))
        });

        let max_distance = row
            .iter()
            .map(|(_, d)| *d)
            .filter(|d| d.is_finite())
            .fold(0.0_f64, f64::max);

        sorted
            .into_iter()
            .map(|(id, d)| {
                let similarity = if !d.is_finite() {
                    0.0
                } else if max_distance == 0.0 {
                    1.0
                } else {
                    (max_distance - d) / max_distance
                };
                RankedEntry {
                    id: id.clone(),
                    distance: *d,
                    similarity,
                }
            })
            .collect()
    }

    /// Select the structures similar to `reference` from its row.
    ///
    /// The second-ranked entry is always included; every later entry is
    /// included iff its similarity is at least `threshold` times that of the
    /// second-ranked one.
    pub fn rank(row: &[(String, f64)], reference: &str, threshold: f64) -> SimilaritySet {
        let ranked = Self::ranked(row, reference);
        let mut matches = BTreeMap::new();

        let mut distinct = ranked.iter().filter(|e| e.id != reference);
        if let Some(best) = distinct.next() {
            let cutoff = threshold * best.similarity;
            matches.insert(best.id.clone(), best.distance);
            for entry in distinct.filter(|e| e.similarity >= cutoff) {
                matches.insert(entry.id.clone(), entry.distance);
            }
            debug!(
                reference = %reference,
                best = %best.id,
                best_similarity = best.similarity,
                cutoff,
                selected = matches.len(),
                "row ranked"
            );
        }

        SimilaritySet {
            reference: reference.to_string(),
            threshold,
            matches,
        }
    }

    /// Rank the row of `reference` in `matrix`.
    pub fn rank_in(matrix: &DistanceMatrix, reference: &str, threshold: f64) -> SimilaritySet {
        Self::rank(&matrix.row(reference), reference, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(entries: &[(&str, f64)]) -> Vec<(String, f64)> {
        entries.iter().map(|&(id, d)| (id.to_string(), d)).collect()
    }

    #[test]
    fn test_identical_structure_excludes_distant_one() {
        let r = row(&[("A", 0.0), ("B", 0.0), ("C", 1.0)]);
        let set = SimilarityRanker::rank(&r, "A", 1.0);

        assert_eq!(set.matches.len(), 1);
        assert_eq!(set.matches.get("B"), Some(&0.0));
        assert!(set.to_map().contains_key("A"));
    }

    #[test]
    fn test_reference_sorts_first_on_ties() {
        let r = row(&[("B", 0.0), ("A", 0.0), ("C", 1.0)]);
        let ranked = SimilarityRanker::ranked(&r, "A");
        assert_eq!(ranked[0].id, "A");
        assert_eq!(ranked[1].id, "B");
        assert_relative_eq!(ranked[2].similarity, 0.0);
    }

    #[test]
    fn test_degenerate_row_includes_everything() {
        let r = row(&[("A", 0.0), ("B", 0.0), ("C", 0.0)]);
        let set = SimilarityRanker::rank(&r, "A", 0.9);
        assert_eq!(set.matches.len(), 2);

        // Equal non-zero distances: every similarity is 0, and so is the cutoff
        let r = row(&[("A", 0.0), ("B", 0.4), ("C", 0.4), ("D", 0.4)]);
        let set = SimilarityRanker::rank(&r, "A", 1.0);
        assert_eq!(set.matches.len(), 3);
    }

    #[test]
    fn test_unique_closest_always_included() {
        let r = row(&[("A", 0.0), ("B", 0.9), ("C", 1.0)]);
        let set = SimilarityRanker::rank(&r, "A", 1.0);
        assert_eq!(set.matches.keys().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_threshold_selection() {
        let r = row(&[("A", 0.0), ("B", 0.1), ("C", 0.2), ("D", 1.0)]);
        // similarities: B 0.9, C 0.8, D 0.0
        let strict = SimilarityRanker::rank(&r, "A", 0.85);
        assert_eq!(strict.matches.keys().collect::<Vec<_>>(), vec!["B", "C"]);

        let tighter = SimilarityRanker::rank(&r, "A", 0.95);
        assert_eq!(tighter.matches.keys().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_infinite_distance_never_normalises() {
        let r = row(&[("A", 0.0), ("B", 0.5), ("C", f64::INFINITY), ("D", 1.0)]);
        let ranked = SimilarityRanker::ranked(&r, "A");
        assert_relative_eq!(ranked[1].similarity, 0.5);
        assert_eq!(ranked[3].id, "C");
        assert_eq!(ranked[3].similarity, 0.0);

        let set = SimilarityRanker::rank(&r, "A", 1.0);
        assert!(!set.matches.contains_key("C"));
    }

    #[test]
    fn test_row_with_only_reference() {
        let set = SimilarityRanker::rank(&row(&[("A", 0.0)]), "A", 0.9);
        assert!(set.is_empty());
        assert_eq!(set.to_map().len(), 1);
    }
}
