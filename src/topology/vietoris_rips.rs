//! Vietoris-Rips Complex Construction
//!
//! The Vietoris-Rips complex VR_ε(X) is a simplicial complex where:
//! - 0-simplices are the points in X
//! - A k-simplex [v₀, ..., vₖ] exists iff d(vᵢ, vⱼ) ≤ ε for all i,j
//!
//! Each simplex enters the filtration at the length of its longest edge.
//! Simplices are enumerated as cliques of the ε-neighbourhood graph, growing
//! each clique only by vertices of larger index so every simplex is produced
//! exactly once with its vertices sorted.

use ndarray::Array2;
use std::collections::HashSet;

/// Vietoris-Rips complex builder
pub struct VietorisRips {
    /// Distance matrix (precomputed)
    distances: Array2<f64>,
    /// Maximum edge length ε
    max_edge_length: f64,
}

/// A simplex with the filtration value at which it appears
#[derive(Debug, Clone, PartialEq)]
pub struct Simplex {
    /// Vertex indices (sorted ascending)
    pub vertices: Vec<usize>,
    pub filtration: f64,
}

impl Simplex {
    pub fn dimension(&self) -> usize {
        self.vertices.len() - 1
    }
}

impl VietorisRips {
    /// Create from a precomputed distance matrix
    pub fn new(distances: Array2<f64>, max_edge_length: f64) -> Self {
        Self {
            distances,
            max_edge_length,
        }
    }

    /// Create from point cloud (computes distance matrix)
    pub fn from_points(points: &Array2<f64>, max_edge_length: f64) -> Self {
        let distances = Self::compute_distance_matrix(points);
        Self::new(distances, max_edge_length)
    }

    /// Compute Euclidean distance matrix
    fn compute_distance_matrix(points: &Array2<f64>) -> Array2<f64> {
        let n = points.nrows();
        let dim = points.ncols();

        let mut dm = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            for j in i+1..n {
                let mut dist_sq = 0.0_f64;
                for d in 0..dim {
                    let diff = points[[i, d]] - points[[j, d]];
                    dist_sq += diff * diff;
                }
                let dist = dist_sq.sqrt();
                dm[[i, j]] = dist;
                dm[[j, i]] = dist;
            }
        }

        dm
    }

    fn adjacent(&self, i: usize, j: usize) -> bool {
        self.distances[[i, j]] <= self.max_edge_length
    }

    /// Neighbours of `v` with a larger index
    fn upper_neighbors(&self, v: usize) -> Vec<usize> {
        (v + 1..self.n_points()).filter(|&u| self.adjacent(v, u)).collect()
    }

    /// All edges (i < j) within the maximum edge length, with their lengths
    pub fn edges(&self) -> Vec<(usize, usize, f64)> {
        let n = self.n_points();
        let mut edges = Vec::new();

        for i in 0..n {
            for j in i+1..n {
                if self.adjacent(i, j) {
                    edges.push((i, j, self.distances[[i, j]]));
                }
            }
        }

        edges
    }

    /// Enumerate every simplex up to `max_dimension`.
    ///
    /// Returns `None` as soon as more than `max_simplices` simplices would be
    /// produced.
    pub fn expand(&self, max_dimension: usize, max_simplices: usize) -> Option<Vec<Simplex>> {
        let mut out = Vec::new();
        let mut tau = Vec::with_capacity(max_dimension + 1);

        for v in 0..self.n_points() {
            tau.push(v);
            let candidates = self.upper_neighbors(v);
            let ok = self.add_cofaces(&mut tau, 0.0, &candidates, max_dimension, max_simplices, &mut out);
            tau.pop();
            if !ok {
                return None;
            }
        }

        Some(out)
    }

    fn add_cofaces(
        &self,
        tau: &mut Vec<usize>,
        filtration: f64,
        candidates: &[usize],
        max_dimension: usize,
        max_simplices: usize,
        out: &mut Vec<Simplex>,
    ) -> bool {
        out.push(Simplex {
            vertices: tau.clone(),
            filtration,
        });
        if out.len() > max_simplices {
            return false;
        }
        if tau.len() > max_dimension {
            return true;
        }

        for (idx, &v) in candidates.iter().enumerate() {
            let next: Vec<usize> = candidates[idx + 1..]
                .iter()
                .copied()
                .filter(|&u| self.adjacent(v, u))
                .collect();
            let f = tau
                .iter()
                .map(|&w| self.distances[[w, v]])
                .fold(filtration, f64::max);

            tau.push(v);
            let ok = self.add_cofaces(tau, f, &next, max_dimension, max_simplices, out);
            tau.pop();
            if !ok {
                return false;
            }
        }
        true
    }

    /// Count connected components at the maximum edge length using Union-Find
    pub fn count_components(&self) -> usize {
        let n = self.n_points();
        let mut parent: Vec<usize> = (0..n).collect();
        let mut rank = vec![0usize; n];

        fn find(parent: &mut [usize], i: usize) -> usize {
            if parent[i] != i {
                parent[i] = find(parent, parent[i]);
            }
            parent[i]
        }

        fn union(parent: &mut [usize], rank: &mut [usize], x: usize, y: usize) {
            let rx = find(parent, x);
            let ry = find(parent, y);
            if rx != ry {
                if rank[rx] < rank[ry] {
                    parent[rx] = ry;
                } else if rank[rx] > rank[ry] {
                    parent[ry] = rx;
                } else {
                    parent[ry] = rx;
                    rank[rx] += 1;
                }
            }
        }

        for (i, j, _) in self.edges() {
            union(&mut parent, &mut rank, i, j);
        }

        let mut roots = HashSet::new();
        for i in 0..n {
            roots.insert(find(&mut parent, i));
        }
        roots.len()
    }

    /// Number of points
    pub fn n_points(&self) -> usize {
        self.distances.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_triangle() {
        // Equilateral triangle with side 1
        let points = array![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.5, 0.866, 0.0]
        ];

        assert_eq!(VietorisRips::from_points(&points, 0.9).count_components(), 3);
        assert_eq!(VietorisRips::from_points(&points, 1.1).count_components(), 1);
    }

    #[test]
    fn test_tetrahedron_expansion() {
        // Regular tetrahedron, all edges length 1
        let dm = Array2::from_shape_fn((4, 4), |(i, j)| if i == j { 0.0 } else { 1.0 });
        let vr = VietorisRips::new(dm, 1.5);

        let all = vr.expand(3, usize::MAX).unwrap();
        // 4 vertices + 6 edges + 4 triangles + 1 tetrahedron
        assert_eq!(all.len(), 15);
        assert_eq!(all.iter().filter(|s| s.dimension() == 3).count(), 1);

        let capped = vr.expand(2, usize::MAX).unwrap();
        assert_eq!(capped.len(), 14);
    }

    #[test]
    fn test_filtration_is_longest_edge() {
        let points = array![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 2.0, 0.0]
        ];
        let vr = VietorisRips::from_points(&points, 3.0);
        let all = vr.expand(2, usize::MAX).unwrap();
        let triangle = all.iter().find(|s| s.dimension() == 2).unwrap();
        assert!((triangle.filtration - 5.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_simplex_ceiling() {
        let dm = Array2::from_shape_fn((6, 6), |(i, j)| if i == j { 0.0 } else { 0.1 });
        let vr = VietorisRips::new(dm, 1.0);
        assert!(vr.expand(3, 10).is_none());
    }
}
