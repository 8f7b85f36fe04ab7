//! Bottleneck Distance between Persistence Diagrams
//!
//!   d_B(D₁, D₂) = inf_γ sup_p ‖p − γ(p)‖_∞
//!
//! where γ ranges over bijections between D₁ and D₂, each augmented with
//! every point of the diagonal.
//!
//! Finite points are matched exactly: the answer is one of the O(nm) candidate
//! values (point-to-point ℓ∞ distances and point-to-diagonal distances), so
//! we binary search the sorted candidates for the smallest one admitting a
//! perfect matching in the threshold graph.
//!
//! Essential points (infinite death) can only be matched with each other: if
//! the counts differ the distance is +∞, otherwise sorted births are paired.

/// Bottleneck distance between two interval lists.
pub fn bottleneck_distance(a: &[(f64, f64)], b: &[(f64, f64)]) -> f64 {
    let (finite_a, essential_a) = split_essential(a);
    let (finite_b, essential_b) = split_essential(b);

    let essential = essential_distance(essential_a, essential_b);
    if essential.is_infinite() {
        return essential;
    }

    finite_distance(&finite_a, &finite_b).max(essential)
}

fn split_essential(points: &[(f64, f64)]) -> (Vec<(f64, f64)>, Vec<f64>) {
    let mut finite = Vec::with_capacity(points.len());
    let mut essential = Vec::new();
    for &(b, d) in points {
        if d.is_infinite() {
            essential.push(b);
        } else {
            finite.push((b, d));
        }
    }
    (finite, essential)
}

fn essential_distance(mut a: Vec<f64>, mut b: Vec<f64>) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);
    a.iter()
        .zip(&b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// L-infinity distance between points
fn l_inf(p: (f64, f64), q: (f64, f64)) -> f64 {
    (p.0 - q.0).abs().max((p.1 - q.1).abs())
}

/// Distance to diagonal
fn diag_dist(p: (f64, f64)) -> f64 {
    (p.1 - p.0) / 2.0
}

fn finite_distance(a: &[(f64, f64)], b: &[(f64, f64)]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }

    let mut candidates: Vec<f64> = Vec::with_capacity(a.len() * b.len() + a.len() + b.len());
    for &p in a {
        for &q in b {
            candidates.push(l_inf(p, q));
        }
    }
    candidates.extend(a.iter().map(|&p| diag_dist(p)));
    candidates.extend(b.iter().map(|&q| diag_dist(q)));
    candidates.sort_by(f64::total_cmp);
    candidates.dedup();

    // Matching everything to the diagonal succeeds at the largest diagonal
    // distance, so the last candidate is always feasible.
    let (mut lo, mut hi) = (0, candidates.len() - 1);
    while lo < hi {
        let mid = (lo + hi) / 2;
        if has_perfect_matching(a, b, candidates[mid]) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    candidates[lo]
}

/// Perfect matching test on the threshold graph.
///
/// Left vertices are the points of `a` followed by diagonal copies of `b`;
/// right vertices are the points of `b` followed by diagonal copies of `a`.
fn has_perfect_matching(a: &[(f64, f64)], b: &[(f64, f64)], r: f64) -> bool {
    let (n, m) = (a.len(), b.len());
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n + m];

    for (i, &p) in a.iter().enumerate() {
        for (j, &q) in b.iter().enumerate() {
            if l_inf(p, q) <= r {
                adj[i].push(j);
            }
        }
        if diag_dist(p) <= r {
            adj[i].push(m + i);
        }
    }
    for (j, &q) in b.iter().enumerate() {
        let row = &mut adj[n + j];
        if diag_dist(q) <= r {
            row.push(j);
        }
        // Diagonal-to-diagonal matches are free
        row.extend(m..m + n);
    }

    let mut match_right: Vec<Option<usize>> = vec![None; n + m];
    let mut visited = vec![false; n + m];
    for left in 0..n + m {
        visited.iter_mut().for_each(|v| *v = false);
        if !augment(left, &adj, &mut visited, &mut match_right) {
            return false;
        }
    }
    true
}

/// Kuhn's augmenting path search
fn augment(
    left: usize,
    adj: &[Vec<usize>],
    visited: &mut [bool],
    match_right: &mut [Option<usize>],
) -> bool {
    for &right in &adj[left] {
        if visited[right] {
            continue;
        }
        visited[right] = true;
        let free = match match_right[right] {
            None => true,
            Some(other) => augment(other, adj, visited, match_right),
        };
        if free {
            match_right[right] = Some(left);
            return true;
        }
    }
    false
}
