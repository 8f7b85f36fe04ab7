//! Persistence Landscapes: Functional Summaries of Persistence Diagrams
//!
//! Persistence landscapes provide a stable, vectorizable representation
//! of persistence diagrams suitable for statistical analysis. The k-th
//! landscape function λₖ(t) is the k-th largest tent height at t.
//!
//! Sampling follows the usual convention: `resolution` evenly spaced points
//! spanning [min birth, max death] of the finite intervals, with tent
//! heights scaled by √2. The flattened vector stores λ₁ first.

use crate::error::Result;
use std::path::Path;

/// Sampled persistence landscape
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceLandscape {
    /// λ₁..λₖ sampled on the grid, concatenated
    values: Vec<f64>,
    /// Number of landscape functions
    pub k_max: usize,
    /// Grid resolution
    pub resolution: usize,
}

impl PersistenceLandscape {
    /// Sample the landscape of finite `(birth, death)` intervals.
    ///
    /// Returns `None` when there is no finite interval to summarise.
    pub fn from_intervals(intervals: &[(f64, f64)], k_max: usize, resolution: usize) -> Option<Self> {
        let finite: Vec<(f64, f64)> = intervals
            .iter()
            .copied()
            .filter(|(b, d)| b.is_finite() && d.is_finite())
            .collect();

        if finite.is_empty() || resolution == 0 {
            return None;
        }

        // Determine grid range
        let min_t = finite.iter().map(|i| i.0).fold(f64::INFINITY, f64::min);
        let max_t = finite.iter().map(|i| i.1).fold(f64::NEG_INFINITY, f64::max);
        let dt = if resolution > 1 {
            (max_t - min_t) / (resolution - 1) as f64
        } else {
            0.0
        };

        let mut values = vec![0.0; k_max * resolution];
        let mut heights: Vec<f64> = Vec::with_capacity(finite.len());

        for i in 0..resolution {
            let t = min_t + i as f64 * dt;

            heights.clear();
            heights.extend(
                finite
                    .iter()
                    .map(|&(birth, death)| tent_function(t, birth, death))
                    .filter(|&h| h > 0.0),
            );

            // Sort descending
            heights.sort_by(|a, b| b.total_cmp(a));

            for (k, &h) in heights.iter().take(k_max).enumerate() {
                values[k * resolution + i] = std::f64::consts::SQRT_2 * h;
            }
        }

        Some(Self {
            values,
            k_max,
            resolution,
        })
    }

    /// The all-zero landscape of an empty diagram
    pub fn zeros(k_max: usize, resolution: usize) -> Self {
        Self {
            values: vec![0.0; k_max * resolution],
            k_max,
            resolution,
        }
    }

    /// Samples of λₖ₊₁ (zero-based `k`)
    pub fn function(&self, k: usize) -> &[f64] {
        if k >= self.k_max {
            return &[];
        }
        &self.values[k * self.resolution..(k + 1) * self.resolution]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

/// Tent function for persistence interval
fn tent_function(t: f64, birth: f64, death: f64) -> f64 {
    let mid = (birth + death) / 2.0;

    if t < birth || t > death {
        0.0
    } else if t <= mid {
        t - birth
    } else {
        death - t
    }
}

/// Write a landscape vector as a binary artifact.
pub fn save_landscape(path: impl AsRef<Path>, values: &[f64]) -> Result<()> {
    let bytes = bincode::serialize(values)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Read a landscape vector written by [`save_landscape`].
pub fn load_landscape(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    let bytes = std::fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}
