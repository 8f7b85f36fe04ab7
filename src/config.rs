//! Analysis configuration
//!
//! Defaults reproduce the reference cage workflow: Rips complexes up to
//! 3-simplices with edges no longer than 0.6 (fractional units), 100-sample
//! landscapes of Betti-2 features, and bottleneck comparisons in dimensions
//! 1 and 2.

use crate::error::{Result, TdaError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Vietoris-Rips filtration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltrationConfig {
    /// Maximum edge length of the Rips complex
    pub max_edge_length: f64,
    /// Maximum simplex dimension (homology is reported below this)
    pub max_dimension: usize,
    /// Ceiling on the number of simplices before a structure is abandoned
    pub max_simplices: usize,
    /// Per-structure wall-clock budget in seconds
    pub timeout_secs: Option<f64>,
}

impl Default for FiltrationConfig {
    fn default() -> Self {
        Self {
            max_edge_length: 0.6,
            max_dimension: 3,
            max_simplices: 5_000_000,
            timeout_secs: None,
        }
    }
}

/// Landscape vectorisation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LandscapeConfig {
    /// Samples per landscape function
    pub resolution: usize,
    /// Number of landscape functions λ₁..λₖ
    pub num_landscapes: usize,
    /// Betti dimension summarised by the stored landscape
    pub dimension: usize,
    /// Dimension used when `dimension` has no finite intervals
    pub fallback_dimension: usize,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            resolution: 100,
            num_landscapes: 5,
            dimension: 2,
            fallback_dimension: 1,
        }
    }
}

/// Top-level configuration for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub filtration: FiltrationConfig,
    pub landscape: LandscapeConfig,
    /// Homology dimensions for which a distance matrix is built
    pub comparison_dimensions: Vec<usize>,
    /// Structures whose maximum Betti number is below this are segregated
    pub required_betti: usize,
    /// Fraction of the best match's similarity a structure must reach
    pub similarity_threshold: f64,
    /// Worker threads (all cores when unset)
    pub threads: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            filtration: FiltrationConfig::default(),
            landscape: LandscapeConfig::default(),
            comparison_dimensions: vec![1, 2],
            required_betti: 2,
            similarity_threshold: 0.9,
            threads: None,
        }
    }
}

impl AnalysisConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let f = &self.filtration;
        if !(f.max_edge_length.is_finite() && f.max_edge_length > 0.0) {
            return Err(TdaError::config(format!(
                "max_edge_length must be positive and finite, got {}",
                f.max_edge_length
            )));
        }
        if f.max_dimension == 0 {
            return Err(TdaError::config("max_dimension must be at least 1"));
        }
        if f.max_simplices == 0 {
            return Err(TdaError::config("max_simplices must be positive"));
        }
        if let Some(t) = f.timeout_secs {
            if !(t.is_finite() && t > 0.0) {
                return Err(TdaError::config(format!("timeout_secs must be positive, got {}", t)));
            }
        }

        let l = &self.landscape;
        if l.resolution < 2 || l.num_landscapes == 0 {
            return Err(TdaError::config(
                "landscape needs resolution >= 2 and at least one function",
            ));
        }

        if self.comparison_dimensions.is_empty() {
            return Err(TdaError::config("no comparison dimensions requested"));
        }
        let t = self.similarity_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(TdaError::config(format!(
                "similarity_threshold must lie in (0, 1], got {}",
                t
            )));
        }
        if self.threads == Some(0) {
            return Err(TdaError::config("threads must be positive"));
        }
        Ok(())
    }
}
