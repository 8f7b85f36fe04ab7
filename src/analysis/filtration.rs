//! Filtration Engine
//!
//! Runs the Rips filtration and persistence computation for one point cloud
//! and derives its landscape vector. The batch driver fans structures out
//! over the rayon pool; every structure ends up with a record, a timing and
//! (when computed) a landscape, whatever happens to its neighbours.

use super::store::StructureRecord;
use crate::config::{AnalysisConfig, FiltrationConfig, LandscapeConfig};
use crate::error::{Result, TdaError};
use crate::information::PersistenceLandscape;
use crate::io::CoordinateSource;
use crate::topology::{compute_persistence, ComputeLimits, PersistenceDiagram, VietorisRips};
use ndarray::Array2;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Sentinel timing written when coordinates were missing
pub const TIMING_NA: &str = "NA";

/// Diagram of one structure with its computation time
#[derive(Debug, Clone)]
pub struct FiltrationOutput {
    pub diagram: PersistenceDiagram,
    pub elapsed: Duration,
}

/// Computation time entry of the times table
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timing {
    Seconds(f64),
    /// No coordinates, nothing was timed
    NotAvailable,
    Failed,
}

impl Timing {
    pub fn field(&self) -> String {
        match self {
            Timing::Seconds(s) => s.to_string(),
            Timing::NotAvailable => TIMING_NA.to_string(),
            Timing::Failed => super::store::ERROR_SENTINEL.to_string(),
        }
    }
}

/// Everything produced for one identifier of a batch
#[derive(Debug, Clone)]
pub struct StructureOutcome {
    pub record: StructureRecord,
    pub timing: Timing,
    pub landscape: Option<Vec<f64>>,
}

/// Destination of batch outcomes, called from the worker threads
pub trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: &StructureOutcome) -> Result<()>;
}

/// Rips filtration + persistent homology for cage point clouds
#[derive(Debug, Clone)]
pub struct FiltrationEngine {
    filtration: FiltrationConfig,
    landscape: LandscapeConfig,
}

impl FiltrationEngine {
    pub fn new(filtration: FiltrationConfig, landscape: LandscapeConfig) -> Self {
        Self { filtration, landscape }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.filtration.clone(), config.landscape.clone())
    }

    /// Compute the persistence diagram of a 3D point cloud.
    ///
    /// Resource ceilings, bad input and panics inside the computation all
    /// come back as `ComputationFailure` for `id`.
    pub fn compute(&self, id: &str, points: &Array2<f64>) -> Result<FiltrationOutput> {
        if points.ncols() != 3 {
            return Err(TdaError::computation(
                id,
                format!("expected 3 coordinate columns, found {}", points.ncols()),
            ));
        }
        if points.iter().any(|v| !v.is_finite()) {
            return Err(TdaError::computation(id, "non-finite coordinate"));
        }

        let start = Instant::now();
        let limits = ComputeLimits {
            max_simplices: self.filtration.max_simplices,
            deadline: self
                .filtration
                .timeout_secs
                .map(|s| start + Duration::from_secs_f64(s)),
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let vr = VietorisRips::from_points(points, self.filtration.max_edge_length);
            debug!(
                id = %id,
                n_points = vr.n_points(),
                n_edges = vr.edges().len(),
                components = vr.count_components(),
                "Rips complex built"
            );
            compute_persistence(&vr, self.filtration.max_dimension, &limits)
        }));
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(diagram)) => Ok(FiltrationOutput { diagram, elapsed }),
            Ok(Err(failure)) => Err(TdaError::computation(id, failure.to_string())),
            Err(_) => Err(TdaError::computation(id, "persistence computation panicked")),
        }
    }

    /// Finite `(birth, death)` intervals of one homology dimension.
    pub fn intervals_in_dimension(diagram: &PersistenceDiagram, dimension: usize) -> Vec<(f64, f64)> {
        diagram.finite_intervals(dimension)
    }

    /// Landscape vector of the configured dimension.
    ///
    /// When that dimension has no finite intervals the fallback dimension's
    /// landscape is used, followed by a zero block of the same length.
    pub fn landscape(&self, diagram: &PersistenceDiagram) -> Vec<f64> {
        let cfg = &self.landscape;
        let primary = Self::intervals_in_dimension(diagram, cfg.dimension);
        if let Some(l) = PersistenceLandscape::from_intervals(&primary, cfg.num_landscapes, cfg.resolution) {
            return l.into_vec();
        }

        let lower = Self::intervals_in_dimension(diagram, cfg.fallback_dimension);
        let lower = PersistenceLandscape::from_intervals(&lower, cfg.num_landscapes, cfg.resolution)
            .unwrap_or_else(|| PersistenceLandscape::zeros(cfg.num_landscapes, cfg.resolution));
        let empty = PersistenceLandscape::zeros(cfg.num_landscapes, cfg.resolution);

        let mut values = lower.into_vec();
        values.extend_from_slice(empty.as_slice());
        values
    }

    /// Load, compute and summarise one identifier. Never fails the caller.
    pub fn process<S: CoordinateSource + ?Sized>(&self, id: &str, source: &S) -> StructureOutcome {
        let points = match source.load(id) {
            Ok(Some(points)) => points,
            Ok(None) => {
                warn!(id = %id, "coordinate file not found");
                return StructureOutcome {
                    record: StructureRecord::missing(id),
                    timing: Timing::NotAvailable,
                    landscape: None,
                };
            }
            Err(e) => {
                warn!(id = %id, error = %e, "could not read coordinates");
                return StructureOutcome {
                    record: StructureRecord::failed(id, e.to_string()),
                    timing: Timing::Failed,
                    landscape: None,
                };
            }
        };

        match self.compute(id, &points) {
            Ok(out) => {
                info!(
                    id = %id,
                    n_intervals = out.diagram.len(),
                    elapsed_secs = out.elapsed.as_secs_f64(),
                    "persistence calculated"
                );
                let landscape = self.landscape(&out.diagram);
                StructureOutcome {
                    record: StructureRecord::computed(id, out.diagram),
                    timing: Timing::Seconds(out.elapsed.as_secs_f64()),
                    landscape: Some(landscape),
                }
            }
            Err(e) => {
                warn!(id = %id, error = %e, "persistence computation failed");
                StructureOutcome {
                    record: StructureRecord::from_error(id, &e),
                    timing: Timing::Failed,
                    landscape: None,
                }
            }
        }
    }

    /// Process every identifier in parallel, handing each outcome to `sink`
    /// as soon as it is ready. Returns the number of computed diagrams.
    ///
    /// Only a sink error stops the batch; per-structure failures are
    /// recorded like any other outcome.
    pub fn process_batch_into<S, K>(&self, ids: &[String], source: &S, sink: &K) -> Result<usize>
    where
        S: CoordinateSource + ?Sized,
        K: OutcomeSink + ?Sized,
    {
        let start = Instant::now();
        let computed = AtomicUsize::new(0);

        ids.par_iter().try_for_each(|id| {
            let outcome = self.process(id, source);
            if outcome.record.diagram().is_some() {
                computed.fetch_add(1, Ordering::Relaxed);
            }
            sink.record(&outcome)
        })?;

        let computed = computed.into_inner();
        info!(
            total = ids.len(),
            computed,
            failed = ids.len() - computed,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "filtration batch complete"
        );
        Ok(computed)
    }
}
