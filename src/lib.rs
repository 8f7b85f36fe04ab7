//! # cage-tda
//!
//! Structural Similarity of Molecular Cages via Persistent Homology
//!
//! ## Overview
//!
//! Candidate cage structures are given as 3D atomic point clouds. Each cloud
//! is summarised by its persistence diagram: the loops (β₁) and enclosed
//! cavities (β₂) that appear and disappear as the Vietoris-Rips scale grows.
//! Two cages are compared through the bottleneck distance between their
//! diagrams, dimension by dimension, and a reference cage is matched to the
//! structures "close enough" to its nearest distinct neighbour.
//!
//! ### Pipeline
//!
//! 1. **Filtration**: Rips complex up to the configured edge length and
//!    simplex dimension, reduced over Z/2 into a persistence diagram.
//!    A landscape vector is derived from the β₂ features (β₁ as fallback).
//!
//! 2. **Ingestion**: stored diagram text is repaired when truncated, parsed
//!    by a strict grammar and canonicalised to Betti-grouped order.
//!
//! 3. **Comparison**: all-pairs bottleneck distances, one matrix per
//!    homology dimension, over the cages that actually possess a cavity.
//!
//! 4. **Ranking**: distances of one row are normalised to [0, 1] and
//!    thresholded against the best distinct match.
//!
//! Per-structure failures (missing coordinates, exhausted resources,
//! unrecoverable diagram text, absent Betti dimension) are recorded and
//! never abort a batch.
//!
//! ## References
//!
//! - Edelsbrunner & Harer, "Computational Topology" (2010)
//! - Cohen-Steiner, Edelsbrunner & Harer, "Stability of Persistence
//!   Diagrams", DCG 37 (2007) - bottleneck distance
//! - Bubenik, "Statistical Topological Data Analysis using Persistence
//!   Landscapes", JMLR 16 (2015)

pub mod error;
pub mod config;
pub mod topology;
pub mod information;
pub mod analysis;
pub mod io;

pub use error::{Result, TdaError};
pub use config::{AnalysisConfig, FiltrationConfig, LandscapeConfig};

// Re-exports from topology
pub use topology::{
    bottleneck_distance,
    compute_persistence,
    ComputeLimits,
    PersistenceDiagram,
    PersistenceFailure,
    PersistenceInterval,
    Simplex,
    VietorisRips,
};

// Re-exports from information
pub use information::{load_landscape, save_landscape, PersistenceLandscape};

// Re-exports from analysis
pub use analysis::{
    // Filtration
    FiltrationEngine,
    OutcomeSink,
    StructureOutcome,
    Timing,
    // Repair and storage
    recover_diagram,
    DiagramStore,
    StructureRecord,
    StructureStatus,
    // Comparison
    CheckpointSink,
    DistanceMatrix,
    DistanceMatrixBuilder,
    DistanceSink,
    MemorySink,
    SimilarityRanker,
    SimilaritySet,
};

// Re-exports from io
pub use io::{BatchWriter, CoordinateSource, CsvDirectory};
