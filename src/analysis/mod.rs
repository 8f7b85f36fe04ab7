//! Analysis Module: from point clouds to similarity sets
//!
//! - `filtration`: persistence diagrams and landscapes per structure
//! - `repair`: recovery of truncated diagram text
//! - `store`: identifier → diagram mapping for one run
//! - `distance`: pairwise bottleneck matrices with checkpointing
//! - `similarity`: threshold-based selection of close structures

mod distance;
mod filtration;
mod repair;
mod similarity;
mod store;

pub use distance::{
    matrices_from_records, read_checkpoint, require_distance, CheckpointRecord, CheckpointSink, DistanceMatrix,
    DistanceMatrixBuilder, DistanceSink, MemorySink,
};
pub use filtration::{FiltrationEngine, FiltrationOutput, OutcomeSink, StructureOutcome, Timing, TIMING_NA};
pub use repair::{parse_diagram, recover_diagram, repair_truncated, strip_infinite_placeholders, DiagramTextError};
pub use similarity::{RankedEntry, SimilarityRanker, SimilaritySet};
pub use store::{DiagramStore, StructureRecord, StructureStatus, ERROR_SENTINEL, MISSING_SENTINEL};
