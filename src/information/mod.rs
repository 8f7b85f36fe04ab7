//! Information Module: Vector Summaries of Persistence Diagrams
//!
//! Persistence landscapes turn a diagram restricted to one Betti dimension
//! into a fixed-length real vector, so cages can also be compared in a
//! plain vector space. One landscape artifact is stored per processed
//! structure.

mod landscape;

pub use landscape::{load_landscape, save_landscape, PersistenceLandscape};
