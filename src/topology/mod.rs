//! Topology Module: Persistent Homology and Simplicial Complexes
//!
//! Implements the mathematical structures for topological data analysis:
//! - Vietoris-Rips filtration of a 3D point cloud
//! - Exact persistent homology via boundary matrix reduction
//! - Persistence diagram value type with Betti-grouped ordering
//! - Bottleneck distance between diagrams
//!
//! ## Mathematical Background
//!
//! For a point cloud X (atom positions of one cage), we construct a
//! filtration of simplicial complexes VR_ε(X) indexed by the scale
//! parameter ε. The persistent homology tracks the birth and death of
//! topological features (connected components, loops, voids) across this
//! filtration. Cages are characterised by their loops (β₁) and, above all,
//! by the enclosed cavity (β₂).

mod vietoris_rips;
mod persistence;
mod diagram;
mod bottleneck;

pub use vietoris_rips::{Simplex, VietorisRips};
pub use persistence::{compute_persistence, ComputeLimits, PersistenceFailure};
pub use diagram::{PersistenceDiagram, PersistenceInterval};
pub use bottleneck::bottleneck_distance;
