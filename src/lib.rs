//! A MarkovJunior-style probabilistic grid-rewriting interpreter: a
//! grid, an alphabet, a tree of rule-application nodes, and a PRNG-driven
//! step loop that turns a compiled [`model::ModelSpec`] into a stream of
//! [`snapshot::Snapshot`]s.

pub mod changelog;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod interpreter;
pub mod logging;
pub mod model;
pub mod node;
pub mod observation;
pub mod resources;
pub mod rng;
pub mod rule;
pub mod search;
pub mod snapshot;
pub mod symmetry;

pub use config::RunConfig;
pub use error::Error;
pub use grid::Grid;
pub use interpreter::Interpreter;
pub use model::ModelSpec;
pub use resources::{MemoryResources, ResourceLoader};
pub use snapshot::{Snapshot, SnapshotIter};
