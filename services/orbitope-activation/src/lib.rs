//! Activation handlers for sub-orbitope symmetry
//!
//! A handler inspects the partial fixing at a search node and reports the
//! submatrices of a registered orbitope constraint that have become
//! symmetric on their own:
//! 1. `colorcomp` splits a colouring graph into components
//! 2. `makespan` groups machines by equal fixed makespan
//! 3. `suborbitope` matches columns with equally fixed trailing runs

pub mod bounds;
pub mod config;
pub mod detectors;
pub mod error;
pub mod handler;
pub mod matrix;
pub mod payload;
pub mod scenario;
pub mod submatrix;

pub use bounds::{BoundOracle, Fixing, NodeFixings, SharedTransform, VarMapping, VarRef, VarTransform};
pub use detectors::include_default_handlers;
pub use error::{ActivationError, Result};
pub use handler::{ActivationHandler, HandlerRecord, HandlerRegistry};
pub use payload::{ConstraintId, Payload, PayloadMap};
pub use submatrix::{OrbitopeKind, Submatrix, SubmatrixList};
