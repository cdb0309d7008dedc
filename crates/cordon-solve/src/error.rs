//! Optimizer error type.

use thiserror::Error;

use cordon_core::{NodeId, VehicleId};
use cordon_graph::GraphError;
use cordon_model::ModelError;

/// Errors produced by `cordon-solve`.
#[derive(Debug, Error)]
pub enum SolveError {
    /// The solver ended without any acceptable solution.  With a pure
    /// at-most-one model this only happens on a genuinely broken instance,
    /// and it is fatal when it does.
    #[error("no interception plan was found")]
    NoPlanFound,

    /// The solver chose an assignment the vehicle has no route for.
    /// Terminal; feasibility pruning should have excluded it.
    #[error("vehicle {0} has no path to assigned node {1}")]
    MissingPath(VehicleId, NodeId),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type SolveResult<T> = Result<T, SolveError>;
