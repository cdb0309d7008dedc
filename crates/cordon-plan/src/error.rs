//! Request-boundary error type.
//!
//! `PlanError` is what the enclosing request handler sees.  `InvalidInput`
//! is the caller's fault and worth a 4xx; everything else is terminal for
//! the request and wraps into a uniform 5xx-style response upstream.

use thiserror::Error;

use cordon_geom::GeomError;
use cordon_graph::GraphError;
use cordon_model::ModelError;
use cordon_route::RouteError;
use cordon_solve::SolveError;

/// Errors produced by `cordon-plan`.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The request itself is unusable: LKP outside the operational zone,
    /// duplicated vehicle IDs, malformed coordinates.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    Geom(#[from] GeomError),
}

pub type PlanResult<T> = Result<T, PlanError>;
