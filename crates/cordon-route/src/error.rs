//! Routing-subsystem error type.

use thiserror::Error;

use cordon_graph::GraphError;

/// Errors produced by `cordon-route`.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Any graph inconsistency surfaced while routing (missing edges,
    /// snapping on an empty graph).  Terminal; indicates a bug or corrupt
    /// network data, not a recoverable state.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type RouteResult<T> = Result<T, RouteError>;
