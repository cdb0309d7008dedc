//! Escape-model error type.

use thiserror::Error;

use cordon_core::NodeId;
use cordon_graph::GraphError;
use cordon_route::RouteError;

/// Errors produced by `cordon-model`.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Route(#[from] RouteError),

    /// Routing reported a path through a node without a travel time for it.
    /// Terminal; the two maps are built together and must stay in sync.
    #[error("routing produced a path through node {0} but no travel time for it")]
    MissingTime(NodeId),

    /// A control node was requested for a node the escape tree never saw.
    #[error("node {0} is not part of the escape tree")]
    NotInTree(NodeId),
}

pub type ModelResult<T> = Result<T, ModelError>;
