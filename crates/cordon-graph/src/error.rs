//! Graph-subsystem error type.
//!
//! Lookup failures on edges that ought to exist signal an inconsistent graph
//! (a programming bug or a corrupt network file), not a recoverable state;
//! callers propagate them with `?` all the way to the request boundary.

use thiserror::Error;

use cordon_core::NodeId;

/// Errors produced by `cordon-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} not found in graph")]
    MissingNode(NodeId),

    #[error("no edge from {0} to {1}")]
    MissingEdge(NodeId, NodeId),

    #[error("node {0} has no outgoing edge to anchor a position")]
    NoSuccessor(NodeId),

    #[error("edge cursor {ec} outside [0, 1] on edge {u}->{v}")]
    EdgeCursorOutOfRange { u: NodeId, v: NodeId, ec: f64 },

    #[error("graph has no edges to snap onto")]
    EmptyGraph,

    #[error("node {node} is not an endpoint of edge {u}->{v}")]
    EndpointNotOnEdge { u: NodeId, v: NodeId, node: NodeId },

    #[error("position on edge {u}->{v} is not adjacent to path start {start}")]
    DetachedPrefix { u: NodeId, v: NodeId, start: NodeId },

    #[error("cannot build a polyline from an empty node path")]
    EmptyPath,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GraphML parse error: {0}")]
    Parse(String),
}

pub type GraphResult<T> = Result<T, GraphError>;
