//! Geometry-subsystem error type.

use thiserror::Error;

use cordon_graph::GraphError;

/// Errors produced by `cordon-geom`.
#[derive(Debug, Error)]
pub enum GeomError {
    /// Graph inconsistencies surfaced while assembling geometry.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type GeomResult<T> = Result<T, GeomError>;
