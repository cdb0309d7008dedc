//! `cordon-graph` — road-network multigraph, spatial indexing, and positions.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`graph`]    | `RoadGraph` (adjacency + R-trees), `RoadGraphBuilder`     |
//! | [`position`] | `Position` — a point on the graph as `(u, v, ec)`         |
//! | [`polyline`] | planar interpolation, projection, substrings, merging     |
//! | [`highway`]  | OSM highway-class ranking                                 |
//! | [`graphml`]  | GraphML network loader                                    |
//! | [`error`]    | `GraphError`, `GraphResult<T>`                            |

pub mod error;
pub mod graph;
pub mod graphml;
pub mod highway;
pub mod polyline;
pub mod position;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{GraphError, GraphResult};
pub use graph::{EdgeAttrs, NodeData, RoadGraph, RoadGraphBuilder};
pub use graphml::{load_graph, load_graphml, load_graphml_file};
pub use highway::{highway_rank, parse_highway_attr};
pub use position::Position;
