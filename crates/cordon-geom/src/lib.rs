//! `cordon-geom` — visualization geometry for interception plans.
//!
//! | Module            | Contents                                          |
//! |-------------------|---------------------------------------------------|
//! | [`proj`]          | `LocalProjection` (lon/lat ↔ metric plane)        |
//! | [`balance`]       | 2-D PCA, `balanced_polygon`                       |
//! | [`plan_geometry`] | `PlanGeometry::derive` — isochrone + path slices  |
//! | [`error`]         | `GeomError`, `GeomResult<T>`                      |

pub mod balance;
pub mod error;
pub mod plan_geometry;
pub mod proj;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use balance::{PrincipalAxes, balanced_polygon, principal_axes};
pub use error::{GeomError, GeomResult};
pub use plan_geometry::PlanGeometry;
pub use proj::LocalProjection;
