//! `cordon-core` — foundational types for the `cordon` interception planner.
//!
//! This crate is a dependency of every other `cordon-*` crate.  It
//! intentionally has no `cordon-*` dependencies and no external ones.
//!
//! # What lives here
//!
//! | Module     | Contents                                  |
//! |------------|-------------------------------------------|
//! | [`ids`]    | `NodeId`, `VehicleId`                     |
//! | [`config`] | `PlannerConfig` and its default constants |

pub mod config;
pub mod ids;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::PlannerConfig;
pub use ids::{NodeId, VehicleId};
