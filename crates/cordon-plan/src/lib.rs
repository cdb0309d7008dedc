//! `cordon-plan` — request orchestration for the interception planner.
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`planner`] | `Planner`, `PlanOutcome` — the full per-request pipeline |
//! | [`dto`]     | `PlanRequest`/`PlanResponse` wire types               |
//! | [`stats`]   | `PlanStats` aggregation                               |
//! | [`error`]   | `PlanError`, `PlanResult<T>`                          |
//!
//! # Usage
//!
//! ```ignore
//! let graph = cordon_graph::load_graph(Path::new("data/networks"), "noailles")?;
//! let planner = Planner::new(&graph, PlannerConfig::default());
//! let request: PlanRequest = serde_json::from_slice(&body)?;
//! let response = handle_request(&planner, &request)?;
//! ```

pub mod dto;
pub mod error;
pub mod planner;
pub mod stats;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use dto::{LatLng, PlanRequest, PlanResponse, VehicleDto, VehicleStateDto};
pub use error::{PlanError, PlanResult};
pub use planner::{PlanOutcome, Planner};
pub use stats::PlanStats;

/// Run one request through `planner` and serialize the outcome.
///
/// This is the seam the HTTP adapter calls: everything below it is pure
/// domain code, everything above it is transport.
pub fn handle_request(planner: &Planner<'_>, request: &PlanRequest) -> PlanResult<PlanResponse> {
    let outcome = planner.plan(
        request.lkp.to_point(),
        request.time_elapsed as f64,
        request.to_vehicles(),
    )?;
    PlanResponse::from_outcome(&outcome, planner.graph())
}
