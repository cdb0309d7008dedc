//! `cordon-solve` — the interception optimizer.
//!
//! | Module        | Contents                                             |
//! |---------------|------------------------------------------------------|
//! | [`cp`]        | `CpModel`, `CpSolver` — boolean at-most-one solver   |
//! | [`optimizer`] | decision matrix, constraints, `Plan` construction    |
//! | [`error`]     | `SolveError`, `SolveResult<T>`                       |

pub mod cp;
pub mod error;
pub mod optimizer;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cp::{BoolVar, CpModel, CpSolution, CpSolver, SolveStatus};
pub use error::{SolveError, SolveResult};
pub use optimizer::{Plan, VehicleAssignment, plan_interception};
