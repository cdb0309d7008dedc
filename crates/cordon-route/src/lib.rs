//! `cordon-route` — shortest-path routing from mid-edge positions.
//!
//! | Module     | Contents                                    |
//! |------------|---------------------------------------------|
//! | [`router`] | `Router`, `ReachSet`                        |
//! | [`error`]  | `RouteError`, `RouteResult<T>`              |

pub mod error;
pub mod router;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{RouteError, RouteResult};
pub use router::{ReachSet, Router};
