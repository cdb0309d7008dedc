//! Pursuer vehicle state.

use geo::Point;
use rustc_hash::FxHashSet;

use cordon_core::{NodeId, VehicleId};
use cordon_graph::Position;
use cordon_route::ReachSet;

// ── VehicleStatus ─────────────────────────────────────────────────────────────

/// Lifecycle of a vehicle within one planning request.  The wire format
/// carries the discriminant, so the numbering is part of the contract.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum VehicleStatus {
    /// Can take part in the plan.
    Assignable = 0,
    /// Within the adversary's reachable disk; excluded from planning.
    TooCloseToLkp = 1,
    /// Reported by the fleet as out of service.
    Unavailable = 2,
    /// Was assignable and received an assignment.
    Assigned = 3,
    /// Was assignable but the plan has no use for it.
    Unassigned = 4,
}

impl VehicleStatus {
    pub fn as_int(self) -> u8 {
        self as u8
    }
}

// ── Vehicle ───────────────────────────────────────────────────────────────────

/// One pursuer vehicle: requested coordinate, snapped position, status, and
/// its own routing results once computed.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    /// The coordinate the fleet reported.
    pub point: Point<f64>,
    /// On-node snapped position; populated lazily by the planner.
    pub position: Option<Position>,
    pub status: VehicleStatus,
    /// Travel times and paths from `position`; populated only for vehicles
    /// that survive the pre-filter.
    pub reach: Option<ReachSet>,
}

impl Vehicle {
    pub fn new(id: VehicleId, point: Point<f64>) -> Self {
        Self { id, point, position: None, status: VehicleStatus::Assignable, reach: None }
    }

    /// Travel time to `n`, or `None` when unrouted or unreachable.
    pub fn time_to(&self, n: NodeId) -> Option<f64> {
        self.reach.as_ref()?.time_to(n)
    }

    /// Path to `n` from this vehicle's snapped position.
    pub fn path_to(&self, n: NodeId) -> Option<&[NodeId]> {
        self.reach.as_ref()?.path_to(n)
    }

    /// Travel-time matrix `[vehicle][node]` for the optimizer.  Unreachable
    /// nodes read as `+∞`, which the feasibility pre-check then prunes.
    pub fn time_matrix(vehicles: &[&Vehicle], nodes: &[NodeId]) -> Vec<Vec<f64>> {
        vehicles
            .iter()
            .map(|vehicle| {
                nodes.iter().map(|&n| vehicle.time_to(n).unwrap_or(f64::INFINITY)).collect()
            })
            .collect()
    }
}

/// Check that no two vehicles share an ID; returns the first collision.
pub fn find_duplicate_id(vehicles: &[Vehicle]) -> Option<VehicleId> {
    let mut seen: FxHashSet<VehicleId> = FxHashSet::default();
    vehicles.iter().map(|v| v.id).find(|&id| !seen.insert(id))
}
