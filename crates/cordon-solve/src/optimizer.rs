//! Vehicle-to-node assignment optimization.
//!
//! Builds the vehicle×candidate boolean decision matrix, posts the three
//! exclusivity constraints, maximizes the blocked score, and turns the
//! solution into a [`Plan`] — updating vehicle statuses and marking control
//! nodes on the escape model as it goes.

use geo::{LineString, Point};
use log::info;

use cordon_core::{NodeId, PlannerConfig, VehicleId};
use cordon_graph::RoadGraph;
use cordon_model::{EscapeModel, Vehicle, VehicleStatus};

use crate::cp::{BoolVar, CpModel, CpSolver, SolveStatus};
use crate::error::{SolveError, SolveResult};

// ── Plan ──────────────────────────────────────────────────────────────────────

/// One vehicle sent to one interception node.
#[derive(Debug, Clone)]
pub struct VehicleAssignment {
    pub vehicle_id: VehicleId,
    /// Graph node the vehicle must reach.
    pub destination_node: NodeId,
    pub destination_point: Point<f64>,
    /// Pursuer travel time to the destination, seconds.
    pub time_to_dest: f64,
    /// Adversary arrival time at the destination, seconds from now.
    pub adv_time_to_dest: f64,
    /// Score this interception contributes to the plan.
    pub score: i64,
    /// Trajectory from the vehicle's position to the destination.
    pub trajectory: LineString<f64>,
}

/// The optimizer's output: the chosen assignments and the objective value.
#[derive(Debug, Default)]
pub struct Plan {
    pub assignments: Vec<VehicleAssignment>,
    pub solution_score: i64,
    pub nb_assignable_vehicles: usize,
}

impl Plan {
    pub fn empty(nb_assignable_vehicles: usize) -> Self {
        Self { assignments: Vec::new(), solution_score: 0, nb_assignable_vehicles }
    }
}

// ── Optimization ──────────────────────────────────────────────────────────────

/// Assign vehicles to candidate nodes, maximizing the total blocked score.
///
/// Constraints:
/// - **C1** — a vehicle guards at most one node;
/// - **C2** — a node is guarded by at most one vehicle;
/// - **C3** — at most one vehicle per linear escape path, so two pursuers
///   never stack up on the same chain while another chain stays open.
///
/// Assignments are only feasible when the pursuer beats the adversary to the
/// node by more than `time_margin` seconds; infeasible pairs never become
/// variables at all.
///
/// Vehicles that end up with an assignment get [`VehicleStatus::Assigned`]
/// and their destination becomes a control node of `model`; the remaining
/// assignable ones become [`VehicleStatus::Unassigned`].
pub fn plan_interception(
    graph: &RoadGraph,
    model: &mut EscapeModel,
    vehicles: &mut [Vehicle],
    time_margin: f64,
    cfg: &PlannerConfig,
) -> SolveResult<Plan> {
    let assignable: Vec<usize> = vehicles
        .iter()
        .enumerate()
        .filter(|(_, v)| v.status == VehicleStatus::Assignable && v.reach.is_some())
        .map(|(i, _)| i)
        .collect();

    // No vehicles: a valid empty plan, not an error.
    if assignable.is_empty() {
        info!("no assignable vehicles; returning an empty plan");
        return Ok(Plan::empty(0));
    }

    let candidates = model.candidate_nodes().to_vec();
    let node_osmids: Vec<NodeId> = candidates.iter().map(|c| c.osmid).collect();
    let times: Vec<Vec<f64>> = {
        let refs: Vec<&Vehicle> = assignable.iter().map(|&i| &vehicles[i]).collect();
        Vehicle::time_matrix(&refs, &node_osmids)
    };

    // Decision matrix: a variable only where the vehicle arrives with more
    // than the required margin; everything else is a structural constant 0.
    let mut cp = CpModel::new();
    let matrix: Vec<Vec<Option<BoolVar>>> = times
        .iter()
        .map(|row| {
            row.iter()
                .zip(&candidates)
                .map(|(&t, c)| (c.time_reached - t - time_margin > 0.0).then(|| cp.new_bool_var()))
                .collect()
        })
        .collect();

    // C1: a vehicle is assigned to at most one node.
    for row in &matrix {
        cp.add_at_most_one(row.iter().flatten().copied());
    }
    // C2: a node is assigned to at most one vehicle.
    for n in 0..candidates.len() {
        cp.add_at_most_one(matrix.iter().filter_map(|row| row[n]));
    }
    // C3: at most one vehicle per escape path.
    for path in model.paths_as_seq_indices() {
        cp.add_at_most_one(
            matrix
                .iter()
                .flat_map(|row| path.iter().filter_map(|&id| row[id as usize])),
        );
    }

    // Objective: maximize the total score of guarded nodes.
    for row in &matrix {
        cp.maximize(
            row.iter()
                .zip(&candidates)
                .filter_map(|(var, c)| var.map(|v| (v, c.score))),
        );
    }

    let solution = CpSolver::new(cfg.max_time_to_solve).solve(&cp);
    if !matches!(solution.status, SolveStatus::Optimal | SolveStatus::Feasible) {
        return Err(SolveError::NoPlanFound);
    }

    let mut plan = Plan::empty(assignable.len());
    for (row, &vi) in matrix.iter().zip(&assignable) {
        let chosen = row
            .iter()
            .enumerate()
            .find(|(_, var)| var.is_some_and(|v| solution.value(v)));
        let Some((n, _)) = chosen else {
            vehicles[vi].status = VehicleStatus::Unassigned;
            continue;
        };

        let candidate = candidates[n];
        let vehicle = &vehicles[vi];
        let path = vehicle
            .path_to(candidate.osmid)
            .ok_or(SolveError::MissingPath(vehicle.id, candidate.osmid))?
            .to_vec();
        let trajectory = graph.path_linestring(&path, vehicle.position.as_ref())?;
        let time_to_dest = vehicle.time_to(candidate.osmid).unwrap_or(f64::INFINITY);

        info!(
            "vehicle {} goes to node {}: arrives {:.0}s ahead of the adversary, +{} points",
            vehicle.id,
            candidate.osmid,
            candidate.time_reached - time_to_dest,
            candidate.score
        );
        plan.assignments.push(VehicleAssignment {
            vehicle_id: vehicle.id,
            destination_node: candidate.osmid,
            destination_point: graph.node_point(candidate.osmid)?,
            time_to_dest,
            adv_time_to_dest: candidate.time_reached,
            score: candidate.score,
            trajectory,
        });
        vehicles[vi].status = VehicleStatus::Assigned;
        model.set_as_control_node(candidate.osmid)?;
    }

    plan.solution_score = solution.objective;
    info!(
        "plan ready: {} assignments out of {} assignable vehicles, total score {}",
        plan.assignments.len(),
        plan.nb_assignable_vehicles,
        plan.solution_score
    );
    Ok(plan)
}
