//! Plan statistics for the response payload.

use serde::Serialize;

use cordon_model::EscapeModel;
use cordon_solve::Plan;

/// Aggregate numbers summarizing one planning request.
///
/// The min/avg/max tuples are rounded to one decimal; `score` and
/// `max_possible_score` are exact integers.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStats {
    pub nb_escape_nodes: usize,
    pub nb_njois: usize,
    pub nb_candidate_nodes: usize,
    pub max_possible_score: i64,
    pub score: i64,
    /// Vehicles that were assignable going into the solver.
    pub nb_vehicles: usize,
    pub nb_assignments: usize,
    /// `(min, avg, max)` of the pursuers' arrival slack, seconds.
    pub time_margin_stats: (f64, f64, f64),
    /// `(min, avg, max)` of the pursuers' travel times, seconds.
    pub time_to_dest_stats: (f64, f64, f64),
}

impl PlanStats {
    pub fn compute(model: &EscapeModel, plan: &Plan) -> Self {
        let margins: Vec<f64> =
            plan.assignments.iter().map(|a| a.adv_time_to_dest - a.time_to_dest).collect();
        let times: Vec<f64> = plan.assignments.iter().map(|a| a.time_to_dest).collect();

        Self {
            nb_escape_nodes: model.nb_escape_nodes(),
            nb_njois: model.njois().len(),
            nb_candidate_nodes: model.candidate_nodes().len(),
            max_possible_score: model.max_possible_score(),
            score: plan.solution_score,
            nb_vehicles: plan.nb_assignable_vehicles,
            nb_assignments: plan.assignments.len(),
            time_margin_stats: min_avg_max(&margins),
            time_to_dest_stats: min_avg_max(&times),
        }
    }
}

/// `(min, avg, max)` rounded to one decimal; all zeros for an empty slice.
pub(crate) fn min_avg_max(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    (round1(min), round1(avg), round1(max))
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
