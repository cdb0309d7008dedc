//! A small CP-SAT-flavored model for weighted boolean assignment.
//!
//! The interception model only ever needs three ingredients: boolean
//! decision variables, *at-most-one* constraints over subsets of them, and a
//! weighted-sum objective to maximize.  [`CpModel`] exposes exactly that
//! surface, and [`CpSolver`] solves it exactly with branch-and-bound under a
//! wall-clock budget:
//!
//! - variables are branched in decreasing-weight order (stable by ID);
//! - a greedy pass seeds the incumbent so the solver always has a feasible
//!   answer in hand;
//! - the bound is the incumbent value against the running value plus the
//!   positive-weight suffix sum;
//! - when the deadline expires the best incumbent is returned as
//!   [`SolveStatus::Feasible`]; a completed search is
//!   [`SolveStatus::Optimal`].
//!
//! The interface stays interchangeable with any solver exposing booleans,
//! linear constraints, weighted maximization, and a time limit.

use std::time::{Duration, Instant};

use log::{debug, info};

// ── Model ─────────────────────────────────────────────────────────────────────

/// Handle to a boolean decision variable.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct BoolVar(usize);

/// A weighted boolean assignment model with at-most-one constraints.
#[derive(Debug, Default)]
pub struct CpModel {
    weights: Vec<i64>,
    constraints: Vec<Vec<usize>>,
}

impl CpModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Introduce a fresh boolean variable with objective weight 0.
    pub fn new_bool_var(&mut self) -> BoolVar {
        self.weights.push(0);
        BoolVar(self.weights.len() - 1)
    }

    pub fn num_vars(&self) -> usize {
        self.weights.len()
    }

    /// Constrain `Σ vars ≤ 1`.
    pub fn add_at_most_one(&mut self, vars: impl IntoIterator<Item = BoolVar>) {
        let group: Vec<usize> = vars.into_iter().map(|v| v.0).collect();
        if group.len() > 1 {
            self.constraints.push(group);
        }
    }

    /// Add `Σ weight · var` terms to the maximization objective.  Repeated
    /// terms for one variable accumulate.
    pub fn maximize(&mut self, terms: impl IntoIterator<Item = (BoolVar, i64)>) {
        for (var, weight) in terms {
            self.weights[var.0] += weight;
        }
    }
}

// ── Solution ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SolveStatus {
    /// The search space was exhausted; the solution is a global optimum.
    Optimal,
    /// The wall-clock budget expired first; best incumbent found so far.
    Feasible,
    /// No acceptable assignment exists.
    Infeasible,
}

#[derive(Debug)]
pub struct CpSolution {
    pub status: SolveStatus,
    /// Objective value of the returned assignment.
    pub objective: i64,
    values: Vec<bool>,
}

impl CpSolution {
    pub fn value(&self, var: BoolVar) -> bool {
        self.values[var.0]
    }
}

// ── Solver ────────────────────────────────────────────────────────────────────

/// Exact branch-and-bound solver with a hard wall-clock budget.
pub struct CpSolver {
    pub time_limit: Duration,
}

/// How many search nodes to expand between deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

impl CpSolver {
    pub fn new(time_limit: Duration) -> Self {
        Self { time_limit }
    }

    pub fn solve(&self, model: &CpModel) -> CpSolution {
        let n = model.num_vars();

        // Branch on heavy variables first; ties stay in ID order.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| (std::cmp::Reverse(model.weights[i]), i));

        // var → constraints it appears in.
        let mut var_constraints: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (ci, group) in model.constraints.iter().enumerate() {
            for &v in group {
                var_constraints[v].push(ci);
            }
        }

        // suffix[d] = best value still collectable from order[d..].
        let mut suffix = vec![0i64; n + 1];
        for d in (0..n).rev() {
            suffix[d] = suffix[d + 1] + model.weights[order[d]].max(0);
        }

        let mut search = Search {
            model,
            order: &order,
            var_constraints: &var_constraints,
            suffix: &suffix,
            saturated: vec![false; model.constraints.len()],
            current: vec![false; n],
            best: Vec::new(),
            best_value: i64::MIN,
            deadline: Instant::now() + self.time_limit,
            nodes: 0,
            out_of_time: false,
        };

        // Greedy incumbent: take variables in branching order whenever no
        // constraint blocks them.  Guarantees a feasible answer even if the
        // deadline fires immediately.
        search.seed_greedy();
        let greedy_value = search.best_value;

        search.explore(0, 0);

        let status = if search.out_of_time { SolveStatus::Feasible } else { SolveStatus::Optimal };
        if search.out_of_time {
            info!(
                "solver budget of {:?} expired after {} nodes; best value {}",
                self.time_limit, search.nodes, search.best_value
            );
        } else {
            debug!(
                "solver proved optimality in {} nodes (greedy {}, optimal {})",
                search.nodes, greedy_value, search.best_value
            );
        }
        CpSolution { status, objective: search.best_value, values: search.best }
    }
}

struct Search<'m> {
    model: &'m CpModel,
    order: &'m [usize],
    var_constraints: &'m [Vec<usize>],
    suffix: &'m [i64],
    saturated: Vec<bool>,
    current: Vec<bool>,
    best: Vec<bool>,
    best_value: i64,
    deadline: Instant,
    nodes: u64,
    out_of_time: bool,
}

impl Search<'_> {
    fn seed_greedy(&mut self) {
        let mut taken = vec![false; self.model.num_vars()];
        let mut saturated = vec![false; self.model.constraints.len()];
        let mut value = 0;
        for &v in self.order {
            if self.model.weights[v] <= 0 {
                continue;
            }
            if self.var_constraints[v].iter().all(|&c| !saturated[c]) {
                taken[v] = true;
                value += self.model.weights[v];
                for &c in &self.var_constraints[v] {
                    saturated[c] = true;
                }
            }
        }
        self.best = taken;
        self.best_value = value;
    }

    fn explore(&mut self, depth: usize, value: i64) {
        self.nodes += 1;
        if self.nodes % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            self.out_of_time = true;
        }
        if self.out_of_time {
            return;
        }
        // Bound: nothing ahead can beat the incumbent strictly.
        if value + self.suffix[depth] <= self.best_value {
            return;
        }
        if depth == self.order.len() {
            // Strictly better than the incumbent, by the bound above.
            self.best_value = value;
            self.best.copy_from_slice(&self.current);
            return;
        }

        let var = self.order[depth];
        // Setting a non-positive variable can never improve the objective.
        let can_take = self.model.weights[var] > 0
            && self.var_constraints[var].iter().all(|&c| !self.saturated[c]);
        if can_take {
            self.current[var] = true;
            for &c in &self.var_constraints[var] {
                self.saturated[c] = true;
            }
            self.explore(depth + 1, value + self.model.weights[var]);
            self.current[var] = false;
            for &c in &self.var_constraints[var] {
                self.saturated[c] = false;
            }
        }
        self.explore(depth + 1, value);
    }
}
