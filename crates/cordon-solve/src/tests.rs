//! Unit tests for cordon-solve.

// ── CP solver ─────────────────────────────────────────────────────────────────

mod cp {
    use std::time::Duration;

    use crate::cp::{CpModel, CpSolver, SolveStatus};

    fn solver() -> CpSolver {
        CpSolver::new(Duration::from_secs(5))
    }

    #[test]
    fn empty_model_is_trivially_optimal() {
        let model = CpModel::new();
        let solution = solver().solve(&model);
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, 0);
    }

    #[test]
    fn picks_the_heavier_side_of_a_conflict() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        let b = model.new_bool_var();
        let c = model.new_bool_var();
        model.add_at_most_one([a, b]);
        model.maximize([(a, 5), (b, 4), (c, 3)]);

        let solution = solver().solve(&model);
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, 8);
        assert!(solution.value(a));
        assert!(!solution.value(b));
        assert!(solution.value(c));
    }

    #[test]
    fn finds_the_global_optimum_not_the_greedy_one() {
        // Greedy takes d (6) first, blocking both a (3) and the c+? combos;
        // the optimum is a + c = 7.
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        let b = model.new_bool_var();
        let c = model.new_bool_var();
        let d = model.new_bool_var();
        model.add_at_most_one([a, b]);
        model.add_at_most_one([b, c, d]);
        model.add_at_most_one([a, d]);
        model.maximize([(a, 3), (b, 5), (c, 4), (d, 6)]);

        let solution = solver().solve(&model);
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, 7);
        assert!(solution.value(a) && solution.value(c));
    }

    #[test]
    fn non_positive_weights_stay_false() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        let b = model.new_bool_var();
        model.maximize([(a, 0), (b, -2)]);
        let solution = solver().solve(&model);
        assert_eq!(solution.objective, 0);
        assert!(!solution.value(a));
        assert!(!solution.value(b));
    }

    #[test]
    fn repeated_objective_terms_accumulate() {
        let mut model = CpModel::new();
        let a = model.new_bool_var();
        model.maximize([(a, 2), (a, 3)]);
        let solution = solver().solve(&model);
        assert_eq!(solution.objective, 5);
    }

    #[test]
    fn expired_budget_still_returns_the_greedy_incumbent() {
        // One at-most-one group over 64 equal variables: the search walks
        // thousands of nodes, so a zero budget trips the deadline check and
        // the greedy incumbent (any single variable, value 1) comes back as
        // a feasible answer.
        let mut model = CpModel::new();
        let vars: Vec<_> = (0..64).map(|_| model.new_bool_var()).collect();
        model.add_at_most_one(vars.iter().copied());
        model.maximize(vars.iter().map(|&v| (v, 1)));

        let solution = CpSolver::new(Duration::ZERO).solve(&model);
        assert_eq!(solution.status, SolveStatus::Feasible);
        assert_eq!(solution.objective, 1);
        assert_eq!(vars.iter().filter(|&&v| solution.value(v)).count(), 1);
    }
}

// ── Optimizer ─────────────────────────────────────────────────────────────────

mod optimizer {
    use cordon_core::{NodeId, PlannerConfig, VehicleId};
    use cordon_graph::{EdgeAttrs, RoadGraph, RoadGraphBuilder};
    use cordon_model::{CoverStatus, EscapeModel, Vehicle, VehicleStatus};
    use cordon_route::Router;
    use geo::Point;

    use crate::{Plan, plan_interception};

    const A: NodeId = NodeId(401);
    const B: NodeId = NodeId(402);
    const C: NodeId = NodeId(403);
    const E1: NodeId = NodeId(404);
    const D: NodeId = NodeId(405);
    const E2: NodeId = NodeId(406);
    const F: NodeId = NodeId(407);
    const E3: NodeId = NodeId(408);

    fn attrs(rank: u8) -> EdgeAttrs {
        EdgeAttrs { travel_time: 60.0, highway_rank: rank, oneway: false, geometry: None }
    }

    /// Same Y network as the escape-model tests; LKP halfway between A and B
    /// with nothing elapsed, so B and A are the njois.
    fn y_graph() -> RoadGraph {
        let mut b = RoadGraphBuilder::new();
        b.add_node(A, 2.00, 49.0, true);
        b.add_node(B, 2.01, 49.0, true);
        b.add_node(C, 2.02, 49.0, true);
        b.add_node(E1, 2.03, 49.0, false);
        b.add_node(D, 2.02, 49.01, true);
        b.add_node(E2, 2.02, 49.02, false);
        b.add_node(F, 1.99, 49.0, true);
        b.add_node(E3, 1.98, 49.0, false);

        b.add_edge(A, B, attrs(1));
        b.add_edge(B, A, attrs(1));
        b.add_edge(B, C, attrs(1));
        b.add_edge(C, B, attrs(1));
        b.add_edge(C, E1, attrs(2));
        b.add_edge(C, D, attrs(1));
        b.add_edge(D, C, attrs(1));
        b.add_edge(D, E2, attrs(4));
        b.add_edge(A, F, attrs(1));
        b.add_edge(F, A, attrs(1));
        b.add_edge(F, E3, attrs(1));

        b.set_escape_nodes(vec![E1, E2, E3]);
        b.build().unwrap()
    }

    fn vehicle_at(graph: &RoadGraph, id: u32, point: Point<f64>) -> Vehicle {
        let mut vehicle = Vehicle::new(VehicleId(id), point);
        let position = graph.snap(point, true).unwrap();
        vehicle.reach = Some(Router::new(graph).route_from_position(position.clone(), 0.0).unwrap());
        vehicle.position = Some(position);
        vehicle
    }

    fn setup(vehicle_points: &[(u32, Point<f64>)], margin: f64) -> (Plan, EscapeModel, Vec<Vehicle>) {
        let graph = y_graph();
        let cfg = PlannerConfig::default();
        let mut model =
            EscapeModel::build(&graph, Point::new(2.005, 49.0), 0.0, &cfg).unwrap();
        let mut vehicles: Vec<Vehicle> =
            vehicle_points.iter().map(|&(id, p)| vehicle_at(&graph, id, p)).collect();
        let plan = plan_interception(&graph, &mut model, &mut vehicles, margin, &cfg).unwrap();
        (plan, model, vehicles)
    }

    #[test]
    fn empty_fleet_yields_an_empty_plan() {
        let (plan, _, _) = setup(&[], 0.0);
        assert_eq!(plan.assignments.len(), 0);
        assert_eq!(plan.solution_score, 0);
        assert_eq!(plan.nb_assignable_vehicles, 0);
    }

    #[test]
    fn two_vehicles_cover_both_sides() {
        let points = [(1u32, Point::new(2.02, 49.01)), (2u32, Point::new(1.99, 49.0))];
        let (plan, model, vehicles) = setup(&points, 0.0);

        // Vehicle 1 (at D) guards C, the richest reachable node; vehicle 2
        // (at F) guards F on the western path.
        assert_eq!(plan.assignments.len(), 2);
        assert_eq!(plan.solution_score, 1348 + 514);

        let by_vehicle: Vec<(u32, NodeId)> =
            plan.assignments.iter().map(|a| (a.vehicle_id.0, a.destination_node)).collect();
        assert_eq!(by_vehicle, vec![(1, C), (2, F)]);

        assert!(vehicles.iter().all(|v| v.status == VehicleStatus::Assigned));
        assert!(model.tree.by_osmid(C).unwrap().is_control_node);
        assert!(model.tree.by_osmid(F).unwrap().is_control_node);
    }

    #[test]
    fn assignments_respect_the_time_margin() {
        let points = [(1u32, Point::new(2.02, 49.01)), (2u32, Point::new(1.99, 49.0))];
        let margin = 30.0;
        let (plan, _, _) = setup(&points, margin);

        // C is only 30 s ahead of the adversary for vehicle 1, which no
        // longer clears the margin; D does.
        assert_eq!(plan.solution_score, 726 + 514);
        for a in &plan.assignments {
            assert!(a.adv_time_to_dest - a.time_to_dest > margin);
        }
    }

    #[test]
    fn path_exclusivity_beats_stacking_two_vehicles_on_one_chain() {
        // Both vehicles sit at D.  C alone scores 1348; any legal pair on
        // the eastern chains scores less, so one vehicle stays unassigned.
        let points = [(1u32, Point::new(2.02, 49.01)), (2u32, Point::new(2.02, 49.01))];
        let (plan, _, vehicles) = setup(&points, 0.0);

        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.solution_score, 1348);
        assert_eq!(plan.assignments[0].destination_node, C);

        let statuses: Vec<VehicleStatus> = vehicles.iter().map(|v| v.status).collect();
        assert!(statuses.contains(&VehicleStatus::Assigned));
        assert!(statuses.contains(&VehicleStatus::Unassigned));
    }

    #[test]
    fn no_two_assignments_share_a_destination() {
        let points = [
            (1u32, Point::new(2.02, 49.01)),
            (2u32, Point::new(2.02, 49.01)),
            (3u32, Point::new(1.99, 49.0)),
        ];
        let (plan, _, _) = setup(&points, 0.0);
        let mut destinations: Vec<NodeId> =
            plan.assignments.iter().map(|a| a.destination_node).collect();
        destinations.sort_unstable();
        destinations.dedup();
        assert_eq!(destinations.len(), plan.assignments.len());
    }

    #[test]
    fn plan_score_equals_the_sum_of_assignment_scores() {
        let points = [(1u32, Point::new(2.02, 49.01)), (2u32, Point::new(1.99, 49.0))];
        let (plan, _, _) = setup(&points, 0.0);
        let sum: i64 = plan.assignments.iter().map(|a| a.score).sum();
        assert_eq!(plan.solution_score, sum);
    }

    #[test]
    fn trajectories_start_at_the_vehicle_and_end_at_the_destination() {
        let points = [(1u32, Point::new(2.02, 49.01)), (2u32, Point::new(1.99, 49.0))];
        let (plan, _, vehicles) = setup(&points, 0.0);

        for a in &plan.assignments {
            let vehicle = vehicles.iter().find(|v| v.id == a.vehicle_id).unwrap();
            let start = a.trajectory.0.first().unwrap();
            let vp = vehicle.point;
            assert!((start.x - vp.x()).abs() < 1e-9 && (start.y - vp.y()).abs() < 1e-9);
            let end = a.trajectory.0.last().unwrap();
            assert_eq!(Point::new(end.x, end.y), a.destination_point);
        }
    }

    #[test]
    fn covered_subtrees_follow_the_assignments() {
        let points = [(1u32, Point::new(2.02, 49.01))];
        let (_, mut model, _) = setup(&points, 30.0);
        model.propagate_cover();

        // Vehicle 1 guards D under a 30 s margin; E2 behind it is covered,
        // E1 and the west stay open.
        assert_eq!(model.tree.by_osmid(E2).unwrap().cover, CoverStatus::Covered);
        assert_eq!(model.tree.by_osmid(E1).unwrap().cover, CoverStatus::Uncovered);
        assert_eq!(model.tree.by_osmid(E3).unwrap().cover, CoverStatus::Uncovered);
    }
}
