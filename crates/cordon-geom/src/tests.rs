//! Unit tests for cordon-geom.

mod helpers {
    use cordon_core::{NodeId, PlannerConfig};
    use cordon_graph::{EdgeAttrs, RoadGraph, RoadGraphBuilder};
    use cordon_model::EscapeModel;
    use geo::Point;

    pub const A: NodeId = NodeId(401);
    pub const B: NodeId = NodeId(402);
    pub const C: NodeId = NodeId(403);
    pub const E1: NodeId = NodeId(404);
    pub const D: NodeId = NodeId(405);
    pub const E2: NodeId = NodeId(406);
    pub const F: NodeId = NodeId(407);
    pub const E3: NodeId = NodeId(408);

    fn attrs(rank: u8) -> EdgeAttrs {
        EdgeAttrs { travel_time: 60.0, highway_rank: rank, oneway: false, geometry: None }
    }

    /// The Y network shared with the model tests; LKP between A and B.
    pub fn y_graph() -> RoadGraph {
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

    pub fn model(graph: &RoadGraph, time_elapsed: f64) -> EscapeModel {
        EscapeModel::build(graph, Point::new(2.005, 49.0), time_elapsed, &PlannerConfig::default())
            .unwrap()
    }
}

// ── Local projection ──────────────────────────────────────────────────────────

mod projection {
    use assert_approx_eq::assert_approx_eq;
    use geo::Point;

    use crate::LocalProjection;

    #[test]
    fn project_unproject_round_trips_within_tolerance() {
        let points = vec![
            Point::new(2.06974, 49.387),
            Point::new(2.10496, 49.40171),
            Point::new(1.98, 49.32),
        ];
        let proj = LocalProjection::centered_on(&points);
        for &p in &points {
            let back = proj.unproject(proj.project(p));
            assert_approx_eq!(back.x(), p.x(), 1e-6);
            assert_approx_eq!(back.y(), p.y(), 1e-6);
        }
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let points = vec![Point::new(2.0, 49.0), Point::new(2.0, 50.0)];
        let proj = LocalProjection::centered_on(&points);
        let a = proj.project(points[0]);
        let b = proj.project(points[1]);
        let dy = (b.y() - a.y()).abs();
        assert!((dy - 111_195.0).abs() < 100.0, "got {dy}");
    }

    #[test]
    fn longitude_scale_shrinks_with_latitude() {
        let points = vec![Point::new(2.0, 49.0), Point::new(3.0, 49.0)];
        let proj = LocalProjection::centered_on(&points);
        let dx = (proj.project(points[1]).x() - proj.project(points[0]).x()).abs();
        // cos(49°) ≈ 0.656
        assert!((dx - 111_195.0 * 0.656).abs() < 200.0, "got {dx}");
    }
}

// ── PCA & balanced polygons ───────────────────────────────────────────────────

mod balancing {
    use assert_approx_eq::assert_approx_eq;
    use geo::Point;

    use crate::{balanced_polygon, principal_axes};

    #[test]
    fn principal_axes_of_an_elongated_cloud() {
        let points: Vec<Point<f64>> = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 1.0),
            Point::new(20.0, -1.0),
            Point::new(30.0, 1.0),
            Point::new(40.0, 0.0),
        ];
        let axes = principal_axes(&points);
        assert_approx_eq!(axes.major_vector.0.abs(), 1.0, 1e-3);
        assert_approx_eq!(axes.centroid.x(), 20.0, 1e-9);
        assert!(axes.major_axis / axes.minor_axis > 10.0);
        assert_approx_eq!(axes.major_span, 20.0, 0.1);
    }

    #[test]
    fn closing_vertex_is_ignored() {
        let open = vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(2.0, 3.0)];
        let mut closed = open.clone();
        closed.push(open[0]);
        let a = principal_axes(&open);
        let b = principal_axes(&closed);
        assert_approx_eq!(a.centroid.x(), b.centroid.x(), 1e-12);
        assert_approx_eq!(a.major_axis, b.major_axis, 1e-12);
    }

    #[test]
    fn compact_cloud_keeps_its_points() {
        // A square around the origin (in degrees, near lat 49).
        let points = vec![
            Point::new(2.00, 49.00),
            Point::new(2.01, 49.00),
            Point::new(2.01, 49.007),
            Point::new(2.00, 49.007),
        ];
        let poly = balanced_polygon(&points, 1.8);
        // Four corners plus the closing vertex.
        assert_eq!(poly.exterior().0.len(), 5);
    }

    #[test]
    fn elongated_cloud_gains_two_widening_points() {
        let points = vec![
            Point::new(2.000, 49.0),
            Point::new(2.010, 49.0001),
            Point::new(2.020, 48.9999),
            Point::new(2.030, 49.0),
        ];
        let poly = balanced_polygon(&points, 1.8);
        // Four input points + two synthetic ones + closing vertex.
        assert_eq!(poly.exterior().0.len(), 7);

        // The widening points sit roughly a major-span away from the axis.
        let max_lat_dev = poly
            .exterior()
            .0
            .iter()
            .map(|c| (c.y - 49.0).abs())
            .fold(0.0, f64::max);
        // Major span ≈ 0.015° of longitude ≈ 1100 m ≈ 0.0099° of latitude.
        assert!(max_lat_dev > 0.008, "widening too small: {max_lat_dev}");
    }

    #[test]
    fn tiny_clouds_degrade_gracefully() {
        let two = vec![Point::new(2.0, 49.0), Point::new(2.01, 49.0)];
        let poly = balanced_polygon(&two, 1.8);
        assert!(poly.exterior().0.len() >= 3); // auto-closed degenerate ring
    }
}

// ── Plan geometry ─────────────────────────────────────────────────────────────

mod geometry {
    use assert_approx_eq::assert_approx_eq;
    use cordon_core::PlannerConfig;

    use super::helpers::{self, D, E1, E2, E3};
    use crate::PlanGeometry;

    #[test]
    fn uncontrolled_plan_splits_past_and_future() {
        let graph = helpers::y_graph();
        let mut model = helpers::model(&graph, 90.0);
        model.propagate_cover();
        let geom = PlanGeometry::derive(&model, &graph, &PlannerConfig::default()).unwrap();

        // Three chains, each split at its NJOI's present position (which is
        // exactly C, C and F at 90 s elapsed).
        assert_eq!(geom.past_paths.len(), 3);
        assert_eq!(geom.uncontrolled_paths.len(), 3);
        assert!(geom.before_control_paths.is_empty());
        assert!(geom.after_control_paths.is_empty());

        // Every escape node is open.
        assert!(geom.covered_escape_nodes.is_empty());
        let mut open: Vec<_> = geom.uncovered_escape_nodes.iter().map(|&(n, _)| n).collect();
        open.sort_unstable();
        assert_eq!(open, vec![E1, E2, E3]);
    }

    #[test]
    fn control_node_reroutes_segments_into_cover_categories() {
        let graph = helpers::y_graph();
        let mut model = helpers::model(&graph, 90.0);
        model.set_as_control_node(D).unwrap();
        model.propagate_cover();
        let geom = PlanGeometry::derive(&model, &graph, &PlannerConfig::default()).unwrap();

        // C→D leads to the control node, D→E2 sits behind it.
        assert_eq!(geom.before_control_paths.len(), 1);
        assert_eq!(geom.after_control_paths.len(), 1);
        let after = &geom.after_control_paths[0];
        assert_approx_eq!(after.0.first().unwrap().y, 49.01, 1e-9);
        assert_approx_eq!(after.0.last().unwrap().y, 49.02, 1e-9);

        assert_eq!(geom.covered_escape_nodes.len(), 1);
        assert_eq!(geom.covered_escape_nodes[0].0, E2);
        assert_eq!(geom.uncovered_escape_nodes.len(), 2);
    }

    #[test]
    fn isochrone_passes_through_the_present_positions() {
        let graph = helpers::y_graph();
        let mut model = helpers::model(&graph, 90.0);
        model.propagate_cover();
        let geom = PlanGeometry::derive(&model, &graph, &PlannerConfig::default()).unwrap();

        // At 90 s the adversary sits exactly on C (east, both branches) and
        // F (west); the balanced polygon must span that extent.
        let xs: Vec<f64> = geom.isochrone.exterior().0.iter().map(|c| c.x).collect();
        let max_x = xs.iter().fold(f64::MIN, |a, &b| a.max(b));
        let min_x = xs.iter().fold(f64::MAX, |a, &b| a.min(b));
        assert_approx_eq!(max_x, 2.02, 1e-9); // C
        assert_approx_eq!(min_x, 1.99, 1e-9); // F
    }

    #[test]
    fn fresh_sighting_still_draws_a_visible_isochrone() {
        let graph = helpers::y_graph();
        let mut model = helpers::model(&graph, 5.0);
        model.propagate_cover();
        let cfg = PlannerConfig::default();
        let geom = PlanGeometry::derive(&model, &graph, &cfg).unwrap();

        // Both NJOIs (A and B) are adjacent to the root, so the present
        // positions are the LKP advanced by the 10 s floor along its own
        // edge: 1/6 of the edge each way from the midpoint.
        let xs: Vec<f64> = geom.isochrone.exterior().0.iter().map(|c| c.x).collect();
        let max_x = xs.iter().fold(f64::MIN, |a, &b| a.max(b));
        let min_x = xs.iter().fold(f64::MAX, |a, &b| a.min(b));
        assert_approx_eq!(max_x, 2.005 + 0.01 / 6.0, 1e-6);
        assert_approx_eq!(min_x, 2.005 - 0.01 / 6.0, 1e-6);
    }

    #[test]
    fn passed_escape_nodes_are_extrapolated_and_resnapped() {
        let graph = helpers::y_graph();
        // At 160 s the adversary is past E1 and E3; only E2 lies ahead.
        let mut model = helpers::model(&graph, 160.0);
        model.propagate_cover();
        let geom = PlanGeometry::derive(&model, &graph, &PlannerConfig::default()).unwrap();

        let njois: Vec<_> = model.njois().iter().map(|n| n.osmid).collect();
        assert_eq!(njois, vec![E2]);

        // The proxy points for E1/E3 snap back onto the network, so the
        // isochrone reaches at least out to the escape nodes themselves.
        let xs: Vec<f64> = geom.isochrone.exterior().0.iter().map(|c| c.x).collect();
        let max_x = xs.iter().fold(f64::MIN, |a, &b| a.max(b));
        let min_x = xs.iter().fold(f64::MAX, |a, &b| a.min(b));
        assert_approx_eq!(max_x, 2.03, 1e-9); // E1
        assert_approx_eq!(min_x, 1.98, 1e-9); // E3

        // The fully-passed eastern chain to E1 is entirely in the past.
        assert!(geom.uncontrolled_paths.len() < 3);
        assert!(!geom.past_paths.is_empty());
    }

    #[test]
    fn present_position_splits_the_njoi_edge() {
        let graph = helpers::y_graph();
        // At 120 s: C at -30, D and E1 at +30 → the adversary is halfway
        // along C→E1 and C→D.
        let mut model = helpers::model(&graph, 120.0);
        model.propagate_cover();
        let geom = PlanGeometry::derive(&model, &graph, &PlannerConfig::default()).unwrap();

        // Eastern past chain ends at the midpoint of C→E1 (x = 2.025).
        let ends: Vec<f64> = geom.past_paths.iter().map(|l| l.0.last().unwrap().x).collect();
        assert!(
            ends.iter().any(|&x| (x - 2.025).abs() < 1e-9),
            "no past path ends at the present position: {ends:?}"
        );
        // And a future chain starts there.
        let starts: Vec<f64> =
            geom.uncontrolled_paths.iter().map(|l| l.0.first().unwrap().x).collect();
        assert!(starts.iter().any(|&x| (x - 2.025).abs() < 1e-9));
    }
}
