//! Unit tests for cordon-model.
//!
//! All tests use a hand-crafted Y-shaped network:
//!
//! ```text
//!                          E2(406)
//!                            ↑ 60 s, rank 4
//!                          D(405)
//!                            ↕ 60 s
//! E3(408) ← F(407) ↔ A(401) ↔ B(402) ↔ C(403) → E1(404)
//!    60 s, rank 1    60 s  LKP  60 s    60 s   60 s, rank 2
//! ```
//!
//! E1, E2, E3 are escape nodes; the LKP sits halfway between A and B.

mod helpers {
    use cordon_core::{NodeId, PlannerConfig};
    use cordon_graph::{EdgeAttrs, RoadGraph, RoadGraphBuilder};
    use geo::Point;

    use crate::EscapeModel;

    pub const A: NodeId = NodeId(401);
    pub const B: NodeId = NodeId(402);
    pub const C: NodeId = NodeId(403);
    pub const E1: NodeId = NodeId(404);
    pub const D: NodeId = NodeId(405);
    pub const E2: NodeId = NodeId(406);
    pub const F: NodeId = NodeId(407);
    pub const E3: NodeId = NodeId(408);

    pub fn lkp() -> Point<f64> {
        Point::new(2.005, 49.0)
    }

    fn attrs(rank: u8) -> EdgeAttrs {
        EdgeAttrs { travel_time: 60.0, highway_rank: rank, oneway: false, geometry: None }
    }

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

    pub fn model(time_elapsed: f64) -> EscapeModel {
        EscapeModel::build(&y_graph(), lkp(), time_elapsed, &PlannerConfig::default()).unwrap()
    }
}

// ── Tree construction ─────────────────────────────────────────────────────────

mod tree_build {
    use assert_approx_eq::assert_approx_eq;
    use cordon_core::NodeId;
    use rustc_hash::FxHashSet;

    use super::helpers::{self, A, B, C, D, E1, E2, E3, F};
    use crate::tree;

    #[test]
    fn one_tree_node_per_graph_node() {
        let m = helpers::model(90.0);
        // Root + the 8 reachable graph nodes.
        assert_eq!(m.tree.len(), 9);
        let mut seen: FxHashSet<NodeId> = FxHashSet::default();
        for idx in m.tree.preorder() {
            assert!(seen.insert(m.tree.node(idx).osmid), "duplicate tree entry");
        }
    }

    #[test]
    fn leaves_are_the_reachable_escape_nodes() {
        let m = helpers::model(90.0);
        let mut leaves: Vec<NodeId> =
            m.tree.leaves().into_iter().map(|i| m.tree.node(i).osmid).collect();
        leaves.sort_unstable();
        assert_eq!(leaves, vec![E1, E2, E3]);
        assert_eq!(m.nb_escape_nodes(), 3);
    }

    #[test]
    fn root_carries_negative_elapsed_time() {
        let m = helpers::model(90.0);
        let root = m.tree.node(tree::ROOT);
        assert_eq!(root.osmid, NodeId::ROOT);
        assert_approx_eq!(root.time_reached, -90.0, 1e-9);
        assert_approx_eq!(m.times[&NodeId::ROOT], -90.0, 1e-9);
    }

    #[test]
    fn times_follow_the_shortest_paths() {
        let m = helpers::model(90.0);
        assert_approx_eq!(m.times[&A], -60.0, 1e-9);
        assert_approx_eq!(m.times[&B], -60.0, 1e-9);
        assert_approx_eq!(m.times[&C], 0.0, 1e-9);
        assert_approx_eq!(m.times[&E1], 60.0, 1e-9);
        assert_approx_eq!(m.times[&D], 60.0, 1e-9);
        assert_approx_eq!(m.times[&E2], 120.0, 1e-9);
        assert_approx_eq!(m.times[&F], 0.0, 1e-9);
        assert_approx_eq!(m.times[&E3], 60.0, 1e-9);
    }

    #[test]
    fn at_most_one_njoi_per_chain() {
        let m = helpers::model(90.0);
        for leaf in m.tree.leaves() {
            let chain = m.tree.path_between(tree::ROOT, leaf);
            let njois = chain.iter().filter(|&&i| m.tree.node(i).is_njoi).count();
            assert!(njois <= 1, "chain to {} has {njois} njois", m.tree.node(leaf).osmid);
        }
    }

    #[test]
    fn njois_are_the_first_future_nodes() {
        let m = helpers::model(90.0);
        let njois: Vec<NodeId> = m.njois().iter().map(|n| n.osmid).collect();
        assert_eq!(njois, vec![E1, D, E3]);
        for n in m.njois() {
            assert!(n.time_reached > 0.0);
        }
    }
}

// ── Scoring & candidates ──────────────────────────────────────────────────────

mod scoring {
    use cordon_core::NodeId;

    use super::helpers::{self, A, B, C, D, E1, E2, E3, F};

    #[test]
    fn scores_mix_last_edge_rank_and_time_decay() {
        let m = helpers::model(90.0);
        // rank(C→E1)=2 → base 160; round(exp(-60/900)·480) = 449.
        assert_eq!(m.tree.by_osmid(E1).unwrap().score, 609);
        // rank(D→E2)=4 → base 320; D at 60 s, E2 at 120 s (420 decay).
        assert_eq!(m.tree.by_osmid(D).unwrap().score, 769);
        assert_eq!(m.tree.by_osmid(E2).unwrap().score, 740);
        // rank(F→E3)=1 → base 80.
        assert_eq!(m.tree.by_osmid(E3).unwrap().score, 529);
        // Past nodes score nothing.
        assert_eq!(m.tree.by_osmid(B).unwrap().score, 0);
        assert_eq!(m.tree.by_osmid(C).unwrap().score, 0);
    }

    #[test]
    fn candidate_ids_are_contiguous_and_in_discovery_order() {
        let m = helpers::model(90.0);
        let ids: Vec<u32> = m.candidate_nodes().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        let osmids: Vec<NodeId> = m.candidate_nodes().iter().map(|c| c.osmid).collect();
        assert_eq!(osmids, vec![E1, D, E2, E3]);
    }

    #[test]
    fn past_nodes_are_not_candidates() {
        let m = helpers::model(90.0);
        assert!(m.tree.by_osmid(A).unwrap().candidate_id.is_none());
        assert!(m.tree.by_osmid(B).unwrap().candidate_id.is_none());
        assert!(m.tree.by_osmid(F).unwrap().candidate_id.is_none());
    }

    #[test]
    fn shared_prefixes_accumulate_scores_once_per_path() {
        // With no elapsed time every node is ahead of the adversary; B and C
        // are shared by the E1 and E2 paths and must sum both contributions.
        let m = helpers::model(0.0);
        // E1 path: base 160, decay 464/434/406 along B, C, E1.
        // E2 path adds base 320 with the same decay at B and C.
        assert_eq!(m.tree.by_osmid(B).unwrap().score, (160 + 464) + (320 + 464));
        assert_eq!(m.tree.by_osmid(C).unwrap().score, (160 + 434) + (320 + 434));
        assert_eq!(m.tree.by_osmid(E1).unwrap().score, 160 + 406);
        assert_eq!(m.tree.by_osmid(D).unwrap().score, 320 + 406);
        assert_eq!(m.tree.by_osmid(E2).unwrap().score, 320 + 380);
        assert_eq!(m.tree.by_osmid(A).unwrap().score, 80 + 464);
        assert_eq!(m.tree.by_osmid(F).unwrap().score, 80 + 434);
        assert_eq!(m.tree.by_osmid(E3).unwrap().score, 80 + 406);

        // Candidate IDs were assigned once each despite the shared prefix.
        let ids: Vec<u32> = m.candidate_nodes().iter().map(|c| c.id).collect();
        assert_eq!(ids, (0..8).collect::<Vec<u32>>());
    }

    #[test]
    fn max_possible_score_sums_the_njois() {
        let m = helpers::model(90.0);
        assert_eq!(m.max_possible_score(), 609 + 769 + 529);

        let m0 = helpers::model(0.0);
        // With nothing elapsed the njois are B (both east chains) and A.
        let njois: Vec<NodeId> = m0.njois().iter().map(|n| n.osmid).collect();
        assert_eq!(njois, vec![B, A]);
        assert_eq!(m0.max_possible_score(), 1408 + 544);
    }

    #[test]
    fn paths_as_seq_indices_partition_the_future() {
        let m = helpers::model(90.0);
        // NJOIs in pre-order: E1 (leaf), D (leads to E2), E3 (leaf).
        assert_eq!(m.paths_as_seq_indices(), vec![vec![0], vec![1, 2], vec![3]]);

        let m0 = helpers::model(0.0);
        assert_eq!(
            m0.paths_as_seq_indices(),
            vec![vec![0, 1, 2], vec![0, 1, 3, 4], vec![5, 6, 7]]
        );
    }
}

// ── Cover propagation ─────────────────────────────────────────────────────────

mod cover {
    use super::helpers::{self, A, B, C, D, E1, E2, E3, F};
    use crate::CoverStatus;

    #[test]
    fn control_node_covers_its_subtree() {
        let mut m = helpers::model(90.0);
        m.set_as_control_node(D).unwrap();

        assert!(m.tree.by_osmid(D).unwrap().is_control_node);
        assert_eq!(m.tree.by_osmid(D).unwrap().cover, CoverStatus::Covered);
        assert_eq!(m.tree.by_osmid(E2).unwrap().cover, CoverStatus::Covered);
        assert_eq!(m.tree.by_osmid(E1).unwrap().cover, CoverStatus::Uncovered);
    }

    #[test]
    fn unknown_control_node_is_rejected() {
        let mut m = helpers::model(90.0);
        assert!(m.set_as_control_node(cordon_core::NodeId(999)).is_err());
    }

    #[test]
    fn propagation_derives_internal_covers() {
        let mut m = helpers::model(90.0);
        m.set_as_control_node(D).unwrap();
        m.propagate_cover();

        // C has one covered child (D) and one uncovered (E1) → mixed.
        assert_eq!(m.tree.by_osmid(C).unwrap().cover, CoverStatus::Mixed);
        assert_eq!(m.tree.by_osmid(B).unwrap().cover, CoverStatus::Mixed);
        // The western branch is untouched.
        assert_eq!(m.tree.by_osmid(A).unwrap().cover, CoverStatus::Uncovered);
        assert_eq!(m.tree.by_osmid(F).unwrap().cover, CoverStatus::Uncovered);
        assert_eq!(m.tree.by_osmid(E3).unwrap().cover, CoverStatus::Uncovered);
    }

    #[test]
    fn all_children_covered_makes_parent_covered() {
        let mut m = helpers::model(90.0);
        m.set_as_control_node(C).unwrap();
        m.propagate_cover();

        assert_eq!(m.tree.by_osmid(E1).unwrap().cover, CoverStatus::Covered);
        assert_eq!(m.tree.by_osmid(E2).unwrap().cover, CoverStatus::Covered);
        assert_eq!(m.tree.by_osmid(B).unwrap().cover, CoverStatus::Covered);
    }
}

// ── Segment decomposition ─────────────────────────────────────────────────────

mod segments {
    use cordon_core::NodeId;

    use super::helpers::{self, C, D, E2};
    use crate::tree;

    #[test]
    fn decomposition_draws_every_edge_exactly_once() {
        let m = helpers::model(90.0);
        let segments = m.tree.non_overlapping_segments();
        // One segment per leaf.
        assert_eq!(segments.len(), 3);
        // Every tree edge appears exactly once across all segments.
        let mut edge_count = 0;
        for seg in &segments {
            edge_count += seg.len() - 1;
        }
        assert_eq!(edge_count, m.tree.len() - 1);
        // Each segment starts at the root or at a branching node.
        assert_eq!(segments[0][0], tree::ROOT);
    }

    #[test]
    fn category_changes_split_segments_with_shared_boundary() {
        let mut m = helpers::model(90.0);
        m.set_as_control_node(D).unwrap();
        m.propagate_cover();
        let cats = m.tree.categorize_segments();

        // The D branch: C→D is before-control, D→E2 is after-control.
        let before: Vec<Vec<NodeId>> = cats
            .before_control
            .iter()
            .map(|s| s.iter().map(|&i| m.tree.node(i).osmid).collect())
            .collect();
        let after: Vec<Vec<NodeId>> = cats
            .after_control
            .iter()
            .map(|s| s.iter().map(|&i| m.tree.node(i).osmid).collect())
            .collect();
        assert_eq!(before, vec![vec![C, D]]);
        assert_eq!(after, vec![vec![D, E2]]);
        // The boundary node D appears in both adjacent slices.

        // Everything else is uncovered; no edge got lost.
        let uncovered_edges: usize = cats.uncovered.iter().map(|s| s.len() - 1).sum();
        assert_eq!(uncovered_edges + 1 + 1, m.tree.len() - 1);
    }
}

// ── Vehicles ──────────────────────────────────────────────────────────────────

mod vehicles {
    use cordon_core::{NodeId, VehicleId};
    use geo::Point;

    use super::helpers::{self, B, C};
    use crate::{Vehicle, VehicleStatus, find_duplicate_id};
    use cordon_route::Router;

    #[test]
    fn status_wire_discriminants() {
        assert_eq!(VehicleStatus::Assignable.as_int(), 0);
        assert_eq!(VehicleStatus::TooCloseToLkp.as_int(), 1);
        assert_eq!(VehicleStatus::Unavailable.as_int(), 2);
        assert_eq!(VehicleStatus::Assigned.as_int(), 3);
        assert_eq!(VehicleStatus::Unassigned.as_int(), 4);
    }

    #[test]
    fn duplicate_ids_are_detected() {
        let vs = vec![
            Vehicle::new(VehicleId(1), Point::new(0.0, 0.0)),
            Vehicle::new(VehicleId(2), Point::new(0.0, 0.0)),
            Vehicle::new(VehicleId(1), Point::new(1.0, 1.0)),
        ];
        assert_eq!(find_duplicate_id(&vs), Some(VehicleId(1)));
        assert_eq!(find_duplicate_id(&vs[..2]), None);
    }

    #[test]
    fn time_matrix_marks_unreachable_nodes_infinite() {
        let g = helpers::y_graph();
        let mut vehicle = Vehicle::new(VehicleId(8646), Point::new(2.0101, 49.0));
        let position = g.snap(vehicle.point, true).unwrap();
        vehicle.reach =
            Some(Router::new(&g).route_from_position(position.clone(), 0.0).unwrap());
        vehicle.position = Some(position);

        let matrix = Vehicle::time_matrix(&[&vehicle], &[B, C, NodeId(999)]);
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix[0][0], 0.0); // snapped onto B itself
        assert_eq!(matrix[0][1], 60.0);
        assert!(matrix[0][2].is_infinite());
    }
}
