//! Escape-model construction and scoring.
//!
//! This is the heart of the planner: route from the last known position with
//! escape nodes as sinks, overlay every escape path into a rooted tree, find
//! the first node on each branch the adversary has not reached yet (the
//! NJOI), and score every node that is still ahead of it.

use geo::Point;
use log::debug;
use rustc_hash::FxHashMap;

use cordon_core::{NodeId, PlannerConfig};
use cordon_graph::{Position, RoadGraph};
use cordon_route::Router;

use crate::error::{ModelError, ModelResult};
use crate::tree::{self, EscapeTree, TreeNode};

// ── CandidateNode ─────────────────────────────────────────────────────────────

/// A node where the adversary can still be intercepted, as handed to the
/// optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateNode {
    /// Sequential solver ID in `[0, N)`, in tree-insertion order.
    pub id: u32,
    /// Underlying graph node.
    pub osmid: NodeId,
    /// Seconds until the adversary reaches the node, from now.
    pub time_reached: f64,
    /// Total score blocked by controlling this node.
    pub score: i64,
}

// ── EscapeModel ───────────────────────────────────────────────────────────────

/// The adversary's escape options from one LKP snapshot.
pub struct EscapeModel {
    /// Seconds since the adversary was seen at the LKP.
    pub time_elapsed: f64,
    /// The LKP snapped onto the sink-filtered graph.
    pub lk_position: Position,
    /// Escape tree; leaves are the reachable escape nodes.
    pub tree: EscapeTree,
    /// Adversary travel times, including the synthetic root at
    /// `-time_elapsed`.
    pub times: FxHashMap<NodeId, f64>,
    /// Adversary paths from the LKP edge's endpoint to each reached node.
    pub paths: FxHashMap<NodeId, Vec<NodeId>>,
    candidates: Vec<CandidateNode>,
}

impl EscapeModel {
    /// Route from `lk_point` and build the scored escape tree.
    ///
    /// Escape nodes whose shortest path runs through another escape node
    /// first are unreachable under the sink filter and silently skipped —
    /// their escape is already represented by the upstream node.
    pub fn build(
        graph: &RoadGraph,
        lk_point: Point<f64>,
        time_elapsed: f64,
        cfg: &PlannerConfig,
    ) -> ModelResult<Self> {
        let reach = Router::with_escape_sink(graph).route_from_point(lk_point, time_elapsed)?;
        let lk_position = reach.origin.clone();
        let mut times = reach.times;
        let paths = reach.paths;
        times.insert(NodeId::ROOT, -time_elapsed);

        let mut tree = EscapeTree::new(-time_elapsed);
        let mut next_candidate_id: u32 = 0;

        for &escape in graph.escape_nodes() {
            let Some(path) = paths.get(&escape) else {
                debug!("escape node {escape} is unreachable from the LKP; skipping its path");
                continue;
            };

            // Base score of this path: the highway rank of its last edge.
            // A single-node path means the escape node is an endpoint of the
            // LKP's own edge, whose rank is used instead.
            let last_edge_rank = if path.len() > 1 {
                graph.edge_highway_rank(path[path.len() - 2], path[path.len() - 1])?
            } else {
                graph.edge_highway_rank(lk_position.u(), lk_position.v())?
            };
            let base_score = i64::from(last_edge_rank) * cfg.score_last_edge_factor;

            let mut njoi_found = false;
            let mut prev = NodeId::ROOT;
            for &curr in path {
                let t = *times.get(&curr).ok_or(ModelError::MissingTime(curr))?;

                let score = if t > 0.0 {
                    base_score
                        + (f64::exp(-t / cfg.score_time_constant) * cfg.score_time_factor).round()
                            as i64
                } else {
                    0
                };
                let is_njoi = t > 0.0 && !njoi_found;
                if t > 0.0 {
                    njoi_found = true;
                }

                match tree.idx(curr) {
                    // First encounter: attach under the previous chain node.
                    None => {
                        let candidate_id = (score > 0).then(|| {
                            let id = next_candidate_id;
                            next_candidate_id += 1;
                            id
                        });
                        let parent = tree
                            .idx(prev)
                            .expect("chain parent was inserted by an earlier iteration");
                        tree.insert(curr, parent, t, score, is_njoi, candidate_id);
                    }
                    // Seen on an earlier path: accumulate this path's score.
                    Some(idx) => {
                        tree.node_mut(idx).score += score;
                    }
                }
                prev = curr;
            }
        }

        // Collect candidates in pre-order and arrange them by solver ID.
        let mut candidates: Vec<CandidateNode> = tree
            .preorder()
            .into_iter()
            .filter_map(|i| {
                let node = tree.node(i);
                node.candidate_id.map(|id| CandidateNode {
                    id,
                    osmid: node.osmid,
                    time_reached: node.time_reached,
                    score: node.score,
                })
            })
            .collect();
        candidates.sort_unstable_by_key(|c| c.id);
        debug_assert_eq!(candidates.len() as u32, next_candidate_id);

        debug!(
            "escape model built: {} tree nodes, {} candidates, {} njois",
            tree.len(),
            candidates.len(),
            tree.njois().len()
        );

        Ok(Self { time_elapsed, lk_position, tree, times, paths, candidates })
    }

    /// Interception candidates sorted by solver ID; IDs form the contiguous
    /// range `[0, N)`.
    pub fn candidate_nodes(&self) -> &[CandidateNode] {
        &self.candidates
    }

    /// NJOI tree nodes in deterministic (pre-order) enumeration.
    pub fn njois(&self) -> Vec<&TreeNode> {
        self.tree.njois().into_iter().map(|i| self.tree.node(i)).collect()
    }

    /// For each `(NJOI, escape node under it)` pair, the candidate IDs along
    /// that subpath.  One NJOI can lead to several escape nodes; an escape
    /// node is reached from exactly one NJOI.  This feeds the solver's
    /// one-vehicle-per-escape-path constraint.
    pub fn paths_as_seq_indices(&self) -> Vec<Vec<u32>> {
        let mut results = Vec::new();
        for njoi in self.tree.njois() {
            for leaf in self.tree.preorder_from(njoi).into_iter().filter(|&i| self.tree.is_leaf(i))
            {
                let ids: Vec<u32> = self
                    .tree
                    .path_between(njoi, leaf)
                    .into_iter()
                    .filter_map(|i| self.tree.node(i).candidate_id)
                    .collect();
                results.push(ids);
            }
        }
        results
    }

    /// Mark the node a vehicle was assigned to and cover its subtree.
    pub fn set_as_control_node(&mut self, osmid: NodeId) -> ModelResult<()> {
        self.tree.set_as_control_node(osmid).ok_or(ModelError::NotInTree(osmid))?;
        Ok(())
    }

    /// Re-derive every internal node's cover status from its children.
    pub fn propagate_cover(&mut self) {
        self.tree.propagate_cover();
    }

    /// Number of escape nodes the adversary can still aim for.
    pub fn nb_escape_nodes(&self) -> usize {
        // The root is its own leaf only when nothing is reachable.
        self.tree.leaves().into_iter().filter(|&i| i != tree::ROOT).count()
    }

    /// Score if every NJOI were controlled — the optimization ceiling.
    pub fn max_possible_score(&self) -> i64 {
        self.njois().iter().map(|n| n.score).sum()
    }
}
