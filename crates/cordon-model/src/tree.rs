//! The escape tree: every shortest path from the LKP to a reachable escape
//! node, overlaid into one rooted tree.
//!
//! # Arena layout
//!
//! Nodes live in a `Vec<TreeNode>`; parent and child links are indices into
//! that arena, and a secondary map resolves graph node IDs to slots.  This
//! keeps traversal allocation-free, avoids reference cycles entirely, and
//! gives cheap pre/post-order walks.  Index 0 is always the synthetic root
//! standing in for the last known position.

use rustc_hash::FxHashMap;

use cordon_core::NodeId;

// ── Cover status ──────────────────────────────────────────────────────────────

/// Whether the adversary's escape through a subtree is blocked.
///
/// Propagated bottom-up: a node is `Covered` iff all its children are,
/// `Uncovered` iff none are, `Mixed` otherwise.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum CoverStatus {
    #[default]
    Uncovered,
    Mixed,
    Covered,
}

// ── TreeNode ──────────────────────────────────────────────────────────────────

/// One node of the escape tree.
///
/// A tree node matches a graph node via `osmid` but belongs to the tree:
/// paths to different escape nodes share their common prefix, so each graph
/// node appears at most once.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// The underlying graph node, or [`NodeId::ROOT`] for the synthetic root.
    pub osmid: NodeId,
    /// Arena index of the parent; `None` only for the root.
    pub parent: Option<usize>,
    /// Arena indices of the children, in insertion order.
    pub children: Vec<usize>,
    /// Seconds until the adversary reaches this node, from now.  Negative
    /// means the node could already be behind it.
    pub time_reached: f64,
    /// Accumulated score across all escape paths through this node.
    pub score: i64,
    /// First node with `time_reached > 0` on its root-to-leaf chain.
    pub is_njoi: bool,
    pub cover: CoverStatus,
    /// A vehicle was assigned here by the plan.
    pub is_control_node: bool,
    /// Sequential solver ID; present iff the node scored on first insertion.
    pub candidate_id: Option<u32>,
}

// ── EscapeTree ────────────────────────────────────────────────────────────────

/// Category of a tree edge, decided by its destination node (see
/// [`EscapeTree::categorize_segments`]).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SegmentCategory {
    /// Destination is not covered by the plan.
    Uncovered,
    /// Destination is covered, no control node among its ancestors (this
    /// includes the edge into the control node itself).
    BeforeControl,
    /// Destination sits behind a control node.
    AfterControl,
}

/// Non-overlapping path segments grouped by [`SegmentCategory`].
#[derive(Debug, Default)]
pub struct CategorizedSegments {
    pub uncovered: Vec<Vec<usize>>,
    pub before_control: Vec<Vec<usize>>,
    pub after_control: Vec<Vec<usize>>,
}

/// Arena-backed rooted tree; see module docs.
#[derive(Debug)]
pub struct EscapeTree {
    nodes: Vec<TreeNode>,
    index: FxHashMap<NodeId, usize>,
}

/// Arena index of the root.
pub const ROOT: usize = 0;

impl EscapeTree {
    /// New tree holding only the synthetic root with `time_reached = root_time`.
    pub fn new(root_time: f64) -> Self {
        let root = TreeNode {
            osmid: NodeId::ROOT,
            parent: None,
            children: Vec::new(),
            time_reached: root_time,
            score: 0,
            is_njoi: false,
            cover: CoverStatus::Uncovered,
            is_control_node: false,
            candidate_id: None,
        };
        let mut index = FxHashMap::default();
        index.insert(NodeId::ROOT, ROOT);
        Self { nodes: vec![root], index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, osmid: NodeId) -> bool {
        self.index.contains_key(&osmid)
    }

    pub fn idx(&self, osmid: NodeId) -> Option<usize> {
        self.index.get(&osmid).copied()
    }

    pub fn node(&self, idx: usize) -> &TreeNode {
        &self.nodes[idx]
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut TreeNode {
        &mut self.nodes[idx]
    }

    pub fn by_osmid(&self, osmid: NodeId) -> Option<&TreeNode> {
        self.idx(osmid).map(|i| &self.nodes[i])
    }

    pub fn is_leaf(&self, idx: usize) -> bool {
        self.nodes[idx].children.is_empty()
    }

    /// Insert a new node under `parent` and return its arena index.
    ///
    /// The caller guarantees `osmid` is not yet present; each graph node gets
    /// exactly one tree entry.
    pub fn insert(
        &mut self,
        osmid: NodeId,
        parent: usize,
        time_reached: f64,
        score: i64,
        is_njoi: bool,
        candidate_id: Option<u32>,
    ) -> usize {
        debug_assert!(!self.contains(osmid), "node {osmid} inserted twice");
        let idx = self.nodes.len();
        self.nodes.push(TreeNode {
            osmid,
            parent: Some(parent),
            children: Vec::new(),
            time_reached,
            score,
            is_njoi,
            cover: CoverStatus::Uncovered,
            is_control_node: false,
            candidate_id,
        });
        self.nodes[parent].children.push(idx);
        self.index.insert(osmid, idx);
        idx
    }

    // ── Traversals ────────────────────────────────────────────────────────

    /// Pre-order arena indices of the subtree rooted at `start`.
    pub fn preorder_from(&self, start: usize) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            // Reverse push so the first child is visited first.
            for &child in self.nodes[idx].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Pre-order arena indices of the whole tree.
    pub fn preorder(&self) -> Vec<usize> {
        self.preorder_from(ROOT)
    }

    /// Post-order arena indices of the whole tree (children before parents).
    pub fn postorder(&self) -> Vec<usize> {
        let mut order = self.preorder();
        // Reversed pre-order with reversed child order is a valid post-order
        // for bottom-up aggregation: every child precedes its parent.
        order.reverse();
        order
    }

    /// Leaves of the whole tree in pre-order.  These are exactly the
    /// reachable escape nodes (plus the root itself when nothing is
    /// reachable).
    pub fn leaves(&self) -> Vec<usize> {
        self.preorder().into_iter().filter(|&i| self.is_leaf(i)).collect()
    }

    /// Nodes flagged `is_njoi`, in pre-order — the deterministic NJOI
    /// enumeration consumers rely on.
    pub fn njois(&self) -> Vec<usize> {
        self.preorder().into_iter().filter(|&i| self.nodes[i].is_njoi).collect()
    }

    /// Node sequence from `ancestor` down to `descendant`, both inclusive.
    ///
    /// Walks parent links upward; callers pass pairs produced by subtree
    /// traversal, so the relation always holds.
    pub fn path_between(&self, ancestor: usize, descendant: usize) -> Vec<usize> {
        let mut path = vec![descendant];
        let mut cur = descendant;
        while cur != ancestor {
            cur = self.nodes[cur]
                .parent
                .unwrap_or_else(|| panic!("{ancestor} is not an ancestor of {descendant}"));
            path.push(cur);
        }
        path.reverse();
        path
    }

    /// `true` if some strict ancestor of `idx` is a control node.
    pub fn behind_control(&self, idx: usize) -> bool {
        let mut cur = self.nodes[idx].parent;
        while let Some(p) = cur {
            if self.nodes[p].is_control_node {
                return true;
            }
            cur = self.nodes[p].parent;
        }
        false
    }

    // ── Cover bookkeeping ─────────────────────────────────────────────────

    /// Mark the node for `osmid` as a control node and set the whole subtree
    /// under it to `Covered`: the adversary is intercepted there no matter
    /// which branch it takes afterwards.
    pub fn set_as_control_node(&mut self, osmid: NodeId) -> Option<usize> {
        let idx = self.idx(osmid)?;
        self.nodes[idx].is_control_node = true;
        for i in self.preorder_from(idx) {
            self.nodes[i].cover = CoverStatus::Covered;
        }
        Some(idx)
    }

    /// Bottom-up derivation of every internal node's cover from its
    /// children: all covered → covered, all uncovered → uncovered, else
    /// mixed.  Leaves keep their assigned status.
    pub fn propagate_cover(&mut self) {
        for idx in self.postorder() {
            if self.is_leaf(idx) {
                continue;
            }
            let children = &self.nodes[idx].children;
            let all_covered = children.iter().all(|&c| self.nodes[c].cover == CoverStatus::Covered);
            let all_uncovered =
                children.iter().all(|&c| self.nodes[c].cover == CoverStatus::Uncovered);
            self.nodes[idx].cover = if all_covered {
                CoverStatus::Covered
            } else if all_uncovered {
                CoverStatus::Uncovered
            } else {
                CoverStatus::Mixed
            };
        }
    }

    // ── Segment decomposition ─────────────────────────────────────────────

    /// Decompose the tree into disjoint root-to-leaf path segments.
    ///
    /// DFS where the first child extends the current segment and every
    /// further child starts a new one at the branching node, so each tree
    /// edge is drawn exactly once and segments share only branch points.
    pub fn non_overlapping_segments(&self) -> Vec<Vec<usize>> {
        let mut segments = Vec::new();
        self.dfs_split(ROOT, Vec::new(), &mut segments);
        segments
    }

    fn dfs_split(&self, idx: usize, mut current: Vec<usize>, out: &mut Vec<Vec<usize>>) {
        current.push(idx);
        if self.is_leaf(idx) {
            out.push(current);
            return;
        }
        let children = self.nodes[idx].children.clone();
        self.dfs_split(children[0], current, out);
        for &child in &children[1..] {
            self.dfs_split(child, vec![idx], out);
        }
    }

    /// Category of the tree edge ending at `child`.
    pub fn edge_category(&self, child: usize) -> SegmentCategory {
        if self.nodes[child].cover != CoverStatus::Covered {
            SegmentCategory::Uncovered
        } else if self.behind_control(child) {
            SegmentCategory::AfterControl
        } else {
            SegmentCategory::BeforeControl
        }
    }

    /// Slice every non-overlapping segment wherever the edge category
    /// changes; boundary nodes appear in both adjacent slices so rendered
    /// lines stay visually continuous.
    pub fn categorize_segments(&self) -> CategorizedSegments {
        let mut result = CategorizedSegments::default();
        for path in self.non_overlapping_segments() {
            if path.len() < 2 {
                continue;
            }
            let mut segment = vec![path[0]];
            let mut category = self.edge_category(path[1]);
            for (i, &node) in path.iter().enumerate().skip(1) {
                let next_category = self.edge_category(node);
                if next_category != category {
                    result.push(category, std::mem::replace(&mut segment, vec![path[i - 1]]));
                    category = next_category;
                }
                segment.push(node);
            }
            result.push(category, segment);
        }
        result
    }
}

impl CategorizedSegments {
    fn push(&mut self, category: SegmentCategory, segment: Vec<usize>) {
        match category {
            SegmentCategory::Uncovered => self.uncovered.push(segment),
            SegmentCategory::BeforeControl => self.before_control.push(segment),
            SegmentCategory::AfterControl => self.after_control.push(segment),
        }
    }
}
