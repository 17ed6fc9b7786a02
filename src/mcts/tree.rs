//! The search tree's arena (§9: "store nodes in an arena (vector of nodes)
//! and refer to children by index to avoid reference cycles and to free
//! subtrees cheaply on root advance"). Each [`TreeNode`] owns a cloned game
//! state; the tree is dropped wholesale at the end of one `search` call.

use crate::rts::PlayerAction;

pub struct TreeNode<S> {
    pub state: S,
    /// Candidate joint actions not yet expanded into a child, each carrying
    /// its normalized prior weight (§4.4 expansion step).
    pub untried_actions: Vec<(PlayerAction, f64)>,
    /// `(action, child index, prior weight)` for every expanded child.
    pub children: Vec<(PlayerAction, usize, f64)>,
    pub visit_count: u32,
    pub total_value: f64,
}

impl<S> TreeNode<S> {
    fn new(state: S, untried_actions: Vec<(PlayerAction, f64)>) -> Self {
        Self { state, untried_actions, children: Vec::new(), visit_count: 0, total_value: 0.0 }
    }

    pub fn mean_value(&self) -> f64 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.total_value / self.visit_count as f64
        }
    }
}

pub struct Tree<S> {
    pub nodes: Vec<TreeNode<S>>,
}

impl<S> Tree<S> {
    pub fn new(root_state: S, root_candidates: Vec<(PlayerAction, f64)>) -> Self {
        Self { nodes: vec![TreeNode::new(root_state, root_candidates)] }
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn add_child(&mut self, parent: usize, action: PlayerAction, state: S, untried: Vec<(PlayerAction, f64)>, prior_weight: f64) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(TreeNode::new(state, untried));
        self.nodes[parent].children.push((action, idx, prior_weight));
        idx
    }

    /// Increments visit count and accumulated value along `path` (root to
    /// leaf). `path` always starts at the root, so `nodes[path[0]]` is the
    /// root's visit count after this call — the invariant every node's
    /// visit count is at least the sum of its children's holds by
    /// construction: each iteration increments at most one child per level.
    pub fn backpropagate(&mut self, path: &[usize], value: f64) {
        for &idx in path {
            let node = &mut self.nodes[idx];
            node.visit_count += 1;
            node.total_value += value;
        }
    }
}
