//! Rooted planning tree stored in an arena
//!
//! Nodes live in a flat vector owned by [`Tree`] and refer to each other by
//! [`NodeId`]. Each node keeps its parent handle and its children handles, so
//! the tree can be walked both ways and reshaped by [`Tree::reparent`] without
//! any reference cycles. Nodes are never removed.

use std::ops::Index;
use std::sync::atomic::{AtomicU32, Ordering};

use nalgebra::Point2;
use tracing::warn;

use crate::error::{PlanningError, PlanningResult};

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(0);

/// Handle of a node, tagged with the tree that issued it
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId {
    tree: u32,
    index: u32,
}

impl NodeId {
    /// Position of the node in insertion order
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// A state in the planning tree
#[derive(Debug, Clone)]
pub struct Node {
    point: Point2<f64>,
    /// Cost from the root along the current parent chain
    cost: f64,
    /// Cost of the edge from the current parent
    edge_cost: f64,
    goal: Option<u32>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn point(&self) -> &Point2<f64> {
        &self.point
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn edge_cost(&self) -> f64 {
        self.edge_cost
    }

    pub fn is_goal(&self) -> bool {
        self.goal.is_some()
    }

    /// Value of the goal this node reached, if any
    pub fn goal_value(&self) -> Option<u32> {
        self.goal
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn distance(&self, point: &Point2<f64>) -> f64 {
        nalgebra::distance(&self.point, point)
    }
}

/// Directed tree of planning states rooted at the start point
#[derive(Debug)]
pub struct Tree {
    id: u32,
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new(root: Point2<f64>) -> Self {
        Self {
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
            nodes: vec![Node {
                point: root,
                cost: 0.0,
                edge_cost: 0.0,
                goal: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    fn id_at(&self, index: usize) -> NodeId {
        NodeId {
            tree: self.id,
            index: index as u32,
        }
    }

    fn check(&self, id: NodeId) -> PlanningResult<usize> {
        if self.contains(id) {
            Ok(id.index())
        } else {
            Err(PlanningError::NodeNotInTree(id))
        }
    }

    pub fn root(&self) -> NodeId {
        self.id_at(0)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false, a tree holds at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of parent-child links
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).sum()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.tree == self.id && id.index() < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if self.contains(id) {
            self.nodes.get(id.index())
        } else {
            None
        }
    }

    /// All nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(move |(i, n)| (self.id_at(i), n))
    }

    /// Nodes that have not reached a goal
    pub fn free_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().filter(|(_, n)| !n.is_goal()).map(|(id, _)| id)
    }

    /// Nodes that have reached a goal
    pub fn goal_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.iter().filter(|(_, n)| n.is_goal()).map(|(id, _)| id)
    }

    pub fn all_points(&self) -> Vec<Point2<f64>> {
        self.nodes.iter().map(|n| n.point).collect()
    }

    /// Attach a new node under `parent`
    ///
    /// Its cost is `parent.cost + edge_cost`. Coincident points are kept as
    /// distinct nodes.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        point: Point2<f64>,
        edge_cost: f64,
    ) -> PlanningResult<NodeId> {
        let parent_idx = self.check(parent)?;
        let id = self.id_at(self.nodes.len());
        let cost = self.nodes[parent_idx].cost + edge_cost;
        self.nodes.push(Node {
            point,
            cost,
            edge_cost,
            goal: None,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent_idx].children.push(id);
        Ok(id)
    }

    /// Closest non-goal node to `point`; the earliest inserted wins ties
    pub fn nearest(&self, point: &Point2<f64>) -> Option<NodeId> {
        let mut min_dist = f64::INFINITY;
        let mut nearest = None;

        for (id, node) in self.iter().filter(|(_, n)| !n.is_goal()) {
            let dist = node.distance(point);
            if nearest.is_none() || dist < min_dist {
                min_dist = dist;
                nearest = Some(id);
            }
        }

        nearest
    }

    /// Non-goal nodes within `radius` (inclusive) of `point`, in insertion order
    pub fn near(&self, point: &Point2<f64>, radius: f64) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, n)| !n.is_goal() && n.distance(point) <= radius)
            .map(|(id, _)| id)
            .collect()
    }

    /// Check whether `node` lies in the subtree rooted at `ancestor` (itself included)
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        // A well-formed chain is never longer than the tree
        for _ in 0..self.nodes.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.get(id).and_then(Node::parent),
                None => return false,
            }
        }
        false
    }

    /// Move `node` under `new_parent` and recompute the cost of its whole subtree
    ///
    /// `new_parent` must not be inside the subtree of `node`; this is checked
    /// in debug builds only.
    pub fn reparent(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        edge_cost: f64,
    ) -> PlanningResult<()> {
        let idx = self.check(node)?;
        let new_parent_idx = self.check(new_parent)?;
        let old_parent = self.nodes[idx].parent.ok_or(PlanningError::ReparentRoot)?;
        debug_assert!(
            !self.is_descendant(new_parent, node),
            "reparenting {node:?} under its own descendant {new_parent:?}"
        );

        let siblings = &mut self.nodes[old_parent.index()].children;
        if let Some(pos) = siblings.iter().position(|&c| c == node) {
            siblings.remove(pos);
        }
        self.nodes[new_parent_idx].children.push(node);

        let moved = &mut self.nodes[idx];
        moved.parent = Some(new_parent);
        moved.edge_cost = edge_cost;

        // Parents are always updated before their children
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let i = id.index();
            let parent_cost = self.nodes[i]
                .parent
                .map_or(0.0, |p| self.nodes[p.index()].cost);
            let current = &mut self.nodes[i];
            current.cost = parent_cost + current.edge_cost;
            stack.extend_from_slice(&current.children);
        }

        Ok(())
    }

    /// Nodes from the root down to `node`
    pub fn path_down(&self, node: NodeId) -> PlanningResult<Vec<NodeId>> {
        self.check(node)?;
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.nodes[current.index()].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Points from the root down to `node`
    pub fn path_points(&self, node: NodeId) -> PlanningResult<Vec<Point2<f64>>> {
        Ok(self
            .path_down(node)?
            .into_iter()
            .map(|id| self.nodes[id.index()].point)
            .collect())
    }

    /// Flag `node` as having reached a goal carrying `value`
    ///
    /// Goal nodes are excluded from [`Tree::nearest`] and [`Tree::near`] from
    /// then on.
    pub fn mark_goal(&mut self, node: NodeId, value: u32) -> PlanningResult<()> {
        let idx = self.check(node)?;
        self.nodes[idx].goal = Some(value);
        Ok(())
    }

    /// Look a node up by exact position
    pub fn get_node(&self, position: &Point2<f64>) -> Option<NodeId> {
        let found = self
            .iter()
            .find(|(_, n)| n.point == *position)
            .map(|(id, _)| id);
        if found.is_none() {
            warn!(?position, "node with that position not found");
        }
        found
    }

    /// Leaf nodes reachable from the root, depth first
    pub fn terminals(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            if node.children.is_empty() {
                leaves.push(id);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    /// Panics if `id` was issued by another tree
    fn index(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("{id:?} does not belong to this tree"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    /// Structural invariants that must hold after any sequence of edits
    pub(crate) fn assert_invariants(tree: &Tree) {
        assert_eq!(tree.len(), tree.edge_count() + 1);
        for (id, node) in tree.iter() {
            match node.parent() {
                None => {
                    assert_eq!(id, tree.root());
                    assert_eq!(node.cost(), 0.0);
                }
                Some(parent) => {
                    let expected = tree[parent].cost() + node.edge_cost();
                    assert!(
                        (node.cost() - expected).abs() < 1e-9,
                        "cost of {id:?} is {} but parent chain gives {expected}",
                        node.cost()
                    );
                    assert!(tree[parent].children().contains(&id));
                }
            }
            assert!(tree.is_descendant(id, tree.root()), "{id:?} not reachable");
        }
    }

    /// root(0,0) -> a(1,0) -> b(2,0) -> c(3,0), root -> d(0,5)
    fn chain() -> (Tree, [NodeId; 4]) {
        let mut tree = Tree::new(p(0.0, 0.0));
        let a = tree.add_node(tree.root(), p(1.0, 0.0), 1.0).unwrap();
        let b = tree.add_node(a, p(2.0, 0.0), 1.0).unwrap();
        let c = tree.add_node(b, p(3.0, 0.0), 1.0).unwrap();
        let d = tree.add_node(tree.root(), p(0.0, 5.0), 5.0).unwrap();
        (tree, [a, b, c, d])
    }

    #[test]
    fn test_add_node() {
        let (tree, [a, b, c, d]) = chain();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree[c].cost(), 3.0);
        assert_eq!(tree[b].parent(), Some(a));
        assert_eq!(tree[tree.root()].children(), &[a, d]);
        assert_invariants(&tree);
    }

    #[test]
    fn test_add_node_rejects_foreign_parent() {
        let other = Tree::new(p(0.0, 0.0));
        let mut tree = Tree::new(p(0.0, 0.0));
        let result = tree.add_node(other.root(), p(1.0, 1.0), 1.0);
        assert!(matches!(result, Err(PlanningError::NodeNotInTree(_))));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_duplicate_points_are_distinct_nodes() {
        let mut tree = Tree::new(p(0.0, 0.0));
        let a = tree.add_node(tree.root(), p(1.0, 1.0), 1.0).unwrap();
        let b = tree.add_node(tree.root(), p(1.0, 1.0), 1.0).unwrap();
        assert_ne!(a, b);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_nearest_skips_goals_and_keeps_first_on_ties() {
        let mut tree = Tree::new(p(0.0, 0.0));
        let a = tree.add_node(tree.root(), p(2.0, 0.0), 2.0).unwrap();
        let b = tree.add_node(tree.root(), p(0.0, 2.0), 2.0).unwrap();
        // (2, 2) is equidistant from a and b
        let target = p(2.0, 2.0);
        assert_eq!(tree.nearest(&target), Some(a));

        tree.mark_goal(a, 1).unwrap();
        assert_eq!(tree.nearest(&target), Some(b));
        assert_eq!(tree.nearest(&p(2.0, 0.0)), Some(tree.root()));
    }

    #[test]
    fn test_near() {
        let (mut tree, [a, b, c, d]) = chain();
        assert_eq!(tree.near(&p(2.0, 0.0), 1.0), vec![a, b, c]);
        assert_eq!(tree.near(&p(2.0, 0.0), 0.0), vec![b]);
        assert!(tree.near(&p(2.5, 0.0), 0.0).is_empty());
        assert_eq!(
            tree.near(&p(0.0, 0.0), f64::INFINITY),
            vec![tree.root(), a, b, c, d]
        );
        tree.mark_goal(b, 1).unwrap();
        assert_eq!(tree.near(&p(2.0, 0.0), 1.0), vec![a, c]);
    }

    #[test]
    fn test_reparent_updates_subtree() {
        let (mut tree, [a, b, c, d]) = chain();
        tree.reparent(b, d, 0.5).unwrap();

        assert_eq!(tree[b].parent(), Some(d));
        assert!(tree[a].children().is_empty());
        assert_eq!(tree[d].children(), &[b]);
        assert_eq!(tree[b].cost(), 5.5);
        assert_eq!(tree[c].cost(), 6.5);
        assert_invariants(&tree);
    }

    #[test]
    fn test_reparent_root_fails() {
        let (mut tree, [a, ..]) = chain();
        let root = tree.root();
        assert!(matches!(
            tree.reparent(root, a, 1.0),
            Err(PlanningError::ReparentRoot)
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "own descendant")]
    fn test_reparent_under_descendant_panics() {
        let (mut tree, [a, _, c, _]) = chain();
        let _ = tree.reparent(a, c, 1.0);
    }

    #[test]
    fn test_path_down() {
        let (tree, [a, b, c, _]) = chain();
        assert_eq!(tree.path_down(c).unwrap(), vec![tree.root(), a, b, c]);
        assert_eq!(tree.path_down(tree.root()).unwrap(), vec![tree.root()]);
        assert_eq!(
            tree.path_points(b).unwrap(),
            vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]
        );

        let other = Tree::new(p(0.0, 0.0));
        assert!(tree.path_down(other.root()).is_err());
    }

    #[test]
    fn test_get_node() {
        let (tree, [_, b, ..]) = chain();
        assert_eq!(tree.get_node(&p(2.0, 0.0)), Some(b));
        assert_eq!(tree.get_node(&p(2.0, 0.1)), None);
    }

    #[test]
    fn test_goal_and_free_partition() {
        let (mut tree, [a, _, c, _]) = chain();
        tree.mark_goal(c, 3).unwrap();
        assert_eq!(tree.goal_nodes().collect::<Vec<_>>(), vec![c]);
        assert_eq!(tree.free_nodes().count(), 4);
        assert_eq!(tree[c].goal_value(), Some(3));
        assert!(!tree[a].is_goal());
    }

    #[test]
    fn test_terminals() {
        let (tree, [_, _, c, d]) = chain();
        assert_eq!(tree.terminals(), vec![c, d]);
        assert_eq!(Tree::new(p(1.0, 1.0)).terminals().len(), 1);
    }
}
