//! RRT (Rapidly-exploring Random Tree) path planning algorithm
//!
//! Grows a tree from the start point one sample at a time over any [`Space`].
//! A sample that cannot be reached in a straight line is replaced by the last
//! free point on the way to it.

use std::path::Path;

use config::Config;
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::space::Space;
use super::tree::{NodeId, Tree};
use crate::error::{PlanningError, PlanningResult};

/// Fraction of the smallest dimension under which a move counts as no progress
const TOLERANCE_RATIO: f64 = 1e-6;

/// Configuration for RRT and RRT* planners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrtConfig {
    /// Maximum length of one extension (None for the space diagonal)
    pub step_size: Option<f64>,
    /// Neighbourhood radius for RRT* (None for three step sizes)
    pub close_radius: Option<f64>,
    /// Number of steps taken by [`Planner::plan_with`]
    pub max_iterations: usize,
    /// Stop [`Planner::plan_with`] as soon as one node reaches a goal
    pub stop_on_goal: bool,
    /// Random seed (None for random)
    pub seed: Option<u64>,
}

impl Default for RrtConfig {
    fn default() -> Self {
        Self {
            step_size: None,
            close_radius: None,
            max_iterations: 600,
            stop_on_goal: false,
            seed: None,
        }
    }
}

impl RrtConfig {
    /// Load a config file; the format follows the file extension
    pub fn from_file(path: impl AsRef<Path>) -> PlanningResult<Self> {
        let cfg = Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize::<RrtConfig>()?;
        Ok(cfg)
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Result of a planning run
#[derive(Debug, Clone)]
pub struct RrtResult {
    /// Cheapest path found from start to a goal (empty if none)
    pub path: Vec<Point2<f64>>,
    /// Cost of that path (infinite if none)
    pub cost: f64,
    /// Whether a path was found
    pub success: bool,
    /// Number of steps taken
    pub iterations: usize,
    /// Number of nodes in the tree
    pub nodes: usize,
}

/// A sampling planner that grows a [`Tree`] one step at a time
pub trait Planner {
    /// Sample once and try to grow the tree
    ///
    /// `Ok(None)` means the sample could not be connected, which is a normal
    /// outcome; keep stepping.
    fn step(&mut self) -> PlanningResult<Option<NodeId>>;

    fn tree(&self) -> &Tree;

    /// Cheapest goal node's cost and its path from the root
    ///
    /// Returns `(inf, None)` while no goal has been reached.
    fn shortest_path(&self) -> (f64, Option<Vec<Point2<f64>>>) {
        let tree = self.tree();
        let mut best: Option<NodeId> = None;
        for id in tree.goal_nodes() {
            if best.map_or(true, |b| tree[id].cost() < tree[b].cost()) {
                best = Some(id);
            }
        }

        match best {
            Some(id) => (tree[id].cost(), tree.path_points(id).ok()),
            None => (f64::INFINITY, None),
        }
    }

    /// Plan with the iteration bound and stopping rule of `config`
    fn plan_with(&mut self, config: &RrtConfig) -> PlanningResult<RrtResult> {
        self.plan(config.max_iterations, config.stop_on_goal)
    }

    /// Step up to `max_iterations` times and report the best path
    fn plan(&mut self, max_iterations: usize, stop_on_goal: bool) -> PlanningResult<RrtResult> {
        let mut iterations = 0usize;

        for _ in 0..max_iterations {
            iterations += 1;
            if let Some(node) = self.step()? {
                if stop_on_goal && self.tree()[node].is_goal() {
                    break;
                }
            }
        }

        let (cost, path) = self.shortest_path();
        let nodes = self.tree().len();
        info!(iterations, nodes, cost, "planning finished");

        Ok(RrtResult {
            success: path.is_some(),
            path: path.unwrap_or_default(),
            cost,
            iterations,
            nodes,
        })
    }
}

/// Basic RRT planner
#[derive(Debug)]
pub struct Rrt<S, R = StdRng> {
    space: S,
    tree: Tree,
    step_size: f64,
    tolerance: f64,
    rng: R,
}

impl<S: Space> Rrt<S, StdRng> {
    /// Create a planner seeded from `config.seed`
    pub fn new(space: S, initial_point: Point2<f64>, config: &RrtConfig) -> Self {
        Self::with_rng(space, initial_point, config.step_size, config.rng())
    }
}

impl<S: Space, R: Rng> Rrt<S, R> {
    /// Create a planner drawing samples from `rng`
    pub fn with_rng(space: S, initial_point: Point2<f64>, step_size: Option<f64>, rng: R) -> Self {
        let step_size = step_size.unwrap_or_else(|| space.diagonal());
        let tolerance = space.dimensions().min() * TOLERANCE_RATIO;
        Self {
            space,
            tree: Tree::new(initial_point),
            step_size,
            tolerance,
            rng,
        }
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Steer from one point toward another, limited by the step size
    pub fn steer(&self, from: &Point2<f64>, to: &Point2<f64>) -> Point2<f64> {
        let diff = to - from;
        let dist = diff.norm();
        if dist < self.step_size {
            *to
        } else {
            from + diff * (self.step_size / dist)
        }
    }

    /// Steered point toward `target` and the cost to reach it from `from`
    ///
    /// Falls back to the nearest free point when the steered motion is blocked.
    /// `None` means that fallback makes no meaningful progress.
    pub(crate) fn connect(
        &self,
        from: &Point2<f64>,
        target: &Point2<f64>,
    ) -> PlanningResult<Option<(Point2<f64>, f64)>> {
        let mut q_path = self.steer(from, target);
        let mut cost = self.space.path_cost(from, &q_path);

        if cost.is_infinite() {
            q_path = self.space.nearest_free_point(from, &q_path);
            if nalgebra::distance(from, &q_path) < self.tolerance {
                return Ok(None);
            }
            cost = self.space.path_cost(from, &q_path);
            if cost.is_infinite() {
                return Err(PlanningError::GeometryInvariantViolation {
                    from: *from,
                    to: q_path,
                });
            }
        }

        Ok(Some((q_path, cost)))
    }

    /// Flag `node` if it landed in a goal
    pub(crate) fn mark_if_goal(&mut self, node: NodeId) -> PlanningResult<()> {
        if let Some(value) = self.space.goal_value(self.tree[node].point()) {
            self.tree.mark_goal(node, value)?;
            debug!(?node, value, "goal reached");
        }
        Ok(())
    }

    pub(crate) fn sample(&mut self) -> PlanningResult<Point2<f64>> {
        self.space.random_free_point(&mut self.rng)
    }

    /// Extend the nearest node toward `q_rand`
    pub fn step_to(&mut self, q_rand: &Point2<f64>) -> PlanningResult<Option<NodeId>> {
        let Some(nearest) = self.tree.nearest(q_rand) else {
            debug!("every node has reached a goal");
            return Ok(None);
        };
        let q_nearest = *self.tree[nearest].point();

        let Some((q_path, cost)) = self.connect(&q_nearest, q_rand)? else {
            debug!(?q_rand, "no progress toward sample");
            return Ok(None);
        };

        let node = self.tree.add_node(nearest, q_path, cost)?;
        self.mark_if_goal(node)?;
        Ok(Some(node))
    }
}

impl<S: Space, R: Rng> Planner for Rrt<S, R> {
    fn step(&mut self) -> PlanningResult<Option<NodeId>> {
        let q_rand = self.sample()?;
        self.step_to(&q_rand)
    }

    fn tree(&self) -> &Tree {
        &self.tree
    }
}
