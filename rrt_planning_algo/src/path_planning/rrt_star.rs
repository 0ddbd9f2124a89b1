//! RRT* path planning algorithm
//!
//! Extends [`Rrt`] with two steps per sample:
//! - choose parent: among the nodes within the close radius of the sample,
//!   attach the new node to the one giving the cheapest total cost
//! - rewire: nearby nodes that would be cheaper to reach through the new node
//!   are moved under it
//!
//! The cost of the best goal node therefore never increases from one step to
//! the next.

use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace};

use super::rrt::{Planner, Rrt, RrtConfig};
use super::space::Space;
use super::tree::{NodeId, Tree};
use crate::error::PlanningResult;

/// Close radius in step sizes when none is configured
const DEFAULT_CLOSE_RADIUS_STEPS: f64 = 3.0;

/// RRT* planner
#[derive(Debug)]
pub struct RrtStar<S, R = StdRng> {
    base: Rrt<S, R>,
    close_radius: f64,
}

impl<S: Space> RrtStar<S, StdRng> {
    /// Create a planner seeded from `config.seed`
    pub fn new(space: S, initial_point: Point2<f64>, config: &RrtConfig) -> Self {
        let base = Rrt::new(space, initial_point, config);
        let close_radius = config
            .close_radius
            .unwrap_or(base.step_size() * DEFAULT_CLOSE_RADIUS_STEPS);
        Self { base, close_radius }
    }
}

impl<S: Space, R: Rng> RrtStar<S, R> {
    pub fn with_rng(
        space: S,
        initial_point: Point2<f64>,
        step_size: Option<f64>,
        close_radius: Option<f64>,
        rng: R,
    ) -> Self {
        let base = Rrt::with_rng(space, initial_point, step_size, rng);
        let close_radius =
            close_radius.unwrap_or(base.step_size() * DEFAULT_CLOSE_RADIUS_STEPS);
        Self { base, close_radius }
    }

    pub fn space(&self) -> &S {
        self.base.space()
    }

    pub fn step_size(&self) -> f64 {
        self.base.step_size()
    }

    pub fn tolerance(&self) -> f64 {
        self.base.tolerance()
    }

    pub fn close_radius(&self) -> f64 {
        self.close_radius
    }

    pub fn steer(&self, from: &Point2<f64>, to: &Point2<f64>) -> Point2<f64> {
        self.base.steer(from, to)
    }

    /// Grow the tree toward `q_rand`, choosing the cheapest parent nearby
    ///
    /// With no node inside the close radius this is a plain RRT extension.
    pub fn step_to(&mut self, q_rand: &Point2<f64>) -> PlanningResult<Option<NodeId>> {
        let candidates = self.base.tree().near(q_rand, self.close_radius);
        if candidates.is_empty() {
            return self.base.step_to(q_rand);
        }

        let mut best_total = f64::INFINITY;
        let mut best: Option<(NodeId, Point2<f64>, f64)> = None;

        for candidate in candidates {
            let node = &self.base.tree()[candidate];
            let from = *node.point();
            let parent_cost = node.cost();

            let Some((q_path, edge_cost)) = self.base.connect(&from, q_rand)? else {
                continue;
            };
            let total = parent_cost + edge_cost;
            if total < best_total {
                best_total = total;
                best = Some((candidate, q_path, edge_cost));
            }
        }

        let Some((parent, q_path, edge_cost)) = best else {
            debug!(?q_rand, "no reachable parent near sample");
            return Ok(None);
        };

        let node = self.base.tree_mut().add_node(parent, q_path, edge_cost)?;
        self.base.mark_if_goal(node)?;
        self.rewire(node)?;
        Ok(Some(node))
    }

    /// Move neighbours of `new_node` under it when that shortens their path
    fn rewire(&mut self, new_node: NodeId) -> PlanningResult<()> {
        let radius = self.base.step_size().min(self.close_radius);
        let (point, cost) = {
            let node = &self.base.tree()[new_node];
            (*node.point(), node.cost())
        };

        for neighbor in self.base.tree().near(&point, radius) {
            let (neighbor_point, neighbor_cost) = {
                let node = &self.base.tree()[neighbor];
                (*node.point(), node.cost())
            };
            let edge_cost = self.base.space().path_cost(&point, &neighbor_point);

            if edge_cost.is_finite() && cost + edge_cost < neighbor_cost {
                trace!(
                    ?neighbor,
                    old_cost = neighbor_cost,
                    new_cost = cost + edge_cost,
                    "rewiring"
                );
                self.base.tree_mut().reparent(neighbor, new_node, edge_cost)?;
            }
        }
        Ok(())
    }
}

impl<S: Space, R: Rng> Planner for RrtStar<S, R> {
    fn step(&mut self) -> PlanningResult<Option<NodeId>> {
        let q_rand = self.base.sample()?;
        self.step_to(&q_rand)
    }

    fn tree(&self) -> &Tree {
        self.base.tree()
    }
}
