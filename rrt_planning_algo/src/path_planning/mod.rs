//! Path planning algorithms
//!
//! This module provides sampling-based planners over bounded 2D spaces:
//! - RRT (probabilistically complete)
//! - RRT* (asymptotically optimal, rewires the tree as it grows)
//!
//! Both grow a [`Tree`] inside a [`Space`], which owns the obstacles and the
//! goal regions.

pub mod geometry;
pub mod goal;
pub mod rrt;
pub mod rrt_star;
pub mod space;
pub mod tree;

pub use goal::{BoxGoal, Goal, GoalExtent, DEFAULT_GOAL_VALUE};
pub use rrt::{Planner, Rrt, RrtConfig, RrtResult};
pub use rrt_star::RrtStar;
pub use space::{EmptySpace, Space, Wall, WallSpace, DEFAULT_MAX_SAMPLE_ATTEMPTS};
pub use tree::{Node, NodeId, Tree};
