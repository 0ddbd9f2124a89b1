pub mod error;
pub mod path_planning;

pub mod prelude {
    pub use crate::error::{PlanningError, PlanningResult};
    pub use crate::path_planning::{
        BoxGoal, EmptySpace, Goal, GoalExtent, Node, NodeId, Planner, Rrt, RrtConfig, RrtResult,
        RrtStar, Space, Tree, Wall, WallSpace,
    };
    pub use nalgebra;
    pub use nalgebra::{Point2, Vector2};
}

pub use prelude::*;
