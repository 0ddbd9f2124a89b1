//! Goal regions that terminate a branch of the planning tree

use nalgebra::Point2;

use super::geometry::{ball_intersects_rect, point_in_box};

/// Value attached to nodes that land in a goal when none is given
pub const DEFAULT_GOAL_VALUE: u32 = 1;

/// An axis-aligned box goal
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGoal {
    /// Lower-left (minimum) corner
    pub lower_left: Point2<f64>,
    /// Upper-right (maximum) corner
    pub upper_right: Point2<f64>,
    /// Value attached to nodes that reach this goal
    pub value: u32,
}

impl BoxGoal {
    pub fn new(lower_left: Point2<f64>, upper_right: Point2<f64>) -> Self {
        Self {
            lower_left,
            upper_right,
            value: DEFAULT_GOAL_VALUE,
        }
    }

    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }
}

/// Shape parameters of a goal, as consumed by renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GoalExtent {
    Box {
        lower_left: Point2<f64>,
        upper_right: Point2<f64>,
    },
}

/// A goal region
#[derive(Debug, Clone, PartialEq)]
pub enum Goal {
    Box(BoxGoal),
}

impl Goal {
    /// Box goal with the default value
    pub fn new_box(lower_left: Point2<f64>, upper_right: Point2<f64>) -> Self {
        Self::Box(BoxGoal::new(lower_left, upper_right))
    }

    /// Check whether a point lies inside the goal (boundary included)
    pub fn point_in(&self, point: &Point2<f64>) -> bool {
        match self {
            Self::Box(g) => point_in_box(&g.lower_left, &g.upper_right, point),
        }
    }

    /// Check whether a disc overlaps the goal
    pub fn sphere_touch(&self, center: &Point2<f64>, radius: f64) -> bool {
        match self {
            Self::Box(g) => ball_intersects_rect(center, radius, &g.lower_left, &g.upper_right),
        }
    }

    /// Check whether the closed box `[min, max]` overlaps the goal
    pub fn box_touch(&self, min: &Point2<f64>, max: &Point2<f64>) -> bool {
        match self {
            Self::Box(g) => {
                min.x <= g.upper_right.x
                    && max.x >= g.lower_left.x
                    && min.y <= g.upper_right.y
                    && max.y >= g.lower_left.y
            }
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            Self::Box(g) => g.value,
        }
    }

    pub fn extent(&self) -> GoalExtent {
        match self {
            Self::Box(g) => GoalExtent::Box {
                lower_left: g.lower_left,
                upper_right: g.upper_right,
            },
        }
    }
}

impl From<BoxGoal> for Goal {
    fn from(goal: BoxGoal) -> Self {
        Self::Box(goal)
    }
}
