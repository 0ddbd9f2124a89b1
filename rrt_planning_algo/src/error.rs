use nalgebra::Point2;
use thiserror::Error;

use crate::path_planning::NodeId;

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Node {0:?} does not belong to this tree")]
    NodeNotInTree(NodeId),

    #[error("The root node cannot be reparented")]
    ReparentRoot,

    #[error("No free point found after {attempts} samples, walls may cover the whole space")]
    SamplingExhausted { attempts: usize },

    #[error("Path from {from} to {to} is still blocked after the nearest free point fallback")]
    GeometryInvariantViolation { from: Point2<f64>, to: Point2<f64> },

    #[error("Failed to load planner config: {0}")]
    Config(#[from] config::ConfigError),
}

pub type PlanningResult<T> = Result<T, PlanningError>;
