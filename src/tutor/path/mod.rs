pub mod planner;
pub mod scoring;

pub use planner::{LearningPathPlanner, NodeStatus, PathNode, PathRequest};
pub use scoring::PreferenceMode;
