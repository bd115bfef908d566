//! # Trajectory library.
//!
//! This library allows other crates in the workspace to generate and follow
//! curvature limited trajectories for a differential drive robot.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Trajectory generation - turns waypoints into a time parameterised trajectory
pub mod traj_gen;

/// Trajectory following - converts trajectory samples into wheel commands
pub mod traj_follow;
