//! # Trajectory following module
//!
//! A trajectory follower is given the current target sample of a trajectory
//! and the robot's estimated pose each cycle, and returns the wheel velocity
//! demands that will bring the robot back onto the trajectory.
//!
//! Time keeping is left to the caller, usually by walking the trajectory with
//! a [`TrajCursor`](crate::traj_gen::TrajCursor).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod ramsete;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::traj_gen::TrajSample;
pub use ramsete::{Ramsete, RamseteParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose on the plane.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose2 {
    /// Position of the robot.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading of the robot, counter-clockwise from +X.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Wheel velocity demands for a differential drive robot.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffDriveCmd {
    /// Units: meters/second
    pub left_ms: f64,

    /// Units: meters/second
    pub right_ms: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A controller keeping the robot on a trajectory.
pub trait TrajFollower {
    /// Get the command to drive towards `target` from `pose`.
    fn follow(&mut self, target: &TrajSample, pose: &Pose2) -> DiffDriveCmd;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }
}

impl From<&TrajSample> for Pose2 {
    fn from(sample: &TrajSample) -> Self {
        Self {
            position_m: sample.position_m,
            heading_rad: sample.heading_rad,
        }
    }
}

impl DiffDriveCmd {
    /// Forward and angular velocity of the robot for this command.
    ///
    /// Units: (meters/second, radians/second)
    pub fn body_vels(&self, track_width_m: f64) -> (f64, f64) {
        (
            0.5 * (self.left_ms + self.right_ms),
            (self.right_ms - self.left_ms) / track_width_m,
        )
    }
}
