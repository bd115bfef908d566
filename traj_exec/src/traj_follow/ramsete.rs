//! # RAMSETE follower
//!
//! Nonlinear unicycle tracking controller. The target sample's velocity and
//! angular velocity are used as a feed-forward, and corrected by the error
//! between the robot and the target expressed in the robot's own frame:
//!
//! ```text
//! k = 2 zeta sqrt(w_d^2 + b v_d^2)
//! v = v_d cos(e_h) + k e_x
//! w = w_d + k e_h + b v_d sinc(e_h) e_y
//! ```
//!
//! `b > 0` makes the controller more aggressive, `zeta` in `(0, 1)` adds
//! damping.
//!
//! With `reversed` set the robot drives the trajectory backwards: its heading
//! is turned by pi before the error is taken, and the wheel demands are
//! swapped and negated.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Deserialize;
use std::f64::consts::PI;

// Internal
use super::{DiffDriveCmd, Pose2, TrajFollower};
use crate::traj_gen::TrajSample;
use util::maths::{clamp, get_ang_dist};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this heading error `sinc` is taken as 1.
const SINC_EPSILON_RAD: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the RAMSETE follower
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RamseteParams {
    /// Aggressiveness gain, must be positive.
    pub b: f64,

    /// Damping gain, in (0, 1).
    pub zeta: f64,

    /// Distance between the left and right wheels.
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// Wheel velocity demands are clamped to +/- this value.
    ///
    /// Units: meters/second
    pub max_wheel_vel_ms: f64,

    /// Drive the trajectory with the back of the robot leading.
    #[serde(default)]
    pub reversed: bool,
}

/// RAMSETE trajectory follower
#[derive(Debug, Clone)]
pub struct Ramsete {
    params: RamseteParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for RamseteParams {
    fn default() -> Self {
        Self {
            b: 2.0,
            zeta: 0.7,
            track_width_m: 0.35,
            max_wheel_vel_ms: 1.94,
            reversed: false,
        }
    }
}

impl Ramsete {
    pub fn new(params: RamseteParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RamseteParams {
        &self.params
    }

    /// Error of the pose relative to the target, in the pose's frame.
    ///
    /// Returns `(along, lateral, heading)`, with lateral positive when the
    /// target is to the left.
    pub fn error(target: &TrajSample, pose: &Pose2) -> (f64, f64, f64) {
        let diff_m = target.position_m - pose.position_m;
        let (sin_h, cos_h) = pose.heading_rad.sin_cos();

        (
            cos_h * diff_m.x + sin_h * diff_m.y,
            -sin_h * diff_m.x + cos_h * diff_m.y,
            get_ang_dist(pose.heading_rad, target.heading_rad),
        )
    }
}

impl TrajFollower for Ramsete {
    fn follow(&mut self, target: &TrajSample, pose: &Pose2) -> DiffDriveCmd {
        let p = &self.params;

        let pose = if p.reversed {
            Pose2 {
                heading_rad: pose.heading_rad + PI,
                ..*pose
            }
        } else {
            *pose
        };

        let (ex_m, ey_m, eh_rad) = Self::error(target, &pose);
        let vd_ms = target.vel_ms;
        let wd_rads = target.ang_vel_rads;

        let k = 2.0 * p.zeta * (wd_rads.powi(2) + p.b * vd_ms.powi(2)).sqrt();

        let sinc = if eh_rad.abs() < SINC_EPSILON_RAD {
            1.0
        } else {
            eh_rad.sin() / eh_rad
        };

        let vel_ms = vd_ms * eh_rad.cos() + k * ex_m;
        let ang_vel_rads = wd_rads + k * eh_rad + p.b * vd_ms * sinc * ey_m;

        let half_track_m = 0.5 * p.track_width_m;

        trace!(
            "RAMSETE error ({:.4}, {:.4}, {:.4}) -> v = {:.4} m/s, w = {:.4} rad/s",
            ex_m,
            ey_m,
            eh_rad,
            vel_ms,
            ang_vel_rads
        );

        let mut left_ms = vel_ms - ang_vel_rads * half_track_m;
        let mut right_ms = vel_ms + ang_vel_rads * half_track_m;

        if p.reversed {
            let forward_left_ms = left_ms;
            left_ms = -right_ms;
            right_ms = -forward_left_ms;
        }

        DiffDriveCmd {
            left_ms: clamp(left_ms, -p.max_wheel_vel_ms, p.max_wheel_vel_ms),
            right_ms: clamp(right_ms, -p.max_wheel_vel_ms, p.max_wheel_vel_ms),
        }
    }
}
