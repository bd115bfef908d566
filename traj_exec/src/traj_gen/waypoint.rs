//! Waypoints the trajectory passes through

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose the trajectory must pass through.
///
/// Headings are measured counter-clockwise from the +X axis.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the waypoint.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading of the robot when passing through the waypoint.
    ///
    /// Units: radians
    pub heading_rad: f64,

    /// Velocity of the robot at this waypoint. Only used for the first and
    /// last waypoints, which pin the boundary velocities of the trajectory.
    ///
    /// Units: meters/second
    #[serde(default)]
    pub vel_ms: f64,

    /// Angular velocity at this waypoint, only used for the first and last
    /// waypoints. If not given it is derived from the velocity and curvature.
    ///
    /// Units: radians/second
    #[serde(default)]
    pub ang_vel_rads: Option<f64>,

    /// Shaping of the curve around this waypoint, see
    /// [`Params::default_bend_m`](super::Params::default_bend_m).
    ///
    /// Units: meters
    #[serde(default)]
    pub bend_m: Option<f64>,

    /// Explicit tangent for Hermite curves, overriding heading and bend.
    #[serde(default)]
    pub tangent: Option<Vector2<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    /// Create a new waypoint at rest with default shaping.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
            vel_ms: 0.0,
            ang_vel_rads: None,
            bend_m: None,
            tangent: None,
        }
    }

    pub fn with_bend(mut self, bend_m: f64) -> Self {
        self.bend_m = Some(bend_m);
        self
    }

    pub fn with_vel(mut self, vel_ms: f64) -> Self {
        self.vel_ms = vel_ms;
        self
    }

    pub fn with_ang_vel(mut self, ang_vel_rads: f64) -> Self {
        self.ang_vel_rads = Some(ang_vel_rads);
        self
    }

    pub fn with_tangent(mut self, tangent: Vector2<f64>) -> Self {
        self.tangent = Some(tangent);
        self
    }

    /// Unit vector pointing along the waypoint's heading.
    pub fn direction(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Returns `true` if every value in the waypoint is finite.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|v| v.is_finite())
            && self.heading_rad.is_finite()
            && self.vel_ms.is_finite()
            && self.ang_vel_rads.map_or(true, f64::is_finite)
            && self.bend_m.map_or(true, f64::is_finite)
            && self
                .tangent
                .map_or(true, |t| t.iter().all(|v| v.is_finite()))
    }
}
