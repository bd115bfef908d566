//! # Time parameteriser
//!
//! Assigns a cumulative time to each point of a velocity-profiled path, and
//! the angular velocity the robot must have there.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;

use super::TrajGenError;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Cumulative time at each point.
///
/// The time between two points is their distance divided by the average of
/// their velocities, which is exact for constant acceleration between them.
/// If both velocities are zero the robot can never move between the points
/// and `ZeroVelocityMidPath` is returned with the index of the later point.
pub fn times(positions_m: &[Vector2<f64>], vels_ms: &[f64]) -> Result<Vec<f64>, TrajGenError> {
    let mut times_s = Vec::with_capacity(positions_m.len());

    if positions_m.is_empty() {
        return Ok(times_s);
    }

    times_s.push(0.0);

    for i in 1..positions_m.len() {
        let avg_vel_ms = 0.5 * (vels_ms[i - 1] + vels_ms[i]);

        if avg_vel_ms <= 0.0 {
            return Err(TrajGenError::ZeroVelocityMidPath { index: i });
        }

        let dist_m = (positions_m[i] - positions_m[i - 1]).norm();
        times_s.push(times_s[i - 1] + dist_m / avg_vel_ms);
    }

    Ok(times_s)
}

/// Angular velocity at each point from the kinematic identity
/// `ang_vel = vel * curv`.
pub fn ang_vels(vels_ms: &[f64], curvs_m: &[f64]) -> Vec<f64> {
    vels_ms
        .iter()
        .zip(curvs_m.iter())
        .map(|(v, c)| v * c)
        .collect()
}
