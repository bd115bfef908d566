//! # Velocity profiler
//!
//! Computes the velocity at each point of a resampled path. Velocities are
//! first capped by the curvature at each point, the end points are pinned
//! to the boundary velocities, and then a forward pass limits how quickly
//! the velocity can rise (`max_accel_mss`) and a backward pass how quickly it
//! must fall (`max_decel_mss`).
//!
//! Because the boundaries are pinned before either pass, the result is the
//! largest profile that satisfies all three limits at once. The passes never
//! move the pinned boundaries, so a boundary velocity the robot cannot leave
//! or reach within the first or last step is reported as an error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector2;

use super::{Params, TrajGenError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance on the squared velocity when checking the boundary steps.
///
/// Units: meters^2/second^2
const BOUNDARY_TOL_MMSS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// The velocity each point would be limited to by its curvature alone.
pub fn vel_caps(curvs_m: &[f64], params: &Params) -> Vec<f64> {
    curvs_m
        .iter()
        .map(|&c| params.max_vel_ms.min(params.turn_limit.vel_cap(params.max_vel_ms, c)))
        .collect()
}

/// Compute the velocity profile of a path.
///
/// `positions_m` and `curvs_m` must have the same length. The first and last
/// velocities are set to `start_vel_ms` and `end_vel_ms`. Returns
/// `InvalidWaypoints` if the robot cannot slow down from the start velocity
/// or speed up to the end velocity within the limits.
pub fn profile(
    positions_m: &[Vector2<f64>],
    curvs_m: &[f64],
    start_vel_ms: f64,
    end_vel_ms: f64,
    params: &Params,
) -> Result<Vec<f64>, TrajGenError> {
    let vels_ms = sweep(positions_m, curvs_m, start_vel_ms, end_vel_ms, params);

    check_boundaries(positions_m, &vels_ms, params)?;

    debug!(
        "Velocity profile over {} points, peak {:.3} m/s",
        vels_ms.len(),
        vels_ms.iter().cloned().fold(0.0, f64::max)
    );

    Ok(vels_ms)
}

/// Check that the first and last steps of a profile respect the
/// deceleration and acceleration limits.
///
/// The sweeps guarantee every other step, so these two are the only ones
/// which can fail.
pub fn check_boundaries(
    positions_m: &[Vector2<f64>],
    vels_ms: &[f64],
    params: &Params,
) -> Result<(), TrajGenError> {
    let n = vels_ms.len();
    if n < 2 {
        return Ok(());
    }

    let dist_m = (positions_m[1] - positions_m[0]).norm();
    let reachable_ms = (vels_ms[1].powi(2) + 2.0 * params.decel_mss() * dist_m).sqrt();
    if vels_ms[0].powi(2) > reachable_ms.powi(2) + BOUNDARY_TOL_MMSS {
        return Err(TrajGenError::InvalidWaypoints(format!(
            "start velocity of {:.4} m/s is above the {:.4} m/s the robot can slow to \
            {:.4} m/s from within {:.4} m",
            vels_ms[0], reachable_ms, vels_ms[1], dist_m
        )));
    }

    let dist_m = (positions_m[n - 1] - positions_m[n - 2]).norm();
    let reachable_ms = (vels_ms[n - 2].powi(2) + 2.0 * params.max_accel_mss * dist_m).sqrt();
    if vels_ms[n - 1].powi(2) > reachable_ms.powi(2) + BOUNDARY_TOL_MMSS {
        return Err(TrajGenError::InvalidWaypoints(format!(
            "end velocity of {:.4} m/s is above the {:.4} m/s the robot can reach from \
            {:.4} m/s within {:.4} m",
            vels_ms[n - 1], reachable_ms, vels_ms[n - 2], dist_m
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Cap, pin and sweep, without checking the boundary steps.
fn sweep(
    positions_m: &[Vector2<f64>],
    curvs_m: &[f64],
    start_vel_ms: f64,
    end_vel_ms: f64,
    params: &Params,
) -> Vec<f64> {
    let n = positions_m.len();

    match n {
        0 => return vec![],
        1 => return vec![start_vel_ms],
        _ => (),
    }

    // ---- CAP PASS ----

    let mut vels_ms = vel_caps(curvs_m, params);

    // ---- BOUNDARY ----

    vels_ms[0] = start_vel_ms;
    vels_ms[n - 1] = end_vel_ms;

    let two_a = 2.0 * params.max_accel_mss;
    let two_d = 2.0 * params.decel_mss();

    // ---- FORWARD PASS ----

    for i in 1..(n - 1) {
        let dist_m = (positions_m[i] - positions_m[i - 1]).norm();
        let reachable_ms = (vels_ms[i - 1].powi(2) + two_a * dist_m).sqrt();
        vels_ms[i] = vels_ms[i].min(reachable_ms);
    }

    // ---- BACKWARD PASS ----

    for i in (1..(n - 1)).rev() {
        let dist_m = (positions_m[i + 1] - positions_m[i]).norm();
        let reachable_ms = (vels_ms[i + 1].powi(2) + two_d * dist_m).sqrt();
        vels_ms[i] = vels_ms[i].min(reachable_ms);
    }

    vels_ms
}
