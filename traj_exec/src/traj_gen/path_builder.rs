//! # Path builder
//!
//! Converts an ordered list of waypoints into one curve segment per pair of
//! consecutive waypoints. Segments are independent of each other: the
//! heading is continuous across a waypoint but the curvature, in general, is
//! not.
//!
//! A waypoint with zero bend gives a cusp at the ends of the segments either
//! side of it, where the curve arrives along its control polygon rather than
//! along the waypoint heading. Unless both segments arrive and leave in the
//! same direction this is a kink the robot could only follow by turning on
//! the spot, so it is rejected.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use super::{CurveKind, CurveSegment, Params, TrajGenError, Waypoint};
use util::maths::get_ang_dist;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Consecutive waypoints closer than this are considered to be coincident.
pub const MIN_WAYPOINT_SEP_M: f64 = 1e-9;

/// Largest change of heading accepted between the end of one segment and the
/// start of the next.
///
/// Units: radians
pub const MAX_JUNCTION_KINK_RAD: f64 = 1e-4;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Check the waypoints can be used to build a path.
pub fn validate_waypoints(waypoints: &[Waypoint], params: &Params) -> Result<(), TrajGenError> {
    if waypoints.len() < 2 {
        return Err(TrajGenError::InvalidWaypoints(format!(
            "At least 2 waypoints are required, found {}",
            waypoints.len()
        )));
    }

    if let Some(i) = waypoints.iter().position(|w| !w.is_finite()) {
        return Err(TrajGenError::InvalidWaypoints(format!(
            "Waypoint {} contains non-finite values",
            i
        )));
    }

    if let Some(i) = waypoints.iter().position(|w| w.bend_m.map_or(false, |b| b < 0.0)) {
        return Err(TrajGenError::InvalidWaypoints(format!(
            "Waypoint {} has a negative bend",
            i
        )));
    }

    // Only the boundary velocities are used, and they must be reachable
    let last = waypoints.len() - 1;
    for &i in [0, last].iter() {
        let vel_ms = waypoints[i].vel_ms;
        if vel_ms < 0.0 || vel_ms > params.max_vel_ms {
            return Err(TrajGenError::InvalidWaypoints(format!(
                "Boundary velocity of waypoint {} ({} m/s) must be in [0, {}]",
                i, vel_ms, params.max_vel_ms
            )));
        }
    }

    Ok(())
}

/// Build the curve segments joining each consecutive pair of waypoints.
///
/// The segment at index `i` joins waypoint `i` to waypoint `i + 1`.
pub fn build(waypoints: &[Waypoint], params: &Params) -> Result<Vec<CurveSegment>, TrajGenError> {
    validate_waypoints(waypoints, params)?;

    let segments = waypoints
        .windows(2)
        .enumerate()
        .map(|(i, pair)| build_segment(i, &pair[0], &pair[1], params))
        .collect::<Result<Vec<_>, _>>()?;

    // ---- JUNCTIONS ----

    for (i, pair) in segments.windows(2).enumerate() {
        let kink_rad = get_ang_dist(pair[0].heading(1.0), pair[1].heading(0.0));

        if kink_rad.abs() > MAX_JUNCTION_KINK_RAD {
            debug!(
                "Heading jumps by {:.4} rad at waypoint {}",
                kink_rad,
                i + 1
            );
            return Err(TrajGenError::DegenerateCurve { segment: i, t: 1.0 });
        }
    }

    debug!(
        "Built {} {:?} segments from {} waypoints",
        segments.len(),
        params.curve_kind,
        waypoints.len()
    );

    Ok(segments)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn build_segment(
    index: usize,
    start: &Waypoint,
    end: &Waypoint,
    params: &Params,
) -> Result<CurveSegment, TrajGenError> {
    if (end.position_m - start.position_m).norm() < MIN_WAYPOINT_SEP_M {
        return Err(TrajGenError::DegenerateCurve {
            segment: index,
            t: 0.0,
        });
    }

    let start_bend_m = start.bend_m.unwrap_or(params.default_bend_m);
    let end_bend_m = end.bend_m.unwrap_or(params.default_bend_m);

    let seg = match params.curve_kind {
        CurveKind::Bezier => CurveSegment::Bezier {
            p0: start.position_m,
            p1: start.position_m + start.direction() * start_bend_m,
            p2: end.position_m - end.direction() * end_bend_m,
            p3: end.position_m,
        },
        CurveKind::Hermite => CurveSegment::Hermite {
            p0: start.position_m,
            m0: start
                .tangent
                .unwrap_or_else(|| start.direction() * start_bend_m),
            p1: end.position_m,
            m1: end.tangent.unwrap_or_else(|| end.direction() * end_bend_m),
        },
    };

    Ok(seg)
}
