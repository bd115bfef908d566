//! # Arc-length resampler
//!
//! Walks a curve segment producing points approximately `spacing_m` apart in
//! Euclidean distance. Each new point is found by a biased bisection on the
//! curve parameter between the previous point and the end of the segment.
//!
//! The final point of every segment is the segment's end point exactly, so
//! the last gap of a segment may be shorter than the target spacing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Vector2;

use super::{CurveSegment, NonConvergencePolicy, Params, TrajGenError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// An accepted point closer than this to the end of the segment is replaced
/// by the end point itself.
const COINCIDENT_M: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on a curve segment and the parameter it was found at.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CurvePoint {
    /// Curve parameter, in `[0, 1]`
    pub t: f64,

    /// Position of the point.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Resample the segment at the spacing given in the parameters.
///
/// `seg_index` is only used to give context to errors and logs.
pub fn resample(
    seg: &CurveSegment,
    seg_index: usize,
    params: &Params,
) -> Result<Vec<CurvePoint>, TrajGenError> {
    let end_m = seg.end();
    let stop_dist_m = params.spacing_m + params.max_spacing_error_m;

    // Each converged step covers at least (spacing - error) of arc, and the
    // arc is no longer than the control polygon.
    let max_points = (seg.control_polygon_length()
        / (params.spacing_m - params.max_spacing_error_m))
        .floor() as usize
        + 2;

    let mut points = vec![CurvePoint {
        t: 0.0,
        position_m: seg.start(),
    }];

    loop {
        // Safe to unwrap, points is never empty
        let last = *points.last().unwrap();

        if (end_m - last.position_m).norm() <= stop_dist_m {
            break;
        }

        if points.len() >= max_points {
            return Err(TrajGenError::ResamplerPointLimit {
                segment: seg_index,
                t: last.t,
                distance_m: (end_m - last.position_m).norm(),
                max_points,
            });
        }

        points.push(next_point(seg, seg_index, &last, params)?);
    }

    // Land exactly on the end of the segment
    if points.len() > 1 {
        // Safe to unwrap, points is never empty
        let last = points.last().unwrap();
        if (end_m - last.position_m).norm() < COINCIDENT_M {
            points.pop();
        }
    }
    points.push(CurvePoint {
        t: 1.0,
        position_m: end_m,
    });

    debug!(
        "Segment {} resampled into {} points at {} m",
        seg_index,
        points.len(),
        params.spacing_m
    );

    Ok(points)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the next point `spacing_m` away from `from`.
///
/// The caller must ensure the end of the segment is further than the
/// spacing from the `from` point, so that the bracket `[from.t, 1]` contains
/// a solution.
fn next_point(
    seg: &CurveSegment,
    seg_index: usize,
    from: &CurvePoint,
    params: &Params,
) -> Result<CurvePoint, TrajGenError> {
    let scaling = params.bisect_scaling;

    let mut t_lo = from.t;
    let mut t_hi = 1.0;
    let mut t = t_lo * scaling + t_hi * (1.0 - scaling);
    let mut position_m = seg.position(t);
    let mut dist_m = (position_m - from.position_m).norm();
    let mut iters = 0;

    while (dist_m - params.spacing_m).abs() > params.max_spacing_error_m {
        if iters >= params.max_bisect_iters {
            let err = TrajGenError::ResamplerNonConvergence {
                segment: seg_index,
                t,
                distance_m: dist_m,
                iters,
            };

            match params.non_convergence {
                NonConvergencePolicy::Fail => return Err(err),
                NonConvergencePolicy::AcceptBestEffort => {
                    // A point which doesn't move along the curve would never
                    // reach the end of the segment
                    if t <= from.t {
                        return Err(err);
                    }

                    warn!("{}, accepting best effort point", err);
                    break;
                }
            }
        }

        if dist_m > params.spacing_m {
            t_hi = t;
        } else {
            t_lo = t;
        }

        t = t_lo * scaling + t_hi * (1.0 - scaling);
        position_m = seg.position(t);
        dist_m = (position_m - from.position_m).norm();
        iters += 1;
    }

    Ok(CurvePoint { t, position_m })
}
