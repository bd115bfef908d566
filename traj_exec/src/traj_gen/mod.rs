//! # Trajectory generation module
//!
//! Trajectory generation turns a sparse list of waypoints into a dense,
//! time-parameterised trajectory the robot can actually drive.
//!
//! Generation is a strict pipeline, each stage consuming the full output of
//! the one before it:
//!
//! 1. The path builder joins each pair of consecutive waypoints with a cubic
//!    curve segment, whose end tangents come from the waypoint headings.
//! 2. Each segment is resampled into points roughly `spacing_m` apart.
//! 3. The signed curvature is evaluated at every point.
//! 4. The velocity profiler limits the speed at each point by the curvature
//!    there and by the maximum acceleration and deceleration of the robot.
//! 5. The time parameteriser integrates the profile into a time for each
//!    point, and gives the angular velocity from the curvature.
//!
//! The heading is continuous across waypoints but the curvature is not, so
//! at a waypoint the larger magnitude curvature of the two segments meeting
//! there is used.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod curve;
pub mod params;
pub mod path_builder;
pub mod resample;
pub mod time_param;
pub mod trajectory;
pub mod vel_profile;
pub mod waypoint;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use nalgebra::Vector2;

// Internal
pub use curve::{CurvEval, CurveSegment};
pub use params::{CurveKind, NonConvergencePolicy, Params, TurnLimit};
pub use trajectory::{TrajCursor, TrajRecord, TrajSample, Trajectory};
pub use waypoint::Waypoint;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Curvature used in place of zero or undefined curvature, so that nothing
/// downstream ever divides by zero.
///
/// Units: 1/meters
pub const MIN_CURV_M: f64 = 1e-8;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A trajectory generator with a fixed set of parameters.
#[derive(Debug, Clone)]
pub struct TrajGen {
    params: Params,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during trajectory generation.
#[derive(Debug, thiserror::Error)]
pub enum TrajGenError {
    #[error("Invalid waypoints: {0}")]
    InvalidWaypoints(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Segment {segment} cannot be traversed, degenerate at t = {t}")]
    DegenerateCurve { segment: usize, t: f64 },

    #[error(
        "Resampling of segment {segment} did not converge after {iters} iterations \
        (t = {t}, distance = {distance_m} m)"
    )]
    ResamplerNonConvergence {
        segment: usize,
        t: f64,
        distance_m: f64,
        iters: usize,
    },

    #[error(
        "Resampling of segment {segment} stopped at the limit of {max_points} points \
        (t = {t}, {distance_m} m from the end)"
    )]
    ResamplerPointLimit {
        segment: usize,
        t: f64,
        distance_m: f64,
        max_points: usize,
    },

    #[error("Velocity is zero either side of sample {index}, the trajectory cannot be completed")]
    ZeroVelocityMidPath { index: usize },

    #[error("Could not load trajectory generation parameters: {0}")]
    ParamLoadError(util::params::LoadError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajGen {
    /// Initialise the generator from a parameter file.
    pub fn init(params_path: &str) -> Result<Self, TrajGenError> {
        let params = match util::params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(TrajGenError::ParamLoadError(e)),
        };

        Self::new(params)
    }

    /// Create a generator from already loaded parameters.
    pub fn new(params: Params) -> Result<Self, TrajGenError> {
        params.validate()?;

        Ok(Self { params })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Generate a trajectory through the given waypoints.
    pub fn generate(&self, waypoints: &[Waypoint]) -> Result<Trajectory, TrajGenError> {
        generate(waypoints, &self.params)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Generate a trajectory through the given waypoints.
///
/// The first and last samples are exactly at the first and last waypoints,
/// with the boundary velocities those waypoints specify.
pub fn generate(waypoints: &[Waypoint], params: &Params) -> Result<Trajectory, TrajGenError> {
    params.validate()?;

    let segments = path_builder::build(waypoints, params)?;

    // ---- RESAMPLING ----

    let mut positions_m: Vec<Vector2<f64>> = Vec::new();
    let mut headings_rad = Vec::new();
    let mut curvs_m: Vec<f64> = Vec::new();
    let mut waypoint_indices = vec![0];

    for (seg_index, seg) in segments.iter().enumerate() {
        let points = resample::resample(seg, seg_index, params)?;

        // The first point of every segment after the first is the previous
        // segment's last point, only its curvature is merged.
        let skip = if seg_index == 0 { 0 } else { 1 };

        if let Some(junction_curv_m) = curvs_m.last_mut() {
            let outgoing_m = eval_curv(seg, seg_index, 0.0);
            if outgoing_m.abs() > junction_curv_m.abs() {
                *junction_curv_m = outgoing_m;
            }
        }

        for point in points.iter().skip(skip) {
            positions_m.push(point.position_m);
            headings_rad.push(seg.heading(point.t));
            curvs_m.push(eval_curv(seg, seg_index, point.t));
        }

        waypoint_indices.push(positions_m.len() - 1);
    }

    debug!(
        "Resampled {} segments into {} points",
        segments.len(),
        positions_m.len()
    );

    // ---- PROFILING ----

    // Safe to index, the builder requires at least 2 waypoints
    let first = &waypoints[0];
    let last = &waypoints[waypoints.len() - 1];

    let vels_ms = vel_profile::profile(
        &positions_m,
        &curvs_m,
        first.vel_ms,
        last.vel_ms,
        params,
    )?;

    let times_s = time_param::times(&positions_m, &vels_ms)?;

    let mut ang_vels_rads = time_param::ang_vels(&vels_ms, &curvs_m);
    let n = ang_vels_rads.len();
    if let Some(w) = first.ang_vel_rads {
        ang_vels_rads[0] = w;
    }
    if let Some(w) = last.ang_vel_rads {
        ang_vels_rads[n - 1] = w;
    }

    // ---- ASSEMBLY ----

    let samples: Vec<TrajSample> = (0..n)
        .map(|i| TrajSample {
            position_m: positions_m[i],
            heading_rad: headings_rad[i],
            curv_m: curvs_m[i],
            vel_ms: vels_ms[i],
            ang_vel_rads: ang_vels_rads[i],
            time_s: times_s[i],
        })
        .collect();

    let traj = Trajectory::new(samples, waypoint_indices);

    info!(
        "Generated trajectory of {} samples through {} waypoints, duration {:.3} s, peak velocity {:.3} m/s",
        traj.len(),
        waypoints.len(),
        traj.duration_s(),
        vels_ms.iter().cloned().fold(0.0, f64::max)
    );

    Ok(traj)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Curvature of the segment at `t`, substituting `MIN_CURV_M` where it is
/// zero or undefined.
fn eval_curv(seg: &CurveSegment, seg_index: usize, t: f64) -> f64 {
    let eval = seg.curvature(t);

    if let CurvEval::Degenerate = eval {
        debug!(
            "Degenerate curvature on segment {} at t = {}, using {}",
            seg_index,
            t,
            MIN_CURV_M
        );
    }

    eval.value()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
    use util::maths::get_ang_dist;

    /// Checks every generated trajectory must pass.
    fn check_traj(traj: &Trajectory, waypoints: &[Waypoint], params: &Params) {
        let samples = traj.samples();
        let n = samples.len();
        let two_a = 2.0 * params.max_accel_mss;
        let two_d = 2.0 * params.decel_mss();

        assert!(n >= 2);

        // Endpoints exact
        assert_eq!(samples[0].position_m, waypoints[0].position_m);
        assert_eq!(samples[n - 1].position_m, waypoints[waypoints.len() - 1].position_m);
        assert_eq!(samples[0].vel_ms, waypoints[0].vel_ms);
        assert_eq!(samples[n - 1].vel_ms, waypoints[waypoints.len() - 1].vel_ms);
        assert_eq!(samples[0].time_s, 0.0);

        // Waypoints are sampled exactly
        assert_eq!(traj.waypoint_indices().len(), waypoints.len());
        for (w, &i) in waypoints.iter().zip(traj.waypoint_indices().iter()) {
            assert_eq!(samples[i].position_m, w.position_m);
        }

        for s in samples {
            assert!(s.vel_ms >= 0.0 && s.vel_ms <= params.max_vel_ms);
        }

        for (i, pair) in samples.windows(2).enumerate() {
            let dist_m = (pair[1].position_m - pair[0].position_m).norm();
            let dv2 = pair[1].vel_ms.powi(2) - pair[0].vel_ms.powi(2);

            assert!(dv2 <= two_a * dist_m + 1e-9, "accelerating at sample {}", i);
            assert!(-dv2 <= two_d * dist_m + 1e-9, "decelerating at sample {}", i);
            assert!(pair[1].time_s >= pair[0].time_s);
            if pair[0].vel_ms > 0.0 || pair[1].vel_ms > 0.0 {
                assert!(pair[1].time_s > pair[0].time_s);
            }

            // Evenly spaced, apart from the last step onto each waypoint
            if traj.waypoint_indices().contains(&(i + 1)) {
                assert!(dist_m > 0.0);
                assert!(dist_m <= params.spacing_m + params.max_spacing_error_m);
            } else {
                assert!(
                    (dist_m - params.spacing_m).abs() <= params.max_spacing_error_m,
                    "spacing {} at sample {}",
                    dist_m,
                    i
                );
            }
        }
    }

    #[test]
    fn test_trapezoid() {
        let params = Params {
            max_vel_ms: 2.0,
            max_accel_mss: 1.0,
            spacing_m: 0.1,
            ..Params::default()
        };

        for &bend_m in [10.0 / 3.0, 1.0].iter() {
            let waypoints = vec![
                Waypoint::new(0.0, 0.0, 0.0).with_bend(bend_m),
                Waypoint::new(10.0, 0.0, 0.0).with_bend(bend_m),
            ];

            let traj = generate(&waypoints, &params).unwrap();
            check_traj(&traj, &waypoints, &params);

            // Velocity follows the ideal trapezoid in distance travelled
            let length_m = 10.0;
            let mut dist_m = 0.0;
            let samples = traj.samples();
            for i in 0..samples.len() {
                if i > 0 {
                    dist_m += (samples[i].position_m - samples[i - 1].position_m).norm();
                }

                let ideal_ms = params
                    .max_vel_ms
                    .min((2.0 * dist_m).sqrt())
                    .min((2.0 * (length_m - dist_m).max(0.0)).sqrt());

                assert!(
                    (samples[i].vel_ms - ideal_ms).abs() < 1e-6,
                    "sample {}: {} != {}",
                    i,
                    samples[i].vel_ms,
                    ideal_ms
                );
                assert!(samples[i].heading_rad.abs() < 1e-12);
                assert!(samples[i].ang_vel_rads.abs() < 1e-6);
            }

            assert!((traj.duration_s() - 7.0).abs() < 0.01, "{}", traj.duration_s());
        }
    }

    #[test]
    fn test_corner_slows_down() {
        let params = Params {
            max_vel_ms: 2.0,
            max_accel_mss: 1.0,
            spacing_m: 0.05,
            turn_limit: TurnLimit::TrackWidth {
                track_width_m: 0.35,
            },
            ..Params::default()
        };

        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(5.0, 0.0, FRAC_PI_2).with_bend(0.5),
            Waypoint::new(5.0, 5.0, FRAC_PI_2),
        ];

        let traj = generate(&waypoints, &params).unwrap();
        check_traj(&traj, &waypoints, &params);

        // The corner is the tightest part of the path
        let corner = &traj.samples()[traj.waypoint_indices()[1]];
        assert!((corner.curv_m - 12.0).abs() < 1e-9, "{}", corner.curv_m);
        assert!((corner.heading_rad - FRAC_PI_2).abs() < 1e-9);

        // Just under the cap there, held back a little by the samples either side
        let corner_cap_ms = vel_profile::vel_caps(&[corner.curv_m], &params)[0];
        assert!((corner_cap_ms - 2.0 / (12.0 * 0.35)).abs() < 1e-6);
        assert!(corner.vel_ms <= corner_cap_ms + 1e-12);
        assert!(corner_cap_ms - corner.vel_ms < 0.01, "{}", corner.vel_ms);

        // Never faster than the curvature allows
        for s in traj.iter() {
            let cap_ms = vel_profile::vel_caps(&[s.curv_m], &params)[0];
            assert!(s.vel_ms <= cap_ms + 1e-12);
        }

        // Back up to full speed halfway up the straight
        let halfway = traj
            .iter()
            .min_by(|a, b| {
                let da = (a.position_m - Vector2::new(5.0, 2.5)).norm();
                let db = (b.position_m - Vector2::new(5.0, 2.5)).norm();
                da.partial_cmp(&db).unwrap()
            })
            .unwrap();
        assert!((halfway.vel_ms - params.max_vel_ms).abs() < 1e-9);

        // Left turn, positive curvature and angular velocity
        assert!(corner.ang_vel_rads > 0.0);
    }

    #[test]
    fn test_separate_decel() {
        let params = Params {
            max_vel_ms: 2.0,
            max_accel_mss: 1.0,
            max_decel_mss: Some(2.0),
            spacing_m: 0.1,
            ..Params::default()
        };

        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0).with_bend(10.0 / 3.0),
            Waypoint::new(10.0, 0.0, 0.0).with_bend(10.0 / 3.0),
        ];

        let traj = generate(&waypoints, &params).unwrap();
        check_traj(&traj, &waypoints, &params);

        let length_m = 10.0;
        let mut dist_m = 0.0;
        let samples = traj.samples();
        for i in 0..samples.len() {
            if i > 0 {
                dist_m += (samples[i].position_m - samples[i - 1].position_m).norm();
            }

            let ideal_ms = params
                .max_vel_ms
                .min((2.0 * dist_m).sqrt())
                .min((4.0 * (length_m - dist_m).max(0.0)).sqrt());

            assert!((samples[i].vel_ms - ideal_ms).abs() < 1e-6, "sample {}", i);
        }

        // 2 s up to speed over 2 m, 1 s to stop over 1 m, 7 m at 2 m/s
        assert!((traj.duration_s() - 6.5).abs() < 0.01, "{}", traj.duration_s());
    }

    #[test]
    fn test_unreachable_boundary_velocity() {
        let params = Params::default();

        // Far too fast to stop within 0.3 m
        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0).with_vel(1.9),
            Waypoint::new(0.3, 0.0, 0.0),
        ];
        assert!(matches!(
            generate(&waypoints, &params),
            Err(TrajGenError::InvalidWaypoints(_))
        ));

        // Same start velocity with room to stop
        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0).with_vel(1.9),
            Waypoint::new(3.0, 0.0, 0.0),
        ];
        let traj = generate(&waypoints, &params).unwrap();
        check_traj(&traj, &waypoints, &params);
    }

    #[test]
    fn test_kinked_junction() {
        let params = Params::default();

        // No bend at the corner, the path would turn on the spot
        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(5.0, 0.0, FRAC_PI_2).with_bend(0.0),
            Waypoint::new(5.0, 5.0, FRAC_PI_2),
        ];
        match generate(&waypoints, &params) {
            Err(TrajGenError::DegenerateCurve { segment, t }) => {
                assert_eq!(segment, 0);
                assert_eq!(t, 1.0);
            }
            r => panic!("Expected a degenerate curve, got {:?}", r),
        }

        // No bend on a straight run is fine
        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(5.0, 0.0, 0.0).with_bend(0.0),
            Waypoint::new(10.0, 0.0, 0.0),
        ];
        let traj = generate(&waypoints, &params).unwrap();
        check_traj(&traj, &waypoints, &params);
        assert!(traj.iter().all(|s| s.heading_rad.abs() < 1e-9));
    }

    #[test]
    fn test_bend_increases_deviation() {
        let mut params = Params {
            spacing_m: 0.05,
            ..Params::default()
        };

        let deviations_m: Vec<f64> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&bend_m| {
                params.default_bend_m = bend_m;

                let waypoints = vec![
                    Waypoint::new(0.0, 0.0, FRAC_PI_4),
                    Waypoint::new(10.0, 0.0, FRAC_PI_4),
                ];
                let traj = generate(&waypoints, &params).unwrap();
                check_traj(&traj, &waypoints, &params);

                traj.iter().map(|s| s.position_m.y.abs()).fold(0.0, f64::max)
            })
            .collect();

        assert!(deviations_m[0] < deviations_m[1]);
        assert!(deviations_m[1] < deviations_m[2]);

        // The deviation of the curve is linear in the bend
        assert!((deviations_m[1] / deviations_m[0] - 2.0).abs() < 0.05);
        assert!((deviations_m[2] / deviations_m[0] - 3.0).abs() < 0.05);
    }

    #[test]
    fn test_ang_vel_matches_heading_change() {
        let params = Params {
            spacing_m: 0.05,
            default_bend_m: 1.5,
            ..Params::default()
        };

        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(4.0, 2.0, 0.0),
            Waypoint::new(6.0, 0.0, -FRAC_PI_2).with_bend(1.0),
        ];

        let traj = generate(&waypoints, &params).unwrap();
        check_traj(&traj, &waypoints, &params);

        let samples = traj.samples();
        let wp_indices = traj.waypoint_indices();
        for i in 1..samples.len() {
            // Curvature jumps at waypoints, skip the pairs touching them
            if wp_indices.contains(&i) || wp_indices.contains(&(i - 1)) {
                continue;
            }

            let (prev, curr) = (&samples[i - 1], &samples[i]);
            let dt_s = curr.time_s - prev.time_s;
            let diff_rads = get_ang_dist(prev.heading_rad, curr.heading_rad) / dt_s;
            let mean_rads = 0.5 * (prev.ang_vel_rads + curr.ang_vel_rads);

            assert!(
                (diff_rads - mean_rads).abs() < 0.02 + 0.02 * mean_rads.abs(),
                "{} != {} at sample {}",
                diff_rads,
                mean_rads,
                i
            );
        }
    }

    #[test]
    fn test_hermite() {
        let params = Params {
            curve_kind: CurveKind::Hermite,
            spacing_m: 0.05,
            default_bend_m: 3.0,
            turn_limit: TurnLimit::WheelSpeed {
                track_width_m: 0.35,
            },
            ..Params::default()
        };

        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0).with_vel(0.5),
            Waypoint::new(3.0, 3.0, FRAC_PI_2),
            Waypoint::new(0.0, 6.0, std::f64::consts::PI).with_tangent(Vector2::new(-4.0, 0.0)),
        ];

        let traj = generate(&waypoints, &params).unwrap();
        check_traj(&traj, &waypoints, &params);

        assert_eq!(traj.first().unwrap().vel_ms, 0.5);
        assert_eq!(traj.waypoint_indices().len(), 3);
    }

    #[test]
    fn test_endpoint_ang_vel_override() {
        let params = Params::default();

        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0).with_vel(0.2).with_ang_vel(0.4),
            Waypoint::new(1.0, 1.0, FRAC_PI_2).with_ang_vel(-0.1),
        ];

        let traj = generate(&waypoints, &params).unwrap();

        assert_eq!(traj.first().unwrap().ang_vel_rads, 0.4);
        assert_eq!(traj.last().unwrap().ang_vel_rads, -0.1);
    }

    #[test]
    fn test_too_short_to_move() {
        let params = Params::default();

        // Both samples at rest, nothing can move the robot between them
        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(0.005, 0.0, 0.0),
        ];
        assert!(matches!(
            generate(&waypoints, &params),
            Err(TrajGenError::ZeroVelocityMidPath { index: 1 })
        ));

        let waypoints = vec![
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(0.005, 0.0, 0.0).with_vel(0.1),
        ];
        let traj = generate(&waypoints, &params).unwrap();
        assert_eq!(traj.len(), 2);
        assert!((traj.duration_s() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_traj_gen_rejects_params() {
        let params = Params {
            max_accel_mss: 0.0,
            ..Params::default()
        };

        assert!(matches!(
            TrajGen::new(params),
            Err(TrajGenError::InvalidParams(_))
        ));

        let gen = TrajGen::new(Params::default()).unwrap();
        let res = gen.generate(&[Waypoint::new(0.0, 0.0, 0.0)]);
        assert!(matches!(res, Err(TrajGenError::InvalidWaypoints(_))));
    }
}
