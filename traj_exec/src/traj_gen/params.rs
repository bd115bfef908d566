//! Trajectory generation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::TrajGenError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory generation
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Params {
    // ---- KINEMATIC LIMITS ----
    /// Maximum linear velocity of the robot.
    ///
    /// Units: meters/second
    pub max_vel_ms: f64,

    /// Maximum linear acceleration of the robot.
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Maximum linear deceleration of the robot, `max_accel_mss` when unset.
    ///
    /// Units: meters/second^2
    pub max_decel_mss: Option<f64>,

    /// How the robot's geometry limits speed through a curve.
    pub turn_limit: TurnLimit,

    // ---- PATH SHAPE ----
    /// The parameterisation used for each segment between two waypoints.
    pub curve_kind: CurveKind,

    /// The bend used for waypoints which do not specify their own.
    ///
    /// For Bezier curves this is the distance from the end point to its
    /// adjacent control point, for Hermite curves the tangent magnitude.
    ///
    /// Units: meters
    pub default_bend_m: f64,

    // ---- RESAMPLING ----
    /// Target distance between consecutive trajectory samples.
    ///
    /// Units: meters
    pub spacing_m: f64,

    /// Accepted error on the distance between consecutive samples.
    ///
    /// Units: meters
    pub max_spacing_error_m: f64,

    /// Weight of the near end of the bisection bracket when proposing a new
    /// curve parameter, in (0, 1).
    pub bisect_scaling: f64,

    /// Maximum number of bisection steps for a single sample.
    pub max_bisect_iters: usize,

    /// What to do when the bisection does not converge.
    pub non_convergence: NonConvergencePolicy,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The parameterisation of a curve segment.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    /// Cubic Bezier, control points placed `bend` along each end heading.
    Bezier,

    /// Cubic Hermite, tangents given directly or as `bend` along the heading.
    Hermite,
}

/// Speed limit imposed on the robot by the curvature of the path.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnLimit {
    /// `max_vel / (|curv| * track_width)`.
    TrackWidth { track_width_m: f64 },

    /// Keeps the outer wheel of a differential drive at or below max_vel,
    /// `max_vel / (1 + |curv| * track_width / 2)`.
    WheelSpeed { track_width_m: f64 },

    /// `max_ang_vel / |curv|`.
    AngularRate { max_ang_vel_rads: f64 },
}

/// Behaviour of the resampler when the bisection hits its iteration cap.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NonConvergencePolicy {
    /// Abort generation with a `ResamplerNonConvergence` error.
    Fail,

    /// Accept the last proposed point and log a warning.
    AcceptBestEffort,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            max_vel_ms: 1.94,
            max_accel_mss: 1.94,
            max_decel_mss: None,
            turn_limit: TurnLimit::TrackWidth {
                track_width_m: 0.35,
            },
            curve_kind: CurveKind::Bezier,
            default_bend_m: 0.5,
            spacing_m: 0.01,
            max_spacing_error_m: 0.001,
            bisect_scaling: 0.75,
            max_bisect_iters: 64,
            non_convergence: NonConvergencePolicy::Fail,
        }
    }
}

impl Params {
    /// The deceleration limit used when slowing down.
    ///
    /// Units: meters/second^2
    pub fn decel_mss(&self) -> f64 {
        self.max_decel_mss.unwrap_or(self.max_accel_mss)
    }

    /// Check that the parameters describe a usable configuration.
    pub fn validate(&self) -> Result<(), TrajGenError> {
        let positive = [
            ("max_vel_ms", self.max_vel_ms),
            ("max_accel_mss", self.max_accel_mss),
            ("max_decel_mss", self.decel_mss()),
            ("spacing_m", self.spacing_m),
            ("max_spacing_error_m", self.max_spacing_error_m),
        ];
        for (name, value) in positive.iter() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(TrajGenError::InvalidParams(format!(
                    "{} must be finite and positive, found {}",
                    name, value
                )));
            }
        }

        if !self.default_bend_m.is_finite() || self.default_bend_m < 0.0 {
            return Err(TrajGenError::InvalidParams(format!(
                "default_bend_m must be finite and non-negative, found {}",
                self.default_bend_m
            )));
        }

        if self.max_spacing_error_m >= self.spacing_m {
            return Err(TrajGenError::InvalidParams(format!(
                "max_spacing_error_m ({}) must be smaller than spacing_m ({})",
                self.max_spacing_error_m, self.spacing_m
            )));
        }

        if !(self.bisect_scaling > 0.0 && self.bisect_scaling < 1.0) {
            return Err(TrajGenError::InvalidParams(format!(
                "bisect_scaling must be in (0, 1), found {}",
                self.bisect_scaling
            )));
        }

        if self.max_bisect_iters == 0 {
            return Err(TrajGenError::InvalidParams(
                "max_bisect_iters must be at least 1".into(),
            ));
        }

        let (name, value) = match self.turn_limit {
            TurnLimit::TrackWidth { track_width_m } => ("track_width_m", track_width_m),
            TurnLimit::WheelSpeed { track_width_m } => ("track_width_m", track_width_m),
            TurnLimit::AngularRate { max_ang_vel_rads } => ("max_ang_vel_rads", max_ang_vel_rads),
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(TrajGenError::InvalidParams(format!(
                "{} must be finite and positive, found {}",
                name, value
            )));
        }

        Ok(())
    }
}

impl TurnLimit {
    /// The maximum speed at which the robot can follow the given curvature,
    /// before applying the overall `max_vel_ms` limit.
    ///
    /// Curvatures below `MIN_CURV_M` in magnitude are treated as straight and
    /// return `max_vel_ms`.
    pub fn vel_cap(&self, max_vel_ms: f64, curv_m: f64) -> f64 {
        let abs_curv_m = curv_m.abs();

        if abs_curv_m < super::MIN_CURV_M {
            return max_vel_ms;
        }

        match *self {
            TurnLimit::TrackWidth { track_width_m } => max_vel_ms / (abs_curv_m * track_width_m),
            TurnLimit::WheelSpeed { track_width_m } => {
                max_vel_ms / (1.0 + 0.5 * abs_curv_m * track_width_m)
            }
            TurnLimit::AngularRate { max_ang_vel_rads } => max_ang_vel_rads / abs_curv_m,
        }
    }
}
