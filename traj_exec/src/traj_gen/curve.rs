//! # Curve segments
//!
//! A curve segment is a parametric cubic joining two waypoints, evaluated
//! for the parameter `t` in `[0, 1]`. Two forms are supported:
//!
//! - Bezier, defined by four control points,
//! - Hermite, defined by two end points and the tangent at each of them.
//!
//! Headings are measured counter-clockwise from the +X axis, and a positive
//! curvature is a counter-clockwise (left) turn, so that
//! `angular_velocity = velocity * curvature` holds with the same sign.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Serialize;

use super::MIN_CURV_M;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Below this derivative magnitude the curve is considered to be at a cusp.
pub const DEGENERATE_DERIV_M: f64 = 1e-9;

/// Parameter step used to find the heading at a cusp.
const HEADING_DIFF_STEP: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cubic curve segment between two waypoints.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum CurveSegment {
    /// Cubic Bezier with start `p0`, end `p3` and control points `p1`, `p2`.
    Bezier {
        p0: Vector2<f64>,
        p1: Vector2<f64>,
        p2: Vector2<f64>,
        p3: Vector2<f64>,
    },

    /// Cubic Hermite from `p0` to `p1` with tangents `m0` and `m1`.
    Hermite {
        p0: Vector2<f64>,
        m0: Vector2<f64>,
        p1: Vector2<f64>,
        m1: Vector2<f64>,
    },
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The outcome of evaluating the curvature of a segment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CurvEval {
    /// Well defined signed curvature.
    Regular(f64),

    /// The first and second derivatives are parallel (straight line or
    /// inflection point).
    Straight,

    /// The first derivative vanishes (cusp), curvature is undefined.
    Degenerate,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CurveSegment {
    /// Position at the start of the segment.
    pub fn start(&self) -> Vector2<f64> {
        match *self {
            CurveSegment::Bezier { p0, .. } => p0,
            CurveSegment::Hermite { p0, .. } => p0,
        }
    }

    /// Position at the end of the segment.
    pub fn end(&self) -> Vector2<f64> {
        match *self {
            CurveSegment::Bezier { p3, .. } => p3,
            CurveSegment::Hermite { p1, .. } => p1,
        }
    }

    /// Position on the curve at `t`.
    pub fn position(&self, t: f64) -> Vector2<f64> {
        let t2 = t * t;
        let t3 = t2 * t;

        match *self {
            CurveSegment::Bezier { p0, p1, p2, p3 } => {
                let mt = 1.0 - t;
                let mt2 = mt * mt;
                p0 * (mt2 * mt) + p1 * (3.0 * mt2 * t) + p2 * (3.0 * mt * t2) + p3 * t3
            }
            CurveSegment::Hermite { p0, m0, p1, m1 } => {
                p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
                    + m0 * (t3 - 2.0 * t2 + t)
                    + p1 * (-2.0 * t3 + 3.0 * t2)
                    + m1 * (t3 - t2)
            }
        }
    }

    /// First derivative of the position with respect to `t`.
    pub fn derivative(&self, t: f64) -> Vector2<f64> {
        let t2 = t * t;

        match *self {
            CurveSegment::Bezier { p0, p1, p2, p3 } => {
                let mt = 1.0 - t;
                (p1 - p0) * (3.0 * mt * mt) + (p2 - p1) * (6.0 * mt * t) + (p3 - p2) * (3.0 * t2)
            }
            CurveSegment::Hermite { p0, m0, p1, m1 } => {
                (p0 - p1) * (6.0 * t2 - 6.0 * t)
                    + m0 * (3.0 * t2 - 4.0 * t + 1.0)
                    + m1 * (3.0 * t2 - 2.0 * t)
            }
        }
    }

    /// Second derivative of the position with respect to `t`.
    pub fn second_derivative(&self, t: f64) -> Vector2<f64> {
        match *self {
            CurveSegment::Bezier { p0, p1, p2, p3 } => {
                (p2 - p1 * 2.0 + p0) * (6.0 * (1.0 - t)) + (p3 - p2 * 2.0 + p1) * (6.0 * t)
            }
            CurveSegment::Hermite { p0, m0, p1, m1 } => {
                (p0 - p1) * (12.0 * t - 6.0) + m0 * (6.0 * t - 4.0) + m1 * (6.0 * t - 2.0)
            }
        }
    }

    /// Heading of the curve at `t`, in `(-pi, pi]`.
    ///
    /// At a cusp the direction of travel is taken from a short central
    /// difference of positions, and failing that from the chord.
    pub fn heading(&self, t: f64) -> f64 {
        let deriv = self.derivative(t);

        let dir = if deriv.norm() > DEGENERATE_DERIV_M {
            deriv
        } else {
            let diff = self.position((t + HEADING_DIFF_STEP).min(1.0))
                - self.position((t - HEADING_DIFF_STEP).max(0.0));

            if diff.norm_squared() > 0.0 {
                diff
            } else {
                self.end() - self.start()
            }
        };

        dir.y.atan2(dir.x)
    }

    /// Evaluate the signed curvature at `t`.
    pub fn curvature(&self, t: f64) -> CurvEval {
        curvature(&self.derivative(t), &self.second_derivative(t))
    }

    /// Length of the control polygon, an upper bound on the arc length.
    pub fn control_polygon_length(&self) -> f64 {
        let [c0, c1, c2, c3] = self.bezier_points();

        (c1 - c0).norm() + (c2 - c1).norm() + (c3 - c2).norm()
    }

    /// The equivalent Bezier control points of the segment.
    pub fn bezier_points(&self) -> [Vector2<f64>; 4] {
        match *self {
            CurveSegment::Bezier { p0, p1, p2, p3 } => [p0, p1, p2, p3],
            CurveSegment::Hermite { p0, m0, p1, m1 } => {
                [p0, p0 + m0 / 3.0, p1 - m1 / 3.0, p1]
            }
        }
    }
}

impl CurvEval {
    /// The curvature to use downstream.
    ///
    /// Straight and degenerate evaluations give `MIN_CURV_M` so that nothing
    /// inverting the curvature divides by zero.
    pub fn value(&self) -> f64 {
        match *self {
            CurvEval::Regular(c) => c,
            CurvEval::Straight | CurvEval::Degenerate => MIN_CURV_M,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Signed curvature from the first and second derivatives of a curve,
/// `(dx * ddy - dy * ddx) / (dx^2 + dy^2)^1.5`.
pub fn curvature(deriv: &Vector2<f64>, second_deriv: &Vector2<f64>) -> CurvEval {
    let speed = deriv.norm();

    if speed <= DEGENERATE_DERIV_M {
        return CurvEval::Degenerate;
    }

    let cross = deriv.x * second_deriv.y - deriv.y * second_deriv.x;

    if cross == 0.0 {
        return CurvEval::Straight;
    }

    CurvEval::Regular(cross / (speed * speed * speed))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    /// The parabola y = x^2 for x in [-1, 1] as a cubic Bezier.
    fn parabola() -> CurveSegment {
        CurveSegment::Bezier {
            p0: Vector2::new(-1.0, 1.0),
            p1: Vector2::new(-1.0 / 3.0, -1.0 / 3.0),
            p2: Vector2::new(1.0 / 3.0, -1.0 / 3.0),
            p3: Vector2::new(1.0, 1.0),
        }
    }

    fn s_hermite() -> CurveSegment {
        CurveSegment::Hermite {
            p0: Vector2::new(0.0, 0.0),
            m0: Vector2::new(1.0, 2.0),
            p1: Vector2::new(2.0, 0.0),
            m1: Vector2::new(1.0, -2.0),
        }
    }

    #[test]
    fn test_end_points() {
        for seg in [parabola(), s_hermite()].iter() {
            assert_eq!(seg.position(0.0), seg.start());
            assert_eq!(seg.position(1.0), seg.end());
        }
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let h = 1e-6;

        for seg in [parabola(), s_hermite()].iter() {
            for i in 1..10 {
                let t = i as f64 / 10.0;

                let fd = (seg.position(t + h) - seg.position(t - h)) / (2.0 * h);
                assert!((fd - seg.derivative(t)).norm() < 1e-6);

                let fdd = (seg.derivative(t + h) - seg.derivative(t - h)) / (2.0 * h);
                assert!((fdd - seg.second_derivative(t)).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn test_hermite_bezier_equivalence() {
        let herm = s_hermite();
        let [c0, c1, c2, c3] = herm.bezier_points();
        let bez = CurveSegment::Bezier {
            p0: c0,
            p1: c1,
            p2: c2,
            p3: c3,
        };

        for i in 0..=20 {
            let t = i as f64 / 20.0;
            assert!((herm.position(t) - bez.position(t)).norm() < 1e-12);
            assert!((herm.derivative(t) - bez.derivative(t)).norm() < 1e-12);
            assert!((herm.second_derivative(t) - bez.second_derivative(t)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_curvature() {
        let seg = parabola();

        // Vertex of y = x^2 has curvature 2, turning left when moving along +X
        match seg.curvature(0.5) {
            CurvEval::Regular(c) => assert!((c - 2.0).abs() < 1e-9),
            e => panic!("Expected regular curvature, got {:?}", e),
        }

        // At x = 1 the curvature is 2 / (1 + 4)^1.5
        let expected = 2.0 / 5f64.powf(1.5);
        assert!((seg.curvature(1.0).value() - expected).abs() < 1e-9);

        // Travelling the same parabola backwards turns right
        let rev = CurveSegment::Bezier {
            p0: Vector2::new(1.0, 1.0),
            p1: Vector2::new(1.0 / 3.0, -1.0 / 3.0),
            p2: Vector2::new(-1.0 / 3.0, -1.0 / 3.0),
            p3: Vector2::new(-1.0, 1.0),
        };
        assert!((rev.curvature(0.5).value() + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_curvature_guards() {
        // Straight line with zero bend, the derivative vanishes at both ends
        let line = CurveSegment::Bezier {
            p0: Vector2::new(0.0, 0.0),
            p1: Vector2::new(0.0, 0.0),
            p2: Vector2::new(3.0, 3.0),
            p3: Vector2::new(3.0, 3.0),
        };

        assert_eq!(line.curvature(0.0), CurvEval::Degenerate);
        assert_eq!(line.curvature(1.0), CurvEval::Degenerate);
        assert_eq!(line.curvature(0.5), CurvEval::Straight);
        assert_eq!(line.curvature(0.0).value(), MIN_CURV_M);
        assert_eq!(line.curvature(0.5).value(), MIN_CURV_M);

        // Heading is still well defined at the cusps
        let expected = std::f64::consts::FRAC_PI_4;
        assert!((line.heading(0.0) - expected).abs() < 1e-9);
        assert!((line.heading(1.0) - expected).abs() < 1e-9);
        assert!((line.heading(0.5) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_heading() {
        let seg = s_hermite();

        assert!((seg.heading(0.0) - 2f64.atan2(1.0)).abs() < 1e-12);
        assert!((seg.heading(1.0) - (-2f64).atan2(1.0)).abs() < 1e-12);

        let up = CurveSegment::Hermite {
            p0: Vector2::new(0.0, 0.0),
            m0: Vector2::new(0.0, 1.0),
            p1: Vector2::new(0.0, 1.0),
            m1: Vector2::new(0.0, 1.0),
        };
        assert!((up.heading(0.3) - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_control_polygon_bounds_length() {
        for seg in [parabola(), s_hermite()].iter() {
            let mut length = 0.0;
            let n = 1000;
            for i in 1..=n {
                let t0 = (i - 1) as f64 / n as f64;
                let t1 = i as f64 / n as f64;
                length += (seg.position(t1) - seg.position(t0)).norm();
            }
            assert!(length <= seg.control_polygon_length());
        }
    }
}
