// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch least-squares Bézier fitting
//!
//! Fits a quadratic or cubic Bézier to a full list of points known upfront.
//! The endpoints are interpolated exactly; the inner control points are
//! solved in closed form via normal equations, then a bounded number of
//! Newton-Raphson passes re-parameterizes the points to reduce projection
//! error. For the incremental variant used during sketching, see
//! [`crate::VCurve`].

use nalgebra::Matrix2;

use crate::{CubicCurve, QuadraticCurve, Vector2};

const NUM_NEWTON_ITERATIONS: usize = 3;

/// Evaluation surface shared by the two polynomial curve types, so the
/// Newton-Raphson reparameterization can be written once.
trait ParamCurve {
    fn pos(&self, u: f64) -> Vector2<f64>;
    fn der(&self, u: f64) -> Vector2<f64>;
    fn der2(&self, u: f64) -> Vector2<f64>;
}

impl ParamCurve for QuadraticCurve {
    fn pos(&self, u: f64) -> Vector2<f64> {
        QuadraticCurve::pos(self, u)
    }
    fn der(&self, u: f64) -> Vector2<f64> {
        QuadraticCurve::der(self, u)
    }
    fn der2(&self, u: f64) -> Vector2<f64> {
        QuadraticCurve::der2(self, u)
    }
}

impl ParamCurve for CubicCurve {
    fn pos(&self, u: f64) -> Vector2<f64> {
        CubicCurve::pos(self, u)
    }
    fn der(&self, u: f64) -> Vector2<f64> {
        CubicCurve::der(self, u)
    }
    fn der2(&self, u: f64) -> Vector2<f64> {
        CubicCurve::der2(self, u)
    }
}

/// Least-squares quadratic Bézier through fixed endpoints.
///
/// Solves for the single inner control point `p1` minimizing the squared
/// residual of `pos[i]` at parameter `u[i]`. The normal equations decouple
/// per coordinate into a scalar division.
pub fn solve_quadratic_with_endpoints(
    start: Vector2<f64>,
    end: Vector2<f64>,
    pos: &[Vector2<f64>],
    u: &[f64],
) -> QuadraticCurve {
    debug_assert_eq!(pos.len(), u.len());

    let mut ww = 0.0;
    let mut wb = Vector2::zeros();
    for (p, &ui) in pos.iter().zip(u) {
        let one_minus_ui = 1.0 - ui;
        let w = 2.0 * one_minus_ui * ui;
        let b = p - one_minus_ui * one_minus_ui * start - ui * ui * end;
        ww += w * w;
        wb += w * b;
    }

    let p1 = if ww > 1e-12 {
        wb / ww
    } else {
        // All parameters at the endpoints; any inner control point fits
        0.5 * (start + end)
    };

    QuadraticCurve::from_bezier(start, p1, end)
}

/// Least-squares cubic Bézier through fixed endpoints.
///
/// Solves for the two inner control points `p1`, `p2`. The normal equations
/// decouple per coordinate into a shared symmetric 2x2 system.
pub fn solve_cubic_with_endpoints(
    start: Vector2<f64>,
    end: Vector2<f64>,
    pos: &[Vector2<f64>],
    u: &[f64],
) -> CubicCurve {
    debug_assert_eq!(pos.len(), u.len());

    let mut m11 = 0.0;
    let mut m12 = 0.0;
    let mut m22 = 0.0;
    let mut r1 = Vector2::zeros();
    let mut r2 = Vector2::zeros();
    for (p, &ui) in pos.iter().zip(u) {
        let one_minus_ui = 1.0 - ui;
        let w1 = 3.0 * one_minus_ui * one_minus_ui * ui;
        let w2 = 3.0 * one_minus_ui * ui * ui;
        let b =
            p - one_minus_ui * one_minus_ui * one_minus_ui * start - ui * ui * ui * end;
        m11 += w1 * w1;
        m12 += w1 * w2;
        m22 += w2 * w2;
        r1 += w1 * b;
        r2 += w2 * b;
    }

    // The same 2x2 normal matrix serves both coordinates
    let m = Matrix2::new(m11, m12, m12, m22);
    let (p1, p2) = match m.try_inverse() {
        Some(inv) if m.determinant().abs() > 1e-12 => {
            let sx = inv * Vector2::new(r1.x, r2.x); // (p1.x, p2.x)
            let sy = inv * Vector2::new(r1.y, r2.y); // (p1.y, p2.y)
            (Vector2::new(sx.x, sy.x), Vector2::new(sx.y, sy.y))
        }
        _ => {
            // Degenerate parameterization; fall back to the chord
            let chord = end - start;
            (start + chord / 3.0, start + 2.0 * chord / 3.0)
        }
    };

    CubicCurve::from_bezier(start, p1, p2, end)
}

/// Chord-length initialization of the per-point curve parameters.
fn initialize_parameterization(points: &[Vector2<f64>]) -> Vec<f64> {
    let n = points.len();
    let mut u = vec![0.0; n];
    for i in 1..n {
        u[i] = u[i - 1] + (points[i] - points[i - 1]).norm();
    }
    let length = u[n - 1];
    if length > 1e-10 {
        for ui in u.iter_mut().skip(1) {
            *ui /= length;
        }
    }
    u
}

/// One Newton-Raphson pass moving each interior parameter toward the foot
/// of its point's projection on the current fit. Corrections are smoothly
/// clamped with tanh so a bad intermediate fit cannot move any parameter by
/// more than half the average parameter spacing.
fn reparameterize<C: ParamCurve>(points: &[Vector2<f64>], fit: &C, u: &mut [f64]) {
    let n = points.len();
    let inv2_clamp = 0.5 * n as f64;
    let clamp = 0.5 / inv2_clamp;

    for i in 1..n - 1 {
        let ui = u[i];

        let delta = fit.pos(ui) - points[i];
        let der = fit.der(ui);
        let der2 = fit.der2(ui);

        let numerator = delta.dot(&der);
        let denominator = der.dot(&der) + delta.dot(&der2);

        if denominator.abs() > 1e-10 {
            let correction = clamp * (inv2_clamp * (numerator / denominator)).tanh();
            u[i] = ui - correction;
        }
    }
}

/// Fits a quadratic Bézier to `points`.
///
/// Degenerate inputs fit exactly: zero points give the constant zero curve,
/// one point a constant, two points a line, three points the interpolating
/// quadratic Bézier. Never fails.
pub fn fit_quadratic(points: &[Vector2<f64>]) -> QuadraticCurve {
    let n = points.len();
    let zero = Vector2::zeros();

    match n {
        0 => QuadraticCurve::new(zero, zero, zero),
        1 => QuadraticCurve::new(points[0], zero, zero),
        2 => QuadraticCurve::new(points[0], points[1] - points[0], zero),
        3 => QuadraticCurve::from_bezier(points[0], points[1], points[2]),
        _ => {
            let mut u = initialize_parameterization(points);
            let mut res = solve_quadratic_with_endpoints(
                points[0],
                points[n - 1],
                &points[1..n - 1],
                &u[1..n - 1],
            );
            for _ in 1..NUM_NEWTON_ITERATIONS {
                reparameterize(points, &res, &mut u);
                res = solve_quadratic_with_endpoints(
                    points[0],
                    points[n - 1],
                    &points[1..n - 1],
                    &u[1..n - 1],
                );
            }
            res
        }
    }
}

/// Fits a cubic Bézier to `points`.
///
/// Fewer than four points degrade to [`fit_quadratic`] (promoted to cubic);
/// exactly four points are taken as the Bézier control polygon. Never fails.
pub fn fit_cubic(points: &[Vector2<f64>]) -> CubicCurve {
    let n = points.len();

    match n {
        0..=3 => CubicCurve::from(fit_quadratic(points)),
        4 => CubicCurve::from_bezier(points[0], points[1], points[2], points[3]),
        _ => {
            let mut u = initialize_parameterization(points);
            let mut res = solve_cubic_with_endpoints(
                points[0],
                points[n - 1],
                &points[1..n - 1],
                &u[1..n - 1],
            );
            for _ in 1..NUM_NEWTON_ITERATIONS {
                reparameterize(points, &res, &mut u);
                res = solve_cubic_with_endpoints(
                    points[0],
                    points[n - 1],
                    &points[1..n - 1],
                    &u[1..n - 1],
                );
            }
            res
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_quadratic_degenerate_counts() {
        let q = fit_quadratic(&[]);
        assert_relative_eq!(q.pos(0.5), Vector2::zeros());

        let p = Vector2::new(3.0, 4.0);
        let q = fit_quadratic(&[p]);
        assert_relative_eq!(q.pos(0.0), p);
        assert_relative_eq!(q.pos(1.0), p);

        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(2.0, 2.0);
        let q = fit_quadratic(&[a, b]);
        assert_relative_eq!(q.pos(0.0), a);
        assert_relative_eq!(q.pos(0.5), Vector2::new(1.0, 1.0));
        assert_relative_eq!(q.pos(1.0), b);
    }

    #[test]
    fn test_fit_quadratic_recovers_parabola() {
        // Points on the quadratic Bézier with control points (0,0), (2,4), (4,0)
        let reference = QuadraticCurve::from_bezier(
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 4.0),
            Vector2::new(4.0, 0.0),
        );
        let points: Vec<Vector2<f64>> =
            (0..=10).map(|i| reference.pos(i as f64 / 10.0)).collect();

        let fit = fit_quadratic(&points);
        for i in 0..=10 {
            let u = i as f64 / 10.0;
            let d = (fit.pos(u) - reference.pos(u)).norm();
            assert!(d < 0.05, "deviation {} at u={}", d, u);
        }
    }

    #[test]
    fn test_fit_quadratic_endpoints_exact() {
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.5),
            Vector2::new(2.3, 1.1),
            Vector2::new(3.0, 0.4),
            Vector2::new(4.0, 0.0),
        ];
        let fit = fit_quadratic(&points);
        assert_relative_eq!(fit.pos(0.0), points[0], epsilon = 1e-12);
        assert_relative_eq!(fit.pos(1.0), *points.last().unwrap(), epsilon = 1e-9);
    }

    #[test]
    fn test_fit_cubic_four_points_exact_control_polygon() {
        let p = [
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 2.0),
            Vector2::new(3.0, 2.0),
            Vector2::new(4.0, 0.0),
        ];
        let fit = fit_cubic(&p);
        let reference = CubicCurve::from_bezier(p[0], p[1], p[2], p[3]);
        assert_relative_eq!(fit.pos(0.25), reference.pos(0.25), epsilon = 1e-12);
        assert_relative_eq!(fit.pos(0.75), reference.pos(0.75), epsilon = 1e-12);
    }

    #[test]
    fn test_fit_cubic_recovers_cubic() {
        let reference = CubicCurve::from_bezier(
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 3.0),
            Vector2::new(3.0, -3.0),
            Vector2::new(4.0, 0.0),
        );
        let points: Vec<Vector2<f64>> =
            (0..=20).map(|i| reference.pos(i as f64 / 20.0)).collect();

        let fit = fit_cubic(&points);
        for i in 0..=20 {
            let u = i as f64 / 20.0;
            let d = (fit.pos(u) - reference.pos(u)).norm();
            assert!(d < 0.05, "deviation {} at u={}", d, u);
        }
    }

    #[test]
    fn test_fit_cubic_endpoints_exact() {
        let points = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(2.0, 0.8),
            Vector2::new(3.0, 1.3),
            Vector2::new(4.5, 0.2),
            Vector2::new(5.0, 0.0),
        ];
        let fit = fit_cubic(&points);
        assert_relative_eq!(fit.pos(0.0), points[0], epsilon = 1e-12);
        assert_relative_eq!(fit.pos(1.0), *points.last().unwrap(), epsilon = 1e-9);
    }
}
