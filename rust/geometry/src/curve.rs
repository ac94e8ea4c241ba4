// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polynomial curve pieces
//!
//! Curves are stored in monomial form `a + b·u + c·u² (+ d·u³)` rather than
//! as Bézier control points, which makes evaluation and least-squares fitting
//! cheap. Neither type is a spline, and neither is arclength-parameterized;
//! that is [`crate::VCurve`]'s job.

use crate::Vector2;

/// A 2D curve as a quadratic polynomial `a + b·u + c·u²` of [`Vector2`]
/// coefficients, for `u` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticCurve {
    a: Vector2<f64>,
    b: Vector2<f64>,
    c: Vector2<f64>,
}

impl QuadraticCurve {
    pub fn new(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>) -> Self {
        Self { a, b, c }
    }

    /// Converts the three control points of a quadratic Bézier to monomial
    /// coefficients.
    pub fn from_bezier(p0: Vector2<f64>, p1: Vector2<f64>, p2: Vector2<f64>) -> Self {
        Self {
            a: p0,
            b: 2.0 * (p1 - p0),
            c: p2 - 2.0 * p1 + p0,
        }
    }

    pub fn a(&self) -> Vector2<f64> {
        self.a
    }

    pub fn b(&self) -> Vector2<f64> {
        self.b
    }

    pub fn c(&self) -> Vector2<f64> {
        self.c
    }

    /// Position at `u`.
    #[inline]
    pub fn pos(&self, u: f64) -> Vector2<f64> {
        self.a + u * (self.b + u * self.c)
    }

    /// First derivative at `u`.
    #[inline]
    pub fn der(&self, u: f64) -> Vector2<f64> {
        self.b + (u + u) * self.c
    }

    /// Second derivative (constant for a quadratic).
    #[inline]
    pub fn der2(&self, _u: f64) -> Vector2<f64> {
        self.c + self.c
    }
}

/// A 2D curve as a cubic polynomial `a + b·u + c·u² + d·u³` of [`Vector2`]
/// coefficients, for `u` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicCurve {
    a: Vector2<f64>,
    b: Vector2<f64>,
    c: Vector2<f64>,
    d: Vector2<f64>,
}

impl CubicCurve {
    pub fn new(a: Vector2<f64>, b: Vector2<f64>, c: Vector2<f64>, d: Vector2<f64>) -> Self {
        Self { a, b, c, d }
    }

    /// Converts the four control points of a cubic Bézier to monomial
    /// coefficients.
    pub fn from_bezier(
        p0: Vector2<f64>,
        p1: Vector2<f64>,
        p2: Vector2<f64>,
        p3: Vector2<f64>,
    ) -> Self {
        Self {
            a: p0,
            b: 3.0 * (p1 - p0),
            c: 3.0 * (p2 - 2.0 * p1 + p0),
            d: p3 + 3.0 * (p1 - p2) - p0,
        }
    }

    pub fn a(&self) -> Vector2<f64> {
        self.a
    }

    pub fn b(&self) -> Vector2<f64> {
        self.b
    }

    pub fn c(&self) -> Vector2<f64> {
        self.c
    }

    pub fn d(&self) -> Vector2<f64> {
        self.d
    }

    /// Position at `u`.
    #[inline]
    pub fn pos(&self, u: f64) -> Vector2<f64> {
        self.a + u * (self.b + u * (self.c + u * self.d))
    }

    /// First derivative at `u`.
    #[inline]
    pub fn der(&self, u: f64) -> Vector2<f64> {
        self.b + u * ((self.c + self.c) + 3.0 * u * self.d)
    }

    /// Second derivative at `u`.
    #[inline]
    pub fn der2(&self, u: f64) -> Vector2<f64> {
        (self.c + self.c) + 6.0 * u * self.d
    }
}

impl From<QuadraticCurve> for CubicCurve {
    /// Copies the a, b, and c coefficients and sets d to zero.
    fn from(q: QuadraticCurve) -> Self {
        Self {
            a: q.a,
            b: q.b,
            c: q.c,
            d: Vector2::zeros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_from_bezier_interpolates_endpoints() {
        let p0 = Vector2::new(0.0, 0.0);
        let p1 = Vector2::new(1.0, 2.0);
        let p2 = Vector2::new(2.0, 0.0);
        let q = QuadraticCurve::from_bezier(p0, p1, p2);

        assert_relative_eq!(q.pos(0.0), p0);
        assert_relative_eq!(q.pos(1.0), p2);
        // De Casteljau midpoint of a quadratic Bézier
        let mid = 0.25 * p0 + 0.5 * p1 + 0.25 * p2;
        assert_relative_eq!(q.pos(0.5), mid);
    }

    #[test]
    fn test_quadratic_derivatives() {
        let q = QuadraticCurve::new(
            Vector2::new(1.0, 0.0),
            Vector2::new(2.0, 3.0),
            Vector2::new(0.5, -1.0),
        );
        assert_relative_eq!(q.der(0.0), Vector2::new(2.0, 3.0));
        assert_relative_eq!(q.der(1.0), Vector2::new(3.0, 1.0));
        assert_relative_eq!(q.der2(0.3), Vector2::new(1.0, -2.0));
    }

    #[test]
    fn test_cubic_from_bezier_interpolates_endpoints() {
        let p0 = Vector2::new(0.0, 0.0);
        let p1 = Vector2::new(1.0, 1.0);
        let p2 = Vector2::new(2.0, -1.0);
        let p3 = Vector2::new(3.0, 0.0);
        let c = CubicCurve::from_bezier(p0, p1, p2, p3);

        assert_relative_eq!(c.pos(0.0), p0);
        assert_relative_eq!(c.pos(1.0), p3, epsilon = 1e-12);
        // Endpoint tangents of a cubic Bézier
        assert_relative_eq!(c.der(0.0), 3.0 * (p1 - p0));
        assert_relative_eq!(c.der(1.0), 3.0 * (p3 - p2), epsilon = 1e-12);
    }

    #[test]
    fn test_cubic_from_quadratic() {
        let q = QuadraticCurve::from_bezier(
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(2.0, 0.0),
        );
        let c = CubicCurve::from(q);
        for i in 0..=10 {
            let u = i as f64 / 10.0;
            assert_relative_eq!(c.pos(u), q.pos(u), epsilon = 1e-12);
            assert_relative_eq!(c.der(u), q.der(u), epsilon = 1e-12);
        }
    }
}
