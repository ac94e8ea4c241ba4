// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample types produced by the curve engine and consumed by rendering,
//! hit-testing, and interpolation.

use serde::{Deserialize, Serialize};

use crate::{Point2, Vector2};

/// A point on an edge's centerline with a half-width.
///
/// This is the minimal unit of sampled edge geometry: interpolation between
/// keyframes operates on sequences of these, treating them as elements of an
/// affine space (position and width interpolate together).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSample {
    pub position: Point2<f64>,
    pub width: f64,
}

impl EdgeSample {
    pub fn new(position: Point2<f64>, width: f64) -> Self {
        Self { position, width }
    }

    /// Linear interpolation toward `other`, both position and width.
    pub fn lerp(&self, other: &EdgeSample, u: f64) -> EdgeSample {
        EdgeSample {
            position: Point2::from(self.position.coords * (1.0 - u) + other.position.coords * u),
            width: self.width * (1.0 - u) + other.width * u,
        }
    }

    /// Translate by an offset, leaving width unchanged.
    pub fn translated(&self, offset: Vector2<f64>) -> EdgeSample {
        EdgeSample {
            position: self.position + offset,
            width: self.width,
        }
    }
}

/// A fully attributed sample on a fitted curve.
///
/// Produced by [`crate::VCurve`]: in addition to position and width it
/// carries the unit tangent, unit normal (tangent rotated +90°), and the
/// cumulative arclength from the curve start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSample {
    pub position: Point2<f64>,
    pub width: f64,
    pub tangent: Vector2<f64>,
    pub normal: Vector2<f64>,
    pub arclength: f64,
}

impl CurveSample {
    pub fn new(position: Point2<f64>, width: f64) -> Self {
        Self {
            position,
            width,
            tangent: Vector2::new(1.0, 0.0),
            normal: Vector2::new(0.0, 1.0),
            arclength: 0.0,
        }
    }

    /// Left boundary point of the stroke at this sample (offset by half the
    /// width along the normal).
    pub fn left_boundary(&self) -> Point2<f64> {
        self.position + self.normal * (0.5 * self.width)
    }

    /// Right boundary point of the stroke at this sample.
    pub fn right_boundary(&self) -> Point2<f64> {
        self.position - self.normal * (0.5 * self.width)
    }

    /// Forget the fitted attributes, keeping position and width.
    pub fn to_edge_sample(&self) -> EdgeSample {
        EdgeSample {
            position: self.position,
            width: self.width,
        }
    }
}

/// Set the tangent of a sample and derive the normal from it.
pub(crate) fn set_tangent(sample: &mut CurveSample, tangent: Vector2<f64>) {
    let norm = tangent.norm();
    let unit = if norm > 1e-12 {
        tangent / norm
    } else {
        Vector2::new(1.0, 0.0)
    };
    sample.tangent = unit;
    sample.normal = Vector2::new(-unit.y, unit.x);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_edge_sample_lerp() {
        let a = EdgeSample::new(Point2::new(0.0, 0.0), 2.0);
        let b = EdgeSample::new(Point2::new(10.0, 20.0), 6.0);

        let mid = a.lerp(&b, 0.5);
        assert_relative_eq!(mid.position.x, 5.0);
        assert_relative_eq!(mid.position.y, 10.0);
        assert_relative_eq!(mid.width, 4.0);

        // Endpoints are exact
        assert_relative_eq!(a.lerp(&b, 0.0).position.x, 0.0);
        assert_relative_eq!(a.lerp(&b, 1.0).position.y, 20.0);
    }

    #[test]
    fn test_curve_sample_boundaries() {
        let mut s = CurveSample::new(Point2::new(1.0, 1.0), 4.0);
        set_tangent(&mut s, Vector2::new(1.0, 0.0));

        let left = s.left_boundary();
        let right = s.right_boundary();
        assert_relative_eq!(left.y, 3.0);
        assert_relative_eq!(right.y, -1.0);
        assert_relative_eq!(left.x, 1.0);
    }

    #[test]
    fn test_set_tangent_normalizes() {
        let mut s = CurveSample::new(Point2::new(0.0, 0.0), 1.0);
        set_tangent(&mut s, Vector2::new(3.0, 4.0));
        assert_relative_eq!(s.tangent.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.tangent.dot(&s.normal), 0.0, epsilon = 1e-12);
    }
}
