// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle lists for rendering and hit-testing
//!
//! [`Triangles`] is the flat geometry handed to the rendering collaborator
//! and queried for picking (point containment) and rectangle selection
//! (separating-axis overlap). [`triangulate_stroke`] builds the quad strip
//! covering a variable-width sampled polyline.

use serde::{Deserialize, Serialize};

use crate::{CurveSample, Point2, Vector2};

#[inline]
fn cross(p: Vector2<f64>, q: Vector2<f64>) -> f64 {
    p.x * q.y - p.y * q.x
}

/// A single 2D triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Point2<f64>,
    pub b: Point2<f64>,
    pub c: Point2<f64>,
}

impl Triangle {
    pub fn new(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Self {
        Self { a, b, c }
    }

    /// Point containment, winding-agnostic: the three edge cross products
    /// must all have the same sign (or be zero).
    pub fn contains(&self, p: Point2<f64>) -> bool {
        let a1 = cross(self.b - self.a, p - self.a);
        let a2 = cross(self.c - self.b, p - self.b);
        let a3 = cross(self.a - self.c, p - self.c);

        (a1 >= 0.0 && a2 >= 0.0 && a3 >= 0.0) || (a1 <= 0.0 && a2 <= 0.0 && a3 <= 0.0)
    }

    /// Overlap test against an axis-aligned rectangle, by the separating
    /// axis theorem: the two rectangle axes, then the three edge normals of
    /// the triangle.
    pub fn intersects_rect(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> bool {
        let t_min_x = self.a.x.min(self.b.x).min(self.c.x);
        let t_max_x = self.a.x.max(self.b.x).max(self.c.x);
        let t_min_y = self.a.y.min(self.b.y).min(self.c.y);
        let t_max_y = self.a.y.max(self.b.y).max(self.c.y);
        if t_min_x > max_x || t_max_x < min_x || t_min_y > max_y || t_max_y < min_y {
            return false;
        }

        let vertices = [self.a, self.b, self.c];
        for i in 0..3 {
            let p = vertices[i];
            let q = vertices[(i + 1) % 3];
            let r = vertices[(i + 2) % 3];

            // Edge normal as separating axis candidate
            let ux = p.y - q.y;
            let uy = q.x - p.x;

            // Projections of the rectangle corners, relative to p
            let corners = [
                (min_x - p.x, min_y - p.y),
                (min_x - p.x, max_y - p.y),
                (max_x - p.x, max_y - p.y),
                (max_x - p.x, min_y - p.y),
            ];
            let mut min_r = f64::MAX;
            let mut max_r = f64::MIN;
            for (cx, cy) in corners {
                let proj = ux * cx + uy * cy;
                min_r = min_r.min(proj);
                max_r = max_r.max(proj);
            }

            // Projection of the triangle: the edge projects to 0, the third
            // vertex to t
            let t = ux * (r.x - p.x) + uy * (r.y - p.y);
            let (min_t, max_t) = if t < 0.0 { (t, 0.0) } else { (0.0, t) };

            if min_r > max_t || max_r < min_t {
                return false;
            }
        }

        true
    }
}

/// A flat list of triangles. Read-only snapshot for rendering; hit-testing
/// queries scan linearly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Triangles {
    triangles: Vec<Triangle>,
}

impl Triangles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
    }

    pub fn push(&mut self, t: Triangle) {
        self.triangles.push(t);
    }

    pub fn append(&mut self, ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64) {
        self.triangles.push(Triangle::new(
            Point2::new(ax, ay),
            Point2::new(bx, by),
            Point2::new(cx, cy),
        ));
    }

    pub fn extend(&mut self, other: &Triangles) {
        self.triangles.extend_from_slice(&other.triangles);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triangle> {
        self.triangles.iter()
    }

    /// True if any triangle contains `p`.
    pub fn contains(&self, p: Point2<f64>) -> bool {
        self.triangles.iter().any(|t| t.contains(p))
    }

    /// True if any triangle overlaps the axis-aligned rectangle.
    pub fn intersects_rect(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> bool {
        self.triangles
            .iter()
            .any(|t| t.intersects_rect(min_x, max_x, min_y, max_y))
    }

    /// Axis-aligned bounding box as `(min_x, max_x, min_y, max_y)`, or
    /// `None` when empty.
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        if self.triangles.is_empty() {
            return None;
        }
        let mut min_x = f64::MAX;
        let mut max_x = f64::MIN;
        let mut min_y = f64::MAX;
        let mut max_y = f64::MIN;
        for t in &self.triangles {
            for p in [t.a, t.b, t.c] {
                min_x = min_x.min(p.x);
                max_x = max_x.max(p.x);
                min_y = min_y.min(p.y);
                max_y = max_y.max(p.y);
            }
        }
        Some((min_x, max_x, min_y, max_y))
    }
}

impl std::ops::Index<usize> for Triangles {
    type Output = Triangle;

    fn index(&self, i: usize) -> &Triangle {
        &self.triangles[i]
    }
}

/// Triangulates a variable-width stroke from its fitted samples.
///
/// Each pair of consecutive samples contributes the two triangles of the
/// quad spanned by their left and right boundary points (centerline offset
/// by half the width along the normal).
pub fn triangulate_stroke(samples: &[CurveSample]) -> Triangles {
    let mut triangles = Triangles::new();

    for pair in samples.windows(2) {
        let (s0, s1) = (&pair[0], &pair[1]);

        let a = s0.left_boundary();
        let b = s0.right_boundary();
        let c = s1.right_boundary();
        let d = s1.left_boundary();

        triangles.push(Triangle::new(a, b, c));
        triangles.push(Triangle::new(a, c, d));
    }

    triangles
}
