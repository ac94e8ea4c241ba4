// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face fill triangulation.
//!
//! Faces are filled by ear clipping (`earcutr`) over their sampled
//! boundary cycles: one outer contour, and every further cycle punches a
//! hole. Small convex contours skip ear clipping and fan out from their
//! first vertex.

use crate::{Error, Point2, Result, Triangle, Triangles};

/// Signed double area of the triangle (a, b, c). Positive when the turn
/// a -> b -> c is counter-clockwise.
fn signed_area2(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
}

/// True when every turn along the ring has the same orientation.
/// Collinear runs are tolerated.
fn is_convex_ring(ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut orientation = 0.0f64;
    for i in 0..n {
        let turn = signed_area2(&ring[i], &ring[(i + 1) % n], &ring[(i + 2) % n]);
        if turn.abs() <= 1e-10 {
            continue;
        }
        if orientation == 0.0 {
            orientation = turn;
        } else if orientation * turn < 0.0 {
            return false;
        }
    }
    true
}

/// Drops degenerate hole rings. The survivors also define the vertex
/// numbering that triangulation indices refer to.
fn usable_holes(holes: &[Vec<Point2<f64>>]) -> Vec<&[Point2<f64>]> {
    holes
        .iter()
        .filter(|h| h.len() >= 3)
        .map(Vec::as_slice)
        .collect()
}

/// Interleaves rings into the flat coordinate buffer `earcutr` expects,
/// recording the vertex index at which each hole ring begins.
fn flatten_rings(outer: &[Point2<f64>], holes: &[&[Point2<f64>]]) -> (Vec<f64>, Vec<usize>) {
    let total = outer.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut coords = Vec::with_capacity(total * 2);
    let mut hole_starts = Vec::with_capacity(holes.len());
    for p in outer {
        coords.push(p.x);
        coords.push(p.y);
    }
    for hole in holes {
        hole_starts.push(coords.len() / 2);
        for p in *hole {
            coords.push(p.x);
            coords.push(p.y);
        }
    }
    (coords, hole_starts)
}

fn earcut(coords: &[f64], hole_starts: &[usize]) -> Result<Vec<usize>> {
    earcutr::earcut(coords, hole_starts, 2)
        .map_err(|e| Error::TriangulationError(format!("{e:?}")))
}

/// Triangulates a simple polygon, returning index triples into `points`.
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();
    if n < 3 {
        return Err(Error::TriangulationError(format!(
            "polygon has {n} points, need at least 3"
        )));
    }
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }
    // Stroke caps and small convex fills are common enough to shortcut.
    // A fan from the first vertex is only sound when the ring is convex
    if n <= 8 && is_convex_ring(points) {
        let mut indices = Vec::with_capacity((n - 2) * 3);
        for i in 1..n - 1 {
            indices.extend_from_slice(&[0, i, i + 1]);
        }
        return Ok(indices);
    }
    let (coords, _) = flatten_rings(points, &[]);
    earcut(&coords, &[])
}

/// Triangulates a polygon with holes, returning index triples into the
/// concatenation of `outer` and the usable holes, in order.
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    let holes = usable_holes(holes);
    if holes.is_empty() {
        return triangulate_polygon(outer);
    }
    if outer.len() < 3 {
        return Err(Error::TriangulationError(format!(
            "outer ring has {} points, need at least 3",
            outer.len()
        )));
    }
    let (coords, hole_starts) = flatten_rings(outer, &holes);
    earcut(&coords, &hole_starts)
}

/// Triangulates a polygon with holes directly into a [`Triangles`] list.
pub fn fill_triangles(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Triangles> {
    let indices = triangulate_polygon_with_holes(outer, holes)?;

    let mut ring_points = outer.to_vec();
    for hole in usable_holes(holes) {
        ring_points.extend_from_slice(hole);
    }

    let mut triangles = Triangles::new();
    for tri in indices.chunks_exact(3) {
        triangles.push(Triangle::new(
            ring_points[tri[0]],
            ring_points[tri[1]],
            ring_points[tri[2]],
        ));
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_splits_into_two_triangles() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert_eq!(triangulate_polygon(&points).unwrap().len(), 6);
    }

    #[test]
    fn triangle_is_returned_as_is() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
        ];
        assert_eq!(triangulate_polygon(&points).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(triangulate_polygon(&points).is_err());
    }

    #[test]
    fn convex_hexagon_fans_to_four_triangles() {
        let points: Vec<Point2<f64>> = (0..6)
            .map(|i| {
                let a = i as f64 * std::f64::consts::FRAC_PI_3;
                Point2::new(a.cos(), a.sin())
            })
            .collect();
        assert_eq!(triangulate_polygon(&points).unwrap().len(), 4 * 3);
    }

    #[test]
    fn reflex_quad_keeps_the_notch_empty() {
        // Arrowhead with a notch at (2, 1)
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(4.0, 0.0),
            Point2::new(2.0, 4.0),
        ];
        let triangles = fill_triangles(&points, &[]).unwrap();
        assert!(triangles.contains(Point2::new(2.0, 2.0)));
        assert!(!triangles.contains(Point2::new(2.0, 0.5)));
    }

    #[test]
    fn hole_costs_extra_triangles() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let hole = vec![
            Point2::new(3.0, 3.0),
            Point2::new(7.0, 3.0),
            Point2::new(7.0, 7.0),
            Point2::new(3.0, 7.0),
        ];
        let indices = triangulate_polygon_with_holes(&outer, &[hole]).unwrap();
        assert!(indices.len() > 6);
        assert_eq!(indices.len() % 3, 0);
    }

    #[test]
    fn filled_ring_hit_tests_around_the_hole() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let hole = vec![
            Point2::new(3.0, 3.0),
            Point2::new(7.0, 3.0),
            Point2::new(7.0, 7.0),
            Point2::new(3.0, 7.0),
        ];
        let triangles = fill_triangles(&outer, &[hole]).unwrap();

        assert!(triangles.contains(Point2::new(1.0, 1.0)));
        assert!(!triangles.contains(Point2::new(5.0, 5.0)));
        assert!(!triangles.contains(Point2::new(15.0, 5.0)));
    }
}
