// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry of inbetween cells and cached triangulations.
//!
//! Key cells own their geometry; inbetween cells have none and are sampled
//! on demand by interpolating their before/after boundaries:
//!
//! - an inbetween vertex follows a cubic Hermite trajectory whose endpoint
//!   tangents are divided differences over the neighboring key vertices in
//!   the temporal star, so consecutive inbetween vertices join smoothly;
//! - an inbetween edge is a cross-dissolve of its before and after
//!   boundaries, resampled to a common count, with open edges warped so
//!   their endpoints track the animated vertices exactly.
//!
//! Triangulations of key edge strokes and key face fills are cached on the
//! cell, keyed by a geometry version that every mutation bumps.

use vac_geometry::{fill_triangles, triangulate_stroke, EdgeSample, Point2, Triangles, Vector2};

use crate::cell::{curve_samples_of, InbetweenEdgeBoundary};
use crate::error::{Error, Result};
use crate::keys::{CellId, InbetweenEdgeKey, InbetweenVertexKey, KeyEdgeKey, KeyFaceKey, KeyVertexKey};
use crate::time::Time;
use crate::vac::Vac;

/// Default spacing between consecutive samples of an interpolated edge.
pub const DEFAULT_SAMPLING_DS: f64 = 5.0;

/// Position of an inbetween vertex at time `t`, clamped to its interval.
///
/// The trajectory is a cubic Hermite segment between the two key
/// positions. Each endpoint tangent averages `(p_n - p) / (t_n - t)` over
/// the key vertices `n` reachable through one inbetween vertex in the
/// temporal star; a key vertex with no other temporal neighbor
/// contributes the plain chord, which reduces an isolated segment to
/// linear interpolation.
pub fn inbetween_vertex_pos(vac: &Vac, iv: InbetweenVertexKey, t: Time) -> Result<Point2<f64>> {
    let data = vac.try_inbetween_vertex(iv)?;
    let v0 = vac.try_key_vertex(data.before)?;
    let v1 = vac.try_key_vertex(data.after)?;
    let dt = v1.time - v0.time;
    let u = ((t - v0.time) / dt).clamp(0.0, 1.0);

    let chord = (v1.position - v0.position) / dt;
    let m0 = vertex_tangent(vac, data.before).unwrap_or(chord);
    let m1 = vertex_tangent(vac, data.after).unwrap_or(chord);

    let u2 = u * u;
    let u3 = u2 * u;
    let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
    let h10 = u3 - 2.0 * u2 + u;
    let h01 = -2.0 * u3 + 3.0 * u2;
    let h11 = u3 - u2;

    Ok(Point2::from(
        h00 * v0.position.coords + h10 * dt * m0 + h01 * v1.position.coords + h11 * dt * m1,
    ))
}

/// Velocity estimate at a key vertex: the mean of the divided differences
/// toward every key vertex one inbetween vertex away, `None` if the
/// temporal star is empty.
fn vertex_tangent(vac: &Vac, v: KeyVertexKey) -> Option<Vector2<f64>> {
    let data = vac.key_vertex(v)?;
    let mut sum = Vector2::zeros();
    let mut count = 0;
    for id in vac
        .temporal_star_before(v.into())
        .into_iter()
        .chain(vac.temporal_star_after(v.into()))
    {
        let CellId::InbetweenVertex(iv) = id else {
            continue;
        };
        let link = vac.inbetween_vertex(iv)?;
        let neighbor_key = if link.after == v { link.before } else { link.after };
        let neighbor = vac.key_vertex(neighbor_key)?;
        let dt = neighbor.time - data.time;
        if dt.abs() > 0.0 {
            sum += (neighbor.position - data.position) / dt;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Samples an inbetween edge at time `t` with spacing `ds`.
///
/// Both boundaries are resampled to `max(len_before, len_after) / ds + 2`
/// samples, then linearly cross-dissolved at `u = (t - t0) / (t1 - t0)`.
/// For open edges the dissolved polyline is warped by a linear ramp so its
/// endpoints land exactly on the animated vertices at `t`. When one
/// boundary is a single vertex its width is degenerate, and the other
/// boundary's widths are used for the whole interval.
pub fn inbetween_edge_sampling(
    vac: &Vac,
    key: InbetweenEdgeKey,
    t: Time,
    ds: f64,
) -> Result<Vec<EdgeSample>> {
    let data = vac.try_inbetween_edge(key)?;
    match &data.boundary {
        InbetweenEdgeBoundary::Open {
            before_path,
            after_path,
            start_vertex,
            end_vertex,
        } => {
            let t0 = before_path.time(vac)?;
            let t1 = after_path.time(vac)?;
            if t < t0 || t > t1 {
                return Err(Error::TimeOutOfRange { time: t });
            }
            let u = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);

            let n = sample_count(before_path.length(vac)?, after_path.length(vac)?, ds);
            let before = before_path.sample(vac, n)?;
            let after = after_path.sample(vac, n)?;
            let mut samples = dissolve(
                &before,
                &after,
                u,
                before_path.is_single_vertex(),
                after_path.is_single_vertex(),
            );

            // Warp so the endpoints track the animated vertices
            let delta_start = start_vertex.pos(vac, t)? - samples[0].position;
            let delta_end = end_vertex.pos(vac, t)? - samples[n - 1].position;
            for (i, s) in samples.iter_mut().enumerate() {
                let w = i as f64 / (n - 1) as f64;
                *s = s.translated(delta_start * (1.0 - w) + delta_end * w);
            }
            Ok(samples)
        }
        InbetweenEdgeBoundary::Closed {
            before_cycle,
            after_cycle,
        } => {
            let t0 = before_cycle.time(vac)?;
            let t1 = after_cycle.time(vac)?;
            if t < t0 || t > t1 {
                return Err(Error::TimeOutOfRange { time: t });
            }
            let u = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);

            let n = sample_count(before_cycle.length(vac)?, after_cycle.length(vac)?, ds);
            let before = before_cycle.sample(vac, n)?;
            let after = after_cycle.sample(vac, n)?;
            Ok(dissolve(
                &before,
                &after,
                u,
                before_cycle.steiner_vertex().is_some(),
                after_cycle.steiner_vertex().is_some(),
            ))
        }
    }
}

fn sample_count(len_before: f64, len_after: f64, ds: f64) -> usize {
    (len_before.max(len_after) / ds) as usize + 2
}

fn dissolve(
    before: &[EdgeSample],
    after: &[EdgeSample],
    u: f64,
    before_degenerate: bool,
    after_degenerate: bool,
) -> Vec<EdgeSample> {
    before
        .iter()
        .zip(after)
        .map(|(b, a)| {
            let position = b.position + (a.position - b.position) * u;
            let width = if before_degenerate && !after_degenerate {
                a.width
            } else if after_degenerate && !before_degenerate {
                b.width
            } else {
                b.width + (a.width - b.width) * u
            };
            EdgeSample::new(position, width)
        })
        .collect()
}

impl Vac {
    /// The triangulated stroke of a key edge, recomputed only when the
    /// edge's geometry version has moved past the cached one.
    pub fn edge_triangles(&mut self, key: KeyEdgeKey) -> Result<&Triangles> {
        let edge = self.try_key_edge(key)?;
        let version = edge.geometry_version;
        if edge.triangle_cache.get(version).is_none() {
            let triangles = triangulate_stroke(&edge.geometry.curve_samples());
            if let Some(edge) = self.key_edges.get_mut(key) {
                edge.triangle_cache.put(version, triangles);
            }
        }
        self.key_edges
            .get(key)
            .and_then(|e| e.triangle_cache.get(version))
            .ok_or(Error::KeyEdgeNotFound(key))
    }

    /// The triangulated fill of a key face: the first cycle is the outer
    /// contour, later cycles are holes, Steiner cycles are skipped.
    /// Cached per geometry version like edge strokes.
    pub fn face_triangles(&mut self, key: KeyFaceKey) -> Result<&Triangles> {
        let face = self.try_key_face(key)?;
        let version = face.geometry_version;
        if face.triangle_cache.get(version).is_none() {
            let cycles = face.cycles.clone();
            let mut contours: Vec<Vec<Point2<f64>>> = Vec::new();
            for cycle in &cycles {
                if cycle.steiner_vertex().is_some() {
                    continue;
                }
                let n = sample_count(cycle.length(self)?, 0.0, DEFAULT_SAMPLING_DS).max(3);
                let points = cycle
                    .sample(self, n)?
                    .into_iter()
                    .map(|s| s.position)
                    .collect();
                contours.push(points);
            }
            let triangles = match contours.split_first() {
                Some((outer, holes)) => fill_triangles(outer, holes)?,
                None => Triangles::new(),
            };
            if let Some(face) = self.key_faces.get_mut(key) {
                face.triangle_cache.put(version, triangles);
            }
        }
        self.key_faces
            .get(key)
            .and_then(|f| f.triangle_cache.get(version))
            .ok_or(Error::KeyFaceNotFound(key))
    }

    /// Triangulated stroke of an inbetween edge at time `t`; not cached
    /// since every `t` yields a different shape.
    pub fn inbetween_edge_triangles(
        &self,
        key: InbetweenEdgeKey,
        t: Time,
        ds: f64,
    ) -> Result<Triangles> {
        let samples = inbetween_edge_sampling(self, key, t, ds)?;
        Ok(triangulate_stroke(&curve_samples_of(&samples)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::EdgeGeometry;
    use crate::cycle::ProperCycle;
    use crate::halfedge::KeyHalfedge;
    use crate::path::Path;
    use crate::AnimatedVertex;
    use approx::assert_relative_eq;

    fn line_geom(p0: Point2<f64>, p1: Point2<f64>) -> EdgeGeometry {
        EdgeGeometry::line(p0, p1, 2.0, 0.5)
    }

    #[test]
    fn isolated_inbetween_vertex_moves_linearly() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(10), Point2::new(10.0, 6.0));
        let iv = vac.new_inbetween_vertex(v0, v1).unwrap();

        let p = inbetween_vertex_pos(&vac, iv, Time::frame(5)).unwrap();
        assert_relative_eq!(p.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 3.0, epsilon = 1e-9);

        // Clamped outside the interval
        let p = inbetween_vertex_pos(&vac, iv, Time::frame(-5)).unwrap();
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn chained_inbetween_vertices_interpolate_smoothly() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(10), Point2::new(10.0, 0.0));
        let v2 = vac.new_key_vertex(Time::frame(20), Point2::new(20.0, 10.0));
        let iv0 = vac.new_inbetween_vertex(v0, v1).unwrap();
        let iv1 = vac.new_inbetween_vertex(v1, v2).unwrap();

        // Endpoints are interpolated exactly
        let p = inbetween_vertex_pos(&vac, iv0, Time::frame(10)).unwrap();
        assert_relative_eq!(p.x, 10.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-9);

        // The shared vertex's tangent blends both segments, bending the
        // first segment upward before it arrives
        let p = inbetween_vertex_pos(&vac, iv1, Time::new(11.0)).unwrap();
        assert!(p.y < 1.0);
        let p = inbetween_vertex_pos(&vac, iv0, Time::new(9.0)).unwrap();
        assert!(p.y < 0.0 || p.y.abs() < 1.0);
    }

    /// Scenario: a stroke at frame 0 and a stroke at frame 10, joined by
    /// an open inbetween edge. Sampling at the interval's ends reproduces
    /// the key boundaries; the midpoint is their average.
    #[test]
    fn open_inbetween_edge_dissolves_between_boundaries() {
        let mut vac = Vac::new();
        let t0 = Time::frame(0);
        let t1 = Time::frame(10);
        let a0 = vac.new_key_vertex(t0, Point2::new(0.0, 0.0));
        let a1 = vac.new_key_vertex(t0, Point2::new(10.0, 0.0));
        let b0 = vac.new_key_vertex(t1, Point2::new(0.0, 4.0));
        let b1 = vac.new_key_vertex(t1, Point2::new(10.0, 4.0));
        let ea = vac
            .new_key_open_edge(a0, a1, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();
        let eb = vac
            .new_key_open_edge(b0, b1, line_geom(Point2::new(0.0, 4.0), Point2::new(10.0, 4.0)))
            .unwrap();
        let iv0 = vac.new_inbetween_vertex(a0, b0).unwrap();
        let iv1 = vac.new_inbetween_vertex(a1, b1).unwrap();

        let ie = vac
            .new_inbetween_open_edge(
                Path::Edges(vec![KeyHalfedge::new(ea, true)]),
                Path::Edges(vec![KeyHalfedge::new(eb, true)]),
                AnimatedVertex::new(vec![iv0]),
                AnimatedVertex::new(vec![iv1]),
            )
            .unwrap();

        let at_start = inbetween_edge_sampling(&vac, ie, t0, 1.0).unwrap();
        assert_relative_eq!(at_start[0].position.y, 0.0, epsilon = 1e-9);

        let mid = inbetween_edge_sampling(&vac, ie, Time::frame(5), 1.0).unwrap();
        for s in &mid {
            assert_relative_eq!(s.position.y, 2.0, epsilon = 1e-9);
        }
        assert_relative_eq!(mid[0].position.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(mid.last().unwrap().position.x, 10.0, epsilon = 1e-9);

        assert!(matches!(
            inbetween_edge_sampling(&vac, ie, Time::frame(11), 1.0),
            Err(Error::TimeOutOfRange { .. })
        ));
    }

    /// A stroke growing out of a point: the before boundary is a single
    /// vertex, so widths come from the after boundary for the whole
    /// interval.
    #[test]
    fn degenerate_boundary_takes_widths_from_the_other_side() {
        let mut vac = Vac::new();
        let t0 = Time::frame(0);
        let t1 = Time::frame(10);
        let origin = vac.new_key_vertex(t0, Point2::new(5.0, 0.0));
        let b0 = vac.new_key_vertex(t1, Point2::new(0.0, 0.0));
        let b1 = vac.new_key_vertex(t1, Point2::new(10.0, 0.0));
        let eb = vac
            .new_key_open_edge(b0, b1, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();
        let iv0 = vac.new_inbetween_vertex(origin, b0).unwrap();
        let iv1 = vac.new_inbetween_vertex(origin, b1).unwrap();

        let ie = vac
            .new_inbetween_open_edge(
                Path::SingleVertex(origin),
                Path::Edges(vec![KeyHalfedge::new(eb, true)]),
                AnimatedVertex::new(vec![iv0]),
                AnimatedVertex::new(vec![iv1]),
            )
            .unwrap();

        let samples = inbetween_edge_sampling(&vac, ie, Time::frame(2), 1.0).unwrap();
        for s in &samples {
            assert_relative_eq!(s.width, 2.0, epsilon = 1e-9); // line_geom width
        }
    }

    #[test]
    fn edge_triangle_cache_tracks_geometry_version() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(0), Point2::new(10.0, 0.0));
        let e = vac
            .new_key_open_edge(v0, v1, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();

        let n0 = vac.edge_triangles(e).unwrap().len();
        assert!(n0 > 0);
        assert!(vac.edge_triangles(e).unwrap().contains(Point2::new(5.0, 0.0)));

        // Moving a vertex invalidates the cached stroke
        vac.set_key_vertex_position(v0, Point2::new(0.0, 20.0)).unwrap();
        assert!(!vac.edge_triangles(e).unwrap().contains(Point2::new(5.0, 0.0)));
    }

    #[test]
    fn face_triangles_cover_the_square_interior() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let v: Vec<_> = corners.iter().map(|p| vac.new_key_vertex(t, *p)).collect();
        let mut edges = Vec::new();
        for i in 0..4 {
            let j = (i + 1) % 4;
            edges.push(
                vac.new_key_open_edge(v[i], v[j], line_geom(corners[i], corners[j]))
                    .unwrap(),
            );
        }
        let cycle = ProperCycle::from_edges(&vac, &edges).unwrap().into_cycle();
        let f = vac.new_key_face(t, vec![cycle]).unwrap();

        let tris = vac.face_triangles(f).unwrap();
        assert!(tris.contains(Point2::new(5.0, 5.0)));
        assert!(!tris.contains(Point2::new(15.0, 5.0)));
    }
}
