// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-indexed queries: what exists when, where it is, and what a
//! point or rectangle hits.
//!
//! Key cells exist at exactly their own instant; inbetween cells exist on
//! the open interval strictly between their before and after boundaries.
//! Hit tests go through a bounding-box broad phase before touching the
//! triangle-accurate tests, and reuse the cached triangulations.

use vac_geometry::{triangulate_stroke, Point2};

use crate::cell::{curve_samples_of, InbetweenEdgeBoundary};
use crate::error::Result;
use crate::keys::CellId;
use crate::sampling::{inbetween_edge_sampling, inbetween_vertex_pos, DEFAULT_SAMPLING_DS};
use crate::time::Time;
use crate::vac::Vac;

/// Axis-aligned box as `(min_x, max_x, min_y, max_y)`.
pub type BBox = (f64, f64, f64, f64);

pub(crate) fn merge(a: Option<BBox>, b: Option<BBox>) -> Option<BBox> {
    match (a, b) {
        (Some(a), Some(b)) => Some((
            a.0.min(b.0),
            a.1.max(b.1),
            a.2.min(b.2),
            a.3.max(b.3),
        )),
        (a, None) => a,
        (None, b) => b,
    }
}

fn samples_bbox<'a, I>(samples: I) -> Option<BBox>
where
    I: IntoIterator<Item = &'a vac_geometry::EdgeSample>,
{
    let mut out: Option<BBox> = None;
    for s in samples {
        let half = s.width * 0.5;
        let b = (
            s.position.x - half,
            s.position.x + half,
            s.position.y - half,
            s.position.y + half,
        );
        out = merge(out, Some(b));
    }
    out
}

impl Vac {
    /// Life-span interval of an inbetween cell; key cells yield a
    /// degenerate interval at their own instant.
    pub fn life_span(&self, id: CellId) -> Result<(Time, Time)> {
        match id {
            CellId::KeyVertex(k) => {
                let t = self.try_key_vertex(k)?.time;
                Ok((t, t))
            }
            CellId::KeyEdge(k) => {
                let t = self.try_key_edge(k)?.time;
                Ok((t, t))
            }
            CellId::KeyFace(k) => {
                let t = self.try_key_face(k)?.time;
                Ok((t, t))
            }
            CellId::InbetweenVertex(k) => {
                let data = self.try_inbetween_vertex(k)?;
                Ok((
                    self.try_key_vertex(data.before)?.time,
                    self.try_key_vertex(data.after)?.time,
                ))
            }
            CellId::InbetweenEdge(k) => {
                let data = self.try_inbetween_edge(k)?;
                match &data.boundary {
                    InbetweenEdgeBoundary::Open {
                        before_path,
                        after_path,
                        ..
                    } => Ok((before_path.time(self)?, after_path.time(self)?)),
                    InbetweenEdgeBoundary::Closed {
                        before_cycle,
                        after_cycle,
                    } => Ok((before_cycle.time(self)?, after_cycle.time(self)?)),
                }
            }
            CellId::InbetweenFace(k) => {
                let data = self.try_inbetween_face(k)?;
                let before = data
                    .before_cycles
                    .first()
                    .ok_or(crate::error::Error::EmptyEdgeSet)?;
                let after = data
                    .after_cycles
                    .first()
                    .ok_or(crate::error::Error::EmptyEdgeSet)?;
                Ok((before.time(self)?, after.time(self)?))
            }
        }
    }

    /// Whether a cell exists at time `t`: key cells at their exact
    /// instant, inbetween cells strictly inside their interval.
    pub fn exists_at(&self, id: CellId, t: Time) -> bool {
        match self.life_span(id) {
            Ok((t0, t1)) => {
                if t0 == t1 {
                    t == t0
                } else {
                    t0 < t && t < t1
                }
            }
            Err(_) => false,
        }
    }

    /// All cells existing at time `t`; this is the content of one frame.
    pub fn cells_at_time(&self, t: Time) -> Vec<CellId> {
        self.cells()
            .into_iter()
            .filter(|id| self.exists_at(*id, t))
            .collect()
    }

    /// Axis-aligned bounding box of a cell at time `t`, `None` when the
    /// cell has no geometry there.
    pub fn bounding_box(&self, id: CellId, t: Time) -> Result<Option<BBox>> {
        if !self.exists_at(id, t) {
            // Resolve the key first so stale ids still error
            self.life_span(id)?;
            return Ok(None);
        }
        match id {
            CellId::KeyVertex(k) => {
                let data = self.try_key_vertex(k)?;
                let half = data.size * 0.5;
                Ok(Some((
                    data.position.x - half,
                    data.position.x + half,
                    data.position.y - half,
                    data.position.y + half,
                )))
            }
            CellId::KeyEdge(k) => {
                let data = self.try_key_edge(k)?;
                Ok(samples_bbox(data.geometry.samples()))
            }
            CellId::KeyFace(k) => {
                let data = self.try_key_face(k)?;
                let mut out = None;
                for cycle in data.cycles.clone() {
                    let n = ((cycle.length(self)? / DEFAULT_SAMPLING_DS) as usize).max(3);
                    let samples = cycle.sample(self, n)?;
                    out = merge(out, samples_bbox(&samples));
                }
                Ok(out)
            }
            CellId::InbetweenVertex(k) => {
                let p = inbetween_vertex_pos(self, k, t)?;
                Ok(Some((p.x, p.x, p.y, p.y)))
            }
            CellId::InbetweenEdge(k) => {
                let samples = inbetween_edge_sampling(self, k, t, DEFAULT_SAMPLING_DS)?;
                Ok(samples_bbox(&samples))
            }
            CellId::InbetweenFace(k) => {
                // Conservative: union of the boundary cycles at both ends
                let data = self.try_inbetween_face(k)?;
                let cycles: Vec<_> = data
                    .before_cycles
                    .iter()
                    .chain(&data.after_cycles)
                    .cloned()
                    .collect();
                let mut out = None;
                for cycle in cycles {
                    let n = ((cycle.length(self)? / DEFAULT_SAMPLING_DS) as usize).max(3);
                    let samples = cycle.sample(self, n)?;
                    out = merge(out, samples_bbox(&samples));
                }
                Ok(out)
            }
        }
    }

    /// Cells at time `t` whose drawn shape contains `p`. Inbetween faces
    /// are matched by bounding box only.
    pub fn hit_test_point(&mut self, p: Point2<f64>, t: Time) -> Result<Vec<CellId>> {
        let mut hits = Vec::new();
        for id in self.cells_at_time(t) {
            let Some(bbox) = self.bounding_box(id, t)? else {
                continue;
            };
            if p.x < bbox.0 || p.x > bbox.1 || p.y < bbox.2 || p.y > bbox.3 {
                continue;
            }
            let hit = match id {
                CellId::KeyVertex(k) => {
                    let data = self.try_key_vertex(k)?;
                    (p - data.position).norm() <= data.size * 0.5
                }
                CellId::KeyEdge(k) => self.edge_triangles(k)?.contains(p),
                CellId::KeyFace(k) => self.face_triangles(k)?.contains(p),
                CellId::InbetweenVertex(_) | CellId::InbetweenFace(_) => true,
                CellId::InbetweenEdge(k) => {
                    let samples = inbetween_edge_sampling(self, k, t, DEFAULT_SAMPLING_DS)?;
                    triangulate_stroke(&curve_samples_of(&samples)).contains(p)
                }
            };
            if hit {
                hits.push(id);
            }
        }
        Ok(hits)
    }

    /// Cells at time `t` whose drawn shape overlaps the rectangle.
    pub fn hit_test_rect(
        &mut self,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        t: Time,
    ) -> Result<Vec<CellId>> {
        let mut hits = Vec::new();
        for id in self.cells_at_time(t) {
            let Some(bbox) = self.bounding_box(id, t)? else {
                continue;
            };
            if bbox.1 < min_x || bbox.0 > max_x || bbox.3 < min_y || bbox.2 > max_y {
                continue;
            }
            let hit = match id {
                CellId::KeyEdge(k) => self
                    .edge_triangles(k)?
                    .intersects_rect(min_x, max_x, min_y, max_y),
                CellId::KeyFace(k) => self
                    .face_triangles(k)?
                    .intersects_rect(min_x, max_x, min_y, max_y),
                CellId::InbetweenEdge(k) => {
                    let samples = inbetween_edge_sampling(self, k, t, DEFAULT_SAMPLING_DS)?;
                    triangulate_stroke(&curve_samples_of(&samples))
                        .intersects_rect(min_x, max_x, min_y, max_y)
                }
                // Points and conservative boxes pass on the broad phase
                _ => true,
            };
            if hit {
                hits.push(id);
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::EdgeGeometry;

    fn line_geom(p0: Point2<f64>, p1: Point2<f64>) -> EdgeGeometry {
        EdgeGeometry::line(p0, p1, 2.0, 1.0)
    }

    #[test]
    fn key_cells_exist_only_at_their_instant() {
        let mut vac = Vac::new();
        let v = vac.new_key_vertex(Time::frame(3), Point2::new(0.0, 0.0));

        assert!(vac.exists_at(v.into(), Time::frame(3)));
        assert!(!vac.exists_at(v.into(), Time::frame(4)));
        // Tolerant time comparison
        assert!(vac.exists_at(v.into(), Time::new(3.0 + 1e-12)));
    }

    #[test]
    fn inbetween_cells_exist_strictly_inside_their_interval() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(10), Point2::new(5.0, 0.0));
        let iv = vac.new_inbetween_vertex(v0, v1).unwrap();

        assert!(vac.exists_at(iv.into(), Time::frame(5)));
        assert!(!vac.exists_at(iv.into(), Time::frame(0)));
        assert!(!vac.exists_at(iv.into(), Time::frame(10)));

        let frame5 = vac.cells_at_time(Time::frame(5));
        assert_eq!(frame5, vec![CellId::InbetweenVertex(iv)]);
        let frame0 = vac.cells_at_time(Time::frame(0));
        assert_eq!(frame0.len(), 1);
        assert_eq!(frame0[0], CellId::KeyVertex(v0));
    }

    #[test]
    fn point_hit_test_distinguishes_edge_from_background() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let e = vac
            .new_key_open_edge(v0, v1, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();

        let on_edge = vac.hit_test_point(Point2::new(5.0, 0.0), t).unwrap();
        assert!(on_edge.contains(&e.into()));
        let off_edge = vac.hit_test_point(Point2::new(5.0, 8.0), t).unwrap();
        assert!(off_edge.is_empty());
    }

    #[test]
    fn rect_hit_test_uses_triangle_overlap() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(10.0, 10.0));
        let e = vac
            .new_key_open_edge(v0, v1, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0)))
            .unwrap();

        // A box straddling the diagonal hits; one tucked in the corner
        // inside the bbox but off the stroke does not
        let hits = vac.hit_test_rect(4.0, 6.0, 4.0, 6.0, t).unwrap();
        assert!(hits.contains(&e.into()));
        let misses = vac.hit_test_rect(8.0, 9.5, 0.0, 1.0, t).unwrap();
        assert!(!misses.contains(&e.into()));
    }

    #[test]
    fn bounding_box_includes_stroke_width() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let e = vac
            .new_key_open_edge(v0, v1, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();

        let bbox = vac.bounding_box(e.into(), t).unwrap().unwrap();
        assert!((bbox.0 - -1.0).abs() < 1e-9); // half of width 2.0
        assert!((bbox.1 - 11.0).abs() < 1e-9);
        assert!((bbox.2 - -1.0).abs() < 1e-9);
        assert!((bbox.3 - 1.0).abs() < 1e-9);
    }
}
