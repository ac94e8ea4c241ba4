// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cell payload types.
//!
//! The six concrete cell types are plain data stored in the
//! [`Vac`](crate::Vac) arena. Key cells own their geometry; inbetween cells
//! own only boundary structure, their geometry at any query time is computed
//! by cross-dissolving the key geometry at the interval ends (see
//! [`crate::sampling`]).
//!
//! Cached derived geometry (the triangulation of an edge stroke or face
//! interior) is guarded by a version counter: every mutation of a cell's
//! geometry bumps `geometry_version`, and accessors rebuild the cache only
//! when its recorded version is stale.

use vac_geometry::{CurveSample, EdgeSample, Point2, Triangles, Vector2};

use crate::cycle::Cycle;
use crate::keys::KeyVertexKey;
use crate::path::Path;
use crate::time::Time;
use crate::AnimatedVertex;

/// Sampled centerline geometry owned by a key edge.
///
/// A sequence of at least one (position, width) sample. Arclength
/// parameterization is derived on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGeometry {
    samples: Vec<EdgeSample>,
}

impl EdgeGeometry {
    pub fn new(samples: Vec<EdgeSample>) -> Self {
        Self { samples }
    }

    /// A straight segment sampled uniformly at spacing `ds`.
    pub fn line(p0: Point2<f64>, p1: Point2<f64>, width: f64, ds: f64) -> Self {
        let chord = (p1 - p0).norm();
        let n = ((chord / ds.max(1e-10)).ceil() as usize).max(1) + 1;
        let samples = (0..n)
            .map(|i| {
                let u = i as f64 / (n - 1) as f64;
                EdgeSample {
                    position: Point2::from(p0.coords * (1.0 - u) + p1.coords * u),
                    width,
                }
            })
            .collect();
        Self { samples }
    }

    pub fn samples(&self) -> &[EdgeSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn start(&self) -> Option<&EdgeSample> {
        self.samples.first()
    }

    pub fn end(&self) -> Option<&EdgeSample> {
        self.samples.last()
    }

    /// Total arclength of the sampled polyline.
    pub fn length(&self) -> f64 {
        self.samples
            .windows(2)
            .map(|w| (w[1].position - w[0].position).norm())
            .sum()
    }

    /// Sample at arclength `s`, clamped to `[0, length]`, by linear
    /// interpolation between the surrounding samples.
    pub fn sample_at(&self, s: f64) -> Option<EdgeSample> {
        let first = self.samples.first()?;
        if self.samples.len() == 1 || s <= 0.0 {
            return Some(*first);
        }

        let mut acc = 0.0;
        for w in self.samples.windows(2) {
            let ds = (w[1].position - w[0].position).norm();
            if acc + ds >= s && ds > 0.0 {
                let u = (s - acc) / ds;
                return Some(w[0].lerp(&w[1], u));
            }
            acc += ds;
        }
        self.samples.last().copied()
    }

    /// `n` samples spaced uniformly in arclength, endpoints exact.
    pub fn resample_uniform(&self, n: usize) -> Vec<EdgeSample> {
        if n == 0 || self.samples.is_empty() {
            return Vec::new();
        }
        if n == 1 {
            return vec![self.samples[0]];
        }
        let length = self.length();
        (0..n)
            .map(|i| {
                let s = length * i as f64 / (n - 1) as f64;
                // sample_at can only fail on an empty list, checked above
                self.sample_at(s).unwrap_or(self.samples[0])
            })
            .collect()
    }

    /// The sub-geometry between arclengths `s0 < s1`, with interpolated
    /// samples at both cut points and every original sample strictly
    /// between them.
    pub fn slice(&self, s0: f64, s1: f64) -> EdgeGeometry {
        let mut out = Vec::new();
        let (Some(first), Some(last)) = (self.sample_at(s0), self.sample_at(s1)) else {
            return EdgeGeometry::new(out);
        };
        out.push(first);
        let mut acc = 0.0;
        for w in self.samples.windows(2) {
            acc += (w[1].position - w[0].position).norm();
            if acc > s0 + 1e-9 && acc < s1 - 1e-9 {
                out.push(w[1]);
            }
        }
        out.push(last);
        EdgeGeometry::new(out)
    }

    /// The same geometry traversed end-to-start.
    pub fn reversed(&self) -> EdgeGeometry {
        let mut samples = self.samples.clone();
        samples.reverse();
        EdgeGeometry { samples }
    }

    /// Promotes the raw samples to fully attributed curve samples: tangents
    /// by central difference (one-sided at the ends), normals, cumulative
    /// arclength. Used by stroke triangulation.
    pub fn curve_samples(&self) -> Vec<CurveSample> {
        curve_samples_of(&self.samples)
    }
}

/// Central-difference promotion shared by edges and cross-dissolved
/// sampling output.
pub(crate) fn curve_samples_of(samples: &[EdgeSample]) -> Vec<CurveSample> {
    let n = samples.len();
    let mut out = Vec::with_capacity(n);
    let mut arclength = 0.0;
    for i in 0..n {
        if i > 0 {
            arclength += (samples[i].position - samples[i - 1].position).norm();
        }
        let tangent = if n == 1 {
            Vector2::new(1.0, 0.0)
        } else if i == 0 {
            samples[1].position - samples[0].position
        } else if i == n - 1 {
            samples[n - 1].position - samples[n - 2].position
        } else {
            samples[i + 1].position - samples[i - 1].position
        };

        let norm = tangent.norm();
        let unit = if norm > 1e-12 {
            tangent / norm
        } else {
            Vector2::new(1.0, 0.0)
        };

        out.push(CurveSample {
            position: samples[i].position,
            width: samples[i].width,
            tangent: unit,
            normal: Vector2::new(-unit.y, unit.x),
            arclength,
        });
    }
    out
}

/// Version-guarded triangulation cache.
#[derive(Debug, Clone, Default)]
pub(crate) struct TriangleCache {
    pub(crate) version: u64,
    pub(crate) triangles: Option<Triangles>,
}

impl TriangleCache {
    pub(crate) fn get(&self, version: u64) -> Option<&Triangles> {
        match &self.triangles {
            Some(t) if self.version == version => Some(t),
            _ => None,
        }
    }

    pub(crate) fn put(&mut self, version: u64, triangles: Triangles) {
        self.version = version;
        self.triangles = Some(triangles);
    }
}

/// A point at one instant. Dimension 0, key.
#[derive(Debug, Clone)]
pub struct KeyVertexData {
    pub time: Time,
    pub position: Point2<f64>,
    /// Display size of the vertex dot, also the width used when the vertex
    /// is rendered on its own.
    pub size: f64,
}

/// An open or closed curve at one instant. Dimension 1, key.
///
/// `boundary` is `Some((start, end))` for an open edge and `None` for a
/// closed loop edge.
#[derive(Debug, Clone)]
pub struct KeyEdgeData {
    pub time: Time,
    pub boundary: Option<(KeyVertexKey, KeyVertexKey)>,
    pub geometry: EdgeGeometry,
    pub(crate) geometry_version: u64,
    pub(crate) triangle_cache: TriangleCache,
}

impl KeyEdgeData {
    pub fn is_closed(&self) -> bool {
        self.boundary.is_none()
    }

    pub fn start_vertex(&self) -> Option<KeyVertexKey> {
        self.boundary.map(|(s, _)| s)
    }

    pub fn end_vertex(&self) -> Option<KeyVertexKey> {
        self.boundary.map(|(_, e)| e)
    }
}

/// A region bounded by one or more cycles at one instant. Dimension 2, key.
#[derive(Debug, Clone)]
pub struct KeyFaceData {
    pub time: Time,
    pub cycles: Vec<Cycle>,
    pub(crate) geometry_version: u64,
    pub(crate) triangle_cache: TriangleCache,
}

/// A vertex animated across a time interval. Dimension 0, inbetween.
///
/// Owns no geometry: its position at an intermediate time is interpolated
/// from the before/after key vertices and their temporal neighbors.
#[derive(Debug, Clone)]
pub struct InbetweenVertexData {
    pub before: KeyVertexKey,
    pub after: KeyVertexKey,
}

/// Boundary of an inbetween edge: the two representations are mutually
/// exclusive and chosen at construction.
#[derive(Debug, Clone)]
pub enum InbetweenEdgeBoundary {
    /// An open edge animating between two open paths; its endpoints follow
    /// the two animated vertices.
    Open {
        before_path: Path,
        after_path: Path,
        start_vertex: AnimatedVertex,
        end_vertex: AnimatedVertex,
    },
    /// A closed edge animating between two cycles. Each cycle carries its
    /// own starting-point offset for seam alignment.
    Closed {
        before_cycle: Cycle,
        after_cycle: Cycle,
    },
}

/// An edge animated across a time interval. Dimension 1, inbetween.
#[derive(Debug, Clone)]
pub struct InbetweenEdgeData {
    pub boundary: InbetweenEdgeBoundary,
}

impl InbetweenEdgeData {
    pub fn is_closed(&self) -> bool {
        matches!(self.boundary, InbetweenEdgeBoundary::Closed { .. })
    }
}

/// A face animated across a time interval. Dimension 2, inbetween. The
/// boundary is the pair of key-face cycle lists at the interval ends.
#[derive(Debug, Clone)]
pub struct InbetweenFaceData {
    pub before_cycles: Vec<Cycle>,
    pub after_cycles: Vec<Cycle>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_geometry() -> EdgeGeometry {
        EdgeGeometry::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 2.0, 1.0)
    }

    #[test]
    fn line_has_exact_endpoints_and_length() {
        let g = line_geometry();
        assert_relative_eq!(g.start().unwrap().position.x, 0.0);
        assert_relative_eq!(g.end().unwrap().position.x, 10.0);
        assert_relative_eq!(g.length(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn sample_at_interpolates_and_clamps() {
        let g = line_geometry();
        let mid = g.sample_at(5.0).unwrap();
        assert_relative_eq!(mid.position.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(mid.width, 2.0);

        assert_relative_eq!(g.sample_at(-1.0).unwrap().position.x, 0.0);
        assert_relative_eq!(g.sample_at(100.0).unwrap().position.x, 10.0);
    }

    #[test]
    fn resample_uniform_counts_and_spacing() {
        let g = line_geometry();
        let r = g.resample_uniform(6);
        assert_eq!(r.len(), 6);
        for (i, s) in r.iter().enumerate() {
            assert_relative_eq!(s.position.x, 2.0 * i as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn reversed_swaps_endpoints() {
        let g = line_geometry().reversed();
        assert_relative_eq!(g.start().unwrap().position.x, 10.0);
        assert_relative_eq!(g.end().unwrap().position.x, 0.0);
        assert_relative_eq!(g.length(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn curve_samples_attributes() {
        let g = line_geometry();
        let cs = g.curve_samples();
        assert_eq!(cs.len(), g.samples().len());
        assert_relative_eq!(cs.last().unwrap().arclength, 10.0, epsilon = 1e-12);
        for s in &cs {
            assert_relative_eq!(s.tangent.x, 1.0, epsilon = 1e-12);
            assert_relative_eq!(s.normal.y, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn triangle_cache_respects_version() {
        let mut cache = TriangleCache::default();
        assert!(cache.get(0).is_none());

        cache.put(1, Triangles::new());
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none()); // stale after a version bump
    }
}
