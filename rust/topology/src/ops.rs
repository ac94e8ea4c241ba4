// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-phase topological operators.
//!
//! Every operator is a plain struct describing intent. `compute(&Vac)`
//! validates against the current complex and returns a staged value; the
//! staged value's `apply(&mut Vac)` performs the mutation. The type system
//! enforces the phase order: there is no way to mutate the complex with an
//! operator that has not passed validation, and a staged operator is
//! consumed by its single `apply`.
//!
//! Between `compute` and `apply` the complex may have changed, so `apply`
//! re-validates through the arena's checked entry points rather than
//! trusting the staged data blindly.

use rustc_hash::FxHashSet;
use tracing::debug;
use vac_geometry::{EdgeSample, Point2};

use crate::animated_vertex::AnimatedVertex;
use crate::boundary::{update_boundary_edge, update_boundary_vertex};
use crate::cell::EdgeGeometry;
use crate::cycle::{Cycle, CycleKind};
use crate::error::{Error, Result};
use crate::halfedge::KeyHalfedge;
use crate::keys::{
    CellId, CellKind, InbetweenEdgeKey, InbetweenVertexKey, KeyEdgeKey, KeyFaceKey, KeyVertexKey,
};
use crate::path::Path;
use crate::time::Time;
use crate::vac::{Vac, DEFAULT_VERTEX_SIZE};

// --- Creation ---

pub struct MakeKeyVertex {
    pub time: Time,
    pub position: Point2<f64>,
    pub size: f64,
}

impl MakeKeyVertex {
    pub fn new(time: Time, position: Point2<f64>) -> Self {
        Self {
            time,
            position,
            size: DEFAULT_VERTEX_SIZE,
        }
    }

    pub fn compute(self, _vac: &Vac) -> Result<StagedMakeKeyVertex> {
        Ok(StagedMakeKeyVertex { op: self })
    }
}

pub struct StagedMakeKeyVertex {
    op: MakeKeyVertex,
}

impl StagedMakeKeyVertex {
    pub fn apply(self, vac: &mut Vac) -> KeyVertexKey {
        vac.new_key_vertex_with_size(self.op.time, self.op.position, self.op.size)
    }
}

pub struct MakeKeyOpenEdge {
    pub start: KeyVertexKey,
    pub end: KeyVertexKey,
    pub geometry: EdgeGeometry,
}

impl MakeKeyOpenEdge {
    pub fn compute(self, vac: &Vac) -> Result<StagedMakeKeyOpenEdge> {
        let t_start = vac.try_key_vertex(self.start)?.time;
        let t_end = vac.try_key_vertex(self.end)?.time;
        if t_start != t_end {
            return Err(Error::TimeMismatch {
                expected: t_start,
                found: t_end,
            });
        }
        Ok(StagedMakeKeyOpenEdge { op: self })
    }
}

pub struct StagedMakeKeyOpenEdge {
    op: MakeKeyOpenEdge,
}

impl StagedMakeKeyOpenEdge {
    pub fn apply(self, vac: &mut Vac) -> Result<KeyEdgeKey> {
        vac.new_key_open_edge(self.op.start, self.op.end, self.op.geometry)
    }
}

pub struct MakeKeyClosedEdge {
    pub time: Time,
    pub geometry: EdgeGeometry,
}

impl MakeKeyClosedEdge {
    pub fn compute(self, _vac: &Vac) -> Result<StagedMakeKeyClosedEdge> {
        if self.geometry.is_empty() {
            return Err(Error::EmptyEdgeSet);
        }
        Ok(StagedMakeKeyClosedEdge { op: self })
    }
}

pub struct StagedMakeKeyClosedEdge {
    op: MakeKeyClosedEdge,
}

impl StagedMakeKeyClosedEdge {
    pub fn apply(self, vac: &mut Vac) -> KeyEdgeKey {
        vac.new_key_closed_edge(self.op.time, self.op.geometry)
    }
}

pub struct MakeKeyFace {
    pub time: Time,
    pub cycles: Vec<Cycle>,
}

impl MakeKeyFace {
    pub fn compute(self, vac: &Vac) -> Result<StagedMakeKeyFace> {
        for cycle in &self.cycles {
            cycle.check(vac, self.time)?;
        }
        Ok(StagedMakeKeyFace { op: self })
    }
}

pub struct StagedMakeKeyFace {
    op: MakeKeyFace,
}

impl StagedMakeKeyFace {
    pub fn apply(self, vac: &mut Vac) -> Result<KeyFaceKey> {
        vac.new_key_face(self.op.time, self.op.cycles)
    }
}

pub struct MakeInbetweenVertex {
    pub before: KeyVertexKey,
    pub after: KeyVertexKey,
}

impl MakeInbetweenVertex {
    pub fn compute(self, vac: &Vac) -> Result<StagedMakeInbetweenVertex> {
        let t0 = vac.try_key_vertex(self.before)?.time;
        let t1 = vac.try_key_vertex(self.after)?.time;
        if !(t0 < t1) {
            return Err(Error::InvalidInterval {
                before: t0,
                after: t1,
            });
        }
        Ok(StagedMakeInbetweenVertex { op: self })
    }
}

pub struct StagedMakeInbetweenVertex {
    op: MakeInbetweenVertex,
}

impl StagedMakeInbetweenVertex {
    pub fn apply(self, vac: &mut Vac) -> Result<InbetweenVertexKey> {
        vac.new_inbetween_vertex(self.op.before, self.op.after)
    }
}

pub struct MakeInbetweenOpenEdge {
    pub before_path: Path,
    pub after_path: Path,
    pub start_vertex: AnimatedVertex,
    pub end_vertex: AnimatedVertex,
}

impl MakeInbetweenOpenEdge {
    pub fn compute(self, vac: &Vac) -> Result<StagedMakeInbetweenOpenEdge> {
        vac.check_inbetween_open_edge(
            &self.before_path,
            &self.after_path,
            &self.start_vertex,
            &self.end_vertex,
        )?;
        Ok(StagedMakeInbetweenOpenEdge { op: self })
    }
}

pub struct StagedMakeInbetweenOpenEdge {
    op: MakeInbetweenOpenEdge,
}

impl StagedMakeInbetweenOpenEdge {
    pub fn apply(self, vac: &mut Vac) -> Result<InbetweenEdgeKey> {
        vac.new_inbetween_open_edge(
            self.op.before_path,
            self.op.after_path,
            self.op.start_vertex,
            self.op.end_vertex,
        )
    }
}

pub struct MakeInbetweenClosedEdge {
    pub before_cycle: Cycle,
    pub after_cycle: Cycle,
}

impl MakeInbetweenClosedEdge {
    pub fn compute(self, vac: &Vac) -> Result<StagedMakeInbetweenClosedEdge> {
        let t0 = self.before_cycle.time(vac)?;
        let t1 = self.after_cycle.time(vac)?;
        if !(t0 < t1) {
            return Err(Error::InvalidInterval {
                before: t0,
                after: t1,
            });
        }
        self.before_cycle.check(vac, t0)?;
        self.after_cycle.check(vac, t1)?;
        Ok(StagedMakeInbetweenClosedEdge { op: self })
    }
}

pub struct StagedMakeInbetweenClosedEdge {
    op: MakeInbetweenClosedEdge,
}

impl StagedMakeInbetweenClosedEdge {
    pub fn apply(self, vac: &mut Vac) -> Result<InbetweenEdgeKey> {
        vac.new_inbetween_closed_edge(self.op.before_cycle, self.op.after_cycle)
    }
}

// --- Splitting ---

/// Splits a key edge at one or more arclength positions, creating a
/// vertex per cut and an edge per resulting span, then rewriting every
/// dependent boundary to walk the new chain before removing the old edge.
pub struct SplitEdge {
    pub edge: KeyEdgeKey,
    /// Cut positions as arclengths, strictly increasing, strictly inside
    /// `(0, length)` for open edges and inside `[0, length)` for closed.
    pub arclengths: Vec<f64>,
}

impl SplitEdge {
    pub fn compute(self, vac: &Vac) -> Result<StagedSplitEdge> {
        let data = vac.try_key_edge(self.edge)?;
        if self.arclengths.is_empty() {
            return Err(Error::EmptyEdgeSet);
        }
        let length = data.geometry.length();
        let is_closed = data.is_closed();
        let mut prev = if is_closed { -1.0 } else { 0.0 };
        for &s in &self.arclengths {
            let in_range = if is_closed {
                (0.0..length).contains(&s)
            } else {
                s > 0.0 && s < length
            };
            if !in_range || s <= prev {
                return Err(Error::InvalidSplitPosition(s));
            }
            prev = s;
        }

        // Precompute cut samples and the span geometries
        let geometry = &data.geometry;
        let mut cuts = Vec::with_capacity(self.arclengths.len());
        for &s in &self.arclengths {
            match geometry.sample_at(s) {
                Some(sample) => cuts.push(sample),
                None => return Err(Error::InvalidSplitPosition(s)),
            }
        }
        let mut spans = Vec::new();
        if is_closed {
            // Spans wrap: [s_i, s_{i+1}], last one wraps through the seam
            for w in self.arclengths.windows(2) {
                spans.push(geometry.slice(w[0], w[1]));
            }
            let first = self.arclengths[0];
            let last = self.arclengths[self.arclengths.len() - 1];
            let mut wrap = geometry.slice(last, length).samples().to_vec();
            wrap.extend(
                geometry
                    .slice(0.0, first)
                    .samples()
                    .iter()
                    .skip(1)
                    .copied(),
            );
            spans.push(EdgeGeometry::new(wrap));
        } else {
            let mut bounds = vec![0.0];
            bounds.extend_from_slice(&self.arclengths);
            bounds.push(length);
            for w in bounds.windows(2) {
                spans.push(geometry.slice(w[0], w[1]));
            }
        }

        Ok(StagedSplitEdge {
            edge: self.edge,
            time: data.time,
            boundary: data.boundary,
            cuts,
            spans,
        })
    }
}

pub struct StagedSplitEdge {
    edge: KeyEdgeKey,
    time: Time,
    boundary: Option<(KeyVertexKey, KeyVertexKey)>,
    cuts: Vec<vac_geometry::EdgeSample>,
    spans: Vec<EdgeGeometry>,
}

/// New cells produced by a split, in walk order along the old edge.
pub struct SplitEdgeOutput {
    pub vertices: Vec<KeyVertexKey>,
    pub edges: Vec<KeyEdgeKey>,
}

impl StagedSplitEdge {
    pub fn apply(self, vac: &mut Vac) -> Result<SplitEdgeOutput> {
        vac.try_key_edge(self.edge)?;
        let vertices: Vec<KeyVertexKey> = self
            .cuts
            .iter()
            .map(|c| vac.new_key_vertex_with_size(self.time, c.position, c.width))
            .collect();

        let mut edges = Vec::with_capacity(self.spans.len());
        match self.boundary {
            Some((start, end)) => {
                // Endpoint sequence: start, cuts..., end
                let mut ends = vec![start];
                ends.extend(&vertices);
                ends.push(end);
                for (i, span) in self.spans.into_iter().enumerate() {
                    edges.push(vac.new_key_open_edge(ends[i], ends[i + 1], span)?);
                }
            }
            None => {
                // Cut loop: cuts..., wrapping back to the first cut
                let k = vertices.len();
                for (i, span) in self.spans.into_iter().enumerate() {
                    edges.push(vac.new_key_open_edge(
                        vertices[i],
                        vertices[(i + 1) % k],
                        span,
                    )?);
                }
            }
        }

        let replacement: Vec<KeyHalfedge> =
            edges.iter().map(|e| KeyHalfedge::new(*e, true)).collect();
        update_boundary_edge(vac, self.edge, &replacement)?;
        vac.remove_key_edge(self.edge)?;
        debug!(edge = ?self.edge, cuts = vertices.len(), "split key edge");
        Ok(SplitEdgeOutput { vertices, edges })
    }
}

// --- Gluing ---

/// Merges `source` into `target`: both vertices move to their midpoint
/// (warping incident edge geometry), every boundary reference to `source`
/// is rewritten to `target`, and `source` is removed.
pub struct GlueVertices {
    pub target: KeyVertexKey,
    pub source: KeyVertexKey,
}

impl GlueVertices {
    pub fn compute(self, vac: &Vac) -> Result<StagedGlueVertices> {
        let t_target = vac.try_key_vertex(self.target)?.time;
        let t_source = vac.try_key_vertex(self.source)?.time;
        if t_target != t_source {
            return Err(Error::TimeMismatch {
                expected: t_target,
                found: t_source,
            });
        }
        Ok(StagedGlueVertices { op: self })
    }
}

pub struct StagedGlueVertices {
    op: GlueVertices,
}

impl StagedGlueVertices {
    pub fn apply(self, vac: &mut Vac) -> Result<KeyVertexKey> {
        let GlueVertices { target, source } = self.op;
        glue_vertex_pair(vac, target, source)
    }
}

fn glue_vertex_pair(
    vac: &mut Vac,
    target: KeyVertexKey,
    source: KeyVertexKey,
) -> Result<KeyVertexKey> {
    if target == source {
        return Ok(target);
    }
    let p_target = vac.try_key_vertex(target)?.position;
    let p_source = vac.try_key_vertex(source)?.position;
    let mid = Point2::from((p_target.coords + p_source.coords) * 0.5);

    vac.set_key_vertex_position(target, mid)?;
    vac.set_key_vertex_position(source, mid)?;
    update_boundary_vertex(vac, source, target)?;
    vac.remove_key_vertex(source)?;
    debug!(?target, ?source, "glued key vertices");
    Ok(target)
}

/// Merges two key edges into one, averaging their geometry. Both edges
/// must live at the same time and share closedness. For open edges the
/// corresponding endpoint vertices are glued first; the orientation
/// correspondence is chosen by comparing tangents at the arclength
/// midpoint, so two strokes drawn in opposite directions still glue.
pub struct GlueEdges {
    pub edge: KeyEdgeKey,
    pub other: KeyEdgeKey,
}

impl GlueEdges {
    pub fn compute(self, vac: &Vac) -> Result<StagedGlueEdges> {
        if self.edge == self.other {
            return Err(Error::TopologyMismatch("cannot glue an edge to itself"));
        }
        let a = vac.try_key_edge(self.edge)?;
        let b = vac.try_key_edge(self.other)?;
        if a.time != b.time {
            return Err(Error::TimeMismatch {
                expected: a.time,
                found: b.time,
            });
        }
        if a.is_closed() != b.is_closed() {
            return Err(Error::TopologyMismatch(
                "cannot glue an open edge to a closed edge",
            ));
        }
        let side = mid_tangent(&a.geometry).dot(&mid_tangent(&b.geometry)) > 0.0;
        Ok(StagedGlueEdges {
            edge: self.edge,
            other: self.other,
            side,
        })
    }
}

/// Central difference around the arclength midpoint.
fn mid_tangent(g: &EdgeGeometry) -> vac_geometry::Vector2<f64> {
    let l = g.length();
    let h = (l * 0.05).max(1e-9);
    match (g.sample_at(l * 0.5 - h), g.sample_at(l * 0.5 + h)) {
        (Some(a), Some(b)) => b.position - a.position,
        _ => vac_geometry::Vector2::new(0.0, 0.0),
    }
}

pub struct StagedGlueEdges {
    edge: KeyEdgeKey,
    other: KeyEdgeKey,
    /// Whether `other` is traversed the same way as `edge`.
    side: bool,
}

impl StagedGlueEdges {
    pub fn apply(self, vac: &mut Vac) -> Result<KeyEdgeKey> {
        let (e1, e2, side) = (self.edge, self.other, self.side);
        let d1 = vac.try_key_edge(e1)?;
        let time = d1.time;
        let closed = d1.is_closed();
        let g1 = d1.geometry.clone();
        let b1 = d1.boundary;
        let d2 = vac.try_key_edge(e2)?;
        let g2 = if side {
            d2.geometry.clone()
        } else {
            d2.geometry.reversed()
        };
        let b2 = d2.boundary;

        // Average at matched arclength fractions
        let n = (g1.samples().len() + g2.samples().len()) / 2 + 1;
        let s1 = g1.resample_uniform(n);
        let s2 = g2.resample_uniform(n);
        let mut avg: Vec<EdgeSample> = s1.iter().zip(&s2).map(|(a, b)| a.lerp(b, 0.5)).collect();

        let e3 = if closed {
            if let Some(first) = avg.first().copied() {
                if let Some(last) = avg.last_mut() {
                    *last = first;
                }
            }
            vac.new_key_closed_edge(time, EdgeGeometry::new(avg))
        } else {
            let (s1v, _) = b1.ok_or(Error::NotClosed)?;
            let (mut s2v, mut e2v) = b2.ok_or(Error::NotClosed)?;
            if !side {
                std::mem::swap(&mut s2v, &mut e2v);
            }
            glue_vertex_pair(vac, s1v, s2v)?;
            // The first glue may have rewritten either edge's endpoints
            let e1v = vac.try_key_edge(e1)?.end_vertex().ok_or(Error::NotClosed)?;
            let live2 = vac.try_key_edge(e2)?.boundary.ok_or(Error::NotClosed)?;
            let e2v = if side { live2.1 } else { live2.0 };
            glue_vertex_pair(vac, e1v, e2v)?;

            let (start, end) = vac.try_key_edge(e1)?.boundary.ok_or(Error::NotClosed)?;
            vac.new_key_open_edge(start, end, EdgeGeometry::new(avg))?
        };

        update_boundary_edge(vac, e1, &[KeyHalfedge::new(e3, true)])?;
        update_boundary_edge(vac, e2, &[KeyHalfedge::new(e3, side)])?;
        vac.remove_key_edge(e1)?;
        vac.remove_key_edge(e2)?;
        debug!(?e1, ?e2, glued = ?e3, "glued key edges");
        Ok(e3)
    }
}

// --- Ungluing ---

/// Number of times the face cycles of the complex traverse an edge.
fn edge_uses(vac: &Vac, e: KeyEdgeKey) -> usize {
    let mut n = 0;
    for f in vac.incident_faces(e) {
        if let Some(face) = vac.key_face(f) {
            for cycle in &face.cycles {
                n += cycle.edges().iter().filter(|x| **x == e).count();
            }
        }
    }
    n
}

/// Number of distinct uses of a vertex: Steiner cycles on it, face-cycle
/// walks passing through it, and endpoint slots of edges that bound no
/// face.
fn vertex_uses(vac: &Vac, v: KeyVertexKey) -> Result<usize> {
    let mut n = 0;
    for f in vac.incident_faces_of_vertex(v) {
        if let Some(face) = vac.key_face(f) {
            for cycle in &face.cycles {
                if cycle.steiner_vertex() == Some(v) {
                    n += 1;
                }
            }
        }
    }

    let faces: FxHashSet<KeyFaceKey> = vac
        .incident_edges(v)
        .into_iter()
        .flat_map(|e| vac.incident_faces(e))
        .collect();
    for f in faces {
        let cycles = vac.try_key_face(f)?.cycles.clone();
        for cycle in &cycles {
            if let CycleKind::Edges(hes) = &cycle.kind {
                for he in hes {
                    if he.start_vertex(vac)? == Some(v) {
                        n += 1;
                    }
                }
            }
        }
    }

    for e in vac.incident_edges(v) {
        if !vac.incident_faces(e).is_empty() {
            continue;
        }
        if let Some((s, t)) = vac.try_key_edge(e)?.boundary {
            if s == v {
                n += 1;
            }
            if t == v {
                n += 1;
            }
        }
    }
    Ok(n)
}

/// Deletes the inbetween cells animating a key cell. Ungluing changes the
/// key cell's identity, which the interpolation cannot follow.
fn delete_temporal_star(vac: &mut Vac, id: CellId) -> Result<()> {
    let star: Vec<CellId> = vac
        .temporal_star_before(id)
        .into_iter()
        .chain(vac.temporal_star_after(id))
        .collect();
    if !star.is_empty() {
        DeleteCells { cells: star }.compute(vac)?.apply(vac)?;
    }
    Ok(())
}

/// Rewrites the start endpoint of the edge behind a halfedge traversal.
fn set_halfedge_start(
    vac: &mut Vac,
    he: KeyHalfedge,
    old: KeyVertexKey,
    new: KeyVertexKey,
) -> Result<()> {
    let edge = vac
        .key_edges
        .get_mut(he.edge)
        .ok_or(Error::KeyEdgeNotFound(he.edge))?;
    let (s, t) = edge.boundary.ok_or(Error::ClosedEdgeInChain)?;
    let (s, t) = if he.side { (new, t) } else { (s, new) };
    edge.boundary = Some((s, t));
    vac.vertex_to_edges.entry(new).or_default().insert(he.edge);
    if s != old && t != old {
        if let Some(set) = vac.vertex_to_edges.get_mut(&old) {
            set.remove(&he.edge);
        }
    }
    Ok(())
}

/// Rewrites the end endpoint of the edge behind a halfedge traversal.
fn set_halfedge_end(
    vac: &mut Vac,
    he: KeyHalfedge,
    old: KeyVertexKey,
    new: KeyVertexKey,
) -> Result<()> {
    set_halfedge_start(vac, he.opposite(), old, new)
}

fn unglue_key_edge(vac: &mut Vac, e: KeyEdgeKey) -> Result<Vec<KeyEdgeKey>> {
    if edge_uses(vac, e) <= 1 {
        return Ok(Vec::new());
    }
    delete_temporal_star(vac, e.into())?;

    let data = vac.try_key_edge(e)?;
    let time = data.time;
    let boundary = data.boundary;
    let geometry = data.geometry.clone();

    let mut created = Vec::new();
    for f in vac.incident_faces(e) {
        let n_cycles = vac.try_key_face(f)?.cycles.len();
        for ci in 0..n_cycles {
            let kind = vac.try_key_face(f)?.cycles[ci].kind.clone();
            match kind {
                CycleKind::ClosedEdge(he) if he.edge == e => {
                    let dup = vac.new_key_closed_edge(time, geometry.clone());
                    if let Some(face) = vac.key_faces.get_mut(f) {
                        if let CycleKind::ClosedEdge(he) = &mut face.cycles[ci].kind {
                            he.edge = dup;
                        }
                        face.geometry_version += 1;
                    }
                    vac.edge_to_faces.entry(dup).or_default().insert(f);
                    created.push(dup);
                }
                CycleKind::Edges(hes) => {
                    for (j, he) in hes.iter().enumerate() {
                        if he.edge != e {
                            continue;
                        }
                        let (s, t) = boundary.ok_or(Error::ClosedEdgeInChain)?;
                        let dup = vac.new_key_open_edge(s, t, geometry.clone())?;
                        if let Some(face) = vac.key_faces.get_mut(f) {
                            if let CycleKind::Edges(hes) = &mut face.cycles[ci].kind {
                                hes[j].edge = dup;
                            }
                            face.geometry_version += 1;
                        }
                        vac.edge_to_faces.entry(dup).or_default().insert(f);
                        created.push(dup);
                    }
                }
                _ => {}
            }
        }
        if let Some(set) = vac.edge_to_faces.get_mut(&e) {
            set.remove(&f);
        }
    }
    vac.remove_key_edge(e)?;
    debug!(?e, copies = created.len(), "unglued key edge");
    Ok(created)
}

/// Splits a key edge used by several face-cycle traversals into one copy
/// per use, so each use gets its own edge. Inbetween cells built on the
/// edge are deleted first. An edge with at most one use is left alone.
pub struct UnglueEdge {
    pub edge: KeyEdgeKey,
}

impl UnglueEdge {
    pub fn compute(self, vac: &Vac) -> Result<StagedUnglueEdge> {
        vac.try_key_edge(self.edge)?;
        Ok(StagedUnglueEdge { edge: self.edge })
    }
}

pub struct StagedUnglueEdge {
    edge: KeyEdgeKey,
}

impl StagedUnglueEdge {
    /// Returns the created edges; empty when nothing had to change.
    pub fn apply(self, vac: &mut Vac) -> Result<Vec<KeyEdgeKey>> {
        unglue_key_edge(vac, self.edge)
    }
}

/// Splits a key vertex used by several cells into one copy per use:
/// every Steiner cycle, every face-cycle walk through it, and every
/// endpoint slot of a face-less edge gets its own vertex. Incident
/// shared edges are unglued first so each walk owns its edges.
pub struct UnglueVertex {
    pub vertex: KeyVertexKey,
}

impl UnglueVertex {
    pub fn compute(self, vac: &Vac) -> Result<StagedUnglueVertex> {
        vac.try_key_vertex(self.vertex)?;
        Ok(StagedUnglueVertex {
            vertex: self.vertex,
        })
    }
}

pub struct StagedUnglueVertex {
    vertex: KeyVertexKey,
}

impl StagedUnglueVertex {
    /// Returns the created vertices; empty when nothing had to change.
    pub fn apply(self, vac: &mut Vac) -> Result<Vec<KeyVertexKey>> {
        let v = self.vertex;
        if vertex_uses(vac, v)? <= 1 {
            return Ok(Vec::new());
        }
        delete_temporal_star(vac, v.into())?;
        for e in vac.incident_edges(v) {
            unglue_key_edge(vac, e)?;
        }

        let data = vac.try_key_vertex(v)?;
        let (time, position, size) = (data.time, data.position, data.size);
        let mut created = Vec::new();

        // Steiner cycles each get their own vertex
        for f in vac.incident_faces_of_vertex(v) {
            let n_cycles = vac.try_key_face(f)?.cycles.len();
            for ci in 0..n_cycles {
                if vac.try_key_face(f)?.cycles[ci].steiner_vertex() != Some(v) {
                    continue;
                }
                let dup = vac.new_key_vertex_with_size(time, position, size);
                if let Some(face) = vac.key_faces.get_mut(f) {
                    face.cycles[ci].replace_vertex(v, dup);
                }
                vac.vertex_to_faces.entry(dup).or_default().insert(f);
                created.push(dup);
            }
            if let Some(set) = vac.vertex_to_faces.get_mut(&v) {
                set.remove(&f);
            }
        }

        // Face-cycle walks: each traversal through the vertex gets a
        // fresh copy wired between the arriving and departing halfedges
        let faces: FxHashSet<KeyFaceKey> = vac
            .incident_edges(v)
            .into_iter()
            .flat_map(|e| vac.incident_faces(e))
            .collect();
        for f in faces {
            let n_cycles = vac.try_key_face(f)?.cycles.len();
            for ci in 0..n_cycles {
                let CycleKind::Edges(hes) = vac.try_key_face(f)?.cycles[ci].kind.clone() else {
                    continue;
                };
                let len = hes.len();
                let mut uses = Vec::new();
                for (j, he) in hes.iter().enumerate() {
                    if he.start_vertex(vac)? == Some(v) {
                        uses.push(j);
                    }
                }
                for j in uses {
                    let dup = vac.new_key_vertex_with_size(time, position, size);
                    set_halfedge_start(vac, hes[j], v, dup)?;
                    set_halfedge_end(vac, hes[(j + len - 1) % len], v, dup)?;
                    created.push(dup);
                }
            }
        }

        // Face-less edges: each endpoint slot gets its own copy
        for e in vac.incident_edges(v) {
            if !vac.incident_faces(e).is_empty() {
                continue;
            }
            if vac.try_key_edge(e)?.start_vertex() == Some(v) {
                let dup = vac.new_key_vertex_with_size(time, position, size);
                set_halfedge_start(vac, KeyHalfedge::new(e, true), v, dup)?;
                created.push(dup);
            }
            if vac.try_key_edge(e)?.end_vertex() == Some(v) {
                let dup = vac.new_key_vertex_with_size(time, position, size);
                set_halfedge_end(vac, KeyHalfedge::new(e, true), v, dup)?;
                created.push(dup);
            }
        }

        vac.remove_key_vertex(v)?;
        debug!(?v, copies = created.len(), "unglued key vertex");
        Ok(created)
    }
}

// --- Depth ---

/// Direction of a drawing-order move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMode {
    Raise,
    Lower,
    RaiseToTop,
    LowerToBottom,
}

/// Moves cells in the drawing order (see [`crate::depth`]).
pub struct ChangeDepth {
    pub cells: Vec<CellId>,
    pub mode: DepthMode,
}

impl ChangeDepth {
    pub fn compute(self, vac: &Vac) -> Result<StagedChangeDepth> {
        for id in &self.cells {
            if !vac.contains(*id) {
                return Err(not_found(*id));
            }
        }
        Ok(StagedChangeDepth {
            cells: self.cells,
            mode: self.mode,
        })
    }
}

pub struct StagedChangeDepth {
    cells: Vec<CellId>,
    mode: DepthMode,
}

impl StagedChangeDepth {
    pub fn apply(self, vac: &mut Vac) -> Result<()> {
        match self.mode {
            DepthMode::Raise => vac.raise(&self.cells),
            DepthMode::Lower => vac.lower(&self.cells),
            DepthMode::RaiseToTop => vac.raise_to_top(&self.cells),
            DepthMode::LowerToBottom => vac.lower_to_bottom(&self.cells),
        }
    }
}

// --- Deletion ---

/// Deletes the given cells together with the transitive closure of their
/// dependents, in descending dependency rank so every removal succeeds.
pub struct DeleteCells {
    pub cells: Vec<CellId>,
}

impl DeleteCells {
    pub fn compute(self, vac: &Vac) -> Result<StagedDeleteCells> {
        for id in &self.cells {
            if !vac.contains(*id) {
                return Err(not_found(*id));
            }
        }
        let mut ordered = vac.dependents_closure(&self.cells);
        ordered.sort_by_key(|id| deletion_rank(id.kind()));
        Ok(StagedDeleteCells { ordered })
    }
}

pub struct StagedDeleteCells {
    ordered: Vec<CellId>,
}

impl StagedDeleteCells {
    /// Number of cells scheduled for deletion.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn apply(self, vac: &mut Vac) -> Result<usize> {
        let n = self.ordered.len();
        for id in self.ordered {
            vac.remove_cell(id)?;
        }
        debug!(deleted = n, "deleted cell closure");
        Ok(n)
    }
}

/// Cells that depend on nothing are deleted first. Inbetween edges depend
/// on inbetween vertices, key faces on key edges, key edges on key
/// vertices.
fn deletion_rank(kind: CellKind) -> u8 {
    match kind {
        CellKind::InbetweenFace => 0,
        CellKind::InbetweenEdge => 1,
        CellKind::InbetweenVertex => 2,
        CellKind::KeyFace => 3,
        CellKind::KeyEdge => 4,
        CellKind::KeyVertex => 5,
    }
}

fn not_found(id: CellId) -> Error {
    match id {
        CellId::KeyVertex(k) => Error::KeyVertexNotFound(k),
        CellId::KeyEdge(k) => Error::KeyEdgeNotFound(k),
        CellId::KeyFace(k) => Error::KeyFaceNotFound(k),
        CellId::InbetweenVertex(k) => Error::InbetweenVertexNotFound(k),
        CellId::InbetweenEdge(k) => Error::InbetweenEdgeNotFound(k),
        CellId::InbetweenFace(k) => Error::InbetweenFaceNotFound(k),
    }
}

/// Removes every key vertex with an empty star: no incident edge or face
/// at its time and no inbetween cell on either side.
pub struct DeleteIsolatedVertices;

impl DeleteIsolatedVertices {
    pub fn compute(self, vac: &Vac) -> Result<StagedDeleteIsolatedVertices> {
        let isolated = vac
            .key_vertices
            .keys()
            .filter(|v| vac.dependents((*v).into()).is_empty())
            .collect();
        Ok(StagedDeleteIsolatedVertices { isolated })
    }
}

pub struct StagedDeleteIsolatedVertices {
    isolated: Vec<KeyVertexKey>,
}

impl StagedDeleteIsolatedVertices {
    pub fn apply(self, vac: &mut Vac) -> Result<Vec<KeyVertexKey>> {
        for v in &self.isolated {
            vac.remove_key_vertex(*v)?;
        }
        debug!(removed = self.isolated.len(), "deleted isolated vertices");
        Ok(self.isolated)
    }
}

/// Topological cleanup: collapses every open key edge shorter than
/// `threshold` by removing it and gluing its endpoint vertices. Only
/// edges nothing else depends on are touched: no incident face, no
/// inbetween cell, and distinct endpoints.
pub struct MergeShortEdges {
    pub threshold: f64,
}

impl MergeShortEdges {
    pub fn compute(self, vac: &Vac) -> Result<StagedMergeShortEdges> {
        let mut short = Vec::new();
        for (key, data) in &vac.key_edges {
            let Some((s, t)) = data.boundary else {
                continue;
            };
            if s == t
                || data.geometry.length() >= self.threshold
                || !vac.incident_faces(key).is_empty()
                || !vac.temporal_star_before(key.into()).is_empty()
                || !vac.temporal_star_after(key.into()).is_empty()
            {
                continue;
            }
            short.push(key);
        }
        Ok(StagedMergeShortEdges { short })
    }
}

pub struct StagedMergeShortEdges {
    short: Vec<KeyEdgeKey>,
}

impl StagedMergeShortEdges {
    /// Returns the vertices that survive each collapse.
    pub fn apply(self, vac: &mut Vac) -> Result<Vec<KeyVertexKey>> {
        let mut kept = Vec::new();
        for e in self.short {
            // Earlier collapses in the same pass may have rewired this
            // edge; read its live boundary
            let Some(data) = vac.key_edge(e) else {
                continue;
            };
            let Some((s, t)) = data.boundary else {
                continue;
            };
            vac.remove_key_edge(e)?;
            kept.push(glue_vertex_pair(vac, s, t)?);
        }
        debug!(collapsed = kept.len(), "merged short edges");
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line_geom(p0: Point2<f64>, p1: Point2<f64>) -> EdgeGeometry {
        EdgeGeometry::line(p0, p1, 1.0, 1.0)
    }

    /// Scenario: build two vertices and connect them, then fail to
    /// connect across time.
    #[test]
    fn make_key_open_edge_validates_time() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = MakeKeyVertex::new(t, Point2::new(0.0, 0.0))
            .compute(&vac)
            .unwrap()
            .apply(&mut vac);
        let v1 = MakeKeyVertex::new(t, Point2::new(10.0, 0.0))
            .compute(&vac)
            .unwrap()
            .apply(&mut vac);
        let v_later = MakeKeyVertex::new(Time::frame(5), Point2::new(20.0, 0.0))
            .compute(&vac)
            .unwrap()
            .apply(&mut vac);

        let e = MakeKeyOpenEdge {
            start: v0,
            end: v1,
            geometry: line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)),
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();
        assert_eq!(vac.key_edge(e).unwrap().start_vertex(), Some(v0));

        let cross_time = MakeKeyOpenEdge {
            start: v0,
            end: v_later,
            geometry: line_geom(Point2::new(0.0, 0.0), Point2::new(20.0, 0.0)),
        }
        .compute(&vac);
        assert!(matches!(cross_time, Err(Error::TimeMismatch { .. })));
    }

    #[test]
    fn split_edge_replaces_and_removes() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(30.0, 0.0));
        let e = vac
            .new_key_open_edge(v0, v1, line_geom(Point2::new(0.0, 0.0), Point2::new(30.0, 0.0)))
            .unwrap();

        let out = SplitEdge {
            edge: e,
            arclengths: vec![10.0, 20.0],
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();

        assert_eq!(out.vertices.len(), 2);
        assert_eq!(out.edges.len(), 3);
        assert!(vac.key_edge(e).is_none());
        assert_relative_eq!(
            vac.key_vertex(out.vertices[0]).unwrap().position.x,
            10.0,
            epsilon = 1e-9
        );
        // Chain is connected: each new edge spans 10 units
        for ne in &out.edges {
            assert_relative_eq!(
                vac.key_edge(*ne).unwrap().geometry.length(),
                10.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn split_positions_must_be_interior_and_sorted() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(30.0, 0.0));
        let e = vac
            .new_key_open_edge(v0, v1, line_geom(Point2::new(0.0, 0.0), Point2::new(30.0, 0.0)))
            .unwrap();

        for bad in [vec![0.0], vec![30.0], vec![35.0], vec![20.0, 10.0]] {
            assert!(matches!(
                SplitEdge {
                    edge: e,
                    arclengths: bad
                }
                .compute(&vac),
                Err(Error::InvalidSplitPosition(_))
            ));
        }
    }

    #[test]
    fn split_propagates_into_face_cycles() {
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
        let cycle = crate::cycle::ProperCycle::from_edges(&vac, &edges)
            .unwrap()
            .into_cycle();
        let f = vac.new_key_face(t, vec![cycle]).unwrap();

        SplitEdge {
            edge: edges[0],
            arclengths: vec![5.0],
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();

        let face = vac.key_face(f).unwrap();
        assert_eq!(face.cycles[0].edges().len(), 5);
        face.cycles[0].check(&vac, t).unwrap();
    }

    #[test]
    fn single_cut_of_closed_edge_keeps_face_valid() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let samples = (0..=32)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / 32.0;
                vac_geometry::EdgeSample::new(Point2::new(5.0 * a.cos(), 5.0 * a.sin()), 1.0)
            })
            .collect();
        let e = vac.new_key_closed_edge(t, EdgeGeometry::new(samples));
        let f = vac
            .new_key_face(t, vec![Cycle::closed_edge(KeyHalfedge::new(e, true))])
            .unwrap();

        // One cut leaves a single open edge looping back to its own start
        let out = SplitEdge {
            edge: e,
            arclengths: vec![7.5],
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();

        assert_eq!(out.vertices.len(), 1);
        assert_eq!(out.edges.len(), 1);
        let loop_edge = vac.key_edge(out.edges[0]).unwrap();
        assert!(!loop_edge.is_closed());
        assert_eq!(loop_edge.start_vertex(), loop_edge.end_vertex());

        // The face cycle switched to the chain form and still validates
        let face = vac.key_face(f).unwrap();
        assert!(matches!(face.cycles[0].kind, crate::cycle::CycleKind::Edges(_)));
        face.cycles[0].check(&vac, t).unwrap();

        // And the complex survives a snapshot round trip
        let snapshot = vac.to_snapshot();
        Vac::from_snapshot(&snapshot).unwrap();
    }

    #[test]
    fn glue_merges_vertices_at_the_midpoint() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let a = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let b2 = vac.new_key_vertex(t, Point2::new(12.0, 2.0));
        let c = vac.new_key_vertex(t, Point2::new(20.0, 0.0));
        let e0 = vac
            .new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();
        let e1 = vac
            .new_key_open_edge(b2, c, line_geom(Point2::new(12.0, 2.0), Point2::new(20.0, 0.0)))
            .unwrap();

        let kept = GlueVertices {
            target: b,
            source: b2,
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();

        assert_eq!(kept, b);
        assert!(vac.key_vertex(b2).is_none());
        let p = vac.key_vertex(b).unwrap().position;
        assert_relative_eq!(p.x, 11.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-9);
        // Both edges now meet at the glued vertex
        assert_eq!(vac.key_edge(e0).unwrap().end_vertex(), Some(b));
        assert_eq!(vac.key_edge(e1).unwrap().start_vertex(), Some(b));
        let mut incident = vac.incident_edges(b);
        incident.sort();
        let mut expected = vec![e0, e1];
        expected.sort();
        assert_eq!(incident, expected);
    }

    #[test]
    fn delete_cells_takes_the_whole_closure() {
        let mut vac = Vac::new();
        let t0 = Time::frame(0);
        let t1 = Time::frame(10);
        let a = vac.new_key_vertex(t0, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t0, Point2::new(10.0, 0.0));
        let e = vac
            .new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();
        let a2 = vac.new_key_vertex(t1, Point2::new(0.0, 0.0));
        let iv = vac.new_inbetween_vertex(a, a2).unwrap();

        let deleted = DeleteCells {
            cells: vec![a.into()],
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();

        assert_eq!(deleted, 3); // a, e, iv
        assert!(vac.key_vertex(a).is_none());
        assert!(vac.key_edge(e).is_none());
        assert!(vac.inbetween_vertex(iv).is_none());
        assert!(vac.key_vertex(b).is_some());
        assert!(vac.key_vertex(a2).is_some());
    }

    #[test]
    fn delete_isolated_vertices_spares_connected_ones() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let a = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let lonely = vac.new_key_vertex(t, Point2::new(50.0, 50.0));
        vac.new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();

        let removed = DeleteIsolatedVertices
            .compute(&vac)
            .unwrap()
            .apply(&mut vac)
            .unwrap();

        assert_eq!(removed, vec![lonely]);
        assert!(vac.key_vertex(lonely).is_none());
        assert!(vac.key_vertex(a).is_some());
    }

    #[test]
    fn glue_edges_averages_opposite_strokes() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        // Two parallel strokes drawn in opposite directions
        let a = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let c = vac.new_key_vertex(t, Point2::new(10.0, 2.0));
        let d = vac.new_key_vertex(t, Point2::new(0.0, 2.0));
        let e1 = vac
            .new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();
        let e2 = vac
            .new_key_open_edge(c, d, line_geom(Point2::new(10.0, 2.0), Point2::new(0.0, 2.0)))
            .unwrap();

        let e3 = GlueEdges {
            edge: e1,
            other: e2,
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();

        assert!(vac.key_edge(e1).is_none());
        assert!(vac.key_edge(e2).is_none());
        let glued = vac.key_edge(e3).unwrap();
        // e2 ran right to left, so its end glues onto e1's start
        assert_eq!(glued.start_vertex(), Some(a));
        assert_eq!(glued.end_vertex(), Some(b));
        assert!(vac.key_vertex(c).is_none());
        assert!(vac.key_vertex(d).is_none());
        // Endpoints land halfway between the two strokes
        let pa = vac.key_vertex(a).unwrap().position;
        let pb = vac.key_vertex(b).unwrap().position;
        assert_relative_eq!(pa.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(pb.y, 1.0, epsilon = 1e-9);
        assert_relative_eq!(glued.geometry.length(), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn glue_edges_rejects_incompatible_pairs() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let a = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let open = vac
            .new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();
        let samples = (0..=16)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / 16.0;
                EdgeSample::new(Point2::new(angle.cos(), angle.sin()), 1.0)
            })
            .collect();
        let closed = vac.new_key_closed_edge(t, EdgeGeometry::new(samples));

        assert!(matches!(
            GlueEdges {
                edge: open,
                other: open
            }
            .compute(&vac),
            Err(Error::TopologyMismatch(_))
        ));
        assert!(matches!(
            GlueEdges {
                edge: open,
                other: closed
            }
            .compute(&vac),
            Err(Error::TopologyMismatch(_))
        ));
    }

    #[test]
    fn unglue_edge_gives_each_face_its_own_copy() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let pa = Point2::new(0.0, 0.0);
        let pb = Point2::new(10.0, 0.0);
        let pc = Point2::new(5.0, 8.0);
        let pd = Point2::new(5.0, -8.0);
        let a = vac.new_key_vertex(t, pa);
        let b = vac.new_key_vertex(t, pb);
        let c = vac.new_key_vertex(t, pc);
        let d = vac.new_key_vertex(t, pd);
        let e = vac.new_key_open_edge(a, b, line_geom(pa, pb)).unwrap();
        let e1 = vac.new_key_open_edge(b, c, line_geom(pb, pc)).unwrap();
        let e2 = vac.new_key_open_edge(c, a, line_geom(pc, pa)).unwrap();
        let e3 = vac.new_key_open_edge(b, d, line_geom(pb, pd)).unwrap();
        let e4 = vac.new_key_open_edge(d, a, line_geom(pd, pa)).unwrap();
        let cyc1 = crate::cycle::ProperCycle::from_edges(&vac, &[e, e1, e2])
            .unwrap()
            .into_cycle();
        let cyc2 = crate::cycle::ProperCycle::from_edges(&vac, &[e, e3, e4])
            .unwrap()
            .into_cycle();
        let f1 = vac.new_key_face(t, vec![cyc1]).unwrap();
        let f2 = vac.new_key_face(t, vec![cyc2]).unwrap();

        let copies = UnglueEdge { edge: e }
            .compute(&vac)
            .unwrap()
            .apply(&mut vac)
            .unwrap();

        assert_eq!(copies.len(), 2);
        assert!(vac.key_edge(e).is_none());
        for copy in &copies {
            assert_eq!(vac.incident_faces(*copy).len(), 1);
        }
        // The two triangles no longer share any edge
        let edges1 = vac.key_face(f1).unwrap().cycles[0].edges();
        let edges2 = vac.key_face(f2).unwrap().cycles[0].edges();
        assert!(edges1.iter().all(|k| !edges2.contains(k)));
        vac.key_face(f1).unwrap().cycles[0].check(&vac, t).unwrap();
        vac.key_face(f2).unwrap().cycles[0].check(&vac, t).unwrap();
    }

    #[test]
    fn unglue_vertex_separates_joined_strokes() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let a = vac.new_key_vertex(t, Point2::new(-10.0, 0.0));
        let v = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let e0 = vac
            .new_key_open_edge(a, v, line_geom(Point2::new(-10.0, 0.0), Point2::new(0.0, 0.0)))
            .unwrap();
        let e1 = vac
            .new_key_open_edge(v, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();

        let copies = UnglueVertex { vertex: v }
            .compute(&vac)
            .unwrap()
            .apply(&mut vac)
            .unwrap();

        assert_eq!(copies.len(), 2);
        assert!(vac.key_vertex(v).is_none());
        // Each stroke now ends at its own vertex
        let end0 = vac.key_edge(e0).unwrap().end_vertex().unwrap();
        let start1 = vac.key_edge(e1).unwrap().start_vertex().unwrap();
        assert_ne!(end0, start1);
        assert!(copies.contains(&end0));
        assert!(copies.contains(&start1));
    }

    #[test]
    fn merge_short_edges_collapses_only_free_short_ones() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let a = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(2.0, 0.0));
        let c = vac.new_key_vertex(t, Point2::new(12.0, 0.0));
        let short = vac
            .new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)))
            .unwrap();
        let long = vac
            .new_key_open_edge(b, c, line_geom(Point2::new(2.0, 0.0), Point2::new(12.0, 0.0)))
            .unwrap();

        let kept = MergeShortEdges { threshold: 5.0 }
            .compute(&vac)
            .unwrap()
            .apply(&mut vac)
            .unwrap();

        assert_eq!(kept, vec![a]);
        assert!(vac.key_edge(short).is_none());
        assert!(vac.key_vertex(b).is_none());
        // The long edge survives and now starts at the merged vertex
        assert_eq!(vac.key_edge(long).unwrap().start_vertex(), Some(a));
        let p = vac.key_vertex(a).unwrap().position;
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn change_depth_moves_cells_through_the_order() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let v2 = vac.new_key_vertex(t, Point2::new(20.0, 0.0));

        ChangeDepth {
            cells: vec![v0.into()],
            mode: DepthMode::RaiseToTop,
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();
        assert_eq!(vac.depth_index(v0.into()), Some(2));

        ChangeDepth {
            cells: vec![v2.into()],
            mode: DepthMode::LowerToBottom,
        }
        .compute(&vac)
        .unwrap()
        .apply(&mut vac)
        .unwrap();
        assert_eq!(vac.depth_index(v2.into()), Some(0));
        assert_eq!(vac.depth_index(v1.into()), Some(1));
    }
}
