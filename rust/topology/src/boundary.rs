// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary substitution across the whole star of a cell.
//!
//! Topological operators that replace a cell (glue, split) must rewrite
//! every dependent's boundary before the obsolete cell can be removed.
//! These two routines do the rewriting: they walk the spatial and temporal
//! star of the old cell, substitute the replacement in each dependent's
//! boundary, and keep the star indices synchronized. After either returns,
//! the old cell has an empty star and removal succeeds.

use crate::cell::InbetweenEdgeBoundary;
use crate::error::{Error, Result};
use crate::halfedge::KeyHalfedge;
use crate::keys::{CellId, KeyEdgeKey, KeyVertexKey};
use crate::vac::Vac;

/// Rewrites every reference to the key vertex `old` into `new`. Both must
/// exist at the same time. Edge geometry is untouched; callers that care
/// move the vertices into place first.
pub fn update_boundary_vertex(vac: &mut Vac, old: KeyVertexKey, new: KeyVertexKey) -> Result<()> {
    if old == new {
        return Ok(());
    }
    let t_old = vac.try_key_vertex(old)?.time;
    let t_new = vac.try_key_vertex(new)?.time;
    if t_old != t_new {
        return Err(Error::TimeMismatch {
            expected: t_old,
            found: t_new,
        });
    }

    // Key edges whose endpoints are the old vertex
    let edges: Vec<KeyEdgeKey> = vac.incident_edges(old);
    for e in &edges {
        if let Some(edge) = vac.key_edges.get_mut(*e) {
            if let Some((s, t)) = edge.boundary {
                let s = if s == old { new } else { s };
                let t = if t == old { new } else { t };
                edge.boundary = Some((s, t));
            }
        }
        if let Some(set) = vac.vertex_to_edges.get_mut(&old) {
            set.remove(e);
        }
        vac.vertex_to_edges.entry(new).or_default().insert(*e);
    }

    // Key faces with a Steiner cycle on the old vertex
    let faces: Vec<_> = vac
        .vertex_to_faces
        .get(&old)
        .map(|s| s.iter().copied().collect())
        .unwrap_or_default();
    for f in faces {
        if let Some(face) = vac.key_faces.get_mut(f) {
            for cycle in &mut face.cycles {
                cycle.replace_vertex(old, new);
            }
        }
        if let Some(set) = vac.vertex_to_faces.get_mut(&old) {
            set.remove(&f);
        }
        vac.vertex_to_faces.entry(new).or_default().insert(f);
    }

    // Inbetween cells bounded by the old vertex, on either side
    let star: Vec<CellId> = vac
        .temporal_star_before(old.into())
        .into_iter()
        .chain(vac.temporal_star_after(old.into()))
        .collect();
    for id in star {
        match id {
            CellId::InbetweenVertex(iv) => {
                // Star sets are keyed by vertex, so membership moves too
                if let Some(set) = vac.vertex_after_star.get_mut(&old) {
                    set.remove(&id);
                }
                if let Some(set) = vac.vertex_before_star.get_mut(&old) {
                    set.remove(&id);
                }
                if let Some(data) = vac.inbetween_vertices.get_mut(iv) {
                    if data.before == old {
                        data.before = new;
                    }
                    if data.after == old {
                        data.after = new;
                    }
                    let (before, after) = (data.before, data.after);
                    if before == new {
                        vac.vertex_after_star.entry(new).or_default().insert(id);
                    }
                    if after == new {
                        vac.vertex_before_star.entry(new).or_default().insert(id);
                    }
                }
            }
            CellId::InbetweenEdge(ie) => {
                vac.deregister_inbetween_edge(ie);
                if let Some(data) = vac.inbetween_edges.get_mut(ie) {
                    match &mut data.boundary {
                        InbetweenEdgeBoundary::Open {
                            before_path,
                            after_path,
                            ..
                        } => {
                            before_path.replace_vertex(old, new);
                            after_path.replace_vertex(old, new);
                        }
                        InbetweenEdgeBoundary::Closed {
                            before_cycle,
                            after_cycle,
                        } => {
                            before_cycle.replace_vertex(old, new);
                            after_cycle.replace_vertex(old, new);
                        }
                    }
                }
                vac.register_inbetween_edge(ie);
            }
            CellId::InbetweenFace(iface) => {
                vac.deregister_inbetween_face(iface);
                if let Some(data) = vac.inbetween_faces.get_mut(iface) {
                    for cycle in data
                        .before_cycles
                        .iter_mut()
                        .chain(data.after_cycles.iter_mut())
                    {
                        cycle.replace_vertex(old, new);
                    }
                }
                vac.register_inbetween_face(iface);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Rewrites every traversal of the key edge `old` into the `replacement`
/// chain. The chain must connect, live at the old edge's time, and have
/// the same endpoints as the old edge (or close on itself when the old
/// edge is closed). Dependent faces get their triangulation invalidated.
pub fn update_boundary_edge(
    vac: &mut Vac,
    old: KeyEdgeKey,
    replacement: &[KeyHalfedge],
) -> Result<()> {
    let old_data = vac.try_key_edge(old)?;
    let time = old_data.time;
    let old_boundary = old_data.boundary;
    if replacement.is_empty() {
        return Err(Error::EmptyEdgeSet);
    }
    if replacement.len() == 1 && replacement[0].edge == old {
        return Ok(());
    }

    // The replacement must chain and stand in for the old traversal
    let closed_replacement =
        replacement.len() == 1 && replacement[0].start_vertex(vac)?.is_none();
    let mut prev_end: Option<KeyVertexKey> = None;
    for he in replacement {
        let t = he.time(vac)?;
        if t != time {
            return Err(Error::TimeMismatch {
                expected: time,
                found: t,
            });
        }
        if let Some(start) = he.start_vertex(vac)? {
            if let Some(prev) = prev_end {
                if prev != start {
                    return Err(Error::DisconnectedChain { consumed: 0 });
                }
            }
            prev_end = he.end_vertex(vac)?;
        } else if replacement.len() > 1 {
            return Err(Error::ClosedEdgeInChain);
        }
    }
    match old_boundary {
        Some((s, e)) => {
            let first = replacement[0].start_vertex(vac)?;
            let last = replacement[replacement.len() - 1].end_vertex(vac)?;
            if first != Some(s) || last != Some(e) {
                return Err(Error::EndpointMismatch("replacement chain"));
            }
        }
        None => {
            // Closed edge: the chain must loop (or be a single closed edge)
            let first = replacement[0].start_vertex(vac)?;
            let last = replacement[replacement.len() - 1].end_vertex(vac)?;
            if first != last {
                return Err(Error::NotClosed);
            }
        }
    }

    // Key faces using the old edge
    let faces: Vec<_> = vac.incident_faces(old);
    for f in faces {
        if let Some(face) = vac.key_faces.get_mut(f) {
            for cycle in &mut face.cycles {
                cycle.replace_edge(old, replacement, closed_replacement);
            }
            face.geometry_version += 1;
        }
        if let Some(set) = vac.edge_to_faces.get_mut(&old) {
            set.remove(&f);
        }
        for he in replacement {
            vac.edge_to_faces.entry(he.edge).or_default().insert(f);
        }
    }

    // Inbetween cells bounded by the old edge, on either side
    let star: Vec<CellId> = vac
        .temporal_star_before(old.into())
        .into_iter()
        .chain(vac.temporal_star_after(old.into()))
        .collect();
    for id in star {
        match id {
            CellId::InbetweenEdge(ie) => {
                vac.deregister_inbetween_edge(ie);
                if let Some(data) = vac.inbetween_edges.get_mut(ie) {
                    match &mut data.boundary {
                        InbetweenEdgeBoundary::Open {
                            before_path,
                            after_path,
                            ..
                        } => {
                            before_path.replace_edge(old, replacement);
                            after_path.replace_edge(old, replacement);
                        }
                        InbetweenEdgeBoundary::Closed {
                            before_cycle,
                            after_cycle,
                        } => {
                            before_cycle.replace_edge(old, replacement, closed_replacement);
                            after_cycle.replace_edge(old, replacement, closed_replacement);
                        }
                    }
                }
                vac.register_inbetween_edge(ie);
            }
            CellId::InbetweenFace(iface) => {
                vac.deregister_inbetween_face(iface);
                if let Some(data) = vac.inbetween_faces.get_mut(iface) {
                    for cycle in data
                        .before_cycles
                        .iter_mut()
                        .chain(data.after_cycles.iter_mut())
                    {
                        cycle.replace_edge(old, replacement, closed_replacement);
                    }
                }
                vac.register_inbetween_face(iface);
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::EdgeGeometry;
    use crate::cycle::ProperCycle;
    use crate::time::Time;
    use vac_geometry::Point2;

    fn line_geom(p0: Point2<f64>, p1: Point2<f64>) -> EdgeGeometry {
        EdgeGeometry::line(p0, p1, 1.0, 1.0)
    }

    #[test]
    fn vertex_substitution_rewrites_edges_and_stars() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let a = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let b2 = vac.new_key_vertex(t, Point2::new(10.0, 1.0));
        let e = vac
            .new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();

        update_boundary_vertex(&mut vac, b, b2).unwrap();

        assert_eq!(vac.key_edge(e).unwrap().end_vertex(), Some(b2));
        assert!(vac.incident_edges(b).is_empty());
        assert_eq!(vac.incident_edges(b2), vec![e]);
        // The old vertex is now free to delete
        vac.remove_key_vertex(b).unwrap();
    }

    #[test]
    fn vertex_substitution_requires_matching_time() {
        let mut vac = Vac::new();
        let a = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(Time::frame(1), Point2::new(0.0, 0.0));
        assert!(matches!(
            update_boundary_vertex(&mut vac, a, b),
            Err(Error::TimeMismatch { .. })
        ));
    }

    #[test]
    fn vertex_substitution_follows_inbetween_vertices() {
        let mut vac = Vac::new();
        let a = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(Time::frame(10), Point2::new(5.0, 0.0));
        let b2 = vac.new_key_vertex(Time::frame(10), Point2::new(6.0, 0.0));
        let iv = vac.new_inbetween_vertex(a, b).unwrap();

        update_boundary_vertex(&mut vac, b, b2).unwrap();

        assert_eq!(vac.inbetween_vertex(iv).unwrap().after, b2);
        assert!(vac.temporal_star_before(b.into()).is_empty());
        assert_eq!(vac.temporal_star_before(b2.into()), vec![CellId::from(iv)]);
        vac.remove_key_vertex(b).unwrap();
    }

    #[test]
    fn edge_substitution_rewrites_face_cycles() {
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

        // Replace the bottom edge with a two-edge detour through a midpoint
        let m = vac.new_key_vertex(t, Point2::new(5.0, -1.0));
        let e_left = vac
            .new_key_open_edge(v[0], m, line_geom(corners[0], Point2::new(5.0, -1.0)))
            .unwrap();
        let e_right = vac
            .new_key_open_edge(m, v[1], line_geom(Point2::new(5.0, -1.0), corners[1]))
            .unwrap();
        let replacement = [KeyHalfedge::new(e_left, true), KeyHalfedge::new(e_right, true)];

        update_boundary_edge(&mut vac, edges[0], &replacement).unwrap();

        let face = vac.key_face(f).unwrap();
        assert_eq!(face.cycles[0].edges().len(), 5);
        assert!(!face.cycles[0].edges().contains(&edges[0]));
        face.cycles[0].check(&vac, t).unwrap();
        // Old edge has an empty star now
        vac.remove_key_edge(edges[0]).unwrap();
    }

    #[test]
    fn edge_substitution_rejects_wrong_endpoints() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let a = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let c = vac.new_key_vertex(t, Point2::new(20.0, 0.0));
        let e = vac
            .new_key_open_edge(a, b, line_geom(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)))
            .unwrap();
        let other = vac
            .new_key_open_edge(b, c, line_geom(Point2::new(10.0, 0.0), Point2::new(20.0, 0.0)))
            .unwrap();

        assert!(matches!(
            update_boundary_edge(&mut vac, e, &[KeyHalfedge::new(other, true)]),
            Err(Error::EndpointMismatch(_))
        ));
    }
}
