// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Star queries: who references a cell.
//!
//! The *spatial star* of a key cell holds the key cells at the same time
//! whose boundary uses it (vertex → edges and faces, edge → faces). The
//! *temporal star* holds the inbetween cells whose before/after boundary
//! is the key cell: `temporal_star_before` answers "what ends here",
//! `temporal_star_after` "what starts here". Both are read from the
//! indices the arena maintains on every insertion and removal.

use rustc_hash::FxHashSet;

use crate::cell::InbetweenEdgeBoundary;
use crate::cycle::Cycle;
use crate::keys::{CellId, KeyEdgeKey, KeyFaceKey, KeyVertexKey};
use crate::path::Path;
use crate::vac::Vac;

impl Vac {
    /// Key edges incident to a vertex at its own time.
    pub fn incident_edges(&self, v: KeyVertexKey) -> Vec<KeyEdgeKey> {
        self.vertex_to_edges
            .get(&v)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Key faces whose boundary references a vertex directly, through a
    /// Steiner cycle. Faces reached through incident edges are found via
    /// [`Vac::incident_faces`] on those edges.
    pub fn incident_faces_of_vertex(&self, v: KeyVertexKey) -> Vec<KeyFaceKey> {
        self.vertex_to_faces
            .get(&v)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Key faces whose boundary uses an edge.
    pub fn incident_faces(&self, e: KeyEdgeKey) -> Vec<KeyFaceKey> {
        self.edge_to_faces
            .get(&e)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Inbetween cells that end at this key cell (occupy time before it).
    pub fn temporal_star_before(&self, id: CellId) -> Vec<CellId> {
        match id {
            CellId::KeyVertex(v) => self
                .vertex_before_star
                .get(&v)
                .map(|s| s.iter().copied().collect())
                .unwrap_or_default(),
            CellId::KeyEdge(e) => self
                .edge_before_star
                .get(&e)
                .map(|s| s.iter().copied().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Inbetween cells that start at this key cell (occupy time after it).
    pub fn temporal_star_after(&self, id: CellId) -> Vec<CellId> {
        match id {
            CellId::KeyVertex(v) => self
                .vertex_after_star
                .get(&v)
                .map(|s| s.iter().copied().collect())
                .unwrap_or_default(),
            CellId::KeyEdge(e) => self
                .edge_after_star
                .get(&e)
                .map(|s| s.iter().copied().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// All cells whose boundary references the given cell. A cell cannot
    /// be removed while this is non-empty.
    pub fn dependents(&self, id: CellId) -> Vec<CellId> {
        let mut out: FxHashSet<CellId> = FxHashSet::default();
        match id {
            CellId::KeyVertex(v) => {
                out.extend(self.incident_edges(v).into_iter().map(CellId::KeyEdge));
                out.extend(
                    self.incident_faces_of_vertex(v)
                        .into_iter()
                        .map(CellId::KeyFace),
                );
                out.extend(self.temporal_star_before(id));
                out.extend(self.temporal_star_after(id));
            }
            CellId::KeyEdge(e) => {
                out.extend(self.incident_faces(e).into_iter().map(CellId::KeyFace));
                out.extend(self.temporal_star_before(id));
                out.extend(self.temporal_star_after(id));
            }
            CellId::InbetweenVertex(iv) => {
                if let Some(es) = self.ivertex_to_iedges.get(&iv) {
                    out.extend(es.iter().copied().map(CellId::InbetweenEdge));
                }
            }
            CellId::KeyFace(_) | CellId::InbetweenEdge(_) | CellId::InbetweenFace(_) => {}
        }
        out.into_iter().collect()
    }

    /// Transitive closure of [`Vac::dependents`] starting from `seeds`,
    /// including the seeds themselves. This is the set a deletion has to
    /// take down as one unit.
    pub fn dependents_closure(&self, seeds: &[CellId]) -> Vec<CellId> {
        let mut closure: FxHashSet<CellId> = seeds.iter().copied().collect();
        let mut frontier: Vec<CellId> = seeds.to_vec();
        while let Some(id) = frontier.pop() {
            for dep in self.dependents(id) {
                if closure.insert(dep) {
                    frontier.push(dep);
                }
            }
        }
        closure.into_iter().collect()
    }

    /// Cells a cell's own boundary references, the downward counterpart
    /// of [`Vac::dependents`]. The depth order uses this to keep a cell
    /// below the cells it is drawn under.
    pub fn boundary_cells(&self, id: CellId) -> Vec<CellId> {
        let mut out: FxHashSet<CellId> = FxHashSet::default();
        match id {
            CellId::KeyVertex(_) => {}
            CellId::KeyEdge(e) => {
                if let Some(data) = self.key_edges.get(e) {
                    if let Some((s, t)) = data.boundary {
                        out.insert(s.into());
                        out.insert(t.into());
                    }
                }
            }
            CellId::KeyFace(f) => {
                if let Some(data) = self.key_faces.get(f) {
                    for cycle in &data.cycles {
                        self.collect_cycle_cells(cycle, &mut out);
                    }
                }
            }
            CellId::InbetweenVertex(iv) => {
                if let Some(data) = self.inbetween_vertices.get(iv) {
                    out.insert(data.before.into());
                    out.insert(data.after.into());
                }
            }
            CellId::InbetweenEdge(ie) => {
                if let Some(data) = self.inbetween_edges.get(ie) {
                    match &data.boundary {
                        InbetweenEdgeBoundary::Open {
                            before_path,
                            after_path,
                            start_vertex,
                            end_vertex,
                        } => {
                            self.collect_path_cells(before_path, &mut out);
                            self.collect_path_cells(after_path, &mut out);
                            for av in [start_vertex, end_vertex] {
                                for iv in av.chain() {
                                    out.insert((*iv).into());
                                }
                            }
                        }
                        InbetweenEdgeBoundary::Closed {
                            before_cycle,
                            after_cycle,
                        } => {
                            self.collect_cycle_cells(before_cycle, &mut out);
                            self.collect_cycle_cells(after_cycle, &mut out);
                        }
                    }
                }
            }
            CellId::InbetweenFace(iface) => {
                if let Some(data) = self.inbetween_faces.get(iface) {
                    for cycle in data.before_cycles.iter().chain(&data.after_cycles) {
                        self.collect_cycle_cells(cycle, &mut out);
                    }
                }
            }
        }
        out.remove(&id);
        out.into_iter().collect()
    }

    /// Cells whose declared boundary references the given cell: the exact
    /// dual of [`Vac::boundary_cells`]. Unlike [`Vac::dependents`], this
    /// sees a face from the endpoint vertices of its cycle edges.
    pub fn star_cells(&self, id: CellId) -> Vec<CellId> {
        self.cells()
            .into_iter()
            .filter(|c| self.boundary_cells(*c).contains(&id))
            .collect()
    }

    /// Transitive closure of [`Vac::boundary_cells`] starting from
    /// `seeds`, including the seeds themselves.
    pub fn boundary_closure(&self, seeds: &[CellId]) -> Vec<CellId> {
        let mut closure: FxHashSet<CellId> = seeds.iter().copied().collect();
        let mut frontier: Vec<CellId> = seeds.to_vec();
        while let Some(id) = frontier.pop() {
            for b in self.boundary_cells(id) {
                if closure.insert(b) {
                    frontier.push(b);
                }
            }
        }
        closure.into_iter().collect()
    }

    fn collect_cycle_cells(&self, cycle: &Cycle, out: &mut FxHashSet<CellId>) {
        if let Some(v) = cycle.steiner_vertex() {
            out.insert(v.into());
        }
        for e in cycle.edges() {
            out.insert(e.into());
            if let Some(data) = self.key_edges.get(e) {
                if let Some((s, t)) = data.boundary {
                    out.insert(s.into());
                    out.insert(t.into());
                }
            }
        }
    }

    fn collect_path_cells(&self, path: &Path, out: &mut FxHashSet<CellId>) {
        if let Some(v) = path.single_vertex() {
            out.insert(v.into());
        }
        for e in path.edges() {
            out.insert(e.into());
            if let Some(data) = self.key_edges.get(e) {
                if let Some((s, t)) = data.boundary {
                    out.insert(s.into());
                    out.insert(t.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::EdgeGeometry;
    use crate::time::Time;
    use vac_geometry::Point2;

    #[test]
    fn closure_pulls_in_indirect_dependents() {
        let mut vac = Vac::new();
        let t0 = Time::frame(0);
        let t1 = Time::frame(10);
        let a = vac.new_key_vertex(t0, Point2::new(0.0, 0.0));
        let b = vac.new_key_vertex(t0, Point2::new(10.0, 0.0));
        let e = vac
            .new_key_open_edge(
                a,
                b,
                EdgeGeometry::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 1.0, 1.0),
            )
            .unwrap();
        let a2 = vac.new_key_vertex(t1, Point2::new(0.0, 0.0));
        let iv = vac.new_inbetween_vertex(a, a2).unwrap();

        // Deleting `a` must take the edge and the inbetween vertex with it
        let closure = vac.dependents_closure(&[a.into()]);
        assert!(closure.contains(&a.into()));
        assert!(closure.contains(&e.into()));
        assert!(closure.contains(&iv.into()));
        assert!(!closure.contains(&a2.into()));
        assert!(!closure.contains(&b.into()));
    }
}
