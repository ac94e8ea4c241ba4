// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON snapshots of a complex.
//!
//! Arena keys are session-local, so snapshots use sequential integer ids
//! per cell type instead. Saving walks each slot map in order and assigns
//! ids from 1; loading reconstructs cells in dependency-rank order (key
//! vertices, key edges, key faces, inbetween vertices, inbetween edges,
//! inbetween faces) so every reference resolves against cells built in an
//! earlier pass. An id that does not resolve fails the whole load with
//! [`Error::UnresolvedId`]; there are no placeholder cells.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use vac_geometry::{EdgeSample, Point2};

use crate::animated_vertex::AnimatedVertex;
use crate::cell::{EdgeGeometry, InbetweenEdgeBoundary};
use crate::cycle::{Cycle, CycleKind};
use crate::error::{Error, Result};
use crate::halfedge::KeyHalfedge;
use crate::keys::{
    CellId, CellKind, InbetweenEdgeKey, InbetweenFaceKey, InbetweenVertexKey, KeyEdgeKey,
    KeyFaceKey, KeyVertexKey,
};
use crate::path::Path;
use crate::vac::Vac;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacSnapshot {
    pub key_vertices: Vec<KeyVertexSnapshot>,
    pub key_edges: Vec<KeyEdgeSnapshot>,
    pub key_faces: Vec<KeyFaceSnapshot>,
    pub inbetween_vertices: Vec<InbetweenVertexSnapshot>,
    pub inbetween_edges: Vec<InbetweenEdgeSnapshot>,
    pub inbetween_faces: Vec<InbetweenFaceSnapshot>,
    /// Drawing order, bottom to top. Absent in older snapshots; the
    /// creation order of the passes above then stands in for it.
    #[serde(default)]
    pub depth: Vec<DepthSnapshot>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub kind: CellKind,
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyVertexSnapshot {
    pub id: u64,
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEdgeSnapshot {
    pub id: u64,
    pub time: f64,
    /// `None` for closed edges.
    pub boundary: Option<(u64, u64)>,
    /// `(x, y, width)` triplets.
    pub samples: Vec<(f64, f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFaceSnapshot {
    pub id: u64,
    pub time: f64,
    pub cycles: Vec<CycleSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InbetweenVertexSnapshot {
    pub id: u64,
    pub before: u64,
    pub after: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InbetweenEdgeSnapshot {
    pub id: u64,
    pub boundary: InbetweenEdgeBoundarySnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InbetweenEdgeBoundarySnapshot {
    Open {
        before_path: PathSnapshot,
        after_path: PathSnapshot,
        start_vertex: Vec<u64>,
        end_vertex: Vec<u64>,
    },
    Closed {
        before_cycle: CycleSnapshot,
        after_cycle: CycleSnapshot,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InbetweenFaceSnapshot {
    pub id: u64,
    pub before_cycles: Vec<CycleSnapshot>,
    pub after_cycles: Vec<CycleSnapshot>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HalfedgeSnapshot {
    pub edge: u64,
    pub side: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PathSnapshot {
    SingleVertex(u64),
    Edges(Vec<HalfedgeSnapshot>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub s0: f64,
    pub kind: CycleKindSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleKindSnapshot {
    SingleVertex(u64),
    ClosedEdge(HalfedgeSnapshot),
    Edges(Vec<HalfedgeSnapshot>),
}

// --- Saving ---

struct IdMaps {
    vertices: FxHashMap<KeyVertexKey, u64>,
    edges: FxHashMap<KeyEdgeKey, u64>,
    faces: FxHashMap<KeyFaceKey, u64>,
    ivertices: FxHashMap<InbetweenVertexKey, u64>,
    iedges: FxHashMap<InbetweenEdgeKey, u64>,
    ifaces: FxHashMap<InbetweenFaceKey, u64>,
}

impl IdMaps {
    fn cell(&self, id: CellId) -> Option<DepthSnapshot> {
        let (kind, id) = match id {
            CellId::KeyVertex(k) => (CellKind::KeyVertex, *self.vertices.get(&k)?),
            CellId::KeyEdge(k) => (CellKind::KeyEdge, *self.edges.get(&k)?),
            CellId::KeyFace(k) => (CellKind::KeyFace, *self.faces.get(&k)?),
            CellId::InbetweenVertex(k) => (CellKind::InbetweenVertex, *self.ivertices.get(&k)?),
            CellId::InbetweenEdge(k) => (CellKind::InbetweenEdge, *self.iedges.get(&k)?),
            CellId::InbetweenFace(k) => (CellKind::InbetweenFace, *self.ifaces.get(&k)?),
        };
        Some(DepthSnapshot { kind, id })
    }
}

fn halfedge_snapshot(ids: &IdMaps, he: &KeyHalfedge) -> HalfedgeSnapshot {
    HalfedgeSnapshot {
        edge: ids.edges.get(&he.edge).copied().unwrap_or(0),
        side: he.side,
    }
}

fn path_snapshot(ids: &IdMaps, path: &Path) -> PathSnapshot {
    match path {
        Path::SingleVertex(v) => {
            PathSnapshot::SingleVertex(ids.vertices.get(v).copied().unwrap_or(0))
        }
        Path::Edges(hes) => {
            PathSnapshot::Edges(hes.iter().map(|he| halfedge_snapshot(ids, he)).collect())
        }
    }
}

fn cycle_snapshot(ids: &IdMaps, cycle: &Cycle) -> CycleSnapshot {
    let kind = match &cycle.kind {
        CycleKind::SingleVertex(v) => {
            CycleKindSnapshot::SingleVertex(ids.vertices.get(v).copied().unwrap_or(0))
        }
        CycleKind::ClosedEdge(he) => CycleKindSnapshot::ClosedEdge(halfedge_snapshot(ids, he)),
        CycleKind::Edges(hes) => {
            CycleKindSnapshot::Edges(hes.iter().map(|he| halfedge_snapshot(ids, he)).collect())
        }
    };
    CycleSnapshot { s0: cycle.s0, kind }
}

impl Vac {
    pub fn to_snapshot(&self) -> VacSnapshot {
        let mut ids = IdMaps {
            vertices: FxHashMap::default(),
            edges: FxHashMap::default(),
            faces: FxHashMap::default(),
            ivertices: FxHashMap::default(),
            iedges: FxHashMap::default(),
            ifaces: FxHashMap::default(),
        };
        for (i, k) in self.key_vertices.keys().enumerate() {
            ids.vertices.insert(k, i as u64 + 1);
        }
        for (i, k) in self.key_edges.keys().enumerate() {
            ids.edges.insert(k, i as u64 + 1);
        }
        for (i, k) in self.key_faces.keys().enumerate() {
            ids.faces.insert(k, i as u64 + 1);
        }
        for (i, k) in self.inbetween_vertices.keys().enumerate() {
            ids.ivertices.insert(k, i as u64 + 1);
        }
        for (i, k) in self.inbetween_edges.keys().enumerate() {
            ids.iedges.insert(k, i as u64 + 1);
        }
        for (i, k) in self.inbetween_faces.keys().enumerate() {
            ids.ifaces.insert(k, i as u64 + 1);
        }

        let key_vertices = self
            .key_vertices
            .iter()
            .map(|(k, d)| KeyVertexSnapshot {
                id: ids.vertices[&k],
                time: d.time.value(),
                x: d.position.x,
                y: d.position.y,
                size: d.size,
            })
            .collect();

        let key_edges = self
            .key_edges
            .iter()
            .map(|(k, d)| KeyEdgeSnapshot {
                id: ids.edges[&k],
                time: d.time.value(),
                boundary: d
                    .boundary
                    .map(|(s, e)| (ids.vertices[&s], ids.vertices[&e])),
                samples: d
                    .geometry
                    .samples()
                    .iter()
                    .map(|s| (s.position.x, s.position.y, s.width))
                    .collect(),
            })
            .collect();

        let key_faces = self
            .key_faces
            .iter()
            .map(|(k, d)| KeyFaceSnapshot {
                id: ids.faces[&k],
                time: d.time.value(),
                cycles: d.cycles.iter().map(|c| cycle_snapshot(&ids, c)).collect(),
            })
            .collect();

        let inbetween_vertices = self
            .inbetween_vertices
            .iter()
            .map(|(k, d)| InbetweenVertexSnapshot {
                id: ids.ivertices[&k],
                before: ids.vertices[&d.before],
                after: ids.vertices[&d.after],
            })
            .collect();

        let inbetween_edges = self
            .inbetween_edges
            .iter()
            .map(|(k, d)| InbetweenEdgeSnapshot {
                id: ids.iedges[&k],
                boundary: match &d.boundary {
                    InbetweenEdgeBoundary::Open {
                        before_path,
                        after_path,
                        start_vertex,
                        end_vertex,
                    } => InbetweenEdgeBoundarySnapshot::Open {
                        before_path: path_snapshot(&ids, before_path),
                        after_path: path_snapshot(&ids, after_path),
                        start_vertex: start_vertex
                            .chain()
                            .iter()
                            .map(|iv| ids.ivertices.get(iv).copied().unwrap_or(0))
                            .collect(),
                        end_vertex: end_vertex
                            .chain()
                            .iter()
                            .map(|iv| ids.ivertices.get(iv).copied().unwrap_or(0))
                            .collect(),
                    },
                    InbetweenEdgeBoundary::Closed {
                        before_cycle,
                        after_cycle,
                    } => InbetweenEdgeBoundarySnapshot::Closed {
                        before_cycle: cycle_snapshot(&ids, before_cycle),
                        after_cycle: cycle_snapshot(&ids, after_cycle),
                    },
                },
            })
            .collect();

        let inbetween_faces = self
            .inbetween_faces
            .iter()
            .map(|(k, d)| InbetweenFaceSnapshot {
                id: ids.ifaces[&k],
                before_cycles: d
                    .before_cycles
                    .iter()
                    .map(|c| cycle_snapshot(&ids, c))
                    .collect(),
                after_cycles: d
                    .after_cycles
                    .iter()
                    .map(|c| cycle_snapshot(&ids, c))
                    .collect(),
            })
            .collect();

        let depth = self
            .depth_order()
            .iter()
            .filter_map(|id| ids.cell(*id))
            .collect();

        VacSnapshot {
            key_vertices,
            key_edges,
            key_faces,
            inbetween_vertices,
            inbetween_edges,
            inbetween_faces,
            depth,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_snapshot(snapshot: &VacSnapshot) -> Result<Vac> {
        let mut vac = Vac::new();
        let mut vertices: FxHashMap<u64, KeyVertexKey> = FxHashMap::default();
        let mut edges: FxHashMap<u64, KeyEdgeKey> = FxHashMap::default();
        let mut faces: FxHashMap<u64, KeyFaceKey> = FxHashMap::default();
        let mut ivertices: FxHashMap<u64, InbetweenVertexKey> = FxHashMap::default();
        let mut iedges: FxHashMap<u64, InbetweenEdgeKey> = FxHashMap::default();
        let mut ifaces: FxHashMap<u64, InbetweenFaceKey> = FxHashMap::default();

        let vertex = |map: &FxHashMap<u64, KeyVertexKey>, id: u64| {
            map.get(&id).copied().ok_or(Error::UnresolvedId {
                kind: "key vertex",
                id,
            })
        };
        let edge = |map: &FxHashMap<u64, KeyEdgeKey>, id: u64| {
            map.get(&id).copied().ok_or(Error::UnresolvedId {
                kind: "key edge",
                id,
            })
        };
        let ivertex = |map: &FxHashMap<u64, InbetweenVertexKey>, id: u64| {
            map.get(&id).copied().ok_or(Error::UnresolvedId {
                kind: "inbetween vertex",
                id,
            })
        };
        let halfedge = |map: &FxHashMap<u64, KeyEdgeKey>, he: &HalfedgeSnapshot| {
            Ok::<_, Error>(KeyHalfedge::new(edge(map, he.edge)?, he.side))
        };
        let cycle = |map_v: &FxHashMap<u64, KeyVertexKey>,
                     map_e: &FxHashMap<u64, KeyEdgeKey>,
                     c: &CycleSnapshot| {
            let kind = match &c.kind {
                CycleKindSnapshot::SingleVertex(id) => CycleKind::SingleVertex(vertex(map_v, *id)?),
                CycleKindSnapshot::ClosedEdge(he) => CycleKind::ClosedEdge(halfedge(map_e, he)?),
                CycleKindSnapshot::Edges(hes) => CycleKind::Edges(
                    hes.iter()
                        .map(|he| halfedge(map_e, he))
                        .collect::<Result<_>>()?,
                ),
            };
            Ok::<_, Error>(Cycle { kind, s0: c.s0 })
        };
        let path = |map_v: &FxHashMap<u64, KeyVertexKey>,
                    map_e: &FxHashMap<u64, KeyEdgeKey>,
                    p: &PathSnapshot| {
            Ok::<_, Error>(match p {
                PathSnapshot::SingleVertex(id) => Path::SingleVertex(vertex(map_v, *id)?),
                PathSnapshot::Edges(hes) => Path::Edges(
                    hes.iter()
                        .map(|he| halfedge(map_e, he))
                        .collect::<Result<_>>()?,
                ),
            })
        };

        for v in &snapshot.key_vertices {
            let key = vac.new_key_vertex_with_size(
                crate::time::Time::new(v.time),
                Point2::new(v.x, v.y),
                v.size,
            );
            vertices.insert(v.id, key);
        }

        for e in &snapshot.key_edges {
            let geometry = EdgeGeometry::new(
                e.samples
                    .iter()
                    .map(|&(x, y, w)| EdgeSample::new(Point2::new(x, y), w))
                    .collect(),
            );
            let key = match e.boundary {
                Some((s, t)) => vac.new_key_open_edge(
                    vertex(&vertices, s)?,
                    vertex(&vertices, t)?,
                    geometry,
                )?,
                None => vac.new_key_closed_edge(crate::time::Time::new(e.time), geometry),
            };
            edges.insert(e.id, key);
        }

        for f in &snapshot.key_faces {
            let cycles = f
                .cycles
                .iter()
                .map(|c| cycle(&vertices, &edges, c))
                .collect::<Result<Vec<_>>>()?;
            let key = vac.new_key_face(crate::time::Time::new(f.time), cycles)?;
            faces.insert(f.id, key);
        }

        for iv in &snapshot.inbetween_vertices {
            let key = vac.new_inbetween_vertex(
                vertex(&vertices, iv.before)?,
                vertex(&vertices, iv.after)?,
            )?;
            ivertices.insert(iv.id, key);
        }

        for ie in &snapshot.inbetween_edges {
            let key = match &ie.boundary {
                InbetweenEdgeBoundarySnapshot::Open {
                    before_path,
                    after_path,
                    start_vertex,
                    end_vertex,
                } => {
                    let start = start_vertex
                        .iter()
                        .map(|id| ivertex(&ivertices, *id))
                        .collect::<Result<Vec<_>>>()?;
                    let end = end_vertex
                        .iter()
                        .map(|id| ivertex(&ivertices, *id))
                        .collect::<Result<Vec<_>>>()?;
                    vac.new_inbetween_open_edge(
                        path(&vertices, &edges, before_path)?,
                        path(&vertices, &edges, after_path)?,
                        AnimatedVertex::new(start),
                        AnimatedVertex::new(end),
                    )?
                }
                InbetweenEdgeBoundarySnapshot::Closed {
                    before_cycle,
                    after_cycle,
                } => vac.new_inbetween_closed_edge(
                    cycle(&vertices, &edges, before_cycle)?,
                    cycle(&vertices, &edges, after_cycle)?,
                )?,
            };
            iedges.insert(ie.id, key);
        }

        for iface in &snapshot.inbetween_faces {
            let before = iface
                .before_cycles
                .iter()
                .map(|c| cycle(&vertices, &edges, c))
                .collect::<Result<Vec<_>>>()?;
            let after = iface
                .after_cycles
                .iter()
                .map(|c| cycle(&vertices, &edges, c))
                .collect::<Result<Vec<_>>>()?;
            let key = vac.new_inbetween_face(before, after)?;
            ifaces.insert(iface.id, key);
        }

        if !snapshot.depth.is_empty() {
            let mut order = Vec::with_capacity(snapshot.depth.len());
            for d in &snapshot.depth {
                let cell: CellId = match d.kind {
                    CellKind::KeyVertex => vertex(&vertices, d.id)?.into(),
                    CellKind::KeyEdge => edge(&edges, d.id)?.into(),
                    CellKind::KeyFace => faces
                        .get(&d.id)
                        .copied()
                        .ok_or(Error::UnresolvedId {
                            kind: "key face",
                            id: d.id,
                        })?
                        .into(),
                    CellKind::InbetweenVertex => ivertex(&ivertices, d.id)?.into(),
                    CellKind::InbetweenEdge => iedges
                        .get(&d.id)
                        .copied()
                        .ok_or(Error::UnresolvedId {
                            kind: "inbetween edge",
                            id: d.id,
                        })?
                        .into(),
                    CellKind::InbetweenFace => ifaces
                        .get(&d.id)
                        .copied()
                        .ok_or(Error::UnresolvedId {
                            kind: "inbetween face",
                            id: d.id,
                        })?
                        .into(),
                };
                order.push(cell);
            }
            vac.depth_order = order;
        }

        Ok(vac)
    }

    pub fn from_json(json: &str) -> Result<Vac> {
        let snapshot: VacSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Vac::from_snapshot(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::ProperCycle;
    use crate::time::Time;
    use approx::assert_relative_eq;

    fn line_geom(p0: Point2<f64>, p1: Point2<f64>) -> EdgeGeometry {
        EdgeGeometry::line(p0, p1, 1.5, 1.0)
    }

    /// Scenario: a filled square at frame 0 plus a vertex animated to
    /// frame 10, saved and reloaded.
    fn build_scene() -> Vac {
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
        vac.new_key_face(t, vec![cycle]).unwrap();

        let v_later = vac.new_key_vertex(Time::frame(10), Point2::new(5.0, 5.0));
        vac.new_inbetween_vertex(v[0], v_later).unwrap();
        vac
    }

    #[test]
    fn json_round_trip_preserves_the_complex() {
        let vac = build_scene();
        let json = vac.to_json().unwrap();
        let restored = Vac::from_json(&json).unwrap();

        assert_eq!(restored.num_key_vertices(), vac.num_key_vertices());
        assert_eq!(restored.num_key_edges(), vac.num_key_edges());
        assert_eq!(restored.num_key_faces(), vac.num_key_faces());
        assert_eq!(
            restored.num_inbetween_vertices(),
            vac.num_inbetween_vertices()
        );

        // Geometry survives
        let total: f64 = restored
            .key_edges
            .values()
            .map(|e| e.geometry.length())
            .sum();
        assert_relative_eq!(total, 40.0, epsilon = 1e-9);

        // Rebuilt face cycles are well-formed
        for face in restored.key_faces.values() {
            for cycle in &face.cycles {
                cycle.check(&restored, face.time).unwrap();
            }
        }
    }

    #[test]
    fn depth_order_survives_the_round_trip() {
        let mut vac = build_scene();
        let raised = vac.key_vertices.keys().next().unwrap();
        vac.raise_to_top(&[raised.into()]).unwrap();
        let p = vac.key_vertex(raised).unwrap().position;

        let restored = Vac::from_json(&vac.to_json().unwrap()).unwrap();
        let order = restored.depth_order();
        assert_eq!(order.len(), vac.depth_order().len());
        let CellId::KeyVertex(top) = *order.last().unwrap() else {
            panic!("expected a key vertex on top");
        };
        let q = restored.key_vertex(top).unwrap().position;
        assert_relative_eq!(q.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(q.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn unresolved_reference_fails_the_load() {
        let vac = build_scene();
        let mut snapshot = vac.to_snapshot();
        snapshot.key_edges[0].boundary = Some((999, 1));

        assert!(matches!(
            Vac::from_snapshot(&snapshot),
            Err(Error::UnresolvedId {
                kind: "key vertex",
                id: 999
            })
        ));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            Vac::from_json("{ not json"),
            Err(Error::Serialization(_))
        ));
    }
}
