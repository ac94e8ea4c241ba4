// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for the vector animation complex.
//!
//! The [`Vac`] is the central owner of all cells. Every cell lives inside a
//! slot map with a stable, generational key, and star indices track which
//! cells reference which:
//!
//! - **spatial star**: vertex → incident key edges/faces, edge → incident
//!   key faces, all at the cell's own time;
//! - **temporal star**: key cell → inbetween cells whose before or after
//!   boundary is that key cell. `temporal_star_before(c)` holds the
//!   inbetween cells that *end* at `c` (they occupy time before it),
//!   `temporal_star_after(c)` those that *start* at it.
//!
//! The stars are caches over the cells' declared boundaries, maintained by
//! every insertion and removal. Removal refuses while dependents remain;
//! operators that delete first rewrite all dependents through
//! [`crate::boundary`] and only then remove the obsolete cell.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use tracing::debug;
use vac_geometry::Point2;

use crate::animated_vertex::AnimatedVertex;
use crate::cell::{
    EdgeGeometry, InbetweenEdgeBoundary, InbetweenEdgeData, InbetweenFaceData, InbetweenVertexData,
    KeyEdgeData, KeyFaceData, KeyVertexData, TriangleCache,
};
use crate::cycle::Cycle;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::path::Path;
use crate::time::Time;

/// Default display size for a vertex created without an explicit size.
pub const DEFAULT_VERTEX_SIZE: f64 = 3.0;

/// The vector animation complex: exclusive owner of all cells and their
/// star indices.
///
/// # Example
///
/// ```
/// use vac_topology::{Time, Vac};
/// use vac_geometry::Point2;
///
/// let mut vac = Vac::new();
/// let v = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
/// assert_eq!(vac.num_cells(), 1);
/// assert!(vac.key_vertex(v).is_some());
/// ```
#[derive(Debug, Default)]
pub struct Vac {
    // Cell storage
    pub(crate) key_vertices: SlotMap<KeyVertexKey, KeyVertexData>,
    pub(crate) key_edges: SlotMap<KeyEdgeKey, KeyEdgeData>,
    pub(crate) key_faces: SlotMap<KeyFaceKey, KeyFaceData>,
    pub(crate) inbetween_vertices: SlotMap<InbetweenVertexKey, InbetweenVertexData>,
    pub(crate) inbetween_edges: SlotMap<InbetweenEdgeKey, InbetweenEdgeData>,
    pub(crate) inbetween_faces: SlotMap<InbetweenFaceKey, InbetweenFaceData>,

    // Spatial star: child → key cells using it at its own time
    pub(crate) vertex_to_edges: FxHashMap<KeyVertexKey, FxHashSet<KeyEdgeKey>>,
    pub(crate) vertex_to_faces: FxHashMap<KeyVertexKey, FxHashSet<KeyFaceKey>>,
    pub(crate) edge_to_faces: FxHashMap<KeyEdgeKey, FxHashSet<KeyFaceKey>>,

    // Temporal star: key cell → inbetween cells bounded by it
    pub(crate) vertex_before_star: FxHashMap<KeyVertexKey, FxHashSet<CellId>>,
    pub(crate) vertex_after_star: FxHashMap<KeyVertexKey, FxHashSet<CellId>>,
    pub(crate) edge_before_star: FxHashMap<KeyEdgeKey, FxHashSet<CellId>>,
    pub(crate) edge_after_star: FxHashMap<KeyEdgeKey, FxHashSet<CellId>>,

    // Inbetween vertex → inbetween edges whose animated endpoints use it
    pub(crate) ivertex_to_iedges: FxHashMap<InbetweenVertexKey, FxHashSet<InbetweenEdgeKey>>,

    // Drawing order, bottom to top (see crate::depth)
    pub(crate) depth_order: Vec<CellId>,
}

impl Vac {
    /// Creates a new, empty complex.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Counts and iteration ---

    pub fn num_key_vertices(&self) -> usize {
        self.key_vertices.len()
    }

    pub fn num_key_edges(&self) -> usize {
        self.key_edges.len()
    }

    pub fn num_key_faces(&self) -> usize {
        self.key_faces.len()
    }

    pub fn num_inbetween_vertices(&self) -> usize {
        self.inbetween_vertices.len()
    }

    pub fn num_inbetween_edges(&self) -> usize {
        self.inbetween_edges.len()
    }

    pub fn num_inbetween_faces(&self) -> usize {
        self.inbetween_faces.len()
    }

    /// Total number of cells of all kinds.
    pub fn num_cells(&self) -> usize {
        self.key_vertices.len()
            + self.key_edges.len()
            + self.key_faces.len()
            + self.inbetween_vertices.len()
            + self.inbetween_edges.len()
            + self.inbetween_faces.len()
    }

    /// All cell ids, unordered.
    pub fn cells(&self) -> Vec<CellId> {
        let mut out = Vec::with_capacity(self.num_cells());
        out.extend(self.key_vertices.keys().map(CellId::KeyVertex));
        out.extend(self.key_edges.keys().map(CellId::KeyEdge));
        out.extend(self.key_faces.keys().map(CellId::KeyFace));
        out.extend(self.inbetween_vertices.keys().map(CellId::InbetweenVertex));
        out.extend(self.inbetween_edges.keys().map(CellId::InbetweenEdge));
        out.extend(self.inbetween_faces.keys().map(CellId::InbetweenFace));
        out
    }

    /// Returns `true` if the given id references a live cell.
    pub fn contains(&self, id: CellId) -> bool {
        match id {
            CellId::KeyVertex(k) => self.key_vertices.contains_key(k),
            CellId::KeyEdge(k) => self.key_edges.contains_key(k),
            CellId::KeyFace(k) => self.key_faces.contains_key(k),
            CellId::InbetweenVertex(k) => self.inbetween_vertices.contains_key(k),
            CellId::InbetweenEdge(k) => self.inbetween_edges.contains_key(k),
            CellId::InbetweenFace(k) => self.inbetween_faces.contains_key(k),
        }
    }

    // --- Lookup ---

    pub fn key_vertex(&self, key: KeyVertexKey) -> Option<&KeyVertexData> {
        self.key_vertices.get(key)
    }

    pub fn key_edge(&self, key: KeyEdgeKey) -> Option<&KeyEdgeData> {
        self.key_edges.get(key)
    }

    pub fn key_face(&self, key: KeyFaceKey) -> Option<&KeyFaceData> {
        self.key_faces.get(key)
    }

    pub fn inbetween_vertex(&self, key: InbetweenVertexKey) -> Option<&InbetweenVertexData> {
        self.inbetween_vertices.get(key)
    }

    pub fn inbetween_edge(&self, key: InbetweenEdgeKey) -> Option<&InbetweenEdgeData> {
        self.inbetween_edges.get(key)
    }

    pub fn inbetween_face(&self, key: InbetweenFaceKey) -> Option<&InbetweenFaceData> {
        self.inbetween_faces.get(key)
    }

    pub(crate) fn try_key_vertex(&self, key: KeyVertexKey) -> Result<&KeyVertexData> {
        self.key_vertices
            .get(key)
            .ok_or(Error::KeyVertexNotFound(key))
    }

    pub(crate) fn try_key_edge(&self, key: KeyEdgeKey) -> Result<&KeyEdgeData> {
        self.key_edges.get(key).ok_or(Error::KeyEdgeNotFound(key))
    }

    pub(crate) fn try_key_face(&self, key: KeyFaceKey) -> Result<&KeyFaceData> {
        self.key_faces.get(key).ok_or(Error::KeyFaceNotFound(key))
    }

    pub(crate) fn try_inbetween_vertex(
        &self,
        key: InbetweenVertexKey,
    ) -> Result<&InbetweenVertexData> {
        self.inbetween_vertices
            .get(key)
            .ok_or(Error::InbetweenVertexNotFound(key))
    }

    pub(crate) fn try_inbetween_edge(&self, key: InbetweenEdgeKey) -> Result<&InbetweenEdgeData> {
        self.inbetween_edges
            .get(key)
            .ok_or(Error::InbetweenEdgeNotFound(key))
    }

    pub(crate) fn try_inbetween_face(&self, key: InbetweenFaceKey) -> Result<&InbetweenFaceData> {
        self.inbetween_faces
            .get(key)
            .ok_or(Error::InbetweenFaceNotFound(key))
    }

    // --- Creation entry points ---

    /// Creates a key vertex. Always valid.
    pub fn new_key_vertex(&mut self, time: Time, position: Point2<f64>) -> KeyVertexKey {
        self.new_key_vertex_with_size(time, position, DEFAULT_VERTEX_SIZE)
    }

    pub fn new_key_vertex_with_size(
        &mut self,
        time: Time,
        position: Point2<f64>,
        size: f64,
    ) -> KeyVertexKey {
        let key = self.key_vertices.insert(KeyVertexData {
            time,
            position,
            size,
        });
        self.depth_insert(key.into());
        debug!(?key, %time, "new key vertex");
        key
    }

    /// Creates an open key edge between two existing vertices at the same
    /// time.
    pub fn new_key_open_edge(
        &mut self,
        start: KeyVertexKey,
        end: KeyVertexKey,
        geometry: EdgeGeometry,
    ) -> Result<KeyEdgeKey> {
        let t_start = self.try_key_vertex(start)?.time;
        let t_end = self.try_key_vertex(end)?.time;
        if t_start != t_end {
            return Err(Error::TimeMismatch {
                expected: t_start,
                found: t_end,
            });
        }

        let key = self.key_edges.insert(KeyEdgeData {
            time: t_start,
            boundary: Some((start, end)),
            geometry,
            geometry_version: 0,
            triangle_cache: TriangleCache::default(),
        });
        self.vertex_to_edges.entry(start).or_default().insert(key);
        self.vertex_to_edges.entry(end).or_default().insert(key);
        self.depth_insert(key.into());
        debug!(?key, %t_start, "new key open edge");
        Ok(key)
    }

    /// Creates a closed loop key edge (no boundary vertices).
    pub fn new_key_closed_edge(&mut self, time: Time, geometry: EdgeGeometry) -> KeyEdgeKey {
        let key = self.key_edges.insert(KeyEdgeData {
            time,
            boundary: None,
            geometry,
            geometry_version: 0,
            triangle_cache: TriangleCache::default(),
        });
        self.depth_insert(key.into());
        debug!(?key, %time, "new key closed edge");
        key
    }

    /// Creates a key face bounded by the given cycles, all of which must be
    /// well-formed at `time`.
    pub fn new_key_face(&mut self, time: Time, cycles: Vec<Cycle>) -> Result<KeyFaceKey> {
        for cycle in &cycles {
            cycle.check(self, time)?;
        }

        let key = self.key_faces.insert(KeyFaceData {
            time,
            cycles: cycles.clone(),
            geometry_version: 0,
            triangle_cache: TriangleCache::default(),
        });
        for cycle in &cycles {
            if let Some(v) = cycle.steiner_vertex() {
                self.vertex_to_faces.entry(v).or_default().insert(key);
            }
            for e in cycle.edges() {
                self.edge_to_faces.entry(e).or_default().insert(key);
            }
        }
        self.depth_insert(key.into());
        debug!(?key, %time, num_cycles = cycles.len(), "new key face");
        Ok(key)
    }

    /// Creates an inbetween vertex animating `before` to `after`. The two
    /// vertices must exist and `before` must be strictly earlier.
    pub fn new_inbetween_vertex(
        &mut self,
        before: KeyVertexKey,
        after: KeyVertexKey,
    ) -> Result<InbetweenVertexKey> {
        let t0 = self.try_key_vertex(before)?.time;
        let t1 = self.try_key_vertex(after)?.time;
        if !(t0 < t1) {
            return Err(Error::InvalidInterval {
                before: t0,
                after: t1,
            });
        }

        let key = self
            .inbetween_vertices
            .insert(InbetweenVertexData { before, after });
        self.vertex_after_star
            .entry(before)
            .or_default()
            .insert(key.into());
        self.vertex_before_star
            .entry(after)
            .or_default()
            .insert(key.into());
        self.depth_insert(key.into());
        debug!(?key, %t0, %t1, "new inbetween vertex");
        Ok(key)
    }

    /// Validates the boundary of an open inbetween edge and returns its
    /// time interval.
    pub(crate) fn check_inbetween_open_edge(
        &self,
        before_path: &Path,
        after_path: &Path,
        start_vertex: &AnimatedVertex,
        end_vertex: &AnimatedVertex,
    ) -> Result<(Time, Time)> {
        let t0 = before_path.time(self)?;
        let t1 = after_path.time(self)?;
        if !(t0 < t1) {
            return Err(Error::InvalidInterval {
                before: t0,
                after: t1,
            });
        }
        before_path.check(self, t0)?;
        after_path.check(self, t1)?;
        start_vertex.check(self)?;
        end_vertex.check(self)?;

        // Path endpoints must be the animated vertices' key vertices
        if before_path.start_vertex(self)? != start_vertex.before_vertex(self)?
            || after_path.start_vertex(self)? != start_vertex.after_vertex(self)?
        {
            return Err(Error::EndpointMismatch("start of the open inbetween edge"));
        }
        if before_path.end_vertex(self)? != end_vertex.before_vertex(self)?
            || after_path.end_vertex(self)? != end_vertex.after_vertex(self)?
        {
            return Err(Error::EndpointMismatch("end of the open inbetween edge"));
        }
        Ok((t0, t1))
    }

    /// Creates an open inbetween edge: two open paths at the interval ends
    /// plus an animated vertex for each endpoint. The paths' endpoints must
    /// match the animated vertices' key vertices.
    pub fn new_inbetween_open_edge(
        &mut self,
        before_path: Path,
        after_path: Path,
        start_vertex: AnimatedVertex,
        end_vertex: AnimatedVertex,
    ) -> Result<InbetweenEdgeKey> {
        let (t0, t1) =
            self.check_inbetween_open_edge(&before_path, &after_path, &start_vertex, &end_vertex)?;

        let data = InbetweenEdgeData {
            boundary: InbetweenEdgeBoundary::Open {
                before_path,
                after_path,
                start_vertex,
                end_vertex,
            },
        };
        let key = self.inbetween_edges.insert(data);
        self.register_inbetween_edge(key);
        self.depth_insert(key.into());
        debug!(?key, %t0, %t1, "new inbetween open edge");
        Ok(key)
    }

    /// Creates a closed inbetween edge animating between two cycles.
    pub fn new_inbetween_closed_edge(
        &mut self,
        before_cycle: Cycle,
        after_cycle: Cycle,
    ) -> Result<InbetweenEdgeKey> {
        let t0 = before_cycle.time(self)?;
        let t1 = after_cycle.time(self)?;
        if !(t0 < t1) {
            return Err(Error::InvalidInterval {
                before: t0,
                after: t1,
            });
        }
        before_cycle.check(self, t0)?;
        after_cycle.check(self, t1)?;

        let data = InbetweenEdgeData {
            boundary: InbetweenEdgeBoundary::Closed {
                before_cycle,
                after_cycle,
            },
        };
        let key = self.inbetween_edges.insert(data);
        self.register_inbetween_edge(key);
        self.depth_insert(key.into());
        debug!(?key, %t0, %t1, "new inbetween closed edge");
        Ok(key)
    }

    /// Creates an inbetween face animating between two key-face boundaries.
    pub fn new_inbetween_face(
        &mut self,
        before_cycles: Vec<Cycle>,
        after_cycles: Vec<Cycle>,
    ) -> Result<InbetweenFaceKey> {
        if before_cycles.is_empty() || after_cycles.is_empty() {
            return Err(Error::EmptyEdgeSet);
        }
        let t0 = before_cycles[0].time(self)?;
        let t1 = after_cycles[0].time(self)?;
        if !(t0 < t1) {
            return Err(Error::InvalidInterval {
                before: t0,
                after: t1,
            });
        }
        for cycle in &before_cycles {
            cycle.check(self, t0)?;
        }
        for cycle in &after_cycles {
            cycle.check(self, t1)?;
        }

        let key = self.inbetween_faces.insert(InbetweenFaceData {
            before_cycles,
            after_cycles,
        });
        self.register_inbetween_face(key);
        self.depth_insert(key.into());
        debug!(?key, %t0, %t1, "new inbetween face");
        Ok(key)
    }

    // --- Mutation ---

    /// Moves a key vertex and warps the geometry of all incident open key
    /// edges so their endpoint samples track the vertex: each edge gets a
    /// correction ramped linearly from the moved end to the fixed end.
    pub fn set_key_vertex_position(
        &mut self,
        key: KeyVertexKey,
        position: Point2<f64>,
    ) -> Result<()> {
        let old = self.try_key_vertex(key)?.position;
        let delta = position - old;

        if let Some(v) = self.key_vertices.get_mut(key) {
            v.position = position;
        }

        let incident: Vec<KeyEdgeKey> = self
            .vertex_to_edges
            .get(&key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for e in incident {
            let Some(edge) = self.key_edges.get_mut(e) else {
                continue;
            };
            let Some((start, end)) = edge.boundary else {
                continue;
            };

            let samples = edge.geometry.samples();
            let n = samples.len();
            if n == 0 {
                continue;
            }
            let mut warped = Vec::with_capacity(n);
            for (i, s) in samples.iter().enumerate() {
                let u = if n == 1 {
                    0.0
                } else {
                    i as f64 / (n - 1) as f64
                };
                // Ramp from 1 at the moved end to 0 at the other end;
                // an edge looping back to the same vertex moves rigidly
                let mut w = 0.0;
                if start == key {
                    w += 1.0 - u;
                }
                if end == key {
                    w += u;
                }
                warped.push(s.translated(delta * w));
            }
            edge.geometry = EdgeGeometry::new(warped);
            edge.geometry_version += 1;
        }

        // Faces built on those edges are stale too
        let faces: Vec<KeyFaceKey> = self
            .vertex_to_edges
            .get(&key)
            .into_iter()
            .flatten()
            .filter_map(|e| self.edge_to_faces.get(e))
            .flatten()
            .chain(self.vertex_to_faces.get(&key).into_iter().flatten())
            .copied()
            .collect();
        for f in faces {
            if let Some(face) = self.key_faces.get_mut(f) {
                face.geometry_version += 1;
            }
        }
        Ok(())
    }

    /// Replaces a key edge's sampled geometry.
    pub fn set_key_edge_geometry(
        &mut self,
        key: KeyEdgeKey,
        geometry: EdgeGeometry,
    ) -> Result<()> {
        let edge = self
            .key_edges
            .get_mut(key)
            .ok_or(Error::KeyEdgeNotFound(key))?;
        edge.geometry = geometry;
        edge.geometry_version += 1;

        let faces: Vec<KeyFaceKey> = self
            .edge_to_faces
            .get(&key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        for f in faces {
            if let Some(face) = self.key_faces.get_mut(f) {
                face.geometry_version += 1;
            }
        }
        Ok(())
    }

    // --- Removal ---

    /// Removes a cell of any kind, refusing while dependents remain.
    pub fn remove_cell(&mut self, id: CellId) -> Result<()> {
        match id {
            CellId::KeyVertex(k) => self.remove_key_vertex(k),
            CellId::KeyEdge(k) => self.remove_key_edge(k),
            CellId::KeyFace(k) => self.remove_key_face(k),
            CellId::InbetweenVertex(k) => self.remove_inbetween_vertex(k),
            CellId::InbetweenEdge(k) => self.remove_inbetween_edge(k),
            CellId::InbetweenFace(k) => self.remove_inbetween_face(k),
        }
    }

    pub fn remove_key_vertex(&mut self, key: KeyVertexKey) -> Result<()> {
        self.try_key_vertex(key)?;
        let deps = self.dependents(key.into());
        if !deps.is_empty() {
            return Err(Error::HasDependents(key.into(), deps.len()));
        }
        self.key_vertices.remove(key);
        self.vertex_to_edges.remove(&key);
        self.vertex_to_faces.remove(&key);
        self.vertex_before_star.remove(&key);
        self.vertex_after_star.remove(&key);
        self.depth_remove(key.into());
        debug!(?key, "removed key vertex");
        Ok(())
    }

    pub fn remove_key_edge(&mut self, key: KeyEdgeKey) -> Result<()> {
        let edge = self.try_key_edge(key)?;
        let deps = self.dependents(key.into());
        if !deps.is_empty() {
            return Err(Error::HasDependents(key.into(), deps.len()));
        }
        let boundary = edge.boundary;
        self.key_edges.remove(key);
        if let Some((s, e)) = boundary {
            if let Some(set) = self.vertex_to_edges.get_mut(&s) {
                set.remove(&key);
            }
            if let Some(set) = self.vertex_to_edges.get_mut(&e) {
                set.remove(&key);
            }
        }
        self.edge_to_faces.remove(&key);
        self.edge_before_star.remove(&key);
        self.edge_after_star.remove(&key);
        self.depth_remove(key.into());
        debug!(?key, "removed key edge");
        Ok(())
    }

    pub fn remove_key_face(&mut self, key: KeyFaceKey) -> Result<()> {
        let face = self.try_key_face(key)?;
        let cycles = face.cycles.clone();
        self.key_faces.remove(key);
        for cycle in &cycles {
            if let Some(v) = cycle.steiner_vertex() {
                if let Some(set) = self.vertex_to_faces.get_mut(&v) {
                    set.remove(&key);
                }
            }
            for e in cycle.edges() {
                if let Some(set) = self.edge_to_faces.get_mut(&e) {
                    set.remove(&key);
                }
            }
        }
        self.depth_remove(key.into());
        debug!(?key, "removed key face");
        Ok(())
    }

    pub fn remove_inbetween_vertex(&mut self, key: InbetweenVertexKey) -> Result<()> {
        let data = self.try_inbetween_vertex(key)?;
        let deps = self.dependents(key.into());
        if !deps.is_empty() {
            return Err(Error::HasDependents(key.into(), deps.len()));
        }
        let (before, after) = (data.before, data.after);
        let id = CellId::InbetweenVertex(key);
        self.inbetween_vertices.remove(key);
        if let Some(set) = self.vertex_after_star.get_mut(&before) {
            set.remove(&id);
        }
        if let Some(set) = self.vertex_before_star.get_mut(&after) {
            set.remove(&id);
        }
        self.ivertex_to_iedges.remove(&key);
        self.depth_remove(key.into());
        debug!(?key, "removed inbetween vertex");
        Ok(())
    }

    pub fn remove_inbetween_edge(&mut self, key: InbetweenEdgeKey) -> Result<()> {
        self.try_inbetween_edge(key)?;
        self.deregister_inbetween_edge(key);
        self.inbetween_edges.remove(key);
        self.depth_remove(key.into());
        debug!(?key, "removed inbetween edge");
        Ok(())
    }

    pub fn remove_inbetween_face(&mut self, key: InbetweenFaceKey) -> Result<()> {
        self.try_inbetween_face(key)?;
        self.deregister_inbetween_face(key);
        self.inbetween_faces.remove(key);
        self.depth_remove(key.into());
        debug!(?key, "removed inbetween face");
        Ok(())
    }

    // --- Star registration helpers ---

    /// Registers an inbetween edge in the temporal stars of every key cell
    /// its boundary references, and in the chains of its animated vertices.
    pub(crate) fn register_inbetween_edge(&mut self, key: InbetweenEdgeKey) {
        let Some(data) = self.inbetween_edges.get(key) else {
            return;
        };
        let id: CellId = key.into();
        match data.boundary.clone() {
            InbetweenEdgeBoundary::Open {
                before_path,
                after_path,
                start_vertex,
                end_vertex,
            } => {
                self.register_path(&before_path, id, true);
                self.register_path(&after_path, id, false);
                for iv in start_vertex.chain().iter().chain(end_vertex.chain()) {
                    self.ivertex_to_iedges.entry(*iv).or_default().insert(key);
                }
            }
            InbetweenEdgeBoundary::Closed {
                before_cycle,
                after_cycle,
            } => {
                self.register_cycle(&before_cycle, id, true);
                self.register_cycle(&after_cycle, id, false);
            }
        }
    }

    pub(crate) fn deregister_inbetween_edge(&mut self, key: InbetweenEdgeKey) {
        let Some(data) = self.inbetween_edges.get(key) else {
            return;
        };
        let id: CellId = key.into();
        match data.boundary.clone() {
            InbetweenEdgeBoundary::Open {
                before_path,
                after_path,
                start_vertex,
                end_vertex,
            } => {
                self.deregister_path(&before_path, id, true);
                self.deregister_path(&after_path, id, false);
                for iv in start_vertex.chain().iter().chain(end_vertex.chain()) {
                    if let Some(set) = self.ivertex_to_iedges.get_mut(iv) {
                        set.remove(&key);
                    }
                }
            }
            InbetweenEdgeBoundary::Closed {
                before_cycle,
                after_cycle,
            } => {
                self.deregister_cycle(&before_cycle, id, true);
                self.deregister_cycle(&after_cycle, id, false);
            }
        }
    }

    pub(crate) fn register_inbetween_face(&mut self, key: InbetweenFaceKey) {
        let Some(data) = self.inbetween_faces.get(key) else {
            return;
        };
        let id: CellId = key.into();
        let (before, after) = (data.before_cycles.clone(), data.after_cycles.clone());
        for cycle in &before {
            self.register_cycle(cycle, id, true);
        }
        for cycle in &after {
            self.register_cycle(cycle, id, false);
        }
    }

    pub(crate) fn deregister_inbetween_face(&mut self, key: InbetweenFaceKey) {
        let Some(data) = self.inbetween_faces.get(key) else {
            return;
        };
        let id: CellId = key.into();
        let (before, after) = (data.before_cycles.clone(), data.after_cycles.clone());
        for cycle in &before {
            self.deregister_cycle(cycle, id, true);
        }
        for cycle in &after {
            self.deregister_cycle(cycle, id, false);
        }
    }

    /// `at_before == true` means the referencing inbetween cell starts at
    /// these key cells, so it belongs to their after-star.
    fn register_path(&mut self, path: &Path, id: CellId, at_before: bool) {
        if let Some(v) = path.single_vertex() {
            self.vertex_star_mut(at_before).entry(v).or_default().insert(id);
        }
        for e in path.edges() {
            self.edge_star_mut(at_before).entry(e).or_default().insert(id);
        }
    }

    fn deregister_path(&mut self, path: &Path, id: CellId, at_before: bool) {
        if let Some(v) = path.single_vertex() {
            if let Some(set) = self.vertex_star_mut(at_before).get_mut(&v) {
                set.remove(&id);
            }
        }
        for e in path.edges() {
            if let Some(set) = self.edge_star_mut(at_before).get_mut(&e) {
                set.remove(&id);
            }
        }
    }

    fn register_cycle(&mut self, cycle: &Cycle, id: CellId, at_before: bool) {
        if let Some(v) = cycle.steiner_vertex() {
            self.vertex_star_mut(at_before).entry(v).or_default().insert(id);
        }
        for e in cycle.edges() {
            self.edge_star_mut(at_before).entry(e).or_default().insert(id);
        }
    }

    fn deregister_cycle(&mut self, cycle: &Cycle, id: CellId, at_before: bool) {
        if let Some(v) = cycle.steiner_vertex() {
            if let Some(set) = self.vertex_star_mut(at_before).get_mut(&v) {
                set.remove(&id);
            }
        }
        for e in cycle.edges() {
            if let Some(set) = self.edge_star_mut(at_before).get_mut(&e) {
                set.remove(&id);
            }
        }
    }

    fn vertex_star_mut(
        &mut self,
        at_before: bool,
    ) -> &mut FxHashMap<KeyVertexKey, FxHashSet<CellId>> {
        if at_before {
            &mut self.vertex_after_star
        } else {
            &mut self.vertex_before_star
        }
    }

    fn edge_star_mut(&mut self, at_before: bool) -> &mut FxHashMap<KeyEdgeKey, FxHashSet<CellId>> {
        if at_before {
            &mut self.edge_after_star
        } else {
            &mut self.edge_before_star
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(x0: f64, x1: f64) -> EdgeGeometry {
        EdgeGeometry::line(Point2::new(x0, 0.0), Point2::new(x1, 0.0), 1.0, 1.0)
    }

    #[test]
    fn new_vac_is_empty() {
        let vac = Vac::new();
        assert_eq!(vac.num_cells(), 0);
        assert!(vac.cells().is_empty());
    }

    #[test]
    fn open_edge_requires_same_time() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(1), Point2::new(1.0, 0.0));

        let before = vac.num_cells();
        let result = vac.new_key_open_edge(v0, v1, line(0.0, 1.0));
        assert!(matches!(result, Err(Error::TimeMismatch { .. })));
        assert_eq!(vac.num_cells(), before); // nothing was created
    }

    #[test]
    fn open_edge_registers_spatial_star() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(0), Point2::new(10.0, 0.0));
        let e = vac.new_key_open_edge(v0, v1, line(0.0, 10.0)).unwrap();

        assert_eq!(vac.incident_edges(v0), vec![e]);
        assert_eq!(vac.incident_edges(v1), vec![e]);
    }

    #[test]
    fn vertex_with_incident_edge_cannot_be_removed() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(0), Point2::new(10.0, 0.0));
        let e = vac.new_key_open_edge(v0, v1, line(0.0, 10.0)).unwrap();

        assert!(matches!(
            vac.remove_key_vertex(v0),
            Err(Error::HasDependents(_, 1))
        ));

        // After removing the edge, the vertex goes freely
        vac.remove_key_edge(e).unwrap();
        vac.remove_key_vertex(v0).unwrap();
        assert!(vac.key_vertex(v0).is_none());
    }

    #[test]
    fn inbetween_vertex_requires_ordered_times() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(10), Point2::new(5.0, 0.0));

        assert!(vac.new_inbetween_vertex(v1, v0).is_err());
        let iv = vac.new_inbetween_vertex(v0, v1).unwrap();

        assert_eq!(vac.temporal_star_after(v0.into()), vec![CellId::from(iv)]);
        assert_eq!(vac.temporal_star_before(v1.into()), vec![CellId::from(iv)]);

        // Temporal star blocks key vertex removal
        assert!(vac.remove_key_vertex(v0).is_err());
        vac.remove_inbetween_vertex(iv).unwrap();
        vac.remove_key_vertex(v0).unwrap();
    }

    #[test]
    fn moving_a_vertex_warps_incident_edge_geometry() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(0), Point2::new(10.0, 0.0));
        let e = vac.new_key_open_edge(v0, v1, line(0.0, 10.0)).unwrap();

        vac.set_key_vertex_position(v0, Point2::new(0.0, 4.0)).unwrap();

        let g = &vac.key_edge(e).unwrap().geometry;
        let first = g.start().unwrap();
        let last = g.end().unwrap();
        assert_relative_eq!(first.position.y, 4.0, epsilon = 1e-12);
        assert_relative_eq!(last.position.y, 0.0, epsilon = 1e-12); // fixed end
        let mid = g.sample_at(g.length() / 2.0).unwrap();
        assert!(mid.position.y > 0.0 && mid.position.y < 4.0);
    }
}
