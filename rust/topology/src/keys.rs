// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cell key types for arena-based storage.
//!
//! Each concrete cell type gets a unique, type-safe key for O(1) lookup in
//! the [`Vac`](crate::Vac) arena. Keys are created by `slotmap::SlotMap` and
//! are generational: a key to a removed cell fails lookup instead of
//! dereferencing stale data, which makes keys safe to hold across structural
//! edits (selection sets, undo stacks, boundary references in other cells).

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Key for a key vertex (a point at one instant).
    pub struct KeyVertexKey;

    /// Key for a key edge (an open or closed curve at one instant).
    pub struct KeyEdgeKey;

    /// Key for a key face (a region bounded by cycles at one instant).
    pub struct KeyFaceKey;

    /// Key for an inbetween vertex (a vertex animated across a time interval).
    pub struct InbetweenVertexKey;

    /// Key for an inbetween edge (an edge animated across a time interval).
    pub struct InbetweenEdgeKey;

    /// Key for an inbetween face (a face animated across a time interval).
    pub struct InbetweenFaceKey;
}

/// A key that can reference any cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellId {
    KeyVertex(KeyVertexKey),
    KeyEdge(KeyEdgeKey),
    KeyFace(KeyFaceKey),
    InbetweenVertex(InbetweenVertexKey),
    InbetweenEdge(InbetweenEdgeKey),
    InbetweenFace(InbetweenFaceKey),
}

impl CellId {
    /// Returns the cell kind of this id.
    pub fn kind(&self) -> CellKind {
        match self {
            CellId::KeyVertex(_) => CellKind::KeyVertex,
            CellId::KeyEdge(_) => CellKind::KeyEdge,
            CellId::KeyFace(_) => CellKind::KeyFace,
            CellId::InbetweenVertex(_) => CellKind::InbetweenVertex,
            CellId::InbetweenEdge(_) => CellKind::InbetweenEdge,
            CellId::InbetweenFace(_) => CellKind::InbetweenFace,
        }
    }
}

/// Whether a cell exists at one instant or across a time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temporality {
    Key,
    Inbetween,
}

/// Discriminant for the six concrete cell types: the product of dimension
/// (vertex/edge/face) and temporality (key/inbetween).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellKind {
    KeyVertex = 0,
    KeyEdge = 1,
    KeyFace = 2,
    InbetweenVertex = 3,
    InbetweenEdge = 4,
    InbetweenFace = 5,
}

impl CellKind {
    /// Topological dimension: 0 for vertices, 1 for edges, 2 for faces.
    pub fn dimension(&self) -> u8 {
        match self {
            CellKind::KeyVertex | CellKind::InbetweenVertex => 0,
            CellKind::KeyEdge | CellKind::InbetweenEdge => 1,
            CellKind::KeyFace | CellKind::InbetweenFace => 2,
        }
    }

    pub fn temporality(&self) -> Temporality {
        match self {
            CellKind::KeyVertex | CellKind::KeyEdge | CellKind::KeyFace => Temporality::Key,
            CellKind::InbetweenVertex | CellKind::InbetweenEdge | CellKind::InbetweenFace => {
                Temporality::Inbetween
            }
        }
    }

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::KeyVertex => "KeyVertex",
            CellKind::KeyEdge => "KeyEdge",
            CellKind::KeyFace => "KeyFace",
            CellKind::InbetweenVertex => "InbetweenVertex",
            CellKind::InbetweenEdge => "InbetweenEdge",
            CellKind::InbetweenFace => "InbetweenFace",
        }
    }
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Conversion impls from specific keys to CellId
impl From<KeyVertexKey> for CellId {
    fn from(k: KeyVertexKey) -> Self {
        CellId::KeyVertex(k)
    }
}

impl From<KeyEdgeKey> for CellId {
    fn from(k: KeyEdgeKey) -> Self {
        CellId::KeyEdge(k)
    }
}

impl From<KeyFaceKey> for CellId {
    fn from(k: KeyFaceKey) -> Self {
        CellId::KeyFace(k)
    }
}

impl From<InbetweenVertexKey> for CellId {
    fn from(k: InbetweenVertexKey) -> Self {
        CellId::InbetweenVertex(k)
    }
}

impl From<InbetweenEdgeKey> for CellId {
    fn from(k: InbetweenEdgeKey) -> Self {
        CellId::InbetweenEdge(k)
    }
}

impl From<InbetweenFaceKey> for CellId {
    fn from(k: InbetweenFaceKey) -> Self {
        CellId::InbetweenFace(k)
    }
}
