// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # VAC Topology
//!
//! Vector animation complex: a topological cell complex unifying 2D
//! vector graphics and their animation in time.
//!
//! A drawing is a set of *cells*. Key cells (vertices, edges, faces) live
//! at one instant; inbetween cells (vertices, edges, faces) span the open
//! interval between two key instants and interpolate their boundaries.
//! All cells are owned by a [`Vac`] arena with generational keys and
//! bidirectional star indices, so incidence queries in either direction
//! are cheap and deletions can refuse while dependents remain.
//!
//! Mutations go through checked creation entry points on [`Vac`] or, for
//! compound edits, through the two-phase operators in [`ops`]: validate
//! with `compute(&Vac)`, then mutate with `apply(&mut Vac)`.

pub mod animated_vertex;
pub mod boundary;
pub mod cell;
pub mod cycle;
pub mod depth;
pub mod error;
pub mod halfedge;
pub mod keys;
pub mod ops;
pub mod path;
pub mod query;
pub mod sampling;
pub mod serialization;
pub mod star;
pub mod time;
pub mod vac;

pub use animated_vertex::AnimatedVertex;
pub use cell::{
    EdgeGeometry, InbetweenEdgeBoundary, InbetweenEdgeData, InbetweenFaceData, InbetweenVertexData,
    KeyEdgeData, KeyFaceData, KeyVertexData,
};
pub use cycle::{Cycle, CycleKind, ProperCycle};
pub use error::{Error, Result};
pub use halfedge::KeyHalfedge;
pub use keys::{
    CellId, CellKind, InbetweenEdgeKey, InbetweenFaceKey, InbetweenVertexKey, KeyEdgeKey,
    KeyFaceKey, KeyVertexKey, Temporality,
};
pub use path::{Path, ProperPath};
pub use query::BBox;
pub use sampling::{
    inbetween_edge_sampling, inbetween_vertex_pos, DEFAULT_SAMPLING_DS,
};
pub use serialization::VacSnapshot;
pub use time::{Time, TIME_EPS};
pub use vac::{Vac, DEFAULT_VERTEX_SIZE};
