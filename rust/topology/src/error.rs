// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for complex operations.
//!
//! Operation-validity rejections (a cycle that does not close, an edge
//! between vertices at different times) are ordinary `Err` values the
//! caller is expected to handle by aborting the gesture. Stale keys fail
//! lookup with a `*NotFound` error rather than dereferencing garbage.

use crate::keys::{
    CellId, InbetweenEdgeKey, InbetweenFaceKey, InbetweenVertexKey, KeyEdgeKey, KeyFaceKey,
    KeyVertexKey,
};
use crate::time::Time;

/// Result type alias for complex operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during complex operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Key vertex key not found in the arena.
    #[error("key vertex not found: {0:?}")]
    KeyVertexNotFound(KeyVertexKey),

    /// Key edge key not found in the arena.
    #[error("key edge not found: {0:?}")]
    KeyEdgeNotFound(KeyEdgeKey),

    /// Key face key not found in the arena.
    #[error("key face not found: {0:?}")]
    KeyFaceNotFound(KeyFaceKey),

    /// Inbetween vertex key not found in the arena.
    #[error("inbetween vertex not found: {0:?}")]
    InbetweenVertexNotFound(InbetweenVertexKey),

    /// Inbetween edge key not found in the arena.
    #[error("inbetween edge not found: {0:?}")]
    InbetweenEdgeNotFound(InbetweenEdgeKey),

    /// Inbetween face key not found in the arena.
    #[error("inbetween face not found: {0:?}")]
    InbetweenFaceNotFound(InbetweenFaceKey),

    /// Boundary cells do not share the required time.
    #[error("time mismatch: expected {expected}, found {found}")]
    TimeMismatch { expected: Time, found: Time },

    /// An inbetween cell's interval is empty or reversed.
    #[error("invalid time interval: before {before} is not strictly less than after {after}")]
    InvalidInterval { before: Time, after: Time },

    /// Path/cycle construction received an empty edge set.
    #[error("cannot build a path or cycle from an empty edge set")]
    EmptyEdgeSet,

    /// Greedy chaining found no edge continuing the walk.
    #[error("edge set does not chain: no edge continues the walk after {consumed} edges")]
    DisconnectedChain { consumed: usize },

    /// Greedy chaining found more than one candidate edge (branching vertex).
    #[error("edge set is ambiguous: {candidates} edges continue the walk after {consumed} edges")]
    BranchingChain { consumed: usize, candidates: usize },

    /// A cycle's walk does not return to its starting vertex.
    #[error("edge set chains into an open walk, not a closed cycle")]
    NotClosed,

    /// A cycle's walk visits a vertex twice before closing.
    #[error("cycle is not a simple loop: a vertex repeats before the closing edge")]
    RepeatedVertex,

    /// A path or cycle references a closed edge in a multi-edge chain.
    #[error("closed edge cannot appear in a multi-edge chain")]
    ClosedEdgeInChain,

    /// A boundary's endpoints do not line up with the cell it bounds or
    /// replaces.
    #[error("boundary endpoint mismatch: {0}")]
    EndpointMismatch(&'static str),

    /// Two cells cannot be combined: open vs closed, or a cell paired
    /// with itself.
    #[error("incompatible cells: {0}")]
    TopologyMismatch(&'static str),

    /// An animated vertex chain is empty or its inbetween vertices do not
    /// connect end-to-end in time.
    #[error("inbetween vertex chain is not connected at position {0}")]
    DisconnectedVertexChain(usize),

    /// A split arclength is outside the edge or out of order.
    #[error("split position {0} is outside the edge or out of order")]
    InvalidSplitPosition(f64),

    /// Deletion refused because other cells still reference the target.
    #[error("cell {0:?} still has {1} dependent cell(s)")]
    HasDependents(CellId, usize),

    /// A sampling query fell outside the cell's life span.
    #[error("time {time} is outside the cell's life span")]
    TimeOutOfRange { time: Time },

    /// An id in a snapshot did not resolve to a constructed cell.
    #[error("unresolved {kind} id {id} in snapshot")]
    UnresolvedId { kind: &'static str, id: u64 },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Geometry processing error.
    #[error("geometry error: {0}")]
    Geometry(#[from] vac_geometry::Error),
}
