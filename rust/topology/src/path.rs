// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Open walks over key cells.
//!
//! A [`Path`] is an instant-time walk used as the before/after boundary of
//! an open inbetween edge: either a single vertex (the edge grows out of a
//! point) or a non-empty chain of halfedges where each halfedge starts at
//! the vertex the previous one ended at.
//!
//! [`ProperPath`] builds a `Path` from an unordered edge set by greedy
//! chaining, failing fast instead of guessing when the set branches or
//! falls apart.

use serde::{Deserialize, Serialize};
use vac_geometry::EdgeSample;

use crate::cell::EdgeGeometry;
use crate::error::{Error, Result};
use crate::halfedge::KeyHalfedge;
use crate::keys::{KeyEdgeKey, KeyVertexKey};
use crate::time::Time;
use crate::vac::Vac;

/// An open walk: a single vertex, or a chain of consecutive halfedges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Path {
    SingleVertex(KeyVertexKey),
    Edges(Vec<KeyHalfedge>),
}

impl Path {
    pub fn is_single_vertex(&self) -> bool {
        matches!(self, Path::SingleVertex(_))
    }

    /// The vertex this path references directly, if it is the single-vertex
    /// form. Chain paths reference vertices only through their edges.
    pub fn single_vertex(&self) -> Option<KeyVertexKey> {
        match self {
            Path::SingleVertex(v) => Some(*v),
            Path::Edges(_) => None,
        }
    }

    /// The key edges this path traverses, in walk order.
    pub fn edges(&self) -> Vec<KeyEdgeKey> {
        match self {
            Path::SingleVertex(_) => Vec::new(),
            Path::Edges(hes) => hes.iter().map(|he| he.edge).collect(),
        }
    }

    pub fn halfedges(&self) -> &[KeyHalfedge] {
        match self {
            Path::SingleVertex(_) => &[],
            Path::Edges(hes) => hes,
        }
    }

    /// The instant this path lives at.
    pub fn time(&self, vac: &Vac) -> Result<Time> {
        match self {
            Path::SingleVertex(v) => Ok(vac.try_key_vertex(*v)?.time),
            Path::Edges(hes) => match hes.first() {
                Some(he) => he.time(vac),
                None => Err(Error::EmptyEdgeSet),
            },
        }
    }

    pub fn start_vertex(&self, vac: &Vac) -> Result<KeyVertexKey> {
        match self {
            Path::SingleVertex(v) => {
                vac.try_key_vertex(*v)?;
                Ok(*v)
            }
            Path::Edges(hes) => match hes.first() {
                Some(he) => he.start_vertex(vac)?.ok_or(Error::ClosedEdgeInChain),
                None => Err(Error::EmptyEdgeSet),
            },
        }
    }

    pub fn end_vertex(&self, vac: &Vac) -> Result<KeyVertexKey> {
        match self {
            Path::SingleVertex(v) => {
                vac.try_key_vertex(*v)?;
                Ok(*v)
            }
            Path::Edges(hes) => match hes.last() {
                Some(he) => he.end_vertex(vac)?.ok_or(Error::ClosedEdgeInChain),
                None => Err(Error::EmptyEdgeSet),
            },
        }
    }

    /// Verifies the path is well-formed at `time`: every referenced cell
    /// exists at that instant, no edge is a closed loop, and consecutive
    /// halfedges share a vertex.
    pub fn check(&self, vac: &Vac, time: Time) -> Result<()> {
        match self {
            Path::SingleVertex(v) => {
                let data = vac.try_key_vertex(*v)?;
                if data.time != time {
                    return Err(Error::TimeMismatch {
                        expected: time,
                        found: data.time,
                    });
                }
                Ok(())
            }
            Path::Edges(hes) => {
                if hes.is_empty() {
                    return Err(Error::EmptyEdgeSet);
                }
                let mut prev_end: Option<KeyVertexKey> = None;
                for he in hes {
                    let t = he.time(vac)?;
                    if t != time {
                        return Err(Error::TimeMismatch {
                            expected: time,
                            found: t,
                        });
                    }
                    let start = he.start_vertex(vac)?.ok_or(Error::ClosedEdgeInChain)?;
                    if let Some(prev) = prev_end {
                        if prev != start {
                            return Err(Error::DisconnectedChain { consumed: 0 });
                        }
                    }
                    prev_end = he.end_vertex(vac)?;
                }
                Ok(())
            }
        }
    }

    /// Total arclength, zero for a single vertex.
    pub fn length(&self, vac: &Vac) -> Result<f64> {
        match self {
            Path::SingleVertex(_) => Ok(0.0),
            Path::Edges(hes) => {
                let mut total = 0.0;
                for he in hes {
                    total += he.length(vac)?;
                }
                Ok(total)
            }
        }
    }

    /// Concatenated geometry samples across the whole walk, with joint
    /// samples deduplicated.
    pub fn geometry_samples(&self, vac: &Vac) -> Result<Vec<EdgeSample>> {
        match self {
            Path::SingleVertex(v) => {
                let data = vac.try_key_vertex(*v)?;
                Ok(vec![EdgeSample::new(data.position, data.size)])
            }
            Path::Edges(hes) => {
                let mut out: Vec<EdgeSample> = Vec::new();
                for he in hes {
                    let edge = vac.try_key_edge(he.edge)?;
                    let mut samples = edge.geometry.samples().to_vec();
                    if !he.side {
                        samples.reverse();
                    }
                    let skip = usize::from(!out.is_empty() && !samples.is_empty());
                    out.extend(samples.into_iter().skip(skip));
                }
                Ok(out)
            }
        }
    }

    /// `n` uniformly spaced samples along the walk. A single-vertex path
    /// yields `n` coincident samples.
    pub fn sample(&self, vac: &Vac, n: usize) -> Result<Vec<EdgeSample>> {
        match self {
            Path::SingleVertex(v) => {
                let data = vac.try_key_vertex(*v)?;
                Ok(vec![EdgeSample::new(data.position, data.size); n])
            }
            Path::Edges(_) => {
                Ok(EdgeGeometry::new(self.geometry_samples(vac)?).resample_uniform(n))
            }
        }
    }

    /// Rewrites direct references to `old` to point to `new`. Vertices
    /// reached through edges are untouched; the edges themselves get
    /// rewritten by edge-boundary updates.
    pub fn replace_vertex(&mut self, old: KeyVertexKey, new: KeyVertexKey) {
        if let Path::SingleVertex(v) = self {
            if *v == old {
                *v = new;
            }
        }
    }

    /// Substitutes every traversal of `old` with the `replacement` chain,
    /// reversed and side-flipped where the walk crosses `old` backwards.
    pub fn replace_edge(&mut self, old: KeyEdgeKey, replacement: &[KeyHalfedge]) {
        if let Path::Edges(hes) = self {
            *hes = substitute(hes, old, replacement);
        }
    }
}

/// Shared halfedge-list substitution for paths and cycles.
pub(crate) fn substitute(
    hes: &[KeyHalfedge],
    old: KeyEdgeKey,
    replacement: &[KeyHalfedge],
) -> Vec<KeyHalfedge> {
    let mut out = Vec::with_capacity(hes.len());
    for he in hes {
        if he.edge == old {
            if he.side {
                out.extend_from_slice(replacement);
            } else {
                out.extend(replacement.iter().rev().map(|r| r.opposite()));
            }
        } else {
            out.push(*he);
        }
    }
    out
}

/// A path built from an unordered set of open key edges by greedy chaining.
///
/// Construction fails with [`Error::BranchingChain`] when more than one
/// unused edge continues the walk, and [`Error::DisconnectedChain`] when
/// edges remain after both walk directions stall. It never guesses.
#[derive(Debug, Clone, PartialEq)]
pub struct ProperPath {
    path: Path,
}

impl ProperPath {
    /// Chains `edges` into a path, starting the walk at the first edge of
    /// the slice and extending greedily in both directions.
    pub fn from_edges(vac: &Vac, edges: &[KeyEdgeKey]) -> Result<Self> {
        let (first, rest) = edges.split_first().ok_or(Error::EmptyEdgeSet)?;
        let first_data = vac.try_key_edge(*first)?;
        if first_data.is_closed() {
            return Err(Error::ClosedEdgeInChain);
        }
        for e in rest {
            if vac.try_key_edge(*e)?.is_closed() {
                return Err(Error::ClosedEdgeInChain);
            }
        }

        let mut unused: Vec<KeyEdgeKey> = rest.to_vec();
        let mut chain = vec![KeyHalfedge::new(*first, true)];
        let mut consumed = 1;

        // Forward from the chain's end, then backward from its start
        loop {
            let at = chain
                .last()
                .and_then(|he| endpoint(vac, he, false))
                .ok_or(Error::ClosedEdgeInChain)?;
            match take_continuation(vac, &mut unused, at, consumed)? {
                Some(he) => {
                    chain.push(he);
                    consumed += 1;
                }
                None => break,
            }
        }
        loop {
            let at = chain
                .first()
                .and_then(|he| endpoint(vac, he, true))
                .ok_or(Error::ClosedEdgeInChain)?;
            match take_continuation(vac, &mut unused, at, consumed)? {
                Some(he) => {
                    chain.insert(0, he.opposite());
                    consumed += 1;
                }
                None => break,
            }
        }

        if !unused.is_empty() {
            return Err(Error::DisconnectedChain { consumed });
        }
        Ok(Self {
            path: Path::Edges(chain),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> Path {
        self.path
    }
}

fn endpoint(vac: &Vac, he: &KeyHalfedge, start: bool) -> Option<KeyVertexKey> {
    let result = if start {
        he.start_vertex(vac)
    } else {
        he.end_vertex(vac)
    };
    result.ok().flatten()
}

/// Removes and returns the unique unused halfedge starting at `at`, or
/// `None` when no edge continues; two or more candidates is a branching
/// error.
fn take_continuation(
    vac: &Vac,
    unused: &mut Vec<KeyEdgeKey>,
    at: KeyVertexKey,
    consumed: usize,
) -> Result<Option<KeyHalfedge>> {
    let mut found: Option<(usize, KeyHalfedge)> = None;
    let mut candidates = 0;
    for (i, e) in unused.iter().enumerate() {
        let edge = vac.try_key_edge(*e)?;
        let Some((s, t)) = edge.boundary else {
            continue;
        };
        if s == at || t == at {
            candidates += 1;
            if found.is_none() {
                found = Some((i, KeyHalfedge::new(*e, s == at)));
            }
        }
    }
    if candidates > 1 {
        return Err(Error::BranchingChain {
            consumed,
            candidates,
        });
    }
    Ok(found.map(|(i, he)| {
        unused.remove(i);
        he
    }))
}
