// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed walks over key cells.
//!
//! A [`Cycle`] bounds a key face or a closed inbetween edge. It comes in
//! three forms: a lone vertex (a Steiner point inside a face), a single
//! closed edge, or a chain of open halfedges that returns to its starting
//! vertex. Each cycle carries a start offset `s0` in `[0, 1)` so two
//! cycles can be put in rotational correspondence when cross-dissolving.
//!
//! [`ProperCycle`] builds the chain form from an unordered edge set and
//! refuses ambiguity the same way [`crate::path::ProperPath`] does.

use serde::{Deserialize, Serialize};
use vac_geometry::EdgeSample;

use crate::cell::EdgeGeometry;
use crate::error::{Error, Result};
use crate::halfedge::KeyHalfedge;
use crate::keys::{KeyEdgeKey, KeyVertexKey};
use crate::path::substitute;
use crate::time::Time;
use crate::vac::Vac;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CycleKind {
    /// A Steiner vertex: a face-interior point with no edges.
    SingleVertex(KeyVertexKey),
    /// One closed key edge traversed once.
    ClosedEdge(KeyHalfedge),
    /// A chain of open halfedges that closes on itself.
    Edges(Vec<KeyHalfedge>),
}

/// A closed walk with a rotational start offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub kind: CycleKind,
    /// Start offset as a fraction of total arclength, in `[0, 1)`.
    pub s0: f64,
}

impl Cycle {
    pub fn single_vertex(v: KeyVertexKey) -> Self {
        Self {
            kind: CycleKind::SingleVertex(v),
            s0: 0.0,
        }
    }

    pub fn closed_edge(he: KeyHalfedge) -> Self {
        Self {
            kind: CycleKind::ClosedEdge(he),
            s0: 0.0,
        }
    }

    pub fn from_halfedges(hes: Vec<KeyHalfedge>) -> Self {
        Self {
            kind: CycleKind::Edges(hes),
            s0: 0.0,
        }
    }

    pub fn with_start(mut self, s0: f64) -> Self {
        self.s0 = s0.rem_euclid(1.0);
        self
    }

    /// The vertex this cycle references directly, for the Steiner form.
    pub fn steiner_vertex(&self) -> Option<KeyVertexKey> {
        match &self.kind {
            CycleKind::SingleVertex(v) => Some(*v),
            _ => None,
        }
    }

    /// The key edges this cycle traverses, in walk order.
    pub fn edges(&self) -> Vec<KeyEdgeKey> {
        match &self.kind {
            CycleKind::SingleVertex(_) => Vec::new(),
            CycleKind::ClosedEdge(he) => vec![he.edge],
            CycleKind::Edges(hes) => hes.iter().map(|he| he.edge).collect(),
        }
    }

    pub fn time(&self, vac: &Vac) -> Result<Time> {
        match &self.kind {
            CycleKind::SingleVertex(v) => Ok(vac.try_key_vertex(*v)?.time),
            CycleKind::ClosedEdge(he) => he.time(vac),
            CycleKind::Edges(hes) => match hes.first() {
                Some(he) => he.time(vac),
                None => Err(Error::EmptyEdgeSet),
            },
        }
    }

    /// Verifies the cycle is well-formed at `time`: cells exist at that
    /// instant, the chain form closes on itself, and no vertex repeats
    /// before the closing edge.
    pub fn check(&self, vac: &Vac, time: Time) -> Result<()> {
        match &self.kind {
            CycleKind::SingleVertex(v) => {
                let data = vac.try_key_vertex(*v)?;
                if data.time != time {
                    return Err(Error::TimeMismatch {
                        expected: time,
                        found: data.time,
                    });
                }
                Ok(())
            }
            CycleKind::ClosedEdge(he) => {
                let t = he.time(vac)?;
                if t != time {
                    return Err(Error::TimeMismatch {
                        expected: time,
                        found: t,
                    });
                }
                if !he.is_closed(vac)? {
                    return Err(Error::NotClosed);
                }
                Ok(())
            }
            CycleKind::Edges(hes) => {
                if hes.is_empty() {
                    return Err(Error::EmptyEdgeSet);
                }
                let first_start = hes[0]
                    .start_vertex(vac)?
                    .ok_or(Error::ClosedEdgeInChain)?;
                let mut visited = vec![first_start];
                let mut prev_end = first_start;
                for (i, he) in hes.iter().enumerate() {
                    let t = he.time(vac)?;
                    if t != time {
                        return Err(Error::TimeMismatch {
                            expected: time,
                            found: t,
                        });
                    }
                    let start = he.start_vertex(vac)?.ok_or(Error::ClosedEdgeInChain)?;
                    if start != prev_end {
                        return Err(Error::DisconnectedChain { consumed: i });
                    }
                    let end = he.end_vertex(vac)?.ok_or(Error::ClosedEdgeInChain)?;
                    let closing = i + 1 == hes.len();
                    if closing {
                        if end != first_start {
                            return Err(Error::NotClosed);
                        }
                    } else {
                        if visited.contains(&end) {
                            return Err(Error::RepeatedVertex);
                        }
                        visited.push(end);
                    }
                    prev_end = end;
                }
                Ok(())
            }
        }
    }

    /// Total arclength, zero for a Steiner vertex.
    pub fn length(&self, vac: &Vac) -> Result<f64> {
        match &self.kind {
            CycleKind::SingleVertex(_) => Ok(0.0),
            CycleKind::ClosedEdge(he) => he.length(vac),
            CycleKind::Edges(hes) => {
                let mut total = 0.0;
                for he in hes {
                    total += he.length(vac)?;
                }
                Ok(total)
            }
        }
    }

    /// The closed polyline this cycle traces, without the closing
    /// duplicate sample.
    fn loop_samples(&self, vac: &Vac) -> Result<Vec<EdgeSample>> {
        match &self.kind {
            CycleKind::SingleVertex(v) => {
                let data = vac.try_key_vertex(*v)?;
                Ok(vec![EdgeSample::new(data.position, data.size)])
            }
            CycleKind::ClosedEdge(he) => {
                let edge = vac.try_key_edge(he.edge)?;
                let mut samples = edge.geometry.samples().to_vec();
                if !he.side {
                    samples.reverse();
                }
                if samples.len() > 1 && samples.first().map(|s| s.position)
                    == samples.last().map(|s| s.position)
                {
                    samples.pop();
                }
                Ok(samples)
            }
            CycleKind::Edges(hes) => {
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
                // The closing joint duplicates the first sample
                if out.len() > 1 {
                    out.pop();
                }
                Ok(out)
            }
        }
    }

    /// `n` uniformly spaced samples around the loop, starting at the
    /// offset `s0`: the sample list is rotated by `floor(n*s0 + 0.5)`
    /// positions so two cycles sampled with matched offsets align for
    /// cross-dissolve.
    pub fn sample(&self, vac: &Vac, n: usize) -> Result<Vec<EdgeSample>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let polyline = self.loop_samples(vac)?;
        if polyline.len() == 1 {
            return Ok(vec![polyline[0]; n]);
        }

        // Close the polyline to measure the full loop length
        let mut closed = polyline;
        if let Some(first) = closed.first().copied() {
            closed.push(first);
        }
        let geometry = EdgeGeometry::new(closed);
        let total = geometry.length();

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let s = total * i as f64 / n as f64;
            match geometry.sample_at(s) {
                Some(sample) => out.push(sample),
                None => return Err(Error::EmptyEdgeSet),
            }
        }

        let k = ((n as f64 * self.s0 + 0.5).floor() as usize) % n;
        out.rotate_left(k);
        Ok(out)
    }

    pub fn replace_vertex(&mut self, old: KeyVertexKey, new: KeyVertexKey) {
        if let CycleKind::SingleVertex(v) = &mut self.kind {
            if *v == old {
                *v = new;
            }
        }
    }

    /// Rewrites every traversal of `old` as a traversal of `replacement`,
    /// orientation-adjusted. `closed_replacement` says whether the (then
    /// necessarily single) replacement halfedge is itself a closed edge;
    /// a closed-edge cycle stays in that form only in that case, otherwise
    /// it becomes a chain. Cutting a closed edge once yields a single open
    /// loop edge, and the cycle must switch to the chain form for it.
    pub fn replace_edge(
        &mut self,
        old: KeyEdgeKey,
        replacement: &[KeyHalfedge],
        closed_replacement: bool,
    ) {
        if let CycleKind::ClosedEdge(he) = &self.kind {
            let he = *he;
            if he.edge == old {
                let chain = substitute(&[he], old, replacement);
                self.kind = match chain[..] {
                    [r] if closed_replacement => CycleKind::ClosedEdge(r),
                    _ => CycleKind::Edges(chain),
                };
            }
        } else if let CycleKind::Edges(hes) = &mut self.kind {
            *hes = substitute(hes, old, replacement);
        }
    }
}

/// A cycle built from an unordered set of key edges by greedy chaining.
#[derive(Debug, Clone, PartialEq)]
pub struct ProperCycle {
    cycle: Cycle,
}

impl ProperCycle {
    /// Chains `edges` into a closed walk starting at the first edge of the
    /// slice. A single closed edge is accepted as-is; otherwise every edge
    /// must be open, the walk must consume the whole set, return to its
    /// starting vertex, and never branch or revisit a vertex.
    pub fn from_edges(vac: &Vac, edges: &[KeyEdgeKey]) -> Result<Self> {
        let (first, rest) = edges.split_first().ok_or(Error::EmptyEdgeSet)?;
        let first_data = vac.try_key_edge(*first)?;

        if first_data.is_closed() {
            if !rest.is_empty() {
                return Err(Error::ClosedEdgeInChain);
            }
            return Ok(Self {
                cycle: Cycle::closed_edge(KeyHalfedge::new(*first, true)),
            });
        }
        for e in rest {
            if vac.try_key_edge(*e)?.is_closed() {
                return Err(Error::ClosedEdgeInChain);
            }
        }

        let (start, mut at) = first_data.boundary.ok_or(Error::ClosedEdgeInChain)?;
        let mut unused: Vec<KeyEdgeKey> = rest.to_vec();
        let mut chain = vec![KeyHalfedge::new(*first, true)];
        let mut visited = vec![start];

        while !unused.is_empty() {
            if at == start {
                // Back at the start with edges left over
                return Err(Error::DisconnectedChain {
                    consumed: chain.len(),
                });
            }
            if visited.contains(&at) {
                return Err(Error::RepeatedVertex);
            }
            visited.push(at);

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
            match candidates {
                0 => {
                    return Err(Error::DisconnectedChain {
                        consumed: chain.len(),
                    })
                }
                1 => {
                    let (i, he) = found.ok_or(Error::NotClosed)?;
                    unused.remove(i);
                    at = he.end_vertex(vac)?.ok_or(Error::ClosedEdgeInChain)?;
                    chain.push(he);
                }
                _ => {
                    return Err(Error::BranchingChain {
                        consumed: chain.len(),
                        candidates,
                    })
                }
            }
        }

        if at != start {
            return Err(Error::NotClosed);
        }
        Ok(Self {
            cycle: Cycle::from_halfedges(chain),
        })
    }

    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    pub fn into_cycle(self) -> Cycle {
        self.cycle
    }
}
