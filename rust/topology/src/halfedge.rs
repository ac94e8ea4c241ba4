// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Directed views of key edges.
//!
//! A [`KeyHalfedge`] is an (edge, side) pair: `side == true` traverses the
//! edge start→end, `false` traverses it end→start. Halfedges never own the
//! edge; all queries resolve through the arena.

use serde::{Deserialize, Serialize};
use vac_geometry::EdgeSample;

use crate::error::Result;
use crate::keys::{KeyEdgeKey, KeyVertexKey};
use crate::time::Time;
use crate::vac::Vac;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyHalfedge {
    pub edge: KeyEdgeKey,
    pub side: bool,
}

impl KeyHalfedge {
    pub fn new(edge: KeyEdgeKey, side: bool) -> Self {
        Self { edge, side }
    }

    /// The same edge traversed in the other direction.
    pub fn opposite(&self) -> KeyHalfedge {
        KeyHalfedge {
            edge: self.edge,
            side: !self.side,
        }
    }

    pub fn time(&self, vac: &Vac) -> Result<Time> {
        Ok(vac.try_key_edge(self.edge)?.time)
    }

    pub fn is_closed(&self, vac: &Vac) -> Result<bool> {
        Ok(vac.try_key_edge(self.edge)?.is_closed())
    }

    /// First vertex of the traversal, `None` for a closed edge.
    pub fn start_vertex(&self, vac: &Vac) -> Result<Option<KeyVertexKey>> {
        let edge = vac.try_key_edge(self.edge)?;
        Ok(edge.boundary.map(|(s, e)| if self.side { s } else { e }))
    }

    /// Last vertex of the traversal, `None` for a closed edge.
    pub fn end_vertex(&self, vac: &Vac) -> Result<Option<KeyVertexKey>> {
        let edge = vac.try_key_edge(self.edge)?;
        Ok(edge.boundary.map(|(s, e)| if self.side { e } else { s }))
    }

    pub fn length(&self, vac: &Vac) -> Result<f64> {
        Ok(vac.try_key_edge(self.edge)?.geometry.length())
    }

    /// `n` uniform samples along the traversal direction.
    pub fn samples(&self, vac: &Vac, n: usize) -> Result<Vec<EdgeSample>> {
        let edge = vac.try_key_edge(self.edge)?;
        let mut samples = edge.geometry.resample_uniform(n);
        if !self.side {
            samples.reverse();
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vac_geometry::Point2;

    use crate::cell::EdgeGeometry;

    #[test]
    fn halfedge_resolves_direction() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(10.0, 0.0));
        let geometry =
            EdgeGeometry::line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 1.0, 1.0);
        let e = vac.new_key_open_edge(v0, v1, geometry).unwrap();

        let forward = KeyHalfedge::new(e, true);
        let backward = forward.opposite();

        assert_eq!(forward.start_vertex(&vac).unwrap(), Some(v0));
        assert_eq!(forward.end_vertex(&vac).unwrap(), Some(v1));
        assert_eq!(backward.start_vertex(&vac).unwrap(), Some(v1));
        assert_eq!(backward.end_vertex(&vac).unwrap(), Some(v0));

        let s = backward.samples(&vac, 3).unwrap();
        assert_relative_eq!(s[0].position.x, 10.0);
        assert_relative_eq!(s[2].position.x, 0.0);
        assert_relative_eq!(forward.length(&vac).unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn stale_edge_key_fails_lookup() {
        let mut vac = Vac::new();
        let t = Time::frame(0);
        let v0 = vac.new_key_vertex(t, Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(t, Point2::new(1.0, 0.0));
        let geometry = EdgeGeometry::line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), 1.0, 0.5);
        let e = vac.new_key_open_edge(v0, v1, geometry).unwrap();
        vac.remove_key_edge(e).unwrap();

        let he = KeyHalfedge::new(e, true);
        assert!(he.time(&vac).is_err());
    }
}
