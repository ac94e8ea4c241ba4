// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Endpoint trajectories for open inbetween edges.
//!
//! An [`AnimatedVertex`] is a non-empty chain of inbetween vertices glued
//! end to end in time: the `after` key vertex of each link is the `before`
//! key vertex of the next. It describes where an open inbetween edge's
//! endpoint is at any instant of the edge's life span.

use serde::{Deserialize, Serialize};
use vac_geometry::Point2;

use crate::error::{Error, Result};
use crate::keys::{InbetweenVertexKey, KeyVertexKey};
use crate::sampling::inbetween_vertex_pos;
use crate::time::Time;
use crate::vac::Vac;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimatedVertex {
    chain: Vec<InbetweenVertexKey>,
}

impl AnimatedVertex {
    pub fn new(chain: Vec<InbetweenVertexKey>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &[InbetweenVertexKey] {
        &self.chain
    }

    /// Verifies the chain is non-empty and connected: each link's after
    /// vertex is the next link's before vertex.
    pub fn check(&self, vac: &Vac) -> Result<()> {
        if self.chain.is_empty() {
            return Err(Error::DisconnectedVertexChain(0));
        }
        for (i, pair) in self.chain.windows(2).enumerate() {
            let prev = vac.try_inbetween_vertex(pair[0])?;
            let next = vac.try_inbetween_vertex(pair[1])?;
            if prev.after != next.before {
                return Err(Error::DisconnectedVertexChain(i + 1));
            }
        }
        vac.try_inbetween_vertex(self.chain[self.chain.len() - 1])?;
        Ok(())
    }

    /// The key vertex the trajectory starts at.
    pub fn before_vertex(&self, vac: &Vac) -> Result<KeyVertexKey> {
        let first = self.chain.first().ok_or(Error::DisconnectedVertexChain(0))?;
        Ok(vac.try_inbetween_vertex(*first)?.before)
    }

    /// The key vertex the trajectory ends at.
    pub fn after_vertex(&self, vac: &Vac) -> Result<KeyVertexKey> {
        let last = self.chain.last().ok_or(Error::DisconnectedVertexChain(0))?;
        Ok(vac.try_inbetween_vertex(*last)?.after)
    }

    pub fn before_time(&self, vac: &Vac) -> Result<Time> {
        Ok(vac.try_key_vertex(self.before_vertex(vac)?)?.time)
    }

    pub fn after_time(&self, vac: &Vac) -> Result<Time> {
        Ok(vac.try_key_vertex(self.after_vertex(vac)?)?.time)
    }

    /// Position at time `t`, clamped to the trajectory's first and last
    /// key positions outside its life span.
    pub fn pos(&self, vac: &Vac, t: Time) -> Result<Point2<f64>> {
        let first = self.chain.first().ok_or(Error::DisconnectedVertexChain(0))?;
        let before = vac.try_key_vertex(vac.try_inbetween_vertex(*first)?.before)?;
        if t <= before.time {
            return Ok(before.position);
        }
        for iv in &self.chain {
            let data = vac.try_inbetween_vertex(*iv)?;
            let t1 = vac.try_key_vertex(data.after)?.time;
            if t <= t1 {
                return inbetween_vertex_pos(vac, *iv, t);
            }
        }
        let last = self.chain.last().ok_or(Error::DisconnectedVertexChain(0))?;
        let after = vac.try_key_vertex(vac.try_inbetween_vertex(*last)?.after)?;
        Ok(after.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn chain_must_connect() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(5), Point2::new(5.0, 0.0));
        let v2 = vac.new_key_vertex(Time::frame(10), Point2::new(10.0, 0.0));
        let v_other = vac.new_key_vertex(Time::frame(5), Point2::new(0.0, 9.0));

        let iv0 = vac.new_inbetween_vertex(v0, v1).unwrap();
        let iv1 = vac.new_inbetween_vertex(v1, v2).unwrap();
        let iv_bad = vac.new_inbetween_vertex(v_other, v2).unwrap();

        let good = AnimatedVertex::new(vec![iv0, iv1]);
        good.check(&vac).unwrap();
        assert_eq!(good.before_vertex(&vac).unwrap(), v0);
        assert_eq!(good.after_vertex(&vac).unwrap(), v2);

        let bad = AnimatedVertex::new(vec![iv0, iv_bad]);
        assert!(matches!(
            bad.check(&vac),
            Err(Error::DisconnectedVertexChain(1))
        ));

        let empty = AnimatedVertex::new(Vec::new());
        assert!(empty.check(&vac).is_err());
    }

    #[test]
    fn pos_clamps_outside_life_span() {
        let mut vac = Vac::new();
        let v0 = vac.new_key_vertex(Time::frame(0), Point2::new(0.0, 0.0));
        let v1 = vac.new_key_vertex(Time::frame(10), Point2::new(10.0, 0.0));
        let iv = vac.new_inbetween_vertex(v0, v1).unwrap();
        let anim = AnimatedVertex::new(vec![iv]);

        let early = anim.pos(&vac, Time::frame(-3)).unwrap();
        assert_relative_eq!(early.x, 0.0);
        let late = anim.pos(&vac, Time::frame(20)).unwrap();
        assert_relative_eq!(late.x, 10.0);

        // Interior interpolation hits the endpoints exactly
        let at_start = anim.pos(&vac, Time::frame(0)).unwrap();
        assert_relative_eq!(at_start.x, 0.0);
        let at_end = anim.pos(&vac, Time::frame(10)).unwrap();
        assert_relative_eq!(at_end.x, 10.0);
    }
}
