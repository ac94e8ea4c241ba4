// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Drawing order of cells.
//!
//! Every cell holds one slot in a bottom-to-top list that determines
//! rendering order. A new cell is inserted just below the lowest cell of
//! its boundary, so a face slides under the edges that bound it and an
//! edge under its endpoint vertices. The raise/lower operations move a
//! selection past the nearest cell that visually overlaps it, dragging
//! along the cells that must stay on the same side: the selection's
//! boundary when raising, its dependents when lowering. This keeps
//! boundary cells drawn above the cells they bound no matter how far a
//! selection travels.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::Result;
use crate::keys::CellId;
use crate::query::{merge, BBox};
use crate::vac::Vac;

fn overlaps(a: BBox, b: BBox) -> bool {
    a.0 <= b.1 && b.0 <= a.1 && a.2 <= b.3 && b.2 <= a.3
}

impl Vac {
    /// The drawing order, bottom to top.
    pub fn depth_order(&self) -> &[CellId] {
        &self.depth_order
    }

    /// Position of a cell in the drawing order.
    pub fn depth_index(&self, id: CellId) -> Option<usize> {
        self.depth_order.iter().position(|c| *c == id)
    }

    /// Inserts a freshly created cell just below the lowest cell of its
    /// boundary. Cells with an empty boundary go on top.
    pub(crate) fn depth_insert(&mut self, id: CellId) {
        let boundary: FxHashSet<CellId> = self.boundary_cells(id).into_iter().collect();
        let at = if boundary.is_empty() {
            self.depth_order.len()
        } else {
            self.depth_order
                .iter()
                .position(|c| boundary.contains(c))
                .unwrap_or(self.depth_order.len())
        };
        self.depth_order.insert(at, id);
    }

    pub(crate) fn depth_remove(&mut self, id: CellId) {
        self.depth_order.retain(|c| *c != id);
    }

    /// Moves the cells one step up: just above the lowest cell above them
    /// that visually overlaps them. Their boundary closure travels along.
    pub fn raise(&mut self, cells: &[CellId]) -> Result<()> {
        let targets = self.live_set(cells);
        if targets.is_empty() {
            return Ok(());
        }
        let seeds: Vec<CellId> = targets.iter().copied().collect();
        let block: FxHashSet<CellId> = self.boundary_closure(&seeds).into_iter().collect();
        let boxes = self.target_bboxes(&targets)?;

        let mut list = std::mem::take(&mut self.depth_order);
        let outcome = self.shift_pass(&mut list, &targets, &block, &boxes, true);
        self.depth_order = list;
        debug!(cells = targets.len(), "raised cells");
        outcome
    }

    /// Moves the cells one step down: just below the highest cell below
    /// them that visually overlaps them. Their dependents travel along.
    pub fn lower(&mut self, cells: &[CellId]) -> Result<()> {
        let targets = self.live_set(cells);
        if targets.is_empty() {
            return Ok(());
        }
        let seeds: Vec<CellId> = targets.iter().copied().collect();
        let block: FxHashSet<CellId> = self.dependents_closure(&seeds).into_iter().collect();
        let boxes = self.target_bboxes(&targets)?;

        // Run the upward pass on the reversed list
        let mut list = std::mem::take(&mut self.depth_order);
        list.reverse();
        let outcome = self.shift_pass(&mut list, &targets, &block, &boxes, false);
        list.reverse();
        self.depth_order = list;
        debug!(cells = targets.len(), "lowered cells");
        outcome
    }

    /// Moves the cells and their boundary closure to the top.
    pub fn raise_to_top(&mut self, cells: &[CellId]) -> Result<()> {
        let targets = self.live_set(cells);
        if targets.is_empty() {
            return Ok(());
        }
        let seeds: Vec<CellId> = targets.iter().copied().collect();
        let block: FxHashSet<CellId> = self.boundary_closure(&seeds).into_iter().collect();
        let (moved, rest): (Vec<CellId>, Vec<CellId>) = self
            .depth_order
            .iter()
            .partition(|id| block.contains(*id));
        self.depth_order = rest;
        self.depth_order.extend(moved);
        Ok(())
    }

    /// Moves the cells and their dependents to the bottom.
    pub fn lower_to_bottom(&mut self, cells: &[CellId]) -> Result<()> {
        let targets = self.live_set(cells);
        if targets.is_empty() {
            return Ok(());
        }
        let seeds: Vec<CellId> = targets.iter().copied().collect();
        let block: FxHashSet<CellId> = self.dependents_closure(&seeds).into_iter().collect();
        let (moved, mut rest): (Vec<CellId>, Vec<CellId>) = self
            .depth_order
            .iter()
            .partition(|id| block.contains(*id));
        let mut order = moved;
        order.append(&mut rest);
        self.depth_order = order;
        Ok(())
    }

    fn live_set(&self, cells: &[CellId]) -> FxHashSet<CellId> {
        cells.iter().copied().filter(|id| self.contains(*id)).collect()
    }

    fn target_bboxes(&self, targets: &FxHashSet<CellId>) -> Result<Vec<BBox>> {
        let mut out = Vec::new();
        for id in targets {
            if let Some(b) = self.life_bbox(*id)? {
                out.push(b);
            }
        }
        Ok(out)
    }

    /// Bounding box of everything a cell draws over its whole life:
    /// key cells at their own instant, inbetween cells approximated by
    /// the union over the key cells in their boundary closure.
    fn life_bbox(&self, id: CellId) -> Result<Option<BBox>> {
        match id {
            CellId::KeyVertex(_) | CellId::KeyEdge(_) | CellId::KeyFace(_) => {
                let (t, _) = self.life_span(id)?;
                self.bounding_box(id, t)
            }
            _ => {
                let mut out = None;
                for b in self.boundary_closure(&[id]) {
                    if matches!(
                        b,
                        CellId::KeyVertex(_) | CellId::KeyEdge(_) | CellId::KeyFace(_)
                    ) {
                        let (t, _) = self.life_span(b)?;
                        out = merge(out, self.bounding_box(b, t)?);
                    }
                }
                Ok(out)
            }
        }
    }

    fn intersects_targets(&self, id: CellId, boxes: &[BBox]) -> Result<bool> {
        let Some(b) = self.life_bbox(id)? else {
            return Ok(false);
        };
        Ok(boxes.iter().any(|t| overlaps(b, *t)))
    }

    /// One upward shift of `targets` through `list`, dragging the cells
    /// in `block` along. The stop cell is the first cell above the last
    /// target that is outside the block and overlaps a target; the moved
    /// cells land just above it, or above the highest cell of its
    /// boundary (`stop_below_boundary`) respectively star that is not in
    /// the block, whichever is higher.
    fn shift_pass(
        &self,
        list: &mut Vec<CellId>,
        targets: &FxHashSet<CellId>,
        block: &FxHashSet<CellId>,
        boxes: &[BBox],
        stop_below_boundary: bool,
    ) -> Result<()> {
        let n = targets.len();
        let Some(start) = list.iter().position(|id| targets.contains(id)) else {
            return Ok(());
        };
        let mut moved = vec![list.remove(start)];
        let mut n_found = 1;
        let mut i = start;

        // Walk up collecting the block until the stop cell appears
        let mut stop: Option<CellId> = None;
        while i < list.len() {
            let id = list[i];
            if targets.contains(&id) {
                moved.push(list.remove(i));
                n_found += 1;
            } else if block.contains(&id) {
                moved.push(list.remove(i));
            } else if n_found == n && self.intersects_targets(id, boxes)? {
                stop = Some(id);
                break;
            } else {
                i += 1;
            }
        }
        let Some(stop) = stop else {
            list.extend(moved);
            return Ok(());
        };

        // The landing slot: above the highest cell tied to the stop cell
        // that is not moving with us, but at least above the stop cell
        let tied: FxHashSet<CellId> = if stop_below_boundary {
            self.boundary_cells(stop).into_iter().collect()
        } else {
            self.star_cells(stop).into_iter().collect()
        };
        let mut j = list.len() - 1;
        while j != i {
            if tied.contains(&list[j]) && !block.contains(&list[j]) {
                break;
            }
            j -= 1;
        }

        // Pull the rest of the block out from underneath the landing slot
        while i != j {
            if block.contains(&list[i]) {
                moved.push(list.remove(i));
                j -= 1;
            } else {
                i += 1;
            }
        }

        let at = j + 1;
        list.splice(at..at, moved);
        Ok(())
    }
}
