use std::collections::BTreeSet;

use crate::cell::{Cell, CellKey};

/// Record of cell keys already requested since the last grid reset.
///
/// Notes on determinism:
/// - Keys live in a `BTreeSet` for stable traversal order.
/// - The table only ever grows between resets; a reset happens exactly
///   when the grid origin changes (zoom) or on explicit invalidation.
#[derive(Debug, Default, Clone)]
pub struct SeenCells {
    seen: BTreeSet<CellKey>,
}

impl SeenCells {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn contains(&self, key: CellKey) -> bool {
        self.seen.contains(&key)
    }

    /// Drops cells whose key was already requested and records the
    /// survivors.
    ///
    /// With `dedupe` disabled every cell passes through and the table is
    /// left untouched: the force-refetch path for upstream filter changes
    /// that do not move the origin.
    pub fn filter(&mut self, cells: Vec<Cell>, dedupe: bool) -> Vec<Cell> {
        if !dedupe {
            return cells;
        }

        cells
            .into_iter()
            .filter(|cell| self.seen.insert(cell.key))
            .collect()
    }

    /// Forgets every recorded key; required whenever the origin moves,
    /// since keys computed against the old origin would wrongly suppress
    /// newly-relevant cells.
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
