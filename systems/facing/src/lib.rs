#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Infers entity facings from consecutive grid snapshots.
//!
//! The server never identifies entities, only cell codes, so facings are keyed
//! by position. An entity that appears next to a cell its own code just left is
//! assumed to have walked from there; anything else keeps whatever facing the
//! position already had, or the archetype default.

use std::collections::HashMap;

use tribe_war_core::{CellCode, CellCoord, Event, Facing, Grid, GRID_SIZE};

/// Tracks per-position facings across redraws.
#[derive(Debug, Default)]
pub struct FacingTracker {
    previous: Option<Grid>,
    facings: HashMap<CellCoord, Facing>,
}

impl FacingTracker {
    /// Creates a tracker with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reacts to world events, dropping history when the grid is cleared.
    pub fn handle(&mut self, events: &[Event]) {
        if events.iter().any(|event| matches!(event, Event::GridCleared)) {
            self.forget();
        }
    }

    /// Runs inference against the previous snapshot, then remembers `current`.
    ///
    /// Inference is skipped when there is no previous snapshot, such as right
    /// after [`FacingTracker::forget`].
    pub fn observe(&mut self, current: &Grid) {
        if let Some(previous) = &self.previous {
            let updated = infer(previous, current, &mut self.facings);
            tracing::trace!(updated, tracked = self.facings.len(), "facings inferred");
        }
        self.previous = Some(current.clone());
    }

    /// Facing recorded for the provided position, if any.
    #[must_use]
    pub fn facing_at(&self, cell: CellCoord) -> Option<Facing> {
        self.facings.get(&cell).copied()
    }

    /// Facing a sprite at `cell` should be drawn with.
    #[must_use]
    pub fn render_facing(&self, cell: CellCoord) -> Facing {
        self.facing_at(cell).unwrap_or_default()
    }

    /// Number of positions with a recorded facing.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.facings.len()
    }

    /// Drops all recorded facings and the previous snapshot.
    pub fn forget(&mut self) {
        self.facings.clear();
        self.previous = None;
        tracing::debug!("facing history cleared");
    }
}

/// Updates `facings` for every entity cell in `current`.
///
/// A left neighbour that held the same code in `previous` and no longer does
/// records [`Facing::Right`]; the mirrored right-neighbour case records
/// [`Facing::Left`]. The left check wins when both apply. Positions without a
/// horizontal signal keep their facing, or receive the archetype default when
/// none was recorded. Returns the number of positions written.
pub fn infer(previous: &Grid, current: &Grid, facings: &mut HashMap<CellCoord, Facing>) -> usize {
    let mut updated = 0;
    for (cell, raw) in current.iter() {
        let Some(CellCode::Entity(archetype)) = CellCode::from_code(raw) else {
            continue;
        };

        let moved_from = |columns: i32| {
            cell.offset(columns, 0).is_some_and(|neighbor| {
                previous.raw(neighbor) == Some(raw) && current.raw(neighbor) != Some(raw)
            })
        };

        let detected = if cell.column() > 0 && moved_from(-1) {
            Some(Facing::Right)
        } else if cell.column() + 1 < GRID_SIZE && moved_from(1) {
            Some(Facing::Left)
        } else {
            None
        };

        match detected {
            Some(facing) => {
                let _ = facings.insert(cell, facing);
                updated += 1;
            }
            None => {
                if !facings.contains_key(&cell) {
                    let _ = facings.insert(cell, archetype.default_facing());
                    updated += 1;
                }
            }
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_war_core::TribeArchetype;

    #[test]
    fn unknown_codes_are_ignored() {
        let mut bytes = vec![0; tribe_war_core::GRID_CELL_COUNT];
        bytes[0] = 99;
        let grid = Grid::from_bytes(bytes).expect("full snapshot");
        let mut facings = HashMap::new();

        assert_eq!(infer(&grid, &grid, &mut facings), 0);
        assert!(facings.is_empty());
    }

    #[test]
    fn default_is_written_once() {
        let mut grid = Grid::empty();
        assert!(grid.set(
            CellCoord::new(10, 10),
            CellCode::Entity(TribeArchetype::Sylvania)
        ));
        let mut facings = HashMap::new();

        assert_eq!(infer(&grid, &grid, &mut facings), 1);
        assert_eq!(infer(&grid, &grid, &mut facings), 0);
        assert_eq!(facings.get(&CellCoord::new(10, 10)), Some(&Facing::Left));
    }
}
