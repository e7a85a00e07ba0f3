#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded region fill and paced batching of cell writes.
//!
//! Large edits are never applied locally. They are collected here, split into
//! fixed-size `place_batch` requests and released on a timer so a single
//! gesture cannot flood the connection.

use std::{collections::VecDeque, time::Duration};

use thiserror::Error;
use tribe_war_core::{
    protocol::{ClientRequest, Placement},
    CellCode, CellCoord, Grid, GRID_CELL_COUNT,
};

/// Maximum number of cells a single fill collects.
pub const MAX_FILL_CELLS: usize = 5_000;

/// Number of placements carried by each paced batch.
pub const BATCH_SIZE: usize = 500;

/// Delay between consecutive paced batches.
pub const BATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Reasons a fill request is refused before any traversal happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FillError {
    /// The start cell lies outside the grid.
    #[error("fill start ({column}, {row}) is outside the grid")]
    OutOfBounds {
        /// Requested column.
        column: u32,
        /// Requested row.
        row: u32,
    },
    /// Only the first two terrain variants can be poured.
    #[error("cannot fill with cell code {0}")]
    UnsupportedFill(u8),
    /// The start cell holds something other than empty or the first two terrains.
    #[error("cannot start a fill on cell code {0}")]
    UnfillableStart(u8),
}

/// Region collected by [`flood_fill`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FloodFill {
    target: u8,
    fill: CellCode,
    cells: Vec<CellCoord>,
    truncated: bool,
}

impl FloodFill {
    /// Raw code shared by every collected cell before the fill.
    #[must_use]
    pub const fn target(&self) -> u8 {
        self.target
    }

    /// Code the region is painted with.
    #[must_use]
    pub const fn fill(&self) -> CellCode {
        self.fill
    }

    /// Collected cells in breadth-first order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Reports whether traversal stopped at [`MAX_FILL_CELLS`] with cells left.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    /// Converts the region into paced `place_batch` requests.
    #[must_use]
    pub fn into_schedule(self) -> BatchSchedule {
        let fill = self.fill;
        BatchSchedule::paced(
            self.cells
                .into_iter()
                .map(|cell| Placement::new(cell, fill))
                .collect(),
        )
    }
}

/// Collects the 4-connected region sharing the start cell's value.
///
/// Neighbours are visited left, right, up, down. Traversal halts once
/// [`MAX_FILL_CELLS`] cells have been collected; this truncates the region
/// rather than failing. The grid is not modified.
pub fn flood_fill(grid: &Grid, start: CellCoord, fill: CellCode) -> Result<FloodFill, FillError> {
    if !matches!(fill, CellCode::Grass | CellCode::Snow) {
        return Err(FillError::UnsupportedFill(fill.code()));
    }
    let target = grid.raw(start).ok_or(FillError::OutOfBounds {
        column: start.column(),
        row: start.row(),
    })?;
    if !matches!(
        CellCode::from_code(target),
        Some(CellCode::Empty | CellCode::Grass | CellCode::Snow)
    ) {
        return Err(FillError::UnfillableStart(target));
    }

    let mut visited = vec![false; GRID_CELL_COUNT];
    let mut queue = VecDeque::new();
    let mut cells = Vec::new();
    let _ = mark(&mut visited, start);
    queue.push_back(start);

    while cells.len() < MAX_FILL_CELLS {
        let Some(cell) = queue.pop_front() else {
            break;
        };
        cells.push(cell);
        for neighbor in cell.orthogonal_neighbors() {
            if grid.raw(neighbor) == Some(target) && mark(&mut visited, neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    Ok(FloodFill {
        target,
        fill,
        cells,
        truncated: !queue.is_empty(),
    })
}

fn mark(visited: &mut [bool], cell: CellCoord) -> bool {
    match cell.index().and_then(|index| visited.get_mut(index)) {
        Some(seen) if !*seen => {
            *seen = true;
            true
        }
        _ => false,
    }
}

/// Sequence of `place_batch` requests released one per interval.
///
/// The first batch is due immediately; each following batch is due one
/// interval after the previous one. Acknowledgements are never awaited.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSchedule {
    batches: VecDeque<Vec<Placement>>,
    interval: Duration,
}

impl BatchSchedule {
    /// Splits placements into [`BATCH_SIZE`] chunks paced by [`BATCH_INTERVAL`].
    #[must_use]
    pub fn paced(placements: Vec<Placement>) -> Self {
        Self::with_shape(placements, BATCH_SIZE, BATCH_INTERVAL)
    }

    /// Splits placements into chunks of `size` separated by `interval`.
    #[must_use]
    pub fn with_shape(placements: Vec<Placement>, size: usize, interval: Duration) -> Self {
        let size = size.max(1);
        let batches = placements
            .chunks(size)
            .map(<[Placement]>::to_vec)
            .collect();
        Self { batches, interval }
    }

    /// Delay between consecutive batches.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of batches still waiting to be sent.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }

    /// Reports whether every batch has been released.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Releases the next batch as a ready-to-send request.
    pub fn next_request(&mut self) -> Option<ClientRequest> {
        self.batches
            .pop_front()
            .map(|places| ClientRequest::PlaceBatch { places })
    }
}

impl Iterator for BatchSchedule {
    type Item = ClientRequest;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_request()
    }
}
