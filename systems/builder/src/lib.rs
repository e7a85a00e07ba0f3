#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Phase machine driving the custom map builder.
//!
//! The builder owns the workflow state (phase, active tool, brush, tribe
//! assignments) and turns paint gestures into outbound requests. It never
//! touches the grid itself; callers hand it the current snapshot and apply
//! whatever local preview it asks for.

use std::{collections::BTreeMap, time::Duration};

use thiserror::Error;
use tribe_war_core::{
    protocol::{ClientRequest, Placement},
    BuilderPhase, CellCode, CellCoord, Grid, TribeArchetype, GRID_SIZE,
};
use tribe_war_system_flood_fill::{flood_fill, BatchSchedule, FillError};

/// Minimum delay between two accepted paint gestures.
pub const PAINT_THROTTLE: Duration = Duration::from_millis(100);

/// Brush edge length selected when the builder starts.
pub const DEFAULT_BRUSH_SIZE: u32 = 1;

const MAX_BRUSH_SIZE: u32 = 9;

/// Local rejections raised by the builder. None of them produce network traffic.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuilderError {
    /// The tool is not whitelisted for the current phase.
    #[error("tool {tool:?} is not available during {phase}")]
    ToolNotPermitted {
        /// Rejected tool.
        tool: CellCode,
        /// Phase that rejected it.
        phase: BuilderPhase,
    },
    /// The phase does not allow any painting.
    #[error("painting is locked during {phase}")]
    PaintingLocked {
        /// Current phase.
        phase: BuilderPhase,
    },
    /// Fill mode only pours the first two terrain variants.
    #[error("fill is only supported for grass and snow, not {tool:?}")]
    FillUnsupportedTool {
        /// Active tool when the fill was attempted.
        tool: CellCode,
    },
    /// The flood fill refused its start cell.
    #[error(transparent)]
    Fill(#[from] FillError),
    /// Brush sizes must lie within the supported range.
    #[error("brush size {0} is outside 1..={max}", max = MAX_BRUSH_SIZE)]
    InvalidBrushSize(u32),
    /// Leaving the terrain phase requires at least one painted terrain.
    #[error("paint at least one terrain type first")]
    NoTerrainPainted,
    /// Finalizing requires at least one tribe assignment.
    #[error("assign at least one tribe to a terrain")]
    NoTribeAssigned,
    /// A finalize request is awaiting the server's answer.
    #[error("map finalization is already in progress")]
    FinalizePending,
    /// The simulation phase is terminal.
    #[error("the simulation is already running")]
    SimulationRunning,
    /// The action is only available in another phase.
    #[error("not available during {phase}")]
    WrongPhase {
        /// Current phase.
        phase: BuilderPhase,
    },
    /// Tribes can only be assigned to painted terrain variants.
    #[error("terrain {terrain:?} is not painted on the map")]
    TerrainNotPresent {
        /// Requested terrain.
        terrain: CellCode,
    },
    /// Automatic borders found no boundary between different terrains.
    #[error("no boundaries between different terrains were found")]
    NoBordersGenerated,
}

/// Result of a successful [`Builder::advance`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum Advance {
    /// The builder moved to the contained phase.
    Moved(BuilderPhase),
    /// The user declined to continue without borders.
    Declined,
    /// The map must be submitted; the phase changes once the server answers.
    Finalize(ClientRequest),
}

/// Outbound traffic produced by a paint gesture.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintPlan {
    /// A single brush stamp.
    Brush(ClientRequest),
    /// A flood fill released as paced batches.
    Fill(BatchSchedule),
}

/// Map builder workflow state.
#[derive(Clone, Debug)]
pub struct Builder {
    phase: BuilderPhase,
    tool: CellCode,
    brush_size: u32,
    fill_mode: bool,
    assignments: BTreeMap<CellCode, TribeArchetype>,
    finalize_pending: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder in the terrain phase with the grass tool selected.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: BuilderPhase::Terrain,
            tool: CellCode::Grass,
            brush_size: DEFAULT_BRUSH_SIZE,
            fill_mode: false,
            assignments: BTreeMap::new(),
            finalize_pending: false,
        }
    }

    /// Current workflow phase.
    #[must_use]
    pub const fn phase(&self) -> BuilderPhase {
        self.phase
    }

    /// Active paint tool.
    #[must_use]
    pub const fn tool(&self) -> CellCode {
        self.tool
    }

    /// Brush edge length in cells.
    #[must_use]
    pub const fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Reports whether gestures flood fill instead of stamping the brush.
    #[must_use]
    pub const fn fill_mode(&self) -> bool {
        self.fill_mode
    }

    /// Reports whether a finalize request awaits the server's answer.
    #[must_use]
    pub const fn finalize_pending(&self) -> bool {
        self.finalize_pending
    }

    /// Tribe archetypes assigned to terrain variants.
    #[must_use]
    pub fn assignments(&self) -> &BTreeMap<CellCode, TribeArchetype> {
        &self.assignments
    }

    /// Selects the active tool if the current phase whitelists it.
    pub fn select_tool(&mut self, tool: CellCode) -> Result<(), BuilderError> {
        if !self.phase.permits(tool) {
            return Err(BuilderError::ToolNotPermitted {
                tool,
                phase: self.phase,
            });
        }
        self.tool = tool;
        Ok(())
    }

    /// Changes the brush edge length.
    pub fn set_brush_size(&mut self, size: u32) -> Result<(), BuilderError> {
        if !(1..=MAX_BRUSH_SIZE).contains(&size) {
            return Err(BuilderError::InvalidBrushSize(size));
        }
        self.brush_size = size;
        Ok(())
    }

    /// Flips fill mode, returning the new state.
    pub fn toggle_fill_mode(&mut self) -> bool {
        self.fill_mode = !self.fill_mode;
        self.fill_mode
    }

    /// Moves the workflow forward.
    ///
    /// `confirm_without_borders` is consulted only when leaving the border
    /// phase with no border painted. Advancing from tribe configuration does
    /// not change the phase; it yields the `init_custom_map` request and marks
    /// finalization as pending until [`Builder::confirm_finalized`] or
    /// [`Builder::reject_finalize`] is called.
    pub fn advance<F>(&mut self, grid: &Grid, confirm_without_borders: F) -> Result<Advance, BuilderError>
    where
        F: FnOnce() -> bool,
    {
        match self.phase {
            BuilderPhase::Terrain => {
                if !grid.has_terrain() {
                    return Err(BuilderError::NoTerrainPainted);
                }
                Ok(self.enter(BuilderPhase::Borders, grid))
            }
            BuilderPhase::Borders => {
                if !grid.contains(CellCode::Border) && !confirm_without_borders() {
                    return Ok(Advance::Declined);
                }
                Ok(self.enter(BuilderPhase::Features, grid))
            }
            BuilderPhase::Features => Ok(self.enter(BuilderPhase::TribeConfig, grid)),
            BuilderPhase::TribeConfig => {
                if self.finalize_pending {
                    return Err(BuilderError::FinalizePending);
                }
                if self.assignments.is_empty() {
                    return Err(BuilderError::NoTribeAssigned);
                }
                self.finalize_pending = true;
                Ok(Advance::Finalize(ClientRequest::InitCustomMap {
                    terrain: grid.clone(),
                    tribe_assignments: self
                        .assignments
                        .iter()
                        .map(|(terrain, archetype)| (terrain.code().to_string(), *archetype))
                        .collect(),
                }))
            }
            BuilderPhase::Simulation => Err(BuilderError::SimulationRunning),
        }
    }

    fn enter(&mut self, phase: BuilderPhase, grid: &Grid) -> Advance {
        self.phase = phase;
        if !phase.permits(self.tool) {
            if let Some(first) = phase.permitted_tools().first() {
                self.tool = *first;
            }
        }
        if phase == BuilderPhase::TribeConfig {
            self.assignments.retain(|terrain, _| grid.contains(*terrain));
        }
        Advance::Moved(phase)
    }

    /// Steps back one phase. Returns `false` when retreat is unavailable.
    pub fn retreat(&mut self) -> bool {
        if self.finalize_pending {
            return false;
        }
        match self.phase.previous() {
            Some(previous) => {
                self.phase = previous;
                if !previous.permits(self.tool) {
                    if let Some(first) = previous.permitted_tools().first() {
                        self.tool = *first;
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Assigns (or with `None`, unassigns) an archetype to a painted terrain.
    pub fn assign_tribe(
        &mut self,
        terrain: CellCode,
        archetype: Option<TribeArchetype>,
        grid: &Grid,
    ) -> Result<(), BuilderError> {
        if self.phase != BuilderPhase::TribeConfig {
            return Err(BuilderError::WrongPhase { phase: self.phase });
        }
        if self.finalize_pending {
            return Err(BuilderError::FinalizePending);
        }
        if !terrain.is_terrain() || !grid.contains(terrain) {
            return Err(BuilderError::TerrainNotPresent { terrain });
        }
        match archetype {
            Some(archetype) => {
                let _ = self.assignments.insert(terrain, archetype);
            }
            None => {
                let _ = self.assignments.remove(&terrain);
            }
        }
        Ok(())
    }

    /// Plans the outbound traffic for a paint gesture centred on `center`.
    ///
    /// Brush stamps cover a square of radius `brush_size / 2` clipped to the
    /// grid. Fill mode delegates to the flood fill engine.
    pub fn paint(&self, center: CellCoord, grid: &Grid) -> Result<PaintPlan, BuilderError> {
        if self.phase.permitted_tools().is_empty() {
            return Err(BuilderError::PaintingLocked { phase: self.phase });
        }
        if !self.phase.permits(self.tool) {
            return Err(BuilderError::ToolNotPermitted {
                tool: self.tool,
                phase: self.phase,
            });
        }

        if self.fill_mode {
            if !matches!(self.tool, CellCode::Grass | CellCode::Snow) {
                return Err(BuilderError::FillUnsupportedTool { tool: self.tool });
            }
            let fill = flood_fill(grid, center, self.tool)?;
            if fill.truncated() {
                tracing::warn!(
                    cells = fill.cells().len(),
                    "fill limit reached, large area truncated"
                );
            }
            return Ok(PaintPlan::Fill(fill.into_schedule()));
        }

        let radius = i64::from(self.brush_size / 2);
        let size = i64::from(GRID_SIZE);
        let mut places = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let column = i64::from(center.column()) + dx;
                let row = i64::from(center.row()) + dy;
                if (0..size).contains(&column) && (0..size).contains(&row) {
                    let cell = CellCoord::new(
                        u32::try_from(column).unwrap_or_default(),
                        u32::try_from(row).unwrap_or_default(),
                    );
                    places.push(Placement::new(cell, self.tool));
                }
            }
        }
        Ok(PaintPlan::Brush(ClientRequest::PlaceBatch { places }))
    }

    /// Computes border placements between neighbouring terrains.
    ///
    /// Cells are scanned row by row and converted as they are found, so a
    /// boundary produces a single line of border rather than a double one.
    pub fn auto_borders(&self, grid: &Grid) -> Result<Vec<Placement>, BuilderError> {
        if self.phase != BuilderPhase::Borders {
            return Err(BuilderError::WrongPhase { phase: self.phase });
        }

        let mut scratch = grid.clone();
        let mut placements = Vec::new();
        for row in 0..GRID_SIZE {
            for column in 0..GRID_SIZE {
                let cell = CellCoord::new(column, row);
                let Some(current) = scratch.code(cell).filter(|code| code.is_terrain()) else {
                    continue;
                };
                let bordering = cell.orthogonal_neighbors().any(|neighbor| {
                    scratch
                        .code(neighbor)
                        .is_some_and(|code| code.is_terrain() && code != current)
                });
                if bordering {
                    let _ = scratch.set(cell, CellCode::Border);
                    placements.push(Placement::new(cell, CellCode::Border));
                }
            }
        }

        if placements.is_empty() {
            return Err(BuilderError::NoBordersGenerated);
        }
        Ok(placements)
    }

    /// Enters the simulation phase after the server accepted the map.
    ///
    /// Returns `true` when the phase changed.
    pub fn confirm_finalized(&mut self) -> bool {
        self.finalize_pending = false;
        if self.phase == BuilderPhase::Simulation {
            return false;
        }
        self.phase = BuilderPhase::Simulation;
        true
    }

    /// Returns to tribe configuration after the server refused the map.
    pub fn reject_finalize(&mut self) {
        self.finalize_pending = false;
        self.phase = BuilderPhase::TribeConfig;
    }

    /// Restores the initial builder state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Rate limiter for paint gestures, driven by a monotonic timestamp.
#[derive(Clone, Copy, Debug)]
pub struct PaintThrottle {
    interval: Duration,
    last: Option<Duration>,
}

impl Default for PaintThrottle {
    fn default() -> Self {
        Self::new(PAINT_THROTTLE)
    }
}

impl PaintThrottle {
    /// Creates a throttle admitting one gesture per `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Reports whether a gesture at `now` may proceed, recording it if so.
    pub fn try_acquire(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last {
            if now.saturating_sub(last) < self.interval {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}
