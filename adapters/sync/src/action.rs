//! User gestures accepted by the session.

use glam::Vec2;
use tribe_war_core::{CellCode, CellCoord, TribeArchetype};

/// Everything a front end can ask the session to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UserAction {
    /// Selects the active paint tool.
    SelectTool(CellCode),
    /// Changes the brush edge length.
    SetBrushSize(u32),
    /// Flips between brush stamping and flood filling.
    ToggleFillMode,
    /// Paints at a canvas position.
    PaintAt(Vec2),
    /// Paints centred on a grid cell.
    PaintCell(CellCoord),
    /// Moves the builder forward.
    NextPhase {
        /// Answer given when leaving the border phase with no border painted.
        confirm_without_borders: bool,
    },
    /// Moves the builder back one phase.
    PreviousPhase,
    /// Assigns or clears the archetype of a painted terrain.
    AssignTribe {
        /// Terrain being configured.
        terrain: CellCode,
        /// Archetype to assign, or `None` to clear the assignment.
        archetype: Option<TribeArchetype>,
    },
    /// Places borders between neighbouring terrains.
    AutoBorders,
    /// Inspects the entity under a canvas position.
    InspectAt(Vec2),
    /// Inspects the entity on a grid cell.
    InspectCell(CellCoord),
    /// Hides the inspector overlay.
    CloseInspector,
    /// Pauses or resumes the simulation.
    TogglePause,
    /// Moves along the speed ladder by the given number of steps.
    ChangeSpeed(i32),
    /// Starts the war.
    StartWar,
    /// Resets the server world.
    ResetWorld,
    /// Returns the builder to an empty map.
    ResetBuilder,
    /// Zooms in around the canvas centre.
    ZoomIn,
    /// Zooms out around the canvas centre.
    ZoomOut,
    /// Zooms keeping the content under `anchor` in place.
    ZoomAt {
        /// Canvas position held fixed.
        anchor: Vec2,
        /// Zoom direction.
        zoom_in: bool,
    },
    /// Shifts the grid by a canvas-space offset.
    Pan(Vec2),
    /// Restores the default zoom and pan.
    ResetView,
    /// Adopts a new canvas size.
    Resize(Vec2),
    /// Reports one sprite load as settled.
    AssetSettled {
        /// Whether the sprite loaded successfully.
        loaded: bool,
    },
}
