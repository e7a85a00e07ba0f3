use glam::Vec2;
use tribe_war_core::{CellCoord, GRID_SIZE};

use crate::RenderingError;

/// Smallest permitted zoom factor.
pub const MIN_ZOOM: f32 = 0.5;

/// Largest permitted zoom factor.
pub const MAX_ZOOM: f32 = 4.0;

/// Zoom change applied by a single zoom step.
pub const ZOOM_STEP: f32 = 0.1;

/// Pan distance in pixels applied by a single keyboard pan step.
pub const PAN_STEP: f32 = 50.0;

const GRID_EDGE: f32 = GRID_SIZE as f32;

/// Maps grid cells to canvas pixels under the current zoom and pan.
///
/// Cells are square and snapped to whole pixels: the base size is the
/// largest whole number of pixels that fits 100 cells along the shorter
/// canvas edge, scaled by the zoom and floored again. The grid is centred on
/// the canvas before the pan offset is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    canvas: Vec2,
    zoom: f32,
    pan: Vec2,
}

impl Viewport {
    /// Creates a viewport for a canvas of the provided pixel size.
    pub fn new(canvas: Vec2) -> Result<Self, RenderingError> {
        validate_canvas(canvas)?;
        Ok(Self {
            canvas,
            zoom: 1.0,
            pan: Vec2::ZERO,
        })
    }

    /// Canvas size in pixels.
    #[must_use]
    pub const fn canvas(&self) -> Vec2 {
        self.canvas
    }

    /// Current zoom factor.
    #[must_use]
    pub const fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Current pan offset in pixels.
    #[must_use]
    pub const fn pan(&self) -> Vec2 {
        self.pan
    }

    /// Side length of one cell in whole pixels.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        let base = (self.canvas.x.min(self.canvas.y) / GRID_EDGE).floor();
        (base * self.zoom).floor()
    }

    /// Screen position of the grid's top-left corner.
    #[must_use]
    pub fn origin(&self) -> Vec2 {
        let grid_pixels = Vec2::splat(self.cell_size() * GRID_EDGE);
        ((self.canvas - grid_pixels) / 2.0).floor() + self.pan
    }

    /// Screen position of the top-left corner of `cell`.
    #[must_use]
    pub fn cell_to_screen(&self, cell: CellCoord) -> Vec2 {
        self.origin() + Vec2::new(cell.column() as f32, cell.row() as f32) * self.cell_size()
    }

    /// Grid cell under the provided screen position, if it lies on the grid.
    #[must_use]
    pub fn screen_to_cell(&self, point: Vec2) -> Option<CellCoord> {
        let size = self.cell_size();
        if size <= 0.0 {
            return None;
        }
        let local = ((point - self.origin()) / size).floor();
        if local.x < 0.0 || local.y < 0.0 || local.x >= GRID_EDGE || local.y >= GRID_EDGE {
            return None;
        }
        Some(CellCoord::new(local.x as u32, local.y as u32))
    }

    /// Zooms in by one step, clamped to [`MAX_ZOOM`].
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom + ZOOM_STEP).min(MAX_ZOOM);
    }

    /// Zooms out by one step, clamped to [`MIN_ZOOM`].
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom - ZOOM_STEP).max(MIN_ZOOM);
    }

    /// Zooms one step while keeping the content under `anchor` in place.
    pub fn zoom_at(&mut self, anchor: Vec2, zoom_in: bool) {
        let previous = self.zoom;
        if zoom_in {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
        let ratio = self.zoom / previous;
        let from_centre = anchor - self.canvas / 2.0;
        self.pan = from_centre * (1.0 - ratio) + self.pan * ratio;
    }

    /// Moves the grid by `delta` pixels.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Restores 100% zoom and removes any pan offset.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan = Vec2::ZERO;
    }

    /// Adopts a new canvas size, keeping zoom and pan.
    pub fn resize(&mut self, canvas: Vec2) -> Result<(), RenderingError> {
        validate_canvas(canvas)?;
        self.canvas = canvas;
        Ok(())
    }
}

fn validate_canvas(canvas: Vec2) -> Result<(), RenderingError> {
    if !canvas.is_finite() || canvas.x <= 0.0 || canvas.y <= 0.0 {
        return Err(RenderingError::InvalidCanvas {
            width: canvas.x,
            height: canvas.y,
        });
    }
    Ok(())
}
