#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Tribe War adapters.
//!
//! Adapters never read the grid directly while painting. The session composes
//! a [`Frame`] describing which sprite (and fallback color) each occupied cell
//! uses, pairs it with the current [`Viewport`] and hands both to a
//! [`RenderingBackend`].

mod latch;
mod viewport;

pub use latch::AssetLatch;
pub use viewport::{Viewport, MAX_ZOOM, MIN_ZOOM, PAN_STEP, ZOOM_STEP};

use anyhow::Result as AnyResult;
use std::{error::Error, fmt};
use tribe_war_core::{protocol::Inspection, Biome, BuilderPhase, CellCode, CellCoord, Facing, Grid};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Creates an opaque color from a `0xRRGGBB` literal.
    #[must_use]
    pub const fn from_hex(rgb: u32) -> Self {
        Self::from_rgb_u8((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }
}

/// Decorative feature painted on top of terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    /// Trees.
    Trees,
    /// Rocks.
    Rocks,
    /// Hills.
    Hills,
}

impl FeatureKind {
    /// Every feature kind.
    pub const ALL: [Self; 3] = [Self::Trees, Self::Rocks, Self::Hills];
}

/// Identifies the sprite a cell is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpriteKey {
    /// Plain terrain tile.
    Terrain(Biome),
    /// Feature tile themed by the surrounding biome.
    Feature(FeatureKind, Biome),
    /// Border tile.
    Border,
    /// Tribe member themed by its tribe and oriented by its facing.
    Entity(Biome, Facing),
    /// Code the client does not recognise; drawn as a neutral block.
    Unknown,
}

/// Single occupied cell of a composed frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSprite {
    /// Grid position of the cell.
    pub cell: CellCoord,
    /// Sprite used when assets are available.
    pub sprite: SpriteKey,
    /// Solid color used while assets are unavailable.
    pub fallback: Color,
}

/// Everything a backend needs to paint one redraw.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Occupied cells in row-major order; empty cells are omitted.
    pub cells: Vec<CellSprite>,
    /// Text of the phase indicator, for example `Phase 1: Paint Terrain`.
    pub phase_label: String,
    /// Panels drawn above the map.
    pub overlays: Overlays,
}

/// Panels drawn above the map, independent of the viewport.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlays {
    /// Victory banner, once the war is decided.
    pub banner: Option<String>,
    /// Statistics panel, shown while the simulation runs.
    pub stats: Option<StatsPanel>,
    /// Inspector popup for the last inspected cell.
    pub inspector: Option<Inspection>,
}

/// Simulation controls state and per-tribe counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatsPanel {
    /// Speed multiplier last reported by the server.
    pub speed: f64,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// One line per tribe, ordered by tribe id.
    pub tribes: Vec<TribeLine>,
}

/// Counters of a single tribe in the statistics panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TribeLine {
    /// Display name.
    pub name: String,
    /// Living members.
    pub count: u64,
    /// Wood stockpile.
    pub wood: u64,
    /// Stone stockpile.
    pub stone: u64,
}

/// Biome a cell is themed with.
///
/// Terrain cells use their own biome. Every other cell takes the majority
/// terrain of its 3×3 neighbourhood, with ties resolved in grass, snow,
/// desert, cemetery order; a neighbourhood without terrain yields grass.
#[must_use]
pub fn biome_at(grid: &Grid, cell: CellCoord) -> Biome {
    if let Some(biome) = grid.code(cell).and_then(CellCode::terrain_biome) {
        return biome;
    }

    let mut counts = [0_u8; 4];
    for rows in -1..=1 {
        for columns in -1..=1 {
            let biome = cell
                .offset(columns, rows)
                .and_then(|neighbor| grid.code(neighbor))
                .and_then(CellCode::terrain_biome);
            if let Some(biome) = biome {
                counts[biome_slot(biome)] += 1;
            }
        }
    }

    let max = counts.iter().copied().max().unwrap_or(0);
    Biome::ALL
        .into_iter()
        .find(|biome| counts[biome_slot(*biome)] == max)
        .unwrap_or(Biome::Grass)
}

const fn biome_slot(biome: Biome) -> usize {
    match biome {
        Biome::Grass => 0,
        Biome::Snow => 1,
        Biome::Desert => 2,
        Biome::Cemetery => 3,
    }
}

/// Chooses the sprite for a single non-empty cell.
///
/// `facing` supplies the recorded facing of entity cells and `entity_biome`
/// the biome adopted for an entity code, if any.
#[must_use]
pub fn sprite_for<F, B>(grid: &Grid, cell: CellCoord, raw: u8, facing: F, entity_biome: B) -> SpriteKey
where
    F: FnOnce(CellCoord) -> Facing,
    B: FnOnce(u8) -> Option<Biome>,
{
    match CellCode::from_code(raw) {
        Some(CellCode::Empty) | None => SpriteKey::Unknown,
        Some(CellCode::Border) => SpriteKey::Border,
        Some(code @ (CellCode::Grass | CellCode::Snow | CellCode::Desert | CellCode::Cemetery)) => {
            SpriteKey::Terrain(code.terrain_biome().unwrap_or(Biome::Grass))
        }
        Some(CellCode::Tree) => SpriteKey::Feature(FeatureKind::Trees, biome_at(grid, cell)),
        Some(CellCode::Rock) => SpriteKey::Feature(FeatureKind::Rocks, biome_at(grid, cell)),
        Some(CellCode::Hill) => SpriteKey::Feature(FeatureKind::Hills, biome_at(grid, cell)),
        Some(CellCode::Entity(_)) => {
            let biome = entity_biome(raw).unwrap_or_else(|| biome_at(grid, cell));
            SpriteKey::Entity(biome, facing(cell))
        }
    }
}

/// Solid color drawn for a cell whose sprite is not loaded.
#[must_use]
pub fn fallback_color(raw: u8, sprite: SpriteKey) -> Color {
    let hex = match (raw, sprite) {
        (1, _) => 0x90EE90,
        (2, _) => 0xE0F0FF,
        (3, _) => 0x228B22,
        (4, _) => 0x0044FF,
        (5, _) => 0x4A90E2,
        (9, _) => 0xF4A460,
        (10, _) => 0x2C1B3D,
        (11, _) => 0xD2691E,
        (12, _) => 0x8B0000,
        (_, SpriteKey::Feature(kind, biome)) => match (kind, biome) {
            (FeatureKind::Trees, Biome::Grass) => 0x228B22,
            (FeatureKind::Trees, Biome::Snow) => 0x1B4D3E,
            (FeatureKind::Trees, Biome::Desert) => 0x8B7355,
            (FeatureKind::Trees, Biome::Cemetery) => 0x4A3C2F,
            (FeatureKind::Rocks, Biome::Grass) => 0x808080,
            (FeatureKind::Rocks, Biome::Snow) => 0xB0C4DE,
            (FeatureKind::Rocks, Biome::Desert) => 0xCD853F,
            (FeatureKind::Rocks, Biome::Cemetery) => 0x696969,
            (FeatureKind::Hills, Biome::Grass) => 0x9ACD32,
            (FeatureKind::Hills, Biome::Snow) => 0xC0D6E4,
            (FeatureKind::Hills, Biome::Desert) => 0xDEB887,
            (FeatureKind::Hills, Biome::Cemetery) => 0x534D56,
        },
        _ => 0x333333,
    };
    Color::from_hex(hex)
}

/// Composes a frame for the provided grid.
pub fn compose_frame<F, B>(
    grid: &Grid,
    phase: BuilderPhase,
    overlays: Overlays,
    facing: F,
    entity_biome: B,
) -> Frame
where
    F: Fn(CellCoord) -> Facing,
    B: Fn(u8) -> Option<Biome>,
{
    let cells = grid
        .iter()
        .filter(|(_, raw)| *raw != CellCode::Empty.code())
        .map(|(cell, raw)| {
            let sprite = sprite_for(grid, cell, raw, &facing, &entity_biome);
            CellSprite {
                cell,
                sprite,
                fallback: fallback_color(raw, sprite),
            }
        })
        .collect();

    Frame {
        cells,
        phase_label: phase.to_string(),
        overlays,
    }
}

/// Rendering backend capable of presenting Tribe War frames.
pub trait RenderingBackend {
    /// Paints one frame through the provided viewport.
    fn present(&mut self, frame: &Frame, viewport: &Viewport) -> AnyResult<()>;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Canvas dimensions must be positive and finite.
    InvalidCanvas {
        /// Provided width.
        width: f32,
        /// Provided height.
        height: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCanvas { width, height } => {
                write!(
                    f,
                    "canvas must have a positive size (received {width}x{height})"
                )
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tribe_war_core::TribeArchetype;

    fn grid_with(cells: &[(u32, u32, CellCode)]) -> Grid {
        let mut grid = Grid::empty();
        for (column, row, code) in cells {
            assert!(grid.set(CellCoord::new(*column, *row), *code));
        }
        grid
    }

    #[test]
    fn feature_biome_follows_majority_terrain() {
        let grid = grid_with(&[
            (4, 5, CellCode::Snow),
            (6, 5, CellCode::Snow),
            (5, 4, CellCode::Desert),
            (5, 5, CellCode::Tree),
        ]);

        assert_eq!(biome_at(&grid, CellCoord::new(5, 5)), Biome::Snow);
    }

    #[test]
    fn biome_ties_prefer_grass_then_snow() {
        let grid = grid_with(&[(4, 5, CellCode::Cemetery), (6, 5, CellCode::Snow)]);
        assert_eq!(biome_at(&grid, CellCoord::new(5, 5)), Biome::Snow);

        let empty = Grid::empty();
        assert_eq!(biome_at(&empty, CellCoord::new(0, 0)), Biome::Grass);
    }

    #[test]
    fn entity_sprite_prefers_adopted_biome() {
        let grid = grid_with(&[
            (4, 5, CellCode::Desert),
            (5, 5, CellCode::Entity(TribeArchetype::Wanderers)),
        ]);
        let cell = CellCoord::new(5, 5);

        let adopted = sprite_for(&grid, cell, 3, |_| Facing::Left, |_| Some(Biome::Cemetery));
        let unmapped = sprite_for(&grid, cell, 3, |_| Facing::Right, |_| None);

        assert_eq!(adopted, SpriteKey::Entity(Biome::Cemetery, Facing::Left));
        assert_eq!(unmapped, SpriteKey::Entity(Biome::Desert, Facing::Right));
    }

    #[test]
    fn frame_skips_empty_cells_and_labels_phase() {
        let grid = grid_with(&[(0, 0, CellCode::Grass), (1, 0, CellCode::Border)]);

        let frame = compose_frame(
            &grid,
            BuilderPhase::Borders,
            Overlays::default(),
            |_| Facing::Right,
            |_| None,
        );

        assert_eq!(frame.cells.len(), 2);
        assert_eq!(frame.cells[0].sprite, SpriteKey::Terrain(Biome::Grass));
        assert_eq!(frame.cells[1].fallback, Color::from_hex(0x0044FF));
        assert_eq!(frame.phase_label, "Phase 2: Draw Borders");
    }

    #[test]
    fn unknown_codes_draw_neutral_block() {
        let mut bytes = vec![0; tribe_war_core::GRID_CELL_COUNT];
        bytes[0] = 77;
        let grid = Grid::from_bytes(bytes).expect("full snapshot");

        let frame = compose_frame(
            &grid,
            BuilderPhase::Simulation,
            Overlays::default(),
            |_| Facing::Right,
            |_| None,
        );

        assert_eq!(frame.cells[0].sprite, SpriteKey::Unknown);
        assert_eq!(frame.cells[0].fallback, Color::from_hex(0x333333));
    }

    #[test]
    fn hex_colors_split_channels() {
        assert_eq!(Color::from_hex(0xFF0000), Color::from_rgb_u8(255, 0, 0));
    }
}
