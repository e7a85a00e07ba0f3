#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tribe War client.
//!
//! This crate defines the vocabulary every other crate speaks: the closed
//! enumeration of cell codes, the fixed 100×100 [`Grid`], entity [`Facing`],
//! the map builder's [`BuilderPhase`] ladder and the local message surface.
//! Adapters submit [`Command`] values describing desired mutations of the
//! client-side world, the world executes them through its `apply` entry point
//! and broadcasts [`Event`] values that systems react to. Wire types exchanged
//! with the simulation server live in [`protocol`].

pub mod protocol;

use std::{collections::BTreeMap, fmt};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::protocol::{Inspection, Placement, StatsUpdate, TribeProfile};

/// Number of cells along each edge of the square world.
pub const GRID_SIZE: u32 = 100;

/// Total number of cells carried by every grid snapshot.
pub const GRID_CELL_COUNT: usize = (GRID_SIZE * GRID_SIZE) as usize;

/// Simulation speed multipliers offered by the speed controls, slowest first.
pub const SPEED_STEPS: [f64; 6] = [0.25, 0.5, 1.0, 2.0, 5.0, 10.0];

const FALLBACK_SPEED_INDEX: usize = 2;

/// Steps along [`SPEED_STEPS`] starting from `current`.
///
/// Speeds that are not on the ladder are treated as `1x`. The result is
/// clamped to the slowest and fastest steps.
#[must_use]
pub fn step_speed(current: f64, delta: i32) -> f64 {
    let index = SPEED_STEPS
        .iter()
        .position(|step| (*step - current).abs() < f64::EPSILON)
        .unwrap_or(FALLBACK_SPEED_INDEX);
    let last = SPEED_STEPS.len() - 1;
    let stepped = i64::try_from(index).unwrap_or(0) + i64::from(delta);
    let clamped = usize::try_from(stepped.max(0)).unwrap_or(0).min(last);
    SPEED_STEPS[clamped]
}

/// Tribe archetypes the server knows how to simulate.
///
/// Each archetype renders its members with a fixed entity cell code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TribeArchetype {
    /// Elves with a high evasion passive.
    Wanderers,
    /// Vikings with a defense passive.
    Norsca,
    /// Orcs with a damage passive.
    Nomads,
    /// Vampires with mixed damage and evasion passives.
    Sylvania,
}

impl TribeArchetype {
    /// Every archetype in the order offered by the tribe configuration panel.
    pub const ALL: [Self; 4] = [Self::Wanderers, Self::Norsca, Self::Nomads, Self::Sylvania];

    /// Cell code used on the grid for members of this archetype.
    #[must_use]
    pub const fn entity_code(self) -> u8 {
        match self {
            Self::Wanderers => 3,
            Self::Norsca => 5,
            Self::Nomads => 11,
            Self::Sylvania => 12,
        }
    }

    /// Resolves the archetype rendered with the provided entity cell code.
    #[must_use]
    pub const fn from_entity_code(code: u8) -> Option<Self> {
        match code {
            3 => Some(Self::Wanderers),
            5 => Some(Self::Norsca),
            11 => Some(Self::Nomads),
            12 => Some(Self::Sylvania),
            _ => None,
        }
    }

    /// Facing assigned to a member when no horizontal movement was observed.
    ///
    /// Sprite assets are authored against this table; it must not change.
    #[must_use]
    pub const fn default_facing(self) -> Facing {
        match self {
            Self::Wanderers | Self::Nomads => Facing::Right,
            Self::Norsca | Self::Sylvania => Facing::Left,
        }
    }

    /// Biome whose sprites depict members of this archetype.
    #[must_use]
    pub const fn biome(self) -> Biome {
        match self {
            Self::Wanderers => Biome::Grass,
            Self::Norsca => Biome::Snow,
            Self::Nomads => Biome::Desert,
            Self::Sylvania => Biome::Cemetery,
        }
    }

    /// Name used for the archetype on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wanderers => "Wanderers",
            Self::Norsca => "Norsca",
            Self::Nomads => "Nomads",
            Self::Sylvania => "Sylvania",
        }
    }

    /// Parses an archetype from its wire name, ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|archetype| archetype.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for TribeArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Visual theme a cell is drawn with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Biome {
    /// Temperate grassland.
    Grass,
    /// Northern snowfield.
    Snow,
    /// Southern desert.
    Desert,
    /// Haunted cemetery.
    Cemetery,
}

impl Biome {
    /// Every biome, in tie-break order.
    pub const ALL: [Self; 4] = [Self::Grass, Self::Snow, Self::Desert, Self::Cemetery];
}

/// Closed enumeration of the values a grid cell may hold.
///
/// The numeric codes are fixed by the server protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellCode {
    /// Nothing painted (`0`).
    Empty,
    /// Terrain variant A, drawn as grassland (`1`).
    Grass,
    /// Terrain variant B, drawn as snow (`2`).
    Snow,
    /// Terrain variant C, drawn as desert (`9`).
    Desert,
    /// Terrain variant D, drawn as cemetery (`10`).
    Cemetery,
    /// Border separating territories (`4`).
    Border,
    /// Tree feature (`6`).
    Tree,
    /// Rock feature (`7`).
    Rock,
    /// Hill feature (`8`).
    Hill,
    /// Tribe-tagged entity (`3`, `5`, `11` or `12`).
    Entity(TribeArchetype),
}

impl CellCode {
    /// The four paintable terrain variants.
    pub const TERRAINS: [Self; 4] = [Self::Grass, Self::Snow, Self::Desert, Self::Cemetery];

    /// Numeric code used on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Grass => 1,
            Self::Snow => 2,
            Self::Border => 4,
            Self::Tree => 6,
            Self::Rock => 7,
            Self::Hill => 8,
            Self::Desert => 9,
            Self::Cemetery => 10,
            Self::Entity(archetype) => archetype.entity_code(),
        }
    }

    /// Decodes a wire code, returning `None` for values outside the enumeration.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Empty),
            1 => Some(Self::Grass),
            2 => Some(Self::Snow),
            4 => Some(Self::Border),
            6 => Some(Self::Tree),
            7 => Some(Self::Rock),
            8 => Some(Self::Hill),
            9 => Some(Self::Desert),
            10 => Some(Self::Cemetery),
            other => match TribeArchetype::from_entity_code(other) {
                Some(archetype) => Some(Self::Entity(archetype)),
                None => None,
            },
        }
    }

    /// Reports whether the code is one of the four terrain variants.
    #[must_use]
    pub const fn is_terrain(self) -> bool {
        matches!(self, Self::Grass | Self::Snow | Self::Desert | Self::Cemetery)
    }

    /// Biome associated with a terrain code.
    #[must_use]
    pub const fn terrain_biome(self) -> Option<Biome> {
        match self {
            Self::Grass => Some(Biome::Grass),
            Self::Snow => Some(Biome::Snow),
            Self::Desert => Some(Biome::Desert),
            Self::Cemetery => Some(Biome::Cemetery),
            _ => None,
        }
    }
}

impl TryFrom<u8> for CellCode {
    type Error = UnknownCellCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_code(value).ok_or(UnknownCellCode(value))
    }
}

impl From<CellCode> for u8 {
    fn from(value: CellCode) -> Self {
        value.code()
    }
}

impl Serialize for CellCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for CellCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Self::try_from(raw).map_err(D::Error::custom)
    }
}

/// Raised when a byte does not name a known cell code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("unknown cell code {0}")]
pub struct UnknownCellCode(pub u8);

/// Horizontal orientation used to pick an entity sprite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Facing {
    /// Sprite faces toward decreasing columns.
    Left,
    /// Sprite faces toward increasing columns.
    #[default]
    Right,
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Reports whether the coordinate lies on the world grid.
    #[must_use]
    pub const fn in_bounds(&self) -> bool {
        self.column < GRID_SIZE && self.row < GRID_SIZE
    }

    /// Flat index of the cell (`row * GRID_SIZE + column`), if in bounds.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        if !self.in_bounds() {
            return None;
        }
        usize::try_from(self.row * GRID_SIZE + self.column).ok()
    }

    /// Coordinate of the provided flat index, if it addresses a grid cell.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        if index >= GRID_CELL_COUNT {
            return None;
        }
        let index = u32::try_from(index).ok()?;
        Some(Self::new(index % GRID_SIZE, index / GRID_SIZE))
    }

    /// Neighbour offset by the provided signed deltas, if it stays on the grid.
    #[must_use]
    pub fn offset(&self, columns: i32, rows: i32) -> Option<Self> {
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        let cell = Self::new(column, row);
        cell.in_bounds().then_some(cell)
    }

    /// The 4-connected neighbours in left, right, up, down order.
    pub fn orthogonal_neighbors(&self) -> impl Iterator<Item = CellCoord> + '_ {
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(move |(columns, rows)| self.offset(columns, rows))
    }
}

/// Errors raised while constructing a grid snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The payload did not carry exactly one byte per cell.
    #[error("grid snapshot carried {actual} cells, expected {expected}")]
    LengthMismatch {
        /// Number of cells every snapshot must carry.
        expected: usize,
        /// Number of cells found in the payload.
        actual: usize,
    },
}

/// Dense 100×100 snapshot of raw cell codes, indexed `row * 100 + column`.
///
/// Unknown codes are preserved so a newer server never corrupts the grid.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<u8>,
}

impl Grid {
    /// Creates a grid in which every cell is empty.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            cells: vec![CellCode::Empty.code(); GRID_CELL_COUNT],
        }
    }

    /// Adopts a raw snapshot, rejecting payloads of the wrong length.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, GridError> {
        if bytes.len() != GRID_CELL_COUNT {
            return Err(GridError::LengthMismatch {
                expected: GRID_CELL_COUNT,
                actual: bytes.len(),
            });
        }
        Ok(Self { cells: bytes })
    }

    /// Raw code stored at the provided cell.
    #[must_use]
    pub fn raw(&self, cell: CellCoord) -> Option<u8> {
        cell.index().and_then(|index| self.cells.get(index).copied())
    }

    /// Decoded code stored at the provided cell.
    ///
    /// Returns `None` when the cell is out of bounds or holds an unknown code.
    #[must_use]
    pub fn code(&self, cell: CellCoord) -> Option<CellCode> {
        self.raw(cell).and_then(CellCode::from_code)
    }

    /// Overwrites a single cell, returning `false` when it is out of bounds.
    pub fn set(&mut self, cell: CellCoord, code: CellCode) -> bool {
        match cell.index().and_then(|index| self.cells.get_mut(index)) {
            Some(slot) => {
                *slot = code.code();
                true
            }
            None => false,
        }
    }

    /// Reports whether any cell holds the provided code.
    #[must_use]
    pub fn contains(&self, code: CellCode) -> bool {
        self.cells.contains(&code.code())
    }

    /// Reports whether any of the four terrain variants has been painted.
    #[must_use]
    pub fn has_terrain(&self) -> bool {
        CellCode::TERRAINS.into_iter().any(|terrain| self.contains(terrain))
    }

    /// Terrain variants present anywhere on the grid, in code order.
    #[must_use]
    pub fn terrains_present(&self) -> Vec<CellCode> {
        CellCode::TERRAINS
            .into_iter()
            .filter(|terrain| self.contains(*terrain))
            .collect()
    }

    /// Iterator over every cell coordinate paired with its raw code.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, u8)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| CellCoord::from_index(index).map(|cell| (cell, *raw)))
    }

    /// Raw bytes in row-major order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let occupied = self.cells.iter().filter(|raw| **raw != 0).count();
        f.debug_struct("Grid")
            .field("cells", &self.cells.len())
            .field("occupied", &occupied)
            .finish()
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.cells.iter())
    }
}

/// Stages of the custom map builder, in their strict linear order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuilderPhase {
    /// Paint the four terrain variants.
    #[default]
    Terrain,
    /// Paint borders between territories.
    Borders,
    /// Scatter trees, rocks and hills.
    Features,
    /// Assign tribe archetypes to terrains.
    TribeConfig,
    /// The server runs the simulation; the grid is server-authoritative.
    Simulation,
}

impl BuilderPhase {
    /// Zero-based position of the phase in the builder workflow.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Terrain => 0,
            Self::Borders => 1,
            Self::Features => 2,
            Self::TribeConfig => 3,
            Self::Simulation => 4,
        }
    }

    /// Phase that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Terrain => Some(Self::Borders),
            Self::Borders => Some(Self::Features),
            Self::Features => Some(Self::TribeConfig),
            Self::TribeConfig => Some(Self::Simulation),
            Self::Simulation => None,
        }
    }

    /// Phase that precedes this one when retreating, if retreat is allowed.
    ///
    /// Retreat is unavailable from the first phase and from the terminal
    /// simulation phase.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Borders => Some(Self::Terrain),
            Self::Features => Some(Self::Borders),
            Self::TribeConfig => Some(Self::Features),
            Self::Terrain | Self::Simulation => None,
        }
    }

    /// Paint codes that may be selected as the active tool in this phase.
    ///
    /// The first entry is the tool selected when the phase is entered with a
    /// tool it does not permit.
    #[must_use]
    pub const fn permitted_tools(self) -> &'static [CellCode] {
        match self {
            Self::Terrain => &[
                CellCode::Grass,
                CellCode::Snow,
                CellCode::Desert,
                CellCode::Cemetery,
                CellCode::Empty,
            ],
            Self::Borders => &[CellCode::Border],
            Self::Features => &[CellCode::Tree, CellCode::Rock, CellCode::Hill, CellCode::Empty],
            Self::TribeConfig | Self::Simulation => &[],
        }
    }

    /// Reports whether the provided tool is whitelisted in this phase.
    #[must_use]
    pub fn permits(self, tool: CellCode) -> bool {
        self.permitted_tools().contains(&tool)
    }

    /// Human readable label shown by the phase indicator.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Terrain => "Paint Terrain",
            Self::Borders => "Draw Borders",
            Self::Features => "Add Features",
            Self::TribeConfig => "Configure Tribes",
            Self::Simulation => "Play",
        }
    }
}

impl fmt::Display for BuilderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}: {}", self.index() + 1, self.label())
    }
}

/// Commands that express all permissible mutations of the client-side world.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the grid wholesale with a server snapshot.
    ReplaceGrid {
        /// Snapshot that becomes the new grid.
        grid: Grid,
    },
    /// Applies cells locally as a preview before the server confirms them.
    PreviewPlacements {
        /// Cells to overwrite in the local grid.
        placements: Vec<Placement>,
    },
    /// Resets the grid so every cell is empty.
    ClearGrid,
    /// Adopts the tribe roster assigned by the server.
    AdoptTribes {
        /// Tribe profiles keyed by server tribe identifier.
        tribes: BTreeMap<String, TribeProfile>,
    },
    /// Records a simulation statistics update.
    RecordStats {
        /// Update received from the server.
        update: StatsUpdate,
    },
    /// Forgets the announced outcome of the war.
    ClearWinner,
    /// Shows the inspector overlay for an entity.
    ShowInspection {
        /// Details reported by the server.
        inspection: Inspection,
    },
    /// Hides the inspector overlay.
    HideInspection,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The grid was replaced by a server snapshot.
    GridReplaced,
    /// Local preview cells were written into the grid.
    CellsPreviewed {
        /// Number of cells that were written.
        count: usize,
    },
    /// The grid was cleared; previous snapshots no longer describe it.
    GridCleared,
    /// A tribe roster was adopted.
    TribesAdopted {
        /// Number of tribes in the roster.
        count: usize,
    },
    /// Simulation statistics changed.
    StatsRecorded,
    /// The inspector overlay became visible.
    InspectionShown,
    /// The inspector overlay was hidden.
    InspectionHidden,
}
