//! Messages exchanged with the simulation server.
//!
//! Outbound traffic is a single tagged [`ClientRequest`] enum serialized as
//! JSON text frames. Inbound text frames decode into the payload types defined
//! here; inbound binary frames carry raw grid snapshots and never pass through
//! this module.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CellCode, CellCoord, Grid, TribeArchetype};

/// Single cell write carried by a `place_batch` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Zero-based column of the written cell.
    pub x: u32,
    /// Zero-based row of the written cell.
    pub y: u32,
    /// Code written into the cell.
    #[serde(rename = "type")]
    pub code: CellCode,
}

impl Placement {
    /// Creates a placement writing `code` at `cell`.
    #[must_use]
    pub const fn new(cell: CellCoord, code: CellCode) -> Self {
        Self {
            x: cell.column(),
            y: cell.row(),
            code,
        }
    }

    /// Cell addressed by the placement.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Requests the client sends to the server.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Writes a batch of cells on the server grid.
    PlaceBatch {
        /// Cells to write.
        places: Vec<Placement>,
    },
    /// Asks for details about the entity at a cell.
    Inspect {
        /// Column of the inspected cell.
        x: u32,
        /// Row of the inspected cell.
        y: u32,
    },
    /// Pauses or resumes the simulation.
    TogglePause,
    /// Changes the simulation speed multiplier.
    SetSpeed {
        /// New multiplier, one of the speed ladder steps.
        multiplier: f64,
    },
    /// Begins the war between tribes.
    StartWar,
    /// Clears the server world.
    Reset,
    /// Submits the finished map and its tribe assignments.
    InitCustomMap {
        /// Full grid as an array of cell codes.
        terrain: Grid,
        /// Archetype names keyed by terrain code rendered as a string.
        #[serde(rename = "tribeAssignments")]
        tribe_assignments: BTreeMap<String, TribeArchetype>,
    },
}

impl ClientRequest {
    /// Wire name of the request's `action` tag.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::PlaceBatch { .. } => "place_batch",
            Self::Inspect { .. } => "inspect",
            Self::TogglePause => "toggle_pause",
            Self::SetSpeed { .. } => "set_speed",
            Self::StartWar => "start_war",
            Self::Reset => "reset",
            Self::InitCustomMap { .. } => "init_custom_map",
        }
    }
}

/// Tribe description returned when a custom map is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TribeProfile {
    /// Display name of the tribe.
    pub name: String,
    /// Entity code members of the tribe are drawn with.
    #[serde(default)]
    pub entity_viz_code: u8,
    /// Terrain code the tribe calls home.
    #[serde(default)]
    pub home_terrain: u8,
}

/// Per-tribe counters carried by a statistics update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TribeStats {
    /// Living members.
    #[serde(default)]
    pub count: u64,
    /// Wood stockpile.
    #[serde(default)]
    pub wood: u64,
    /// Stone stockpile.
    #[serde(default)]
    pub stone: u64,
    /// Display name, when the server includes it.
    #[serde(default)]
    pub name: Option<String>,
}

/// Periodic simulation statistics pushed by the server.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StatsUpdate {
    /// Current speed multiplier.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Whether the simulation is paused.
    #[serde(default)]
    pub paused: Option<bool>,
    /// Counters keyed by tribe identifier.
    #[serde(default)]
    pub tribes: Option<BTreeMap<String, TribeStats>>,
    /// Winning tribe identifier, or `"draw"`; absent while the war continues.
    #[serde(default)]
    pub winner: Option<String>,
}

/// Entity details returned by an `inspect` request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    /// `true` when no entity occupies the inspected cell.
    #[serde(default)]
    pub empty: bool,
    /// Display name of the entity.
    #[serde(default)]
    pub name: Option<String>,
    /// Remaining health.
    #[serde(default)]
    pub health: Option<i64>,
    /// Equipped weapon.
    #[serde(default)]
    pub weapon: Option<String>,
    /// Equipped armor.
    #[serde(default)]
    pub armor: Option<String>,
    /// Total damage per hit.
    #[serde(default)]
    pub damage: Option<i64>,
    /// Total defense.
    #[serde(default)]
    pub defense: Option<i64>,
    /// Evasion chance in percent.
    #[serde(default)]
    pub evasion: Option<i64>,
    /// Damage bonus granted by the tribe.
    #[serde(default)]
    pub racial_damage: Option<i64>,
    /// Defense bonus granted by the tribe.
    #[serde(default)]
    pub racial_defense: Option<i64>,
    /// Rank title.
    #[serde(default)]
    pub rank: Option<String>,
    /// Damage bonus granted by the rank.
    #[serde(default)]
    pub rank_damage: Option<i64>,
    /// Armor bonus granted by the rank.
    #[serde(default)]
    pub rank_armor: Option<i64>,
}
