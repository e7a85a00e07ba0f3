#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Client-side world state for Tribe War.
//!
//! The world mirrors what the server last reported: the grid snapshot, the
//! adopted tribe roster, simulation statistics and the inspector overlay. It
//! is only ever mutated through [`apply`].

use std::collections::BTreeMap;

use tribe_war_core::{
    protocol::{Inspection, StatsUpdate, TribeProfile},
    Biome, Command, Event, Grid, TribeArchetype,
};

const DRAW_MARKER: &str = "draw";
const DEFAULT_SPEED: f64 = 1.0;

/// Counters tracked for a single tribe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TribeTally {
    /// Living members.
    pub count: u64,
    /// Wood stockpile.
    pub wood: u64,
    /// Stone stockpile.
    pub stone: u64,
}

/// Outcome of a finished war.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Winner {
    /// Every tribe died out.
    Draw,
    /// A single tribe survived.
    Tribe {
        /// Server identifier of the tribe.
        id: String,
        /// Display name resolved when the result arrived.
        name: String,
    },
}

impl Winner {
    /// Banner text announcing the outcome.
    #[must_use]
    pub fn banner(&self) -> String {
        match self {
            Self::Draw => "Draw".to_owned(),
            Self::Tribe { name, .. } => format!("{name} Wins!"),
        }
    }
}

/// Represents the client's view of the Tribe War world.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    roster: BTreeMap<String, TribeProfile>,
    tribe_names: BTreeMap<String, String>,
    entity_biomes: BTreeMap<u8, Biome>,
    speed: f64,
    paused: bool,
    tallies: BTreeMap<String, TribeTally>,
    winner: Option<Winner>,
    inspection: Option<Inspection>,
}

impl World {
    /// Creates an empty world awaiting its first snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grid: Grid::empty(),
            roster: BTreeMap::new(),
            tribe_names: BTreeMap::new(),
            entity_biomes: BTreeMap::new(),
            speed: DEFAULT_SPEED,
            paused: false,
            tallies: BTreeMap::new(),
            winner: None,
            inspection: None,
        }
    }

    fn tribe_name(&self, id: &str) -> String {
        self.tribe_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("Tribe {id}"))
    }

    fn adopt_roster(&mut self, tribes: BTreeMap<String, TribeProfile>) {
        self.entity_biomes = tribes
            .values()
            .map(|profile| {
                let biome = TribeArchetype::from_entity_code(profile.entity_viz_code)
                    .map_or(Biome::Grass, TribeArchetype::biome);
                (profile.entity_viz_code, biome)
            })
            .collect();
        for (id, profile) in &tribes {
            let _ = self.tribe_names.insert(id.clone(), profile.name.clone());
        }
        self.roster = tribes;
    }

    fn record_stats(&mut self, update: StatsUpdate) {
        if let Some(tribes) = update.tribes {
            for (id, stats) in tribes {
                if let Some(name) = stats.name.filter(|name| !name.is_empty()) {
                    let _ = self.tribe_names.insert(id.clone(), name);
                }
                let _ = self.tallies.insert(
                    id,
                    TribeTally {
                        count: stats.count,
                        wood: stats.wood,
                        stone: stats.stone,
                    },
                );
            }
        }
        if let Some(speed) = update.speed {
            self.speed = speed;
        }
        if let Some(paused) = update.paused {
            self.paused = paused;
        }
        self.winner = match update.winner.as_deref() {
            None | Some("") => None,
            Some(DRAW_MARKER) => Some(Winner::Draw),
            Some(id) => Some(Winner::Tribe {
                id: id.to_owned(),
                name: self.tribe_name(id),
            }),
        };
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ReplaceGrid { grid } => {
            world.grid = grid;
            out_events.push(Event::GridReplaced);
        }
        Command::PreviewPlacements { placements } => {
            let count = placements
                .iter()
                .filter(|placement| world.grid.set(placement.cell(), placement.code))
                .count();
            out_events.push(Event::CellsPreviewed { count });
        }
        Command::ClearGrid => {
            world.grid = Grid::empty();
            out_events.push(Event::GridCleared);
        }
        Command::AdoptTribes { tribes } => {
            let count = tribes.len();
            world.adopt_roster(tribes);
            out_events.push(Event::TribesAdopted { count });
        }
        Command::RecordStats { update } => {
            world.record_stats(update);
            out_events.push(Event::StatsRecorded);
        }
        Command::ClearWinner => {
            if world.winner.take().is_some() {
                out_events.push(Event::StatsRecorded);
            }
        }
        Command::ShowInspection { inspection } => {
            if inspection.empty {
                world.inspection = None;
                out_events.push(Event::InspectionHidden);
            } else {
                world.inspection = Some(inspection);
                out_events.push(Event::InspectionShown);
            }
        }
        Command::HideInspection => {
            if world.inspection.take().is_some() {
                out_events.push(Event::InspectionHidden);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeMap;

    use super::{TribeTally, Winner, World};
    use tribe_war_core::{
        protocol::{Inspection, TribeProfile},
        Biome, Grid,
    };

    /// Provides read-only access to the latest grid snapshot.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Tribe roster adopted when the custom map was accepted.
    #[must_use]
    pub fn roster(world: &World) -> &BTreeMap<String, TribeProfile> {
        &world.roster
    }

    /// Biome assigned to an entity code by the adopted roster, if any.
    #[must_use]
    pub fn entity_biome(world: &World, code: u8) -> Option<Biome> {
        world.entity_biomes.get(&code).copied()
    }

    /// Current simulation speed multiplier.
    #[must_use]
    pub fn speed(world: &World) -> f64 {
        world.speed
    }

    /// Reports whether the simulation is paused.
    #[must_use]
    pub fn paused(world: &World) -> bool {
        world.paused
    }

    /// Result of the war, once decided.
    #[must_use]
    pub fn winner(world: &World) -> Option<&Winner> {
        world.winner.as_ref()
    }

    /// Inspector contents, while the overlay is visible.
    #[must_use]
    pub fn inspection(world: &World) -> Option<&Inspection> {
        world.inspection.as_ref()
    }

    /// Captures the per-tribe counters alongside their display names.
    #[must_use]
    pub fn scoreboard(world: &World) -> Vec<ScoreboardRow> {
        world
            .tallies
            .iter()
            .map(|(id, tally)| ScoreboardRow {
                id: id.clone(),
                name: world.tribe_name(id),
                tally: *tally,
            })
            .collect()
    }

    /// Single line of the statistics panel.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ScoreboardRow {
        /// Server identifier of the tribe.
        pub id: String,
        /// Display name, falling back to `Tribe <id>`.
        pub name: String,
        /// Latest counters.
        pub tally: TribeTally,
    }
}
