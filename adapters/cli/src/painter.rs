//! Headless backend that reports frames through tracing.

use anyhow::Result;
use tracing::{debug, info};
use tribe_war_core::protocol::Inspection;
use tribe_war_rendering::{Frame, RenderingBackend, SpriteKey, StatsPanel, Viewport};

/// Cell counts of one frame, grouped by what the cells depict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct FrameCensus {
    /// Terrain tiles.
    pub(crate) terrain: usize,
    /// Trees, rocks and hills.
    pub(crate) features: usize,
    /// Border tiles.
    pub(crate) borders: usize,
    /// Tribe members.
    pub(crate) entities: usize,
    /// Cells holding codes the client does not know.
    pub(crate) unknown: usize,
}

impl FrameCensus {
    /// Tallies the cells of `frame`.
    #[must_use]
    pub(crate) fn of(frame: &Frame) -> Self {
        let mut census = Self::default();
        for cell in &frame.cells {
            match cell.sprite {
                SpriteKey::Terrain(_) => census.terrain += 1,
                SpriteKey::Feature(..) => census.features += 1,
                SpriteKey::Border => census.borders += 1,
                SpriteKey::Entity(..) => census.entities += 1,
                SpriteKey::Unknown => census.unknown += 1,
            }
        }
        census
    }
}

/// Presents frames as log lines instead of pixels.
///
/// Every frame is logged at `debug`. Changes to the phase, banner, simulation
/// controls and inspector are logged at `info` so they stay visible with the
/// default filter; tribe counters are logged at `debug`.
#[derive(Debug, Default)]
pub(crate) struct TracingPainter {
    frames: u64,
    phase_label: String,
    banner: Option<String>,
    stats: Option<StatsPanel>,
    inspector: Option<Inspection>,
}

impl TracingPainter {
    /// Number of frames presented.
    #[must_use]
    pub(crate) const fn frames(&self) -> u64 {
        self.frames
    }
}

impl RenderingBackend for TracingPainter {
    fn present(&mut self, frame: &Frame, viewport: &Viewport) -> Result<()> {
        self.frames += 1;
        let census = FrameCensus::of(frame);
        debug!(
            frame = self.frames,
            cell_size = viewport.cell_size(),
            zoom = viewport.zoom(),
            terrain = census.terrain,
            features = census.features,
            borders = census.borders,
            entities = census.entities,
            unknown = census.unknown,
            "frame presented"
        );

        if frame.phase_label != self.phase_label {
            info!(phase = %frame.phase_label, "phase");
            self.phase_label.clone_from(&frame.phase_label);
        }
        let overlays = &frame.overlays;
        if overlays.banner != self.banner {
            if let Some(banner) = &overlays.banner {
                info!(%banner, "war decided");
            }
            self.banner.clone_from(&overlays.banner);
        }
        if overlays.stats != self.stats {
            if let Some(stats) = &overlays.stats {
                report_stats(self.stats.as_ref(), stats);
            }
            self.stats.clone_from(&overlays.stats);
        }
        if overlays.inspector != self.inspector {
            match &overlays.inspector {
                Some(inspection) => report_inspection(inspection),
                None => debug!("inspector closed"),
            }
            self.inspector.clone_from(&overlays.inspector);
        }
        Ok(())
    }
}

fn report_stats(previous: Option<&StatsPanel>, stats: &StatsPanel) {
    let controls_changed = previous.map_or(true, |previous| {
        previous.speed != stats.speed || previous.paused != stats.paused
    });
    if controls_changed {
        info!(speed = stats.speed, paused = stats.paused, "simulation");
    }
    for tribe in &stats.tribes {
        debug!(
            tribe = %tribe.name,
            count = tribe.count,
            wood = tribe.wood,
            stone = tribe.stone,
            "tribe"
        );
    }
}

fn report_inspection(inspection: &Inspection) {
    if inspection.empty {
        info!("inspected cell is empty");
        return;
    }
    info!(
        name = inspection.name.as_deref().unwrap_or("unknown"),
        health = ?inspection.health,
        weapon = ?inspection.weapon,
        armor = ?inspection.armor,
        damage = ?inspection.damage,
        defense = ?inspection.defense,
        evasion = ?inspection.evasion,
        rank = ?inspection.rank,
        "inspected"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tribe_war_core::{Biome, CellCoord, Facing};
    use tribe_war_rendering::{CellSprite, Color, FeatureKind, Overlays, TribeLine};

    fn sprite(column: u32, sprite: SpriteKey) -> CellSprite {
        CellSprite {
            cell: CellCoord::new(column, 0),
            sprite,
            fallback: Color::from_hex(0x333333),
        }
    }

    #[test]
    fn census_groups_cells_by_sprite() {
        let frame = Frame {
            cells: vec![
                sprite(0, SpriteKey::Terrain(Biome::Snow)),
                sprite(1, SpriteKey::Terrain(Biome::Snow)),
                sprite(2, SpriteKey::Feature(FeatureKind::Rocks, Biome::Snow)),
                sprite(3, SpriteKey::Entity(Biome::Snow, Facing::Left)),
                sprite(4, SpriteKey::Unknown),
            ],
            phase_label: "Phase 5: Play".to_owned(),
            overlays: Overlays::default(),
        };

        assert_eq!(
            FrameCensus::of(&frame),
            FrameCensus {
                terrain: 2,
                features: 1,
                borders: 0,
                entities: 1,
                unknown: 1,
            }
        );
    }

    #[test]
    fn painter_counts_presented_frames() {
        let viewport = Viewport::new(Vec2::new(800.0, 600.0)).expect("canvas");
        let frame = Frame {
            cells: Vec::new(),
            phase_label: "Phase 1: Paint Terrain".to_owned(),
            overlays: Overlays {
                banner: Some("Draw".to_owned()),
                ..Overlays::default()
            },
        };
        let mut painter = TracingPainter::default();

        painter.present(&frame, &viewport).expect("present");
        painter.present(&frame, &viewport).expect("present");

        assert_eq!(painter.frames(), 2);
    }

    #[test]
    fn painter_remembers_latest_overlays() {
        let viewport = Viewport::new(Vec2::new(800.0, 600.0)).expect("canvas");
        let stats = StatsPanel {
            speed: 2.0,
            paused: true,
            tribes: vec![TribeLine {
                name: "Norsca".to_owned(),
                count: 9,
                wood: 4,
                stone: 2,
            }],
        };
        let inspection = Inspection {
            name: Some("Norsca Entity #2".to_owned()),
            health: Some(80),
            ..Inspection::default()
        };
        let mut frame = Frame {
            cells: Vec::new(),
            phase_label: "Phase 5: Play".to_owned(),
            overlays: Overlays {
                banner: None,
                stats: Some(stats.clone()),
                inspector: Some(inspection.clone()),
            },
        };
        let mut painter = TracingPainter::default();

        painter.present(&frame, &viewport).expect("present");
        assert_eq!(painter.stats, Some(stats));
        assert_eq!(painter.inspector, Some(inspection));

        frame.overlays.inspector = None;
        painter.present(&frame, &viewport).expect("present");
        assert_eq!(painter.inspector, None);
    }
}
