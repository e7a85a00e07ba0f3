use std::time::Duration;

use tribe_war_core::{
    protocol::ClientRequest, BuilderPhase, CellCode, CellCoord, Grid, TribeArchetype,
};
use tribe_war_system_builder::{
    Advance, Builder, BuilderError, PaintPlan, PaintThrottle, PAINT_THROTTLE,
};
use tribe_war_system_flood_fill::FillError;

fn painted(cells: &[(u32, u32, CellCode)]) -> Grid {
    let mut grid = Grid::empty();
    for (column, row, code) in cells {
        assert!(grid.set(CellCoord::new(*column, *row), *code));
    }
    grid
}

fn builder_in(phase: BuilderPhase, grid: &Grid) -> Builder {
    let mut builder = Builder::new();
    while builder.phase() != phase {
        match builder.advance(grid, || true) {
            Ok(Advance::Moved(_)) => {}
            other => panic!("could not reach {phase:?}: {other:?}"),
        }
    }
    builder
}

#[test]
fn terrain_phase_requires_painted_terrain() {
    let mut builder = Builder::new();

    let result = builder.advance(&Grid::empty(), || true);

    assert_eq!(result, Err(BuilderError::NoTerrainPainted));
    assert_eq!(
        builder.phase(),
        BuilderPhase::Terrain,
        "phase must not advance without terrain"
    );
}

#[test]
fn any_terrain_variant_unlocks_borders() {
    for terrain in CellCode::TERRAINS {
        let mut builder = Builder::new();
        let grid = painted(&[(40, 40, terrain)]);

        assert_eq!(
            builder.advance(&grid, || true),
            Ok(Advance::Moved(BuilderPhase::Borders))
        );
        assert_eq!(
            builder.tool(),
            CellCode::Border,
            "entering the border phase switches to the border tool"
        );
    }
}

#[test]
fn missing_borders_asks_for_confirmation() {
    let grid = painted(&[(1, 1, CellCode::Grass)]);
    let mut builder = builder_in(BuilderPhase::Borders, &grid);
    let mut asked = false;

    let result = builder.advance(&grid, || {
        asked = true;
        false
    });

    assert!(asked, "user must be asked when no border exists");
    assert_eq!(result, Ok(Advance::Declined));
    assert_eq!(builder.phase(), BuilderPhase::Borders);

    assert_eq!(
        builder.advance(&grid, || true),
        Ok(Advance::Moved(BuilderPhase::Features))
    );
}

#[test]
fn painted_borders_skip_confirmation() {
    let grid = painted(&[(1, 1, CellCode::Grass), (2, 1, CellCode::Border)]);
    let mut builder = builder_in(BuilderPhase::Borders, &grid);

    let result = builder.advance(&grid, || panic!("confirmation must not be requested"));

    assert_eq!(result, Ok(Advance::Moved(BuilderPhase::Features)));
}

#[test]
fn tool_outside_whitelist_is_rejected_without_change() {
    let grid = painted(&[(1, 1, CellCode::Grass)]);
    let mut builder = Builder::new();
    builder.select_tool(CellCode::Snow).expect("snow is a terrain tool");

    let result = builder.select_tool(CellCode::Tree);

    assert_eq!(
        result,
        Err(BuilderError::ToolNotPermitted {
            tool: CellCode::Tree,
            phase: BuilderPhase::Terrain,
        })
    );
    assert_eq!(builder.tool(), CellCode::Snow, "rejected selection keeps the tool");

    let mut borders = builder_in(BuilderPhase::Borders, &grid);
    assert!(borders.select_tool(CellCode::Empty).is_err());
    assert!(borders.select_tool(CellCode::Border).is_ok());

    let mut tribes = builder_in(BuilderPhase::TribeConfig, &grid);
    for code in [CellCode::Grass, CellCode::Border, CellCode::Tree, CellCode::Empty] {
        assert!(
            tribes.select_tool(code).is_err(),
            "tribe configuration permits no tools"
        );
    }
}

#[test]
fn brush_stamp_is_clipped_to_grid() {
    let mut builder = Builder::new();
    builder.set_brush_size(3).expect("valid brush");

    let plan = builder
        .paint(CellCoord::new(0, 0), &Grid::empty())
        .expect("terrain painting allowed");

    let PaintPlan::Brush(ClientRequest::PlaceBatch { places }) = plan else {
        panic!("brush mode must produce a single batch");
    };
    assert_eq!(places.len(), 4, "3x3 brush at the corner keeps four cells");
    assert!(places.iter().all(|place| place.code == CellCode::Grass));
}

#[test]
fn even_brush_sizes_round_down_radius() {
    let mut builder = Builder::new();
    builder.set_brush_size(4).expect("valid brush");

    let PaintPlan::Brush(ClientRequest::PlaceBatch { places }) = builder
        .paint(CellCoord::new(50, 50), &Grid::empty())
        .expect("terrain painting allowed")
    else {
        panic!("brush mode must produce a single batch");
    };

    assert_eq!(places.len(), 25);
    assert_eq!(
        builder.set_brush_size(0),
        Err(BuilderError::InvalidBrushSize(0))
    );
}

#[test]
fn fill_mode_is_limited_to_first_two_terrains() {
    let mut builder = Builder::new();
    assert!(builder.toggle_fill_mode());
    builder.select_tool(CellCode::Desert).expect("desert is a terrain tool");

    let result = builder.paint(CellCoord::new(5, 5), &Grid::empty());

    assert_eq!(
        result,
        Err(BuilderError::FillUnsupportedTool {
            tool: CellCode::Desert
        })
    );
}

#[test]
fn fill_mode_produces_paced_schedule() {
    let mut builder = Builder::new();
    let _ = builder.toggle_fill_mode();
    builder.select_tool(CellCode::Snow).expect("snow is a terrain tool");

    let plan = builder
        .paint(CellCoord::new(5, 5), &Grid::empty())
        .expect("empty start is fillable");

    let PaintPlan::Fill(schedule) = plan else {
        panic!("fill mode must produce a schedule");
    };
    assert_eq!(schedule.remaining(), 10);
}

#[test]
fn fill_from_restricted_cell_is_reported() {
    let grid = painted(&[(5, 5, CellCode::Desert)]);
    let mut builder = Builder::new();
    let _ = builder.toggle_fill_mode();

    let result = builder.paint(CellCoord::new(5, 5), &grid);

    assert_eq!(
        result,
        Err(BuilderError::Fill(FillError::UnfillableStart(9)))
    );
}

#[test]
fn painting_is_locked_in_tribe_configuration() {
    let grid = painted(&[(1, 1, CellCode::Grass)]);
    let builder = builder_in(BuilderPhase::TribeConfig, &grid);

    assert_eq!(
        builder.paint(CellCoord::new(1, 1), &grid),
        Err(BuilderError::PaintingLocked {
            phase: BuilderPhase::TribeConfig
        })
    );
}

#[test]
fn finalize_requires_assignment_and_waits_for_server() {
    let grid = painted(&[(1, 1, CellCode::Grass), (2, 2, CellCode::Cemetery)]);
    let mut builder = builder_in(BuilderPhase::TribeConfig, &grid);

    assert_eq!(
        builder.advance(&grid, || true),
        Err(BuilderError::NoTribeAssigned)
    );

    builder
        .assign_tribe(CellCode::Cemetery, Some(TribeArchetype::Sylvania), &grid)
        .expect("cemetery is painted");
    let Ok(Advance::Finalize(ClientRequest::InitCustomMap {
        terrain,
        tribe_assignments,
    })) = builder.advance(&grid, || true)
    else {
        panic!("tribe configuration must finalize");
    };

    assert_eq!(terrain, grid);
    assert_eq!(
        tribe_assignments.get("10"),
        Some(&TribeArchetype::Sylvania)
    );
    assert_eq!(
        builder.phase(),
        BuilderPhase::TribeConfig,
        "phase waits for the server acknowledgement"
    );
    assert!(builder.finalize_pending());
    assert_eq!(
        builder.advance(&grid, || true),
        Err(BuilderError::FinalizePending)
    );
    assert!(!builder.retreat(), "retreat is refused while finalizing");

    assert!(builder.confirm_finalized());
    assert_eq!(builder.phase(), BuilderPhase::Simulation);
    assert_eq!(
        builder.advance(&grid, || true),
        Err(BuilderError::SimulationRunning)
    );
    assert!(!builder.retreat(), "simulation is terminal");
}

#[test]
fn rejected_finalize_returns_to_tribe_configuration() {
    let grid = painted(&[(1, 1, CellCode::Grass)]);
    let mut builder = builder_in(BuilderPhase::TribeConfig, &grid);
    builder
        .assign_tribe(CellCode::Grass, Some(TribeArchetype::Wanderers), &grid)
        .expect("grass is painted");
    let _ = builder.advance(&grid, || true).expect("finalize request");

    builder.reject_finalize();

    assert_eq!(builder.phase(), BuilderPhase::TribeConfig);
    assert!(!builder.finalize_pending());
    assert!(
        builder.paint(CellCoord::new(1, 1), &grid).is_err(),
        "tools stay locked after a rejected finalize"
    );
}

#[test]
fn assignments_only_target_painted_terrain() {
    let grid = painted(&[(1, 1, CellCode::Grass)]);
    let mut builder = builder_in(BuilderPhase::TribeConfig, &grid);

    assert_eq!(
        builder.assign_tribe(CellCode::Snow, Some(TribeArchetype::Norsca), &grid),
        Err(BuilderError::TerrainNotPresent {
            terrain: CellCode::Snow
        })
    );
    builder
        .assign_tribe(CellCode::Grass, Some(TribeArchetype::Norsca), &grid)
        .expect("grass is painted");
    builder
        .assign_tribe(CellCode::Grass, Some(TribeArchetype::Nomads), &grid)
        .expect("reassignment replaces the archetype");

    assert_eq!(builder.assignments().len(), 1);
    assert_eq!(
        builder.assignments().get(&CellCode::Grass),
        Some(&TribeArchetype::Nomads)
    );

    builder
        .assign_tribe(CellCode::Grass, None, &grid)
        .expect("unassigning is allowed");
    assert!(builder.assignments().is_empty());
}

#[test]
fn retreat_walks_back_to_terrain() {
    let grid = painted(&[(1, 1, CellCode::Grass)]);
    let mut builder = builder_in(BuilderPhase::TribeConfig, &grid);

    assert!(builder.retreat());
    assert_eq!(builder.phase(), BuilderPhase::Features);
    assert!(builder.retreat());
    assert!(builder.retreat());
    assert_eq!(builder.phase(), BuilderPhase::Terrain);
    assert!(!builder.retreat(), "retreat from the first phase is a no-op");
    assert_eq!(builder.tool(), CellCode::Grass);
}

#[test]
fn auto_borders_draw_single_lines_between_terrains() {
    let mut cells = Vec::new();
    for row in 0..3 {
        cells.push((0, row, CellCode::Grass));
        cells.push((1, row, CellCode::Grass));
        cells.push((2, row, CellCode::Snow));
        cells.push((3, row, CellCode::Snow));
    }
    let grid = painted(&cells);
    let builder = builder_in(BuilderPhase::Borders, &grid);

    let placements = builder.auto_borders(&grid).expect("boundary exists");

    let columns: Vec<u32> = placements.iter().map(|place| place.x).collect();
    assert_eq!(columns, vec![1, 1, 1], "only the first cell of each boundary converts");
    assert!(placements.iter().all(|place| place.code == CellCode::Border));
}

#[test]
fn auto_borders_require_different_terrains() {
    let grid = painted(&[(1, 1, CellCode::Grass), (2, 1, CellCode::Grass)]);
    let builder = builder_in(BuilderPhase::Borders, &grid);

    assert_eq!(
        builder.auto_borders(&grid),
        Err(BuilderError::NoBordersGenerated)
    );
    assert_eq!(
        Builder::new().auto_borders(&grid),
        Err(BuilderError::WrongPhase {
            phase: BuilderPhase::Terrain
        })
    );
}

#[test]
fn reset_restores_initial_state() {
    let grid = painted(&[(1, 1, CellCode::Grass)]);
    let mut builder = builder_in(BuilderPhase::TribeConfig, &grid);
    builder
        .assign_tribe(CellCode::Grass, Some(TribeArchetype::Wanderers), &grid)
        .expect("grass is painted");

    builder.reset();

    assert_eq!(builder.phase(), BuilderPhase::Terrain);
    assert!(builder.assignments().is_empty());
    assert!(!builder.finalize_pending());
}

#[test]
fn throttle_admits_one_gesture_per_interval() {
    let mut throttle = PaintThrottle::default();
    let start = Duration::from_secs(10);

    assert!(throttle.try_acquire(start));
    assert!(!throttle.try_acquire(start + Duration::from_millis(50)));
    assert!(throttle.try_acquire(start + PAINT_THROTTLE));
}
