//! Client session: the single owner and mutator of client state.

use std::time::Duration;

use glam::Vec2;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tribe_war_core::{
    protocol::{ClientRequest, Placement},
    step_speed, BuilderPhase, CellCoord, Command, Event, Grid,
};
use tribe_war_rendering::{
    compose_frame, AssetLatch, Overlays, RenderingBackend, RenderingError, StatsPanel, TribeLine,
    Viewport,
};
use tribe_war_system_builder::{Advance, Builder, BuilderError, PaintPlan, PaintThrottle};
use tribe_war_system_facing::FacingTracker;
use tribe_war_system_flood_fill::BatchSchedule;
use tribe_war_world::{self as world, query, Winner, World};

use crate::{
    action::UserAction,
    decode::{decode_text, DecodeError, InboundFrame, ServerEvent, ServerEventKind},
};

/// Traffic the session asks the transport to carry.
#[derive(Clone, Debug, PartialEq)]
pub enum Outgoing {
    /// Sends a single request immediately.
    Send(ClientRequest),
    /// Releases a batch schedule at its own pace.
    Paced(BatchSchedule),
    /// Aborts every paced schedule still in flight.
    CancelPaced,
}

/// User-visible messages produced while handling frames and actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Progress information.
    Info(String),
    /// An action or submission was refused.
    Rejected(String),
}

/// Result of handling one inbound frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// A binary snapshot replaced the grid.
    GridReplaced,
    /// A text event changed client state.
    Applied(ServerEventKind),
    /// A text event was valid but not meaningful in the current phase.
    Ignored(ServerEventKind),
    /// The frame could not be decoded and was dropped.
    Dropped(DecodeError),
}

/// Local reasons a user action was refused.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The builder refused the gesture.
    #[error(transparent)]
    Builder(#[from] BuilderError),
    /// Simulation controls unlock once the server accepted the map.
    #[error("available once the map is running, not during {phase}")]
    SimulationLocked {
        /// Current builder phase.
        phase: BuilderPhase,
    },
    /// The war was already started since the last reset.
    #[error("the war has already started")]
    WarAlreadyStarted,
    /// The canvas size was rejected.
    #[error(transparent)]
    Canvas(#[from] RenderingError),
}

/// Client state driven by inbound frames and user actions.
///
/// Every mutation goes through the session; the transport only moves frames
/// in and drains [`Outgoing`] traffic out.
#[derive(Debug)]
pub struct Session<R> {
    world: World,
    facing: FacingTracker,
    builder: Builder,
    viewport: Viewport,
    backend: R,
    throttle: PaintThrottle,
    assets: AssetLatch,
    war_started: bool,
    events: Vec<Event>,
    outgoing: Vec<Outgoing>,
    notices: Vec<Notice>,
    redraws: u64,
}

impl<R> Session<R>
where
    R: RenderingBackend,
{
    /// Creates a session presenting through `backend`, expecting `sprites` asset loads.
    pub fn new(backend: R, canvas: Vec2, sprites: usize) -> Result<Self, RenderingError> {
        Ok(Self {
            world: World::new(),
            facing: FacingTracker::new(),
            builder: Builder::new(),
            viewport: Viewport::new(canvas)?,
            backend,
            throttle: PaintThrottle::default(),
            assets: AssetLatch::new(sprites),
            war_started: false,
            events: Vec::new(),
            outgoing: Vec::new(),
            notices: Vec::new(),
            redraws: 0,
        })
    }

    /// Handles one inbound frame and redraws exactly once afterwards.
    pub fn handle_frame(&mut self, frame: InboundFrame) -> FrameOutcome {
        let outcome = match frame {
            InboundFrame::Binary(bytes) => match Grid::from_bytes(bytes) {
                Ok(grid) => {
                    let _ = self.execute(Command::ReplaceGrid { grid });
                    FrameOutcome::GridReplaced
                }
                Err(error) => {
                    warn!(%error, "dropping grid snapshot");
                    FrameOutcome::Dropped(error.into())
                }
            },
            InboundFrame::Text(text) => match decode_text(&text) {
                Ok(event) => self.dispatch(event),
                Err(error) => {
                    warn!(%error, "dropping text frame");
                    FrameOutcome::Dropped(error)
                }
            },
        };
        self.redraw();
        outcome
    }

    fn dispatch(&mut self, event: ServerEvent) -> FrameOutcome {
        let kind = event.kind();
        let running = self.builder.phase() == BuilderPhase::Simulation;
        match event {
            ServerEvent::InspectResponse(inspection) if running => {
                let _ = self.execute(Command::ShowInspection { inspection });
            }
            ServerEvent::Stats(update) if running => {
                let _ = self.execute(Command::RecordStats { update });
            }
            ServerEvent::InspectResponse(_) | ServerEvent::Stats(_) => {
                debug!(%kind, phase = %self.builder.phase(), "ignoring event outside simulation");
                return FrameOutcome::Ignored(kind);
            }
            ServerEvent::CustomMapInitialized { tribes } => {
                let count = tribes.len();
                let _ = self.builder.confirm_finalized();
                self.war_started = false;
                let _ = self.execute(Command::AdoptTribes { tribes });
                let names: Vec<&str> = query::roster(&self.world)
                    .values()
                    .map(|profile| profile.name.as_str())
                    .collect();
                info!(?names, "custom map initialized");
                self.notices.push(Notice::Info(format!(
                    "Map initialized! {count} tribes created."
                )));
            }
            ServerEvent::CustomMapError { error } => {
                if !self.builder.finalize_pending()
                    && self.builder.phase() != BuilderPhase::TribeConfig
                {
                    debug!(%error, "ignoring unsolicited map error");
                    return FrameOutcome::Ignored(kind);
                }
                self.builder.reject_finalize();
                warn!(%error, "custom map rejected");
                self.notices.push(Notice::Rejected(error));
            }
        }
        FrameOutcome::Applied(kind)
    }

    /// Performs a user action.
    ///
    /// Refused actions leave state untouched, produce no traffic and are
    /// also reported as a [`Notice::Rejected`].
    pub fn perform(&mut self, action: UserAction, now: Duration) -> Result<(), ActionError> {
        let result = self.try_perform(action, now);
        if let Err(error) = &result {
            debug!(?action, %error, "action refused");
            self.notices.push(Notice::Rejected(error.to_string()));
        }
        result
    }

    fn try_perform(&mut self, action: UserAction, now: Duration) -> Result<(), ActionError> {
        match action {
            UserAction::SelectTool(tool) => self.builder.select_tool(tool)?,
            UserAction::SetBrushSize(size) => self.builder.set_brush_size(size)?,
            UserAction::ToggleFillMode => {
                let enabled = self.builder.toggle_fill_mode();
                debug!(enabled, "fill mode toggled");
            }
            UserAction::PaintAt(point) => {
                if let Some(cell) = self.viewport.screen_to_cell(point) {
                    self.paint_cell(cell, now)?;
                }
            }
            UserAction::PaintCell(cell) => self.paint_cell(cell, now)?,
            UserAction::NextPhase {
                confirm_without_borders,
            } => self.next_phase(confirm_without_borders)?,
            UserAction::PreviousPhase => {
                if self.builder.retreat() {
                    self.redraw();
                }
            }
            UserAction::AssignTribe { terrain, archetype } => {
                self.builder
                    .assign_tribe(terrain, archetype, query::grid(&self.world))?;
            }
            UserAction::AutoBorders => self.auto_borders()?,
            UserAction::InspectAt(point) => {
                self.require_simulation()?;
                match self.viewport.screen_to_cell(point) {
                    Some(cell) => self.inspect_cell(cell)?,
                    None => self.close_inspector(),
                }
            }
            UserAction::InspectCell(cell) => self.inspect_cell(cell)?,
            UserAction::CloseInspector => self.close_inspector(),
            UserAction::TogglePause => {
                self.require_simulation()?;
                self.send(ClientRequest::TogglePause);
            }
            UserAction::ChangeSpeed(delta) => {
                self.require_simulation()?;
                let multiplier = step_speed(query::speed(&self.world), delta);
                self.send(ClientRequest::SetSpeed { multiplier });
            }
            UserAction::StartWar => {
                self.require_simulation()?;
                if self.war_started {
                    return Err(ActionError::WarAlreadyStarted);
                }
                self.war_started = true;
                self.send(ClientRequest::StartWar);
            }
            UserAction::ResetWorld => self.reset_world()?,
            UserAction::ResetBuilder => self.reset_builder(),
            UserAction::ZoomIn => self.reframe(Viewport::zoom_in),
            UserAction::ZoomOut => self.reframe(Viewport::zoom_out),
            UserAction::ZoomAt { anchor, zoom_in } => {
                self.reframe(|viewport| viewport.zoom_at(anchor, zoom_in));
            }
            UserAction::Pan(delta) => self.reframe(|viewport| viewport.pan_by(delta)),
            UserAction::ResetView => self.reframe(Viewport::reset),
            UserAction::Resize(canvas) => {
                self.viewport.resize(canvas)?;
                self.redraw();
            }
            UserAction::AssetSettled { loaded } => {
                if self.assets.settle(loaded) {
                    info!(
                        failed = self.assets.failed(),
                        "sprite loading finished"
                    );
                    self.redraw();
                }
            }
        }
        Ok(())
    }

    fn paint_cell(&mut self, cell: CellCoord, now: Duration) -> Result<(), ActionError> {
        let plan = self.builder.paint(cell, query::grid(&self.world))?;
        if !self.throttle.try_acquire(now) {
            return Ok(());
        }
        match plan {
            PaintPlan::Brush(request) => self.send(request),
            PaintPlan::Fill(schedule) => {
                debug!(batches = schedule.remaining(), "flood fill scheduled");
                self.outgoing.push(Outgoing::Paced(schedule));
            }
        }
        Ok(())
    }

    fn next_phase(&mut self, confirm_without_borders: bool) -> Result<(), ActionError> {
        match self
            .builder
            .advance(query::grid(&self.world), || confirm_without_borders)?
        {
            Advance::Moved(phase) => {
                info!(%phase, "builder advanced");
                self.notices.push(Notice::Info(phase.to_string()));
                self.redraw();
            }
            Advance::Declined => {}
            Advance::Finalize(request) => {
                info!("submitting custom map");
                self.notices
                    .push(Notice::Info("Initializing map...".to_owned()));
                self.send(request);
            }
        }
        Ok(())
    }

    fn auto_borders(&mut self) -> Result<(), ActionError> {
        let placements: Vec<Placement> = self.builder.auto_borders(query::grid(&self.world))?;
        let count = placements.len();
        let _ = self.execute(Command::PreviewPlacements {
            placements: placements.clone(),
        });
        self.outgoing
            .push(Outgoing::Paced(BatchSchedule::paced(placements)));
        self.notices
            .push(Notice::Info(format!("Generated {count} border cells")));
        self.redraw();
        Ok(())
    }

    fn inspect_cell(&mut self, cell: CellCoord) -> Result<(), ActionError> {
        self.require_simulation()?;
        if !cell.in_bounds() {
            self.close_inspector();
            return Ok(());
        }
        self.send(ClientRequest::Inspect {
            x: cell.column(),
            y: cell.row(),
        });
        Ok(())
    }

    fn close_inspector(&mut self) {
        if self.execute(Command::HideInspection) {
            self.redraw();
        }
    }

    fn reset_world(&mut self) -> Result<(), ActionError> {
        self.require_simulation()?;
        self.outgoing.push(Outgoing::CancelPaced);
        self.send(ClientRequest::Reset);
        self.war_started = false;
        self.facing.forget();
        let _ = self.execute(Command::ClearWinner);
        // The next render pass compares against nothing, so no facing is
        // inferred from the pre-reset grid.
        self.paint();
        Ok(())
    }

    fn reset_builder(&mut self) {
        self.builder.reset();
        self.war_started = false;
        self.outgoing.push(Outgoing::CancelPaced);
        let _ = self.execute(Command::ClearGrid);
        let _ = self.execute(Command::HideInspection);
        let _ = self.execute(Command::ClearWinner);
        self.redraw();
    }

    fn require_simulation(&self) -> Result<(), ActionError> {
        let phase = self.builder.phase();
        if phase == BuilderPhase::Simulation {
            Ok(())
        } else {
            Err(ActionError::SimulationLocked { phase })
        }
    }

    fn reframe<F>(&mut self, change: F)
    where
        F: FnOnce(&mut Viewport),
    {
        change(&mut self.viewport);
        self.redraw();
    }

    fn send(&mut self, request: ClientRequest) {
        debug!(action = request.action(), "queueing request");
        self.outgoing.push(Outgoing::Send(request));
    }

    /// Applies a world command, returning whether it produced any event.
    fn execute(&mut self, command: Command) -> bool {
        self.events.clear();
        world::apply(&mut self.world, command, &mut self.events);
        self.facing.handle(&self.events);
        !self.events.is_empty()
    }

    /// Runs a render pass: direction inference, then paint.
    fn redraw(&mut self) {
        self.facing.observe(query::grid(&self.world));
        self.paint();
    }

    fn paint(&mut self) {
        let facing = &self.facing;
        let model = &self.world;
        let frame = compose_frame(
            query::grid(model),
            self.builder.phase(),
            self.overlays(),
            |cell| facing.render_facing(cell),
            |code| query::entity_biome(model, code),
        );
        if let Err(error) = self.backend.present(&frame, &self.viewport) {
            error!(?error, "failed to present frame");
        }
        self.redraws += 1;
    }

    fn overlays(&self) -> Overlays {
        let model = &self.world;
        let stats = (self.builder.phase() == BuilderPhase::Simulation).then(|| StatsPanel {
            speed: query::speed(model),
            paused: query::paused(model),
            tribes: query::scoreboard(model)
                .into_iter()
                .map(|row| TribeLine {
                    name: row.name,
                    count: row.tally.count,
                    wood: row.tally.wood,
                    stone: row.tally.stone,
                })
                .collect(),
        });
        Overlays {
            banner: query::winner(model).map(Winner::banner),
            stats,
            inspector: query::inspection(model).cloned(),
        }
    }

    /// Takes the traffic queued since the last drain.
    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    /// Takes the notices produced since the last drain.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Client-side world model.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Map builder state.
    #[must_use]
    pub const fn builder(&self) -> &Builder {
        &self.builder
    }

    /// Entity facing tracker.
    #[must_use]
    pub const fn facing(&self) -> &FacingTracker {
        &self.facing
    }

    /// Current viewport.
    #[must_use]
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Sprite loading progress.
    #[must_use]
    pub const fn assets(&self) -> &AssetLatch {
        &self.assets
    }

    /// Backend frames are presented through.
    #[must_use]
    pub const fn backend(&self) -> &R {
        &self.backend
    }

    /// Number of frames presented so far.
    #[must_use]
    pub const fn redraws(&self) -> u64 {
        self.redraws
    }
}
