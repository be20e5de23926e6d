//! The tracking engine — orchestrates one simulation run at a time.
//!
//! RULES:
//!   - All timing is virtual: advance() is the only thing that moves the
//!     clock, and scheduled steps fire only inside advance().
//!   - Starting a new run invalidates every pending step of the previous
//!     run via the scheduler's generation token. A stale step that pops
//!     afterwards is dropped, never executed.
//!   - Hop N's end-of-hop effects are always observed strictly before
//!     hop N+1's start-of-hop effects.
//!   - Every state transition is emitted as a TrackEvent and appended to
//!     the store's event log.

use crate::{
    clock::TrackClock,
    config::MapConfig,
    error::TrackResult,
    event::{event_type_name, EventLogEntry, TrackEvent},
    map::CityMap,
    pathfind::find_path,
    render::{EdgeStyle, RenderSink},
    scheduler::{Scheduler, StepAction},
    sequencer::{HopCompletion, RunState, Sequencer, HOP_DURATION_MS},
    store::{normalize_parcel_id, ParcelStore},
    types::{RunId, TimeMs},
};

/// Reading delay between a successful parcel lookup and the start of its
/// route simulation, in virtual milliseconds.
pub const LOOKUP_DELAY_MS: TimeMs = 1000;

/// How a direct simulation request was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Started { run_id: RunId, path: Vec<String> },
    /// Start equals destination; rejected before any reset or query.
    SameEndpoints,
    /// Unknown city or disconnected endpoints; marker stays hidden.
    NoRoute,
}

/// How a parcel tracking request was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Parcel found; the route simulation starts after LOOKUP_DELAY_MS.
    Scheduled {
        parcel_id: String,
        sender: String,
        receiver: String,
    },
    NotFound { parcel_id: String },
    EmptyId,
}

pub struct TrackEngine {
    pub clock: TrackClock,
    map: CityMap,
    store: ParcelStore,
    scheduler: Scheduler,
    sequencer: Sequencer,
    sink: Box<dyn RenderSink>,
    run_id: Option<RunId>,
    events_out: Vec<TrackEvent>,
}

impl TrackEngine {
    /// Wire an engine from its parts and render the static map.
    pub fn new(map: CityMap, store: ParcelStore, sink: Box<dyn RenderSink>) -> Self {
        let mut engine = Self {
            clock: TrackClock::new(),
            map,
            store,
            scheduler: Scheduler::new(),
            sequencer: Sequencer::new(),
            sink,
            run_id: None,
            events_out: Vec::new(),
        };
        engine.render_static_map();
        engine.sink.set_status_text("Ready.");
        engine
    }

    /// A fully wired engine over the demo map and a seeded in-memory
    /// store. Used by tests and the runner's fallback path.
    pub fn build_demo(sink: Box<dyn RenderSink>) -> TrackResult<Self> {
        let store = ParcelStore::in_memory()?;
        store.migrate()?;
        store.seed_demo_data()?;
        let map = CityMap::from_config(&MapConfig::default_demo())?;
        Ok(Self::new(map, store, sink))
    }

    pub fn map(&self) -> &CityMap {
        &self.map
    }

    pub fn store(&self) -> &ParcelStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParcelStore {
        &mut self.store
    }

    pub fn sink(&self) -> &dyn RenderSink {
        self.sink.as_ref()
    }

    pub fn run_state(&self) -> &RunState {
        self.sequencer.state()
    }

    /// True when no scheduled step is outstanding (stale ones included —
    /// they still need draining, but they will not execute).
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    // ── Entry points (called by the view layer) ────────────────

    /// Animate a route from `start` to `end`.
    ///
    /// Precondition: start != end — rejected with a notice, nothing else
    /// happens. Otherwise the previous run is superseded, visual state is
    /// reset, and on a found route the traversal begins immediately.
    pub fn run_simulation(&mut self, start: &str, end: &str) -> TrackResult<RunOutcome> {
        if start == end {
            self.sink
                .set_status_text("Start and destination are the same.");
            return Ok(RunOutcome::SameEndpoints);
        }

        let generation = self.scheduler.invalidate();
        self.sequencer.reset();
        self.run_id = None;
        self.render_static_map();
        self.sink.set_marker_visible(false);

        let Some(path) = find_path(&self.map, start, end) else {
            self.sink
                .set_status_text(&format!("No route found between {start} and {end}."));
            self.emit(TrackEvent::RouteNotFound {
                start: start.to_string(),
                end: end.to_string(),
            })?;
            return Ok(RunOutcome::NoRoute);
        };

        let run_id = format!("run-{generation}");
        self.run_id = Some(run_id.clone());
        self.store
            .insert_sim_run(&run_id, start, end, &path, self.clock.now())?;
        self.emit(TrackEvent::RunStarted {
            run_id: run_id.clone(),
            generation,
            start: start.to_string(),
            end: end.to_string(),
        })?;
        self.emit(TrackEvent::RouteComputed {
            run_id: run_id.clone(),
            path: path.clone(),
        })?;
        self.sink
            .set_status_text(&format!("Route: {}", path.join(" → ")));

        let first = self.map.require(&path[0])?.clone();
        self.sequencer.begin(path.clone());
        self.sink.set_marker_position(first.x, first.y);
        self.sink.set_marker_visible(true);
        self.sink.mark_node_visited(&path[0]);
        self.emit(TrackEvent::MarkerPlaced {
            run_id: run_id.clone(),
            city: path[0].clone(),
        })?;
        self.begin_hop(0)?;

        Ok(RunOutcome::Started { run_id, path })
    }

    /// Track a parcel by id: look it up, show what was found, then start
    /// the route simulation after a fixed reading delay.
    pub fn run_simulation_for_parcel(&mut self, raw_id: &str) -> TrackResult<LookupOutcome> {
        let id = normalize_parcel_id(raw_id);
        if id.is_empty() {
            self.sink.set_status_text("Enter a parcel id.");
            return Ok(LookupOutcome::EmptyId);
        }

        let Some(parcel) = self.store.get_parcel(&id)? else {
            self.sink.set_status_text(&format!("Parcel {id} not found."));
            self.emit(TrackEvent::ParcelLookupFailed {
                parcel_id: id.clone(),
            })?;
            return Ok(LookupOutcome::NotFound { parcel_id: id });
        };

        // The delayed start belongs to this request now; any run already
        // animating (or an earlier pending lookup) is superseded here.
        self.scheduler.invalidate();
        self.sink.set_status_text(&format!(
            "Found parcel {id}. Tracking from {} to {}...",
            parcel.sender, parcel.receiver
        ));
        self.emit(TrackEvent::ParcelFound {
            parcel_id: id.clone(),
            sender: parcel.sender.clone(),
            receiver: parcel.receiver.clone(),
        })?;
        self.scheduler.schedule_in(
            self.clock.now(),
            LOOKUP_DELAY_MS,
            StepAction::BeginTracking {
                start: parcel.sender.clone(),
                end: parcel.receiver.clone(),
            },
        );

        Ok(LookupOutcome::Scheduled {
            parcel_id: id,
            sender: parcel.sender,
            receiver: parcel.receiver,
        })
    }

    /// Viewport-resize hook: rebuild the static visuals and re-apply the
    /// active run's marks. The run's logical state (step index, visited
    /// order, pending timers) is untouched.
    pub fn redraw(&mut self) -> TrackResult<()> {
        self.render_static_map();
        let state = self.sequencer.state().clone();
        if state == RunState::Idle {
            return Ok(());
        }

        let visited = self.sequencer.visited().to_vec();
        for pair in visited.windows(2) {
            let from = self.map.require(&pair[0])?.clone();
            let to = self.map.require(&pair[1])?.clone();
            self.sink.draw_edge(&from, &to, EdgeStyle::ActiveRoute);
        }
        if let RunState::Transitioning { hop } = state {
            if let Some((from, to)) = self.sequencer.hop_endpoints(hop) {
                let (from, to) = (from.to_string(), to.to_string());
                let from = self.map.require(&from)?.clone();
                let to = self.map.require(&to)?.clone();
                self.sink.draw_edge(&from, &to, EdgeStyle::ActiveRoute);
            }
        }
        for city in &visited {
            self.sink.mark_node_visited(city);
        }
        if let Some(current) = self.sequencer.current_city() {
            let city = self.map.require(current)?.clone();
            self.sink.set_marker_position(city.x, city.y);
            self.sink.set_marker_visible(true);
        }
        Ok(())
    }

    // ── The cooperative pump ───────────────────────────────────

    /// Advance virtual time by `delta_ms`, firing every due step in
    /// (due time, schedule order). Returns the events emitted, including
    /// those of steps that chained new work inside the window.
    pub fn advance(&mut self, delta_ms: TimeMs) -> TrackResult<Vec<TrackEvent>> {
        let target = self.clock.now().saturating_add(delta_ms);
        while let Some(step) = self.scheduler.pop_due(target) {
            if step.due_ms > self.clock.now() {
                self.clock.advance_to(step.due_ms);
            }
            if step.generation != self.scheduler.generation() {
                log::debug!(
                    "dropping stale step {:?} from generation {}",
                    step.action,
                    step.generation
                );
                continue;
            }
            self.dispatch(step.action)?;
        }
        self.clock.advance_to(target);
        Ok(self.drain_events())
    }

    /// Keep advancing until no scheduled step remains. Terminates: every
    /// run's chain of steps is bounded by its path length.
    pub fn run_until_idle(&mut self) -> TrackResult<Vec<TrackEvent>> {
        let mut events = Vec::new();
        while let Some(due) = self.scheduler.peek_due() {
            let delta = due.saturating_sub(self.clock.now());
            events.extend(self.advance(delta)?);
        }
        Ok(events)
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<TrackEvent> {
        std::mem::take(&mut self.events_out)
    }

    // ── Internals ──────────────────────────────────────────────

    fn dispatch(&mut self, action: StepAction) -> TrackResult<()> {
        match action {
            StepAction::CompleteHop { hop } => self.complete_hop(hop),
            StepAction::BeginTracking { start, end } => {
                let outcome = self.run_simulation(&start, &end)?;
                log::debug!("scheduled tracking began: {outcome:?}");
                Ok(())
            }
        }
    }

    fn begin_hop(&mut self, hop: usize) -> TrackResult<()> {
        let Some((from, to)) = self.sequencer.hop_endpoints(hop) else {
            log::warn!("begin_hop({hop}) has no endpoints; path exhausted");
            return Ok(());
        };
        let (from, to) = (from.to_string(), to.to_string());
        let from_city = self.map.require(&from)?.clone();
        let to_city = self.map.require(&to)?.clone();

        self.sink
            .draw_edge(&from_city, &to_city, EdgeStyle::ActiveRoute);
        self.sink
            .set_status_text(&format!("In transit: {from} → {to}"));
        self.sink
            .begin_marker_move(&from_city, &to_city, HOP_DURATION_MS);
        self.sequencer.start_hop(hop);

        let run_id = self.run_id.clone().unwrap_or_default();
        self.emit(TrackEvent::HopStarted {
            run_id,
            hop,
            from,
            to,
            duration_ms: HOP_DURATION_MS,
        })?;
        self.scheduler.schedule_in(
            self.clock.now(),
            HOP_DURATION_MS,
            StepAction::CompleteHop { hop },
        );
        Ok(())
    }

    fn complete_hop(&mut self, hop: usize) -> TrackResult<()> {
        let Some(completion) = self.sequencer.complete_hop(hop) else {
            // Generation filtering should make this unreachable.
            log::warn!(
                "complete_hop({hop}) ignored in state {:?}",
                self.sequencer.state()
            );
            return Ok(());
        };
        let run_id = self.run_id.clone().unwrap_or_default();

        match completion {
            HopCompletion::Advanced { reached, next_hop } => {
                let city = self.map.require(&reached)?.clone();
                self.sink.set_marker_position(city.x, city.y);
                self.sink.mark_node_visited(&reached);
                self.emit(TrackEvent::HopCompleted {
                    run_id,
                    hop,
                    city: reached,
                })?;
                self.begin_hop(next_hop)?;
            }
            HopCompletion::Arrived { reached } => {
                let city = self.map.require(&reached)?.clone();
                self.sink.set_marker_position(city.x, city.y);
                self.sink.mark_node_visited(&reached);
                self.emit(TrackEvent::HopCompleted {
                    run_id: run_id.clone(),
                    hop,
                    city: reached.clone(),
                })?;
                self.sink.append_status_text(" (arrived at destination)");
                self.store.mark_sim_run_arrived(&run_id, self.clock.now())?;
                self.emit(TrackEvent::Arrived {
                    run_id,
                    city: reached,
                })?;
            }
        }
        Ok(())
    }

    fn render_static_map(&mut self) {
        self.sink.clear();
        for (a, b) in self.map.connections() {
            // Connections are validated at map construction; both hit.
            if let (Some(from), Some(to)) = (self.map.city(a), self.map.city(b)) {
                self.sink.draw_edge(from, to, EdgeStyle::Background);
            }
        }
        for city in self.map.cities() {
            self.sink.draw_node(city);
        }
    }

    fn emit(&mut self, event: TrackEvent) -> TrackResult<()> {
        let entry = EventLogEntry {
            id: None,
            time_ms: self.clock.now(),
            generation: self.scheduler.generation(),
            event_type: event_type_name(&event).to_string(),
            payload: serde_json::to_string(&event)?,
        };
        self.store.append_event(&entry)?;
        log::debug!("t={}ms {}", entry.time_ms, entry.event_type);
        self.events_out.push(event);
        Ok(())
    }
}
