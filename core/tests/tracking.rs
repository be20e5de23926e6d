//! Orchestrator tests — endpoint validation, parcel lookups, run
//! supersession and the resize redraw.

use swiftex_core::{
    config::{CityConfig, MapConfig},
    engine::{LookupOutcome, RunOutcome, TrackEngine, LOOKUP_DELAY_MS},
    event::TrackEvent,
    map::CityMap,
    render::{RecordingSink, RenderOp},
    sequencer::{RunState, HOP_DURATION_MS},
    store::ParcelStore,
};

fn demo_engine() -> TrackEngine {
    TrackEngine::build_demo(Box::new(RecordingSink::default())).expect("demo engine")
}

/// Demo engine whose map carries an extra city with no connections.
fn engine_with_isolated_city() -> TrackEngine {
    let store = ParcelStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    store.seed_demo_data().expect("seed");

    let mut config = MapConfig::default_demo();
    config.cities.push(CityConfig {
        name: "Gwadar".into(),
        x: 5.0,
        y: 95.0,
    });
    let map = CityMap::from_config(&config).expect("map");
    TrackEngine::new(map, store, Box::new(RecordingSink::default()))
}

fn recording(engine: &TrackEngine) -> &RecordingSink {
    engine
        .sink()
        .as_any()
        .downcast_ref::<RecordingSink>()
        .expect("recording sink")
}

/// start == end is rejected with a notice before any reset, query or
/// event. Nothing else may happen.
#[test]
fn same_endpoints_rejected_before_any_reset() {
    let mut engine = demo_engine();
    let ops_before = recording(&engine).ops.len();

    let outcome = engine.run_simulation("Multan", "Multan").unwrap();
    assert_eq!(outcome, RunOutcome::SameEndpoints);

    let new_ops = &recording(&engine).ops[ops_before..];
    assert_eq!(
        new_ops,
        [RenderOp::SetStatusText {
            text: "Start and destination are the same.".into()
        }],
        "only the notice may be shown"
    );
    assert!(engine.store().all_events().unwrap().is_empty());
    assert!(engine.is_idle());
    assert_eq!(*engine.run_state(), RunState::Idle);
}

/// Disconnected endpoints report "no route" and leave the marker hidden.
#[test]
fn no_route_reports_and_hides_marker() {
    let mut engine = engine_with_isolated_city();

    let outcome = engine.run_simulation("Karachi", "Gwadar").unwrap();
    assert_eq!(outcome, RunOutcome::NoRoute);
    assert_eq!(engine.store().event_count("route_not_found").unwrap(), 1);
    assert!(engine.is_idle());

    let sink = recording(&engine);
    let marker_ops: Vec<&RenderOp> = sink
        .ops
        .iter()
        .filter(|op| matches!(op, RenderOp::SetMarkerVisible { .. }))
        .collect();
    assert_eq!(
        marker_ops,
        [&RenderOp::SetMarkerVisible { visible: false }],
        "marker must stay hidden"
    );
    assert_eq!(
        sink.status_text(),
        "No route found between Karachi and Gwadar."
    );
}

/// An endpoint missing from the city set behaves exactly like no-route.
#[test]
fn unknown_city_treated_as_no_route() {
    let mut engine = demo_engine();
    let outcome = engine.run_simulation("Karachi", "Atlantis").unwrap();
    assert_eq!(outcome, RunOutcome::NoRoute);
    assert_eq!(engine.store().event_count("hop_started").unwrap(), 0);
}

/// A found parcel starts its route simulation after exactly the fixed
/// reading delay, using the parcel's sender and receiver.
#[test]
fn parcel_flow_resolves_after_fixed_delay() {
    let mut engine = demo_engine();

    // Lookup is normalized: trimmed and uppercased.
    let outcome = engine.run_simulation_for_parcel(" sw1002 ").unwrap();
    assert_eq!(
        outcome,
        LookupOutcome::Scheduled {
            parcel_id: "SW1002".into(),
            sender: "Hyderabad".into(),
            receiver: "Islamabad".into(),
        }
    );

    // One tick short of the delay: nothing starts.
    let early = engine.advance(LOOKUP_DELAY_MS - 1).unwrap();
    assert!(!early
        .iter()
        .any(|e| matches!(e, TrackEvent::RunStarted { .. })));

    // The delay elapses: the route run begins with the parcel endpoints.
    let started = engine.advance(1).unwrap();
    assert!(started.iter().any(|e| matches!(
        e,
        TrackEvent::RunStarted { start, end, .. }
            if start == "Hyderabad" && end == "Islamabad"
    )));

    engine.run_until_idle().unwrap();
    assert_eq!(*engine.run_state(), RunState::Arrived);

    // Hyderabad → Sukkur → Multan → Islamabad: three hops after the delay.
    let run = engine
        .store()
        .get_sim_run("run-2")
        .unwrap()
        .expect("run recorded");
    assert_eq!(run.path, ["Hyderabad", "Sukkur", "Multan", "Islamabad"]);
    assert_eq!(run.started_ms, LOOKUP_DELAY_MS);
    assert_eq!(run.arrived_ms, Some(LOOKUP_DELAY_MS + 3 * HOP_DURATION_MS));
}

/// An unknown id reports immediately and schedules nothing.
#[test]
fn unknown_parcel_fails_immediately_with_no_delayed_side_effect() {
    let mut engine = demo_engine();

    let outcome = engine.run_simulation_for_parcel("SW9999").unwrap();
    assert_eq!(
        outcome,
        LookupOutcome::NotFound {
            parcel_id: "SW9999".into()
        }
    );
    assert!(engine.is_idle(), "no delayed step may be scheduled");
    assert_eq!(
        engine.store().event_count("parcel_lookup_failed").unwrap(),
        1
    );
    assert_eq!(recording(&engine).status_text(), "Parcel SW9999 not found.");

    let later = engine.advance(10 * LOOKUP_DELAY_MS).unwrap();
    assert!(later.is_empty());
}

#[test]
fn empty_id_is_a_notice_only() {
    let mut engine = demo_engine();
    let outcome = engine.run_simulation_for_parcel("   ").unwrap();
    assert_eq!(outcome, LookupOutcome::EmptyId);
    assert!(engine.is_idle());
    assert!(engine.store().all_events().unwrap().is_empty());
}

/// Starting a new run while the previous run's hop timer is pending must
/// not let the stale timer mutate the reset state.
#[test]
fn new_run_supersedes_pending_hop_timer() {
    let mut engine = demo_engine();

    engine.run_simulation("Karachi", "Sukkur").unwrap();
    engine.advance(100).unwrap(); // old hop timer still pending at 1500

    engine.run_simulation("Lahore", "Peshawar").unwrap();
    let mut events = engine.drain_events();
    events.extend(engine.run_until_idle().unwrap());

    // The old run's first hop would have reached Hyderabad. It must not.
    assert!(
        !events.iter().any(|e| matches!(
            e,
            TrackEvent::HopCompleted { city, .. } if city == "Hyderabad"
        )),
        "stale hop from the superseded run executed"
    );
    assert!(events.iter().any(|e| matches!(
        e,
        TrackEvent::Arrived { city, .. } if city == "Peshawar"
    )));
    assert_eq!(engine.store().event_count("arrived").unwrap(), 1);

    // Nothing ever visited Hyderabad in the store's log either.
    let stale = engine
        .store()
        .all_events()
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "hop_completed" && e.payload.contains("Hyderabad"))
        .count();
    assert_eq!(stale, 0);
}

/// A new run started during the parcel-lookup delay supersedes the
/// pending lookup step as well.
#[test]
fn new_run_supersedes_pending_lookup() {
    let mut engine = demo_engine();

    engine.run_simulation_for_parcel("SW1002").unwrap();
    engine.advance(500).unwrap(); // lookup step still pending at 1000

    engine.run_simulation("Karachi", "Hyderabad").unwrap();
    engine.run_until_idle().unwrap();

    assert_eq!(engine.store().event_count("run_started").unwrap(), 1);
    let starts: Vec<String> = engine
        .store()
        .all_events()
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "run_started")
        .map(|e| e.payload)
        .collect();
    assert!(
        starts[0].contains("Karachi"),
        "the manual run must be the one that started: {}",
        starts[0]
    );
    assert!(engine
        .store()
        .all_events()
        .unwrap()
        .iter()
        .any(|e| e.event_type == "arrived" && e.payload.contains("Hyderabad")));
}

/// A consecutive parcel lookup supersedes the earlier pending lookup:
/// only the latest request's run starts.
#[test]
fn later_lookup_wins_over_earlier_pending_lookup() {
    let mut engine = demo_engine();

    engine.run_simulation_for_parcel("SW1002").unwrap(); // Hyderabad → Islamabad
    engine.advance(200).unwrap();
    engine.run_simulation_for_parcel("SW1003").unwrap(); // Multan → Sukkur
    engine.run_until_idle().unwrap();

    assert_eq!(engine.store().event_count("run_started").unwrap(), 1);
    assert!(engine
        .store()
        .all_events()
        .unwrap()
        .iter()
        .any(|e| e.event_type == "arrived" && e.payload.contains("Sukkur")));
}

/// Redraw rebuilds the static visuals without disturbing the run's
/// logical state: the traversal continues and arrives on schedule.
#[test]
fn redraw_preserves_logical_run_state() {
    let mut engine = demo_engine();

    engine.run_simulation("Karachi", "Islamabad").unwrap();
    engine.advance(HOP_DURATION_MS).unwrap(); // hop 0 done, hop 1 in transit
    assert_eq!(*engine.run_state(), RunState::Transitioning { hop: 1 });

    engine.redraw().unwrap();
    assert_eq!(
        *engine.run_state(),
        RunState::Transitioning { hop: 1 },
        "redraw must not touch the step index"
    );

    // Visited marks were re-applied after the redraw's clear.
    let sink = recording(&engine);
    let last_clear = sink
        .ops
        .iter()
        .rposition(|op| *op == RenderOp::Clear)
        .unwrap();
    let after: Vec<&RenderOp> = sink.ops[last_clear..].iter().collect();
    assert!(after.contains(&&RenderOp::MarkNodeVisited {
        city: "Karachi".into()
    }));
    assert!(after.contains(&&RenderOp::MarkNodeVisited {
        city: "Hyderabad".into()
    }));

    engine.run_until_idle().unwrap();
    assert_eq!(*engine.run_state(), RunState::Arrived);
    let run = engine
        .store()
        .get_sim_run("run-1")
        .unwrap()
        .expect("run recorded");
    assert_eq!(run.arrived_ms, Some(4 * HOP_DURATION_MS));
}
