//! Animation sequencing tests — timing, ordering, terminal behavior.
//!
//! All timing here is virtual: advance() is the only clock.

use swiftex_core::{
    engine::{RunOutcome, TrackEngine},
    event::TrackEvent,
    render::{RecordingSink, RenderOp},
    sequencer::{RunState, HOP_DURATION_MS},
};

fn demo_engine() -> TrackEngine {
    TrackEngine::build_demo(Box::new(RecordingSink::default())).expect("demo engine")
}

fn recording(engine: &TrackEngine) -> &RecordingSink {
    engine
        .sink()
        .as_any()
        .downcast_ref::<RecordingSink>()
        .expect("recording sink")
}

/// A run over [Karachi, Hyderabad, Sukkur] emits exactly two
/// hop-start/hop-end pairs, reaches Arrived, and never emits a third hop.
#[test]
fn two_hop_run_emits_exactly_two_hop_pairs() {
    let mut engine = demo_engine();

    let outcome = engine.run_simulation("Karachi", "Sukkur").unwrap();
    match outcome {
        RunOutcome::Started { path, .. } => {
            assert_eq!(path, ["Karachi", "Hyderabad", "Sukkur"]);
        }
        other => panic!("expected Started, got {other:?}"),
    }

    engine.run_until_idle().unwrap();
    assert_eq!(*engine.run_state(), RunState::Arrived);
    assert_eq!(engine.store().event_count("hop_started").unwrap(), 2);
    assert_eq!(engine.store().event_count("hop_completed").unwrap(), 2);
    assert_eq!(engine.store().event_count("arrived").unwrap(), 1);

    // Idle and terminal: more time produces nothing.
    let later = engine.advance(10 * HOP_DURATION_MS).unwrap();
    assert!(later.is_empty(), "terminal run must not emit more events");
    assert_eq!(engine.store().event_count("hop_started").unwrap(), 2);
}

/// The end-of-hop event must not fire before the hop duration elapses.
#[test]
fn end_of_hop_never_fires_early() {
    let mut engine = demo_engine();
    engine.run_simulation("Karachi", "Sukkur").unwrap();
    engine.drain_events();

    let early = engine.advance(HOP_DURATION_MS - 1).unwrap();
    assert!(
        !early
            .iter()
            .any(|e| matches!(e, TrackEvent::HopCompleted { .. })),
        "hop completed before its duration elapsed"
    );

    let on_time = engine.advance(1).unwrap();
    assert!(on_time
        .iter()
        .any(|e| matches!(e, TrackEvent::HopCompleted { hop: 0, .. })));
}

/// Hop i's end-of-hop effects are observed strictly before hop i+1's
/// start-of-hop effects.
#[test]
fn hops_are_strictly_sequential() {
    let mut engine = demo_engine();
    engine.run_simulation("Karachi", "Sukkur").unwrap();
    let mut events = engine.drain_events();
    events.extend(engine.run_until_idle().unwrap());

    let index_of = |want: &str, hop: usize| {
        events
            .iter()
            .position(|e| match e {
                TrackEvent::HopStarted { hop: h, .. } => *h == hop && want == "started",
                TrackEvent::HopCompleted { hop: h, .. } => *h == hop && want == "completed",
                _ => false,
            })
            .unwrap_or_else(|| panic!("missing hop {hop} {want}"))
    };

    assert!(index_of("started", 0) < index_of("completed", 0));
    assert!(index_of("completed", 0) < index_of("started", 1));
    assert!(index_of("started", 1) < index_of("completed", 1));
}

/// Arrival appends a permanent indicator to the status text and the
/// route status was shown when the run began.
#[test]
fn status_text_follows_the_run() {
    let mut engine = demo_engine();
    engine.run_simulation("Karachi", "Sukkur").unwrap();
    engine.run_until_idle().unwrap();

    let sink = recording(&engine);
    assert!(sink.ops.contains(&RenderOp::SetStatusText {
        text: "Route: Karachi → Hyderabad → Sukkur".into()
    }));

    let status = sink.status_text();
    assert!(
        status.starts_with("In transit: Hyderabad → Sukkur"),
        "unexpected status: {status}"
    );
    assert!(
        status.ends_with("(arrived at destination)"),
        "unexpected status: {status}"
    );
}

/// The marker is placed at each reached city's coordinates, in path order.
#[test]
fn marker_positions_follow_the_path() {
    let mut engine = demo_engine();
    engine.run_simulation("Karachi", "Sukkur").unwrap();
    engine.run_until_idle().unwrap();

    let positions: Vec<(f64, f64)> = recording(&engine)
        .ops
        .iter()
        .filter_map(|op| match op {
            RenderOp::SetMarkerPosition { x, y } => Some((*x, *y)),
            _ => None,
        })
        .collect();
    assert_eq!(
        positions,
        [(20.0, 85.0), (28.0, 78.0), (35.0, 65.0)],
        "Karachi, Hyderabad, Sukkur in order"
    );
}

/// Visited marks accumulate monotonically along the path.
#[test]
fn nodes_activate_in_visit_order() {
    let mut engine = demo_engine();
    engine.run_simulation("Karachi", "Sukkur").unwrap();
    engine.run_until_idle().unwrap();

    assert_eq!(
        recording(&engine).visited_nodes(),
        ["Karachi", "Hyderabad", "Sukkur"]
    );
}

/// Each hop hands the tween (source, destination, duration) to the sink.
#[test]
fn hop_start_announces_the_tween() {
    let mut engine = demo_engine();
    engine.run_simulation("Karachi", "Sukkur").unwrap();
    engine.run_until_idle().unwrap();

    let tweens: Vec<&RenderOp> = recording(&engine)
        .ops
        .iter()
        .filter(|op| matches!(op, RenderOp::BeginMarkerMove { .. }))
        .collect();
    assert_eq!(
        tweens,
        [
            &RenderOp::BeginMarkerMove {
                from: "Karachi".into(),
                to: "Hyderabad".into(),
                duration_ms: HOP_DURATION_MS,
            },
            &RenderOp::BeginMarkerMove {
                from: "Hyderabad".into(),
                to: "Sukkur".into(),
                duration_ms: HOP_DURATION_MS,
            },
        ]
    );
}
