//! Tracking events — everything observable about a simulation run.
//!
//! RULE: The engine emits events for every state transition and appends
//! each one to the store's event log. Consumers (runner, tests) read the
//! log or the returned event batches; they never poke at engine internals.

use crate::types::{Generation, ParcelId, RunId, TimeMs};
use serde::{Deserialize, Serialize};

/// Every event emitted during tracking. Variants are appended over time —
/// never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackEvent {
    // ── Run lifecycle ──────────────────────────────
    RunStarted {
        run_id: RunId,
        generation: Generation,
        start: String,
        end: String,
    },
    RouteComputed {
        run_id: RunId,
        path: Vec<String>,
    },
    RouteNotFound {
        start: String,
        end: String,
    },

    // ── Traversal ──────────────────────────────────
    MarkerPlaced {
        run_id: RunId,
        city: String,
    },
    HopStarted {
        run_id: RunId,
        hop: usize,
        from: String,
        to: String,
        duration_ms: TimeMs,
    },
    HopCompleted {
        run_id: RunId,
        hop: usize,
        city: String,
    },
    Arrived {
        run_id: RunId,
        city: String,
    },

    // ── Parcel lookup ──────────────────────────────
    ParcelFound {
        parcel_id: ParcelId,
        sender: String,
        receiver: String,
    },
    ParcelLookupFailed {
        parcel_id: ParcelId,
    },
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub time_ms: TimeMs,
    pub generation: Generation,
    pub event_type: String,
    pub payload: String, // JSON-serialized TrackEvent
}

/// Extract a stable string name from a TrackEvent variant.
/// Used for the event_type column in event_log.
pub fn event_type_name(event: &TrackEvent) -> &'static str {
    match event {
        TrackEvent::RunStarted { .. }         => "run_started",
        TrackEvent::RouteComputed { .. }      => "route_computed",
        TrackEvent::RouteNotFound { .. }      => "route_not_found",
        TrackEvent::MarkerPlaced { .. }       => "marker_placed",
        TrackEvent::HopStarted { .. }         => "hop_started",
        TrackEvent::HopCompleted { .. }       => "hop_completed",
        TrackEvent::Arrived { .. }            => "arrived",
        TrackEvent::ParcelFound { .. }        => "parcel_found",
        TrackEvent::ParcelLookupFailed { .. } => "parcel_lookup_failed",
    }
}
