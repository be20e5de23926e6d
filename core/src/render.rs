//! Render sink — the seam between the engine and whatever draws the map.
//!
//! RULE: The engine owns all logical state; the sink owns all pixels.
//! A sink must tolerate any call order and must never call back into
//! the engine.

use crate::{map::City, types::TimeMs};
use std::any::Any;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    /// The faint background edge of the static map.
    Background,
    /// An edge on the route currently being traversed.
    ActiveRoute,
}

/// The rendering capability handed to the engine at construction.
pub trait RenderSink {
    /// Drop all drawn nodes, edges and visited marks.
    fn clear(&mut self);

    fn draw_node(&mut self, city: &City);

    fn draw_edge(&mut self, from: &City, to: &City, style: EdgeStyle);

    /// Begin interpolating the marker from `from` to `to` over
    /// `duration_ms`. The engine confirms the final position with
    /// set_marker_position when the hop completes.
    fn begin_marker_move(&mut self, from: &City, to: &City, duration_ms: TimeMs);

    fn set_marker_position(&mut self, x: f64, y: f64);

    fn set_marker_visible(&mut self, visible: bool);

    fn mark_node_visited(&mut self, city: &str);

    fn set_status_text(&mut self, text: &str);

    fn append_status_text(&mut self, text: &str);

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}

/// A sink that draws nothing. For headless use where only the event log
/// matters.
#[derive(Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn clear(&mut self) {}
    fn draw_node(&mut self, _city: &City) {}
    fn draw_edge(&mut self, _from: &City, _to: &City, _style: EdgeStyle) {}
    fn begin_marker_move(&mut self, _from: &City, _to: &City, _duration_ms: TimeMs) {}
    fn set_marker_position(&mut self, _x: f64, _y: f64) {}
    fn set_marker_visible(&mut self, _visible: bool) {}
    fn mark_node_visited(&mut self, _city: &str) {}
    fn set_status_text(&mut self, _text: &str) {}
    fn append_status_text(&mut self, _text: &str) {}
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One recorded sink call. Mirrors the RenderSink methods.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Clear,
    DrawNode { city: String },
    DrawEdge { from: String, to: String, style: EdgeStyle },
    BeginMarkerMove { from: String, to: String, duration_ms: TimeMs },
    SetMarkerPosition { x: f64, y: f64 },
    SetMarkerVisible { visible: bool },
    MarkNodeVisited { city: String },
    SetStatusText { text: String },
    AppendStatusText { text: String },
}

/// A sink that records every call. Used by tests to assert on the exact
/// visual effect sequence of a run.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub ops: Vec<RenderOp>,
}

impl RecordingSink {
    pub fn status_text(&self) -> String {
        let mut text = String::new();
        for op in &self.ops {
            match op {
                RenderOp::SetStatusText { text: t } => text = t.clone(),
                RenderOp::AppendStatusText { text: t } => text.push_str(t),
                _ => {}
            }
        }
        text
    }

    pub fn visited_nodes(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RenderOp::MarkNodeVisited { city } => Some(city.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl RenderSink for RecordingSink {
    fn clear(&mut self) {
        self.ops.push(RenderOp::Clear);
    }

    fn draw_node(&mut self, city: &City) {
        self.ops.push(RenderOp::DrawNode {
            city: city.name.clone(),
        });
    }

    fn draw_edge(&mut self, from: &City, to: &City, style: EdgeStyle) {
        self.ops.push(RenderOp::DrawEdge {
            from: from.name.clone(),
            to: to.name.clone(),
            style,
        });
    }

    fn begin_marker_move(&mut self, from: &City, to: &City, duration_ms: TimeMs) {
        self.ops.push(RenderOp::BeginMarkerMove {
            from: from.name.clone(),
            to: to.name.clone(),
            duration_ms,
        });
    }

    fn set_marker_position(&mut self, x: f64, y: f64) {
        self.ops.push(RenderOp::SetMarkerPosition { x, y });
    }

    fn set_marker_visible(&mut self, visible: bool) {
        self.ops.push(RenderOp::SetMarkerVisible { visible });
    }

    fn mark_node_visited(&mut self, city: &str) {
        self.ops.push(RenderOp::MarkNodeVisited {
            city: city.to_string(),
        });
    }

    fn set_status_text(&mut self, text: &str) {
        self.ops.push(RenderOp::SetStatusText {
            text: text.to_string(),
        });
    }

    fn append_status_text(&mut self, text: &str) {
        self.ops.push(RenderOp::AppendStatusText {
            text: text.to_string(),
        });
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
