//! Traversal state machine — one simulation run over a fixed path.
//!
//! States: Idle → Positioned → Transitioning(0) → … →
//! Transitioning(N−1) → Arrived. The sequencer holds only logical state
//! (path, step, visited order); the engine owns timing and rendering
//! around it. Hops are strictly sequential: hop i+1 cannot start until
//! hop i has been completed.

use crate::types::TimeMs;

/// Fixed duration of one hop transition, in virtual milliseconds.
pub const HOP_DURATION_MS: TimeMs = 1500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    /// Marker placed at the path's first city, nothing moving yet.
    Positioned,
    /// Marker moving from path[hop] to path[hop + 1].
    Transitioning { hop: usize },
    /// Terminal. A new run must reset to Idle first.
    Arrived,
}

/// Outcome of completing a hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopCompletion {
    /// Reached an intermediate city; the next hop may begin.
    Advanced { reached: String, next_hop: usize },
    /// Reached the final city of the path.
    Arrived { reached: String },
}

pub struct Sequencer {
    path: Vec<String>,
    state: RunState,
    /// Cities reached so far, in visit order. Drives node activation and
    /// redraw after a viewport resize.
    visited: Vec<String>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            path: Vec::new(),
            state: RunState::Idle,
            visited: Vec::new(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    /// The city the marker logically sits at: the last one reached.
    pub fn current_city(&self) -> Option<&str> {
        self.visited.last().map(String::as_str)
    }

    /// Clear all run state back to Idle.
    pub fn reset(&mut self) {
        self.path.clear();
        self.visited.clear();
        self.state = RunState::Idle;
    }

    /// Adopt a path and position at its first city. The path must be
    /// non-empty; a one-city path arrives immediately.
    pub fn begin(&mut self, path: Vec<String>) {
        assert!(!path.is_empty(), "begin() requires a non-empty path");
        self.visited.clear();
        self.visited.push(path[0].clone());
        self.state = if path.len() == 1 {
            RunState::Arrived
        } else {
            RunState::Positioned
        };
        self.path = path;
    }

    /// Endpoints of hop `hop`, if the path has one.
    pub fn hop_endpoints(&self, hop: usize) -> Option<(&str, &str)> {
        let from = self.path.get(hop)?;
        let to = self.path.get(hop + 1)?;
        Some((from, to))
    }

    /// Enter Transitioning(hop). Valid from Positioned (hop 0) or after
    /// completing hop − 1.
    pub fn start_hop(&mut self, hop: usize) {
        debug_assert!(hop + 1 < self.path.len(), "hop index out of range");
        self.state = RunState::Transitioning { hop };
    }

    /// Complete the hop currently in transit: mark its destination
    /// visited and either advance or arrive. Returns None when no hop is
    /// in transit (stale or out-of-order call).
    pub fn complete_hop(&mut self, hop: usize) -> Option<HopCompletion> {
        match self.state {
            RunState::Transitioning { hop: current } if current == hop => {}
            _ => return None,
        }
        let reached = self.path[hop + 1].clone();
        self.visited.push(reached.clone());

        if hop + 2 == self.path.len() {
            self.state = RunState::Arrived;
            Some(HopCompletion::Arrived { reached })
        } else {
            Some(HopCompletion::Advanced {
                reached,
                next_hop: hop + 1,
            })
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
