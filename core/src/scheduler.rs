//! Delayed-step scheduler — the crate's only source of "later".
//!
//! Steps are plain data, not closures: the engine interprets them at fire
//! time, so there is no ambient state captured in callbacks. Each step
//! records the generation current when it was scheduled; invalidate()
//! bumps the generation and thereby turns every outstanding step into a
//! no-op. Stale steps are filtered by the engine when they pop.

use crate::types::{Generation, TimeMs};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// What to do when a scheduled step fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// The current hop's duration has elapsed; the marker has reached
    /// the hop's destination.
    CompleteHop { hop: usize },
    /// The post-lookup reading delay has elapsed; start tracking the
    /// parcel's route.
    BeginTracking { start: String, end: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStep {
    pub due_ms: TimeMs,
    /// Schedule order, breaks ties between steps due at the same time.
    pub seq: u64,
    pub generation: Generation,
    pub action: StepAction,
}

impl Ord for PendingStep {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

impl PartialOrd for PendingStep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct Scheduler {
    generation: Generation,
    next_seq: u64,
    pending: BinaryHeap<Reverse<PendingStep>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            generation: 0,
            next_seq: 0,
            pending: BinaryHeap::new(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Supersede all outstanding steps. Returns the new generation.
    pub fn invalidate(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }

    /// Schedule an action `delay_ms` after `now_ms`, tagged with the
    /// current generation.
    pub fn schedule_in(&mut self, now_ms: TimeMs, delay_ms: TimeMs, action: StepAction) {
        let step = PendingStep {
            due_ms: now_ms + delay_ms,
            seq: self.next_seq,
            generation: self.generation,
            action,
        };
        self.next_seq += 1;
        self.pending.push(Reverse(step));
    }

    /// Earliest due time among outstanding steps, stale ones included
    /// (they still have to be drained).
    pub fn peek_due(&self) -> Option<TimeMs> {
        self.pending.peek().map(|Reverse(step)| step.due_ms)
    }

    /// Pop the next step due at or before `limit_ms`, in (due, seq) order.
    pub fn pop_due(&mut self, limit_ms: TimeMs) -> Option<PendingStep> {
        match self.pending.peek() {
            Some(Reverse(step)) if step.due_ms <= limit_ms => {
                self.pending.pop().map(|Reverse(step)| step)
            }
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
