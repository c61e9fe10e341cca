use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, TimerState};

/// Every state change of the engine produces an Event.
///
/// Events are returned synchronously from the call that caused the
/// transition; hosts forward them to a [`TimerObserver`] or mirror them
/// to external surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A phase began running.
    PhaseChanged {
        phase: Phase,
        set_index: u32,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    /// A phase boundary was crossed and the next phase waits to be started.
    PhaseAwaiting {
        phase: Phase,
        set_index: u32,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        at: DateTime<Utc>,
    },
    /// The final set's rest ended. Fires once per completed run.
    RunEnded {
        label: String,
        total_sets: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        phase: Phase,
        set_index: u32,
        total_sets: u32,
        label: String,
        remaining_ms: u64,
        total_ms: u64,
        /// Fraction of the current phase still remaining, 0.0 ..= 1.0.
        progress: f64,
        display_remaining_secs: u64,
        /// Only meaningful while running.
        ends_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Forward the notification-bearing events to `observer`.
    pub fn notify(&self, observer: &mut dyn TimerObserver) {
        match self {
            Event::PhaseChanged {
                phase, set_index, ..
            } => observer.on_phase_changed(*phase, *set_index),
            Event::RunEnded { .. } => observer.on_run_ended(),
            _ => {}
        }
    }
}

/// Receiver for the engine's two notification channels.
///
/// Both methods default to no-ops so observers only implement what they use.
pub trait TimerObserver {
    fn on_phase_changed(&mut self, _phase: Phase, _set_index: u32) {}

    fn on_run_ended(&mut self) {}
}
