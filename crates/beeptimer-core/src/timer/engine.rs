//! Interval phase engine.
//!
//! The engine is a wall-clock state machine with no internal thread and no
//! clock of its own: every time-dependent call takes `now`. Remaining time is
//! always derived from the stored end instant, so arbitrarily long gaps
//! between observations never cause drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> (Paused <-> Running) -> ... -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(IntervalConfig::from_secs(30, 15, 3, "Legs"));
//! engine.start(Utc::now());
//! // Foreground, on every display refresh:
//! engine.check_completion(Utc::now(), AutoAdvanceMode::FullAuto);
//! // After the host was suspended:
//! engine.reconcile_after_gap(Utc::now());
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::policy::{AdvancePolicy, AutoAdvanceMode};
use super::program::{duration_ms, IntervalConfig, Phase};
use crate::events::Event;

/// Coarse state tag, for hosts that only need to know which buttons to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunState {
    Idle,
    /// `ends_at - started_at` is the phase length at the moment it began.
    Running {
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
    /// Remaining time captured at the instant of pausing.
    Paused {
        #[serde(rename = "remaining_ms", with = "duration_ms")]
        remaining: Duration,
    },
}

impl RunState {
    pub fn tag(&self) -> TimerState {
        match self {
            RunState::Idle => TimerState::Idle,
            RunState::Running { .. } => TimerState::Running,
            RunState::Paused { .. } => TimerState::Paused,
        }
    }
}

/// Core interval engine.
///
/// Single owner, synchronous. Mutating calls return the [`Event`] describing
/// the transition they caused, or `None` when the call did not apply to the
/// current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerEngine {
    config: IntervalConfig,
    phase: Phase,
    /// 1-based, within `1..=config.total_sets()`.
    set_index: u32,
    state: RunState,
}

impl TimerEngine {
    pub fn new(config: IntervalConfig) -> Self {
        Self {
            config,
            phase: Phase::Work,
            set_index: 1,
            state: RunState::Idle,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state.tag()
    }

    pub fn run_state(&self) -> RunState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_index(&self) -> u32 {
        self.set_index
    }

    pub fn config(&self) -> &IntervalConfig {
        &self.config
    }

    /// Configured length of the current phase.
    pub fn current_total(&self) -> Duration {
        self.config.duration_of(self.phase)
    }

    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        match self.state {
            RunState::Idle => self.config.work(),
            RunState::Running { ends_at, .. } => until(now, ends_at),
            RunState::Paused { remaining } => remaining,
        }
    }

    /// Fraction of the current phase still remaining, in `0.0..=1.0`.
    ///
    /// Zero for a zero-length phase.
    pub fn progress_at(&self, now: DateTime<Utc>) -> f64 {
        let total = self.current_total();
        if total.is_zero() {
            return 0.0;
        }
        (self.remaining_at(now).as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Remaining time rounded up to whole seconds, as a countdown shows it.
    pub fn display_remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let rem = self.remaining_at(now);
        rem.as_secs() + u64::from(rem.subsec_nanos() > 0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        let ends_at = match self.state {
            RunState::Running { ends_at, .. } => Some(ends_at),
            _ => None,
        };
        Event::StateSnapshot {
            state: self.state(),
            phase: self.phase,
            set_index: self.set_index,
            total_sets: self.config.total_sets(),
            label: self.config.label().to_string(),
            remaining_ms: millis(self.remaining_at(now)),
            total_ms: millis(self.current_total()),
            progress: self.progress_at(now),
            display_remaining_secs: self.display_remaining_secs(now),
            ends_at,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the configuration. Out-of-range values are clamped.
    ///
    /// The run state and phase are left alone; call [`stop`](Self::stop)
    /// first for a fresh run.
    pub fn configure(&mut self, work: Duration, rest: Duration, sets: u32, label: impl Into<String>) {
        self.set_config(IntervalConfig::new(work, rest, sets, label));
    }

    pub fn set_config(&mut self, config: IntervalConfig) {
        self.config = config;
        self.set_index = self.set_index.min(self.config.total_sets());
        debug!(
            work_ms = millis(self.config.work()),
            rest_ms = millis(self.config.rest()),
            total_sets = self.config.total_sets(),
            "configured"
        );
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        match self.state {
            RunState::Idle => {
                self.set_index = 1;
                self.phase = Phase::Work;
                Some(self.begin_phase(now))
            }
            RunState::Paused { remaining } => Some(self.resume(remaining, now)),
            RunState::Running { .. } => None, // Already running.
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let RunState::Running { ends_at, .. } = self.state else {
            return None;
        };
        let remaining = until(now, ends_at);
        self.state = RunState::Paused { remaining };
        debug!(phase = %self.phase, set_index = self.set_index, remaining_ms = millis(remaining), "paused");
        Some(Event::TimerPaused {
            remaining_ms: millis(remaining),
            at: now,
        })
    }

    /// Run the current phase for `remaining`, starting at `now`, whatever
    /// the previous state.
    pub fn resume(&mut self, remaining: Duration, now: DateTime<Utc>) -> Event {
        self.state = RunState::Running {
            started_at: now,
            ends_at: offset(now, remaining),
        };
        debug!(phase = %self.phase, set_index = self.set_index, remaining_ms = millis(remaining), "resumed");
        Event::TimerResumed {
            remaining_ms: millis(remaining),
            at: now,
        }
    }

    pub fn stop(&mut self, now: DateTime<Utc>) -> Event {
        self.state = RunState::Idle;
        self.phase = Phase::Work;
        self.set_index = 1;
        debug!("stopped");
        Event::TimerStopped { at: now }
    }

    /// Foreground completion check. Safe to call on every display tick.
    pub fn check_completion(&mut self, now: DateTime<Utc>, policy: impl AdvancePolicy) -> Option<Event> {
        if !self.is_expired(now) {
            return None;
        }
        Some(self.advance(now, policy))
    }

    /// Move past the current phase boundary, honouring the auto-advance mode.
    pub fn advance(&mut self, now: DateTime<Utc>, policy: impl AdvancePolicy) -> Event {
        let mode = policy.auto_advance_mode();
        debug!(phase = %self.phase, set_index = self.set_index, %mode, "advancing");
        self.cross_boundary(mode, now)
    }

    /// Resolve a boundary crossed while the host was not observing.
    ///
    /// Never starts a phase: a phase started here would carry a `now` that
    /// is already stale, so the next phase is parked at its full length (or
    /// the run ends). Resolves at most one boundary per call; a later call
    /// resolves the next one.
    pub fn reconcile_after_gap(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.is_expired(now) {
            return None;
        }
        debug!(phase = %self.phase, set_index = self.set_index, "reconciling after gap");
        Some(self.cross_boundary(AutoAdvanceMode::Manual, now))
    }

    /// Jump to the work phase of `target` (clamped to the configured sets)
    /// and start it.
    pub fn go_to_set(&mut self, target: u32, now: DateTime<Utc>) -> Event {
        self.set_index = target.clamp(1, self.config.total_sets());
        self.phase = Phase::Work;
        self.begin_phase(now)
    }

    pub fn previous_set(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.set_index <= 1 {
            return None;
        }
        Some(self.go_to_set(self.set_index - 1, now))
    }

    /// No-op on the last set: the run cannot be skipped past its end.
    pub fn next_set(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.set_index >= self.config.total_sets() {
            return None;
        }
        Some(self.go_to_set(self.set_index + 1, now))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.state, RunState::Running { ends_at, .. } if now >= ends_at)
    }

    fn cross_boundary(&mut self, mode: AutoAdvanceMode, now: DateTime<Utc>) -> Event {
        match self.phase {
            Phase::Work => {
                self.phase = Phase::Rest;
                if mode.auto_starts_rest() {
                    self.begin_phase(now)
                } else {
                    self.park(now)
                }
            }
            Phase::Rest if self.set_index < self.config.total_sets() => {
                self.set_index += 1;
                self.phase = Phase::Work;
                if mode.auto_starts_next_set() {
                    self.begin_phase(now)
                } else {
                    self.park(now)
                }
            }
            Phase::Rest => self.finish_run(now),
        }
    }

    fn begin_phase(&mut self, now: DateTime<Utc>) -> Event {
        let duration = self.current_total();
        self.state = RunState::Running {
            started_at: now,
            ends_at: offset(now, duration),
        };
        debug!(phase = %self.phase, set_index = self.set_index, "phase started");
        Event::PhaseChanged {
            phase: self.phase,
            set_index: self.set_index,
            duration_ms: millis(duration),
            at: now,
        }
    }

    /// Hold the current phase at its full length until started explicitly.
    fn park(&mut self, now: DateTime<Utc>) -> Event {
        let remaining = self.current_total();
        self.state = RunState::Paused { remaining };
        debug!(phase = %self.phase, set_index = self.set_index, "phase awaiting start");
        Event::PhaseAwaiting {
            phase: self.phase,
            set_index: self.set_index,
            remaining_ms: millis(remaining),
            at: now,
        }
    }

    fn finish_run(&mut self, now: DateTime<Utc>) -> Event {
        self.state = RunState::Idle;
        self.phase = Phase::Work;
        info!(label = self.config.label(), total_sets = self.config.total_sets(), "run ended");
        Event::RunEnded {
            label: self.config.label().to_string(),
            total_sets: self.config.total_sets(),
            at: now,
        }
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(IntervalConfig::default())
    }
}

/// Non-negative time from `now` until `end`.
fn until(now: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    end.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO)
}

fn offset(now: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(d)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
