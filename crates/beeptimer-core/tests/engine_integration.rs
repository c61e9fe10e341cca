//! Integration tests for the interval engine.
//!
//! Drives whole runs through the public API the way a host does: a
//! foreground refresh loop calling `check_completion`, and a background
//! synchronizer calling `reconcile_after_gap` after long gaps.

use std::time::Duration;

use beeptimer_core::{
    AutoAdvanceMode, Event, IntervalConfig, Phase, RunState, TimerEngine, TimerObserver,
    TimerState,
};
use chrono::{DateTime, TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 3, 7, 30, 0).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

fn at_ms(ms: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::milliseconds(ms)
}

fn five_three_two() -> TimerEngine {
    TimerEngine::new(IntervalConfig::from_secs(5, 3, 2, "Intervals"))
}

#[derive(Default)]
struct Recorder {
    phases: Vec<(Phase, u32)>,
    runs_ended: usize,
}

impl TimerObserver for Recorder {
    fn on_phase_changed(&mut self, phase: Phase, set_index: u32) {
        self.phases.push((phase, set_index));
    }

    fn on_run_ended(&mut self) {
        self.runs_ended += 1;
    }
}

fn forward(event: Option<Event>, rec: &mut Recorder) {
    if let Some(event) = event {
        event.notify(rec);
    }
}

#[test]
fn full_auto_run_walks_every_boundary() {
    let mut engine = five_three_two();
    let mut rec = Recorder::default();
    let mode = AutoAdvanceMode::FullAuto;

    forward(engine.start(at(0)), &mut rec);
    assert_eq!(engine.phase(), Phase::Work);
    assert_eq!(engine.set_index(), 1);

    // Not yet expired.
    assert!(engine.check_completion(at(4), mode).is_none());

    forward(engine.check_completion(at(5), mode), &mut rec);
    assert_eq!(engine.phase(), Phase::Rest);
    assert_eq!(engine.state(), TimerState::Running);
    assert_eq!(engine.remaining_at(at(5)), Duration::from_secs(3));

    forward(engine.check_completion(at(8), mode), &mut rec);
    assert_eq!(engine.phase(), Phase::Work);
    assert_eq!(engine.set_index(), 2);
    assert_eq!(engine.remaining_at(at(8)), Duration::from_secs(5));

    forward(engine.check_completion(at(13), mode), &mut rec);
    assert_eq!(engine.phase(), Phase::Rest);
    assert_eq!(engine.set_index(), 2);

    let ended = engine.check_completion(at(16), mode);
    assert!(matches!(ended, Some(Event::RunEnded { total_sets: 2, .. })));
    forward(ended, &mut rec);

    assert_eq!(engine.state(), TimerState::Idle);
    assert_eq!(engine.phase(), Phase::Work);
    assert_eq!(engine.set_index(), 2);
    assert_eq!(rec.runs_ended, 1);
    assert_eq!(
        rec.phases,
        vec![
            (Phase::Work, 1),
            (Phase::Rest, 1),
            (Phase::Work, 2),
            (Phase::Rest, 2),
        ]
    );

    // Ticks after the run ended never fire again.
    for t in 17..40 {
        forward(engine.check_completion(at(t), mode), &mut rec);
    }
    assert_eq!(rec.runs_ended, 1);
}

#[test]
fn late_tick_starts_next_phase_at_observation() {
    let mut engine = five_three_two();
    engine.start(at(0));
    // Observed two seconds late: the rest window starts at the observation.
    engine.check_completion(at(7), AutoAdvanceMode::FullAuto);
    assert_eq!(
        engine.run_state(),
        RunState::Running {
            started_at: at(7),
            ends_at: at(10),
        }
    );
}

#[test]
fn manual_mode_never_auto_starts() {
    let mut engine = five_three_two();
    let mode = AutoAdvanceMode::Manual;
    engine.start(at(0));

    let event = engine.check_completion(at(5), mode);
    assert!(matches!(
        event,
        Some(Event::PhaseAwaiting {
            phase: Phase::Rest,
            set_index: 1,
            remaining_ms: 3000,
            ..
        })
    ));
    assert_eq!(
        engine.run_state(),
        RunState::Paused {
            remaining: Duration::from_secs(3)
        }
    );

    // Time passing does not move a parked phase.
    assert!(engine.check_completion(at(500), mode).is_none());
    assert_eq!(engine.remaining_at(at(500)), Duration::from_secs(3));

    engine.start(at(600));
    assert_eq!(engine.state(), TimerState::Running);
    engine.check_completion(at(603), mode);
    assert_eq!(engine.phase(), Phase::Work);
    assert_eq!(engine.set_index(), 2);
    assert_eq!(
        engine.run_state(),
        RunState::Paused {
            remaining: Duration::from_secs(5)
        }
    );
}

#[test]
fn set_auto_pauses_only_between_sets() {
    let mut engine = five_three_two();
    let mode = AutoAdvanceMode::SetAuto;
    engine.start(at(0));

    engine.check_completion(at(5), mode);
    assert_eq!(engine.phase(), Phase::Rest);
    assert_eq!(engine.state(), TimerState::Running);

    engine.check_completion(at(8), mode);
    assert_eq!(engine.phase(), Phase::Work);
    assert_eq!(engine.set_index(), 2);
    assert_eq!(engine.state(), TimerState::Paused);
    assert_eq!(engine.remaining_at(at(100)), Duration::from_secs(5));
}

#[test]
fn explicit_resume_with_new_duration() {
    let mut engine = five_three_two();
    engine.start(at(0));
    engine.check_completion(at(5), AutoAdvanceMode::Manual);

    engine.resume(Duration::from_secs(10), at(20));
    assert_eq!(
        engine.run_state(),
        RunState::Running {
            started_at: at(20),
            ends_at: at(30),
        }
    );
}

#[test]
fn pause_resume_does_not_count_paused_time() {
    let mut engine = five_three_two();
    engine.start(at_ms(0));
    engine.pause(at_ms(1_500));
    engine.start(at_ms(61_500));
    assert_eq!(
        engine.run_state(),
        RunState::Running {
            started_at: at_ms(61_500),
            ends_at: at_ms(61_500 + 3_500),
        }
    );
}

#[test]
fn pause_after_expiry_captures_zero() {
    let mut engine = five_three_two();
    engine.start(at(0));
    engine.pause(at(9));
    assert_eq!(
        engine.run_state(),
        RunState::Paused {
            remaining: Duration::ZERO
        }
    );
}

#[test]
fn completion_check_is_idempotent() {
    let mut once = five_three_two();
    once.start(at(0));
    once.check_completion(at(6), AutoAdvanceMode::FullAuto);

    let mut twice = five_three_two();
    twice.start(at(0));
    twice.check_completion(at(6), AutoAdvanceMode::FullAuto);
    assert!(twice
        .check_completion(at(6), AutoAdvanceMode::FullAuto)
        .is_none());

    assert_eq!(once, twice);
}

#[test]
fn reconcile_after_long_gap_parks_next_phase() {
    let mut engine = TimerEngine::new(IntervalConfig::from_secs(2, 3, 2, ""));
    engine.start(at(0));

    let event = engine.reconcile_after_gap(at(100));
    assert!(matches!(event, Some(Event::PhaseAwaiting { .. })));
    assert_eq!(engine.phase(), Phase::Rest);
    assert_eq!(
        engine.run_state(),
        RunState::Paused {
            remaining: Duration::from_secs(3)
        }
    );

    // One boundary per call: nothing further is running, so nothing resolves.
    assert!(engine.reconcile_after_gap(at(200)).is_none());
    assert_eq!(engine.state(), TimerState::Paused);
}

#[test]
fn reconcile_ignores_full_auto_policy() {
    let mut engine = five_three_two();
    engine.start(at(0));
    engine.check_completion(at(5), AutoAdvanceMode::FullAuto);
    assert_eq!(engine.phase(), Phase::Rest);

    // Rest ran out while suspended: next set's work is parked, not started.
    engine.reconcile_after_gap(at(60));
    assert_eq!(engine.phase(), Phase::Work);
    assert_eq!(engine.set_index(), 2);
    assert_eq!(
        engine.run_state(),
        RunState::Paused {
            remaining: Duration::from_secs(5)
        }
    );
}

#[test]
fn reconcile_resolves_later_boundaries_on_later_calls() {
    let mut engine = five_three_two();
    let mut rec = Recorder::default();

    forward(engine.start(at(0)), &mut rec);
    forward(engine.reconcile_after_gap(at(30)), &mut rec);
    assert_eq!(engine.phase(), Phase::Rest);

    forward(engine.start(at(31)), &mut rec);
    forward(engine.reconcile_after_gap(at(90)), &mut rec);
    assert_eq!(engine.set_index(), 2);
    assert_eq!(engine.phase(), Phase::Work);

    forward(engine.start(at(91)), &mut rec);
    forward(engine.reconcile_after_gap(at(120)), &mut rec);
    assert_eq!(engine.phase(), Phase::Rest);

    forward(engine.start(at(121)), &mut rec);
    let ended = engine.reconcile_after_gap(at(500));
    assert!(matches!(ended, Some(Event::RunEnded { .. })));
    forward(ended, &mut rec);

    assert_eq!(engine.state(), TimerState::Idle);
    assert_eq!(rec.runs_ended, 1);
    // Resumed phases are not "begun", so only the first work phase notified.
    assert_eq!(rec.phases, vec![(Phase::Work, 1)]);
}

#[test]
fn reconcile_before_expiry_keeps_running() {
    let mut engine = five_three_two();
    engine.start(at(0));
    assert!(engine.reconcile_after_gap(at(3)).is_none());
    assert_eq!(engine.state(), TimerState::Running);
    assert_eq!(engine.remaining_at(at(3)), Duration::from_secs(2));
}

#[test]
fn restart_after_completion_begins_fresh_run() {
    let mut engine = TimerEngine::new(IntervalConfig::from_secs(1, 1, 1, ""));
    engine.start(at(0));
    engine.check_completion(at(1), AutoAdvanceMode::FullAuto);
    engine.check_completion(at(2), AutoAdvanceMode::FullAuto);
    assert_eq!(engine.state(), TimerState::Idle);

    let event = engine.start(at(10));
    assert!(matches!(
        event,
        Some(Event::PhaseChanged {
            phase: Phase::Work,
            set_index: 1,
            duration_ms: 1000,
            ..
        })
    ));
}

#[test]
fn configure_mid_run_applies_at_next_phase() {
    let mut engine = five_three_two();
    engine.start(at(0));
    engine.configure(Duration::from_secs(5), Duration::from_secs(20), 2, "Longer rest");

    // The running window is untouched.
    assert_eq!(engine.remaining_at(at(1)), Duration::from_secs(4));

    engine.check_completion(at(5), AutoAdvanceMode::FullAuto);
    assert_eq!(engine.remaining_at(at(5)), Duration::from_secs(20));
}
