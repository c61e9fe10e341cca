//! # BeepTimer Core Library
//!
//! This library provides the core logic of BeepTimer, an interval-training
//! timer that alternates work and rest phases across a number of sets.
//! The CLI binary is a thin host over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock state machine with no internal thread.
//!   Callers poll [`TimerEngine::check_completion`] while watching and call
//!   [`TimerEngine::reconcile_after_gap`] after the host was suspended.
//! - **Events**: Every transition returns an [`Event`]; [`TimerObserver`]
//!   receives the phase-changed and run-ended notifications.
//! - **Storage**: TOML configuration and an SQLite run history, both outside
//!   the engine.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`AdvancePolicy`]: Source of the auto-advance mode
//! - [`Config`]: Application configuration management
//! - [`Database`]: Run history and host state persistence

pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::{Event, TimerObserver};
pub use storage::{Config, Database, RunRecord};
pub use timer::{
    AdvancePolicy, AutoAdvanceMode, IntervalConfig, Phase, Program, RunState, Step, TimerEngine,
    TimerState,
};
