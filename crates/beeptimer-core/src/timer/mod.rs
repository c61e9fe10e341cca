mod engine;
mod policy;
mod program;

pub use engine::{RunState, TimerEngine, TimerState};
pub use policy::{AdvancePolicy, AutoAdvanceMode};
pub use program::{IntervalConfig, Phase, Program, Step, MIN_WORK_DURATION};
