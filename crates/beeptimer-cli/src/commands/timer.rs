use std::path::PathBuf;
use std::time::Duration;

use beeptimer_core::{
    Config, CoreError, Database, Event, IntervalConfig, Phase, Program, TimerEngine,
    TimerObserver, TimerState,
};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use tracing::{debug, info, warn};

const ENGINE_KEY: &str = "timer_engine";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Set work/rest lengths and set count, then reset to idle.
    /// Without flags the program from the config file is used.
    Configure {
        /// Work phase length in seconds
        #[arg(long)]
        work: Option<u64>,
        /// Rest phase length in seconds
        #[arg(long)]
        rest: Option<u64>,
        /// Number of sets
        #[arg(long)]
        sets: Option<u32>,
        /// Display label
        #[arg(long)]
        label: Option<String>,
        /// JSON program file with work/rest steps
        #[arg(long, conflicts_with_all = ["work", "rest", "sets"])]
        program: Option<PathBuf>,
    },
    /// Start a run, or continue a paused phase
    Start,
    /// Pause the running phase
    Pause,
    /// Continue the current phase, optionally with a new remaining time
    Resume {
        /// Remaining seconds to run the current phase for
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Stop and reset to the first set
    Stop,
    /// Jump to the next set's work phase
    Next,
    /// Jump back to the previous set's work phase
    Prev,
    /// Jump to the work phase of a given set
    Goto {
        /// 1-based set number (clamped to the configured sets)
        set: u32,
    },
    /// Print current timer state as JSON
    Status,
    /// Follow the running phase in the foreground until it stops running
    Watch {
        /// Refresh interval in milliseconds (defaults to timer.tick_ms)
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Start (or continue) the timer before watching
        #[arg(long)]
        start: bool,
    },
}

/// Records completed runs in the history table.
struct RunHistory<'a> {
    db: &'a Database,
    config: &'a IntervalConfig,
    /// Instant of the transition being dispatched.
    at: DateTime<Utc>,
    error: Option<CoreError>,
}

impl TimerObserver for RunHistory<'_> {
    fn on_phase_changed(&mut self, phase: Phase, set_index: u32) {
        info!(%phase, set_index, "phase started");
    }

    fn on_run_ended(&mut self) {
        if let Err(e) = self.db.record_run(self.config, self.at) {
            self.error = Some(e);
        }
    }
}

/// One CLI invocation's view of the persisted timer.
struct Session {
    db: Database,
    config: Config,
    engine: TimerEngine,
}

impl Session {
    fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open()?;
        let config = Config::load()?;
        let engine = load_engine(&db, &config);
        Ok(Self { db, config, engine })
    }

    /// Print `event`, dispatch its notifications and persist the engine.
    fn emit(&mut self, event: Event) -> Result<(), Box<dyn std::error::Error>> {
        println!("{}", serde_json::to_string(&event)?);

        notify_history(&self.db, self.engine.config(), &event)?;
        self.save()
    }

    fn emit_opt(&mut self, event: Option<Event>) -> Result<(), Box<dyn std::error::Error>> {
        match event {
            Some(event) => self.emit(event),
            None => {
                debug!(state = ?self.engine.state(), "command had no effect");
                Ok(())
            }
        }
    }

    fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(&self.engine)?;
        self.db.kv_set(ENGINE_KEY, &json)?;
        Ok(())
    }
}

fn notify_history(db: &Database, config: &IntervalConfig, event: &Event) -> Result<(), CoreError> {
    let at = match event {
        Event::RunEnded { at, .. } => *at,
        _ => Utc::now(),
    };
    let mut history = RunHistory {
        db,
        config,
        at,
        error: None,
    };
    event.notify(&mut history);
    history.error.map_or(Ok(()), Err)
}

fn load_engine(db: &Database, config: &Config) -> TimerEngine {
    match db.kv_get(ENGINE_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<TimerEngine>(&json) {
            Ok(engine) => return engine,
            Err(e) => warn!(error = %e, "discarding unreadable timer state"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "could not read timer state"),
    }
    TimerEngine::new(config.interval_config())
}

fn configured(
    config: &Config,
    work: Option<u64>,
    rest: Option<u64>,
    sets: Option<u32>,
    label: Option<String>,
    program: Option<PathBuf>,
) -> Result<IntervalConfig, Box<dyn std::error::Error>> {
    if let Some(path) = program {
        let program = Program::from_json(&std::fs::read_to_string(&path)?)?;
        if program.as_uniform().is_none() {
            warn!(title = %program.title, "mixed program normalised to its first work/rest lengths");
        }
        let base = program.to_interval_config();
        return Ok(match label {
            Some(label) => IntervalConfig::new(base.work(), base.rest(), base.total_sets(), label),
            None => base,
        });
    }

    let p = &config.program;
    Ok(IntervalConfig::from_secs(
        work.unwrap_or(p.work_secs),
        rest.unwrap_or(p.rest_secs),
        sets.unwrap_or(p.sets),
        label.unwrap_or_else(|| p.label.clone()),
    ))
}

fn clock(d: u64) -> String {
    format!("{:02}:{:02}", d / 60, d % 60)
}

fn watch(session: &mut Session, tick_ms: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let tick = Duration::from_millis(tick_ms.unwrap_or(session.config.timer.tick_ms).max(10));
    let mut shown = None;

    loop {
        let now = Utc::now();
        if let Some(event) = session.engine.check_completion(now, &session.config) {
            eprintln!();
            session.emit(event)?;
            shown = None;
        }
        if session.engine.state() != TimerState::Running {
            break;
        }

        let line = (
            session.engine.phase(),
            session.engine.set_index(),
            session.engine.display_remaining_secs(now),
        );
        if shown != Some(line) {
            let (phase, set_index, secs) = line;
            eprint!(
                "\r{phase:<4} {set_index}/{}  {}",
                session.engine.config().total_sets(),
                clock(secs)
            );
            shown = Some(line);
        }
        std::thread::sleep(tick);
    }
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    // Every invocation observes the timer after an unknown gap.
    if let Some(event) = session.engine.reconcile_after_gap(Utc::now()) {
        session.emit(event)?;
    }

    let now = Utc::now();
    match action {
        TimerAction::Configure {
            work,
            rest,
            sets,
            label,
            program,
        } => {
            let cfg = configured(&session.config, work, rest, sets, label, program)?;
            session.engine.set_config(cfg);
            let event = session.engine.stop(now);
            session.emit(event)?;
            let snapshot = session.engine.snapshot(now);
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        TimerAction::Start => {
            let event = session.engine.start(now);
            session.emit_opt(event)?;
        }
        TimerAction::Pause => {
            let event = session.engine.pause(now);
            session.emit_opt(event)?;
        }
        TimerAction::Resume { secs: Some(secs) } => {
            let event = session.engine.resume(Duration::from_secs(secs), now);
            session.emit(event)?;
        }
        TimerAction::Resume { secs: None } => {
            let event = match session.engine.state() {
                TimerState::Paused => session.engine.start(now),
                _ => None,
            };
            session.emit_opt(event)?;
        }
        TimerAction::Stop => {
            let event = session.engine.stop(now);
            session.emit(event)?;
        }
        TimerAction::Next => {
            let event = session.engine.next_set(now);
            session.emit_opt(event)?;
        }
        TimerAction::Prev => {
            let event = session.engine.previous_set(now);
            session.emit_opt(event)?;
        }
        TimerAction::Goto { set } => {
            let event = session.engine.go_to_set(set, now);
            session.emit(event)?;
        }
        TimerAction::Status => {
            let snapshot = session.engine.snapshot(now);
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        TimerAction::Watch { tick_ms, start } => {
            if start {
                let event = session.engine.start(now);
                session.emit_opt(event)?;
            }
            watch(&mut session, tick_ms)?;
            let snapshot = session.engine.snapshot(Utc::now());
            println!("{}", serde_json::to_string(&snapshot)?);
        }
    }

    session.save()?;
    Ok(())
}
