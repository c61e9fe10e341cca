use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest work phase accepted by [`IntervalConfig`].
pub const MIN_WORK_DURATION: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Rest,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::Rest => "rest",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Durations and set count for one run.
///
/// Values are clamped on construction instead of rejected: a zero work
/// length becomes [`MIN_WORK_DURATION`] and zero sets becomes one.
/// Deserialization goes through the same clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawIntervalConfig")]
pub struct IntervalConfig {
    #[serde(rename = "work_ms", with = "duration_ms")]
    work: Duration,
    #[serde(rename = "rest_ms", with = "duration_ms")]
    rest: Duration,
    total_sets: u32,
    #[serde(default)]
    label: String,
}

#[derive(Deserialize)]
struct RawIntervalConfig {
    #[serde(rename = "work_ms", with = "duration_ms")]
    work: Duration,
    #[serde(rename = "rest_ms", with = "duration_ms")]
    rest: Duration,
    total_sets: u32,
    #[serde(default)]
    label: String,
}

impl From<RawIntervalConfig> for IntervalConfig {
    fn from(raw: RawIntervalConfig) -> Self {
        Self::new(raw.work, raw.rest, raw.total_sets, raw.label)
    }
}

impl IntervalConfig {
    pub fn new(work: Duration, rest: Duration, total_sets: u32, label: impl Into<String>) -> Self {
        Self {
            work: work.max(MIN_WORK_DURATION),
            rest,
            total_sets: total_sets.max(1),
            label: label.into(),
        }
    }

    /// Convenience constructor taking whole seconds.
    pub fn from_secs(work_secs: u64, rest_secs: u64, total_sets: u32, label: impl Into<String>) -> Self {
        Self::new(
            Duration::from_secs(work_secs),
            Duration::from_secs(rest_secs),
            total_sets,
            label,
        )
    }

    pub fn work(&self) -> Duration {
        self.work
    }

    pub fn rest(&self) -> Duration {
        self.rest
    }

    pub fn total_sets(&self) -> u32 {
        self.total_sets
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration_of(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Work => self.work,
            Phase::Rest => self.rest,
        }
    }

    /// Length of a whole run, every set's rest included.
    pub fn total_duration(&self) -> Duration {
        self.work.saturating_add(self.rest).saturating_mul(self.total_sets)
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self::from_secs(30, 15, 3, "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: Phase,
    pub seconds: u64,
}

/// A saved interval program: an ordered list of work and rest steps.
///
/// The engine only runs uniform programs (one work length, one rest length),
/// so programs are reduced to an [`IntervalConfig`] before a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub title: String,
    pub steps: Vec<Step>,
}

impl Program {
    /// Alternating work/rest steps, `sets` times.
    pub fn uniform(title: impl Into<String>, work_secs: u64, rest_secs: u64, sets: u32) -> Self {
        let steps = (0..sets)
            .flat_map(|_| {
                [
                    Step {
                        kind: Phase::Work,
                        seconds: work_secs,
                    },
                    Step {
                        kind: Phase::Rest,
                        seconds: rest_secs,
                    },
                ]
            })
            .collect();
        Self {
            title: title.into(),
            steps,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn seconds_of(&self, kind: Phase) -> impl Iterator<Item = u64> + '_ {
        self.steps
            .iter()
            .filter(move |s| s.kind == kind)
            .map(|s| s.seconds)
    }

    /// Number of complete work+rest pairs.
    pub fn sets_count(&self) -> u32 {
        let work = self.seconds_of(Phase::Work).count();
        let rest = self.seconds_of(Phase::Rest).count();
        u32::try_from(work.min(rest)).unwrap_or(u32::MAX)
    }

    /// `(work_secs, rest_secs, sets)` when every work step has one length and
    /// every rest step has one length. `None` for mixed or one-sided programs.
    pub fn as_uniform(&self) -> Option<(u64, u64, u32)> {
        let mut work = self.seconds_of(Phase::Work);
        let mut rest = self.seconds_of(Phase::Rest);
        let w0 = work.next()?;
        let r0 = rest.next()?;
        if work.all(|s| s == w0) && rest.all(|s| s == r0) {
            Some((w0, r0, self.sets_count()))
        } else {
            None
        }
    }

    /// Reduce to a runnable configuration.
    ///
    /// Mixed programs are normalised to their first work and rest lengths.
    pub fn to_interval_config(&self) -> IntervalConfig {
        let (work, rest, sets) = self.as_uniform().unwrap_or_else(|| {
            (
                self.seconds_of(Phase::Work).next().unwrap_or(0),
                self.seconds_of(Phase::Rest).next().unwrap_or(0),
                self.sets_count(),
            )
        });
        IntervalConfig::from_secs(work, rest, sets, self.title.clone())
    }
}

/// Serde adapter storing a `Duration` as integer milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
