use serde::{Deserialize, Serialize};

/// How the engine continues when a phase runs out while being watched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoAdvanceMode {
    /// Runs every phase back to back until the last set ends.
    #[default]
    FullAuto,
    /// Work flows into rest, but each new set waits for the operator.
    SetAuto,
    /// Every boundary waits for the operator.
    Manual,
}

impl AutoAdvanceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AutoAdvanceMode::FullAuto => "full-auto",
            AutoAdvanceMode::SetAuto => "set-auto",
            AutoAdvanceMode::Manual => "manual",
        }
    }

    /// Whether the rest phase starts on its own once work ends.
    pub fn auto_starts_rest(self) -> bool {
        matches!(self, AutoAdvanceMode::FullAuto | AutoAdvanceMode::SetAuto)
    }

    /// Whether the next set's work phase starts on its own once rest ends.
    pub fn auto_starts_next_set(self) -> bool {
        matches!(self, AutoAdvanceMode::FullAuto)
    }
}

impl std::fmt::Display for AutoAdvanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AutoAdvanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full-auto" | "fullauto" | "full" => Ok(AutoAdvanceMode::FullAuto),
            "set-auto" | "setauto" | "set" => Ok(AutoAdvanceMode::SetAuto),
            "manual" => Ok(AutoAdvanceMode::Manual),
            other => Err(format!(
                "unknown auto-advance mode '{other}' (expected full-auto, set-auto or manual)"
            )),
        }
    }
}

/// Read-only source of the auto-advance mode.
///
/// The engine asks for the mode at every advancement instead of holding on
/// to it, so a host can change the setting between phases.
pub trait AdvancePolicy {
    fn auto_advance_mode(&self) -> AutoAdvanceMode;
}

impl AdvancePolicy for AutoAdvanceMode {
    fn auto_advance_mode(&self) -> AutoAdvanceMode {
        *self
    }
}

impl<P: AdvancePolicy + ?Sized> AdvancePolicy for &P {
    fn auto_advance_mode(&self) -> AutoAdvanceMode {
        (**self).auto_advance_mode()
    }
}
