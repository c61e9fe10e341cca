mod config;
pub mod database;

pub use config::{Config, ProgramConfig, TimerConfig};
pub use database::{Database, RunRecord};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `BEEPTIMER_DATA_DIR` wins when set. Otherwise `~/.config/beeptimer[-dev]/`
/// based on BEEPTIMER_ENV (set BEEPTIMER_ENV=dev for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("BEEPTIMER_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("BEEPTIMER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("beeptimer-dev")
            } else {
                base_dir.join("beeptimer")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
