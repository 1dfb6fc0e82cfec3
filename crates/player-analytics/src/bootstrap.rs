use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use analytics_core::AnalyticsError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name looked up in the discovery directories.
const DATA_FILE_NAME: &str = "players.csv";

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name to an [`EnvFilter`] directive.
///
/// Unknown names fall back to `"warn"`.
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "warn",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr so stdout stays clean for reports. With `log_file`
/// set, events are appended to that file instead, without ANSI colours.
/// `RUST_LOG` overrides `log_level` when present.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            registry.with(layer).try_init()?;
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()?;
        }
    }

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Candidate locations for the player CSV, in lookup order:
/// 1. `<cwd>/data/players.csv`
/// 2. `~/.player-analytics/players.csv`
fn candidate_paths(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join("data").join(DATA_FILE_NAME)];
    if let Some(home) = home {
        candidates.push(home.join(".player-analytics").join(DATA_FILE_NAME));
    }
    candidates
}

/// First existing candidate under `cwd` and `home`.
pub fn discover_data_path_in(cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
    candidate_paths(cwd, home).into_iter().find(|p| p.is_file())
}

/// Attempt to locate the player CSV on the local system.
pub fn discover_data_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_data_path_in(&cwd, dirs::home_dir().as_deref())
}

/// The explicit `--data` path, or the first discovered one.
pub fn resolve_data_path(explicit: Option<&Path>) -> Result<PathBuf, AnalyticsError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => discover_data_path()
            .ok_or_else(|| AnalyticsError::DataPathNotFound(PathBuf::from("data").join(DATA_FILE_NAME))),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
