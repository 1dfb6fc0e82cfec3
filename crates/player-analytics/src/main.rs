mod bootstrap;
mod report;

use std::io::{self, Write};
use std::process::ExitCode;

use analytics_core::settings::Settings;
use analytics_core::AnalyticsError;
use analytics_core::time_utils::{parse_date, resolve_reference_time};
use analytics_data::analysis::AnalysisResult;
use analytics_data::dashboard::DashboardOptions;
use analytics_data::filter::{FilterCriteria, FilterOptions};
use analytics_runtime::session::AnalyticsSession;
use anyhow::{Context, Result};
use chrono::Utc;

/// Exit status when the dataset cannot be loaded; other failures exit 1.
const EXIT_LOAD_FAILURE: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (code, message) = describe_failure(&e);
            eprintln!("{message}");
            ExitCode::from(code)
        }
    }
}

/// Pick the exit status and one-line message for a failed run.
fn describe_failure(err: &anyhow::Error) -> (u8, String) {
    let load_failure = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<AnalyticsError>())
        .any(AnalyticsError::is_load_error);
    if load_failure {
        (EXIT_LOAD_FAILURE, format!("Failed to load player data: {err:#}"))
    } else {
        (1, format!("Error: {err:#}"))
    }
}

fn run() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("player-analytics v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Timezone: {}, format: {}, interactive: {}",
        settings.timezone,
        settings.format,
        settings.interactive
    );

    let data_path = bootstrap::resolve_data_path(settings.data.as_deref())?;
    let reference =
        resolve_reference_time(settings.reference_date.as_deref(), &settings.timezone, Utc::now())?;
    tracing::info!(path = %data_path.display(), %reference, "loading dataset");

    let options = DashboardOptions {
        top_n: settings.top_n,
        churn_rows: settings.churn_rows,
        high_value_quantile: settings.high_value_quantile,
    };

    let mut session = AnalyticsSession::open(&data_path, reference, options)
        .with_context(|| format!("could not load {}", data_path.display()))?;
    let dataset = session.dataset();
    tracing::info!(
        source = %session.source().display(),
        records = dataset.records.len(),
        warnings = dataset.warnings.len(),
        "dataset ready"
    );

    let criteria = criteria_from_flags(&settings, session.filter_options())?;
    session.set_criteria(criteria);

    let render = |result: &AnalysisResult| -> String {
        if settings.wants_json() {
            serde_json::to_string_pretty(result)
                .unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
        } else {
            report::render_text(result)
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", render(&session.report()))?;

    if settings.interactive {
        tracing::info!("reading filter commands from stdin");
        let stdin = io::stdin();
        let applied = session.run_command_loop(stdin.lock(), &mut out, render)?;
        tracing::info!(applied, "interactive session ended");
    }

    Ok(())
}

/// Build a selection from `--games`, `--devices`, `--from` and `--to`.
///
/// Returns `None` when no flag narrows the selection. Omitted flags default
/// to everything `options` offers.
fn criteria_from_flags(
    settings: &Settings,
    options: &FilterOptions,
) -> Result<Option<FilterCriteria>> {
    if settings.games.is_none()
        && settings.devices.is_none()
        && settings.from.is_none()
        && settings.to.is_none()
    {
        return Ok(None);
    }

    let Some(mut criteria) = FilterCriteria::select_all(options) else {
        tracing::warn!("no record has a signup date; filters select nothing");
        return Ok(None);
    };

    if let Some(games) = &settings.games {
        criteria.game_titles = trimmed(games).collect();
    }
    if let Some(devices) = &settings.devices {
        criteria.device_types = trimmed(devices).collect();
    }
    if let Some(from) = &settings.from {
        criteria.signup_range.start = parse_date(from).context("--from")?;
    }
    if let Some(to) = &settings.to {
        criteria.signup_range.end = parse_date(to).context("--to")?;
    }

    Ok(Some(criteria))
}

fn trimmed(values: &[String]) -> impl Iterator<Item = String> + '_ {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
