//! CSV loading for player analytics.
//!
//! Reads the player table into [`UserRecord`] structs. Structural problems
//! (unreadable file, missing columns, bad numbers) fail the whole load; date
//! cells that cannot be parsed become `None` and are reported as
//! [`ParseWarning`]s.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use analytics_core::error::{AnalyticsError, Result};
use analytics_core::models::{ParseWarning, UserRecord, REQUIRED_COLUMNS};
use analytics_core::time_utils::{is_missing, parse_timestamp};
use tracing::{debug, info, warn};

/// How many individual parse warnings are logged before only the summary is.
const MAX_LOGGED_WARNINGS: usize = 5;

// ── Public API ────────────────────────────────────────────────────────────────

/// The full player table as loaded from one source.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Locator the table was read from.
    pub source: PathBuf,
    /// Rows in file order, duplicates removed.
    pub records: Vec<UserRecord>,
    /// Non-fatal problems found while reading.
    pub warnings: Vec<ParseWarning>,
}

/// Load the player table from a CSV file.
///
/// Fails with [`AnalyticsError::DataPathNotFound`] when the file is absent and
/// [`AnalyticsError::FileRead`] when it cannot be opened. See
/// [`read_user_records`] for the remaining failure modes.
pub fn load_user_records(path: &Path) -> Result<LoadedDataset> {
    if !path.exists() {
        return Err(AnalyticsError::DataPathNotFound(path.to_path_buf()));
    }

    let file = std::fs::File::open(path).map_err(|source| AnalyticsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let dataset = read_user_records(std::io::BufReader::new(file), path)?;

    info!(
        "Loaded {} players from {} ({} warnings)",
        dataset.records.len(),
        path.display(),
        dataset.warnings.len()
    );
    Ok(dataset)
}

/// Parse CSV content from any reader. `source` is only used for error
/// messages and the returned [`LoadedDataset::source`].
pub fn read_user_records<R: Read>(reader: R, source: &Path) -> Result<LoadedDataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnIndex::from_headers(csv_reader.headers()?, source)?;

    let mut records: Vec<UserRecord> = Vec::new();
    let mut warnings: Vec<ParseWarning> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (i, row_result) in csv_reader.records().enumerate() {
        let row = i + 1;
        let raw = row_result?;
        let cell = |idx: usize| raw.get(idx).unwrap_or("").trim();

        // Numeric cells are checked on every row, duplicates included.
        let total_revenue_usd = parse_revenue(row, cell(columns.total_revenue_usd))?;
        let total_play_sessions = parse_sessions(row, cell(columns.total_play_sessions))?;

        let user_id = cell(columns.user_id).to_string();
        if !seen_ids.insert(user_id.clone()) {
            warnings.push(ParseWarning::DuplicateUserId { row, user_id });
            continue;
        }

        let mut date_cell = |column: &str, value: &str| {
            parse_date_cell(row, &user_id, column, value, &mut warnings)
        };
        let signup_date = date_cell("Signup_Date", cell(columns.signup_date));
        let last_login = date_cell("Last_Login", cell(columns.last_login));

        records.push(UserRecord {
            user_id: user_id.clone(),
            username: cell(columns.username).to_string(),
            game_title: cell(columns.game_title).to_string(),
            device_type: cell(columns.device_type).to_string(),
            preferred_game_mode: cell(columns.preferred_game_mode).to_string(),
            subscription_tier: cell(columns.subscription_tier).to_string(),
            signup_date,
            last_login,
            total_revenue_usd,
            total_play_sessions,
        });
    }

    if records.is_empty() {
        return Err(AnalyticsError::EmptyDataset(source.to_path_buf()));
    }

    for warning in warnings.iter().take(MAX_LOGGED_WARNINGS) {
        warn!("{}: {}", source.display(), warning);
    }
    if warnings.len() > MAX_LOGGED_WARNINGS {
        warn!(
            "{}: {} further parse warnings suppressed",
            source.display(),
            warnings.len() - MAX_LOGGED_WARNINGS
        );
    }

    debug!(
        "Parsed {} rows from {}, {} warnings",
        records.len(),
        source.display(),
        warnings.len()
    );

    Ok(LoadedDataset {
        source: source.to_path_buf(),
        records,
        warnings,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Position of every required column in the header row.
#[derive(Debug)]
struct ColumnIndex {
    user_id: usize,
    username: usize,
    game_title: usize,
    device_type: usize,
    preferred_game_mode: usize,
    subscription_tier: usize,
    signup_date: usize,
    last_login: usize,
    total_revenue_usd: usize,
    total_play_sessions: usize,
}

impl ColumnIndex {
    /// Resolve header positions, listing every missing column on failure.
    fn from_headers(headers: &csv::StringRecord, source: &Path) -> Result<Self> {
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let position = |column: &str| names.iter().position(|n| *n == column);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| position(column).is_none())
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AnalyticsError::MissingColumns {
                path: source.to_path_buf(),
                columns: missing,
            });
        }

        // Every lookup below succeeded in the check above.
        let index = |column: &str| position(column).unwrap_or_default();
        Ok(Self {
            user_id: index("User_ID"),
            username: index("Username"),
            game_title: index("Game_Title"),
            device_type: index("Device_Type"),
            preferred_game_mode: index("Preferred_Game_Mode"),
            subscription_tier: index("Subscription_Tier"),
            signup_date: index("Signup_Date"),
            last_login: index("Last_Login"),
            total_revenue_usd: index("Total_Revenue_USD"),
            total_play_sessions: index("Total_Play_Sessions"),
        })
    }
}

fn invalid_field(row: usize, column: &str, value: &str) -> AnalyticsError {
    AnalyticsError::InvalidField {
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

/// Revenue must be a finite, non-negative number. `-0` is stored as `0`.
fn parse_revenue(row: usize, value: &str) -> Result<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v + 0.0),
        _ => Err(invalid_field(row, "Total_Revenue_USD", value)),
    }
}

/// Sessions must be a non-negative integer that fits in `u64`; `"12.0"` is
/// accepted.
fn parse_sessions(row: usize, value: &str) -> Result<u64> {
    if let Ok(v) = value.parse::<u64>() {
        return Ok(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 && v.fract() == 0.0 => {
            Ok(v as u64)
        }
        _ => Err(invalid_field(row, "Total_Play_Sessions", value)),
    }
}

/// Missing cells become `None` silently; unparseable ones also become `None`
/// but leave a warning behind.
fn parse_date_cell(
    row: usize,
    user_id: &str,
    column: &str,
    value: &str,
    warnings: &mut Vec<ParseWarning>,
) -> Option<chrono::NaiveDateTime> {
    if is_missing(value) {
        return None;
    }
    let parsed = parse_timestamp(value);
    if parsed.is_none() {
        warnings.push(ParseWarning::UnparseableDate {
            row,
            user_id: user_id.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        });
    }
    parsed
}

// ── Tests ─────────────────────────────────────────────────────────────────────
