use clap::Parser;
use std::path::PathBuf;

use crate::error::{AnalyticsError, Result};
use crate::quantile::{is_valid_quantile, HIGH_VALUE_QUANTILE};

/// Default number of rows in the top-spenders table.
pub const DEFAULT_TOP_N: usize = 15;

/// Default number of rows shown from the churn-risk list.
pub const DEFAULT_CHURN_ROWS: usize = 10;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Player activity and monetization analytics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "player-analytics",
    about = "Player activity and monetization analytics",
    version
)]
pub struct Settings {
    /// Path to the player CSV file
    #[arg(long, env = "PLAYER_ANALYTICS_DATA")]
    pub data: Option<PathBuf>,

    /// Game titles to include (comma separated, default: all)
    #[arg(long, value_delimiter = ',')]
    pub games: Option<Vec<String>>,

    /// Device types to include (comma separated, default: all)
    #[arg(long, value_delimiter = ',')]
    pub devices: Option<Vec<String>>,

    /// First signup date to include (default: earliest signup)
    #[arg(long)]
    pub from: Option<String>,

    /// Last signup date to include (default: latest signup)
    #[arg(long)]
    pub to: Option<String>,

    /// Reference "today" for recency metrics (default: now)
    #[arg(long)]
    pub reference_date: Option<String>,

    /// Timezone used to resolve "now" (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["json", "text"])]
    pub format: String,

    /// Number of users in the top-spenders table
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Number of churn-risk rows to list
    #[arg(long, default_value_t = DEFAULT_CHURN_ROWS)]
    pub churn_rows: usize,

    /// Quantile above which users count as high value (0-1)
    #[arg(long, default_value_t = HIGH_VALUE_QUANTILE)]
    pub high_value_quantile: f64,

    /// Read filter commands from stdin and recompute after each one
    #[arg(long)]
    pub interactive: bool,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and resolve `"auto"` values.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list so the
    /// resolution logic can be unit-tested.
    pub fn load_from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let settings = Settings::parse_from(args);
        settings.resolve_auto_values().validate()
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut self) -> Self {
        if self.timezone == "auto" {
            let detected = crate::time_utils::get_system_timezone();
            self.timezone = if crate::time_utils::validate_timezone(&detected) {
                detected
            } else {
                "UTC".to_string()
            };
        }

        if self.debug {
            self.log_level = "DEBUG".to_string();
        }

        self
    }

    /// Reject values clap cannot range-check on its own.
    fn validate(self) -> Result<Self> {
        if !is_valid_quantile(self.high_value_quantile) {
            return Err(AnalyticsError::Config(format!(
                "--high-value-quantile must be between 0 and 1, got {}",
                self.high_value_quantile
            )));
        }
        if !crate::time_utils::validate_timezone(&self.timezone) {
            return Err(AnalyticsError::Config(format!(
                "unknown timezone: {}",
                self.timezone
            )));
        }
        Ok(self)
    }

    /// `true` when output should be JSON rather than the text summary.
    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
