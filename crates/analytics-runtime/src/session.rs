//! Interactive analytics session.
//!
//! An [`AnalyticsSession`] owns the dataset cache, the derived records and
//! the current filter state. Each [`FilterCommand`] updates that state and
//! the dashboard is recomputed synchronously from the cached records.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use analytics_core::derivation::derive;
use analytics_core::models::DerivedRecord;
use analytics_core::time_utils::parse_date;
use analytics_core::{AnalyticsError, Result};
use analytics_data::analysis::{select, AnalysisMetadata, AnalysisResult};
use analytics_data::dashboard::DashboardOptions;
use analytics_data::filter::{DateRange, FilterCriteria, FilterOptions};
use analytics_data::reader::LoadedDataset;
use chrono::{NaiveDate, NaiveDateTime, Utc};

use crate::data_manager::DatasetCache;

// ── FilterCommand ─────────────────────────────────────────────────────────────

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    /// Restrict to these titles; `None` selects every title.
    Games(Option<Vec<String>>),
    /// Restrict to these devices; `None` selects every device.
    Devices(Option<Vec<String>>),
    From(NaiveDate),
    To(NaiveDate),
    /// Back to every title, device and the full signup range.
    Reset,
    /// Re-read the source file.
    Reload,
    Show,
    Quit,
}

impl FromStr for FilterCommand {
    type Err = AnalyticsError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (keyword, arg) = match line.split_once(char::is_whitespace) {
            Some((k, a)) => (k, a.trim()),
            None => (line, ""),
        };

        let invalid = || AnalyticsError::InvalidCommand(line.to_string());
        let no_arg = |cmd: FilterCommand| if arg.is_empty() { Ok(cmd) } else { Err(invalid()) };

        match keyword.to_ascii_lowercase().as_str() {
            "games" => parse_list(arg).map(Self::Games).ok_or_else(invalid),
            "devices" => parse_list(arg).map(Self::Devices).ok_or_else(invalid),
            "from" if !arg.is_empty() => parse_date(arg).map(Self::From),
            "to" if !arg.is_empty() => parse_date(arg).map(Self::To),
            "reset" => no_arg(Self::Reset),
            "reload" => no_arg(Self::Reload),
            "show" => no_arg(Self::Show),
            "quit" | "exit" => no_arg(Self::Quit),
            _ => Err(invalid()),
        }
    }
}

/// `*` → `Some(None)`, `a, b` → `Some(Some([a, b]))`, blank → `None`.
fn parse_list(arg: &str) -> Option<Option<Vec<String>>> {
    if arg.is_empty() {
        return None;
    }
    if arg == "*" {
        return Some(None);
    }
    let items: Vec<String> = arg
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Some(Some(items))
}

/// What the caller should do after a command.
#[derive(Debug)]
pub enum SessionOutcome {
    Report(Box<AnalysisResult>),
    Quit,
}

// ── AnalyticsSession ──────────────────────────────────────────────────────────

pub struct AnalyticsSession {
    cache: DatasetCache,
    source: PathBuf,
    reference: NaiveDateTime,
    options: DashboardOptions,
    dataset: Arc<LoadedDataset>,
    derived: Vec<DerivedRecord>,
    derive_time_seconds: f64,
    filter_options: FilterOptions,
    /// `None` selects everything the dataset offers.
    criteria: Option<FilterCriteria>,
}

impl AnalyticsSession {
    /// Load `source` and derive its records against `reference`.
    pub fn open(
        source: impl Into<PathBuf>,
        reference: NaiveDateTime,
        options: DashboardOptions,
    ) -> Result<Self> {
        Self::with_cache(DatasetCache::new(), source, reference, options)
    }

    pub fn with_cache(
        mut cache: DatasetCache,
        source: impl Into<PathBuf>,
        reference: NaiveDateTime,
        options: DashboardOptions,
    ) -> Result<Self> {
        let source = source.into();
        let dataset = cache.get_or_load(&source)?;
        let mut session = Self {
            cache,
            source,
            reference,
            options,
            dataset,
            derived: Vec::new(),
            derive_time_seconds: 0.0,
            filter_options: FilterOptions::from_records(&[]),
            criteria: None,
        };
        session.rederive();
        Ok(session)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dataset(&self) -> &LoadedDataset {
        &self.dataset
    }

    pub fn derived(&self) -> &[DerivedRecord] {
        &self.derived
    }

    pub fn filter_options(&self) -> &FilterOptions {
        &self.filter_options
    }

    /// The explicit selection, or `None` when everything is selected.
    pub fn criteria(&self) -> Option<&FilterCriteria> {
        self.criteria.as_ref()
    }

    pub fn set_criteria(&mut self, criteria: Option<FilterCriteria>) {
        self.criteria = criteria;
    }

    /// Recompute the dashboard for the current selection.
    pub fn report(&self) -> AnalysisResult {
        let aggregate_start = Instant::now();
        let selection = select(
            &self.derived,
            &self.filter_options,
            self.criteria.as_ref(),
            &self.options,
        );
        let aggregate_time = aggregate_start.elapsed().as_secs_f64();

        AnalysisResult {
            metadata: AnalysisMetadata {
                generated_at: Utc::now().to_rfc3339(),
                source: self.source.display().to_string(),
                reference_time: self.reference,
                records_loaded: self.dataset.records.len(),
                records_selected: selection.records_selected,
                parse_warnings: self.dataset.warnings.len(),
                derive_time_seconds: self.derive_time_seconds,
                aggregate_time_seconds: aggregate_time,
            },
            filter_options: self.filter_options.clone(),
            criteria: selection.criteria,
            dashboard: selection.dashboard,
            warnings: self.dataset.warnings.clone(),
        }
    }

    /// Apply one command and return the refreshed dashboard.
    ///
    /// A failed reload keeps the previous data and returns the error.
    pub fn apply(&mut self, command: FilterCommand) -> Result<SessionOutcome> {
        tracing::debug!(?command, "applying command");
        match command {
            FilterCommand::Quit => return Ok(SessionOutcome::Quit),
            FilterCommand::Show => {}
            FilterCommand::Reset => self.criteria = None,
            FilterCommand::Reload => self.reload()?,
            FilterCommand::Games(titles) => {
                let titles = titles.unwrap_or_else(|| self.filter_options.game_titles.clone());
                self.warn_unknown("game", &titles, &self.filter_options.game_titles);
                let mut criteria = self.base_criteria();
                criteria.game_titles = titles.into_iter().collect();
                self.criteria = Some(criteria);
            }
            FilterCommand::Devices(devices) => {
                let devices =
                    devices.unwrap_or_else(|| self.filter_options.device_types.clone());
                self.warn_unknown("device", &devices, &self.filter_options.device_types);
                let mut criteria = self.base_criteria();
                criteria.device_types = devices.into_iter().collect();
                self.criteria = Some(criteria);
            }
            FilterCommand::From(date) => {
                let mut criteria = self.base_criteria();
                criteria.signup_range.start = date;
                self.criteria = Some(criteria);
            }
            FilterCommand::To(date) => {
                let mut criteria = self.base_criteria();
                criteria.signup_range.end = date;
                self.criteria = Some(criteria);
            }
        }
        Ok(SessionOutcome::Report(Box::new(self.report())))
    }

    /// Drop the cached dataset and read the source again.
    pub fn reload(&mut self) -> Result<()> {
        self.cache.invalidate(&self.source);
        self.dataset = self.cache.get_or_load(&self.source)?;
        self.rederive();
        tracing::info!(
            path = %self.source.display(),
            records = self.dataset.records.len(),
            "dataset reloaded"
        );
        Ok(())
    }

    /// Read commands from `input` until `quit` or end of input, writing
    /// each rendered dashboard to `output`. Returns the number of commands
    /// applied.
    ///
    /// Bad commands and failed reloads are reported on `output` and the
    /// loop continues.
    pub fn run_command_loop<R, W, F>(&mut self, input: R, output: &mut W, render: F) -> Result<usize>
    where
        R: BufRead,
        W: Write,
        F: Fn(&AnalysisResult) -> String,
    {
        let mut applied = 0;
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let outcome = line.parse::<FilterCommand>().and_then(|cmd| self.apply(cmd));
            match outcome {
                Ok(SessionOutcome::Quit) => break,
                Ok(SessionOutcome::Report(result)) => {
                    applied += 1;
                    writeln!(output, "{}", render(&result))?;
                }
                Err(e) => writeln!(output, "error: {e}")?,
            }
            output.flush()?;
        }
        Ok(applied)
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn rederive(&mut self) {
        let start = Instant::now();
        self.derived = derive(&self.dataset.records, self.reference);
        self.derive_time_seconds = start.elapsed().as_secs_f64();
        self.filter_options = FilterOptions::from_records(&self.derived);
    }

    /// The current selection, or everything when none is set. Without any
    /// signup dates the range is unbounded.
    fn base_criteria(&self) -> FilterCriteria {
        self.criteria
            .clone()
            .or_else(|| FilterCriteria::select_all(&self.filter_options))
            .unwrap_or_else(|| {
                FilterCriteria::new(
                    self.filter_options.game_titles.iter().cloned(),
                    self.filter_options.device_types.iter().cloned(),
                    DateRange::new(NaiveDate::MIN, NaiveDate::MAX),
                )
            })
    }

    fn warn_unknown(&self, kind: &str, requested: &[String], known: &[String]) {
        for value in requested.iter().filter(|v| !known.contains(v)) {
            tracing::warn!(kind, value = %value, "no records match filter value");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    const HEADER: &str = "User_ID,Username,Game_Title,Device_Type,Preferred_Game_Mode,\
Subscription_Tier,Signup_Date,Last_Login,Total_Revenue_USD,Total_Play_Sessions";

    const ROWS: &[&str] = &[
        "u1,alice,Star Quest,PC,Solo,Premium,2024-01-05,2024-06-30,250,40",
        "u2,bob,Puzzle Pop,Mobile,Co-op,Free,2024-02-10,2024-06-25,20,10",
        "u3,cara,Star Quest,Mobile,Solo,Free,2024-03-15,2024-04-01,0,0",
        "u4,dan,Racer X,Console,Ranked,Basic,2024-05-20,2024-06-30,15.5,3",
    ];

    fn reference() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-07-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn write_players(path: &Path, rows: &[&str]) {
        let mut body = format!("{HEADER}\n");
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        fs::write(path, body).unwrap();
    }

    fn open_session() -> (AnalyticsSession, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("players.csv");
        write_players(&path, ROWS);
        let session =
            AnalyticsSession::open(&path, reference(), DashboardOptions::default()).unwrap();
        (session, dir)
    }

    fn selected(session: &mut AnalyticsSession, command: &str) -> usize {
        match session.apply(command.parse().unwrap()).unwrap() {
            SessionOutcome::Report(result) => result.metadata.records_selected,
            SessionOutcome::Quit => panic!("unexpected quit"),
        }
    }

    // ── command parsing ───────────────────────────────────────────────────

    #[test]
    fn test_parse_list_commands() {
        assert_eq!(
            "games Star Quest, Racer X".parse::<FilterCommand>().unwrap(),
            FilterCommand::Games(Some(vec!["Star Quest".into(), "Racer X".into()]))
        );
        assert_eq!(
            "DEVICES *".parse::<FilterCommand>().unwrap(),
            FilterCommand::Devices(None)
        );
        assert_eq!(
            "devices PC".parse::<FilterCommand>().unwrap(),
            FilterCommand::Devices(Some(vec!["PC".into()]))
        );
    }

    #[test]
    fn test_parse_date_commands() {
        assert_eq!(
            "from 2024-02-01".parse::<FilterCommand>().unwrap(),
            FilterCommand::From(date("2024-02-01"))
        );
        assert_eq!(
            "to 03/31/2024".parse::<FilterCommand>().unwrap(),
            FilterCommand::To(date("2024-03-31"))
        );
        assert!(matches!(
            "from someday".parse::<FilterCommand>(),
            Err(AnalyticsError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!("reset".parse::<FilterCommand>().unwrap(), FilterCommand::Reset);
        assert_eq!(" show ".parse::<FilterCommand>().unwrap(), FilterCommand::Show);
        assert_eq!("reload".parse::<FilterCommand>().unwrap(), FilterCommand::Reload);
        assert_eq!("exit".parse::<FilterCommand>().unwrap(), FilterCommand::Quit);
    }

    #[test]
    fn test_parse_invalid_commands() {
        for line in ["", "games", "from", "show everything", "frobnicate 3"] {
            assert!(
                matches!(
                    line.parse::<FilterCommand>(),
                    Err(AnalyticsError::InvalidCommand(_))
                ),
                "{line:?} should be rejected"
            );
        }
    }

    // ── session state ─────────────────────────────────────────────────────

    #[test]
    fn test_open_selects_everything() {
        let (session, _dir) = open_session();
        assert_eq!(session.derived().len(), 4);
        assert!(session.criteria().is_none());
        let result = session.report();
        assert_eq!(result.metadata.records_selected, 4);
        assert_eq!(result.dashboard.kpis.total_users, 4);
    }

    #[test]
    fn test_filter_commands_narrow_selection() {
        let (mut session, _dir) = open_session();
        assert_eq!(selected(&mut session, "games Star Quest"), 2);
        assert_eq!(selected(&mut session, "devices Mobile"), 1);
        assert_eq!(selected(&mut session, "games *"), 2);
        assert_eq!(selected(&mut session, "from 2024-02-10"), 2);
        assert_eq!(selected(&mut session, "devices *"), 3);
        assert_eq!(selected(&mut session, "to 2024-03-15"), 2);
        assert_eq!(selected(&mut session, "reset"), 4);
        assert!(session.criteria().is_none());
    }

    #[test]
    fn test_unknown_title_selects_nothing() {
        let (mut session, _dir) = open_session();
        assert_eq!(selected(&mut session, "games Nonexistent"), 0);
    }

    #[test]
    fn test_inverted_range_selects_nothing() {
        let (mut session, _dir) = open_session();
        assert_eq!(selected(&mut session, "from 2024-12-01"), 0);
        assert_eq!(
            session.criteria().unwrap().signup_range,
            DateRange::new(date("2024-12-01"), date("2024-05-20"))
        );
    }

    #[test]
    fn test_quit_returns_quit() {
        let (mut session, _dir) = open_session();
        assert!(matches!(
            session.apply(FilterCommand::Quit).unwrap(),
            SessionOutcome::Quit
        ));
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let (mut session, dir) = open_session();
        let mut rows = ROWS.to_vec();
        rows.push("u5,erin,Racer X,PC,Ranked,Free,2024-06-01,2024-06-30,5,1");
        write_players(&dir.path().join("players.csv"), &rows);

        assert_eq!(selected(&mut session, "show"), 4);
        assert_eq!(selected(&mut session, "reload"), 5);
        assert_eq!(session.derived().len(), 5);
    }

    #[test]
    fn test_failed_reload_keeps_previous_data() {
        let (mut session, dir) = open_session();
        fs::remove_file(dir.path().join("players.csv")).unwrap();

        assert!(session.apply(FilterCommand::Reload).is_err());
        assert_eq!(session.derived().len(), 4);
        assert_eq!(session.report().metadata.records_selected, 4);
    }

    // ── command loop ──────────────────────────────────────────────────────

    #[test]
    fn test_command_loop() {
        let (mut session, _dir) = open_session();
        let input = Cursor::new("games Racer X\n\nbogus\nshow\nquit\nshow\n");
        let mut output = Vec::new();

        let applied = session
            .run_command_loop(input, &mut output, |r| {
                format!("selected={}", r.metadata.records_selected)
            })
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(
            text,
            "selected=1\nerror: Invalid command: bogus\nselected=1\n"
        );
    }
}
