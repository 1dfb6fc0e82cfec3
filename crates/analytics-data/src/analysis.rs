//! Main analysis pipeline for player analytics.
//!
//! Runs load, derivation, selection and dashboard assembly, returning an
//! [`AnalysisResult`] ready for the presentation layer.

use std::path::Path;
use std::time::Instant;

use analytics_core::derivation::derive;
use analytics_core::models::{DerivedRecord, ParseWarning};
use analytics_core::Result;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::dashboard::{build_dashboard, DashboardOptions, DashboardReport};
use crate::filter::{filter_records, FilterCriteria, FilterOptions};
use crate::reader::{load_user_records, LoadedDataset};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    pub source: String,
    /// Instant the day counts were measured against.
    pub reference_time: NaiveDateTime,
    pub records_loaded: usize,
    pub records_selected: usize,
    pub parse_warnings: usize,
    /// Wall-clock seconds spent deriving columns.
    pub derive_time_seconds: f64,
    /// Wall-clock seconds spent filtering and aggregating.
    pub aggregate_time_seconds: f64,
}

/// The complete output of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub metadata: AnalysisMetadata,
    /// Choices available to the filter controls.
    pub filter_options: FilterOptions,
    /// The selection the dashboard was computed for; `None` when the
    /// dataset offers nothing to select.
    pub criteria: Option<FilterCriteria>,
    pub dashboard: DashboardReport,
    pub warnings: Vec<ParseWarning>,
}

/// Dashboard for one selection over already-derived records.
#[derive(Debug, Clone)]
pub struct Selection {
    pub criteria: Option<FilterCriteria>,
    pub records_selected: usize,
    pub dashboard: DashboardReport,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline against the CSV at `path`.
pub fn run_analysis(
    path: &Path,
    reference: NaiveDateTime,
    criteria: Option<&FilterCriteria>,
    options: &DashboardOptions,
) -> Result<AnalysisResult> {
    let dataset = load_user_records(path)?;
    Ok(analyze_dataset(&dataset, reference, criteria, options))
}

/// Derive, select and aggregate an already-loaded dataset.
///
/// `criteria` of `None` selects every title, device and signup date.
pub fn analyze_dataset(
    dataset: &LoadedDataset,
    reference: NaiveDateTime,
    criteria: Option<&FilterCriteria>,
    options: &DashboardOptions,
) -> AnalysisResult {
    let derive_start = Instant::now();
    let derived = derive(&dataset.records, reference);
    let derive_time = derive_start.elapsed().as_secs_f64();

    let filter_options = FilterOptions::from_records(&derived);

    let aggregate_start = Instant::now();
    let selection = select(&derived, &filter_options, criteria, options);
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        source: dataset.source.display().to_string(),
        reference_time: reference,
        records_loaded: dataset.records.len(),
        records_selected: selection.records_selected,
        parse_warnings: dataset.warnings.len(),
        derive_time_seconds: derive_time,
        aggregate_time_seconds: aggregate_time,
    };

    AnalysisResult {
        metadata,
        filter_options,
        criteria: selection.criteria,
        dashboard: selection.dashboard,
        warnings: dataset.warnings.clone(),
    }
}

/// Filter `derived` and build the dashboard for the result.
///
/// Without explicit `criteria` the full range of `filter_options` is used.
/// When that range does not exist either (no record has a signup date),
/// the selection is empty.
pub fn select(
    derived: &[DerivedRecord],
    filter_options: &FilterOptions,
    criteria: Option<&FilterCriteria>,
    options: &DashboardOptions,
) -> Selection {
    let criteria = criteria
        .cloned()
        .or_else(|| FilterCriteria::select_all(filter_options));

    let selected = match &criteria {
        Some(c) => filter_records(derived, c),
        None => Vec::new(),
    };

    Selection {
        records_selected: selected.len(),
        dashboard: build_dashboard(&selected, options),
        criteria,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
