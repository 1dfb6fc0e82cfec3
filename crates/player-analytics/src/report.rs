//! Plain-text rendering of an analysis result.

use std::fmt::Write;

use analytics_core::formatting::{
    format_currency, format_number, format_optional_currency, format_percent, NOT_AVAILABLE,
};
use analytics_data::aggregator::GroupProfile;
use analytics_data::analysis::AnalysisResult;
use analytics_data::dashboard::DashboardReport;

const RULE: &str = "────────────────────────────────────────────────────────────";

/// Render `result` as a sectioned text summary.
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, result);
    out
}

fn write_report(out: &mut String, result: &AnalysisResult) -> std::fmt::Result {
    let meta = &result.metadata;
    let d = &result.dashboard;

    writeln!(out, "Player Analytics Dashboard")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Source:     {}", meta.source)?;
    writeln!(out, "Reference:  {}", meta.reference_time.format("%Y-%m-%d %H:%M"))?;
    match &result.criteria {
        Some(c) => {
            writeln!(out, "Games:      {}", join(c.game_titles.iter()))?;
            writeln!(out, "Devices:    {}", join(c.device_types.iter()))?;
            writeln!(
                out,
                "Signups:    {} to {}",
                c.signup_range.start, c.signup_range.end
            )?;
        }
        None => writeln!(out, "Filters:    no signup dates to select from")?,
    }
    writeln!(
        out,
        "Selected:   {} of {} players",
        meta.records_selected, meta.records_loaded
    )?;
    if meta.parse_warnings > 0 {
        writeln!(out, "Warnings:   {} (see log)", meta.parse_warnings)?;
    }

    write_kpis(out, d)?;
    write_revenue(out, d)?;
    write_profiles(out, d)?;
    write_segments(out, d)?;
    write_top_users(out, d)?;
    write_high_value(out, d)?;
    write_churn(out, d)?;
    write_cohorts(out, d)?;
    write_insights(out, d)
}

fn section(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")
}

fn write_kpis(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    let k = &d.kpis;
    section(out, "Key Metrics")?;
    writeln!(out, "Total users     {}", format_number(k.total_users as f64, 0))?;
    for (label, share) in [
        ("Daily active    ", &k.daily_active),
        ("Weekly active   ", &k.weekly_active),
        ("Monthly active  ", &k.monthly_active),
    ] {
        writeln!(
            out,
            "{label}{} ({})",
            format_number(share.count as f64, 0),
            format_percent(share.percent)
        )?;
    }
    writeln!(out, "Total revenue   {}", format_currency(k.total_revenue))?;
    writeln!(out, "Avg revenue     {}", format_optional_currency(k.avg_revenue))?;
    writeln!(out, "Retention       {}", format_percent(k.retention_rate))
}

fn write_revenue(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    section(out, "Revenue by Game")?;
    if d.revenue_by_game.is_empty() {
        writeln!(out, "  {NOT_AVAILABLE}")?;
    }
    for row in &d.revenue_by_game {
        writeln!(out, "  {:<28} {:>14}", row.key, format_currency(row.value))?;
    }

    section(out, "Revenue by Signup Month")?;
    if d.monthly_revenue.is_empty() {
        writeln!(out, "  {NOT_AVAILABLE}")?;
    }
    for point in &d.monthly_revenue {
        writeln!(out, "  {:<28} {:>14}", point.period, format_currency(point.value))?;
    }
    Ok(())
}

fn write_profile_table(out: &mut String, title: &str, rows: &[GroupProfile]) -> std::fmt::Result {
    section(out, title)?;
    writeln!(out, "  {:<20} {:>8} {:>14} {:>12}", "", "Users", "Avg revenue", "Avg sessions")?;
    for row in rows {
        writeln!(
            out,
            "  {:<20} {:>8} {:>14} {:>12}",
            row.key,
            row.users,
            format_currency(row.avg_revenue),
            format_number(row.avg_sessions, 2)
        )?;
    }
    Ok(())
}

fn write_profiles(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    write_profile_table(out, "Devices", &d.device_profile)?;
    write_profile_table(out, "Game Modes", &d.game_mode_profile)?;
    write_profile_table(out, "Subscription Tiers", &d.subscription_profile)
}

fn write_segments(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    section(out, "Activity Segments")?;
    for s in &d.activity_segments {
        writeln!(out, "  {:<20} {:>8}", s.segment.label(), s.count)?;
    }
    section(out, "Spend Segments")?;
    for s in &d.spend_segments {
        writeln!(out, "  {:<20} {:>8}", s.segment.label(), s.count)?;
    }
    Ok(())
}

fn write_top_users(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    section(out, &format!("Top {} Spenders", d.top_users.len()))?;
    for (rank, u) in d.top_users.iter().enumerate() {
        writeln!(
            out,
            "  {:>2}. {:<18} {:>12}  {} / {} / {} sessions / {} / {}",
            rank + 1,
            u.username,
            format_currency(u.total_revenue_usd),
            u.game_title,
            u.device_type,
            u.total_play_sessions,
            u.subscription_tier,
            u.activity_segment
        )?;
    }
    Ok(())
}

fn write_high_value(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    let hv = &d.high_value;
    section(
        out,
        &format!("High-Value Players (above {:.0}th percentile)", hv.quantile * 100.0),
    )?;
    writeln!(out, "Threshold       {}", format_optional_currency(hv.threshold))?;
    writeln!(out, "Players         {}", hv.count)?;
    writeln!(out, "Avg revenue     {}", format_optional_currency(hv.avg_revenue))?;
    writeln!(
        out,
        "Avg sessions    {}",
        hv.avg_sessions
            .map(|v| format_number(v, 1))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    )?;
    writeln!(out, "Top game        {}", or_na(hv.top_game.as_deref()))?;
    writeln!(out, "Top device      {}", or_na(hv.top_device.as_deref()))?;
    writeln!(out, "Top game mode   {}", or_na(hv.top_game_mode.as_deref()))
}

fn write_churn(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    let c = &d.churn_risk;
    section(out, "Churn Risk (inactive > 30 days)")?;
    writeln!(out, "At-risk players {}", c.at_risk_users)?;
    writeln!(out, "Revenue at risk {}", format_currency(c.revenue_at_risk))?;
    writeln!(
        out,
        "Avg days idle   {}",
        c.avg_days_inactive
            .map(|v| format_number(v, 1))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    )?;
    for row in &c.rows {
        writeln!(
            out,
            "  {:<18} {:>5} days {:>12}  {} / {}",
            row.username,
            row.days_since_login,
            format_currency(row.total_revenue_usd),
            row.game_title,
            row.subscription_tier
        )?;
    }
    Ok(())
}

fn write_cohorts(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    section(out, "Signup Cohorts")?;
    for row in &d.cohorts {
        writeln!(
            out,
            "  {:<10} {:>8} new {:>14}",
            row.cohort_month,
            row.new_users,
            format_currency(row.revenue)
        )?;
    }
    Ok(())
}

fn write_insights(out: &mut String, d: &DashboardReport) -> std::fmt::Result {
    let i = &d.insights;
    let s = &d.stats;
    section(out, "Insights")?;
    writeln!(out, "Retention               {}", format_percent(i.retention_percent))?;
    writeln!(out, "Premium users (>$100)   {}", format_percent(i.premium_user_percent))?;
    writeln!(out, "Top game by revenue     {}", or_na(i.top_game_by_revenue.as_deref()))?;
    writeln!(
        out,
        "Best device by ARPU     {}",
        or_na(i.best_device_by_avg_revenue.as_deref())
    )?;
    writeln!(
        out,
        "Analyzed {} users, {} data points, {} games, {} device types",
        format_number(s.users_analyzed as f64, 0),
        format_number(s.data_points as f64, 0),
        s.games_covered,
        s.device_types_covered
    )
}

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

fn join<'a>(values: impl Iterator<Item = &'a String>) -> String {
    values.map(String::as_str).collect::<Vec<_>>().join(", ")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
