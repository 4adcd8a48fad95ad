//! # Formatter
//!
//! Pure conversions from usage numbers to display values: percentages,
//! color tiers, currency, reset dates and timestamps.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::Serialize;
use std::fmt::Display;

use crate::error::{UsageError, UsageResult};

/// `round(current / limit * 100)`. A zero limit is an error, never a silent
/// division.
pub fn percentage(current: u64, limit: u64) -> UsageResult<u32> {
    if limit == 0 {
        return Err(UsageError::ZeroLimit {
            what: "premium request",
        });
    }
    Ok(round_percent(current as f64 / limit as f64 * 100.0))
}

/// Same rule as [`percentage`] for dollar amounts
pub fn cost_percentage(cost: f64, limit: f64) -> UsageResult<u32> {
    if limit.is_nan() || limit <= 0.0 {
        return Err(UsageError::ZeroLimit {
            what: "usage-based spending",
        });
    }
    Ok(round_percent(cost / limit * 100.0))
}

fn round_percent(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

/// Status color bucket, named by the inclusive lower bound of its range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTier {
    Critical,
    Severe,
    Failing,
    Danger,
    Caution,
    Warning,
    Elevated,
    Moderate,
    Healthy,
    Good,
    Fine,
    Low,
    Minimal,
    Idle,
}

/// Ordered top-down; the first bound `<= percent` wins
const COLOR_TIERS: [(u32, ColorTier); 14] = [
    (95, ColorTier::Critical),
    (90, ColorTier::Severe),
    (85, ColorTier::Failing),
    (80, ColorTier::Danger),
    (75, ColorTier::Caution),
    (70, ColorTier::Warning),
    (65, ColorTier::Elevated),
    (60, ColorTier::Moderate),
    (50, ColorTier::Healthy),
    (40, ColorTier::Good),
    (30, ColorTier::Fine),
    (20, ColorTier::Low),
    (10, ColorTier::Minimal),
    (0, ColorTier::Idle),
];

pub fn color_tier(percent: u32) -> ColorTier {
    COLOR_TIERS
        .iter()
        .find(|(bound, _)| percent >= *bound)
        .map(|(_, tier)| *tier)
        .unwrap_or(ColorTier::Idle)
}

impl ColorTier {
    pub fn lower_bound(self) -> u32 {
        COLOR_TIERS
            .iter()
            .find(|(_, tier)| *tier == self)
            .map(|(bound, _)| *bound)
            .unwrap_or(0)
    }

    /// Editor theme color id for this tier
    pub fn theme_color(self) -> &'static str {
        match self {
            ColorTier::Critical => "charts.red",
            ColorTier::Severe => "errorForeground",
            ColorTier::Failing => "testing.iconFailed",
            ColorTier::Danger => "notebookStatusErrorIcon.foreground",
            ColorTier::Caution => "charts.yellow",
            ColorTier::Warning => "notificationsWarningIcon.foreground",
            ColorTier::Elevated => "charts.orange",
            ColorTier::Moderate => "charts.blue",
            ColorTier::Healthy => "charts.green",
            ColorTier::Good => "testing.iconPassed",
            ColorTier::Fine => "terminal.ansiGreen",
            ColorTier::Low => "symbolIcon.classForeground",
            ColorTier::Minimal => "debugIcon.startForeground",
            ColorTier::Idle => "foreground",
        }
    }
}

pub fn currency_text(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Same day next month, clamped to the last day of a shorter month
pub fn next_reset_date(period_start: NaiveDate) -> NaiveDate {
    let (year, month) = if period_start.month() == 12 {
        (period_start.year() + 1, 1)
    } else {
        (period_start.year(), period_start.month() + 1)
    };
    (1..=period_start.day())
        .rev()
        .find_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .unwrap_or(period_start)
}

/// Short "Mon D" label, e.g. `Feb 28`
pub fn reset_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// `HH:MM:SS`, 24-hour, in the timestamp's own zone
pub fn time_of_day<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    ts.format("%H:%M:%S").to_string()
}

/// Word-wrap a tooltip line; continuation lines are indented by three spaces.
pub fn wrap_tooltip_line(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split(' ') {
        let sep = usize::from(!current.is_empty());
        if current.chars().count() + sep + word.chars().count() > max_width {
            if !current.is_empty() {
                lines.push(current.trim().to_string());
            }
            current = word.to_string();
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current.trim().to_string());
    }
    lines.join("\n   ")
}
