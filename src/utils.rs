use crate::error::{RatioAnalysisError, Result};
use crate::{FiscalYear, YearSeries};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How averaged balances behave for a year whose prior year is missing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AveragingPolicy {
    #[default]
    #[schemars(description = "Use the current year's balance alone when the prior year is missing")]
    FallbackToCurrent,

    #[schemars(description = "Leave the average undefined when the prior year is missing")]
    RequirePriorYear,
}

/// Division that never fails: `None` for a missing operand, a zero
/// denominator, or a non-finite quotient.
pub fn safe_divide(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (n, d) = (numerator?, denominator?);
    if d == 0.0 {
        return None;
    }
    let quotient = n / d;
    quotient.is_finite().then_some(quotient)
}

/// Average of the balance at `year` and `year - 1`, falling back to the
/// current balance for the earliest year.
pub fn average_over_period(series: &YearSeries, year: FiscalYear) -> Option<f64> {
    average_over_period_with(series, year, AveragingPolicy::FallbackToCurrent)
}

pub fn average_over_period_with(
    series: &YearSeries,
    year: FiscalYear,
    policy: AveragingPolicy,
) -> Option<f64> {
    let current = *series.get(&year)?;
    match (series.get(&(year - 1)), policy) {
        (Some(prior), _) => Some((current + prior) / 2.0),
        (None, AveragingPolicy::FallbackToCurrent) => Some(current),
        (None, AveragingPolicy::RequirePriorYear) => None,
    }
}

/// Sum of two optional amounts; undefined if either is.
pub fn checked_add(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? + b?).filter(|v| v.is_finite())
}

pub fn checked_sub(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?).filter(|v| v.is_finite())
}

pub fn checked_mul(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? * b?).filter(|v| v.is_finite())
}

/// Parses a provider report date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339 timestamps and
/// Unix epoch seconds.
pub fn parse_report_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    // Bare years like "2023" are not timestamps
    if trimmed.len() > 4 {
        if let Ok(secs) = trimmed.parse::<i64>() {
            if let Some(dt) = DateTime::from_timestamp(secs, 0) {
                return Ok(dt.date_naive());
            }
        }
    }

    Err(RatioAnalysisError::InvalidReportDate(raw.to_string()))
}

/// Fiscal years are calendar years of the report date.
pub fn fiscal_year_of(date: NaiveDate) -> FiscalYear {
    date.year()
}

/// Value of the latest year that has one.
pub fn latest_value(series: &YearSeries) -> Option<(FiscalYear, f64)> {
    series.iter().next_back().map(|(year, value)| (*year, *value))
}
