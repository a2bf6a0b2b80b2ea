//! Assembles a ratio table into a flat, display-ready report and
//! serializes it to CSV or JSON.

use crate::error::{RatioAnalysisError, Result};
use crate::ratios::{Ratio, RatioCategory, RatioTable, Unit};
use crate::FiscalYear;
use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_DECIMALS: u32 = 6;

/// How many trailing years the default range covers besides the latest.
const DEFAULT_LOOKBACK_YEARS: FiscalYear = 5;

const RATIO_HEADER: &str = "Ratio";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReportOptions {
    #[serde(default)]
    #[schemars(description = "First fiscal year to include (inclusive). Omit for the earliest available.")]
    pub start_year: Option<FiscalYear>,

    #[serde(default)]
    #[schemars(description = "Last fiscal year to include (inclusive). Omit for the latest available.")]
    pub end_year: Option<FiscalYear>,

    #[serde(default = "default_decimals")]
    #[schemars(description = "Decimal places for ratios and per-share figures (0-6)")]
    pub decimals: u32,

    #[serde(default = "default_currency_symbol")]
    #[schemars(description = "Symbol prefixed to currency figures")]
    pub currency_symbol: String,

    #[serde(default)]
    #[schemars(description = "Categories to include, in any order. Omit for all.")]
    pub categories: Option<Vec<RatioCategory>>,
}

fn default_decimals() -> u32 {
    2
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            start_year: None,
            end_year: None,
            decimals: default_decimals(),
            currency_symbol: default_currency_symbol(),
            categories: None,
        }
    }
}

impl ReportOptions {
    pub fn with_year_range(mut self, start: FiscalYear, end: FiscalYear) -> Self {
        self.start_year = Some(start);
        self.end_year = Some(end);
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn with_categories(mut self, categories: Vec<RatioCategory>) -> Self {
        self.categories = Some(categories);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(RatioAnalysisError::InvalidPrecision(self.decimals));
        }
        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return Err(RatioAnalysisError::InvalidYearRange { start, end });
            }
        }
        Ok(())
    }

    fn includes_year(&self, year: FiscalYear) -> bool {
        self.start_year.map_or(true, |s| year >= s) && self.end_year.map_or(true, |e| year <= e)
    }

    fn includes_category(&self, category: RatioCategory) -> bool {
        self.categories
            .as_ref()
            .map_or(true, |selected| selected.contains(&category))
    }
}

/// The last six available years, or fewer when the history is shorter.
pub fn default_year_range(years: &[FiscalYear]) -> Option<(FiscalYear, FiscalYear)> {
    let min = *years.iter().min()?;
    let max = *years.iter().max()?;
    Some((min.max(max - DEFAULT_LOOKBACK_YEARS), max))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub category: RatioCategory,
    pub ratio: String,
    /// Formatted cells, one per report year; blank where undefined
    pub cells: Vec<String>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatReport {
    pub years: Vec<FiscalYear>,
    pub rows: Vec<FlatRow>,
}

impl FlatReport {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn rows_in(&self, category: RatioCategory) -> impl Iterator<Item = &FlatRow> {
        self.rows.iter().filter(move |r| r.category == category)
    }

    /// CSV with a `Ratio,<year>...` header and a `# <Category>` comment line
    /// before each category's rows.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());

        let mut header = vec![RATIO_HEADER.to_string()];
        header.extend(self.years.iter().map(|y| y.to_string()));
        writer.write_record(&header)?;

        let mut current: Option<RatioCategory> = None;
        for row in &self.rows {
            if current != Some(row.category) {
                writer.write_record([format!("# {}", row.category.label())])?;
                current = Some(row.category);
            }
            let mut record = Vec::with_capacity(row.cells.len() + 1);
            record.push(row.ratio.as_str());
            record.extend(row.cells.iter().map(String::as_str));
            writer.write_record(&record)?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Formats one value for display. Undefined values render blank.
pub fn format_value(value: Option<f64>, unit: Unit, decimals: u32, currency_symbol: &str) -> String {
    let Some(v) = value else {
        return String::new();
    };
    let decimals = decimals as usize;

    match unit {
        Unit::Percent => format!("{:.*}%", decimals, v * 100.0),
        Unit::Multiple | Unit::Days => format!("{:.*}", decimals, v),
        Unit::Currency => format_currency(v, 0, currency_symbol),
        Unit::PerShare => format_currency(v, decimals, currency_symbol),
    }
}

fn format_currency(value: f64, decimals: usize, symbol: &str) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // Rounding can turn a tiny negative into zero; don't print "-$0"
    let negative = value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{}{}{}.{}", sign, symbol, grouped, frac),
        None => format!("{}{}{}", sign, symbol, grouped),
    }
}

/// Builds the flat report for the selected years and categories, keeping
/// category order and the catalog's ratio order.
pub fn assemble(table: &RatioTable, options: &ReportOptions) -> Result<FlatReport> {
    options.validate()?;

    let years: Vec<FiscalYear> = table
        .years()
        .iter()
        .copied()
        .filter(|y| options.includes_year(*y))
        .collect();

    let mut rows = Vec::new();
    for section in table.sections() {
        if !options.includes_category(section.category) {
            continue;
        }
        for ratio in section.category.ratios() {
            let Some(row) = section.rows.iter().find(|r| r.ratio == *ratio) else {
                continue;
            };
            let values: Vec<Option<f64>> = years.iter().map(|y| row.value(*y)).collect();
            let cells = values
                .iter()
                .map(|v| format_value(*v, ratio.unit(), options.decimals, &options.currency_symbol))
                .collect();
            rows.push(FlatRow {
                category: section.category,
                ratio: ratio.label().to_string(),
                cells,
                values,
            });
        }
    }

    debug!("Assembled report with {} rows over {} years", rows.len(), years.len());

    Ok(FlatReport { years, rows })
}

/// Reads a formatted cell back to the stored value: strips the sign, the
/// currency symbol and thousands separators, and turns `%` back into a
/// fraction.
pub fn parse_cell(cell: &str, currency_symbol: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let rest = if currency_symbol.is_empty() {
        rest
    } else {
        rest.strip_prefix(currency_symbol).unwrap_or(rest)
    };
    let (is_percent, rest) = match rest.strip_suffix('%') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    let numeric: String = rest.chars().filter(|c| *c != ',').collect();
    if numeric.starts_with(['-', '+']) {
        return None;
    }
    let magnitude: f64 = numeric.parse().ok().filter(|v: &f64| v.is_finite())?;
    let value = if negative { -magnitude } else { magnitude };

    Some(if is_percent { value / 100.0 } else { value })
}

pub type ParsedReport = BTreeMap<Ratio, BTreeMap<FiscalYear, Option<f64>>>;

/// Parses a CSV produced by [`FlatReport::to_csv`] with the same
/// `currency_symbol` it was assembled with.
pub fn parse_ratio_csv(input: &str, currency_symbol: &str) -> Result<ParsedReport> {
    let mut reader = ReaderBuilder::new()
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers()?.clone();
    let years: Vec<FiscalYear> = headers
        .iter()
        .skip(1)
        .map(|h| {
            h.trim().parse::<FiscalYear>().map_err(|_| RatioAnalysisError::InvalidCell {
                ratio: RATIO_HEADER.to_string(),
                year: h.to_string(),
                value: h.to_string(),
            })
        })
        .collect::<Result<_>>()?;

    let mut parsed = ParsedReport::new();
    for record in reader.records() {
        let record = record?;
        let Some(label) = record.get(0) else {
            continue;
        };
        let ratio = Ratio::from_label(label)?;

        let mut values = BTreeMap::new();
        for (idx, year) in years.iter().enumerate() {
            let cell = record.get(idx + 1).unwrap_or("");
            let value = parse_cell(cell, currency_symbol);
            if value.is_none() && !cell.trim().is_empty() {
                return Err(RatioAnalysisError::InvalidCell {
                    ratio: label.to_string(),
                    year: year.to_string(),
                    value: cell.to_string(),
                });
            }
            values.insert(*year, value);
        }
        parsed.insert(ratio, values);
    }

    Ok(parsed)
}
