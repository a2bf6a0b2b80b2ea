use crate::error::Result;
use crate::schema::{RawStatement, StatementBundle, StatementKind};
use crate::utils::{fiscal_year_of, parse_report_date};
use crate::{FiscalYear, YearSeries};
use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A statement re-keyed by fiscal year: one column per year, ascending,
/// with the most recent report kept for any restated year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalStatement {
    kind: StatementKind,
    /// The report date whose column was kept for each year
    report_dates: BTreeMap<FiscalYear, NaiveDate>,
    items: BTreeMap<String, YearSeries>,
}

impl CanonicalStatement {
    pub fn empty(kind: StatementKind) -> Self {
        Self {
            kind,
            report_dates: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn years(&self) -> Vec<FiscalYear> {
        self.report_dates.keys().copied().collect()
    }

    pub fn report_date(&self, year: FiscalYear) -> Option<NaiveDate> {
        self.report_dates.get(&year).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.report_dates.is_empty()
    }

    pub fn line_items(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn series(&self, line_item: &str) -> Option<&YearSeries> {
        self.items.get(line_item)
    }

    pub fn value(&self, line_item: &str, year: FiscalYear) -> Option<f64> {
        self.items.get(line_item)?.get(&year).copied()
    }

    /// First of `aliases` that has at least one value.
    pub fn first_series(&self, aliases: &[&str]) -> Option<&YearSeries> {
        aliases
            .iter()
            .filter_map(|name| self.items.get(*name))
            .find(|series| !series.is_empty())
    }

    /// Keeps only the latest `n` fiscal years.
    pub fn recent(&self, n: usize) -> Self {
        let keep: BTreeMap<FiscalYear, NaiveDate> = self
            .report_dates
            .iter()
            .rev()
            .take(n)
            .map(|(y, d)| (*y, *d))
            .collect();

        let items = self
            .items
            .iter()
            .map(|(name, series)| {
                let trimmed: YearSeries = series
                    .iter()
                    .filter(|(year, _)| keep.contains_key(year))
                    .map(|(y, v)| (*y, *v))
                    .collect();
                (name.clone(), trimmed)
            })
            .filter(|(_, series)| !series.is_empty())
            .collect();

        Self {
            kind: self.kind,
            report_dates: keep,
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedStatements {
    pub income: CanonicalStatement,
    pub balance_sheet: CanonicalStatement,
    pub cash_flow: CanonicalStatement,
}

impl NormalizedStatements {
    pub fn empty() -> Self {
        Self {
            income: CanonicalStatement::empty(StatementKind::Income),
            balance_sheet: CanonicalStatement::empty(StatementKind::BalanceSheet),
            cash_flow: CanonicalStatement::empty(StatementKind::CashFlow),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance_sheet.is_empty() && self.cash_flow.is_empty()
    }

    pub fn statement(&self, kind: StatementKind) -> &CanonicalStatement {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::BalanceSheet => &self.balance_sheet,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }
}

/// Re-keys a raw statement by fiscal year.
///
/// Columns with unparseable report dates are dropped. When two columns land
/// in the same fiscal year the later report date wins; identical dates are
/// broken by column position, later first.
pub fn normalize_statement(kind: StatementKind, raw: &RawStatement) -> Result<CanonicalStatement> {
    raw.validate_shape()?;

    let mut chosen: BTreeMap<FiscalYear, (NaiveDate, usize)> = BTreeMap::new();

    for (column, raw_date) in raw.report_dates.iter().enumerate() {
        let date = match parse_report_date(raw_date) {
            Ok(date) => date,
            Err(e) => {
                warn!("{}: dropping column {}: {}", kind.label(), column, e);
                continue;
            }
        };

        let year = fiscal_year_of(date);
        match chosen.get(&year) {
            Some(&(kept_date, kept_column)) if (kept_date, kept_column) > (date, column) => {
                debug!(
                    "{}: report {} superseded by {} for fiscal year {}",
                    kind.label(),
                    date,
                    kept_date,
                    year
                );
            }
            Some(&(kept_date, _)) => {
                debug!(
                    "{}: report {} supersedes {} for fiscal year {}",
                    kind.label(),
                    date,
                    kept_date,
                    year
                );
                chosen.insert(year, (date, column));
            }
            None => {
                chosen.insert(year, (date, column));
            }
        }
    }

    let mut items: BTreeMap<String, YearSeries> = BTreeMap::new();
    for row in &raw.line_items {
        let series: YearSeries = chosen
            .iter()
            .filter_map(|(year, (_, column))| {
                row.values[*column]
                    .filter(|v| v.is_finite())
                    .map(|v| (*year, v))
            })
            .collect();

        if series.is_empty() {
            continue;
        }

        // Providers occasionally repeat a row name; the first row with data wins
        items.entry(row.name.clone()).or_insert(series);
    }

    debug!(
        "{}: {} report columns normalized to {} fiscal years, {} line items",
        kind.label(),
        raw.report_dates.len(),
        chosen.len(),
        items.len()
    );

    Ok(CanonicalStatement {
        kind,
        report_dates: chosen.into_iter().map(|(y, (d, _))| (y, d)).collect(),
        items,
    })
}

pub fn normalize_bundle(bundle: &StatementBundle) -> Result<NormalizedStatements> {
    Ok(NormalizedStatements {
        income: normalize_statement(StatementKind::Income, &bundle.income)?,
        balance_sheet: normalize_statement(StatementKind::BalanceSheet, &bundle.balance_sheet)?,
        cash_flow: normalize_statement(StatementKind::CashFlow, &bundle.cash_flow)?,
    })
}
