use crate::error::{RatioAnalysisError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    #[schemars(description = "Income statement: revenue, costs, EBIT, net income, EPS (period flows)")]
    Income,

    #[schemars(description = "Balance sheet: assets, liabilities, equity, share counts (point-in-time balances)")]
    BalanceSheet,

    #[schemars(description = "Cash flow statement: operating, investing and financing flows")]
    CashFlow,
}

impl StatementKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatementKind::Income => "Income Statement",
            StatementKind::BalanceSheet => "Balance Sheet",
            StatementKind::CashFlow => "Cash Flow",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RawLineItem {
    #[schemars(
        description = "The line item name exactly as the provider reports it (e.g., 'Total Revenue', 'Current Liabilities')"
    )]
    pub name: String,

    #[schemars(
        description = "One value per report date, in the same order as the statement's report_dates. Null where the provider has no value."
    )]
    pub values: Vec<Option<f64>>,
}

/// A statement as the provider returns it: line-item rows against
/// report-date columns. Report dates are irregular and may repeat a
/// calendar year when a filing was restated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct RawStatement {
    #[schemars(
        description = "Report dates of the columns. Accepts YYYY-MM-DD, 'YYYY-MM-DD HH:MM:SS', RFC 3339 timestamps or Unix epoch seconds."
    )]
    pub report_dates: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Line item rows, each aligned with report_dates")]
    pub line_items: Vec<RawLineItem>,
}

impl RawStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a statement from `(line item, report date, value)` cells.
    /// Columns and rows appear in first-seen order.
    pub fn from_cells<I, N, D>(cells: I) -> Self
    where
        I: IntoIterator<Item = (N, D, f64)>,
        N: Into<String>,
        D: Into<String>,
    {
        let mut statement = Self::new();
        for (name, date, value) in cells {
            statement.insert(name, date, value);
        }
        statement
    }

    /// Sets a single cell, adding the column and/or row if needed.
    pub fn insert(&mut self, line_item: impl Into<String>, report_date: impl Into<String>, value: f64) {
        let line_item = line_item.into();
        let report_date = report_date.into();

        let column = match self.report_dates.iter().position(|d| *d == report_date) {
            Some(idx) => idx,
            None => {
                self.report_dates.push(report_date);
                for row in &mut self.line_items {
                    row.values.push(None);
                }
                self.report_dates.len() - 1
            }
        };

        let width = self.report_dates.len();
        let row = match self.line_items.iter().position(|r| r.name == line_item) {
            Some(idx) => &mut self.line_items[idx],
            None => {
                self.line_items.push(RawLineItem {
                    name: line_item,
                    values: vec![None; width],
                });
                let last = self.line_items.len() - 1;
                &mut self.line_items[last]
            }
        };
        row.values[column] = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        self.report_dates.is_empty() || self.line_items.is_empty()
    }

    /// Checks that every row carries exactly one value per report date.
    pub fn validate_shape(&self) -> Result<()> {
        for row in &self.line_items {
            if row.values.len() != self.report_dates.len() {
                return Err(RatioAnalysisError::ShapeMismatch {
                    line_item: row.name.clone(),
                    expected: self.report_dates.len(),
                    found: row.values.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct StatementBundle {
    #[serde(default)]
    #[schemars(description = "Annual income statement")]
    pub income: RawStatement,

    #[serde(default)]
    #[schemars(description = "Annual balance sheet")]
    pub balance_sheet: RawStatement,

    #[serde(default)]
    #[schemars(description = "Annual cash flow statement")]
    pub cash_flow: RawStatement,
}

impl StatementBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance_sheet.is_empty() && self.cash_flow.is_empty()
    }

    pub fn statement(&self, kind: StatementKind) -> &RawStatement {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::BalanceSheet => &self.balance_sheet,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(StatementBundle)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

/// Live market data for a ticker. Any field may be missing; market
/// ratios fall back to statement data where they can.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Quote {
    #[schemars(description = "Last traded price (falls back to last close)")]
    pub price: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Shares outstanding. Falls back to the latest balance sheet share count.")]
    pub shares_outstanding: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Trailing twelve month dividends per share")]
    pub dividend_per_share: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Earnings per share. Falls back to the latest Basic/Diluted EPS line item.")]
    pub eps: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Book value per share. Falls back to latest equity divided by shares.")]
    pub book_value_per_share: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Market capitalisation reported by the provider, if any")]
    pub market_cap: Option<f64>,
}
